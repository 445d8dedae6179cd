use charge_engine::cli::{
    handle_completions, handle_config_init, handle_config_validate, plugins, replay, Cli,
    Commands, ConfigCommands, PluginsCommands,
};
use charge_engine::ledger::InMemoryLedgerStore;
use charge_engine::logging::init_tracing;
use charge_engine::registry::PluginRegistry;
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Commands::Plugins(PluginsCommands::List(args)) => {
            PluginRegistry::with_builtin_plugins(Arc::new(InMemoryLedgerStore::new()))
                .map_err(Into::into)
                .and_then(|registry| plugins::handle_plugins_list(&args, &registry))
                .map(|output| println!("{}", output))
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
            ConfigCommands::Validate(args) => {
                handle_config_validate(&args).map(|summary| println!("{}", summary))
            }
        },
        Commands::Replay(args) => run_replay(&args).await,
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_replay(args: &charge_engine::cli::ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = replay::load_config(args)?;
    init_tracing(&config.logging)?;
    tracing::debug!(?config, "Loaded configuration");

    let output = replay::handle_replay(args, &config).await?;
    println!("{}", output);
    Ok(())
}
