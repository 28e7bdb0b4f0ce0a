use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli::resolve_config(&cli.global)?;

    let directives = cli::log_directives(
        cli.global.verbose,
        std::env::var("RUST_LOG").ok(),
        &config.logging.level,
    );
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(directives)?)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query(args) => {
            cli::commands::query::run(&config, args).await?;
        }
        Commands::Get { table, sys_id } => {
            cli::commands::record::get(&config, &table, &sys_id).await?;
        }
        Commands::Insert { table, set } => {
            cli::commands::record::insert(&config, &table, &set).await?;
        }
        Commands::Update { table, sys_id, set } => {
            cli::commands::record::update(&config, &table, &sys_id, &set).await?;
        }
        Commands::Delete { table, sys_id } => {
            cli::commands::record::delete(&config, &table, &sys_id).await?;
        }
        Commands::Attachment { command } => {
            cli::commands::attachment::run(&config, command).await?;
        }
        Commands::Config { json } => {
            cli::commands::config::run(&config, json)?;
        }
    }

    Ok(())
}
