mod cli;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands, RemoteCommands, UserCommands};

use caixa_core::models::Collection;
use caixa_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr so --json output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match &cli.command {
        Commands::In {
            kind,
            amount,
            description,
            date,
        } => {
            cli::commands::add_record(
                &config,
                Collection::Inflows,
                kind,
                *amount,
                description,
                *date,
                cli.json,
            )
            .await?;
        }
        Commands::Out {
            category,
            amount,
            description,
            date,
        } => {
            cli::commands::add_record(
                &config,
                Collection::Outflows,
                category,
                *amount,
                description,
                *date,
                cli.json,
            )
            .await?;
        }
        Commands::Ls { collection } => {
            cli::commands::list_records(&config, collection.as_deref(), cli.json)?;
        }
        Commands::Rm { collection, id } => {
            cli::commands::remove_record(&config, collection, *id, cli.json).await?;
        }
        Commands::Dashboard => {
            cli::commands::dashboard(&config, cli.json)?;
        }
        Commands::Sync => {
            cli::commands::sync(&config, cli.json).await?;
        }
        Commands::Pull => {
            cli::commands::pull(&config, cli.json).await?;
        }
        Commands::Status => {
            cli::commands::status(&config, cli.json).await?;
        }
        Commands::Remote(remote_cmd) => match remote_cmd {
            RemoteCommands::Set {
                script_url,
                sheets_id,
            } => {
                cli::commands::remote_set(&mut config, script_url, sheets_id)?;
            }
            RemoteCommands::Test => {
                cli::commands::remote_test(&config).await?;
            }
        },
        Commands::User(user_cmd) => match user_cmd {
            UserCommands::Add { id, name, role } => {
                cli::commands::user_add(&config, id, name, role)?;
            }
        },
        Commands::Login { user } => {
            cli::commands::login(&config, user)?;
        }
        Commands::Logout => {
            cli::commands::logout()?;
        }
        Commands::Export { path } => {
            cli::commands::export(&config, path.clone(), cli.json)?;
        }
        Commands::Clear => {
            cli::commands::clear(&config)?;
        }
    }

    Ok(())
}
