//! Epochly CLI entry point.

use anyhow::Result;
use clap::Parser;
use epochly::cli::{commands, Cli, Commands, ConfigAction};
use epochly::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = match &cli.command {
        // The file may not exist yet.
        Commands::Config {
            action: ConfigAction::Init { .. },
        } => Settings::default(),
        _ => Settings::load_from(config_path.as_ref())?,
    };

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("epochly={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Transcript {
            url,
            instructions,
            api_key,
            provider,
        } => {
            commands::run_transcript(url, instructions.clone(), api_key.clone(), provider, settings).await?;
        }

        Commands::Quiz {
            input,
            num_questions,
            json,
            api_key,
            provider,
        } => {
            commands::run_quiz(input, *num_questions, api_key.clone(), provider, *json, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
