//! Reelcut CLI entry point.

use anyhow::Result;
use clap::Parser;
use reelcut::cli::{commands, Cli, Commands};
use reelcut::config::Settings;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging; -v flags win over the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("reelcut={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let keep_temp = cli.keep_temp;

    // Execute command
    match cli.command {
        Commands::Clip {
            input,
            strategy,
            seed,
            no_captions,
            ai,
        } => {
            commands::run_clip(
                &input,
                strategy.as_deref(),
                seed,
                no_captions,
                ai.as_deref(),
                keep_temp,
                settings,
            )
            .await?;
        }

        Commands::Montage {
            input,
            count,
            duration,
            strategy,
            seed,
        } => {
            commands::run_montage(&input, count, duration, strategy.as_deref(), seed, keep_temp, settings)
                .await?;
        }

        Commands::Scenes { input } => {
            commands::run_scenes(&input, keep_temp, settings).await?;
        }

        Commands::Narrate {
            input,
            style,
            voice,
            duration,
            variations,
            music,
            strategy,
            seed,
            ai,
        } => {
            let args = commands::NarrateArgs {
                style,
                voice,
                duration,
                variations,
                music,
                strategy,
                seed,
                ai,
            };
            commands::run_narrate(&input, args, keep_temp, settings).await?;
        }

        Commands::Select {
            input,
            strategy,
            count,
            seed,
            json,
        } => {
            commands::run_select(&input, strategy.as_deref(), count, seed, json, keep_temp, settings).await?;
        }

        Commands::Batch {
            file,
            mode,
            strategy,
            seed,
            ai,
            delay,
        } => {
            let args = commands::BatchArgs {
                mode,
                strategy,
                seed,
                ai,
                delay: Duration::from_secs_f64(delay.max(0.0)),
            };
            commands::run_batch(&file, args, keep_temp, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, config_path)?;
        }
    }

    Ok(())
}
