//! Montage command implementation.

use super::{parse_strategy, Run};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::MontageOptions;
use anyhow::Result;

/// Run the montage command.
pub async fn run_montage(
    input: &str,
    count: Option<usize>,
    duration: Option<f64>,
    strategy: Option<&str>,
    seed: Option<u64>,
    keep_temp: bool,
    settings: Settings,
) -> Result<()> {
    let options = MontageOptions {
        strategy: parse_strategy(strategy, &settings)?,
        count: count.unwrap_or(settings.selection.montage_count).max(1),
        total_seconds: duration.unwrap_or(settings.selection.montage_seconds),
    };
    if options.total_seconds <= 0.0 {
        return Err(anyhow::anyhow!("--duration must be positive"));
    }

    Output::info(&format!(
        "Building {} clip montage ({:.0}s) from: {}",
        options.count, options.total_seconds, input
    ));
    let run = Run::start(Operation::Render, input, settings, seed, keep_temp, None)?;

    let spinner = Output::spinner("Rendering montage...");
    let result = run.pipeline.run_montage(&run.ctx, input, &options).await;
    spinner.finish_and_clear();

    let output = run.finish(result).await?;
    Output::success(&format!("Montage of {} clips ready", output.segments.len()));
    for (i, segment) in output.segments.iter().enumerate() {
        Output::segment(i, segment);
    }
    Output::result(&output);
    Ok(())
}
