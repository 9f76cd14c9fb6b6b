//! Clip command implementation.

use super::{parse_strategy, Run};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::ClipOptions;
use anyhow::Result;

/// Run the clip command.
pub async fn run_clip(
    input: &str,
    strategy: Option<&str>,
    seed: Option<u64>,
    no_captions: bool,
    ai: Option<&str>,
    keep_temp: bool,
    settings: Settings,
) -> Result<()> {
    let options = ClipOptions {
        strategy: parse_strategy(strategy, &settings)?,
        burn_captions: !no_captions && settings.captions.burn_source_captions,
    };

    Output::info(&format!("Cutting clip from: {}", input));
    let run = Run::start(Operation::Render, input, settings, seed, keep_temp, ai)?;

    let spinner = Output::spinner("Selecting and rendering...");
    let result = run.pipeline.run_clip(&run.ctx, input, &options).await;
    spinner.finish_and_clear();

    let output = run.finish(result).await?;
    Output::success("Clip ready");
    Output::segment(0, &output.segments[0]);
    Output::result(&output);
    Ok(())
}
