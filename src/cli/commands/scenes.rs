//! Scenes command implementation.

use super::Run;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the scenes command.
pub async fn run_scenes(input: &str, keep_temp: bool, settings: Settings) -> Result<()> {
    Output::info(&format!("Splitting at scene changes: {}", input));
    let run = Run::start(Operation::Render, input, settings, None, keep_temp, None)?;

    let spinner = Output::spinner("Detecting scenes and rendering...");
    let result = run.pipeline.run_scenes(&run.ctx, input).await;
    spinner.finish_and_clear();

    let outputs = run.finish(result).await?;
    Output::success(&format!("{} clips ready", outputs.len()));
    for output in &outputs {
        Output::result(output);
    }
    Ok(())
}
