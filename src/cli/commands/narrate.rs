//! Narrate command implementation.

use super::{parse_strategy, Run};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::narration::ScriptStyle;
use crate::pipeline::NarrateOptions;
use anyhow::Result;
use std::path::PathBuf;

/// Arguments of the narrate command.
#[derive(Debug, Default)]
pub struct NarrateArgs {
    pub style: Option<String>,
    pub voice: Option<String>,
    pub duration: Option<f64>,
    pub variations: usize,
    pub music: Option<PathBuf>,
    pub strategy: Option<String>,
    pub seed: Option<u64>,
    pub ai: Option<String>,
}

/// Run the narrate command.
pub async fn run_narrate(input: &str, args: NarrateArgs, keep_temp: bool, mut settings: Settings) -> Result<()> {
    let style: ScriptStyle = args
        .style
        .as_deref()
        .unwrap_or(&settings.narration.style)
        .parse()?;

    if let Some(voice) = args.voice {
        settings.narration.voice = voice;
    }

    let options = NarrateOptions {
        strategy: parse_strategy(args.strategy.as_deref(), &settings)?,
        style,
        target_seconds: args.duration.unwrap_or(settings.narration.target_seconds),
        variations: args.variations.max(1),
        music: args.music,
    };
    if options.target_seconds <= 0.0 {
        return Err(anyhow::anyhow!("--duration must be positive"));
    }

    Output::info(&format!(
        "Narrating {} ({} style, {} variation(s))",
        input, options.style, options.variations
    ));
    let run = Run::start(
        Operation::Narrate,
        input,
        settings,
        args.seed,
        keep_temp,
        args.ai.as_deref(),
    )?;

    let spinner = Output::spinner("Writing script, speaking and rendering...");
    let result = run.pipeline.run_narrated(&run.ctx, input, &options).await;
    spinner.finish_and_clear();

    let outputs = run.finish(result).await?;
    if outputs.len() < options.variations {
        Output::warning(&format!(
            "{} of {} variations failed; see the log for details",
            options.variations - outputs.len(),
            options.variations
        ));
    }
    Output::success(&format!("{} narrated short(s) ready", outputs.len()));
    if let Some(first) = outputs.first() {
        Output::segment(0, &first.segments[0]);
    }
    for output in &outputs {
        Output::result(output);
    }
    Ok(())
}
