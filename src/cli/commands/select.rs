//! Select command - show picks without rendering.

use super::{parse_strategy, Run};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::selection::SelectionOptions;
use anyhow::Result;

/// Run the select command.
pub async fn run_select(
    input: &str,
    strategy: Option<&str>,
    count: usize,
    seed: Option<u64>,
    json: bool,
    keep_temp: bool,
    settings: Settings,
) -> Result<()> {
    let strategy = parse_strategy(strategy, &settings)?;
    let mut options = SelectionOptions::from_settings(&settings.selection, 0);
    options.count = count.max(1);

    let run = Run::start(Operation::Select, input, settings, seed, keep_temp, None)?;
    options.seed = run.ctx.seed;

    let result = async {
        run.ctx.prepare().await?;
        let source = run.pipeline.acquire(&run.ctx, input).await?;
        let segments = run.pipeline.select(&source, strategy, &options).await;
        Ok::<_, crate::ReelcutError>((source, segments))
    }
    .await;
    let (source, segments) = run.finish(result).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&segments)?);
        return Ok(());
    }

    Output::header(&source.title);
    Output::kv("Strategy", &strategy.to_string());
    Output::kv("Duration", &format!("{:.1}s", source.duration()));
    println!();
    for (i, segment) in segments.iter().enumerate() {
        Output::segment(i, segment);
    }
    Ok(())
}
