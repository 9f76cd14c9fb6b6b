//! CLI command implementations.

mod batch;
mod clip;
mod config;
mod doctor;
mod montage;
mod narrate;
mod scenes;
mod select;

pub use batch::{parse_batch_list, run_batch, BatchArgs, BatchMode};
pub use clip::run_clip;
pub use config::run_config;
pub use doctor::run_doctor;
pub use montage::run_montage;
pub use narrate::{run_narrate, NarrateArgs};
pub use scenes::run_scenes;
pub use select::run_select;

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{SelectionStrategy, Settings};
use crate::context::RunContext;
use crate::pipeline::Pipeline;
use anyhow::Result;
use tracing::warn;

/// A pipeline plus a run context that Ctrl-C cancels.
pub(crate) struct Run {
    pub pipeline: Pipeline,
    pub ctx: RunContext,
}

impl Run {
    pub fn start(
        operation: Operation,
        input: &str,
        settings: Settings,
        seed: Option<u64>,
        keep_temp: bool,
        ai: Option<&str>,
    ) -> Result<Self> {
        if let Err(e) = preflight::check(operation, input, &settings) {
            Output::error(&format!("{}", e));
            Output::info("Run 'reelcut doctor' for detailed diagnostics.");
            return Err(e.into());
        }
        if preflight::configured_text_providers(&settings).is_empty() {
            Output::warning("No text provider API key set; selection, scripts and metadata will use fallbacks.");
        }

        let keep = keep_temp || settings.general.keep_temp;
        let (ctx, handle) = RunContext::new(&settings.temp_dir(), seed);
        let ctx = ctx.with_keep_temp(keep);

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling run");
                handle.cancel();
            }
        });

        let mut pipeline = Pipeline::new(settings)?.with_cancellable_encoder(&ctx);
        if let Some(name) = ai {
            pipeline = pipeline.with_text_provider(name);
        }

        Output::kv("Run", &ctx.run_id);
        Output::kv("Seed", &ctx.seed.to_string());
        Ok(Self { pipeline, ctx })
    }

    /// Remove working files and pass the result through.
    pub async fn finish<T>(self, result: crate::Result<T>) -> Result<T> {
        self.ctx.cleanup().await;
        result.map_err(Into::into)
    }
}

/// Strategy from the flag, else from the config.
pub(crate) fn parse_strategy(flag: Option<&str>, settings: &Settings) -> Result<SelectionStrategy> {
    match flag {
        Some(s) => s.parse().map_err(|e: String| anyhow::anyhow!(e)),
        None => Ok(settings.selection.strategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_flag_overrides_config() {
        let mut settings = Settings::default();
        settings.selection.strategy = SelectionStrategy::Chapters;
        assert_eq!(parse_strategy(None, &settings).unwrap(), SelectionStrategy::Chapters);
        assert_eq!(
            parse_strategy(Some("golden"), &settings).unwrap(),
            SelectionStrategy::GoldenZone
        );
        assert!(parse_strategy(Some("vibes"), &settings).is_err());
    }
}
