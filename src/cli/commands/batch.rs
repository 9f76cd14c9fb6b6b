//! Batch command implementation.

use super::{parse_strategy, Run};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::narration::ScriptStyle;
use crate::pipeline::{ClipOptions, MontageOptions, NarrateOptions};
use crate::ReelcutError;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// What to produce for every input of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    Clip,
    Montage,
    Scenes,
    Narrate,
}

/// Options shared by every item of a batch.
#[derive(Debug, Clone)]
pub struct BatchArgs {
    pub mode: BatchMode,
    pub strategy: Option<String>,
    pub seed: Option<u64>,
    pub ai: Option<String>,
    /// Pause between items.
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Error,
}

/// Outcome of one input.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub input: String,
    pub mode: BatchMode,
    pub status: ItemStatus,
    pub output_files: Vec<PathBuf>,
    pub error: Option<String>,
    pub started_at: DateTime<Local>,
    pub completed_at: DateTime<Local>,
}

/// The `batch_log.json` document, rewritten after every item.
#[derive(Debug, Clone, Serialize)]
pub struct BatchLog {
    pub batch_id: String,
    pub total: usize,
    pub success: usize,
    pub errors: usize,
    pub results: Vec<BatchItem>,
}

impl BatchLog {
    fn new(batch_id: String) -> Self {
        Self {
            batch_id,
            total: 0,
            success: 0,
            errors: 0,
            results: Vec::new(),
        }
    }

    fn push(&mut self, item: BatchItem) {
        match item.status {
            ItemStatus::Success => self.success += 1,
            ItemStatus::Error => self.errors += 1,
        }
        self.results.push(item);
        self.total = self.results.len();
    }

    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Inputs from a batch file: one per line, blank lines and `#` comments skipped.
pub fn parse_batch_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Run the batch command.
pub async fn run_batch(file: &Path, args: BatchArgs, keep_temp: bool, settings: Settings) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let inputs = parse_batch_list(&content);
    if inputs.is_empty() {
        Output::warning(&format!("No inputs in {}", file.display()));
        return Ok(());
    }

    let output_dir = settings.output_dir();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let log_path = output_dir.join("batch_log.json");

    Output::header(&format!("Batch of {} ({} mode)", inputs.len(), mode_name(args.mode)));

    let total = inputs.len();
    let mut position = 0;
    let log = process_batch(&inputs, args.mode, &log_path, args.delay, |input| {
        position += 1;
        Output::info(&format!("[{}/{}] {}", position, total, input));
        process_item(input, args.clone(), keep_temp, settings.clone())
    })
    .await?;

    if log.errors > 0 {
        Output::warning(&format!("{} succeeded, {} failed", log.success, log.errors));
    } else {
        Output::success(&format!("All {} items succeeded", log.success));
    }
    Output::kv("Log", &log_path.display().to_string());
    Ok(())
}

/// Run `process` once per input, isolating failures. The log is saved after
/// every item so an interrupted batch still leaves a record.
pub(crate) async fn process_batch<F, Fut>(
    inputs: &[String],
    mode: BatchMode,
    log_path: &Path,
    delay: Duration,
    mut process: F,
) -> Result<BatchLog>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<PathBuf>>>,
{
    let mut log = BatchLog::new(Local::now().format("%Y%m%d_%H%M%S").to_string());

    for (i, input) in inputs.iter().enumerate() {
        let started_at = Local::now();
        let result = process(input.clone()).await;

        let cancelled = matches!(
            result.as_ref().err().and_then(|e| e.downcast_ref::<ReelcutError>()),
            Some(ReelcutError::Cancelled)
        );
        let item = match result {
            Ok(output_files) => {
                info!(input = %input, files = output_files.len(), "Batch item done");
                BatchItem {
                    input: input.clone(),
                    mode,
                    status: ItemStatus::Success,
                    output_files,
                    error: None,
                    started_at,
                    completed_at: Local::now(),
                }
            }
            Err(e) => {
                warn!(input = %input, "Batch item failed: {:#}", e);
                Output::error(&format!("{}: {:#}", input, e));
                BatchItem {
                    input: input.clone(),
                    mode,
                    status: ItemStatus::Error,
                    output_files: Vec::new(),
                    error: Some(format!("{:#}", e)),
                    started_at,
                    completed_at: Local::now(),
                }
            }
        };
        log.push(item);
        log.save(log_path)?;

        if cancelled {
            Output::warning("Batch interrupted");
            break;
        }
        if i + 1 < inputs.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    Ok(log)
}

/// One full pipeline run for a single input.
async fn process_item(input: String, args: BatchArgs, keep_temp: bool, settings: Settings) -> Result<Vec<PathBuf>> {
    let strategy = parse_strategy(args.strategy.as_deref(), &settings)?;
    let ai = args.ai.as_deref();

    match args.mode {
        BatchMode::Clip => {
            let options = ClipOptions {
                strategy,
                burn_captions: settings.captions.burn_source_captions,
            };
            let run = Run::start(Operation::Render, &input, settings, args.seed, keep_temp, ai)?;
            let result = run.pipeline.run_clip(&run.ctx, &input, &options).await;
            Ok(vec![run.finish(result).await?.video])
        }
        BatchMode::Montage => {
            let options = MontageOptions {
                strategy,
                count: settings.selection.montage_count.max(1),
                total_seconds: settings.selection.montage_seconds,
            };
            let run = Run::start(Operation::Render, &input, settings, args.seed, keep_temp, ai)?;
            let result = run.pipeline.run_montage(&run.ctx, &input, &options).await;
            Ok(vec![run.finish(result).await?.video])
        }
        BatchMode::Scenes => {
            let run = Run::start(Operation::Render, &input, settings, args.seed, keep_temp, ai)?;
            let result = run.pipeline.run_scenes(&run.ctx, &input).await;
            Ok(run.finish(result).await?.into_iter().map(|o| o.video).collect())
        }
        BatchMode::Narrate => {
            let style: ScriptStyle = settings.narration.style.parse()?;
            let options = NarrateOptions {
                strategy,
                style,
                target_seconds: settings.narration.target_seconds,
                variations: 1,
                music: None,
            };
            let run = Run::start(Operation::Narrate, &input, settings, args.seed, keep_temp, ai)?;
            let result = run.pipeline.run_narrated(&run.ctx, &input, &options).await;
            Ok(run.finish(result).await?.into_iter().map(|o| o.video).collect())
        }
    }
}

fn mode_name(mode: BatchMode) -> &'static str {
    match mode {
        BatchMode::Clip => "clip",
        BatchMode::Montage => "montage",
        BatchMode::Scenes => "scenes",
        BatchMode::Narrate => "narrate",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_list_skips_comments_and_blanks() {
        let content = "# shorts for monday\nhttps://youtu.be/abc\n\n   \n  dQw4w9WgXcQ  \n#skip.mp4\n/tmp/local.mp4\n";
        assert_eq!(
            parse_batch_list(content),
            vec!["https://youtu.be/abc", "dQw4w9WgXcQ", "/tmp/local.mp4"]
        );
        assert!(parse_batch_list("\n# only comments\n").is_empty());
    }

    #[tokio::test]
    async fn test_failed_item_is_logged_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("batch_log.json");
        let inputs = vec!["good-1".to_string(), "broken".to_string(), "good-2".to_string()];

        let log = process_batch(&inputs, BatchMode::Clip, &log_path, Duration::ZERO, |input| async move {
            if input == "broken" {
                Err(ReelcutError::Acquisition("video unavailable".into()).into())
            } else {
                Ok(vec![PathBuf::from(format!("/out/{}.mp4", input))])
            }
        })
        .await
        .unwrap();

        assert_eq!(log.total, 3);
        assert_eq!(log.success, 2);
        assert_eq!(log.errors, 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&log_path).unwrap()).unwrap();
        assert_eq!(written["total"], 3);
        assert_eq!(written["errors"], 1);
        assert_eq!(written["results"][1]["status"], "error");
        assert_eq!(written["results"][1]["mode"], "clip");
        assert!(written["results"][1]["error"].as_str().unwrap().contains("video unavailable"));
        assert_eq!(written["results"][2]["output_files"][0], "/out/good-2.mp4");
        assert!(written["batch_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_item_stops_batch() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("batch_log.json");
        let inputs = vec!["a".to_string(), "b".to_string()];

        let log = process_batch(&inputs, BatchMode::Scenes, &log_path, Duration::ZERO, |_| async {
            Err(ReelcutError::Cancelled.into())
        })
        .await
        .unwrap();

        assert_eq!(log.total, 1);
        assert_eq!(log.errors, 1);
        assert!(log_path.exists());
    }
}
