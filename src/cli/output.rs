//! CLI output formatting utilities.

use crate::pipeline::RunOutput;
use crate::selection::Segment;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one selected segment.
    pub fn segment(index: usize, segment: &Segment) {
        println!(
            "  {} {} - {} ({}, {})",
            style(format!("{}.", index + 1)).cyan(),
            style(format_timestamp(segment.start)).bold(),
            style(format_timestamp(segment.end)).bold(),
            format_duration(segment.duration()),
            style(&segment.origin).dim()
        );
        println!("     {}", segment.rationale);
        if let Some(hook) = &segment.hook {
            println!("     {} {}", style("hook:").dim(), hook);
        }
    }

    /// Print a finished output.
    pub fn result(output: &RunOutput) {
        println!("  {} {}", style("*").cyan(), style(output.video.display()).bold());
        if let Some(sidecar) = &output.sidecar {
            println!("    {}", style(sidecar.display()).dim());
        }
        if let Some(seconds) = output.narration_seconds {
            println!("    {} {}", style("narration:").dim(), format_duration(seconds));
        }
        if output.degraded {
            println!("    {}", style("some steps used fallbacks").yellow());
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format seconds as `m:ss` or `h:mm:ss`.
fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Format duration in seconds to a human-readable string.
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{:.1}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(95.4), "1:35");
        assert_eq!(format_timestamp(3725.0), "1:02:05");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(7.5), "7.5s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }
}
