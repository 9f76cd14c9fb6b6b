//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::configured_text_providers;
use crate::cli::Output;
use crate::config::{Settings, SpeechEngine};
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Reelcut Doctor");
    println!();

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    let mut tools = vec![
        check_tool("ffmpeg", "ffmpeg -version", install_hint_ffmpeg()),
        check_tool("ffprobe", "ffprobe -version", install_hint_ffmpeg()),
        check_tool("yt-dlp", "yt-dlp --version", install_hint_ytdlp()).downgrade(),
    ];
    let edge = check_tool("edge-tts", "edge-tts --help", "Install with: pip install edge-tts");
    let engines = [settings.narration.engine, settings.narration.fallback_engine];
    tools.push(if engines.contains(&SpeechEngine::OpenAi) {
        edge.downgrade()
    } else {
        edge
    });
    for check in &tools {
        check.print();
    }
    checks.extend(tools);

    println!();

    println!("{}", style("Providers").bold());
    let provider_checks = check_providers(settings);
    for check in &provider_checks {
        check.print();
    }
    checks.extend(provider_checks);

    println!();

    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    for check in &dir_checks {
        check.print();
    }
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Reelcut.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Reelcut is ready to use.");
    }

    Ok(())
}

impl CheckResult {
    /// Turn an error into a warning for optional tools.
    fn downgrade(mut self) -> Self {
        if self.status == CheckStatus::Error {
            self.status = CheckStatus::Warning;
        }
        self
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_cmd: &str, hint: &str) -> CheckResult {
    let parts: Vec<&str> = version_cmd.split_whitespace().collect();
    let (cmd, args) = match parts.split_first() {
        Some((cmd, args)) => (*cmd, args),
        None => return CheckResult::error(name, "no command", hint),
    };

    match Command::new(cmd).args(args).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Text providers are optional; without any, every LLM step falls back.
fn check_providers(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();
    let configured = configured_text_providers(settings);

    for provider in &settings.providers.text {
        if configured.contains(&provider.name) {
            results.push(CheckResult::ok(
                &provider.name,
                &format!("{} via {}", provider.model, provider.api_key_env),
            ));
        } else {
            results.push(CheckResult::warning(
                &provider.name,
                &format!("{} not set", provider.api_key_env),
                &format!("Set with: export {}='...'", provider.api_key_env),
            ));
        }
    }

    if configured.is_empty() {
        results.push(CheckResult::warning(
            "Text generation",
            "no provider configured",
            "Selection, scripts and metadata will use fallbacks",
        ));
    }

    results
}

/// Check output and working directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    [("Output directory", settings.output_dir()), ("Temp directory", settings.temp_dir())]
        .into_iter()
        .map(|(name, dir)| {
            if dir.exists() {
                CheckResult::ok(name, &dir.display().to_string())
            } else {
                CheckResult::warning(
                    name,
                    &format!("{} (will be created)", dir.display()),
                    "Directory will be created on first run",
                )
            }
        })
        .chain(settings.music_dir().map(|dir| {
            if dir.is_dir() {
                CheckResult::ok("Music directory", &dir.display().to_string())
            } else {
                CheckResult::warning(
                    "Music directory",
                    &format!("{} not found", dir.display()),
                    "Narrated shorts will have no background music",
                )
            }
        }))
        .collect()
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: reelcut config init",
        )
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_downgrade_only_touches_errors() {
        let err = CheckResult::error("yt-dlp", "not found", "install it").downgrade();
        assert_eq!(err.status, CheckStatus::Warning);
        let ok = CheckResult::ok("ffmpeg", "6.1").downgrade();
        assert_eq!(ok.status, CheckStatus::Ok);
    }

    #[test]
    fn test_missing_tool() {
        let result = check_tool("nope", "reelcut-missing-binary --version", "hint");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.message, "not found");
    }
}
