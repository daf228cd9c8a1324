//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::TranscriptCache;
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
    Output::header("Epochly Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Transcript Strategies").bold());
    let strategy_checks = check_strategies(settings);
    for check in &strategy_checks {
        check.print();
    }
    checks.extend(strategy_checks);

    println!();

    println!("{}", style("API Configuration").bold());
    let api_check = check_groq_api_key(std::env::var("GROQ_API_KEY").ok().as_deref());
    api_check.print();
    checks.push(api_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(), check_cache(settings)];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Epochly.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Epochly is ready to use.");
    }

    Ok(())
}

fn check_strategies(settings: &Settings) -> Vec<CheckResult> {
    let transcript = &settings.transcript;
    let mut results = Vec::new();

    for name in ["cache", "innertube", "timedtext", "ytdlp", "scrape"] {
        if transcript.is_disabled(name) {
            results.push(CheckResult::warning(
                name,
                "disabled",
                "Remove it from transcript.disabled to re-enable",
            ));
        } else if name == "ytdlp" {
            results.push(check_tool("ytdlp", &transcript.ytdlp_path, install_hint_ytdlp()));
        } else {
            results.push(CheckResult::ok(
                name,
                &format!("enabled (timeout {}s)", transcript.timeout_for(name).as_secs()),
            ));
        }
    }

    if transcript.accept_invalid_certs {
        results.push(CheckResult::warning(
            "TLS verification",
            "disabled for alternate fetchers",
            "Set transcript.accept_invalid_certs = false unless behind an intercepting proxy",
        ));
    }

    results
}

/// Check if an external tool is available.
fn check_tool(name: &str, program: &str, hint: &str) -> CheckResult {
    match Command::new(program).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok(name, &format!("{} ({})", program, version))
        }
        // The chain skips past a missing yt-dlp, so this is only a warning.
        Ok(_) => CheckResult::warning(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::warning(name, &format!("{} not found", program), hint)
        }
        Err(e) => CheckResult::warning(name, &format!("error: {}", e), hint),
    }
}

/// Check the API key used by the `transcript` and `quiz` commands.
///
/// The server takes keys per request, so a missing key is only a warning.
fn check_groq_api_key(key: Option<&str>) -> CheckResult {
    match key {
        Some(key) if key.starts_with("gsk_") && key.len() > 12 => {
            let tail: String = key.chars().skip(key.chars().count() - 4).collect();
            let masked = format!("gsk_...{}", tail);
            CheckResult::ok("GROQ_API_KEY", &format!("configured ({})", masked))
        }
        Some(key) if key.trim().is_empty() => CheckResult::error(
            "GROQ_API_KEY",
            "empty",
            "Set with: export GROQ_API_KEY='gsk_...' or unset it",
        ),
        Some(_) => CheckResult::warning(
            "GROQ_API_KEY",
            "set but format looks unusual",
            "Expected format: gsk_... (Groq API key)",
        ),
        None => CheckResult::warning(
            "GROQ_API_KEY",
            "not set",
            "Needed for CLI summaries and quizzes; the server reads X-API-Key per request",
        ),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning("Config file", "using defaults", "Create with: epochly config init")
    }
}

fn check_cache(settings: &Settings) -> CheckResult {
    match TranscriptCache::from_settings(&settings.cache) {
        Ok(cache) => CheckResult::ok("Transcript cache", &format!("{} entries", cache.len())),
        Err(e) => CheckResult::error(
            "Transcript cache",
            &e.to_string(),
            "Fix or remove cache.path in the config file",
        ),
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
