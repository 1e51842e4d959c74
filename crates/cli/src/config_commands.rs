use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use porter_config::{Severity, ValidationResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate configuration (file + environment) and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

pub fn handle_config(action: &ConfigAction, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(path, *verbose),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(path: Option<&Path>, verbose: bool) -> Result<()> {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(porter_config::find_config_file);
    let config = porter_config::discover_and_load(config_path.as_deref())?;
    let result = ValidationResult {
        config_path,
        ..porter_config::validate(&config)
    };

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {} + environment\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults + environment.\n");
    }

    for line in render(&result, verbose) {
        eprintln!("{line}");
    }

    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn render(result: &ValidationResult, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };
        lines.push(format!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message));
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if !lines.is_empty() {
        lines.push(String::new());
    }
    if errors == 0 && warnings == 0 {
        lines.push("No issues found.".into());
    } else {
        lines.push(format!("{errors} error(s), {warnings} warning(s)"));
    }
    lines
}
