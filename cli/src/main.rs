use std::{fs, path::PathBuf, process};

use anyhow::Context;
use clap::{error::ErrorKind, ArgAction, Parser};
use console::style;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};
use wikicheck_core::{
    CheckError, CheckResult, Checker, CheckerConfig, ErrorMarker, RuleCategory,
};

const DEFAULT_CONFIG: &str = "wikicheck.yml";
const EXIT_USAGE: i32 = 1;
const EXIT_NOT_FOUND: i32 = 2;

/// Wikipedia page checker entry point.
#[derive(Debug, Parser)]
#[command(
    name = "wikicheck",
    version,
    about = "Check the prose of a Wikipedia page for style and grammar issues.",
    after_help = "Example: wikicheck https://de.wikipedia.org/wiki/Bielefeld"
)]
struct Args {
    /// Page URL, e.g. https://en.wikipedia.org/wiki/Eiffel_Tower
    #[arg(value_name = "URL")]
    url: String,

    /// Path to config file (YAML). Defaults to wikicheck.yml if present.
    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Disable rules by id (comma-separated).
    #[arg(long, value_delimiter = ',', value_name = "RULE[,RULE]")]
    disable: Vec<String>,

    /// Directory with n-gram data for the confusion rule.
    #[arg(long, value_name = "DIR")]
    ngram_dir: Option<PathBuf>,

    /// Characters of context shown around each finding.
    #[arg(long, value_name = "N")]
    context: Option<usize>,

    /// Emit JSON output for automation.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    url: &'a str,
    language: &'a str,
    title: &'a str,
    timestamp: Option<&'a str>,
    internal_errors: usize,
    findings: Vec<JsonFinding<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonFinding<'a> {
    rule_id: &'a str,
    category: RuleCategory,
    message: &'a str,
    original_start: usize,
    original_end: usize,
    suggestions: &'a [String],
    context: String,
}

fn main() -> anyhow::Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(EXIT_USAGE);
        }
    };

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?;
    config.disabled_rules.extend(args.disable.iter().cloned());
    if let Some(dir) = args.ngram_dir.clone() {
        config.ngram_dir = Some(dir);
    }
    if let Some(radius) = args.context {
        config.context_radius = radius;
    }
    if config.marker.is_none() {
        config.marker = Some(ErrorMarker::new("***", "***"));
    }
    let radius = config.context_radius;
    tracing::debug!(
        config = %args.config.display(),
        disabled = config.disabled_rules.len(),
        "configuration loaded"
    );

    let checker = Checker::new(config).context("Failed to set up HTTP client")?;
    let result = match checker.check_page(&args.url) {
        Ok(result) => result,
        Err(CheckError::PageNotFound { title, reason }) => {
            eprintln!(
                "{} {} found for page `{}`, nothing to check",
                style("No content:").yellow().bold(),
                reason,
                title
            );
            process::exit(EXIT_NOT_FOUND);
        }
        Err(err) => return Err(err).with_context(|| format!("Failed to check {}", args.url)),
    };

    if args.json {
        print_json_report(&result, radius)?;
    } else {
        print_human_report(&result, radius);
    }
    Ok(())
}

fn load_config(path: &PathBuf) -> anyhow::Result<CheckerConfig> {
    if !path.exists() {
        return Ok(CheckerConfig::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("Invalid config structure in {}", path.display()))
}

fn print_human_report(result: &CheckResult, radius: usize) {
    if let Some(timestamp) = &result.revision.timestamp {
        println!(
            "{} ({}, revision of {})",
            style(result.locator.title()).bold(),
            result.locator.language(),
            timestamp
        );
    }
    if result.applied.is_empty() {
        println!("{}", style("No issues found").green());
    }
    for (index, applied) in result.applied.iter().enumerate() {
        println!(
            "{}. {} ({})",
            index + 1,
            applied.finding.message,
            style(&applied.finding.rule_id).yellow()
        );
        if let Some(app) = applied.applications.first() {
            println!("    ...{}...", app.corrected_context(radius));
        }
    }
    if result.internal_errors > 0 {
        eprintln!(
            "{} {} finding(s) could not be mapped back to the page source",
            style("warning:").yellow(),
            result.internal_errors
        );
    }
}

fn print_json_report(result: &CheckResult, radius: usize) -> anyhow::Result<()> {
    let findings = result
        .applied
        .iter()
        .filter_map(|applied| {
            let app = applied.applications.first()?;
            Some(JsonFinding {
                rule_id: &applied.finding.rule_id,
                category: applied.finding.category,
                message: &applied.finding.message,
                original_start: app.original_start,
                original_end: app.original_end,
                suggestions: &applied.finding.suggestions,
                context: app.original_context(radius).text,
            })
        })
        .collect();
    let report = JsonReport {
        url: result.locator.url(),
        language: result.locator.language().code(),
        title: result.locator.title(),
        timestamp: result.revision.timestamp.as_deref(),
        internal_errors: result.internal_errors,
        findings,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "wikicheck",
            "https://en.wikipedia.org/wiki/Paris",
            "--disable",
            "WHITESPACE_RULE,BUZZWORD",
            "--context",
            "20",
        ])
        .unwrap();
        assert_eq!(args.disable, vec!["WHITESPACE_RULE", "BUZZWORD"]);
        assert_eq!(args.context, Some(20));
        assert!(!args.json);
    }

    #[test]
    fn url_is_required() {
        let err = Args::try_parse_from(["wikicheck"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let config = load_config(&PathBuf::from("does-not-exist.yml")).unwrap();
        assert_eq!(config.context_radius, 50);
    }
}
