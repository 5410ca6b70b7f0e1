// src/main.rs
// =============================================================================
// Entry point of the site-auditor CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Load settings and set up logging
// 3. Start the ledger writer and build the Auditor
// 4. Dispatch to the subcommand handler and print the report(s)
// 5. Flush the ledger, then exit with a proper code:
//    0 = score >= 5.0, 1 = score below 5.0, 2 = error or rejected
// =============================================================================

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use futures::future::join_all;
use site_auditor::checks::{CheckResult, CheckStatus};
use site_auditor::config::Settings;
use site_auditor::ledger::{spawn_ledger, JsonLinesLedger, LedgerHandle, NullLedger, RequestLedger};
use site_auditor::{logging, AuditError, AuditResponse, Auditor};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

const PASSING_SCORE: f64 = 5.0;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    logging::init(&settings.logging)?;

    let (ledger, writer) = start_ledger(&settings);
    let auditor = Auditor::new(Arc::new(settings), ledger);

    let outcome = match cli.command {
        Commands::Audit { target_url, caller, json } => handle_audit(&auditor, &target_url, &caller, json).await,
        Commands::Batch { file, json } => handle_batch(&auditor, &file, json).await,
    };

    // The writer stops once the last handle is gone and the queue is drained
    drop(auditor);
    if let Err(e) = writer.await {
        warn!(error = %e, "ledger writer did not shut down cleanly");
    }

    outcome
}

fn start_ledger(settings: &Settings) -> (LedgerHandle, JoinHandle<()>) {
    let ledger: Box<dyn RequestLedger> = match &settings.ledger.path {
        Some(path) => {
            info!(path = %path.display(), "recording audits to ledger file");
            Box::new(JsonLinesLedger::new(path))
        }
        None => Box::new(NullLedger),
    };
    spawn_ledger(ledger)
}

// Handles the 'audit' subcommand
async fn handle_audit(auditor: &Auditor, target_url: &str, caller: &str, json: bool) -> Result<i32> {
    let target = parse_target(target_url)?;

    if !json {
        println!("🔍 Auditing website: {}", target);
    }

    let outcome = auditor.run_audit(&target, caller).await;
    print_outcome(&target, &outcome, json)?;
    Ok(exit_code(&outcome))
}

// Handles the 'batch' subcommand
//
// Every line is audited concurrently. The exit code is the worst one seen.
async fn handle_batch(auditor: &Auditor, file: &Path, json: bool) -> Result<i32> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read batch file {}", file.display()))?;
    let jobs = parse_batch(&contents)?;

    if jobs.is_empty() {
        println!("⚠️  No audits found in {}", file.display());
        return Ok(0);
    }

    if !json {
        println!("🔍 Running {} audit(s)...\n", jobs.len());
    }

    let outcomes = join_all(
        jobs.iter()
            .map(|(caller, target)| auditor.run_audit(target, caller)),
    )
    .await;

    let mut worst = 0;
    for ((caller, target), outcome) in jobs.iter().zip(&outcomes) {
        if !json {
            println!("👤 Caller: {}", caller);
        }
        print_outcome(target, outcome, json)?;
        worst = worst.max(exit_code(outcome));
    }

    Ok(worst)
}

// Accepts http(s) URLs with a host. A bare domain is taken as https.
fn parse_target(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&with_scheme).with_context(|| format!("Invalid URL: {}", raw))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("Only http and https URLs can be audited, got: {}", raw);
    }
    if url.host_str().is_none() {
        bail!("URL has no host: {}", raw);
    }
    Ok(url)
}

// `CALLER URL` per line; blank lines and '#' comments are skipped
fn parse_batch(contents: &str) -> Result<Vec<(String, Url)>> {
    let mut jobs = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let (Some(caller), Some(url), None) = (parts.next(), parts.next(), parts.next()) else {
            bail!("Line {}: expected `CALLER URL`, got: {}", index + 1, line);
        };

        let target = parse_target(url).with_context(|| format!("Line {}", index + 1))?;
        jobs.push((caller.to_string(), target));
    }

    Ok(jobs)
}

fn exit_code(outcome: &Result<AuditResponse, AuditError>) -> i32 {
    match outcome {
        Ok(response) if response.score >= PASSING_SCORE => 0,
        Ok(_) => 1,
        Err(_) => 2,
    }
}

fn print_outcome(target: &Url, outcome: &Result<AuditResponse, AuditError>, json: bool) -> Result<()> {
    match (outcome, json) {
        (Ok(response), true) => println!("{}", serde_json::to_string_pretty(response)?),
        (Ok(response), false) => print_report(target, response),
        (Err(e), true) => println!("{}", serde_json::to_string_pretty(&e.to_error_body())?),
        (Err(AuditError::RateLimited { retry_after_secs }), false) => {
            eprintln!("⏳ Audit limit reached for {}. Try again in {}s.", target, retry_after_secs);
        }
        (Err(e), false) => eprintln!("❌ Audit of {} failed: {}", target, e),
    }
    Ok(())
}

// Prints a finished audit as a human-readable table
fn print_report(target: &Url, response: &AuditResponse) {
    println!("{:<24} {:<15} {:<60}", "CHECK", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(99));

    for check in &response.detailed_checks {
        println!("{:<24} {:<15} {:<60}", check.name, format_status(check), truncate(&check.message, 60));
    }

    println!();
    println!("📂 Categories:");
    for category in &response.categories {
        println!("   {:<12} {}/{}", category.name, category.ok_count, category.total);
    }

    if !response.top_priorities.is_empty() {
        println!();
        println!("🎯 Fix first:");
        for (rank, priority) in response.top_priorities.iter().enumerate() {
            println!(
                "   {}. [{}] {}: {}",
                rank + 1,
                priority.severity,
                priority.title,
                priority.message
            );
        }
    }

    let metadata = &response.metadata;
    println!();
    println!("📊 Summary for {}:", target);
    println!("   ⭐ Score: {:.1} / 10", response.score);
    println!("   ✅ OK: {}", response.checks_ok);
    println!("   ❌ Critical: {}", response.problems_critical);
    println!("   ⚠️  Important: {}", response.problems_important);
    println!(
        "   📋 Checks: {} run, {} completed, {} failed ({}s)",
        metadata.checks_total, metadata.checks_completed, metadata.checks_failed, metadata.processing_time_sec
    );
}

fn format_status(check: &CheckResult) -> String {
    match check.status {
        CheckStatus::Ok => "✅ OK".to_string(),
        CheckStatus::Partial => "🟡 PARTIAL".to_string(),
        CheckStatus::Problem => "❌ PROBLEM".to_string(),
        CheckStatus::Error => "⚠️  ERROR".to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars - 3).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_accepts_bare_domains() {
        assert_eq!(parse_target("example.com").unwrap().as_str(), "https://example.com/");
        assert_eq!(parse_target("http://example.com/shop").unwrap().as_str(), "http://example.com/shop");
    }

    #[test]
    fn test_parse_target_rejects_other_schemes() {
        assert!(parse_target("ftp://example.com").is_err());
        assert!(parse_target("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_parse_batch_skips_comments_and_blanks() {
        let jobs = parse_batch("# nightly\n\nalice https://a.example\n  bob b.example  \n").unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].0, "alice");
        assert_eq!(jobs[1].1.as_str(), "https://b.example/");
    }

    #[test]
    fn test_parse_batch_reports_the_bad_line() {
        let err = parse_batch("alice https://a.example\nonly-one-field\n").unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }
}
