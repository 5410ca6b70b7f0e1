// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
//   site-auditor audit https://example.com --caller alice --json
//   site-auditor batch audits.txt
//   site-auditor --config ./site-auditor.yaml audit https://example.com
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "site-auditor",
    version,
    about = "Audit a website against a battery of SEO checks and score it",
    long_about = "site-auditor runs robots.txt, sitemap, meta tag, heading, canonical, \
                  OpenGraph, analytics and schema.org checks against a website and reports \
                  a score from 0 to 10 with the issues worth fixing first."
)]
pub struct Cli {
    /// YAML configuration file (defaults to ./site-auditor.yaml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit a single website
    ///
    /// Example: site-auditor audit https://example.com
    Audit {
        /// Website URL to audit (http or https)
        target_url: String,

        /// Caller identity the rate limit is counted against
        #[arg(long, default_value = "cli")]
        caller: String,

        /// Output the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run several audits concurrently from a file
    ///
    /// Each non-empty line holds `CALLER URL`; lines starting with '#' are
    /// ignored. All audits share one rate limiter.
    Batch {
        /// File with one `CALLER URL` pair per line
        file: PathBuf,

        /// Output one JSON document per audit instead of tables
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_defaults() {
        let cli = Cli::parse_from(["site-auditor", "audit", "https://example.com"]);
        match cli.command {
            Commands::Audit { target_url, caller, json } => {
                assert_eq!(target_url, "https://example.com");
                assert_eq!(caller, "cli");
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_config_is_global() {
        let cli = Cli::parse_from(["site-auditor", "batch", "list.txt", "--config", "custom.yaml", "--json"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        assert!(matches!(cli.command, Commands::Batch { json: true, .. }));
    }
}
