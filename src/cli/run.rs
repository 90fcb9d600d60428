//! Rewrite command implementation

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::config::Config;
use crate::rewriter::{Outcome, RewriteOptions, RewriteReport, Rewriter};
use crate::utils::{display_path, format_duration, format_size};

/// Rewrite the build output in place
#[derive(Args, Debug, Default)]
pub struct RunCommand {
    /// Output directory to rewrite (defaults to `output.dir`, i.e. dist)
    #[arg(long, env = "DISTFIX_DIST")]
    pub dist: Option<PathBuf>,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl RunCommand {
    pub fn execute(&self, config_path: &str) -> Result<()> {
        let start = Instant::now();

        info!("Loading configuration from {}", config_path);
        let config = Config::load_or_default(config_path)?;
        let root = config.root.clone();

        eprintln!("{} Rewriting build output...", "→".blue());

        let report = Rewriter::new(config, self.into()).run()?;

        eprintln!(
            "\n{} {} in {}\n",
            "✓".green().bold(),
            if report.dry_run { "Checked" } else { "Done" },
            format_duration(start.elapsed())
        );

        print_summary(&report, &root);

        Ok(())
    }
}

impl From<&RunCommand> for RewriteOptions {
    fn from(cmd: &RunCommand) -> Self {
        Self {
            dist_dir: cmd.dist.clone(),
            dry_run: cmd.dry_run,
        }
    }
}

fn print_summary(report: &RewriteReport, root: &std::path::Path) {
    for outcome in [&report.document, &report.bundle] {
        let path = display_path(outcome.path(), root).cyan();
        match outcome {
            Outcome::Rewritten { before, after, .. } => {
                let verb = if report.dry_run { "would rewrite" } else { "rewritten" };
                eprintln!(
                    "  {} {} {} {}",
                    "•".dimmed(),
                    path,
                    verb.green(),
                    format!("{} → {}", format_size(*before), format_size(*after)).dimmed()
                );
            }
            Outcome::Unchanged { reason, .. } => {
                eprintln!(
                    "  {} {} {} {}",
                    "•".dimmed(),
                    path,
                    "unchanged".yellow(),
                    format!("({})", reason).dimmed()
                );
            }
        }
    }

    eprintln!();
}
