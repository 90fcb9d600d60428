//! Config initialization command

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::config::Config;

/// Write a default distfix.toml
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub fn execute(&self, config_path: &str) -> Result<()> {
        let path = Path::new(config_path);

        if path.exists() && !self.force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }

        let content = generate_config()?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        eprintln!("  {} Created {}", "✓".green(), path.display().to_string().cyan());
        eprintln!();
        eprintln!("  Next steps:");
        eprintln!("    {} run your bundler", "→".dimmed());
        eprintln!("    {} distfix", "→".dimmed());
        eprintln!();

        Ok(())
    }
}

fn generate_config() -> Result<String> {
    let body = Config::default().to_toml()?;
    Ok(format!(
        "# distfix configuration\n# Every key is optional; these are the defaults.\n\n{}",
        body
    ))
}
