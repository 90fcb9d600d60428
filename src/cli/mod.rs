//! Command-line interface for distfix
//!
//! Running `distfix` with no subcommand rewrites `./dist` in place. The
//! subcommands are:
//! - `run`: the same rewrite, spelled out
//! - `init`: write a default `distfix.toml`

mod init;
mod run;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

pub use init::InitCommand;
pub use run::RunCommand;

/// distfix - make a bundler's dist/ output load as a plain script
#[derive(Parser, Debug)]
#[command(name = "distfix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Rewrite options used when no subcommand is given
    #[command(flatten)]
    pub run: RunCommand,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to distfix.toml config file (optional)
    #[arg(short, long, global = true, default_value = "distfix.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrite the build output in place (the default)
    Run(RunCommand),

    /// Write a default distfix.toml
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(&self) -> Result<()> {
        print_banner();

        match &self.command {
            Some(Commands::Run(cmd)) => cmd.execute(&self.config),
            Some(Commands::Init(cmd)) => cmd.execute(&self.config),
            None => self.run.execute(&self.config),
        }
    }
}

/// Print the distfix banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "⚡".cyan(),
        "distfix".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
