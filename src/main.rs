//! distfix - post-build rewriter for module-free deployments
//!
//! Runs after the bundler. Rewrites `dist/index.html` and the bundle under
//! `dist/assets/` so the site works where ES modules cannot be loaded:
//! - strips `type="module"` (and `crossorigin`) from the entry document
//! - injects the runtime library scripts ahead of the local bundle
//! - removes module syntax from the bundle and wraps it in an IIFE

use anyhow::Result;
use clap::Parser;
use distfix_lib::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging/tracing system
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("distfix=debug,distfix_lib=debug"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("distfix=info,distfix_lib=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    cli.execute()
}
