//! distfix library
//!
//! Post-build rewriting of a bundler's `dist/` tree so the site loads as a
//! classic script instead of an ES module.

pub mod bundle;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod rewriter;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use error::RewriteError;
pub use rewriter::{RewriteOptions, RewriteReport, Rewriter};
