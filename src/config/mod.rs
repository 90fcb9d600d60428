//! Configuration handling for distfix
//!
//! Parses the optional `distfix.toml`. Without one, the built-in defaults
//! describe a Vite `dist/` tree and the React UMD runtime.

mod schema;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

pub use schema::*;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the bundler wrote its output
    #[serde(default)]
    pub output: OutputConfig,

    /// Runtime libraries injected ahead of the bundle
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Rewrite toggles
    #[serde(default)]
    pub rewrite: RewriteConfig,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let canonical_path = absolute(path.as_ref())?;

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        Self::from_toml(&content, &canonical_path)
    }

    /// Load configuration, falling back to defaults when the file does not exist
    ///
    /// A file that exists but cannot be read or parsed is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let canonical_path = absolute(path.as_ref())?;

        match fs::read_to_string(&canonical_path) {
            Ok(content) => Self::from_toml(&content, &canonical_path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", canonical_path.display());
                let mut config = Self::default();
                config.root = std::env::current_dir()?;
                Ok(config)
            }
            Err(err) => Err(err).with_context(|| {
                format!("Failed to read config file: {}", canonical_path.display())
            }),
        }
    }

    fn from_toml(content: &str, path: &Path) -> Result<Self> {
        let mut config: Config = toml::from_str(content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        // Relative output paths resolve against the config file's directory
        config.root = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("output.dir", &self.output.dir),
            ("output.html", &self.output.html),
            ("output.assets", &self.output.assets),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("`{}` must not be empty", key);
            }
        }

        for script in &self.runtime.scripts {
            let url = Url::parse(script)
                .with_context(|| format!("Invalid runtime script URL: {}", script))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("Runtime script must be an http(s) URL: {}", script);
            }
        }

        Ok(())
    }

    /// Render this configuration as a `distfix.toml` document
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Absolute output directory, honoring an override from the command line
    pub fn output_dir(&self, dir_override: Option<&Path>) -> PathBuf {
        match dir_override {
            Some(dir) => self.root.join(dir),
            None => self.root.join(&self.output.dir),
        }
    }

    /// Path of the entry document
    pub fn html_path(&self, dir_override: Option<&Path>) -> PathBuf {
        self.output_dir(dir_override).join(&self.output.html)
    }

    /// Path of the asset directory
    pub fn assets_path(&self, dir_override: Option<&Path>) -> PathBuf {
        self.output_dir(dir_override).join(&self.output.assets)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
