//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Locations inside the bundler's output tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory produced by the bundler
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Entry document, relative to `dir`
    #[serde(default = "default_html")]
    pub html: String,

    /// Asset directory, relative to `dir`
    #[serde(default = "default_assets")]
    pub assets: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            html: default_html(),
            assets: default_assets(),
        }
    }
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_html() -> String {
    "index.html".to_string()
}

fn default_assets() -> String {
    "assets".to_string()
}

fn default_true() -> bool {
    true
}

/// Externally hosted libraries the bundle expects as globals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Script URLs, injected in this order ahead of the local bundle
    #[serde(default = "default_runtime_scripts")]
    pub scripts: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scripts: default_runtime_scripts(),
        }
    }
}

pub const REACT_UMD: &str = "https://unpkg.com/react@18/umd/react.production.min.js";
pub const REACT_DOM_UMD: &str = "https://unpkg.com/react-dom@18/umd/react-dom.production.min.js";

fn default_runtime_scripts() -> Vec<String> {
    vec![REACT_UMD.to_string(), REACT_DOM_UMD.to_string()]
}

/// Which rewrites to apply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Also drop `crossorigin` attributes from the entry document
    #[serde(default = "default_true")]
    pub strip_crossorigin: bool,

    /// Remove statement-start `import`/`export` syntax from the bundle
    #[serde(default = "default_true")]
    pub strip_module_syntax: bool,

    /// Wrap the bundle in an immediately-invoked function
    #[serde(default = "default_true")]
    pub wrap_bundle: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            strip_crossorigin: true,
            strip_module_syntax: true,
            wrap_bundle: true,
        }
    }
}
