//! Bundle asset rewriting
//!
//! Makes the built program loadable as a classic script: statement-start
//! module syntax is removed and the whole file is wrapped in an IIFE.
//!
//! The module-syntax patterns are line-anchored, not parsed. A line inside a
//! multi-line template literal that happens to start with `import` or `export`
//! will be rewritten too.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::RewriteConfig;
use crate::error::RewriteError;

/// Extension of the bundles we look for
pub const BUNDLE_EXTENSION: &str = "js";

/// Prefix that marks a source as already wrapped
pub const WRAPPER_OPENING: &str = "(function(";

/// `import x from "y"`, `import { a, b } from 'y'` (may span lines)
static IMPORT_FROM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+[^;'"]*?\s*from\s*(?:"[^"\n]*"|'[^'\n]*')[ \t]*;?[ \t]*(?:\r?\n)?"#)
        .unwrap()
});

/// `import "side-effect"`
static IMPORT_BARE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*(?:"[^"\n]*"|'[^'\n]*')[ \t]*;?[ \t]*(?:\r?\n)?"#).unwrap()
});

/// `export { a, b }`, `export * from "y"`, `export { a } from 'y'`
static EXPORT_LIST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*export\s*(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})(?:\s*from\s*(?:"[^"\n]*"|'[^'\n]*'))?[ \t]*;?[ \t]*(?:\r?\n)?"#)
        .unwrap()
});

/// Name bound to the value of `export default <expr>`
pub const DEFAULT_EXPORT_BINDING: &str = "__default";

/// `export default ...`, capturing a following `function`/`class` keyword and name
static EXPORT_DEFAULT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^([ \t]*)export\s+default\s+(?:((?:async\s+)?function\b\s*\*?\s*)([\w$]+)?|(class\b\s*)([\w$]+)?)?",
    )
    .unwrap()
});

/// `export const|function|class ...` keeps the declaration
static EXPORT_DECL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)export\s+").unwrap()
});

fn ensure_asset_dir(assets_dir: &Path) -> Result<(), RewriteError> {
    let metadata = fs::metadata(assets_dir)
        .map_err(|e| RewriteError::from_read(assets_dir.to_path_buf(), e, true))?;
    if !metadata.is_dir() {
        return Err(RewriteError::MissingAssetDir {
            path: assets_dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Resolve the bundle named by the entry document, falling back to a scan
///
/// `referenced` is the filename taken from the document's script tag. It is
/// used when it names a plain relative file that exists in `assets_dir`.
pub fn locate_referenced_bundle(
    assets_dir: &Path,
    referenced: Option<&str>,
) -> Result<Option<PathBuf>, RewriteError> {
    ensure_asset_dir(assets_dir)?;

    if let Some(filename) = referenced {
        let relative = Path::new(filename);
        let is_plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        let candidate = assets_dir.join(relative);
        if is_plain && candidate.is_file() {
            return Ok(Some(candidate));
        }
        debug!("Referenced bundle {} not in {}, scanning", filename, assets_dir.display());
    }

    locate_bundle_file(assets_dir)
}

/// Return the first `.js` file directly inside `assets_dir`, by file name order
///
/// A missing directory is fatal; an empty one is `Ok(None)`.
pub fn locate_bundle_file(assets_dir: &Path) -> Result<Option<PathBuf>, RewriteError> {
    ensure_asset_dir(assets_dir)?;

    for entry in WalkDir::new(assets_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(assets_dir).to_path_buf();
            RewriteError::Read {
                path,
                source: io::Error::from(e),
            }
        })?;

        let is_bundle = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext == BUNDLE_EXTENSION);
        if is_bundle {
            return Ok(Some(entry.into_path()));
        }
    }

    Ok(None)
}

/// Remove statement-start `import` and `export` syntax
pub fn strip_module_syntax(source: &str) -> String {
    let source = IMPORT_FROM_REGEX.replace_all(source, "");
    let source = IMPORT_BARE_REGEX.replace_all(&source, "");
    let source = EXPORT_LIST_REGEX.replace_all(&source, "");
    let source = EXPORT_DEFAULT_REGEX.replace_all(&source, rewrite_default_export);
    EXPORT_DECL_REGEX.replace_all(&source, "${1}").into_owned()
}

/// Named function and class declarations stay declarations; anything else
/// (anonymous functions, object literals, expressions) is bound to a variable
/// so it cannot be parsed as a block or a nameless declaration.
fn rewrite_default_export(caps: &Captures) -> String {
    let indent = caps.get(1).map_or("", |m| m.as_str());
    let keyword = caps.get(2).or_else(|| caps.get(4)).map_or("", |m| m.as_str());
    let name = caps.get(3).or_else(|| caps.get(5)).map(|m| m.as_str());

    let is_named_class = caps.get(4).is_some() && name.is_some_and(|n| n != "extends");
    let is_named_function = caps.get(2).is_some() && name.is_some();

    let rest = format!("{}{}", keyword, name.unwrap_or(""));
    if is_named_function || is_named_class {
        format!("{}{}", indent, rest)
    } else {
        format!("{}var {} = {}", indent, DEFAULT_EXPORT_BINDING, rest)
    }
}

/// Whether the source already starts with the IIFE opening
pub fn is_wrapped(source: &str) -> bool {
    source.trim_start().starts_with(WRAPPER_OPENING)
}

/// Wrap the source in an immediately-invoked function unless it already is
pub fn ensure_isolated_scope(source: &str) -> String {
    if is_wrapped(source) {
        return source.to_string();
    }
    format!("(function() {{\n{}\n}})();", source)
}

/// Result of rewriting a bundle
#[derive(Debug, Clone)]
pub struct BundleRewrite {
    pub source: String,
    pub module_syntax_stripped: bool,
    pub wrapped: bool,
}

/// The built JavaScript program
#[derive(Debug, Clone)]
pub struct BundleAsset {
    pub path: PathBuf,
    pub content: String,
}

impl BundleAsset {
    pub fn read(path: &Path) -> Result<Self, RewriteError> {
        let content = fs::read_to_string(path).map_err(|e| RewriteError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Apply the configured bundle rewrites in memory
    pub fn rewrite(&self, rewrite: &RewriteConfig) -> BundleRewrite {
        let mut source = self.content.clone();

        let mut module_syntax_stripped = false;
        if rewrite.strip_module_syntax {
            let stripped = strip_module_syntax(&source);
            module_syntax_stripped = stripped != source;
            source = stripped;
        }

        let mut wrapped = false;
        if rewrite.wrap_bundle && !is_wrapped(&source) {
            source = ensure_isolated_scope(&source);
            wrapped = true;
        }

        debug!(
            "{}: module syntax stripped = {}, wrapped = {}",
            self.path.display(),
            module_syntax_stripped,
            wrapped
        );

        BundleRewrite {
            source,
            module_syntax_stripped,
            wrapped,
        }
    }
}
