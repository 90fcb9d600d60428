//! Entry document rewriting
//!
//! Textual rewrites of the bundler's `index.html`: module markers come out,
//! and the local bundle tag is replaced by the runtime library tags followed
//! by a plain tag for the bundle. None of this parses HTML; the patterns
//! assume bundler-generated markup.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::{RewriteConfig, RuntimeConfig};
use crate::error::RewriteError;

static MODULE_TYPE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s*\btype\s*=\s*(?:"module"|'module')"#).unwrap()
});

static CROSSORIGIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+crossorigin(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+))?"#).unwrap()
});

static SCRIPT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script\b([^>]*)>\s*</script\s*>"#).unwrap()
});

static SRC_ATTR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static BODY_CLOSE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</body\s*>").unwrap()
});

/// A `<script>` tag that loads the locally built bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReference {
    /// Byte range of the whole tag in the document
    pub span: Range<usize>,

    /// The `src` attribute as written, e.g. `./assets/index-abc123.js`
    pub src: String,

    /// Bare filename inside the asset directory
    pub filename: String,
}

/// What the runtime injection step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// The plain bundle tag was placed after its runtime tags; `runtimes`
    /// counts the runtime tags newly inserted
    Injected { src: String, runtimes: usize },

    /// No script tag points into the asset directory
    NoBundleReference,

    /// The document has no `</body>`; left unchanged
    NoBodyClose,

    /// The bundle tag is plain and already follows every runtime script
    AlreadyPresent,
}

/// Find the first script tag whose `src` points at a `.js` file in `assets_dir`
pub fn locate_bundle_reference(html: &str, assets_dir: &str) -> Option<BundleReference> {
    let prefix = format!("{}/", assets_dir.trim_matches('/'));

    SCRIPT_TAG_REGEX.captures_iter(html).find_map(|cap| {
        let tag = cap.get(0)?;
        let attrs = cap.get(1)?.as_str();
        let src_cap = SRC_ATTR_REGEX.captures(attrs)?;
        let src = src_cap.get(1).or_else(|| src_cap.get(2))?.as_str();

        let relative = src.trim_start_matches("./").trim_start_matches('/');
        let filename = relative.strip_prefix(&prefix)?;
        if filename.is_empty() || !filename.ends_with(".js") {
            return None;
        }

        Some(BundleReference {
            span: tag.range(),
            src: src.to_string(),
            filename: filename.to_string(),
        })
    })
}

/// Remove every `type="module"` attribute
pub fn strip_module_markers(html: &str) -> String {
    MODULE_TYPE_REGEX.replace_all(html, "").into_owned()
}

/// Remove every `crossorigin` attribute, with or without a value
pub fn strip_crossorigin(html: &str) -> String {
    CROSSORIGIN_REGEX.replace_all(html, "").into_owned()
}

/// Render a plain, non-module script tag
pub fn script_tag(src: &str) -> String {
    format!(r#"<script src="{}"></script>"#, src)
}

/// Replace `reference` with the runtime tags plus a plain bundle tag before `</body>`
///
/// Runtime scripts the page already loads ahead of `</body>` are not repeated.
/// The document is returned unchanged when it has no `</body>`, or when the
/// bundle tag is already plain and every runtime URL is referenced before it.
/// With no runtime URLs configured the bundle tag is only normalised in place.
pub fn inject_runtime_scripts(
    html: &str,
    reference: &BundleReference,
    runtime_urls: &[String],
) -> (String, Injection) {
    let span = &reference.span;
    let bundle_tag = script_tag(&reference.src);

    if runtime_urls.is_empty() {
        let out = [&html[..span.start], bundle_tag.as_str(), &html[span.end..]].concat();
        return (
            out,
            Injection::Injected {
                src: reference.src.clone(),
                runtimes: 0,
            },
        );
    }

    let in_place = html[span.clone()] == bundle_tag
        && runtime_urls
            .iter()
            .all(|url| references_src_before(html, url, span.start));
    if in_place {
        return (html.to_string(), Injection::AlreadyPresent);
    }

    // Last match: inline scripts or templates may contain an earlier one
    let Some(body_close) = BODY_CLOSE_REGEX.find_iter(html).last() else {
        return (html.to_string(), Injection::NoBodyClose);
    };
    let insert_at = body_close.start();

    let mut block = runtime_urls
        .iter()
        .filter(|url| !references_src_before(html, url, insert_at))
        .map(|url| script_tag(url))
        .collect::<Vec<_>>();
    let runtimes = block.len();
    block.push(bundle_tag);
    let block = block.join("\n") + "\n";

    let mut out = String::with_capacity(html.len() + block.len());
    if span.end <= insert_at {
        out.push_str(&html[..span.start]);
        out.push_str(&html[span.end..insert_at]);
        out.push_str(&block);
        out.push_str(&html[insert_at..]);
    } else {
        out.push_str(&html[..insert_at]);
        out.push_str(&block);
        out.push_str(&html[insert_at..span.start]);
        out.push_str(&html[span.end..]);
    }

    (
        out,
        Injection::Injected {
            src: reference.src.clone(),
            runtimes,
        },
    )
}

/// Whether a `src` attribute equal to `url` starts before byte `pos`
fn references_src_before(html: &str, url: &str, pos: usize) -> bool {
    SRC_ATTR_REGEX.captures_iter(html).any(|cap| {
        cap.get(1)
            .or_else(|| cap.get(2))
            .is_some_and(|m| m.start() < pos && m.as_str() == url)
    })
}

/// Result of rewriting an entry document
#[derive(Debug, Clone)]
pub struct DocumentRewrite {
    pub html: String,
    pub markers_removed: usize,
    pub crossorigin_removed: usize,
    pub injection: Injection,
}

/// The bundler-produced HTML entry document
#[derive(Debug, Clone)]
pub struct EntryDocument {
    pub path: PathBuf,
    pub content: String,
}

impl EntryDocument {
    /// Read the document; a missing file is a fatal [`RewriteError::MissingDocument`]
    pub fn read(path: &Path) -> Result<Self, RewriteError> {
        let content = fs::read_to_string(path)
            .map_err(|e| RewriteError::from_read(path.to_path_buf(), e, false))?;

        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Apply the configured document rewrites in memory
    pub fn rewrite(
        &self,
        rewrite: &RewriteConfig,
        runtime: &RuntimeConfig,
        assets_dir: &str,
    ) -> DocumentRewrite {
        let markers_removed = MODULE_TYPE_REGEX.find_iter(&self.content).count();
        let mut html = strip_module_markers(&self.content);

        let mut crossorigin_removed = 0;
        if rewrite.strip_crossorigin {
            crossorigin_removed = CROSSORIGIN_REGEX.find_iter(&html).count();
            html = strip_crossorigin(&html);
        }

        debug!(
            "Stripped {} module marker(s), {} crossorigin attribute(s)",
            markers_removed, crossorigin_removed
        );

        let injection = match locate_bundle_reference(&html, assets_dir) {
            Some(reference) => {
                debug!("Local bundle reference: {}", reference.filename);
                let (rewritten, injection) =
                    inject_runtime_scripts(&html, &reference, &runtime.scripts);
                html = rewritten;
                injection
            }
            None => Injection::NoBundleReference,
        };

        DocumentRewrite {
            html,
            markers_removed,
            crossorigin_removed,
            injection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{REACT_DOM_UMD, REACT_UMD};
    use pretty_assertions::assert_eq;

    fn runtimes() -> Vec<String> {
        vec![REACT_UMD.to_string(), REACT_DOM_UMD.to_string()]
    }

    const VITE_INDEX: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <title>Portfolio</title>
    <script type="module" crossorigin src="./assets/index-abc123.js"></script>
    <link rel="stylesheet" crossorigin href="./assets/index-def456.css">
  </head>
  <body>
    <div id="root"></div>
  </body>
</html>
"#;

    #[test]
    fn test_locate_bundle_reference() {
        let reference = locate_bundle_reference(VITE_INDEX, "assets").unwrap();

        assert_eq!(reference.src, "./assets/index-abc123.js");
        assert_eq!(reference.filename, "index-abc123.js");
        assert!(VITE_INDEX[reference.span.clone()].starts_with("<script"));
        assert!(VITE_INDEX[reference.span].ends_with("</script>"));
    }

    #[test]
    fn test_locate_accepts_absolute_and_bare_prefixes() {
        for src in ["/assets/app.js", "assets/app.js", "./assets/app.js"] {
            let html = format!(r#"<script src="{}"></script>"#, src);
            let reference = locate_bundle_reference(&html, "assets").unwrap();
            assert_eq!(reference.filename, "app.js");
            assert_eq!(reference.src, src);
        }
    }

    #[test]
    fn test_locate_ignores_external_and_non_js() {
        let html = format!(
            r#"<script src="{}"></script><script src="./assets/app.css"></script><script src="./vendor/app.js"></script>"#,
            REACT_UMD
        );
        assert_eq!(locate_bundle_reference(&html, "assets"), None);
    }

    #[test]
    fn test_strip_module_markers_is_global() {
        let html = r#"<script type="module" src="a.js"></script><script type='module'>go()</script>"#;
        let stripped = strip_module_markers(html);

        assert_eq!(stripped, r#"<script src="a.js"></script><script>go()</script>"#);
    }

    #[test]
    fn test_strip_crossorigin_forms() {
        let html = r#"<script crossorigin src="a.js"></script><link crossorigin="anonymous" href="b.css"><img crossorigin=use-credentials>"#;

        assert_eq!(
            strip_crossorigin(html),
            r#"<script src="a.js"></script><link href="b.css"><img>"#
        );
    }

    #[test]
    fn test_inject_orders_runtime_before_bundle() {
        let html = r#"<html><body><script src="./assets/index-abc123.js"></script></body></html>"#;
        let reference = locate_bundle_reference(html, "assets").unwrap();

        let (out, injection) = inject_runtime_scripts(html, &reference, &runtimes());

        assert_eq!(
            injection,
            Injection::Injected {
                src: "./assets/index-abc123.js".to_string(),
                runtimes: 2,
            }
        );
        let react = out.find(REACT_UMD).unwrap();
        let react_dom = out.find(REACT_DOM_UMD).unwrap();
        let bundle = out.find(r#"<script src="./assets/index-abc123.js"></script>"#).unwrap();
        assert!(react < react_dom && react_dom < bundle);
        assert_eq!(out.matches("index-abc123.js").count(), 1);
        assert!(out.ends_with("</body></html>"));
    }

    #[test]
    fn test_inject_moves_head_script_to_body_end() {
        let doc = EntryDocument {
            path: PathBuf::from("index.html"),
            content: VITE_INDEX.to_string(),
        };
        let result = doc.rewrite(&RewriteConfig::default(), &RuntimeConfig::default(), "assets");

        let head_end = result.html.find("</head>").unwrap();
        let bundle = result.html.find("./assets/index-abc123.js").unwrap();
        assert!(bundle > head_end);
        assert!(!result.html.contains("type=\"module\""));
        assert!(!result.html.contains("crossorigin"));
        assert_eq!(result.markers_removed, 1);
        assert_eq!(result.crossorigin_removed, 2);
    }

    #[test]
    fn test_inject_without_body_close_is_noop() {
        let html = r#"<html><script src="./assets/app.js"></script></html>"#;
        let reference = locate_bundle_reference(html, "assets").unwrap();

        let (out, injection) = inject_runtime_scripts(html, &reference, &runtimes());

        assert_eq!(injection, Injection::NoBodyClose);
        assert_eq!(out, html);
    }

    #[test]
    fn test_inject_skips_when_runtime_present() {
        let html = format!(
            "<body>{}\n{}\n{}\n</body>",
            script_tag(REACT_UMD),
            script_tag(REACT_DOM_UMD),
            script_tag("./assets/app.js")
        );
        let reference = locate_bundle_reference(&html, "assets").unwrap();

        let (out, injection) = inject_runtime_scripts(&html, &reference, &runtimes());

        assert_eq!(injection, Injection::AlreadyPresent);
        assert_eq!(out, html);
    }

    #[test]
    fn test_inject_moves_head_bundle_after_body_runtimes() {
        let html = format!(
            "<html><head><script type=\"module\" src=\"./assets/index-abc.js\"></script></head>\n<body>\n{}\n{}\n</body></html>",
            script_tag(REACT_UMD),
            script_tag(REACT_DOM_UMD)
        );
        let doc = EntryDocument {
            path: PathBuf::from("index.html"),
            content: html,
        };

        let result = doc.rewrite(&RewriteConfig::default(), &RuntimeConfig::default(), "assets");

        assert_eq!(
            result.injection,
            Injection::Injected {
                src: "./assets/index-abc.js".to_string(),
                runtimes: 0,
            }
        );
        let react = result.html.find(REACT_UMD).unwrap();
        let react_dom = result.html.find(REACT_DOM_UMD).unwrap();
        let bundle = result.html.find("./assets/index-abc.js").unwrap();
        assert!(react < react_dom && react_dom < bundle);
        assert_eq!(result.html.matches(REACT_UMD).count(), 1);
        assert_eq!(result.html.matches(REACT_DOM_UMD).count(), 1);
        assert_eq!(result.html.matches("./assets/index-abc.js").count(), 1);

        let again = EntryDocument {
            content: result.html.clone(),
            ..doc
        }
        .rewrite(&RewriteConfig::default(), &RuntimeConfig::default(), "assets");
        assert_eq!(again.injection, Injection::AlreadyPresent);
        assert_eq!(again.html, result.html);
    }

    #[test]
    fn test_inject_adds_only_missing_runtime() {
        let html = format!(
            "<head><script src=\"./assets/app.js\"></script></head><body>{}</body>",
            script_tag(REACT_UMD)
        );
        let reference = locate_bundle_reference(&html, "assets").unwrap();

        let (out, injection) = inject_runtime_scripts(&html, &reference, &runtimes());

        assert_eq!(
            injection,
            Injection::Injected {
                src: "./assets/app.js".to_string(),
                runtimes: 1,
            }
        );
        assert_eq!(
            out,
            format!(
                "<head></head><body>{}{}\n{}\n</body>",
                script_tag(REACT_UMD),
                script_tag(REACT_DOM_UMD),
                script_tag("./assets/app.js")
            )
        );
    }

    #[test]
    fn test_inject_without_runtimes_normalises_tag_in_place() {
        let html = r#"<head><script crossorigin src="./assets/app.js"></script></head><body></body>"#;
        let reference = locate_bundle_reference(html, "assets").unwrap();

        let (out, injection) = inject_runtime_scripts(html, &reference, &[]);

        assert_eq!(
            injection,
            Injection::Injected {
                src: "./assets/app.js".to_string(),
                runtimes: 0,
            }
        );
        assert_eq!(out, r#"<head><script src="./assets/app.js"></script></head><body></body>"#);

        let reference = locate_bundle_reference(&out, "assets").unwrap();
        let (again, _) = inject_runtime_scripts(&out, &reference, &[]);
        assert_eq!(again, out);
    }

    #[test]
    fn test_rewrite_keeps_crossorigin_when_disabled() {
        let doc = EntryDocument {
            path: PathBuf::from("index.html"),
            content: VITE_INDEX.to_string(),
        };
        let rewrite = RewriteConfig {
            strip_crossorigin: false,
            ..RewriteConfig::default()
        };

        let result = doc.rewrite(&rewrite, &RuntimeConfig::default(), "assets");

        assert_eq!(result.crossorigin_removed, 0);
        assert!(result.html.contains("crossorigin"));
    }

    #[test]
    fn test_rewrite_twice_is_stable() {
        let doc = EntryDocument {
            path: PathBuf::from("index.html"),
            content: VITE_INDEX.to_string(),
        };
        let first = doc.rewrite(&RewriteConfig::default(), &RuntimeConfig::default(), "assets");
        let again = EntryDocument {
            content: first.html.clone(),
            ..doc
        }
        .rewrite(&RewriteConfig::default(), &RuntimeConfig::default(), "assets");

        assert_eq!(again.injection, Injection::AlreadyPresent);
        assert_eq!(again.html, first.html);
    }

    #[test]
    fn test_rewrite_without_bundle_reference() {
        let doc = EntryDocument {
            path: PathBuf::from("index.html"),
            content: "<html><body><p>static</p></body></html>".to_string(),
        };
        let result = doc.rewrite(&RewriteConfig::default(), &RuntimeConfig::default(), "assets");

        assert_eq!(result.injection, Injection::NoBundleReference);
        assert_eq!(result.html, doc.content);
    }
}
