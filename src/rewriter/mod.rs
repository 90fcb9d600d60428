//! Rewrite pipeline
//!
//! One pass per invocation: locate and read both artifacts, rewrite them in
//! memory, then write back whatever changed. All reads happen before the first
//! write, so a missing input leaves the output tree untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::bundle::{self, BundleAsset, BundleRewrite};
use crate::config::Config;
use crate::document::{locate_bundle_reference, DocumentRewrite, EntryDocument, Injection};
use crate::error::RewriteError;

/// Options taken from the command line
#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    /// Replaces `output.dir` from the config
    pub dist_dir: Option<PathBuf>,

    /// Report what would change without writing
    pub dry_run: bool,
}

/// Why an artifact was left as it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No script tag references the asset directory
    NoBundleReference,
    /// The document has no `</body>` to insert before
    NoBodyClose,
    /// Runtime scripts were injected by an earlier run
    RuntimeAlreadyPresent,
    /// Bundle tag is already plain and no runtimes are configured
    BundleTagInPlace,
    /// No `.js` file in the asset directory
    NoBundleFile,
    /// Bundle is already a wrapped, module-free script
    AlreadyPlainScript,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SkipReason::NoBundleReference => "no local bundle script tag",
            SkipReason::NoBodyClose => "no closing </body> tag",
            SkipReason::RuntimeAlreadyPresent => "runtime scripts already present",
            SkipReason::BundleTagInPlace => "bundle script tag already in place",
            SkipReason::NoBundleFile => "no .js bundle found",
            SkipReason::AlreadyPlainScript => "already a plain script",
        };
        f.write_str(text)
    }
}

/// What happened to one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rewritten {
        path: PathBuf,
        before: usize,
        after: usize,
    },
    Unchanged {
        path: PathBuf,
        reason: SkipReason,
    },
}

impl Outcome {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, Outcome::Rewritten { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            Outcome::Rewritten { path, .. } | Outcome::Unchanged { path, .. } => path,
        }
    }
}

/// Result of a rewrite run
#[derive(Debug, Clone)]
pub struct RewriteReport {
    pub document: Outcome,
    pub bundle: Outcome,
    pub dry_run: bool,
}

/// Pending output for one artifact
struct Planned {
    path: PathBuf,
    original: String,
    rewritten: String,
}

impl Planned {
    fn changed(&self) -> bool {
        self.original != self.rewritten
    }
}

/// Drives a single rewrite of a bundler output tree
pub struct Rewriter {
    config: Config,
    options: RewriteOptions,
}

impl Rewriter {
    pub fn new(config: Config, options: RewriteOptions) -> Self {
        Self { config, options }
    }

    /// Run the pipeline
    pub fn run(&self) -> Result<RewriteReport, RewriteError> {
        let start = Instant::now();
        let dist = self.options.dist_dir.as_deref();

        // 1. Locate and read everything up front
        info!("Locating build output...");
        let html_path = self.config.html_path(dist);
        let assets_path = self.config.assets_path(dist);

        let document = EntryDocument::read(&html_path)?;
        let reference = locate_bundle_reference(&document.content, &self.config.output.assets);
        let referenced = reference.as_ref().map(|r| r.filename.as_str());
        let bundle = match bundle::locate_referenced_bundle(&assets_path, referenced)? {
            Some(path) => Some(BundleAsset::read(&path)?),
            None => {
                info!("No .js bundle in {}, skipping bundle rewrite", assets_path.display());
                None
            }
        };

        // 2. Rewrite in memory
        info!("Rewriting entry document...");
        let doc_result = document.rewrite(
            &self.config.rewrite,
            &self.config.runtime,
            &self.config.output.assets,
        );
        let (doc_plan, doc_reason) = self.plan_document(&document, doc_result);

        let bundle_plan = bundle.as_ref().map(|asset| {
            info!("Rewriting bundle {}...", asset.path.display());
            let result = asset.rewrite(&self.config.rewrite);
            plan_bundle(asset, result)
        });

        // 3. Write back
        if self.options.dry_run {
            info!("Dry run, nothing written");
        } else {
            write_if_changed(&doc_plan)?;
            if let Some(plan) = &bundle_plan {
                write_if_changed(plan)?;
            }
        }

        let document = outcome(&doc_plan, doc_reason);
        let bundle = match &bundle_plan {
            Some(plan) => outcome(plan, SkipReason::AlreadyPlainScript),
            None => Outcome::Unchanged {
                path: assets_path,
                reason: SkipReason::NoBundleFile,
            },
        };

        debug!("Rewrite completed in {:?}", start.elapsed());

        Ok(RewriteReport {
            document,
            bundle,
            dry_run: self.options.dry_run,
        })
    }

    fn plan_document(
        &self,
        document: &EntryDocument,
        result: DocumentRewrite,
    ) -> (Planned, SkipReason) {
        // The reason is only reported if the document ends up unchanged
        let reason = match &result.injection {
            Injection::Injected { src, runtimes } => {
                debug!("Injected {} runtime script(s) ahead of {}", runtimes, src);
                SkipReason::BundleTagInPlace
            }
            Injection::AlreadyPresent => {
                info!("Runtime scripts already present, skipping injection");
                SkipReason::RuntimeAlreadyPresent
            }
            Injection::NoBundleReference => {
                info!(
                    "No script tag references {}/, skipping injection",
                    self.config.output.assets
                );
                SkipReason::NoBundleReference
            }
            Injection::NoBodyClose => {
                warn!(
                    "{} has no closing </body> tag, runtime scripts not injected",
                    document.path.display()
                );
                SkipReason::NoBodyClose
            }
        };

        let plan = Planned {
            path: document.path.clone(),
            original: document.content.clone(),
            rewritten: result.html,
        };

        (plan, reason)
    }
}

fn plan_bundle(asset: &BundleAsset, result: BundleRewrite) -> Planned {
    Planned {
        path: asset.path.clone(),
        original: asset.content.clone(),
        rewritten: result.source,
    }
}

fn write_if_changed(plan: &Planned) -> Result<(), RewriteError> {
    if !plan.changed() {
        return Ok(());
    }

    debug!("Writing {}", plan.path.display());
    fs::write(&plan.path, &plan.rewritten).map_err(|e| RewriteError::Write {
        path: plan.path.clone(),
        source: e,
    })
}

fn outcome(plan: &Planned, unchanged_reason: SkipReason) -> Outcome {
    if plan.changed() {
        Outcome::Rewritten {
            path: plan.path.clone(),
            before: plan.original.len(),
            after: plan.rewritten.len(),
        }
    } else {
        Outcome::Unchanged {
            path: plan.path.clone(),
            reason: unchanged_reason,
        }
    }
}
