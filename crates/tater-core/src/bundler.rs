//! Bundle assembly.
//!
//! [`Bundler::bundle`] validates the configuration, discovers the entry
//! points and runs them concurrently over one pair of substitution tables.
//! Each entry point is extracted, localized, compiled, emitted and written
//! before its assets are copied; the first failure aborts the run.

use crate::asset_map::AssetRenameTable;
use crate::class_map::ClassSubstitutionTable;
use crate::config::BundleConfig;
use crate::context::RewriteContext;
use crate::extract::{extract_css, extract_js, read_text, resolve_markup_assets};
use crate::html::{HtmlEmitter, parse_html};
use crate::js_rewrite::unused_class_constants;
use crate::localize::Localizer;
use crate::runtime::{CachedRuntime, NativeRuntime, Runtime};
use crate::toolchain::{CssMinifier, JsCompiler, LightningMinifier, OxcCompiler, Passthrough};
use crate::{Error, Result};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extensions of files treated as entry points.
const ENTRY_EXTENSIONS: &[&str] = &["html", "htm"];

/// One written document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Size of the inlined stylesheet after minification
    pub css_bytes: usize,
    /// Size of the inlined script after compilation
    pub js_bytes: usize,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BundleReport {
    /// Entry points in name order
    pub entries: Vec<EntryReport>,
    pub assets_copied: usize,
    /// Classes styled but never referenced from markup or scripts
    pub orphan_classes: Vec<String>,
    /// `CSS_*` constants declared but never used, across all entry points
    pub unused_js_constants: Vec<String>,
}

struct EntryOutcome {
    report: EntryReport,
    unused_js_constants: Vec<String>,
    assets_copied: usize,
}

/// Bundles every entry point of a source directory.
#[derive(Debug, Clone)]
pub struct Bundler {
    config: BundleConfig,
    runtime: Arc<dyn Runtime>,
    js_compiler: Arc<dyn JsCompiler>,
    css_minifier: Arc<dyn CssMinifier>,
}

impl Bundler {
    /// Bundler over the real filesystem with the default toolchain, or
    /// pass-through tools when minification is disabled.
    pub fn new(config: BundleConfig) -> Self {
        let (js_compiler, css_minifier): (Arc<dyn JsCompiler>, Arc<dyn CssMinifier>) =
            if config.minify {
                (Arc::new(OxcCompiler), Arc::new(LightningMinifier))
            } else {
                (Arc::new(Passthrough), Arc::new(Passthrough))
            };
        Self {
            config,
            runtime: Arc::new(CachedRuntime::new(NativeRuntime::new())),
            js_compiler,
            css_minifier,
        }
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_js_compiler(mut self, compiler: Arc<dyn JsCompiler>) -> Self {
        self.js_compiler = compiler;
        self
    }

    pub fn with_css_minifier(mut self, minifier: Arc<dyn CssMinifier>) -> Self {
        self.css_minifier = minifier;
        self
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Run the whole bundle.
    pub async fn bundle(&self) -> Result<BundleReport> {
        let runtime = self.runtime.as_ref();
        self.config.validate(runtime).await?;
        let localizer = Localizer::load(runtime, self.config.lang_file.as_deref()).await?;

        self.prepare_destination().await?;
        let entries = self.discover_entries().await?;
        tracing::info!(
            src = %self.config.src_dir.display(),
            entries = entries.len(),
            "bundling"
        );

        let classes = Arc::new(ClassSubstitutionTable::new());
        let assets = Arc::new(AssetRenameTable::new(self.runtime.clone()));

        let outcomes = try_join_all(
            entries
                .iter()
                .map(|entry| self.bundle_entry(entry, &classes, &assets, &localizer)),
        )
        .await?;

        let orphan_classes = classes.orphans();
        for class in &orphan_classes {
            tracing::debug!(class = %class, "class is styled but never used in markup or scripts");
        }

        let mut report = BundleReport {
            orphan_classes,
            ..BundleReport::default()
        };
        for outcome in outcomes {
            report.assets_copied += outcome.assets_copied;
            report.unused_js_constants.extend(outcome.unused_js_constants);
            report.entries.push(outcome.report);
        }
        report.unused_js_constants.sort();
        report.unused_js_constants.dedup();

        tracing::info!(
            entries = report.entries.len(),
            classes = classes.len(),
            assets = report.assets_copied,
            "bundle complete"
        );
        Ok(report)
    }

    /// Delete a forced destination, then create it and the asset directory.
    async fn prepare_destination(&self) -> Result<()> {
        let dst = &self.config.dst_dir;
        if self.config.force_delete_dst && self.runtime.exists(dst) {
            tracing::debug!(dst = %dst.display(), "removing existing destination");
            self.runtime.remove_dir_all(dst).await?;
        }
        self.runtime.create_dir(dst, true).await?;
        self.runtime
            .create_dir(&self.config.asset_output_dir(), true)
            .await?;
        Ok(())
    }

    /// HTML files directly inside the source directory, sorted by name.
    async fn discover_entries(&self) -> Result<Vec<PathBuf>> {
        let src = &self.config.src_dir;
        let mut entries = Vec::new();
        for name in self.runtime.read_dir(src).await? {
            let path = src.join(&name);
            let is_entry = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| ENTRY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_entry && self.runtime.metadata(&path).await?.is_file {
                entries.push(path);
            }
        }
        entries.sort();
        Ok(entries)
    }

    async fn bundle_entry(
        &self,
        source: &Path,
        classes: &Arc<ClassSubstitutionTable>,
        assets: &Arc<AssetRenameTable>,
        localizer: &Localizer,
    ) -> Result<EntryOutcome> {
        let ctx = RewriteContext::new(
            classes.clone(),
            assets.clone(),
            self.runtime.clone(),
            &self.config.src_dir,
        )
        .with_asset_output(
            self.config.asset_output_dir(),
            self.config.asset_url_prefix(),
        )
        .with_js_class_scope(self.config.js_class_scope.clone());

        let document = parse_html(&read_text(&ctx, source).await?);
        let css_chunks = extract_css(&ctx, &document).await?;
        let js_chunks = extract_js(&ctx, &document).await?;
        let markup_assets = resolve_markup_assets(&ctx, &document).await?;

        let mut missing = BTreeSet::new();
        let css = localizer
            .apply(&css_chunks.join("\n"), &mut missing)
            .into_owned();
        let js = localizer
            .apply(&js_chunks.join(";\n"), &mut missing)
            .into_owned();
        localizer.collect_missing(&document, &mut missing);
        if !missing.is_empty() {
            return Err(Error::MissingLocalization {
                keys: missing.into_iter().collect(),
            });
        }

        let unused_js_constants = unused_class_constants(&js);
        for name in &unused_js_constants {
            tracing::debug!(
                entry = %source.display(),
                constant = %name,
                "class constant is declared but never used"
            );
        }

        let css = if css.trim().is_empty() {
            String::new()
        } else {
            self.css_minifier
                .minify(&css)
                .map_err(|diagnostics| Error::Compile {
                    tool: "CSS minifier",
                    diagnostics,
                })?
        };
        let js = if js.trim().is_empty() {
            String::new()
        } else {
            self.js_compiler
                .compile(&wrap_script(&js))
                .map_err(|diagnostics| Error::Compile {
                    tool: "JS compiler",
                    diagnostics,
                })?
        };

        let html = HtmlEmitter::new(&ctx.classes, localizer)
            .with_assets(&markup_assets)
            .with_bundles(&css, &js)
            .emit(&document);

        let file_name = source.file_name().unwrap_or(source.as_os_str());
        let output = self.config.dst_dir.join(file_name);
        self.runtime.write_file(&output, html.as_bytes()).await?;

        let assets_copied = self.copy_assets(&ctx).await?;
        tracing::info!(
            entry = %output.display(),
            css_bytes = css.len(),
            js_bytes = js.len(),
            assets = assets_copied,
            "wrote entry point"
        );

        Ok(EntryOutcome {
            report: EntryReport {
                source: source.to_path_buf(),
                output,
                css_bytes: css.len(),
                js_bytes: js.len(),
            },
            unused_js_constants,
            assets_copied,
        })
    }

    /// Copy the assets this entry point referenced that no other entry point
    /// has copied yet.
    async fn copy_assets(&self, ctx: &RewriteContext) -> Result<usize> {
        let mut copied = 0;
        for record in ctx.take_referenced() {
            if !ctx.assets.claim_copy(&record) {
                continue;
            }
            self.runtime
                .copy_file(&record.source_path, &record.destination_path)
                .await?;
            tracing::debug!(
                from = %record.source_path.display(),
                to = %record.destination_path.display(),
                "copied asset"
            );
            copied += 1;
        }
        Ok(copied)
    }
}

/// Enclose the script bundle in one strict function scope.
fn wrap_script(js: &str) -> String {
    format!("(function(window,document){{'use strict';\n{js}\n}})(window,document);")
}
