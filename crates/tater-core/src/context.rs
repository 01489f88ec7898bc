//! Shared state threaded through one entry point's rewrite.

use crate::asset_map::{AssetRecord, AssetRenameTable};
use crate::class_map::ClassSubstitutionTable;
use crate::config::JsClassScope;
use crate::runtime::Runtime;
use crate::{Error, Result};
use parking_lot::Mutex;
use path_clean::PathClean;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

static EXTERNAL_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]+:)?//").expect("valid regex")
});

static URI_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid regex")
});

/// A link is external when it carries a query string or names a host,
/// either with a scheme (`https://`) or protocol-relative (`//cdn`).
pub fn is_external_link(link: &str) -> bool {
    link.contains('?') || EXTERNAL_LINK.is_match(link)
}

/// Whether `link` refers to a file in the source tree.
///
/// Excludes external links, fragment-only references and any other URI
/// scheme (`data:`, `mailto:`).
pub fn is_local_reference(link: &str) -> bool {
    let link = link.trim();
    !link.is_empty()
        && !link.starts_with('#')
        && !is_external_link(link)
        && !URI_SCHEME.is_match(link)
}

/// Per entry point view of the run-scoped tables.
///
/// The tables are shared by every entry point; `referenced` collects the
/// assets this entry point needs so they can be copied once its document
/// is written.
#[derive(Debug)]
pub struct RewriteContext {
    pub classes: Arc<ClassSubstitutionTable>,
    pub assets: Arc<AssetRenameTable>,
    pub runtime: Arc<dyn Runtime>,
    /// Root of the source tree, target of `/`-rooted references
    pub src_root: PathBuf,
    /// Directory renamed assets are copied into
    pub asset_output_dir: PathBuf,
    /// Relative URL prefix of renamed assets, empty for the document directory
    pub asset_url_prefix: String,
    pub js_class_scope: JsClassScope,
    referenced: Mutex<Vec<AssetRecord>>,
}

impl RewriteContext {
    pub fn new(
        classes: Arc<ClassSubstitutionTable>,
        assets: Arc<AssetRenameTable>,
        runtime: Arc<dyn Runtime>,
        src_root: impl Into<PathBuf>,
    ) -> Self {
        let src_root = src_root.into();
        Self {
            classes,
            assets,
            runtime,
            asset_output_dir: src_root.clone(),
            src_root,
            asset_url_prefix: String::new(),
            js_class_scope: JsClassScope::Everywhere,
            referenced: Mutex::new(Vec::new()),
        }
    }

    pub fn with_asset_output(mut self, dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        self.asset_output_dir = dir.into();
        self.asset_url_prefix = url_prefix.into();
        self
    }

    pub fn with_js_class_scope(mut self, scope: JsClassScope) -> Self {
        self.js_class_scope = scope;
        self
    }

    /// Resolve a local link against `base_dir`, or the source root when the
    /// link starts with `/`.
    pub fn resolve(&self, link: &str, base_dir: &Path) -> PathBuf {
        match link.strip_prefix('/') {
            Some(rooted) => self.src_root.join(rooted).clean(),
            None => base_dir.join(link).clean(),
        }
    }

    /// Resolve the `attribute` link of a `<tag>` that will be inlined.
    ///
    /// External links are never fetched.
    pub fn resolve_inlined(&self, tag: &str, attribute: &str, link: &str) -> Result<PathBuf> {
        if is_external_link(link) || URI_SCHEME.is_match(link) {
            return Err(Error::UnsupportedReference {
                tag: tag.to_string(),
                attribute: attribute.to_string(),
                url: link.to_string(),
            });
        }
        Ok(self.resolve(link, &self.src_root))
    }

    /// Rename the asset `link` points at and return its public URL.
    ///
    /// Returns `None` for links that do not refer to a local file. A fragment
    /// (`font.svg#icons`) is kept on the rewritten URL.
    pub async fn rename_asset(&self, link: &str, base_dir: &Path) -> Result<Option<String>> {
        if !is_local_reference(link) {
            return Ok(None);
        }
        let (path, fragment) = match link.trim().split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (link.trim(), None),
        };

        let source = self.resolve(path, base_dir);
        let record = self
            .assets
            .associate(&source.to_string_lossy(), &self.asset_output_dir)
            .await?;

        let mut url = self.public_url(&record.name);
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }
        self.referenced.lock().push(record);
        Ok(Some(url))
    }

    /// URL of a renamed asset relative to the output documents.
    pub fn public_url(&self, name: &str) -> String {
        if self.asset_url_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.asset_url_prefix, name)
        }
    }

    /// Assets referenced so far by this entry point.
    pub fn take_referenced(&self) -> Vec<AssetRecord> {
        std::mem::take(&mut *self.referenced.lock())
    }
}
