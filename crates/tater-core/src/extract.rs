//! Extraction walks over a parsed entry point.
//!
//! Styles and scripts are collected in document order by two separate walks.
//! Each walk first gathers its sources synchronously, then processes them one
//! at a time, so chunk order is document order regardless of how long any
//! read takes.

use crate::context::RewriteContext;
use crate::css::rewrite_css;
use crate::html::HtmlNode;
use crate::js_rewrite::rewrite_class_constants;
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// A stylesheet found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSource {
    /// `<style>` content
    Inline(String),
    /// `href` of `<link rel="stylesheet">`
    Linked(String),
}

/// A script found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// `<script>` content
    Inline(String),
    /// `src` of `<script src>`
    Linked(String),
}

/// Stylesheets in document order.
pub fn collect_styles(node: &HtmlNode) -> Vec<StyleSource> {
    fn walk(node: &HtmlNode, out: &mut Vec<StyleSource>) {
        if let HtmlNode::Element(element) = node {
            if element.is_style() {
                out.push(StyleSource::Inline(element.text_content()));
                return;
            }
            if element.is_stylesheet_link() {
                match element.attr("href").map(str::trim) {
                    Some(href) if !href.is_empty() => {
                        out.push(StyleSource::Linked(href.to_string()));
                    }
                    _ => {}
                }
                return;
            }
        }
        for child in node.children() {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    walk(node, &mut out);
    out
}

/// Scripts in document order. A `<script>` with a non-empty `src` ignores
/// its content.
pub fn collect_scripts(node: &HtmlNode) -> Vec<ScriptSource> {
    fn walk(node: &HtmlNode, out: &mut Vec<ScriptSource>) {
        if let HtmlNode::Element(element) = node {
            if element.is_script() {
                let source = match element.attr("src").map(str::trim) {
                    Some(src) if !src.is_empty() => ScriptSource::Linked(src.to_string()),
                    _ => ScriptSource::Inline(element.text_content()),
                };
                out.push(source);
                return;
            }
        }
        for child in node.children() {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    walk(node, &mut out);
    out
}

/// Asset references in markup attributes, in document order, deduplicated.
pub fn collect_asset_links(node: &HtmlNode) -> Vec<String> {
    fn walk(node: &HtmlNode, out: &mut Vec<String>) {
        if let HtmlNode::Element(element) = node {
            if element.is_inlined() {
                return;
            }
            for name in element.asset_attributes() {
                if let Some(value) = element.attr(name).map(str::trim) {
                    if !value.is_empty() && !out.iter().any(|v| v == value) {
                        out.push(value.to_string());
                    }
                }
            }
        }
        for child in node.children() {
            walk(child, out);
        }
    }
    let mut out = Vec::new();
    walk(node, &mut out);
    out
}

pub(crate) async fn read_text(ctx: &RewriteContext, path: &Path) -> Result<String> {
    let bytes = ctx.runtime.read_file(path).await?;
    String::from_utf8(bytes).map_err(|e| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} is not valid UTF-8: {}", path.display(), e),
        ))
    })
}

/// Rewritten CSS chunks of the document, in document order.
pub async fn extract_css(ctx: &RewriteContext, document: &HtmlNode) -> Result<Vec<String>> {
    let mut chunks = Vec::new();
    for source in collect_styles(document) {
        let chunk = match source {
            StyleSource::Inline(text) => rewrite_css(ctx, &text, None).await?,
            StyleSource::Linked(href) => {
                let path = ctx.resolve_inlined("link", "href", &href)?;
                let text = read_text(ctx, &path).await?;
                rewrite_css(ctx, &text, Some(&path)).await?
            }
        };
        tracing::debug!(bytes = chunk.len(), "extracted css chunk");
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Rewritten JS chunks of the document, in document order.
pub async fn extract_js(ctx: &RewriteContext, document: &HtmlNode) -> Result<Vec<String>> {
    let mut chunks = Vec::new();
    for source in collect_scripts(document) {
        let (text, path): (String, Option<PathBuf>) = match source {
            ScriptSource::Inline(text) => (text, None),
            ScriptSource::Linked(src) => {
                let path = ctx.resolve_inlined("script", "src", &src)?;
                (read_text(ctx, &path).await?, Some(path))
            }
        };

        let chunk = if ctx.js_class_scope.applies_to(path.as_deref()) {
            rewrite_class_constants(&text, &ctx.classes).into_owned()
        } else {
            text
        };
        tracing::debug!(bytes = chunk.len(), "extracted js chunk");
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Rename every local asset referenced from markup attributes.
///
/// Returns the public URL for each original attribute value.
pub async fn resolve_markup_assets(
    ctx: &RewriteContext,
    document: &HtmlNode,
) -> Result<FxHashMap<String, String>> {
    let mut renamed = FxHashMap::default();
    for link in collect_asset_links(document) {
        if let Some(url) = ctx.rename_asset(&link, &ctx.src_root).await? {
            renamed.insert(link, url);
        }
    }
    Ok(renamed)
}
