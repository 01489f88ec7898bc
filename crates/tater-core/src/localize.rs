//! `#lang#KEY#` placeholder substitution.

use crate::config::ConfigError;
use crate::html::HtmlNode;
use crate::runtime::Runtime;
use regex::{Captures, Regex};
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#lang#([A-Za-z0-9_.\-]+)#").expect("valid regex"));

/// Localization dictionary, immutable once loaded.
///
/// Without a dictionary every placeholder counts as missing.
#[derive(Debug, Clone, Default)]
pub struct Localizer {
    dictionary: Option<FxHashMap<String, String>>,
}

impl Localizer {
    /// A localizer without a dictionary.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_map(dictionary: FxHashMap<String, String>) -> Self {
        Self {
            dictionary: Some(dictionary),
        }
    }

    /// Parse a flat JSON object of string values.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let serde_json::Value::Object(object) = value else {
            return Err("expected a JSON object at the top level".to_string());
        };

        let mut dictionary = FxHashMap::default();
        for (key, value) in object {
            match value {
                serde_json::Value::String(text) => {
                    dictionary.insert(key, text);
                }
                other => {
                    return Err(format!(
                        "value of '{}' must be a string, found {}",
                        key,
                        json_kind(&other)
                    ));
                }
            }
        }
        Ok(Self::from_map(dictionary))
    }

    /// Load the dictionary file, if one is configured.
    pub async fn load(runtime: &dyn Runtime, path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::none());
        };
        let invalid = |message: String| ConfigError::LangFileInvalid {
            path: path.to_path_buf(),
            message,
        };

        let bytes = runtime
            .read_file(path)
            .await
            .map_err(|e| invalid(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
        let localizer = Self::from_json(&text).map_err(invalid)?;

        tracing::debug!(path = %path.display(), keys = localizer.len(), "loaded localization");
        Ok(localizer)
    }

    pub fn len(&self) -> usize {
        self.dictionary.as_ref().map_or(0, FxHashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace every placeholder in `text`; unknown keys are left in place and
    /// recorded in `missing`.
    pub fn apply<'t>(&self, text: &'t str, missing: &mut BTreeSet<String>) -> Cow<'t, str> {
        if !text.contains("#lang#") {
            return Cow::Borrowed(text);
        }
        PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
            let key = &caps[1];
            match self.dictionary.as_ref().and_then(|d| d.get(key)) {
                Some(value) => value.clone(),
                None => {
                    missing.insert(key.to_string());
                    caps[0].to_string()
                }
            }
        })
    }

    /// Record keys missing from text and attribute values of `node`.
    ///
    /// Inlined elements are skipped; their sources are checked once bundled.
    pub fn collect_missing(&self, node: &HtmlNode, missing: &mut BTreeSet<String>) {
        match node {
            HtmlNode::Text(text) => {
                self.apply(text, missing);
            }
            HtmlNode::Element(element) if element.is_inlined() => {}
            HtmlNode::Element(element) => {
                for attr in &element.attrs {
                    self.apply(&attr.value, missing);
                }
                for child in &element.children {
                    self.collect_missing(child, missing);
                }
            }
            HtmlNode::Document { children } => {
                for child in children {
                    self.collect_missing(child, missing);
                }
            }
            HtmlNode::Doctype { .. } | HtmlNode::Comment(_) => {}
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
