//! Final markup emission.
//!
//! Re-walks the document in order and writes compact markup: inlined
//! elements are dropped, `class` tokens and asset references are substituted,
//! placeholders are localized, comments are removed, and the bundles are
//! injected at the end of `<head>` and `<body>`.

use super::{HtmlElement, HtmlNode, is_self_closing};
use crate::class_map::{ClassSubstitutionTable, UsageKind};
use crate::localize::Localizer;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Elements whose text is emitted verbatim.
const RAW_TEXT_TAGS: &[&str] = &["iframe", "noembed", "noframes", "noscript", "plaintext", "xmp"];

/// Elements whose whitespace is significant.
const PREFORMATTED_TAGS: &[&str] = &["pre", "textarea", "listing"];

pub struct HtmlEmitter<'a> {
    classes: &'a ClassSubstitutionTable,
    localizer: &'a Localizer,
    assets: Option<&'a FxHashMap<String, String>>,
    css: &'a str,
    js: &'a str,
}

impl<'a> HtmlEmitter<'a> {
    pub fn new(classes: &'a ClassSubstitutionTable, localizer: &'a Localizer) -> Self {
        Self {
            classes,
            localizer,
            assets: None,
            css: "",
            js: "",
        }
    }

    /// Asset attribute values to replace, keyed by their trimmed source text.
    pub fn with_assets(mut self, assets: &'a FxHashMap<String, String>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Bundles to inject; empty bundles inject nothing.
    pub fn with_bundles(mut self, css: &'a str, js: &'a str) -> Self {
        self.css = css;
        self.js = js;
        self
    }

    pub fn emit(&self, document: &HtmlNode) -> String {
        let mut out = String::new();
        self.write_node(document, TextMode::Collapse, &mut out);
        out
    }

    fn write_node(&self, node: &HtmlNode, mode: TextMode, out: &mut String) {
        match node {
            HtmlNode::Document { children } => {
                for child in children {
                    self.write_node(child, mode, out);
                }
            }
            HtmlNode::Doctype { name } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(if name.is_empty() { "html" } else { name });
                out.push('>');
            }
            HtmlNode::Text(text) => self.write_text(text, mode, out),
            HtmlNode::Comment(_) => {}
            HtmlNode::Element(element) if element.is_inlined() => {}
            HtmlNode::Element(element) => self.write_element(element, mode, out),
        }
    }

    fn write_element(&self, element: &HtmlElement, mode: TextMode, out: &mut String) {
        out.push('<');
        out.push_str(&element.name);
        for attr in &element.attrs {
            let value = self.attribute_value(element, &attr.name, &attr.value);
            out.push(' ');
            out.push_str(&attr.name);
            if !value.is_empty() {
                out.push('=');
                write_attribute_value(&value, out);
            }
        }
        out.push('>');

        if element.children.is_empty() && is_self_closing(&element.name) {
            return;
        }

        let name = element.name.as_str();
        let mode = if RAW_TEXT_TAGS.contains(&name) {
            TextMode::Raw
        } else if PREFORMATTED_TAGS.contains(&name) {
            TextMode::Preserve
        } else {
            mode
        };
        for child in &element.children {
            self.write_node(child, mode, out);
        }

        match name {
            "head" if !self.css.is_empty() => {
                out.push_str("<style>");
                out.push_str(&escape_closing_tag(self.css, "</style"));
                out.push_str("</style>");
            }
            "body" if !self.js.is_empty() => {
                out.push_str("<script>");
                out.push_str(&escape_closing_tag(self.js, "</script"));
                out.push_str("</script>");
            }
            _ => {}
        }

        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }

    fn attribute_value(&self, element: &HtmlElement, name: &str, raw: &str) -> String {
        let trimmed = raw.trim();
        if let Some(renamed) = self
            .assets
            .filter(|_| element.is_asset_attribute(name))
            .and_then(|assets| assets.get(trimmed))
        {
            return renamed.clone();
        }

        let collapsed = collapse_whitespace(trimmed);
        let mut missing = BTreeSet::new();
        let value = self.localizer.apply(&collapsed, &mut missing);

        if name == "class" {
            value
                .split(' ')
                .filter(|class| !class.is_empty())
                .map(|class| self.classes.associate(class, UsageKind::Html))
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            value.into_owned()
        }
    }

    fn write_text(&self, text: &str, mode: TextMode, out: &mut String) {
        let mut missing = BTreeSet::new();
        let text = self.localizer.apply(text, &mut missing);
        match mode {
            TextMode::Raw => out.push_str(&text),
            TextMode::Preserve => escape_text(&text, out),
            TextMode::Collapse => escape_text(&collapse_whitespace(&text), out),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    Collapse,
    Preserve,
    Raw,
}

/// Runs of ASCII whitespace become a single space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

/// Unquoted when possible, otherwise double quotes, single quotes when the
/// value holds a double quote.
fn write_attribute_value(value: &str, out: &mut String) {
    let escaped = value.replace('&', "&amp;");
    let needs_quotes = value
        .chars()
        .any(|c| c.is_ascii_whitespace() || matches!(c, '"' | '\'' | '=' | '<' | '>' | '`'));

    if !needs_quotes {
        out.push_str(&escaped);
    } else if !value.contains('"') {
        out.push('"');
        out.push_str(&escaped);
        out.push('"');
    } else if !value.contains('\'') {
        out.push('\'');
        out.push_str(&escaped);
        out.push('\'');
    } else {
        out.push('"');
        out.push_str(&escaped.replace('"', "&quot;"));
        out.push('"');
    }
}

/// Keep an inlined bundle from terminating its own element early.
fn escape_closing_tag(source: &str, closing: &str) -> String {
    let replacement = format!("<\\/{}", &closing[2..]);
    source.replace(closing, &replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    fn emit(html: &str, classes: &ClassSubstitutionTable) -> String {
        let localizer = Localizer::none();
        HtmlEmitter::new(classes, &localizer).emit(&parse_html(html))
    }

    #[test]
    fn test_class_tokens_are_substituted() {
        let classes = ClassSubstitutionTable::new();
        let css = classes.associate(".foo", UsageKind::Css);
        let out = emit(r#"<div class="  foo   bar ">x</div>"#, &classes);

        let foo = css.trim_start_matches('.');
        let bar = classes.substitute("bar").unwrap();
        assert!(out.contains(&format!(r#"<div class="{foo} {bar}">x</div>"#)), "{out}");
        assert!(classes.usage(UsageKind::Html).contains("foo"));
    }

    #[test]
    fn test_single_class_is_unquoted() {
        let classes = ClassSubstitutionTable::new();
        let out = emit(r#"<p class="only">x</p>"#, &classes);
        assert!(out.contains("<p class=_>x</p>"), "{out}");
    }

    #[test]
    fn test_inlined_elements_and_comments_are_dropped() {
        let classes = ClassSubstitutionTable::new();
        let out = emit(
            r#"<!DOCTYPE html><html><head><link rel="stylesheet" href="a.css"><style>.a{}</style></head>
               <body><!-- note --><script>run()</script><p>kept</p></body></html>"#,
            &classes,
        );
        assert!(out.starts_with("<!DOCTYPE html><html><head>"), "{out}");
        assert!(!out.contains("a.css"));
        assert!(!out.contains("<style>"));
        assert!(!out.contains("<script>"));
        assert!(!out.contains("note"));
        assert!(out.contains("<p>kept</p>"));
    }

    #[test]
    fn test_bundles_are_injected_when_non_empty() {
        let classes = ClassSubstitutionTable::new();
        let localizer = Localizer::none();
        let doc = parse_html("<html><head><title>T</title></head><body><p>x</p></body></html>");

        let out = HtmlEmitter::new(&classes, &localizer)
            .with_bundles("p{color:red}", "go()")
            .emit(&doc);
        assert!(out.contains("<title>T</title><style>p{color:red}</style></head>"), "{out}");
        assert!(out.contains("<p>x</p><script>go()</script></body>"), "{out}");

        let out = HtmlEmitter::new(&classes, &localizer).emit(&doc);
        assert!(!out.contains("<style>"));
        assert!(!out.contains("<script>"));
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let classes = ClassSubstitutionTable::new();
        let out = emit(r#"<p>a<br>b<img alt="" src=x.png></p>"#, &classes);
        assert!(out.contains("<p>a<br>b<img alt src=x.png></p>"), "{out}");
    }

    #[test]
    fn test_text_escaping_and_whitespace() {
        let classes = ClassSubstitutionTable::new();
        let out = emit("<p>a  &amp;\n\n b &lt;</p><pre>  keep\n  this</pre>", &classes);
        assert!(out.contains("<p>a &amp; b &lt;</p>"), "{out}");
        assert!(out.contains("<pre>  keep\n  this</pre>"), "{out}");
    }

    #[test]
    fn test_attribute_quoting() {
        let mut out = String::new();
        write_attribute_value("plain", &mut out);
        out.push('|');
        write_attribute_value("two words", &mut out);
        out.push('|');
        write_attribute_value(r#"say "hi""#, &mut out);
        out.push('|');
        write_attribute_value("a&b", &mut out);
        assert_eq!(out, r#"plain|"two words"|'say "hi"'|a&amp;b"#);
    }

    #[test]
    fn test_asset_attributes_and_localization() {
        let classes = ClassSubstitutionTable::new();
        let localizer = Localizer::from_json(r#"{"logo":"Our logo","hello":"Hi"}"#).unwrap();
        let mut assets = FxHashMap::default();
        assets.insert("img/logo.png".to_string(), "assets/Q.png".to_string());

        let doc = parse_html(
            r##"<img src=" img/logo.png " alt="#lang#logo#"><a href="img/logo.png">#lang#hello#</a>"##,
        );
        let out = HtmlEmitter::new(&classes, &localizer)
            .with_assets(&assets)
            .emit(&doc);

        assert!(out.contains(r#"<img src=assets/Q.png alt="Our logo">"#), "{out}");
        // Anchors are navigation, not assets.
        assert!(out.contains("<a href=img/logo.png>Hi</a>"), "{out}");
    }

    #[test]
    fn test_bundle_cannot_close_its_element() {
        assert_eq!(
            escape_closing_tag("s='</script>'", "</script"),
            r"s='<\/script>'"
        );
    }
}
