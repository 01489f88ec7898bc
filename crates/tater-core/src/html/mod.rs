//! HTML document tree.
//!
//! Documents are parsed with html5ever into an `RcDom` and immediately
//! converted into an owned [`HtmlNode`] tree, which every walk in the bundler
//! matches on.

mod emit;

pub use emit::HtmlEmitter;

use html5ever::tendril::TendrilSink;
use html5ever::{QualName, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Tags that never take a closing tag when they have no children.
pub const SELF_CLOSING_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_self_closing(tag: &str) -> bool {
    SELF_CLOSING_TAGS.contains(&tag)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlElement {
    pub name: String,
    /// Attributes in source order
    pub attrs: Vec<Attribute>,
    pub children: Vec<HtmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Document { children: Vec<HtmlNode> },
    Doctype { name: String },
    Element(HtmlElement),
    Text(String),
    Comment(String),
}

impl HtmlNode {
    pub fn children(&self) -> &[HtmlNode] {
        match self {
            HtmlNode::Document { children } => children,
            HtmlNode::Element(element) => &element.children,
            _ => &[],
        }
    }
}

impl HtmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn is_style(&self) -> bool {
        self.name == "style"
    }

    pub fn is_script(&self) -> bool {
        self.name == "script"
    }

    /// `<link rel="stylesheet">`, matching `rel` as a token list.
    pub fn is_stylesheet_link(&self) -> bool {
        self.name == "link"
            && self.attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            })
    }

    /// Consumed by extraction and never emitted as markup.
    pub fn is_inlined(&self) -> bool {
        self.is_style() || self.is_script() || self.is_stylesheet_link()
    }

    /// Attributes holding renameable asset references.
    pub fn asset_attributes(&self) -> &'static [&'static str] {
        match self.name.as_str() {
            "img" | "source" | "audio" | "track" | "embed" | "input" => &["src"],
            "video" => &["src", "poster"],
            "link" if !self.is_stylesheet_link() => &["href"],
            _ => &[],
        }
    }

    pub fn is_asset_attribute(&self, name: &str) -> bool {
        self.asset_attributes().contains(&name)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        fn collect(nodes: &[HtmlNode], out: &mut String) {
            for node in nodes {
                match node {
                    HtmlNode::Text(text) => out.push_str(text),
                    HtmlNode::Element(element) => collect(&element.children, out),
                    _ => {}
                }
            }
        }
        let mut out = String::new();
        collect(&self.children, &mut out);
        out
    }
}

/// Parse a complete HTML document.
///
/// Parsing never fails; malformed markup is repaired the way browsers do.
pub fn parse_html(source: &str) -> HtmlNode {
    let dom = parse_document(RcDom::default(), Default::default()).one(source);
    convert(&dom.document).unwrap_or(HtmlNode::Document {
        children: Vec::new(),
    })
}

fn qualified(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.to_string(),
    }
}

fn convert_children(handle: &Handle) -> Vec<HtmlNode> {
    handle.children.borrow().iter().filter_map(convert).collect()
}

fn convert(handle: &Handle) -> Option<HtmlNode> {
    let node = match &handle.data {
        NodeData::Document => HtmlNode::Document {
            children: convert_children(handle),
        },
        NodeData::Doctype { name, .. } => HtmlNode::Doctype {
            name: name.to_string(),
        },
        NodeData::Text { contents } => HtmlNode::Text(contents.borrow().to_string()),
        NodeData::Comment { contents } => HtmlNode::Comment(contents.to_string()),
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|a| Attribute {
                    name: qualified(&a.name),
                    value: a.value.to_string(),
                })
                .collect();
            // <template> keeps its content in a separate fragment.
            let children = match template_contents.borrow().as_ref() {
                Some(fragment) => convert_children(fragment),
                None => convert_children(handle),
            };
            HtmlNode::Element(HtmlElement {
                name: qualified(name),
                attrs,
                children,
            })
        }
        NodeData::ProcessingInstruction { .. } => return None,
    };
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(node: &'a HtmlNode, name: &str) -> Option<&'a HtmlElement> {
        if let HtmlNode::Element(element) = node {
            if element.name == name {
                return Some(element);
            }
        }
        node.children().iter().find_map(|child| find(child, name))
    }

    #[test]
    fn test_parse_keeps_attribute_order() {
        let doc = parse_html(r#"<div id="x" class="a  b" data-k="v">hi</div>"#);
        let div = find(&doc, "div").unwrap();
        let names: Vec<_> = div.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["id", "class", "data-k"]);
        assert_eq!(div.attr("class"), Some("a  b"));
        assert_eq!(div.text_content(), "hi");
    }

    #[test]
    fn test_document_structure_is_completed() {
        let doc = parse_html("<!DOCTYPE html><title>T</title><p>body");
        assert!(matches!(doc.children()[0], HtmlNode::Doctype { ref name } if name == "html"));
        assert!(find(&doc, "head").is_some());
        assert!(find(&doc, "body").is_some());
        assert!(find(&doc, "p").is_some());
    }

    #[test]
    fn test_stylesheet_link_detection() {
        let doc = parse_html(
            r#"<link rel="Stylesheet" href="a.css"><link rel="icon" href="favicon.png">"#,
        );
        let links: Vec<_> = doc.children()[0]
            .children()
            .iter()
            .flat_map(|n| n.children())
            .filter_map(|n| match n {
                HtmlNode::Element(e) if e.name == "link" => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(links.len(), 2);
        assert!(links[0].is_stylesheet_link());
        assert!(links[0].is_inlined());
        assert!(links[0].asset_attributes().is_empty());
        assert!(!links[1].is_stylesheet_link());
        assert!(links[1].is_asset_attribute("href"));
    }

    #[test]
    fn test_script_text_content() {
        let doc = parse_html("<script>var CSS_A = '.a';</script>");
        let script = find(&doc, "script").unwrap();
        assert!(script.is_script());
        assert_eq!(script.text_content(), "var CSS_A = '.a';");
    }

    #[test]
    fn test_template_contents_are_children() {
        let doc = parse_html(r#"<template><span class="t">x</span></template>"#);
        let template = find(&doc, "template").unwrap();
        assert_eq!(template.children.len(), 1);
        assert!(find(&doc, "span").is_some());
    }

    #[test]
    fn test_self_closing_catalog() {
        assert!(is_self_closing("img"));
        assert!(is_self_closing("wbr"));
        assert!(!is_self_closing("div"));
    }
}
