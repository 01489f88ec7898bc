//! CSS rewrite engine.
//!
//! Walks a lightningcss rule tree and threads the run's substitutions through
//! it in place:
//!
//! - class selectors (including inside `:not()`, `:is()`, `:where()`, `:has()`
//!   and `:nth-child(An+B of S)`)
//! - `@keyframes` names and the `animation` / `animation-name` references to them
//! - local `url()` references, renamed through the asset table
//!
//! ```text
//! source ─ parse ─ collect url()s ─ rename assets (async)
//!        └ parse ─ rewrite rules ─ rewrite url()s ─ print (minified)
//! ```
//!
//! The tree is parsed twice so no parsed stylesheet is held across an await;
//! every node is still mutated in place, so output order is input order.

mod urls;

use crate::class_map::{ClassSubstitutionTable, UsageKind};
use crate::context::RewriteContext;
use crate::{Error, Result};
use lightningcss::declaration::DeclarationBlock;
use lightningcss::printer::PrinterOptions;
use lightningcss::properties::Property;
use lightningcss::properties::animation::AnimationName;
use lightningcss::rules::CssRule;
use lightningcss::rules::keyframes::KeyframesName;
use lightningcss::rules::style::StyleRule;
use lightningcss::selector::{Component, Selector};
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use lightningcss::visitor::Visit;
use parcel_selectors::parser::NthOfSelectorData;
use rustc_hash::FxHashMap;
use std::path::Path;
use urls::{UrlCollector, UrlRewriter};

/// Rewrite one stylesheet and return it printed in compressed form.
///
/// `source_file` is the stylesheet's path for linked sheets and `None` for
/// `<style>` blocks; relative `url()`s resolve against its directory, or the
/// source root for inline styles.
pub async fn rewrite_css(
    ctx: &RewriteContext,
    source: &str,
    source_file: Option<&Path>,
) -> Result<String> {
    let source_name = source_file
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<style>".to_string());
    let base_dir = source_file
        .and_then(Path::parent)
        .unwrap_or(&ctx.src_root)
        .to_path_buf();

    let links = collect_urls(source, &source_name)?;

    let mut renamed = FxHashMap::default();
    for link in links {
        if renamed.contains_key(&link) {
            continue;
        }
        if let Some(url) = ctx.rename_asset(&link, &base_dir).await? {
            tracing::debug!(from = %link, to = %url, "rewrote css url");
            renamed.insert(link, url);
        }
    }

    rewrite_and_print(source, &source_name, &ctx.classes, &renamed)
}

fn parse<'i>(source: &'i str, source_name: &str) -> Result<StyleSheet<'i>> {
    let options = ParserOptions {
        filename: source_name.to_string(),
        ..ParserOptions::default()
    };
    StyleSheet::parse(source, options).map_err(|e| Error::CssParse {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}

/// Every `url()` argument in document order.
fn collect_urls(source: &str, source_name: &str) -> Result<Vec<String>> {
    let mut stylesheet = parse(source, source_name)?;
    let mut collector = UrlCollector::default();
    let Ok(()) = stylesheet.visit(&mut collector);
    Ok(collector.urls)
}

fn rewrite_and_print(
    source: &str,
    source_name: &str,
    classes: &ClassSubstitutionTable,
    renamed: &FxHashMap<String, String>,
) -> Result<String> {
    let mut stylesheet = parse(source, source_name)?;
    rewrite_rules(&mut stylesheet.rules.0, classes);

    let mut rewriter = UrlRewriter::new(renamed);
    let Ok(()) = stylesheet.visit(&mut rewriter);

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| Error::CssParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
    Ok(printed.code)
}

/// Rewrite class selectors and animation names in a rule list, recursively.
pub fn rewrite_rules(rules: &mut [CssRule<'_>], classes: &ClassSubstitutionTable) {
    for rule in rules.iter_mut() {
        match rule {
            CssRule::Style(style) => rewrite_style_rule(style, classes),
            CssRule::Nesting(nesting) => rewrite_style_rule(&mut nesting.style, classes),
            CssRule::Media(media) => rewrite_rules(&mut media.rules.0, classes),
            CssRule::Supports(supports) => rewrite_rules(&mut supports.rules.0, classes),
            CssRule::MozDocument(document) => rewrite_rules(&mut document.rules.0, classes),
            CssRule::Container(container) => rewrite_rules(&mut container.rules.0, classes),
            CssRule::LayerBlock(layer) => rewrite_rules(&mut layer.rules.0, classes),
            CssRule::StartingStyle(starting) => rewrite_rules(&mut starting.rules.0, classes),
            CssRule::Scope(scope) => rewrite_rules(&mut scope.rules.0, classes),
            CssRule::Keyframes(keyframes) => {
                rename_keyframes(&mut keyframes.name, classes);
                for keyframe in keyframes.keyframes.iter_mut() {
                    rewrite_declarations(&mut keyframe.declarations, classes);
                }
            }
            CssRule::Page(page) => rewrite_declarations(&mut page.declarations, classes),
            CssRule::NestedDeclarations(nested) => {
                rewrite_declarations(&mut nested.declarations, classes)
            }
            // No selectors or animation names below these; url()s are
            // handled by the url pass.
            CssRule::Import(_)
            | CssRule::FontFace(_)
            | CssRule::FontPaletteValues(_)
            | CssRule::FontFeatureValues(_)
            | CssRule::CounterStyle(_)
            | CssRule::Namespace(_)
            | CssRule::Viewport(_)
            | CssRule::CustomMedia(_)
            | CssRule::LayerStatement(_)
            | CssRule::Property(_)
            | CssRule::ViewTransition(_)
            | CssRule::PositionTry(_)
            | CssRule::Ignored
            | CssRule::Unknown(_)
            | CssRule::Custom(_) => {}
        }
    }
}

fn rewrite_style_rule(style: &mut StyleRule<'_>, classes: &ClassSubstitutionTable) {
    for selector in style.selectors.0.iter_mut() {
        rewrite_selector(selector, classes);
    }
    rewrite_declarations(&mut style.declarations, classes);
    rewrite_rules(&mut style.rules.0, classes);
}

fn rewrite_selector(selector: &mut Selector<'_>, classes: &ClassSubstitutionTable) {
    for component in selector.iter_mut_raw_match_order() {
        match component {
            Component::Class(class) => {
                class.0 = classes.associate(&class.0, UsageKind::Css).into();
            }
            Component::Negation(list)
            | Component::Is(list)
            | Component::Where(list)
            | Component::Has(list)
            | Component::Any(_, list) => {
                for nested in list.iter_mut() {
                    rewrite_selector(nested, classes);
                }
            }
            Component::NthOf(data) => {
                let mut nested = data.clone_selectors();
                for selector in nested.iter_mut() {
                    rewrite_selector(selector, classes);
                }
                *data = NthOfSelectorData::new(*data.nth_data(), nested);
            }
            Component::Slotted(nested) | Component::Host(Some(nested)) => {
                rewrite_selector(nested, classes);
            }
            _ => {}
        }
    }
}

fn rename_keyframes(name: &mut KeyframesName<'_>, classes: &ClassSubstitutionTable) {
    match name {
        KeyframesName::Ident(ident) => {
            ident.0 = classes.associate(&ident.0, UsageKind::Keyframe).into();
        }
        KeyframesName::Custom(custom) => {
            *custom = classes.associate(custom, UsageKind::Keyframe).into();
        }
    }
}

fn rename_animation(name: &mut AnimationName<'_>, classes: &ClassSubstitutionTable) {
    match name {
        AnimationName::Ident(ident) => {
            ident.0 = classes.associate(&ident.0, UsageKind::Keyframe).into();
        }
        AnimationName::String(custom) => {
            *custom = classes.associate(custom, UsageKind::Keyframe).into();
        }
        AnimationName::None => {}
    }
}

/// Each animation in an `animation` shorthand names its keyframes first;
/// `animation-name` lists names only.
fn rewrite_declarations(block: &mut DeclarationBlock<'_>, classes: &ClassSubstitutionTable) {
    let properties = block
        .declarations
        .iter_mut()
        .chain(block.important_declarations.iter_mut());

    for property in properties {
        match property {
            Property::Animation(animations, _) => {
                for animation in animations.iter_mut() {
                    rename_animation(&mut animation.name, classes);
                }
            }
            Property::AnimationName(names, _) => {
                for name in names.iter_mut() {
                    rename_animation(name, classes);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_map::content_digest;
    use crate::context::test_support::context;
    use crate::runtime::test_utils::MemoryRuntime;
    use std::sync::Arc;

    async fn rewrite(ctx: &RewriteContext, css: &str) -> String {
        rewrite_css(ctx, css, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_class_selectors_share_one_token() {
        let runtime = Arc::new(MemoryRuntime::new());
        runtime.insert_file("/src/a.png", "png");
        let ctx = context(runtime);

        let out = rewrite(&ctx, ".foo{color:red} .foo{background:url(a.png)}").await;
        let token = ctx.classes.substitute("foo").unwrap();
        let name = format!("{}.png", &content_digest(b"png")[..1]);

        assert_eq!(out.matches(&format!(".{token}{{")).count(), 2);
        assert!(out.contains(&format!("assets/{name}")), "{out}");
        assert!(!out.contains("foo"));
        assert_eq!(ctx.take_referenced().len(), 1);
    }

    #[tokio::test]
    async fn test_nested_and_functional_selectors() {
        let ctx = context(Arc::new(MemoryRuntime::new()));
        let out = rewrite(
            &ctx,
            "@media (min-width: 10px) { .wide:not(.narrow) > .child { color: blue } }\n\
             @supports (display: grid) { :is(.cols, .rows) { display: grid } }",
        )
        .await;

        for class in ["wide", "narrow", "child", "cols", "rows"] {
            let token = ctx.classes.substitute(class).unwrap();
            assert!(out.contains(&format!(".{token}")), "{class} in {out}");
            assert!(!out.contains(class), "{class} left in {out}");
        }
        assert!(ctx.classes.usage(UsageKind::Css).contains("narrow"));
    }

    #[tokio::test]
    async fn test_nth_child_of_selector() {
        let ctx = context(Arc::new(MemoryRuntime::new()));
        let out = rewrite(
            &ctx,
            "li:nth-child(2n of .active){color:red} \
             li:nth-last-child(1 of .done, .active){color:green} \
             .active{color:blue}",
        )
        .await;

        let active = ctx.classes.substitute("active").unwrap();
        let done = ctx.classes.substitute("done").unwrap();
        assert!(out.contains(&format!("nth-child(2n of .{active})")), "{out}");
        assert!(out.contains(&format!(".{done}")), "{out}");
        assert!(!out.contains("active"), "{out}");
        assert!(!out.contains("done"), "{out}");
    }

    #[tokio::test]
    async fn test_keyframes_and_animation_references() {
        let ctx = context(Arc::new(MemoryRuntime::new()));
        let out = rewrite(
            &ctx,
            "@keyframes spin { from { opacity: 0 } to { opacity: 1 } }\n\
             .a { animation: spin 1s linear }\n\
             .b { animation-name: spin }",
        )
        .await;

        let token = ctx.classes.substitute("spin").unwrap();
        assert!(out.contains(&format!("@keyframes {token}")), "{out}");
        assert!(!out.contains("spin"));
        assert!(ctx.classes.usage(UsageKind::Keyframe).contains("spin"));
        assert!(!ctx.classes.usage(UsageKind::Css).contains("spin"));
    }

    #[tokio::test]
    async fn test_non_local_urls_untouched() {
        let ctx = context(Arc::new(MemoryRuntime::new()));
        let out = rewrite(
            &ctx,
            ".a{background:url(https://x.test/bg.png)}\
             .b{background:url(data:image/gif;base64,R0lGODlh)}",
        )
        .await;

        assert!(out.contains("https://x.test/bg.png"));
        assert!(out.contains("data:image/gif;base64,R0lGODlh"));
        assert!(ctx.assets.is_empty());
    }

    #[tokio::test]
    async fn test_linked_sheet_resolves_relative_to_its_directory() {
        let runtime = Arc::new(MemoryRuntime::new());
        runtime.insert_file("/src/fonts/x.woff2", "font");
        runtime.insert_file("/src/img/bg.png", "bg");
        let ctx = context(runtime);

        let out = rewrite_css(
            &ctx,
            "@font-face{font-family:X;src:url('../fonts/x.woff2') format('woff2')}\
             body{background:url(\"/img/bg.png\")}",
            Some(Path::new("/src/css/site.css")),
        )
        .await
        .unwrap();

        let font = format!("assets/{}.woff2", &content_digest(b"font")[..1]);
        let bg = format!("assets/{}.png", &content_digest(b"bg")[..1]);
        assert!(out.contains(&font), "{out}");
        assert!(out.contains(&bg), "{out}");
        assert!(ctx.assets.get("/src/fonts/x.woff2").is_some());
    }

    #[tokio::test]
    async fn test_missing_asset_is_an_error() {
        let ctx = context(Arc::new(MemoryRuntime::new()));
        let err = rewrite_css(&ctx, ".a{background:url(gone.png)}", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
    }

    #[tokio::test]
    async fn test_invalid_css_reports_source() {
        let ctx = context(Arc::new(MemoryRuntime::new()));
        let err = rewrite_css(&ctx, "..broken{color:red}", Some(Path::new("/src/bad.css")))
            .await
            .unwrap_err();
        match err {
            Error::CssParse { source_name, .. } => assert_eq!(source_name, "/src/bad.css"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
