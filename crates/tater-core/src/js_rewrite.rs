//! Class constants in scripts.
//!
//! Scripts keep class names in sync with stylesheets through declarations
//! such as `const CSS_ACTIVE = '.active'`. The string literal is rewritten to
//! the class's substitute; nothing else in the script is touched.

use crate::class_map::{ClassSubstitutionTable, UsageKind};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

static CLASS_CONSTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(var|let|const)\s+(CSS_[a-z0-9_$]+)\s*=\s*['"](\.[a-z0-9_-]+)['"]"#)
        .expect("valid regex")
});

/// Rewrite every `CSS_*` class constant declaration in `source`.
pub fn rewrite_class_constants<'s>(
    source: &'s str,
    classes: &ClassSubstitutionTable,
) -> Cow<'s, str> {
    CLASS_CONSTANT.replace_all(source, |caps: &Captures<'_>| {
        let substitute = classes.associate(&caps[3], UsageKind::Js);
        format!("{} {} = '{}'", &caps[1], &caps[2], substitute)
    })
}

/// Constants declared in `bundle` but never referenced anywhere else in it.
pub fn unused_class_constants(bundle: &str) -> Vec<String> {
    let mut unused: Vec<String> = CLASS_CONSTANT
        .captures_iter(bundle)
        .map(|caps| caps[2].to_string())
        .filter(|name| count_identifier(bundle, name) <= 1)
        .collect();
    unused.sort();
    unused.dedup();
    unused
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Occurrences of `name` as a whole identifier.
fn count_identifier(haystack: &str, name: &str) -> usize {
    haystack
        .match_indices(name)
        .filter(|(start, _)| {
            let before = haystack[..*start].chars().next_back();
            let after = haystack[start + name.len()..].chars().next();
            !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char)
        })
        .count()
}
