//! Class substitution table.
//!
//! Maps CSS class names (and keyframes names) to short generated tokens. One
//! table is shared by every entry point of a run, so the same class always
//! gets the same token whether it is first seen in markup, a stylesheet or a
//! script constant.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;

/// Symbols used by [`encode_index`], in digit order.
pub const TOKEN_ALPHABET: &[u8; 64] =
    b"-_0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Encode `index` as a big-endian base-64 number over [`TOKEN_ALPHABET`].
///
/// Zero encodes as a single `-`; there is no sign and no padding.
pub fn encode_index(mut index: u64) -> String {
    let mut digits = Vec::with_capacity(11);
    loop {
        digits.push(TOKEN_ALPHABET[(index & 0x3f) as usize]);
        index >>= 6;
        if index == 0 {
            break;
        }
    }
    digits.reverse();
    // Every byte comes from the ASCII alphabet above.
    digits.into_iter().map(char::from).collect()
}

/// A token may start a CSS identifier unless it begins with a digit or hyphen.
fn is_valid_token(token: &str) -> bool {
    token
        .bytes()
        .next()
        .is_some_and(|b| !b.is_ascii_digit() && b != b'-')
}

/// Where a class reference was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UsageKind {
    Html,
    Css,
    Js,
    /// `@keyframes` names and the animation references to them
    Keyframe,
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UsageKind::Html => "html",
            UsageKind::Css => "css",
            UsageKind::Js => "js",
            UsageKind::Keyframe => "keyframe",
        })
    }
}

#[derive(Debug, Default)]
struct Inner {
    map: FxHashMap<String, String>,
    next_index: u64,
    usage: FxHashMap<UsageKind, BTreeSet<String>>,
}

impl Inner {
    fn generate(&mut self) -> String {
        loop {
            let token = encode_index(self.next_index);
            self.next_index += 1;
            if is_valid_token(&token) {
                return token;
            }
        }
    }
}

/// Run-scoped class substitution table.
///
/// `associate` is a lookup-or-create under one lock, so concurrent walks never
/// observe a class without its token or assign two tokens to one class.
#[derive(Debug, Default)]
pub struct ClassSubstitutionTable {
    inner: Mutex<Inner>,
}

impl ClassSubstitutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the substitute for `name`, generating one on first sight.
    ///
    /// A single leading dot is stripped before lookup and re-added to the
    /// result, so `.foo` and `foo` share a token.
    pub fn associate(&self, name: &str, kind: UsageKind) -> String {
        let (dotted, bare) = match name.strip_prefix('.') {
            Some(bare) => (true, bare),
            None => (false, name),
        };

        let mut inner = self.inner.lock();
        let token = match inner.map.get(bare) {
            Some(token) => token.clone(),
            None => {
                let token = inner.generate();
                tracing::trace!(class = bare, token = %token, %kind, "new class substitute");
                inner.map.insert(bare.to_string(), token.clone());
                token
            }
        };
        inner.usage.entry(kind).or_default().insert(bare.to_string());
        drop(inner);

        if dotted { format!(".{token}") } else { token }
    }

    /// Look up an existing substitute without recording usage.
    pub fn substitute(&self, name: &str) -> Option<String> {
        let bare = name.strip_prefix('.').unwrap_or(name);
        self.inner.lock().map.get(bare).cloned()
    }

    /// Class names recorded under `kind`, sorted.
    pub fn usage(&self, kind: UsageKind) -> BTreeSet<String> {
        self.inner
            .lock()
            .usage
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Classes seen in stylesheets but never in markup or scripts, sorted.
    pub fn orphans(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let empty = BTreeSet::new();
        let get = |kind: UsageKind| inner.usage.get(&kind).unwrap_or(&empty);
        let (html, js) = (get(UsageKind::Html), get(UsageKind::Js));

        get(UsageKind::Css)
            .iter()
            .filter(|name| !html.contains(*name) && !js.contains(*name))
            .cloned()
            .collect()
    }

    /// Number of distinct names with a substitute
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_encode_index() {
        assert_eq!(encode_index(0), "-");
        assert_eq!(encode_index(1), "_");
        assert_eq!(encode_index(12), "a");
        assert_eq!(encode_index(63), "Z");
        assert_eq!(encode_index(64), "_-");
        assert_eq!(encode_index(64 * 64), "_--");
        assert_eq!(encode_index(1 << 32), "2-----");
        assert_eq!(encode_index((1 << 53) - 1), "tZZZZZZZZ");
    }

    #[test]
    fn test_first_tokens_skip_invalid_starts() {
        let table = ClassSubstitutionTable::new();
        assert_eq!(table.associate("first", UsageKind::Css), "_");
        assert_eq!(table.associate("second", UsageKind::Css), "a");
        assert_eq!(table.associate("third", UsageKind::Css), "b");
    }

    #[test]
    fn test_leading_dot_is_preserved() {
        let table = ClassSubstitutionTable::new();
        let bare = table.associate("foo", UsageKind::Html);
        let dotted = table.associate(".foo", UsageKind::Css);
        assert_eq!(dotted, format!(".{bare}"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_same_token_across_kinds() {
        let table = ClassSubstitutionTable::new();
        let css = table.associate(".bar", UsageKind::Css);
        let js = table.associate(".bar", UsageKind::Js);
        let html = table.associate("bar", UsageKind::Html);
        assert_eq!(css, js);
        assert_eq!(css, format!(".{html}"));
        assert_eq!(table.substitute("bar"), Some(html));
    }

    #[test]
    fn test_orphans() {
        let table = ClassSubstitutionTable::new();
        table.associate("used", UsageKind::Css);
        table.associate("used", UsageKind::Html);
        table.associate("scripted", UsageKind::Css);
        table.associate("scripted", UsageKind::Js);
        table.associate("dead", UsageKind::Css);
        table.associate("spin", UsageKind::Keyframe);

        assert_eq!(table.orphans(), vec!["dead".to_string()]);
        assert!(table.usage(UsageKind::Keyframe).contains("spin"));
    }

    #[test]
    fn test_no_orphans_without_css() {
        let table = ClassSubstitutionTable::new();
        table.associate("only-markup", UsageKind::Html);
        assert!(table.orphans().is_empty());
    }

    proptest! {
        #[test]
        fn prop_tokens_valid_unique_and_stable(
            names in prop::collection::hash_set("[a-z][a-z0-9_-]{0,12}", 1..300)
        ) {
            let table = ClassSubstitutionTable::new();
            let mut seen = FxHashSet::default();
            for name in &names {
                let token = table.associate(name, UsageKind::Css);
                prop_assert!(is_valid_token(&token), "invalid token {}", token);
                prop_assert!(seen.insert(token.clone()), "duplicate token {}", token);
                prop_assert_eq!(table.associate(name, UsageKind::Html), token);
            }
            prop_assert_eq!(table.len(), names.len());
        }
    }
}
