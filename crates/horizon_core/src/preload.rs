//! Preload set composition.

use std::collections::HashSet;

/// Merges a collection's default preloads with per-call overrides.
///
/// Defaults come first, then overrides, each in their given order. Every
/// name has its first character upper-cased (the rest is left as is), empty
/// names are skipped, and a name already seen is dropped.
///
/// ```rust
/// use horizon_core::merge_preloads;
///
/// let merged = merge_preloads(&["media"], &["Media", "owner", ""]);
/// assert_eq!(merged, vec!["Media".to_string(), "Owner".to_string()]);
/// ```
pub fn merge_preloads<A, B>(defaults: &[A], overrides: &[B]) -> Vec<String>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let names = defaults
        .iter()
        .map(|n| -> &str { n.as_ref() })
        .chain(overrides.iter().map(|n| -> &str { n.as_ref() }));

    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for name in names {
        let Some(name) = normalize(name) else {
            continue;
        };
        if seen.insert(name.clone()) {
            merged.push(name);
        }
    }
    merged
}

/// Upper-cases the first character of a relation name.
fn normalize(name: &str) -> Option<String> {
    let mut chars = name.chars();
    let first = chars.next()?;
    let mut out = String::with_capacity(name.len());
    out.extend(first.to_uppercase());
    out.push_str(chars.as_str());
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn defaults_then_overrides_in_order() {
        let merged = merge_preloads(&["Media", "Owner"], &["Tags"]);
        assert_eq!(merged, vec!["Media", "Owner", "Tags"]);
    }

    #[test]
    fn first_character_is_normalized() {
        let merged = merge_preloads(&["media"], &NONE);
        assert_eq!(merged, vec!["Media"]);
    }

    #[test]
    fn only_first_character_is_normalized() {
        let merged = merge_preloads(&["mediaFile", "MEDIAFILE"], &NONE);
        assert_eq!(merged, vec!["MediaFile", "MEDIAFILE"]);
    }

    #[test]
    fn duplicates_across_sets_are_dropped() {
        let merged = merge_preloads(&["Media"], &["media", "Media"]);
        assert_eq!(merged, vec!["Media"]);
    }

    #[test]
    fn empty_names_are_skipped() {
        let merged = merge_preloads(&["", "Media"], &[""]);
        assert_eq!(merged, vec!["Media"]);
    }

    #[test]
    fn both_empty() {
        assert!(merge_preloads(&NONE, &NONE).is_empty());
    }

    #[test]
    fn non_ascii_first_character() {
        let merged = merge_preloads(&["ärger"], &NONE);
        assert_eq!(merged, vec!["Ärger"]);
    }

    fn names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-zA-Z]{0,6}", 0..8)
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(a in names(), b in names()) {
            let once = merge_preloads(&a, &b);
            let twice = merge_preloads(&a, &once);
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn merge_has_no_duplicates_or_empties(a in names(), b in names()) {
            let merged = merge_preloads(&a, &b);
            let unique: HashSet<_> = merged.iter().collect();
            prop_assert_eq!(unique.len(), merged.len());
            prop_assert!(merged.iter().all(|n| !n.is_empty()));
        }
    }
}
