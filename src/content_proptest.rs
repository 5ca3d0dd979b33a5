//! Property-based tests for funding file reconciliation.
//!
//! These tests use proptest to generate funding files mixing unrelated
//! sponsor links, obsolete links, and canonical links, and verify that the
//! reconciliation invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::content::{funding_links, reconcile, CanonicalUrl, ContentPolicy};
    use proptest::prelude::*;

    const TRACKER: &str = "https://github.com/org/requests";
    const BASE: &str = "https://fund.example/fulfill";

    fn policy() -> ContentPolicy {
        ContentPolicy::for_deployment(TRACKER, BASE, &["https://legacy.example/f".to_string()])
            .unwrap()
    }

    /// A single entry of the `custom` list.
    fn entry() -> impl Strategy<Value = String> {
        prop_oneof![
            "https://[a-z]{1,8}\\.example/[a-z0-9]{0,8}",
            (1u64..200).prop_map(|n| format!("{}/issues/{}", TRACKER, n)),
            (1u64..200).prop_map(|n| format!("{}?issue={}", BASE, n)),
            (1u64..200).prop_map(|n| format!("https://legacy.example/f?issue={}", n)),
            "[a-zA-Z0-9 '._-]{1,12}",
            "[a-z\\x00-\\x1f\\x7f-\\x9f\\u{fffe}\"\\\\]{1,8}",
        ]
    }

    /// Render an entry the way a hand-written file would: single-quoted when
    /// possible, otherwise double-quoted with every unusual character escaped.
    fn yaml_scalar(entry: &str) -> String {
        if entry.chars().all(|c| (' '..='~').contains(&c)) {
            return format!("'{}'", entry.replace('\'', "''"));
        }
        let escaped: String = entry
            .chars()
            .map(|c| match c {
                '"' => "\\\"".to_string(),
                '\\' => "\\\\".to_string(),
                ' '..='~' => c.to_string(),
                _ => format!("\\u{:04X}", c as u32),
            })
            .collect();
        format!("\"{}\"", escaped)
    }

    /// A complete funding file, in block or flow style, with an optional
    /// unrelated key before the list.
    fn funding_file() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(entry(), 0..6),
            any::<bool>(),
            prop::option::of("[a-z]{1,8}"),
        )
            .prop_map(|(entries, flow, github)| {
                let mut doc = String::new();
                if let Some(user) = github {
                    doc.push_str(&format!("github: {}\n", user));
                }
                let quoted: Vec<String> = entries.iter().map(|e| yaml_scalar(e)).collect();
                if flow {
                    doc.push_str(&format!("custom: [{}]\n", quoted.join(", ")));
                } else if quoted.is_empty() {
                    doc.push_str("custom: []\n");
                } else {
                    doc.push_str("custom:\n");
                    for q in quoted {
                        doc.push_str(&format!("  - {}\n", q));
                    }
                }
                doc
            })
    }

    proptest! {
        /// Property: reconciling an already reconciled file is a no-op
        #[test]
        fn reconcile_is_idempotent(file in funding_file(), id in 1u64..200) {
            let canonical = CanonicalUrl::new(BASE, id).unwrap();
            let once = reconcile(Some(file.as_bytes()), &canonical, &policy()).unwrap();
            let twice = reconcile(Some(&once), &canonical, &policy()).unwrap();
            prop_assert_eq!(once, twice);
        }

        /// Property: exactly one canonical entry survives and no obsolete
        /// entry remains
        #[test]
        fn reconcile_leaves_single_canonical(file in funding_file(), id in 1u64..200) {
            let canonical = CanonicalUrl::new(BASE, id).unwrap();
            let policy = policy();
            let out = reconcile(Some(file.as_bytes()), &canonical, &policy).unwrap();
            let links = funding_links(&out).unwrap();

            let canonical_count = links.iter().filter(|l| l.as_str() == canonical.as_str()).count();
            prop_assert_eq!(canonical_count, 1);
            for link in &links {
                prop_assert!(!policy.is_obsolete(link, &canonical), "obsolete link survived: {}", link);
            }
        }

        /// Property: unrelated entries are preserved in order
        #[test]
        fn reconcile_preserves_unrelated_entries(file in funding_file(), id in 1u64..200) {
            let canonical = CanonicalUrl::new(BASE, id).unwrap();
            let policy = policy();
            let before: Vec<String> = funding_links(file.as_bytes())
                .unwrap()
                .into_iter()
                .filter(|l| l != canonical.as_str() && !policy.is_obsolete(l, &canonical))
                .collect();
            let out = reconcile(Some(file.as_bytes()), &canonical, &policy).unwrap();
            let after: Vec<String> = funding_links(&out)
                .unwrap()
                .into_iter()
                .filter(|l| l != canonical.as_str())
                .collect();
            prop_assert_eq!(before, after);
        }

        /// Property: a file that already satisfies the invariant is returned
        /// byte for byte
        #[test]
        fn reconciled_file_is_byte_stable(
            extra in prop::collection::vec("https://[a-z]{1,8}\\.example/[a-z]{0,6}", 0..4),
            id in 1u64..200,
        ) {
            let canonical = CanonicalUrl::new(BASE, id).unwrap();
            let mut items: Vec<String> = extra.iter().map(|e| format!("'{}'", e)).collect();
            items.push(format!("'{}'", canonical));
            let file = format!("# sponsors\ncustom: [ {} ]\n", items.join(" , "));
            let out = reconcile(Some(file.as_bytes()), &canonical, &policy()).unwrap();
            prop_assert_eq!(out, file.into_bytes());
        }
    }
}
