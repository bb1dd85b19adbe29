use proptest::prelude::*;
use restiming::trie::{build_trie, optimize_trie, TrieMap, TrieNode};

/// Collect `(url, data)` pairs back out of an optimized trie.
fn flatten(map: &TrieMap, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, node) in map.iter() {
        let mut node_key = format!("{prefix}{key}");
        if node_key.ends_with('|') {
            node_key.pop();
        }
        match node {
            TrieNode::Leaf(data) => out.push((node_key, data.clone())),
            TrieNode::Branch(children) => flatten(children, &node_key, out),
        }
    }
}

proptest! {
    // URL-ish keys with no separator and no XSS-sensitive substrings, so
    // optimization is purely structural
    #[test]
    fn every_key_survives_build_and_optimize(
        keys in proptest::collection::hash_set("[a-z0-9./:]{1,20}", 1..20)
    ) {
        let entries: Vec<(String, String)> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), format!("d{i}")))
            .collect();

        let trie = build_trie(&entries, &[]).unwrap();
        let optimized = optimize_trie(trie);

        let mut recovered = Vec::new();
        flatten(&optimized, "", &mut recovered);
        recovered.sort();

        let mut expected = entries.clone();
        expected.sort();
        prop_assert_eq!(recovered, expected);
    }

    // a second optimize pass must find nothing left to collapse
    #[test]
    fn optimize_is_a_fixed_point(
        keys in proptest::collection::hash_set("[a-z0-9./:]{1,20}", 1..20)
    ) {
        let entries: Vec<(String, String)> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), format!("d{i}")))
            .collect();

        let optimized = optimize_trie(build_trie(&entries, &[]).unwrap());
        prop_assert_eq!(optimize_trie(optimized.clone()), optimized);
    }

    #[test]
    fn optimize_is_idempotent_via_json(
        keys in proptest::collection::hash_set("[a-z0-9./:]{1,20}", 1..20)
    ) {
        let entries: Vec<(String, String)> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), format!("d{i}")))
            .collect();

        let optimized = optimize_trie(build_trie(&entries, &[]).unwrap());
        let json = serde_json::to_string(&optimized).unwrap();
        let reparsed: TrieMap = serde_json::from_str(&json).unwrap();
        let again = serde_json::to_string(&reparsed).unwrap();
        prop_assert_eq!(json, again);
    }
}
