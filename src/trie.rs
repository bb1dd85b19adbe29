//! Character trie over URL keys, plus the optimizer that collapses
//! single-child chains into multi-character edges.
//!
//! Leaf nodes hold the per-resource encoded data string. If key A is a
//! prefix of key B, A's data is stored under the reserved `"|"` key of the
//! branch it shares with B. Sensitive substrings (`href`, `src`, `action`)
//! are broken with a placeholder delimiter before insertion so the
//! optimized trie never contains them verbatim, which keeps content
//! filters like NoScript from mistaking the payload for an XSS attack.

use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RestimingError;

/// Separator used for prefix-collision markers and for stacking multiple
/// resources under one URL. Must never appear in a trie key.
pub const SEPARATOR: char = '|';

/// Placeholder inserted to break XSS-sensitive words. Cannot occur in a
/// well-formed URL.
pub const XSS_BREAK_DELIM: char = '\n';

/// Default list of words broken before trie insertion, matched
/// case-insensitively.
pub const DEFAULT_XSS_BREAK_WORDS: [&str; 3] = ["href", "src", "action"];

/// One node of the (optimized or unoptimized) trie.
#[derive(Debug, Clone, PartialEq)]
pub enum TrieNode {
    /// Encoded resource data for the URL spelled out by the path here.
    Leaf(String),
    Branch(TrieMap),
}

/// An insertion-ordered string map of child nodes.
///
/// Key order is significant: it is the wire order, and the decoder's output
/// order follows it. Maps are tiny (one entry per distinct leading
/// character), so lookups are linear scans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrieMap {
    entries: Vec<(String, TrieNode)>,
}

impl TrieMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&TrieNode> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TrieNode> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
    }

    /// Insert a node, replacing in place (preserving position) when the key
    /// already exists.
    pub fn insert(&mut self, key: String, node: TrieNode) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = node,
            None => self.entries.push((key, node)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrieNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

}

impl IntoIterator for TrieMap {
    type Item = (String, TrieNode);
    type IntoIter = std::vec::IntoIter<(String, TrieNode)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, TrieNode)> for TrieMap {
    fn from_iter<T: IntoIterator<Item = (String, TrieNode)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Serialize for TrieMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, node) in &self.entries {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}

impl Serialize for TrieNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TrieNode::Leaf(data) => serializer.serialize_str(data),
            TrieNode::Branch(children) => children.serialize(serializer),
        }
    }
}

struct TrieMapVisitor;

impl<'de> Visitor<'de> for TrieMapVisitor {
    type Value = TrieMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a trie object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TrieMap, A::Error> {
        let mut map = TrieMap::new();
        while let Some((key, node)) = access.next_entry::<String, TrieNode>()? {
            map.insert(key, node);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for TrieMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TrieMapVisitor)
    }
}

struct TrieNodeVisitor;

impl<'de> Visitor<'de> for TrieNodeVisitor {
    type Value = TrieNode;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string leaf or a trie object")
    }

    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<TrieNode, E> {
        Ok(TrieNode::Leaf(value.to_string()))
    }

    fn visit_string<E: serde::de::Error>(self, value: String) -> Result<TrieNode, E> {
        Ok(TrieNode::Leaf(value))
    }

    fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<TrieNode, A::Error> {
        Ok(TrieNode::Branch(TrieMapVisitor.visit_map(access)?))
    }
}

impl<'de> Deserialize<'de> for TrieNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TrieNodeVisitor)
    }
}

/// ASCII case-insensitive search for `needle` in `haystack` starting at
/// `from`.
fn find_ascii_ci(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| {
        haystack[i..i + needle.len()].eq_ignore_ascii_case(needle)
    })
}

/// Insert the break delimiter after the first letter of every occurrence of
/// `word`, splitting the sensitive token.
fn break_word(input: &str, word: &str) -> String {
    if word.is_empty() {
        return input.to_string();
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len() + 2);
    let mut pos = 0;
    while let Some(at) = find_ascii_ci(bytes, word.as_bytes(), pos) {
        let split = at + 1;
        out.push_str(&input[pos..split]);
        out.push(XSS_BREAK_DELIM);
        pos = at + word.len();
        out.push_str(&input[split..pos]);
    }
    out.push_str(&input[pos..]);
    out
}

/// Apply all configured XSS break rewrites to a URL.
pub fn apply_xss_breaks(url: &str, words: &[String]) -> String {
    let mut fixed = url.to_string();
    for word in words {
        fixed = break_word(&fixed, word);
    }
    fixed
}

/// Convert `(url, encoded data)` pairs into a character trie.
///
/// Keys must be unique and must not contain the `|` separator; violations
/// are caller bugs and fail fast.
pub fn build_trie(
    entries: &[(String, String)],
    xss_break_words: &[String],
) -> Result<TrieMap, RestimingError> {
    let mut trie = TrieMap::new();
    let mut seen = HashSet::new();

    for (url, value) in entries {
        if url.contains(SEPARATOR) {
            return Err(RestimingError::ReservedKey(url.clone()));
        }
        if !seen.insert(url.as_str()) {
            return Err(RestimingError::DuplicateKey(url.clone()));
        }

        let fixed = apply_xss_breaks(url, xss_break_words);
        let chars: Vec<char> = fixed.chars().collect();
        let mut cur = &mut trie;

        for (i, ch) in chars.iter().enumerate() {
            let last = i + 1 == chars.len();
            let key = ch.to_string();

            if !cur.contains_key(&key) {
                // nothing exists yet: a leaf if this is the end of the key,
                // a branch if there are letters to go
                let node = if last {
                    TrieNode::Leaf(value.clone())
                } else {
                    TrieNode::Branch(TrieMap::new())
                };
                cur.insert(key.clone(), node);
            } else if let Some(TrieNode::Leaf(existing)) = cur.get_mut(&key) {
                // a shorter key ends here: keep its data under "|" and
                // branch out
                let old = std::mem::take(existing);
                let mut branch = TrieMap::new();
                branch.insert(SEPARATOR.to_string(), TrieNode::Leaf(old));
                cur.insert(key.clone(), TrieNode::Branch(branch));
            } else if last {
                // end of our key at an existing branch: attach our data
                if let Some(TrieNode::Branch(branch)) = cur.get_mut(&key) {
                    branch.insert(SEPARATOR.to_string(), TrieNode::Leaf(value.clone()));
                }
            }

            if last {
                break;
            }
            match cur.get_mut(&key) {
                Some(TrieNode::Branch(branch)) => cur = branch,
                // non-last nodes are always branches after the fixups above
                _ => break,
            }
        }
    }

    Ok(trie)
}

/// Result of optimizing one branch.
enum Collapse {
    /// The branch had a single child and merged into the parent edge.
    Collapsed { name: String, node: TrieNode },
    /// The branch stays as-is (multiple children, or pinned by a break
    /// delimiter).
    Kept(TrieMap),
}

fn optimize_branch(map: TrieMap, delim: &str) -> Collapse {
    let mut kept = TrieMap::new();
    let mut renamed: Vec<(String, TrieNode)> = Vec::new();
    let mut count = 0usize;
    let mut pinned = false;

    for (key, node) in map {
        match node {
            TrieNode::Branch(children) => match optimize_branch(children, delim) {
                Collapse::Collapsed { name, node } => {
                    if key == delim {
                        // Restore the URL by dropping the break placeholder,
                        // but pin this node so the sensitive word is never
                        // rejoined into a single edge.
                        pinned = true;
                        renamed.push((name, node));
                    } else {
                        renamed.push((format!("{key}{name}"), node));
                    }
                }
                Collapse::Kept(children) => kept.insert(key, TrieNode::Branch(children)),
            },
            leaf => kept.insert(key, leaf),
        }
        count += 1;
    }

    // collapsed edges move to the end of the key order, matching the
    // original wire layout
    for (key, node) in renamed {
        kept.insert(key, node);
    }

    if count == 1 && !pinned && kept.len() == 1 {
        if let Some((name, node)) = kept.entries.pop() {
            return Collapse::Collapsed { name, node };
        }
    }
    Collapse::Kept(kept)
}

/// Collapse single-child chains into multi-character edges.
pub fn optimize_trie(trie: TrieMap) -> TrieMap {
    let delim = XSS_BREAK_DELIM.to_string();
    match optimize_branch(trie, &delim) {
        Collapse::Collapsed { name, node } => {
            // the root always stays a map, even with one surviving edge
            let mut map = TrieMap::new();
            map.insert(name, node);
            map
        }
        Collapse::Kept(map) => map,
    }
}
