//! Codec session state.

use crate::tables::ValueMap;
use crate::trie::DEFAULT_XSS_BREAK_WORDS;
use crate::url::DEFAULT_URL_LIMIT;

/// Configuration and growable state for one compression or decompression
/// batch.
///
/// The value maps grow monotonically as unknown protocol, content-type and
/// delivery-type values are encountered, so a session must not be shared
/// between concurrent batches without external serialization. Independent
/// sessions are fully isolated; there is no module-level state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Reverse the authority component of URLs before they become trie
    /// keys. On by default; must match between encoder and decoder.
    pub hostnames_reversed: bool,
    /// Maximum number of characters kept per URL.
    pub url_limit: usize,
    /// Substring patterns at which URLs are truncated before compression.
    pub trim_urls: Vec<String>,
    /// Sensitive words split before trie insertion.
    pub xss_break_words: Vec<String>,

    pub content_types: ValueMap,
    pub delivery_types: ValueMap,
    pub next_hop_protocols: ValueMap,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            hostnames_reversed: true,
            url_limit: DEFAULT_URL_LIMIT,
            trim_urls: Vec::new(),
            xss_break_words: DEFAULT_XSS_BREAK_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
            content_types: ValueMap::content_types(),
            delivery_types: ValueMap::delivery_types(),
            next_hop_protocols: ValueMap::next_hop_protocols(),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}
