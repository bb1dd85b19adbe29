//! Fixed and growable lookup tables for enumerated record fields.
//!
//! The growable maps (content-type, delivery-type, next-hop-protocol) are
//! owned by a [`crate::Session`] and grow monotonically within one
//! compression session as new values are encountered. They are never stored
//! in module-level state, so independent sessions cannot corrupt each
//! other's numbering.

use std::collections::HashMap;

use crate::base36;

/// Map an initiator type to its one-character wire code.
///
/// Unknown types map to `'0'` ("other"). Codes 0-9 cover the common types;
/// letters are overflow categories.
pub fn initiator_type_code(initiator_type: &str) -> char {
    match initiator_type {
        "other" => '0',
        "img" => '1',
        "link" => '2',
        "script" => '3',
        "css" => '4',
        "xmlhttprequest" => '5',
        // the root HTML page itself
        "html" | "navigation" => '6',
        "image" => '7',
        "beacon" => '8',
        "fetch" => '9',
        // IE11 and some Edge versions report "subdocument" for iframes
        "iframe" | "subdocument" | "frame" => 'a',
        "body" => 'b',
        "input" => 'c',
        "object" => 'd',
        "video" => 'e',
        "audio" => 'f',
        "source" => 'g',
        "track" => 'h',
        "embed" => 'i',
        "eventsource" => 'j',
        "early-hints" => 'k',
        "ping" => 'l',
        "font" => 'm',
        _ => '0',
    }
}

/// Map a one-character wire code back to an initiator type.
///
/// Unknown codes map to `"other"`. Code 6 decodes to `"navigation"` (the
/// encoder maps both `"html"` and `"navigation"` there).
pub fn initiator_type_from_code(code: char) -> &'static str {
    match code {
        '0' => "other",
        '1' => "img",
        '2' => "link",
        '3' => "script",
        '4' => "css",
        '5' => "xmlhttprequest",
        '6' => "navigation",
        '7' => "image",
        '8' => "beacon",
        '9' => "fetch",
        'a' => "frame",
        'b' => "body",
        'c' => "input",
        'd' => "object",
        'e' => "video",
        'f' => "audio",
        'g' => "source",
        'h' => "track",
        'i' => "embed",
        'j' => "eventsource",
        'k' => "early-hints",
        'l' => "ping",
        'm' => "font",
        _ => "other",
    }
}

/// The only `rel` types reference-able from ResourceTiming.
///
/// <https://html.spec.whatwg.org/multipage/links.html#linkTypes>
pub fn rel_type_code(rel: &str) -> Option<u32> {
    match rel {
        "prefetch" => Some(1),
        "preload" => Some(2),
        "prerender" => Some(3),
        "stylesheet" => Some(4),
        _ => None,
    }
}

pub fn rel_type_from_code(code: u32) -> Option<&'static str> {
    match code {
        1 => Some("prefetch"),
        2 => Some("preload"),
        3 => Some("prerender"),
        4 => Some("stylesheet"),
        _ => None,
    }
}

/// A growable string-to-index map with a fixed set of well-known seed
/// values.
///
/// Values beyond the seeds are assigned indices in encounter order and can
/// be retrieved via [`ValueMap::appended_values`] for shipping alongside a
/// beacon.
#[derive(Debug, Clone)]
pub struct ValueMap {
    /// Next index to assign.
    next: u32,
    /// Number of well-known seed values.
    seeded: u32,
    by_value: HashMap<String, u32>,
    by_index: Vec<String>,
}

impl ValueMap {
    pub fn with_seeds(seeds: &[&str]) -> Self {
        let mut map = Self {
            next: 0,
            seeded: seeds.len() as u32,
            by_value: HashMap::new(),
            by_index: Vec::new(),
        };
        for seed in seeds {
            map.insert(seed);
        }
        map
    }

    /// Well-known content types.
    pub fn content_types() -> Self {
        Self::with_seeds(&[
            "application/json",
            "application/xml",
            "font/woff",
            "font/woff2",
            "image/avif",
            "image/gif",
            "image/jpeg",
            "image/png",
            "image/svg+xml",
            "image/webp",
            "image/x-icon",
            "text/css",
            "text/html",
            "text/javascript",
            "text/plain",
        ])
    }

    /// Well-known delivery types.
    ///
    /// <https://developer.mozilla.org/en-US/docs/Web/API/PerformanceResourceTiming/deliveryType>
    pub fn delivery_types() -> Self {
        Self::with_seeds(&["cache", "navigational-prefetch"])
    }

    /// Well-known next hop protocols, with `http/` already normalized to
    /// `h`.
    ///
    /// <https://developer.mozilla.org/en-US/docs/Web/API/PerformanceResourceTiming/nextHopProtocol>
    pub fn next_hop_protocols() -> Self {
        Self::with_seeds(&["h2", "h0.9", "h1.0", "h1.1", "h2c", "h3"])
    }

    fn insert(&mut self, value: &str) -> u32 {
        let index = self.next;
        self.next += 1;
        self.by_value.insert(value.to_string(), index);
        self.by_index.push(value.to_string());
        index
    }

    /// Look up (or assign) the index for a value and return it in base-36.
    ///
    /// Index 0 of an already-known value returns the empty string per the
    /// wire convention. Newly assigned indices are always returned in full.
    pub fn index_for(&mut self, value: &str) -> String {
        match self.by_value.get(value) {
            Some(0) => String::new(),
            Some(&index) => base36::encode(index as i64),
            None => {
                let index = self.insert(value);
                tracing::debug!(value, index, "value map grew");
                if index == 0 {
                    "0".to_string()
                } else {
                    base36::encode(index as i64)
                }
            }
        }
    }

    /// Value stored at an index, if any.
    pub fn value_at(&self, index: u32) -> Option<&str> {
        self.by_index.get(index as usize).map(String::as_str)
    }

    /// Values assigned beyond the well-known seeds, in assignment order.
    pub fn appended_values(&self) -> &[String] {
        &self.by_index[self.seeded as usize..]
    }
}
