//! Record and payload types shared by the encoder and decoder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::servertiming::ServerTimingTable;
use crate::trie::TrieMap;

/// One resource fetch observation.
///
/// All timestamps are non-negative milliseconds relative to an implicit
/// navigation start. A timestamp of 0 means "not observed", which is
/// indistinguishable from "occurred exactly at navigation start". This
/// ambiguity is inherent to the wire format and is preserved for
/// compatibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingRecord {
    /// Absolute URL of the resource. Unique key within a batch after
    /// trimming.
    pub name: String,

    pub initiator_type: String,

    pub start_time: f64,
    pub redirect_start: f64,
    pub redirect_end: f64,
    pub fetch_start: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub secure_connection_start: f64,
    pub connect_end: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,

    /// `response_end - start_time`, or 0 when `response_end` is 0.
    pub duration: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_body_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_body_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_timing: Option<Vec<ServerTimingEntry>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_async: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_defer: Option<bool>,
    /// True when the script tag lives in BODY rather than HEAD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_body: Option<bool>,

    /// Link relation (`prefetch`, `preload`, `prerender`, `stylesheet`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_blocking_status: Option<String>,

    /// HTTP response status. 200 is the implied default and is never
    /// transmitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,

    /// Service worker start time. 0 / absent means the request was not
    /// intercepted by a service worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_start: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_width: Option<u64>,

    /// Free-form namespaced extension data.
    #[serde(rename = "_data", skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, NamespacedValue>>,

    /// Fractional share of total page load time attributed to this
    /// resource. Derived, see [`crate::contribution`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contribution: Option<f64>,
}

/// One Server-Timing header entry attached to a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerTimingEntry {
    pub name: String,
    pub duration: f64,
    pub description: String,
}

/// A value in the namespaced `_data` extension map. Repeated keys on the
/// wire accumulate into the `Many` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamespacedValue {
    One(String),
    Many(Vec<String>),
}

/// The compressed wire payload, suitable for JSON serialization into a
/// beacon query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressedPayload {
    pub restiming: TrieMap,
    #[serde(default)]
    pub servertiming: ServerTimingTable,
}

/// Visible-element dimensions keyed by absolute URL, as supplied by the
/// collecting environment: `[height, width, top, left]` optionally followed
/// by `[natural_height, natural_width]` when they differ.
pub type DimensionMap = std::collections::HashMap<String, Vec<u64>>;
