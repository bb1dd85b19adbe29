//! Compact codec for web resource timing telemetry.
//!
//! Compresses a batch of per-resource timing records into a small,
//! URL-safe JSON payload: URLs are deduplicated into an optimized
//! character trie, timestamps become base-36 offsets from each resource's
//! start time, and repeated Server-Timing metadata is factored into a
//! shared lookup table. [`decompress_resource_timing`] inverts the whole
//! pipeline.
//!
//! ```
//! use restiming::{compress_resource_timing, decompress_resource_timing, Session, TimingRecord};
//!
//! let records = vec![TimingRecord {
//!     name: "http://site.com/js/app.js".to_string(),
//!     initiator_type: "script".to_string(),
//!     start_time: 10.0,
//!     response_end: 110.0,
//!     ..Default::default()
//! }];
//!
//! let mut session = Session::new();
//! let payload = compress_resource_timing(&mut session, &records, None).unwrap();
//! let decoded = decompress_resource_timing(&session, &payload);
//! assert_eq!(decoded[0].name, records[0].name);
//! assert_eq!(decoded[0].start_time, 10.0);
//! ```

pub mod base36;
pub mod compress;
pub mod contribution;
pub mod decompress;
pub mod error;
pub mod servertiming;
pub mod session;
pub mod tables;
pub mod trie;
pub mod types;
pub mod url;

pub use compress::{compress_resource_timing, filter_entries};
pub use contribution::add_contribution;
pub use decompress::decompress_resource_timing;
pub use error::RestimingError;
pub use servertiming::{ServerTimingTable, ServerTimingTableEntry};
pub use session::Session;
pub use trie::{TrieMap, TrieNode};
pub use types::{
    CompressedPayload, DimensionMap, NamespacedValue, ServerTimingEntry, TimingRecord,
};

/// Marks the start of a typed metadata fragment inside a trie leaf.
pub const SPECIAL_DATA_PREFIX: char = '*';

/// Visual dimensions: `*0height,width,y,x,naturalHeight,naturalWidth`.
pub const SPECIAL_DATA_DIMENSION_TYPE: char = '0';
/// Transfer sizes: `*1encoded,transferDelta,decodedDelta`.
pub const SPECIAL_DATA_SIZE_TYPE: char = '1';
/// Script attribute mask: `*2<mask>` in decimal.
pub const SPECIAL_DATA_SCRIPT_TYPE: char = '2';
/// Server-Timing references: `*3dur[:e[.d]],...`.
pub const SPECIAL_DATA_SERVERTIMING_TYPE: char = '3';
/// Link `rel` code: `*4<code>` in decimal.
pub const SPECIAL_DATA_LINK_ATTR_TYPE: char = '4';
/// Caller-supplied namespaced value: `*5key:value`.
pub const SPECIAL_DATA_NAMESPACED_TYPE: char = '5';
/// Service worker timing: `*6workerOffset[,fetchOffset]`.
pub const SPECIAL_DATA_SERVICE_WORKER_TYPE: char = '6';
/// Network protocol: `*7<index>` into the protocol value map.
pub const SPECIAL_DATA_PROTOCOL: char = '7';
/// Content type: `*8<index>` into the content-type value map.
pub const SPECIAL_DATA_CONTENT_TYPE: char = '8';
/// Delivery type: `*9<index>` into the delivery-type value map.
pub const SPECIAL_DATA_DELIVERY_TYPE: char = '9';
/// Render-blocking marker: `*a`, present only for blocking resources.
pub const SPECIAL_DATA_RENDER_BLOCKING_STATUS: char = 'a';
/// HTTP response status: `*b<status>` in base-36, omitted for 200.
pub const SPECIAL_DATA_RESPONSE_STATUS: char = 'b';

/// Script element had the `async` attribute.
pub const SCRIPT_ASYNC_ATTR: u32 = 0x1;
/// Script element had the `defer` attribute.
pub const SCRIPT_DEFER_ATTR: u32 = 0x2;
/// Script element was located in the document body.
pub const SCRIPT_BODY_ATTR: u32 = 0x4;
