//! Trie decoder and resource decoder: the exact inverse of
//! [`crate::compress`].
//!
//! Decoding is best-effort throughout: malformed fields degrade to default
//! values ("other" initiator, 0 timestamps, absent optionals) rather than
//! failing, since the payload is lossy-tolerant telemetry.

use crate::base36;
use crate::servertiming::{decode_references, ServerTimingTable};
use crate::session::Session;
use crate::tables;
use crate::types::{CompressedPayload, NamespacedValue, TimingRecord};
use crate::trie::{TrieMap, TrieNode, SEPARATOR};
use crate::url::reverse_hostname;
use crate::{
    SPECIAL_DATA_CONTENT_TYPE, SPECIAL_DATA_DELIVERY_TYPE, SPECIAL_DATA_DIMENSION_TYPE,
    SPECIAL_DATA_LINK_ATTR_TYPE, SPECIAL_DATA_NAMESPACED_TYPE, SPECIAL_DATA_PREFIX,
    SPECIAL_DATA_PROTOCOL, SPECIAL_DATA_RENDER_BLOCKING_STATUS, SPECIAL_DATA_RESPONSE_STATUS,
    SPECIAL_DATA_SCRIPT_TYPE, SPECIAL_DATA_SERVERTIMING_TYPE, SPECIAL_DATA_SERVICE_WORKER_TYPE,
    SPECIAL_DATA_SIZE_TYPE, SCRIPT_ASYNC_ATTR, SCRIPT_BODY_ATTR, SCRIPT_DEFER_ATTR,
};

/// Visual dimensions shared by every resource stacked under one trie leaf.
#[derive(Debug, Clone, Copy)]
struct DimensionData {
    height: u64,
    width: u64,
    x: u64,
    y: u64,
    natural_height: u64,
    natural_width: u64,
}

fn is_dimension_data(fragment: &str) -> bool {
    let mut chars = fragment.chars();
    chars.next() == Some(SPECIAL_DATA_PREFIX) && chars.next() == Some(SPECIAL_DATA_DIMENSION_TYPE)
}

/// Parse a `*0height,width,y,x(,naturalHeight,naturalWidth)` fragment.
///
/// Trailing empties decode to 0; absent naturals backfill from
/// height/width (the newer wire revision).
fn decode_dimension(fragment: &str) -> Option<DimensionData> {
    if !is_dimension_data(fragment) {
        return None;
    }

    let values: Vec<u64> = fragment[2..]
        .split(',')
        .map(|v| base36::decode(v).max(0) as u64)
        .collect();
    if values.len() < 2 {
        return None;
    }

    let height = values[0];
    let width = values[1];
    Some(DimensionData {
        height,
        width,
        y: values.get(2).copied().unwrap_or(0),
        x: values.get(3).copied().unwrap_or(0),
        natural_height: values.get(4).copied().unwrap_or(height),
        natural_width: values.get(5).copied().unwrap_or(width),
    })
}

fn apply_dimension(record: &mut TimingRecord, dims: &DimensionData) {
    record.height = Some(dims.height);
    record.width = Some(dims.width);
    record.x = Some(dims.x);
    record.y = Some(dims.y);
    record.natural_height = Some(dims.natural_height);
    record.natural_width = Some(dims.natural_width);
}

/// Timestamp at `idx`, offset from `start_time`; absent or 0 stays 0.
fn decode_timestamp(timings: &[i64], idx: usize, start_time: f64) -> f64 {
    match timings.get(idx) {
        Some(&t) if t != 0 => t as f64 + start_time,
        _ => 0.0,
    }
}

fn decode_size(compressed: &str, record: &mut TimingRecord) {
    let mut values: Vec<i64> = Vec::new();
    for (i, part) in compressed.split(',').enumerate() {
        let value = if part == "_" {
            // special non-delta marker for a zero transferSize
            0
        } else if i > 0 {
            // empty fields are deltas of 0
            base36::decode(part) + values[0]
        } else {
            base36::decode(part)
        };
        values.push(value);
    }

    // missing fields are deltas of 0 from encodedBodySize
    while values.len() < 3 {
        values.push(values[0]);
    }

    record.encoded_body_size = Some(values[0].max(0) as u64);
    record.transfer_size = Some(values[1].max(0) as u64);
    record.decoded_body_size = Some(values[2].max(0) as u64);
}

fn decode_script_type(compressed: &str, record: &mut TimingRecord) {
    let mask: u32 = compressed.parse().unwrap_or(0);
    record.script_async = Some(mask & SCRIPT_ASYNC_ATTR == SCRIPT_ASYNC_ATTR);
    record.script_defer = Some(mask & SCRIPT_DEFER_ATTR == SCRIPT_DEFER_ATTR);
    record.script_body = Some(mask & SCRIPT_BODY_ATTR == SCRIPT_BODY_ATTR);
}

fn decode_link_attr(compressed: &str, record: &mut TimingRecord) {
    let code: u32 = compressed.parse().unwrap_or(0);
    if let Some(rel) = tables::rel_type_from_code(code) {
        record.rel = Some(rel.to_string());
    }
}

fn decode_namespaced(compressed: &str, record: &mut TimingRecord) {
    let Some(colon) = compressed.find(':') else {
        return;
    };
    if colon == 0 {
        return;
    }

    let key = &compressed[..colon];
    let value = compressed[colon + 1..].to_string();

    let data = record.data.get_or_insert_with(Default::default);
    let updated = match data.remove(key) {
        None => NamespacedValue::One(value),
        Some(NamespacedValue::One(first)) => NamespacedValue::Many(vec![first, value]),
        Some(NamespacedValue::Many(mut values)) => {
            values.push(value);
            NamespacedValue::Many(values)
        }
    };
    data.insert(key.to_string(), updated);
}

fn decode_service_worker(compressed: &str, record: &mut TimingRecord) {
    let mut parts = compressed.split(',');
    let offset = base36::decode(parts.next().unwrap_or(""));
    record.worker_start = Some(record.start_time + offset as f64);

    // an explicit fetchStart overrides the startTime/redirectEnd inference
    if let Some(fetch) = parts.next().filter(|p| !p.is_empty()) {
        record.fetch_start = record.start_time + base36::decode(fetch) as f64;
    }
}

fn decode_next_hop_protocol(session: &Session, compressed: &str, record: &mut TimingRecord) {
    if compressed.chars().count() >= 2 {
        // initial format revision, which carried the normalized protocol
        // string itself
        if let Some(rest) = compressed.strip_prefix("h0") {
            record.next_hop_protocol = Some(format!("http/0{rest}"));
        } else if let Some(rest) = compressed.strip_prefix("h1") {
            record.next_hop_protocol = Some(format!("http/1{rest}"));
        } else {
            record.next_hop_protocol = Some(compressed.to_string());
        }
    } else {
        let index = base36::decode(compressed).max(0) as u32;
        record.next_hop_protocol = session
            .next_hop_protocols
            .value_at(index)
            .map(str::to_string);
    }
}

fn decode_content_type(session: &Session, compressed: &str, record: &mut TimingRecord) {
    let index = base36::decode(compressed).max(0) as u32;
    record.content_type = session.content_types.value_at(index).map(str::to_string);
}

fn decode_delivery_type(session: &Session, compressed: &str, record: &mut TimingRecord) {
    let index = base36::decode(compressed).max(0) as u32;
    record.delivery_type = session.delivery_types.value_at(index).map(str::to_string);
}

fn decode_response_status(compressed: &str, record: &mut TimingRecord) {
    let status = if compressed.is_empty() {
        200
    } else {
        base36::decode(compressed).clamp(0, u16::MAX as i64) as u16
    };
    record.response_status = Some(status);
}

fn decode_special_data(
    session: &Session,
    fragment: &str,
    record: &mut TimingRecord,
    table: &ServerTimingTable,
) {
    let Some(type_tag) = fragment.chars().next() else {
        return;
    };
    let payload = &fragment[type_tag.len_utf8()..];

    match type_tag {
        t if t == SPECIAL_DATA_SIZE_TYPE => decode_size(payload, record),
        t if t == SPECIAL_DATA_SCRIPT_TYPE => decode_script_type(payload, record),
        t if t == SPECIAL_DATA_SERVERTIMING_TYPE => {
            if !payload.is_empty() {
                record.server_timing = Some(decode_references(table, payload));
            }
        }
        t if t == SPECIAL_DATA_LINK_ATTR_TYPE => decode_link_attr(payload, record),
        t if t == SPECIAL_DATA_NAMESPACED_TYPE => decode_namespaced(payload, record),
        t if t == SPECIAL_DATA_SERVICE_WORKER_TYPE => decode_service_worker(payload, record),
        t if t == SPECIAL_DATA_PROTOCOL => decode_next_hop_protocol(session, payload, record),
        t if t == SPECIAL_DATA_CONTENT_TYPE => decode_content_type(session, payload, record),
        t if t == SPECIAL_DATA_DELIVERY_TYPE => decode_delivery_type(session, payload, record),
        t if t == SPECIAL_DATA_RENDER_BLOCKING_STATUS => {
            // presence means blocking
            record.render_blocking_status = Some("blocking".to_string());
        }
        t if t == SPECIAL_DATA_RESPONSE_STATUS => decode_response_status(payload, record),
        // unknown tags are skipped, not fatal
        _ => {}
    }
}

/// Decode one compressed field string back into a full timing record.
pub fn decode_resource(
    session: &Session,
    data: &str,
    url: &str,
    table: &ServerTimingTable,
) -> TimingRecord {
    let name = if session.hostnames_reversed {
        reverse_hostname(url)
    } else {
        url.to_string()
    };

    let initiator_code = data.chars().next().unwrap_or('0');

    let segments: Vec<&str> = if data.chars().count() > 1 {
        data.split(SPECIAL_DATA_PREFIX).collect()
    } else {
        Vec::new()
    };

    let timings: Vec<i64> = segments
        .first()
        .and_then(|s| {
            let mut chars = s.char_indices();
            chars.next();
            chars.next().map(|(i, _)| &s[i..])
        })
        .map(|vector| vector.split(',').map(base36::decode).collect())
        .unwrap_or_default();

    let start_time = timings.first().copied().unwrap_or(0) as f64;

    // fetchStart is the redirectEnd time when a redirect happened, else
    // startTime; service worker special data may override it below
    let fetch_start = if timings.len() < 10 {
        start_time
    } else {
        decode_timestamp(&timings, 9, start_time)
    };

    let redirect_end = decode_timestamp(&timings, 9, start_time);
    let response_end = decode_timestamp(&timings, 1, start_time);

    let mut record = TimingRecord {
        name,
        initiator_type: tables::initiator_type_from_code(initiator_code).to_string(),
        start_time,
        // the encoder never transmits redirectStart; a redirect implies it
        // equals startTime
        redirect_start: if redirect_end > 0.0 { start_time } else { 0.0 },
        redirect_end,
        fetch_start,
        domain_lookup_start: decode_timestamp(&timings, 8, start_time),
        domain_lookup_end: decode_timestamp(&timings, 7, start_time),
        connect_start: decode_timestamp(&timings, 6, start_time),
        secure_connection_start: decode_timestamp(&timings, 5, start_time),
        connect_end: decode_timestamp(&timings, 4, start_time),
        request_start: decode_timestamp(&timings, 3, start_time),
        response_start: decode_timestamp(&timings, 2, start_time),
        response_end,
        duration: if response_end > 0.0 {
            response_end - start_time
        } else {
            0.0
        },
        ..Default::default()
    };

    for fragment in segments.iter().skip(1) {
        decode_special_data(session, fragment, &mut record, table);
    }

    record
}

fn walk_trie(
    session: &Session,
    map: &TrieMap,
    table: &ServerTimingTable,
    prefix: &str,
    out: &mut Vec<TimingRecord>,
) {
    for (key, node) in map.iter() {
        let mut node_key = format!("{prefix}{key}");
        // a trailing pipe marks a URL that is also a prefix of longer URLs
        if node_key.ends_with(SEPARATOR) {
            node_key.pop();
        }

        match node {
            TrieNode::Leaf(data) => {
                let mut stacked: Vec<&str> = data.split(SEPARATOR).collect();

                let mut dims = None;
                if let Some(first) = stacked.first() {
                    if is_dimension_data(first) {
                        dims = decode_dimension(first);
                        stacked.remove(0);
                    }
                }

                for fragment in stacked {
                    if fragment.is_empty() || fragment.starts_with(SPECIAL_DATA_PREFIX) {
                        // special-data-only fragments carry no resource of
                        // their own
                        continue;
                    }

                    let mut record = decode_resource(session, fragment, &node_key, table);
                    if let Some(dims) = &dims {
                        apply_dimension(&mut record, dims);
                    }
                    out.push(record);
                }
            }
            TrieNode::Branch(children) => {
                walk_trie(session, children, table, &node_key, out);
            }
        }
    }
}

/// Decompress a wire payload back into timing records.
///
/// Output order follows trie key order, which is not guaranteed to equal
/// the original temporal order.
pub fn decompress_resource_timing(session: &Session, payload: &CompressedPayload) -> Vec<TimingRecord> {
    let mut records = Vec::new();
    walk_trie(
        session,
        &payload.restiming,
        &payload.servertiming,
        "",
        &mut records,
    );
    tracing::debug!(records = records.len(), "decompressed resource timing batch");
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_resource_decodes() {
        let session = Session::new();
        let record = decode_resource(&session, "1a,2s,2q", "http://x.com/a", &Vec::new());
        assert_eq!(record.initiator_type, "img");
        assert_eq!(record.start_time, 10.0);
        assert_eq!(record.response_end, 110.0);
        assert_eq!(record.response_start, 100.0);
        assert_eq!(record.duration, 100.0);
        assert_eq!(record.fetch_start, 10.0);
        assert_eq!(record.redirect_start, 0.0);
    }

    #[test]
    fn redirect_implies_redirect_start() {
        let session = Session {
            hostnames_reversed: false,
            ..Session::new()
        };
        // full 11-element vector with redirectEnd at index 9
        let record = decode_resource(&session, "3a,2s,,,,,,,,5", "http://x.com/a", &Vec::new());
        assert_eq!(record.redirect_end, 15.0);
        assert_eq!(record.redirect_start, 10.0);
        assert_eq!(record.fetch_start, 15.0);
    }

    #[test]
    fn legacy_protocol_formats_expand() {
        let session = Session::new();
        let mut record = TimingRecord::default();
        decode_next_hop_protocol(&session, "h1.1", &mut record);
        assert_eq!(record.next_hop_protocol.as_deref(), Some("http/1.1"));

        let mut record = TimingRecord::default();
        decode_next_hop_protocol(&session, "h2c", &mut record);
        assert_eq!(record.next_hop_protocol.as_deref(), Some("h2c"));

        let mut record = TimingRecord::default();
        decode_next_hop_protocol(&session, "5", &mut record);
        assert_eq!(record.next_hop_protocol.as_deref(), Some("h3"));

        let mut record = TimingRecord::default();
        decode_next_hop_protocol(&session, "", &mut record);
        assert_eq!(record.next_hop_protocol.as_deref(), Some("h2"));
    }

    #[test]
    fn namespaced_values_accumulate() {
        let mut record = TimingRecord::default();
        decode_namespaced("key:one", &mut record);
        decode_namespaced("key:two", &mut record);
        decode_namespaced("key:three", &mut record);
        let data = record.data.unwrap();
        assert_eq!(
            data.get("key"),
            Some(&NamespacedValue::Many(vec![
                "one".to_string(),
                "two".to_string(),
                "three".to_string()
            ]))
        );
    }

    #[test]
    fn dimension_backfills_naturals() {
        let dims = decode_dimension("*05,a").unwrap();
        assert_eq!(dims.height, 5);
        assert_eq!(dims.width, 10);
        assert_eq!(dims.x, 0);
        assert_eq!(dims.y, 0);
        assert_eq!(dims.natural_height, 5);
        assert_eq!(dims.natural_width, 10);

        let dims = decode_dimension("*05,a,1,2,6,b").unwrap();
        assert_eq!(dims.natural_height, 6);
        assert_eq!(dims.natural_width, 11);
    }

    #[test]
    fn size_decode_inverts_examples() {
        let mut record = TimingRecord::default();
        decode_size(",a", &mut record);
        assert_eq!(record.encoded_body_size, Some(0));
        assert_eq!(record.transfer_size, Some(10));
        assert_eq!(record.decoded_body_size, Some(0));

        let mut record = TimingRecord::default();
        decode_size("a,5", &mut record);
        assert_eq!(record.encoded_body_size, Some(10));
        assert_eq!(record.transfer_size, Some(15));
        assert_eq!(record.decoded_body_size, Some(10));

        let mut record = TimingRecord::default();
        decode_size("a,_,k", &mut record);
        assert_eq!(record.encoded_body_size, Some(10));
        assert_eq!(record.transfer_size, Some(0));
        assert_eq!(record.decoded_body_size, Some(30));

        // empty middle field is a delta of 0, unlike the literal `_`
        let mut record = TimingRecord::default();
        decode_size("a,,k", &mut record);
        assert_eq!(record.transfer_size, Some(10));
    }

    #[test]
    fn unknown_special_tag_is_skipped() {
        let session = Session::new();
        let record = decode_resource(&session, "15*zjunk", "http://x.com/a", &Vec::new());
        assert_eq!(record.start_time, 5.0);
    }
}
