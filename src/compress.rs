//! Resource encoder and the batch compression pipeline.
//!
//! Each record becomes a compact field string: a one-character initiator
//! code, a delta/base-36 timestamp vector with trailing empties trimmed,
//! and zero or more `*`-prefixed special-data segments. The per-URL strings
//! are then folded into an optimized character trie.

use std::collections::HashMap;

use crate::base36;
use crate::error::RestimingError;
use crate::servertiming::{format_reference, ServerTimingCounters, ServerTimingIndex};
use crate::session::Session;
use crate::tables;
use crate::trie::{build_trie, optimize_trie, SEPARATOR};
use crate::types::{CompressedPayload, DimensionMap, NamespacedValue, TimingRecord};
use crate::url::{reverse_hostname, trim_url};
use crate::{
    SPECIAL_DATA_CONTENT_TYPE, SPECIAL_DATA_DELIVERY_TYPE, SPECIAL_DATA_DIMENSION_TYPE,
    SPECIAL_DATA_LINK_ATTR_TYPE, SPECIAL_DATA_NAMESPACED_TYPE, SPECIAL_DATA_PREFIX,
    SPECIAL_DATA_PROTOCOL, SPECIAL_DATA_RENDER_BLOCKING_STATUS, SPECIAL_DATA_RESPONSE_STATUS,
    SPECIAL_DATA_SCRIPT_TYPE, SPECIAL_DATA_SERVERTIMING_TYPE, SPECIAL_DATA_SERVICE_WORKER_TYPE,
    SPECIAL_DATA_SIZE_TYPE, SCRIPT_ASYNC_ATTR, SCRIPT_BODY_ATTR, SCRIPT_DEFER_ATTR,
};

/// Round to whole milliseconds and offset from `start_time`.
///
/// A time that rounds to 0 stays 0: unobserved and zero timestamps are
/// identical on the wire.
pub fn trim_timing(time: f64, start_time: f64) -> i64 {
    let time_ms = time.round() as i64;
    if time_ms == 0 {
        0
    } else {
        time_ms - start_time.round() as i64
    }
}

/// Round a timing up to the next whole millisecond.
///
/// Used for service worker offsets, where a sub-millisecond value rounding
/// down to 0 would wrongly read as "not intercepted".
fn round_up_timing(time: f64) -> f64 {
    time.ceil()
}

/// Join base-36 fields on commas and strip the trailing run of empties.
fn join_trimmed<I: IntoIterator<Item = String>>(fields: I) -> String {
    let joined: Vec<String> = fields.into_iter().collect();
    let mut out = joined.join(",");
    while out.ends_with(',') {
        out.pop();
    }
    out
}

/// Guess whether a resource was served from cache.
///
/// Direct evidence from ResourceTiming2 sizing wins; without it, fall back
/// to a duration threshold. A zero `duration` is re-derived from
/// `response_end - start_time` instead of being treated as "under the
/// threshold", so a record that omits `duration` but spans more than 30ms
/// still gets its protocol segment. Payloads for such records differ from
/// encoders that read `duration` verbatim.
pub fn is_cache_hit(e: &TimingRecord) -> bool {
    // if we transferred bytes, it must not be a cache hit
    // (returns false for 304 Not Modified)
    if e.transfer_size.unwrap_or(0) > 0 {
        return false;
    }

    // non-zero body size means an RT2 browser saw transferSize of 0,
    // so it came from cache
    if e.decoded_body_size.unwrap_or(0) > 0 {
        return true;
    }

    let duration = if e.duration != 0.0 {
        e.duration
    } else {
        e.response_end - e.start_time
    };
    duration < 30.0
}

/// Compress content and transfer size information, if available.
///
/// Emits `[encodedBodySize, transferSize - encodedBodySize,
/// decodedBodySize - encodedBodySize]` in base-36 with trailing empties
/// trimmed; a zero or absent transferSize becomes the literal `_`. Returns
/// the empty string when no sizing data exists (fully cross-origin, or no
/// ResourceTiming2 support).
pub fn compress_size(e: &TimingRecord) -> String {
    let enc = e.encoded_body_size.unwrap_or(0) as i64;
    let trans = e.transfer_size.unwrap_or(0) as i64;
    let dec = e.decoded_body_size.unwrap_or(0) as i64;

    if enc == 0 && trans == 0 && dec == 0 {
        return String::new();
    }

    join_trimmed([
        base36::encode(enc),
        if trans != 0 {
            base36::encode(trans - enc)
        } else {
            "_".to_string()
        },
        base36::encode(dec - enc),
    ])
}

fn push_special(data: &mut String, type_tag: char, payload: &str) {
    data.push(SPECIAL_DATA_PREFIX);
    data.push(type_tag);
    data.push_str(payload);
}

/// Format a server-timing duration the way it travels on the wire: minimal
/// decimal notation with the leading zero of sub-1 values stripped
/// (`0.5` -> `.5`).
fn format_duration(duration: f64) -> String {
    let s = format!("{duration}");
    match s.strip_prefix("0.") {
        Some(rest) => format!(".{rest}"),
        None => s,
    }
}

/// Encode one timing record into its compact field string.
pub fn encode_resource(
    session: &mut Session,
    e: &TimingRecord,
    st_index: &ServerTimingIndex,
) -> String {
    let start = e.start_time;

    let mut data = String::new();
    data.push(tables::initiator_type_code(&e.initiator_type));

    // Reverse chronological order: phases that are usually 0 on warm
    // connections (DNS, connect, redirect) go last, so the trailing trim
    // removes them entirely on the common case.
    data.push_str(&join_trimmed(
        [
            trim_timing(e.start_time, 0.0),
            trim_timing(e.response_end, start),
            trim_timing(e.response_start, start),
            trim_timing(e.request_start, start),
            trim_timing(e.connect_end, start),
            trim_timing(e.secure_connection_start, start),
            trim_timing(e.connect_start, start),
            trim_timing(e.domain_lookup_end, start),
            trim_timing(e.domain_lookup_start, start),
            trim_timing(e.redirect_end, start),
            trim_timing(e.redirect_start, start),
        ]
        .map(base36::encode),
    ));

    let size = compress_size(e);
    if !size.is_empty() {
        push_special(&mut data, SPECIAL_DATA_SIZE_TYPE, &size);
    }

    if e.script_async.is_some() || e.script_defer.is_some() || e.script_body.is_some() {
        let mask = (e.script_async.unwrap_or(false) as u32 * SCRIPT_ASYNC_ATTR)
            | (e.script_defer.unwrap_or(false) as u32 * SCRIPT_DEFER_ATTR)
            | (e.script_body.unwrap_or(false) as u32 * SCRIPT_BODY_ATTR);
        push_special(&mut data, SPECIAL_DATA_SCRIPT_TYPE, &mask.to_string());
    }

    if let Some(code) = e
        .rel
        .as_deref()
        .and_then(|rel| tables::rel_type_code(&rel.to_lowercase()))
    {
        push_special(&mut data, SPECIAL_DATA_LINK_ATTR_TYPE, &code.to_string());
    }

    if let Some(entries) = e.server_timing.as_deref().filter(|st| !st.is_empty()) {
        let tokens = entries
            .iter()
            .map(|entry| {
                let (ei, di) = st_index.indices_for(&entry.name, &entry.description);
                format!("{}{}", format_duration(entry.duration), format_reference(ei, di))
            })
            .collect::<Vec<_>>()
            .join(",");
        push_special(&mut data, SPECIAL_DATA_SERVERTIMING_TYPE, &tokens);
    }

    if let Some(worker_start) = e.worker_start.filter(|&w| w != 0.0) {
        // Round up: a service worker start a fraction of a ms after
        // startTime must not collapse to a 0 offset.
        let worker_offset = trim_timing(round_up_timing(worker_start), start);
        let fetch_offset = trim_timing(round_up_timing(e.fetch_start), start);

        let mut payload = base36::encode(worker_offset);
        if fetch_offset != worker_offset {
            let suffix = format!(",{}", base36::encode(fetch_offset));
            payload.push_str(suffix.trim_end_matches(','));
        }
        push_special(&mut data, SPECIAL_DATA_SERVICE_WORKER_TYPE, &payload);
    }

    if let Some(protocol) = e.next_hop_protocol.as_deref().filter(|p| !p.is_empty()) {
        // cached entries usually carry no meaningful protocol
        if !is_cache_hit(e) {
            // normalize http/1.1 to h1.1, consistent with h2 & h3
            let normalized = protocol.replacen("http/", "h", 1);
            let index = session.next_hop_protocols.index_for(&normalized);
            push_special(&mut data, SPECIAL_DATA_PROTOCOL, &index);
        }
    }

    if let Some(content_type) = e.content_type.as_deref() {
        let index = session.content_types.index_for(content_type);
        push_special(&mut data, SPECIAL_DATA_CONTENT_TYPE, &index);
    }

    if let Some(delivery_type) = e.delivery_type.as_deref() {
        let index = session.delivery_types.index_for(delivery_type);
        push_special(&mut data, SPECIAL_DATA_DELIVERY_TYPE, &index);
    }

    if e.render_blocking_status.as_deref() == Some("blocking") {
        push_special(&mut data, SPECIAL_DATA_RENDER_BLOCKING_STATUS, "");
    }

    if let Some(status) = e.response_status.filter(|&s| s != 200) {
        push_special(
            &mut data,
            SPECIAL_DATA_RESPONSE_STATUS,
            &base36::encode(status as i64),
        );
    }

    data
}

/// Drop records the beacon should not carry: non-resource URLs, records
/// outside the `[from, to]` window (compared against `start_time`), and
/// initiator types not in the allow list.
pub fn filter_entries(
    records: &[TimingRecord],
    from: Option<f64>,
    to: Option<f64>,
    initiator_types: Option<&[String]>,
) -> Vec<TimingRecord> {
    let mut filtered = Vec::new();

    for e in records {
        if e.name.starts_with("about:") || e.name.starts_with("javascript:") {
            continue;
        }

        if let Some(from) = from {
            if e.start_time < from {
                continue;
            }
        }

        if let Some(to) = to {
            if e.start_time > to {
                // entries are time sorted, nothing later can match
                break;
            }
        }

        if let Some(allowed) = initiator_types {
            if !allowed.is_empty() && !allowed.iter().any(|t| *t == e.initiator_type) {
                continue;
            }
        }

        filtered.push(e.clone());
    }

    filtered
}

/// Compress a batch of timing records into the wire payload.
///
/// `visible` optionally maps absolute URLs to `[height, width, top, left
/// (, naturalHeight, naturalWidth)]` dimensions gathered by the collecting
/// environment; the first resource for a visible URL gets a dimension
/// prefix.
pub fn compress_resource_timing(
    session: &mut Session,
    records: &[TimingRecord],
    visible: Option<&DimensionMap>,
) -> Result<CompressedPayload, RestimingError> {
    let mut counters = ServerTimingCounters::new();
    for e in records {
        if let Some(entries) = &e.server_timing {
            counters.accumulate(entries);
        }
    }
    let table = counters.build_table();
    let st_index = ServerTimingIndex::build(&table);

    let mut results: Vec<(String, String)> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();

    for e in records {
        let data = encode_resource(session, e, &st_index);

        let url = trim_url(&e.name, &session.trim_urls, session.url_limit);
        let final_url = if session.hostnames_reversed {
            reverse_hostname(&url)
        } else {
            url.clone()
        };

        if let Some(map) = &e.data {
            let mut namespaced = String::new();
            for (key, value) in map {
                match value {
                    NamespacedValue::One(v) => {
                        push_special(
                            &mut namespaced,
                            SPECIAL_DATA_NAMESPACED_TYPE,
                            &format!("{key}:{v}"),
                        );
                    }
                    NamespacedValue::Many(vs) => {
                        // repeated segments under the same key; the decoder
                        // re-accumulates them into an array
                        for v in vs {
                            push_special(
                                &mut namespaced,
                                SPECIAL_DATA_NAMESPACED_TYPE,
                                &format!("{key}:{v}"),
                            );
                        }
                    }
                }
            }

            match index_of.get(&final_url) {
                Some(&i) => {
                    // URL already seen: keep the canonical timing data and
                    // just supplement it with the new namespaced segments
                    results[i].1.push_str(&namespaced);
                }
                None => {
                    index_of.insert(final_url.clone(), results.len());
                    results.push((final_url, format!("{data}{namespaced}")));
                }
            }
            continue;
        }

        match index_of.get(&final_url) {
            Some(&i) => {
                // another resource for the same URL stacks behind a
                // separator
                results[i].1.push(SEPARATOR);
                results[i].1.push_str(&data);
            }
            None => {
                let value = match visible.and_then(|v| v.get(&url)) {
                    Some(dims) => {
                        let encoded = join_trimmed(
                            dims.iter().map(|&d| base36::encode(d as i64)),
                        );
                        format!(
                            "{}{}{}{}{}",
                            SPECIAL_DATA_PREFIX,
                            SPECIAL_DATA_DIMENSION_TYPE,
                            encoded,
                            SEPARATOR,
                            data
                        )
                    }
                    None => data,
                };
                index_of.insert(final_url.clone(), results.len());
                results.push((final_url, value));
            }
        }
    }

    let trie = build_trie(&results, &session.xss_break_words)?;
    let restiming = optimize_trie(trie);

    tracing::debug!(
        records = records.len(),
        urls = results.len(),
        servertiming_entries = table.len(),
        "compressed resource timing batch"
    );

    Ok(CompressedPayload {
        restiming,
        servertiming: table,
    })
}
