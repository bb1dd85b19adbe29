//! Server-Timing lookup table codec.
//!
//! Metric names and descriptions repeat heavily across a batch, so they are
//! deduplicated into a frequency-ordered table once per compression batch
//! and referenced per-resource by `(entry index, description index)`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::ServerTimingEntry;

/// One table entry: either a bare metric name (shorthand for "exactly one,
/// empty description") or `[name, desc0, desc1, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerTimingTableEntry {
    Name(String),
    WithDescriptions(Vec<String>),
}

pub type ServerTimingTable = Vec<ServerTimingTableEntry>;

/// Per-batch occurrence counts for one metric name.
#[derive(Debug, Default, Clone)]
struct MetricCounter {
    count: u64,
    /// description -> count, in first-seen order.
    counts: Vec<(String, u64)>,
}

/// Occurrence counters across a batch, in first-seen order.
///
/// First-seen order is the deterministic tie-break for equal counts when
/// the table is built.
#[derive(Debug, Default, Clone)]
pub struct ServerTimingCounters {
    metrics: Vec<(String, MetricCounter)>,
}

impl ServerTimingCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the `(name, description)` pairs of one resource's entries.
    pub fn accumulate(&mut self, entries: &[ServerTimingEntry]) {
        for entry in entries {
            let pos = match self.metrics.iter().position(|(n, _)| *n == entry.name) {
                Some(pos) => pos,
                None => {
                    self.metrics
                        .push((entry.name.clone(), MetricCounter::default()));
                    self.metrics.len() - 1
                }
            };
            let metric = &mut self.metrics[pos].1;
            metric.count += 1;
            match metric
                .counts
                .iter_mut()
                .find(|(d, _)| *d == entry.description)
            {
                Some((_, count)) => *count += 1,
                None => metric.counts.push((entry.description.clone(), 1)),
            }
        }
    }

    /// Build the deduplicated lookup table, ordered by descending total
    /// count (names) and descending per-description count, ties broken by
    /// first-seen order.
    pub fn build_table(&self) -> ServerTimingTable {
        let mut metrics: Vec<&(String, MetricCounter)> = self.metrics.iter().collect();
        // stable sort keeps first-seen order on ties
        metrics.sort_by(|a, b| b.1.count.cmp(&a.1.count));

        metrics
            .into_iter()
            .map(|(name, metric)| {
                let mut descriptions: Vec<&(String, u64)> = metric.counts.iter().collect();
                descriptions.sort_by(|a, b| b.1.cmp(&a.1));
                let descriptions: Vec<String> =
                    descriptions.into_iter().map(|(d, _)| d.clone()).collect();

                if descriptions.len() == 1 && descriptions[0].is_empty() {
                    // special case: no non-empty descriptions
                    ServerTimingTableEntry::Name(name.clone())
                } else {
                    let mut entry = Vec::with_capacity(descriptions.len() + 1);
                    entry.push(name.clone());
                    entry.extend(descriptions);
                    ServerTimingTableEntry::WithDescriptions(entry)
                }
            })
            .collect()
    }
}

/// O(1) reverse lookup from `(name, description)` to table indices, built
/// once per batch.
#[derive(Debug, Default, Clone)]
pub struct ServerTimingIndex {
    entries: HashMap<String, (usize, HashMap<String, usize>)>,
}

impl ServerTimingIndex {
    pub fn build(table: &ServerTimingTable) -> Self {
        let mut entries = HashMap::new();
        for (entry_index, entry) in table.iter().enumerate() {
            match entry {
                ServerTimingTableEntry::Name(name) => {
                    let mut descriptions = HashMap::new();
                    descriptions.insert(String::new(), 0);
                    entries.insert(name.clone(), (entry_index, descriptions));
                }
                ServerTimingTableEntry::WithDescriptions(parts) => {
                    let Some((name, descriptions)) = parts.split_first() else {
                        continue;
                    };
                    let descriptions = descriptions
                        .iter()
                        .enumerate()
                        .map(|(i, d)| (d.clone(), i))
                        .collect();
                    entries.insert(name.clone(), (entry_index, descriptions));
                }
            }
        }
        Self { entries }
    }

    /// Table indices for a `(name, description)` pair, defaulting to
    /// `(0, 0)` when not present.
    pub fn indices_for(&self, name: &str, description: &str) -> (usize, usize) {
        match self.entries.get(name) {
            Some((entry_index, descriptions)) => (
                *entry_index,
                descriptions.get(description).copied().unwrap_or(0),
            ),
            None => (0, 0),
        }
    }
}

/// Shorthand reference into the lookup table:
/// `":<entryIndex>.<descriptionIndex>"` with every zero component (and a
/// then-empty `:`) omitted.
pub fn format_reference(entry_index: usize, description_index: usize) -> String {
    let mut s = String::new();
    if entry_index != 0 {
        s.push_str(&entry_index.to_string());
    }
    if description_index != 0 {
        s.push('.');
        s.push_str(&description_index.to_string());
    }
    if s.is_empty() {
        s
    } else {
        format!(":{s}")
    }
}

/// Decode one `duration[:entryIndex[.descriptionIndex]]` token against the
/// lookup table.
///
/// Out-of-range references degrade to an empty name and description rather
/// than failing, matching the codec's best-effort posture.
pub fn decode_reference(table: &ServerTimingTable, token: &str) -> ServerTimingEntry {
    let mut split = token.splitn(2, ':');
    let duration: f64 = split.next().unwrap_or("").parse().unwrap_or(0.0);

    let mut entry_index = 0usize;
    let mut description_index = 0usize;
    if let Some(identity) = split.next() {
        let mut parts = identity.splitn(2, '.');
        if let Some(e) = parts.next() {
            if !e.is_empty() {
                entry_index = e.parse().unwrap_or(0);
            }
        }
        if let Some(d) = parts.next() {
            description_index = d.parse().unwrap_or(0);
        }
    }

    let (name, description) = match table.get(entry_index) {
        Some(ServerTimingTableEntry::Name(name)) => (name.clone(), String::new()),
        Some(ServerTimingTableEntry::WithDescriptions(parts)) => (
            parts.first().cloned().unwrap_or_default(),
            parts.get(1 + description_index).cloned().unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };

    ServerTimingEntry {
        name,
        duration,
        description,
    }
}

/// Decode a comma-joined list of references for one resource.
pub fn decode_references(table: &ServerTimingTable, compressed: &str) -> Vec<ServerTimingEntry> {
    compressed
        .split(',')
        .map(|token| decode_reference(table, token))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, duration: f64, description: &str) -> ServerTimingEntry {
        ServerTimingEntry {
            name: name.to_string(),
            duration,
            description: description.to_string(),
        }
    }

    #[test]
    fn table_orders_by_descending_count() {
        let mut counters = ServerTimingCounters::new();
        counters.accumulate(&[entry("m2", 1.0, "d3")]);
        counters.accumulate(&[
            entry("m1", 1.0, "d1"),
            entry("m1", 2.0, "d2"),
            entry("m1", 3.0, "d2"),
        ]);
        let table = counters.build_table();
        assert_eq!(
            table,
            vec![
                ServerTimingTableEntry::WithDescriptions(vec![
                    "m1".to_string(),
                    "d2".to_string(),
                    "d1".to_string()
                ]),
                ServerTimingTableEntry::WithDescriptions(vec!["m2".to_string(), "d3".to_string()]),
            ]
        );
    }

    #[test]
    fn single_empty_description_is_a_bare_name() {
        let mut counters = ServerTimingCounters::new();
        counters.accumulate(&[entry("cache", 12.0, "")]);
        let table = counters.build_table();
        assert_eq!(table, vec![ServerTimingTableEntry::Name("cache".to_string())]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let mut counters = ServerTimingCounters::new();
        counters.accumulate(&[entry("b", 1.0, ""), entry("a", 1.0, "")]);
        let table = counters.build_table();
        assert_eq!(
            table,
            vec![
                ServerTimingTableEntry::Name("b".to_string()),
                ServerTimingTableEntry::Name("a".to_string()),
            ]
        );
    }

    #[test]
    fn reference_formatting_elides_zeros() {
        assert_eq!(format_reference(0, 0), "");
        assert_eq!(format_reference(1, 0), ":1");
        assert_eq!(format_reference(0, 1), ":.1");
        assert_eq!(format_reference(2, 3), ":2.3");
    }

    #[test]
    fn reference_round_trip() {
        let mut counters = ServerTimingCounters::new();
        counters.accumulate(&[
            entry("m1", 1.0, "d1"),
            entry("m1", 1.0, "d1"),
            entry("m1", 1.0, "d2"),
            entry("m2", 1.0, ""),
        ]);
        let table = counters.build_table();
        let index = ServerTimingIndex::build(&table);

        for (name, description) in [("m1", "d1"), ("m1", "d2"), ("m2", "")] {
            let (ei, di) = index.indices_for(name, description);
            let token = format!("3.5{}", format_reference(ei, di));
            let decoded = decode_reference(&table, &token);
            assert_eq!(decoded.name, name);
            assert_eq!(decoded.description, description);
            assert_eq!(decoded.duration, 3.5);
        }
    }

    #[test]
    fn out_of_range_reference_degrades() {
        let table = vec![ServerTimingTableEntry::Name("m".to_string())];
        let decoded = decode_reference(&table, "1:9.9");
        assert_eq!(decoded.name, "");
        assert_eq!(decoded.description, "");
        assert_eq!(decoded.duration, 1.0);
    }

    #[test]
    fn table_serializes_to_mixed_json() {
        let table = vec![
            ServerTimingTableEntry::WithDescriptions(vec!["m1".into(), "d1".into()]),
            ServerTimingTableEntry::Name("m2".into()),
        ];
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"[["m1","d1"],"m2"]"#);
    }
}
