// src/merge.rs
// Cross-feed grouping: the same alert text frequently appears in both the
// bus and the train feed, and must become a single post.

use std::collections::{BTreeSet, HashMap};

use crate::identity::{fingerprint, Fingerprint};

/// Which feed an alert came from (e.g. "bus", "train"). The set of tags is
/// open-ended and comes from configuration, not from this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SourceTag(String);

impl SourceTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_bus(&self) -> bool {
        self.0.eq_ignore_ascii_case("bus")
    }

    pub fn is_train(&self) -> bool {
        self.0.eq_ignore_ascii_case("train")
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One alert record as handed over by a feed source. Header/description are
/// already resolved from the feed's optional translated-text fields; either
/// may be empty. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawAlert {
    /// Feed-assigned entity id. Often numeric, sometimes not, never trusted
    /// for identity (it changes between polls for the same alert).
    pub source_assigned_id: String,
    pub header: String,
    pub description: String,
    pub affected_route_ids: Vec<String>,
}

/// One logically-unique alert for the current polling cycle.
#[derive(Debug, Clone)]
pub struct MergedAlert {
    pub fingerprint: Fingerprint,
    /// First record observed for this fingerprint (input order).
    pub alert: RawAlert,
    /// Every feed that produced this fingerprint this cycle.
    pub sources: BTreeSet<SourceTag>,
    /// First-seen position in the input; secondary sort key downstream.
    pub discovered: usize,
}

/// Group records by content fingerprint, one pass in input order.
///
/// Input order is fetch order: sources in declaration order, entities in
/// per-feed order. The first record seen for a fingerprint becomes the
/// representative; later records only contribute their source tag.
/// Fingerprints are unique across the output, so the returned vec is a
/// fingerprint-keyed mapping that also preserves discovery order.
pub fn merge(records: Vec<(SourceTag, RawAlert)>) -> Vec<MergedAlert> {
    let mut index: HashMap<Fingerprint, usize> = HashMap::new();
    let mut out: Vec<MergedAlert> = Vec::new();

    for (tag, alert) in records {
        let fp = fingerprint(&alert.header, &alert.description);
        match index.get(&fp) {
            Some(&i) => {
                out[i].sources.insert(tag);
            }
            None => {
                index.insert(fp.clone(), out.len());
                let mut sources = BTreeSet::new();
                sources.insert(tag);
                let discovered = out.len();
                out.push(MergedAlert {
                    fingerprint: fp,
                    alert,
                    sources,
                    discovered,
                });
            }
        }
    }

    out
}
