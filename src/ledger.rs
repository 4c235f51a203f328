// src/ledger.rs
// Persisted set of already-posted fingerprints. This is the only state the
// bot keeps between runs; the external scheduler relies on it for
// idempotence when it re-invokes the whole pipeline.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::identity::Fingerprint;
use crate::merge::MergedAlert;

/// The dedup ledger. Loaded once at run start, persisted after every
/// successful post. Never pruned: a fingerprint stays forever so an alert is
/// never silently re-posted.
#[derive(Debug)]
pub struct PostedLedger {
    path: PathBuf,
    posted: BTreeSet<Fingerprint>,
}

impl PostedLedger {
    /// Load the ledger from disk. A missing file means a fresh start, not an
    /// error. A file that exists but cannot be read or parsed is fatal:
    /// posting against unreliable dedup state risks duplicate posts.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let posted = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str::<Vec<Fingerprint>>(&s)
                .with_context(|| format!("parsing posted ledger at {}", path.display()))?
                .into_iter()
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading posted ledger at {}", path.display()))
            }
        };
        Ok(Self { path, posted })
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.posted.contains(fp)
    }

    pub fn len(&self) -> usize {
        self.posted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posted.is_empty()
    }

    /// Record a fingerprint as posted and persist the full set before
    /// returning. Durability contract: once this returns Ok, a crash cannot
    /// lose the entry; until it returns, the fingerprint is not reported as
    /// posted anywhere.
    pub fn mark_posted(&mut self, fp: Fingerprint) -> Result<()> {
        self.posted.insert(fp);
        self.persist()
    }

    /// Write-temp, fsync, rename. The ledger is overwritten whole, not
    /// appended, so a torn write can never corrupt previously recorded
    /// entries.
    fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating ledger dir {}", dir.display()))?;
            }
        }
        let entries: Vec<&Fingerprint> = self.posted.iter().collect();
        let body = serde_json::to_vec_pretty(&entries).context("serializing posted ledger")?;

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;
            f.write_all(&body)
                .with_context(|| format!("writing {}", tmp.display()))?;
            f.sync_all()
                .with_context(|| format!("syncing {}", tmp.display()))?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// Keep only alerts not yet in the ledger, ordered for posting.
///
/// Sort key: the representative's feed-assigned id as an integer when it is
/// purely numeric, else 0 (non-numeric ids sort first). Ties keep discovery
/// order via the stable sort, so output is deterministic even though the
/// merge map itself has no meaningful iteration order.
pub fn filter_new(merged: Vec<MergedAlert>, ledger: &PostedLedger) -> Vec<MergedAlert> {
    let mut fresh: Vec<MergedAlert> = merged
        .into_iter()
        .filter(|m| !ledger.contains(&m.fingerprint))
        .collect();
    fresh.sort_by_key(|m| (numeric_sort_key(&m.alert.source_assigned_id), m.discovered));
    fresh
}

fn numeric_sort_key(id: &str) -> i64 {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        id.parse().unwrap_or(0)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{merge, RawAlert, SourceTag};

    fn record(id: &str, header: &str) -> (SourceTag, RawAlert) {
        (
            SourceTag::new("bus"),
            RawAlert {
                source_assigned_id: id.to_string(),
                header: header.to_string(),
                description: String::new(),
                affected_route_ids: vec![],
            },
        )
    }

    #[test]
    fn numeric_ids_sort_ascending_non_numeric_first() {
        let merged = merge(vec![
            record("205", "C"),
            record("abc", "A"),
            record("17", "B"),
            record("", "D"),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let ledger = PostedLedger::load(dir.path().join("posted.json")).unwrap();
        let out = filter_new(merged, &ledger);
        let headers: Vec<&str> = out.iter().map(|m| m.alert.header.as_str()).collect();
        // non-numeric ("abc", "") key to 0 and keep discovery order among themselves
        assert_eq!(headers, vec!["A", "D", "B", "C"]);
    }

    #[test]
    fn filter_drops_already_posted() {
        let merged = merge(vec![record("1", "A"), record("2", "B")]);
        let posted_fp = merged[0].fingerprint.clone();

        let dir = tempfile::tempdir().unwrap();
        let mut ledger = PostedLedger::load(dir.path().join("posted.json")).unwrap();
        ledger.mark_posted(posted_fp).unwrap();

        let out = filter_new(merged, &ledger);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].alert.header, "B");
    }

    #[test]
    fn filter_is_idempotent_once_everything_is_posted() {
        let merged = merge(vec![record("1", "A"), record("2", "B")]);
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = PostedLedger::load(dir.path().join("posted.json")).unwrap();

        let first = filter_new(merged.clone(), &ledger);
        assert_eq!(first.len(), 2);
        for m in &first {
            ledger.mark_posted(m.fingerprint.clone()).unwrap();
        }
        let second = filter_new(merged, &ledger);
        assert!(second.is_empty());
    }
}
