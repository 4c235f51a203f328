// src/sources/mod.rs
pub mod gtfs_rt;

use anyhow::Result;
use metrics::counter;

use crate::merge::{RawAlert, SourceTag};

/// One alert feed. Implementations fail independently; the fetch loop turns
/// a failed source into zero records, never into an aborted run.
#[async_trait::async_trait]
pub trait AlertSource: Send + Sync {
    async fn fetch_alerts(&self) -> Result<Vec<RawAlert>>;
    fn tag(&self) -> &SourceTag;
}

/// Fetch every source in declaration order and flatten into (tag, alert)
/// pairs in fetch order. A source error is logged and contributes nothing.
pub async fn fetch_all(sources: &[Box<dyn AlertSource>]) -> Vec<(SourceTag, RawAlert)> {
    let mut records = Vec::new();
    for source in sources {
        match source.fetch_alerts().await {
            Ok(alerts) => {
                tracing::info!(source = %source.tag(), count = alerts.len(), "fetched alerts");
                counter!("alerts_fetched_total").increment(alerts.len() as u64);
                for alert in alerts {
                    records.push((source.tag().clone(), alert));
                }
            }
            Err(e) => {
                tracing::warn!(error = ?e, source = %source.tag(), "source fetch failed");
                counter!("source_errors_total").increment(1);
            }
        }
    }
    records
}

/// Canned source for tests: returns fixed alerts or a scripted error.
pub struct FixtureSource {
    tag: SourceTag,
    alerts: Vec<RawAlert>,
    fail: bool,
}

impl FixtureSource {
    pub fn new(tag: impl Into<String>, alerts: Vec<RawAlert>) -> Self {
        Self {
            tag: SourceTag::new(tag),
            alerts,
            fail: false,
        }
    }

    pub fn failing(tag: impl Into<String>) -> Self {
        Self {
            tag: SourceTag::new(tag),
            alerts: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait::async_trait]
impl AlertSource for FixtureSource {
    async fn fetch_alerts(&self) -> Result<Vec<RawAlert>> {
        if self.fail {
            anyhow::bail!("fixture source {} configured to fail", self.tag);
        }
        Ok(self.alerts.clone())
    }

    fn tag(&self) -> &SourceTag {
        &self.tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: &str, header: &str) -> RawAlert {
        RawAlert {
            source_assigned_id: id.to_string(),
            header: header.to_string(),
            description: String::new(),
            affected_route_ids: vec![],
        }
    }

    #[tokio::test]
    async fn failing_source_contributes_zero_records() {
        let sources: Vec<Box<dyn AlertSource>> = vec![
            Box::new(FixtureSource::failing("bus")),
            Box::new(FixtureSource::new("train", vec![alert("1", "Delay")])),
        ];
        let records = fetch_all(&sources).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0.as_str(), "train");
    }

    #[tokio::test]
    async fn fetch_order_is_declaration_then_entity_order() {
        let sources: Vec<Box<dyn AlertSource>> = vec![
            Box::new(FixtureSource::new("bus", vec![alert("1", "A"), alert("2", "B")])),
            Box::new(FixtureSource::new("train", vec![alert("3", "C")])),
        ];
        let records = fetch_all(&sources).await;
        let headers: Vec<&str> = records.iter().map(|(_, a)| a.header.as_str()).collect();
        assert_eq!(headers, vec!["A", "B", "C"]);
    }
}
