// src/sources/gtfs_rt.rs
// HTTP GTFS-realtime alert feed. Only the subset of the FeedMessage schema
// the bot reads is declared here; prost skips unknown fields on decode.

use std::time::Duration;

use anyhow::{Context, Result};
use prost::Message;

use crate::merge::{RawAlert, SourceTag};
use crate::sources::AlertSource;

// --- GTFS-realtime wire subset (proto2 tags from the published schema) ---

#[derive(Clone, PartialEq, Message)]
pub struct FeedMessage {
    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeedEntity {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(message, optional, tag = "5")]
    pub alert: Option<Alert>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Alert {
    #[prost(message, repeated, tag = "5")]
    pub informed_entity: Vec<EntitySelector>,
    #[prost(message, optional, tag = "10")]
    pub header_text: Option<TranslatedString>,
    #[prost(message, optional, tag = "11")]
    pub description_text: Option<TranslatedString>,
}

#[derive(Clone, PartialEq, Message)]
pub struct EntitySelector {
    #[prost(string, optional, tag = "2")]
    pub route_id: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TranslatedString {
    #[prost(message, repeated, tag = "1")]
    pub translation: Vec<Translation>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Translation {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(string, optional, tag = "2")]
    pub language: Option<String>,
}

// --- source implementation ---

pub struct GtfsRtSource {
    tag: SourceTag,
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl GtfsRtSource {
    pub fn new(tag: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            tag: SourceTag::new(tag),
            url: url.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn alerts_from_feed(feed: FeedMessage) -> Vec<RawAlert> {
        feed.entity
            .into_iter()
            .filter_map(|entity| {
                let alert = entity.alert?;
                Some(raw_alert_from(entity.id, alert))
            })
            .collect()
    }
}

/// Resolve the optional translated-text fields into plain strings (first
/// translation wins, absence becomes empty) and collect affected route ids.
fn raw_alert_from(id: String, alert: Alert) -> RawAlert {
    let header = first_translation(alert.header_text.as_ref());
    let description = first_translation(alert.description_text.as_ref());
    let affected_route_ids = alert
        .informed_entity
        .into_iter()
        .filter_map(|sel| sel.route_id)
        .collect();
    RawAlert {
        source_assigned_id: id,
        header,
        description,
        affected_route_ids,
    }
}

fn first_translation(ts: Option<&TranslatedString>) -> String {
    ts.and_then(|t| t.translation.first())
        .map(|t| t.text.clone())
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl AlertSource for GtfsRtSource {
    async fn fetch_alerts(&self) -> Result<Vec<RawAlert>> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("fetching alert feed {}", self.url))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("alert feed {} returned error status", self.url))?;
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("reading alert feed body from {}", self.url))?;
        let feed = FeedMessage::decode(body.as_ref())
            .with_context(|| format!("decoding GTFS-RT feed from {}", self.url))?;
        Ok(Self::alerts_from_feed(feed))
    }

    fn tag(&self) -> &SourceTag {
        &self.tag
    }
}
