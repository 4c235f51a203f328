// src/publish/bluesky.rs
// Bluesky XRPC client: createSession at startup, createRecord per post.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::BlueskyCredentials;
use crate::publish::Publisher;

const DEFAULT_SERVICE: &str = "https://bsky.social";

pub struct BlueskyPublisher {
    client: Client,
    service: String,
    did: String,
    access_jwt: String,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    did: String,
    access_jwt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: PostRecord<'a>,
}

#[derive(Serialize)]
struct PostRecord<'a> {
    #[serde(rename = "$type")]
    record_type: &'a str,
    text: &'a str,
    #[serde(rename = "createdAt")]
    created_at: String,
}

impl BlueskyPublisher {
    /// Authenticate with handle + app password. Login failure is fatal for
    /// the run; there is nothing useful to do without a session.
    pub async fn login(creds: &BlueskyCredentials) -> Result<Self> {
        Self::login_to(DEFAULT_SERVICE, creds).await
    }

    pub async fn login_to(service: &str, creds: &BlueskyCredentials) -> Result<Self> {
        let client = Client::new();
        let timeout = Duration::from_secs(10);
        let url = format!("{service}/xrpc/com.atproto.server.createSession");
        let resp = client
            .post(&url)
            .timeout(timeout)
            .json(&CreateSessionRequest {
                identifier: &creds.handle,
                password: &creds.password,
            })
            .send()
            .await
            .context("bluesky createSession request failed")?;
        if !resp.status().is_success() {
            return Err(anyhow!("bluesky login rejected: HTTP {}", resp.status()));
        }
        let session: CreateSessionResponse = resp
            .json()
            .await
            .context("parsing bluesky createSession response")?;
        tracing::info!(did = %session.did, "logged into bluesky");
        Ok(Self {
            client,
            service: service.to_string(),
            did: session.did,
            access_jwt: session.access_jwt,
            timeout,
        })
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait::async_trait]
impl Publisher for BlueskyPublisher {
    async fn publish(&self, text: &str) -> Result<()> {
        let url = format!("{}/xrpc/com.atproto.repo.createRecord", self.service);
        let request = CreateRecordRequest {
            repo: &self.did,
            collection: "app.bsky.feed.post",
            record: PostRecord {
                record_type: "app.bsky.feed.post",
                text,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        };
        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(&self.access_jwt)
            .json(&request)
            .send()
            .await
            .context("bluesky createRecord request failed")?;
        resp.error_for_status()
            .context("bluesky createRecord returned error status")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_record_serializes_lexicon_fields() {
        let record = PostRecord {
            record_type: "app.bsky.feed.post",
            text: "🚊 Service resumed",
            created_at: "2025-03-10T12:00:00+00:00".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["$type"], "app.bsky.feed.post");
        assert_eq!(json["createdAt"], "2025-03-10T12:00:00+00:00");
        assert_eq!(json["text"], "🚊 Service resumed");
    }
}
