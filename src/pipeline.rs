// src/pipeline.rs
// One run of the bot: fetch -> merge -> filter -> post, strictly sequential.
// Per-item failures are data in the summary, never control flow that aborts
// sibling items.

use std::time::Duration;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;

use crate::config::BotConfig;
use crate::identity::Fingerprint;
use crate::ledger::{filter_new, PostedLedger};
use crate::merge::merge;
use crate::publish::Publisher;
use crate::render::render;
use crate::sources::{fetch_all, AlertSource};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("alerts_fetched_total", "Alert records fetched across all feeds.");
        describe_counter!("alerts_posted_total", "Alerts successfully posted.");
        describe_counter!("post_failures_total", "Individual post attempts that failed.");
        describe_counter!("source_errors_total", "Feed fetch/decode errors.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Everything a run needs, built at start and discarded at end. No ambient
/// singletons: the ledger and the session live here and nowhere else.
pub struct RunContext {
    pub config: BotConfig,
    pub ledger: PostedLedger,
    pub sources: Vec<Box<dyn AlertSource>>,
    pub publisher: Box<dyn Publisher>,
}

/// Outcome of a single post attempt, kept as a value so "continue with the
/// remaining queue" is explicit and testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Posted(Fingerprint),
    Failed(Fingerprint),
}

#[derive(Debug, Default)]
pub struct RunSummary {
    /// Raw records fetched across all feeds.
    pub fetched: usize,
    /// Unique alerts after cross-feed grouping.
    pub merged: usize,
    /// Alerts not yet in the ledger at run start.
    pub fresh: usize,
    pub posted: usize,
    pub failed: usize,
    pub outcomes: Vec<PostOutcome>,
}

/// Execute one polling cycle.
///
/// `within_window` is the externally-computed operating-window predicate;
/// when false the run ends immediately with zero posts. A publish failure
/// skips the ledger update for that fingerprint (retried next run) and moves
/// on; a ledger persist failure after a confirmed post is fatal, stopping
/// the queue so duplicate exposure stays bounded.
pub async fn run_once(ctx: &mut RunContext, within_window: bool) -> Result<RunSummary> {
    ensure_metrics_described();
    let mut summary = RunSummary::default();

    if !within_window {
        tracing::info!("outside operating window, skipping run");
        return Ok(summary);
    }

    let records = fetch_all(&ctx.sources).await;
    summary.fetched = records.len();

    let merged = merge(records);
    summary.merged = merged.len();

    let fresh = filter_new(merged, &ctx.ledger);
    summary.fresh = fresh.len();
    tracing::info!(
        fetched = summary.fetched,
        merged = summary.merged,
        fresh = summary.fresh,
        "filtered new alerts"
    );

    let known_routes = ctx.config.known_route_set();
    let delay = Duration::from_secs(ctx.config.post_delay_secs);
    let total = fresh.len();

    for (i, item) in fresh.into_iter().enumerate() {
        let text = render(
            &item.alert.header,
            &item.alert.description,
            &item.sources,
            &known_routes,
        );
        match ctx.publisher.publish(&text).await {
            Ok(()) => {
                ctx.ledger.mark_posted(item.fingerprint.clone())?;
                counter!("alerts_posted_total").increment(1);
                summary.posted += 1;
                summary.outcomes.push(PostOutcome::Posted(item.fingerprint));
                tracing::info!(post = %text, "posted alert");
                // rate-limit spacing between successful posts
                if i + 1 < total {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => {
                counter!("post_failures_total").increment(1);
                summary.failed += 1;
                summary.outcomes.push(PostOutcome::Failed(item.fingerprint.clone()));
                tracing::warn!(
                    error = ?e,
                    fingerprint = %item.fingerprint,
                    "post failed, will retry next run"
                );
            }
        }
    }

    gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
    tracing::info!(posted = summary.posted, failed = summary.failed, "run complete");
    Ok(summary)
}
