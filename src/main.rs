//! Transit alert bot — one-shot batch entrypoint.
//! Fetches the configured GTFS-RT alert feeds, dedupes against the posted
//! ledger, renders and posts anything new, then exits. Scheduling is the
//! job of whatever invokes the binary (cron, CI workflow, systemd timer).

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use transit_alert_bot::config::{bluesky_credentials_from_env, BotConfig};
use transit_alert_bot::ledger::PostedLedger;
use transit_alert_bot::pipeline::{run_once, RunContext};
use transit_alert_bot::publish::bluesky::BlueskyPublisher;
use transit_alert_bot::sources::gtfs_rt::GtfsRtSource;
use transit_alert_bot::sources::AlertSource;
use transit_alert_bot::window::within_operating_window;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("transit_alert_bot=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op where env comes from the scheduler.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = BotConfig::load_default().context("loading bot config")?;
    let creds = bluesky_credentials_from_env()?;

    let ledger = PostedLedger::load(&config.ledger_path).context("loading posted ledger")?;
    tracing::info!(posted = ledger.len(), "loaded posted ledger");

    let within_window = within_operating_window(
        chrono::Utc::now(),
        config.utc_offset_hours,
        config.window_start_hour,
    );

    let sources: Vec<Box<dyn AlertSource>> = config
        .sources
        .iter()
        .map(|s| Box::new(GtfsRtSource::new(s.tag.clone(), s.url.clone())) as Box<dyn AlertSource>)
        .collect();

    let publisher = BlueskyPublisher::login(&creds)
        .await
        .context("bluesky login")?;

    let mut ctx = RunContext {
        config,
        ledger,
        sources,
        publisher: Box::new(publisher),
    };

    let summary = run_once(&mut ctx, within_window).await?;
    tracing::info!(
        posted = summary.posted,
        failed = summary.failed,
        "bot run finished"
    );
    Ok(())
}
