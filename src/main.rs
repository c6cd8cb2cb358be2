//! Board polling daemon.
//!
//! Invoked each trading morning by the scheduler: logs in, resolves the
//! instrument codes assigned to this account, then polls board snapshots at
//! the configured cadence until the session close, persisting every cycle.

use anyhow::{bail, Context, Result};
use tracing::info;

use itafeed_backend::api::{jst_now, TachibanaClient};
use itafeed_backend::calendar::{JpxCalendar, TradingCalendar};
use itafeed_backend::collector::{Collector, PollSettings};
use itafeed_backend::config::Config;
use itafeed_backend::db::Db;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("itafeed=info".parse()?)
                .add_directive("itafeed_backend=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;

    let today = jst_now().date_naive();
    if !JpxCalendar::from_env().is_trading_day(today) {
        info!(%today, "market closed today; nothing to do");
        return Ok(());
    }

    let client = TachibanaClient::new(&config.base_url, config.broker.clone())?;
    let session = client.login().await.context("broker login failed")?;

    let db = Db::connect(&config.db, config.max_workers as u32)
        .await
        .context("database connection failed")?;
    db.ping().await.context("database ping failed")?;
    db.ensure_schema().await.context("schema setup failed")?;

    let codes = match &config.target_codes {
        Some(codes) => codes.clone(),
        None => db
            .codes_for_api_id(&config.api_id)
            .await
            .context("target code lookup failed")?,
    };
    if codes.is_empty() {
        bail!("no instrument codes assigned to api_id {}", config.api_id);
    }

    let settings = PollSettings {
        interval: config.poll_interval,
        max_workers: config.max_workers,
        session_close: config.session_close,
    };
    Collector::new(session, db, codes, settings).run().await;

    info!("completion: market closure");
    Ok(())
}
