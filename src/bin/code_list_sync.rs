//! Instrument Master Refresh Batch
//!
//! Runs nightly from the scheduler: refreshes `master_stock_table` from the
//! exchange's published instrument file, then reconciles new listings from
//! the public IPO page (insert-if-absent, never updating existing rows).
//!
//! Usage:
//!   # refresh from the exchange download
//!   cargo run --bin code_list_sync
//!
//!   # refresh from a local export of the instrument file
//!   cargo run --bin code_list_sync -- --master-file ./data_j.csv

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use itafeed_backend::config::Config;
use itafeed_backend::db::Db;
use itafeed_backend::master::{
    self, FileMasterSource, HttpListingSource, HttpMasterSource, MasterFileSource,
    DEFAULT_LISTING_URL, DEFAULT_MASTER_URL,
};

#[derive(Parser, Debug)]
#[command(name = "code_list_sync")]
#[command(about = "Refresh the instrument master table and discover new listings")]
struct Args {
    /// Parse a local export of the instrument file instead of downloading
    #[arg(long)]
    master_file: Option<PathBuf>,

    /// Download URL for the instrument file
    #[arg(long, default_value = DEFAULT_MASTER_URL)]
    master_url: String,

    /// URL of the public listing page
    #[arg(long, default_value = DEFAULT_LISTING_URL)]
    listing_url: String,

    /// Skip the new-listing discovery step
    #[arg(long)]
    skip_listings: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("code_list_sync=info".parse()?)
                .add_directive("itafeed_backend=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let db = Db::connect(&Config::db_from_env()?, 2).await?;
    db.ensure_schema().await?;

    let master_source: Box<dyn MasterFileSource> = match &args.master_file {
        Some(path) => Box::new(FileMasterSource::new(path)),
        None => Box::new(HttpMasterSource::new(&args.master_url)?),
    };
    let refreshed = master::sync_master(&db, master_source.as_ref()).await?;
    info!(refreshed, "master refresh done");

    if !args.skip_listings {
        let listing_source = HttpListingSource::new(&args.listing_url)?;
        let inserted = master::sync_new_listings(&db, &listing_source).await?;
        info!(inserted, "listing discovery done");
    }

    Ok(())
}
