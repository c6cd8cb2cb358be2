//! Instrument master maintenance.
//!
//! Two low-frequency flows, independent of the polling loop but sharing the
//! same persistence sink: the periodic bulk refresh from the exchange's
//! published instrument file, and discovery of new listings from a public
//! IPO page. Fetching is behind narrow source traits so the batch binaries
//! can swap the network for local files.

mod normalize;
mod parse;
mod source;

pub use normalize::{blank_to_none, fold_width, segment_letter};
pub use parse::{parse_listing_page, parse_master_csv};
pub use source::{
    FileMasterSource, HttpListingSource, HttpMasterSource, ListingSource, MasterFileSource,
    DEFAULT_LISTING_URL, DEFAULT_MASTER_URL,
};

use anyhow::Result;
use tracing::info;

use crate::db::Db;

/// Full refresh: fetch the instrument file and upsert every row. Returns
/// the number of records written.
pub async fn sync_master(db: &Db, source: &dyn MasterFileSource) -> Result<usize> {
    let bytes = source.fetch().await?;
    let records = parse_master_csv(&bytes)?;
    db.upsert_instruments(&records).await?;
    info!(rows = records.len(), "instrument master refreshed");
    Ok(records.len())
}

/// Discovery: pull the public listing page and insert codes the master
/// table does not know yet. Returns the number of rows inserted.
pub async fn sync_new_listings(db: &Db, source: &dyn ListingSource) -> Result<usize> {
    let html = source.fetch().await?;
    let listings = parse_listing_page(&html);
    let inserted = db.insert_new_listings(&listings).await?;
    info!(candidates = listings.len(), inserted, "new listings reconciled");
    Ok(inserted)
}
