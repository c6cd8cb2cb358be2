//! Instrument master table maintenance.

use std::collections::HashSet;

use super::{Db, StorageError};
use crate::models::{InstrumentRecord, NewListing};

/// Full refresh upsert. Conflicts on `code` replace every descriptive
/// column; `api_id` is deliberately absent so refreshes never clobber the
/// polling-client assignments.
const UPSERT_INSTRUMENT_SQL: &str = r"
    INSERT INTO master_stock_table (
        code, name, market_product_category, sector33_code, sector33_category,
        sector17_code, sector17_category, scale_code, scale_category
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9
    ) ON CONFLICT (code) DO UPDATE
    SET
        name = EXCLUDED.name,
        market_product_category = EXCLUDED.market_product_category,
        sector33_code = EXCLUDED.sector33_code,
        sector33_category = EXCLUDED.sector33_category,
        sector17_code = EXCLUDED.sector17_code,
        sector17_category = EXCLUDED.sector17_category,
        scale_code = EXCLUDED.scale_code,
        scale_category = EXCLUDED.scale_category
";

const INSERT_LISTING_SQL: &str = r"
    INSERT INTO master_stock_table (code, name, market_product_category)
    VALUES ($1, $2, $3)
";

/// Filters `candidates` down to codes not present in `existing`, preserving
/// input order.
pub fn new_codes<'a>(
    existing: &HashSet<String>,
    candidates: &'a [NewListing],
) -> Vec<&'a NewListing> {
    candidates
        .iter()
        .filter(|listing| !existing.contains(&listing.code))
        .collect()
}

impl Db {
    /// Upserts the full instrument file, one statement per record inside a
    /// single transaction.
    pub async fn upsert_instruments(
        &self,
        records: &[InstrumentRecord],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool().begin().await?;
        for record in records {
            sqlx::query(UPSERT_INSTRUMENT_SQL)
                .bind(&record.code)
                .bind(&record.name)
                .bind(&record.market_product_category)
                .bind(&record.sector33_code)
                .bind(&record.sector33_category)
                .bind(&record.sector17_code)
                .bind(&record.sector17_category)
                .bind(&record.scale_code)
                .bind(&record.scale_category)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Inserts listings whose codes are not yet in the master table and
    /// returns how many were written. Existing rows are never updated on
    /// this path.
    ///
    /// Read-then-write: the existence check and the inserts are separate
    /// round trips and are not isolated against concurrent writers. Refresh
    /// jobs run as scheduled singletons, so the window is accepted; fold the
    /// check into `ON CONFLICT DO NOTHING` if that ever changes.
    pub async fn insert_new_listings(
        &self,
        listings: &[NewListing],
    ) -> Result<usize, StorageError> {
        let existing = self.existing_codes().await?;
        let missing = new_codes(&existing, listings);
        if missing.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool().begin().await?;
        for listing in &missing {
            sqlx::query(INSERT_LISTING_SQL)
                .bind(&listing.code)
                .bind(&listing.name)
                .bind(&listing.market_product_category)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(missing.len())
    }

    /// Every code currently present in the master table.
    pub async fn existing_codes(&self) -> Result<HashSet<String>, StorageError> {
        let codes: Vec<String> =
            sqlx::query_scalar("SELECT code FROM master_stock_table")
                .fetch_all(self.pool())
                .await?;
        Ok(codes.into_iter().collect())
    }

    /// Codes assigned to one polling client.
    pub async fn codes_for_api_id(&self, api_id: &str) -> Result<Vec<String>, StorageError> {
        let codes = sqlx::query_scalar(
            "SELECT code FROM master_stock_table WHERE api_id = $1 ORDER BY code",
        )
        .bind(api_id)
        .fetch_all(self.pool())
        .await?;
        Ok(codes)
    }

    /// The explicit `api_id` write path: tags each listed code with the
    /// given grouping id. One transaction for the whole assignment.
    pub async fn assign_api_id(&self, codes: &[String], api_id: &str) -> Result<(), StorageError> {
        let mut tx = self.pool().begin().await?;
        for code in codes {
            sqlx::query("UPDATE master_stock_table SET api_id = $1 WHERE code = $2")
                .bind(api_id)
                .bind(code)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
