//! Bulk persistence of board snapshot batches.

use super::{Db, StorageError};
use crate::models::SnapshotBatch;

/// Column order matches [`crate::models::QuoteSnapshot`] field order; the
/// trailing `created_at` is the batch-level response timestamp.
const INSERT_SNAPSHOT_SQL: &str = r"
    INSERT INTO ita_table (
        code, pdpp, pdv, pprp, pdop, pdhp, pdlp, pvwap,
        pqap, pqas, pqbp, pqbs, paav, pabv, pqov, pquv,
        pgap10, pgap9, pgap8, pgap7, pgap6, pgap5, pgap4, pgap3, pgap2, pgap1,
        pgbp10, pgbp9, pgbp8, pgbp7, pgbp6, pgbp5, pgbp4, pgbp3, pgbp2, pgbp1,
        pgav10, pgav9, pgav8, pgav7, pgav6, pgav5, pgav4, pgav3, pgav2, pgav1,
        pgbv10, pgbv9, pgbv8, pgbv7, pgbv6, pgbv5, pgbv4, pgbv3, pgbv2, pgbv1,
        created_at
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8,
        $9, $10, $11, $12, $13, $14, $15, $16,
        $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
        $27, $28, $29, $30, $31, $32, $33, $34, $35, $36,
        $37, $38, $39, $40, $41, $42, $43, $44, $45, $46,
        $47, $48, $49, $50, $51, $52, $53, $54, $55, $56,
        $57
    )
";

impl Db {
    /// Writes every row of one cycle's batch inside a single transaction.
    /// Partial success is never attempted: any failure rolls the whole
    /// batch back (the transaction is discarded on the error path).
    pub async fn insert_snapshots(&self, batch: &SnapshotBatch) -> Result<(), StorageError> {
        let mut tx = self.pool().begin().await?;

        for row in &batch.rows {
            sqlx::query(INSERT_SNAPSHOT_SQL)
                .bind(&row.code)
                .bind(row.last_price)
                .bind(row.volume)
                .bind(row.prev_close)
                .bind(row.open_price)
                .bind(row.high_price)
                .bind(row.low_price)
                .bind(row.vwap)
                .bind(row.ask_price)
                .bind(&row.ask_sign)
                .bind(row.bid_price)
                .bind(&row.bid_sign)
                .bind(row.market_ask_volume)
                .bind(row.market_bid_volume)
                .bind(row.over_volume)
                .bind(row.under_volume)
                .bind(row.ask_price_10)
                .bind(row.ask_price_9)
                .bind(row.ask_price_8)
                .bind(row.ask_price_7)
                .bind(row.ask_price_6)
                .bind(row.ask_price_5)
                .bind(row.ask_price_4)
                .bind(row.ask_price_3)
                .bind(row.ask_price_2)
                .bind(row.ask_price_1)
                .bind(row.bid_price_10)
                .bind(row.bid_price_9)
                .bind(row.bid_price_8)
                .bind(row.bid_price_7)
                .bind(row.bid_price_6)
                .bind(row.bid_price_5)
                .bind(row.bid_price_4)
                .bind(row.bid_price_3)
                .bind(row.bid_price_2)
                .bind(row.bid_price_1)
                .bind(row.ask_volume_10)
                .bind(row.ask_volume_9)
                .bind(row.ask_volume_8)
                .bind(row.ask_volume_7)
                .bind(row.ask_volume_6)
                .bind(row.ask_volume_5)
                .bind(row.ask_volume_4)
                .bind(row.ask_volume_3)
                .bind(row.ask_volume_2)
                .bind(row.ask_volume_1)
                .bind(row.bid_volume_10)
                .bind(row.bid_volume_9)
                .bind(row.bid_volume_8)
                .bind(row.bid_volume_7)
                .bind(row.bid_volume_6)
                .bind(row.bid_volume_5)
                .bind(row.bid_volume_4)
                .bind(row.bid_volume_3)
                .bind(row.bid_volume_2)
                .bind(row.bid_volume_1)
                .bind(batch.created_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
