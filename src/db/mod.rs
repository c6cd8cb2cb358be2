//! PostgreSQL persistence layer.
//!
//! Two tables: `ita_table` (one board snapshot row per code per poll cycle,
//! no uniqueness constraint) and `master_stock_table` (instrument identities
//! keyed by code, with the `api_id` polling-client assignment tag).

mod instruments;
mod snapshots;

pub use instruments::new_codes;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use thiserror::Error;

/// Connection parameters for the backing database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Snapshot rows are append-only with no uniqueness constraint: one row per
/// (code, poll cycle), ordered by insertion.
const ITA_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS ita_table (
        code TEXT NOT NULL,
        pdpp DOUBLE PRECISION, pdv BIGINT, pprp DOUBLE PRECISION,
        pdop DOUBLE PRECISION, pdhp DOUBLE PRECISION, pdlp DOUBLE PRECISION,
        pvwap DOUBLE PRECISION,
        pqap DOUBLE PRECISION, pqas TEXT, pqbp DOUBLE PRECISION, pqbs TEXT,
        paav BIGINT, pabv BIGINT, pqov BIGINT, pquv BIGINT,
        pgap10 DOUBLE PRECISION, pgap9 DOUBLE PRECISION, pgap8 DOUBLE PRECISION,
        pgap7 DOUBLE PRECISION, pgap6 DOUBLE PRECISION, pgap5 DOUBLE PRECISION,
        pgap4 DOUBLE PRECISION, pgap3 DOUBLE PRECISION, pgap2 DOUBLE PRECISION,
        pgap1 DOUBLE PRECISION,
        pgbp10 DOUBLE PRECISION, pgbp9 DOUBLE PRECISION, pgbp8 DOUBLE PRECISION,
        pgbp7 DOUBLE PRECISION, pgbp6 DOUBLE PRECISION, pgbp5 DOUBLE PRECISION,
        pgbp4 DOUBLE PRECISION, pgbp3 DOUBLE PRECISION, pgbp2 DOUBLE PRECISION,
        pgbp1 DOUBLE PRECISION,
        pgav10 BIGINT, pgav9 BIGINT, pgav8 BIGINT, pgav7 BIGINT, pgav6 BIGINT,
        pgav5 BIGINT, pgav4 BIGINT, pgav3 BIGINT, pgav2 BIGINT, pgav1 BIGINT,
        pgbv10 BIGINT, pgbv9 BIGINT, pgbv8 BIGINT, pgbv7 BIGINT, pgbv6 BIGINT,
        pgbv5 BIGINT, pgbv4 BIGINT, pgbv3 BIGINT, pgbv2 BIGINT, pgbv1 BIGINT,
        created_at TIMESTAMP NOT NULL
    )
";

const MASTER_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS master_stock_table (
        code TEXT PRIMARY KEY,
        name TEXT,
        market_product_category TEXT,
        sector33_code TEXT,
        sector33_category TEXT,
        sector17_code TEXT,
        sector17_category TEXT,
        scale_code TEXT,
        scale_category TEXT,
        api_id TEXT
    )
";

/// Handle to the backing database. Cheap to clone: all clones share one
/// connection pool.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Opens a pool against the configured database. Size the pool to the
    /// number of concurrent writers (the polling worker bound).
    pub async fn connect(config: &DbConfig, max_connections: u32) -> Result<Self, StorageError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Connection liveness probe used at startup.
    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Creates both tables when absent.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(MASTER_TABLE_SQL).execute(&self.pool).await?;
        sqlx::query(ITA_TABLE_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
