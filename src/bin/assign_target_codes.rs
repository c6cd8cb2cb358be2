//! Target Code Assignment Batch
//!
//! Tags instrument codes with an `api_id` grouping id so a polling account
//! knows which codes it is responsible for. This is the only path that
//! writes `api_id`; the master refresh never touches it.
//!
//! Usage:
//!   cargo run --bin assign_target_codes -- --codes 6501,7203,8306
//!   cargo run --bin assign_target_codes -- --codes-file ./codes.txt --api-id fps00001

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use itafeed_backend::config::Config;
use itafeed_backend::db::Db;

#[derive(Parser, Debug)]
#[command(name = "assign_target_codes")]
#[command(about = "Assign instrument codes to a polling account's api_id")]
struct Args {
    /// Comma-separated instrument codes
    #[arg(long, value_delimiter = ',')]
    codes: Option<Vec<String>>,

    /// File with one instrument code per line (overrides --codes)
    #[arg(long)]
    codes_file: Option<PathBuf>,

    /// Grouping id to assign; defaults to the broker user id
    #[arg(long, env = "TACHIBANA_USERID")]
    api_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("assign_target_codes=info".parse()?)
                .add_directive("itafeed_backend=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let codes: Vec<String> = match (&args.codes_file, &args.codes) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {path:?}"))?
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
        (None, Some(codes)) => codes
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        (None, None) => bail!("provide --codes or --codes-file"),
    };
    if codes.is_empty() {
        bail!("no instrument codes to assign");
    }

    let db = Db::connect(&Config::db_from_env()?, 2).await?;
    db.assign_api_id(&codes, &args.api_id).await?;
    info!(codes = codes.len(), api_id = %args.api_id, "api_id assigned");

    Ok(())
}
