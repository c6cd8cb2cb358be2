//! Board snapshot response decoding.

use chrono::NaiveDateTime;
use serde_json::Value;

use super::ApiError;
use crate::models::{convert_empty_to_null, QuoteSnapshot, SnapshotBatch};

/// Column list requested with every `CLMMfdsGetMarketPrice`: current price,
/// volume, previous close, open/high/low, VWAP, best quotes with kind flags,
/// market-order and over/under volumes, then the ten-level ask/bid price and
/// size ladders.
pub(super) const TARGET_COLUMNS: &str = concat!(
    "pDPP,pDV,pPRP,pDOP,pDHP,pDLP,pVWAP,",
    "pQAP,pQAS,pQBP,pQBS,",
    "pAAV,pABV,pQOV,pQUV,",
    "pGAP10,pGAP9,pGAP8,pGAP7,pGAP6,pGAP5,pGAP4,pGAP3,pGAP2,pGAP1,",
    "pGBP10,pGBP9,pGBP8,pGBP7,pGBP6,pGBP5,pGBP4,pGBP3,pGBP2,pGBP1,",
    "pGAV10,pGAV9,pGAV8,pGAV7,pGAV6,pGAV5,pGAV4,pGAV3,pGAV2,pGAV1,",
    "pGBV10,pGBV9,pGBV8,pGBV7,pGBV6,pGBV5,pGBV4,pGBV3,pGBV2,pGBV1"
);

/// Decodes a price-fetch response body into a stamped snapshot batch.
///
/// Fails when `aCLMMfdsMarketPrice` or `p_rv_date` is missing, or when the
/// snapshot array is empty: zero records against a non-empty code list
/// signals a session or protocol fault, not a valid empty result.
pub fn decode_price_response(body: &str) -> Result<SnapshotBatch, ApiError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("price response is not valid JSON: {e}")))?;

    let rv_date = value
        .get("p_rv_date")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Decode("missing field: p_rv_date".to_string()))?;
    let created_at = parse_rv_date(rv_date)?;

    let raw_rows = value
        .get("aCLMMfdsMarketPrice")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Decode("missing field: aCLMMfdsMarketPrice".to_string()))?;
    if raw_rows.is_empty() {
        return Err(ApiError::Decode("empty snapshot result set".to_string()));
    }

    let mut rows = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows {
        let snapshot: QuoteSnapshot =
            serde_json::from_value(convert_empty_to_null(raw.clone()))
                .map_err(|e| ApiError::Decode(format!("bad snapshot record: {e}")))?;
        rows.push(snapshot);
    }

    Ok(SnapshotBatch { created_at, rows })
}

/// `p_rv_date` arrives as `YYYY.MM.DD-HH:MM:SS.ffffff`, sometimes with
/// stray spaces. Strip spaces, rewrite the first two dot separators to
/// dashes, then parse.
fn parse_rv_date(raw: &str) -> Result<NaiveDateTime, ApiError> {
    let cleaned = raw.replace(' ', "").replacen('.', "-", 2);
    NaiveDateTime::parse_from_str(&cleaned, "%Y-%m-%d-%H:%M:%S%.f")
        .map_err(|e| ApiError::Decode(format!("bad p_rv_date {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn response(rows: &str) -> String {
        format!(
            r#"{{"p_no":"2","p_rv_date":"2024.01.05-09:30:15.123456","p_errno":"0","aCLMMfdsMarketPrice":{rows}}}"#
        )
    }

    #[test]
    fn decodes_rows_and_stamps_shared_timestamp() {
        let body = response(
            r#"[{"sIssueCode":"6501","pDPP":"1234.5","pDV":"1000"},
                {"sIssueCode":"7203","pDPP":"","pDV":"0"}]"#,
        );
        let batch = decode_price_response(&body).expect("decode");
        assert_eq!(batch.len(), 2);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_micro_opt(9, 30, 15, 123_456)
            .unwrap();
        assert_eq!(batch.created_at, expected);
        assert_eq!(batch.rows[0].last_price, Some(1234.5));
        assert_eq!(batch.rows[1].last_price, None);
    }

    #[test]
    fn empty_snapshot_array_fails_even_with_valid_timestamp() {
        let err = decode_price_response(&response("[]")).unwrap_err();
        assert!(matches!(err, ApiError::Decode(ref m) if m.contains("empty")));
    }

    #[test]
    fn missing_snapshot_array_is_a_decode_error() {
        let body = r#"{"p_rv_date":"2024.01.05-09:30:15.123456"}"#;
        let err = decode_price_response(body).unwrap_err();
        assert!(matches!(err, ApiError::Decode(ref m) if m.contains("aCLMMfdsMarketPrice")));
    }

    #[test]
    fn missing_timestamp_is_a_decode_error() {
        let body = r#"{"aCLMMfdsMarketPrice":[{"sIssueCode":"6501"}]}"#;
        let err = decode_price_response(body).unwrap_err();
        assert!(matches!(err, ApiError::Decode(ref m) if m.contains("p_rv_date")));
    }

    #[test]
    fn rv_date_rewrite_only_touches_the_date_dots() {
        let parsed = parse_rv_date("2024.01.05- 11:22:33.000500").expect("parse");
        assert_eq!(parsed.time().nanosecond(), 500_000);
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn target_columns_cover_the_full_ladder() {
        assert_eq!(TARGET_COLUMNS.split(',').count(), 55);
        assert!(TARGET_COLUMNS.starts_with("pDPP,"));
        assert!(TARGET_COLUMNS.ends_with("pGBV1"));
    }
}
