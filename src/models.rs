//! Record types shared between the API client and the persistence layer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One instrument's board snapshot for one poll cycle.
///
/// Field names follow the upstream wire columns requested via
/// `sTargetColumn`. Every price/volume field is optional: the server sends
/// empty strings for columns it has no value for (pre-open, halted issues),
/// and those are normalized to null before this struct is built.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSnapshot {
    #[serde(rename = "sIssueCode")]
    pub code: String,

    // Current price, volume, previous close, open/high/low, VWAP
    #[serde(rename = "pDPP", default, deserialize_with = "de_opt_f64")]
    pub last_price: Option<f64>,
    #[serde(rename = "pDV", default, deserialize_with = "de_opt_i64")]
    pub volume: Option<i64>,
    #[serde(rename = "pPRP", default, deserialize_with = "de_opt_f64")]
    pub prev_close: Option<f64>,
    #[serde(rename = "pDOP", default, deserialize_with = "de_opt_f64")]
    pub open_price: Option<f64>,
    #[serde(rename = "pDHP", default, deserialize_with = "de_opt_f64")]
    pub high_price: Option<f64>,
    #[serde(rename = "pDLP", default, deserialize_with = "de_opt_f64")]
    pub low_price: Option<f64>,
    #[serde(rename = "pVWAP", default, deserialize_with = "de_opt_f64")]
    pub vwap: Option<f64>,

    // Best quotes with their kind flags
    #[serde(rename = "pQAP", default, deserialize_with = "de_opt_f64")]
    pub ask_price: Option<f64>,
    #[serde(rename = "pQAS", default, deserialize_with = "de_opt_string")]
    pub ask_sign: Option<String>,
    #[serde(rename = "pQBP", default, deserialize_with = "de_opt_f64")]
    pub bid_price: Option<f64>,
    #[serde(rename = "pQBS", default, deserialize_with = "de_opt_string")]
    pub bid_sign: Option<String>,

    // Market-order and over/under aggregate volumes
    #[serde(rename = "pAAV", default, deserialize_with = "de_opt_i64")]
    pub market_ask_volume: Option<i64>,
    #[serde(rename = "pABV", default, deserialize_with = "de_opt_i64")]
    pub market_bid_volume: Option<i64>,
    #[serde(rename = "pQOV", default, deserialize_with = "de_opt_i64")]
    pub over_volume: Option<i64>,
    #[serde(rename = "pQUV", default, deserialize_with = "de_opt_i64")]
    pub under_volume: Option<i64>,

    // Ten-level ask price ladder (10 = furthest from the touch)
    #[serde(rename = "pGAP10", default, deserialize_with = "de_opt_f64")]
    pub ask_price_10: Option<f64>,
    #[serde(rename = "pGAP9", default, deserialize_with = "de_opt_f64")]
    pub ask_price_9: Option<f64>,
    #[serde(rename = "pGAP8", default, deserialize_with = "de_opt_f64")]
    pub ask_price_8: Option<f64>,
    #[serde(rename = "pGAP7", default, deserialize_with = "de_opt_f64")]
    pub ask_price_7: Option<f64>,
    #[serde(rename = "pGAP6", default, deserialize_with = "de_opt_f64")]
    pub ask_price_6: Option<f64>,
    #[serde(rename = "pGAP5", default, deserialize_with = "de_opt_f64")]
    pub ask_price_5: Option<f64>,
    #[serde(rename = "pGAP4", default, deserialize_with = "de_opt_f64")]
    pub ask_price_4: Option<f64>,
    #[serde(rename = "pGAP3", default, deserialize_with = "de_opt_f64")]
    pub ask_price_3: Option<f64>,
    #[serde(rename = "pGAP2", default, deserialize_with = "de_opt_f64")]
    pub ask_price_2: Option<f64>,
    #[serde(rename = "pGAP1", default, deserialize_with = "de_opt_f64")]
    pub ask_price_1: Option<f64>,

    // Ten-level bid price ladder
    #[serde(rename = "pGBP10", default, deserialize_with = "de_opt_f64")]
    pub bid_price_10: Option<f64>,
    #[serde(rename = "pGBP9", default, deserialize_with = "de_opt_f64")]
    pub bid_price_9: Option<f64>,
    #[serde(rename = "pGBP8", default, deserialize_with = "de_opt_f64")]
    pub bid_price_8: Option<f64>,
    #[serde(rename = "pGBP7", default, deserialize_with = "de_opt_f64")]
    pub bid_price_7: Option<f64>,
    #[serde(rename = "pGBP6", default, deserialize_with = "de_opt_f64")]
    pub bid_price_6: Option<f64>,
    #[serde(rename = "pGBP5", default, deserialize_with = "de_opt_f64")]
    pub bid_price_5: Option<f64>,
    #[serde(rename = "pGBP4", default, deserialize_with = "de_opt_f64")]
    pub bid_price_4: Option<f64>,
    #[serde(rename = "pGBP3", default, deserialize_with = "de_opt_f64")]
    pub bid_price_3: Option<f64>,
    #[serde(rename = "pGBP2", default, deserialize_with = "de_opt_f64")]
    pub bid_price_2: Option<f64>,
    #[serde(rename = "pGBP1", default, deserialize_with = "de_opt_f64")]
    pub bid_price_1: Option<f64>,

    // Ten-level ask size ladder
    #[serde(rename = "pGAV10", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_10: Option<i64>,
    #[serde(rename = "pGAV9", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_9: Option<i64>,
    #[serde(rename = "pGAV8", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_8: Option<i64>,
    #[serde(rename = "pGAV7", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_7: Option<i64>,
    #[serde(rename = "pGAV6", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_6: Option<i64>,
    #[serde(rename = "pGAV5", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_5: Option<i64>,
    #[serde(rename = "pGAV4", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_4: Option<i64>,
    #[serde(rename = "pGAV3", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_3: Option<i64>,
    #[serde(rename = "pGAV2", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_2: Option<i64>,
    #[serde(rename = "pGAV1", default, deserialize_with = "de_opt_i64")]
    pub ask_volume_1: Option<i64>,

    // Ten-level bid size ladder
    #[serde(rename = "pGBV10", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_10: Option<i64>,
    #[serde(rename = "pGBV9", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_9: Option<i64>,
    #[serde(rename = "pGBV8", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_8: Option<i64>,
    #[serde(rename = "pGBV7", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_7: Option<i64>,
    #[serde(rename = "pGBV6", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_6: Option<i64>,
    #[serde(rename = "pGBV5", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_5: Option<i64>,
    #[serde(rename = "pGBV4", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_4: Option<i64>,
    #[serde(rename = "pGBV3", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_3: Option<i64>,
    #[serde(rename = "pGBV2", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_2: Option<i64>,
    #[serde(rename = "pGBV1", default, deserialize_with = "de_opt_i64")]
    pub bid_volume_1: Option<i64>,
}

/// All snapshots decoded from one poll cycle, stamped with the single
/// server-reported response timestamp shared by every row in the batch.
#[derive(Debug, Clone)]
pub struct SnapshotBatch {
    pub created_at: NaiveDateTime,
    pub rows: Vec<QuoteSnapshot>,
}

impl SnapshotBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of the instrument master table.
///
/// `api_id` tags which polling client a code is assigned to. The master
/// upsert never writes it; only the explicit assignment flow does.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRecord {
    pub code: String,
    pub name: String,
    pub market_product_category: Option<String>,
    pub sector33_code: Option<String>,
    pub sector33_category: Option<String>,
    pub sector17_code: Option<String>,
    pub sector17_category: Option<String>,
    pub scale_code: Option<String>,
    pub scale_category: Option<String>,
    pub api_id: Option<String>,
}

/// A newly listed issue discovered on the public IPO listing page.
/// Carries only the fields that page publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub code: String,
    pub name: String,
    pub market_product_category: String,
}

/// Rewrites every empty-string member of a JSON object to an explicit null.
///
/// Downstream numeric columns must never see empty-string values, so this
/// runs on each raw snapshot object before typed deserialization. Shallow by
/// contract (snapshot records are flat), and idempotent.
pub fn convert_empty_to_null(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) if s.is_empty() => (k, Value::Null),
                    other => (k, other),
                })
                .collect(),
        ),
        other => other,
    }
}

/// Numeric wire fields arrive as decimal strings (`"2750.5"`); absent values
/// arrive as null after normalization. Anything else is a decode error.
fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid numeric field: {s:?}"))),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("numeric field out of range")),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected numeric field, got {other}"
        ))),
    }
}

fn de_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid integer field: {s:?}"))),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("integer field out of range")),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected integer field, got {other}"
        ))),
    }
}

fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_string_fields_decode_to_none() {
        let raw = json!({
            "sIssueCode": "6501",
            "pDPP": "",
            "pDV": "12345",
            "pGAP1": "102.5",
            "pGBV1": ""
        });
        let snap: QuoteSnapshot =
            serde_json::from_value(convert_empty_to_null(raw)).expect("decode");
        assert_eq!(snap.code, "6501");
        assert_eq!(snap.last_price, None);
        assert_eq!(snap.volume, Some(12345));
        assert_eq!(snap.ask_price_1, Some(102.5));
        assert_eq!(snap.bid_volume_1, None);
    }

    #[test]
    fn missing_fields_decode_to_none() {
        let raw = json!({ "sIssueCode": "7203" });
        let snap: QuoteSnapshot = serde_json::from_value(raw).expect("decode");
        assert_eq!(snap.vwap, None);
        assert_eq!(snap.ask_sign, None);
    }

    #[test]
    fn garbage_numeric_field_is_a_decode_error() {
        let raw = json!({ "sIssueCode": "7203", "pDPP": "n/a" });
        assert!(serde_json::from_value::<QuoteSnapshot>(raw).is_err());
    }

    #[test]
    fn convert_empty_to_null_is_idempotent() {
        let raw = json!({ "a": "", "b": "x", "c": "1.5" });
        let once = convert_empty_to_null(raw);
        let twice = convert_empty_to_null(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once["a"], Value::Null);
        assert_eq!(once["b"], json!("x"));
    }

    #[test]
    fn sign_flags_survive_as_strings() {
        let raw = json!({ "sIssueCode": "8306", "pQAS": "0101", "pQBS": "" });
        let snap: QuoteSnapshot =
            serde_json::from_value(convert_empty_to_null(raw)).expect("decode");
        assert_eq!(snap.ask_sign.as_deref(), Some("0101"));
        assert_eq!(snap.bid_sign, None);
    }
}
