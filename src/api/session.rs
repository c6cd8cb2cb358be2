//! Login handshake and session state.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::encoder::{RequestBuilder, SequenceCounter};
use super::price::{decode_price_response, TARGET_COLUMNS};
use super::ApiError;
use crate::models::SnapshotBatch;

/// Response format selector sent as `sJsonOfmt` (4 = compact single-line).
const JSON_FORMAT: &str = "4";

/// Fallback charset for response bodies. The broker serves legacy-encoded
/// JSON without a charset header; decode before parsing.
const RESPONSE_CHARSET: &str = "Shift_JIS";

/// Broker account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
    /// Second password. Order-entry requests require it; the market-data
    /// flows never send it, but it belongs with the account credentials.
    pub password_sec: String,
}

/// Unauthenticated client. `login` turns it into a [`Session`].
pub struct TachibanaClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    seq: SequenceCounter,
}

impl TachibanaClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            credentials,
            seq: SequenceCounter::new(),
        })
    }

    /// Performs the `CLMAuthLoginRequest` handshake.
    ///
    /// Consumes the client: on success every further request is issued
    /// against the virtual endpoints carried by the returned session, and
    /// the sequence counter continues counting from the login request.
    pub async fn login(self) -> Result<Session, ApiError> {
        let url = RequestBuilder::new(&self.base_url)
            .with_auth()
            .item("sCLMID", "CLMAuthLoginRequest")
            .item("sUserId", &self.credentials.user_id)
            .item("sPassword", &self.credentials.password)
            .item("sJsonOfmt", JSON_FORMAT)
            .build(&self.seq)?;

        let body = self.get_text(&url).await?;
        let login = parse_login_response(&body)?;
        info!(user_id = %self.credentials.user_id, "login succeeded");

        Ok(Session {
            client: self,
            endpoints: login.endpoints,
            tax_category: login.tax_category,
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, ApiError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.text_with_charset(RESPONSE_CHARSET).await?)
    }
}

/// Per-session virtual endpoint URLs issued by the login response.
#[derive(Debug, Clone)]
pub struct VirtualEndpoints {
    pub request_url: String,
    pub event_url: String,
    pub master_url: String,
    pub price_url: String,
}

/// Authenticated session, valid for one login lifetime.
///
/// Only constructed from a successful handshake, so holding a `Session`
/// implies every endpoint is populated; requests can never be encoded
/// against an unset endpoint.
pub struct Session {
    client: TachibanaClient,
    pub endpoints: VirtualEndpoints,
    /// Capital-gains tax category from login (1 tokutei, 3 ippan, 5 NISA).
    pub tax_category: String,
}

impl Session {
    /// Fetches one board snapshot per code via `CLMMfdsGetMarketPrice`.
    pub async fn fetch_market_prices(&self, codes: &[String]) -> Result<SnapshotBatch, ApiError> {
        let url = RequestBuilder::new(&self.endpoints.price_url)
            .item("sCLMID", "CLMMfdsGetMarketPrice")
            .item("sTargetIssueCode", codes.join(","))
            .item("sTargetColumn", TARGET_COLUMNS)
            .item("sJsonOfmt", JSON_FORMAT)
            .build(&self.client.seq)?;

        let body = self.client.get_text(&url).await?;
        decode_price_response(&body)
    }

    pub fn user_id(&self) -> &str {
        &self.client.credentials.user_id
    }
}

/// Fields consumed from a successful login response.
#[derive(Debug)]
pub struct LoginFields {
    pub endpoints: VirtualEndpoints,
    pub tax_category: String,
}

/// Decodes a login response body.
///
/// Succeeds only when the numeric `p_errno` equals zero AND `sUrlEvent` is
/// non-empty; anything else is an [`ApiError::Auth`]. `p_errno` arrives as a
/// number or a numeric string depending on server formatting.
pub fn parse_login_response(body: &str) -> Result<LoginFields, ApiError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("login response is not valid JSON: {e}")))?;

    let errno = numeric_field(&value, "p_errno")?;
    let event_url = str_field(&value, "sUrlEvent").unwrap_or_default();
    if errno != 0 || event_url.is_empty() {
        return Err(ApiError::Auth {
            errno,
            event_empty: event_url.is_empty(),
        });
    }

    Ok(LoginFields {
        endpoints: VirtualEndpoints {
            request_url: required_str(&value, "sUrlRequest")?,
            event_url,
            master_url: required_str(&value, "sUrlMaster")?,
            price_url: required_str(&value, "sUrlPrice")?,
        },
        tax_category: str_field(&value, "sZyoutoekiKazeiC").unwrap_or_default(),
    })
}

fn numeric_field(value: &Value, name: &str) -> Result<i64, ApiError> {
    match value.get(name) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ApiError::Decode(format!("field {name} is not an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::Decode(format!("field {name} is not numeric: {s:?}"))),
        _ => Err(ApiError::Decode(format!("missing field: {name}"))),
    }
}

fn str_field(value: &Value, name: &str) -> Option<String> {
    value
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn required_str(value: &Value, name: &str) -> Result<String, ApiError> {
    str_field(value, name)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Decode(format!("missing field: {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_OK: &str = r#"{
        "p_errno": "0",
        "sUrlRequest": "https://kabuka.example/req/",
        "sUrlEvent": "https://kabuka.example/evt/",
        "sUrlMaster": "https://kabuka.example/mst/",
        "sUrlPrice": "https://kabuka.example/prc/",
        "sZyoutoekiKazeiC": "1"
    }"#;

    #[test]
    fn successful_login_populates_all_endpoints() {
        let login = parse_login_response(LOGIN_OK).expect("login should parse");
        assert_eq!(login.endpoints.request_url, "https://kabuka.example/req/");
        assert_eq!(login.endpoints.event_url, "https://kabuka.example/evt/");
        assert_eq!(login.endpoints.master_url, "https://kabuka.example/mst/");
        assert_eq!(login.endpoints.price_url, "https://kabuka.example/prc/");
        assert_eq!(login.tax_category, "1");
    }

    #[test]
    fn nonzero_errno_is_an_auth_error() {
        let err = parse_login_response(r#"{"p_errno":"1","sUrlEvent":""}"#).unwrap_err();
        match err {
            ApiError::Auth { errno, event_empty } => {
                assert_eq!(errno, 1);
                assert!(event_empty);
            }
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[test]
    fn empty_event_endpoint_fails_even_with_zero_errno() {
        let err = parse_login_response(r#"{"p_errno":"0","sUrlEvent":""}"#).unwrap_err();
        assert!(matches!(err, ApiError::Auth { errno: 0, event_empty: true }));
    }

    #[test]
    fn numeric_errno_without_quotes_also_parses() {
        let body = LOGIN_OK.replace("\"p_errno\": \"0\"", "\"p_errno\": 0");
        assert!(parse_login_response(&body).is_ok());
    }

    #[test]
    fn missing_errno_is_a_decode_error() {
        let err = parse_login_response(r#"{"sUrlEvent":"x"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
