//! Request-string assembly for the quasi-JSON query protocol.
//!
//! A request is `<base>[auth/]?{"p_no":"3","p_sd_date":"2024.01.05-09:00:00.123",...}`.
//! The query fragment looks like JSON but is not produced by a serializer:
//! the server requires double-quoted scalars, and the sequence number and
//! local timestamp members lead every request.

use chrono::{DateTime, FixedOffset, Utc};
use parking_lot::Mutex;

use super::ApiError;

/// The exchange clock the server expects in `p_sd_date` (JST, no DST).
const JST_OFFSET_SECS: i32 = 9 * 3600;

/// Current time on the trading-country clock.
pub fn jst_now() -> DateTime<FixedOffset> {
    let jst = FixedOffset::east_opt(JST_OFFSET_SECS).expect("valid JST offset");
    Utc::now().with_timezone(&jst)
}

/// `p_sd_date` layout: `YYYY.MM.DD-HH:MM:SS.mmm`, millisecond precision.
pub fn format_sd_date(stamp: DateTime<FixedOffset>) -> String {
    stamp.format("%Y.%m.%d-%H:%M:%S%.3f").to_string()
}

/// Session-scoped request sequence number.
///
/// Incremented before every encoded request, never reset within a session.
/// The lock spans only the in-memory increment, never any I/O, so two
/// in-flight requests can neither share nor skip a number.
#[derive(Debug, Default)]
pub struct SequenceCounter(Mutex<u64>);

impl SequenceCounter {
    pub fn new() -> Self {
        Self(Mutex::new(0))
    }

    /// Increments the counter and returns the new value.
    pub fn next(&self) -> u64 {
        let mut seq = self.0.lock();
        *seq += 1;
        *seq
    }

    pub fn current(&self) -> u64 {
        *self.0.lock()
    }
}

/// Wraps a scalar in double quotes unless it already carries them.
/// An empty value becomes the two-character empty quoted string.
pub fn quote_wrap(value: &str) -> String {
    if value.is_empty() {
        return "\"\"".to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    if !value.starts_with('"') {
        out.push('"');
    }
    out.push_str(value);
    if !value.ends_with('"') {
        out.push('"');
    }
    out
}

/// Builder over an ordered parameter list.
///
/// Members render in insertion order after the leading `p_no` / `p_sd_date`
/// pair; items with an empty key are skipped entirely. Joining the members
/// (instead of trimming a trailing separator) keeps the empty and
/// one-parameter cases well formed.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    auth: bool,
    items: Vec<(String, String)>,
}

impl RequestBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: false,
            items: Vec::new(),
        }
    }

    /// Routes the request through the `auth/` path segment.
    pub fn with_auth(mut self) -> Self {
        self.auth = true;
        self
    }

    pub fn item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.items.push((key.into(), value.into()));
        self
    }

    /// Increments the session sequence counter and renders the request URL.
    /// Not pure: every call consumes one sequence number.
    pub fn build(&self, seq: &SequenceCounter) -> Result<String, ApiError> {
        if self.base_url.is_empty() {
            return Err(ApiError::Encode("request base URL is empty".to_string()));
        }
        Ok(self.render(seq.next(), &format_sd_date(jst_now())))
    }

    fn render(&self, p_no: u64, sd_date: &str) -> String {
        let mut members: Vec<String> = Vec::with_capacity(self.items.len() + 2);
        members.push(format!("\"p_no\":{}", quote_wrap(&p_no.to_string())));
        members.push(format!("\"p_sd_date\":{}", quote_wrap(sd_date)));
        for (key, value) in &self.items {
            if key.is_empty() {
                continue;
            }
            members.push(format!("{}:{}", quote_wrap(key), quote_wrap(value)));
        }

        let mut url = String::with_capacity(self.base_url.len() + 64);
        url.push_str(&self.base_url);
        if self.auth {
            url.push_str("auth/");
        }
        url.push_str("?{");
        url.push_str(&members.join(","));
        url.push('}');
        url
    }
}
