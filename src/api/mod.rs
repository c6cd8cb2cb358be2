//! Tachibana e-shiten protocol client.
//!
//! The broker speaks a quasi-JSON-over-HTTP dialect: requests are GETs whose
//! query fragment is a hand-assembled object of quoted scalars, responses are
//! plain JSON in a legacy Japanese encoding. Login hands back per-session
//! virtual endpoint URLs that all further requests are issued against.

mod encoder;
mod price;
mod session;

pub use encoder::{format_sd_date, jst_now, quote_wrap, RequestBuilder, SequenceCounter};
pub use price::decode_price_response;
pub use session::{
    parse_login_response, Credentials, LoginFields, Session, TachibanaClient, VirtualEndpoints,
};

use thiserror::Error;

/// Errors surfaced by the protocol client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Login rejected by the server. Fatal: without a session there is
    /// nothing to poll against.
    #[error("login rejected (p_errno={errno}, event endpoint empty: {event_empty})")]
    Auth { errno: i64, event_empty: bool },

    /// Malformed request parameter set. Should not occur with valid input;
    /// treated as a programming error by callers.
    #[error("request encoding failed: {0}")]
    Encode(String),

    /// Network-level failure on a request. Per-cycle callers log and skip.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response missing expected fields, unparseable, or an empty result
    /// set where records were required.
    #[error("decode error: {0}")]
    Decode(String),
}
