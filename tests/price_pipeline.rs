//! End-to-end decode pipeline over canned wire responses: login parsing
//! into session endpoints, and a full price response down to typed,
//! null-normalized snapshot rows.

use chrono::NaiveDate;

use itafeed_backend::api::{decode_price_response, parse_login_response, ApiError};

const LOGIN_BODY: &str = r#"{
    "p_no": "1",
    "p_sd_date": "2024.01.05-08:45:10.120",
    "p_errno": "0",
    "sUrlRequest": "https://kabuka.example/e_api/request/",
    "sUrlEvent": "https://kabuka.example/e_api/event/",
    "sUrlMaster": "https://kabuka.example/e_api/master/",
    "sUrlPrice": "https://kabuka.example/e_api/price/",
    "sZyoutoekiKazeiC": "1"
}"#;

const PRICE_BODY: &str = r#"{
    "p_no": "2",
    "p_sd_date": "2024.01.05-09:00:05.473",
    "p_rv_date": "2024.01.05-09:00:05.473321",
    "p_errno": "0",
    "sCLMID": "CLMMfdsGetMarketPrice",
    "aCLMMfdsMarketPrice": [
        {
            "sIssueCode": "6501",
            "pDPP": "10425.0", "pDV": "1306400", "pPRP": "10385",
            "pDOP": "10390", "pDHP": "10445", "pDLP": "10350", "pVWAP": "10401.5482",
            "pQAP": "10425", "pQAS": "0101", "pQBP": "10420", "pQBS": "0101",
            "pAAV": "0", "pABV": "0", "pQOV": "1320500", "pQUV": "1178300",
            "pGAP10": "10470", "pGAP1": "10425",
            "pGBP10": "10375", "pGBP1": "10420",
            "pGAV10": "8000", "pGAV1": "2100",
            "pGBV10": "12400", "pGBV1": "3300"
        },
        {
            "sIssueCode": "9984",
            "pDPP": "", "pDV": "0", "pPRP": "6321",
            "pDOP": "", "pDHP": "", "pDLP": "", "pVWAP": "0",
            "pQAP": "6330", "pQAS": "0101", "pQBP": "6315", "pQBS": "0101",
            "pAAV": "", "pABV": "", "pQOV": "540200", "pQUV": "498100",
            "pGAP1": "6330", "pGBP1": "6315", "pGAV1": "500", "pGBV1": "800"
        }
    ]
}"#;

#[test]
fn login_then_price_fetch_decodes_to_typed_rows() {
    let login = parse_login_response(LOGIN_BODY).expect("login parses");
    assert_eq!(login.endpoints.price_url, "https://kabuka.example/e_api/price/");
    assert_eq!(login.endpoints.request_url, "https://kabuka.example/e_api/request/");
    assert_eq!(login.endpoints.event_url, "https://kabuka.example/e_api/event/");
    assert_eq!(login.endpoints.master_url, "https://kabuka.example/e_api/master/");

    let batch = decode_price_response(PRICE_BODY).expect("price response decodes");
    assert_eq!(batch.len(), 2);

    let expected_stamp = NaiveDate::from_ymd_opt(2024, 1, 5)
        .unwrap()
        .and_hms_micro_opt(9, 0, 5, 473_321)
        .unwrap();
    assert_eq!(batch.created_at, expected_stamp);

    let hitachi = &batch.rows[0];
    assert_eq!(hitachi.code, "6501");
    assert_eq!(hitachi.last_price, Some(10425.0));
    assert_eq!(hitachi.volume, Some(1_306_400));
    assert_eq!(hitachi.vwap, Some(10401.5482));
    assert_eq!(hitachi.ask_price_1, Some(10425.0));
    assert_eq!(hitachi.bid_volume_10, Some(12_400));
    // Columns the canned response omits entirely decode as absent.
    assert_eq!(hitachi.ask_price_5, None);

    // Pre-open row: empty strings are null, not "".
    let softbank = &batch.rows[1];
    assert_eq!(softbank.last_price, None);
    assert_eq!(softbank.open_price, None);
    assert_eq!(softbank.market_ask_volume, None);
    assert_eq!(softbank.volume, Some(0));
}

#[test]
fn rejected_login_never_yields_endpoints() {
    let err = parse_login_response(r#"{"p_errno":"1","sUrlEvent":""}"#).unwrap_err();
    assert!(matches!(err, ApiError::Auth { .. }));
}

#[test]
fn price_body_with_no_rows_is_a_protocol_fault() {
    let body = r#"{"p_rv_date":"2024.01.05-09:00:05.473321","aCLMMfdsMarketPrice":[]}"#;
    assert!(matches!(
        decode_price_response(body).unwrap_err(),
        ApiError::Decode(_)
    ));
}
