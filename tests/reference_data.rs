//! Reference refresh flow against a local instrument-file fixture.

use std::io::Write;

use itafeed_backend::master::{parse_master_csv, FileMasterSource, MasterFileSource};

const FIXTURE: &str = "\
日付,コード,銘柄名,市場・商品区分,33業種コード,33業種区分,17業種コード,17業種区分,規模コード,規模区分
20240105,6501,日立製作所,プライム（内国株式）,3650,電気機器,9,電機・精密,1,TOPIX Core30
20240105,2516,東証マザーズＥＴＦ,ETF・ETN,-,-,-,-,-,-
";

#[tokio::test]
async fn local_file_source_feeds_the_csv_parser() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(FIXTURE.as_bytes()).expect("write fixture");

    let source = FileMasterSource::new(file.path());
    let bytes = source.fetch().await.expect("fetch local file");
    let records = parse_master_csv(&bytes).expect("parse fixture");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].code, "6501");
    assert_eq!(records[0].market_product_category.as_deref(), Some("P"));
    assert_eq!(records[0].sector33_code.as_deref(), Some("3650"));
    assert_eq!(records[0].scale_category.as_deref(), Some("TOPIX Core30"));

    // Full-width name folds, dash cells drop.
    assert_eq!(records[1].name, "東証マザーズETF");
    assert_eq!(records[1].market_product_category.as_deref(), Some("E"));
    assert_eq!(records[1].sector17_code, None);
    assert_eq!(records[1].api_id, None);
}
