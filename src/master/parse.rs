//! Parsers for the two reference-data inputs: the exchange instrument file
//! (consumed at the CSV boundary) and the public IPO listing page (a plain
//! HTML document with one relevant table).

use anyhow::{Context, Result};

use super::normalize::{blank_to_none, fold_width, segment_letter};
use crate::models::{InstrumentRecord, NewListing};

/// Parses the instrument file. Columns are located by their published
/// Japanese headers; the date column, when present, is ignored.
pub fn parse_master_csv(bytes: &[u8]) -> Result<Vec<InstrumentRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers().context("instrument file has no header row")?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let code_col = position("コード").context("instrument file is missing the code column")?;
    let name_col = position("銘柄名").context("instrument file is missing the name column")?;
    let market_col = position("市場・商品区分");
    let sector33_code_col = position("33業種コード");
    let sector33_col = position("33業種区分");
    let sector17_code_col = position("17業種コード");
    let sector17_col = position("17業種区分");
    let scale_code_col = position("規模コード");
    let scale_col = position("規模区分");

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.context("malformed row in instrument file")?;
        let cell = |col: Option<usize>| col.and_then(|c| row.get(c)).unwrap_or("");

        let code = row.get(code_col).unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }

        records.push(InstrumentRecord {
            code: code.to_string(),
            name: fold_width(row.get(name_col).unwrap_or("").trim()),
            market_product_category: segment_letter(cell(market_col)),
            sector33_code: blank_to_none(cell(sector33_code_col)),
            sector33_category: blank_to_none(cell(sector33_col)),
            sector17_code: blank_to_none(cell(sector17_code_col)),
            sector17_category: blank_to_none(cell(sector17_col)),
            scale_code: blank_to_none(cell(scale_code_col)),
            scale_category: blank_to_none(cell(scale_col)),
            api_id: None,
        });
    }

    Ok(records)
}

/// Extracts new-listing rows from the IPO page.
///
/// The page carries several tables; the relevant one is identified by its
/// code/name/market headers. Kept rows are Tokyo listings (`東` prefix,
/// stripped) whose names do not mark a cancelled offering (`中止`).
pub fn parse_listing_page(html: &str) -> Vec<NewListing> {
    for table in extract_tables(html) {
        let Some(header) = table.first() else { continue };

        let find = |needles: &[&str]| {
            header.iter().position(|cell| {
                needles.iter().any(|needle| cell.contains(needle))
            })
        };
        let (Some(code_col), Some(name_col), Some(market_col)) = (
            find(&["ｺｰﾄﾞ", "コード"]),
            find(&["銘柄"]),
            find(&["市場"]),
        ) else {
            continue;
        };

        let mut listings = Vec::new();
        for row in &table[1..] {
            let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("").trim();
            let code = cell(code_col);
            let name = cell(name_col);
            let market = cell(market_col);

            if code.is_empty() || !market.starts_with('東') || name.contains("中止") {
                continue;
            }

            listings.push(NewListing {
                code: code.to_string(),
                name: name.to_string(),
                market_product_category: market.trim_start_matches('東').to_string(),
            });
        }
        return listings;
    }
    Vec::new()
}

/// Minimal table scanner: the listing page is static server-rendered HTML,
/// so tag-boundary scanning is sufficient. Returns tables as rows of cell
/// texts with markup stripped.
fn extract_tables(html: &str) -> Vec<Vec<Vec<String>>> {
    // ASCII lowercasing preserves byte offsets, so indices found in
    // `lower` address the original string.
    let lower = html.to_ascii_lowercase();
    let mut tables = Vec::new();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find("<table") {
        let start = pos + offset;
        let Some(end_offset) = lower[start..].find("</table") else { break };
        let end = start + end_offset;
        tables.push(extract_rows(&html[start..end], &lower[start..end]));
        pos = end + "</table".len();
    }
    tables
}

fn extract_rows(fragment: &str, lower: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find("<tr") {
        let start = pos + offset;
        let Some(end_offset) = lower[start..].find("</tr") else { break };
        let end = start + end_offset;
        rows.push(extract_cells(&fragment[start..end], &lower[start..end]));
        pos = end + "</tr".len();
    }
    rows
}

fn extract_cells(row: &str, lower: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut pos = 0;

    loop {
        let td = lower[pos..].find("<td");
        let th = lower[pos..].find("<th");
        let Some(offset) = [td, th].into_iter().flatten().min() else { break };
        let tag_start = pos + offset;

        let Some(open_end) = lower[tag_start..].find('>') else { break };
        let content_start = tag_start + open_end + 1;

        let close = [
            lower[content_start..].find("</td"),
            lower[content_start..].find("</th"),
        ]
        .into_iter()
        .flatten()
        .min();
        let Some(close_offset) = close else { break };
        let content_end = content_start + close_offset;

        cells.push(strip_markup(&row[content_start..content_end]));
        pos = content_end + "</td".len();
    }
    cells
}

/// Drops nested tags and decodes the handful of entities the page uses.
fn strip_markup(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER_CSV: &str = "\
日付,コード,銘柄名,市場・商品区分,33業種コード,33業種区分,17業種コード,17業種区分,規模コード,規模区分
20240105,1301,極洋,プライム（内国株式）,50,水産・農林業,1,食品,7,TOPIX Small 2
20240105,1305,ｉＦｒｅｅＥＴＦ　ＴＯＰＩＸ,ETF・ETN,-,-,-,-,-,-
";

    #[test]
    fn master_csv_rows_are_normalized() {
        let records = parse_master_csv(MASTER_CSV.as_bytes()).expect("parse");
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].code, "1301");
        assert_eq!(records[0].market_product_category.as_deref(), Some("P"));
        assert_eq!(records[0].sector33_code.as_deref(), Some("50"));
        assert_eq!(records[0].api_id, None);

        assert_eq!(records[1].name, "iFreeETF TOPIX");
        assert_eq!(records[1].market_product_category.as_deref(), Some("E"));
        assert_eq!(records[1].sector33_code, None);
        assert_eq!(records[1].scale_category, None);
    }

    #[test]
    fn master_csv_without_code_column_fails() {
        let bad = "銘柄名,市場・商品区分\nダミー,ETF・ETN\n";
        assert!(parse_master_csv(bad.as_bytes()).is_err());
    }

    const LISTING_HTML: &str = r#"
        <html><body>
        <table><tr><th>navigation</th></tr></table>
        <table>
          <tr><th>上場日</th><th>ｺｰﾄﾞ</th><th>銘柄</th><th>市場</th></tr>
          <tr><td>1/15</td><td>9001</td><td><a href="/x">Alpha Robotics</a></td><td>東G</td></tr>
          <tr><td>1/16</td><td>9002</td><td>Beta Foods(中止)</td><td>東S</td></tr>
          <tr><td>1/17</td><td>9003</td><td>Gamma K.K.</td><td>名M</td></tr>
          <tr><td>1/18</td><td>9004</td><td>Delta Pharma</td><td>東P</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn listing_page_keeps_tokyo_rows_without_cancellations() {
        let listings = parse_listing_page(LISTING_HTML);
        assert_eq!(listings.len(), 2);

        assert_eq!(listings[0].code, "9001");
        assert_eq!(listings[0].name, "Alpha Robotics");
        assert_eq!(listings[0].market_product_category, "G");

        assert_eq!(listings[1].code, "9004");
        assert_eq!(listings[1].market_product_category, "P");
    }

    #[test]
    fn page_without_a_matching_table_yields_nothing() {
        assert!(parse_listing_page("<table><tr><td>nope</td></tr></table>").is_empty());
    }
}
