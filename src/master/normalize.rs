//! Normalization rules applied to exchange reference data.

/// Maps the exchange's long-form market/product segment labels to the
/// single-letter categories stored in the master table. Unknown labels pass
/// through unchanged; blank or `-` cells become none.
pub fn segment_letter(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mapped = match trimmed {
        "" | "-" => return None,
        "プライム（内国株式）" => "P",
        "スタンダード（内国株式）" | "スタンダード（外国株式）" => "S",
        "グロース（内国株式）" | "グロース（外国株式）" => "G",
        "PRO Market" => "Pro",
        "ETF・ETN" => "E",
        "REIT・ベンチャーファンド・カントリーファンド・インフラファンド" => "R",
        "出資証券" => "Y",
        other => other,
    };
    Some(mapped.to_string())
}

/// Folds full-width ASCII letters/digits/punctuation and the ideographic
/// space to their half-width forms. Issue names in the exchange file mix
/// both widths; storage wants half-width.
pub fn fold_width(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => {
                char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
            }
            '\u{3000}' => ' ',
            other => other,
        })
        .collect()
}

/// The exchange file uses `-` for absent classification cells.
pub fn blank_to_none(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        None
    } else {
        Some(trimmed.to_string())
    }
}
