//! CSV export of batch results
//!
//! Format: header `#,Reseña,Puntuación,Sentimiento`, one row per item with
//! the review text always quoted (inner quotes doubled), rows joined by `\n`
//! and no trailing newline.

use rsd_common::types::BatchResult;

pub const CSV_HEADER: &str = "#,Reseña,Puntuación,Sentimiento";

/// Render a batch result as CSV text
pub fn to_csv(result: &BatchResult) -> String {
    let rows = result.items.iter().map(|item| {
        format!(
            "{},\"{}\",{},{}",
            item.index,
            item.text.replace('"', "\"\""),
            item.score,
            item.sentiment
        )
    });

    std::iter::once(CSV_HEADER.to_string())
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

/// `analisis_{product}_{epoch_millis}.csv`
pub fn export_filename(product_name: &str, epoch_millis: i64) -> String {
    format!("analisis_{}_{}.csv", product_name, epoch_millis)
}

/// `Content-Disposition` value for a download named `filename`
///
/// Carries an ASCII fallback (`filename=`) plus the exact UTF-8 name
/// (`filename*=`, RFC 5987).
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        percent_encode(filename)
    )
}

/// RFC 5987 `attr-char` set kept as-is, everything else `%XX`
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
