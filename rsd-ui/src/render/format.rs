//! Presentational helpers shared by the page renderers

use chrono::{DateTime, Utc};
use rsd_common::Score;

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// CSS class for a sentiment label
pub fn sentiment_class(sentiment: &str) -> &'static str {
    match sentiment {
        "Positivo" => "positive",
        "Negativo" => "error",
        _ => "warning",
    }
}

pub fn score_description(score: Score) -> &'static str {
    match score.value() {
        5 => "Excelente - El usuario está muy satisfecho",
        4 => "Muy bueno - Experiencia positiva general",
        3 => "Neutral - Opinión mixta o sin preferencia clara",
        2 => "Regular - Experiencia por debajo de expectativas",
        _ => "Muy malo - Usuario muy insatisfecho",
    }
}

/// Five-star row, e.g. `★★★☆☆` for 3; out-of-range values are clamped
pub fn stars(score: i64) -> String {
    let filled = score.clamp(0, 5) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Whole-number percentage of `count` in `total`, halves rounded up
pub fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}

/// First 20 characters followed by `...` when longer
pub fn truncate_product(name: &str) -> String {
    const MAX_CHARS: usize = 20;
    if name.chars().count() > MAX_CHARS {
        format!("{}...", name.chars().take(MAX_CHARS).collect::<String>())
    } else {
        name.to_string()
    }
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
        assert_eq!(escape_html("Café"), "Café");
    }

    #[test]
    fn test_sentiment_classes() {
        assert_eq!(sentiment_class("Positivo"), "positive");
        assert_eq!(sentiment_class("Negativo"), "error");
        assert_eq!(sentiment_class("Neutro"), "warning");
        assert_eq!(sentiment_class("desconocido"), "warning");
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(4, 4), 100);
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(3), "★★★☆☆");
        assert_eq!(stars(5), "★★★★★");
        assert_eq!(stars(9), "★★★★★");
    }

    #[test]
    fn test_truncate_product() {
        assert_eq!(truncate_product("Té Verde"), "Té Verde");
        assert_eq!(
            truncate_product("Granola de Frutos Secos"),
            "Granola de Frutos Se..."
        );
    }

    #[test]
    fn test_score_descriptions() {
        assert_eq!(
            score_description(Score::new(5).unwrap()),
            "Excelente - El usuario está muy satisfecho"
        );
        assert_eq!(
            score_description(Score::new(1).unwrap()),
            "Muy malo - Usuario muy insatisfecho"
        );
    }
}
