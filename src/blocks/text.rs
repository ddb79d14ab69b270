use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::core::model::Block;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]{2,}").expect("valid word regex"));
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d[\d,]*\.\d+$").expect("valid decimal regex"));
static COMMA_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:,\s*\d+)*$").expect("valid comma number regex"));

/// NFKC, with control characters (other than newlines) and replacement characters removed.
pub fn normalize_encoding(raw: &str) -> String {
    raw.nfkc()
        .filter_map(|c| match c {
            '\n' => Some('\n'),
            '\t' | '\r' => Some(' '),
            '\u{fffd}' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Removes dash and dot leader noise.
///
/// A run of three or more dashes strips all dashes and newlines. One or two periods
/// strip periods, dashes and newlines. Longer period runs and decimal values are left
/// alone.
pub fn clean_text(raw: &str) -> String {
    let text = raw.trim();
    if DECIMAL.is_match(text) {
        text.to_string()
    } else if has_dash_run(text) {
        text.chars().filter(|c| !matches!(c, '-' | '\n')).collect()
    } else if (1..3).contains(&text.matches('.').count()) {
        text.chars().filter(|c| !matches!(c, '-' | '.' | '\n')).collect()
    } else {
        text.to_string()
    }
}

fn has_dash_run(text: &str) -> bool {
    let mut run = 0;
    for c in text.chars() {
        run = if c == '-' { run + 1 } else { 0 };
        if run > 2 {
            return true;
        }
    }
    false
}

pub fn is_text(text: &str) -> bool {
    WORD.is_match(text)
}

pub fn has_comma_separated_numbers(text: &str) -> bool {
    COMMA_NUMBER.is_match(&text.replace('\n', " "))
}

pub fn parse_number(text: &str) -> Option<i64> {
    text.replace(',', "").trim().parse().ok()
}

/// Stores `text` on the block and recomputes every text-derived feature.
pub fn apply_text(block: &mut Block, text: String) {
    block.text_length = text.chars().count();
    block.is_text = is_text(&text);
    block.comma_separated_numbers_present = has_comma_separated_numbers(&text);
    block.possible_row_merger = text.contains('\n');
    block.number = parse_number(&text);
    block.text = text;
}
