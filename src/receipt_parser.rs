//! # Receipt Parser Module
//!
//! This module turns noisy multi-line receipt text (OCR output or pasted text)
//! into a deduplicated list of grocery names with quantities.
//!
//! ## Rules
//!
//! - Price and total lines made only of digits, punctuation and currency
//!   symbols are dropped
//! - Lines made of one or two noise words ("Subtotal", "Thank you") are dropped
//! - A leading number followed by text is read as the quantity
//! - A trailing price is removed only when it clearly is one: `$`-prefixed, or a
//!   number with one or two decimals. Trailing integers are kept ("Room 101").
//! - Names equal ignoring case are merged by summing their quantities; the
//!   first-seen spelling is kept
//!
//! The parser is pure: no I/O and no shared state.

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::model::ReceiptItem;

/// Words that never name a grocery on their own
pub const NOISE_WORDS: &[&str] = &[
    "total", "subtotal", "tax", "vat", "date", "receipt", "thank", "you", "welcome", "cash",
    "card", "change", "discount", "amount", "due", "paid", "balance", "store", "address",
    "phone", "item", "price", "qty", "quantity",
];

lazy_static! {
    static ref NOISE_SET: HashSet<&'static str> = NOISE_WORDS.iter().copied().collect();
    static ref ONLY_NUMBERS_REGEX: Regex =
        Regex::new(r"^[\d\s.,$€£¥\-]+$").expect("Numbers-only pattern should be valid");
    static ref LEADING_QUANTITY_REGEX: Regex = Regex::new(r"^\s*(\d+(?:\.\d+)?)\s+(.+)$")
        .expect("Leading quantity pattern should be valid");
    static ref TRAILING_DOLLAR_REGEX: Regex =
        Regex::new(r"\s+\$[\d,]+(?:\.\d{1,2})?\s*$").expect("Dollar price pattern should be valid");
    static ref TRAILING_DECIMAL_REGEX: Regex =
        Regex::new(r"\s+[\d,]+\.\d{1,2}\s*$").expect("Decimal price pattern should be valid");
    static ref WHITESPACE_REGEX: Regex =
        Regex::new(r"\s+").expect("Whitespace pattern should be valid");
}

/// Parse raw receipt text into merged grocery items
///
/// # Examples
///
/// ```rust
/// use groceries::receipt_parser::parse_receipt_text;
///
/// let items = parse_receipt_text("2 Apples\n1 apples\nTOTAL $4.00\n");
/// assert_eq!(items.len(), 1);
/// assert_eq!(items[0].name, "Apples");
/// assert_eq!(items[0].quantity, 3.0);
/// ```
pub fn parse_receipt_text(raw: &str) -> Vec<ReceiptItem> {
    let mut merged: Vec<ReceiptItem> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for line in raw.lines() {
        let Some(parsed) = parse_line(line) else {
            continue;
        };
        let key = parsed.name.to_lowercase();
        match index_by_key.get(&key) {
            Some(&index) => {
                trace!("Merging '{}' into '{}'", parsed.name, merged[index].name);
                merged[index].quantity += parsed.quantity;
            }
            None => {
                index_by_key.insert(key, merged.len());
                merged.push(parsed);
            }
        }
    }

    debug!(
        "Parsed {} receipt items from {} lines",
        merged.len(),
        raw.lines().count()
    );
    merged
}

/// Parse one receipt line, or `None` when the line carries no item
pub fn parse_line(line: &str) -> Option<ReceiptItem> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if ONLY_NUMBERS_REGEX.is_match(trimmed) {
        trace!("Skipping price line: '{}'", trimmed);
        return None;
    }
    if is_noise_line(trimmed) {
        trace!("Skipping noise line: '{}'", trimmed);
        return None;
    }

    let leading = LEADING_QUANTITY_REGEX.captures(trimmed);
    let has_leading_quantity = leading.is_some();
    let (quantity, candidate) = match leading {
        Some(captures) => {
            let quantity = captures[1]
                .parse::<f64>()
                .ok()
                .filter(|q| q.is_finite())
                .map(|q| q.max(0.0))
                .unwrap_or(1.0);
            (quantity, captures[2].to_string())
        }
        None => (1.0, trimmed.to_string()),
    };

    let name = strip_trailing_price(&candidate);
    let name = WHITESPACE_REGEX.replace_all(&name, " ").trim().to_string();
    if name.is_empty() {
        return None;
    }
    // "TOTAL $42.50" only reveals itself as noise once the price is gone;
    // "2 Card" is a counted item, not noise
    if !has_leading_quantity && is_noise_line(&name) {
        trace!("Skipping noise name after price removal: '{}'", name);
        return None;
    }

    Some(ReceiptItem { name, quantity })
}

/// True when the text is one or two words, all of them noise words
///
/// Whole-word match only: "Totally Tofu" is not noise.
pub fn is_noise_line(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if words.is_empty() {
        return true;
    }
    words.len() <= 2 && words.iter().all(|w| NOISE_SET.contains(w))
}

/// Remove a trailing `$` amount or two-decimal price
pub fn strip_trailing_price(text: &str) -> String {
    let without_dollar = TRAILING_DOLLAR_REGEX.replace(text, "");
    TRAILING_DECIMAL_REGEX
        .replace(&without_dollar, "")
        .trim()
        .to_string()
}
