//! Dish-name normalization for cache keys.
//!
//! Menus decorate dish names with prices, dietary tags, and glyphs; the cache
//! must treat "Pad Thai  $12.99" and "pad thai" as the same dish. This module
//! produces the canonical lowercase key used for all dish cache lookups.
//!
//! The function is pure and idempotent: `normalize(normalize(x)) == normalize(x)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Currency-prefixed price token anywhere in the string, e.g. "$12", "€9.50".
static CURRENCY_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$€£¥₹]\s*\d+(?:[.,]\d{1,2})?").unwrap());

/// Trailing bare number that reads as a price, e.g. "Pad Thai 12.99".
static TRAILING_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\d+(?:[.,]\d{1,2})?\s*$").unwrap());

/// Parenthesized, bracketed, and braced annotations, delimiters included.
static ANNOTATIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}").unwrap());

/// Decorative and rating glyphs menus sprinkle around dish names.
static GLYPHS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[★☆✦✶*•~♥♡✓†‡]+").unwrap());

/// Whitespace runs, collapsed to a single space.
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Produce the canonical cache key for a raw dish name.
///
/// Strips price tokens, bracketed annotations, and decorative glyphs, then
/// collapses whitespace, trims, and lowercases.
pub fn normalize_dish_name(raw: &str) -> String {
    let s = ANNOTATIONS.replace_all(raw, " ");
    let s = CURRENCY_PRICE.replace_all(&s, " ");
    let s = GLYPHS.replace_all(&s, " ");
    let s = WHITESPACE.replace_all(&s, " ");
    let s = s.trim();
    // Trailing bare-number prices only make sense after annotation/glyph
    // removal, otherwise "Pizza (v) 12" would keep its price.
    let s = TRAILING_PRICE.replace_all(s, "");
    s.trim().to_lowercase()
}
