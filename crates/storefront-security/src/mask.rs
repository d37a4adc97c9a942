//! Display masking for account numbers, emails and similar values
//!
//! Purely cosmetic. A masked value still leaks its edges and never stands in
//! for encryption or hashing.

use serde_json::Value;

pub const DEFAULT_VISIBLE_START: usize = 2;
pub const DEFAULT_VISIBLE_END: usize = 2;

/// Cap on the number of mask characters, so the output does not reveal length
pub const MAX_MASK_LEN: usize = 5;

pub const MASK_CHAR: char = '*';

/// Keep `visible_start` leading and `visible_end` trailing characters and
/// replace the middle with at most [`MAX_MASK_LEN`] mask characters
///
/// Lengths count characters, not bytes. Values too short to hide anything
/// are returned unchanged.
pub fn mask_string(value: &str, visible_start: usize, visible_end: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();

    if len <= visible_start.saturating_add(visible_end) {
        return value.to_string();
    }

    let hidden = (len - visible_start - visible_end).min(MAX_MASK_LEN);

    let mut masked = String::with_capacity(value.len());
    masked.extend(&chars[..visible_start]);
    masked.extend(std::iter::repeat(MASK_CHAR).take(hidden));
    masked.extend(&chars[len - visible_end..]);
    masked
}

/// [`mask_string`] with two visible characters on each side
pub fn mask(value: &str) -> String {
    mask_string(value, DEFAULT_VISIBLE_START, DEFAULT_VISIBLE_END)
}

/// Mask an untyped display value; anything other than a JSON string masks
/// to the empty string
pub fn mask_value(value: &Value, visible_start: usize, visible_end: usize) -> String {
    match value {
        Value::String(s) => mask_string(s, visible_start, visible_end),
        _ => String::new(),
    }
}
