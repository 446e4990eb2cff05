//! Shared helpers.
//!
//! - [`exec`] - external command runner with output filtering
//! - [`html`] - text and attribute escaping
//! - [`mime`] - content types for the dev server
//! - [`path`] - path normalization

pub mod exec;
pub mod html;
pub mod mime;
pub mod path;

/// `"s"` unless `n == 1`.
#[inline]
pub fn plural_s(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// `plural_count(2, "document")` -> `"2 documents"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, plural_s(count))
}
