//! Path utilities.
//!
//! Pure functions apart from canonicalization in [`normalize_path`].

pub mod fs;

pub use fs::{normalize_path, relative_to, to_slash};
