//! Client-side hydration.
//!
//! - [`id`] - stable per-document hash
//! - [`resolver`] - import interception producing placeholders
//! - [`entry`] - entry module generation
//! - [`bundler`] - external bundler boundary
//! - [`builder`] - ties it together for one render

pub mod builder;
pub mod bundler;
pub mod entry;
pub mod id;
pub mod resolver;

pub use builder::{BUNDLE_DIR, HydrateSettings, HydrationBuilder};
pub use bundler::{Bundler, EsbuildBundler};
pub use id::DocumentId;
pub use resolver::{ComponentRef, PlaceholderResolver};
