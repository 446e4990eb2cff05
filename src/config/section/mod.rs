//! `mdxr.toml` sections.

mod build;
mod deps;
mod hydrate;
mod serve;
mod site;

pub use build::BuildConfig;
pub use deps::DepsConfig;
pub use hydrate::HydrateConfig;
pub use serve::ServeConfig;
pub use site::SiteSectionConfig;
