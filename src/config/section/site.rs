//! `[site]` section configuration.
//!
//! ```toml
//! [site]
//! title = "My Site"
//! url = "https://example.github.io/blog"   # path becomes the URL prefix
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSectionConfig {
    /// Fallback `<title>` for documents without one in front matter.
    pub title: String,

    /// Deployed site URL. Its path component is used as `build.path_prefix`
    /// when that is not set explicitly.
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn site_section() {
        let config = test_parse_config("[site]\ntitle = \"Notes\"\nurl = \"https://x.dev/notes\"");
        assert_eq!(config.site.title, "Notes");
        assert_eq!(config.site.url.as_deref(), Some("https://x.dev/notes"));
    }
}
