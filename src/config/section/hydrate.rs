//! `[hydrate]` section configuration.
//!
//! ```toml
//! [hydrate]
//! enable = true
//! bundler = ["esbuild"]
//! format = "iife"
//! runtime = "react"
//! ```
//!
//! Leave `enable` on even without a bundler installed: bundling failures only
//! drop the hydration script, the static HTML is unaffected.

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

const FORMATS: [&str; 3] = ["iife", "esm", "cjs"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrateConfig {
    pub enable: bool,
    /// Bundler argv prefix; entry and flags are appended.
    pub bundler: Vec<String>,
    /// Module format handed to the bundler.
    pub format: String,
    /// Import source for `createElement`; `<runtime>-dom/client` supplies `createRoot`.
    pub runtime: String,
}

impl Default for HydrateConfig {
    fn default() -> Self {
        Self {
            enable: true,
            bundler: vec!["esbuild".into()],
            format: "iife".into(),
            runtime: "react".into(),
        }
    }
}

impl HydrateConfig {
    pub(crate) fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.enable {
            return;
        }
        if self.bundler.is_empty() {
            diag.error("hydrate.bundler", "bundler command is empty")
                .hint("set it to [\"esbuild\"] or disable hydration");
        }
        if !FORMATS.contains(&self.format.as_str()) {
            diag.error(
                "hydrate.format",
                format!("unknown format `{}`, expected one of {}", self.format, FORMATS.join(", ")),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn hydrate_overrides() {
        let config = test_parse_config(
            "[hydrate]\nbundler = [\"npx\", \"esbuild\"]\nformat = \"esm\"\nruntime = \"preact/compat\"",
        );
        assert!(config.hydrate.enable);
        assert_eq!(config.hydrate.bundler, ["npx", "esbuild"]);
        assert_eq!(config.hydrate.format, "esm");
        assert_eq!(config.hydrate.runtime, "preact/compat");
    }

    #[test]
    fn unknown_format_is_an_error() {
        let config = test_parse_config("[hydrate]\nformat = \"amd\"");
        let mut diag = ConfigDiagnostics::new();
        config.hydrate.validate(&mut diag);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn disabled_skips_validation() {
        let config = test_parse_config("[hydrate]\nenable = false\nbundler = []");
        let mut diag = ConfigDiagnostics::new();
        config.hydrate.validate(&mut diag);
        assert!(diag.is_empty());
    }
}
