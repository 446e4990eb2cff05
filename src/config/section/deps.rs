//! `[deps]` section configuration.
//!
//! ```toml
//! [deps]
//! file = "mdxr-deps.json"   # written under build.output
//! mirror = true             # also written to the project root
//! ```
//!
//! The root mirror survives `mdxr clean`, so incremental rebuilds keep
//! working after the output directory is wiped.

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepsConfig {
    pub file: String,
    pub mirror: bool,
}

impl Default for DepsConfig {
    fn default() -> Self {
        Self {
            file: "mdxr-deps.json".into(),
            mirror: true,
        }
    }
}

impl DepsConfig {
    pub(crate) fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.file.is_empty() || self.file.contains(['/', '\\']) {
            diag.error("deps.file", "must be a plain file name");
        }
    }
}
