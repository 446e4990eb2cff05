//! `[build]` section configuration.
//!
//! ```toml
//! [build]
//! source = "source"
//! output = "public"
//! components = "source/components"
//! path_prefix = ""
//! ```
//!
//! Paths are relative to the directory holding `mdxr.toml` and become
//! absolute after loading.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Documents root.
    pub source: PathBuf,
    /// Generated site.
    pub output: PathBuf,
    /// Watched for changes in serve mode; never rendered as documents.
    pub components: PathBuf,
    /// URL prefix for bundle script references, without slashes.
    pub path_prefix: PathBuf,

    /// Remove the output directory before building (CLI only).
    #[serde(skip)]
    pub clean: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: "source".into(),
            output: "public".into(),
            components: "source/components".into(),
            path_prefix: PathBuf::new(),
            clean: false,
        }
    }
}

impl BuildConfig {
    pub(crate) fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.output == self.source {
            diag.error("build.output", "output directory is the source directory")
                .hint("use a separate directory such as \"public\"");
        }
        if self.source.starts_with(&self.output) {
            diag.error("build.source", "source directory is inside the output directory");
        }
        if !self.source.is_dir() {
            diag.error("build.source", format!("{} does not exist", self.source.display()))
                .hint("create it or point build.source at your documents");
        }
    }
}
