//! One-shot `build` command.
//!
//! Pipeline: clean (optional) -> init -> generate -> exit.
//! The watcher is never started in this mode.

use std::sync::Arc;

use anyhow::{Result, bail};

use crate::config::SiteConfig;
use crate::core::ExecutionMode;
use crate::plugin::MdxPlugin;
use crate::site::{GenerateReport, Site};
use crate::log;
use crate::utils::plural_count;

/// Assemble the site with the MDX plugin installed.
pub fn load_site(config: &SiteConfig, mode: ExecutionMode) -> Site {
    let mut site = Site::new(config);
    site.add_plugin(Arc::new(MdxPlugin::new(config, mode)));
    site
}

/// Build the entire site once.
pub fn build_site(config: &SiteConfig) -> Result<GenerateReport> {
    let site = load_site(config, ExecutionMode::Generate);
    if config.build.clean {
        site.clean()?;
    }

    site.init();
    let report = site.generate(None);
    site.exit();
    let report = report?;

    if !report.is_success() {
        bail!("{} failed", plural_count(report.failed.len(), "document"));
    }

    log!("build"; "{} -> {}", plural_count(report.rendered, "document"), config.build.output.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_site_config;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("source/components")).unwrap();
        fs::write(dir.path().join("source/index.mdx"), "# Home").unwrap();
        dir
    }

    fn no_bundler(dir: &TempDir) -> SiteConfig {
        let mut config = test_site_config(dir.path());
        config.hydrate.enable = false;
        config
    }

    #[test]
    fn build_writes_pages() {
        let dir = project();
        let report = build_site(&no_bundler(&dir)).unwrap();
        assert_eq!(report.rendered, 1);
        assert!(dir.path().join("public/index.html").is_file());
    }

    #[test]
    fn clean_flag_removes_stale_output() {
        let dir = project();
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::write(dir.path().join("public/stale.html"), "old").unwrap();

        let mut config = no_bundler(&dir);
        config.build.clean = true;
        build_site(&config).unwrap();
        assert!(!dir.path().join("public/stale.html").exists());
        assert!(dir.path().join("public/index.html").is_file());
    }

    #[test]
    fn failed_document_fails_the_build() {
        let dir = project();
        fs::write(dir.path().join("source/broken.mdx"), "<Missing />\n").unwrap();
        let err = build_site(&no_bundler(&dir)).unwrap_err();
        assert!(err.to_string().contains("1 document failed"));
    }
}
