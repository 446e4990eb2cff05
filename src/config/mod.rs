//! Site configuration management for `mdxr.toml`.
//!
//! ```text
//! config/
//! ├── section/       # [site] [build] [hydrate] [deps] [serve]
//! ├── types/         # ConfigError, ConfigDiagnostics
//! ├── util.rs        # config discovery, URL helpers
//! └── mod.rs         # SiteConfig (this file)
//! ```
//!
//! | Section     | Purpose                                           |
//! |-------------|---------------------------------------------------|
//! | `[site]`    | Fallback title, deployed URL                      |
//! | `[build]`   | Source, output and components directories         |
//! | `[hydrate]` | Bundler command, module format, runtime           |
//! | `[deps]`    | Dependency index file and root mirror             |
//! | `[serve]`   | HTTP server, watcher, rebuild strategy, timeouts  |

mod error;
pub mod section;
mod util;

use util::{extract_url_path, find_config_file};

pub use section::{BuildConfig, DepsConfig, HydrateConfig, ServeConfig, SiteSectionConfig};
pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};

use crate::cli::{BuildArgs, Cli, Commands};
use crate::hydrate::{BUNDLE_DIR, HydrateSettings};
use crate::log;
use crate::utils::path::normalize_path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Scratch directory under the project root; ignored by the watcher.
pub const WORK_DIR: &str = ".mdxr";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing `mdxr.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory, parent of the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub site: SiteSectionConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub hydrate: HydrateConfig,

    #[serde(default)]
    pub deps: DepsConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Load configuration for `cli`, searching upward from the working directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        Self::load_in(cli, &cwd)
    }

    fn load_in(cli: &Cli, cwd: &Path) -> Result<Self> {
        let Some(config_path) = find_config_file(&cli.config, cwd) else {
            return Err(ConfigError::NotFound(cwd.join(&cli.config)).into());
        };

        let mut config = Self::from_path(&config_path)?;
        config.config_path = normalize_path(&config_path);
        config.finalize(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Resolve paths and apply CLI overrides.
    fn finalize(&mut self, cli: &Cli) {
        let root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.root = normalize_path(&root);

        Self::update_option(&mut self.build.source, cli.source.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());
        self.normalize_paths();
        self.apply_command_options(cli);
        self.sync_path_prefix_from_url();

        // Local serving answers at `/`, whatever the deployed prefix
        if cli.is_serve() {
            self.build.path_prefix = PathBuf::new();
        }
    }

    fn normalize_paths(&mut self) {
        let root = self.root.clone();
        self.build.source = normalize_path(&root.join(&self.build.source));
        self.build.output = normalize_path(&root.join(&self.build.output));
        self.build.components = normalize_path(&root.join(&self.build.components));
    }

    /// An explicit `build.path_prefix` wins over the one derived from `site.url`.
    fn sync_path_prefix_from_url(&mut self) {
        if self.build.path_prefix.as_os_str().is_empty()
            && let Some(ref url) = self.site.url
            && let Some(path) = extract_url_path(url)
            && !path.is_empty()
        {
            self.build.path_prefix = PathBuf::from(path);
        }
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Build { build_args } => self.apply_build_args(build_args),
            Commands::Serve {
                build_args,
                interface,
                port,
                watch,
            } => {
                self.apply_build_args(build_args);
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
            Commands::Clean => {}
        }
    }

    fn apply_build_args(&mut self, args: &BuildArgs) {
        crate::logger::set_verbose(args.verbose);

        Self::update_option(&mut self.hydrate.enable, args.hydrate.as_ref());
        self.build.clean = args.clean;
        if let Some(ref url) = args.site_url {
            self.site.url = Some(url.clone());
            self.build.path_prefix = PathBuf::new();
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate every section, reporting all errors at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        self.build.validate(&mut diag);
        self.hydrate.validate(&mut diag);
        self.deps.validate(&mut diag);
        self.serve.validate(&mut diag);
        diag.into_result()
    }

    // ========================================================================
    // derived paths
    // ========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Temporary hydration entry modules.
    pub fn entry_dir(&self) -> PathBuf {
        self.root.join(WORK_DIR).join("entry")
    }

    /// Dependency index under the output directory.
    pub fn deps_file(&self) -> PathBuf {
        self.build.output.join(&self.deps.file)
    }

    /// Root mirror of the dependency index, when enabled.
    pub fn deps_mirror(&self) -> Option<PathBuf> {
        self.deps.mirror.then(|| self.root.join(&self.deps.file))
    }

    pub fn hydrate_settings(&self) -> HydrateSettings {
        HydrateSettings {
            enabled: self.hydrate.enable,
            entry_dir: self.entry_dir(),
            bundle_dir: self.build.output.join(BUNDLE_DIR),
            path_prefix: self.build.path_prefix.to_string_lossy().trim_matches('/').to_string(),
            format: self.hydrate.format.clone(),
            runtime: self.hydrate.runtime.clone(),
            cwd: self.root.clone(),
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text. Panics on unknown fields, to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// A finalized config rooted at `root`, for tests that need real paths.
#[cfg(test)]
pub fn test_site_config(root: &Path) -> SiteConfig {
    let mut config = SiteConfig {
        config_path: root.join("mdxr.toml"),
        ..SiteConfig::default()
    };
    config.root = root.to_path_buf();
    config.normalize_paths();
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn site(toml: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mdxr.toml"), toml).unwrap();
        fs::create_dir_all(dir.path().join("source")).unwrap();
        dir
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(SiteConfig::parse_with_ignored("[build\nsource = 1").is_err());
    }

    #[test]
    fn unknown_fields_detected() {
        let (config, ignored) =
            SiteConfig::parse_with_ignored("[site]\ntitle = \"T\"\n[theme]\ncolor = \"red\"").unwrap();
        assert_eq!(config.site.title, "T");
        assert!(ignored.iter().any(|f| f.contains("theme")));
    }

    #[test]
    fn load_resolves_paths_against_config_dir() {
        let dir = site("[build]\ncomponents = \"ui\"");
        let nested = dir.path().join("source");
        let cli = Cli::parse_from(["mdxr", "build"]);

        let config = SiteConfig::load_in(&cli, &nested).unwrap();
        let root = normalize_path(dir.path());
        assert_eq!(config.root(), root);
        assert_eq!(config.build.source, root.join("source"));
        assert_eq!(config.build.output, root.join("public"));
        assert_eq!(config.build.components, root.join("ui"));
        assert_eq!(config.deps_file(), root.join("public/mdxr-deps.json"));
        assert_eq!(config.deps_mirror(), Some(root.join("mdxr-deps.json")));
        assert_eq!(config.entry_dir(), root.join(".mdxr/entry"));
    }

    #[test]
    fn missing_config_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let cli = Cli::parse_from(["mdxr", "-C", "mdxr-absent.toml", "build"]);
        let err = SiteConfig::load_in(&cli, dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn cli_overrides_file_values() {
        let dir = site("[serve]\nport = 4000\n[hydrate]\nenable = true");
        let cli = Cli::parse_from([
            "mdxr", "serve", "--port", "9000", "--watch", "false", "--hydrate", "false",
        ]);

        let config = SiteConfig::load_in(&cli, dir.path()).unwrap();
        assert_eq!(config.serve.port, 9000);
        assert!(!config.serve.watch);
        assert!(!config.hydrate.enable);
        assert!(!config.hydrate_settings().enabled);
    }

    #[test]
    fn path_prefix_from_site_url() {
        let dir = site("[site]\nurl = \"https://example.github.io/blog/\"");
        let cli = Cli::parse_from(["mdxr", "build"]);

        let config = SiteConfig::load_in(&cli, dir.path()).unwrap();
        assert_eq!(config.build.path_prefix, PathBuf::from("blog"));
        assert_eq!(config.hydrate_settings().path_prefix, "blog");
    }

    #[test]
    fn serve_drops_path_prefix() {
        let dir = site("[build]\npath_prefix = \"blog\"");
        let cli = Cli::parse_from(["mdxr", "serve"]);

        let config = SiteConfig::load_in(&cli, dir.path()).unwrap();
        assert!(config.build.path_prefix.as_os_str().is_empty());
    }

    #[test]
    fn validation_errors_are_collected() {
        let dir = site("[hydrate]\nformat = \"amd\"\n[serve]\ntimeout_secs = 0");
        let cli = Cli::parse_from(["mdxr", "build"]);

        let err = SiteConfig::load_in(&cli, dir.path()).unwrap_err();
        let Some(ConfigError::Invalid(diag)) = err.downcast_ref::<ConfigError>() else {
            panic!("expected diagnostics, got {err}");
        };
        assert_eq!(diag.len(), 2);
    }
}
