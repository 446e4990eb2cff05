//! External bundler invocation.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

use crate::utils::exec::{BUNDLER_NOISE, Cmd};

/// One bundling request. Output is always non-minified browser code.
#[derive(Debug, Clone)]
pub struct BundleRequest<'a> {
    pub entry: &'a Path,
    pub output: &'a Path,
    /// `iife` or `esm`.
    pub format: &'a str,
    /// Working directory, so bare imports resolve from the project's node_modules.
    pub cwd: &'a Path,
}

/// Bundler boundary. Implementations block until the bundle is written.
pub trait Bundler: Send + Sync {
    fn build(&self, request: &BundleRequest<'_>) -> Result<()>;
}

/// esbuild (or any CLI with compatible flags).
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    command: Vec<String>,
}

impl EsbuildBundler {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Whether the configured program can be found on `PATH`.
    pub fn is_available(&self) -> bool {
        self.command
            .first()
            .is_some_and(|program| which::which(program).is_ok())
    }

    fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }
}

impl Bundler for EsbuildBundler {
    fn build(&self, request: &BundleRequest<'_>) -> Result<()> {
        let Some(program) = self.program() else {
            bail!("no bundler command configured");
        };
        if !self.is_available() {
            bail!("bundler `{program}` not found in PATH");
        }

        Cmd::from_slice(&self.command)
            .arg(request.entry)
            .arg("--bundle")
            .arg("--platform=browser")
            .arg(format!("--format={}", request.format))
            .arg(with_prefix("--outfile=", request.output))
            .arg("--log-level=warning")
            .cwd(request.cwd)
            .quiet(BUNDLER_NOISE)
            .run()?;
        Ok(())
    }
}

fn with_prefix(prefix: &str, path: &Path) -> PathBuf {
    let mut s = std::ffi::OsString::from(prefix);
    s.push(path.as_os_str());
    PathBuf::from(s)
}
