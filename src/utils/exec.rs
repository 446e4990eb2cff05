//! Running external tools (the hydration bundler).
//!
//! ```ignore
//! Cmd::from_slice(&["npx", "esbuild"])
//!     .arg(entry)
//!     .arg("--bundle")
//!     .cwd(root)
//!     .quiet(BUNDLER_NOISE)
//!     .run()?;
//! ```
//!
//! A non-zero exit is an error carrying the tool's stderr. On success the
//! remaining stderr lines are logged as the tool's warnings.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::log;

/// esbuild prints timing lines to stderr even when nothing went wrong.
pub const BUNDLER_NOISE: &[&str] = &["⚡ Done in"];

pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    noise: &'static [&'static str],
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            cwd: None,
            noise: &[],
        }
    }

    /// First element is the program, the rest are leading arguments.
    pub fn from_slice<S: AsRef<OsStr>>(argv: &[S]) -> Self {
        let (program, rest) = match argv.split_first() {
            Some((program, rest)) => (program.as_ref(), rest),
            None => (OsStr::new(""), &[][..]),
        };
        let mut cmd = Self::new(program);
        cmd.args.extend(rest.iter().map(|a| a.as_ref().to_owned()));
        cmd
    }

    /// Empty arguments are dropped.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Stderr lines starting with any of `prefixes` are never logged.
    pub fn quiet(mut self, prefixes: &'static [&'static str]) -> Self {
        self.noise = prefixes;
        self
    }

    pub fn run(self) -> Result<Output> {
        let name = self.program.to_string_lossy().into_owned();
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .with_context(|| format!("failed to execute `{name}`"))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let messages = self.messages(&stderr);

        if !output.status.success() {
            let mut msg = format!("`{name}` failed with {}", output.status);
            if !messages.is_empty() {
                msg.push('\n');
                msg.push_str(&messages.join("\n"));
            }
            bail!(msg);
        }

        if !messages.is_empty() {
            log!(&name; "{}", messages.join("\n"));
        }
        Ok(output)
    }

    /// Stderr lines worth showing, without colors.
    fn messages(&self, stderr: &str) -> Vec<String> {
        stderr
            .lines()
            .map(strip_ansi)
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty() && !self.noise.iter().any(|p| line.starts_with(p)))
            .collect()
    }
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    static ANSI: OnceLock<Option<Regex>> = OnceLock::new();
    match ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").ok()) {
        Some(re) => re.replace_all(s, ""),
        None => Cow::Borrowed(s),
    }
}
