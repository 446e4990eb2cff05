//! `clean` command: remove generated output and hydration entries.
//!
//! The dependency index mirror at the project root is kept, so the next
//! `serve` can still run targeted rebuilds.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::SiteConfig;
use crate::log;

pub fn clean_site(config: &SiteConfig) -> Result<()> {
    let mut removed = false;
    for dir in [config.build.output.clone(), config.entry_dir()] {
        if remove_dir(&dir)? {
            log!("clean"; "removed {}", dir.display());
            removed = true;
        }
    }
    if !removed {
        log!("clean"; "nothing to clean");
    }
    Ok(())
}

/// Returns whether anything was removed.
fn remove_dir(dir: &Path) -> Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", dir.display())),
    }
}
