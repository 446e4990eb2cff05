//! Hydration Bundle Builder.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::bundler::{BundleRequest, Bundler};
use super::entry::{self, ROOT_ATTR};
use super::id::DocumentId;
use super::resolver::ComponentRef;
use crate::{debug, log};

/// Output subdirectory (under the site output) and URL segment for bundles.
pub const BUNDLE_DIR: &str = "mdxr";

/// Where entries and bundles go and how they are referenced.
#[derive(Debug, Clone)]
pub struct HydrateSettings {
    pub enabled: bool,
    /// Temporary entry modules, deleted wholesale before a rebuild.
    pub entry_dir: PathBuf,
    /// `<output>/mdxr`
    pub bundle_dir: PathBuf,
    /// URL prefix without surrounding slashes (`""` or `blog`).
    pub path_prefix: String,
    pub format: String,
    pub runtime: String,
    /// Bundler working directory (project root).
    pub cwd: PathBuf,
}

impl HydrateSettings {
    pub fn script_url(&self, doc: &DocumentId) -> String {
        if self.path_prefix.is_empty() {
            format!("/{BUNDLE_DIR}/{doc}.js")
        } else {
            format!("/{}/{BUNDLE_DIR}/{doc}.js", self.path_prefix)
        }
    }

    pub fn entry_path(&self, doc: &DocumentId) -> PathBuf {
        self.entry_dir.join(format!("{doc}.jsx"))
    }

    pub fn bundle_path(&self, doc: &DocumentId) -> PathBuf {
        self.bundle_dir.join(format!("{doc}.js"))
    }
}

/// Emits hydration bundles and wraps server markup.
///
/// Remembers the last references per document so affected documents can
/// be re-bundled after a rebuild without re-rendering them.
pub struct HydrationBuilder {
    settings: HydrateSettings,
    bundler: Arc<dyn Bundler>,
    refs: Mutex<FxHashMap<DocumentId, Vec<ComponentRef>>>,
}

impl HydrationBuilder {
    pub fn new(settings: HydrateSettings, bundler: Arc<dyn Bundler>) -> Self {
        Self {
            settings,
            bundler,
            refs: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn settings(&self) -> &HydrateSettings {
        &self.settings
    }

    /// Return the HTML to emit for one render.
    ///
    /// Without references the bundler is never invoked. Any failure logs and
    /// returns `markup` unchanged.
    pub fn hydrate(&self, doc: &DocumentId, refs: &[ComponentRef], markup: &str) -> String {
        if refs.is_empty() || !self.settings.enabled {
            return markup.to_string();
        }
        self.refs.lock().insert(doc.clone(), refs.to_vec());

        match self.bundle(doc, refs) {
            Ok(()) => wrap(doc, markup, &self.settings.script_url(doc)),
            Err(e) => {
                log!("hydrate"; "skipping {doc}: {e:#}");
                markup.to_string()
            }
        }
    }

    /// Re-bundle documents from their remembered references.
    ///
    /// Returns the number of bundles written.
    pub fn rebundle(&self, docs: &[DocumentId]) -> usize {
        if !self.settings.enabled {
            return 0;
        }
        let jobs: Vec<_> = {
            let refs = self.refs.lock();
            docs.iter()
                .filter_map(|doc| refs.get(doc).map(|r| (doc.clone(), r.clone())))
                .collect()
        };

        let mut written = 0;
        for (doc, refs) in jobs {
            match self.bundle(&doc, &refs) {
                Ok(()) => written += 1,
                Err(e) => log!("hydrate"; "rebundle {doc}: {e:#}"),
            }
        }
        written
    }

    /// Delete the entry directory and everything in it.
    pub fn clear_entries(&self) {
        let dir = &self.settings.entry_dir;
        match fs::remove_dir_all(dir) {
            Ok(()) => debug!("hydrate"; "cleared {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log!("hydrate"; "failed to clear {}: {e}", dir.display()),
        }
    }

    fn bundle(&self, doc: &DocumentId, refs: &[ComponentRef]) -> Result<()> {
        let s = &self.settings;
        let entry_path = s.entry_path(doc);
        let output = s.bundle_path(doc);

        let source = entry::generate(doc, refs, &s.entry_dir, &s.runtime);
        write_file(&entry_path, &source)?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        self.bundler.build(&BundleRequest {
            entry: &entry_path,
            output: &output,
            format: &s.format,
            cwd: &s.cwd,
        })?;
        debug!("hydrate"; "bundled {} component(s) -> {}", refs.len(), output.display());
        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Wrap markup in the document root container and append the script.
fn wrap(doc: &DocumentId, markup: &str, script_url: &str) -> String {
    format!(
        "<div id=\"mdx-root-{doc}\" {ROOT_ATTR}=\"{doc}\">{markup}</div>\n\
         <script src=\"{script_url}\" defer></script>"
    )
}
