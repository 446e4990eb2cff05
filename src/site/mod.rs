//! Host content pipeline: renderer registry, plugins, generate and clean.
//!
//! ```text
//! add_plugin ──install──▶ register_renderer(ext → output ext)
//! init ──▶ after_init hooks
//! generate(None) ──▶ documents() ─par─▶ render ─▶ <output>/<rel>.<output ext>
//! after_generate hooks ──▶ (serve) watcher + rebuild coordinator
//! exit ──▶ on_exit hooks
//! ```

mod layout;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow, bail};
use jwalk::WalkDir;
use parking_lot::RwLock;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::SiteConfig;
use crate::core::is_shutdown;
use crate::logger::ProgressLine;
use crate::rebuild::{Host, HostError};
use crate::render::RenderError;
use crate::utils::path::normalize_path;
use crate::utils::plural_count;
use crate::{debug, log};

pub use layout::page;

/// Output of one document render.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub html: String,
    /// From front matter; the site title is used when absent.
    pub title: Option<String>,
}

/// Turns one source document into HTML.
pub trait Renderer: Send + Sync {
    /// `path` is absolute and normalized.
    fn render(&self, path: &Path, source: &str) -> Result<Rendered, RenderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RendererOptions {
    /// Wrap the output in the page layout.
    pub layout: bool,
}

/// Lifecycle hooks. All but `install` default to no-ops.
pub trait SitePlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Register renderers. Called once from [`Site::add_plugin`].
    fn install(&self, site: &mut Site);

    fn after_init(&self, _site: &Site) {}

    /// After the initial full generate.
    fn after_generate(&self, _site: &Arc<Site>) {}

    /// Process is about to exit.
    fn on_exit(&self) {}
}

struct Registration {
    output_ext: String,
    renderer: Arc<dyn Renderer>,
    options: RendererOptions,
}

/// Result of a generate pass.
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub rendered: usize,
    /// Documents that failed, with their rendered error.
    pub failed: Vec<(PathBuf, String)>,
}

impl GenerateReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn summary(&self) -> String {
        self.failed
            .iter()
            .map(|(_, e)| e.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct Site {
    source: PathBuf,
    output: PathBuf,
    components: PathBuf,
    title: String,
    renderers: FxHashMap<String, Registration>,
    plugins: Vec<Arc<dyn SitePlugin>>,
    /// Cached document listing, dropped by [`Host::invalidate_listing`].
    listing: RwLock<Option<Arc<Vec<PathBuf>>>>,
}

impl Site {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            source: config.build.source.clone(),
            output: config.build.output.clone(),
            components: config.build.components.clone(),
            title: config.site.title.clone(),
            renderers: FxHashMap::default(),
            plugins: Vec::new(),
            listing: RwLock::new(None),
        }
    }

    /// Route documents with extension `ext` to `renderer`.
    pub fn register_renderer(
        &mut self,
        ext: &str,
        output_ext: &str,
        renderer: Arc<dyn Renderer>,
        options: RendererOptions,
    ) {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        debug!("site"; "renderer .{} -> .{}", ext, output_ext);
        self.renderers.insert(
            ext,
            Registration {
                output_ext: output_ext.trim_start_matches('.').to_string(),
                renderer,
                options,
            },
        );
        *self.listing.get_mut() = None;
    }

    pub fn add_plugin(&mut self, plugin: Arc<dyn SitePlugin>) {
        plugin.install(self);
        debug!("site"; "plugin {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn init(&self) {
        for plugin in &self.plugins {
            plugin.after_init(self);
        }
    }

    pub fn after_generate(self: &Arc<Self>) {
        for plugin in &self.plugins {
            plugin.after_generate(self);
        }
    }

    pub fn exit(&self) {
        for plugin in &self.plugins {
            plugin.on_exit();
        }
    }

    fn registration(&self, path: &Path) -> Option<&Registration> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.renderers.get(&ext)
    }

    /// Every renderable document under the source root, sorted.
    ///
    /// The components directory and hidden entries are skipped.
    pub fn documents(&self) -> Arc<Vec<PathBuf>> {
        if let Some(listing) = self.listing.read().as_ref() {
            return Arc::clone(listing);
        }
        let listing = Arc::new(self.scan());
        *self.listing.write() = Some(Arc::clone(&listing));
        listing
    }

    fn scan(&self) -> Vec<PathBuf> {
        if !self.source.is_dir() {
            return Vec::new();
        }
        let components = self.components.clone();
        let output = self.output.clone();
        let mut docs: Vec<PathBuf> = WalkDir::new(&self.source)
            .skip_hidden(true)
            .process_read_dir(move |_, _, _, children| {
                children.retain(|entry| {
                    entry.as_ref().is_ok_and(|e| {
                        let path = e.path();
                        path != components && path != output
                    })
                });
            })
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| normalize_path(&e.path()))
            .filter(|path| self.registration(path).is_some())
            .collect();
        docs.sort();
        docs
    }

    /// `<output>/<path relative to source>.<output ext>`
    pub fn output_path(&self, document: &Path) -> Option<PathBuf> {
        let registration = self.registration(document)?;
        let relative = document.strip_prefix(&self.source).ok()?;
        Some(self.output.join(relative).with_extension(&registration.output_ext))
    }

    /// Render `only`, or every document when `None`.
    pub fn generate(&self, only: Option<&Path>) -> Result<GenerateReport> {
        if let Some(document) = only {
            let document = normalize_path(document);
            if !self.documents().contains(&document) {
                bail!("{} is not a known document", document.display());
            }
            let mut report = GenerateReport::default();
            match self.render_document(&document) {
                Ok(_) => report.rendered = 1,
                Err(e) => report.failed.push((document, format!("{e:#}"))),
            }
            return Ok(report);
        }

        let documents = self.documents();
        fs::create_dir_all(&self.output)
            .with_context(|| format!("failed to create {}", self.output.display()))?;

        let progress = ProgressLine::new("mdx", documents.len());
        let aborted = AtomicBool::new(false);
        let results: Vec<_> = documents
            .par_iter()
            .map(|document| {
                if is_shutdown() {
                    aborted.store(true, Ordering::Relaxed);
                    return (document, Err(anyhow!("aborted")));
                }
                let result = self.render_document(document);
                progress.inc();
                (document, result)
            })
            .collect();
        progress.finish();

        if aborted.load(Ordering::Relaxed) {
            bail!("generate aborted");
        }

        let mut report = GenerateReport::default();
        for (document, result) in results {
            match result {
                Ok(_) => report.rendered += 1,
                Err(e) => {
                    log!("error"; "{:#}", e);
                    report.failed.push((document.clone(), format!("{e:#}")));
                }
            }
        }
        Ok(report)
    }

    fn render_document(&self, document: &Path) -> Result<PathBuf> {
        let registration = self
            .registration(document)
            .ok_or_else(|| anyhow!("no renderer for {}", document.display()))?;
        let output = self
            .output_path(document)
            .ok_or_else(|| anyhow!("{} is outside the source root", document.display()))?;

        let source = fs::read_to_string(document).map_err(|source| RenderError::Io {
            path: document.to_path_buf(),
            source,
        })?;
        let rendered = registration.renderer.render(document, &source)?;
        let html = if registration.options.layout {
            let title = rendered.title.as_deref().unwrap_or(&self.title);
            page(title, &rendered.html)
        } else {
            rendered.html
        };

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&output, html).with_context(|| format!("failed to write {}", output.display()))?;
        debug!("site"; "{} -> {}", document.display(), output.display());
        Ok(output)
    }

    /// Remove the output directory.
    pub fn clean(&self) -> Result<()> {
        match fs::remove_dir_all(&self.output) {
            Ok(()) => {
                debug!("site"; "removed {}", self.output.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.output.display())),
        }
    }
}

impl Host for Site {
    fn supports_targeted_regenerate(&self) -> bool {
        true
    }

    fn regenerate(&self, document: Option<&Path>) -> Result<(), HostError> {
        if let Some(document) = document
            && !self.documents().iter().any(|d| d == document)
        {
            // Deleted or never rendered: only a full pass can account for it
            return Err(HostError::Unsupported);
        }

        let report = self.generate(document).map_err(HostError::failed)?;
        if report.is_success() {
            debug!("site"; "regenerated {}", plural_count(report.rendered, "document"));
            Ok(())
        } else {
            Err(HostError::Failed(report.summary()))
        }
    }

    fn clean(&self) -> Result<(), HostError> {
        Site::clean(self).map_err(HostError::failed)
    }

    fn invalidate_listing(&self) {
        *self.listing.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_site_config;
    use crate::render::{CompileError, Position};
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// Uppercases the source; fails on documents containing `FAIL`.
    #[derive(Default)]
    struct Upper {
        calls: AtomicUsize,
    }

    impl Renderer for Upper {
        fn render(&self, path: &Path, source: &str) -> Result<Rendered, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if source.contains("FAIL") {
                return Err(RenderError::Compile {
                    path: path.to_path_buf(),
                    source: CompileError::new("boom", Some(Position { line: 1, column: 1 })),
                });
            }
            Ok(Rendered {
                html: source.to_uppercase(),
                title: None,
            })
        }
    }

    fn fixture() -> (TempDir, Site, Arc<Upper>) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("source/posts")).unwrap();
        fs::create_dir_all(root.join("source/components")).unwrap();
        fs::create_dir_all(root.join("source/.drafts")).unwrap();
        fs::write(root.join("source/index.mdx"), "home").unwrap();
        fs::write(root.join("source/posts/a.mdx"), "post a").unwrap();
        fs::write(root.join("source/posts/notes.txt"), "not a document").unwrap();
        fs::write(root.join("source/components/Demo.mdx"), "component").unwrap();
        fs::write(root.join("source/.drafts/x.mdx"), "hidden").unwrap();

        let mut config = test_site_config(root);
        config.site.title = "Site".into();
        let mut site = Site::new(&config);
        let renderer = Arc::new(Upper::default());
        site.register_renderer("mdx", "html", renderer.clone(), RendererOptions { layout: true });
        (dir, site, renderer)
    }

    #[test]
    fn documents_skip_components_hidden_and_unregistered() {
        let (dir, site, _) = fixture();
        let source = normalize_path(&dir.path().join("source"));
        let docs = site.documents();
        assert_eq!(
            docs.as_slice(),
            [source.join("index.mdx"), source.join("posts/a.mdx")]
        );
    }

    #[test]
    fn generate_all_writes_layout_pages() {
        let (dir, site, renderer) = fixture();
        let report = site.generate(None).unwrap();
        assert_eq!(report.rendered, 2);
        assert!(report.is_success());
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);

        let out = fs::read_to_string(dir.path().join("public/posts/a.html")).unwrap();
        assert!(out.contains("<title>Site</title>"));
        assert!(out.contains("POST A"));
    }

    #[test]
    fn generate_one_document() {
        let (dir, site, renderer) = fixture();
        let doc = dir.path().join("source/posts/a.mdx");
        let report = site.generate(Some(&doc)).unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert!(!dir.path().join("public/index.html").exists());
    }

    #[test]
    fn failures_are_reported_per_document() {
        let (dir, site, _) = fixture();
        fs::write(dir.path().join("source/posts/bad.mdx"), "FAIL").unwrap();
        site.invalidate_listing();

        let report = site.generate(None).unwrap();
        assert_eq!(report.rendered, 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("1:1: boom"));
    }

    #[test]
    fn listing_is_cached_until_invalidated() {
        let (dir, site, _) = fixture();
        assert_eq!(site.documents().len(), 2);
        fs::write(dir.path().join("source/new.mdx"), "new").unwrap();
        assert_eq!(site.documents().len(), 2);
        site.invalidate_listing();
        assert_eq!(site.documents().len(), 3);
    }

    #[test]
    fn host_targeted_regenerate_of_unknown_document_is_unsupported() {
        let (dir, site, _) = fixture();
        let gone = normalize_path(&dir.path().join("source/deleted.mdx"));
        assert!(site.supports_targeted_regenerate());
        assert!(matches!(
            Host::regenerate(&site, Some(gone.as_path())),
            Err(HostError::Unsupported)
        ));
    }

    #[test]
    fn host_clean_then_full_regenerate() {
        let (dir, site, _) = fixture();
        site.generate(None).unwrap();
        Host::clean(&site).unwrap();
        assert!(!dir.path().join("public").exists());

        Host::regenerate(&site, None).unwrap();
        assert!(dir.path().join("public/index.html").exists());
    }
}
