//! Placeholder Resolver: the import capability handed to evaluation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use url::Url;

use super::id::DocumentId;
use crate::deps::PathSet;
use crate::render::{ImportResolver, ModuleRef};
use crate::utils::path::normalize_path;

/// Extensions tried, in order, for extensionless specifiers.
const EXTENSIONS: [&str; 4] = ["jsx", "tsx", "js", "ts"];

/// One import seen during one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRef {
    /// Placeholder id, `<document-hash>-<seq>`.
    pub id: String,
    pub specifier: String,
    /// Filesystem path when the specifier is relative or `file:`.
    pub resolved: Option<PathBuf>,
}

/// Per-render resolver. Create one for each render of a document.
#[derive(Debug)]
pub struct PlaceholderResolver {
    document: PathBuf,
    doc_id: DocumentId,
    refs: Vec<ComponentRef>,
    deps: PathSet,
}

impl PlaceholderResolver {
    /// `document` must already be absolute and normalized.
    pub fn new(document: &Path) -> Self {
        Self {
            document: document.to_path_buf(),
            doc_id: DocumentId::from_path(document),
            refs: Vec::new(),
            deps: PathSet::default(),
        }
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.doc_id
    }

    /// References in import order, plus the resolved dependency set.
    pub fn finish(self) -> (Vec<ComponentRef>, PathSet) {
        (self.refs, self.deps)
    }
}

impl ImportResolver for PlaceholderResolver {
    fn import(&mut self, specifier: &str) -> ModuleRef {
        let id = self.doc_id.placeholder(self.refs.len());
        let resolved = resolve_specifier(specifier, &self.document);
        if let Some(path) = &resolved {
            self.deps.insert(path.clone());
        }
        self.refs.push(ComponentRef {
            id: id.clone(),
            specifier: specifier.to_string(),
            resolved,
        });
        ModuleRef { id }
    }
}

/// Map a specifier to an absolute path, or `None` for bare module names.
///
/// Existing files win; otherwise extensions and `index.*` are probed. When
/// nothing exists yet the lexical candidate is returned, so a component
/// created later still maps back to its importers.
pub fn resolve_specifier(specifier: &str, document: &Path) -> Option<PathBuf> {
    let candidate = if specifier.starts_with("file:") {
        Url::parse(specifier).ok()?.to_file_path().ok()?
    } else if is_relative(specifier) {
        document.parent()?.join(specifier)
    } else {
        return None;
    };
    Some(normalize_path(&probe(&candidate).unwrap_or(candidate)))
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

fn probe(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    for ext in EXTENSIONS {
        let mut with_ext = OsString::from(candidate.as_os_str());
        with_ext.push(".");
        with_ext.push(ext);
        let path = PathBuf::from(with_ext);
        if path.is_file() {
            return Some(path);
        }
    }
    if candidate.is_dir() {
        return EXTENSIONS
            .iter()
            .map(|ext| candidate.join(format!("index.{ext}")))
            .find(|p| p.is_file());
    }
    None
}
