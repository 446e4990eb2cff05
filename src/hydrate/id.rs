//! Stable document identity.

use std::fmt;
use std::path::Path;

/// Hex characters kept from the path hash.
const ID_LEN: usize = 8;

/// Short hash of a document's absolute path.
///
/// Content-independent and deterministic across processes, so bundle
/// names stay stable while the document is edited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn from_path(path: &Path) -> Self {
        let digest = blake3::hash(path.to_string_lossy().as_bytes());
        let mut hex = hex::encode(digest.as_bytes());
        hex.truncate(ID_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Placeholder id for the `seq`-th import of this document.
    pub fn placeholder(&self, seq: usize) -> String {
        format!("{}-{seq}", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = DocumentId::from_path(Path::new("/site/source/post.mdx"));
        let b = DocumentId::from_path(Path::new("/site/source/post.mdx"));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), ID_LEN);
    }

    #[test]
    fn fixed_across_runs() {
        // blake3("/site/post.mdx"), first 8 hex chars
        let expected = hex::encode(blake3::hash(b"/site/post.mdx").as_bytes());
        let id = DocumentId::from_path(Path::new("/site/post.mdx"));
        assert_eq!(id.as_str(), &expected[..ID_LEN]);
    }

    #[test]
    fn distinct_paths_differ() {
        let a = DocumentId::from_path(Path::new("/site/a.mdx"));
        let b = DocumentId::from_path(Path::new("/site/b.mdx"));
        assert_ne!(a, b);
    }

    #[test]
    fn placeholder_format() {
        let id = DocumentId::from_path(Path::new("/x.mdx"));
        assert_eq!(id.placeholder(3), format!("{id}-3"));
    }
}
