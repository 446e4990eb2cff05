//! Reverse dependency index: component file → documents that import it.

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

pub type PathSet = FxHashSet<PathBuf>;
type PathSetMap = FxHashMap<PathBuf, PathSet>;

/// Reverse map from component path to the set of documents using it.
///
/// # Invariants
/// - Keys and members are absolute, normalized paths (callers normalize;
///   the index itself never touches the filesystem)
/// - A document appears at most once per component (set semantics)
/// - No component maps to an empty set
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyIndex {
    reverse: PathSetMap,
}

impl DependencyIndex {
    /// Create an empty index.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `document` imports every path in `components`.
    ///
    /// Merges into existing entries; never removes associations.
    /// Returns `true` if any new (component, document) pair was added.
    pub fn record<'a, I>(&mut self, document: &Path, components: I) -> bool
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        let mut changed = false;
        for component in components {
            if component.as_path() == document {
                continue;
            }
            changed |= self
                .reverse
                .entry(component.clone())
                .or_default()
                .insert(document.to_path_buf());
        }
        changed
    }

    /// Documents that import exactly `component`.
    #[inline]
    pub fn used_by(&self, component: &Path) -> Option<&PathSet> {
        self.reverse.get(component)
    }

    /// Documents affected by a change at `changed`.
    ///
    /// A component entry matches when `changed` equals it, lies beneath it,
    /// or contains it (a directory event covers every component inside).
    /// Matching is component-wise, so `Button` never matches `ButtonGroup`.
    pub fn affected_by(&self, changed: &Path) -> PathSet {
        let mut affected = PathSet::default();
        for (component, documents) in &self.reverse {
            if changed.starts_with(component) || component.starts_with(changed) {
                affected.extend(documents.iter().cloned());
            }
        }
        affected
    }

    /// Union another index into this one.
    pub fn merge(&mut self, other: DependencyIndex) {
        for (component, documents) in other.reverse {
            self.reverse.entry(component).or_default().extend(documents);
        }
    }

    /// Iterate over (component, documents) entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &PathSet)> {
        self.reverse.iter()
    }

    /// Insert a full entry, used when deserializing.
    pub(super) fn insert_entry(&mut self, component: PathBuf, documents: PathSet) {
        if !documents.is_empty() {
            self.reverse.entry(component).or_default().extend(documents);
        }
    }

    /// Number of tracked components.
    #[inline]
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn new_index_is_empty() {
        let index = DependencyIndex::new();
        assert!(index.is_empty());
        assert!(index.used_by(&path("/any.jsx")).is_none());
    }

    #[test]
    fn basic_recording() {
        let mut index = DependencyIndex::new();
        let post = path("/site/source/post.mdx");
        let button = path("/site/source/components/Button.jsx");

        assert!(index.record(&post, [&button]));
        assert!(index.used_by(&button).unwrap().contains(&post));
    }

    #[test]
    fn recording_twice_is_noop() {
        let mut index = DependencyIndex::new();
        let post = path("/site/post.mdx");
        let button = path("/site/components/Button.jsx");

        assert!(index.record(&post, [&button]));
        let before = index.clone();
        assert!(!index.record(&post, [&button]));
        assert_eq!(index, before);
        assert_eq!(index.used_by(&button).unwrap().len(), 1);
    }

    #[test]
    fn record_merges_instead_of_replacing() {
        let mut index = DependencyIndex::new();
        let post = path("/site/post.mdx");
        let old = path("/site/components/Old.jsx");
        let new = path("/site/components/New.jsx");

        index.record(&post, [&old]);
        index.record(&post, [&new]);

        assert!(index.used_by(&old).unwrap().contains(&post));
        assert!(index.used_by(&new).unwrap().contains(&post));
    }

    #[test]
    fn self_reference_excluded() {
        let mut index = DependencyIndex::new();
        let post = path("/site/post.mdx");
        assert!(!index.record(&post, [&post]));
        assert!(index.is_empty());
    }

    #[test]
    fn multiple_documents_share_component() {
        let mut index = DependencyIndex::new();
        let a = path("/site/a.mdx");
        let b = path("/site/b.mdx");
        let shared = path("/site/components/Shared.jsx");

        index.record(&a, [&shared]);
        index.record(&b, [&shared]);

        let users = index.used_by(&shared).unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.contains(&a) && users.contains(&b));
    }

    #[test]
    fn affected_exact_match() {
        let mut index = DependencyIndex::new();
        let post = path("/site/post.mdx");
        let button = path("/site/components/Button.jsx");
        index.record(&post, [&button]);

        let affected = index.affected_by(&button);
        assert_eq!(affected.len(), 1);
        assert!(affected.contains(&post));
    }

    #[test]
    fn affected_descendant_of_component_dir() {
        let mut index = DependencyIndex::new();
        let post = path("/site/post.mdx");
        // Directory import resolved to a folder
        let widget_dir = path("/site/components/Widget");
        index.record(&post, [&widget_dir]);

        let affected = index.affected_by(&path("/site/components/Widget/style.css"));
        assert!(affected.contains(&post));
    }

    #[test]
    fn affected_ancestor_directory_event() {
        let mut index = DependencyIndex::new();
        let a = path("/site/a.mdx");
        let b = path("/site/b.mdx");
        let c = path("/site/c.mdx");
        index.record(&a, [&path("/site/components/Button.jsx")]);
        index.record(&b, [&path("/site/components/forms/Input.jsx")]);
        index.record(&c, [&path("/site/other/Chart.jsx")]);

        let affected = index.affected_by(&path("/site/components"));
        assert_eq!(affected.len(), 2);
        assert!(affected.contains(&a) && affected.contains(&b));
        assert!(!affected.contains(&c));
    }

    #[test]
    fn affected_is_component_wise() {
        let mut index = DependencyIndex::new();
        let post = path("/site/post.mdx");
        index.record(&post, [&path("/site/components/Button")]);

        assert!(index.affected_by(&path("/site/components/ButtonGroup")).is_empty());
    }

    #[test]
    fn affected_unknown_path_is_empty() {
        let mut index = DependencyIndex::new();
        index.record(&path("/site/post.mdx"), [&path("/site/components/Button.jsx")]);

        assert!(index.affected_by(&path("/site/components/Brand.jsx")).is_empty());
    }

    #[test]
    fn affected_unions_all_matches() {
        let mut index = DependencyIndex::new();
        let a = path("/site/a.mdx");
        let b = path("/site/b.mdx");
        let dir = path("/site/components/Card");
        let file = path("/site/components/Card/index.jsx");
        index.record(&a, [&dir]);
        index.record(&b, [&file]);

        let affected = index.affected_by(&file);
        assert_eq!(affected.len(), 2);
    }

    #[test]
    fn merge_unions_sets() {
        let mut left = DependencyIndex::new();
        let mut right = DependencyIndex::new();
        let button = path("/c/Button.jsx");
        left.record(&path("/a.mdx"), [&button]);
        right.record(&path("/b.mdx"), [&button]);
        right.record(&path("/b.mdx"), [&path("/c/Tabs.jsx")]);

        left.merge(right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.used_by(&button).unwrap().len(), 2);
    }
}
