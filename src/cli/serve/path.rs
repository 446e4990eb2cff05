//! URL to filesystem path resolution.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Resolve a request URL to a file under `serve_root`.
///
/// Directories resolve to their `index.html`, and `/posts/a` falls back to
/// `posts/a.html`. Anything escaping `serve_root` is rejected.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let root = serve_root.canonicalize().ok()?;
    let local = root.join(&clean);

    candidates(&local)
        .into_iter()
        .filter_map(|candidate| candidate.canonicalize().ok())
        .find(|canonical| canonical.starts_with(&root) && canonical.is_file())
}

fn candidates(local: &Path) -> [PathBuf; 3] {
    [
        local.to_path_buf(),
        local.join("index.html"),
        local.with_extension("html"),
    ]
}

/// Decode, strip the query string and fragment, trim slashes.
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}
