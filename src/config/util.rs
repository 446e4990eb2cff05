//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Path component of a URL without surrounding slashes.
///
/// ```ignore
/// extract_url_path("https://example.github.io/blog/") -> Some("blog")
/// extract_url_path("https://example.com")             -> Some("")
/// extract_url_path("not a url")                       -> None
/// ```
pub fn extract_url_path(url_str: &str) -> Option<String> {
    let parsed = url::Url::parse(url_str).ok()?;
    Some(parsed.path().trim_matches('/').to_string())
}

/// Find `config_name` in `start` or the nearest ancestor holding it.
///
/// ```text
/// /home/user/site/source/posts/  ← start
/// /home/user/site/mdxr.toml      ← found
/// ```
pub fn find_config_file(config_name: &Path, start: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    start
        .ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.is_file())
}
