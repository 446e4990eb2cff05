//! Content types for files under the output directory.

use std::path::Path;

pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Extension → content type. Generated pages, hydration bundles and the
/// static assets a site usually ships next to them.
const TABLE: &[(&str, &str)] = &[
    ("html", types::HTML),
    ("htm", types::HTML),
    ("js", types::JAVASCRIPT),
    ("mjs", types::JAVASCRIPT),
    ("css", "text/css; charset=utf-8"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("txt", types::PLAIN),
    ("xml", "application/xml"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("ico", "image/x-icon"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("wasm", "application/wasm"),
];

pub fn from_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return types::OCTET_STREAM;
    };
    TABLE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map_or(types::OCTET_STREAM, |(_, content_type)| content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundles_and_pages() {
        assert_eq!(from_path(Path::new("public/index.html")), types::HTML);
        assert_eq!(from_path(Path::new("public/mdxr/abcd1234.js")), types::JAVASCRIPT);
        assert_eq!(from_path(Path::new("LOGO.PNG")), "image/png");
    }

    #[test]
    fn unknown_is_binary() {
        assert_eq!(from_path(Path::new("data.xyz")), types::OCTET_STREAM);
        assert_eq!(from_path(Path::new("Makefile")), types::OCTET_STREAM);
    }
}
