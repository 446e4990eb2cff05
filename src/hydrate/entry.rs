//! Hydration entry generation.
//!
//! One entry module per document: imports every referenced component,
//! maps placeholder ids to modules and mounts each placeholder in place.

use std::fmt::Write as _;
use std::path::Path;

use super::id::DocumentId;
use super::resolver::ComponentRef;
use crate::render::runtime::{COMPONENT_ATTR, EXPORT_ATTR, PROPS_ATTR};
use crate::utils::path::{relative_to, to_slash};

/// Attribute on the wrapper element carrying the document hash.
pub const ROOT_ATTR: &str = "data-mdx-root";

/// Import path for `reference` as seen from `entry_dir`.
///
/// Resolved paths become `./`-prefixed forward-slash relative paths;
/// unresolved specifiers are passed through for the bundler to resolve.
pub fn import_path(reference: &ComponentRef, entry_dir: &Path) -> String {
    let Some(resolved) = &reference.resolved else {
        return reference.specifier.clone();
    };
    let rel = to_slash(&relative_to(resolved, entry_dir));
    if rel.starts_with("./") || rel.starts_with("../") {
        rel
    } else {
        format!("./{rel}")
    }
}

/// Generate entry source text.
///
/// `runtime` is the UI library package (`react`); its `-dom/client`
/// companion provides `createRoot`.
pub fn generate(doc: &DocumentId, refs: &[ComponentRef], entry_dir: &Path, runtime: &str) -> String {
    let mut out = String::new();
    let quote = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"));

    let _ = writeln!(out, "// Hydration entry for document {doc}");
    let _ = writeln!(out, "import {{ createElement }} from {};", quote(runtime));
    let _ = writeln!(
        out,
        "import {{ createRoot }} from {};",
        quote(&format!("{runtime}-dom/client"))
    );
    for (i, reference) in refs.iter().enumerate() {
        let _ = writeln!(
            out,
            "import * as C{i} from {};",
            quote(&import_path(reference, entry_dir))
        );
    }

    out.push_str("\nconst modules = {\n");
    for (i, reference) in refs.iter().enumerate() {
        let _ = writeln!(out, "  {}: C{i},", quote(&reference.id));
    }
    out.push_str("};\n\n");

    let selector = format!("[{ROOT_ATTR}=\"{doc}\"] [{COMPONENT_ATTR}]");
    let _ = write!(
        out,
        r#"for (const node of document.querySelectorAll({selector})) {{
  if (node.parentElement && node.parentElement.closest("[{COMPONENT_ATTR}]")) continue;
  const mod = modules[node.getAttribute("{COMPONENT_ATTR}")];
  if (!mod) continue;
  const Component = mod[node.getAttribute("{EXPORT_ATTR}") || "default"];
  if (!Component) continue;
  const props = JSON.parse(node.getAttribute("{PROPS_ATTR}") || "{{}}");
  const html = node.innerHTML;
  if (html) {{
    props.children = createElement("div", {{
      style: {{ display: "contents" }},
      dangerouslySetInnerHTML: {{ __html: html }},
    }});
  }}
  createRoot(node).render(createElement(Component, props));
}}
"#,
        selector = quote(&selector),
    );
    out
}
