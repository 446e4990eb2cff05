//! The `.mdx` renderer registered with the site.

use std::path::Path;
use std::sync::Arc;

use super::Session;
use crate::hydrate::PlaceholderResolver;
use crate::render::frontmatter::{self, PageMeta};
use crate::render::{RenderError, Runtime, evaluate, render_to_static_markup};
use crate::site::{Rendered, Renderer};
use crate::utils::path::normalize_path;

pub struct MdxRenderer {
    session: Arc<Session>,
}

impl MdxRenderer {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

impl Renderer for MdxRenderer {
    /// Front matter → compile → evaluate with placeholders → record → hydrate.
    fn render(&self, path: &Path, source: &str) -> Result<Rendered, RenderError> {
        let path = normalize_path(path);
        let (front, body) = frontmatter::strip(source);
        let meta = front.map(PageMeta::parse).unwrap_or_default();

        let unit = self
            .session
            .compile(&path, body)
            .map_err(|source| RenderError::Compile {
                path: path.clone(),
                source,
            })?;

        let mut resolver = PlaceholderResolver::new(&path);
        let runtime = Runtime::new(unit.options.development);
        let node = evaluate(&unit, &runtime, &mut resolver).map_err(|source| RenderError::Eval {
            path: path.clone(),
            source,
        })?;
        let markup = render_to_static_markup(&node);

        let doc = resolver.document_id().clone();
        let (refs, deps) = resolver.finish();
        self.session.recorder().record(&path, &deps);
        let html = self.session.hydrator().hydrate(&doc, &refs, &markup);

        Ok(Rendered {
            html,
            title: meta.title,
        })
    }
}
