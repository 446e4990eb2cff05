//! Element construction and static markup rendering.
//!
//! Components never render on the server. Each call site becomes a
//! placeholder element carrying the module id, export name and JSON props,
//! which the hydration glue later mounts the real component into.

use serde_json::{Map, Value};

use super::error::Position;
use crate::utils::html::escape_attr;

/// Attribute holding the placeholder module id.
pub const COMPONENT_ATTR: &str = "data-mdx-component";
pub const EXPORT_ATTR: &str = "data-mdx-export";
pub const PROPS_ATTR: &str = "data-mdx-props";
pub const SOURCE_ATTR: &str = "data-mdx-source";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Pre-rendered HTML, emitted verbatim.
    Markup(String),
    Placeholder(Placeholder),
    Fragment(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub id: String,
    pub export: String,
    pub props: Map<String, Value>,
    pub source: Option<Position>,
    pub children: Option<Box<Node>>,
}

/// Element-construction primitives injected into evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runtime {
    development: bool,
}

impl Runtime {
    pub fn new(development: bool) -> Self {
        Self { development }
    }

    pub fn markup(&self, html: impl Into<String>) -> Node {
        Node::Markup(html.into())
    }

    pub fn fragment(&self, nodes: Vec<Node>) -> Node {
        Node::Fragment(nodes)
    }

    /// Build the stand-in element for one component call.
    pub fn placeholder(
        &self,
        id: &str,
        export: &str,
        props: Map<String, Value>,
        position: Position,
        children: Option<Node>,
    ) -> Node {
        Node::Placeholder(Placeholder {
            id: id.to_string(),
            export: export.to_string(),
            props,
            source: self.development.then_some(position),
            children: children.map(Box::new),
        })
    }
}

/// Serialize a node tree to HTML.
pub fn render_to_static_markup(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Markup(html) => out.push_str(html),
        Node::Fragment(nodes) => nodes.iter().for_each(|n| write_node(out, n)),
        Node::Placeholder(p) => {
            let props = Value::Object(p.props.clone()).to_string();
            out.push_str(&format!(
                r#"<div {COMPONENT_ATTR}="{}" {EXPORT_ATTR}="{}" {PROPS_ATTR}="{}""#,
                escape_attr(&p.id),
                escape_attr(&p.export),
                escape_attr(&props),
            ));
            if let Some(pos) = p.source {
                out.push_str(&format!(r#" {SOURCE_ATTR}="{pos}""#));
            }
            out.push('>');
            if let Some(children) = &p.children {
                write_node(out, children);
            }
            out.push_str("</div>");
        }
    }
}
