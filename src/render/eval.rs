//! Evaluation of a compiled unit.
//!
//! Imports only ever reach the injected [`ImportResolver`]; there is no
//! other way for a compiled unit to load a module. The resolver hands back
//! an opaque [`ModuleRef`] that component calls render as placeholders.

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use super::compile::{CompiledUnit, Fragment, Segment};
use super::error::EvalError;
use super::jsx::PropValue;
use super::runtime::{Node, Runtime};

/// Placeholder module returned in place of a real import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    /// Unique within one render.
    pub id: String,
}

/// Import interception capability.
///
/// Called once per import statement, in source order. Must not fail:
/// unresolvable specifiers still yield a usable placeholder.
pub trait ImportResolver {
    fn import(&mut self, specifier: &str) -> ModuleRef;
}

/// Local name → (module, export name).
type Scope = FxHashMap<String, (ModuleRef, String)>;

/// Evaluate `unit` into a node tree.
pub fn evaluate(
    unit: &CompiledUnit,
    runtime: &Runtime,
    resolver: &mut dyn ImportResolver,
) -> Result<Node, EvalError> {
    let mut scope = Scope::default();
    for import in &unit.imports {
        let module = resolver.import(&import.specifier);
        for binding in &import.bindings {
            scope.insert(
                binding.local.clone(),
                (module.clone(), binding.export.clone()),
            );
        }
    }
    eval_fragment(&unit.body, runtime, &scope)
}

fn eval_fragment(fragment: &Fragment, runtime: &Runtime, scope: &Scope) -> Result<Node, EvalError> {
    let mut nodes = Vec::with_capacity(fragment.segments.len());
    for segment in &fragment.segments {
        match segment {
            Segment::Markup(html) => nodes.push(runtime.markup(html.as_str())),
            Segment::Slot(index) => {
                let Some(call) = fragment.components.get(*index) else {
                    continue;
                };
                let (module, export) = lookup(scope, &call.name)?;

                let mut props = Map::new();
                for prop in &call.props {
                    let value = match &prop.value {
                        PropValue::Str(s) => Value::String(s.clone()),
                        PropValue::Bool => Value::Bool(true),
                        PropValue::Expr(expr) => {
                            serde_json::from_str(expr).map_err(|e| EvalError::InvalidExpression {
                                component: call.name.clone(),
                                attr: prop.name.clone(),
                                message: e.to_string(),
                            })?
                        }
                    };
                    props.insert(prop.name.clone(), value);
                }

                let children = match &call.children {
                    Some(f) => Some(eval_fragment(f, runtime, scope)?),
                    None => None,
                };
                nodes.push(runtime.placeholder(&module.id, &export, props, call.position, children));
            }
        }
    }
    Ok(runtime.fragment(nodes))
}

/// Resolve `Name` or `Namespace.Member` against the import scope.
fn lookup(scope: &Scope, name: &str) -> Result<(ModuleRef, String), EvalError> {
    let undefined = || EvalError::UndefinedReference {
        name: name.to_string(),
    };
    match name.split_once('.') {
        Some((ns, member)) => {
            let (module, export) = scope.get(ns).ok_or_else(undefined)?;
            if export == "*" {
                Ok((module.clone(), member.to_string()))
            } else {
                // Member access on a single export: mount the export itself
                Ok((module.clone(), export.clone()))
            }
        }
        None => scope.get(name).cloned().ok_or_else(undefined),
    }
}
