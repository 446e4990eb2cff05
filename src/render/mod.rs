//! MDX rendering: front matter, compilation, evaluation and static markup.
//!
//! ```text
//! source ──strip──▶ body ──compile──▶ CompiledUnit ──evaluate(resolver)──▶ Node ──▶ HTML
//! ```

pub mod compile;
pub mod error;
pub mod eval;
pub mod frontmatter;
pub mod jsx;
pub mod runtime;

pub use compile::{CompileOptions, CompiledUnit, ContentCompiler, MdxCompiler};
pub use error::{CompileError, EvalError, Position, RenderError};
pub use eval::{ImportResolver, ModuleRef, evaluate};
pub use frontmatter::PageMeta;
pub use runtime::{Runtime, render_to_static_markup};
