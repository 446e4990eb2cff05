use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Compute the position of byte `offset` within `source`.
    pub fn at(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Syntactically invalid document source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct CompileError {
    pub message: String,
    pub position: Option<Position>,
}

impl CompileError {
    pub fn new(message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{pos}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Failure while evaluating a compiled unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("{name} is not defined")]
    UndefinedReference { name: String },
    #[error("invalid expression for `{attr}` on <{component}>: {message}")]
    InvalidExpression {
        component: String,
        attr: String,
        message: String,
    },
}

/// Per-document render failure, surfaced to the host pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{}: {source}", path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: CompileError,
    },
    #[error("{}: {source}", path.display())]
    Eval {
        path: PathBuf,
        #[source]
        source: EvalError,
    },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Source position, when the failure carries one.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Compile { source, .. } => source.position,
            _ => None,
        }
    }
}
