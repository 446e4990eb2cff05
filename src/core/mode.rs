//! How the process was invoked.

/// Gates long-lived resources: only `Server` starts the file watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One-shot `build`: generate and exit.
    #[default]
    Generate,
    /// `serve`: generate, then watch and rebuild until Ctrl+C.
    Server,
}

impl ExecutionMode {
    #[inline]
    pub const fn is_server(self) -> bool {
        matches!(self, Self::Server)
    }

    /// Development diagnostics (source positions on placeholders).
    #[inline]
    pub const fn is_development(self) -> bool {
        self.is_server()
    }
}
