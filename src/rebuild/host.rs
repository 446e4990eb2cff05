//! Contract between the rebuild coordinator and the content pipeline.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    /// The host cannot regenerate a single document.
    #[error("targeted regenerate is not supported")]
    Unsupported,
    #[error("{0}")]
    Failed(String),
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

impl HostError {
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}

/// The static-site generator as seen from the coordinator.
///
/// Calls block; the coordinator runs them off the async runtime.
pub trait Host: Send + Sync + 'static {
    /// Capability check, asked before any targeted regenerate.
    fn supports_targeted_regenerate(&self) -> bool;

    /// Regenerate one document, or every document with `None`.
    ///
    /// A host that cannot honor `Some(doc)` must return
    /// [`HostError::Unsupported`] rather than do nothing.
    fn regenerate(&self, document: Option<&Path>) -> Result<(), HostError>;

    /// Remove previously generated output.
    fn clean(&self) -> Result<(), HostError>;

    /// Drop any cached listing of the content graph.
    fn invalidate_listing(&self);
}
