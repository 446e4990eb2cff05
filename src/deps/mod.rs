//! Component dependency tracking.
//!
//! - [`index`] - reverse map component → documents
//! - [`store`] - JSON persistence with project-root mirror
//! - [`recorder`] - concurrent recording and persistence

pub mod index;
pub mod recorder;
pub mod store;

pub use index::{DependencyIndex, PathSet};
pub use recorder::{DependencyRecorder, path_set};
pub use store::DependencyStore;
