//! Lazily initialized resource handles.
//!
//! [`LazyHandle`] builds an expensive resource the first time it is needed,
//! exactly once, however many threads ask at the same moment. Once ready it
//! is read without locking. [`HandleRegistry`] keeps one handle per resource
//! key so unrelated resources never share a lifecycle.

mod handle;
mod registry;

pub use handle::{InitState, LazyHandle};
pub use registry::HandleRegistry;
