//! Entry and document types shared by the store and the registry.

pub mod document;
pub mod entry;

pub use document::*;
pub use entry::*;
