//! Enable/disable MCP server entries in a JSON configuration file.
//!
//! Disabled entries are moved into a sibling backup file so they can be
//! restored later. The UI layer owns an [`EntryRegistry`] (or a
//! [`SharedRegistry`] when actions can arrive concurrently) and renders
//! whatever [`EntryRegistry::list_entries`] returns.

pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod store;
pub mod telemetry;

pub use error::{ConfigError, DocumentKind, Result};
pub use model::{Entry, EntryStatus, ServerDocument};
pub use registry::{AddReport, EntryRegistry, EntryView, SharedRegistry};
pub use store::{DocumentStore, JsonFileStore, MergeOutcome, backup_path_for, merge_fragment};
