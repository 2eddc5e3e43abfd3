//! Rich-text note store library
//!
//! This library owns a single user's note collection: creating, updating,
//! tagging and deleting notes, persisting the whole collection under one
//! storage key, and answering filtered, sorted views over it.

mod cli;
mod config;
mod context;
mod errors;
mod helper;
mod note;
mod query;
mod storage;
mod store;
mod suggest;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use context::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use query::*;
pub use storage::*;
pub use store::*;
pub use suggest::*;
pub use types::*;
