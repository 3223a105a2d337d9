//! Document management module.
//!
//! This module provides infrastructure for managing LSP documents:
//! - `store`: versioned document storage and read leases
//! - `lifecycle`: open/change/close event handling

mod lifecycle;
mod store;

// Re-export all public items from submodules
pub use lifecycle::{handle_document_change, handle_document_close, handle_document_open};
pub use store::{DocumentHandle, DocumentStore};
