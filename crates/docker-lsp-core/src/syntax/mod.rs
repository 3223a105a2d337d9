//! Light structural views over document text.
//!
//! These are not full parsers: they recover just enough structure
//! (instructions and their tokens, top-level manifest keys) with LSP positions
//! for lint rules and position lookups.

pub mod compose;
pub mod dockerfile;
