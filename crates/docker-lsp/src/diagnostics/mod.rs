//! Diagnostics recomputation and publication.
//!
//! [`DiagnosticsPipeline`] fans a document out to every registered collector
//! that supports its language, merges the results and publishes them if the
//! document has not changed in the meantime.

mod merge;
mod pipeline;

pub use merge::merge;
pub use pipeline::DiagnosticsPipeline;
