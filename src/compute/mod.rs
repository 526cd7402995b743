//! Compute layer: spatial indexing primitives and input validation.
//!
//! Nothing in here knows about clustering; the dendrogram builder drives the
//! index through its public surface.

pub mod spatial;
pub mod validation;
