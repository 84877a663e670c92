//! Read-only source document: model, graph queries, and literal values.

/// Graph queries and definition lookup.
pub mod graph;
/// Serde document model.
pub mod model;
/// Literal value parsing.
pub mod value;
