//! Renderer collaborator boundary.
//!
//! The renderer itself is external; the translator only talks to it through
//! [`system::MaterialSystem`].

/// In-memory recording material system.
pub mod recording;
/// Material system trait and handle types.
pub mod system;
/// Native node types, input keys, and opcodes.
pub mod types;
