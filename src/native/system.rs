use crate::native::types::{InputKey, NativeNodeType};

/// Opaque handle to a native material node.
///
/// Handles are plain identifiers; which party deletes a handle is tracked explicitly by the
/// translator (see [`crate::LoadResult::release`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u64);

/// Status reported by a failed [`MaterialSystem`] call.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeError {
    /// The node does not support the requested input.
    #[error("unsupported input")]
    Unsupported,
    /// An argument was rejected (unknown handle, wrong key, wrong value kind).
    #[error("invalid parameter")]
    InvalidParameter,
    /// Any other renderer status code.
    #[error("status {0}")]
    Status(i32),
}

/// Contract for the renderer's material-node primitives.
///
/// Calls are synchronous; each call completes before the translator issues the next dependent
/// one. Implementations are free to serialize access internally.
pub trait MaterialSystem {
    /// Create a node of the given native type.
    fn create_node(&mut self, ty: NativeNodeType) -> Result<NodeHandle, NativeError>;

    /// Bind `upstream`'s output to `node`'s `key` input.
    fn set_input_node(
        &mut self,
        node: NodeHandle,
        key: InputKey,
        upstream: NodeHandle,
    ) -> Result<(), NativeError>;

    /// Bind a four-component float literal to `node`'s `key` input.
    fn set_input_floats(
        &mut self,
        node: NodeHandle,
        key: InputKey,
        value: [f32; 4],
    ) -> Result<(), NativeError>;

    /// Bind an unsigned integer literal to `node`'s `key` input.
    fn set_input_uint(
        &mut self,
        node: NodeHandle,
        key: InputKey,
        value: u32,
    ) -> Result<(), NativeError>;

    /// Attach a debug name to `node`.
    fn set_name(&mut self, node: NodeHandle, name: &str) -> Result<(), NativeError> {
        let _ = (node, name);
        Ok(())
    }

    /// Delete a node previously returned by [`MaterialSystem::create_node`].
    fn delete_node(&mut self, node: NodeHandle) -> Result<(), NativeError>;
}
