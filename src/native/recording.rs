use crate::native::system::{MaterialSystem, NativeError, NodeHandle};
use crate::native::types::{InputKey, NativeNodeType};
use std::collections::BTreeMap;

/// A value bound to a recorded node input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordedInput {
    /// Connection to another node.
    Node(NodeHandle),
    /// Four-component float literal.
    Floats([f32; 4]),
    /// Unsigned integer literal.
    Uint(u32),
}

/// A node created through a [`RecordingMaterialSystem`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNode {
    /// Native type the node was created with.
    pub ty: NativeNodeType,
    /// Debug name, if one was set.
    pub name: Option<String>,
    /// Bound inputs, by key.
    pub inputs: BTreeMap<InputKey, RecordedInput>,
}

/// In-memory material system for tests and debugging.
///
/// Records every created node and its bound inputs, and counts deletions per handle so tests
/// can assert that each handle is released exactly once.
#[derive(Debug, Default)]
pub struct RecordingMaterialSystem {
    next_handle: u64,
    nodes: BTreeMap<NodeHandle, RecordedNode>,
    deletions: BTreeMap<NodeHandle, u32>,
    fail_create: Vec<NativeNodeType>,
}

impl RecordingMaterialSystem {
    /// Create an empty material system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create_node` call for `ty` fail.
    pub fn fail_create_of(&mut self, ty: NativeNodeType) {
        self.fail_create.push(ty);
    }

    /// Look up a live (not deleted) node.
    pub fn node(&self, handle: NodeHandle) -> Option<&RecordedNode> {
        self.nodes.get(&handle)
    }

    /// All live nodes, in creation order.
    pub fn live_nodes(&self) -> impl Iterator<Item = (NodeHandle, &RecordedNode)> {
        self.nodes.iter().map(|(&h, n)| (h, n))
    }

    /// Number of live nodes.
    pub fn live_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes ever created.
    pub fn created_count(&self) -> usize {
        usize::try_from(self.next_handle).unwrap_or(usize::MAX)
    }

    /// How many times `handle` was passed to `delete_node`.
    pub fn deletions_of(&self, handle: NodeHandle) -> u32 {
        self.deletions.get(&handle).copied().unwrap_or(0)
    }

    /// Live nodes carrying the given debug name.
    pub fn nodes_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (NodeHandle, &'a RecordedNode)> + 'a {
        self.live_nodes()
            .filter(move |(_, n)| n.name.as_deref() == Some(name))
    }

    fn live_mut(&mut self, handle: NodeHandle) -> Result<&mut RecordedNode, NativeError> {
        self.nodes
            .get_mut(&handle)
            .ok_or(NativeError::InvalidParameter)
    }

    fn bind(
        &mut self,
        node: NodeHandle,
        key: InputKey,
        value: RecordedInput,
    ) -> Result<(), NativeError> {
        self.live_mut(node)?.inputs.insert(key, value);
        Ok(())
    }
}

impl MaterialSystem for RecordingMaterialSystem {
    fn create_node(&mut self, ty: NativeNodeType) -> Result<NodeHandle, NativeError> {
        if self.fail_create.contains(&ty) {
            return Err(NativeError::Status(-18));
        }
        let handle = NodeHandle(self.next_handle);
        self.next_handle += 1;
        self.nodes.insert(
            handle,
            RecordedNode {
                ty,
                name: None,
                inputs: BTreeMap::new(),
            },
        );
        Ok(handle)
    }

    fn set_input_node(
        &mut self,
        node: NodeHandle,
        key: InputKey,
        upstream: NodeHandle,
    ) -> Result<(), NativeError> {
        if !self.nodes.contains_key(&upstream) {
            return Err(NativeError::InvalidParameter);
        }
        self.bind(node, key, RecordedInput::Node(upstream))
    }

    fn set_input_floats(
        &mut self,
        node: NodeHandle,
        key: InputKey,
        value: [f32; 4],
    ) -> Result<(), NativeError> {
        self.bind(node, key, RecordedInput::Floats(value))
    }

    fn set_input_uint(
        &mut self,
        node: NodeHandle,
        key: InputKey,
        value: u32,
    ) -> Result<(), NativeError> {
        self.bind(node, key, RecordedInput::Uint(value))
    }

    fn set_name(&mut self, node: NodeHandle, name: &str) -> Result<(), NativeError> {
        self.live_mut(node)?.name = Some(name.to_owned());
        Ok(())
    }

    fn delete_node(&mut self, node: NodeHandle) -> Result<(), NativeError> {
        *self.deletions.entry(node).or_insert(0) += 1;
        self.nodes
            .remove(&node)
            .map(|_| ())
            .ok_or(NativeError::InvalidParameter)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/native/recording.rs"]
mod tests;
