//! Node variants and the arena that owns them.
//!
//! Every internal node lives in a [`NodeArena`] and is addressed by [`NodeId`]. Composites refer
//! to their children by id, so caches and composites can share nodes without aliasing.

use std::collections::{BTreeMap, BTreeSet};

use smallvec::SmallVec;

use crate::document::graph::GraphRef;
use crate::document::model::ValueElement;
use crate::document::value::Value;
use crate::foundation::error::{LoaderError, LoaderResult};
use crate::loader::context::Env;
use crate::mapping::{IMAGE, MappingEntry};
use crate::native::system::{MaterialSystem, NativeError, NodeHandle};
use crate::native::types::{InputKey, NativeNodeType};

/// Index of a node inside a [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(pub(crate) u32);

/// What a connection or literal binds to an input.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Binding<'v> {
    Node(NodeHandle),
    Literal { value: &'v str, ty: &'v str },
}

/// Deferred image parameters, exported with the result instead of bound natively.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ImageParams {
    pub(crate) file: String,
    pub(crate) layer: String,
    pub(crate) default: Option<Value>,
    pub(crate) uaddressmode: String,
    pub(crate) vaddressmode: String,
}

/// Input dispatch of a leaf.
#[derive(Clone, Debug)]
pub(crate) enum LeafRole {
    /// No settable inputs.
    Plain,
    /// Inputs keyed through a mapping table entry.
    Mapped(&'static MappingEntry),
    /// Image texture; most inputs are captured rather than bound.
    Image(Box<ImageParams>),
    /// Generated pass-through that coerces a value into a surface slot.
    Wrap,
    /// Forwards its `bsdf` input.
    Surface,
    /// Forwards its `displacement` input. A literal creates a constant named after `source`.
    Displacement { source: String },
}

/// A node holding at most one native handle.
#[derive(Clone, Debug)]
pub(crate) struct Leaf {
    pub(crate) handle: Option<NodeHandle>,
    /// Only owning leaves delete or export their handle.
    pub(crate) owning: bool,
    pub(crate) role: LeafRole,
}

/// A child input that an instantiation may override through an interface name.
#[derive(Clone, Debug)]
pub(crate) struct Socket<'a> {
    pub(crate) child: String,
    pub(crate) input: &'a ValueElement,
}

/// A whole nested source graph.
#[derive(Debug)]
pub(crate) struct CompositeNode<'a> {
    pub(crate) graph: GraphRef<'a>,
    pub(crate) children: BTreeMap<String, NodeId>,
    pub(crate) sockets: BTreeMap<String, SmallVec<[Socket<'a>; 4]>>,
    /// Child name to the children it is wired to consume.
    pub(crate) deps: BTreeMap<String, BTreeSet<String>>,
}

/// Internal node.
#[derive(Debug)]
pub(crate) enum Node<'a> {
    Leaf(Leaf),
    Composite(CompositeNode<'a>),
}

impl Leaf {
    /// Create an owning leaf around a fresh native node of `ty`.
    ///
    /// `setup` runs right after creation; if it or naming fails the node is deleted again.
    pub(crate) fn create(
        env: &mut Env<'_, '_>,
        ty: NativeNodeType,
        role: LeafRole,
        name: Option<&str>,
        setup: impl FnOnce(&mut dyn MaterialSystem, NodeHandle) -> Result<(), NativeError>,
    ) -> LoaderResult<Self> {
        let handle = env.sys.create_node(ty)?;
        let configured = setup(&mut *env.sys, handle)
            .and_then(|()| name.map_or(Ok(()), |n| env.sys.set_name(handle, n)));
        if let Err(err) = configured {
            let _ = env.sys.delete_node(handle);
            return Err(err.into());
        }
        Ok(Self {
            handle: Some(handle),
            owning: true,
            role,
        })
    }

    /// Pass-through leaf starting without a handle.
    pub(crate) fn forwarding(role: LeafRole) -> Self {
        Self {
            handle: None,
            owning: false,
            role,
        }
    }

    /// Wrap `wrapped` into a generated pass-through so it can fill a surface slot.
    pub(crate) fn wrap(env: &mut Env<'_, '_>, wrapped: NodeHandle) -> LoaderResult<Self> {
        Self::create(env, NativeNodeType::Passthrough, LeafRole::Wrap, None, |sys, h| {
            sys.set_input_node(h, InputKey::Color, wrapped)
        })
    }

    pub(crate) fn image_params_mut(&mut self) -> Option<&mut ImageParams> {
        match &mut self.role {
            LeafRole::Image(params) => Some(params),
            _ => None,
        }
    }

    fn handle_or_err(&self) -> LoaderResult<NodeHandle> {
        self.handle
            .ok_or_else(|| LoaderError::malformed("node has no native handle"))
    }

    fn release(&mut self, sys: &mut dyn MaterialSystem) {
        if let (true, Some(h)) = (self.owning, self.handle.take()) {
            let _ = sys.delete_node(h);
        }
        self.owning = false;
    }

    fn mapped_key(entry: &MappingEntry, name: &str) -> LoaderResult<InputKey> {
        entry
            .input(name)
            .ok_or_else(|| LoaderError::unsupported(format!("unknown input: {name}")))
    }

    fn bind_mapped(
        &self,
        env: &mut Env<'_, '_>,
        entry: &MappingEntry,
        input: &ValueElement,
        binding: Binding<'_>,
    ) -> LoaderResult<()> {
        let key = Self::mapped_key(entry, &input.name)?;
        let handle = self.handle_or_err()?;
        match binding {
            Binding::Node(upstream) => env.sys.set_input_node(handle, key, upstream)?,
            Binding::Literal { value, ty } => {
                let floats = Value::parse(value, ty)?.to_float4().ok_or_else(|| {
                    LoaderError::unsupported(format!(
                        "failed to parse {value} value: unsupported type - {ty}"
                    ))
                })?;
                env.sys.set_input_floats(handle, key, floats)?;
            }
        }
        Ok(())
    }

    /// Bind a connection or literal to one of this leaf's inputs.
    pub(crate) fn set_input(
        &mut self,
        env: &mut Env<'_, '_>,
        input: &ValueElement,
        binding: Binding<'_>,
    ) -> LoaderResult<()> {
        let name = input.name.as_str();
        match (&self.role, binding) {
            (LeafRole::Mapped(entry), _) => {
                let entry: &'static MappingEntry = *entry;
                self.bind_mapped(env, entry, input, binding)
            }
            (LeafRole::Image(_), Binding::Node(_)) => self.bind_mapped(env, &IMAGE, input, binding),
            (LeafRole::Image(_), Binding::Literal { value, ty }) => {
                self.set_image_literal(env, input, value, ty)
            }
            (LeafRole::Surface, Binding::Node(upstream)) if name == "bsdf" => {
                self.handle = Some(upstream);
                self.owning = false;
                Ok(())
            }
            (LeafRole::Displacement { .. }, Binding::Node(upstream)) if name == "displacement" => {
                self.release(&mut *env.sys);
                self.handle = Some(upstream);
                Ok(())
            }
            (LeafRole::Displacement { source }, Binding::Literal { value, ty })
                if name == "displacement" =>
            {
                let source = source.clone();
                self.release(&mut *env.sys);
                let floats = Value::parse(value, ty)?.to_float4().ok_or_else(|| {
                    LoaderError::unsupported(format!("displacement value of type {ty}"))
                })?;
                let constant = Self::create(
                    env,
                    NativeNodeType::ConstantTexture,
                    LeafRole::Plain,
                    Some(&source),
                    |sys, h| sys.set_input_floats(h, InputKey::Value, floats),
                )?;
                self.handle = constant.handle;
                self.owning = true;
                Ok(())
            }
            (LeafRole::Surface, _) => Err(LoaderError::unsupported(format!(
                "surface input: {name}"
            ))),
            (LeafRole::Displacement { .. }, _) => Err(LoaderError::unsupported(format!(
                "displacement input: {name}"
            ))),
            (LeafRole::Plain | LeafRole::Wrap, _) => Err(LoaderError::unsupported(format!(
                "node has no input {name}"
            ))),
        }
    }

    fn set_image_literal(
        &mut self,
        env: &mut Env<'_, '_>,
        input: &ValueElement,
        value: &str,
        ty: &str,
    ) -> LoaderResult<()> {
        let name = input.name.as_str();
        let resolved = (ty == "filename" && name == "file").then(|| env.resolve_file(value));
        let LeafRole::Image(params) = &mut self.role else {
            return Err(LoaderError::unsupported(format!("node has no input {name}")));
        };
        match (ty, name) {
            ("string", "layer") => params.layer = value.to_owned(),
            ("string", "uaddressmode") => params.uaddressmode = value.to_owned(),
            ("string", "vaddressmode") => params.vaddressmode = value.to_owned(),
            ("string", "filtertype" | "framerange" | "frameendaction") => {}
            ("filename", "file") => params.file = resolved.unwrap_or_default(),
            ("integer", "frameoffset") => {}
            ("string" | "filename", _) => {
                return Err(LoaderError::unsupported(format!(
                    "invalid input for image node {name} ({value} {ty})"
                )));
            }
            (_, "default") => params.default = Some(Value::parse(value, ty)?),
            _ => {
                return self.bind_mapped(env, &IMAGE, input, Binding::Literal { value, ty });
            }
        }
        Ok(())
    }
}

impl<'a> CompositeNode<'a> {
    pub(crate) fn new(graph: GraphRef<'a>) -> Self {
        Self {
            graph,
            children: BTreeMap::new(),
            sockets: BTreeMap::new(),
            deps: BTreeMap::new(),
        }
    }

    /// Sockets matching an input: its interface name first, then its own name.
    fn sockets_for(&self, input: &ValueElement) -> Option<&SmallVec<[Socket<'a>; 4]>> {
        input
            .interface_name_str()
            .and_then(|alias| self.sockets.get(alias))
            .or_else(|| self.sockets.get(&input.name))
    }

    /// `true` when `from` already depends on `to`, directly or transitively.
    pub(crate) fn depends_on(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(name) = stack.pop() {
            if name == to {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            if let Some(ups) = self.deps.get(name) {
                stack.extend(ups.iter().map(String::as_str));
            }
        }
        false
    }

    pub(crate) fn record_edge(&mut self, upstream: &str, downstream: &str) {
        self.deps
            .entry(downstream.to_owned())
            .or_default()
            .insert(upstream.to_owned());
    }
}

/// Owner of every internal node built during one load.
#[derive(Debug, Default)]
pub(crate) struct NodeArena<'a> {
    nodes: Vec<Node<'a>>,
}

impl<'a> NodeArena<'a> {
    pub(crate) fn push(&mut self, node: Node<'a>) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<'a>> {
        self.nodes.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<'a>> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn composite(&self, id: NodeId) -> Option<&CompositeNode<'a>> {
        match self.get(id)? {
            Node::Composite(c) => Some(c),
            Node::Leaf(_) => None,
        }
    }

    pub(crate) fn composite_mut(&mut self, id: NodeId) -> Option<&mut CompositeNode<'a>> {
        match self.get_mut(id)? {
            Node::Composite(c) => Some(c),
            Node::Leaf(_) => None,
        }
    }

    pub(crate) fn leaf(&self, id: NodeId) -> Option<&Leaf> {
        match self.get(id)? {
            Node::Leaf(l) => Some(l),
            Node::Composite(_) => None,
        }
    }

    /// Native handle produced by `id`, following composite outputs down to a leaf.
    ///
    /// `output` selects a composite's output by name; `None` takes its first output.
    pub(crate) fn output_handle(&self, id: NodeId, output: Option<&str>) -> LoaderResult<NodeHandle> {
        let mut current = id;
        let mut output = output;
        loop {
            match self.get(current) {
                Some(Node::Leaf(leaf)) => return leaf.handle_or_err(),
                Some(Node::Composite(c)) => {
                    let out = match output {
                        Some(name) => c.graph.output(name),
                        None => c.graph.outputs().first(),
                    }
                    .ok_or_else(|| {
                        LoaderError::malformed(format!(
                            "{} has no output {}",
                            c.graph.name(),
                            output.unwrap_or("")
                        ))
                    })?;
                    current = out
                        .node_name_str()
                        .and_then(|n| c.children.get(n))
                        .copied()
                        .ok_or_else(|| {
                            LoaderError::malformed(format!(
                                "output {} of {} is not built",
                                out.name,
                                c.graph.name()
                            ))
                        })?;
                    output = out.output_str();
                }
                None => return Err(LoaderError::malformed("dangling node id")),
            }
        }
    }

    /// Bind `binding` to `input` on node `id`.
    ///
    /// A composite fans the binding out to every socket registered under the input's interface
    /// name (or its name). The first failing socket is reported.
    pub(crate) fn set_input(
        &mut self,
        env: &mut Env<'_, '_>,
        id: NodeId,
        input: &ValueElement,
        binding: Binding<'_>,
    ) -> LoaderResult<()> {
        let targets: SmallVec<[(NodeId, &'a ValueElement); 4]> = match self.get_mut(id) {
            Some(Node::Leaf(leaf)) => return leaf.set_input(env, input, binding),
            Some(Node::Composite(c)) => {
                let Some(sockets) = c.sockets_for(input) else {
                    return Err(LoaderError::unsupported(format!(
                        "failed to set {} input for {}: no such interface socket",
                        input.name,
                        c.graph.name()
                    )));
                };
                sockets
                    .iter()
                    .filter_map(|s| {
                        env.log(format_args!(" {}:{}", s.child, s.input.name));
                        c.children.get(&s.child).map(|&child| (child, s.input))
                    })
                    .collect()
            }
            None => return Err(LoaderError::malformed("dangling node id")),
        };

        let mut first_err = None;
        for (child, child_input) in targets {
            if let Err(err) = self.set_input(env, child, child_input, binding) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Wire the output of `upstream` into `input` of `downstream`.
    pub(crate) fn connect(
        &mut self,
        env: &mut Env<'_, '_>,
        upstream: NodeId,
        output: Option<&str>,
        downstream: NodeId,
        input: &ValueElement,
    ) -> LoaderResult<()> {
        let handle = self.output_handle(upstream, output)?;
        self.set_input(env, downstream, input, Binding::Node(handle))
    }

    /// Delete every handle still owned by a leaf.
    pub(crate) fn release_owned(&mut self, sys: &mut dyn MaterialSystem) {
        for node in &mut self.nodes {
            if let Node::Leaf(leaf) = node {
                leaf.release(sys);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/loader/node.rs"]
mod tests;
