//! Graph queries over the document model.

use crate::document::model::{
    Document, GeomPropDef, MULTI_OUTPUT_TYPE, Material, NodeDef, NodeGraph, ShaderRef, SourceNode,
    SourceOutput, TypeDef, non_empty,
};
use crate::foundation::error::{LoaderError, LoaderResult};

/// A document plus the standard library it was loaded against.
///
/// Definition lookups search the document first, then the library.
#[derive(Clone, Copy, Debug)]
pub struct Catalog<'a> {
    /// The document being translated.
    pub doc: &'a Document,
    /// Standard library definitions, if set up.
    pub stdlib: Option<&'a Document>,
}

impl<'a> Catalog<'a> {
    /// Pair a document with an optional library.
    pub fn new(doc: &'a Document, stdlib: Option<&'a Document>) -> Self {
        Self { doc, stdlib }
    }

    fn docs(&self) -> impl Iterator<Item = &'a Document> {
        std::iter::once(self.doc).chain(self.stdlib)
    }

    /// Look up a node definition by name.
    pub fn node_def(&self, name: &str) -> Option<&'a NodeDef> {
        self.docs()
            .find_map(|d| d.node_defs.iter().find(|nd| nd.name == name))
    }

    /// Resolve the definition a node instantiates.
    ///
    /// An explicit `nodedef` wins; otherwise the first definition matching the node's category
    /// and output type is used.
    pub fn node_def_for(&self, node: &SourceNode) -> Option<&'a NodeDef> {
        if let Some(name) = non_empty(node.node_def.as_deref()) {
            return self.node_def(name);
        }
        self.docs().find_map(|d| {
            d.node_defs
                .iter()
                .find(|nd| nd.node == node.category && nd.ty == node.ty)
        })
    }

    /// Resolve the definition a legacy shader reference points at.
    ///
    /// An explicit `nodedef` wins; otherwise the first definition of the shader's category.
    pub fn shader_ref_node_def(&self, shader_ref: &ShaderRef) -> Option<&'a NodeDef> {
        if let Some(name) = non_empty(shader_ref.node_def.as_deref()) {
            return self.node_def(name);
        }
        self.docs()
            .find_map(|d| d.node_defs.iter().find(|nd| nd.node == shader_ref.node))
    }

    /// Look up a node graph by name.
    pub fn node_graph(&self, name: &str) -> Option<&'a NodeGraph> {
        self.docs().find_map(|d| d.node_graph(name))
    }

    /// The node graph implementing `node_def`, if its implementation is a graph.
    pub fn implementation_graph(&self, node_def: &NodeDef) -> Option<&'a NodeGraph> {
        if let Some(name) = non_empty(node_def.node_graph.as_deref()) {
            return self.node_graph(name);
        }
        self.docs().find_map(|d| {
            d.node_graphs
                .iter()
                .find(|g| g.node_def.as_deref() == Some(node_def.name.as_str()))
        })
    }

    /// Look up a geometric property definition.
    pub fn geom_prop_def(&self, name: &str) -> Option<&'a GeomPropDef> {
        self.docs().find_map(|d| d.geom_prop_def(name))
    }

    /// Look up a type definition.
    pub fn type_def(&self, name: &str) -> Option<&'a TypeDef> {
        self.docs().find_map(|d| d.type_def(name))
    }
}

/// Identity of a graph element, used for grouping and memoization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GraphKey {
    /// The document's implicit top-level graph.
    Document,
    /// A named node graph.
    NodeGraph(String),
}

/// Either the document's implicit top-level graph or a named node graph.
#[derive(Clone, Copy, Debug)]
pub enum GraphRef<'a> {
    /// Document scope.
    Document(&'a Document),
    /// A named node graph.
    NodeGraph(&'a NodeGraph),
}

impl<'a> GraphRef<'a> {
    /// Display name.
    pub fn name(&self) -> &'a str {
        match self {
            Self::Document(d) => d.name.as_str(),
            Self::NodeGraph(g) => g.name.as_str(),
        }
    }

    /// Grouping identity.
    pub fn key(&self) -> GraphKey {
        match self {
            Self::Document(_) => GraphKey::Document,
            Self::NodeGraph(g) => GraphKey::NodeGraph(g.name.clone()),
        }
    }

    /// Child nodes.
    pub fn nodes(&self) -> &'a [SourceNode] {
        match self {
            Self::Document(d) => &d.nodes,
            Self::NodeGraph(g) => &g.nodes,
        }
    }

    /// Look up a child node.
    pub fn node(&self, name: &str) -> Option<&'a SourceNode> {
        self.nodes().iter().find(|n| n.name == name)
    }

    /// Declared outputs.
    pub fn outputs(&self) -> &'a [SourceOutput] {
        match self {
            Self::Document(d) => &d.outputs,
            Self::NodeGraph(g) => &g.outputs,
        }
    }

    /// Look up an output by name.
    pub fn output(&self, name: &str) -> Option<&'a SourceOutput> {
        self.outputs().iter().find(|o| o.name == name)
    }

    /// Output type of the graph seen as an interface element.
    pub fn ty(&self) -> &'a str {
        match self.outputs() {
            [] => "",
            [only] => only.ty.as_str(),
            _ => MULTI_OUTPUT_TYPE,
        }
    }

    /// File prefix declared on this scope.
    pub fn file_prefix(&self) -> Option<&'a str> {
        match self {
            Self::Document(d) => non_empty(d.file_prefix.as_deref()),
            Self::NodeGraph(g) => non_empty(g.file_prefix.as_deref()),
        }
    }

    /// The definition this graph implements, if any.
    ///
    /// Either the graph names its definition, or a definition names the graph as its
    /// implementation.
    pub fn node_def(&self, catalog: &Catalog<'a>) -> Option<&'a NodeDef> {
        let Self::NodeGraph(g) = self else {
            return None;
        };
        if let Some(name) = non_empty(g.node_def.as_deref()) {
            return catalog.node_def(name);
        }
        catalog.docs().find_map(|d| {
            d.node_defs
                .iter()
                .find(|nd| nd.node_graph.as_deref() == Some(g.name.as_str()))
        })
    }
}

/// Select which output of an interface element a port connects to.
///
/// Multi-output interfaces require `requested`; single-output interfaces always connect their
/// first output, which is reported as `None`.
pub fn select_output(
    interface_ty: &str,
    outputs: &[SourceOutput],
    requested: Option<&str>,
    port: &str,
) -> LoaderResult<Option<String>> {
    if interface_ty != MULTI_OUTPUT_TYPE {
        return Ok(None);
    }
    let Some(name) = non_empty(requested) else {
        return Err(LoaderError::malformed(format!(
            "output should be specified when connecting to multioutput element - port: {port}"
        )));
    };
    if outputs.iter().any(|o| o.name == name) {
        Ok(Some(name.to_owned()))
    } else {
        Err(LoaderError::malformed(format!(
            "cannot determine output {name} - port: {port}"
        )))
    }
}

/// Any document element addressable by a name path.
#[derive(Clone, Copy, Debug)]
pub enum ElementRef<'a> {
    /// A legacy material.
    Material(&'a Material),
    /// A named node graph.
    NodeGraph(&'a NodeGraph),
    /// An output of the document or of a node graph.
    Output {
        /// Owning graph.
        parent: GraphRef<'a>,
        /// The output.
        output: &'a SourceOutput,
    },
    /// A node of the document or of a node graph.
    Node {
        /// Owning graph.
        parent: GraphRef<'a>,
        /// The node.
        node: &'a SourceNode,
    },
}

impl<'a> ElementRef<'a> {
    /// Slash-separated path from the document root.
    pub fn name_path(&self) -> String {
        let (parent, name) = match self {
            Self::Material(m) => return m.name.clone(),
            Self::NodeGraph(g) => return g.name.clone(),
            Self::Output { parent, output } => (parent, output.name.as_str()),
            Self::Node { parent, node } => (parent, node.name.as_str()),
        };
        match parent {
            GraphRef::Document(_) => name.to_owned(),
            GraphRef::NodeGraph(g) => format!("{}/{}", g.name, name),
        }
    }

    /// Identity used to visit each element once.
    pub(crate) fn identity(&self) -> (u8, String) {
        let tag = match self {
            Self::Material(_) => 0,
            Self::NodeGraph(_) => 1,
            Self::Output { .. } => 2,
            Self::Node { .. } => 3,
        };
        (tag, self.name_path())
    }
}

impl Document {
    /// Resolve a top-level child by name: materials first, then graphs, nodes, and outputs.
    pub fn child(&self, name: &str) -> Option<ElementRef<'_>> {
        let doc = GraphRef::Document(self);
        if let Some(m) = self.material(name) {
            return Some(ElementRef::Material(m));
        }
        if let Some(g) = self.node_graph(name) {
            return Some(ElementRef::NodeGraph(g));
        }
        if let Some(n) = self.node(name) {
            return Some(ElementRef::Node { parent: doc, node: n });
        }
        self.output(name)
            .map(|o| ElementRef::Output { parent: doc, output: o })
    }

    /// Resolve a name path (`elem` or `graph/elem`).
    pub fn descendant(&self, name_path: &str) -> Option<ElementRef<'_>> {
        let mut parts = name_path.split('/').filter(|p| !p.is_empty());
        let first = parts.next()?;
        let Some(second) = parts.next() else {
            return self.child(first);
        };
        if parts.next().is_some() {
            return None;
        }
        let graph = self.node_graph(first)?;
        let parent = GraphRef::NodeGraph(graph);
        if let Some(n) = parent.node(second) {
            return Some(ElementRef::Node { parent, node: n });
        }
        parent
            .output(second)
            .map(|o| ElementRef::Output { parent, output: o })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/graph.rs"]
mod tests;
