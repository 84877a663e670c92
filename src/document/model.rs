//! Read-only source document model.
//!
//! The structures mirror a parsed MaterialX document. Field names serialize to the MaterialX
//! attribute names so a JSON rendition of a document reads like the XML original.

use crate::foundation::error::{LoaderError, LoaderResult};

/// Type string of interface elements that expose more than one output.
pub const MULTI_OUTPUT_TYPE: &str = "multioutput";
/// Typedef semantic marking shader types.
pub const SHADER_SEMANTIC: &str = "shader";

/// A parsed node-graph document.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Document {
    /// Source URI or display name.
    #[serde(default)]
    pub name: String,
    /// Format version, `"major.minor"`.
    #[serde(default)]
    pub version: String,
    /// Prefix prepended to relative filenames in this scope.
    #[serde(default, rename = "fileprefix", skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
    /// Node definitions declared by this document.
    #[serde(default, rename = "nodedefs")]
    pub node_defs: Vec<NodeDef>,
    /// Named node graphs.
    #[serde(default, rename = "nodegraphs")]
    pub node_graphs: Vec<NodeGraph>,
    /// Nodes instantiated at document scope.
    #[serde(default)]
    pub nodes: Vec<SourceNode>,
    /// Outputs declared at document scope.
    #[serde(default)]
    pub outputs: Vec<SourceOutput>,
    /// Legacy materials built from shader references.
    #[serde(default)]
    pub materials: Vec<Material>,
    /// Looks assigning materials.
    #[serde(default)]
    pub looks: Vec<Look>,
    /// Geometric property definitions.
    #[serde(default, rename = "geompropdefs")]
    pub geom_prop_defs: Vec<GeomPropDef>,
    /// Type definitions.
    #[serde(default, rename = "typedefs")]
    pub type_defs: Vec<TypeDef>,
}

/// A reusable node definition.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct NodeDef {
    /// Definition name (`ND_...`).
    pub name: String,
    /// Category implemented by this definition.
    pub node: String,
    /// Output type.
    #[serde(rename = "type")]
    pub ty: String,
    /// Code-generation target; empty means universal.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    /// Declared inputs and parameters, in declaration order.
    #[serde(default)]
    pub inputs: Vec<ValueElement>,
    /// Declared outputs of a multi-output definition.
    #[serde(default)]
    pub outputs: Vec<SourceOutput>,
    /// Name of the node graph implementing this definition; `None` is a native implementation.
    #[serde(default, rename = "nodegraph", skip_serializing_if = "Option::is_none")]
    pub node_graph: Option<String>,
}

/// A named container of nodes and outputs.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct NodeGraph {
    /// Graph name.
    pub name: String,
    /// Definition this graph implements, if any.
    #[serde(default, rename = "nodedef", skip_serializing_if = "Option::is_none")]
    pub node_def: Option<String>,
    /// Prefix prepended to relative filenames in this scope.
    #[serde(default, rename = "fileprefix", skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
    /// `true` when the graph comes from an included library file.
    #[serde(default, rename = "fromlibrary")]
    pub from_library: bool,
    /// Child nodes.
    #[serde(default)]
    pub nodes: Vec<SourceNode>,
    /// Graph outputs.
    #[serde(default)]
    pub outputs: Vec<SourceOutput>,
}

/// One node instance.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SourceNode {
    /// Node name, unique within its graph.
    pub name: String,
    /// Node category (`multiply`, `image`, `standard_surface`, ...).
    pub category: String,
    /// Output type.
    #[serde(rename = "type")]
    pub ty: String,
    /// Explicit definition name.
    #[serde(default, rename = "nodedef", skip_serializing_if = "Option::is_none")]
    pub node_def: Option<String>,
    /// Prefix prepended to relative filenames in this scope.
    #[serde(default, rename = "fileprefix", skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
    /// `true` when the node comes from an included library file.
    #[serde(default, rename = "fromlibrary")]
    pub from_library: bool,
    /// Inputs overridden on this instance.
    #[serde(default)]
    pub inputs: Vec<ValueElement>,
}

/// Flavor of a [`ValueElement`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueElementKind {
    /// A connectable input.
    #[default]
    Input,
    /// A uniform-only parameter (pre-1.38 documents).
    Parameter,
}

/// An input, parameter, or bind input.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ValueElement {
    /// Input name.
    pub name: String,
    /// Input or parameter.
    #[serde(default)]
    pub kind: ValueElementKind,
    /// Value type.
    #[serde(rename = "type")]
    pub ty: String,
    /// Literal value string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Upstream node inside the same graph.
    #[serde(default, rename = "nodename", skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Output name on the upstream element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Free-standing node graph owning `output`.
    #[serde(default, rename = "nodegraph", skip_serializing_if = "Option::is_none")]
    pub node_graph: Option<String>,
    /// Interface input of the enclosing definition this input is bound to.
    #[serde(default, rename = "interfacename", skip_serializing_if = "Option::is_none")]
    pub interface_name: Option<String>,
    /// Intrinsic geometric property used when nothing else is bound.
    #[serde(default, rename = "defaultgeomprop", skip_serializing_if = "Option::is_none")]
    pub default_geom_prop: Option<String>,
    /// Prefix prepended to relative filenames in this scope.
    #[serde(default, rename = "fileprefix", skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
}

/// A graph-level output.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SourceOutput {
    /// Output name.
    pub name: String,
    /// Output type.
    #[serde(rename = "type")]
    pub ty: String,
    /// Producing node.
    #[serde(default, rename = "nodename", skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Output of a multi-output producing node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// `true` when the output comes from an included library file.
    #[serde(default, rename = "fromlibrary")]
    pub from_library: bool,
}

/// A legacy material.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Material {
    /// Material name.
    pub name: String,
    /// Shader references.
    #[serde(default, rename = "shaderrefs")]
    pub shader_refs: Vec<ShaderRef>,
}

/// A legacy material's reference to a shader definition.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShaderRef {
    /// Shader reference name.
    pub name: String,
    /// Shader category.
    #[serde(default)]
    pub node: String,
    /// Explicit definition name.
    #[serde(default, rename = "nodedef", skip_serializing_if = "Option::is_none")]
    pub node_def: Option<String>,
    /// Instance-level overrides of the definition's inputs.
    #[serde(default, rename = "bindinputs")]
    pub bind_inputs: Vec<ValueElement>,
}

/// A look.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Look {
    /// Look name.
    pub name: String,
    /// Material assignments.
    #[serde(default, rename = "materialassigns")]
    pub material_assigns: Vec<MaterialAssign>,
}

/// Assignment of a material inside a look.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct MaterialAssign {
    /// Assignment name.
    pub name: String,
    /// Assigned material (a document child name).
    pub material: String,
}

/// Definition of an intrinsic geometric property.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct GeomPropDef {
    /// Definition name (`UV0`, `Nworld`, ...).
    pub name: String,
    /// Intrinsic property (`texcoord`, `normal`, `position`, ...).
    #[serde(default, rename = "geomprop")]
    pub geom_prop: String,
    /// Value type.
    #[serde(default, rename = "type")]
    pub ty: String,
    /// Set index for indexed properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Coordinate space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
}

/// A type definition.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TypeDef {
    /// Type name.
    pub name: String,
    /// Semantic tag; `shader` marks shader types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<String>,
}

impl Document {
    /// Deserialize a document from its JSON rendition.
    pub fn from_json(s: &str) -> LoaderResult<Self> {
        serde_json::from_str(s).map_err(|e| LoaderError::document(e.to_string()))
    }

    /// Parsed `(major, minor)` version; `(0, 0)` when absent or malformed.
    pub fn version_integers(&self) -> (u32, u32) {
        let mut parts = self.version.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        (major, minor)
    }

    /// Look up a document-scope node graph.
    pub fn node_graph(&self, name: &str) -> Option<&NodeGraph> {
        self.node_graphs.iter().find(|g| g.name == name)
    }

    /// Look up a document-scope node.
    pub fn node(&self, name: &str) -> Option<&SourceNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Look up a document-scope output.
    pub fn output(&self, name: &str) -> Option<&SourceOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Look up a legacy material.
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// Look up a geometric property definition.
    pub fn geom_prop_def(&self, name: &str) -> Option<&GeomPropDef> {
        self.geom_prop_defs.iter().find(|g| g.name == name)
    }

    /// Look up a type definition.
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.type_defs.iter().find(|t| t.name == name)
    }
}

impl NodeDef {
    /// Look up a declared input.
    pub fn input(&self, name: &str) -> Option<&ValueElement> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

impl SourceNode {
    /// Look up an input overridden on this instance.
    pub fn input(&self, name: &str) -> Option<&ValueElement> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

impl ValueElement {
    /// Literal value string, treating an empty string as absent.
    pub fn value_str(&self) -> Option<&str> {
        non_empty(self.value.as_deref())
    }

    /// Upstream node name, treating an empty string as absent.
    pub fn node_name_str(&self) -> Option<&str> {
        non_empty(self.node_name.as_deref())
    }

    /// Output name, treating an empty string as absent.
    pub fn output_str(&self) -> Option<&str> {
        non_empty(self.output.as_deref())
    }

    /// Interface name, treating an empty string as absent.
    pub fn interface_name_str(&self) -> Option<&str> {
        non_empty(self.interface_name.as_deref())
    }

    /// `true` for connectable inputs.
    pub fn is_input(&self) -> bool {
        self.kind == ValueElementKind::Input
    }
}

impl SourceOutput {
    /// Synthetic output named `out` pointing at `node`, used for shader nodes that are
    /// renderable on their own.
    pub fn referencing(node: &SourceNode) -> Self {
        Self {
            name: "out".to_owned(),
            ty: node.ty.clone(),
            node_name: Some(node.name.clone()),
            output: None,
            from_library: false,
        }
    }

    /// Producing node name, treating an empty string as absent.
    pub fn node_name_str(&self) -> Option<&str> {
        non_empty(self.node_name.as_deref())
    }

    /// Producing output name, treating an empty string as absent.
    pub fn output_str(&self) -> Option<&str> {
        non_empty(self.output.as_deref())
    }
}

pub(crate) fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "../../tests/unit/document/model.rs"]
mod tests;
