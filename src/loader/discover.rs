//! Renderable-element discovery and output classification.

use std::borrow::Cow;
use std::collections::BTreeSet;

use crate::document::graph::{Catalog, ElementRef, GraphRef};
use crate::document::model::{SHADER_SEMANTIC, ShaderRef, SourceNode, SourceOutput};

/// Number of output kinds a load can resolve.
pub const OUTPUT_KINDS: usize = 2;

/// Kind of root a renderable output feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputKind {
    /// Surface shader slot.
    Surface = 0,
    /// Displacement slot.
    Displacement = 1,
}

/// Output types that are not shaders but can be wrapped into a surface slot.
const WRAPPABLE_TYPES: [&str; 6] = ["color3", "color2", "vector3", "vector2", "boolean", "float"];

impl OutputKind {
    /// Every kind, in slot order.
    pub const ALL: [OutputKind; OUTPUT_KINDS] = [OutputKind::Surface, OutputKind::Displacement];

    /// Slot index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Classify a declared output type; `None` means not renderable.
    pub fn classify(ty: &str) -> Option<Self> {
        match ty {
            "surfaceshader" => Some(Self::Surface),
            "displacementshader" => Some(Self::Displacement),
            _ if Self::is_wrappable(ty) => Some(Self::Surface),
            _ => None,
        }
    }

    /// `true` for value types a pass-through node can coerce into a surface slot.
    pub fn is_wrappable(ty: &str) -> bool {
        WRAPPABLE_TYPES.contains(&ty)
    }
}

/// Name paths of renderable elements, per output kind, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderableElements {
    name_paths: [Vec<String>; OUTPUT_KINDS],
}

impl RenderableElements {
    /// Elements exposing an output of `kind`.
    pub fn get(&self, kind: OutputKind) -> &[String] {
        &self.name_paths[kind.index()]
    }

    /// `true` when the document has nothing to render.
    pub fn is_empty(&self) -> bool {
        self.name_paths.iter().all(Vec::is_empty)
    }
}

/// One output of a renderable element, with the graph it lives in.
#[derive(Clone, Debug)]
pub(crate) struct Candidate<'a> {
    /// Graph the output's producing node is resolved in.
    pub(crate) graph: GraphRef<'a>,
    pub(crate) output: Cow<'a, SourceOutput>,
    /// Legacy shader reference whose bind inputs override the graph's interface.
    pub(crate) shader_ref: Option<&'a ShaderRef>,
}

impl Candidate<'_> {
    pub(crate) fn kind(&self) -> Option<OutputKind> {
        OutputKind::classify(&self.output.ty)
    }
}

/// Every output `element` exposes, renderable or not.
pub(crate) fn element_outputs<'a>(catalog: &Catalog<'a>, element: ElementRef<'a>) -> Vec<Candidate<'a>> {
    match element {
        ElementRef::Material(material) => material
            .shader_refs
            .iter()
            .filter_map(|sr| {
                let node_def = catalog
                    .shader_ref_node_def(sr)
                    .filter(|nd| nd.target.is_empty())?;
                let graph = catalog.implementation_graph(node_def)?;
                Some((sr, graph))
            })
            .flat_map(|(sr, graph)| {
                graph.outputs.iter().map(move |o| Candidate {
                    graph: GraphRef::NodeGraph(graph),
                    output: Cow::Borrowed(o),
                    shader_ref: Some(sr),
                })
            })
            .collect(),
        ElementRef::NodeGraph(graph) => graph
            .outputs
            .iter()
            .map(|o| Candidate {
                graph: GraphRef::NodeGraph(graph),
                output: Cow::Borrowed(o),
                shader_ref: None,
            })
            .collect(),
        ElementRef::Output { parent, output } => vec![Candidate {
            graph: parent,
            output: Cow::Borrowed(output),
            shader_ref: None,
        }],
        ElementRef::Node { parent, node } => {
            let shader = |n: &'a SourceNode| Candidate {
                graph: parent,
                output: Cow::Owned(SourceOutput::referencing(n)),
                shader_ref: None,
            };
            match node.ty.as_str() {
                "material" => ["surfaceshader", "displacementshader"]
                    .iter()
                    .filter_map(|slot| node.input(slot)?.node_name_str())
                    .filter_map(|name| parent.node(name))
                    .map(shader)
                    .collect(),
                "surfaceshader" | "displacementshader" => vec![shader(node)],
                _ => Vec::new(),
            }
        }
    }
}

fn has_renderable_output<'a>(catalog: &Catalog<'a>, element: ElementRef<'a>) -> bool {
    element_outputs(catalog, element)
        .iter()
        .any(|c| c.kind().is_some())
}

/// Candidate renderable elements in discovery order; an element may appear more than once.
pub(crate) fn discover<'a>(catalog: &Catalog<'a>) -> Vec<ElementRef<'a>> {
    let doc = catalog.doc;
    let document = GraphRef::Document(doc);
    let mut found = Vec::new();

    found.extend(
        doc.looks
            .iter()
            .flat_map(|look| &look.material_assigns)
            .filter_map(|assign| doc.child(&assign.material)),
    );

    found.extend(
        doc.materials
            .iter()
            .map(ElementRef::Material)
            .filter(|&m| has_renderable_output(catalog, m)),
    );

    if doc.version_integers() >= (1, 38) {
        found.extend(
            doc.nodes
                .iter()
                .filter(|n| !n.from_library)
                .filter(|n| {
                    catalog
                        .type_def(&n.ty)
                        .and_then(|t| t.semantic.as_deref())
                        == Some(SHADER_SEMANTIC)
                })
                .map(|node| ElementRef::Node {
                    parent: document,
                    node,
                }),
        );
    }

    found.extend(
        doc.node_graphs
            .iter()
            .filter(|g| !g.from_library && g.node_def.is_none())
            .filter(|g| {
                g.outputs
                    .iter()
                    .any(|o| OutputKind::classify(&o.ty).is_some())
            })
            .map(ElementRef::NodeGraph),
    );

    found.extend(
        doc.outputs
            .iter()
            .filter(|o| !o.from_library && OutputKind::classify(&o.ty).is_some())
            .map(|output| ElementRef::Output {
                parent: document,
                output,
            }),
    );

    found
}

/// Group discovered elements by the output kinds they expose, each element once.
pub(crate) fn renderable_elements(catalog: &Catalog<'_>) -> RenderableElements {
    let mut seen = BTreeSet::new();
    let mut out = RenderableElements::default();
    for element in discover(catalog) {
        if !seen.insert(element.identity()) {
            continue;
        }
        let mut kinds = [false; OUTPUT_KINDS];
        for candidate in element_outputs(catalog, element) {
            if let Some(kind) = candidate.kind() {
                kinds[kind.index()] = true;
            }
        }
        for kind in OutputKind::ALL {
            if kinds[kind.index()] {
                out.name_paths[kind.index()].push(element.name_path());
            }
        }
    }
    out
}

#[derive(Clone, Debug)]
enum Slot<'a> {
    Open,
    Disabled,
    Selected(Candidate<'a>),
}

/// The output chosen for each kind.
#[derive(Clone, Debug)]
pub(crate) struct Selection<'a> {
    slots: [Slot<'a>; OUTPUT_KINDS],
}

impl<'a> Selection<'a> {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::Open),
        }
    }

    /// Choose outputs for every kind.
    ///
    /// An empty target disables its kind; a target that resolves is searched for an output of
    /// its kind. Kinds still open afterwards take the first discovered output of that kind.
    pub(crate) fn choose(catalog: &Catalog<'a>, targets: Option<&[String; OUTPUT_KINDS]>) -> Self {
        let mut selection = Self::new();
        if let Some(targets) = targets {
            for kind in OutputKind::ALL {
                let target = targets[kind.index()].as_str();
                if target.is_empty() {
                    selection.slots[kind.index()] = Slot::Disabled;
                } else if let Some(element) = catalog.doc.descendant(target) {
                    selection.add(catalog, Some(kind), element);
                }
            }
        }

        for element in discover(catalog) {
            if selection.is_full() {
                break;
            }
            selection.add(catalog, None, element);
        }
        selection
    }

    /// Fill open slots from `element`'s outputs; `kind` restricts which slot may be filled.
    fn add(&mut self, catalog: &Catalog<'a>, kind: Option<OutputKind>, element: ElementRef<'a>) {
        let done = |s: &Self| match kind {
            Some(kind) => !matches!(s.slots[kind.index()], Slot::Open),
            None => s.is_full(),
        };
        if done(self) {
            return;
        }
        for candidate in element_outputs(catalog, element) {
            let Some(actual) = candidate.kind() else {
                continue;
            };
            if kind.is_some_and(|k| k != actual) {
                continue;
            }
            let slot = &mut self.slots[actual.index()];
            if matches!(slot, Slot::Open) {
                *slot = Slot::Selected(candidate);
            }
            if done(self) {
                return;
            }
        }
    }

    fn is_full(&self) -> bool {
        self.slots.iter().all(|s| !matches!(s, Slot::Open))
    }

    /// `true` when no kind has an output to resolve.
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| !matches!(s, Slot::Selected(_)))
    }

    /// Chosen outputs paired with their kind.
    pub(crate) fn into_selected(self) -> impl Iterator<Item = (OutputKind, Candidate<'a>)> {
        OutputKind::ALL
            .into_iter()
            .zip(self.slots)
            .filter_map(|(kind, slot)| match slot {
                Slot::Selected(candidate) => Some((kind, candidate)),
                Slot::Open | Slot::Disabled => None,
            })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/loader/discover.rs"]
mod tests;
