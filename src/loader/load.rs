use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use crate::document::graph::{Catalog, GraphKey, GraphRef, select_output};
use crate::document::model::{Document, ShaderRef, SourceOutput};
use crate::document::value::Value;
use crate::foundation::error::{LoaderError, LoaderResult};
use crate::loader::context::{Env, LogScope, LoaderContext, SearchPath};
use crate::loader::discover::{self, OUTPUT_KINDS, OutputKind, RenderableElements, Selection};
use crate::loader::graph::{build_composite, build_outputs, get_sub_node};
use crate::loader::node::{Binding, Leaf, Node, NodeId};
use crate::native::system::{MaterialSystem, NativeError, NodeHandle};

/// Options for one [`Loader::load`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoaderOpts {
    /// Directories searched first for relative file references.
    pub search_path: SearchPath,
    /// Explicit element name path per output kind.
    ///
    /// An empty entry disables that kind; an entry that does not resolve falls back to
    /// discovery for that kind. `None` discovers every kind.
    pub targets: Option<[String; OUTPUT_KINDS]>,
}

/// Deferred image binding: the caller loads `file` and attaches it to `node`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageNode {
    /// Resolved image path.
    pub file: String,
    /// Layer of a multi-layer file.
    pub layer: String,
    /// Fallback value when the file cannot be read.
    pub default_value: Option<Value>,
    /// Wrap mode outside `[0, 1]` along U.
    pub uaddressmode: String,
    /// Wrap mode outside `[0, 1]` along V.
    pub vaddressmode: String,
    /// Image texture node the image belongs to.
    pub node: NodeHandle,
}

/// Native graph produced by a load.
///
/// Every handle in `nodes` is owned by the caller and listed once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadResult {
    /// Owned native nodes.
    pub nodes: Vec<NodeHandle>,
    /// Index into `nodes` of each output kind's root, if resolved.
    pub root_indices: [Option<usize>; OUTPUT_KINDS],
    /// Images the caller still has to bind.
    pub image_nodes: Vec<ImageNode>,
}

impl LoadResult {
    /// Root handle of `kind`.
    pub fn root(&self, kind: OutputKind) -> Option<NodeHandle> {
        self.root_indices[kind.index()].and_then(|i| self.nodes.get(i).copied())
    }

    /// `true` when nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.root_indices.iter().all(Option::is_none)
    }

    /// Delete every owned node. All deletions are attempted; the first failure is returned.
    pub fn release(self, sys: &mut dyn MaterialSystem) -> Result<(), NativeError> {
        let mut first_err = None;
        for handle in self.nodes {
            if let Err(err) = sys.delete_node(handle) {
                tracing::warn!(node = handle.0, "failed to delete native node: {err}");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Translator front end: library setup plus the per-document [`Loader::load`] entry point.
#[derive(Clone, Debug)]
pub struct Loader {
    logging: bool,
    stdlib: Option<Document>,
    std_search_path: SearchPath,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// A loader searching the directories of the environment search path.
    pub fn new() -> Self {
        Self {
            logging: false,
            stdlib: None,
            std_search_path: SearchPath::from_env(),
        }
    }

    /// Enable or disable trace output. Errors are reported either way.
    pub fn set_logging(&mut self, enabled: bool) {
        self.logging = enabled;
    }

    /// Whether trace output is enabled.
    pub fn logging(&self) -> bool {
        self.logging
    }

    /// Install the standard library every document is resolved against.
    ///
    /// `search_path` is appended to the loader's search path.
    pub fn setup_stdlib(&mut self, library: Document, search_path: SearchPath) {
        self.stdlib = Some(library);
        self.std_search_path.append(&search_path);
    }

    /// The installed standard library.
    pub fn stdlib(&self) -> Option<&Document> {
        self.stdlib.as_ref()
    }

    /// Directories searched after the caller's search path.
    pub fn std_search_path(&self) -> &SearchPath {
        &self.std_search_path
    }

    /// Every renderable element of `doc`, per output kind.
    pub fn renderable_elements(&self, doc: &Document) -> RenderableElements {
        discover::renderable_elements(&Catalog::new(doc, self.stdlib.as_ref()))
    }

    /// Translate `doc` into native nodes created through `sys`.
    ///
    /// Unsupported or broken parts of the document are logged and skipped. The result is empty
    /// only when no output kind could be resolved; in that case every node created along the
    /// way has already been deleted.
    #[tracing::instrument(skip(self, doc, opts, sys), fields(document = %doc.name))]
    pub fn load(
        &self,
        doc: &Document,
        opts: &LoaderOpts,
        sys: &mut dyn MaterialSystem,
    ) -> LoadResult {
        let mut search_path = opts.search_path.clone();
        search_path.append(&self.std_search_path);
        let catalog = Catalog::new(doc, self.stdlib.as_ref());
        let mut ctx = LoaderContext::new(Env::new(sys, catalog, search_path, self.logging));

        ctx.scoped(LogScope::Global, doc.file_prefix.as_deref(), |ctx| {
            translate(ctx, opts.targets.as_ref())
        })
    }
}

/// Outputs sharing one graph and shader reference, built as one composite.
struct Group<'a> {
    graph: GraphRef<'a>,
    shader_ref: Option<&'a ShaderRef>,
    outputs: Vec<(OutputKind, Cow<'a, SourceOutput>)>,
}

fn translate<'a>(
    ctx: &mut LoaderContext<'a, '_>,
    targets: Option<&[String; OUTPUT_KINDS]>,
) -> LoadResult {
    let catalog = ctx.env.catalog;
    let selection = Selection::choose(&catalog, targets);
    if selection.is_empty() {
        ctx.env.error(
            line!(),
            format_args!("no renderable elements in {}", catalog.doc.name),
        );
        return LoadResult::default();
    }

    let mut groups: BTreeMap<(GraphKey, Option<String>), Group<'a>> = BTreeMap::new();
    for (kind, candidate) in selection.into_selected() {
        let key = (
            candidate.graph.key(),
            candidate.shader_ref.map(|sr| sr.name.clone()),
        );
        groups
            .entry(key)
            .or_insert_with(|| Group {
                graph: candidate.graph,
                shader_ref: candidate.shader_ref,
                outputs: Vec::new(),
            })
            .outputs
            .push((kind, candidate.output));
    }

    let mut built = Vec::new();
    let mut roots: [Option<NodeId>; OUTPUT_KINDS] = [None; OUTPUT_KINDS];
    for group in groups.into_values() {
        let required: Vec<&SourceOutput> = group.outputs.iter().map(|(_, o)| o.as_ref()).collect();
        let comp = match build_group(ctx, &group, &required) {
            Ok(comp) => comp,
            Err(err @ LoaderError::NoRenderableOutput(_)) => {
                ctx.env.log(format_args!("{err}"));
                continue;
            }
            Err(err) => {
                ctx.env.error(line!(), format_args!("{err}"));
                continue;
            }
        };
        built.push(comp);
        if let Some(shader_ref) = group.shader_ref {
            apply_bind_inputs(ctx, comp, shader_ref);
        }

        for (kind, output) in &group.outputs {
            let Some(leaf) = output_leaf(ctx, comp, output) else {
                ctx.env.error(
                    line!(),
                    format_args!("output {} of {} did not resolve", output.name, group.graph.name()),
                );
                continue;
            };
            let Some(handle) = ctx.nodes.leaf(leaf).and_then(|l| l.handle) else {
                ctx.env.error(
                    line!(),
                    format_args!(
                        "output {} of {} has no native node",
                        output.name,
                        group.graph.name()
                    ),
                );
                continue;
            };
            let root = if *kind == OutputKind::Surface && output.ty != "surfaceshader" {
                match wrap_surface(ctx, handle, &output.ty) {
                    Ok(wrap) => {
                        built.push(wrap);
                        wrap
                    }
                    Err(err) => {
                        ctx.env.error(
                            line!(),
                            format_args!("failed to wrap {}: {err}", output.name),
                        );
                        continue;
                    }
                }
            } else {
                leaf
            };
            roots[kind.index()] = Some(root);
        }
    }

    if roots.iter().all(Option::is_none) {
        ctx.env.error(
            line!(),
            format_args!("no output of {} could be resolved", catalog.doc.name),
        );
        ctx.nodes.release_owned(&mut *ctx.env.sys);
        return LoadResult::default();
    }
    flatten(ctx, &built, &roots)
}

/// Composite holding a group's outputs.
///
/// Document and free-standing graphs are built into the context caches, so nodes reached from
/// other groups are shared. A shader reference instantiates its own copy of the implementation
/// graph, since its bind inputs override that copy.
fn build_group<'a>(
    ctx: &mut LoaderContext<'a, '_>,
    group: &Group<'a>,
    required: &[&SourceOutput],
) -> LoaderResult<NodeId> {
    match (group.graph, group.shader_ref) {
        (graph, Some(_)) => build_composite(ctx, graph, Some(required)),
        (GraphRef::Document(_), None) => {
            let id = ctx.global_composite();
            build_outputs(ctx, id, Some(required)).map(|()| id)
        }
        (GraphRef::NodeGraph(node_graph), None) => ctx.free_standing_graph(node_graph, required),
    }
}

/// Apply a shader reference's bind inputs to the composite built for it.
fn apply_bind_inputs<'a>(ctx: &mut LoaderContext<'a, '_>, comp: NodeId, shader_ref: &'a ShaderRef) {
    for bind in &shader_ref.bind_inputs {
        if ctx.connect_to_global_output(bind, comp, bind) {
            continue;
        }
        let Some(value) = bind.value_str() else {
            continue;
        };
        ctx.env.log(format_args!(
            "Bindinput {}: {value} ({})",
            bind.name, bind.ty
        ));
        let bound = ctx.nodes.set_input(
            &mut ctx.env,
            comp,
            bind,
            Binding::Literal {
                value,
                ty: &bind.ty,
            },
        );
        if let Err(err) = bound {
            ctx.env.error(
                line!(),
                format_args!("bindinput {} of {}: {err}", bind.name, shader_ref.name),
            );
        }
    }
}

/// Leaf producing `output` of composite `comp`, looking one level into a nested composite.
fn output_leaf(ctx: &mut LoaderContext<'_, '_>, comp: NodeId, output: &SourceOutput) -> Option<NodeId> {
    let child = *ctx
        .nodes
        .composite(comp)?
        .children
        .get(output.node_name_str()?)?;
    let inner = match ctx.nodes.get(child)? {
        Node::Leaf(_) => return Some(child),
        Node::Composite(c) => c.graph,
    };

    let inner_output = match select_output(
        inner.ty(),
        inner.outputs(),
        output.output_str(),
        &output.name,
    ) {
        Ok(Some(name)) => inner.output(&name),
        Ok(None) => inner.outputs().first(),
        Err(err) => {
            ctx.env.error(line!(), format_args!("{err}"));
            None
        }
    }?;
    let node = get_sub_node(ctx, child, inner_output.node_name_str()?)?;
    ctx.nodes.leaf(node).is_some().then_some(node)
}

/// Generated pass-through that lets a plain value fill the surface slot.
fn wrap_surface(ctx: &mut LoaderContext<'_, '_>, handle: NodeHandle, ty: &str) -> LoaderResult<NodeId> {
    if !OutputKind::is_wrappable(ty) {
        return Err(LoaderError::coercion(format!("unknown type - {ty}")));
    }
    let leaf = Leaf::wrap(&mut ctx.env, handle)?;
    Ok(ctx.nodes.push(Node::Leaf(leaf)))
}

/// Move owned handles and image descriptors out of the arena, visiting each node once.
///
/// Handles left behind (nodes unreachable from any root or cache) are deleted.
fn flatten(
    ctx: &mut LoaderContext<'_, '_>,
    built: &[NodeId],
    roots: &[Option<NodeId>; OUTPUT_KINDS],
) -> LoadResult {
    let root_handles: [Option<NodeHandle>; OUTPUT_KINDS] = std::array::from_fn(|i| {
        roots[i].and_then(|id| ctx.nodes.leaf(id)).and_then(|l| l.handle)
    });

    let starts: Vec<NodeId> = built.iter().copied().chain(ctx.cached_roots()).collect();
    let mut visited = BTreeSet::new();
    let mut stack = Vec::new();
    let mut result = LoadResult::default();
    for start in starts {
        stack.push(start);
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            match ctx.nodes.get_mut(id) {
                Some(Node::Composite(c)) => stack.extend(c.children.values().rev().copied()),
                Some(Node::Leaf(leaf)) => collect_leaf(leaf, &mut result),
                None => {}
            }
        }
    }

    for (kind, handle) in root_handles.iter().enumerate() {
        result.root_indices[kind] = handle.and_then(|h| result.nodes.iter().position(|&n| n == h));
    }
    ctx.nodes.release_owned(&mut *ctx.env.sys);
    tracing::debug!(
        internal = ctx.nodes.len(),
        nodes = result.nodes.len(),
        images = result.image_nodes.len(),
        "load finished"
    );
    result
}

fn collect_leaf(leaf: &mut Leaf, result: &mut LoadResult) {
    let Some(handle) = leaf.handle else {
        return;
    };
    if let Some(params) = leaf.image_params_mut()
        && !params.file.is_empty()
    {
        let params = std::mem::take(params);
        result.image_nodes.push(ImageNode {
            file: params.file,
            layer: params.layer,
            default_value: params.default,
            uaddressmode: params.uaddressmode,
            vaddressmode: params.vaddressmode,
            node: handle,
        });
    }
    if leaf.owning {
        result.nodes.push(handle);
        leaf.owning = false;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/loader/load.rs"]
mod tests;
