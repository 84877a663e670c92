//! Graph resolver: turns source graphs into composite nodes.
//!
//! Children are created on demand, starting from the nodes a required output names. Upstream
//! nodes reached through `nodename` references are built through an explicit worklist instead
//! of recursion, and every child is memoized in its composite before its own inputs are bound.

use crate::document::graph::{GraphRef, select_output};
use crate::document::model::{SourceNode, SourceOutput, ValueElement, non_empty};
use crate::foundation::error::{LoaderError, LoaderResult};
use crate::loader::context::{Env, LogScope, LoaderContext};
use crate::loader::node::{Binding, CompositeNode, Leaf, LeafRole, Node, NodeId, Socket};
use crate::mapping::{self, IMAGE, MappingEntry, SQRT, SWIZZLE_X, SWIZZLE_Y};
use crate::native::types::{ArithmeticOp, InputKey, LookupValue, NativeNodeType};

/// A connection waiting for its upstream node to be created.
///
/// The root entry carries only the requested node.
#[derive(Debug)]
struct Pending<'a> {
    downstream: &'a SourceNode,
    input: Option<&'a ValueElement>,
    upstream: Option<&'a SourceNode>,
    output: Option<String>,
}

/// Push an empty composite for `graph`; children are filled in by [`get_sub_node`].
pub(crate) fn lazy_composite<'a>(ctx: &mut LoaderContext<'a, '_>, graph: GraphRef<'a>) -> NodeId {
    ctx.nodes.push(Node::Composite(CompositeNode::new(graph)))
}

/// Build a composite for `graph`, creating the nodes behind `required` (all outputs when
/// `None`).
///
/// Fails with [`LoaderError::NoRenderableOutput`] when no required output yields a node; the
/// partially built composite stays in the arena and is released with everything else.
pub(crate) fn build_composite<'a>(
    ctx: &mut LoaderContext<'a, '_>,
    graph: GraphRef<'a>,
    required: Option<&[&SourceOutput]>,
) -> LoaderResult<NodeId> {
    let id = lazy_composite(ctx, graph);
    build_outputs(ctx, id, required).map(|()| id)
}

/// Create the nodes behind `required` (all outputs when `None`) inside the existing composite
/// `id`. Children built earlier are reused.
pub(crate) fn build_outputs<'a>(
    ctx: &mut LoaderContext<'a, '_>,
    id: NodeId,
    required: Option<&[&SourceOutput]>,
) -> LoaderResult<()> {
    let graph = ctx
        .nodes
        .composite(id)
        .map(|c| c.graph)
        .ok_or_else(|| LoaderError::malformed("node is not a graph"))?;
    ctx.env.log(format_args!("NodeGraph: {}", graph.name()));
    ctx.scoped(LogScope::Graph, graph.file_prefix(), |ctx| {
        let all: Vec<&SourceOutput>;
        let required = match required {
            Some(required) => required,
            None => {
                all = graph.outputs().iter().collect();
                &all
            }
        };

        let mut any = false;
        for output in required {
            let node_name = output.node_name_str().unwrap_or("");
            ctx.env
                .log(format_args!("Output: {} -> {node_name}", output.name));
            if get_sub_node(ctx, id, node_name).is_some() {
                any = true;
            } else {
                ctx.env.error(
                    line!(),
                    format_args!(
                        "failed to create node {node_name} for output {} in {}",
                        output.name,
                        graph.name()
                    ),
                );
            }
        }

        if any {
            Ok(())
        } else {
            Err(LoaderError::no_output(graph.name()))
        }
    })
}

/// Child `name` of composite `comp`, creating it and everything upstream of it on first use.
pub(crate) fn get_sub_node<'a>(
    ctx: &mut LoaderContext<'a, '_>,
    comp: NodeId,
    name: &str,
) -> Option<NodeId> {
    let composite = ctx.nodes.composite(comp)?;
    if let Some(&id) = composite.children.get(name) {
        return Some(id);
    }
    let graph = composite.graph;
    let Some(root) = graph.node(name) else {
        ctx.env.error(
            line!(),
            format_args!("no node named {name} in {}", graph.name()),
        );
        return None;
    };

    let mut pending = vec![Pending {
        downstream: root,
        input: None,
        upstream: None,
        output: None,
    }];
    let mut created = None;
    while let Some(conn) = pending.pop() {
        let downstream = create_sub_node(ctx, comp, conn.downstream, &mut pending);
        let upstream = conn
            .upstream
            .and_then(|up| create_sub_node(ctx, comp, up, &mut pending));

        if let (Some(down), Some(up), Some(up_src), Some(input)) =
            (downstream, upstream, conn.upstream, conn.input)
        {
            let connected = connect_children(
                ctx,
                comp,
                (&up_src.name, up),
                conn.output.as_deref(),
                (&conn.downstream.name, down),
                input,
            );
            match connected {
                Ok(()) => ctx
                    .env
                    .log(format_args!("Connected {} -> {}", up_src.name, conn.downstream.name)),
                Err(err) => ctx.env.error(
                    line!(),
                    format_args!(
                        "failed to connect {} to {}.{}: {err}",
                        up_src.name, conn.downstream.name, input.name
                    ),
                ),
            }
        }

        if std::ptr::eq(conn.downstream, root) {
            created = downstream;
        }
    }
    created
}

/// Wire two children of the same composite, refusing edges that would close a cycle.
fn connect_children(
    ctx: &mut LoaderContext<'_, '_>,
    comp: NodeId,
    (up_name, up): (&str, NodeId),
    output: Option<&str>,
    (down_name, down): (&str, NodeId),
    input: &ValueElement,
) -> LoaderResult<()> {
    if let Some(c) = ctx.nodes.composite(comp)
        && c.depends_on(up_name, down_name)
    {
        return Err(LoaderError::cycle(format!(
            "{up_name} -> {down_name} in {}",
            c.graph.name()
        )));
    }
    ctx.nodes.connect(&mut ctx.env, up, output, down, input)?;
    if let Some(c) = ctx.nodes.composite_mut(comp) {
        c.record_edge(up_name, down_name);
    }
    Ok(())
}

/// Memoized creation of one child plus the binding of its inputs.
///
/// Unresolved upstream references are appended to `pending`.
fn create_sub_node<'a>(
    ctx: &mut LoaderContext<'a, '_>,
    comp: NodeId,
    src: &'a SourceNode,
    pending: &mut Vec<Pending<'a>>,
) -> Option<NodeId> {
    if let Some(&id) = ctx
        .nodes
        .composite(comp)
        .and_then(|c| c.children.get(&src.name))
    {
        return Some(id);
    }

    ctx.env
        .log(format_args!("Node: {} ({})", src.name, src.category));
    ctx.scoped(LogScope::Node, src.file_prefix.as_deref(), |ctx| {
        let id = match create_node(ctx, src) {
            Ok(id) => id,
            Err(err)
                if err.is_unsupported() || matches!(err, LoaderError::NoRenderableOutput(_)) =>
            {
                ctx.env.log(format_args!("{err}"));
                return None;
            }
            Err(err) => {
                ctx.env.error(
                    line!(),
                    format_args!("failed to create {} ({}): {err}", src.name, src.category),
                );
                return None;
            }
        };
        ctx.nodes
            .composite_mut(comp)?
            .children
            .insert(src.name.clone(), id);

        let Some(node_def) = ctx.env.catalog.node_def_for(src) else {
            ctx.env.error(
                line!(),
                format_args!("no definition for {} ({})", src.name, src.category),
            );
            return Some(id);
        };
        for def_input in &node_def.inputs {
            let tag = if def_input.is_input() { "Input" } else { "Param" };
            ctx.env.log(format_args!("{tag}: {}", def_input.name));
            ctx.scoped(LogScope::Input, def_input.file_prefix.as_deref(), |ctx| {
                resolve_input(ctx, comp, id, src, def_input, pending);
            });
        }
        Some(id)
    })
}

/// Create the internal node for `src`: a bespoke leaf, a mapped leaf, or an expanded
/// definition graph.
fn create_node<'a>(ctx: &mut LoaderContext<'a, '_>, src: &'a SourceNode) -> LoaderResult<NodeId> {
    let env = &mut ctx.env;
    let name = Some(src.name.as_str());
    let leaf = match src.category.as_str() {
        "surface" => Leaf::forwarding(LeafRole::Surface),
        "displacement" => Leaf::forwarding(LeafRole::Displacement {
            source: src.name.clone(),
        }),
        "texcoord" => lookup_leaf(env, LookupValue::Uv, name)?,
        "normal" => lookup_leaf(env, LookupValue::N, name)?,
        "sqrt" => Leaf::create(
            env,
            NativeNodeType::Arithmetic,
            LeafRole::Mapped(&SQRT),
            name,
            |sys, h| {
                sys.set_input_uint(h, InputKey::Op, ArithmeticOp::Pow.id())?;
                sys.set_input_floats(h, InputKey::Color1, [0.5, 0.5, 0.5, 1.0])
            },
        )?,
        "image" => Leaf::create(
            env,
            IMAGE.ty,
            LeafRole::Image(Box::default()),
            name,
            |_, _| Ok(()),
        )?,
        "swizzle" => mapped_leaf(env, swizzle_entry(src)?, name)?,
        category => match mapping::lookup_typed(category, &src.ty) {
            Some(entry) => mapped_leaf(env, entry, name)?,
            None => return expand_definition(ctx, src),
        },
    };
    Ok(ctx.nodes.push(Node::Leaf(leaf)))
}

fn lookup_leaf(env: &mut Env<'_, '_>, value: LookupValue, name: Option<&str>) -> LoaderResult<Leaf> {
    Leaf::create(
        env,
        NativeNodeType::InputLookup,
        LeafRole::Plain,
        name,
        |sys, h| sys.set_input_uint(h, InputKey::Value, value.id()),
    )
}

fn mapped_leaf(
    env: &mut Env<'_, '_>,
    entry: &'static MappingEntry,
    name: Option<&str>,
) -> LoaderResult<Leaf> {
    Leaf::create(env, entry.ty, LeafRole::Mapped(entry), name, |sys, h| {
        match entry.op {
            Some(op) => sys.set_input_uint(h, InputKey::Op, op.id()),
            None => Ok(()),
        }
    })
}

/// Single-channel swizzles only.
fn swizzle_entry(src: &SourceNode) -> LoaderResult<&'static MappingEntry> {
    let channels = src
        .input("channels")
        .filter(|c| c.ty == "string")
        .and_then(ValueElement::value_str)
        .ok_or_else(|| LoaderError::malformed(format!("swizzle {} has no channels", src.name)))?;
    match channels {
        "x" => Ok(&SWIZZLE_X),
        "y" => Ok(&SWIZZLE_Y),
        other => Err(LoaderError::unsupported(format!(
            "swizzle channels {other}"
        ))),
    }
}

/// Instantiate the graph implementing `src`'s definition as a nested composite.
fn expand_definition<'a>(
    ctx: &mut LoaderContext<'a, '_>,
    src: &'a SourceNode,
) -> LoaderResult<NodeId> {
    let implementation = ctx
        .env
        .catalog
        .node_def_for(src)
        .and_then(|nd| ctx.env.catalog.implementation_graph(nd));
    match implementation {
        Some(graph) => build_composite(ctx, GraphRef::NodeGraph(graph), None),
        None => Err(LoaderError::unsupported(format!(
            "node {} ({})",
            src.category, src.ty
        ))),
    }
}

/// Bind one definition input of `node`: a connection, a geometric default, or a literal.
fn resolve_input<'a>(
    ctx: &mut LoaderContext<'a, '_>,
    comp: NodeId,
    node: NodeId,
    src: &'a SourceNode,
    def_input: &'a ValueElement,
    pending: &mut Vec<Pending<'a>>,
) {
    let Some(graph) = ctx.nodes.composite(comp).map(|c| c.graph) else {
        return;
    };

    let mut element = def_input;
    if let Some(instance) = src.input(&def_input.name) {
        match instance.interface_name_str() {
            Some(interface) => {
                if let Some(c) = ctx.nodes.composite_mut(comp) {
                    c.sockets
                        .entry(interface.to_owned())
                        .or_default()
                        .push(Socket {
                            child: src.name.clone(),
                            input: def_input,
                        });
                }
                if let Some(default) = graph
                    .node_def(&ctx.env.catalog)
                    .and_then(|nd| nd.input(interface))
                {
                    element = default;
                }
            }
            None => element = instance,
        }
    }

    if element.is_input() {
        if let Some(upstream) = element.node_name_str()
            && connect_upstream(ctx, comp, graph, (src, node), def_input, element, upstream, pending)
        {
            return;
        }
        if ctx.connect_to_global_output(element, node, def_input) {
            return;
        }
        if let Some(geom_prop) = non_empty(element.default_geom_prop.as_deref()) {
            match ctx.env.catalog.geom_prop_def(geom_prop) {
                Some(def) => {
                    if let Some(geom) = ctx.geom_node(def)
                        && let Err(err) = ctx.nodes.connect(&mut ctx.env, geom, None, node, def_input)
                    {
                        report_bind(
                            &ctx.env,
                            line!(),
                            &err,
                            format_args!("failed to bind {geom_prop} to {}", def_input.name),
                        );
                    }
                }
                None => ctx
                    .env
                    .error(line!(), format_args!("unknown defaultgeomprop {geom_prop}")),
            }
            return;
        }
    }

    if let Some(value) = element.value_str() {
        ctx.env.log(format_args!("{value}"));
        let bound = ctx.nodes.set_input(
            &mut ctx.env,
            node,
            def_input,
            Binding::Literal {
                value,
                ty: &element.ty,
            },
        );
        if let Err(err) = bound {
            report_bind(
                &ctx.env,
                line!(),
                &err,
                format_args!("failed to set {}.{} = {value}", src.name, def_input.name),
            );
        }
    }
}

/// Inputs outside a node's known set are traced; anything else is an error.
fn report_bind(env: &Env<'_, '_>, site: u32, err: &LoaderError, what: std::fmt::Arguments<'_>) {
    if err.is_unsupported() {
        env.log(format_args!("{what}: {err}"));
    } else {
        env.error(site, format_args!("{what}: {err}"));
    }
}

/// Connect `element`'s `nodename` reference, deferring it when the upstream child does not
/// exist yet.
///
/// Returns `true` when nothing else should be tried for this input. Only an unsupported
/// input falls through to the next path.
#[allow(clippy::too_many_arguments)]
fn connect_upstream<'a>(
    ctx: &mut LoaderContext<'a, '_>,
    comp: NodeId,
    graph: GraphRef<'a>,
    (src, node): (&'a SourceNode, NodeId),
    def_input: &'a ValueElement,
    element: &ValueElement,
    upstream_name: &str,
    pending: &mut Vec<Pending<'a>>,
) -> bool {
    ctx.env.log(format_args!("nodename: {upstream_name}"));
    let Some(upstream) = graph.node(upstream_name) else {
        ctx.env.error(
            line!(),
            format_args!("node {upstream_name} cannot be found in {}", graph.name()),
        );
        return true;
    };

    let outputs = ctx
        .env
        .catalog
        .node_def_for(upstream)
        .map_or(&[][..], |nd| nd.outputs.as_slice());
    let output = match select_output(&upstream.ty, outputs, element.output_str(), &element.name) {
        Ok(output) => output,
        Err(err) => {
            ctx.env.error(line!(), format_args!("{err}"));
            return true;
        }
    };

    let existing = ctx
        .nodes
        .composite(comp)
        .and_then(|c| c.children.get(upstream_name).copied());
    let Some(up) = existing else {
        pending.push(Pending {
            downstream: src,
            input: Some(def_input),
            upstream: Some(upstream),
            output,
        });
        return true;
    };

    match connect_children(
        ctx,
        comp,
        (upstream_name, up),
        output.as_deref(),
        (&src.name, node),
        def_input,
    ) {
        Ok(()) => {
            ctx.env
                .log(format_args!("Connected {upstream_name} -> {}", src.name));
            true
        }
        // Unknown inputs leave the other resolution paths open.
        Err(err) if err.is_unsupported() => {
            ctx.env.log(format_args!(
                "{upstream_name} -> {}.{}: {err}",
                src.name, def_input.name
            ));
            false
        }
        Err(err) => {
            ctx.env.error(
                line!(),
                format_args!(
                    "failed to connect {upstream_name} to {}.{}: {err}",
                    src.name, def_input.name
                ),
            );
            true
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/loader/graph.rs"]
mod tests;
