use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::document::graph::{Catalog, GraphRef, select_output};
use crate::document::model::{
    GeomPropDef, NodeGraph, SourceNode, SourceOutput, ValueElement, non_empty,
};
use crate::foundation::error::{LoaderError, LoaderResult};
use crate::loader::graph;
use crate::loader::node::{Leaf, LeafRole, Node, NodeArena, NodeId};
use crate::native::system::MaterialSystem;
use crate::native::types::{InputKey, LookupValue, NativeNodeType};

/// Environment variable listing extra search directories.
pub const SEARCH_PATH_ENV_VAR: &str = "MATERIALX_SEARCH_PATH";

/// Ordered list of directories searched for relative file references.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SearchPath(Vec<PathBuf>);

impl SearchPath {
    /// An empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories listed in [`SEARCH_PATH_ENV_VAR`], split with the platform's path-list rules.
    pub fn from_env() -> Self {
        std::env::var_os(SEARCH_PATH_ENV_VAR)
            .map(|v| std::env::split_paths(&v).collect())
            .unwrap_or_default()
    }

    /// Append one directory.
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.0.push(dir.into());
    }

    /// Append every directory of `other`, keeping order.
    pub fn append(&mut self, other: &SearchPath) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Directories in search order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.0
    }

    /// `true` when no directory is listed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Locate `filename`.
    ///
    /// An absolute path resolves to itself if it exists. A relative path is joined onto each
    /// directory in order and the first existing file wins.
    pub fn find(&self, filename: impl AsRef<Path>) -> Option<PathBuf> {
        let filename = filename.as_ref();
        if filename.as_os_str().is_empty() {
            return None;
        }
        if filename.is_absolute() {
            return filename.exists().then(|| filename.to_path_buf());
        }
        self.0
            .iter()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.exists())
    }
}

impl FromIterator<PathBuf> for SearchPath {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Nesting level a diagnostic line is emitted at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LogScope {
    Global,
    Graph,
    Node,
    Input,
}

const GLOBAL_LOG_DEPTH: i32 = -1;
const LOG_COLUMNS_PER_DEPTH: usize = 3;

impl LogScope {
    fn column(self) -> Option<usize> {
        match self {
            Self::Global => None,
            Self::Graph => Some(0),
            Self::Node => Some(1),
            Self::Input => Some(2),
        }
    }
}

/// Services shared by every node during one load: the renderer, the document, file
/// resolution, and the nesting-aware logger.
pub(crate) struct Env<'a, 's> {
    pub(crate) sys: &'s mut dyn MaterialSystem,
    pub(crate) catalog: Catalog<'a>,
    search_path: SearchPath,
    file_prefix: String,
    log_enabled: bool,
    log_depth: i32,
    log_scope: LogScope,
}

impl<'a, 's> Env<'a, 's> {
    pub(crate) fn new(
        sys: &'s mut dyn MaterialSystem,
        catalog: Catalog<'a>,
        search_path: SearchPath,
        log_enabled: bool,
    ) -> Self {
        Self {
            sys,
            catalog,
            search_path,
            file_prefix: String::new(),
            log_enabled,
            log_depth: GLOBAL_LOG_DEPTH,
            log_scope: LogScope::Global,
        }
    }

    /// Indentation of the current scope, or `None` at global scope.
    pub(crate) fn indent(&self) -> Option<usize> {
        let column = self.log_scope.column()?;
        let depth = usize::try_from(self.log_depth.max(0)).unwrap_or(0);
        Some(depth * LOG_COLUMNS_PER_DEPTH + column)
    }

    pub(crate) fn log(&self, args: fmt::Arguments<'_>) {
        if !self.log_enabled {
            return;
        }
        match self.indent() {
            None => tracing::debug!("{args}"),
            Some(pad) => tracing::debug!("{:pad$}- {args}", ""),
        }
    }

    /// Errors are reported regardless of the logging flag.
    pub(crate) fn error(&self, site: u32, args: fmt::Arguments<'_>) {
        tracing::warn!(site = site, "loader error ({site}): {args}");
    }

    /// Apply the innermost file prefix and search for the result; empty when unresolved.
    pub(crate) fn resolve_file(&self, filename: &str) -> String {
        let full = format!("{}{}", self.file_prefix, filename);
        self.search_path
            .find(&full)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Memoization state of a free-standing node graph. Both states hold the graph's composite.
#[derive(Clone, Copy, Debug)]
enum FreeStanding {
    Building(NodeId),
    Built(NodeId),
}

/// Per-load state: the node arena, the environment, and the three cross-graph caches.
pub(crate) struct LoaderContext<'a, 's> {
    pub(crate) env: Env<'a, 's>,
    pub(crate) nodes: NodeArena<'a>,
    global: Option<NodeId>,
    free_standing: BTreeMap<String, FreeStanding>,
    geom: BTreeMap<String, NodeId>,
}

impl<'a, 's> LoaderContext<'a, 's> {
    pub(crate) fn new(env: Env<'a, 's>) -> Self {
        Self {
            env,
            nodes: NodeArena::default(),
            global: None,
            free_standing: BTreeMap::new(),
            geom: BTreeMap::new(),
        }
    }

    /// Run `f` inside a nested log scope, optionally overriding the file prefix.
    ///
    /// Depth, scope, and prefix are restored when `f` returns.
    pub(crate) fn scoped<R>(
        &mut self,
        scope: LogScope,
        file_prefix: Option<&str>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let prev_depth = self.env.log_depth;
        let prev_scope = self.env.log_scope;
        let prev_prefix = non_empty(file_prefix)
            .map(|p| std::mem::replace(&mut self.env.file_prefix, p.to_owned()));

        self.env.log_scope = scope;
        match scope {
            LogScope::Global => self.env.log_depth = GLOBAL_LOG_DEPTH,
            LogScope::Graph => self.env.log_depth += 1,
            LogScope::Node | LogScope::Input => {}
        }

        let out = f(self);

        self.env.log_depth = prev_depth;
        self.env.log_scope = prev_scope;
        if let Some(prefix) = prev_prefix {
            self.env.file_prefix = prefix;
        }
        out
    }

    /// Composite of the document's top-level graph, created empty on first use.
    pub(crate) fn global_composite(&mut self) -> NodeId {
        match self.global {
            Some(id) => id,
            None => {
                let doc = self.env.catalog.doc;
                let id = graph::lazy_composite(self, GraphRef::Document(doc));
                self.global = Some(id);
                id
            }
        }
    }

    /// Node for a document-scope source node, built inside the top-level graph.
    pub(crate) fn global_node(&mut self, node: &'a SourceNode) -> Option<NodeId> {
        let doc = self.env.catalog.doc;
        let global = self.global_composite();
        self.scoped(LogScope::Global, doc.file_prefix.as_deref(), |ctx| {
            graph::get_sub_node(ctx, global, &node.name)
        })
    }

    /// Composite for a named graph reached outside any definition instantiation, with the
    /// nodes behind `required` built.
    ///
    /// One composite exists per graph and load; later requests build their outputs into it. A
    /// graph requested while it is still being built closes a cycle.
    pub(crate) fn free_standing_graph(
        &mut self,
        node_graph: &'a NodeGraph,
        required: &[&SourceOutput],
    ) -> LoaderResult<NodeId> {
        let id = match self.free_standing.get(&node_graph.name) {
            Some(FreeStanding::Built(id)) => *id,
            Some(FreeStanding::Building(_)) => {
                return Err(LoaderError::cycle(format!(
                    "node graph {} depends on itself",
                    node_graph.name
                )));
            }
            None => graph::lazy_composite(self, GraphRef::NodeGraph(node_graph)),
        };

        self.free_standing
            .insert(node_graph.name.clone(), FreeStanding::Building(id));
        let built = graph::build_outputs(self, id, Some(required));
        self.free_standing
            .insert(node_graph.name.clone(), FreeStanding::Built(id));
        built.map(|()| id)
    }

    /// Lookup node exposing an intrinsic geometric property, memoized by definition name.
    pub(crate) fn geom_node(&mut self, def: &GeomPropDef) -> Option<NodeId> {
        if let Some(&id) = self.geom.get(&def.name) {
            return Some(id);
        }
        match self.create_geom_node(def) {
            Ok(id) => {
                self.geom.insert(def.name.clone(), id);
                Some(id)
            }
            Err(err) => {
                self.env.error(line!(), format_args!("geomprop {}: {err}", def.name));
                None
            }
        }
    }

    fn create_geom_node(&mut self, def: &GeomPropDef) -> LoaderResult<NodeId> {
        if def.geom_prop.is_empty() || def.ty.is_empty() {
            return Err(LoaderError::malformed(format!(
                "invalid geompropdef: {}",
                def.name
            )));
        }

        let lookup = match def.geom_prop.as_str() {
            "texcoord" => {
                if def.ty != "vector2" {
                    self.env.error(
                        line!(),
                        format_args!("unexpected type for texcoord geomprop: {}", def.ty),
                    );
                }
                match def.index.as_deref().unwrap_or("") {
                    "" | "0" => LookupValue::Uv,
                    "1" => LookupValue::Uv1,
                    other => {
                        return Err(LoaderError::unsupported(format!(
                            "texcoord index {other}"
                        )));
                    }
                }
            }
            "normal" => match def.space.as_deref() {
                Some("world") => LookupValue::N,
                other => {
                    return Err(LoaderError::unsupported(format!(
                        "normal space \"{}\"",
                        other.unwrap_or("")
                    )));
                }
            },
            "position" => match def.space.as_deref() {
                Some("world") => LookupValue::P,
                _ => LookupValue::PLocal,
            },
            other => {
                return Err(LoaderError::unsupported(format!("geom node: {other}")));
            }
        };

        let leaf = Leaf::create(
            &mut self.env,
            NativeNodeType::InputLookup,
            LeafRole::Plain,
            Some(&def.name),
            |sys, h| sys.set_input_uint(h, InputKey::Value, lookup.id()),
        )?;
        Ok(self.nodes.push(Node::Leaf(leaf)))
    }

    /// Wire `input` on `downstream` to a free-standing graph output or a document-scope output.
    ///
    /// Returns `true` when the connection was made.
    pub(crate) fn connect_to_global_output(
        &mut self,
        input: &'a ValueElement,
        downstream: NodeId,
        downstream_input: &ValueElement,
    ) -> bool {
        let Some(output_name) = input.output_str() else {
            return false;
        };
        let doc = self.env.catalog.doc;

        if let Some(graph_name) = non_empty(input.node_graph.as_deref()) {
            let Some(node_graph) = doc.node_graph(graph_name) else {
                self.env.error(
                    line!(),
                    format_args!("node graph {graph_name} cannot be found"),
                );
                return false;
            };
            let Some(output) = node_graph.outputs.iter().find(|o| o.name == output_name) else {
                self.env.error(
                    line!(),
                    format_args!("node graph {graph_name} has no output {output_name}"),
                );
                return false;
            };
            let graph_node = match self.free_standing_graph(node_graph, &[output]) {
                Ok(id) => id,
                Err(err) => {
                    self.env.error(line!(), format_args!("{err}"));
                    return false;
                }
            };
            self.env.log(format_args!(
                "Bindinput {}: {graph_name}:{output_name} (nodegraph)",
                input.name
            ));
            return self.report_connect(graph_node, Some(output_name), downstream, downstream_input);
        }

        let Some(global_output) = doc.output(output_name) else {
            return false;
        };
        let Some(global_node) = global_output
            .node_name_str()
            .and_then(|name| doc.node(name))
        else {
            return false;
        };
        let Some(node_def) = self.env.catalog.node_def_for(global_node) else {
            return false;
        };
        let selected = match select_output(
            &node_def.ty,
            &node_def.outputs,
            global_output.output_str(),
            &global_output.name,
        ) {
            Ok(selected) => selected,
            Err(err) => {
                self.env.error(line!(), format_args!("{err}"));
                return false;
            }
        };
        let Some(node) = self.global_node(global_node) else {
            return false;
        };
        self.env.log(format_args!(
            "Bindinput {}: {output_name} (output)",
            input.name
        ));
        self.report_connect(node, selected.as_deref(), downstream, downstream_input)
    }

    fn report_connect(
        &mut self,
        upstream: NodeId,
        output: Option<&str>,
        downstream: NodeId,
        input: &ValueElement,
    ) -> bool {
        match self
            .nodes
            .connect(&mut self.env, upstream, output, downstream, input)
        {
            Ok(()) => true,
            Err(err) => {
                self.env.error(line!(), format_args!("failed to bind {}: {err}", input.name));
                false
            }
        }
    }

    /// Cache roots visited by the flattening pass, in a fixed order.
    pub(crate) fn cached_roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.global
            .into_iter()
            .chain(self.geom.values().copied())
            .chain(self.free_standing.values().map(|s| match s {
                FreeStanding::Building(id) | FreeStanding::Built(id) => *id,
            }))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/loader/context.rs"]
mod tests;
