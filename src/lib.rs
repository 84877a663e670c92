//! mtlx-translate turns MaterialX-style node-graph documents into native renderer material
//! graphs.
//!
//! The crate sits between an already-parsed document ([`Document`]) and a renderer's node API
//! ([`MaterialSystem`]). A [`Loader`] walks the document, picks the elements to render, and
//! builds one native node per source node it understands.
//!
//! # Pipeline overview
//!
//! 1. **Discover**: find the elements whose outputs can feed a surface or displacement slot.
//! 2. **Group**: outputs sharing a graph and shader reference share one graph construction.
//! 3. **Build**: resolve every required node, expand definitions implemented as graphs, and
//!    bind inputs through the static [`mapping`] table.
//! 4. **Coerce**: wrap plain values used as surfaces into a pass-through node.
//! 5. **Flatten**: hand every owned native handle to the caller in a [`LoadResult`].
//!
//! Unsupported constructs degrade gracefully: they are reported through `tracing` and skipped.
//! A load only comes back empty when no output kind could be resolved.
//!
//! # Getting started
//!
//! Implement [`MaterialSystem`] for the target renderer (or use
//! [`RecordingMaterialSystem`] to inspect the result), install the standard library with
//! [`Loader::setup_stdlib`], and call [`Loader::load`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod document;
mod foundation;
mod loader;
mod native;

/// Static table mapping standard node categories to native node types and input keys.
pub mod mapping;

pub use document::graph::{Catalog, ElementRef, GraphKey, GraphRef, select_output};
pub use document::model::{
    Document, GeomPropDef, Look, MULTI_OUTPUT_TYPE, Material, MaterialAssign, NodeDef, NodeGraph,
    SHADER_SEMANTIC, ShaderRef, SourceNode, SourceOutput, TypeDef, ValueElement,
    ValueElementKind,
};
pub use document::value::Value;
pub use foundation::error::{LoaderError, LoaderResult};
pub use loader::{
    ImageNode, LoadResult, Loader, LoaderOpts, OUTPUT_KINDS, OutputKind, RenderableElements,
    SEARCH_PATH_ENV_VAR, SearchPath,
};
pub use native::recording::{RecordedInput, RecordedNode, RecordingMaterialSystem};
pub use native::system::{MaterialSystem, NativeError, NodeHandle};
pub use native::types::{ArithmeticOp, InputKey, LookupValue, NativeNodeType};
