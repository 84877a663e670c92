//! Document-to-native translation.
//!
//! [`load::Loader`] drives discovery, composite construction, coercion, and flattening. The
//! remaining modules are the building blocks it shares with nested graph instantiation.

pub(crate) mod context;
pub(crate) mod discover;
pub(crate) mod graph;
pub(crate) mod load;
pub(crate) mod node;

pub use context::{SEARCH_PATH_ENV_VAR, SearchPath};
pub use discover::{OUTPUT_KINDS, OutputKind, RenderableElements};
pub use load::{ImageNode, LoadResult, Loader, LoaderOpts};
