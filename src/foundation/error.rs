use crate::native::system::NativeError;

/// Convenience result type used across the translator.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Top-level error taxonomy used by the translator.
///
/// Most variants are recovered locally (per input or per node) and only surface through the
/// diagnostic log; see [`crate::Loader::load`] for the propagation policy.
#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    /// A category, input name, or value type without a native mapping.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A reference to a node, output, or graph that cannot be resolved.
    #[error("malformed reference: {0}")]
    MalformedReference(String),

    /// The renderer collaborator rejected a call.
    #[error("native call failed: {0}")]
    Native(#[from] NativeError),

    /// A graph or document exposes no resolvable output.
    #[error("no renderable output: {0}")]
    NoRenderableOutput(String),

    /// A surface output whose type cannot be wrapped into a shader slot.
    #[error("coercion failed: {0}")]
    Coercion(String),

    /// A connection that would close a dependency cycle.
    #[error("cycle detected: {0}")]
    Cycle(String),

    /// Errors when deserializing a document model.
    #[error("document error: {0}")]
    Document(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LoaderError {
    /// Build a [`LoaderError::Unsupported`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Build a [`LoaderError::MalformedReference`] value.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedReference(msg.into())
    }

    /// Build a [`LoaderError::NoRenderableOutput`] value.
    pub fn no_output(msg: impl Into<String>) -> Self {
        Self::NoRenderableOutput(msg.into())
    }

    /// Build a [`LoaderError::Coercion`] value.
    pub fn coercion(msg: impl Into<String>) -> Self {
        Self::Coercion(msg.into())
    }

    /// Build a [`LoaderError::Cycle`] value.
    pub fn cycle(msg: impl Into<String>) -> Self {
        Self::Cycle(msg.into())
    }

    /// Build a [`LoaderError::Document`] value.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// `true` for errors that only mean "this input is not part of the node's known set".
    ///
    /// Callers treat those as a signal to try the next resolution path rather than a failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::Unsupported(_) | Self::Native(NativeError::Unsupported)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
