/// Convenience result type used across panelvault.
pub type PanelResult<T> = Result<T, PanelError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Variants are scoped to the smallest boundary that can absorb them: a transform request, a
/// single render target, or a single intercepted response.
#[derive(thiserror::Error, Debug)]
pub enum PanelError {
    /// Invalid user-provided configuration or raster geometry.
    #[error("validation error: {0}")]
    Validation(String),

    /// The background execution context could not be constructed or is gone.
    #[error("worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// The cipher port failed on the worker or synchronous path.
    #[error("transform failed: {0}")]
    Transform(String),

    /// Fetching page bytes failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Decoding fetched page bytes into a raster failed.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Wire codec decode/encode failed at the network boundary.
    #[error("codec error: {0}")]
    Codec(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PanelError {
    /// Build a [`PanelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PanelError::WorkerUnavailable`] value.
    pub fn worker_unavailable(msg: impl Into<String>) -> Self {
        Self::WorkerUnavailable(msg.into())
    }

    /// Build a [`PanelError::Transform`] value.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    /// Build a [`PanelError::Fetch`] value.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Build a [`PanelError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`PanelError::Codec`] value.
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Build a [`PanelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
