//! Message schema exchanged with the background execution context.
//!
//! Requests serialize as `{"id", "type": "decrypt"|"encrypt", "imageData", "width", "height"}`,
//! results as `{"id", "type": "success", "imageData"}` or `{"id", "type": "error", "error"}`.

use crate::foundation::error::{PanelError, PanelResult};
use crate::foundation::raster::RasterBuffer;
use crate::offload::sync_exec::transform_raster;
use crate::ports::cipher::{Cipher, TransformKind};

/// Correlation id matching a request to its result.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One transform job. Created once, consumed exactly once by the worker.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    /// Correlation id.
    pub id: RequestId,
    /// Transform direction (`"type"` on the wire).
    #[serde(rename = "type")]
    pub kind: TransformKind,
    /// Source pixels.
    pub image_data: RasterBuffer,
    /// Declared width; must match `image_data`.
    pub width: u32,
    /// Declared height; must match `image_data`.
    pub height: u32,
}

impl TransformRequest {
    /// Build a request whose declared dimensions are taken from `raster`.
    pub fn new(id: RequestId, kind: TransformKind, raster: RasterBuffer) -> Self {
        Self {
            id,
            kind,
            width: raster.width,
            height: raster.height,
            image_data: raster,
        }
    }
}

/// Outcome half of a [`TransformResult`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransformOutcome {
    /// The transformed pixels.
    Success {
        /// Result raster.
        #[serde(rename = "imageData")]
        image_data: RasterBuffer,
    },
    /// Human-readable failure reason.
    #[serde(rename = "error")]
    Failure {
        /// Reason text.
        error: String,
    },
}

/// Reply for exactly one [`TransformRequest`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransformResult {
    /// Id of the request this answers.
    pub id: RequestId,
    /// Success or failure.
    #[serde(flatten)]
    pub outcome: TransformOutcome,
}

impl TransformResult {
    /// Convert into the caller-facing result.
    pub fn into_result(self) -> PanelResult<RasterBuffer> {
        match self.outcome {
            TransformOutcome::Success { image_data } => Ok(image_data),
            TransformOutcome::Failure { error } => Err(PanelError::transform(error)),
        }
    }
}

/// Background-side handling of one message: decode, run the transform, emit a result.
///
/// Never panics and never returns without a result; cipher errors and cipher panics both become
/// [`TransformOutcome::Failure`].
pub fn handle_request(cipher: &dyn Cipher, request: TransformRequest) -> TransformResult {
    let id = request.id;
    tracing::trace!(%id, kind = %request.kind, "decoding transform request");

    let outcome = match decode_request(&request) {
        Err(e) => failure(e.to_string()),
        Ok(()) => {
            tracing::trace!(%id, "running transform");
            match transform_raster(cipher, request.kind, &request.image_data) {
                Ok(image_data) => TransformOutcome::Success { image_data },
                Err(e) => failure(e.to_string()),
            }
        }
    };

    tracing::trace!(%id, ok = matches!(outcome, TransformOutcome::Success { .. }), "emitting result");
    TransformResult { id, outcome }
}

fn decode_request(request: &TransformRequest) -> PanelResult<()> {
    let raster = &request.image_data;
    if raster.width != request.width || raster.height != request.height {
        return Err(PanelError::validation(format!(
            "declared size {}x{} does not match image data {}x{}",
            request.width, request.height, raster.width, raster.height
        )));
    }
    raster.validate()
}

fn failure(error: String) -> TransformOutcome {
    TransformOutcome::Failure { error }
}

#[cfg(test)]
#[path = "../../tests/unit/offload/protocol.rs"]
mod tests;
