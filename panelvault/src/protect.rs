//! Whole-image helpers for the upload and export paths.
//!
//! Uploads are scrambled before they reach storage; exports restore the readable page. Both run
//! the cipher through an [`OffloadDispatcher`], so they share its fallback behavior.

use crate::foundation::error::{PanelError, PanelResult};
use crate::foundation::raster::RasterBuffer;
use crate::offload::dispatcher::OffloadDispatcher;
use crate::ports::cipher::TransformKind;
use crate::ports::codec::{Codec, WireFormat};

/// Decode `bytes`, encrypt the pixels and encode the result as `format`.
pub async fn protect_image(
    dispatcher: &mut OffloadDispatcher,
    codec: &dyn Codec,
    bytes: &[u8],
    format: WireFormat,
    quality: u8,
) -> PanelResult<Vec<u8>> {
    apply(dispatcher, codec, TransformKind::Encrypt, bytes, format, quality).await
}

/// Decode `bytes`, decrypt the pixels and encode the result as `format`.
pub async fn reveal_image(
    dispatcher: &mut OffloadDispatcher,
    codec: &dyn Codec,
    bytes: &[u8],
    format: WireFormat,
    quality: u8,
) -> PanelResult<Vec<u8>> {
    apply(dispatcher, codec, TransformKind::Decrypt, bytes, format, quality).await
}

async fn apply(
    dispatcher: &mut OffloadDispatcher,
    codec: &dyn Codec,
    kind: TransformKind,
    bytes: &[u8],
    format: WireFormat,
    quality: u8,
) -> PanelResult<Vec<u8>> {
    if !codec.can_encode(format) {
        return Err(PanelError::codec(format!("cannot encode {format}")));
    }
    let raster: RasterBuffer = codec.decode(bytes).map_err(|e| match e {
        PanelError::Codec(msg) => PanelError::decode(msg),
        other => other,
    })?;
    tracing::debug!(%kind, width = raster.width, height = raster.height, %format, "applying cipher");
    let out = dispatcher.submit(kind, raster).await?;
    codec.encode(&out, format, quality)
}

#[cfg(test)]
#[path = "../tests/unit/protect.rs"]
mod tests;
