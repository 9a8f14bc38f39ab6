//! Panelvault delivers copy-protected comic pages to a reader.
//!
//! Pages are stored with their pixels scrambled by a reversible [`Cipher`]. The reader restores
//! them lazily:
//!
//! - A [`VisibilityGate`] activates each page once, shortly before it scrolls into view.
//! - A [`PageRenderDriver`] fetches, decodes and decrypts the activated page.
//! - An [`OffloadDispatcher`] runs the cipher on a background thread, falling back to the
//!   caller's thread when the worker is unavailable or fails.
//! - A [`TranscodeLayer`] sits in front of the origin and rewrites image codecs the reader cannot
//!   decode into ones it can, with immutable cache semantics.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;
mod net;
mod offload;
mod ports;
mod protect;
mod view;

pub use crate::foundation::config::PipelineConfig;
pub use crate::foundation::error::{PanelError, PanelResult};
pub use crate::foundation::raster::{PixelRect, RasterBuffer, Surface};

pub use crate::ports::cipher::{Cipher, TransformKind};
pub use crate::ports::codec::{Codec, ImageCodec, WireFormat};
pub use crate::ports::tile_shuffle::{DEFAULT_TILE_SIZE, TileShuffleCipher};

pub use crate::offload::dispatcher::{DispatchStats, OffloadDispatcher, OffloadOpts, WorkerState};
pub use crate::offload::protocol::{
    RequestId, TransformOutcome, TransformRequest, TransformResult, handle_request,
};
pub use crate::offload::sync_exec::SyncExecutor;

pub use crate::view::driver::{PageRenderDriver, PageStatus, PageTarget};
pub use crate::view::fetch::{PageFetcher, ServiceFetcher};
pub use crate::view::preload::{PreloadOpts, PreloadPlan, PreloadReport, plan_preload, preload};
pub use crate::view::visibility::{
    IntersectionEntry, Observation, TargetId, VisibilityGate, VisibilityOpts, VisibilityState,
};

pub use crate::net::cache_policy::{CacheControlLayer, CacheControlService, CachePolicy};
pub use crate::net::mime::{content_type_essence, declared_format, is_supported_upload};
pub use crate::net::transcode::{
    IMMUTABLE_CACHE_CONTROL, InterceptDecision, TranscodeInterceptor, TranscodeLayer,
    TranscodeOpts, TranscodeService,
};

pub use crate::protect::{protect_image, reveal_image};

/// Geometry re-exported for building [`IntersectionEntry`] values.
pub use kurbo::Rect;
