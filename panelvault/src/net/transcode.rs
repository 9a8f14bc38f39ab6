//! Response rewriting at the network boundary.
//!
//! Responses that declare the unsupported source codec are decoded, re-encoded to the target
//! codec and re-emitted with a long-lived immutable cache directive. Every other response is
//! returned untouched. Callers above this layer never learn that a transcode happened.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Response};
use tower::{BoxError, Layer, Service};

use crate::foundation::error::{PanelError, PanelResult};
use crate::net::mime::declared_format;
use crate::ports::codec::{Codec, WireFormat};

/// Cache directive attached to every transcoded response.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Which codec is rewritten, into what, and how.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TranscodeOpts {
    /// Codec the client cannot decode natively.
    pub source: WireFormat,
    /// Codec emitted instead.
    pub target: WireFormat,
    /// Encoder quality, 1..=100.
    ///
    /// Passed through to the codec, which may ignore it: [`crate::ImageCodec`] honours it for
    /// JPEG only and writes WebP losslessly, so the default target is unaffected.
    pub quality: u8,
    /// `Cache-Control` value of rewritten responses.
    pub cache_control: String,
}

impl Default for TranscodeOpts {
    fn default() -> Self {
        Self {
            source: WireFormat::Jxl,
            target: WireFormat::Webp,
            quality: 85,
            cache_control: IMMUTABLE_CACHE_CONTROL.to_string(),
        }
    }
}

/// Result of inspecting a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterceptDecision {
    /// Return the response as-is.
    Passthrough,
    /// Rewrite the body into the target codec.
    Transcode,
}

/// Decides per response and performs the rewrite.
#[derive(Clone)]
pub struct TranscodeInterceptor {
    codec: Arc<dyn Codec>,
    opts: Arc<TranscodeOpts>,
    cache_control: HeaderValue,
}

impl std::fmt::Debug for TranscodeInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscodeInterceptor")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl TranscodeInterceptor {
    /// Interceptor over `codec`. Fails if `opts` cannot produce a valid response.
    pub fn new(codec: Arc<dyn Codec>, opts: TranscodeOpts) -> PanelResult<Self> {
        if opts.source == opts.target {
            return Err(PanelError::validation(format!(
                "transcode source and target are both {}",
                opts.source
            )));
        }
        if !codec.can_encode(opts.target) {
            return Err(PanelError::validation(format!(
                "codec cannot encode {}",
                opts.target
            )));
        }
        let cache_control = HeaderValue::from_str(&opts.cache_control).map_err(|e| {
            PanelError::validation(format!("invalid cache directive '{}': {e}", opts.cache_control))
        })?;
        Ok(Self {
            codec,
            opts: Arc::new(opts),
            cache_control,
        })
    }

    /// Decide from the declared content type alone.
    pub fn inspect<B>(&self, response: &Response<B>) -> InterceptDecision {
        if declared_format(response) == Some(self.opts.source) {
            InterceptDecision::Transcode
        } else {
            InterceptDecision::Passthrough
        }
    }

    /// Decode `body` and re-encode it to the target codec.
    ///
    /// Pure in `body`: identical input yields identical output.
    pub fn transcode_body(&self, body: &[u8]) -> PanelResult<Bytes> {
        let raster = self.codec.decode(body).map_err(into_codec_error)?;
        let encoded = self
            .codec
            .encode(&raster, self.opts.target, self.opts.quality)
            .map_err(into_codec_error)?;
        Ok(Bytes::from(encoded))
    }

    /// Apply the interceptor to one response.
    ///
    /// Passthrough responses come back unchanged. A transcoded response keeps the status and
    /// HTTP version and carries only `Content-Type`, `Cache-Control` and `Content-Length`.
    /// Codec failures fail the whole response; nothing partial is emitted.
    #[tracing::instrument(skip_all, fields(status = %response.status()))]
    pub async fn intercept(&self, response: Response<Bytes>) -> PanelResult<Response<Bytes>> {
        if self.inspect(&response) == InterceptDecision::Passthrough {
            return Ok(response);
        }

        let (parts, body) = response.into_parts();
        let in_len = body.len();
        let this = self.clone();
        let out = tokio::task::spawn_blocking(move || this.transcode_body(&body))
            .await
            .map_err(|e| PanelError::codec(format!("transcode task: {e}")))??;
        tracing::debug!(
            from = %self.opts.source,
            to = %self.opts.target,
            in_len,
            out_len = out.len(),
            "transcoded response"
        );

        Response::builder()
            .status(parts.status)
            .version(parts.version)
            .header(CONTENT_TYPE, HeaderValue::from_static(self.opts.target.mime()))
            .header(CACHE_CONTROL, self.cache_control.clone())
            .header(CONTENT_LENGTH, out.len())
            .body(out)
            .map_err(|e| PanelError::codec(format!("build transcoded response: {e}")))
    }
}

fn into_codec_error(err: PanelError) -> PanelError {
    match err {
        PanelError::Codec(_) => err,
        other => PanelError::codec(other.to_string()),
    }
}

/// Tower layer placing a [`TranscodeInterceptor`] behind an origin service.
#[derive(Clone, Debug)]
pub struct TranscodeLayer {
    interceptor: TranscodeInterceptor,
}

impl TranscodeLayer {
    /// Layer applying `interceptor`.
    pub fn new(interceptor: TranscodeInterceptor) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for TranscodeLayer {
    type Service = TranscodeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TranscodeService {
            inner,
            interceptor: self.interceptor.clone(),
        }
    }
}

/// Service produced by [`TranscodeLayer`].
#[derive(Clone, Debug)]
pub struct TranscodeService<S> {
    inner: S,
    interceptor: TranscodeInterceptor,
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for TranscodeService<S>
where
    S: Service<http::Request<ReqBody>, Response = Response<Bytes>>,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = Response<Bytes>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: http::Request<ReqBody>) -> Self::Future {
        let response = self.inner.call(request);
        let interceptor = self.interceptor.clone();
        Box::pin(async move {
            let response = response.await.map_err(Into::<BoxError>::into)?;
            interceptor
                .intercept(response)
                .await
                .map_err(BoxError::from)
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/net/transcode.rs"]
mod tests;
