use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::HeaderValue;
use http::header::CACHE_CONTROL;
use tower::{Layer, Service};

use crate::net::transcode::IMMUTABLE_CACHE_CONTROL;

const STATIC_EXTENSIONS: [&str; 14] = [
    "jpg", "jpeg", "png", "gif", "webp", "avif", "jxl", "css", "js", "woff", "woff2", "ttf", "eot",
    "svg",
];

/// Origin-side cache directive chosen from the request path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// Static asset: cache for a year, never revalidate.
    Immutable,
    /// API response: cache for five minutes.
    ShortLived,
    /// Everything else.
    NoCache,
}

impl CachePolicy {
    /// Pick the policy for `path` (no query string).
    pub fn for_path(path: &str) -> Self {
        let is_static = path.rsplit_once('.').is_some_and(|(_, ext)| {
            STATIC_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        });
        if is_static {
            Self::Immutable
        } else if path.starts_with("/api/") {
            Self::ShortLived
        } else {
            Self::NoCache
        }
    }

    /// The `Cache-Control` value.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Immutable => IMMUTABLE_CACHE_CONTROL,
            Self::ShortLived => "public, max-age=300",
            Self::NoCache => "no-cache",
        }
    }
}

/// Tower layer that overwrites `Cache-Control` on every response according to [`CachePolicy`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheControlLayer;

impl CacheControlLayer {
    /// Construct the layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for CacheControlLayer {
    type Service = CacheControlService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CacheControlService { inner }
    }
}

/// Service produced by [`CacheControlLayer`].
#[derive(Clone, Debug)]
pub struct CacheControlService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for CacheControlService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Future: Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: http::Request<ReqBody>) -> Self::Future {
        let policy = CachePolicy::for_path(request.uri().path());
        let response = self.inner.call(request);
        Box::pin(async move {
            let mut response = response.await?;
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static(policy.directive()));
            Ok(response)
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/net/cache_policy.rs"]
mod tests;
