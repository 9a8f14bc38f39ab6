use async_trait::async_trait;
use bytes::Bytes;
use tower::{BoxError, Service, ServiceExt as _};

use crate::foundation::error::{PanelError, PanelResult};

/// Retrieves raw page bytes for a resolved URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the full body at `url`.
    async fn fetch(&self, url: &str) -> PanelResult<Bytes>;
}

/// [`PageFetcher`] that issues `GET` requests through a tower service.
///
/// Any middleware stack can sit between the fetcher and the origin, including
/// [`crate::TranscodeLayer`]; the fetcher only sees the final response.
#[derive(Clone, Debug)]
pub struct ServiceFetcher<S> {
    inner: S,
}

impl<S> ServiceFetcher<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S> PageFetcher for ServiceFetcher<S>
where
    S: Service<http::Request<Bytes>, Response = http::Response<Bytes>>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
{
    async fn fetch(&self, url: &str) -> PanelResult<Bytes> {
        let request = http::Request::get(url)
            .body(Bytes::new())
            .map_err(|e| PanelError::fetch(format!("build request for '{url}': {e}")))?;

        let response = self
            .inner
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| {
                let err: BoxError = e.into();
                PanelError::fetch(format!("GET '{url}': {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PanelError::fetch(format!("GET '{url}': status {status}")));
        }
        Ok(response.into_body())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/fetch.rs"]
mod tests;
