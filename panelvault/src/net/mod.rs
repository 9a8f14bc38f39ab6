pub(crate) mod cache_policy;
pub(crate) mod mime;
pub(crate) mod transcode;
