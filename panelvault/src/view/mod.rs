pub(crate) mod driver;
pub(crate) mod fetch;
pub(crate) mod preload;
pub(crate) mod visibility;
