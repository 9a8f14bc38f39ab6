//! Off-thread execution of the pixel transform.

pub(crate) mod dispatcher;
pub(crate) mod protocol;
pub(crate) mod sync_exec;
pub(crate) mod worker;
