//! Narrow interfaces to the external collaborators: the pixel cipher and the wire codec.

pub(crate) mod cipher;
pub(crate) mod codec;
pub(crate) mod tile_shuffle;
