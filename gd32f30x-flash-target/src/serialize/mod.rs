//! Serde helpers that write addresses and sizes as hex strings in
//! human-readable formats, and accept either hex strings or plain integers
//! when reading them back.

pub(crate) mod hex_range;
pub(crate) mod hex_u_int;
