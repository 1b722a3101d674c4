//! Token-interpolated presentation fragments reused by modules (spec §3,
//! component table C14): [`label`], [`iconset`], [`ramp`], [`progressbar`],
//! [`animation`]. Cross-checked against
//! `examples/original_source/include/drawtypes/*.hpp` for field names and
//! semantics (weights, gradient bucket math) — not copied, just consulted.

pub mod animation;
pub mod iconset;
pub mod label;
pub mod progressbar;
pub mod ramp;
