//! Action regions, their per-frame table, and per-module routing
//! (spec §4.3, §4.4).

pub mod context;
pub mod router;
