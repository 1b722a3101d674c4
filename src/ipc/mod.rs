//! The IPC surface (spec §4.9, §6): a length-prefixed binary wire codec
//! over a per-process UNIX-domain socket, plus the dispatcher that binds
//! it and a legacy named-pipe fallback.

pub mod dispatcher;
pub mod framing;
