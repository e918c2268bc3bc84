//! Protocol types for storeq
//!
//! This crate defines the transport-neutral surface between the dialogue
//! core and whatever delivers chat messages:
//! - Bot commands (`/start`, `/reportes`, ...)
//! - Replies with optional quick-reply choices and attachments
//! - NDJSON request/response envelopes used by the socket transport
//! - Versioning

mod commands;
mod types;

pub use commands::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
