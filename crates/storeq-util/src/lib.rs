//! Shared utilities for storeq
//!
//! This crate provides:
//! - ID types (UserId, StoreId, ConnectionId, ClientId)
//! - Clock helpers (mockable wall clock, date key/display formatting)
//! - Per-user rate limiting
//! - Default paths for the socket and data directory

mod ids;
mod paths;
mod rate_limit;
mod time;

pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
