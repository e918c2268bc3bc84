//! Dialogue engine for storeq
//!
//! Provides:
//! - Field validators (store id, transaction date, optional fields)
//! - The query form and report dialogues as pure transitions
//! - Report aggregation and rendering over the connection log
//! - [`DialogueEngine`], which owns per-user sessions and performs the I/O

mod engine;
mod executor;
pub mod form;
mod input;
mod mock;
pub mod prompts;
mod render;
mod report;
pub mod report_dialogue;
mod session;
mod stage;
mod transition;
mod validate;

pub use engine::*;
pub use executor::*;
pub use input::*;
pub use mock::*;
pub use render::*;
pub use report::*;
pub use session::*;
pub use stage::*;
pub use transition::*;
pub use validate::*;
