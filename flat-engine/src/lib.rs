//! Line-at-a-time engine for flatrecords-rs.
//!
//! This crate drives a `RecordSchema` over whole texts and files: it skips
//! header and trailer lines, hands each line to the schema, applies the
//! caller's `RecordHooks`, and routes record errors by `ErrorMode`.

pub mod engine;
pub mod error;
pub mod error_manager;
pub mod hooks;

pub use engine::{Engine, EngineOptions};
pub use error::EngineError;
pub use error_manager::{ErrorInfo, ErrorManager, ErrorMode};
pub use hooks::{HookAction, NoHooks, RecordHooks};
