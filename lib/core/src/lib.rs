//! Core identifier types for the flowloom workflow editor.
//!
//! This crate provides the strongly-typed ULID identifiers shared by the
//! editor core and its collaborators.

pub mod id;

pub use id::{ExecutionId, ParseIdError, WorkflowId};
