//! Core domain types
//!
//! This module contains the domain structures used across the driftwatch
//! pipeline. Stages own their input for the duration of one cycle and return
//! new values; concurrent stages operate on independent clones merged back
//! by workspace ID.

pub mod plan;
pub mod report;
pub mod workspace;

pub use plan::{Plan, PlanStatus};
pub use report::{DriftReport, WorkspaceReport};
pub use workspace::Workspace;
