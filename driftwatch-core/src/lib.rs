//! Driftwatch Core
//!
//! Core types and abstractions for the driftwatch drift detector.
//!
//! This crate contains:
//! - Domain types: Core business entities (Workspace, Plan, report types)
//! - DTOs: Wire representations of the remote workspace/run API

pub mod domain;
pub mod dto;
