//! Data Transfer Objects for the remote workspace/run API
//!
//! Wire representations exchanged with the remote infrastructure management
//! service. The repository layer maps these to domain entities; pipeline
//! stages never see them.

pub mod run;
pub mod workspace;
