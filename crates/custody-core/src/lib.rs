//! custody-core: Shared types, errors, configuration and collaborator traits
//!
//! This crate provides the foundational types used across the withdrawal
//! builder workspace.

pub mod config;
pub mod errors;
pub mod store;
pub mod types;

pub use config::*;
pub use errors::*;
pub use store::*;
pub use types::*;
