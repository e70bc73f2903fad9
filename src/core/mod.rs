//! core
//!
//! Core domain types, schemas, and configuration for mapsync.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, IndexName
//! - [`schema`] - Mapping values and structural comparison
//! - [`naming`] - Index generation naming
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - "No index" and "empty mapping" are distinct values
//! - All comparison is deterministic

pub mod config;
pub mod naming;
pub mod schema;
pub mod types;
