#![forbid(unsafe_code)]

//! Core domain model and compilers for Zwift `.zwo` workout files.
//!
//! This crate provides:
//! - Domain types (zones, power targets, workout blocks)
//! - Plan compiler (YAML/JSON plan to blocks)
//! - Free-text extraction and duration budgeting
//! - XML emission
//! - Schema validation against the reference catalog

pub mod types;
pub mod error;
pub mod power;
pub mod extract;
pub mod budget;
pub mod plan;
pub mod document;
pub mod catalog;
pub mod validate;
pub mod config;
pub mod logging;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::SchemaCatalog;
pub use config::Config;
pub use document::WorkoutDocument;
pub use engine::build_workout;
pub use plan::{compile_plan, load_plan, Plan};
pub use validate::{collect_documents, validate_documents, DocumentReport, SchemaIssue};
