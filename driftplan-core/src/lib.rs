//! Dialect-aware SQL schema comparison and change-plan generation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use driftplan_core::config::{CliOverrides, DriftplanConfig};
//! use driftplan_core::Driftplan;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let overrides = CliOverrides {
//!     dialect: Some("postgres".to_string()),
//!     ..Default::default()
//! };
//! let config = DriftplanConfig::load(None, &overrides)?;
//! let report = Driftplan::new(config).compare(
//!     &[PathBuf::from("schema/prod.sql")],
//!     &[PathBuf::from("schema/dev.sql")],
//! )?;
//! println!("{}", report.plan);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`config`] - Configuration loading (TOML, env vars, CLI overrides)
//! - [`source`] - Locating and reading `*.sql` files
//! - [`tokenizer`] - Dialect-aware statement splitting
//! - [`dialect`] - Dialect identification and identifier folding
//! - [`normalize`] - Parsing SQL sources into a [`model::SchemaModel`]
//! - [`model`] - Dialect-neutral schema objects
//! - [`filter`] - Restricting a model to chosen object kinds
//! - [`diff`] - Comparing two models into an ordered [`diff::Plan`]
//! - [`introspect`] - Building a model from a live database catalog
//! - [`db`] - Database connections, TLS, retries
//! - [`commands`] - compare and compare-livedb
//! - [`error`] - Error types

pub mod commands;
pub mod config;
pub mod db;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod filter;
pub mod introspect;
pub mod model;
pub mod normalize;
mod parser;
pub mod source;
pub mod tokenizer;

use std::path::PathBuf;

use config::DriftplanConfig;
use error::Result;
use introspect::CatalogReader;

pub use commands::CompareReport;
pub use config::CliOverrides;
pub use dialect::Dialect;
pub use diff::{diff, diff_with, Action, ChangeOp, DiffOptions, Plan};
pub use error::{DriftplanError, Side};
pub use model::{DatabaseObject, ModelWarning, ObjectKind, QualifiedName, SchemaModel};
pub use normalize::normalize;
pub use source::SqlSource;

/// Main entry point for the driftplan library.
///
/// Holds a resolved configuration and runs the compare commands with it.
pub struct Driftplan {
    pub config: DriftplanConfig,
}

impl Driftplan {
    pub fn new(config: DriftplanConfig) -> Self {
        Self { config }
    }

    /// Compare two sets of SQL files (no DB required).
    pub fn compare(&self, source: &[PathBuf], target: &[PathBuf]) -> Result<CompareReport> {
        commands::compare::execute(&self.config, source, target)
    }

    /// Compare the configured live database against SQL files.
    pub async fn compare_livedb(&self, target: &[PathBuf]) -> Result<CompareReport> {
        commands::compare_live::execute(&self.config, target).await
    }

    /// Compare catalog rows from `reader` against SQL files.
    pub async fn compare_reader<R: CatalogReader>(
        &self,
        reader: &R,
        target: &[PathBuf],
    ) -> Result<CompareReport> {
        commands::compare_live::execute_with_reader(&self.config, reader, target).await
    }
}
