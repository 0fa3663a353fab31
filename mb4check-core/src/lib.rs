//! Core checks for mb4check.
//!
//! Connects to a MySQL server and reports server variables, a table, and
//! columns that are not configured for the target Unicode character set
//! (`utf8mb4` by default). Used by the `mb4check` binary ahead of a charset
//! migration.
//!
//! # Guarantees
//! - All database operations are read-only
//! - Credentials are never logged or included in errors
//! - Findings never abort a run; every error does
//!
//! # Architecture
//! - `source`: the [`MetadataSource`] seam and its MySQL implementation
//! - `checks`: version, settings, table and column checks plus the runner
//! - `report`: findings and their text/JSON rendering
//! - `config`, `error`, `logging`, `version`: supporting types

pub mod checks;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod source;
pub mod version;

// Re-export commonly used types
pub use checks::{
    check_columns, check_server_settings, check_server_version, check_table, run_against_server,
    run_and_close, run_checks,
};
pub use config::{CheckConfig, ConnectionConfig, Credentials, TableTarget, TargetEncoding};
pub use error::{Mb4CheckError, Result};
pub use logging::init_logging;
pub use report::{Finding, FindingWriter, OutputFormat, RunSummary};
pub use source::{MetadataSource, MySqlSource};
pub use version::ServerVersion;
