//! Where the checks read metadata from.
//!
//! # Module Structure
//! - `mysql`: the live, sqlx-backed implementation
//!
//! The checks only depend on [`MetadataSource`], so they can run against an
//! in-memory source in tests.

pub mod mysql;

use crate::Result;
use crate::config::{TableTarget, TargetEncoding};
use crate::report::{ColumnRow, VariableRow};
use async_trait::async_trait;

pub use mysql::MySqlSource;

/// Read-only access to the server metadata the checks need.
///
/// Every method issues one query and returns its rows in server order.
/// Implementations never modify the inspected server.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Raw output of `SELECT VERSION()`, vendor suffix included.
    async fn server_version(&self) -> Result<String>;

    /// Every `character_set_*` and `collation*` variable.
    async fn charset_variables(&self) -> Result<Vec<VariableRow>>;

    /// Character sets applicable to the default collation of `table`.
    ///
    /// Normally zero rows (table missing) or one.
    async fn table_charsets(&self, table: &TableTarget) -> Result<Vec<String>>;

    /// Columns that carry a character set, restricted to `database` when given.
    ///
    /// Implementations may pre-filter on `target` but are not required to;
    /// callers must still compare each row against it.
    async fn charset_columns(
        &self,
        target: &TargetEncoding,
        database: Option<&str>,
    ) -> Result<Vec<ColumnRow>>;

    /// Releases the underlying connection. Later queries fail; calling it
    /// again does nothing.
    async fn close(&self);
}
