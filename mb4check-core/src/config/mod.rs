//! Run configuration.
//!
//! # Module Structure
//! - `connection`: `ConnectionConfig` and `Credentials`
//! - `target`: `TargetEncoding` and `TableTarget`
//!
//! A [`CheckConfig`] is built once at startup and passed by reference to
//! every stage of the run.

mod connection;
mod target;

pub use connection::{ConnectionConfig, Credentials, DEFAULT_PORT};
pub use target::{
    DEFAULT_CHARSET, DEFAULT_COLLATION, DEFAULT_TABLE_NAME, DEFAULT_TABLE_SCHEMA, TableTarget,
    TargetEncoding,
};

use crate::report::OutputFormat;

/// Everything a run needs, apart from the open connection.
#[derive(Debug, Clone, Default)]
pub struct CheckConfig {
    /// Where to connect
    pub connection: ConnectionConfig,
    /// Who to connect as
    pub credentials: Credentials,
    /// Expected charset/collation
    pub target: TargetEncoding,
    /// Table inspected by the table check
    pub table: TableTarget,
    /// How findings are written
    pub format: OutputFormat,
}

impl CheckConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if the connection settings are invalid or a target name is empty
    pub fn validate(&self) -> crate::Result<()> {
        self.connection.validate()?;

        if self.target.charset.is_empty() || self.target.collation.is_empty() {
            return Err(crate::error::Mb4CheckError::configuration(
                "target charset and collation cannot be empty",
            ));
        }

        if self.table.schema.is_empty() || self.table.table.is_empty() {
            return Err(crate::error::Mb4CheckError::configuration(
                "table schema and table name cannot be empty",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CheckConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_target_rejected() {
        let config = CheckConfig {
            target: TargetEncoding {
                charset: String::new(),
                collation: DEFAULT_COLLATION.to_string(),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CheckConfig {
            table: TableTarget {
                schema: "shop".to_string(),
                table: String::new(),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
