//! Findings and how they are written.
//!
//! A finding is a schema object or server variable whose encoding differs
//! from the target. Findings are informational output, never errors.

use crate::Result;
use crate::error::Mb4CheckError;
use serde::Serialize;
use std::io::Write;

/// A `(name, value)` row from `SHOW VARIABLES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRow {
    /// Variable name, e.g. `character_set_server`
    pub name: String,
    /// Current value
    pub value: String,
}

impl VariableRow {
    /// Builds a row from anything string-like; handy in tests.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A column from `information_schema.COLUMNS` that has a character set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    /// Schema (database) name
    pub schema: String,
    /// Table name
    pub table: String,
    /// Column name
    pub column: String,
    /// Column character set
    pub charset: String,
    /// Column collation
    pub collation: String,
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A server variable not set to the target charset
    Variable {
        /// Variable name
        name: String,
        /// Current value
        value: String,
        /// Expected charset
        target: String,
    },
    /// The inspected table's default charset
    Table {
        /// Schema (database) name
        database: String,
        /// Table name
        table: String,
        /// Observed character set
        charset: String,
        /// Expected charset
        target: String,
    },
    /// A column whose charset or collation differs from the target pair
    Column {
        /// Schema (database) name
        schema: String,
        /// Table name
        table: String,
        /// Column name
        column: String,
        /// Expected charset
        target: String,
    },
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Variable {
                name,
                value,
                target,
            } => write!(
                f,
                "Variable {} must be set to {} (currently {}).",
                name, target, value
            ),
            Self::Table {
                database,
                table,
                charset,
                target,
            } => write!(
                f,
                "{}.{} is not {} (currently {}).",
                database, table, target, charset
            ),
            Self::Column {
                schema,
                table,
                column,
                target,
            } => write!(f, "{}.{}.{} is not {}.", schema, table, column, target),
        }
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One human-readable line per finding
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Writes the version line and findings to an output stream.
pub struct FindingWriter<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> FindingWriter<W> {
    /// Creates a writer over `out`.
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    /// Writes the `Version: X.Y.Z` line.
    ///
    /// `version` is written as given, without parsing, so that it is printed
    /// even when it turns out to be malformed.
    ///
    /// # Errors
    /// Fails if the output stream cannot be written to
    pub fn version(&mut self, version: &str) -> Result<()> {
        let written = match self.format {
            OutputFormat::Text => writeln!(self.out, "Version: {}", version),
            OutputFormat::Json => {
                let line = serde_json::json!({ "kind": "version", "version": version });
                writeln!(self.out, "{}", line)
            }
        };
        written.map_err(|e| Mb4CheckError::io("version line", e))
    }

    /// Writes one finding.
    ///
    /// # Errors
    /// Fails if the finding cannot be serialized or written
    pub fn finding(&mut self, finding: &Finding) -> Result<()> {
        let written = match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", finding),
            OutputFormat::Json => {
                let line = serde_json::to_string(finding).map_err(|e| Mb4CheckError::Io {
                    context: "finding serialization".to_string(),
                    source: e.into(),
                })?;
                writeln!(self.out, "{}", line)
            }
        };
        written.map_err(|e| Mb4CheckError::io("finding", e))
    }

    /// Consumes the writer and returns the underlying stream.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Number of findings reported by each stage of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Server variables not set to the target
    pub variables: usize,
    /// Rows reported for the inspected table
    pub tables: usize,
    /// Non-conforming columns
    pub columns: usize,
}

impl RunSummary {
    /// Total number of findings.
    pub fn total(&self) -> usize {
        self.variables
            .saturating_add(self.tables)
            .saturating_add(self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(format: OutputFormat, findings: &[Finding]) -> String {
        let mut writer = FindingWriter::new(Vec::new(), format);
        for finding in findings {
            writer.finding(finding).unwrap();
        }
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_text_lines() {
        let findings = [
            Finding::Variable {
                name: "collation_connection".to_string(),
                value: "latin1_swedish_ci".to_string(),
                target: "utf8mb4".to_string(),
            },
            Finding::Table {
                database: "ecom-middleware".to_string(),
                table: "ecom_account".to_string(),
                charset: "latin1".to_string(),
                target: "utf8mb4".to_string(),
            },
            Finding::Column {
                schema: "shop".to_string(),
                table: "orders".to_string(),
                column: "notes".to_string(),
                target: "utf8mb4".to_string(),
            },
        ];

        assert_eq!(
            render(OutputFormat::Text, &findings),
            "Variable collation_connection must be set to utf8mb4 (currently latin1_swedish_ci).\n\
             ecom-middleware.ecom_account is not utf8mb4 (currently latin1).\n\
             shop.orders.notes is not utf8mb4.\n"
        );
    }

    #[test]
    fn test_version_line() {
        let mut writer = FindingWriter::new(Vec::new(), OutputFormat::Text);
        writer.version("8.0.36").unwrap();
        assert_eq!(writer.into_inner(), b"Version: 8.0.36\n");

        let mut writer = FindingWriter::new(Vec::new(), OutputFormat::Json);
        writer.version("8.0.36").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&writer.into_inner()).unwrap();
        assert_eq!(value["kind"], "version");
        assert_eq!(value["version"], "8.0.36");
    }

    #[test]
    fn test_json_lines_are_tagged() {
        let output = render(
            OutputFormat::Json,
            &[Finding::Column {
                schema: "shop".to_string(),
                table: "orders".to_string(),
                column: "notes".to_string(),
                target: "utf8mb4".to_string(),
            }],
        );

        let value: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(value["kind"], "column");
        assert_eq!(value["schema"], "shop");
        assert_eq!(value["column"], "notes");
        assert_eq!(value["target"], "utf8mb4");
    }

    #[test]
    fn test_summary_total() {
        let summary = RunSummary {
            variables: 2,
            tables: 1,
            columns: 7,
        };
        assert_eq!(summary.total(), 10);
    }
}
