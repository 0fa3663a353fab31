//! The four checks and the sequential runner.
//!
//! Each check issues one query, walks the rows in server order and writes a
//! finding for every non-conforming row. Any error aborts the check and is
//! returned unchanged; [`run_checks`] stops at the first one, so later checks
//! never run after a failure.

use crate::Result;
use crate::config::{CheckConfig, TableTarget, TargetEncoding};
use crate::report::{Finding, FindingWriter, RunSummary};
use crate::source::{MetadataSource, MySqlSource};
use crate::version::ServerVersion;
use std::io::Write;
use tracing::{debug, info};

/// Prints the server version and rejects servers below the utf8mb4 minimum.
///
/// The `Version:` line is written before the version is parsed.
///
/// # Errors
/// Query failure, a malformed version string, or a version below the minimum
pub async fn check_server_version<S, W>(
    source: &S,
    out: &mut FindingWriter<W>,
) -> Result<ServerVersion>
where
    S: MetadataSource + ?Sized,
    W: Write,
{
    let raw = source.server_version().await?;
    debug!("Server reported version string '{}'", raw);

    out.version(ServerVersion::truncate(&raw))?;

    let version = ServerVersion::parse(&raw)?;
    version.ensure_supported()?;

    info!("Server version {} supports utf8mb4", version);
    Ok(version)
}

/// Reports every charset/collation server variable not equal to the target charset.
///
/// Collation variables are compared against the charset name too, so they
/// are reported whenever they are present.
///
/// # Errors
/// Query or decode failure
pub async fn check_server_settings<S, W>(
    source: &S,
    target: &TargetEncoding,
    out: &mut FindingWriter<W>,
) -> Result<usize>
where
    S: MetadataSource + ?Sized,
    W: Write,
{
    let mut reported = 0usize;

    for row in source.charset_variables().await? {
        if row.value == target.charset {
            continue;
        }
        out.finding(&Finding::Variable {
            name: row.name,
            value: row.value,
            target: target.charset.clone(),
        })?;
        reported = reported.saturating_add(1);
    }

    info!("Server settings check reported {} variables", reported);
    Ok(reported)
}

/// Reports the character set of `table`'s default collation.
///
/// Every row the lookup returns is reported, including one whose charset
/// already equals the target. A missing table produces no output.
///
/// # Errors
/// Query or decode failure
pub async fn check_table<S, W>(
    source: &S,
    table: &TableTarget,
    target: &TargetEncoding,
    out: &mut FindingWriter<W>,
) -> Result<usize>
where
    S: MetadataSource + ?Sized,
    W: Write,
{
    let mut reported = 0usize;

    for charset in source.table_charsets(table).await? {
        out.finding(&Finding::Table {
            database: table.schema.clone(),
            table: table.table.clone(),
            charset,
            target: target.charset.clone(),
        })?;
        reported = reported.saturating_add(1);
    }

    info!("Table check for {} reported {} rows", table, reported);
    Ok(reported)
}

/// Reports every column whose charset or collation differs from the target pair.
///
/// # Errors
/// Query or decode failure
pub async fn check_columns<S, W>(
    source: &S,
    target: &TargetEncoding,
    database: Option<&str>,
    out: &mut FindingWriter<W>,
) -> Result<usize>
where
    S: MetadataSource + ?Sized,
    W: Write,
{
    let mut reported = 0usize;

    for row in source.charset_columns(target, database).await? {
        if target.matches(&row.charset, &row.collation) {
            continue;
        }
        out.finding(&Finding::Column {
            schema: row.schema,
            table: row.table,
            column: row.column,
            target: target.charset.clone(),
        })?;
        reported = reported.saturating_add(1);
    }

    info!(
        "Column check reported {} columns in {}",
        reported,
        database.unwrap_or("all databases")
    );
    Ok(reported)
}

/// Runs version, settings, table and column checks in that order.
///
/// # Errors
/// The first error raised by any check; no further check is started
pub async fn run_checks<S, W>(
    source: &S,
    config: &CheckConfig,
    out: &mut FindingWriter<W>,
) -> Result<RunSummary>
where
    S: MetadataSource + ?Sized,
    W: Write,
{
    check_server_version(source, out).await?;

    let variables = check_server_settings(source, &config.target, out).await?;
    let tables = check_table(source, &config.table, &config.target, out).await?;
    let columns = check_columns(
        source,
        &config.target,
        config.connection.database.as_deref(),
        out,
    )
    .await?;

    let summary = RunSummary {
        variables,
        tables,
        columns,
    };
    info!("Checks completed with {} findings", summary.total());
    Ok(summary)
}

/// Runs every check against `source`, then closes it.
///
/// The source is closed whether or not the checks succeed.
///
/// # Errors
/// The first error raised by a check
pub async fn run_and_close<S, W>(
    source: &S,
    config: &CheckConfig,
    out: &mut FindingWriter<W>,
) -> Result<RunSummary>
where
    S: MetadataSource + ?Sized,
    W: Write,
{
    let result = run_checks(source, config, out).await;
    if let Err(e) = &result {
        debug!("Checks stopped early: {}", e);
    }
    source.close().await;
    result
}

/// Connects to the configured server, runs every check, and closes the connection.
///
/// # Errors
/// Connection failure or the first error raised by a check
pub async fn run_against_server<W: Write>(
    config: &CheckConfig,
    out: &mut FindingWriter<W>,
) -> Result<RunSummary> {
    let source = MySqlSource::connect(&config.connection, &config.credentials).await?;
    run_and_close(&source, config, out).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Mb4CheckError;
    use crate::report::{ColumnRow, OutputFormat, VariableRow};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Stage {
        Version,
        Settings,
        Table,
        Columns,
        Close,
    }

    /// In-memory source that records which queries were issued.
    #[derive(Default)]
    struct FakeSource {
        version: String,
        variables: Vec<VariableRow>,
        table_charsets: Vec<String>,
        columns: Vec<ColumnRow>,
        fail_at: Option<Stage>,
        calls: Mutex<Vec<Stage>>,
    }

    impl FakeSource {
        fn with_version(version: &str) -> Self {
            Self {
                version: version.to_string(),
                ..Default::default()
            }
        }

        fn enter(&self, stage: Stage) -> Result<()> {
            self.calls.lock().unwrap().push(stage);
            if self.fail_at == Some(stage) {
                return Err(Mb4CheckError::query_failed(
                    format!("{:?}", stage),
                    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection reset"),
                ));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<Stage> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetadataSource for FakeSource {
        async fn server_version(&self) -> Result<String> {
            self.enter(Stage::Version)?;
            Ok(self.version.clone())
        }

        async fn charset_variables(&self) -> Result<Vec<VariableRow>> {
            self.enter(Stage::Settings)?;
            Ok(self.variables.clone())
        }

        async fn table_charsets(&self, _table: &TableTarget) -> Result<Vec<String>> {
            self.enter(Stage::Table)?;
            Ok(self.table_charsets.clone())
        }

        async fn charset_columns(
            &self,
            _target: &TargetEncoding,
            _database: Option<&str>,
        ) -> Result<Vec<ColumnRow>> {
            self.enter(Stage::Columns)?;
            Ok(self.columns.clone())
        }

        async fn close(&self) {
            self.calls.lock().unwrap().push(Stage::Close);
        }
    }

    fn column(schema: &str, table: &str, name: &str, charset: &str, collation: &str) -> ColumnRow {
        ColumnRow {
            schema: schema.to_string(),
            table: table.to_string(),
            column: name.to_string(),
            charset: charset.to_string(),
            collation: collation.to_string(),
        }
    }

    fn writer() -> FindingWriter<Vec<u8>> {
        FindingWriter::new(Vec::new(), OutputFormat::Text)
    }

    fn output(writer: FindingWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn test_version_is_printed_without_suffix() {
        let source = FakeSource::with_version("5.7.44-log");
        let mut out = writer();

        let version = check_server_version(&source, &mut out).await.unwrap();
        assert_eq!(version.to_string(), "5.7.44");
        assert_eq!(output(out), "Version: 5.7.44\n");
    }

    #[tokio::test]
    async fn test_version_boundaries() {
        for (raw, accepted) in [
            ("5.5.3", true),
            ("5.5.3-MariaDB", true),
            ("5.5.2", false),
            ("5.4.99", false),
            ("6.0.0", false),
        ] {
            let source = FakeSource::with_version(raw);
            let mut out = writer();
            let result = check_server_version(&source, &mut out).await;
            assert_eq!(result.is_ok(), accepted, "version {}", raw);
            if !accepted {
                assert!(matches!(
                    result,
                    Err(Mb4CheckError::UnsupportedVersion { .. })
                ));
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_version_is_printed_then_fatal() {
        let source = FakeSource::with_version("5.5-beta");
        let mut out = writer();

        let result = check_server_version(&source, &mut out).await;
        assert!(matches!(result, Err(Mb4CheckError::MalformedVersion { .. })));
        assert_eq!(output(out), "Version: 5.5\n");
    }

    #[tokio::test]
    async fn test_settings_reports_only_differing_values() {
        let source = FakeSource {
            variables: vec![
                VariableRow::new("character_set_server", "utf8mb4"),
                VariableRow::new("collation_connection", "latin1_swedish_ci"),
            ],
            ..Default::default()
        };
        let mut out = writer();

        let reported = check_server_settings(&source, &TargetEncoding::default(), &mut out)
            .await
            .unwrap();
        assert_eq!(reported, 1);
        assert_eq!(
            output(out),
            "Variable collation_connection must be set to utf8mb4 (currently latin1_swedish_ci).\n"
        );
    }

    #[tokio::test]
    async fn test_table_without_rows_is_silent() {
        let source = FakeSource::default();
        let mut out = writer();

        let reported = check_table(
            &source,
            &TableTarget::default(),
            &TargetEncoding::default(),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(reported, 0);
        assert!(output(out).is_empty());
    }

    #[tokio::test]
    async fn test_table_reports_every_row() {
        let source = FakeSource {
            table_charsets: vec!["utf8mb4".to_string()],
            ..Default::default()
        };
        let mut out = writer();

        let reported = check_table(
            &source,
            &TableTarget::default(),
            &TargetEncoding::default(),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(reported, 1);
        assert_eq!(
            output(out),
            "ecom-middleware.ecom_account is not utf8mb4 (currently utf8mb4).\n"
        );
    }

    #[tokio::test]
    async fn test_columns_skip_conforming_rows() {
        let source = FakeSource {
            columns: vec![
                column("shop", "orders", "notes", "latin1", "latin1_swedish_ci"),
                column("shop", "orders", "title", "utf8mb4", "utf8mb4_unicode_ci"),
                column("shop", "users", "bio", "utf8mb4", "utf8mb4_general_ci"),
            ],
            ..Default::default()
        };
        let mut out = writer();

        let reported = check_columns(&source, &TargetEncoding::default(), None, &mut out)
            .await
            .unwrap();
        assert_eq!(reported, 2);
        assert_eq!(
            output(out),
            "shop.orders.notes is not utf8mb4.\nshop.users.bio is not utf8mb4.\n"
        );
    }

    #[tokio::test]
    async fn test_run_checks_in_order() {
        let source = FakeSource {
            version: "5.7.44".to_string(),
            variables: vec![VariableRow::new("character_set_database", "latin1")],
            table_charsets: vec!["latin1".to_string()],
            columns: vec![column("shop", "orders", "notes", "latin1", "latin1_swedish_ci")],
            ..Default::default()
        };
        let mut out = writer();

        let summary = run_checks(&source, &CheckConfig::default(), &mut out)
            .await
            .unwrap();

        assert_eq!(
            source.calls(),
            vec![Stage::Version, Stage::Settings, Stage::Table, Stage::Columns]
        );
        assert_eq!(
            summary,
            RunSummary {
                variables: 1,
                tables: 1,
                columns: 1,
            }
        );
        assert_eq!(
            output(out),
            "Version: 5.7.44\n\
             Variable character_set_database must be set to utf8mb4 (currently latin1).\n\
             ecom-middleware.ecom_account is not utf8mb4 (currently latin1).\n\
             shop.orders.notes is not utf8mb4.\n"
        );
    }

    #[tokio::test]
    async fn test_failure_stops_later_checks() {
        let expected = [
            (Stage::Version, vec![Stage::Version]),
            (Stage::Settings, vec![Stage::Version, Stage::Settings]),
            (
                Stage::Table,
                vec![Stage::Version, Stage::Settings, Stage::Table],
            ),
            (
                Stage::Columns,
                vec![Stage::Version, Stage::Settings, Stage::Table, Stage::Columns],
            ),
        ];

        for (fail_at, calls) in expected {
            let source = FakeSource {
                version: "5.5.3".to_string(),
                fail_at: Some(fail_at),
                ..Default::default()
            };
            let mut out = writer();

            let result = run_checks(&source, &CheckConfig::default(), &mut out).await;
            assert!(
                matches!(result, Err(Mb4CheckError::Query { .. })),
                "stage {:?}",
                fail_at
            );
            assert_eq!(source.calls(), calls);
        }
    }

    #[tokio::test]
    async fn test_rejected_version_stops_later_checks() {
        let source = FakeSource::with_version("8.0.36");
        let mut out = writer();

        let result = run_checks(&source, &CheckConfig::default(), &mut out).await;
        assert!(matches!(
            result,
            Err(Mb4CheckError::UnsupportedVersion { .. })
        ));
        assert_eq!(source.calls(), vec![Stage::Version]);
        assert_eq!(output(out), "Version: 8.0.36\n");
    }

    #[tokio::test]
    async fn test_run_and_close_closes_after_success() {
        let source = FakeSource::with_version("5.5.3");
        let mut out = writer();

        run_and_close(&source, &CheckConfig::default(), &mut out)
            .await
            .unwrap();
        assert_eq!(
            source.calls(),
            vec![
                Stage::Version,
                Stage::Settings,
                Stage::Table,
                Stage::Columns,
                Stage::Close
            ]
        );
    }

    #[tokio::test]
    async fn test_run_and_close_closes_after_failure() {
        for fail_at in [Stage::Version, Stage::Settings, Stage::Table, Stage::Columns] {
            let source = FakeSource {
                version: "5.5.3".to_string(),
                fail_at: Some(fail_at),
                ..Default::default()
            };
            let mut out = writer();

            let result = run_and_close(&source, &CheckConfig::default(), &mut out).await;
            assert!(result.is_err(), "stage {:?}", fail_at);

            let calls = source.calls();
            assert_eq!(calls.last(), Some(&Stage::Close), "stage {:?}", fail_at);
            assert_eq!(calls.iter().filter(|s| **s == Stage::Close).count(), 1);
        }
    }

    #[tokio::test]
    async fn test_run_and_close_closes_after_rejected_version() {
        let source = FakeSource::with_version("8.0.36");
        let mut out = writer();

        let result = run_and_close(&source, &CheckConfig::default(), &mut out).await;
        assert!(matches!(
            result,
            Err(Mb4CheckError::UnsupportedVersion { .. })
        ));
        assert_eq!(source.calls(), vec![Stage::Version, Stage::Close]);
    }
}
