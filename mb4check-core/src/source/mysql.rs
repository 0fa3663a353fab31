//! MySQL metadata source.
//!
//! # Security Guarantees
//! - Only `SELECT` and `SHOW` statements are issued
//! - The session is used as opened; no `SET` statements are sent
//! - Identifiers and targets are bound as parameters, never spliced into SQL
//! - Credentials never appear in logs or error messages

use super::MetadataSource;
use crate::Result;
use crate::config::{ConnectionConfig, Credentials, TableTarget, TargetEncoding};
use crate::error::Mb4CheckError;
use crate::report::{ColumnRow, VariableRow};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Row};
use tokio::sync::Mutex;

const VERSION_QUERY: &str = "SELECT VERSION()";

const VARIABLES_QUERY: &str =
    "SHOW VARIABLES WHERE Variable_name LIKE 'character_set_%' OR Variable_name LIKE 'collation%'";

// Cast to CHAR to avoid VARBINARY decoding on MySQL 8.0+
const TABLE_CHARSET_QUERY: &str = r#"
    SELECT CAST(c.CHARACTER_SET_NAME AS CHAR) AS character_set_name
    FROM INFORMATION_SCHEMA.TABLES AS t
    JOIN INFORMATION_SCHEMA.COLLATION_CHARACTER_SET_APPLICABILITY AS c
        ON c.COLLATION_NAME = t.TABLE_COLLATION
    WHERE t.TABLE_SCHEMA = ? AND t.TABLE_NAME = ?
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        CAST(TABLE_SCHEMA AS CHAR) AS table_schema,
        CAST(TABLE_NAME AS CHAR) AS table_name,
        CAST(COLUMN_NAME AS CHAR) AS column_name,
        CAST(CHARACTER_SET_NAME AS CHAR) AS character_set_name,
        CAST(COLLATION_NAME AS CHAR) AS collation_name
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE CHARACTER_SET_NAME IS NOT NULL
        AND (CHARACTER_SET_NAME <> ? OR COLLATION_NAME <> ?)
        AND (? IS NULL OR TABLE_SCHEMA = ?)
    ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION
"#;

/// A single connection to a MySQL server.
///
/// The checks run strictly one after another, so one connection is all the
/// source ever holds. It is opened once by [`connect`](Self::connect) and
/// taken out again by [`close`](MetadataSource::close).
pub struct MySqlSource {
    conn: Mutex<Option<MySqlConnection>>,
    config: ConnectionConfig,
}

impl std::fmt::Debug for MySqlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MySqlSource {
    /// Opens the connection.
    ///
    /// One attempt is made, bounded by `config.connect_timeout`. An
    /// unreachable server or rejected login fails here with the driver's
    /// error as the source, rather than at the first query.
    ///
    /// # Errors
    /// Returns `Configuration` for invalid settings and `Connection` if the
    /// server cannot be reached in time or refuses the login
    pub async fn connect(config: &ConnectionConfig, credentials: &Credentials) -> Result<Self> {
        config.validate()?;

        tracing::info!("Connecting to MySQL at {}", config);

        let options = connect_options(config, credentials);

        let conn = match tokio::time::timeout(
            config.connect_timeout,
            MySqlConnection::connect_with(&options),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(Mb4CheckError::connection_failed(config.to_string(), e)),
            Err(_) => {
                return Err(Mb4CheckError::connection_failed(
                    config.to_string(),
                    std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!(
                            "no response within {}s",
                            config.connect_timeout.as_secs_f64()
                        ),
                    ),
                ));
            }
        };

        tracing::debug!("Connection to {} established", config);

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            config: config.clone(),
        })
    }

    /// Connection settings this source was opened with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether [`close`](MetadataSource::close) has already run.
    pub async fn is_closed(&self) -> bool {
        self.conn.lock().await.is_none()
    }
}

fn connect_options(config: &ConnectionConfig, credentials: &Credentials) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(credentials.username());

    if let Some(password) = credentials.password() {
        options = options.password(password);
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }
    options
}

fn open<'a>(
    slot: &'a mut Option<MySqlConnection>,
    context: &str,
) -> Result<&'a mut MySqlConnection> {
    slot.as_mut().ok_or_else(|| {
        Mb4CheckError::query_failed(
            context,
            std::io::Error::new(std::io::ErrorKind::NotConnected, "connection is closed"),
        )
    })
}

/// Sorts sqlx errors into the query/decode halves of the taxonomy.
fn classify(query: &str, field: &str, error: sqlx::Error) -> Mb4CheckError {
    match error {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::Decode(_) => Mb4CheckError::decode_failed(field, query, error),
        other => Mb4CheckError::query_failed(query, other),
    }
}

fn get_string(row: &MySqlRow, index: usize, field: &str, query: &str) -> Result<String> {
    row.try_get::<String, _>(index)
        .map_err(|e| classify(query, field, e))
}

#[async_trait]
impl MetadataSource for MySqlSource {
    async fn server_version(&self) -> Result<String> {
        let mut slot = self.conn.lock().await;
        let conn = open(&mut slot, "server version")?;

        sqlx::query_scalar::<_, String>(VERSION_QUERY)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| classify("server version", "VERSION()", e))
    }

    async fn charset_variables(&self) -> Result<Vec<VariableRow>> {
        let mut slot = self.conn.lock().await;
        let conn = open(&mut slot, "server variables")?;

        let rows = sqlx::query(VARIABLES_QUERY)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| classify("server variables", "Variable_name", e))?;

        tracing::debug!("Fetched {} charset/collation variables", rows.len());

        rows.iter()
            .map(|row| {
                Ok(VariableRow {
                    name: get_string(row, 0, "Variable_name", "server variables")?,
                    value: get_string(row, 1, "Value", "server variables")?,
                })
            })
            .collect()
    }

    async fn table_charsets(&self, table: &TableTarget) -> Result<Vec<String>> {
        let mut slot = self.conn.lock().await;
        let conn = open(&mut slot, "table collation")?;

        let rows = sqlx::query(TABLE_CHARSET_QUERY)
            .bind(&table.schema)
            .bind(&table.table)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| classify("table collation", "character_set_name", e))?;

        tracing::debug!("Fetched {} charset rows for {}", rows.len(), table);

        rows.iter()
            .map(|row| get_string(row, 0, "character_set_name", "table collation"))
            .collect()
    }

    async fn charset_columns(
        &self,
        target: &TargetEncoding,
        database: Option<&str>,
    ) -> Result<Vec<ColumnRow>> {
        let mut slot = self.conn.lock().await;
        let conn = open(&mut slot, "column metadata")?;

        let rows = sqlx::query(COLUMNS_QUERY)
            .bind(&target.charset)
            .bind(&target.collation)
            .bind(database)
            .bind(database)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| classify("column metadata", "COLUMNS", e))?;

        tracing::debug!("Fetched {} candidate columns", rows.len());

        rows.iter()
            .map(|row| {
                let collation: Option<String> = row
                    .try_get("collation_name")
                    .map_err(|e| classify("column metadata", "collation_name", e))?;
                Ok(ColumnRow {
                    schema: get_string(row, 0, "table_schema", "column metadata")?,
                    table: get_string(row, 1, "table_name", "column metadata")?,
                    column: get_string(row, 2, "column_name", "column metadata")?,
                    charset: get_string(row, 3, "character_set_name", "column metadata")?,
                    collation: collation.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn close(&self) {
        let conn = self.conn.lock().await.take();
        let Some(conn) = conn else {
            return;
        };

        if let Err(e) = conn.close().await {
            tracing::warn!("Error while closing connection to {}: {}", self.config, e);
        }
        tracing::debug!("Connection to {} closed", self.config);
    }
}
