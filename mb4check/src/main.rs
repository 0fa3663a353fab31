//! utf8mb4 readiness checker.
//!
//! Connects to a MySQL server and prints one line for every server variable,
//! table and column that is not configured for utf8mb4. Findings go to
//! stdout; diagnostics and fatal errors go to stderr.
//!
//! # Security Guarantees
//! - Read-only database operations only
//! - Passwords are never logged or echoed

use anyhow::Context;
use clap::{Args, Parser, ValueEnum};
use mb4check_core::{
    CheckConfig, ConnectionConfig, Credentials, FindingWriter, OutputFormat, TableTarget,
    TargetEncoding, config, init_logging, run_against_server,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "mb4check")]
#[command(about = "Report MySQL settings, tables and columns not using utf8mb4")]
#[command(version)]
#[command(long_about = "
mb4check - utf8mb4 migration readiness checker

Connects to a MySQL server and reports:
- the server version (5.5.3 or later is required for utf8mb4)
- character_set_* and collation* variables not set to utf8mb4
- the default character set of one table (--table-schema/--table-name)
- every column whose charset or collation is not utf8mb4/utf8mb4_unicode_ci

Findings are printed to stdout and never change the exit code. Any
connection or query error aborts the run with exit code 1.

EXAMPLES:
  mb4check --host db.internal --user dba --ask-password
  mb4check --database shop --format json > findings.jsonl
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    target: TargetArgs,

    /// Output format for findings
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,
}

#[derive(Debug, Args)]
struct ConnectionArgs {
    /// Connect to host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to use for connection.
    #[arg(long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Database to use. If empty, will check all databases.
    #[arg(long, default_value = "")]
    database: String,

    /// User for login.
    #[arg(long, default_value = "")]
    user: String,

    /// Password to use when connecting to server.
    #[arg(long, env = "MB4CHECK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Prompt for the password instead of passing it on the command line
    #[arg(long, conflicts_with = "password")]
    ask_password: bool,

    /// Seconds to wait for the connection to be established
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    connect_timeout: u64,
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// Character set every object should use
    #[arg(long, default_value = config::DEFAULT_CHARSET)]
    charset: String,

    /// Collation every column should use
    #[arg(long, default_value = config::DEFAULT_COLLATION)]
    collation: String,

    /// Schema of the table whose default charset is reported
    #[arg(long, default_value = config::DEFAULT_TABLE_SCHEMA)]
    table_schema: String,

    /// Table whose default charset is reported
    #[arg(long, default_value = config::DEFAULT_TABLE_NAME)]
    table_name: String,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// One line per finding
    Text,
    /// One JSON object per finding
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Builds the run configuration, prompting for a password if asked to.
    fn into_config(self) -> anyhow::Result<CheckConfig> {
        let password = if self.connection.ask_password {
            let prompt = format!("Enter password for {}: ", self.connection.user);
            Some(rpassword::prompt_password(prompt).context("Failed to read password")?)
        } else {
            self.connection.password
        };

        let config = CheckConfig {
            connection: ConnectionConfig::new(self.connection.host)
                .with_port(self.connection.port)
                .with_database(self.connection.database)
                .with_connect_timeout(Duration::from_secs(self.connection.connect_timeout)),
            credentials: Credentials::new(self.connection.user, password),
            target: TargetEncoding {
                charset: self.target.charset,
                collation: self.target.collation,
            },
            table: TableTarget {
                schema: self.target.table_schema,
                table: self.target.table_name,
            },
            format: self.format.into(),
        };
        config.validate()?;
        Ok(config)
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config()?;

    let stdout = std::io::stdout();
    let mut writer = FindingWriter::new(stdout.lock(), config.format);

    let summary = run_against_server(&config, &mut writer).await?;

    info!(
        "{} variables, {} table rows, {} columns need attention",
        summary.variables, summary.tables, summary.columns
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
