//! Database connection configuration.
//!
//! Connection parameters and credentials are kept in separate types so the
//! former can be logged and displayed freely while the latter never is.

use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

/// Default MySQL port.
pub const DEFAULT_PORT: u16 = 3306;

/// Longest schema name MySQL accepts.
const MAX_DATABASE_NAME_LEN: usize = 64;

/// Configuration for the single database connection.
///
/// # Security
/// This struct intentionally does NOT store the username or password.
/// See [`Credentials`].
///
/// # Example
/// ```rust
/// use mb4check_core::config::ConnectionConfig;
///
/// let config = ConnectionConfig::new("db.internal".to_string())
///     .with_port(3307)
///     .with_database("shop".to_string());
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.to_string(), "db.internal:3307/shop");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Database host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Default schema; `None` checks every schema on the server
    pub database: Option<String>,
    /// How long to wait for the connection to be established
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            database: None,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)?;
        if let Some(database) = &self.database {
            write!(f, "/{}", database)?;
        }
        Ok(())
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::error::Mb4CheckError::configuration(
                "host cannot be empty",
            ));
        }

        if self.port == 0 {
            return Err(crate::error::Mb4CheckError::configuration(
                "port must be greater than 0",
            ));
        }

        if let Some(database) = &self.database
            && database.len() > MAX_DATABASE_NAME_LEN
        {
            return Err(crate::error::Mb4CheckError::configuration(format!(
                "database name too long: maximum {} characters",
                MAX_DATABASE_NAME_LEN
            )));
        }

        if self.connect_timeout.is_zero() {
            return Err(crate::error::Mb4CheckError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Creates a new connection config with defaults for everything but the host.
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method to set the database. An empty name means "all databases".
    pub fn with_database(mut self, database: String) -> Self {
        self.database = if database.is_empty() {
            None
        } else {
            Some(database)
        };
        self
    }

    /// Builder method to set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Login credentials, zeroed from memory on drop.
///
/// ```rust
/// use mb4check_core::config::Credentials;
///
/// let creds = Credentials::new("dba".to_string(), Some("s3cret".to_string()));
/// assert_eq!(creds.username(), "dba");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("s3cret"));
/// ```
#[derive(Clone, Default, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username.as_str())
            .field("has_password", &self.has_password())
            .finish()
    }
}

impl Credentials {
    /// Creates new credentials. An empty password is treated as no password.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password.filter(|p| !p.is_empty())),
        }
    }

    /// The login user; may be empty.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, if one was given.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3306);
        assert_eq!(config.database, None);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_connection_config_validation() {
        let config = ConnectionConfig::new("localhost".to_string());
        assert!(config.validate().is_ok());

        let config = ConnectionConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_port(0);
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_database("x".repeat(65));
        assert!(config.validate().is_err());

        let config = ConnectionConfig::default().with_connect_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_database_means_all() {
        let config = ConnectionConfig::default().with_database(String::new());
        assert_eq!(config.database, None);
        assert_eq!(config.to_string(), "127.0.0.1:3306");
    }

    #[test]
    fn test_credentials_empty_password_is_none() {
        let creds = Credentials::new("root".to_string(), Some(String::new()));
        assert!(!creds.has_password());
        assert_eq!(creds.password(), None);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("root".to_string(), Some("hunter2".to_string()));
        let debug = format!("{:?}", creds);
        assert!(debug.contains("root"));
        assert!(!debug.contains("hunter2"));
    }
}
