//! Error types for the nested-transaction adapter.
//!
//! The adapter reports three kinds of failure, each carrying the id of the
//! `Database` instance that raised it:
//! - `LevelIntegrity`: the nesting counter went negative (unbalanced calls)
//! - `Communication`: the driver failed a physical begin/commit/rollback
//! - `Query`: a statement failed to execute
//!
//! None of them is retried here. `Connection` and `InvalidInput` belong to the
//! outer surface (connecting, parsing arguments) and never come from the
//! transaction logic itself.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Transaction level integrity violated on {database}: level is {level}")]
    LevelIntegrity { database: String, level: i64 },

    #[error("Communication failure on {database}: [{code}] {message}")]
    Communication {
        database: String,
        code: String,
        message: String,
        #[source]
        fault: DriverFault,
    },

    #[error("Query failed on {database}: [{code}] {info}")]
    Query {
        database: String,
        /// SQLSTATE or driver code, "HY000" when the driver gives none
        code: String,
        info: String,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

/// Coarse classification of a [`DbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LevelIntegrity,
    Communication,
    Query,
    Connection,
    InvalidInput,
}

/// Generic SQLSTATE used when the driver reports no code of its own.
pub const GENERAL_ERROR_CODE: &str = "HY000";

impl DbError {
    /// Create a level integrity error for the given adapter.
    pub fn level_integrity(database: impl Into<String>, level: i64) -> Self {
        Self::LevelIntegrity {
            database: database.into(),
            level,
        }
    }

    /// Wrap a driver fault raised during a physical transaction call.
    pub fn communication(database: impl Into<String>, fault: DriverFault) -> Self {
        Self::Communication {
            database: database.into(),
            code: fault.code_or_general().to_string(),
            message: fault.message.clone(),
            fault,
        }
    }

    /// Wrap a driver fault raised while executing a statement.
    pub fn query(database: impl Into<String>, fault: DriverFault) -> Self {
        Self::Query {
            database: database.into(),
            code: fault.code_or_general().to_string(),
            info: fault.message,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LevelIntegrity { .. } => ErrorKind::LevelIntegrity,
            Self::Communication { .. } => ErrorKind::Communication,
            Self::Query { .. } => ErrorKind::Query,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Id of the adapter that raised this error, if it came from one.
    pub fn database(&self) -> Option<&str> {
        match self {
            Self::LevelIntegrity { database, .. }
            | Self::Communication { database, .. }
            | Self::Query { database, .. } => Some(database),
            _ => None,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::LevelIntegrity { .. } => Some(
                "Balance every start_transaction with exactly one commit or rollback; \
                 discard this adapter and create a new one",
            ),
            Self::Communication { .. } => {
                Some("Check database server status; reconnect before retrying")
            }
            Self::Query { .. } => Some("Check the SQL syntax and referenced objects"),
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::InvalidInput { .. } => None,
        }
    }
}

/// Result type alias for adapter operations.
pub type DbResult<T> = Result<T, DbError>;

/// A fault reported by the native driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverFault {
    /// SQLSTATE or vendor error code, when the driver provides one
    pub code: Option<String>,
    pub message: String,
}

impl DriverFault {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_or_general(&self) -> &str {
        self.code.as_deref().unwrap_or(GENERAL_ERROR_CODE)
    }
}

impl From<sqlx::Error> for DriverFault {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DriverFault::new(
                db_err.code().map(|c| c.to_string()),
                db_err.message().to_string(),
            ),
            sqlx::Error::Configuration(msg) => {
                DriverFault::new(None, format!("Configuration error: {}", msg))
            }
            sqlx::Error::Io(io_err) => DriverFault::new(None, format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => DriverFault::new(None, format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => DriverFault::new(None, format!("Protocol error: {}", msg)),
            sqlx::Error::ColumnDecode { index, source } => DriverFault::new(
                None,
                format!("Failed to decode column {}: {}", index, source),
            ),
            sqlx::Error::Decode(source) => DriverFault::new(None, format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DriverFault::new(None, "Database worker crashed"),
            other => DriverFault::new(None, format!("Driver error: {}", other)),
        }
    }
}
