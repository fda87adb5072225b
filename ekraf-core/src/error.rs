use std::fmt;

/// Errors surfaced by a query backend or the dataset service.
///
/// All of these look the same to the dashboard user (a generic error with a
/// retry button); the variants exist for logging and for the CLI.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The backend answered with a non-success status.
    Http { status: u16, message: String },
    /// The request never produced a response.
    Transport(String),
    /// The response body could not be decoded into rows.
    Decode(String),
    /// The backend rejected the statement (constraint, SQL error, ...).
    Backend(String),
    /// A table, column or procedure name failed identifier validation.
    InvalidIdentifier(String),
    /// Pages are 1-based.
    InvalidPage(u32),
    UnknownProcedure(String),
    UnknownDataset(String),
    NotFound { table: String, id: i64 },
    Auth(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, message } => write!(f, "backend returned {}: {}", status, message),
            Self::Transport(msg) => write!(f, "request failed: {}", msg),
            Self::Decode(msg) => write!(f, "could not decode response: {}", msg),
            Self::Backend(msg) => write!(f, "backend error: {}", msg),
            Self::InvalidIdentifier(name) => write!(f, "invalid identifier: {:?}", name),
            Self::InvalidPage(page) => write!(f, "invalid page {} (pages start at 1)", page),
            Self::UnknownProcedure(name) => write!(f, "unknown procedure: {}", name),
            Self::UnknownDataset(name) => write!(f, "unknown dataset: {}", name),
            Self::NotFound { table, id } => write!(f, "no row {} in {}", id, table),
            Self::Auth(msg) => write!(f, "authentication failed: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Decode(err.to_string())
    }
}

#[cfg(feature = "api")]
impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => QueryError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_decode() => QueryError::Decode(err.to_string()),
            None => QueryError::Transport(err.to_string()),
        }
    }
}
