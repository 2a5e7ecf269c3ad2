use std::fmt;

/// Status carried by transport failures that never produced an HTTP response
/// (connection refused, DNS, timeout).
pub const NETWORK_FAILURE_STATUS: u16 = 0;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    StorageUnavailable(String),
    Transport { status: u16, message: String },
    Unauthorized(String),
    NotFound(String),
    InvalidInput(String),
    ValidationError(String),
    ConfigurationError(String),
    SerializationError(String),
    DeserializationError(String),
    Internal(String),
}

impl AppError {
    pub fn transport(status: u16, message: impl Into<String>) -> Self {
        AppError::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::transport(NETWORK_FAILURE_STATUS, message)
    }

    /// True when the request never reached the server.
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            AppError::Transport {
                status: NETWORK_FAILURE_STATUS,
                ..
            }
        )
    }

    pub fn transport_status(&self) -> Option<u16> {
        match self {
            AppError::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            AppError::Transport { status, message } => {
                write!(f, "Transport error ({}): {}", status, message)
            }
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Configuration(_) => AppError::StorageUnavailable(err.to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AppError::transport(status.as_u16(), err.to_string()),
            None if err.is_decode() => AppError::DeserializationError(err.to_string()),
            None => AppError::network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<crate::domain::entities::PayloadError> for AppError {
    fn from(err: crate::domain::entities::PayloadError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_are_status_zero_transport_errors() {
        assert!(AppError::network("connection refused").is_network_failure());
        assert!(!AppError::transport(503, "unavailable").is_network_failure());
        assert!(!AppError::Database("locked".into()).is_network_failure());
    }

    #[test]
    fn pool_errors_map_to_storage_unavailable() {
        let err: AppError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, AppError::StorageUnavailable(_)));

        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn transport_display_includes_status() {
        let err = AppError::transport(404, "missing");
        assert_eq!(err.to_string(), "Transport error (404): missing");
        assert_eq!(err.transport_status(), Some(404));
    }
}
