//! # Error Types
//!
//! Structured errors for each collaborator (store, lock, generator, configuration)
//! and the top-level [`CoordinatorError`] surfaced by
//! [`ContentCoordinator::get_or_generate`](crate::coordinator::ContentCoordinator::get_or_generate).
//!
//! "Cache miss" and "lock not acquired" are not errors: they are states of the
//! coordinator and never appear here.

use thiserror::Error;

/// Record store failures. Never retried by the coordinator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store connection error: {message}")]
    Connection { message: String },

    #[error("Store query error: {operation}: {message}")]
    Query { operation: String, message: String },

    #[error("Stored record could not be decoded: {message}")]
    Decode { message: String },
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn query(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Lock backend failures.
///
/// The coordinator treats these as "lock not acquired" and falls through to polling.
#[derive(Error, Debug)]
pub enum LockError {
    #[error("Lock backend connection error: {message}")]
    Connection { message: String },

    #[error("Lock backend error: {operation} on {key}: {message}")]
    Backend {
        operation: String,
        key: String,
        message: String,
    },
}

impl LockError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn backend(
        operation: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            operation: operation.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Generator failures: transport problems and payloads too malformed to salvage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("Generator request failed: {message}")]
    Request { message: String },

    #[error("Generator upstream returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Generator call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Generator output is malformed: {message}")]
    MalformedOutput { message: String },
}

impl GeneratorError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            message: message.into(),
        }
    }
}

/// Configuration loading and validation failures
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },
}

impl ConfigurationError {
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        Self::Load(err.to_string())
    }
}

/// Why a request ended in [`CoordinatorError::GenerationFailed`].
///
/// Callers are expected to handle every reason the same way (retry later); the
/// distinction exists for logs and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationFailure {
    /// This caller won the lock and the generator failed.
    Generator(GeneratorError),
    /// This caller never won the lock and no record appeared within the poll budget.
    WaitExhausted { rounds: u32 },
}

impl std::fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generator(err) => write!(f, "{err}"),
            Self::WaitExhausted { rounds } => {
                write!(f, "no record appeared after {rounds} poll rounds")
            }
        }
    }
}

/// Errors returned by the coordinator to its caller
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Content generation failed for {category}/{date}: {reason}")]
    GenerationFailed {
        category: String,
        date: chrono::NaiveDate,
        reason: GenerationFailure,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl CoordinatorError {
    pub fn generation_failed(
        category: impl Into<String>,
        date: chrono::NaiveDate,
        reason: GenerationFailure,
    ) -> Self {
        Self::GenerationFailed {
            category: category.into(),
            date,
            reason,
        }
    }

    /// Whether a client should retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GenerationFailed { .. })
    }
}

/// Failures while wiring backends together from configuration
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type LockResult<T> = std::result::Result<T, LockError>;
pub type GeneratorResult<T> = std::result::Result<T, GeneratorError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
pub type CoordinatorResult<T> = std::result::Result<T, CoordinatorError>;
pub type BootstrapResult<T> = std::result::Result<T, BootstrapError>;
