//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type MediResult<T> = Result<T, MediError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the Medi-CoPilot client
///
/// Note that "no session" is not an error anywhere in this taxonomy; absence
/// is a normal value reported through `ReadOutcome::Absent` in the session
/// crate. Errors here are actual faults.
#[derive(Error, Debug)]
pub enum MediError {
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Token decode error: {message}")]
    Decode {
        message: String,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        context: ErrorContext,
    },

    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Resource not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MediError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            MediError::Storage { context, .. } => Some(context),
            MediError::Decode { context, .. } => Some(context),
            MediError::Network { context, .. } => Some(context),
            MediError::Api { context, .. } => Some(context),
            MediError::Authentication { context, .. } => Some(context),
            MediError::Config { context, .. } => Some(context),
            MediError::Validation { context, .. } => Some(context),
            MediError::NotFound { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediError::Network { .. } => true,
            MediError::Api { status, .. } => matches!(status, Some(s) if *s >= 500),
            MediError::Storage { .. } => true,
            MediError::Authentication { .. } => false,
            MediError::Decode { .. } => false,
            MediError::Config { .. } => false,
            MediError::Validation { .. } => false,
            MediError::NotFound { .. } => false,
            _ => false,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            MediError::Config { .. } | MediError::Validation { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or validation error"
                );
            }
            MediError::Network { .. } | MediError::Storage { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Network or storage error (may be recoverable)"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        MediError::Storage {
            message: $msg.to_string(),
            source: None,
            context: ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        MediError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! decode_error {
    ($msg:expr, $component:expr) => {
        MediError::Decode {
            message: $msg.to_string(),
            context: ErrorContext::new($component)
                .with_suggestion("Treat the session as not authenticated and log in again"),
        }
    };
}

