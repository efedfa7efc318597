//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Boxed error carried across the hook boundary
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Formatter error with format type
    #[error("Formatter error ({format_type}): {message}")]
    FormatterError {
        format_type: String,
        message: String,
    },

    /// A hook failed to handle an entry
    #[error("Hook '{hook}' failed: {source}")]
    Hook {
        hook: String,
        #[source]
        source: BoxError,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a formatter error
    pub fn formatter(format_type: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatterError {
            format_type: format_type.into(),
            message: message.into(),
        }
    }

    /// Wrap a hook-specific error, keeping it available for downcasting
    pub fn hook<E>(hook: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        LoggerError::Hook {
            hook: hook.into(),
            source: source.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Borrow the hook's own error as `E`, if this is a hook failure of that type
    pub fn hook_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            LoggerError::Hook { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
