//! Failures of a single AMQP publish attempt

use crate::core::{BoxError, LoggerError};
use std::fmt;

/// Error from the broker client, kept intact for downcasting
pub type BrokerError = BoxError;

pub type AmqpResult<T> = std::result::Result<T, AmqpHookError>;

/// Which step of the publish path failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Connection,
    Channel,
    QueueDeclaration,
    Serialization,
    Publish,
}

impl FailureKind {
    pub const ALL: [FailureKind; 5] = [
        FailureKind::Connection,
        FailureKind::Channel,
        FailureKind::QueueDeclaration,
        FailureKind::Serialization,
        FailureKind::Publish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Connection => "connection",
            FailureKind::Channel => "channel",
            FailureKind::QueueDeclaration => "queue_declaration",
            FailureKind::Serialization => "serialization",
            FailureKind::Publish => "publish",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AmqpHookError {
    /// Dialing the broker failed; `url` has its password redacted
    #[error("failed to create a new connection to {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: BrokerError,
    },

    #[error("failed to open a new server channel: {source}")]
    Channel {
        #[source]
        source: BrokerError,
    },

    #[error("failed to declare the {queue} queue: {source}")]
    QueueDeclaration {
        queue: String,
        #[source]
        source: BrokerError,
    },

    #[error("failed to render the log entry: {source}")]
    Serialization {
        #[source]
        source: LoggerError,
    },

    #[error("failed to publish the entry {body}: {source}")]
    Publish {
        body: String,
        #[source]
        source: BrokerError,
    },
}

impl AmqpHookError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AmqpHookError::Connection { .. } => FailureKind::Connection,
            AmqpHookError::Channel { .. } => FailureKind::Channel,
            AmqpHookError::QueueDeclaration { .. } => FailureKind::QueueDeclaration,
            AmqpHookError::Serialization { .. } => FailureKind::Serialization,
            AmqpHookError::Publish { .. } => FailureKind::Publish,
        }
    }

    /// The broker client's own error, when the failure came from the broker
    pub fn broker_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            AmqpHookError::Connection { source, .. }
            | AmqpHookError::Channel { source }
            | AmqpHookError::QueueDeclaration { source, .. }
            | AmqpHookError::Publish { source, .. } => Some(source.as_ref()),
            AmqpHookError::Serialization { .. } => None,
        }
    }
}

/// Raised by the broker adapter when the broker refuses a publish
#[derive(Debug, thiserror::Error)]
pub enum PublishRejected {
    #[error("broker negatively acknowledged the message")]
    Nacked,

    #[error("message returned as unroutable: {reply_code} {reply_text}")]
    Returned { reply_code: u16, reply_text: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn refused() -> BrokerError {
        Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))
    }

    #[test]
    fn test_messages_carry_context() {
        let err = AmqpHookError::Connection {
            url: "amqp://rabbit".to_string(),
            source: refused(),
        };
        assert_eq!(
            err.to_string(),
            "failed to create a new connection to amqp://rabbit: connection refused"
        );

        let err = AmqpHookError::QueueDeclaration {
            queue: "logs".to_string(),
            source: refused(),
        };
        assert!(err.to_string().contains("the logs queue"));

        let err = AmqpHookError::Publish {
            body: "msg=hello".to_string(),
            source: Box::new(PublishRejected::Nacked),
        };
        assert!(err.to_string().contains("msg=hello"));
    }

    #[test]
    fn test_source_is_preserved() {
        let err = AmqpHookError::Channel { source: refused() };

        assert_eq!(err.kind(), FailureKind::Channel);
        let io = err
            .broker_source()
            .and_then(|e| e.downcast_ref::<std::io::Error>())
            .unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_serialization_has_no_broker_source() {
        let err = AmqpHookError::Serialization {
            source: LoggerError::formatter("custom", "bad field"),
        };
        assert_eq!(err.kind(), FailureKind::Serialization);
        assert!(err.broker_source().is_none());
        assert_eq!(
            err.to_string(),
            "failed to render the log entry: Formatter error (custom): bad field"
        );
    }
}
