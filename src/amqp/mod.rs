//! AMQP hook: forwards accepted log entries to a broker queue

pub mod broker;
pub mod config;
pub mod error;
pub mod hook;
pub mod lapin_broker;
pub mod metrics;

pub use broker::{Broker, BrokerChannel, BrokerConnection, BrokerResult};
pub use config::{
    redact_url, Arguments, ChannelMode, DeliveryMode, Envelope, HookConfig, Publishing,
    QueueDeclaration, DEFAULT_CONTENT_TYPE,
};
pub use error::{AmqpHookError, AmqpResult, BrokerError, FailureKind, PublishRejected};
pub use hook::{AmqpHook, AmqpHookBuilder};
pub use lapin_broker::{LapinBroker, LapinChannel, LapinConnection};
pub use metrics::HookMetrics;
