//! Broker implementation on the `lapin` AMQP 0-9-1 client

use super::broker::{Broker, BrokerChannel, BrokerConnection, BrokerResult};
use super::config::{Arguments, Envelope, Publishing, QueueDeclaration};
use super::error::PublishRejected;
use crate::core::FieldValue;
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::sync::atomic::{AtomicBool, Ordering};

const REPLY_SUCCESS: u16 = 200;

/// Dials real brokers with `lapin`
///
/// lapin drives its sockets on its own reactor threads, so the futures
/// returned here can be awaited from any executor or blocked on directly.
#[derive(Debug, Clone, Default)]
pub struct LapinBroker {
    connection_name: Option<String>,
}

impl LapinBroker {
    /// Create a broker client with lapin's default connection properties
    pub fn new() -> Self {
        Self::default()
    }

    /// Name shown for the connection in the broker's management UI
    #[must_use]
    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = Some(name.into());
        self
    }

    fn connection_properties(&self) -> ConnectionProperties {
        let properties = ConnectionProperties::default();
        match self.connection_name {
            Some(ref name) => properties.with_connection_name(name.clone().into()),
            None => properties,
        }
    }
}

#[async_trait]
impl Broker for LapinBroker {
    type Connection = LapinConnection;

    async fn dial(&self, url: &str) -> BrokerResult<LapinConnection> {
        let inner = Connection::connect(url, self.connection_properties()).await?;
        Ok(LapinConnection {
            inner,
            closed: AtomicBool::new(false),
        })
    }
}

/// Open lapin connection; closing it more than once is a no-op
pub struct LapinConnection {
    inner: Connection,
    closed: AtomicBool,
}

#[async_trait]
impl BrokerConnection for LapinConnection {
    type Channel = LapinChannel;

    async fn open_channel(&self, confirms: bool) -> BrokerResult<LapinChannel> {
        let inner = self.inner.create_channel().await?;
        let channel = LapinChannel {
            inner,
            closed: AtomicBool::new(false),
        };
        if confirms {
            if let Err(e) = channel
                .inner
                .confirm_select(ConfirmSelectOptions::default())
                .await
            {
                if let Err(close_err) = channel.close().await {
                    tracing::warn!(error = %close_err, "failed to close AMQP channel");
                }
                return Err(e.into());
            }
        }
        Ok(channel)
    }

    async fn close(&self) -> BrokerResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) || !self.inner.status().connected() {
            return Ok(());
        }
        self.inner.close(REPLY_SUCCESS, "log entry published").await?;
        Ok(())
    }
}

/// Open lapin channel, in confirm mode when requested at open time
pub struct LapinChannel {
    inner: Channel,
    closed: AtomicBool,
}

#[async_trait]
impl BrokerChannel for LapinChannel {
    async fn declare_queue(&self, declaration: &QueueDeclaration) -> BrokerResult<()> {
        let options = QueueDeclareOptions {
            passive: false,
            durable: declaration.durable,
            exclusive: declaration.exclusive,
            auto_delete: declaration.auto_delete,
            nowait: declaration.no_wait,
        };
        self.inner
            .queue_declare(&declaration.name, options, field_table(&declaration.arguments))
            .await?;
        Ok(())
    }

    async fn publish(
        &self,
        publishing: &Publishing,
        envelope: &Envelope,
        body: &[u8],
    ) -> BrokerResult<()> {
        let options = BasicPublishOptions {
            mandatory: publishing.mandatory,
            immediate: publishing.immediate,
        };
        let confirmation = self
            .inner
            .basic_publish(
                &publishing.exchange,
                &publishing.routing_key,
                options,
                body,
                basic_properties(envelope),
            )
            .await?
            .await?;

        match confirmation {
            Confirmation::Nack(_) => Err(Box::new(PublishRejected::Nacked)),
            Confirmation::Ack(Some(returned)) => Err(Box::new(PublishRejected::Returned {
                reply_code: returned.reply_code,
                reply_text: returned.reply_text.as_str().to_string(),
            })),
            Confirmation::Ack(None) | Confirmation::NotRequested => Ok(()),
        }
    }

    async fn close(&self) -> BrokerResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) || !self.inner.status().connected() {
            return Ok(());
        }
        self.inner.close(REPLY_SUCCESS, "log entry published").await?;
        Ok(())
    }
}

fn amqp_value(value: &FieldValue) -> AMQPValue {
    match value {
        FieldValue::String(s) => AMQPValue::LongString(LongString::from(s.clone())),
        FieldValue::Int(i) => AMQPValue::LongLongInt(*i),
        FieldValue::Float(f) => AMQPValue::Double(*f),
        FieldValue::Bool(b) => AMQPValue::Boolean(*b),
        FieldValue::Null => AMQPValue::Void,
    }
}

fn field_table(arguments: &Arguments) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in arguments {
        table.insert(ShortString::from(key.clone()), amqp_value(value));
    }
    table
}

fn basic_properties(envelope: &Envelope) -> BasicProperties {
    let mut properties =
        BasicProperties::default().with_content_type(ShortString::from(envelope.content_type()));

    if !envelope.headers.is_empty() {
        properties = properties.with_headers(field_table(&envelope.headers));
    }
    if let Some(mode) = envelope.delivery_mode {
        properties = properties.with_delivery_mode(mode.as_u8());
    }
    if let Some(priority) = envelope.priority {
        properties = properties.with_priority(priority);
    }
    if let Some(ref app_id) = envelope.app_id {
        properties = properties.with_app_id(ShortString::from(app_id.clone()));
    }
    if let Some(ref message_id) = envelope.message_id {
        properties = properties.with_message_id(ShortString::from(message_id.clone()));
    }
    if let Some(ref correlation_id) = envelope.correlation_id {
        properties = properties.with_correlation_id(ShortString::from(correlation_id.clone()));
    }
    if let Some(ref expiration) = envelope.expiration {
        properties = properties.with_expiration(ShortString::from(expiration.clone()));
    }
    if let Some(ref kind) = envelope.kind {
        properties = properties.with_type(ShortString::from(kind.clone()));
    }
    if let Some(ref user_id) = envelope.user_id {
        properties = properties.with_user_id(ShortString::from(user_id.clone()));
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amqp::config::DeliveryMode;

    #[test]
    fn test_field_table_conversion() {
        let mut arguments = Arguments::new();
        arguments.insert("x-message-ttl".to_string(), FieldValue::Int(60_000));
        arguments.insert("x-queue-mode".to_string(), FieldValue::from("lazy"));

        let table = field_table(&arguments);
        let inner = table.inner();

        assert_eq!(
            inner.get(&ShortString::from("x-message-ttl")),
            Some(&AMQPValue::LongLongInt(60_000))
        );
        assert_eq!(
            inner.get(&ShortString::from("x-queue-mode")),
            Some(&AMQPValue::LongString(LongString::from("lazy")))
        );
    }

    #[test]
    fn test_basic_properties_from_envelope() {
        let envelope = Envelope {
            delivery_mode: Some(DeliveryMode::Persistent),
            app_id: Some("billing".to_string()),
            kind: Some("audit".to_string()),
            ..Envelope::default()
        }
        .resolved();

        let properties = basic_properties(&envelope);

        assert_eq!(
            properties.content_type().as_ref().map(|s| s.as_str()),
            Some("text/plain")
        );
        assert_eq!(*properties.delivery_mode(), Some(2));
        assert_eq!(
            properties.app_id().as_ref().map(|s| s.as_str()),
            Some("billing")
        );
        assert!(properties.headers().is_none());
    }

    #[test]
    fn test_connection_name_is_optional() {
        let broker = LapinBroker::new();
        assert!(broker.connection_name.is_none());

        let broker = broker.with_connection_name("orders-service");
        assert_eq!(broker.connection_name.as_deref(), Some("orders-service"));
    }
}
