//! Seam between the hook and an AMQP client
//!
//! The hook drives these three traits in a fixed order: dial, open a
//! channel, declare, publish, then close the channel and the connection.
//! `LapinBroker` is the production implementation; tests script their own.

use super::config::{Envelope, Publishing, QueueDeclaration};
use super::error::BrokerError;
use async_trait::async_trait;

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

#[async_trait]
pub trait Broker: Send + Sync {
    type Connection: BrokerConnection;

    async fn dial(&self, url: &str) -> BrokerResult<Self::Connection>;
}

#[async_trait]
pub trait BrokerConnection: Send + Sync {
    type Channel: BrokerChannel;

    /// Open a channel; with `confirms` the channel is put in confirm mode
    async fn open_channel(&self, confirms: bool) -> BrokerResult<Self::Channel>;

    /// Close the connection; closing twice is not an error
    async fn close(&self) -> BrokerResult<()>;
}

#[async_trait]
pub trait BrokerChannel: Send + Sync {
    async fn declare_queue(&self, declaration: &QueueDeclaration) -> BrokerResult<()>;

    /// Publish `body`; returns once the broker has taken the message (and
    /// confirmed it, in confirm mode)
    async fn publish(
        &self,
        publishing: &Publishing,
        envelope: &Envelope,
        body: &[u8],
    ) -> BrokerResult<()>;

    /// Close the channel; closing twice is not an error
    async fn close(&self) -> BrokerResult<()>;
}
