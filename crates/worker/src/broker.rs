//! Task sources: where raw Celery messages come from.
//!
//! [`AmqpTaskSource`] consumes the Celery queue on a RabbitMQ broker.
//! [`ChannelTaskSource`] feeds messages from an in-process channel.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Connection, ConnectionProperties, Consumer};
use tokio::sync::mpsc;

use crate::celery::RawMessage;

/// Consumer tag announced to the broker.
const CONSUMER_TAG: &str = "qbench-worker";

/// Kombu's default password when the URL names a user without one.
const DEFAULT_PASSWORD: &str = "guest";

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Invalid broker URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported broker scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Broker closed the consumer")]
    ConsumerClosed,
}

/// A stream of raw task messages.
#[async_trait]
pub trait TaskSource: Send {
    /// Wait for the next message.
    ///
    /// `Ok(None)` means the source is exhausted and will never yield again.
    /// Errors are transient: calling `next` again retries.
    async fn next(&mut self) -> Result<Option<RawMessage>, BrokerError>;
}

// ---------------------------------------------------------------------------
// AMQP
// ---------------------------------------------------------------------------

/// Rewrite a Celery/kombu broker URL into a plain AMQP URI.
///
/// `pyamqp://` and `librabbitmq://` become `amqp://`, and a user given
/// without a password gets the `guest` default, as kombu does.
pub fn normalize_broker_url(raw: &str) -> Result<String, BrokerError> {
    let mut url =
        reqwest::Url::parse(raw).map_err(|e| BrokerError::InvalidUrl(format!("{raw}: {e}")))?;

    match url.scheme() {
        "amqp" | "amqps" => {}
        "pyamqp" | "librabbitmq" => url
            .set_scheme("amqp")
            .map_err(|()| BrokerError::InvalidUrl(raw.to_string()))?,
        other => return Err(BrokerError::UnsupportedScheme(other.to_string())),
    }

    if !url.username().is_empty() && url.password().is_none() {
        url.set_password(Some(DEFAULT_PASSWORD))
            .map_err(|()| BrokerError::InvalidUrl(raw.to_string()))?;
    }

    Ok(url.to_string())
}

/// Consumes Celery messages from a RabbitMQ queue.
///
/// The connection is opened lazily and dropped on any error; the next call
/// to [`TaskSource::next`] reconnects.
pub struct AmqpTaskSource {
    uri: String,
    queue: String,
    session: Option<(Connection, Consumer)>,
}

impl AmqpTaskSource {
    pub fn new(broker_url: &str, queue: &str) -> Result<Self, BrokerError> {
        Ok(Self {
            uri: normalize_broker_url(broker_url)?,
            queue: queue.to_string(),
            session: None,
        })
    }

    async fn connect(&self) -> Result<(Connection, Consumer), BrokerError> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        // One unacknowledged message at a time per worker.
        channel.basic_qos(1, BasicQosOptions::default()).await?;
        channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        let consumer = channel
            .basic_consume(
                &self.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!(queue = %self.queue, "Consuming from broker");
        Ok((connection, consumer))
    }
}

#[async_trait]
impl TaskSource for AmqpTaskSource {
    async fn next(&mut self) -> Result<Option<RawMessage>, BrokerError> {
        if self.session.is_none() {
            self.session = Some(self.connect().await?);
        }
        let Some((_, consumer)) = self.session.as_mut() else {
            return Err(BrokerError::ConsumerClosed);
        };

        let mut delivery = match consumer.next().await {
            Some(Ok(delivery)) => delivery,
            Some(Err(e)) => {
                self.session = None;
                return Err(e.into());
            }
            None => {
                self.session = None;
                return Err(BrokerError::ConsumerClosed);
            }
        };

        // Acknowledge on receipt: a task that crashes the worker is not redelivered.
        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            self.session = None;
            return Err(e.into());
        }

        let properties = &delivery.properties;
        let headers = properties.headers().as_ref();
        let content_type = properties
            .content_type()
            .as_ref()
            .map(|s| s.as_str().to_string());
        let task = headers.and_then(|h| header_string(h, "task"));
        let id = headers.and_then(|h| header_string(h, "id"));

        Ok(Some(RawMessage {
            content_type,
            task,
            id,
            body: std::mem::take(&mut delivery.data),
        }))
    }
}

fn header_string(headers: &FieldTable, name: &str) -> Option<String> {
    let (_, value) = headers.inner().iter().find(|(key, _)| key.as_str() == name)?;
    match value {
        AMQPValue::LongString(s) => Some(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        AMQPValue::ShortString(s) => Some(s.as_str().to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// In-process channel
// ---------------------------------------------------------------------------

/// A task source fed through a tokio channel.
///
/// Exhausted once every [`mpsc::Sender`] has been dropped and the buffer
/// drained.
pub struct ChannelTaskSource {
    receiver: mpsc::Receiver<RawMessage>,
}

impl ChannelTaskSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<RawMessage>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self { receiver })
    }
}

#[async_trait]
impl TaskSource for ChannelTaskSource {
    async fn next(&mut self) -> Result<Option<RawMessage>, BrokerError> {
        Ok(self.receiver.recv().await)
    }
}
