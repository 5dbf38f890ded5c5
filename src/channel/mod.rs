//! Control channel between the popup and the page-resident engine.
//!
//! Messages are JSON records tagged by `type`. `STATUS` is the only request
//! with a reply; everything else is fire-and-forget and the caller re-polls
//! status if it needs to. Envelopes from any sender other than the
//! extension itself are dropped.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::link::LinkNormalizer;
use crate::queue::store::decode_state;
use crate::queue::{QueueState, StatusReport};

pub use client::{ControlClient, SendOutcome};

/// Every request kind the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    #[serde(alias = "IRS_STATUS")]
    Status,
    #[serde(alias = "IRS_SHUFFLE")]
    Shuffle,
    #[serde(alias = "IRS_FETCH_ALL")]
    FetchAll,
    #[serde(alias = "IRS_NEXT")]
    Next,
    #[serde(alias = "IRS_RANDOM")]
    Random,
    #[serde(alias = "IRS_CLEAR")]
    Clear,
}

impl Request {
    /// Parse an untrusted message. Unknown or malformed tags yield `None`.
    pub fn from_value(message: &Value) -> Option<Self> {
        match Request::deserialize(message) {
            Ok(request) => Some(request),
            Err(e) => {
                log::debug!("Ignoring unrecognised message {}: {}", message, e);
                None
            }
        }
    }

    pub fn to_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Requests that end with the page navigating away.
    pub fn navigates(self) -> bool {
        matches!(
            self,
            Request::Shuffle | Request::FetchAll | Request::Next | Request::Random
        )
    }

    pub fn expects_reply(self) -> bool {
        self == Request::Status
    }
}

/// A message plus the identity of whoever sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub sender: String,
    pub message: Value,
}

impl Envelope {
    pub fn new(sender: impl Into<String>, request: Request) -> Self {
        Self {
            sender: sender.into(),
            message: request.to_value(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("page engine unreachable: {0}")]
    Unreachable(String),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error("no reply to a request that expects one")]
    NoReply,
}

/// Wire form of the `STATUS` reply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply<'a> {
    pub queue: &'a QueueState,
    pub visible_count: usize,
}

impl StatusReply<'_> {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Decode a `STATUS` reply. The queue inside is as untrusted as stored
/// state and goes through the same validation.
pub fn decode_status(
    reply: &Value,
    normalizer: &LinkNormalizer,
    max_links: usize,
) -> Result<StatusReport, ChannelError> {
    let record = reply
        .as_object()
        .ok_or_else(|| ChannelError::MalformedReply("reply is not a record".into()))?;
    let queue = record
        .get("queue")
        .ok_or_else(|| ChannelError::MalformedReply("missing queue".into()))?;
    let visible_count = record
        .get("visibleCount")
        .and_then(Value::as_u64)
        .ok_or_else(|| ChannelError::MalformedReply("missing visibleCount".into()))?;
    Ok(StatusReport {
        queue: decode_state(queue, normalizer, max_links),
        visible_count: visible_count as usize,
    })
}

/// Receiving end: something that handles envelopes.
#[async_trait(?Send)]
pub trait Dispatch {
    /// Handle one envelope; `Some` only for requests with a reply.
    async fn dispatch(&self, envelope: Envelope) -> Option<Value>;
}

#[async_trait(?Send)]
impl<D: Dispatch + ?Sized> Dispatch for &D {
    async fn dispatch(&self, envelope: Envelope) -> Option<Value> {
        (**self).dispatch(envelope).await
    }
}

#[async_trait(?Send)]
impl<D: Dispatch + ?Sized> Dispatch for std::rc::Rc<D> {
    async fn dispatch(&self, envelope: Envelope) -> Option<Value> {
        (**self).dispatch(envelope).await
    }
}

/// Sending end, as seen by the popup.
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, envelope: Envelope) -> Result<Option<Value>, ChannelError>;
}

/// In-process transport straight into a dispatcher.
pub struct Loopback<D>(pub D);

#[async_trait(?Send)]
impl<D: Dispatch> Transport for Loopback<D> {
    async fn send(&self, envelope: Envelope) -> Result<Option<Value>, ChannelError> {
        Ok(self.0.dispatch(envelope).await)
    }
}

/// Transport for when no page instance is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disconnected;

#[async_trait(?Send)]
impl Transport for Disconnected {
    async fn send(&self, _envelope: Envelope) -> Result<Option<Value>, ChannelError> {
        Err(ChannelError::Unreachable("no page instance attached".into()))
    }
}
