//! Popup side of the control channel.

use super::{decode_status, ChannelError, Envelope, Request, Transport};
use crate::host::KeyValueStore;
use crate::queue::{QueueStore, StatusReport};

/// Result of a fire-and-forget request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the page. `navigates` tells the caller the page is leaving.
    Delivered { navigates: bool },
    /// The page could not be reached; nothing happened.
    Unreachable,
}

/// Drives a page engine over a [`Transport`], reading persisted state
/// directly only to display something when the page is unreachable.
pub struct ControlClient<T, S> {
    transport: T,
    fallback: QueueStore<S>,
    sender: String,
}

impl<T: Transport, S: KeyValueStore> ControlClient<T, S> {
    pub fn new(transport: T, fallback: QueueStore<S>, sender: impl Into<String>) -> Self {
        Self {
            transport,
            fallback,
            sender: sender.into(),
        }
    }

    /// Poll status. An unreachable page falls back to stored state with a
    /// visible count of zero.
    pub async fn status(&self) -> StatusReport {
        match self.request_status().await {
            Ok(report) => report,
            Err(e) => {
                log::debug!("Status unavailable from page ({}), reading storage", e);
                StatusReport {
                    queue: self.fallback.load().await,
                    visible_count: 0,
                }
            }
        }
    }

    async fn request_status(&self) -> Result<StatusReport, ChannelError> {
        let reply = self
            .transport
            .send(Envelope::new(self.sender.clone(), Request::Status))
            .await?
            .ok_or(ChannelError::NoReply)?;
        decode_status(&reply, self.fallback.normalizer(), self.fallback.max_links())
    }

    /// Fire a mutating request. Never touches storage itself.
    pub async fn send(&self, request: Request) -> SendOutcome {
        match self
            .transport
            .send(Envelope::new(self.sender.clone(), request))
            .await
        {
            Ok(_) => SendOutcome::Delivered {
                navigates: request.navigates(),
            },
            Err(e) => {
                log::warn!("{:?} not delivered: {}", request, e);
                SendOutcome::Unreachable
            }
        }
    }
}
