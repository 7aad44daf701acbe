//! ANCS dispatcher - the per-UID state machine
//!
//! Every UID moves `Idle -> Requested -> Idle`. An `Added` event issues a
//! "get notification attributes" request and marks the UID `Requested`; the
//! matching Data Source response, a `Removed` event, a failed write or a
//! disconnect brings it back to `Idle`.
//!
//! The dispatcher does no I/O. It returns the bytes to write and the
//! summaries to emit, and the engine carries them out.

use ancs_proto::{
    AttributeKind, AttributeRequest, AttributeResponse, EventKind, GetNotificationAttributes,
    NotificationEvent, ProtocolError,
};
use tracing::{debug, info, warn};

use crate::{EngineError, PendingRequestTable, TransportError};

/// Dispatcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Max title length requested from the phone
    pub max_title_len: u16,
    /// Max message length requested from the phone
    pub max_message_len: u16,
    /// Fetch attributes again when a notification is modified
    pub refetch_on_modified: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_title_len: 64,
            max_message_len: 256,
            refetch_on_modified: false,
        }
    }
}

/// What a notification looked like once its attributes arrived
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationSummary {
    pub uid: u32,
    pub app_id: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    /// The Data Source payload this summary was built from
    pub raw: Vec<u8>,
}

impl NotificationSummary {
    /// Missing attributes become `None`, never an error
    pub fn from_response(response: &AttributeResponse, raw: &[u8]) -> Self {
        Self {
            uid: response.uid,
            app_id: response.attributes.text(AttributeKind::AppIdentifier),
            title: response.attributes.text(AttributeKind::Title),
            message: response.attributes.text(AttributeKind::Message),
            raw: raw.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.app_id.is_none() && self.title.is_none() && self.message.is_none()
    }
}

/// Encoded Control Point command waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub uid: u32,
    pub seq: u64,
    pub payload: Vec<u8>,
}

/// Result of handling one Notification Source packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub event: NotificationEvent,
    pub request: Option<OutgoingRequest>,
}

pub struct Dispatcher {
    config: DispatcherConfig,
    pending: PendingRequestTable,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            pending: PendingRequestTable::new(),
        }
    }

    pub fn pending(&self) -> &PendingRequestTable {
        &self.pending
    }

    /// Attributes requested for every new notification, in wire order
    pub fn attribute_requests(&self) -> Vec<AttributeRequest> {
        vec![
            AttributeRequest::new(AttributeKind::AppIdentifier),
            AttributeRequest::bounded(AttributeKind::Title, self.config.max_title_len),
            AttributeRequest::bounded(AttributeKind::Message, self.config.max_message_len),
        ]
    }

    /// Handle a Notification Source packet
    pub fn on_notification_source(&mut self, data: &[u8]) -> Result<EventOutcome, ProtocolError> {
        let event = NotificationEvent::decode(data)?;
        debug!(%event, "notification source");

        let request = match event.kind {
            EventKind::Added => Some(self.request_attributes(event.uid)?),
            EventKind::Modified if self.config.refetch_on_modified => {
                Some(self.request_attributes(event.uid)?)
            }
            EventKind::Removed => {
                if self.pending.remove(event.uid).is_some() {
                    debug!(uid = event.uid, "removed before attributes arrived");
                }
                None
            }
            EventKind::Modified | EventKind::Unknown(_) => None,
        };

        Ok(EventOutcome { event, request })
    }

    fn request_attributes(&mut self, uid: u32) -> Result<OutgoingRequest, ProtocolError> {
        let command = GetNotificationAttributes::new(uid, self.attribute_requests());
        let payload = command.encode()?;
        let seq = self.pending.put(uid, command.kinds());
        Ok(OutgoingRequest { uid, seq, payload })
    }

    /// Handle a Data Source packet.
    ///
    /// The pending entry is cleared whether or not one existed; a response
    /// for a UID that was already removed still produces a summary.
    pub fn on_data_source(&mut self, data: &[u8]) -> Result<NotificationSummary, ProtocolError> {
        let response = AttributeResponse::parse(data)?;

        if let Some(truncation) = response.truncated {
            warn!(
                uid = response.uid,
                offset = truncation.offset,
                remaining = truncation.remaining,
                "truncated attribute response, keeping complete records"
            );
        }

        if self.pending.remove(response.uid).is_none() {
            debug!(uid = response.uid, "attribute response with no pending request");
        }

        Ok(NotificationSummary::from_response(&response, data))
    }

    /// Feed back the outcome of a Control Point write. A failure rolls back
    /// the request it belonged to, unless a newer request replaced it.
    pub fn on_write_complete(
        &mut self,
        uid: u32,
        seq: u64,
        result: Result<(), TransportError>,
    ) -> Result<(), EngineError> {
        match result {
            Ok(()) => {
                debug!(uid, "requested attributes");
                Ok(())
            }
            Err(source) => {
                self.pending.remove_if_seq(uid, seq);
                Err(EngineError::Write { uid, source })
            }
        }
    }

    /// The write task died without reporting; treat it as a failed write
    pub fn on_write_panicked(&mut self, uid: u32, seq: u64) -> EngineError {
        self.pending.remove_if_seq(uid, seq);
        EngineError::WriteTaskPanicked { uid }
    }

    /// A new session starts with nothing pending, even if packets from it
    /// were handled before this event
    pub fn on_connected(&mut self) {
        let dropped = self.pending.clear();
        info!(dropped, "connected, starting with an empty request table");
    }

    /// UIDs do not survive a disconnect, so everything pending is abandoned
    pub fn on_disconnected(&mut self) {
        let dropped = self.pending.clear();
        info!(dropped, "disconnected, abandoned pending requests");
    }
}
