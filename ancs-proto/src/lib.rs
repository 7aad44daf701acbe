//! ANCS wire protocol - notification events, control point commands and
//! attribute responses
//!
//! Everything here is pure decoding and encoding; no I/O. The stateful side
//! (pending requests, correlation of the two notify streams) lives in
//! `ancs-client`.

pub mod ble;
mod attributes;
mod command;
mod error;
mod event;

pub use attributes::{
    decode_text, AttributeKind, AttributeResponse, AttributeSet, Truncation, RESPONSE_UID_LEN,
    TLV_HEADER_LEN,
};
pub use command::{AttributeRequest, GetNotificationAttributes, COMMAND_HEADER_LEN};
pub use error::{ProtocolError, StreamId};
pub use event::{Category, EventFlags, EventKind, NotificationEvent, NOTIFICATION_SOURCE_LEN};
