//! Protocol error types

use crate::AttributeKind;

/// The GATT characteristic a packet travelled on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamId {
    NotificationSource,
    ControlPoint,
    DataSource,
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamId::NotificationSource => write!(f, "notification source"),
            StreamId::ControlPoint => write!(f, "control point"),
            StreamId::DataSource => write!(f, "data source"),
        }
    }
}

/// Errors raised while decoding or encoding ANCS packets.
///
/// Unknown event, category and attribute codes are not errors; they decode to
/// the `Unknown(code)` variant of their enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("{stream} packet too short: expected at least {expected} bytes, got {actual}")]
    ShortPacket {
        stream: StreamId,
        expected: usize,
        actual: usize,
    },

    #[error("attribute {0} is variable-length and needs a max length")]
    MissingMaxLength(AttributeKind),

    #[error("max length {len} for attribute {kind} does not fit in 16 bits")]
    MaxLengthOverflow { kind: AttributeKind, len: usize },
}

impl ProtocolError {
    pub(crate) fn short(stream: StreamId, expected: usize, actual: usize) -> Self {
        ProtocolError::ShortPacket {
            stream,
            expected,
            actual,
        }
    }
}
