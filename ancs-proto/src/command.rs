//! Control Point commands
//!
//! ```text
//! +-------+--------------+--------+----------------------+-----
//! | cmdId | uid (u32 LE) | attrId | [maxLen (u16 LE)]    | ...
//! +-------+--------------+--------+----------------------+-----
//! ```
//!
//! `maxLen` follows only the variable-length attributes (title, subtitle,
//! message).

use crate::ble::commands;
use crate::{AttributeKind, ProtocolError, StreamId};

/// Size of the command id + UID header
pub const COMMAND_HEADER_LEN: usize = 5;

/// One attribute asked for in a [`GetNotificationAttributes`] command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRequest {
    pub kind: AttributeKind,
    pub max_len: Option<u16>,
}

impl AttributeRequest {
    /// Request a fixed-format attribute such as the app identifier or date
    pub fn new(kind: AttributeKind) -> Self {
        Self { kind, max_len: None }
    }

    /// Request an attribute truncated to `max_len` bytes by the phone
    pub fn bounded(kind: AttributeKind, max_len: u16) -> Self {
        Self { kind, max_len: Some(max_len) }
    }

    /// Like [`AttributeRequest::bounded`] but for a length coming from
    /// configuration, rejecting anything that does not fit on the wire.
    pub fn bounded_from_len(kind: AttributeKind, len: usize) -> Result<Self, ProtocolError> {
        let max_len = u16::try_from(len).map_err(|_| ProtocolError::MaxLengthOverflow { kind, len })?;
        Ok(Self::bounded(kind, max_len))
    }
}

/// "Get Notification Attributes" command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetNotificationAttributes {
    pub uid: u32,
    pub attributes: Vec<AttributeRequest>,
}

impl GetNotificationAttributes {
    pub fn new(uid: u32, attributes: Vec<AttributeRequest>) -> Self {
        Self { uid, attributes }
    }

    /// Requested kinds in wire order
    pub fn kinds(&self) -> impl Iterator<Item = AttributeKind> + '_ {
        self.attributes.iter().map(|a| a.kind)
    }

    /// Encode the command in caller order, without reordering or
    /// deduplication.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::with_capacity(COMMAND_HEADER_LEN + self.attributes.len() * 3);
        buf.push(commands::GET_NOTIFICATION_ATTRIBUTES);
        buf.extend_from_slice(&self.uid.to_le_bytes());

        for attr in &self.attributes {
            buf.push(attr.kind.into());
            if attr.kind.is_variable_length() {
                let max_len = attr.max_len.ok_or(ProtocolError::MissingMaxLength(attr.kind))?;
                buf.extend_from_slice(&max_len.to_le_bytes());
            }
        }

        Ok(buf)
    }

    /// Decode a command produced by [`GetNotificationAttributes::encode`].
    ///
    /// The command id byte is not checked; callers dispatch on it first.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < COMMAND_HEADER_LEN {
            return Err(ProtocolError::short(StreamId::ControlPoint, COMMAND_HEADER_LEN, data.len()));
        }

        let uid = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
        let mut attributes = Vec::new();
        let mut pos = COMMAND_HEADER_LEN;

        while pos < data.len() {
            let kind = AttributeKind::from(data[pos]);
            pos += 1;

            if kind.is_variable_length() {
                if data.len() < pos + 2 {
                    return Err(ProtocolError::short(StreamId::ControlPoint, pos + 2, data.len()));
                }
                let max_len = u16::from_le_bytes([data[pos], data[pos + 1]]);
                pos += 2;
                attributes.push(AttributeRequest::bounded(kind, max_len));
            } else {
                attributes.push(AttributeRequest::new(kind));
            }
        }

        Ok(Self { uid, attributes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_request(uid: u32) -> GetNotificationAttributes {
        GetNotificationAttributes::new(
            uid,
            vec![
                AttributeRequest::new(AttributeKind::AppIdentifier),
                AttributeRequest::bounded(AttributeKind::Title, 64),
                AttributeRequest::bounded(AttributeKind::Message, 256),
            ],
        )
    }

    #[test]
    fn test_encode_layout() {
        let bytes = standard_request(7).encode().unwrap();

        assert_eq!(
            bytes,
            vec![
                0x00, // GetNotificationAttributes
                0x07, 0x00, 0x00, 0x00, // uid
                0x00, // AppIdentifier
                0x01, 0x40, 0x00, // Title, 64
                0x03, 0x00, 0x01, // Message, 256
            ]
        );
    }

    #[test]
    fn test_decode_recovers_uid_and_order() {
        let uid = 0xDEAD_BEEF;
        let request = standard_request(uid);
        let decoded = GetNotificationAttributes::decode(&request.encode().unwrap()).unwrap();

        assert_eq!(decoded.uid, uid);
        assert_eq!(
            decoded.kinds().collect::<Vec<_>>(),
            vec![AttributeKind::AppIdentifier, AttributeKind::Title, AttributeKind::Message]
        );
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_fixed_kinds_drop_max_len() {
        let request = GetNotificationAttributes::new(
            1,
            vec![
                AttributeRequest::bounded(AttributeKind::Date, 99),
                AttributeRequest::new(AttributeKind::Date),
                AttributeRequest::bounded(AttributeKind::Subtitle, 0x0102),
            ],
        );

        // No reordering, no dedupe, and the Date max length never reaches the wire
        assert_eq!(
            request.encode().unwrap(),
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x05, 0x02, 0x02, 0x01]
        );
    }

    #[test]
    fn test_variable_kind_needs_max_len() {
        let request = GetNotificationAttributes::new(1, vec![AttributeRequest::new(AttributeKind::Message)]);

        assert_eq!(request.encode(), Err(ProtocolError::MissingMaxLength(AttributeKind::Message)));
    }

    #[test]
    fn test_max_len_overflow_rejected() {
        assert_eq!(
            AttributeRequest::bounded_from_len(AttributeKind::Title, 70_000),
            Err(ProtocolError::MaxLengthOverflow { kind: AttributeKind::Title, len: 70_000 })
        );
        assert_eq!(
            AttributeRequest::bounded_from_len(AttributeKind::Title, 65_535),
            Ok(AttributeRequest::bounded(AttributeKind::Title, u16::MAX))
        );
    }

    #[test]
    fn test_decode_truncated_max_len() {
        let err = GetNotificationAttributes::decode(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x40]).unwrap_err();

        assert_eq!(
            err,
            ProtocolError::ShortPacket { stream: StreamId::ControlPoint, expected: 8, actual: 7 }
        );
    }
}
