//! Data Source attribute responses
//!
//! A "get notification attributes" response starts with the UID it answers
//! followed by a run of TLV records:
//!
//! ```text
//! +--------------+--------+--------------+-----------------+-----
//! | uid (u32 LE) | attrId | len (u16 LE) | value[0..len]   | ...
//! +--------------+--------+--------------+-----------------+-----
//! ```
//!
//! Parsing is lenient. A tail shorter than a record header, or a record whose
//! declared length overruns the buffer, ends the parse; the complete records
//! before it are returned and the dropped tail is described in
//! [`AttributeResponse::truncated`].

use std::collections::BTreeMap;

use crate::{ProtocolError, StreamId};

/// Size of the UID prefix on a Data Source response
pub const RESPONSE_UID_LEN: usize = 4;

/// Size of a TLV record header (attribute id + u16 length)
pub const TLV_HEADER_LEN: usize = 3;

/// Notification attribute ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKind {
    AppIdentifier,
    Title,
    Subtitle,
    Message,
    MessageSize,
    Date,
    PositiveActionLabel,
    NegativeActionLabel,
    Unknown(u8),
}

impl AttributeKind {
    /// Title, subtitle and message are length-bounded and need a max length
    /// in the request.
    pub fn is_variable_length(&self) -> bool {
        matches!(
            self,
            AttributeKind::Title | AttributeKind::Subtitle | AttributeKind::Message
        )
    }
}

impl From<u8> for AttributeKind {
    fn from(code: u8) -> Self {
        match code {
            0 => AttributeKind::AppIdentifier,
            1 => AttributeKind::Title,
            2 => AttributeKind::Subtitle,
            3 => AttributeKind::Message,
            4 => AttributeKind::MessageSize,
            5 => AttributeKind::Date,
            6 => AttributeKind::PositiveActionLabel,
            7 => AttributeKind::NegativeActionLabel,
            _ => AttributeKind::Unknown(code),
        }
    }
}

impl From<AttributeKind> for u8 {
    fn from(kind: AttributeKind) -> Self {
        match kind {
            AttributeKind::AppIdentifier => 0,
            AttributeKind::Title => 1,
            AttributeKind::Subtitle => 2,
            AttributeKind::Message => 3,
            AttributeKind::MessageSize => 4,
            AttributeKind::Date => 5,
            AttributeKind::PositiveActionLabel => 6,
            AttributeKind::NegativeActionLabel => 7,
            AttributeKind::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeKind::Unknown(code) => write!(f, "Unknown({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Raw attribute values of one response, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    values: BTreeMap<AttributeKind, Vec<u8>>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. A repeated kind replaces the earlier value.
    pub fn insert(&mut self, kind: AttributeKind, value: Vec<u8>) {
        self.values.insert(kind, value);
    }

    pub fn get(&self, kind: AttributeKind) -> Option<&[u8]> {
        self.values.get(&kind).map(Vec::as_slice)
    }

    /// Value decoded as text, see [`decode_text`]
    pub fn text(&self, kind: AttributeKind) -> Option<String> {
        self.get(kind).and_then(decode_text)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decode an attribute value as text.
///
/// Invalid UTF-8 is replaced rather than rejected, surrounding NULs and
/// whitespace are trimmed, and a value that ends up empty is `None`.
pub fn decode_text(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Tail of a response that could not be parsed into a complete record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    /// Offset into the response where the incomplete record starts
    pub offset: usize,
    /// Bytes left unparsed from `offset`
    pub remaining: usize,
}

/// A decoded Data Source response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeResponse {
    pub uid: u32,
    pub attributes: AttributeSet,
    pub truncated: Option<Truncation>,
}

impl AttributeResponse {
    /// Parse a response. Fails only when the UID prefix is missing.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < RESPONSE_UID_LEN {
            return Err(ProtocolError::short(
                StreamId::DataSource,
                RESPONSE_UID_LEN,
                data.len(),
            ));
        }

        let uid = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let mut attributes = AttributeSet::new();
        let mut pos = RESPONSE_UID_LEN;
        let mut truncated = None;

        while pos < data.len() {
            if data.len() - pos < TLV_HEADER_LEN {
                truncated = Some(Truncation { offset: pos, remaining: data.len() - pos });
                break;
            }

            let kind = AttributeKind::from(data[pos]);
            let len = u16::from_le_bytes([data[pos + 1], data[pos + 2]]) as usize;
            let start = pos + TLV_HEADER_LEN;

            if data.len() < start + len {
                truncated = Some(Truncation { offset: pos, remaining: data.len() - pos });
                break;
            }

            attributes.insert(kind, data[start..start + len].to_vec());
            pos = start + len;
        }

        Ok(Self { uid, attributes, truncated })
    }
}
