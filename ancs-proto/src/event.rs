//! Notification Source events
//!
//! Every packet on the Notification Source characteristic is 8 bytes,
//! little-endian:
//!
//! ```text
//! +---------+-------+----------+---------------+-----------------+
//! | eventId | flags | category | categoryCount | uid (u32 LE)    |
//! +---------+-------+----------+---------------+-----------------+
//!   0         1       2          3               4..8
//! ```

use crate::{ProtocolError, StreamId};

/// Minimum size of a Notification Source packet
pub const NOTIFICATION_SOURCE_LEN: usize = 8;

/// What happened to the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Modified,
    Removed,
    Unknown(u8),
}

impl From<u8> for EventKind {
    fn from(code: u8) -> Self {
        match code {
            0 => EventKind::Added,
            1 => EventKind::Modified,
            2 => EventKind::Removed,
            _ => EventKind::Unknown(code),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Added => write!(f, "Added"),
            EventKind::Modified => write!(f, "Modified"),
            EventKind::Removed => write!(f, "Removed"),
            EventKind::Unknown(code) => write!(f, "Unknown({code})"),
        }
    }
}

/// Notification category as reported by iOS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Other,
    IncomingCall,
    MissedCall,
    Voicemail,
    Social,
    Schedule,
    Email,
    News,
    Health,
    Business,
    Location,
    Entertainment,
    Unknown(u8),
}

impl From<u8> for Category {
    fn from(code: u8) -> Self {
        match code {
            0 => Category::Other,
            1 => Category::IncomingCall,
            2 => Category::MissedCall,
            3 => Category::Voicemail,
            4 => Category::Social,
            5 => Category::Schedule,
            6 => Category::Email,
            7 => Category::News,
            8 => Category::Health,
            9 => Category::Business,
            10 => Category::Location,
            11 => Category::Entertainment,
            _ => Category::Unknown(code),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Unknown(code) => write!(f, "Unknown({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

bitflags::bitflags! {
    /// Event flags bitfield. Bits iOS may add later are kept as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventFlags: u8 {
        const SILENT = 1 << 0;
        const IMPORTANT = 1 << 1;
        const PRE_EXISTING = 1 << 2;
        const POSITIVE_ACTION = 1 << 3;
        const NEGATIVE_ACTION = 1 << 4;
    }
}

/// A decoded Notification Source packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub flags: EventFlags,
    pub category: Category,
    pub category_count: u8,
    pub uid: u32,
}

impl NotificationEvent {
    /// Decode a Notification Source packet. Bytes past offset 8 are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < NOTIFICATION_SOURCE_LEN {
            return Err(ProtocolError::short(
                StreamId::NotificationSource,
                NOTIFICATION_SOURCE_LEN,
                data.len(),
            ));
        }

        Ok(Self {
            kind: EventKind::from(data[0]),
            flags: EventFlags::from_bits_retain(data[1]),
            category: Category::from(data[2]),
            category_count: data[3],
            uid: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
        })
    }
}

impl std::fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: uid={} category={} (count={}) flags=0b{:08b}",
            self.kind,
            self.uid,
            self.category,
            self.category_count,
            self.flags.bits()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_social_added() {
        let event = NotificationEvent::decode(&[0x00, 0x01, 0x04, 0x01, 0x2A, 0x00, 0x00, 0x00]).unwrap();

        assert_eq!(event.kind, EventKind::Added);
        assert_eq!(event.flags.bits(), 0b0000_0001);
        assert!(event.flags.contains(EventFlags::SILENT));
        assert_eq!(event.category, Category::Social);
        assert_eq!(event.category_count, 1);
        assert_eq!(event.uid, 42);
    }

    #[test]
    fn test_short_packets_rejected() {
        let packet = [0u8; NOTIFICATION_SOURCE_LEN];
        for len in 0..NOTIFICATION_SOURCE_LEN {
            let err = NotificationEvent::decode(&packet[..len]).unwrap_err();
            assert_eq!(
                err,
                ProtocolError::ShortPacket {
                    stream: StreamId::NotificationSource,
                    expected: 8,
                    actual: len,
                }
            );
        }
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        let event = NotificationEvent::decode(&[0x07, 0xFF, 0x63, 0x00, 0x01, 0x02, 0x03, 0x04]).unwrap();

        assert_eq!(event.kind, EventKind::Unknown(7));
        assert_eq!(event.category, Category::Unknown(99));
        // Undocumented bits survive
        assert_eq!(event.flags.bits(), 0xFF);
        assert_eq!(event.uid, 0x0403_0201);
        assert_eq!(event.to_string(), "Unknown(7): uid=67305985 category=Unknown(99) (count=0) flags=0b11111111");
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let event = NotificationEvent::decode(&[0x02, 0x00, 0x06, 0x03, 0x10, 0x00, 0x00, 0x00, 0xDE, 0xAD]).unwrap();

        assert_eq!(event.kind, EventKind::Removed);
        assert_eq!(event.category, Category::Email);
        assert_eq!(event.uid, 16);
    }
}
