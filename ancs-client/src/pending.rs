//! Pending attribute requests, keyed by notification UID

use std::collections::{BTreeSet, HashMap};

use ancs_proto::AttributeKind;

/// Lifecycle of a UID from the dispatcher's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Nothing outstanding
    Idle,
    /// A Control Point request was issued and no response has arrived yet
    Requested,
}

/// An outstanding "get notification attributes" request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub uid: u32,
    pub kinds: BTreeSet<AttributeKind>,
    pub state: RequestState,
    /// Bumped on every `put`, so a stale write result can tell whether its
    /// request has since been overwritten.
    pub seq: u64,
}

/// At most one pending request per UID; a new request for the same UID
/// replaces the old one, since the protocol carries nothing but the UID to
/// tell responses apart.
#[derive(Debug, Default)]
pub struct PendingRequestTable {
    entries: HashMap<u32, PendingRequest>,
    next_seq: u64,
}

impl PendingRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request for `uid` and return its sequence number
    pub fn put(&mut self, uid: u32, kinds: impl IntoIterator<Item = AttributeKind>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        let request = PendingRequest {
            uid,
            kinds: kinds.into_iter().collect(),
            state: RequestState::Requested,
            seq,
        };
        self.entries.insert(uid, request);
        seq
    }

    /// Remove the entry for `uid`. Removing an absent UID is a no-op.
    pub fn remove(&mut self, uid: u32) -> Option<PendingRequest> {
        self.entries.remove(&uid)
    }

    /// Remove the entry for `uid` only if it is still request `seq`
    pub fn remove_if_seq(&mut self, uid: u32, seq: u64) -> Option<PendingRequest> {
        match self.entries.get(&uid) {
            Some(entry) if entry.seq == seq => self.entries.remove(&uid),
            _ => None,
        }
    }

    pub fn contains(&self, uid: u32) -> bool {
        self.entries.contains_key(&uid)
    }

    pub fn get(&self, uid: u32) -> Option<&PendingRequest> {
        self.entries.get(&uid)
    }

    pub fn state(&self, uid: u32) -> RequestState {
        self.entries
            .get(&uid)
            .map(|entry| entry.state)
            .unwrap_or(RequestState::Idle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, returning how many there were
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }
}
