use tracing::trace;

use crate::core::{Uid, MAX_EMPTY_READS};

/// Detection state of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// No card on the reader
    Absent,
    /// A card is on the reader
    Present(Uid),
}

/// Change worth reporting after a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    /// A card was detected; announced on the bus
    Detected(Uid),
    /// The card left the reader
    Removed(Uid),
}

/// Per-port presence state machine with empty-read debounce
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    state: PresenceState,
    empty_reads: u8,
}

impl PresenceTracker {
    /// Creates a tracker with no card present
    pub fn new() -> Self {
        PresenceTracker {
            state: PresenceState::Absent,
            empty_reads: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Stored identifier, all zeros while absent
    pub fn current_uid(&self) -> Uid {
        match self.state {
            PresenceState::Present(uid) => uid,
            PresenceState::Absent => Uid::default(),
        }
    }

    /// Consecutive empty reads while a card is present
    pub fn empty_reads(&self) -> u8 {
        self.empty_reads
    }

    /// Feeds one poll result into the state machine
    pub fn observe(&mut self, read: Option<Uid>) -> Option<PresenceEvent> {
        match (self.state, read) {
            (PresenceState::Present(current), Some(uid)) if current == uid => {
                self.empty_reads = 0;
                None
            }
            (_, Some(uid)) => {
                self.state = PresenceState::Present(uid);
                self.empty_reads = 0;
                Some(PresenceEvent::Detected(uid))
            }
            (PresenceState::Present(current), None) => {
                self.empty_reads = self.empty_reads.saturating_add(1);
                trace!(empty_reads = self.empty_reads, "Empty read while card present");
                if self.empty_reads >= MAX_EMPTY_READS {
                    self.state = PresenceState::Absent;
                    self.empty_reads = 0;
                    Some(PresenceEvent::Removed(current))
                } else {
                    None
                }
            }
            (PresenceState::Absent, None) => None,
        }
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        PresenceTracker::new()
    }
}
