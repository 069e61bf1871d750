use crate::sample::SampleRecord;
use serde::{Deserialize, Serialize};

/// Collection state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionState {
    /// Samples are not being kept
    Idle,
    /// Samples are appended to the buffer
    Collecting,
}

/// Ordered buffer of captured samples, gated by the collection state
///
/// Contents survive `stop` so they can be sent later; they are only discarded
/// when a new collection starts.
#[derive(Debug)]
pub struct CollectionBuffer {
    state: CollectionState,
    records: Vec<SampleRecord>,
}

impl CollectionBuffer {
    /// Create empty buffer in Idle state
    pub fn new() -> Self {
        CollectionBuffer {
            state: CollectionState::Idle,
            records: Vec::with_capacity(500),
        }
    }

    /// Idle → Collecting, discarding previous contents.
    /// Returns false (and keeps contents) when already collecting.
    pub fn start(&mut self) -> bool {
        match self.state {
            CollectionState::Idle => {
                self.records.clear();
                self.state = CollectionState::Collecting;
                true
            }
            CollectionState::Collecting => false,
        }
    }

    /// Collecting → Idle. Contents are retained.
    /// Returns false when already idle.
    pub fn stop(&mut self) -> bool {
        match self.state {
            CollectionState::Collecting => {
                self.state = CollectionState::Idle;
                true
            }
            CollectionState::Idle => false,
        }
    }

    /// Add a sample; ignored unless collecting
    pub fn append(&mut self, record: SampleRecord) -> bool {
        if self.state != CollectionState::Collecting {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn state(&self) -> CollectionState {
        self.state
    }

    pub fn is_collecting(&self) -> bool {
        self.state == CollectionState::Collecting
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    /// Owned copy handed to a background upload
    pub fn snapshot(&self) -> Vec<SampleRecord> {
        self.records.clone()
    }
}

impl Default for CollectionBuffer {
    fn default() -> Self {
        Self::new()
    }
}
