//! Cut events and the event log.
//!
//! A committed cut emits one record per affected selector, one record for
//! the delegate call if there was one, and one metadata record if the cut
//! carried a tag or metadata. Records are published only after commit, in
//! application order, and all carry the cut's sequence number.

use crate::types::CutSequence;
use diamond_codec::{FacetAddress, Selector};
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};

/// One observable effect of a committed cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutEvent {
    /// A selector was routed to a facet.
    Added {
        /// The selector.
        selector: Selector,
        /// Its new facet.
        facet: FacetAddress,
    },
    /// A selector moved from one facet to another.
    Replaced {
        /// The selector.
        selector: Selector,
        /// The facet it routed to before.
        old: FacetAddress,
        /// The facet it routes to now.
        new: FacetAddress,
    },
    /// A selector was unregistered.
    Removed {
        /// The selector.
        selector: Selector,
        /// The facet it routed to.
        facet: FacetAddress,
    },
    /// The cut's delegated initializer ran.
    DelegateCalled {
        /// The delegate target.
        target: FacetAddress,
        /// The payload it received.
        payload: Vec<u8>,
    },
    /// Caller-supplied annotation.
    Metadata {
        /// Free-form tag.
        tag: String,
        /// Free-form bytes.
        metadata: Vec<u8>,
    },
}

impl CutEvent {
    /// Returns the selector this event concerns, if any.
    #[must_use]
    pub fn selector(&self) -> Option<Selector> {
        match self {
            Self::Added { selector, .. }
            | Self::Replaced { selector, .. }
            | Self::Removed { selector, .. } => Some(*selector),
            Self::DelegateCalled { .. } | Self::Metadata { .. } => None,
        }
    }
}

/// A cut event stamped with the sequence of the cut that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutRecord {
    /// Sequence of the committing cut.
    pub sequence: CutSequence,
    /// What happened.
    pub event: CutEvent,
}

/// Distributes committed cut records to subscribers and keeps a bounded
/// history for polling.
pub struct EventLog {
    subscribers: RwLock<Vec<Sender<CutRecord>>>,
    history: RwLock<Vec<CutRecord>>,
    max_history: usize,
}

impl EventLog {
    /// Creates a log keeping at most `max_history` records.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            max_history,
        }
    }

    /// Returns a receiver for all future records.
    pub fn subscribe(&self) -> Receiver<CutRecord> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Publishes the records of one committed cut.
    pub(crate) fn publish(&self, records: &[CutRecord]) {
        if records.is_empty() {
            return;
        }

        {
            let mut history = self.history.write();
            history.extend_from_slice(records);
            if history.len() > self.max_history {
                let excess = history.len() - self.max_history;
                history.drain(0..excess);
            }
        }

        // Drop disconnected subscribers.
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| records.iter().all(|record| tx.send(record.clone()).is_ok()));
    }

    /// Returns records with sequence > `cursor`, up to `limit`.
    pub fn poll(&self, cursor: CutSequence, limit: usize) -> Vec<CutRecord> {
        self.history
            .read()
            .iter()
            .filter(|record| record.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the newest sequence in history, or zero.
    pub fn latest_sequence(&self) -> CutSequence {
        self.history
            .read()
            .last()
            .map(|record| record.sequence)
            .unwrap_or_default()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of records in history.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_max_history(10_000)
    }
}
