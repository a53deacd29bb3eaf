//! Event source interface
//!
//! Anything that can deliver process lifecycle records serially implements
//! [`EventSource`]. Sources own whatever OS resources they need and release
//! them when dropped.

use crate::types::{ProcessEvent, Result};
use std::collections::VecDeque;

/// What a single poll of a source produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePoll {
    /// The next record
    Event(ProcessEvent),
    /// Nothing available right now; poll again
    Idle,
    /// The source is exhausted
    Closed,
}

/// Common trait for all event sources
pub trait EventSource {
    /// Fetch the next record
    ///
    /// May block for a bounded time; sources backed by a kernel subscription
    /// return [`SourcePoll::Idle`] on timeout so callers can observe a stop
    /// request between polls.
    fn poll(&mut self) -> Result<SourcePoll>;
}

/// In-memory source over a fixed sequence of events
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    events: VecDeque<ProcessEvent>,
}

impl VecSource {
    pub fn new(events: impl IntoIterator<Item = ProcessEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

impl EventSource for VecSource {
    fn poll(&mut self) -> Result<SourcePoll> {
        Ok(match self.events.pop_front() {
            Some(event) => SourcePoll::Event(event),
            None => SourcePoll::Closed,
        })
    }
}
