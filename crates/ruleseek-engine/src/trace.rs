//! Per-engine retrieval trace: a bounded ring buffer the owner can read
//! back, instead of a global mutable debug store.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RetrievalTrace {
    pub query: String,
    /// How the query was represented: the joined keyword list for the
    /// lexical backend, an embedding tag for the vector backend.
    pub query_repr: String,
    pub candidates_considered: usize,
    pub accepted: usize,
    pub fell_back: bool,
}

pub(crate) struct TraceBuffer {
    entries: VecDeque<RetrievalTrace>,
    capacity: usize,
}

impl TraceBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity: capacity.max(1) }
    }

    pub(crate) fn push(&mut self, trace: RetrievalTrace) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(trace);
    }

    pub(crate) fn recent(&self) -> Vec<RetrievalTrace> {
        self.entries.iter().cloned().collect()
    }
}
