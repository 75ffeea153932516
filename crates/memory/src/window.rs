//! Bounded window of remembered observations.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use reverie_core::ObservationRecord;

/// Fixed-capacity FIFO of observation records; the oldest is evicted first.
#[derive(Debug, Clone)]
pub struct ObservationWindow {
    records: VecDeque<ObservationRecord>,
    capacity: usize,
}

impl ObservationWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when full. Returns the evicted record.
    pub fn push(&mut self, record: ObservationRecord) -> Option<ObservationRecord> {
        let evicted = if self.records.len() >= self.capacity {
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        evicted
    }

    pub fn remember(
        &mut self,
        text: impl Into<String>,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Option<ObservationRecord> {
        self.push(ObservationRecord::new(text, confidence, timestamp))
    }

    /// The `n` most recent records, oldest first.
    pub fn last(&self, n: usize) -> Vec<ObservationRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    /// The `n` most recent texts, oldest first.
    pub fn recent_texts(&self, n: usize) -> Vec<String> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).map(|r| r.text.clone()).collect()
    }

    pub fn latest(&self) -> Option<&ObservationRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
