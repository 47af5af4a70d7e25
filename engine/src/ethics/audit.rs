//! Bounded audit log
//!
//! Append-only ring buffer of evaluation records. When the log is full the
//! oldest record is dropped to make room; appends never block or fail.

use std::collections::VecDeque;

use super::types::AuditRecord;

/// Default number of records retained
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct AuditLog {
    records: VecDeque<AuditRecord>,
    capacity: usize,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_AUDIT_CAPACITY)),
            capacity,
        }
    }

    /// Append a record, returning the evicted oldest record if the log was full
    pub fn append(&mut self, record: AuditRecord) -> Option<AuditRecord> {
        let evicted = if self.records.len() >= self.capacity {
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        evicted
    }

    /// The most recent `limit` records, oldest first
    pub fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        let skip = self.records.len().saturating_sub(limit);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditRecord> {
        self.records.iter()
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

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}
