//! Batch accumulation and flush triggers
//!
//! [`BatchBuffer`] collects serialized records into the current (open) batch
//! and decides when that batch is sealed:
//!
//! - appending would push it past the size or count limit (the batch is sealed
//!   first, and the new record opens the next batch),
//! - the batch reaches a limit exactly after appending,
//! - its oldest record is older than the configured interval.
//!
//! The buffer itself is not synchronized; the listener guards it with one mutex
//! and keeps the critical section to the push/seal calls.

use super::config::BatchConfig;
use std::time::{Duration, Instant};

/// A sealed, ordered group of records sent in one HTTP request.
#[derive(Debug, Clone)]
pub struct Batch {
    id: u64,
    records: Vec<Vec<u8>>,
    size_bytes: usize,
}

impl Batch {
    /// Sequence number assigned at sealing time, unique per buffer
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size of the request body this batch produces
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Records in enqueue order
    pub fn records(&self) -> impl Iterator<Item = &[u8]> {
        self.records.iter().map(Vec::as_slice)
    }

    /// Newline-delimited JSON body: every record followed by `\n`.
    pub fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.size_bytes);
        for record in &self.records {
            body.extend_from_slice(record);
            body.push(b'\n');
        }
        body
    }
}

/// Accumulates records into the current batch.
#[derive(Debug)]
pub struct BatchBuffer {
    config: BatchConfig,
    records: Vec<Vec<u8>>,
    size_bytes: usize,
    opened_at: Option<Instant>,
    next_id: u64,
}

impl BatchBuffer {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
            size_bytes: 0,
            opened_at: None,
            next_id: 0,
        }
    }

    /// Records in the open batch
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Age of the oldest record in the open batch
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.opened_at.map(|opened| now.saturating_duration_since(opened))
    }

    /// Instant at which the open batch expires.
    ///
    /// `None` when no batch is open or the interval is too large to expire.
    pub fn deadline(&self) -> Option<Instant> {
        self.opened_at
            .and_then(|opened| opened.checked_add(self.config.max_batch_interval))
    }

    /// Append a record, returning every batch sealed as a result (oldest first).
    pub fn push(&mut self, record: Vec<u8>) -> Vec<Batch> {
        self.push_at(record, Instant::now())
    }

    pub fn push_at(&mut self, record: Vec<u8>, now: Instant) -> Vec<Batch> {
        let mut sealed = Vec::new();
        let entry_size = record.len() + 1;

        sealed.extend(self.seal_if_expired(now));
        if !self.records.is_empty() && self.would_overflow(entry_size) {
            sealed.extend(self.seal());
        }

        if self.records.is_empty() {
            self.opened_at = Some(now);
        }
        self.records.push(record);
        self.size_bytes += entry_size;

        if self.is_full() {
            sealed.extend(self.seal());
        }
        sealed
    }

    /// Seal the open batch if its oldest record has reached the interval.
    pub fn seal_if_expired(&mut self, now: Instant) -> Option<Batch> {
        match self.age(now) {
            Some(age) if age >= self.config.max_batch_interval => self.seal(),
            _ => None,
        }
    }

    /// Seal the open batch regardless of thresholds.
    pub fn seal(&mut self) -> Option<Batch> {
        self.opened_at.take()?;
        let batch = Batch {
            id: self.next_id,
            records: std::mem::take(&mut self.records),
            size_bytes: std::mem::take(&mut self.size_bytes),
        };
        self.next_id += 1;
        Some(batch)
    }

    fn would_overflow(&self, entry_size: usize) -> bool {
        self.records.len() + 1 > self.config.max_batch_count
            || self.size_bytes + entry_size > self.config.max_batch_size_bytes
    }

    fn is_full(&self) -> bool {
        self.config.is_immediate()
            || self.records.len() >= self.config.max_batch_count
            || self.size_bytes >= self.config.max_batch_size_bytes
    }
}
