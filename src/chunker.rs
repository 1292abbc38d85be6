use serde::{Deserialize, Serialize};

use crate::subtitle::TimedRecord;

/// A contiguous run of records translated together in one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub records: Vec<TimedRecord>,
}

impl Batch {
    pub fn texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Character count of all texts in the batch
    pub fn char_len(&self) -> usize {
        self.records.iter().map(|r| r.text.chars().count()).sum()
    }
}

/// Greedily pack records into batches whose summed text length stays within
/// `chunk_size` characters. A record longer than the budget gets a batch of
/// its own; no record is ever dropped and no empty batch is emitted.
pub fn chunk(records: &[TimedRecord], chunk_size: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current: Vec<TimedRecord> = Vec::new();
    let mut used = 0usize;

    for record in records {
        let len = record.text.chars().count();
        if !current.is_empty() && used + len > chunk_size {
            batches.push(Batch { records: std::mem::take(&mut current) });
            used = 0;
        }
        current.push(record.clone());
        used += len;
    }

    if !current.is_empty() {
        batches.push(Batch { records: current });
    }

    batches
}
