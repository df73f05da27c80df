use crate::domain::session::SessionStatus;
use serde::Serialize;
use std::ops::AddAssign;

/// Per-batch and per-run tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestCounts {
    /// Raw records handed over by the walker.
    pub scraped: u64,
    /// Normalized records that passed the validity gate.
    pub valid: u64,
    pub rejected: u64,
    /// In-batch repeats plus records the store already had.
    pub duplicates: u64,
    pub inserted: u64,
    /// Records that failed normalization plus batches the store refused.
    pub errors: u64,
}

impl AddAssign for IngestCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.scraped += rhs.scraped;
        self.valid += rhs.valid;
        self.rejected += rhs.rejected;
        self.duplicates += rhs.duplicates;
        self.inserted += rhs.inserted;
        self.errors += rhs.errors;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub source: String,
    pub session_id: i64,
    pub status: SessionStatus,
    pub counts: IngestCounts,
    pub regions_failed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_add_field_by_field() {
        let mut total = IngestCounts { scraped: 3, valid: 2, rejected: 1, ..Default::default() };
        total += IngestCounts { scraped: 4, inserted: 2, duplicates: 1, errors: 1, ..Default::default() };

        assert_eq!(
            total,
            IngestCounts { scraped: 7, valid: 2, rejected: 1, duplicates: 1, inserted: 2, errors: 1 }
        );
    }
}
