pub mod connection;
pub mod listings;
pub mod sessions;

pub use connection::Database;

use crate::domain::listing::NormalizedListing;
use crate::domain::session::SessionUpdate;
use crate::errors::StorageError;
use chrono::Utc;

/// What `bulk_insert` did with a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: u64,
    pub duplicates: u64,
}

/// Persistence used by the ingestion coordinator.
///
/// `bulk_insert` must be all-or-nothing and must decide "already stored" by
/// fingerprint atomically, never by a read followed by a write.
pub trait ListingStore {
    fn create_schema(&self) -> Result<(), StorageError>;
    fn bulk_insert(&self, batch: &[NormalizedListing]) -> Result<InsertOutcome, StorageError>;
    fn find_by_fingerprint(&self, fingerprint: &str)
        -> Result<Option<NormalizedListing>, StorageError>;
    fn create_session(&self, source: &str) -> Result<i64, StorageError>;
    fn update_session(&self, session_id: i64, update: &SessionUpdate) -> Result<(), StorageError>;
}

impl ListingStore for Database {
    fn create_schema(&self) -> Result<(), StorageError> {
        self.init_schema()
    }

    fn bulk_insert(&self, batch: &[NormalizedListing]) -> Result<InsertOutcome, StorageError> {
        listings::bulk_insert(self, batch)
    }

    fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<NormalizedListing>, StorageError> {
        listings::find_by_fingerprint(self, fingerprint)
    }

    fn create_session(&self, source: &str) -> Result<i64, StorageError> {
        sessions::start_session(self, source, Utc::now())
    }

    fn update_session(&self, session_id: i64, update: &SessionUpdate) -> Result<(), StorageError> {
        sessions::finish_session(self, session_id, update)
    }
}
