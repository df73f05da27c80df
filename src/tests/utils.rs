use crate::config::SourceConfig;
use crate::db::{Database, InsertOutcome, ListingStore};
use crate::domain::listing::NormalizedListing;
use crate::domain::session::SessionUpdate;
use crate::errors::StorageError;
use crate::scraper::client::{
    AcquisitionClient, DelayRange, HttpResponse, RetryPolicy, Sleeper, Transport,
};
use crate::scraper::TransportError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const LISTINGS_POINTER: &str = "/props/pageProps/listings";
pub const NEXT_POINTER: &str = "/props/pageProps/hasNextPage";

/// Fresh in-memory database with the production schema.
pub fn init_test_db() -> Database {
    let db = Database::open_in_memory()
        .unwrap_or_else(|e| panic!("Database open failed: {e}"));
    db.init_schema()
        .unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    db
}

pub fn test_source() -> SourceConfig {
    SourceConfig {
        name: "test-site".into(),
        url_template: "http://site.test/{region}/{page}".into(),
        listings_pointer: LISTINGS_POINTER.into(),
        next_page_pointer: Some(NEXT_POINTER.into()),
    }
}

pub fn regions(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// A server-rendered listing page carrying `listings_json` in `__NEXT_DATA__`.
pub fn next_data_page(listings_json: &str, has_next: bool) -> String {
    format!(
        r#"<html><body><div id="__next"></div>
        <script id="__NEXT_DATA__" type="application/json">
        {{"props":{{"pageProps":{{"listings":{listings_json},"hasNextPage":{has_next}}}}}}}
        </script></body></html>"#
    )
}

/// Serves fixed pages by URL. Unknown URLs answer `fallback_status`.
#[derive(Clone)]
pub struct SiteTransport {
    pages: Arc<HashMap<String, String>>,
    fallback_status: u16,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl SiteTransport {
    pub fn new(pages: &[(&str, String)], fallback_status: u16) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.clone()))
                    .collect(),
            ),
            fallback_status,
            requests: Arc::default(),
        }
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

impl Transport for SiteTransport {
    fn get(&self, url: &str, _user_agent: &str) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(match self.pages.get(url) {
            Some(body) => HttpResponse { status: 200, body: body.clone() },
            None => HttpResponse { status: self.fallback_status, body: String::new() },
        })
    }
}

#[derive(Clone, Default)]
pub struct RecordingSleeper(pub Arc<Mutex<Vec<Duration>>>);

impl RecordingSleeper {
    pub fn non_zero(&self) -> Vec<Duration> {
        self.0.lock().unwrap().iter().copied().filter(|d| !d.is_zero()).collect()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.0.lock().unwrap().push(duration);
    }
}

/// Client with no pacing delay and the default three-attempt policy.
pub fn test_client(transport: SiteTransport, sleeper: RecordingSleeper) -> AcquisitionClient {
    AcquisitionClient::with_parts(
        Box::new(transport),
        Box::new(sleeper),
        vec!["test-agent".into()],
        DelayRange::none(),
        RetryPolicy::default(),
        StdRng::seed_from_u64(1),
    )
}

/// Store double. Records what reaches `bulk_insert` and can be told to fail.
#[derive(Default)]
pub struct FakeStore {
    pub fail_inserts: bool,
    pub fail_sessions: bool,
    pub inserted: Mutex<Vec<NormalizedListing>>,
    pub sessions: Mutex<Vec<(i64, SessionUpdate)>>,
}

impl ListingStore for FakeStore {
    fn create_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn bulk_insert(&self, batch: &[NormalizedListing]) -> Result<InsertOutcome, StorageError> {
        if self.fail_inserts {
            return Err(StorageError::Corrupt("disk full".into()));
        }
        let mut stored = self.inserted.lock().unwrap();
        stored.extend_from_slice(batch);
        Ok(InsertOutcome { inserted: batch.len() as u64, duplicates: 0 })
    }

    fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<NormalizedListing>, StorageError> {
        let stored = self.inserted.lock().unwrap();
        Ok(stored.iter().find(|l| l.fingerprint == fingerprint).cloned())
    }

    fn create_session(&self, _source: &str) -> Result<i64, StorageError> {
        if self.fail_sessions {
            return Err(StorageError::Schema("no such table: ingestion_sessions".into()));
        }
        Ok(7)
    }

    fn update_session(&self, session_id: i64, update: &SessionUpdate) -> Result<(), StorageError> {
        self.sessions.lock().unwrap().push((session_id, update.clone()));
        Ok(())
    }
}
