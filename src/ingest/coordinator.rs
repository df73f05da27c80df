use crate::config::SourceConfig;
use crate::db::ListingStore;
use crate::domain::normalizer::RecordNormalizer;
use crate::domain::quality::{validate, QualitySummary};
use crate::domain::session::{SessionStatus, SessionUpdate};
use crate::errors::{RunError, StorageError};
use crate::ingest::report::{IngestCounts, RunReport};
use crate::scraper::walker::{PaginationWalker, ScrapedRecord};
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Drives walker output through normalization, filtering, dedup and storage.
pub struct IngestionCoordinator<S: ListingStore> {
    store: S,
}

impl<S: ListingStore> IngestionCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn prepare(&self) -> Result<(), StorageError> {
        self.store.create_schema()
    }

    /// One full run of `source` over `regions`, with its own session row.
    ///
    /// Only a store that cannot provide a schema or a session aborts the run.
    /// Everything after that is recovered and counted.
    pub fn run_source(
        &self,
        source: &SourceConfig,
        walker: &mut PaginationWalker<'_>,
        regions: &[String],
    ) -> Result<RunReport, RunError> {
        let storage_failed = |error| RunError::Storage {
            source_name: source.name.clone(),
            error,
        };

        self.prepare().map_err(storage_failed)?;
        let session_id = self.store.create_session(&source.name).map_err(storage_failed)?;
        info!(source = %source.name, session_id, regions = regions.len(), "ingestion started");

        let mut counts = IngestCounts::default();
        let mut regions_failed = Vec::new();
        let mut failures = Vec::new();

        walker.walk(source, regions, |outcome| {
            if outcome.stop.is_failure() {
                failures.push(format!("{}: {:?}", outcome.region, outcome.stop));
                regions_failed.push(outcome.region.clone());
            }
            if !outcome.records.is_empty() {
                counts += self.ingest_batch(&source.name, &outcome.region, outcome.records);
            }
        });

        // Failed only if nothing at all came back and something went wrong.
        let status = if counts.scraped == 0 && !regions_failed.is_empty() {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };

        let update = SessionUpdate {
            status,
            finished_at: Utc::now(),
            scraped: counts.scraped,
            saved: counts.inserted,
            duplicates: counts.duplicates,
            errors: counts.errors,
            error_message: (status == SessionStatus::Failed).then(|| failures.join("; ")),
        };

        if let Err(e) = self.store.update_session(session_id, &update) {
            error!(source = %source.name, session_id, error = %e, "could not finalize session");
            counts.errors += 1;
        }

        info!(
            source = %source.name,
            session_id,
            %status,
            scraped = counts.scraped,
            valid = counts.valid,
            rejected = counts.rejected,
            duplicates = counts.duplicates,
            inserted = counts.inserted,
            errors = counts.errors,
            "ingestion finished"
        );

        Ok(RunReport {
            source: source.name.clone(),
            session_id,
            status,
            counts,
            regions_failed,
        })
    }

    /// Normalize, filter, dedup and store one region's records.
    pub fn ingest_batch(
        &self,
        source_site: &str,
        region: &str,
        records: Vec<ScrapedRecord>,
    ) -> IngestCounts {
        let normalizer = RecordNormalizer::new(source_site);
        let scraped_at = Utc::now();
        let mut counts = IngestCounts {
            scraped: records.len() as u64,
            ..Default::default()
        };

        let mut seen = HashSet::new();
        let mut batch = Vec::with_capacity(records.len());

        for ScrapedRecord { page, raw } in &records {
            let listing = match normalizer.normalize(raw, scraped_at) {
                Ok(l) => l,
                Err(e) => {
                    warn!(
                        source = source_site,
                        region,
                        page,
                        title = %raw.title_hint(),
                        error = %e,
                        "skipping record"
                    );
                    counts.errors += 1;
                    continue;
                }
            };

            if let Err(reason) = validate(&listing) {
                debug!(source = source_site, region, page, title = %raw.title_hint(), %reason, "rejected");
                counts.rejected += 1;
                continue;
            }
            counts.valid += 1;

            // First occurrence wins.
            if !seen.insert(listing.fingerprint.clone()) {
                counts.duplicates += 1;
                continue;
            }
            batch.push(listing);
        }

        if batch.is_empty() {
            return counts;
        }

        let summary = QualitySummary::from_listings(&batch);
        info!(
            source = source_site,
            region,
            listings = summary.listings,
            avg_quality = summary.avg_quality,
            min_quality = summary.min_quality,
            max_quality = summary.max_quality,
            with_price = summary.with_price,
            avg_price = ?summary.avg_price,
            median_price = ?summary.median_price,
            min_price = ?summary.min_price,
            max_price = ?summary.max_price,
            with_area = summary.with_area,
            avg_area = ?summary.avg_area,
            median_area = ?summary.median_area,
            "batch quality"
        );

        match self.store.bulk_insert(&batch) {
            Ok(outcome) => {
                counts.inserted += outcome.inserted;
                counts.duplicates += outcome.duplicates;
                info!(
                    source = source_site,
                    region,
                    inserted = outcome.inserted,
                    duplicates = outcome.duplicates,
                    "batch stored"
                );
            }
            Err(e) => {
                error!(source = source_site, region, size = batch.len(), error = %e, "batch not stored");
                counts.errors += 1;
            }
        }

        counts
    }
}
