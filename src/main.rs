use anyhow::Context;
use listing_ingest::config::IngestConfig;
use listing_ingest::db::listings::{price_stats_by_city, search_listings, top_expensive_areas};
use listing_ingest::db::sessions::recent_sessions;
use listing_ingest::db::Database;
use listing_ingest::domain::ListingQuery;
use listing_ingest::errors::RunError;
use listing_ingest::ingest::IngestionCoordinator;
use listing_ingest::scraper::client::{AcquisitionClient, DelayRange};
use listing_ingest::scraper::{NextDataExtractor, PaginationWalker};
use listing_ingest::spreadsheets::export_listings_xlsx;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real env vars still apply.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("listing_ingest=info")),
        )
        .init();

    let cfg = IngestConfig::from_env().context("invalid configuration")?;
    if cfg.sources.is_empty() {
        warn!("no sources configured, set SOURCE_URL_TEMPLATE");
        return Ok(());
    }

    let db = Database::open(&cfg.database_path)
        .with_context(|| format!("could not open database at {}", cfg.database_path))?;
    let coordinator = IngestionCoordinator::new(db);

    let mut client = AcquisitionClient::from_config(&cfg)
        .map_err(|e| RunError::Client(e.to_string()))?;
    let cooldown = DelayRange::new(cfg.region_cooldown_min, cfg.region_cooldown_max);

    for source in &cfg.sources {
        let extractor =
            NextDataExtractor::new(source.listings_pointer.clone(), source.next_page_pointer.clone());
        let mut walker =
            PaginationWalker::new(&mut client, &extractor, cfg.max_pages_per_region, cooldown);

        match coordinator.run_source(source, &mut walker, &cfg.target_regions) {
            Ok(report) => {
                let json = serde_json::to_string(&report).context("serialize run report")?;
                info!(source = %source.name, report = %json, "run report");
            }
            Err(e) => error!(source = %source.name, error = %e, "source run aborted"),
        }
    }

    let db = coordinator.store();
    for stats in price_stats_by_city(db).context("price stats")? {
        info!(
            city = %stats.city,
            listings = stats.listings,
            avg_price = stats.avg_price,
            min_price = stats.min_price,
            max_price = stats.max_price,
            "city prices"
        );
    }

    for (rank, area) in top_expensive_areas(db, 5).context("top areas")?.iter().enumerate() {
        info!(
            rank = rank + 1,
            city = %area.city,
            area = %area.area,
            avg_price = area.avg_price,
            listings = area.listings,
            "expensive area"
        );
    }

    let newest = search_listings(db, &ListingQuery { limit: Some(5), ..Default::default() })
        .context("latest listings")?;
    for l in &newest {
        info!(title = %l.title, city = %l.city, price = ?l.price, quality = l.quality_score, "latest");
    }

    for s in recent_sessions(db, 5).context("recent sessions")? {
        info!(
            session_id = s.id,
            source = %s.source,
            status = %s.status,
            scraped = s.scraped,
            saved = s.saved,
            "session"
        );
    }

    if let Some(path) = &cfg.export_path {
        let rows = export_listings_xlsx(db, cfg.export_city.as_deref(), Path::new(path))
            .with_context(|| format!("could not export listings to {path}"))?;
        info!(rows, path = %path, "export finished");
    }

    Ok(())
}
