use crate::db::connection::Database;
use crate::db::InsertOutcome;
use crate::domain::listing::{AreaPriceStats, CityPriceStats, ListingQuery, NormalizedListing};
use crate::domain::quality::quality_score;
use crate::domain::PropertyType;
use crate::errors::StorageError;
use rusqlite::{params, OptionalExtension, Row};

const LISTING_COLUMNS: &str = "
    title, city, area, sector_block, full_address,
    price, price_raw, price_per_sqft,
    area_size, area_unit, area_raw,
    property_type, bedrooms, bathrooms,
    agent_name, seller_name, contact_phone, contact_email,
    source_site, source_url, listing_id, date_posted, scraped_at,
    fingerprint, quality_score, is_duplicate";

const SQL_SEARCH: &str = "
    WHERE (?1 IS NULL OR city = ?1)
      AND (?2 IS NULL OR property_type = ?2)
      AND (?3 IS NULL OR price >= ?3)
      AND (?4 IS NULL OR price <= ?4)
      AND (?5 IS NULL OR bedrooms = ?5)
    ORDER BY scraped_at DESC, id DESC
    LIMIT ?6";

const SQL_PRICE_STATS: &str = "
    SELECT city, COUNT(*), AVG(price), MIN(price), MAX(price)
    FROM listings
    WHERE price IS NOT NULL
    GROUP BY city
    ORDER BY COUNT(*) DESC, city";

/// Localities need this many priced listings before their average is reported.
const MIN_AREA_LISTINGS: i64 = 3;

const SQL_TOP_AREAS: &str = "
    SELECT city, area, AVG(price), COUNT(*)
    FROM listings
    WHERE price IS NOT NULL AND area IS NOT NULL AND is_duplicate = 0
    GROUP BY city, area
    HAVING COUNT(*) >= ?1
    ORDER BY AVG(price) DESC, city, area
    LIMIT ?2";

/// Insert every listing whose fingerprint is not stored yet.
///
/// The whole batch is one transaction: on any error nothing is written.
/// Quality is recomputed here and `is_duplicate` is always stored as false,
/// since duplicates are never stored at all.
pub fn bulk_insert(
    db: &Database,
    listings: &[NormalizedListing],
) -> Result<InsertOutcome, StorageError> {
    db.with_conn(|conn| {
        let tx = conn.transaction()?;
        let mut outcome = InsertOutcome::default();

        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO listings ({LISTING_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                         ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, 0)
                 ON CONFLICT(fingerprint) DO NOTHING"
            ))?;

            for l in listings {
                let changed = stmt.execute(params![
                    l.title,
                    l.city,
                    l.area,
                    l.sector_block,
                    l.full_address,
                    l.price,
                    l.price_raw,
                    l.price_per_sqft,
                    l.area_size,
                    l.area_unit,
                    l.area_raw,
                    l.property_type.as_str(),
                    l.bedrooms,
                    l.bathrooms,
                    l.agent_name,
                    l.seller_name,
                    l.contact_phone,
                    l.contact_email,
                    l.source_site,
                    l.source_url,
                    l.listing_id,
                    l.date_posted,
                    l.scraped_at,
                    l.fingerprint,
                    quality_score(l),
                ])?;

                if changed == 1 {
                    outcome.inserted += 1;
                } else {
                    outcome.duplicates += 1;
                }
            }
        }

        tx.commit()?;
        Ok(outcome)
    })
}

pub fn find_by_fingerprint(
    db: &Database,
    fingerprint: &str,
) -> Result<Option<NormalizedListing>, StorageError> {
    db.with_conn(|conn| {
        let found = conn
            .query_row(
                &format!("SELECT {LISTING_COLUMNS} FROM listings WHERE fingerprint = ?1"),
                params![fingerprint],
                listing_from_row,
            )
            .optional()?;
        Ok(found)
    })
}

/// Stored listings matching `query`, most recently scraped first.
pub fn search_listings(
    db: &Database,
    query: &ListingQuery,
) -> Result<Vec<NormalizedListing>, StorageError> {
    // SQLite treats a negative LIMIT as no limit.
    let limit = query.limit.map_or(-1, i64::from);

    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare(&format!("SELECT {LISTING_COLUMNS} FROM listings {SQL_SEARCH}"))?;
        let rows = stmt.query_map(
            params![
                query.city,
                query.property_type.as_ref().map(PropertyType::as_str),
                query.min_price,
                query.max_price,
                query.bedrooms,
                limit,
            ],
            listing_from_row,
        )?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

pub fn price_stats_by_city(db: &Database) -> Result<Vec<CityPriceStats>, StorageError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(SQL_PRICE_STATS)?;
        let rows = stmt.query_map([], |row| {
            Ok(CityPriceStats {
                city: row.get(0)?,
                listings: row.get(1)?,
                avg_price: row.get(2)?,
                min_price: row.get(3)?,
                max_price: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

/// Most expensive localities by average price, best first.
pub fn top_expensive_areas(db: &Database, limit: u32) -> Result<Vec<AreaPriceStats>, StorageError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(SQL_TOP_AREAS)?;
        let rows = stmt.query_map(params![MIN_AREA_LISTINGS, limit], |row| {
            Ok(AreaPriceStats {
                city: row.get(0)?,
                area: row.get(1)?,
                avg_price: row.get(2)?,
                listings: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<NormalizedListing> {
    let property_type: String = row.get(11)?;
    Ok(NormalizedListing {
        title: row.get(0)?,
        city: row.get(1)?,
        area: row.get(2)?,
        sector_block: row.get(3)?,
        full_address: row.get(4)?,
        price: row.get(5)?,
        price_raw: row.get(6)?,
        price_per_sqft: row.get(7)?,
        area_size: row.get(8)?,
        area_unit: row.get(9)?,
        area_raw: row.get(10)?,
        property_type: PropertyType::from_label(&property_type),
        bedrooms: row.get(12)?,
        bathrooms: row.get(13)?,
        agent_name: row.get(14)?,
        seller_name: row.get(15)?,
        contact_phone: row.get(16)?,
        contact_email: row.get(17)?,
        source_site: row.get(18)?,
        source_url: row.get(19)?,
        listing_id: row.get(20)?,
        date_posted: row.get(21)?,
        scraped_at: row.get(22)?,
        fingerprint: row.get(23)?,
        quality_score: row.get(24)?,
        is_duplicate: row.get(25)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalizer::RecordNormalizer;
    use crate::scraper::models::RawListing;
    use chrono::{Duration, TimeZone, Utc};

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        db
    }

    fn listing(title: &str, city: &str, price: &str, minutes: i64) -> NormalizedListing {
        let scraped_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes);
        let raw = RawListing::new()
            .with("title", title)
            .with("city", city)
            .with("price", price)
            .with("area_raw", "5 Marla")
            .with("bedrooms", 3i64);
        RecordNormalizer::new("test-site").normalize(&raw, scraped_at).unwrap()
    }

    #[test]
    fn insert_then_reinsert_is_all_duplicates() {
        let db = db();
        let batch = vec![
            listing("5 Marla House", "Lahore", "1.5 Crore", 0),
            listing("Flat in Clifton", "Karachi", "85 Lakh", 1),
        ];

        let first = bulk_insert(&db, &batch).unwrap();
        assert_eq!(first, InsertOutcome { inserted: 2, duplicates: 0 });

        let again = bulk_insert(&db, &batch).unwrap();
        assert_eq!(again, InsertOutcome { inserted: 0, duplicates: 2 });
    }

    #[test]
    fn stored_listing_reads_back_intact() {
        let db = db();
        let l = listing("5 Marla House", "Lahore", "1.5 Crore", 0);
        bulk_insert(&db, std::slice::from_ref(&l)).unwrap();

        let back = find_by_fingerprint(&db, &l.fingerprint).unwrap().unwrap();
        assert_eq!(back, l);
        assert!(find_by_fingerprint(&db, "nope").unwrap().is_none());
    }

    #[test]
    fn search_filters_and_orders_newest_first() {
        let db = db();
        bulk_insert(
            &db,
            &[
                listing("Old House", "Lahore", "1 Crore", 0),
                listing("New House", "Lahore", "2 Crore", 10),
                listing("Flat", "Karachi", "50 Lakh", 5),
            ],
        )
        .unwrap();

        let lahore = search_listings(
            &db,
            &ListingQuery { city: Some("Lahore".into()), ..Default::default() },
        )
        .unwrap();
        let titles: Vec<_> = lahore.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, ["New House", "Old House"]);

        let cheap = search_listings(
            &db,
            &ListingQuery { max_price: Some(10_000_000.0), limit: Some(1), ..Default::default() },
        )
        .unwrap();
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap[0].title, "Flat");

        let houses = search_listings(
            &db,
            &ListingQuery { property_type: Some(PropertyType::House), bedrooms: Some(3), ..Default::default() },
        )
        .unwrap();
        assert_eq!(houses.len(), 2);
    }

    #[test]
    fn price_stats_group_by_city() {
        let db = db();
        bulk_insert(
            &db,
            &[
                listing("A", "Lahore", "1 Crore", 0),
                listing("B", "Lahore", "3 Crore", 1),
                listing("C", "Karachi", "50 Lakh", 2),
            ],
        )
        .unwrap();

        let stats = price_stats_by_city(&db).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].city, "Lahore");
        assert_eq!(stats[0].listings, 2);
        assert_eq!(stats[0].avg_price, 20_000_000.0);
        assert_eq!(stats[0].min_price, 10_000_000.0);
        assert_eq!(stats[0].max_price, 30_000_000.0);
        assert_eq!(stats[1].city, "Karachi");
    }

    #[test]
    fn top_areas_need_three_priced_listings() {
        let db = db();
        let in_area = |title: &str, area: &str, price: &str| {
            let raw = RawListing::new()
                .with("title", title)
                .with("city", "Karachi")
                .with("area", area)
                .with("price", price);
            RecordNormalizer::new("test-site").normalize(&raw, Utc::now()).unwrap()
        };
        bulk_insert(
            &db,
            &[
                in_area("C1", "Clifton", "5 Crore"),
                in_area("C2", "Clifton", "7 Crore"),
                in_area("C3", "Clifton", "9 Crore"),
                in_area("G1", "Gulshan", "1 Crore"),
                in_area("G2", "Gulshan", "2 Crore"),
                in_area("G3", "Gulshan", "3 Crore"),
                // only two listings: never reported
                in_area("D1", "Dha", "20 Crore"),
                in_area("D2", "Dha", "30 Crore"),
                // unpriced listings do not count towards the minimum
                in_area("G4", "Gulshan", "Call"),
            ],
        )
        .unwrap();

        let top = top_expensive_areas(&db, 10).unwrap();
        let names: Vec<_> = top.iter().map(|a| a.area.as_str()).collect();
        assert_eq!(names, ["Clifton", "Gulshan"]);
        assert_eq!(top[0].avg_price, 70_000_000.0);
        assert_eq!(top[0].listings, 3);
        assert_eq!(top[1].listings, 3);

        assert_eq!(top_expensive_areas(&db, 1).unwrap().len(), 1);
    }
}
