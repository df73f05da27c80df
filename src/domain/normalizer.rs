// src/domain/normalizer.rs

use crate::domain::categories::{
    normalize_city, parse_location, standardize_property_type, title_case,
    PropertyType,
};
use crate::domain::listing::NormalizedListing;
use crate::domain::quality::{fingerprint, quality_score};
use crate::domain::units::{normalize_price, parse_area};
use crate::errors::NormalizationError;
use crate::scraper::models::RawListing;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const MIN_PHONE_LEN: usize = 10;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static TEXT_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-.,()/]").expect("static regex"));
static BEDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*bed").expect("static regex"));
static BATHS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*bath").expect("static regex"));
// "3", "3 beds", "4 Baths"
static COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:\s*[A-Za-z]+)?$").expect("static regex"));

/// Turns extractor field bags into canonical listings for one source site.
pub struct RecordNormalizer {
    source_site: String,
}

impl RecordNormalizer {
    pub fn new(source_site: impl Into<String>) -> Self {
        Self {
            source_site: source_site.into(),
        }
    }

    /// Normalize one raw record. Fingerprint and quality score are filled in.
    ///
    /// Missing or unparseable optional values simply come out as `None`; only
    /// a value that is present but cannot mean anything (a bedroom count of
    /// "many") fails the record.
    pub fn normalize(
        &self,
        raw: &RawListing,
        scraped_at: DateTime<Utc>,
    ) -> Result<NormalizedListing, NormalizationError> {
        if raw.is_empty() {
            return Err(NormalizationError::EmptyRecord);
        }

        let details = raw.text("details");
        let location = raw
            .text("location")
            .map(|l| parse_location(&l))
            .unwrap_or_default();

        // Price
        let price_raw = raw.first_text(&["price_raw", "price"]);
        let price = price_raw
            .as_deref()
            .and_then(normalize_price)
            .filter(|p| *p > 0.0);

        // Area: explicit text first, then a unit-bearing phrase in the details
        let area_raw = raw.first_text(&["area_raw", "area_size"]);
        let reading = area_raw.as_deref().and_then(parse_area).or_else(|| {
            details
                .as_deref()
                .and_then(parse_area)
                .filter(|r| r.unit.is_some())
        });
        let reading = reading.filter(|r| r.square_feet > 0.0);
        let area_size = reading.map(|r| r.square_feet);
        let area_unit = reading.and_then(|r| r.unit).map(|u| u.as_str().to_string());

        let title = raw.text("title").map(|t| clean_text(&t)).unwrap_or_default();
        let property_type = raw
            .text("property_type")
            .map(|t| standardize_property_type(&t))
            .unwrap_or(PropertyType::Other);

        let bedrooms = match count_field(raw, "bedrooms")? {
            Some(n) => Some(n),
            None => details.as_deref().and_then(|d| count_in(&BEDS, d)),
        };
        let bathrooms = match count_field(raw, "bathrooms")? {
            Some(n) => Some(n),
            None => details.as_deref().and_then(|d| count_in(&BATHS, d)),
        };

        let source_url = raw.text("source_url");
        let listing_id = raw
            .text("listing_id")
            .or_else(|| source_url.as_deref().and_then(listing_id_from_url));

        let date_posted = raw.text("date_posted").and_then(|d| {
            let parsed = parse_date(&d);
            if parsed.is_none() {
                debug!(title = %raw.title_hint(), value = %d, "ignoring unparseable date_posted");
            }
            parsed
        });

        let mut listing = NormalizedListing {
            title,
            city: raw
                .text("city")
                .map(|c| normalize_city(&c))
                .or(location.city)
                .unwrap_or_default(),
            area: raw.text("area").map(|a| title_case(&a)).or(location.area),
            sector_block: raw
                .text("sector_block")
                .map(|s| title_case(&s))
                .or(location.sector_block),
            full_address: raw.text("full_address").or(location.full_address),
            price,
            price_raw,
            price_per_sqft: price.zip(area_size).map(|(p, a)| p / a),
            area_size,
            area_unit,
            area_raw,
            property_type,
            bedrooms,
            bathrooms,
            agent_name: raw.text("agent_name").map(|n| title_case(&n)),
            seller_name: raw.text("seller_name").map(|n| title_case(&n)),
            contact_phone: raw.text("contact_phone").and_then(|p| clean_phone(&p)),
            contact_email: raw.text("contact_email").and_then(|e| clean_email(&e)),
            source_site: self.source_site.clone(),
            source_url,
            listing_id,
            date_posted,
            scraped_at,
            fingerprint: String::new(),
            quality_score: 0.0,
            is_duplicate: false,
        };

        listing.fingerprint = fingerprint(&listing);
        listing.quality_score = quality_score(&listing);
        Ok(listing)
    }
}

/// Collapse whitespace and drop anything but word characters and basic punctuation.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    TEXT_NOISE.replace_all(&collapsed, "").trim().to_string()
}

fn clean_phone(text: &str) -> Option<String> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    (digits.len() >= MIN_PHONE_LEN).then_some(digits)
}

fn clean_email(text: &str) -> Option<String> {
    text.contains('@').then(|| text.trim().to_lowercase())
}

fn count_field(raw: &RawListing, field: &'static str) -> Result<Option<u8>, NormalizationError> {
    let Some(text) = raw.text(field) else {
        return Ok(None);
    };
    let caps = COUNT
        .captures(&text)
        .ok_or_else(|| NormalizationError::InvalidField {
            field,
            reason: format!("'{text}' is not a whole number"),
        })?;
    caps[1]
        .parse::<u8>()
        .map(Some)
        .map_err(|_| NormalizationError::InvalidField {
            field,
            reason: format!("'{text}' is out of range"),
        })
}

fn count_in(pattern: &Regex, text: &str) -> Option<u8> {
    pattern.captures(text).and_then(|c| c[1].parse().ok())
}

// ".../dha-defence-house-48213907.html" -> "48213907"
fn listing_id_from_url(url: &str) -> Option<String> {
    let (_, last) = url.rsplit_once('-')?;
    let id = last.trim_end_matches(".html");
    (!id.is_empty()).then(|| id.to_string())
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
