// src/domain/quality.rs

use crate::domain::listing::NormalizedListing;
use sha2::{Digest, Sha256};
use std::fmt;

const IMPORTANT_WEIGHT: f64 = 0.7;
const OPTIONAL_WEIGHT: f64 = 0.3;
const FIELD_SEPARATOR: &str = "\x1f";

/// Content fingerprint used as the dedup key.
///
/// SHA-256 over (title, city, area, price, property_type, bedrooms, area_size).
/// Two listings with the same values here are the same listing, even if they
/// came from different pages or carry different contact details.
pub fn fingerprint(listing: &NormalizedListing) -> String {
    fn opt<T: ToString>(v: &Option<T>) -> String {
        v.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    let tuple = [
        listing.title.clone(),
        listing.city.clone(),
        opt(&listing.area),
        opt(&listing.price),
        listing.property_type.as_str().to_string(),
        opt(&listing.bedrooms),
        opt(&listing.area_size),
    ];

    let digest = Sha256::digest(tuple.join(FIELD_SEPARATOR).as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Completeness score in [0, 1], rounded to two decimals.
pub fn quality_score(listing: &NormalizedListing) -> f64 {
    let important = [
        !listing.title.is_empty(),
        !listing.city.is_empty(),
        listing.price.is_some(),
        // standardization always yields a category, Other included
        true,
        listing.area_size.is_some(),
    ];
    let optional = [
        listing.area.is_some(),
        listing.bedrooms.is_some(),
        listing.bathrooms.is_some(),
        listing.agent_name.is_some(),
        listing.contact_phone.is_some(),
    ];

    let share = |flags: &[bool]| {
        flags.iter().filter(|&&f| f).count() as f64 / flags.len() as f64
    };

    let score = share(&important[..]) * IMPORTANT_WEIGHT + share(&optional[..]) * OPTIONAL_WEIGHT;
    (score * 100.0).round() / 100.0
}

/// Why a listing was filtered out before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingTitle,
    MissingCity,
    MissingPriceAndArea,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rejection::MissingTitle => "missing title",
            Rejection::MissingCity => "missing city",
            Rejection::MissingPriceAndArea => "missing both price and area",
        })
    }
}

pub fn validate(listing: &NormalizedListing) -> Result<(), Rejection> {
    if listing.title.trim().is_empty() {
        return Err(Rejection::MissingTitle);
    }
    if listing.city.trim().is_empty() {
        return Err(Rejection::MissingCity);
    }
    if listing.price.is_none() && listing.area_size.is_none() {
        return Err(Rejection::MissingPriceAndArea);
    }
    Ok(())
}

/// Aggregate figures for one batch of valid listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualitySummary {
    pub listings: usize,
    pub avg_quality: f64,
    pub min_quality: f64,
    pub max_quality: f64,
    pub with_price: usize,
    pub avg_price: Option<f64>,
    pub median_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub with_area: usize,
    pub avg_area: Option<f64>,
    pub median_area: Option<f64>,
}

impl QualitySummary {
    pub fn from_listings(listings: &[NormalizedListing]) -> Self {
        if listings.is_empty() {
            return Self::default();
        }

        let scores: Vec<f64> = listings.iter().map(|l| l.quality_score).collect();
        let mut prices: Vec<f64> = listings.iter().filter_map(|l| l.price).collect();
        let mut areas: Vec<f64> = listings.iter().filter_map(|l| l.area_size).collect();
        prices.sort_by(f64::total_cmp);
        areas.sort_by(f64::total_cmp);

        Self {
            listings: listings.len(),
            avg_quality: mean(&scores).unwrap_or_default(),
            min_quality: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max_quality: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            with_price: prices.len(),
            avg_price: mean(&prices),
            median_price: median(&prices),
            min_price: prices.first().copied(),
            max_price: prices.last().copied(),
            with_area: areas.len(),
            avg_area: mean(&areas),
            median_area: median(&areas),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

// Expects sorted input.
fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}
