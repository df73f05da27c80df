use crate::domain::categories::PropertyType;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// One listing in canonical form, ready to be fingerprinted and stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedListing {
    // Location
    pub title: String,
    pub city: String,
    pub area: Option<String>,
    pub sector_block: Option<String>,
    pub full_address: Option<String>,

    // Price, in rupees
    pub price: Option<f64>,
    pub price_raw: Option<String>,
    pub price_per_sqft: Option<f64>,

    // Size, in square feet
    pub area_size: Option<f64>,
    pub area_unit: Option<String>,
    pub area_raw: Option<String>,

    pub property_type: PropertyType,
    pub bedrooms: Option<u8>,
    pub bathrooms: Option<u8>,

    // Contact
    pub agent_name: Option<String>,
    pub seller_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,

    // Provenance
    pub source_site: String,
    pub source_url: Option<String>,
    pub listing_id: Option<String>,
    pub date_posted: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,

    pub fingerprint: String,
    pub quality_score: f64,
    pub is_duplicate: bool,
}

impl Serialize for PropertyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Filters for `search_listings`. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub bedrooms: Option<u8>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityPriceStats {
    pub city: String,
    pub listings: i64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// Average price of one locality within a city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaPriceStats {
    pub city: String,
    pub area: String,
    pub avg_price: f64,
    pub listings: i64,
}
