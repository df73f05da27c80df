use crate::db::listings::search_listings;
use crate::db::Database;
use crate::domain::listing::{ListingQuery, NormalizedListing};
use crate::errors::ExportError;
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;
use tracing::{info, warn};

/// Upper bound on rows in one export.
pub const EXPORT_LIMIT: u32 = 10_000;

const HEADERS: [&str; 16] = [
    "Title",
    "City",
    "Area",
    "Sector / Block",
    "Price (PKR)",
    "Price per sq ft",
    "Property Type",
    "Beds",
    "Baths",
    "Size (sq ft)",
    "Size Unit",
    "Agent",
    "Phone",
    "Source",
    "Scraped At",
    "Quality",
];

/// Workbook bytes with one row per listing under a header row.
pub fn listings_workbook(listings: &[NormalizedListing]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(|e| ExportError::Xlsx(format!("Failed to write header '{header}': {e}")))?;
    }

    for (i, l) in listings.iter().enumerate() {
        let r = (i + 1) as u32;

        text(worksheet, r, 0, Some(&l.title))?;
        text(worksheet, r, 1, Some(&l.city))?;
        text(worksheet, r, 2, l.area.as_deref())?;
        text(worksheet, r, 3, l.sector_block.as_deref())?;
        number(worksheet, r, 4, l.price)?;
        number(worksheet, r, 5, l.price_per_sqft)?;
        text(worksheet, r, 6, Some(l.property_type.as_str()))?;
        number(worksheet, r, 7, l.bedrooms.map(f64::from))?;
        number(worksheet, r, 8, l.bathrooms.map(f64::from))?;
        number(worksheet, r, 9, l.area_size)?;
        text(worksheet, r, 10, l.area_unit.as_deref())?;
        text(worksheet, r, 11, l.agent_name.as_deref())?;
        text(worksheet, r, 12, l.contact_phone.as_deref())?;
        text(worksheet, r, 13, Some(&l.source_site))?;
        text(worksheet, r, 14, Some(&l.scraped_at.to_rfc3339()))?;
        number(worksheet, r, 15, Some(l.quality_score))?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ExportError::Xlsx(format!("Failed to save workbook: {e}")))
}

/// Write stored listings (optionally one city's) to an xlsx file at `path`.
///
/// Returns the number of rows written. Nothing is written when no listing matches.
pub fn export_listings_xlsx(
    db: &Database,
    city: Option<&str>,
    path: &Path,
) -> Result<usize, ExportError> {
    let query = ListingQuery {
        city: city.map(str::to_string),
        limit: Some(EXPORT_LIMIT),
        ..Default::default()
    };
    let listings = search_listings(db, &query)?;

    if listings.is_empty() {
        warn!(city = ?city, "no listings to export");
        return Ok(0);
    }

    let buffer = listings_workbook(&listings)?;
    std::fs::write(path, buffer).map_err(|error| ExportError::Io {
        path: path.display().to_string(),
        error,
    })?;

    info!(rows = listings.len(), path = %path.display(), "listings exported");
    Ok(listings.len())
}

// Absent values leave the cell blank.
fn text(ws: &mut Worksheet, row: u32, col: u16, value: Option<&str>) -> Result<(), ExportError> {
    if let Some(v) = value {
        ws.write_string(row, col, v)
            .map_err(|e| ExportError::Xlsx(format!("Failed to write {}: {e}", HEADERS[col as usize])))?;
    }
    Ok(())
}

fn number(ws: &mut Worksheet, row: u32, col: u16, value: Option<f64>) -> Result<(), ExportError> {
    if let Some(v) = value {
        ws.write_number(row, col, v)
            .map_err(|e| ExportError::Xlsx(format!("Failed to write {}: {e}", HEADERS[col as usize])))?;
    }
    Ok(())
}
