// src/domain/categories.rs

use std::fmt;

/// Canonical property categories. Anything unrecognized is kept title-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    House,
    Apartment,
    Plot,
    Commercial,
    Farmhouse,
    Penthouse,
    Studio,
    Other,
    Unlisted(String),
}

/// Category → synonyms. Order matters: the first category with a synonym
/// contained in the input wins, so "Farm House" is a House.
const PROPERTY_TYPE_TABLE: [(PropertyType, &[&str]); 7] = [
    (
        PropertyType::House,
        &["house", "home", "bungalow", "villa", "cottage", "townhouse"],
    ),
    (PropertyType::Apartment, &["apartment", "flat", "unit", "condo"]),
    (
        PropertyType::Plot,
        &["plot", "land", "residential plot", "commercial plot", "vacant land"],
    ),
    (
        PropertyType::Commercial,
        &["shop", "office", "warehouse", "building", "commercial space"],
    ),
    (PropertyType::Farmhouse, &["farmhouse", "farm house"]),
    (PropertyType::Penthouse, &["penthouse", "penthouse apartment"]),
    (PropertyType::Studio, &["studio", "studio apartment"]),
];

impl PropertyType {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::House => "House",
            PropertyType::Apartment => "Apartment",
            PropertyType::Plot => "Plot",
            PropertyType::Commercial => "Commercial",
            PropertyType::Farmhouse => "Farmhouse",
            PropertyType::Penthouse => "Penthouse",
            PropertyType::Studio => "Studio",
            PropertyType::Other => "Other",
            PropertyType::Unlisted(label) => label,
        }
    }

    /// Inverse of `as_str`, for rows read back from storage.
    pub fn from_label(label: &str) -> Self {
        PROPERTY_TYPE_TABLE
            .iter()
            .map(|(category, _)| category)
            .find(|category| category.as_str() == label)
            .cloned()
            .unwrap_or_else(|| match label {
                "" | "Other" => PropertyType::Other,
                _ => PropertyType::Unlisted(label.to_string()),
            })
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category whose synonym appears in `text`, if any.
pub fn match_property_type(text: &str) -> Option<PropertyType> {
    let lowered = text.to_lowercase();
    PROPERTY_TYPE_TABLE
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| lowered.contains(s)))
        .map(|(category, _)| category.clone())
}

pub fn standardize_property_type(text: &str) -> PropertyType {
    let text = text.trim();
    if text.is_empty() {
        return PropertyType::Other;
    }
    match_property_type(text).unwrap_or_else(|| PropertyType::Unlisted(title_case(text)))
}

/// Canonical city → known spellings and abbreviations (lower-case).
pub const CANONICAL_CITIES: [(&str, &[&str]); 5] = [
    ("Karachi", &["karachi", "krchi", "khi"]),
    ("Lahore", &["lahore", "lhr", "lahore city"]),
    ("Islamabad", &["islamabad", "isb", "islamabad capital"]),
    ("Rawalpindi", &["rawalpindi", "rwp", "pindi"]),
    ("Faisalabad", &["faisalabad", "fsd", "lyallpur"]),
];

/// Known variant → canonical name; anything else is title-cased.
pub fn normalize_city(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    CANONICAL_CITIES
        .iter()
        .find(|(_, variants)| variants.contains(&lowered.as_str()))
        .map(|(city, _)| city.to_string())
        .unwrap_or_else(|| title_case(text.trim()))
}

/// Pieces of a free-text location line such as "DHA Phase 6, Defence, Karachi".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLocation {
    pub city: Option<String>,
    pub area: Option<String>,
    pub sector_block: Option<String>,
    pub full_address: Option<String>,
}

pub fn parse_location(text: &str) -> ParsedLocation {
    let text = text.trim();
    if text.is_empty() {
        return ParsedLocation::default();
    }

    let parts: Vec<&str> = text
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let lowered = text.to_lowercase();
    let city = CANONICAL_CITIES
        .iter()
        .find(|(city, _)| lowered.contains(&city.to_lowercase()))
        .map(|(city, _)| city.to_string())
        .or_else(|| parts.last().map(|p| normalize_city(p)));

    ParsedLocation {
        city,
        area: (parts.len() > 1).then(|| title_case(parts[0])),
        sector_block: (parts.len() > 2).then(|| title_case(parts[1])),
        full_address: Some(text.to_string()),
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
