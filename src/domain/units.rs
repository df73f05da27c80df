// src/domain/units.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Magnitude words, in scan priority order.
const PRICE_MAGNITUDES: [(&str, f64); 5] = [
    ("crore", 10_000_000.0),
    ("lakh", 100_000.0),
    ("thousand", 1_000.0),
    ("k", 1_000.0),
    ("million", 1_000_000.0),
];

static PRICE_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.,\w\s]").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"));

// `<number><optional space><word>`; whatever follows the word is ignored.
static MAGNITUDE_PATTERNS: Lazy<Vec<(&'static str, f64, Regex)>> = Lazy::new(|| {
    PRICE_MAGNITUDES
        .iter()
        .map(|(word, mult)| {
            let re = Regex::new(&format!(r"(\d+(?:\.\d+)?)\s*{word}")).expect("static regex");
            (*word, *mult, re)
        })
        .collect()
});

static AREA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d+(?:\.\d+)?)\s*(marlas?|kanals?|sq\.?\s*ft|sqft|square\s*f(?:ee|oo)t|sq\.?\s*y(?:ar)?ds?|sq\.?\s*m(?:eters?|etres?)?\b|square\s*met(?:er|re)s?|yards?|yds?\b|acres?)",
    )
    .expect("static regex")
});

/// Area units found in listing text, with their square-foot factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaUnit {
    Marla,
    Kanal,
    SquareFoot,
    SquareMeter,
    SquareYard,
    Acre,
}

impl AreaUnit {
    pub fn square_feet(self) -> f64 {
        match self {
            AreaUnit::Marla => 272.25,
            AreaUnit::Kanal => 5445.0,
            AreaUnit::SquareFoot => 1.0,
            AreaUnit::SquareMeter => 10.764,
            AreaUnit::SquareYard => 9.0,
            AreaUnit::Acre => 43560.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AreaUnit::Marla => "marla",
            AreaUnit::Kanal => "kanal",
            AreaUnit::SquareFoot => "sqft",
            AreaUnit::SquareMeter => "sqm",
            AreaUnit::SquareYard => "sqyd",
            AreaUnit::Acre => "acre",
        }
    }

    // Token is whatever AREA_PATTERN captured as the unit.
    fn from_token(token: &str) -> Self {
        if token.starts_with("marla") {
            AreaUnit::Marla
        } else if token.starts_with("kanal") {
            AreaUnit::Kanal
        } else if token.starts_with("acre") {
            AreaUnit::Acre
        } else if token.contains('y') {
            AreaUnit::SquareYard
        } else if token.contains('f') {
            AreaUnit::SquareFoot
        } else {
            AreaUnit::SquareMeter
        }
    }
}

impl fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed area: square feet plus the unit it was written in, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaReading {
    pub square_feet: f64,
    pub unit: Option<AreaUnit>,
}

fn first_number(text: &str) -> Option<f64> {
    NUMBER.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Canonical amount from free-text price ("PKR 1.5 Crore", "85 Lakh", "50,000").
pub fn normalize_price(text: &str) -> Option<f64> {
    let lowered = text.to_lowercase();
    let cleaned = PRICE_NOISE.replace_all(&lowered, "");
    let cleaned = WHITESPACE.replace_all(cleaned.trim(), " ").replace(',', "");

    for (word, multiplier, re) in MAGNITUDE_PATTERNS.iter() {
        if !cleaned.contains(word) {
            continue;
        }
        if let Some(caps) = re.captures(&cleaned) {
            if let Ok(number) = caps[1].parse::<f64>() {
                return Some(number * multiplier);
            }
        }
    }

    first_number(&cleaned)
}

/// Area in square feet with the unit it was given in.
pub fn parse_area(text: &str) -> Option<AreaReading> {
    let cleaned = text.to_lowercase().replace(',', "");

    if let Some(caps) = AREA_PATTERN.captures(&cleaned) {
        if let Ok(size) = caps[1].parse::<f64>() {
            let unit = AreaUnit::from_token(&caps[2]);
            return Some(AreaReading {
                square_feet: size * unit.square_feet(),
                unit: Some(unit),
            });
        }
    }

    // No unit token: assume it is already square feet.
    first_number(&cleaned).map(|square_feet| AreaReading {
        square_feet,
        unit: None,
    })
}

/// Square feet from free-text area ("5 Marla", "1 Kanal", "1000 sq ft").
pub fn normalize_area(text: &str) -> Option<f64> {
    parse_area(text).map(|r| r.square_feet)
}
