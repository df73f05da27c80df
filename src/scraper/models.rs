use std::collections::BTreeMap;
use std::fmt;

// One scraped listing card, before normalization:
//
// raw
//  ├── title          "3 Bed House for Sale"
//  ├── price          "PKR 1.5 Crore" | 15000000
//  ├── area_raw       "10 Marla"
//  ├── location       "DHA Phase 6, Defence, Karachi"
//  ├── details        "3 beds 4 baths 10 marla"
//  └── ...            any other key the extractor found
//
// No key is required. Everything is validated at the normalizer boundary.

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => write!(f, "{s}"),
            RawValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

/// A loosely-typed field bag produced by an extractor for one listing element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListing {
    fields: BTreeMap<String, RawValue>,
}

impl RawListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style insert, handy for tests and extractors.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Field as trimmed, non-empty text. Numbers are rendered with `Display`.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            RawValue::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            RawValue::Number(n) => Some(n.to_string()),
        }
    }

    /// First key among `keys` that has a non-empty text value.
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.text(k))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Best-effort label for log lines about this record.
    pub fn title_hint(&self) -> String {
        self.text("title").unwrap_or_else(|| "<untitled>".to_string())
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawListing {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut raw = RawListing::new();
        for (k, v) in iter {
            raw.insert(k, v);
        }
        raw
    }
}

/// What an extractor returns for one fetched page.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    pub records: Vec<RawListing>,
    pub has_next_page: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_trims_and_skips_blank_values() {
        let raw = RawListing::new()
            .with("title", "  Corner plot  ")
            .with("area", "   ")
            .with("bedrooms", 3i64);

        assert_eq!(raw.text("title").as_deref(), Some("Corner plot"));
        assert_eq!(raw.text("area"), None);
        assert_eq!(raw.text("bedrooms").as_deref(), Some("3"));
        assert_eq!(raw.text("missing"), None);
    }

    #[test]
    fn first_text_prefers_earlier_keys() {
        let raw: RawListing = [("price", "85 Lakh"), ("price_raw", "PKR 85 Lakh")]
            .into_iter()
            .collect();

        assert_eq!(
            raw.first_text(&["price_raw", "price"]).as_deref(),
            Some("PKR 85 Lakh")
        );
        assert_eq!(raw.title_hint(), "<untitled>");
    }
}
