// extract.rs
use crate::scraper::models::{ExtractedPage, RawListing, RawValue};
use crate::scraper::ExtractionError;
use scraper::{Html, Selector};
use serde_json::Value;

/// Turns decoded page content into raw listing bags.
/// Site-specific selectors live behind this trait.
pub trait Extractor {
    fn extract(&self, page: &str, region: &str) -> Result<ExtractedPage, ExtractionError>;
}

/// Reads listings out of the `__NEXT_DATA__` JSON blob that server-rendered
/// Next.js listing pages embed.
///
/// `listings_pointer` is a JSON pointer (RFC 6901) to the array of listing
/// objects. `next_page_pointer`, when set, points at a value whose truthiness
/// says whether another page exists; without it a non-empty page implies there
/// may be more.
#[derive(Debug, Clone)]
pub struct NextDataExtractor {
    listings_pointer: String,
    next_page_pointer: Option<String>,
}

impl NextDataExtractor {
    pub fn new(listings_pointer: impl Into<String>, next_page_pointer: Option<String>) -> Self {
        Self {
            listings_pointer: listings_pointer.into(),
            next_page_pointer,
        }
    }

    fn extract_next_data(html: &str) -> Result<Value, ExtractionError> {
        let document = Html::parse_document(html);
        let selector = Selector::parse(r#"script[id="__NEXT_DATA__"]"#)
            .map_err(|e| ExtractionError::HtmlParse(e.to_string()))?;

        let element = document
            .select(&selector)
            .next()
            .ok_or(ExtractionError::MissingNextData)?;

        let json_text: String = element.text().collect();
        serde_json::from_str(&json_text).map_err(|e| ExtractionError::JsonParse(e.to_string()))
    }

    fn extract_listings(&self, data: &Value) -> Result<Vec<RawListing>, ExtractionError> {
        let arr = data
            .pointer(&self.listings_pointer)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ExtractionError::UnexpectedShape(format!(
                    "no listing array at {}",
                    self.listings_pointer
                ))
            })?;

        Ok(arr
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                let mut raw = RawListing::new();
                flatten_into(&mut raw, obj);
                raw
            })
            .filter(|raw| !raw.is_empty())
            .collect())
    }

    fn has_next_page(&self, data: &Value, records: &[RawListing]) -> bool {
        match &self.next_page_pointer {
            Some(ptr) => match data.pointer(ptr) {
                None | Some(Value::Null) => false,
                Some(Value::Bool(b)) => *b,
                Some(Value::String(s)) => !s.is_empty(),
                Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
                Some(_) => true,
            },
            None => !records.is_empty(),
        }
    }
}

impl Extractor for NextDataExtractor {
    fn extract(&self, page: &str, _region: &str) -> Result<ExtractedPage, ExtractionError> {
        let data = Self::extract_next_data(page)?;
        let records = self.extract_listings(&data)?;
        let has_next_page = self.has_next_page(&data, &records);
        Ok(ExtractedPage {
            records,
            has_next_page,
        })
    }
}

// Leaf strings/numbers/bools become fields. Nested objects are flattened by
// leaf name; the first occurrence of a key wins, top level first.
fn flatten_into(raw: &mut RawListing, obj: &serde_json::Map<String, Value>) {
    let mut nested = Vec::new();

    for (key, value) in obj {
        if raw.contains(key) {
            continue;
        }
        match value {
            Value::String(s) => raw.insert(key.as_str(), RawValue::Text(s.clone())),
            Value::Number(n) => {
                if let Some(n) = n.as_f64() {
                    raw.insert(key.as_str(), RawValue::Number(n));
                }
            }
            Value::Bool(b) => raw.insert(key.as_str(), RawValue::Text(b.to_string())),
            Value::Object(inner) => nested.push(inner),
            Value::Null | Value::Array(_) => {}
        }
    }

    for inner in nested {
        flatten_into(raw, inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json: &str) -> String {
        format!(
            r#"<html><head></head><body><div id="app"></div>
            <script id="__NEXT_DATA__" type="application/json">{json}</script></body></html>"#
        )
    }

    #[test]
    fn extracts_flattened_listings_and_next_flag() {
        let html = page(
            r#"{"props":{"pageProps":{
                "listings":[
                  {"title":"10 Marla House","price":"PKR 3.2 Crore","beds":5,
                   "location":{"city":"Lahore","area":"DHA Phase 5"},"images":["a.jpg"]},
                  {"title":"Flat","price":9500000,"featured":true,"agent":null}
                ],
                "pagination":{"hasNextPage":true}}}}"#,
        );

        let extractor = NextDataExtractor::new(
            "/props/pageProps/listings",
            Some("/props/pageProps/pagination/hasNextPage".to_string()),
        );
        let out = extractor.extract(&html, "Lahore").unwrap();

        assert!(out.has_next_page);
        assert_eq!(out.records.len(), 2);

        let first = &out.records[0];
        assert_eq!(first.text("title").as_deref(), Some("10 Marla House"));
        assert_eq!(first.text("city").as_deref(), Some("Lahore"));
        assert_eq!(first.text("area").as_deref(), Some("DHA Phase 5"));
        assert_eq!(first.get("beds"), Some(&RawValue::Number(5.0)));
        assert!(!first.contains("images"));

        let second = &out.records[1];
        assert_eq!(second.get("price"), Some(&RawValue::Number(9_500_000.0)));
        assert_eq!(second.text("featured").as_deref(), Some("true"));
        assert!(!second.contains("agent"));
    }

    #[test]
    fn missing_pointer_target_means_last_page() {
        let html = page(r#"{"props":{"pageProps":{"listings":[{"title":"Plot"}]}}}"#);
        let extractor = NextDataExtractor::new(
            "/props/pageProps/listings",
            Some("/props/pageProps/pagination/next".to_string()),
        );

        let out = extractor.extract(&html, "Karachi").unwrap();
        assert_eq!(out.records.len(), 1);
        assert!(!out.has_next_page);
    }

    #[test]
    fn page_without_next_data_is_an_error() {
        let extractor = NextDataExtractor::new("/listings", None);
        let err = extractor
            .extract("<html><body>Access denied</body></html>", "Karachi")
            .unwrap_err();
        assert_eq!(err, ExtractionError::MissingNextData);
    }

    #[test]
    fn wrong_shape_is_reported() {
        let html = page(r#"{"props":{"pageProps":{"listings":{"not":"an array"}}}}"#);
        let extractor = NextDataExtractor::new("/props/pageProps/listings", None);
        assert!(matches!(
            extractor.extract(&html, "Karachi"),
            Err(ExtractionError::UnexpectedShape(_))
        ));
    }
}
