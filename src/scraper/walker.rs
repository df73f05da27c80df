// walker.rs
use crate::config::SourceConfig;
use crate::scraper::client::{AcquisitionClient, DelayRange};
use crate::scraper::extract::Extractor;
use crate::scraper::models::RawListing;
use crate::scraper::{AcquisitionError, ExtractionError};
use tracing::{info, warn};

/// Why a region's walk ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    LastPage,
    NoRecords,
    PageLimit,
    Acquisition(AcquisitionError),
    Extraction(ExtractionError),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::Acquisition(_) | StopReason::Extraction(_))
    }
}

/// A raw record and the results page it was found on.
#[derive(Debug, Clone)]
pub struct ScrapedRecord {
    pub page: u32,
    pub raw: RawListing,
}

/// Everything collected from one region, handed over as soon as the region ends.
#[derive(Debug)]
pub struct RegionOutcome {
    pub region: String,
    pub records: Vec<ScrapedRecord>,
    pub pages_fetched: u32,
    pub stop: StopReason,
}

pub struct PaginationWalker<'a> {
    client: &'a mut AcquisitionClient,
    extractor: &'a dyn Extractor,
    max_pages: u32,
    cooldown: DelayRange,
}

impl<'a> PaginationWalker<'a> {
    pub fn new(
        client: &'a mut AcquisitionClient,
        extractor: &'a dyn Extractor,
        max_pages: u32,
        cooldown: DelayRange,
    ) -> Self {
        Self {
            client,
            extractor,
            max_pages,
            cooldown,
        }
    }

    /// Walk every region in order. A failing region never stops the walk.
    pub fn walk<F>(&mut self, source: &SourceConfig, regions: &[String], mut on_region: F)
    where
        F: FnMut(RegionOutcome),
    {
        for (i, region) in regions.iter().enumerate() {
            if i > 0 {
                self.client.pause(self.cooldown);
            }

            let outcome = self.walk_region(source, region);
            match &outcome.stop {
                StopReason::Acquisition(e) => warn!(
                    source = %source.name,
                    region = %region,
                    page = outcome.pages_fetched + 1,
                    error = %e,
                    "region stopped: page could not be fetched"
                ),
                StopReason::Extraction(e) => warn!(
                    source = %source.name,
                    region = %region,
                    page = outcome.pages_fetched,
                    error = %e,
                    "region stopped: page could not be extracted"
                ),
                stop => info!(
                    source = %source.name,
                    region = %region,
                    pages = outcome.pages_fetched,
                    records = outcome.records.len(),
                    ?stop,
                    "region done"
                ),
            }

            on_region(outcome);
        }
    }

    fn walk_region(&mut self, source: &SourceConfig, region: &str) -> RegionOutcome {
        let mut records = Vec::new();
        let mut pages_fetched = 0;

        let stop = 'pages: {
            for page in 1..=self.max_pages {
                let url = source.page_url(region, page);
                info!(source = %source.name, region, page, %url, "scraping page");

                let body = match self.client.fetch(&url) {
                    Ok(body) => body,
                    Err(e) => break 'pages StopReason::Acquisition(e),
                };
                pages_fetched += 1;

                let extracted = match self.extractor.extract(&body, region) {
                    Ok(p) => p,
                    Err(e) => break 'pages StopReason::Extraction(e),
                };

                if extracted.records.is_empty() {
                    break 'pages StopReason::NoRecords;
                }

                info!(region, page, found = extracted.records.len(), "page parsed");
                records.extend(
                    extracted
                        .records
                        .into_iter()
                        .map(|raw| ScrapedRecord { page, raw }),
                );

                if !extracted.has_next_page {
                    break 'pages StopReason::LastPage;
                }
            }
            StopReason::PageLimit
        };

        RegionOutcome {
            region: region.to_string(),
            records,
            pages_fetched,
            stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::client::{HttpResponse, RetryPolicy, Sleeper, Transport};
    use crate::scraper::models::ExtractedPage;
    use crate::scraper::TransportError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::time::Duration;

    // Serves bodies by URL; unknown URLs get a 404.
    struct Pages(HashMap<String, String>);

    impl Transport for Pages {
        fn get(&self, url: &str, _ua: &str) -> Result<HttpResponse, TransportError> {
            Ok(match self.0.get(url) {
                Some(body) => HttpResponse { status: 200, body: body.clone() },
                None => HttpResponse { status: 404, body: String::new() },
            })
        }
    }

    struct NoSleep;
    impl Sleeper for NoSleep {
        fn sleep(&self, _d: Duration) {}
    }

    // Body format: "<n records>;<has next>" or "garbage".
    struct CountExtractor;
    impl Extractor for CountExtractor {
        fn extract(&self, page: &str, region: &str) -> Result<ExtractedPage, ExtractionError> {
            let (n, next) = page
                .split_once(';')
                .ok_or_else(|| ExtractionError::UnexpectedShape(page.to_string()))?;
            let n: usize = n.parse().map_err(|_| ExtractionError::JsonParse(n.into()))?;
            let records = (0..n)
                .map(|i| RawListing::new().with("title", format!("{region} #{i}")))
                .collect();
            Ok(ExtractedPage { records, has_next_page: next == "more" })
        }
    }

    fn source() -> SourceConfig {
        SourceConfig {
            name: "test".into(),
            url_template: "http://site/{region}/{page}".into(),
            listings_pointer: "/listings".into(),
            next_page_pointer: None,
        }
    }

    fn run(pages: &[(&str, &str)], regions: &[&str], max_pages: u32) -> Vec<RegionOutcome> {
        let map = pages
            .iter()
            .map(|(u, b)| (u.to_string(), b.to_string()))
            .collect();
        let mut client = AcquisitionClient::with_parts(
            Box::new(Pages(map)),
            Box::new(NoSleep),
            vec![],
            DelayRange::none(),
            RetryPolicy::with_max_attempts(1),
            StdRng::seed_from_u64(0),
        );
        let extractor = CountExtractor;
        let mut walker = PaginationWalker::new(&mut client, &extractor, max_pages, DelayRange::none());

        let regions: Vec<String> = regions.iter().map(|r| r.to_string()).collect();
        let mut out = Vec::new();
        walker.walk(&source(), &regions, |o| out.push(o));
        out
    }

    #[test]
    fn follows_pages_until_last_page() {
        let out = run(
            &[
                ("http://site/Lahore/1", "2;more"),
                ("http://site/Lahore/2", "1;end"),
                ("http://site/Lahore/3", "5;more"),
            ],
            &["Lahore"],
            10,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].records.len(), 3);
        let pages: Vec<u32> = out[0].records.iter().map(|r| r.page).collect();
        assert_eq!(pages, [1, 1, 2]);
        assert_eq!(out[0].pages_fetched, 2);
        assert_eq!(out[0].stop, StopReason::LastPage);
    }

    #[test]
    fn stops_at_page_limit_and_on_empty_page() {
        let out = run(
            &[
                ("http://site/A/1", "1;more"),
                ("http://site/A/2", "1;more"),
                ("http://site/B/1", "0;more"),
            ],
            &["A", "B"],
            2,
        );

        assert_eq!(out[0].stop, StopReason::PageLimit);
        assert_eq!(out[0].records.len(), 2);
        assert_eq!(out[1].stop, StopReason::NoRecords);
        assert!(out[1].records.is_empty());
    }

    #[test]
    fn failed_region_keeps_earlier_pages_and_walk_continues() {
        let out = run(
            &[
                ("http://site/A/1", "3;more"),
                // A/2 missing -> 404
                ("http://site/B/1", "garbage"),
                ("http://site/C/1", "1;end"),
            ],
            &["A", "B", "C"],
            5,
        );

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].records.len(), 3);
        assert_eq!(out[0].stop, StopReason::Acquisition(AcquisitionError::HttpError(404)));
        assert!(matches!(out[1].stop, StopReason::Extraction(_)));
        assert!(out[1].stop.is_failure());
        assert_eq!(out[2].stop, StopReason::LastPage);
        assert_eq!(out[2].records[0].raw.text("title").as_deref(), Some("C #0"));
    }
}
