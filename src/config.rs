// config.rs
use crate::errors::ConfigError;
use crate::scraper::client::MAX_DELAY_SECS;
use std::env;
use std::str::FromStr;
use url::Url;

const DEFAULT_USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
];

const DEFAULT_REGIONS: [&str; 5] = ["Karachi", "Lahore", "Islamabad", "Rawalpindi", "Faisalabad"];

/// One remote listing site.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    /// Page URL with `{region}` and optionally `{page}` placeholders.
    pub url_template: String,
    /// JSON pointer to the listing array inside `__NEXT_DATA__`.
    pub listings_pointer: String,
    pub next_page_pointer: Option<String>,
}

impl SourceConfig {
    /// URL of `page` (1-based) for `region`.
    ///
    /// Without a `{page}` placeholder, page 1 is the bare template and later
    /// pages add a `page` query parameter.
    pub fn page_url(&self, region: &str, page: u32) -> String {
        let region: String = url::form_urlencoded::byte_serialize(region.as_bytes()).collect();
        let base = self.url_template.replace("{region}", &region);

        if base.contains("{page}") {
            return base.replace("{page}", &page.to_string());
        }
        if page <= 1 {
            return base;
        }

        match Url::parse(&base) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("page", &page.to_string());
                url.to_string()
            }
            Err(_) => {
                let sep = if base.contains('?') { '&' } else { '?' };
                format!("{base}{sep}page={page}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub pacing_delay_min: f64,
    pub pacing_delay_max: f64,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub target_regions: Vec<String>,
    pub max_pages_per_region: u32,
    pub region_cooldown_min: f64,
    pub region_cooldown_max: f64,
    pub user_agents: Vec<String>,
    pub database_path: String,
    pub sources: Vec<SourceConfig>,
    /// Where to write the listings workbook after the run, if anywhere.
    pub export_path: Option<String>,
    pub export_city: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            pacing_delay_min: 2.0,
            pacing_delay_max: 5.0,
            max_retries: 3,
            request_timeout_secs: 30,
            target_regions: DEFAULT_REGIONS.iter().map(|s| s.to_string()).collect(),
            max_pages_per_region: 5,
            region_cooldown_min: 10.0,
            region_cooldown_max: 20.0,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            database_path: "listings.sqlite3".to_string(),
            sources: Vec::new(),
            export_path: None,
            export_city: None,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        set_parsed(&lookup, "SCRAPING_DELAY_MIN", &mut cfg.pacing_delay_min)?;
        set_parsed(&lookup, "SCRAPING_DELAY_MAX", &mut cfg.pacing_delay_max)?;
        set_parsed(&lookup, "MAX_RETRIES", &mut cfg.max_retries)?;
        set_parsed(&lookup, "REQUEST_TIMEOUT", &mut cfg.request_timeout_secs)?;
        set_parsed(&lookup, "MAX_PAGES_PER_REGION", &mut cfg.max_pages_per_region)?;
        set_parsed(&lookup, "REGION_COOLDOWN_MIN", &mut cfg.region_cooldown_min)?;
        set_parsed(&lookup, "REGION_COOLDOWN_MAX", &mut cfg.region_cooldown_max)?;

        if let Some(regions) = lookup("TARGET_REGIONS") {
            cfg.target_regions = split_list(&regions);
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            cfg.database_path = path;
        }
        cfg.export_path = lookup("EXPORT_PATH").filter(|p| !p.trim().is_empty());
        cfg.export_city = lookup("EXPORT_CITY").filter(|c| !c.trim().is_empty());

        if let Some(url_template) = lookup("SOURCE_URL_TEMPLATE") {
            cfg.sources.push(SourceConfig {
                name: lookup("SOURCE_NAME").unwrap_or_else(|| "default".to_string()),
                url_template,
                listings_pointer: lookup("LISTINGS_POINTER")
                    .unwrap_or_else(|| "/props/pageProps/listings".to_string()),
                next_page_pointer: lookup("NEXT_PAGE_POINTER"),
            });
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_delay_range("pacing delay", self.pacing_delay_min, self.pacing_delay_max)?;
        check_delay_range(
            "region cool-down",
            self.region_cooldown_min,
            self.region_cooldown_max,
        )?;
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid("max_retries must be at least 1".into()));
        }
        if self.target_regions.is_empty() {
            return Err(ConfigError::Invalid("no target regions configured".into()));
        }
        if self.user_agents.is_empty() {
            return Err(ConfigError::Invalid("no user agents configured".into()));
        }
        for source in &self.sources {
            if !source.url_template.contains("{region}") {
                return Err(ConfigError::Invalid(format!(
                    "url template for '{}' has no {{region}} placeholder",
                    source.name
                )));
            }
        }
        Ok(())
    }
}

// An inclusion test, so NaN is rejected too.
fn check_delay_range(what: &str, min: f64, max: f64) -> Result<(), ConfigError> {
    let in_bounds = |v: f64| (0.0..=MAX_DELAY_SECS).contains(&v);
    if in_bounds(min) && in_bounds(max) && min <= max {
        return Ok(());
    }
    Err(ConfigError::Invalid(format!(
        "{what} range {min}..{max} is invalid (seconds, 0 to {MAX_DELAY_SECS})"
    )))
}

fn set_parsed<F, T>(lookup: &F, name: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw.clone() })?;
    }
    Ok(())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
