// client.rs
use crate::config::IngestConfig;
use crate::scraper::{AcquisitionError, TransportError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::blocking::Client;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

/// Status and decoded body of one GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// One HTTP GET with a given client identity. No retries at this level.
pub trait Transport {
    fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError>;
}

/// Blocking sleep, injectable so backoff can be observed in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, AcquisitionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AcquisitionError::Network(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::Network(e.to_string())
            }
        };

        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .map_err(classify)?;

        let status = resp.status().as_u16();
        let body = resp.text().map_err(classify)?;

        Ok(HttpResponse { status, body })
    }
}

/// Longest single pause or cool-down the client will sleep for.
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// A closed interval of seconds to sample a sleep from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    min_secs: f64,
    max_secs: f64,
}

impl DelayRange {
    /// Bounds are clamped into `0..=MAX_DELAY_SECS`; NaN falls to the lower bound.
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        let min_secs = min_secs.max(0.0).min(MAX_DELAY_SECS);
        let max_secs = max_secs.max(min_secs).min(MAX_DELAY_SECS);
        Self { min_secs, max_secs }
    }

    pub fn none() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_secs_f64(rng.gen_range(self.min_secs..=self.max_secs))
    }
}

/// How many attempts a fetch gets and how long to back off between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_base: Duration,
    pub transport_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base: Duration::from_secs(60),
            transport_base: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Backoff after a failed attempt (numbered from 0).
    /// `None` means retry right away after the usual pacing delay.
    pub fn backoff(&self, failure: &AcquisitionError, attempt: u32) -> Option<Duration> {
        let factor = 2u32.saturating_pow(attempt);
        match failure {
            AcquisitionError::RateLimited => Some(self.rate_limit_base.saturating_mul(factor)),
            AcquisitionError::Timeout(_) | AcquisitionError::Network(_) => {
                Some(self.transport_base.saturating_mul(factor))
            }
            AcquisitionError::HttpError(_) => None,
        }
    }
}

/// Paced, retrying fetcher with round-robin client identities.
pub struct AcquisitionClient {
    transport: Box<dyn Transport>,
    sleeper: Box<dyn Sleeper>,
    user_agents: Vec<String>,
    next_identity: usize,
    pacing: DelayRange,
    policy: RetryPolicy,
    rng: StdRng,
}

impl AcquisitionClient {
    /// Production client: reqwest transport, real sleeps, entropy-seeded pacing.
    pub fn from_config(cfg: &IngestConfig) -> Result<Self, AcquisitionError> {
        let transport = ReqwestTransport::new(Duration::from_secs(cfg.request_timeout_secs))?;
        Ok(Self::with_parts(
            Box::new(transport),
            Box::new(ThreadSleeper),
            cfg.user_agents.clone(),
            DelayRange::new(cfg.pacing_delay_min, cfg.pacing_delay_max),
            RetryPolicy::with_max_attempts(cfg.max_retries),
            StdRng::from_entropy(),
        ))
    }

    pub fn with_parts(
        transport: Box<dyn Transport>,
        sleeper: Box<dyn Sleeper>,
        user_agents: Vec<String>,
        pacing: DelayRange,
        policy: RetryPolicy,
        rng: StdRng,
    ) -> Self {
        let user_agents = if user_agents.is_empty() {
            vec![FALLBACK_USER_AGENT.to_string()]
        } else {
            user_agents
        };

        Self {
            transport,
            sleeper,
            user_agents,
            next_identity: 0,
            pacing,
            policy,
            rng,
        }
    }

    fn rotate_identity(&mut self) -> usize {
        let idx = self.next_identity % self.user_agents.len();
        self.next_identity = self.next_identity.wrapping_add(1);
        idx
    }

    /// Sleep a random duration from `range` using this client's clock and rng.
    pub fn pause(&mut self, range: DelayRange) {
        let delay = range.sample(&mut self.rng);
        debug!(delay_secs = delay.as_secs_f64(), "cooling down");
        self.sleeper.sleep(delay);
    }

    /// GET `url`, retrying per the policy. A 2xx body is returned as soon as it arrives.
    pub fn fetch(&mut self, url: &str) -> Result<String, AcquisitionError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 0..max_attempts {
            let idx = self.rotate_identity();
            let delay = self.pacing.sample(&mut self.rng);
            self.sleeper.sleep(delay);

            let user_agent = &self.user_agents[idx];
            debug!(url, attempt, identity = idx, "fetching");

            let failure = match self.transport.get(url, user_agent) {
                Ok(resp) if (200..300).contains(&resp.status) => {
                    info!(url, attempt, status = resp.status, "fetched");
                    return Ok(resp.body);
                }
                Ok(resp) if resp.status == 429 => {
                    warn!(url, attempt, "rate limited");
                    AcquisitionError::RateLimited
                }
                Ok(resp) => {
                    warn!(url, attempt, status = resp.status, "unexpected HTTP status");
                    AcquisitionError::HttpError(resp.status)
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "request failed");
                    AcquisitionError::from(e)
                }
            };

            // No point backing off after the final attempt.
            if attempt + 1 < max_attempts {
                if let Some(wait) = self.policy.backoff(&failure, attempt) {
                    info!(url, attempt, wait_secs = wait.as_secs(), "backing off");
                    self.sleeper.sleep(wait);
                }
            }

            last_err = Some(failure);
        }

        error!(url, attempts = max_attempts, "giving up on page");
        Err(last_err.unwrap_or_else(|| AcquisitionError::Network("no attempt made".into())))
    }
}
