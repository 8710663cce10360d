//! HAFAS REST HTTP client.
//!
//! Provides the async departures query against a `transport.rest`
//! deployment. Handles concurrency capping, status-class mapping, and
//! normalization of the two response shapes into one record list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tokio::sync::Semaphore;

use super::error::HafasError;
use super::profile::Profile;
use super::types::{Departure, DeparturesResponse};

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the HAFAS client.
#[derive(Debug, Clone)]
pub struct HafasConfig {
    /// Which endpoint family to query.
    pub profile: Profile,
    /// Base URL (defaults to the profile's public deployment).
    pub base_url: String,
    /// User-Agent sent with every request, as the public endpoints ask for.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum concurrent requests.
    pub max_concurrent: usize,
}

impl HafasConfig {
    /// Create a new config for the given profile.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            base_url: profile.default_base_url().to_string(),
            user_agent: format!(
                "{} v{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Set a custom base URL (for self-hosted deployments or testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }
}

/// Parameters for one departures query.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartureQuery {
    /// How many minutes of departures to fetch.
    pub duration: i64,

    /// Start of the query window.
    pub when: DateTime<Utc>,

    /// Optional direction filter (a station id the departure must head
    /// towards). `None` queries all directions.
    pub direction: Option<String>,
}

/// HAFAS REST API client.
///
/// Cloning is cheap; clones share the HTTP connection pool and the
/// concurrency semaphore.
#[derive(Debug, Clone)]
pub struct HafasClient {
    http: reqwest::Client,
    base_url: String,
    profile: Profile,
    semaphore: Arc<Semaphore>,
}

impl HafasClient {
    /// Create a new client with the given configuration.
    pub fn new(config: HafasConfig) -> Result<Self, HafasError> {
        let mut headers = HeaderMap::new();

        let user_agent =
            HeaderValue::from_str(&config.user_agent).map_err(|_| HafasError::Api {
                status: 0,
                message: "Invalid user agent".to_string(),
            })?;
        headers.insert(USER_AGENT, user_agent);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            profile: config.profile,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    /// The endpoint profile this client queries.
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Query departures for a stop.
    ///
    /// Accepts both response shapes the endpoints may return (a bare list
    /// or an object with a `departures` field) and returns the flat record
    /// list either way.
    pub async fn get_departures(
        &self,
        stop_id: &str,
        query: &DepartureQuery,
    ) -> Result<Vec<Departure>, HafasError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| HafasError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let url = format!("{}/stops/{}/departures", self.base_url, stop_id);

        let mut params = vec![
            ("duration", query.duration.to_string()),
            ("when", query.when.to_rfc3339()),
        ];
        if let Some(direction) = &query.direction {
            params.push(("direction", direction.clone()));
        }

        let response = self.http.get(&url).query(&params).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(HafasError::StopNotFound {
                stop_id: stop_id.to_string(),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(HafasError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HafasError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        let parsed: DeparturesResponse =
            serde_json::from_str(&body).map_err(|e| HafasError::Json {
                message: e.to_string(),
                body: Some(body.chars().take(500).collect()),
            })?;

        Ok(parsed.into_departures())
    }
}
