//! Google Pollen API client.
//!
//! Fetches the `forecast:lookup` endpoint and classifies outcomes into
//! [`FetchError`] variants. Retryable classes (429, 5xx, timeout, transport
//! errors) get exactly one retry with jittered backoff; the budget is fixed
//! to bound worst-case latency per scheduled cycle. Classification
//! (status → class) and retry policy (class → delay) are pure functions, and
//! sleeping goes through the [`Sleeper`] abstraction so tests record delays
//! instead of waiting.
//!
//! The API key travels as a query parameter; referrer-restricted keys can
//! additionally send an HTTP `Referer` header. Every error message produced
//! here is credential-redacted before it is logged or returned.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::api::types::ForecastResponse;
use crate::errors::FetchError;
use crate::util::{redact_secret, truncate_message};

const POLLEN_API_URL: &str = "https://pollen.googleapis.com/v1/forecast:lookup";

/// Total per-attempt request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry budget: one retry, two attempts total. Fixed by design.
const MAX_RETRIES: u32 = 1;

/// Exponential backoff base for 5xx / timeout / transport retries (seconds).
const BACKOFF_BASE_SECS: f64 = 0.8;

/// Upper bound of the uniform jitter added to exponential backoff (seconds).
const BACKOFF_JITTER_SECS: f64 = 0.3;

/// Fallback delay when a Retry-After header is absent or unparseable (seconds).
const RETRY_AFTER_DEFAULT_SECS: f64 = 2.0;

/// Cap applied to server-provided Retry-After delays (seconds).
const RETRY_AFTER_CAP_SECS: f64 = 5.0;

/// Upper bound of the uniform jitter added to Retry-After delays (seconds).
const RETRY_AFTER_JITTER_SECS: f64 = 0.4;

/// Maximum length of an auth error detail surfaced to the caller.
const AUTH_MESSAGE_MAX_CHARS: usize = 160;

/// Cooperative sleep abstraction so retry delays are testable without
/// real waits.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send;
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(delay)
    }
}

// --- Pure classification and policy steps ---

/// Response status classes, in decreasing specificity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    Ok,
    /// 401/403 — credential rejected, never retried.
    Auth,
    /// 429 — retryable, delay from Retry-After.
    RateLimited,
    /// 5xx — retryable with exponential backoff.
    Server(u16),
    /// Everything else — fails immediately.
    Client(u16),
}

pub(crate) fn classify_status(status: u16) -> StatusClass {
    match status {
        200 => StatusClass::Ok,
        401 | 403 => StatusClass::Auth,
        429 => StatusClass::RateLimited,
        500..=599 => StatusClass::Server(status),
        other => StatusClass::Client(other),
    }
}

/// Jitter-free exponential backoff: 0.8 × 2^attempt seconds.
pub(crate) fn backoff_base_secs(attempt: u32) -> f64 {
    BACKOFF_BASE_SECS * f64::from(2u32.pow(attempt))
}

fn backoff_delay(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0.0..BACKOFF_JITTER_SECS);
    Duration::from_secs_f64(backoff_base_secs(attempt) + jitter)
}

/// Translate a Retry-After header into a delay in seconds, before cap and
/// jitter. Accepts a float seconds count or an HTTP date; anything else
/// falls back to the 2 s default.
pub(crate) fn parse_retry_after(raw: &str, now: DateTime<Utc>) -> f64 {
    if let Ok(secs) = raw.trim().parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            return secs;
        }
        return RETRY_AFTER_DEFAULT_SECS;
    }
    if let Some(retry_at) = parse_http_date(raw) {
        let delay = (retry_at - now).num_milliseconds() as f64 / 1000.0;
        if delay > 0.0 {
            return delay;
        }
    }
    RETRY_AFTER_DEFAULT_SECS
}

/// Cap a Retry-After delay at 5 s. Jitter is added separately.
pub(crate) fn cap_retry_after(delay_secs: f64) -> f64 {
    delay_secs.min(RETRY_AFTER_CAP_SECS)
}

fn retry_after_delay(raw: Option<&str>) -> Duration {
    let base = raw
        .map(|r| parse_retry_after(r, Utc::now()))
        .unwrap_or(RETRY_AFTER_DEFAULT_SECS);
    let jitter = rand::thread_rng().gen_range(0.0..RETRY_AFTER_JITTER_SECS);
    Duration::from_secs_f64(cap_retry_after(base) + jitter)
}

/// Parse HTTP-date formats used by Retry-After.
fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    // "Sun, 06 Nov 1994 08:49:37 GMT"     (preferred)
    // "Sunday, 06-Nov-94 08:49:37 GMT"     (obsolete RFC 850)
    // "Sun Nov  6 08:49:37 1994"           (ANSI C asctime)
    let formats = [
        "%a, %d %b %Y %H:%M:%S GMT",
        "%A, %d-%b-%y %H:%M:%S GMT",
        "%a %b %e %H:%M:%S %Y",
    ];

    for fmt in &formats {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s.trim(), fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }
    None
}

// --- Client ---

/// Client for the Pollen API.
#[derive(Debug, Clone)]
pub struct PollenClient<S: Sleeper = TokioSleeper> {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    referrer: Option<String>,
    sleeper: S,
}

impl PollenClient<TokioSleeper> {
    pub fn new(api_key: &str) -> Self {
        Self::with_sleeper(api_key, POLLEN_API_URL, TokioSleeper)
    }
}

impl<S: Sleeper> PollenClient<S> {
    /// Build a client against a specific endpoint with a specific sleeper.
    /// Tests point this at a mock server and a delay recorder.
    pub fn with_sleeper(api_key: &str, base_url: &str, sleeper: S) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            referrer: None,
            sleeper,
        }
    }

    /// Set the HTTP `Referer` header sent with every request, for API keys
    /// restricted to a referrer.
    pub fn with_referrer(mut self, referrer: Option<&str>) -> Self {
        self.referrer = referrer.map(|r| r.to_string());
        self
    }

    fn redact(&self, text: &str) -> String {
        redact_secret(text, &self.api_key)
    }

    /// Fetch the pollen forecast for a location.
    ///
    /// `days` must already be clamped to the supported window by the caller;
    /// `language` is omitted from the request when absent.
    pub async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        days: u8,
        language: Option<&str>,
    ) -> Result<ForecastResponse, FetchError> {
        let mut params = vec![
            ("key".to_string(), self.api_key.clone()),
            ("location.latitude".to_string(), format!("{:.6}", latitude)),
            ("location.longitude".to_string(), format!("{:.6}", longitude)),
            ("days".to_string(), days.to_string()),
        ];
        if let Some(lang) = language {
            params.push(("languageCode".to_string(), lang.to_string()));
        }

        tracing::debug!(
            "Fetching forecast (days={}, lang_set={})",
            days,
            language.is_some()
        );

        for attempt in 0..=MAX_RETRIES {
            let mut request = self.client.get(&self.base_url).query(&params);
            if let Some(referrer) = &self.referrer {
                request = request.header(reqwest::header::REFERER, referrer);
            }
            let response = match request.send().await {
                Ok(resp) => resp,
                Err(err) if err.is_timeout() => {
                    if attempt < MAX_RETRIES {
                        self.warn_and_sleep("timeout", backoff_delay(attempt), attempt)
                            .await;
                        continue;
                    }
                    return Err(FetchError::Timeout(self.redact(&err.to_string())));
                }
                Err(err) if err.is_builder() => {
                    return Err(FetchError::Unexpected(self.redact(&err.to_string())));
                }
                Err(err) => {
                    if attempt < MAX_RETRIES {
                        self.warn_and_sleep("network error", backoff_delay(attempt), attempt)
                            .await;
                        continue;
                    }
                    return Err(FetchError::Network(self.redact(&err.to_string())));
                }
            };

            match classify_status(response.status().as_u16()) {
                StatusClass::Ok => {
                    return response
                        .json::<ForecastResponse>()
                        .await
                        .map_err(|err| FetchError::Unexpected(self.redact(&err.to_string())));
                }
                StatusClass::Auth => {
                    let message = self.extract_auth_message(response).await;
                    return Err(FetchError::Auth(
                        message.unwrap_or_else(|| "Invalid API key".to_string()),
                    ));
                }
                StatusClass::RateLimited => {
                    if attempt < MAX_RETRIES {
                        let retry_after = response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .map(|s| s.to_string());
                        self.warn_and_sleep(
                            "HTTP 429",
                            retry_after_delay(retry_after.as_deref()),
                            attempt,
                        )
                        .await;
                        continue;
                    }
                    return Err(FetchError::Quota);
                }
                StatusClass::Server(status) => {
                    if attempt < MAX_RETRIES {
                        self.warn_and_sleep(
                            &format!("HTTP {}", status),
                            backoff_delay(attempt),
                            attempt,
                        )
                        .await;
                        continue;
                    }
                    return Err(FetchError::Server(status));
                }
                StatusClass::Client(status) => {
                    return Err(FetchError::ClientRequest(status));
                }
            }
        }

        // The loop always returns; attempts are bounded by MAX_RETRIES.
        unreachable!("retry loop exited without a result")
    }

    async fn warn_and_sleep(&self, cause: &str, delay: Duration, attempt: u32) {
        tracing::warn!(
            "Pollen API {} — retrying in {:.2}s (attempt {}/{})",
            cause,
            delay.as_secs_f64(),
            attempt + 1,
            MAX_RETRIES,
        );
        self.sleeper.sleep(delay).await;
    }

    /// Extract a short error detail from a 401/403 response body:
    /// `{"error":{"message":...}}`, top-level `message`, or the trimmed body
    /// text. Redacted and truncated before use.
    async fn extract_auth_message(&self, response: reqwest::Response) -> Option<String> {
        let raw_text = response.text().await.unwrap_or_default();
        if raw_text.is_empty() {
            return None;
        }
        let redacted = self.redact(&raw_text);

        let mut message = serde_json::from_str::<serde_json::Value>(&redacted)
            .ok()
            .and_then(|data| {
                data.get("error")
                    .and_then(|e| e.get("message"))
                    .or_else(|| data.get("message"))
                    .and_then(|m| m.as_str())
                    .map(|s| s.to_string())
            });

        if message.is_none() {
            let trimmed = redacted.trim();
            if !trimmed.is_empty() {
                message = Some(trimmed.to_string());
            }
        }

        message.map(|m| truncate_message(&m, AUTH_MESSAGE_MAX_CHARS))
    }
}
