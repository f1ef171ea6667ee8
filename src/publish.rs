//! Delivering a run to Fern over HTTP.
//!
//! The run is POSTed as JSON to `{fern_url}/api/testrun/`.
//!
//! # Status Handling
//!
//! | Status | Action |
//! |--------|--------|
//! | `< 300` | Done |
//! | `307` | POST the same body to `{fern_url}{Location}` |
//! | other `>= 300` | Wait, then start over from `/api/testrun/` |
//!
//! One attempt is a full send cycle: the POST to `/api/testrun/` plus every
//! redirect it leads to. A cycle follows at most [`MAX_REDIRECTS`] redirects,
//! so a server that keeps redirecting cannot stall the client. Once the
//! attempts are spent the status that ended the last cycle is returned as
//! [`FernError::UnexpectedStatus`].
//!
//! Transport failures (connection refused, TLS errors) are not retried.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use tracing::{debug, info, warn};

use crate::error::{FernError, FernResult};
use crate::model::TestRun;

/// Path of the test run endpoint, relative to the Fern base URL.
pub const TEST_RUN_PATH: &str = "/api/testrun/";

/// Send cycles made before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Redirects followed within a single send cycle.
pub const MAX_REDIRECTS: u32 = 10;

/// Pause between a failed attempt and the next one.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("fern-junit-client/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Fern test run endpoint.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use fern_junit_client::model::TestRun;
/// use fern_junit_client::publish::Publisher;
///
/// # async fn demo(run: TestRun) -> fern_junit_client::FernResult<()> {
/// let publisher = Publisher::new("https://fern.example.com")?
///     .with_max_attempts(5)
///     .with_retry_delay(Duration::from_secs(1));
/// publisher.publish(&run).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Publisher {
    client: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Publisher {
    /// Creates a publisher for the Fern instance at `fern_url`.
    ///
    /// A trailing `/` on the URL is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FernError::Transport`] if the HTTP client cannot be built.
    pub fn new(fern_url: impl Into<String>) -> FernResult<Self> {
        // Redirects are followed by hand: they resolve against the Fern base
        // URL and are capped per send cycle.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()?;

        let base_url = fern_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Sets the number of send cycles allowed. Redirects within a cycle do
    /// not count. At least one attempt is always made.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the pause after a failed attempt.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the test run endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, TEST_RUN_PATH)
    }

    /// Encodes `run` as the request body.
    pub fn payload(run: &TestRun) -> FernResult<String> {
        Ok(serde_json::to_string_pretty(run)?)
    }

    /// Sends `run`, following redirects and retrying failed responses.
    ///
    /// # Errors
    ///
    /// - [`FernError::Protocol`] if a 307 response has no usable `Location`
    /// - [`FernError::UnexpectedStatus`] if every attempt ended with a status >= 300
    /// - [`FernError::Transport`] if a request could not be completed
    pub async fn publish(&self, run: &TestRun) -> FernResult<()> {
        let payload = Self::payload(run)?;
        let mut last_status = StatusCode::OK;

        for attempt in 1..=self.max_attempts {
            let status = self.send_cycle(&payload, attempt).await?;
            if status.as_u16() < 300 {
                info!(status = status.as_u16(), attempt, "Test run accepted by {}", self.base_url);
                return Ok(());
            }

            warn!(
                status = status.as_u16(),
                attempt,
                max_attempts = self.max_attempts,
                "Failed to send POST request"
            );
            last_status = status;

            if attempt < self.max_attempts && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(FernError::UnexpectedStatus {
            status: last_status.as_u16(),
        })
    }

    /// POSTs `payload` to the endpoint and follows redirects until a
    /// non-redirect status arrives or [`MAX_REDIRECTS`] is reached.
    async fn send_cycle(&self, payload: &str, attempt: u32) -> FernResult<StatusCode> {
        let mut url = self.endpoint();
        let mut redirects = 0;

        loop {
            debug!("Sending POST request to {}...", url);
            let response = self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_string())
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::TEMPORARY_REDIRECT {
                if redirects == MAX_REDIRECTS {
                    warn!(attempt, redirects, "Too many redirects from {}", self.base_url);
                    return Ok(status);
                }
                let location = redirect_location(&response)?;
                debug!(attempt, location = %location, "following redirect");
                url = format!("{}{}", self.base_url, location);
                redirects += 1;
                continue;
            }

            if status.as_u16() >= 300 {
                let body = response.text().await.unwrap_or_default();
                debug!("Status Code: {} with body: {}", status.as_u16(), body);
            }
            return Ok(status);
        }
    }
}

fn redirect_location(response: &reqwest::Response) -> FernResult<String> {
    let value = response
        .headers()
        .get(LOCATION)
        .ok_or_else(|| FernError::Protocol {
            message: "Location header not found in 307 response".to_string(),
        })?;

    value
        .to_str()
        .map(str::to_string)
        .map_err(|e| FernError::Protocol {
            message: format!("Location header of 307 response is not valid text: {}", e),
        })
}

/// Publishes `run` to `fern_url` with the default retry policy.
pub async fn publish(run: &TestRun, fern_url: &str) -> FernResult<()> {
    Publisher::new(fern_url)?.publish(run).await
}
