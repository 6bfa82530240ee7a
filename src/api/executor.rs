//! Request executor
//!
//! Runs one logical API call as up to [`MAX_ATTEMPTS`](super::retry::MAX_ATTEMPTS)
//! HTTP attempts. Each attempt is classified, and the classification decides
//! whether to stop or to wait and try again. The whole sequence, waits
//! included, is bounded by the request timeout.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode, Url};
use tracing::{debug, info};

use super::error::{classify_status, classify_transport, ApiError};
use super::retry::{JitterSource, RandomJitter, RetryPolicy, Sleeper, TokioSleeper};

/// Everything needed to issue one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/api/page`
    pub path: String,
    /// Query pairs in send order; names may repeat
    pub query: Vec<(String, String)>,
    /// Upper bound for the whole attempt sequence
    pub timeout: Duration,
}

impl RequestDescriptor {
    pub fn get(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            timeout,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// What happened on one attempt and what to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Terminal success
    Succeeded(Vec<u8>),
    /// Retryable failure with budget left; wait `delay` then try again
    Retrying { error: ApiError, delay: Duration },
    /// Terminal failure
    Failed(ApiError),
}

/// Issues API calls with retries
#[derive(Clone)]
pub struct RequestExecutor {
    client: Client,
    base: Url,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    jitter: Arc<dyn JitterSource>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base", &self.base.as_str())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Creates an executor for `base_url` with real sleeping and random jitter
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidArgs(format!("invalid API URL '{}': {}", base_url, e)))?;
        let client = Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|e| ApiError::Generic {
                status: None,
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(RandomJitter),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs the call, returning the raw body of the successful response
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Vec<u8>, ApiError> {
        match tokio::time::timeout(request.timeout, self.run(request)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Network(format!(
                "request to {} timed out after {}s",
                request.path,
                request.timeout.as_secs_f64()
            ))),
        }
    }

    async fn run(&self, request: &RequestDescriptor) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint_url(&request.path);

        let mut attempt = 0;
        loop {
            debug!(path = %request.path, attempt, "sending request");
            let result = self.send_once(&url, request).await;

            match self.next_step(attempt, result) {
                AttemptOutcome::Succeeded(body) => return Ok(body),
                AttemptOutcome::Failed(err) => {
                    debug!(path = %request.path, attempt, error = %err, "request failed");
                    return Err(err);
                }
                AttemptOutcome::Retrying { error, delay } => {
                    info!(
                        path = %request.path,
                        attempt,
                        ?delay,
                        error = %error,
                        "retrying request"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One HTTP round trip, classified
    async fn send_once(&self, url: &Url, request: &RequestDescriptor) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .request(request.method.clone(), url.clone())
            .query(&request.query)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| classify_transport(&e));

        classify_response(status, &headers, body, &request.path)
    }

    /// Appends `path` to the base URL, keeping any path prefix the base has
    pub fn endpoint_url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        if path.starts_with('/') {
            url.set_path(&format!("{}{}", prefix, path));
        } else {
            url.set_path(&format!("{}/{}", prefix, path));
        }
        url
    }

    /// Decides what follows attempt number `attempt` (0-based)
    pub fn next_step(&self, attempt: u32, result: Result<Vec<u8>, ApiError>) -> AttemptOutcome {
        let error = match result {
            Ok(body) => return AttemptOutcome::Succeeded(body),
            Err(error) => error,
        };

        if !error.is_retryable() || !self.policy.has_attempts_after(attempt) {
            return AttemptOutcome::Failed(error);
        }

        let delay = match &error {
            ApiError::RateLimited { retry_after_secs } => {
                self.policy
                    .rate_limit_delay(attempt, *retry_after_secs, self.jitter.as_ref())
            }
            _ => self.policy.backoff(attempt, self.jitter.as_ref()),
        };

        AttemptOutcome::Retrying { error, delay }
    }
}

/// Classifies a response from its status first, so an error status wins over
/// a failed body read
fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: Result<Vec<u8>, ApiError>,
    resource: &str,
) -> Result<Vec<u8>, ApiError> {
    match body {
        Ok(body) => match classify_status(status, headers, &body, resource) {
            Some(err) => Err(err),
            None => Ok(body),
        },
        Err(read_err) => Err(classify_status(status, headers, &[], resource).unwrap_or(read_err)),
    }
}

fn user_agent() -> &'static str {
    concat!("grokipedia-cli/", env!("CARGO_PKG_VERSION"))
}
