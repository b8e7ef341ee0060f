//! Oracle client: bounded retries with exponential backoff, code-fence
//! stripping and JSON-shape validation.
//!
//! Two call forms exist for each contract:
//!
//! - [`OracleClient::call`] / [`OracleClient::call_structured`] never fail.
//!   Errors are rendered into an inline marker string which callers treat as
//!   degraded narrative.
//! - [`OracleClient::try_call`] / [`OracleClient::try_call_structured`]
//!   return the error, for callers that substitute their own fallback.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use lifesim_core::config::OracleConfig;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::OracleError;
use crate::transport::{HttpTransport, Transport, TransportReply};
use crate::types::{ChatMessage, ChatRequest, ChatResponse, OracleRole, ResponseShape};

/// Corrective instruction appended to every attempt after the first.
pub const RETRY_NUDGE: &str =
    "Previous response was invalid. Please strictly follow the JSON format requirements.";

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("code-fence pattern is valid")
});

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, keeping the
/// inner text. Text without a fence is only trimmed.
#[must_use]
pub fn strip_code_fence(content: &str) -> String {
    match CODE_FENCE.captures(content).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => content.trim().to_string(),
    }
}

/// Whether `text` parses as a JSON array or object.
#[must_use]
pub fn is_json_container(text: &str) -> bool {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return false;
    }
    serde_json::from_str::<serde_json::Value>(text)
        .is_ok_and(|v| v.is_array() || v.is_object())
}

/// The resilient call layer in front of the text-generation service.
pub struct OracleClient<T = HttpTransport> {
    transport: T,
    model: String,
    max_attempts: u32,
    backoff_base_secs: u64,
}

impl<T> std::fmt::Debug for OracleClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleClient")
            .field("model", &self.model)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .finish_non_exhaustive()
    }
}

impl OracleClient<HttpTransport> {
    /// HTTP-backed client from configuration.
    ///
    /// # Errors
    /// [`OracleError::Config`] if the transport cannot be built.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        Ok(Self::new(HttpTransport::from_config(config)?, config))
    }
}

impl<T: Transport> OracleClient<T> {
    /// Create a client over any transport.
    #[must_use]
    pub fn new(transport: T, config: &OracleConfig) -> Self {
        Self {
            transport,
            model: config.model.clone(),
            max_attempts: config.max_attempts.max(1),
            backoff_base_secs: config.backoff_base_secs,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Free-text call. Never fails; errors come back as marker text.
    pub async fn call(&self, role: OracleRole, prompt: &str) -> String {
        self.try_call(role, prompt)
            .await
            .unwrap_or_else(|e| e.to_string())
    }

    /// Structured call. On success the text parses as a JSON array or
    /// object; otherwise it is the failure marker.
    pub async fn call_structured(&self, role: OracleRole, prompt: &str) -> String {
        self.try_call_structured(role, prompt)
            .await
            .unwrap_or_else(|e| e.to_string())
    }

    /// Free-text call, propagating failures.
    ///
    /// # Errors
    /// [`OracleError::Rejected`] immediately on a non-retryable status, or
    /// [`OracleError::RetriesExhausted`] once every attempt has failed.
    pub async fn try_call(&self, role: OracleRole, prompt: &str) -> Result<String, OracleError> {
        self.call_with_retry(role, prompt, ResponseShape::Text).await
    }

    /// Structured call, propagating failures.
    ///
    /// # Errors
    /// As [`try_call`](Self::try_call); schema failures count as retryable.
    pub async fn try_call_structured(
        &self,
        role: OracleRole,
        prompt: &str,
    ) -> Result<String, OracleError> {
        self.call_with_retry(role, prompt, ResponseShape::Json).await
    }

    /// Delay before the attempt following `attempt` (1-based): `base^attempt`
    /// seconds, so 2, 4, 8, ... with the default base.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_base_secs.saturating_pow(attempt))
    }

    async fn call_with_retry(
        &self,
        role: OracleRole,
        prompt: &str,
        shape: ResponseShape,
    ) -> Result<String, OracleError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let request = self.build_request(role, prompt, attempt);
            let start = Instant::now();

            match self.attempt(&request, shape).await {
                Ok(text) => {
                    debug!(
                        role = %role,
                        attempt,
                        elapsed_ms = start.elapsed().as_millis(),
                        chars = text.chars().count(),
                        "Oracle call succeeded"
                    );
                    return Ok(text);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        role = %role,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Oracle call failed, retrying"
                    );
                    last_error = e.to_string();
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
                Err(e) => {
                    warn!(role = %role, attempt, error = %e, "Oracle call rejected");
                    return Err(e);
                }
            }
        }

        Err(OracleError::RetriesExhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }

    fn build_request(&self, role: OracleRole, prompt: &str, attempt: u32) -> ChatRequest {
        let mut messages = vec![ChatMessage::system(role.system_prompt()), ChatMessage::user(prompt)];
        if attempt > 1 {
            messages.push(ChatMessage::user(RETRY_NUDGE));
        }
        ChatRequest {
            model: self.model.clone(),
            stream: false,
            messages,
        }
    }

    async fn attempt(&self, request: &ChatRequest, shape: ResponseShape) -> Result<String, OracleError> {
        let TransportReply { status, body } = self.transport.send(request).await?;

        match status {
            200 => {}
            429 => return Err(OracleError::RateLimited),
            s if s >= 500 => return Err(OracleError::Server { status: s, body }),
            s => return Err(OracleError::Rejected { status: s, body }),
        }

        let content = serde_json::from_str::<ChatResponse>(&body)
            .map_err(|e| OracleError::MalformedBody(e.to_string()))?
            .into_content()
            .ok_or_else(|| OracleError::MalformedBody("no completion content".into()))?;

        let cleaned = strip_code_fence(&content);
        if shape == ResponseShape::Json && !is_json_container(&cleaned) {
            return Err(OracleError::SchemaValidation(format!(
                "expected JSON array or object, got {} chars",
                cleaned.chars().count()
            )));
        }
        Ok(cleaned)
    }
}
