//! Transport seam between the retry logic and the wire.
//!
//! [`HttpTransport`] posts to a chat-completions endpoint with reqwest.
//! [`ScriptedTransport`] replays canned replies in-process, for tests and
//! offline runs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lifesim_core::config::OracleConfig;
use parking_lot::Mutex;
use reqwest::Client;
use tracing::debug;

use crate::error::OracleError;
use crate::types::ChatRequest;

/// Status and raw body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl TransportReply {
    /// A 200 reply whose body carries `content` as the first completion.
    #[must_use]
    pub fn completion(content: &str) -> Self {
        Self {
            status: 200,
            body: serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": content } }]
            })
            .to_string(),
        }
    }

    /// A reply with the given status and body.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one chat request and returns whatever came back.
///
/// Implementations report connection-level failures as
/// [`OracleError::Transport`] and never interpret status codes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single exchange.
    async fn send(&self, request: &ChatRequest) -> Result<TransportReply, OracleError>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Bearer-authenticated HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    api_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Build from configuration.
    ///
    /// # Errors
    /// [`OracleError::Config`] if the URL is empty or the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        if config.api_url.trim().is_empty() {
            return Err(OracleError::Config("oracle.api_url is empty".into()));
        }
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| OracleError::Config(e.to_string()))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<TransportReply, OracleError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, bytes = body.len(), "Oracle HTTP exchange");
        Ok(TransportReply { status, body })
    }
}

// ---------------------------------------------------------------------------
// Scripted
// ---------------------------------------------------------------------------

/// Computes a reply from the request once the queue is drained.
pub type Responder = Arc<dyn Fn(&ChatRequest) -> TransportReply + Send + Sync>;

/// Transport that replays queued replies in order and records every request.
///
/// When the queue is empty it asks the responder, or fails with a
/// transport error if none was set.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<TransportReply, String>>>,
    responder: Mutex<Option<Responder>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("pending", &self.pending())
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl ScriptedTransport {
    /// Empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn push_reply(&self, reply: TransportReply) -> &Self {
        self.replies.lock().push_back(Ok(reply));
        self
    }

    /// Queue a 200 completion carrying `content`.
    pub fn push_completion(&self, content: &str) -> &Self {
        self.push_reply(TransportReply::completion(content))
    }

    /// Queue a connection-level failure.
    pub fn push_transport_error(&self, message: &str) -> &Self {
        self.replies.lock().push_back(Err(message.to_string()));
        self
    }

    /// Reply used for every request once the queue is drained.
    pub fn set_fallback(&self, reply: TransportReply) {
        self.set_responder(move |_| reply.clone());
    }

    /// Compute replies from the request once the queue is drained.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&ChatRequest) -> TransportReply + Send + Sync + 'static,
    {
        *self.responder.lock() = Some(Arc::new(responder));
    }

    /// Requests seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests seen so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Replies still queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ChatRequest) -> Result<TransportReply, OracleError> {
        self.requests.lock().push(request.clone());
        let next = self.replies.lock().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(OracleError::Transport(message)),
            None => {
                let responder = self.responder.lock().clone();
                responder
                    .map(|respond| respond(request))
                    .ok_or_else(|| OracleError::Transport("script exhausted".into()))
            }
        }
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &ChatRequest) -> Result<TransportReply, OracleError> {
        (**self).send(request).await
    }
}
