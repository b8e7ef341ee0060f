//! # lifesim-llm: the oracle call layer
//!
//! Every request to the external text-generation service goes through
//! [`OracleClient`], which guarantees:
//!
//! - at most `max_attempts` round trips (3 by default), with `base^attempt`
//!   second backoff between them;
//! - retries on transport failure, HTTP 429, HTTP 5xx and, for structured
//!   calls, output that is not a JSON array or object;
//! - a corrective nudge appended to the conversation on every retry;
//! - immediate return on any other status;
//! - code-fence markup stripped from every response.
//!
//! ```text
//! engine ──► OracleClient ──► Transport ──► HTTP / scripted
//!              retry, backoff, validation
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod prompt;
pub mod transport;
pub mod types;

pub use client::OracleClient;
pub use error::OracleError;
pub use transport::{HttpTransport, ScriptedTransport, Transport, TransportReply};
pub use types::{ChatMessage, ChatRequest, OracleRole, ResponseShape};
