//! Error types for the taskboard API client.
//!
//! # Design
//! Session expiry is not an error: it surfaces as
//! `RequestOutcome::AuthRequired` and, for the domain operations, as an
//! empty list or `None`. What remains here is what a caller can act on.
//! `NotFound` gets a dedicated variant because callers frequently need to
//! tell "the group/task does not exist" apart from other failures. Every
//! other non-2xx response lands in `Http` with the raw body the backend sent.

use thiserror::Error;

/// Errors returned by `TaskboardClient` and its transports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend returned 404.
    #[error("resource not found")]
    NotFound,

    /// The backend returned a non-2xx status other than 401 and 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The session token could not be written to durable storage.
    #[error("session storage failed: {0}")]
    Storage(String),

    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("transport failed: {0}")]
    Transport(String),
}
