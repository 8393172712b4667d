//! SDK for interacting with bingoo.
//!
//! [`Client`] wraps the HTTP API with typed requests and responses;
//! [`BalanceCache`] keeps a local, optimistic mirror of a user's point
//! balance that is periodically reconciled against the server.

pub mod cache;
mod client;

pub use cache::BalanceCache;
pub use client::{Client, RetryPolicy, VariantSummary};

use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    /// A structured rejection from the API (insufficient balance, invalid
    /// flip, eligibility, ...).
    #[error("api error {code}: {message}")]
    Api {
        status: reqwest::StatusCode,
        code: u8,
        message: String,
    },
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected response")]
    UnexpectedResponse,
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
