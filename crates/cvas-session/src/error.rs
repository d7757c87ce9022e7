// CVAS Session
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Error handling for the session layer
//!
//! Everything in here is internal detail. Callers of the identity context
//! only ever see booleans, redirects, or the generic [`ExchangeFailure`].

use thiserror::Error;

/// Message shown to a user whenever a credential exchange fails, whatever
/// the cause.
pub const GENERIC_EXCHANGE_MESSAGE: &str = "Invalid service number or password";

/// Session layer error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Cookie '{name}' requires a secure context")]
    InsecureContext { name: String },

    #[error("Authority rejected the exchange with status {status}")]
    Rejected { status: u16 },

    #[error("Authority response was not understood: {message}")]
    UnexpectedResponse { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Identity was read outside of an identity provider scope")]
    OutsideProvider,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl SessionError {
    /// Get the error type identifier, used as a structured logging field
    pub fn error_type(&self) -> &'static str {
        match self {
            SessionError::Storage { .. } => "storage",
            SessionError::InsecureContext { .. } => "insecure_context",
            SessionError::Rejected { .. } => "rejected",
            SessionError::UnexpectedResponse { .. } => "unexpected_response",
            SessionError::Config { .. } => "config",
            SessionError::OutsideProvider => "outside_provider",
            SessionError::Http(e) if e.is_timeout() => "timeout",
            SessionError::Http(e) if e.is_connect() => "connect",
            SessionError::Http(_) => "http",
            SessionError::SerdeJson(_) => "json",
            SessionError::Io(_) => "io",
            SessionError::Url(_) => "url",
        }
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        SessionError::Storage { message: message.into() }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// The only failure a credential exchange reports to its caller.
///
/// A wrong password and an unreachable server look the same here.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("{}", GENERIC_EXCHANGE_MESSAGE)]
pub struct ExchangeFailure;
