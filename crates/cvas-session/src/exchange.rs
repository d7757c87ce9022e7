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

//! Credential exchange with the remote authority
//!
//! Every failure collapses into [`ExchangeFailure`] before it reaches the
//! caller. The real cause only goes to the logs and counters.

use crate::config::Config;
use crate::error::{ExchangeFailure, SessionError, SessionResult};
use crate::models::{LoginRequest, RegisterResponse, RegistrationRequest, Session};
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Exchange of credentials for a session
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    /// Trade a service number and password for a token and identity
    async fn login(&self, service_number: &str, password: &str) -> Result<Session, ExchangeFailure>;

    /// Ask the authority to create a pending identity.
    ///
    /// `true` only when the authority confirmed it. Never establishes a session.
    async fn register(&self, request: &RegistrationRequest) -> bool;
}

/// Credential exchange over HTTP
pub struct HttpCredentialExchange {
    client: Client,
    base_url: String,
}

impl HttpCredentialExchange {
    /// Create a new exchange client for the configured authority
    pub fn new(config: &Config) -> SessionResult<Self> {
        config.validate()?;

        let client = Client::builder().timeout(Duration::from_secs(config.request_timeout_secs)).build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn try_login(&self, service_number: &str, password: &str) -> SessionResult<Session> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest { service_number, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Rejected { status: status.as_u16() });
        }

        let session: Session = response.json().await?;
        if session.token.is_empty() {
            return Err(SessionError::UnexpectedResponse {
                message: "empty token".to_string(),
            });
        }
        Ok(session)
    }

    async fn try_register(&self, request: &RegistrationRequest) -> SessionResult<bool> {
        let response = self.client.post(format!("{}/auth/register", self.base_url)).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Rejected { status: status.as_u16() });
        }

        let body: RegisterResponse = response.json().await?;
        Ok(body.success)
    }
}

#[async_trait]
impl CredentialExchange for HttpCredentialExchange {
    async fn login(&self, service_number: &str, password: &str) -> Result<Session, ExchangeFailure> {
        match self.try_login(service_number, password).await {
            Ok(session) => {
                info!(service_number = %service_number, role = %session.user.role, "Login accepted");
                counter!("cvas_login_success", 1);
                Ok(session)
            }
            Err(e) => {
                warn!(service_number = %service_number, error = %e, error_type = e.error_type(), "Login exchange failed");
                counter!("cvas_login_failure", 1);
                Err(ExchangeFailure)
            }
        }
    }

    async fn register(&self, request: &RegistrationRequest) -> bool {
        match self.try_register(request).await {
            Ok(true) => {
                info!(service_number = %request.service_number, role = ?request.role, "Registration accepted");
                true
            }
            Ok(false) => {
                debug!(service_number = %request.service_number, "Authority did not confirm registration");
                counter!("cvas_register_failure", 1);
                false
            }
            Err(e) => {
                warn!(service_number = %request.service_number, error = %e, error_type = e.error_type(), "Registration exchange failed");
                counter!("cvas_register_failure", 1);
                false
            }
        }
    }
}
