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

//! Identity context
//!
//! The single owner and writer of "who is logged in". Views hold it through a
//! [`ViewScope`] and can only change it through `login`, `register` and
//! `logout`. Every change is published on a watch channel.

use crate::error::{SessionError, SessionResult};
use crate::exchange::CredentialExchange;
use crate::models::{RegistrationRequest, Role, User};
use crate::restore::restore_session;
use crate::store::SessionStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Current identity as seen by views.
///
/// Authenticated exactly when a user is present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityState {
    user: Option<User>,
}

impl IdentityState {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn role(&self) -> Option<&Role> {
        self.user.as_ref().map(|user| &user.role)
    }
}

/// Marks a login or registration as in flight until dropped
struct Submission<'a>(&'a AtomicBool);

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Process-wide holder of the current identity
pub struct IdentityContext {
    store: SessionStore,
    exchange: Arc<dyn CredentialExchange>,
    state: watch::Sender<IdentityState>,
    submitting: AtomicBool,
}

impl IdentityContext {
    /// Mount the context, restoring any stored session exactly once
    pub fn mount(store: SessionStore, exchange: Arc<dyn CredentialExchange>) -> Arc<Self> {
        let initial = restore_session(&store);
        let (state, _) = watch::channel(initial);

        Arc::new(Self {
            store,
            exchange,
            state,
            submitting: AtomicBool::new(false),
        })
    }

    /// Current state
    pub fn snapshot(&self) -> IdentityState {
        self.state.borrow().clone()
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<IdentityState> {
        self.state.subscribe()
    }

    /// Whether a login or registration is waiting on the authority
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Log in. On any failure the previous state is left untouched.
    pub async fn login(&self, service_number: &str, password: &str) -> bool {
        if service_number.trim().is_empty() || password.is_empty() {
            debug!("Login called with empty credentials");
            return false;
        }
        let Some(_submission) = self.begin_submission() else {
            debug!(service_number = %service_number, "Login ignored, another submission is in flight");
            return false;
        };

        let session = match self.exchange.login(service_number, password).await {
            Ok(session) => session,
            Err(_) => return false,
        };

        if let Err(e) = self.store.save(&session.token, &session.user) {
            warn!(service_number = %service_number, error = %e, error_type = e.error_type(), "Login succeeded but session could not be saved");
            return false;
        }

        info!(service_number = %session.user.service_number, role = %session.user.role, "Logged in");
        self.state.send_replace(IdentityState::authenticated(session.user));
        true
    }

    /// Register a pending identity. Never changes the session.
    pub async fn register(&self, request: &RegistrationRequest) -> bool {
        let Some(_submission) = self.begin_submission() else {
            debug!(service_number = %request.service_number, "Registration ignored, another submission is in flight");
            return false;
        };
        self.exchange.register(request).await
    }

    /// Log out. Local only, always succeeds, safe to repeat.
    pub fn logout(&self) {
        self.store.clear();

        let changed = self.state.send_if_modified(|state| {
            if state.is_authenticated() {
                *state = IdentityState::anonymous();
                true
            } else {
                false
            }
        });

        if changed {
            info!("Logged out");
        }
    }

    fn begin_submission(&self) -> Option<Submission<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Submission(&self.submitting))
    }
}

/// Provisioning scope handed down the view tree
#[derive(Clone, Default)]
pub struct ViewScope {
    identity: Option<Arc<IdentityContext>>,
}

impl ViewScope {
    /// Scope with no identity provider mounted above it
    pub fn unprovided() -> Self {
        Self::default()
    }

    pub fn provide(identity: Arc<IdentityContext>) -> Self {
        Self { identity: Some(identity) }
    }

    pub fn try_identity(&self) -> SessionResult<&Arc<IdentityContext>> {
        self.identity.as_ref().ok_or(SessionError::OutsideProvider)
    }

    /// The identity context.
    ///
    /// # Panics
    ///
    /// When no provider was mounted. That is a wiring bug, not a runtime case.
    pub fn use_identity(&self) -> &Arc<IdentityContext> {
        match self.try_identity() {
            Ok(identity) => identity,
            Err(e) => panic!("{}: use_identity must be called within an identity provider", e),
        }
    }
}
