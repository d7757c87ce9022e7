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

//! CVAS session and access-control layer
//!
//! This crate keeps track of who is logged in to the Civil Vehicle
//! Acquisition System, persists that session between runs, and decides which
//! views an identity may reach based on its role.

pub mod config;
pub mod context;
pub mod error;
pub mod exchange;
pub mod guard;
pub mod models;
mod restore;
pub mod router;
pub mod store;

pub use config::Config;
pub use context::{IdentityContext, IdentityState, ViewScope};
pub use error::{ExchangeFailure, GENERIC_EXCHANGE_MESSAGE, SessionError, SessionResult};
pub use exchange::{CredentialExchange, HttpCredentialExchange};
pub use guard::{AccessConstraint, GuardDecision};
pub use models::{RegistrationRequest, RegistrationRole, Role, Session, SessionToken, User};
pub use router::{Navigation, Navigator, Route, View};
pub use store::SessionStore;
