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

//! Startup restoration of a persisted session

use crate::context::IdentityState;
use crate::store::SessionStore;
use metrics::counter;
use tracing::{debug, info};

/// Derive the initial identity from whatever the store holds.
///
/// The token is not checked with the authority. Anything short of a complete,
/// readable session leaves the store empty and the identity anonymous.
pub(crate) fn restore_session(store: &SessionStore) -> IdentityState {
    match store.load() {
        Some(session) => {
            info!(service_number = %session.user.service_number, role = %session.user.role, "Restored stored session");
            counter!("cvas_session_restored", 1);
            IdentityState::authenticated(session.user)
        }
        None => {
            debug!("No stored session to restore");
            store.clear();
            IdentityState::anonymous()
        }
    }
}
