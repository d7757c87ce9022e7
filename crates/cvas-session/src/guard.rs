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

//! Access guard for protected views

use crate::context::IdentityState;
use crate::models::Role;
use tracing::debug;

/// Roles allowed to see a protected view.
///
/// No list, or an empty one, means any authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConstraint {
    allowed: Option<Vec<Role>>,
}

impl AccessConstraint {
    pub fn any_authenticated() -> Self {
        Self { allowed: None }
    }

    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: Some(roles.into_iter().collect()),
        }
    }

    pub fn allowed_roles(&self) -> Option<&[Role]> {
        self.allowed.as_deref()
    }

    /// Whether an authenticated identity holding `role` may pass
    pub fn permits(&self, role: Option<&Role>) -> bool {
        match (self.allowed_roles(), role) {
            (None, _) => true,
            (Some([]), _) => true,
            (Some(_), None) => false,
            (Some(allowed), Some(role)) => allowed.contains(role),
        }
    }
}

/// Outcome of guarding a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    RedirectToLogin,
    /// Authenticated but not allowed here
    RedirectToLanding,
}

/// Decide what happens to a visit. Pure; call again whenever identity changes.
pub fn decide(is_authenticated: bool, role: Option<&Role>, constraint: &AccessConstraint) -> GuardDecision {
    if !is_authenticated {
        return GuardDecision::RedirectToLogin;
    }
    if constraint.permits(role) {
        GuardDecision::Render
    } else {
        debug!(role = ?role, allowed = ?constraint.allowed_roles(), "Role not permitted for view");
        GuardDecision::RedirectToLanding
    }
}

pub fn evaluate(state: &IdentityState, constraint: &AccessConstraint) -> GuardDecision {
    decide(state.is_authenticated(), state.role(), constraint)
}
