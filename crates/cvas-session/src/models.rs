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

//! Data models for identities, sessions and registration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role held by an identity.
///
/// The authority speaks `"WORKER"`, `"CHECKPOINT ADMIN"` and `"SUPER ADMIN"`;
/// underscore spellings are accepted on input. Anything else is kept as
/// [`Role::Unrecognized`] so routing can fail safe on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Worker,
    CheckpointAdmin,
    SuperAdmin,
    Unrecognized(String),
}

impl Role {
    /// Every role the authority can assign
    pub const KNOWN: [Role; 3] = [Role::Worker, Role::CheckpointAdmin, Role::SuperAdmin];

    /// Name used on the wire and in the durable record
    pub fn wire_name(&self) -> &str {
        match self {
            Role::Worker => "WORKER",
            Role::CheckpointAdmin => "CHECKPOINT ADMIN",
            Role::SuperAdmin => "SUPER ADMIN",
            Role::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Role::Unrecognized(_))
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "WORKER" => Role::Worker,
            "CHECKPOINT ADMIN" => Role::CheckpointAdmin,
            "SUPER ADMIN" => Role::SuperAdmin,
            _ => Role::Unrecognized(raw),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Unrecognized(raw) => raw,
            known => known.wire_name().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Roles that may be requested through self-registration.
///
/// There is deliberately no super-admin variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationRole {
    #[serde(rename = "WORKER")]
    Worker,
    #[serde(rename = "CHECKPOINT ADMIN")]
    CheckpointAdmin,
}

impl From<RegistrationRole> for Role {
    fn from(role: RegistrationRole) -> Self {
        match role {
            RegistrationRole::Worker => Role::Worker,
            RegistrationRole::CheckpointAdmin => Role::CheckpointAdmin,
        }
    }
}

/// Error returned when a registration role cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationRoleError {
    #[error("Self-registration as SUPER ADMIN is not permitted")]
    PrivilegeEscalation,
    #[error("Unknown role: {0}")]
    Unknown(String),
}

impl FromStr for RegistrationRole {
    type Err = RegistrationRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Role::from(s.replace('-', "_")) {
            Role::Worker => Ok(RegistrationRole::Worker),
            Role::CheckpointAdmin => Ok(RegistrationRole::CheckpointAdmin),
            Role::SuperAdmin => Err(RegistrationRoleError::PrivilegeEscalation),
            Role::Unrecognized(raw) => Err(RegistrationRoleError::Unknown(raw)),
        }
    }
}

/// The authenticated user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,

    #[serde(default)]
    pub rank: String,

    pub service_number: String,

    pub role: Role,

    /// Assigned checkpoint, absent while awaiting assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl User {
    /// Checkpoint the user is assigned to; blank values count as unassigned
    pub fn assigned_checkpoint(&self) -> Option<&str> {
        self.checkpoint.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Opaque bearer token issued by the authority
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// A token paired with the identity it was issued for.
///
/// This is also the success shape of the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub user: User,
}

/// Self-registration request. Never persisted.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub service_number: String,
    pub rank: String,
    pub name: String,
    pub password: String,
    pub role: RegistrationRole,
}

impl fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("service_number", &self.service_number)
            .field("rank", &self.rank)
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Login request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest<'a> {
    pub service_number: &'a str,
    pub password: &'a str,
}

/// Registration response body
#[derive(Debug, Deserialize)]
pub(crate) struct RegisterResponse {
    #[serde(default)]
    pub success: bool,
}
