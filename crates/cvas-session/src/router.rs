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

//! Route table and role-based view selection

use crate::context::{IdentityState, ViewScope};
use crate::guard::{AccessConstraint, GuardDecision, evaluate};
use crate::models::{Role, User};
use std::fmt;
use tokio::sync::watch;
use tracing::{debug, error};

/// Hops allowed before navigation gives up on a redirect chain
const MAX_REDIRECTS: usize = 4;

/// Every route the application knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    VehicleEntry,
    ManageWorkers,
    VehicleLogs,
    ManageCheckpoints,
    AllVehicles,
    Profile,
    Root,
    NotFound,
}

impl Route {
    pub const ALL: [Route; 11] = [
        Route::Login,
        Route::Register,
        Route::Dashboard,
        Route::VehicleEntry,
        Route::ManageWorkers,
        Route::VehicleLogs,
        Route::ManageCheckpoints,
        Route::AllVehicles,
        Route::Profile,
        Route::Root,
        Route::NotFound,
    ];

    /// Match a path, ignoring case and any query, fragment or trailing slash
    pub fn resolve(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default().to_ascii_lowercase();
        let trimmed = path.trim_end_matches('/');

        match trimmed {
            "" => Route::Root,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/dashboard" => Route::Dashboard,
            "/vehicle-entry" => Route::VehicleEntry,
            "/manage-workers" => Route::ManageWorkers,
            "/vehicle-logs" => Route::VehicleLogs,
            "/manage-checkpoints" => Route::ManageCheckpoints,
            "/all-vehicles" => Route::AllVehicles,
            "/profile" => Route::Profile,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::VehicleEntry => "/vehicle-entry",
            Route::ManageWorkers => "/manage-workers",
            Route::VehicleLogs => "/vehicle-logs",
            Route::ManageCheckpoints => "/manage-checkpoints",
            Route::AllVehicles => "/all-vehicles",
            Route::Profile => "/profile",
            Route::Root => "/",
            Route::NotFound => "*",
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register | Route::Root | Route::NotFound)
    }

    /// Guard applied before the route renders, `None` for public routes
    pub fn constraint(&self) -> Option<AccessConstraint> {
        match self {
            Route::Dashboard | Route::Profile => Some(AccessConstraint::any_authenticated()),
            Route::VehicleEntry => Some(AccessConstraint::roles([Role::Worker])),
            Route::ManageWorkers | Route::VehicleLogs => Some(AccessConstraint::roles([Role::CheckpointAdmin])),
            Route::ManageCheckpoints | Route::AllVehicles => Some(AccessConstraint::roles([Role::SuperAdmin])),
            Route::Login | Route::Register | Route::Root | Route::NotFound => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Register => "Register",
            Route::Dashboard => "Dashboard",
            Route::VehicleEntry => "Vehicle Entry",
            Route::ManageWorkers => "Manage Workers",
            Route::VehicleLogs => "Vehicle Logs",
            Route::ManageCheckpoints => "Manage Checkpoints",
            Route::AllVehicles => "All Vehicles",
            Route::Profile => "Profile",
            Route::Root => "Home",
            Route::NotFound => "Not Found",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Dashboard shown for a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardVariant {
    Worker { checkpoint: String },
    /// A worker that has not been posted to a checkpoint yet
    NoCheckpointAssigned,
    CheckpointAdmin { checkpoint: Option<String> },
    SuperAdmin,
}

impl DashboardVariant {
    pub fn title(&self) -> &'static str {
        match self {
            DashboardVariant::Worker { .. } => "Worker Dashboard",
            DashboardVariant::NoCheckpointAssigned => "No Checkpoint Assigned",
            DashboardVariant::CheckpointAdmin { .. } => "Checkpoint Admin Dashboard",
            DashboardVariant::SuperAdmin => "Super Admin Dashboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardOutcome {
    Render(DashboardVariant),
    RedirectToLogin,
}

/// Pick the dashboard for an identity. Unknown roles and no identity go to login.
pub fn select_dashboard(user: Option<&User>) -> DashboardOutcome {
    let Some(user) = user else {
        return DashboardOutcome::RedirectToLogin;
    };

    match &user.role {
        Role::Worker => match user.assigned_checkpoint() {
            Some(checkpoint) => DashboardOutcome::Render(DashboardVariant::Worker {
                checkpoint: checkpoint.to_string(),
            }),
            None => DashboardOutcome::Render(DashboardVariant::NoCheckpointAssigned),
        },
        Role::CheckpointAdmin => DashboardOutcome::Render(DashboardVariant::CheckpointAdmin {
            checkpoint: user.assigned_checkpoint().map(str::to_string),
        }),
        Role::SuperAdmin => DashboardOutcome::Render(DashboardVariant::SuperAdmin),
        Role::Unrecognized(raw) => {
            debug!(role = %raw, service_number = %user.service_number, "No dashboard for unrecognized role");
            DashboardOutcome::RedirectToLogin
        }
    }
}

/// Entry in the side navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub route: Route,
}

impl NavItem {
    const fn to(route: Route, label: &'static str) -> Self {
        Self { label, route }
    }
}

pub fn navigation_items(user: Option<&User>) -> Vec<NavItem> {
    let Some(user) = user else {
        return Vec::new();
    };

    match user.role {
        Role::Worker => vec![
            NavItem::to(Route::Dashboard, "Dashboard"),
            NavItem::to(Route::VehicleEntry, "Vehicle Entry"),
            NavItem::to(Route::Profile, "Profile"),
        ],
        Role::CheckpointAdmin => vec![
            NavItem::to(Route::Dashboard, "Dashboard"),
            NavItem::to(Route::ManageWorkers, "Manage Workers"),
            NavItem::to(Route::VehicleLogs, "Vehicle Logs"),
            NavItem::to(Route::Profile, "Profile"),
        ],
        Role::SuperAdmin => vec![
            NavItem::to(Route::Dashboard, "Dashboard"),
            NavItem::to(Route::ManageCheckpoints, "Manage Checkpoints"),
            NavItem::to(Route::AllVehicles, "All Vehicles"),
            NavItem::to(Route::Profile, "Profile"),
        ],
        Role::Unrecognized(_) => Vec::new(),
    }
}

/// What the profile view shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCard {
    pub service_number: String,
    pub full_name: String,
    pub role_label: String,
    pub checkpoint: Option<String>,
}

impl ProfileCard {
    pub fn for_user(user: &User) -> Self {
        Self {
            service_number: user.service_number.clone(),
            full_name: user.name.clone(),
            role_label: user.role.wire_name().replace('_', " ").to_uppercase(),
            checkpoint: user.assigned_checkpoint().map(str::to_string),
        }
    }
}

impl fmt::Display for ProfileCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Service Number: {}", self.service_number)?;
        writeln!(f, "Full Name:      {}", self.full_name)?;
        write!(f, "Role:           {}", self.role_label)?;
        if let Some(checkpoint) = &self.checkpoint {
            write!(f, "\nCheckpoint:     {}", checkpoint)?;
        }
        Ok(())
    }
}

/// The view a navigation settles on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login,
    Register,
    Dashboard(DashboardVariant),
    VehicleEntry,
    ManageWorkers,
    VehicleLogs,
    ManageCheckpoints,
    AllVehicles,
    Profile(ProfileCard),
    NotFound,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Login => Route::Login.title(),
            View::Register => Route::Register.title(),
            View::Dashboard(variant) => variant.title(),
            View::VehicleEntry => Route::VehicleEntry.title(),
            View::ManageWorkers => Route::ManageWorkers.title(),
            View::VehicleLogs => Route::VehicleLogs.title(),
            View::ManageCheckpoints => Route::ManageCheckpoints.title(),
            View::AllVehicles => Route::AllVehicles.title(),
            View::Profile(_) => Route::Profile.title(),
            View::NotFound => Route::NotFound.title(),
        }
    }
}

/// Result of resolving one path against one identity snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: String,
    /// Routes passed through before settling, in order
    pub redirects: Vec<Route>,
    pub route: Route,
    pub view: View,
    pub menu: Vec<NavItem>,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }
}

enum Step {
    Show(View),
    Redirect(Route),
}

fn step(route: Route, state: &IdentityState) -> Step {
    if let Some(constraint) = route.constraint() {
        match evaluate(state, &constraint) {
            GuardDecision::Render => {}
            GuardDecision::RedirectToLogin => return Step::Redirect(Route::Login),
            GuardDecision::RedirectToLanding => return Step::Redirect(Route::Dashboard),
        }
    }

    match route {
        Route::Root => Step::Redirect(Route::Dashboard),
        Route::Login => Step::Show(View::Login),
        Route::Register => Step::Show(View::Register),
        Route::NotFound => Step::Show(View::NotFound),
        Route::Dashboard => match select_dashboard(state.user()) {
            DashboardOutcome::Render(variant) => Step::Show(View::Dashboard(variant)),
            DashboardOutcome::RedirectToLogin => Step::Redirect(Route::Login),
        },
        Route::Profile => match state.user() {
            Some(user) => Step::Show(View::Profile(ProfileCard::for_user(user))),
            None => Step::Redirect(Route::Login),
        },
        Route::VehicleEntry => Step::Show(View::VehicleEntry),
        Route::ManageWorkers => Step::Show(View::ManageWorkers),
        Route::VehicleLogs => Step::Show(View::VehicleLogs),
        Route::ManageCheckpoints => Step::Show(View::ManageCheckpoints),
        Route::AllVehicles => Step::Show(View::AllVehicles),
    }
}

/// Resolve `path` for the given identity, following redirects
pub fn navigate(state: &IdentityState, path: &str) -> Navigation {
    let mut route = Route::resolve(path);
    let mut redirects = Vec::new();

    let view = loop {
        match step(route, state) {
            Step::Show(view) => break view,
            Step::Redirect(next) if redirects.len() < MAX_REDIRECTS => {
                redirects.push(route);
                route = next;
            }
            Step::Redirect(next) => {
                error!(path = %path, route = %route, next = %next, "Redirect chain did not settle");
                route = Route::Login;
                break View::Login;
            }
        }
    };

    debug!(path = %path, route = %route, redirects = redirects.len(), "Navigation resolved");

    Navigation {
        requested: path.to_string(),
        redirects,
        route,
        view,
        menu: navigation_items(state.user()),
    }
}

/// Navigates against the identity provided in a view scope
#[derive(Clone)]
pub struct Navigator {
    scope: ViewScope,
}

impl Navigator {
    pub fn new(scope: ViewScope) -> Self {
        Self { scope }
    }

    /// # Panics
    ///
    /// When the scope has no identity provider.
    pub fn navigate(&self, path: &str) -> Navigation {
        navigate(&self.scope.use_identity().snapshot(), path)
    }

    /// Keep `path` evaluated against every later identity change
    pub fn watch(&self, path: impl Into<String>) -> NavigationWatch {
        NavigationWatch {
            path: path.into(),
            updates: self.scope.use_identity().subscribe(),
        }
    }
}

/// A path re-evaluated whenever the identity changes
pub struct NavigationWatch {
    path: String,
    updates: watch::Receiver<IdentityState>,
}

impl NavigationWatch {
    pub fn current(&mut self) -> Navigation {
        let state = self.updates.borrow_and_update().clone();
        navigate(&state, &self.path)
    }

    /// Wait for the next identity change. `None` once the context is gone.
    pub async fn changed(&mut self) -> Option<Navigation> {
        self.updates.changed().await.ok()?;
        Some(self.current())
    }
}
