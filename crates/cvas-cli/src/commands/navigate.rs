use super::CommandContext;
use anyhow::Result;
use cvas_session::router::{DashboardVariant, NavItem};
use cvas_session::{Navigation, View};
use std::fmt::Write;

pub fn open(ctx: &CommandContext, path: &str) -> Result<()> {
    let navigation = ctx.navigator().navigate(path);
    print!("{}", render_navigation(&navigation));
    Ok(())
}

pub fn show_menu(ctx: &CommandContext) -> Result<()> {
    let navigation = ctx.navigator().navigate("/dashboard");
    if navigation.menu.is_empty() {
        println!("Not logged in. Run `cvas login` first.");
        return Ok(());
    }
    print!("{}", render_menu(&navigation.menu));
    Ok(())
}

pub fn render_menu(items: &[NavItem]) -> String {
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "  {:<20} {}", item.label, item.route.path());
    }
    out
}

/// Text rendering of where a navigation ended up
pub fn render_navigation(navigation: &Navigation) -> String {
    let mut out = String::new();

    if navigation.was_redirected() {
        let mut hops: Vec<&str> = navigation.redirects.iter().map(|route| route.path()).collect();
        hops.push(navigation.route.path());
        let _ = writeln!(out, "Redirected: {}", hops.join(" -> "));
    }
    let _ = writeln!(out, "== {} ==", navigation.view.title());

    match &navigation.view {
        View::Login => {
            let _ = writeln!(out, "Sign in with `cvas login --service-number <SN> --password <PASSWORD>`.");
        }
        View::Register => {
            let _ = writeln!(out, "Request an account with `cvas register`.");
        }
        View::Dashboard(DashboardVariant::Worker { checkpoint }) => {
            let _ = writeln!(out, "Checkpoint: {}", checkpoint);
        }
        View::Dashboard(DashboardVariant::NoCheckpointAssigned) => {
            let _ = writeln!(out, "No checkpoint assigned yet. Please contact the higher authority.");
        }
        View::Dashboard(DashboardVariant::CheckpointAdmin { checkpoint }) => {
            let _ = writeln!(out, "Managing {}", checkpoint.as_deref().unwrap_or("Checkpoint"));
        }
        View::Profile(card) => {
            let _ = writeln!(out, "{}", card);
        }
        View::NotFound => {
            let _ = writeln!(out, "No page at {}", navigation.requested);
        }
        View::Dashboard(DashboardVariant::SuperAdmin)
        | View::VehicleEntry
        | View::ManageWorkers
        | View::VehicleLogs
        | View::ManageCheckpoints
        | View::AllVehicles => {}
    }

    if !navigation.menu.is_empty() {
        let _ = writeln!(out);
        out.push_str(&render_menu(&navigation.menu));
    }
    out
}
