use serde::Serialize;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{role::Role, views::View};

/// NavLink
///
/// One sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct NavLink {
    pub path: String,
    pub label: String,
}

// Sidebar order. `None` stands for the role's own home view.
const SIDEBAR: [(Option<View>, &str); 8] = [
    (None, "Dashboard"),
    (Some(View::Properties), "Properties"),
    (Some(View::Units), "Units"),
    (Some(View::Invites), "Invites"),
    (Some(View::InviteManager), "Invite Manager"),
    (Some(View::Leases), "Leases"),
    (Some(View::Maintenance), "Maintenance"),
    (Some(View::Profile), "Profile"),
];

/// visible_links
///
/// The ordered sidebar for `role`. Each entry is kept only if the target view's guard
/// admits the role, so the sidebar can never offer a link the gate would refuse.
/// No role means no links.
pub fn visible_links(role: Option<Role>) -> Vec<NavLink> {
    let Some(role) = role else {
        return Vec::new();
    };

    SIDEBAR
        .iter()
        .filter_map(|&(view, label)| {
            let view = view.unwrap_or(role.home());
            let allowed = view.guard().is_some_and(|guard| guard.allows(role));
            allowed.then(|| NavLink {
                path: view.path().to_string(),
                label: label.to_string(),
            })
        })
        .collect()
}
