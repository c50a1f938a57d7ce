use crate::{
    AppState,
    gate::{self, ViewGate},
    handlers::{landlord, manager, shared, tenant},
    session::SessionStore,
    views::View,
};
use axum::{
    Router, middleware,
    routing::{MethodRouter, get, post},
};

/// Protected Router Module
///
/// One entry per path. The `View` next to each path decides who may reach it: the gate
/// redirects anyone else before the handler runs, and form submissions share the guard
/// of the page they belong to.
pub fn protected_routes(sessions: &SessionStore) -> Router<AppState> {
    let routes: [(&str, View, MethodRouter<AppState>); 16] = [
        // Role home views, plus the legacy dashboard aliases.
        ("/dashboard", View::Dashboard, get(landlord::dashboard)),
        ("/manager", View::ManagerHome, get(manager::dashboard)),
        ("/manager-dashboard", View::ManagerHome, get(manager::dashboard)),
        ("/tenant", View::TenantHome, get(tenant::home)),
        ("/tenant-dashboard", View::TenantHome, get(tenant::home)),
        ("/tenant/pay", View::TenantHome, post(tenant::pay)),
        ("/tenant/maintenance", View::TenantHome, post(tenant::raise_issue)),
        // Landlord management.
        (
            "/properties/new",
            View::Properties,
            get(landlord::properties_page).post(landlord::create_property),
        ),
        (
            "/properties/{id}/manager",
            View::Properties,
            post(landlord::assign_manager),
        ),
        (
            "/units/new",
            View::Units,
            get(landlord::units_page).post(landlord::create_unit),
        ),
        (
            "/managers/invite",
            View::InviteManager,
            get(landlord::manager_invite_page).post(landlord::create_manager_invite),
        ),
        // Shared between landlord and manager.
        (
            "/invites/new",
            View::Invites,
            get(shared::invites_page).post(shared::create_invite),
        ),
        (
            "/leases/new",
            View::Leases,
            get(shared::leases_page).post(shared::create_lease),
        ),
        // Tenant.
        (
            "/maintenance/new",
            View::Maintenance,
            get(tenant::maintenance_page).post(tenant::create_maintenance),
        ),
        // Every role.
        (
            "/profile",
            View::Profile,
            get(shared::profile_page).post(shared::update_profile),
        ),
        ("/profile/password", View::Profile, post(shared::change_password)),
    ];

    routes
        .into_iter()
        .fold(Router::new(), |router, (path, view, route)| {
            router.merge(guarded(path, view, route, sessions))
        })
}

fn guarded(
    path: &str,
    view: View,
    route: MethodRouter<AppState>,
    sessions: &SessionStore,
) -> Router<AppState> {
    // `route_layer` gates matched methods only; an unmatched method is answered with 405
    // before the gate runs.
    let router = Router::new().route(path, route);
    match ViewGate::for_view(view, sessions.clone()) {
        Some(view_gate) => {
            router.route_layer(middleware::from_fn_with_state(view_gate, gate::enforce))
        }
        None => router,
    }
}
