use axum::{Extension, extract::State, http::HeaderMap, response::Html};
use serde_json::Value;

use super::{loaded, page};
use crate::{
    AppState,
    api::Resource,
    config::PropertyFields,
    error::PortalError,
    render::{self, Flash, escape},
    session::Session,
    views::View,
};

/// dashboard
///
/// [Manager] Managed properties, their leases and open maintenance requests. The three
/// lists load concurrently; each failure is reported without hiding the others.
pub async fn dashboard(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, PortalError> {
    let token = session.token.as_str();
    let (properties, leases, maintenance) = tokio::join!(
        state.api.list(token, Resource::Properties),
        state.api.list(token, Resource::Leases),
        state.api.list(token, Resource::Maintenance),
    );

    let mut flash = Flash::default();
    let fallback = "Failed to load dashboard data.";
    let properties = loaded(properties, fallback, &mut flash)?;
    let leases = loaded(leases, fallback, &mut flash)?;
    let maintenance = loaded(maintenance, fallback, &mut flash)?;

    let fields = state.config.property_fields;
    let body = format!(
        r#"<div class="dashboard-grid">{}{}{}</div>"#,
        render::card("Managed Properties", &property_list(&properties, fields)),
        render::card("Leases Overview", &lease_list(&leases, fields)),
        render::card("Maintenance Requests", &maintenance_list(&maintenance)),
    );
    Ok(page(View::ManagerHome, &session, &headers, flash, &body))
}

fn list(rows: &[Value], empty: &str, item: impl Fn(&Value) -> String) -> String {
    if rows.is_empty() {
        return render::paragraph(empty);
    }
    let items: String = rows.iter().map(|row| format!("<li>{}</li>", item(row))).collect();
    format!("<ul>{items}</ul>")
}

fn property_list(properties: &Value, fields: PropertyFields) -> String {
    let (name_key, location_key) = fields.keys();
    list(render::records(properties), "No properties assigned yet.", |p| {
        format!(
            "<strong>{}</strong> ({})",
            escape(&render::text_at(p, name_key)),
            escape(&render::text_at(p, location_key))
        )
    })
}

fn lease_list(leases: &Value, fields: PropertyFields) -> String {
    let (name_key, _) = fields.keys();
    let property_path = format!("property.{name_key}");
    list(render::records(leases), "No active leases yet.", |l| {
        let property = render::value_at(l, &property_path)
            .map(|v| render::display(Some(v)))
            .unwrap_or_else(|| "Unnamed Property".to_string());
        let tenant = render::value_at(l, "tenant.user")
            .map(|v| render::display(Some(v)))
            .unwrap_or_else(|| "Unknown Tenant".to_string());
        format!("{}: {}", escape(&property), escape(&tenant))
    })
}

fn maintenance_list(requests: &Value) -> String {
    list(render::records(requests), "No maintenance requests found.", |m| {
        format!(
            "{} <strong>{}</strong>",
            escape(&render::text_at(m, "issue")),
            escape(&render::text_at(m, "status"))
        )
    })
}
