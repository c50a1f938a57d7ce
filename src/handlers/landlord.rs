use axum::{
    Extension, Form,
    extract::{Path, State},
    http::HeaderMap,
    response::Html,
};
use serde_json::{Value, json};

use super::{loaded, page};
use crate::{
    AppState,
    api::Resource,
    config::PropertyFields,
    error::{PortalError, Surface},
    models::{AssignManagerForm, ManagerInviteForm, PropertyForm, UNIT_TYPES, UnitForm},
    render::{self, Field, Flash, escape},
    session::Session,
    views::View,
};

const PAYMENT_SECTIONS: [&str; 4] = ["PAID", "PARTIAL", "UNPAID", "OVERDUE"];

/// dashboard
///
/// [Landlord] Rent collection summary for the current period: totals, one table per
/// payment status, then the payment log.
pub async fn dashboard(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, PortalError> {
    let (summary, payments) = tokio::join!(
        state.api.dashboard_summary(&session.token),
        state.api.list(&session.token, Resource::Payments),
    );
    let mut flash = Flash::default();
    let summary = loaded(summary, "Failed to load dashboard", &mut flash)?;
    let payments = loaded(payments, "Failed to load payments", &mut flash)?;

    let mut body = if summary.is_null() {
        String::new()
    } else {
        summary_html(&summary)
    };
    body.push_str(&render::card(
        "Payments",
        &render::table(
            &payments,
            &[("Date", "date"), ("Amount", "amount"), ("Status", "status")],
            "No payments recorded.",
        ),
    ));
    Ok(page(View::Dashboard, &session, &headers, flash, &body))
}

fn summary_html(summary: &Value) -> String {
    let mut body = format!(
        r#"<h2>Landlord Dashboard ({})</h2><div class="summary-stats">{}{}{}</div>"#,
        escape(&render::text_at(summary, "period")),
        stat("Expected", summary, "totals.expected"),
        stat("Collected", summary, "totals.collected"),
        stat("Outstanding", summary, "totals.outstanding"),
    );
    let columns = [
        ("Tenant", "tenant"),
        ("Unit", "unit"),
        ("Due", "rent_due"),
        ("Paid", "paid_sum"),
        ("Balance", "balance"),
    ];
    for section in PAYMENT_SECTIONS {
        let rows = render::value_at(summary, &format!("lists.{section}"))
            .cloned()
            .unwrap_or(Value::Null);
        body.push_str(&render::card(
            section,
            &render::table(&rows, &columns, "None this period."),
        ));
    }
    body
}

fn stat(label: &str, summary: &Value, path: &str) -> String {
    format!(
        r#"<div class="stat-card"><p>{label}</p><h3>{}</h3></div>"#,
        render::money(render::value_at(summary, path))
    )
}

// --- Properties ---

/// properties_page
///
/// [Landlord] Property list with the create form and per-property manager assignment.
pub async fn properties_page(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, PortalError> {
    properties_view(&state, &session, &headers, Flash::default()).await
}

pub async fn create_property(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PropertyForm>,
) -> Result<Html<String>, PortalError> {
    let body = form.payload(state.config.property_fields);
    let outcome = state
        .api
        .create(&session.token, Resource::Properties, body)
        .await
        .surface("Failed to create property")?
        .map(|_| "Property created successfully!".to_string());
    properties_view(&state, &session, &headers, Flash::from_outcome(outcome)).await
}

/// assign_manager
///
/// [Landlord] Hands a property to a manager by user id. An empty id is refused before
/// the API is called; a non-numeric property id is rejected by the extractor.
pub async fn assign_manager(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    Path(property_id): Path<u64>,
    headers: HeaderMap,
    Form(form): Form<AssignManagerForm>,
) -> Result<Html<String>, PortalError> {
    let outcome = match form.payload() {
        Ok(body) => {
            let id = property_id.to_string();
            state
                .api
                .update(&session.token, Resource::Properties, &id, body)
                .await
        }
        Err(err) => Err(err),
    }
    .surface("Failed to assign manager")?
    .map(|_| "Manager assigned successfully!".to_string());
    properties_view(&state, &session, &headers, Flash::from_outcome(outcome)).await
}

async fn properties_view(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    mut flash: Flash,
) -> Result<Html<String>, PortalError> {
    let properties = loaded(
        state.api.list(&session.token, Resource::Properties).await,
        "Failed to load properties",
        &mut flash,
    )?;
    let fields = state.config.property_fields;

    let form = render::Form::new(View::Properties.path(), "Create Property")
        .field(Field::text("name", "Property name", "").required())
        .field(Field::text("location", "Location", "").required())
        .field(Field::textarea("description", "Description"));

    let body = format!(
        "{}{}",
        render::card("Add New Property", &form.html()),
        render::card("Existing Properties", &property_rows(&properties, fields)),
    );
    Ok(page(View::Properties, session, headers, flash, &body))
}

fn property_rows(properties: &Value, fields: PropertyFields) -> String {
    let rows = render::records(properties);
    if rows.is_empty() {
        return render::paragraph("No properties found.");
    }
    let (name_key, location_key) = fields.keys();

    let mut out = String::from(
        "<table><thead><tr><th>Name</th><th>Location</th><th>Manager</th><th>Actions</th></tr></thead><tbody>",
    );
    for property in rows {
        let manager = render::value_at(property, "manager.username")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or("Not assigned (managed by landlord)");
        let action = format!("/properties/{}/manager", render::text_at(property, "id"));
        let assign = render::Form::new(&action, "Assign")
            .field(Field::text("manager_id", "Manager user ID", ""));
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&render::text_at(property, name_key)),
            escape(&render::text_at(property, location_key)),
            escape(manager),
            assign.html(),
        ));
    }
    out.push_str("</tbody></table>");
    out
}

// --- Units ---

pub async fn units_page(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, PortalError> {
    units_view(&state, &session, &headers, Flash::default(), &UnitForm::default()).await
}

/// create_unit
///
/// [Landlord] Adds a unit to one of the landlord's properties. On failure the form keeps
/// what was typed.
pub async fn create_unit(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<UnitForm>,
) -> Result<Html<String>, PortalError> {
    let outcome = match form.payload() {
        Ok(body) => state.api.create(&session.token, Resource::Units, body).await,
        Err(err) => Err(err),
    }
    .surface("Failed to add unit")?;

    match outcome {
        Ok(_) => {
            let flash = Flash::message("Unit created successfully!");
            units_view(&state, &session, &headers, flash, &UnitForm::default()).await
        }
        Err(msg) => units_view(&state, &session, &headers, Flash::error(msg), &form).await,
    }
}

async fn units_view(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    mut flash: Flash,
    draft: &UnitForm,
) -> Result<Html<String>, PortalError> {
    let (properties, units) = tokio::join!(
        state.api.list(&session.token, Resource::Properties),
        state.api.list(&session.token, Resource::Units),
    );
    let properties = loaded(properties, "Failed to load properties", &mut flash)?;
    let units = loaded(units, "Failed to load units", &mut flash)?;
    let (name_key, _) = state.config.property_fields.keys();

    let unit_types = UNIT_TYPES
        .iter()
        .map(|(value, label)| (value.to_string(), label.to_string()))
        .collect();
    let unit_type = if draft.unit_type.is_empty() {
        "single"
    } else {
        draft.unit_type.as_str()
    };

    let form = render::Form::new(View::Units.path(), "Create Unit")
        .field(
            Field::select(
                "property_id",
                "Select property",
                render::options_from(&properties, "id", &[name_key]),
            )
            .selected(&draft.property_id)
            .required(),
        )
        .field(Field::text("unit_number", "Unit number", &draft.unit_number).required())
        .field(Field::select("unit_type", "", unit_types).selected(unit_type))
        .field(Field::text("rent_amount", "Rent amount", &draft.rent_amount).required())
        .field(Field::text("deposit", "Deposit", &draft.deposit).required());

    let property_column = format!("property.{name_key}");
    let table = render::table(
        &units,
        &[
            ("Property", property_column.as_str()),
            ("Unit", "unit_number"),
            ("Type", "unit_type"),
            ("Rent", "rent_amount"),
            ("Status", "status"),
        ],
        "No units yet.",
    );

    let body = format!(
        "{}{}",
        render::card("Add Unit", &form.html()),
        render::card("Units", &table)
    );
    Ok(page(View::Units, session, headers, flash, &body))
}

// --- Manager invites ---

pub async fn manager_invite_page(
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Html<String> {
    page(
        View::InviteManager,
        &session,
        &headers,
        Flash::default(),
        &manager_invite_body(None),
    )
}

/// create_manager_invite
///
/// [Landlord] Creates a manager invite and shows the link to hand over.
pub async fn create_manager_invite(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ManagerInviteForm>,
) -> Result<Html<String>, PortalError> {
    let outcome = state
        .api
        .create(&session.token, Resource::ManagerInvites, json!(form))
        .await
        .surface("Failed to create invite")?;

    let (flash, link) = match outcome {
        Ok(invite) => (
            Flash::message("Invite created."),
            super::invite_link(&invite),
        ),
        Err(msg) => (Flash::error(msg), None),
    };
    Ok(page(
        View::InviteManager,
        &session,
        &headers,
        flash,
        &manager_invite_body(link.as_deref()),
    ))
}

fn manager_invite_body(link: Option<&str>) -> String {
    let form = render::Form::new(View::InviteManager.path(), "Create Invite")
        .field(Field::text("email", "Email (optional)", ""))
        .field(Field::text("phone", "Phone (optional)", ""));
    let mut inner = form.html();
    if let Some(link) = link {
        inner.push_str(&super::invite_link_html(link));
    }
    render::card("Invite Manager", &inner)
}
