use axum::{
    Extension, Form,
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde_json::{Value, json};

use super::{loaded, page};
use crate::{
    AppState,
    api::Resource,
    config::PropertyFields,
    error::{PortalError, Surface},
    models::{MaintenanceForm, StkPushForm, TenantIssueForm},
    render::{self, Field, Flash, escape},
    session::Session,
    views::View,
};

/// home
///
/// [Tenant] Active lease, rent status for the period, payment history and maintenance
/// requests.
pub async fn home(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, PortalError> {
    home_view(&state, &session, &headers, Flash::default()).await
}

/// pay
///
/// [Tenant] Starts an STK push for rent against the active lease.
pub async fn pay(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<StkPushForm>,
) -> Result<Html<String>, PortalError> {
    let outcome = match form.payload() {
        Ok(body) => state.api.initiate_stk_push(&session.token, body).await,
        Err(err) => Err(err),
    }
    .surface("Failed to initiate payment")?
    .map(|_| "Payment request sent. Complete it on your phone.".to_string());
    home_view(&state, &session, &headers, Flash::from_outcome(outcome)).await
}

/// raise_issue
///
/// [Tenant] Files a maintenance request against the active lease from the home view.
pub async fn raise_issue(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TenantIssueForm>,
) -> Result<Html<String>, PortalError> {
    let outcome = state
        .api
        .create(&session.token, Resource::Maintenance, json!(form))
        .await
        .surface("Failed to create maintenance request")?
        .map(|_| "Maintenance request submitted.".to_string());
    home_view(&state, &session, &headers, Flash::from_outcome(outcome)).await
}

async fn home_view(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    mut flash: Flash,
) -> Result<Html<String>, PortalError> {
    let (summary, maintenance) = tokio::join!(
        state.api.dashboard_summary(&session.token),
        state.api.list(&session.token, Resource::Maintenance),
    );
    let summary = loaded(summary, "Failed to load dashboard", &mut flash)?;
    let maintenance = loaded(maintenance, "Failed to load maintenance requests", &mut flash)?;

    let body = home_body(&summary, &maintenance, state.config.property_fields);
    Ok(page(View::TenantHome, session, headers, flash, &body))
}

fn home_body(summary: &Value, maintenance: &Value, fields: PropertyFields) -> String {
    let Some(lease) = render::value_at(summary, "active_lease") else {
        return render::paragraph("No active lease yet.");
    };
    let lease_id = render::text_at(lease, "id");
    let (name_key, _) = fields.keys();

    let mut body = String::new();
    if render::value_at(summary, "show_overdue_banner").and_then(Value::as_bool) == Some(true) {
        body.push_str(r#"<p class="error">Your rent is overdue.</p>"#);
    }

    let heading = format!(
        "{} - Unit {}",
        render::text_at(lease, &format!("unit.property.{name_key}")),
        render::text_at(lease, "unit.unit_number")
    );
    let rent = format!(
        "<p>Status: {}</p><p>Due: {} Paid: {} Balance: {}</p>",
        escape(&render::text_at(summary, "rent.status")),
        escape(&render::text_at(summary, "rent.rent_due")),
        escape(&render::text_at(summary, "rent.paid_sum")),
        escape(&render::text_at(summary, "rent.balance")),
    );
    body.push_str(&render::card(&heading, &rent));

    let pay = render::Form::new("/tenant/pay", "Initiate STK Push")
        .field(Field::hidden("lease_id", &lease_id))
        .field(Field::text("phone_number", "2547...", "").required())
        .field(Field::text("amount", "Amount", "").required());
    body.push_str(&render::card("Pay Rent", &pay.html()));

    body.push_str(&render::card(
        "Payment History",
        &history(summary.get("payments").unwrap_or(&Value::Null), "amount"),
    ));

    let issue = render::Form::new("/tenant/maintenance", "Submit Request")
        .field(Field::hidden("lease_id", &lease_id))
        .field(Field::textarea("issue", "Describe the issue").required());
    body.push_str(&render::card(
        "Maintenance",
        &format!("{}{}", issue.html(), history(maintenance, "issue")),
    ));
    body
}

fn history(rows: &Value, label: &str) -> String {
    let items: String = render::records(rows)
        .iter()
        .map(|row| {
            format!(
                "<li>{} - {}</li>",
                escape(&render::text_at(row, label)),
                escape(&render::text_at(row, "status"))
            )
        })
        .collect();
    format!("<ul>{items}</ul>")
}

// --- Standalone maintenance form ---

pub async fn maintenance_page(
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Html<String> {
    page(
        View::Maintenance,
        &session,
        &headers,
        Flash::default(),
        &maintenance_body(&MaintenanceForm::default()),
    )
}

/// create_maintenance
///
/// [Tenant] Reports an issue for a property. Success returns to the tenant home view.
pub async fn create_maintenance(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<MaintenanceForm>,
) -> Result<Response, PortalError> {
    let outcome = state
        .api
        .create(&session.token, Resource::Maintenance, json!(form))
        .await
        .surface("Failed to create maintenance request")?;

    Ok(match outcome {
        Ok(_) => Redirect::to(View::TenantHome.path()).into_response(),
        Err(msg) => page(
            View::Maintenance,
            &session,
            &headers,
            Flash::error(msg),
            &maintenance_body(&form),
        )
        .into_response(),
    })
}

fn maintenance_body(draft: &MaintenanceForm) -> String {
    let form = render::Form::new(View::Maintenance.path(), "Report")
        .field(Field::text("property", "Property ID", &draft.property).required())
        .field(Field::textarea("issue", "Issue description").required());
    render::card("Report Maintenance", &form.html())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_active_lease_renders_only_the_notice() {
        let html = home_body(&json!({"active_lease": null}), &json!([]), PropertyFields::NameLocation);
        assert_eq!(html, "<p>No active lease yet.</p>");
    }

    #[test]
    fn overdue_lease_shows_banner_and_forms() {
        let summary = json!({
            "active_lease": {"id": 9, "unit": {"unit_number": "C3", "property": {"name": "Palm Court"}}},
            "show_overdue_banner": true,
            "rent": {"status": "OVERDUE", "rent_due": "15000.00", "paid_sum": "5000.00", "balance": "10000.00"},
            "payments": [{"id": 1, "amount": "5000.00", "status": "SUCCESS"}]
        });
        let maintenance = json!([{"id": 3, "issue": "Leaking sink", "status": "Pending"}]);
        let html = home_body(&summary, &maintenance, PropertyFields::NameLocation);

        assert!(html.contains("Your rent is overdue."));
        assert!(html.contains("Palm Court - Unit C3"));
        assert!(html.contains("Balance: 10000.00"));
        assert!(html.contains(r#"<input type="hidden" name="lease_id" value="9">"#));
        assert!(html.contains("<li>5000.00 - SUCCESS</li>"));
        assert!(html.contains("<li>Leaking sink - Pending</li>"));
    }

    #[test]
    fn banner_hidden_when_not_overdue() {
        let summary = json!({"active_lease": {"id": 1}, "show_overdue_banner": false});
        let html = home_body(&summary, &Value::Null, PropertyFields::NameLocation);
        assert!(!html.contains("overdue"));
    }
}
