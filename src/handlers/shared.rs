use axum::{Extension, Form, extract::State, http::HeaderMap, response::Html};

use super::{invite_link, invite_link_html, loaded, page};
use crate::{
    AppState,
    api::Resource,
    error::{PortalError, Surface},
    models::{LeaseForm, Me, PasswordForm, ProfileForm, TenantInviteForm},
    render::{self, Field, Flash},
    session::Session,
    views::View,
};

// --- Tenant invites (landlord, manager) ---

pub async fn invites_page(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, PortalError> {
    invites_view(&state, &session, &headers, Flash::default(), None).await
}

/// create_invite
///
/// [Landlord, Manager] Invites a tenant, optionally tied to a property and unit, and
/// shows the acceptance link.
pub async fn create_invite(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TenantInviteForm>,
) -> Result<Html<String>, PortalError> {
    let outcome = state
        .api
        .create(&session.token, Resource::Invites, form.payload())
        .await
        .surface("Failed to invite tenant")?;

    match outcome {
        Ok(invite) => {
            let link = invite_link(&invite);
            let flash = Flash::message("Invite created.");
            invites_view(&state, &session, &headers, flash, link.as_deref()).await
        }
        Err(msg) => invites_view(&state, &session, &headers, Flash::error(msg), None).await,
    }
}

async fn invites_view(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    mut flash: Flash,
    created_link: Option<&str>,
) -> Result<Html<String>, PortalError> {
    let token = session.token.as_str();
    let (properties, units, invites) = tokio::join!(
        state.api.list(token, Resource::Properties),
        state.api.list(token, Resource::Units),
        state.api.list(token, Resource::Invites),
    );
    let properties = loaded(properties, "Failed to load properties", &mut flash)?;
    let units = loaded(units, "Failed to load units", &mut flash)?;
    let invites = loaded(invites, "Failed to load invites", &mut flash)?;

    let (name_key, _) = state.config.property_fields.keys();
    let unit_property = format!("property.{name_key}");
    let otp_choice = vec![
        ("false".to_string(), "No verification code".to_string()),
        ("true".to_string(), "Send a verification code".to_string()),
    ];

    let form = render::Form::new(View::Invites.path(), "Send Invite")
        .field(Field::text("full_name", "Full name", "").required())
        .field(Field::text("email", "Email (optional)", ""))
        .field(Field::text("phone", "Phone (optional)", ""))
        .field(Field::select(
            "property",
            "Optional property",
            render::options_from(&properties, "id", &[name_key]),
        ))
        .field(Field::select(
            "unit",
            "Optional unit",
            render::options_from(&units, "id", &[unit_property.as_str(), "unit_number"]),
        ))
        .field(Field::datetime("expires_at", "Expires at").required())
        .field(Field::select("send_otp", "", otp_choice).selected("false"));

    let mut invite_card = form.html();
    if let Some(link) = created_link {
        invite_card.push_str(&invite_link_html(link));
    }

    let table = render::table(
        &invites,
        &[
            ("Name", "full_name"),
            ("Status", "status"),
            ("Property", "property"),
            ("Unit", "unit"),
            ("Token", "token"),
        ],
        "No invites yet.",
    );

    let body = format!(
        "{}{}",
        render::card("Invite Tenant", &invite_card),
        render::card("Invites", &table)
    );
    Ok(page(View::Invites, session, headers, flash, &body))
}

// --- Leases (landlord, manager) ---

pub async fn leases_page(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, PortalError> {
    leases_view(&state, &session, &headers, Flash::default()).await
}

pub async fn create_lease(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LeaseForm>,
) -> Result<Html<String>, PortalError> {
    let outcome = state
        .api
        .create(&session.token, Resource::Leases, form.payload())
        .await
        .surface("Failed to create lease")?
        .map(|_| "Lease created successfully!".to_string());
    leases_view(&state, &session, &headers, Flash::from_outcome(outcome)).await
}

async fn leases_view(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    mut flash: Flash,
) -> Result<Html<String>, PortalError> {
    let (properties, leases) = tokio::join!(
        state.api.list(&session.token, Resource::Properties),
        state.api.list(&session.token, Resource::Leases),
    );
    let properties = loaded(properties, "Failed to load properties", &mut flash)?;
    let leases = loaded(leases, "Failed to load leases", &mut flash)?;
    let (name_key, _) = state.config.property_fields.keys();

    let form = render::Form::new(View::Leases.path(), "Create Lease")
        .field(
            Field::select(
                "property",
                "Select property",
                render::options_from(&properties, "id", &[name_key]),
            )
            .required(),
        )
        .field(Field::text("tenant", "Tenant (ID)", "").required())
        .field(Field::date("start_date", "Start date").required())
        .field(Field::date("end_date", "End date"))
        .field(Field::text("rent_amount", "Rent amount", "").required());

    let property_column = format!("property.{name_key}");
    let table = render::table(
        &leases,
        &[
            ("Property", property_column.as_str()),
            ("Tenant", "tenant.user"),
            ("Start", "start_date"),
            ("End", "end_date"),
            ("Rent", "rent_amount"),
        ],
        "No leases yet.",
    );

    let body = format!(
        "{}{}",
        render::card("Create Lease", &form.html()),
        render::card("Leases", &table)
    );
    Ok(page(View::Leases, session, headers, flash, &body))
}

// --- Profile (all roles) ---

pub async fn profile_page(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, PortalError> {
    profile_view(&state, &session, &headers, Flash::default()).await
}

/// update_profile
///
/// [All roles] Saves contact details through `PATCH /api/me/`.
pub async fn update_profile(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ProfileForm>,
) -> Result<Html<String>, PortalError> {
    let outcome = state
        .api
        .update_profile(&session.token, &form)
        .await
        .surface("Failed to update profile")?
        .map(|_| "Profile updated successfully.".to_string());
    profile_view(&state, &session, &headers, Flash::from_outcome(outcome)).await
}

/// change_password
///
/// [All roles] A confirmation mismatch is reported without contacting the API.
pub async fn change_password(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PasswordForm>,
) -> Result<Html<String>, PortalError> {
    let outcome = match form.into_change() {
        Ok(change) => state.api.change_password(&session.token, &change).await,
        Err(err) => Err(err),
    }
    .surface("Failed to change password")?
    .map(|_| "Password changed successfully.".to_string());
    profile_view(&state, &session, &headers, Flash::from_outcome(outcome)).await
}

async fn profile_view(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    mut flash: Flash,
) -> Result<Html<String>, PortalError> {
    let me = match state
        .api
        .profile(&session.token)
        .await
        .surface("Failed to load profile")?
    {
        Ok(me) => me,
        Err(msg) => {
            flash.error.get_or_insert(msg);
            Me::default()
        }
    };

    let details = render::Form::new(View::Profile.path(), "Save")
        .field(Field::text("email", "Email", me.email.as_deref().unwrap_or("")))
        .field(Field::text(
            "phone_number",
            "Phone number",
            me.phone_number.as_deref().unwrap_or(""),
        ));
    let password = render::Form::new("/profile/password", "Change Password")
        .field(Field::password("old_password", "Old password").required())
        .field(Field::password("new_password", "New password").required())
        .field(Field::password("confirm_password", "Confirm new password").required());

    let body = format!(
        "{}{}",
        render::card("Update details", &details.html()),
        render::card("Change password", &password.html())
    );
    Ok(page(View::Profile, session, headers, flash, &body))
}
