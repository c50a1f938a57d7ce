use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::Html,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    AppState,
    config::PropertyFields,
    models::{AcceptInviteForm, OtpForm},
    render::{self, Field, Flash, escape},
    session::Theme,
    views::View,
};

/// show_invite
///
/// [Public Route] The invite acceptance page reached from an invite link. No session is
/// involved; the token in the path is the only credential.
pub async fn show_invite(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
    headers: HeaderMap,
) -> Html<String> {
    invite_view(&state, token, &headers, Flash::default()).await
}

/// verify_otp
///
/// [Public Route] Confirms the one-time code. Once verified the backend stops asking for
/// it, so the re-rendered page shows only the password step.
pub async fn verify_otp(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
    headers: HeaderMap,
    Form(form): Form<OtpForm>,
) -> Html<String> {
    let flash = match state.api.verify_invite_otp(&token.to_string(), &form).await {
        Ok(()) => Flash::message("OTP verified. You can now set a password."),
        Err(err) => {
            tracing::warn!(%token, error = %err, "invite otp rejected");
            Flash::error(err.user_message("OTP verification failed."))
        }
    };
    invite_view(&state, token, &headers, flash).await
}

/// accept_invite
///
/// [Public Route] Sets the invitee's password and activates the account. The OTP is
/// sent along only while the invite still requires one.
pub async fn accept_invite(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
    headers: HeaderMap,
    Form(form): Form<AcceptInviteForm>,
) -> Html<String> {
    let key = token.to_string();
    let otp_required = match state.api.invite(&key).await {
        Ok(invite) => requires_otp(&invite),
        Err(_) => {
            return invite_view(&state, token, &headers, Flash::default()).await;
        }
    };

    match state.api.accept_invite(&key, form.payload(otp_required)).await {
        Ok(()) => {
            tracing::info!(%token, "invite accepted");
            let body = format!(
                r#"<meta http-equiv="refresh" content="2;url={0}"><p><a href="{0}">Go to login</a></p>"#,
                View::Login.path()
            );
            Html(render::public_page(
                Theme::from_headers(&headers),
                View::AcceptInvite,
                &Flash::message("Invite accepted! Redirecting to login..."),
                &body,
            ))
        }
        Err(err) => {
            tracing::warn!(%token, error = %err, "invite acceptance failed");
            let flash = Flash::error(err.user_message("Invite acceptance failed."));
            invite_view(&state, token, &headers, flash).await
        }
    }
}

fn requires_otp(invite: &Value) -> bool {
    render::value_at(invite, "otp_required").and_then(Value::as_bool) == Some(true)
}

async fn invite_view(state: &AppState, token: Uuid, headers: &HeaderMap, flash: Flash) -> Html<String> {
    let theme = Theme::from_headers(headers);
    let (flash, body) = match state.api.invite(&token.to_string()).await {
        Ok(invite) => {
            let body = invite_body(&invite, token, state.config.property_fields);
            (flash, body)
        }
        Err(err) => {
            tracing::debug!(%token, error = %err, "invite lookup failed");
            (Flash::error("Invite not found."), String::new())
        }
    };
    Html(render::public_page(theme, View::AcceptInvite, &flash, &body))
}

fn invite_body(invite: &Value, token: Uuid, fields: PropertyFields) -> String {
    let (name_key, _) = fields.keys();
    let mut body = format!(
        "<p><strong>Name:</strong> {}</p>",
        escape(&render::text_at(invite, "full_name"))
    );
    if let Some(property) = render::value_at(invite, "property") {
        // Invite payloads carry `title` whatever the property schema.
        let name = render::value_at(property, name_key)
            .or_else(|| render::value_at(property, "title"))
            .filter(|name| !name.is_object());
        body.push_str(&format!(
            "<p><strong>Property:</strong> {}</p>",
            escape(&render::display(name))
        ));
    }
    let status = render::text_at(invite, "status");
    body.push_str(&format!("<p><strong>Status:</strong> {}</p>", escape(&status)));

    if status != "PENDING" {
        body.push_str(r#"<p class="error">This invite is no longer active.</p>"#);
        return body;
    }

    let base = format!("{}/{token}", View::AcceptInvite.path());
    let otp_required = requires_otp(invite);
    if otp_required {
        let verify = render::Form::new(&format!("{base}/verify"), "Verify OTP")
            .field(Field::text("otp", "OTP", "").required());
        body.push_str(&verify.html());
    }

    let mut accept = render::Form::new(&format!("{base}/accept"), "Accept Invite")
        .field(Field::password("password", "Set password").required());
    if otp_required {
        accept = accept.field(Field::text("otp", "OTP", ""));
    }
    body.push_str(&accept.html());
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token() -> Uuid {
        Uuid::parse_str("6f1c2b9e-3a4d-4e5f-8a7b-1c2d3e4f5a6b").unwrap()
    }

    #[test]
    fn invite_property_reads_title_under_either_schema() {
        let invite = json!({
            "full_name": "Achieng",
            "status": "PENDING",
            "property": {"id": 3, "title": "Palm Court"}
        });
        for fields in [PropertyFields::NameLocation, PropertyFields::TitleAddress] {
            let html = invite_body(&invite, token(), fields);
            assert!(html.contains("<p><strong>Property:</strong> Palm Court</p>"));
            assert!(!html.contains("&quot;id&quot;"));
        }
    }

    #[test]
    fn unnamed_invite_property_shows_placeholder() {
        let invite = json!({"full_name": "Achieng", "status": "PENDING", "property": {"id": 3}});
        let html = invite_body(&invite, token(), PropertyFields::NameLocation);
        assert!(html.contains("<p><strong>Property:</strong> -</p>"));
    }

    #[test]
    fn inactive_invite_has_no_forms() {
        let invite = json!({"full_name": "Achieng", "status": "ACCEPTED"});
        let html = invite_body(&invite, token(), PropertyFields::NameLocation);
        assert!(html.contains("This invite is no longer active."));
        assert!(!html.contains("<form"));
    }

    #[test]
    fn pending_invite_with_otp_offers_verification() {
        let invite = json!({
            "full_name": "Achieng",
            "status": "PENDING",
            "otp_required": true,
            "property": {"name": "Palm Court"}
        });
        let html = invite_body(&invite, token(), PropertyFields::NameLocation);
        assert!(html.contains("Palm Court"));
        assert!(html.contains(&format!(r#"action="/invite/{}/verify""#, token())));
        assert!(html.contains(&format!(r#"action="/invite/{}/accept""#, token())));
    }

    #[test]
    fn verified_invite_only_asks_for_password() {
        let invite = json!({"full_name": "Achieng", "status": "PENDING", "otp_required": false});
        let html = invite_body(&invite, token(), PropertyFields::NameLocation);
        assert!(!html.contains("/verify"));
        assert!(!html.contains(r#"name="otp""#));
        assert!(html.contains(r#"name="password""#));
    }
}
