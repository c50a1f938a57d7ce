//! Page handlers, grouped by who uses them.
//!
//! Protected handlers receive the caller's [`Session`] as an `Extension`, placed there
//! by the view gate. Every API call carries that session's bearer token. A failure the
//! user can act on is shown inline through [`Surface`](crate::error::Surface); an
//! expired token is returned with `?` and ends the session.

use axum::{http::HeaderMap, response::Html};
use serde_json::Value;

use crate::{
    error::{PortalError, PortalResult, Surface},
    render::{self, Flash, escape},
    session::{Session, Theme},
    views::View,
};

/// Login, logout, theme, and the JSON endpoints.
pub mod account;
/// Public invite acceptance.
pub mod invite;
pub mod landlord;
pub mod manager;
/// Views open to more than one role: invites, leases, profile.
pub mod shared;
pub mod tenant;

/// Renders `body` inside the protected layout for `view`.
pub(crate) fn page(
    view: View,
    session: &Session,
    headers: &HeaderMap,
    flash: Flash,
    body: &str,
) -> Html<String> {
    Html(render::layout(
        view,
        session,
        Theme::from_headers(headers),
        &flash,
        body,
    ))
}

/// loaded
///
/// Data for a page. A recoverable failure renders the page with nothing to list and the
/// error inline; an expired session is returned as `Err`.
pub(crate) fn loaded(
    result: PortalResult<Value>,
    fallback: &str,
    flash: &mut Flash,
) -> Result<Value, PortalError> {
    match result.surface(fallback)? {
        Ok(value) => Ok(value),
        Err(msg) => {
            flash.error.get_or_insert(msg);
            Ok(Value::Null)
        }
    }
}

/// The acceptance link from a created invite, if the API sent a usable one.
pub(crate) fn invite_link(invite: &Value) -> Option<String> {
    render::value_at(invite, "invite_link")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(str::to_string)
}

pub(crate) fn invite_link_html(link: &str) -> String {
    format!(
        r#"<p class="invite-link">Invite link: <code>{}</code></p>"#,
        escape(link)
    )
}
