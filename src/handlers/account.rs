use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    auth,
    error::PortalError,
    models::{Credentials, HealthStatus, SessionInfo},
    nav::visible_links,
    render,
    session::{CurrentSession, Theme, clear_cookie},
    views::View,
};

/// login_form
///
/// [Public Route] The sign-in page, served at `/` and `/login`.
pub async fn login_form(headers: HeaderMap) -> Html<String> {
    Html(render::login_page(Theme::from_headers(&headers), "", None))
}

/// login_submit
///
/// [Public Route] Exchanges credentials with the API. On success the session cookie is
/// set and the user lands on their role's home view. On failure nothing is stored and
/// the login page is shown again with the error; there is no redirect.
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(credentials): Form<Credentials>,
) -> Result<Response, PortalError> {
    match auth::login(state.api.as_ref(), &credentials).await {
        Ok(session) => {
            let cookie = state.sessions.set(&session)?;
            Ok((
                [(header::SET_COOKIE, cookie)],
                Redirect::to(session.role.home().path()),
            )
                .into_response())
        }
        Err(err) => {
            let message = err.user_message("Invalid credentials. Try again!");
            Ok(Html(render::login_page(
                Theme::from_headers(&headers),
                &credentials.username,
                Some(&message),
            ))
            .into_response())
        }
    }
}

/// logout
///
/// [Public Route] Clears the session cookie and returns to the login page. Safe to call
/// without a session.
pub async fn logout(CurrentSession(session): CurrentSession) -> Response {
    if let Some(session) = session {
        tracing::info!(username = %session.username, "logout");
    }
    (
        [(header::SET_COOKIE, clear_cookie())],
        Redirect::to(View::Login.path()),
    )
        .into_response()
}

/// toggle_theme
///
/// [Public Route] Flips the dark/light preference and returns to the page it came from.
pub async fn toggle_theme(headers: HeaderMap) -> Response {
    let next = Theme::from_headers(&headers).toggled();
    let back = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(referer_path)
        .unwrap_or(View::Login.path())
        .to_string();
    ([(header::SET_COOKIE, next.cookie())], Redirect::to(&back)).into_response()
}

/// Path part of a Referer, limited to local paths.
fn referer_path(referer: &str) -> Option<&str> {
    let path = match referer.split_once("://") {
        Some((_, rest)) => &rest[rest.find('/')?..],
        None => referer,
    };
    (path.starts_with('/') && !path.starts_with("//")).then_some(path)
}

/// session_info
///
/// [Public Route] The current identity and its sidebar, for browser scripts. Anonymous
/// callers get `authenticated: false` and no links.
#[utoipa::path(
    get,
    path = "/session",
    responses((status = 200, description = "Current session", body = SessionInfo))
)]
pub async fn session_info(CurrentSession(session): CurrentSession) -> Json<SessionInfo> {
    let info = match session {
        Some(s) => SessionInfo {
            authenticated: true,
            links: visible_links(Some(s.role)),
            home: Some(s.role.home().path().to_string()),
            role: Some(s.role),
            username: Some(s.username),
        },
        None => SessionInfo::default(),
    };
    Json(info)
}

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Portal is up", body = HealthStatus))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        api_base_url: state.config.api_base_url.clone(),
    })
}
