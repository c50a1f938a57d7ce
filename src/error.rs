use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::{render, session, views::View};

/// PortalError
///
/// Every failure a page handler can run into. The split follows how the user sees it:
/// API and validation failures are shown inline on the page that caused them, while an
/// expired credential (`Unauthorized`) ends the session and sends the user to login.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The API answered 401: the access token is missing, invalid or expired.
    #[error("session expired or credentials rejected")]
    Unauthorized,

    /// Any other non-success answer from the API, with the body's `detail` when present.
    #[error("api returned {status}: {detail}")]
    Api { status: u16, detail: String },

    /// The request never produced an HTTP answer (connection refused, bad body, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unreadable payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Checked locally before any request is sent.
    #[error("{0}")]
    Validation(String),

    #[error("token exchange returned no access/refresh pair")]
    MissingTokens,

    #[error("unsupported role: {0}")]
    UnsupportedRole(String),

    #[error("session cookie could not be signed: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("invalid session transition: {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

pub type PortalResult<T> = Result<T, PortalError>;

impl PortalError {
    /// True when the error must end the session (forced logout).
    pub fn is_session_expired(&self) -> bool {
        matches!(self, PortalError::Unauthorized)
    }

    /// user_message
    ///
    /// The text shown inline on the page. API details are passed through verbatim;
    /// errors without a user-facing detail fall back to the view's own message.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            PortalError::Api { detail, .. } if !detail.is_empty() => detail.clone(),
            PortalError::Validation(msg) => msg.clone(),
            PortalError::MissingTokens => "No tokens returned from server".to_string(),
            PortalError::UnsupportedRole(role) => format!("Unsupported role: {role}"),
            _ => fallback.to_string(),
        }
    }
}

/// Surface
///
/// Splits a handler-level result into "end the session" (propagated with `?`) and
/// "show this message on the page" (returned as the inner `Err`).
pub trait Surface<T> {
    fn surface(self, fallback: &str) -> Result<Result<T, String>, PortalError>;
}

impl<T> Surface<T> for PortalResult<T> {
    fn surface(self, fallback: &str) -> Result<Result<T, String>, PortalError> {
        match self {
            Ok(value) => Ok(Ok(value)),
            Err(err) if err.is_session_expired() => Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "request failed");
                Ok(Err(err.user_message(fallback)))
            }
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        match self {
            PortalError::Unauthorized => {
                tracing::info!("api rejected credentials, clearing session");
                (
                    [(header::SET_COOKIE, session::clear_cookie())],
                    Redirect::to(View::Login.path()),
                )
                    .into_response()
            }
            PortalError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Html(render::error_page(&msg))).into_response()
            }
            other => {
                tracing::error!(error = %other, "unhandled portal error");
                let msg = other.user_message("Something went wrong. Please try again.");
                (StatusCode::BAD_GATEWAY, Html(render::error_page(&msg))).into_response()
            }
        }
    }
}
