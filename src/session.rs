use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{Env, PortalConfig},
    error::{PortalError, PortalResult},
    role::Role,
};

pub const SESSION_COOKIE: &str = "krib_session";
pub const THEME_COOKIE: &str = "krib_theme";

/// Session
///
/// The authenticated identity the portal acts on behalf of: who the user is, which role
/// the API assigned them, and the bearer tokens for API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: Role,
    /// Access token, sent as `Authorization: Bearer` on every API call.
    pub token: String,
    pub refresh: String,
}

impl Session {
    /// A session without an access token is never authenticated.
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}

/// SessionClaims
///
/// The signed payload stored in the `krib_session` cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (sub): the KRIB username.
    pub sub: String,
    pub role: Role,
    pub access: String,
    pub refresh: String,
    pub iat: i64,
    pub exp: i64,
}

/// SessionStore
///
/// Persists the session on the client as a signed, HttpOnly cookie. Reads happen on
/// every request through [`CurrentSession`]; writes are limited to [`SessionStore::set`]
/// at login and [`clear_cookie`] at logout or when the API rejects the token.
#[derive(Clone)]
pub struct SessionStore {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
    secure: bool,
}

impl SessionStore {
    pub fn new(config: &PortalConfig) -> Self {
        let secret = config.session_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs: config.session_ttl_secs,
            secure: config.env == Env::Production,
        }
    }

    /// set
    ///
    /// Signs the session and returns the `Set-Cookie` value that stores it.
    pub fn set(&self, session: &Session) -> PortalResult<String> {
        if !session.is_authenticated() {
            return Err(PortalError::MissingTokens);
        }
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: session.username.clone(),
            role: session.role,
            access: session.token.clone(),
            refresh: session.refresh.clone(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        let secure = if self.secure { "; Secure" } else { "" };
        Ok(format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{secure}",
            self.ttl_secs
        ))
    }

    /// current
    ///
    /// Resolves the session carried by the request, if any. A missing, tampered or
    /// expired cookie, or one without an access token, yields `None`.
    pub fn current(&self, headers: &HeaderMap) -> Option<Session> {
        let raw = cookie_value(headers, SESSION_COOKIE)?;
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let claims = match decode::<SessionClaims>(raw, &self.decoding, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "discarding unreadable session cookie");
                return None;
            }
        };

        let session = Session {
            username: claims.sub,
            role: claims.role,
            token: claims.access,
            refresh: claims.refresh,
        };
        session.is_authenticated().then_some(session)
    }
}

/// `Set-Cookie` value that removes the session from the browser.
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("krib_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Theme
///
/// Display preference kept in its own long-lived cookie, independent of login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match cookie_value(headers, THEME_COOKIE) {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn cookie(self) -> String {
        format!(
            "{THEME_COOKIE}={}; Path=/; SameSite=Lax; Max-Age=31536000",
            self.as_str()
        )
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// CurrentSession
///
/// Extractor yielding the request's session (or `None` when anonymous). It never
/// rejects; deciding what an anonymous user may see is the gate's job.
pub struct CurrentSession(pub Option<Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    SessionStore: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = SessionStore::from_ref(state);
        Ok(CurrentSession(store.current(&parts.headers)))
    }
}

/// SessionState
///
/// The login lifecycle: `Anonymous -> Authenticating -> Authenticated -> Anonymous`.
/// Transitions consume the state so a stale state cannot be reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating { username: String },
    Authenticated(Session),
}

impl SessionState {
    pub fn from_session(session: Option<Session>) -> Self {
        match session {
            Some(s) if s.is_authenticated() => SessionState::Authenticated(s),
            _ => SessionState::Anonymous,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating { .. } => "authenticating",
            SessionState::Authenticated(_) => "authenticated",
        }
    }

    /// Login form submitted. Submitting while already signed in replaces that session.
    pub fn begin_login(self, username: &str) -> PortalResult<Self> {
        match self {
            SessionState::Anonymous | SessionState::Authenticated(_) => {
                Ok(SessionState::Authenticating {
                    username: username.to_string(),
                })
            }
            other => Err(PortalError::InvalidTransition {
                state: other.name(),
                event: "begin_login",
            }),
        }
    }

    /// Credential exchange succeeded.
    pub fn complete(self, session: Session) -> PortalResult<Self> {
        match self {
            SessionState::Authenticating { .. } if session.is_authenticated() => {
                Ok(SessionState::Authenticated(session))
            }
            SessionState::Authenticating { .. } => Err(PortalError::MissingTokens),
            other => Err(PortalError::InvalidTransition {
                state: other.name(),
                event: "complete",
            }),
        }
    }

    /// Credential exchange failed; nothing is persisted.
    pub fn fail(self) -> PortalResult<Self> {
        match self {
            SessionState::Authenticating { .. } => Ok(SessionState::Anonymous),
            other => Err(PortalError::InvalidTransition {
                state: other.name(),
                event: "fail",
            }),
        }
    }

    /// Logout or token invalidation. Always lands in `Anonymous`.
    pub fn invalidate(self) -> Self {
        SessionState::Anonymous
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            SessionState::Authenticated(s) => Some(s),
            _ => None,
        }
    }
}
