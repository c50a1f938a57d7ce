use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    session::{Session, SessionStore},
    views::{RouteGuard, View},
};

/// Decision
///
/// Outcome of the auth gate: render the requested view, or navigate elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(View),
}

/// authorize
///
/// Decides whether `session` may see a view protected by `guard`.
/// No session goes to login; a session whose role is not allowed goes to that role's
/// home view. Refusal is always a redirect, never an error.
pub fn authorize(session: Option<&Session>, guard: &RouteGuard) -> Decision {
    match session {
        Some(s) if s.is_authenticated() => {
            if guard.allows(s.role) {
                Decision::Allow
            } else {
                Decision::Redirect(s.role.home())
            }
        }
        _ => Decision::Redirect(View::Login),
    }
}

/// ViewGate
///
/// State for [`enforce`]: the guard of the view being served plus the store used to
/// read the session cookie.
#[derive(Clone)]
pub struct ViewGate {
    pub view: View,
    pub guard: RouteGuard,
    pub sessions: SessionStore,
}

impl ViewGate {
    /// Returns `None` for public views, which need no gate.
    pub fn for_view(view: View, sessions: SessionStore) -> Option<Self> {
        view.guard().map(|guard| Self {
            view,
            guard,
            sessions,
        })
    }
}

/// enforce
///
/// Route-layer middleware applying [`authorize`] before the handler runs. On `Allow`
/// the session is placed in request extensions so handlers receive it as
/// `Extension<Session>` instead of reading shared state.
pub async fn enforce(State(gate): State<ViewGate>, mut request: Request, next: Next) -> Response {
    let session = gate.sessions.current(request.headers());

    match authorize(session.as_ref(), &gate.guard) {
        Decision::Allow => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        Decision::Redirect(target) => {
            tracing::debug!(
                view = ?gate.view,
                role = ?session.as_ref().map(|s| s.role),
                redirect = target.path(),
                "gate refused view"
            );
            Redirect::to(target.path()).into_response()
        }
    }
}
