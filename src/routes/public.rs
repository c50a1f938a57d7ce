use crate::{
    AppState,
    handlers::{account, invite},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Handlers here never call the API with a
/// bearer token, so an API 401 surfaces as an ordinary error instead of a forced logout.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(account::health))
        // GET /session
        // Current identity and sidebar links as JSON.
        .route("/session", get(account::session_info))
        // GET/POST / and /login
        // Sign-in form and credential exchange.
        .route("/", get(account::login_form).post(account::login_submit))
        .route("/login", get(account::login_form).post(account::login_submit))
        .route("/logout", post(account::logout))
        .route("/theme", post(account::toggle_theme))
        // Invite acceptance, keyed by the invite token.
        .route("/invite/{token}", get(invite::show_invite))
        .route("/invite/{token}/verify", post(invite::verify_otp))
        .route("/invite/{token}/accept", post(invite::accept_invite))
}
