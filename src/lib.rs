use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity, access rules and session lifecycle.
pub mod auth;
pub mod gate;
pub mod nav;
pub mod role;
pub mod session;
pub mod views;

// The KRIB API client and the payloads it exchanges.
pub mod api;
pub mod models;

// Pages and their wiring.
pub mod handlers;
pub mod render;
pub mod routes;

pub mod config;
pub mod error;

use routes::{protected, public};

// --- Public Re-exports ---

pub use api::{ApiState, HttpKribApi, MockKribApi};
pub use config::PortalConfig;
pub use error::PortalError;
pub use session::SessionStore;

/// ApiDoc
///
/// OpenAPI description of the portal's JSON endpoints, served at
/// `/api-docs/openapi.json`. The HTML pages are not part of it.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::account::health, handlers::account::session_info),
    components(schemas(models::SessionInfo, models::HealthStatus, nav::NavLink, role::Role)),
    tags((name = "krib-portal", description = "KRIB rental administration portal"))
)]
struct ApiDoc;

/// AppState
///
/// Everything a request can reach: the API client, the session cookie codec and the
/// loaded configuration. Cloned per request; all parts are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub api: ApiState,
    pub sessions: SessionStore,
    pub config: PortalConfig,
}

impl AppState {
    pub fn new(api: ApiState, config: PortalConfig) -> Self {
        Self {
            api,
            sessions: SessionStore::new(&config),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ApiState {
    fn from_ref(app_state: &AppState) -> ApiState {
        app_state.api.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(app_state: &AppState) -> SessionStore {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for PortalConfig {
    fn from_ref(app_state: &AppState) -> PortalConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles public and gated routes, the API docs, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Each protected route carries its own view gate.
        .merge(protected::protected_routes(&state.sessions))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, correlated by the `x-request-id` set above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = %request.uri().path(),
        req_id = %request_id,
    )
}
