use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

use crate::{
    error::{PortalError, PortalResult},
    models::{Credentials, Me, OtpForm, PasswordChange, ProfileForm, TokenPair},
};

/// Resource
///
/// The KRIB collections the portal lists and creates. Records are passed through as
/// untyped JSON; the API owns their shape and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Properties,
    Units,
    Leases,
    Invites,
    ManagerInvites,
    Maintenance,
    Payments,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Properties => "/api/properties/",
            Resource::Units => "/api/units/",
            Resource::Leases => "/api/leases/",
            Resource::Invites => "/api/invites/",
            Resource::ManagerInvites => "/api/manager-invites/",
            Resource::Maintenance => "/api/maintenance/",
            Resource::Payments => "/api/payments/",
        }
    }

    pub fn item_path(self, id: &str) -> String {
        format!("{}{}/", self.path(), id)
    }
}

/// ApiRequest
///
/// One call to the KRIB API, independent of how it is transported.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            bearer: None,
            body: Some(body),
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PATCH,
            path: path.into(),
            bearer: None,
            body: Some(body),
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }
}

/// KribApi Trait
///
/// The portal's only collaborator. Implementations provide [`KribApi::send`]; the
/// endpoint helpers are defined once on top of it, so the HTTP client and the test mock
/// expose exactly the same surface.
///
/// Error contract for `send`: a 401 on a request that carried a bearer token is
/// `PortalError::Unauthorized` (the session is no longer valid). A 401 on an anonymous
/// request, such as a bad password at login, is an ordinary `PortalError::Api`.
#[async_trait]
pub trait KribApi: Send + Sync {
    async fn send(&self, request: ApiRequest) -> PortalResult<Value>;

    // --- Authentication ---

    async fn obtain_token(&self, credentials: &Credentials) -> PortalResult<TokenPair> {
        let value = self
            .send(ApiRequest::post("/api/token/", json!(credentials)))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn current_user(&self, token: &str) -> PortalResult<Me> {
        let value = self.send(ApiRequest::get("/api/auth/me/").bearer(token)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn change_password(&self, token: &str, change: &PasswordChange) -> PortalResult<()> {
        self.send(ApiRequest::post("/api/auth/change-password/", json!(change)).bearer(token))
            .await
            .map(|_| ())
    }

    // --- Profile ---

    async fn profile(&self, token: &str) -> PortalResult<Me> {
        let value = self.send(ApiRequest::get("/api/me/").bearer(token)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn update_profile(&self, token: &str, form: &ProfileForm) -> PortalResult<Value> {
        self.send(ApiRequest::patch("/api/me/", json!(form)).bearer(token))
            .await
    }

    // --- Collections ---

    async fn list(&self, token: &str, resource: Resource) -> PortalResult<Value> {
        self.send(ApiRequest::get(resource.path()).bearer(token)).await
    }

    async fn create(&self, token: &str, resource: Resource, body: Value) -> PortalResult<Value> {
        self.send(ApiRequest::post(resource.path(), body).bearer(token))
            .await
    }

    async fn update(
        &self,
        token: &str,
        resource: Resource,
        id: &str,
        body: Value,
    ) -> PortalResult<Value> {
        self.send(ApiRequest::patch(resource.item_path(id), body).bearer(token))
            .await
    }

    async fn dashboard_summary(&self, token: &str) -> PortalResult<Value> {
        self.send(ApiRequest::get("/api/dashboard/summary/").bearer(token))
            .await
    }

    /// Forwards an STK push request; the payment protocol is the backend's concern.
    async fn initiate_stk_push(&self, token: &str, body: Value) -> PortalResult<Value> {
        self.send(ApiRequest::post("/api/payments/stk/initiate/", body).bearer(token))
            .await
    }

    // --- Invite acceptance (anonymous) ---

    async fn invite(&self, invite_token: &str) -> PortalResult<Value> {
        self.send(ApiRequest::get(Resource::Invites.item_path(invite_token)))
            .await
    }

    async fn verify_invite_otp(&self, invite_token: &str, form: &OtpForm) -> PortalResult<()> {
        let path = format!("{}verify_otp/", Resource::Invites.item_path(invite_token));
        self.send(ApiRequest::post(path, json!(form))).await.map(|_| ())
    }

    async fn accept_invite(&self, invite_token: &str, body: Value) -> PortalResult<()> {
        let path = format!("{}accept/", Resource::Invites.item_path(invite_token));
        self.send(ApiRequest::post(path, body)).await.map(|_| ())
    }
}

/// ApiState
///
/// The shared API handle stored in the application state.
pub type ApiState = Arc<dyn KribApi>;

/// HttpKribApi
///
/// The real client, talking JSON over HTTP to the configured KRIB deployment.
#[derive(Clone)]
pub struct HttpKribApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpKribApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl KribApi for HttpKribApi {
    async fn send(&self, request: ApiRequest) -> PortalResult<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        let authenticated = request.bearer.is_some();

        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        tracing::debug!(method = %request.method, path = %request.path, status = status.as_u16(), "api call");

        if status.is_success() {
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        Err(classify_failure(status, &bytes, authenticated))
    }
}

/// classify_failure
///
/// Maps a non-success answer onto the portal's error taxonomy.
fn classify_failure(status: StatusCode, body: &[u8], authenticated: bool) -> PortalError {
    if status == StatusCode::UNAUTHORIZED && authenticated {
        return PortalError::Unauthorized;
    }
    PortalError::Api {
        status: status.as_u16(),
        detail: extract_detail(body),
    }
}

/// extract_detail
///
/// DRF-style bodies carry a human message in `detail`; anything else (field error maps,
/// plain text) is shown as-is.
pub fn extract_detail(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            _ => Value::Object(map).to_string(),
        },
        Ok(Value::String(text)) => text,
        Ok(other) => other.to_string(),
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

// --- Mock Implementation (for tests) ---

#[derive(Debug, Clone)]
enum MockReply {
    Json(Value),
    Status(u16, Value),
}

/// MockKribApi
///
/// In-memory stand-in for the KRIB API. Replies are registered per method and path;
/// every request is recorded so tests can assert on what the portal sent. Unregistered
/// routes answer 404 with a DRF-style detail.
#[derive(Default)]
pub struct MockKribApi {
    replies: Mutex<HashMap<(Method, String), MockReply>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockKribApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a successful JSON reply.
    pub fn on(self, method: Method, path: &str, body: Value) -> Self {
        self.insert(method, path, MockReply::Json(body))
    }

    /// Registers a failure with the given status and body.
    pub fn fail(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.insert(method, path, MockReply::Status(status, body))
    }

    fn insert(self, method: Method, path: &str, reply: MockReply) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.insert((method, path.to_string()), reply);
        }
        self
    }

    /// Every request sent so far, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }
}

#[async_trait]
impl KribApi for MockKribApi {
    async fn send(&self, request: ApiRequest) -> PortalResult<Value> {
        let key = (request.method.clone(), request.path.clone());
        let authenticated = request.bearer.is_some();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|replies| replies.get(&key).cloned());

        match reply {
            Some(MockReply::Json(body)) => Ok(body),
            Some(MockReply::Status(status, body)) => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                Err(classify_failure(status, body.to_string().as_bytes(), authenticated))
            }
            None => Err(PortalError::Api {
                status: 404,
                detail: "Not found.".to_string(),
            }),
        }
    }
}
