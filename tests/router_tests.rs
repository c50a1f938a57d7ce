use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use krib_portal::{
    AppState, MockKribApi, PortalConfig, SessionStore,
    api::ApiState,
    config::PropertyFields,
    create_router,
    role::Role,
    session::Session,
};
use reqwest::Method;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

// --- Helpers ---

fn app_with(mock: Arc<MockKribApi>, config: PortalConfig) -> Router {
    let api: ApiState = mock;
    create_router(AppState::new(api, config))
}

fn app(mock: Arc<MockKribApi>) -> Router {
    app_with(mock, PortalConfig::default())
}

/// `Cookie` header value carrying a signed session for `role`.
fn session_cookie(role: Role) -> String {
    let store = SessionStore::new(&PortalConfig::default());
    let session = Session {
        username: format!("{role}-user"),
        role,
        token: "access-token".to_string(),
        refresh: "refresh-token".to_string(),
    };
    let set_cookie = store.set(&session).unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, form: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

fn set_cookie(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// --- Auth gate ---

#[tokio::test]
async fn anonymous_user_is_sent_to_login_from_manager_view() {
    let mock = Arc::new(MockKribApi::new());
    let response = app(mock.clone()).oneshot(get("/manager", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn tenant_is_sent_home_from_landlord_view() {
    let mock = Arc::new(MockKribApi::new());
    let cookie = session_cookie(Role::Tenant);
    let response = app(mock.clone())
        .oneshot(get("/dashboard", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/tenant"));
    assert!(mock.calls().is_empty(), "gate must refuse before any API call");
}

#[tokio::test]
async fn manager_form_posts_are_gated_too() {
    let mock = Arc::new(MockKribApi::new());
    let cookie = session_cookie(Role::Manager);
    let response = app(mock.clone())
        .oneshot(post_form("/units/new", Some(&cookie), "unit_number=A1"))
        .await
        .unwrap();

    assert_eq!(location(&response), Some("/manager"));
    assert!(mock.calls_to(Method::POST, "/api/units/").is_empty());
}

#[tokio::test]
async fn wrong_method_on_gated_path_is_405_before_the_gate() {
    let mock = Arc::new(MockKribApi::new());
    let response = app(mock.clone()).oneshot(get("/tenant/pay", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(location(&response).is_none());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn tampered_cookie_counts_as_anonymous() {
    let mock = Arc::new(MockKribApi::new());
    let response = app(mock)
        .oneshot(get("/profile", Some("krib_session=not-a-token")))
        .await
        .unwrap();
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn legacy_dashboard_alias_is_guarded_like_the_view() {
    let mock = Arc::new(MockKribApi::new());
    let cookie = session_cookie(Role::Landlord);
    let response = app(mock)
        .oneshot(get("/tenant-dashboard", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(location(&response), Some("/dashboard"));
}

// --- Login / logout ---

#[tokio::test]
async fn invalid_login_shows_error_without_session_or_redirect() {
    let mock = Arc::new(MockKribApi::new().fail(
        Method::POST,
        "/api/token/",
        401,
        json!({"detail": "No active account found with the given credentials"}),
    ));
    let response = app(mock.clone())
        .oneshot(post_form("/login", None, "username=kamau&password=wrong"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());
    assert!(location(&response).is_none());
    let body = body_text(response).await;
    assert!(body.contains("No active account found with the given credentials"));
    assert!(body.contains(r#"value="kamau""#));
    assert!(mock.calls_to(Method::GET, "/api/auth/me/").is_empty());
}

#[tokio::test]
async fn login_stores_session_and_lands_on_role_home() {
    let mock = Arc::new(
        MockKribApi::new()
            .on(Method::POST, "/api/token/", json!({"access": "a1", "refresh": "r1"}))
            .on(
                Method::GET,
                "/api/auth/me/",
                json!({"username": "njeri", "role": "manager"}),
            ),
    );
    let response = app(mock)
        .oneshot(post_form("/login", None, "username=njeri&password=secret"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/manager"));
    let cookie = set_cookie(&response).unwrap();
    assert!(cookie.starts_with("krib_session="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn unsupported_role_is_refused_at_login() {
    let mock = Arc::new(
        MockKribApi::new()
            .on(Method::POST, "/api/token/", json!({"access": "a1", "refresh": "r1"}))
            .on(Method::GET, "/api/auth/me/", json!({"username": "root", "role": "admin"})),
    );
    let response = app(mock)
        .oneshot(post_form("/login", None, "username=root&password=x"))
        .await
        .unwrap();

    assert!(set_cookie(&response).is_none());
    assert!(body_text(response).await.contains("Unsupported role: admin"));
}

#[tokio::test]
async fn logout_clears_session() {
    let mock = Arc::new(MockKribApi::new());
    let router = app(mock.clone());
    let cookie = session_cookie(Role::Landlord);
    let response = router
        .clone()
        .oneshot(post_form("/logout", Some(&cookie), ""))
        .await
        .unwrap();

    assert_eq!(location(&response), Some("/login"));
    let cleared = set_cookie(&response).unwrap();
    assert!(cleared.contains("Max-Age=0"));

    // The browser now sends the emptied cookie.
    let emptied = cleared.split(';').next().unwrap();
    let after = router
        .oneshot(get("/dashboard", Some(emptied)))
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&after), Some("/login"));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn expired_token_during_fetch_forces_logout() {
    let mock = Arc::new(MockKribApi::new().fail(
        Method::GET,
        "/api/dashboard/summary/",
        401,
        json!({"detail": "Given token not valid for any token type"}),
    ));
    let cookie = session_cookie(Role::Landlord);
    let response = app(mock)
        .oneshot(get("/dashboard", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert!(set_cookie(&response).unwrap().starts_with("krib_session=;"));
}

// --- Pages ---

#[tokio::test]
async fn landlord_dashboard_renders_summary_and_sidebar() {
    let mock = Arc::new(
        MockKribApi::new()
            .on(
                Method::GET,
                "/api/dashboard/summary/",
                json!({"period": "2026-10", "totals": {"expected": 1000, "collected": 400, "outstanding": 600}, "lists": {}}),
            )
            .on(
                Method::GET,
                "/api/payments/",
                json!([{"id": 1, "date": "2026-10-03", "amount": "400.00", "status": "Completed"}]),
            ),
    );
    let cookie = session_cookie(Role::Landlord);
    let response = app(mock.clone())
        .oneshot(get("/dashboard", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Landlord Dashboard (2026-10)"));
    assert!(body.contains("<h3>600.00</h3>"));
    assert!(body.contains("<td>2026-10-03</td>"));
    assert!(body.contains(r#"href="/managers/invite""#));
    assert!(!body.contains(r#"href="/maintenance/new""#));
    let calls = mock.calls_to(Method::GET, "/api/dashboard/summary/");
    assert_eq!(calls[0].bearer.as_deref(), Some("access-token"));
}

#[tokio::test]
async fn manager_sidebar_only_lists_manager_views() {
    let mock = Arc::new(
        MockKribApi::new()
            .on(Method::GET, "/api/properties/", json!([]))
            .on(Method::GET, "/api/units/", json!([]))
            .on(Method::GET, "/api/invites/", json!([])),
    );
    let cookie = session_cookie(Role::Manager);
    let response = app(mock)
        .oneshot(get("/invites/new", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Invite Tenant"));
    assert!(body.contains(r#"href="/leases/new""#));
    assert!(!body.contains(r#"href="/units/new""#));
    assert!(!body.contains(r#"href="/properties/new""#));
}

#[tokio::test]
async fn failed_load_is_shown_inline() {
    let mock = Arc::new(MockKribApi::new().fail(
        Method::GET,
        "/api/dashboard/summary/",
        500,
        json!({"detail": "Summary unavailable"}),
    ));
    let cookie = session_cookie(Role::Landlord);
    let response = app(mock)
        .oneshot(get("/dashboard", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains(r#"<p class="error">Summary unavailable</p>"#)
    );
}

#[tokio::test]
async fn password_mismatch_never_reaches_the_api() {
    let mock = Arc::new(MockKribApi::new().on(
        Method::GET,
        "/api/me/",
        json!({"username": "wanjiku", "role": "tenant", "email": "w@example.com"}),
    ));
    let cookie = session_cookie(Role::Tenant);
    let response = app(mock.clone())
        .oneshot(post_form(
            "/profile/password",
            Some(&cookie),
            "old_password=a&new_password=b&confirm_password=c",
        ))
        .await
        .unwrap();

    let body = body_text(response).await;
    assert!(body.contains("Passwords do not match."));
    assert!(body.contains(r#"value="w@example.com""#));
    assert!(
        mock.calls_to(Method::POST, "/api/auth/change-password/")
            .is_empty()
    );
}

#[tokio::test]
async fn property_create_uses_configured_field_names() {
    let mock = Arc::new(
        MockKribApi::new()
            .on(Method::POST, "/api/properties/", json!({"id": 5}))
            .on(Method::GET, "/api/properties/", json!([])),
    );
    let config = PortalConfig {
        property_fields: PropertyFields::TitleAddress,
        ..PortalConfig::default()
    };
    let cookie = session_cookie(Role::Landlord);
    let response = app_with(mock.clone(), config)
        .oneshot(post_form(
            "/properties/new",
            Some(&cookie),
            "name=Palm+Court&location=Kilimani&description=",
        ))
        .await
        .unwrap();

    assert!(body_text(response).await.contains("Property created successfully!"));
    let sent = mock.calls_to(Method::POST, "/api/properties/");
    let body = sent[0].body.clone().unwrap();
    assert_eq!(body["title"], "Palm Court");
    assert_eq!(body["address"], "Kilimani");
}

#[tokio::test]
async fn empty_manager_id_is_rejected_locally() {
    let mock = Arc::new(MockKribApi::new().on(Method::GET, "/api/properties/", json!([])));
    let cookie = session_cookie(Role::Landlord);
    let response = app(mock.clone())
        .oneshot(post_form("/properties/3/manager", Some(&cookie), "manager_id="))
        .await
        .unwrap();

    assert!(body_text(response).await.contains("Please enter a manager user ID"));
    assert!(mock.calls_to(Method::PATCH, "/api/properties/3/").is_empty());
}

#[tokio::test]
async fn non_numeric_property_id_is_rejected_before_the_api() {
    let mock = Arc::new(MockKribApi::new().on(Method::GET, "/api/properties/", json!([])));
    let cookie = session_cookie(Role::Landlord);
    let response = app(mock.clone())
        .oneshot(post_form(
            "/properties/3%2F..%2F..%2Fusers%2F1/manager",
            Some(&cookie),
            "manager_id=9",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn manager_assignment_patches_the_property() {
    let mock = Arc::new(
        MockKribApi::new()
            .on(Method::PATCH, "/api/properties/3/", json!({"id": 3}))
            .on(Method::GET, "/api/properties/", json!([])),
    );
    let cookie = session_cookie(Role::Landlord);
    let response = app(mock.clone())
        .oneshot(post_form("/properties/3/manager", Some(&cookie), "manager_id=9"))
        .await
        .unwrap();

    assert!(body_text(response).await.contains("Manager assigned successfully!"));
    assert_eq!(mock.calls_to(Method::PATCH, "/api/properties/3/").len(), 1);
}

#[tokio::test]
async fn manager_invite_shows_the_link() {
    let mock = Arc::new(MockKribApi::new().on(
        Method::POST,
        "/api/manager-invites/",
        json!({"id": 4, "invite_link": "https://krib.example/accept-invite/abc"}),
    ));
    let cookie = session_cookie(Role::Landlord);
    let response = app(mock.clone())
        .oneshot(post_form(
            "/managers/invite",
            Some(&cookie),
            "email=njeri%40example.com&phone=",
        ))
        .await
        .unwrap();

    let body = body_text(response).await;
    assert!(body.contains("Invite created."));
    assert!(body.contains("<code>https://krib.example/accept-invite/abc</code>"));
    let sent = mock.calls_to(Method::POST, "/api/manager-invites/");
    assert_eq!(sent[0].body.as_ref().unwrap()["email"], "njeri@example.com");
}

#[tokio::test]
async fn manager_invite_without_link_shows_no_placeholder() {
    let mock = Arc::new(MockKribApi::new().on(
        Method::POST,
        "/api/manager-invites/",
        json!({"id": 4}),
    ));
    let cookie = session_cookie(Role::Landlord);
    let response = app(mock)
        .oneshot(post_form("/managers/invite", Some(&cookie), "email=&phone=0712"))
        .await
        .unwrap();

    let body = body_text(response).await;
    assert!(body.contains("Invite created."));
    assert!(!body.contains("Invite link:"));
}

fn tenant_home_mock() -> MockKribApi {
    MockKribApi::new()
        .on(
            Method::GET,
            "/api/dashboard/summary/",
            json!({"active_lease": {"id": 7, "rent_amount": "1500.00"}}),
        )
        .on(Method::GET, "/api/maintenance/", json!([]))
}

#[tokio::test]
async fn stk_push_sends_lease_phone_and_amount() {
    let mock = Arc::new(tenant_home_mock().on(
        Method::POST,
        "/api/payments/stk/initiate/",
        json!({"CheckoutRequestID": "ws_CO_1"}),
    ));
    let cookie = session_cookie(Role::Tenant);
    let response = app(mock.clone())
        .oneshot(post_form(
            "/tenant/pay",
            Some(&cookie),
            "lease_id=7&phone_number=+254712345678+&amount=1500",
        ))
        .await
        .unwrap();

    assert!(
        body_text(response)
            .await
            .contains("Payment request sent. Complete it on your phone.")
    );
    let sent = mock.calls_to(Method::POST, "/api/payments/stk/initiate/");
    assert_eq!(
        sent[0].body,
        Some(json!({"lease_id": "7", "phone_number": "254712345678", "amount": "1500"}))
    );
    assert_eq!(sent[0].bearer.as_deref(), Some("access-token"));
}

#[tokio::test]
async fn invalid_stk_amount_never_reaches_the_api() {
    let mock = Arc::new(tenant_home_mock());
    let cookie = session_cookie(Role::Tenant);
    let response = app(mock.clone())
        .oneshot(post_form(
            "/tenant/pay",
            Some(&cookie),
            "lease_id=7&phone_number=254712345678&amount=0",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Enter a valid amount."));
    assert!(
        mock.calls_to(Method::POST, "/api/payments/stk/initiate/")
            .is_empty()
    );
}

#[tokio::test]
async fn tenant_issue_is_filed_against_the_lease() {
    let mock = Arc::new(tenant_home_mock().on(
        Method::POST,
        "/api/maintenance/",
        json!({"id": 11}),
    ));
    let cookie = session_cookie(Role::Tenant);
    let response = app(mock.clone())
        .oneshot(post_form(
            "/tenant/maintenance",
            Some(&cookie),
            "lease_id=7&issue=Leaking+tap",
        ))
        .await
        .unwrap();

    assert!(body_text(response).await.contains("Maintenance request submitted."));
    let sent = mock.calls_to(Method::POST, "/api/maintenance/");
    assert_eq!(
        sent[0].body,
        Some(json!({"lease_id": "7", "issue": "Leaking tap"}))
    );
}

#[tokio::test]
async fn tenant_maintenance_redirects_home_on_success() {
    let mock = Arc::new(MockKribApi::new().on(Method::POST, "/api/maintenance/", json!({"id": 1})));
    let cookie = session_cookie(Role::Tenant);
    let response = app(mock.clone())
        .oneshot(post_form(
            "/maintenance/new",
            Some(&cookie),
            "property=2&issue=Broken+window",
        ))
        .await
        .unwrap();

    assert_eq!(location(&response), Some("/tenant"));
    let sent = mock.calls_to(Method::POST, "/api/maintenance/");
    assert_eq!(sent[0].body.as_ref().unwrap()["issue"], "Broken window");
}

// --- Public surface ---

#[tokio::test]
async fn session_endpoint_reports_identity_and_links() {
    let mock = Arc::new(MockKribApi::new());
    let router = app(mock);

    let anonymous = router.clone().oneshot(get("/session", None)).await.unwrap();
    let info: Value = serde_json::from_str(&body_text(anonymous).await).unwrap();
    assert_eq!(info["authenticated"], false);
    assert_eq!(info["links"], json!([]));

    let cookie = session_cookie(Role::Tenant);
    let tenant = router.oneshot(get("/session", Some(&cookie))).await.unwrap();
    let info: Value = serde_json::from_str(&body_text(tenant).await).unwrap();
    assert_eq!(info["role"], "tenant");
    assert_eq!(info["home"], "/tenant");
    let paths: Vec<&str> = info["links"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["/tenant", "/maintenance/new", "/profile"]);
}

#[tokio::test]
async fn health_and_request_id() {
    let mock = Arc::new(MockKribApi::new());
    let response = app(mock).oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let health: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn theme_toggle_returns_to_referer() {
    let mock = Arc::new(MockKribApi::new());
    let request = Request::builder()
        .method("POST")
        .uri("/theme")
        .header(header::COOKIE, "krib_theme=dark")
        .header(header::REFERER, "http://localhost:3000/profile")
        .body(Body::empty())
        .unwrap();
    let response = app(mock).oneshot(request).await.unwrap();

    assert_eq!(location(&response), Some("/profile"));
    assert!(set_cookie(&response).unwrap().starts_with("krib_theme=light"));
}

#[tokio::test]
async fn pending_invite_page_is_public() {
    let token = "6f1c2b9e-3a4d-4e5f-8a7b-1c2d3e4f5a6b";
    let mock = Arc::new(MockKribApi::new().on(
        Method::GET,
        &format!("/api/invites/{token}/"),
        json!({"full_name": "Achieng Odhiambo", "status": "PENDING", "otp_required": false}),
    ));
    let response = app(mock)
        .oneshot(get(&format!("/invite/{token}"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Achieng Odhiambo"));
    assert!(body.contains(&format!("/invite/{token}/accept")));
}

#[tokio::test]
async fn unknown_invite_reports_not_found() {
    let mock = Arc::new(MockKribApi::new());
    let response = app(mock)
        .oneshot(get("/invite/6f1c2b9e-3a4d-4e5f-8a7b-1c2d3e4f5a6b", None))
        .await
        .unwrap();
    assert!(body_text(response).await.contains("Invite not found."));
}

#[tokio::test]
async fn accept_sends_otp_only_while_required() {
    let token = "6f1c2b9e-3a4d-4e5f-8a7b-1c2d3e4f5a6b";
    let mock = Arc::new(
        MockKribApi::new()
            .on(
                Method::GET,
                &format!("/api/invites/{token}/"),
                json!({"full_name": "A", "status": "PENDING", "otp_required": true}),
            )
            .on(Method::POST, &format!("/api/invites/{token}/accept/"), Value::Null),
    );
    let response = app(mock.clone())
        .oneshot(post_form(
            &format!("/invite/{token}/accept"),
            None,
            "password=s3cret&otp=123456",
        ))
        .await
        .unwrap();

    assert!(body_text(response).await.contains("Invite accepted! Redirecting to login..."));
    let sent = mock.calls_to(Method::POST, &format!("/api/invites/{token}/accept/"));
    assert_eq!(sent[0].body.as_ref().unwrap()["otp"], "123456");
    assert!(sent[0].bearer.is_none());
}
