use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use catering_portal::{
    AppState, InMemoryRepository, SessionStore, create_router,
    config::{AdminSeed, AppConfig},
    models::{NewUser, Role},
    repository::RepositoryState,
    seed,
    session::SESSION_COOKIE,
};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: AppState,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    /// Token from the `Set-Cookie` header naming the session cookie, if any.
    fn session_token(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookie| {
                let (pair, _) = cookie.split_once(';').unwrap_or((cookie, ""));
                let (name, value) = pair.split_once('=')?;
                (name.trim() == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
            })
    }
}

fn spawn_app() -> TestApp {
    let state = AppState {
        repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
        sessions: SessionStore::new(Duration::from_secs(3600)),
        config: AppConfig::default(),
    };
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Creates a user directly in the repository and opens a session for it.
    async fn session_for(&self, username: &str, role: Role) -> (i32, String) {
        let user = self
            .state
            .repo
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password: "not-a-real-hash".to_string(),
                role,
                phone: None,
            })
            .await
            .unwrap();
        (user.id, self.state.sessions.create(user.id))
    }

    async fn create_event(&self, admin: &str) -> i64 {
        let res = self
            .send(
                Method::POST,
                "/api/events",
                Some(admin),
                Some(json!({
                    "title": "Corporate Lunch",
                    "description": "Weekday buffet",
                    "category": "corporate",
                    "menuOptions": ["buffet", "boxed"],
                    "minGuests": 10,
                    "maxGuests": 200
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        res.body["id"].as_i64().unwrap()
    }

    async fn create_dish(&self, admin: &str, event_id: i64, name: &str, price: i64) -> i64 {
        let res = self
            .send(
                Method::POST,
                "/api/dishes",
                Some(admin),
                Some(json!({
                    "name": name,
                    "price": price,
                    "category": "main",
                    "eventId": event_id
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        res.body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app();
    let res = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = spawn_app();
    let res = app.send(Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["paths"]["/api/orders/{id}/status"].is_object());
    assert!(res.body["components"]["schemas"]["Order"].is_object());
}

#[tokio::test]
async fn test_register_session_and_logout_flow() {
    let app = spawn_app();

    let res = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "secret123"
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["role"], "client");
    assert!(res.body.get("password").is_none());

    let cookie = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    let token = res.session_token().unwrap();

    let me = app.send(Method::GET, "/api/user", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "alice");

    let out = app.send(Method::POST, "/api/logout", Some(&token), None).await;
    assert_eq!(out.status, StatusCode::NO_CONTENT);

    let after = app.send(Method::GET, "/api/user", Some(&token), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["message"], "not authenticated");
}

#[tokio::test]
async fn test_login_with_seeded_admin() {
    let app = spawn_app();
    seed::ensure_admin(
        &app.state.repo,
        &AdminSeed {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "changeme".into(),
        },
    )
    .await
    .unwrap();

    let wrong = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "root", "password": "letmein" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert!(wrong.session_token().is_none());

    let unknown = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "nobody", "password": "changeme" })),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);

    let ok = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "root", "password": "changeme" })),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["role"], "admin");

    let token = ok.session_token().unwrap();
    let stats = app.send(Method::GET, "/api/admin/stats", Some(&token), None).await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["totalUsers"], 1);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = spawn_app();

    for (method, uri) in [
        (Method::GET, "/api/user"),
        (Method::GET, "/api/orders"),
        (Method::POST, "/api/events"),
        (Method::GET, "/api/users"),
        (Method::DELETE, "/api/orders/1"),
    ] {
        let res = app.send(method, uri, None, Some(json!({}))).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_admin_routes_forbid_clients() {
    let app = spawn_app();
    let (_, client) = app.session_for("alice", Role::Client).await;

    for (method, uri) in [
        (Method::POST, "/api/events"),
        (Method::PUT, "/api/events/1"),
        (Method::DELETE, "/api/dishes/1"),
        (Method::GET, "/api/users"),
        (Method::GET, "/api/admin/stats"),
    ] {
        let res = app.send(method, uri, Some(&client), Some(json!({}))).await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "{uri}");
    }

    // Public reads on the same paths stay open.
    let res = app.send(Method::GET, "/api/events", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_event_crud_contract() {
    let app = spawn_app();
    let (_, admin) = app.session_for("root", Role::Admin).await;

    let id = app.create_event(&admin).await;
    let uri = format!("/api/events/{id}");

    let read = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.body["title"], "Corporate Lunch");
    assert_eq!(read.body["status"], "active");
    assert_eq!(read.body["menuOptions"], json!(["buffet", "boxed"]));
    assert_eq!(read.body["minGuests"], 10);

    let updated = app
        .send(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "status": "inactive", "maxGuests": 150 })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["status"], "inactive");
    assert_eq!(updated.body["maxGuests"], 150);
    assert_eq!(updated.body["title"], "Corporate Lunch");

    let filtered = app
        .send(Method::GET, "/api/events?status=active", None, None)
        .await;
    assert_eq!(filtered.body, json!([]));

    let deleted = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["message"], "not found");
}

#[tokio::test]
async fn test_invalid_payloads_are_400() {
    let app = spawn_app();
    let (_, admin) = app.session_for("root", Role::Admin).await;

    // Missing required fields.
    let res = app
        .send(Method::POST, "/api/events", Some(&admin), Some(json!({ "title": "x" })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["message"].is_string());

    // Unknown enum value.
    let res = app
        .send(
            Method::POST,
            "/api/events",
            Some(&admin),
            Some(json!({
                "title": "Gala",
                "category": "gala",
                "status": "archived",
                "minGuests": 1,
                "maxGuests": 2
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Negative price.
    let event_id = app.create_event(&admin).await;
    let res = app
        .send(
            Method::POST,
            "/api/dishes",
            Some(&admin),
            Some(json!({ "name": "Soup", "price": -1, "category": "starter", "eventId": event_id })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Non-numeric id.
    let res = app.send(Method::GET, "/api/events/abc", None, None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // Short password on sign-up.
    let res = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "username": "bob", "email": "bob@example.com", "password": "123" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_flow_over_http() {
    let app = spawn_app();
    let (_, admin) = app.session_for("root", Role::Admin).await;
    let (alice_id, alice) = app.session_for("alice", Role::Client).await;
    let (_, bob) = app.session_for("bob", Role::Client).await;

    let event_id = app.create_event(&admin).await;
    let soup = app.create_dish(&admin, event_id, "Soup", 450).await;
    let steak = app.create_dish(&admin, event_id, "Steak", 2100).await;

    let menu = app
        .send(Method::GET, &format!("/api/events/{event_id}/menu"), None, None)
        .await;
    assert_eq!(menu.body.as_array().unwrap().len(), 2);

    let placed = app
        .send(
            Method::POST,
            "/api/orders",
            Some(&alice),
            Some(json!({
                "eventId": event_id,
                "date": "2026-09-01",
                "guestCount": 25,
                "menuSelection": [soup, steak],
                "notes": "two vegetarians"
            })),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);
    assert_eq!(placed.body["totalAmount"], 25 * (450 + 2100));
    assert_eq!(placed.body["status"], "pending");
    assert_eq!(placed.body["userId"], alice_id);
    let order_uri = format!("/api/orders/{}", placed.body["id"]);

    // Other clients cannot see it.
    let peek = app.send(Method::GET, &order_uri, Some(&bob), None).await;
    assert_eq!(peek.status, StatusCode::NOT_FOUND);
    let bobs = app.send(Method::GET, "/api/orders", Some(&bob), None).await;
    assert_eq!(bobs.body, json!([]));

    // Clients cannot confirm.
    let status_uri = format!("{order_uri}/status");
    let res = app
        .send(Method::PATCH, &status_uri, Some(&alice), Some(json!({ "status": "confirmed" })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .send(Method::PATCH, &status_uri, Some(&admin), Some(json!({ "status": "confirmed" })))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "confirmed");

    // Confirmed orders are no longer cancellable by the client.
    let res = app
        .send(Method::PATCH, &status_uri, Some(&alice), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .send(Method::PATCH, &status_uri, Some(&admin), Some(json!({ "status": "pending" })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    // The event cannot be removed while the order exists.
    let res = app
        .send(Method::DELETE, &format!("/api/events/{event_id}"), Some(&admin), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = app.send(Method::DELETE, &order_uri, Some(&admin), None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    let res = app.send(Method::GET, &order_uri, Some(&admin), None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_management_contract() {
    let app = spawn_app();
    let (admin_id, admin) = app.session_for("root", Role::Admin).await;

    let created = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({
                "username": "chef",
                "email": "chef@example.com",
                "password": "kitchen1",
                "role": "admin"
            })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["role"], "admin");
    let uri = format!("/api/users/{}", created.body["id"]);

    let duplicate = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({ "username": "chef", "email": "other@example.com", "password": "kitchen1" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    let demoted = app
        .send(Method::PUT, &uri, Some(&admin), Some(json!({ "role": "client", "phone": "555-0100" })))
        .await;
    assert_eq!(demoted.status, StatusCode::OK);
    assert_eq!(demoted.body["role"], "client");
    assert_eq!(demoted.body["phone"], "555-0100");

    let listed = app.send(Method::GET, "/api/users", Some(&admin), None).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 2);

    let own = app
        .send(Method::DELETE, &format!("/api/users/{admin_id}"), Some(&admin), None)
        .await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);

    let deleted = app.send(Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let gone = app.send(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let app = spawn_app();
    let res = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "username": "dana", "email": "dana@example.com", "password": "first-pass" })),
        )
        .await;
    let old_token = res.session_token().unwrap();

    let denied = app
        .send(Method::PATCH, "/api/user", Some(&old_token), Some(json!({ "role": "admin" })))
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let changed = app
        .send(
            Method::PATCH,
            "/api/user",
            Some(&old_token),
            Some(json!({ "email": "dana@new.example.com", "password": "second-pass" })),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);
    assert_eq!(changed.body["email"], "dana@new.example.com");
    let new_token = changed.session_token().unwrap();

    let stale = app.send(Method::GET, "/api/user", Some(&old_token), None).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    let fresh = app.send(Method::GET, "/api/user", Some(&new_token), None).await;
    assert_eq!(fresh.status, StatusCode::OK);

    let login = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "dana", "password": "second-pass" })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}
