use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION},
};
use entities::{Role, User};
use http_body_util::BodyExt;
use incident_store::{MemoryIncidentStore, UserStore};
use notifier::RecordingNotifier;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::{AuthMode, Config};
use crate::state::SharedState;
use crate::{bootstrap_admin, create_app, create_state};

const SECRET: &str = "router-test-secret-long-enough";

fn test_config(auth_mode: AuthMode) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: None,
        auth_mode,
        jwt_secret: Some(SECRET.to_string()),
        jwt_issuer: auth::DEFAULT_JWT_ISSUER.to_string(),
        jwt_expiration_hours: 1,
        webhook_url: None,
        bootstrap_admin_email: Some("Root@Example.com".to_string()),
        log_level: "debug".to_string(),
        log_json: false,
    }
}

struct TestServer {
    app: Router,
    state: SharedState<MemoryIncidentStore>,
    notifier: RecordingNotifier,
    admin: User,
}

impl TestServer {
    async fn new(auth_mode: AuthMode) -> Self {
        let notifier = RecordingNotifier::new();
        let state = create_state(
            test_config(auth_mode),
            MemoryIncidentStore::new(),
            Arc::new(notifier.clone()),
        )
        .unwrap();
        let admin = bootstrap_admin(&state).await.unwrap().unwrap();

        Self {
            app: create_app(state.clone()),
            state,
            notifier,
            admin,
        }
    }

    async fn add_user(&self, email: &str, role: Role) -> User {
        self.state
            .store()
            .create_user(User::new(email, role))
            .await
            .unwrap()
    }

    async fn call(&self, as_user: &User, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-user-id", as_user.id.to_string())
            .body(Body::from(body.to_string()))
            .unwrap();
        send(&self.app, request).await
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

#[tokio::test]
async fn test_health_is_public() {
    let server = TestServer::new(AuthMode::Header).await;
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_or_unknown_caller_is_unauthorized() {
    let server = TestServer::new(AuthMode::Header).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/incident/list")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    let stranger = User::new("ghost@example.com", Role::Admin);
    let (status, _) = server.call(&stranger, "/api/incident/list", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bootstrap_admin_is_idempotent() {
    let server = TestServer::new(AuthMode::Header).await;
    assert_eq!(server.admin.email, "root@example.com");
    assert_eq!(server.admin.role, Role::Admin);

    let again = bootstrap_admin(&server.state).await.unwrap().unwrap();
    assert_eq!(again.id, server.admin.id);
}

#[tokio::test]
async fn test_incident_lifecycle_over_http() {
    let server = TestServer::new(AuthMode::Header).await;
    let alice = server.add_user("alice@example.com", Role::Reporter).await;
    let bob = server.add_user("bob@example.com", Role::Technician).await;

    let (status, body) = server
        .call(
            &alice,
            "/api/incident/create",
            json!({"title": "Disk full", "description": "/var at 100% on db-1"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["incident"]["status"], "open");
    let incident_id = body["incident"]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .call(
            &server.admin,
            "/api/incident/assign",
            json!({"incident_id": incident_id, "technician_id": bob.id.to_string()}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["incident"]["status"], "assigned");
    assert_eq!(body["incident"]["technician_id"], bob.id.to_string());

    let (status, body) = server
        .call(
            &bob,
            "/api/incident/resolve",
            json!({"incident_id": incident_id, "resolution_notes": "replaced disk"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["incident"]["status"], "resolved");
    assert_eq!(body["incident"]["resolution_notes"], "replaced disk");

    let (status, body) = server
        .call(&alice, "/api/incident/get", json!({"incident_id": incident_id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["incident"]["reporter_id"], alice.id.to_string());

    server.state.controller.dispatcher().flush().await;
    assert_eq!(server.notifier.sent().await.len(), 4);
}

#[tokio::test]
async fn test_error_status_mapping() {
    let server = TestServer::new(AuthMode::Header).await;
    let alice = server.add_user("alice@example.com", Role::Reporter).await;
    let bob = server.add_user("bob@example.com", Role::Technician).await;

    let (_, body) = server
        .call(
            &alice,
            "/api/incident/create",
            json!({"title": "Printer jam", "description": "Tray 2"}),
        )
        .await;
    let incident_id = body["incident"]["id"].as_str().unwrap().to_string();

    // Reporter cannot assign.
    let (status, body) = server
        .call(
            &alice,
            "/api/incident/assign",
            json!({"incident_id": incident_id, "technician_id": bob.id.to_string()}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "PERMISSION_DENIED");

    // Resolve before assignment.
    let (status, body) = server
        .call(
            &server.admin,
            "/api/incident/resolve",
            json!({"incident_id": incident_id, "resolution_notes": "fixed"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
    assert_eq!(body["error"]["retryable"], false);

    // Assign to a reporter.
    let (status, body) = server
        .call(
            &server.admin,
            "/api/incident/assign",
            json!({"incident_id": incident_id, "technician_id": alice.id.to_string()}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "ROLE_MISMATCH");

    // Malformed id.
    let (status, body) = server
        .call(&server.admin, "/api/incident/get", json!({"incident_id": "42"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    // Unknown id.
    let (status, body) = server
        .call(
            &server.admin,
            "/api/incident/get",
            json!({"incident_id": uuid::Uuid::new_v4().to_string()}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    // Empty notes on an assigned incident.
    server
        .call(
            &server.admin,
            "/api/incident/assign",
            json!({"incident_id": incident_id, "technician_id": bob.id.to_string()}),
        )
        .await;
    let (status, _) = server
        .call(
            &server.admin,
            "/api/incident/resolve",
            json!({"incident_id": incident_id, "resolution_notes": ""}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = server
        .call(&bob, "/api/incident/get", json!({"incident_id": incident_id}))
        .await;
    assert_eq!(body["incident"]["status"], "assigned");
}

#[tokio::test]
async fn test_list_is_scoped_to_caller() {
    let server = TestServer::new(AuthMode::Header).await;
    let alice = server.add_user("alice@example.com", Role::Reporter).await;
    let dave = server.add_user("dave@example.com", Role::Reporter).await;

    for (user, title) in [(&alice, "A1"), (&alice, "A2"), (&dave, "D1")] {
        server
            .call(
                user,
                "/api/incident/create",
                json!({"title": title, "description": "details"}),
            )
            .await;
    }

    let (status, body) = server.call(&alice, "/api/incident/list", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);

    let (_, body) = server
        .call(
            &dave,
            "/api/incident/list",
            json!({"reporter_id": alice.id.to_string()}),
        )
        .await;
    assert_eq!(body["total_count"], 1);

    let (_, body) = server
        .call(&server.admin, "/api/incident/list", json!({"limit": 2}))
        .await;
    assert_eq!(body["total_count"], 3);
    assert_eq!(body["incidents"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_management_is_admin_only() {
    let server = TestServer::new(AuthMode::Header).await;
    let alice = server.add_user("alice@example.com", Role::Reporter).await;

    let (status, _) = server
        .call(
            &alice,
            "/api/user/create",
            json!({"email": "eve@example.com", "role": "admin"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .call(
            &server.admin,
            "/api/user/create",
            json!({"email": "bob@example.com", "name": "Bob", "role": "technician"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "technician");
    assert!(body.get("access_token").is_none());

    let (status, body) = server
        .call(
            &server.admin,
            "/api/user/create",
            json!({"email": "bob@example.com", "role": "technician"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_EXISTS");

    let (_, body) = server
        .call(&server.admin, "/api/user/list", json!({"role": "technician"}))
        .await;
    assert_eq!(body["total_count"], 1);

    let (status, _) = server.call(&alice, "/api/user/list", json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .call(
            &alice,
            "/api/user/get",
            json!({"user_id": server.admin.id.to_string()}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .call(&alice, "/api/user/get", json!({"user_id": alice.id.to_string()}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_jwt_mode() {
    let server = TestServer::new(AuthMode::Jwt).await;

    let manager = server.state.jwt_manager.as_ref().unwrap();
    let token = manager.generate_token(&server.admin).unwrap();

    let me = |auth: Option<String>| {
        let mut builder = Request::builder().uri("/api/user/me");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    };

    let (status, body) = send(&server.app, me(Some(format!("Bearer {token}")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], server.admin.id.to_string());

    let (status, _) = send(&server.app, me(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&server.app, me(Some("Bearer not-a-jwt".to_string()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The header is ignored in JWT mode.
    let request = Request::builder()
        .uri("/api/user/me")
        .header("x-user-id", server.admin.id.to_string())
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Created users come back with a token that works.
    let request = Request::builder()
        .method("POST")
        .uri("/api/user/create")
        .header("content-type", "application/json")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(
            json!({"email": "bob@example.com", "role": "technician"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::OK);
    let bob_token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) = send(&server.app, me(Some(format!("Bearer {bob_token}")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "bob@example.com");
}

fn bearer_post(token: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_token_renewal() {
    let server = TestServer::new(AuthMode::Jwt).await;
    let manager = server.state.jwt_manager.as_ref().unwrap();
    let admin_token = manager.generate_token(&server.admin).unwrap();
    let bob = server.add_user("bob@example.com", Role::Technician).await;
    let bob_token = manager.generate_token(&bob).unwrap();

    // A second create is still rejected; renewal goes through the token route.
    let create = json!({"email": "bob@example.com", "role": "technician"});
    let (status, body) = send(
        &server.app,
        bearer_post(&admin_token, "/api/user/create", create),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_EXISTS");

    let (status, body) = send(
        &server.app,
        bearer_post(&bob_token, "/api/user/token", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], bob.id.to_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    let renewed = body["access_token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri("/api/user/me")
        .header(AUTHORIZATION, format!("Bearer {renewed}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "bob@example.com");

    // Only admins issue tokens for someone else.
    let for_admin = json!({"user_id": server.admin.id.to_string()});
    let (status, _) = send(
        &server.app,
        bearer_post(&bob_token, "/api/user/token", for_admin),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let for_bob = json!({"user_id": bob.id.to_string()});
    let (status, body) = send(
        &server.app,
        bearer_post(&admin_token, "/api/user/token", for_bob),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let issued = body["access_token"].as_str().unwrap();
    assert_eq!(
        manager.validate_token(issued).unwrap().user_id().unwrap(),
        bob.id
    );

    let unknown = json!({"user_id": uuid::Uuid::new_v4().to_string()});
    let (status, _) = send(
        &server.app,
        bearer_post(&admin_token, "/api/user/token", unknown),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&server.app, bearer_post("", "/api/user/token", json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_route_requires_jwt_mode() {
    let server = TestServer::new(AuthMode::Header).await;
    let (status, body) = server
        .call(&server.admin, "/api/user/token", json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}
