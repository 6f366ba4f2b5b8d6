/// Account and session integration tests
///
/// Registration, login, token revocation, profile updates and cascading
/// account deletion, driven through the full router.

mod common;

use axum::http::{header, Method, Request, StatusCode};
use axum::body::Body;
use common::{wait_for, TestContext};
use serde_json::json;
use std::time::{Duration, Instant};
use tasktrack_shared::id::ObjectId;
use tasktrack_shared::store::{TaskStore, UserStore};

#[tokio::test]
async fn test_register_returns_redacted_user_and_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post(
            "/users",
            None,
            json!({ "name": "  Ann ", "email": " Ann@X.com ", "password": "secret1", "age": 30 }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let user = &body["user"];
    assert_eq!(user["name"], "Ann");
    assert_eq!(user["email"], "ann@x.com");
    assert_eq!(user["age"], 30);
    assert_eq!(user["_id"].as_str().unwrap().len(), 24);
    assert!(user["createdAt"].is_string());
    assert!(user["updatedAt"].is_string());

    let keys: Vec<&String> = user.as_object().unwrap().keys().collect();
    for hidden in ["password", "passwordHash", "password_hash", "tokens", "avatar"] {
        assert!(!keys.iter().any(|k| k.as_str() == hidden), "{} leaked", hidden);
    }

    let token = body["token"].as_str().unwrap();
    let (status, me) = ctx.get("/users/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["_id"], user["_id"]);
}

#[tokio::test]
async fn test_register_defaults_age_and_stores_hash() {
    let ctx = TestContext::new();
    let ann = ctx.register("Ann", "ann@x.com", "secret1").await;

    let (_, me) = ctx.get("/users/me", &ann.token).await;
    assert_eq!(me["age"], 0);

    let stored = ctx.store.find_user_by_email("ann@x.com").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "secret1");
    assert!(stored.password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_register_sends_welcome_email() {
    let ctx = TestContext::new();
    ctx.register("Ann", "ann@x.com", "secret1").await;

    let mailer = ctx.mailer.clone();
    wait_for(move || !mailer.subjects_for("ann@x.com").is_empty(), 5)
        .await
        .unwrap();
    assert_eq!(ctx.mailer.subjects_for("ann@x.com"), vec!["Thanks for joining in!"]);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let ctx = TestContext::new();

    let cases = [
        (json!({ "email": "ann@x.com", "password": "secret1" }), "name"),
        (json!({ "name": "Ann", "email": "not-an-email", "password": "secret1" }), "email"),
        (json!({ "name": "Ann", "email": "ann@x.com", "password": "abc" }), "password"),
        (json!({ "name": "Ann", "email": "ann@x.com", "password": "mypassword1" }), "password"),
        (json!({ "name": "Ann", "email": "ann@x.com" }), "password"),
        (json!({ "name": "Ann", "email": "ann@x.com", "password": "secret1", "age": -1 }), "age"),
    ];

    for (payload, field) in cases {
        let (status, body) = ctx.post("/users", None, payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
        assert_eq!(body["error"], "validation_error");

        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&field), "expected {} in {:?}", field, fields);
    }

    assert!(ctx.store.find_user_by_email("ann@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let ctx = TestContext::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = ctx.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_email_is_400() {
    let ctx = TestContext::new();
    ctx.register("Ann", "ann@x.com", "secret1").await;

    let (status, body) = ctx
        .post(
            "/users",
            None,
            json!({ "name": "Other Ann", "email": "ANN@x.com", "password": "secret2" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_login_issues_working_token() {
    let ctx = TestContext::new();
    let ann = ctx.register("Ann", "ann@x.com", "secret1").await;

    let (status, body) = ctx
        .post(
            "/users/login",
            None,
            json!({ "email": "Ann@X.com", "password": "secret1" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["_id"], ann.id.as_str());

    let token = body["token"].as_str().unwrap();
    assert_ne!(token, ann.token);

    let (status, _) = ctx.get("/users/me", token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let ctx = TestContext::new();
    ctx.register("Ann", "ann@x.com", "secret1").await;

    let wrong_password = ctx
        .post(
            "/users/login",
            None,
            json!({ "email": "ann@x.com", "password": "secret2" }),
        )
        .await;
    let unknown_email = ctx
        .post(
            "/users/login",
            None,
            json!({ "email": "bob@x.com", "password": "secret1" }),
        )
        .await;

    assert_eq!(wrong_password.0, StatusCode::NOT_FOUND);
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn test_login_failures_take_comparable_time() {
    let ctx = TestContext::new();
    ctx.register("Ann", "ann@x.com", "secret1").await;

    let ctx = &ctx;
    let attempt = move |email: &'static str| async move {
        let start = Instant::now();
        let (status, _) = ctx
            .post("/users/login", None, json!({ "email": email, "password": "secret2" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        start.elapsed()
    };

    // First unknown-email login builds the shared dummy hash.
    attempt("bob@x.com").await;

    let mut unknown = Duration::MAX;
    let mut wrong = Duration::MAX;
    for _ in 0..3 {
        unknown = unknown.min(attempt("bob@x.com").await);
        wrong = wrong.min(attempt("ann@x.com").await);
    }

    assert!(
        unknown * 4 >= wrong,
        "unknown email {:?} vs wrong password {:?}",
        unknown,
        wrong
    );
}

#[tokio::test]
async fn test_logout_revokes_only_the_presented_token() {
    let ctx = TestContext::new();
    let ann = ctx.register("Ann", "ann@x.com", "secret1").await;

    let (_, body) = ctx
        .post("/users/login", None, json!({ "email": "ann@x.com", "password": "secret1" }))
        .await;
    let second = body["token"].as_str().unwrap().to_string();

    let (status, _) = ctx.post("/users/logout", Some(&ann.token), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.get("/users/me", &ann.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.get("/users/me", &second).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_all_revokes_every_token() {
    let ctx = TestContext::new();
    let ann = ctx.register("Ann", "ann@x.com", "secret1").await;

    let (_, body) = ctx
        .post("/users/login", None, json!({ "email": "ann@x.com", "password": "secret1" }))
        .await;
    let second = body["token"].as_str().unwrap().to_string();

    let (status, _) = ctx.post("/users/logoutAll", Some(&second), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    for token in [&ann.token, &second] {
        let (status, _) = ctx.get("/users/me", token).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let id = ObjectId::parse(&ann.id).unwrap();
    assert!(ctx.store.list_tokens(&id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let ctx = TestContext::new();
    ctx.register("Ann", "ann@x.com", "secret1").await;

    let (status, _) = ctx.call(Method::GET, "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.get("/users/me", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/tasks")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    assert_eq!(ctx.send(request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_profile() {
    let ctx = TestContext::new();
    let ann = ctx.register("Ann", "ann@x.com", "secret1").await;

    let (status, body) = ctx
        .patch(
            "/users/me",
            &ann.token,
            json!({ "name": "Annie", "age": 31, "password": "newsecret" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Annie");
    assert_eq!(body["age"], 31);
    assert_eq!(body["email"], "ann@x.com");

    let (status, _) = ctx
        .post("/users/login", None, json!({ "email": "ann@x.com", "password": "secret1" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .post("/users/login", None, json!({ "email": "ann@x.com", "password": "newsecret" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile_rejects_unknown_keys_without_changes() {
    let ctx = TestContext::new();
    let ann = ctx.register("Ann", "ann@x.com", "secret1").await;

    let (status, body) = ctx
        .patch("/users/me", &ann.token, json!({ "name": "Mallory", "tokens": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "tokens");

    let (_, me) = ctx.get("/users/me", &ann.token).await;
    assert_eq!(me["name"], "Ann");
}

#[tokio::test]
async fn test_update_profile_validates_fields() {
    let ctx = TestContext::new();
    let ann = ctx.register("Ann", "ann@x.com", "secret1").await;
    ctx.register("Bob", "bob@x.com", "secret1").await;

    let (status, _) = ctx
        .patch("/users/me", &ann.token, json!({ "password": "password123" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx.patch("/users/me", &ann.token, json!({ "age": -5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx
        .patch("/users/me", &ann.token, json!({ "email": "BOB@x.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "conflict");

    let (_, me) = ctx.get("/users/me", &ann.token).await;
    assert_eq!(me["email"], "ann@x.com");
    assert_eq!(me["age"], 0);
}

#[tokio::test]
async fn test_delete_account_cascades_to_tasks() {
    let ctx = TestContext::new();
    let ann = ctx.register("Ann", "ann@x.com", "secret1").await;
    let bob = ctx.register("Bob", "bob@x.com", "secret1").await;

    let task = ctx.create_task(&ann.token, "buy milk", false).await;
    assert_eq!(task["owner"], ann.id.as_str());
    assert_eq!(task["completed"], false);
    ctx.create_task(&ann.token, "walk dog", true).await;
    ctx.create_task(&bob.token, "bob's task", false).await;

    let (status, list) = ctx.get("/tasks", &ann.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["_id"] == task["_id"]));

    let (status, deleted) = ctx.delete("/users/me", &ann.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["_id"], ann.id.as_str());

    let task_uri = format!("/tasks/{}", task["_id"].as_str().unwrap());
    let (status, _) = ctx.get(&task_uri, &ann.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ann_id = ObjectId::parse(&ann.id).unwrap();
    assert!(ctx.store.find_user(&ann_id).await.unwrap().is_none());
    assert!(ctx
        .store
        .list_tasks(&ann_id, &Default::default())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(ctx.store.task_count().await, 1);

    let mailer = ctx.mailer.clone();
    wait_for(
        move || {
            mailer
                .subjects_for("ann@x.com")
                .contains(&"Sorry to see you go".to_string())
        },
        5,
    )
    .await
    .unwrap();

    let (status, _) = ctx.get("/tasks", &bob.token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let (status, body) = ctx.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}
