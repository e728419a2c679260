use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use futurebox_api::accounts::AccountService;
use futurebox_api::identity::ManualClock;
use futurebox_api::lifecycle::CapsuleService;
use futurebox_api::session::SessionKeys;
use futurebox_api::{AppStateInner, router};
use futurebox_crypto::{ContentSealer, MasterSecret, PasswordPolicy};
use futurebox_db::Database;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 5, 1, 8, 0, 0).unwrap()
}

impl TestApp {
    fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(start()));
        let state = Arc::new(AppStateInner {
            accounts: AccountService::new(db.clone(), PasswordPolicy::new(256, 1).unwrap()).unwrap(),
            capsules: CapsuleService::new(db, ContentSealer::new(MasterSecret::new("test"))),
            sessions: SessionKeys::new("jwt-test", Duration::days(30)),
            clock: clock.clone(),
        });

        Self {
            router: router(state),
            clock,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "email": email, "password": "password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    async fn create(&self, token: &str, content: &str, opens_in: Duration) -> String {
        let open_at = start() + opens_in;
        let (status, body) = self
            .call(
                Method::POST,
                "/capsules",
                Some(token),
                Some(json!({ "title": "For later", "content": content, "open_at": open_at })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let res = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_duplicate() {
    let app = TestApp::new();
    app.register("me@x.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "me@x.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "me@x.com");

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "me@x.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "me@x.com", "password": "nope-nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Email or password does not match");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::new();

    let (status, _) = app.call(Method::GET, "/capsules/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/capsules/mine", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_capsule_lifecycle() {
    let app = TestApp::new();
    let token = app.register("me@x.com").await;
    let id = app.create(&token, "Dear future me", Duration::days(1)).await;
    let open_uri = format!("/capsules/{}/open", id);

    let (status, body) = app.call(Method::POST, &open_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert!(body["error"].as_str().unwrap().contains("sealed"));

    app.clock.advance(Duration::days(1));

    let (status, body) = app.call(Method::POST, &open_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Dear future me");

    let (status, _) = app.call(Method::POST, &open_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(Method::GET, &format!("/capsules/{}/content", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Dear future me");

    let (status, body) = app.call(Method::GET, "/capsules/mine", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["is_opened"], true);
    assert_eq!(body[0]["status"], "opened");
    assert!(body[0].get("content").is_none());

    let (status, _) = app
        .call(Method::DELETE, &format!("/capsules/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call(Method::POST, &open_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn strangers_cannot_open_or_delete() {
    let app = TestApp::new();
    let owner = app.register("owner@x.com").await;
    let stranger = app.register("stranger@x.com").await;
    let id = app.create(&owner, "mine", Duration::hours(1)).await;

    app.clock.advance(Duration::hours(2));

    let (status, _) = app
        .call(Method::POST, &format!("/capsules/{}/open", id), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::DELETE, &format!("/capsules/{}", id), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_rejects_past_open_time() {
    let app = TestApp::new();
    let token = app.register("me@x.com").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/capsules",
            Some(&token),
            Some(json!({ "title": "t", "content": "c", "open_at": start() - Duration::minutes(1) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_feed_masks_and_excludes_viewer() {
    let app = TestApp::new();
    let me = app.register("viewer@x.com").await;
    let other = app.register("someone@x.com").await;
    app.create(&me, "mine", Duration::days(1)).await;
    let theirs = app.create(&other, "theirs", Duration::days(1)).await;

    let (status, body) = app
        .call(Method::GET, "/capsules/public?page=1", Some(&me), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["page_count"], 1);
    assert_eq!(body["items"][0]["id"], theirs.as_str());
    assert_eq!(body["items"][0]["owner"], "so*****@x.com");
    assert!(body["items"][0].get("title").is_none());

    let (status, body) = app.call(Method::GET, "/capsules/public", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 1);

    let (status, _) = app
        .call(Method::GET, "/capsules/public", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/capsules/public?page=0", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_input_gets_a_json_validation_error() {
    let app = TestApp::new();

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "me@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("password"));

    let token = app.register("me@x.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/capsules",
            Some(&token),
            Some(json!({ "content": "c", "open_at": start() + Duration::days(1) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app
        .call(
            Method::POST,
            "/capsules",
            Some(&token),
            Some(json!({ "title": "t", "content": "c", "open_at": "next tuesday" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app
        .call(Method::GET, "/capsules/public?page=abc", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app
        .call(Method::POST, "/capsules/not-a-uuid/open", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
