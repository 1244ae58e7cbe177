#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::Engine;
use cine_bot::{
    backend::Backend, config::BotSettings, database::Database, messenger::Messenger,
    proofs::ProofStorage, web,
};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use teloxide::{
    types::{ChatId, MessageId, UserId},
    RequestError,
};
use tower::ServiceExt;
use url::Url;

const ADMIN: u64 = 1;
const CHANNEL: ChatId = ChatId(-1000);

/// Remembers deliveries as `(to, message_id, protect)`.
#[derive(Default)]
struct FakeMessenger {
    deliveries: Mutex<Vec<(ChatId, MessageId, bool)>>,
}

impl Messenger for FakeMessenger {
    fn send_text(&self, _to: ChatId, _text: String) -> BoxFuture<'_, Result<(), RequestError>> {
        Box::pin(async { Ok(()) })
    }

    fn deliver(
        &self,
        to: ChatId,
        _from_chat: ChatId,
        message_id: MessageId,
        protect: bool,
    ) -> BoxFuture<'_, Result<(), RequestError>> {
        self.deliveries
            .lock()
            .unwrap()
            .push((to, message_id, protect));
        Box::pin(async { Ok(()) })
    }
}

struct Panel {
    app: Router,
    messenger: Arc<FakeMessenger>,
    _dir: tempfile::TempDir,
}

async fn panel() -> Panel {
    let dir = tempfile::tempdir().unwrap();
    let proofs_dir = dir.path().join("proofs");
    let webapp_dir = dir.path().join("webapp");
    std::fs::create_dir_all(&webapp_dir).unwrap();
    std::fs::write(webapp_dir.join("index.html"), "<html>CineBot panel</html>").unwrap();

    let messenger = Arc::new(FakeMessenger::default());
    let backend = Backend::new(
        Database::in_memory().await.unwrap(),
        ProofStorage::new(&proofs_dir, "https://panel.test/proofs"),
        messenger.clone(),
        BotSettings {
            channel_id: CHANNEL,
            admins: vec![UserId(ADMIN)],
            panel_url: Url::parse("https://panel.test").unwrap(),
            payment_details: String::new(),
        },
    );

    Panel {
        app: web::router(backend, &proofs_dir, &webapp_dir),
        messenger,
        _dir: dir,
    }
}

impl Panel {
    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = self
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn post_raw(&self, uri: &str, body: String) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    /// Submit and approve a payment, returning the approval response.
    async fn subscribe(&self, user: u64, plan: &str) -> Value {
        let (status, submitted) = self
            .post(
                "/api/submit-payment",
                json!({"telegram_id": user, "plan": plan, "image": "aGVsbG8="}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, approved) = self
            .post(
                "/api/approve-request",
                json!({"admin_id": ADMIN, "request_id": submitted["request_id"]}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{approved}");
        approved
    }
}

#[tokio::test]
async fn unknown_user_is_inactive() {
    let panel = panel().await;
    let (status, body) = panel
        .post("/api/user-status", json!({"telegram_id": 555}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], false);
    assert_eq!(body["active"], false);
    assert_eq!(body["is_admin"], false);

    let (_, body) = panel
        .post("/api/user-status", json!({"telegram_id": ADMIN}))
        .await;
    assert_eq!(body["is_admin"], true);
}

#[tokio::test]
async fn payment_lifecycle() {
    let panel = panel().await;

    let (status, submitted) = panel
        .post(
            "/api/submit-payment",
            json!({
                "telegram_id": 111,
                "plan": "premium",
                "method": "transfer",
                "image": "data:image/jpeg;base64,aGVsbG8=",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(submitted["status"], "pending");
    let request_id = submitted["request_id"].as_i64().unwrap();

    let (status, pending) = panel
        .post("/api/pending-requests", json!({"admin_id": ADMIN}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["user_id"], 111);
    assert_eq!(pending[0]["plan"], "premium");

    // The proof is served where its URL says.
    let proof_url = pending[0]["proof_url"].as_str().unwrap();
    let path = proof_url.strip_prefix("https://panel.test").unwrap();
    let (status, proof) = panel.get(path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proof, b"hello");

    let (status, approved) = panel
        .post(
            "/api/approve-request",
            json!({"admin_id": ADMIN, "request_id": request_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert!(approved["expires_at"].is_string());

    let (_, user) = panel
        .post("/api/user-status", json!({"telegram_id": 111}))
        .await;
    assert_eq!(user["active"], true);
    assert_eq!(user["plan"], "premium");
    assert_eq!(user["expires_at"], approved["expires_at"]);

    let (status, again) = panel
        .post(
            "/api/reject-request",
            json!({"admin_id": ADMIN, "request_id": request_id, "reason": "late"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["error"], "conflict");

    let (_, pending) = panel
        .post("/api/pending-requests", json!({"admin_id": ADMIN}))
        .await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rejection_leaves_user_inactive() {
    let panel = panel().await;
    let (_, submitted) = panel
        .post(
            "/api/submit-payment",
            json!({"telegram_id": 7, "plan": "clasico", "image": "aGVsbG8="}),
        )
        .await;

    let (status, rejected) = panel
        .post(
            "/api/reject-request",
            json!({"admin_id": ADMIN, "request_id": submitted["request_id"], "reason": "blurry"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");
    assert!(rejected.get("expires_at").is_none());

    let (_, user) = panel.post("/api/user-status", json!({"telegram_id": 7})).await;
    assert_eq!(user["exists"], false);
}

#[tokio::test]
async fn full_size_screenshots_are_accepted() {
    let panel = panel().await;
    let image = vec![0xAB_u8; 5 * 1024 * 1024];

    let (status, submitted) = panel
        .post(
            "/api/submit-payment",
            json!({
                "telegram_id": 111,
                "plan": "premium",
                "image": base64::engine::general_purpose::STANDARD.encode(&image),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{submitted}");

    let (_, pending) = panel
        .post("/api/pending-requests", json!({"admin_id": ADMIN}))
        .await;
    let proof_url = pending[0]["proof_url"].as_str().unwrap();
    let (status, proof) = panel
        .get(proof_url.strip_prefix("https://panel.test").unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proof, image);
}

#[tokio::test]
async fn unreadable_bodies_keep_their_status() {
    let panel = panel().await;

    let huge = "A".repeat(web::PAYMENT_BODY_LIMIT + 1);
    let (status, error) = panel
        .post(
            "/api/submit-payment",
            json!({"telegram_id": 111, "plan": "premium", "image": huge}),
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error["error"], "payload_too_large");

    // Other endpoints keep the default, much smaller limit.
    let (status, _) = panel
        .post(
            "/api/user-status",
            json!({"telegram_id": 1, "padding": "A".repeat(3 * 1024 * 1024)}),
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let response = panel
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user-status")
                .body(Body::from(json!({"telegram_id": 1}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn admin_endpoints_need_an_admin() {
    let panel = panel().await;
    for (uri, body) in [
        ("/api/pending-requests", json!({"admin_id": 2})),
        ("/api/approve-request", json!({"admin_id": 2, "request_id": 1})),
        (
            "/api/reject-request",
            json!({"admin_id": 2, "request_id": 1, "reason": "x"}),
        ),
        ("/api/users", json!({"admin_id": 2})),
        ("/api/catalogo-admin", json!({"admin_id": 2})),
        (
            "/api/add-movie",
            json!({"admin_id": 2, "title": "Dune", "message_id": 3}),
        ),
    ] {
        let (status, error) = panel.post(uri, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(error["error"], "unauthorized");
    }

    let (status, _) = panel
        .post("/api/approve-request", json!({"admin_id": ADMIN, "request_id": 99}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_input_is_a_validation_error() {
    let panel = panel().await;

    let (status, error) = panel
        .post_raw("/api/user-status", "{not json".to_string())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation_error");

    for body in [
        json!({"telegram_id": 5, "image": "aGVsbG8="}),
        json!({"telegram_id": 5, "plan": "gold", "image": "aGVsbG8="}),
        json!({"telegram_id": 5, "plan": "classic"}),
        json!({"telegram_id": 5, "plan": "classic", "image": "not base64!"}),
        json!({"telegram_id": 5, "plan": "classic", "image": ""}),
    ] {
        let (status, error) = panel.post("/api/submit-payment", body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(error["error"], "validation_error");
    }

    let (_, submitted) = panel
        .post(
            "/api/submit-payment",
            json!({"telegram_id": 5, "plan": "classic", "image": "aGVsbG8="}),
        )
        .await;
    let (status, _) = panel
        .post(
            "/api/reject-request",
            json!({"admin_id": ADMIN, "request_id": submitted["request_id"], "reason": " "}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_and_delivery() {
    let panel = panel().await;

    for (i, title) in ["Avengers", "Avengers 2", "Batman"].into_iter().enumerate() {
        let (status, movie) = panel
            .post(
                "/api/add-movie",
                json!({"admin_id": ADMIN, "title": title, "message_id": 10 + i}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(movie["channel_id"], CHANNEL.0);
    }

    // Not subscribed yet.
    let (status, error) = panel
        .post("/api/catalogo", json!({"telegram_id": 50}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["error"], "subscription_inactive");
    let (status, _) = panel
        .post("/api/request-movie", json!({"telegram_id": 50, "movie_id": 1}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    panel.subscribe(50, "classic").await;
    panel.subscribe(60, "premium").await;

    let (status, page) = panel
        .post("/api/catalogo", json!({"telegram_id": 50, "search": "Aveng"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["page"], 1);
    assert_eq!(page["page_size"], 10);
    let titles: Vec<_> = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["Avengers", "Avengers 2"]);

    let (status, _) = panel
        .post("/api/catalogo", json!({"telegram_id": 50, "search": "Av"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, all) = panel
        .post("/api/catalogo", json!({"telegram_id": 50, "page": 1}))
        .await;
    assert_eq!(all["total"], 3);

    let movie_id = page["data"][0]["movie_id"].as_i64().unwrap();
    let (status, classic) = panel
        .post(
            "/api/request-movie",
            json!({"telegram_id": 50, "movie_id": movie_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(classic["delivered"], true);
    assert_eq!(classic["protected"], true);

    let (_, premium) = panel
        .post(
            "/api/request-movie",
            json!({"telegram_id": 60, "movie_id": movie_id}),
        )
        .await;
    assert_eq!(premium["protected"], false);

    assert_eq!(
        *panel.messenger.deliveries.lock().unwrap(),
        [
            (ChatId(50), MessageId(10), true),
            (ChatId(60), MessageId(10), false),
        ]
    );

    let (status, _) = panel
        .post("/api/request-movie", json!({"telegram_id": 50, "movie_id": 999}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_listings() {
    let panel = panel().await;
    panel.subscribe(50, "classic").await;
    panel
        .post(
            "/api/add-movie",
            json!({"admin_id": ADMIN, "title": "Dune", "message_id": 4}),
        )
        .await;

    let (status, users) = panel.post("/api/users", json!({"admin_id": ADMIN})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users["total"], 1);
    assert_eq!(users["data"][0]["user_id"], 50);
    assert_eq!(users["data"][0]["active"], true);

    let (status, movies) = panel
        .post("/api/catalogo-admin", json!({"admin_id": ADMIN, "page": 1}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(movies["data"][0]["title"], "Dune");
}

#[tokio::test]
async fn panel_files_are_served() {
    let panel = panel().await;
    let (status, body) = panel.get("/index.html").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("CineBot panel"));

    let (status, body) = panel.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("CineBot panel"));
}
