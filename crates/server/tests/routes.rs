use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use api_types::{
    item::{Item, ItemsPage},
    location::{LocationsPage, RemoteLocation},
    transfer_order::RemoteTransferOrder,
};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bytes::Bytes;
use engine::{
    Engine, EngineError, InventoryApi, OAuthProvider, PdfStream, Token, TokenFile, TokenGrant,
};
use futures_util::stream;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::{ServerState, router};
use tower::ServiceExt;

#[derive(Default)]
struct FakeRemote {
    items: Vec<Item>,
    item_requests: AtomicUsize,
    pdf_requests: AtomicUsize,
    orders: Mutex<Vec<RemoteTransferOrder>>,
}

#[async_trait]
impl OAuthProvider for FakeRemote {
    fn authorize_url(&self, scope: &str) -> String {
        format!("https://accounts.test/oauth/v2/auth?scope={scope}")
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, EngineError> {
        if code != "good-code" {
            return Err(EngineError::AuthExchange(json!({"error": "invalid_code"})));
        }
        Ok(TokenGrant {
            access_token: "exchanged".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: None,
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, EngineError> {
        Err(EngineError::Refresh(json!({"error": "invalid_code"})))
    }
}

#[async_trait]
impl InventoryApi for FakeRemote {
    async fn items_page(
        &self,
        _access_token: &str,
        _page: u32,
        _per_page: u32,
    ) -> Result<ItemsPage, EngineError> {
        self.item_requests.fetch_add(1, Ordering::SeqCst);
        Ok(ItemsPage {
            items: self.items.clone(),
            page_context: None,
        })
    }

    async fn locations(&self, _access_token: &str) -> Result<LocationsPage, EngineError> {
        Ok(LocationsPage {
            code: 0,
            message: "success".to_string(),
            locations: vec![RemoteLocation {
                location_id: "10".to_string(),
                location_name: "Riyadh".to_string(),
                status: Some("active".to_string()),
                ..Default::default()
            }],
        })
    }

    async fn create_transfer_order(
        &self,
        _access_token: &str,
        order: &RemoteTransferOrder,
    ) -> Result<Value, EngineError> {
        self.orders.lock().unwrap().push(order.clone());
        Ok(json!({
            "code": 0,
            "message": "Transfer Order has been created.",
            "transfer_order": {"transfer_order_id": "900", "transfer_order_number": "TO-00001"}
        }))
    }

    async fn transfer_order_pdf(
        &self,
        _access_token: &str,
        id: &str,
    ) -> Result<PdfStream, EngineError> {
        self.pdf_requests.fetch_add(1, Ordering::SeqCst);
        if id == "missing" {
            return Err(EngineError::Upstream {
                status: Some(404),
                details: json!({"code": 1002, "message": "Transfer order does not exist."}),
            });
        }
        let chunk: Result<Bytes, std::io::Error> = Ok(Bytes::from_static(b"%PDF-1.4"));
        Ok(Box::pin(stream::iter(vec![chunk])))
    }
}

fn goods(id: &str, name: &str) -> Item {
    Item {
        item_id: id.to_string(),
        name: name.to_string(),
        unit: Some("CTN(24P)".to_string()),
        item_type: Some("inventory".to_string()),
        status: Some("active".to_string()),
        product_type: Some("goods".to_string()),
        track_inventory: Some(true),
        ..Default::default()
    }
}

struct TestApp {
    app: Router,
    remote: Arc<FakeRemote>,
    _dir: tempfile::TempDir,
}

fn test_app(seed: Token) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(FakeRemote {
        items: vec![goods("1", "Dates 1kg"), goods("2", "Rice 5kg")],
        ..Default::default()
    });
    let engine = Engine::builder()
        .remote(remote.clone())
        .token_file(TokenFile::with_fallback(
            dir.path().join("tokens.json"),
            dir.path().join("fallback.json"),
        ))
        .seed_token(seed)
        .scope("ZohoInventory.fullaccess.all")
        .build()
        .unwrap();

    TestApp {
        app: router(ServerState {
            engine: Arc::new(engine),
        }),
        remote,
        _dir: dir,
    }
}

fn logged_in() -> Token {
    Token {
        access_token: Some("access".to_string()),
        refresh_token: Some("refresh".to_string()),
        expires_at: Some(chrono::Utc::now().timestamp_millis() + 3_600_000),
    }
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn items_require_login() {
    let test = test_app(Token::default());

    let response = test.app.oneshot(get("/api/items")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response.into_body()).await,
        json!({"error": "Not authenticated. Please login first."})
    );
    assert_eq!(test.remote.item_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn items_are_wrapped_in_success_envelope() {
    let test = test_app(logged_in());

    let response = test.app.oneshot(get("/api/items")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], "success");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["unit"], "CTN(24P)");
}

#[tokio::test]
async fn locations_are_flattened() {
    let test = test_app(logged_in());

    let response = test.app.oneshot(get("/api/locations")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["locations"][0]["location_id"], "10");
    assert_eq!(body["locations"][0]["location_name"], "Riyadh");
}

#[tokio::test]
async fn transfer_order_forwards_remote_body() {
    let test = test_app(logged_in());

    let response = test
        .app
        .oneshot(post_json(
            "/api/transfer-orders",
            json!({
                "from_location_id": "10",
                "to_location_id": "11",
                "date": "2026-01-05",
                "line_items": [{"item_id": "2", "quantity_transfer": 1.5, "description": ""}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["transfer_order"]["transfer_order_number"], "TO-00001");

    let orders = test.remote.orders.lock().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].from_warehouse_id, "10");
    assert_eq!(orders[0].line_items[0].name, "Rice 5kg");
    assert_eq!(orders[0].line_items[0].description, None);
}

#[tokio::test]
async fn transfer_order_with_unknown_item_is_rejected() {
    let test = test_app(logged_in());

    let response = test
        .app
        .oneshot(post_json(
            "/api/transfer-orders",
            json!({
                "from_location_id": "10",
                "to_location_id": "11",
                "line_items": [{"item_id": "77", "quantity_transfer": 2}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["error"], "Item 77 not found in inventory");
    assert!(body["details"].as_str().unwrap().contains("refresh"));
    assert!(test.remote.orders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transfer_order_without_lines_field_is_a_json_400() {
    let test = test_app(logged_in());

    let response = test
        .app
        .oneshot(post_json(
            "/api/transfer-orders",
            json!({"from_location_id": "1", "to_location_id": "2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let body = body_json(response.into_body()).await;
    assert_eq!(body["error"], "Invalid request body");
    assert!(body["details"].as_str().unwrap().contains("line_items"));
    assert_eq!(test.remote.item_requests.load(Ordering::SeqCst), 0);
    assert!(test.remote.orders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transfer_order_between_same_locations_is_rejected() {
    let test = test_app(logged_in());

    let response = test
        .app
        .oneshot(post_json(
            "/api/transfer-orders",
            json!({
                "from_location_id": "10",
                "to_location_id": "10",
                "line_items": [{"item_id": "1", "quantity_transfer": 2}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test.remote.item_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pdf_is_streamed_as_attachment() {
    let test = test_app(logged_in());

    let response = test
        .app
        .oneshot(get("/api/transfer-orders/900/pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"TransferOrder-900.pdf\""
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"%PDF-1.4");
}

#[tokio::test]
async fn pdf_with_unsafe_id_is_rejected_before_the_remote() {
    let test = test_app(logged_in());

    let response = test
        .app
        .oneshot(get("/api/transfer-orders/12%22%3B%20x/pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        body_json(response.into_body()).await["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid transfer order id")
    );
    assert_eq!(test.remote.pdf_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pdf_failure_forwards_remote_details() {
    let test = test_app(logged_in());

    let response = test
        .app
        .oneshot(get("/api/transfer-orders/missing/pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["error"], "Failed to download PDF");
    assert_eq!(body["details"]["code"], 1002);
}

#[tokio::test]
async fn callback_exchanges_code_and_redirects() {
    let test = test_app(Token::default());

    let response = test
        .app
        .clone()
        .oneshot(get("/auth/callback?code=good-code"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/?auth=success");

    let response = test.app.oneshot(get("/auth/status")).await.unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["hasRefreshToken"], true);
    assert_eq!(body["autoRefreshEnabled"], true);
}

#[tokio::test]
async fn callback_failures_redirect_to_error() {
    let test = test_app(Token::default());

    for uri in ["/auth/callback", "/auth/callback?code=bad-code"] {
        let response = test.app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/?auth=error");
    }
}

#[tokio::test]
async fn manual_exchange_reports_remote_error() {
    let test = test_app(Token::default());

    let response = test
        .app
        .oneshot(post_json("/auth/token", json!({"code": "bad-code"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["error"], "Failed to exchange code for token");
    assert_eq!(body["details"], json!({"error": "invalid_code"}));
}

#[tokio::test]
async fn manual_exchange_without_code_is_a_json_400() {
    let test = test_app(Token::default());

    let response = test
        .app
        .oneshot(post_json("/auth/token", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["error"], "Invalid request body");
    assert!(body["details"].as_str().unwrap().contains("code"));
}

#[tokio::test]
async fn login_uses_custom_scope_when_given() {
    let test = test_app(Token::default());

    let response = test.app.clone().oneshot(get("/auth/login")).await.unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(
        body["authUrl"],
        "https://accounts.test/oauth/v2/auth?scope=ZohoInventory.fullaccess.all"
    );

    let response = test
        .app
        .oneshot(post_json(
            "/auth/login",
            json!({"customScope": "ZohoInventory.items.READ"}),
        ))
        .await
        .unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(
        body["authUrl"],
        "https://accounts.test/oauth/v2/auth?scope=ZohoInventory.items.READ"
    );
}

#[tokio::test]
async fn logout_clears_the_session() {
    let test = test_app(logged_in());

    let response = test
        .app
        .clone()
        .oneshot(Request::post("/auth/logout").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.into_body()).await["success"], true);

    let response = test.app.oneshot(get("/api/items")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
