use super::*;
use crate::net::types::{OrderLine, OrderType, Role};
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, put};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

const TOKEN: &str = "test-token";

#[derive(Clone, Debug)]
struct Seen {
    path: &'static str,
    authorization: Option<String>,
    request_id: Option<String>,
    content_type: Option<String>,
    body: String,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

fn record(log: &Log, path: &'static str, headers: &HeaderMap, body: String) -> bool {
    let authorization = header(headers, "authorization");
    let authorized = authorization.as_deref() == Some("Bearer test-token");
    log.lock().unwrap().push(Seen {
        path,
        authorization,
        request_id: header(headers, REQUEST_ID_HEADER),
        content_type: header(headers, "content-type"),
        body,
    });
    authorized
}

fn unauthorized() -> (StatusCode, axum::Json<Value>) {
    (StatusCode::UNAUTHORIZED, axum::Json(json!({ "message": "Not authorized, token failed" })))
}

async fn menus(State(log): State<Log>, headers: HeaderMap) -> (StatusCode, axum::Json<Value>) {
    if !record(&log, "GET /menus", &headers, String::new()) {
        return unauthorized();
    }
    (StatusCode::OK, axum::Json(json!([{ "_id": "m1", "name": "Kottu", "price": "1200", "category": "main" }])))
}

async fn create_menu(State(log): State<Log>, headers: HeaderMap, body: String) -> StatusCode {
    record(&log, "POST /menus", &headers, body);
    StatusCode::CREATED
}

async fn orders(State(log): State<Log>, headers: HeaderMap) -> axum::Json<Value> {
    record(&log, "GET /orders", &headers, String::new());
    axum::Json(json!([
        { "_id": "o1", "orderType": "takeaway", "items": [] },
        { "_id": "o2", "orderType": "dine-in", "items": [{ "name": "Tea", "price": 80, "qty": 2 }] }
    ]))
}

async fn create_order(State(log): State<Log>, headers: HeaderMap, body: String) -> (StatusCode, axum::Json<Value>) {
    record(&log, "POST /orders", &headers, body);
    (
        StatusCode::CREATED,
        axum::Json(json!({
            "_id": "665f1c2ab9e7a1d4c3f0a9b2",
            "orderType": "dine-in",
            "items": [{ "menuId": "m1", "name": "Kottu", "price": 1200, "qty": 2 }],
            "total": 3000
        })),
    )
}

async fn tables(State(log): State<Log>, headers: HeaderMap) -> (StatusCode, &'static str) {
    record(&log, "GET /tables", &headers, String::new());
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}

async fn reservations(State(log): State<Log>, headers: HeaderMap) -> axum::Json<Value> {
    record(&log, "GET /reservations", &headers, String::new());
    axum::Json(json!({ "reservations": [] }))
}

async fn change_password(State(log): State<Log>, headers: HeaderMap, body: String) -> (StatusCode, axum::Json<Value>) {
    record(&log, "PUT /users/change-password", &headers, body);
    (StatusCode::BAD_REQUEST, axum::Json(json!({ "message": "Current password is incorrect" })))
}

async fn update_profile(State(log): State<Log>, headers: HeaderMap, body: String) -> axum::Json<Value> {
    record(&log, "PUT /users/profile", &headers, body);
    axum::Json(json!({ "_id": "u1", "name": "Amal Perera", "email": "amal@x.lk", "role": "admin" }))
}

async fn spawn_backend() -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/api/menus", get(menus).post(create_menu))
        .route("/api/orders", get(orders).post(create_order))
        .route("/api/tables", get(tables))
        .route("/api/reservations", get(reservations))
        .route("/api/users/change-password", put(change_password))
        .route("/api/users/profile", put(update_profile))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api/"), log)
}

fn client(base_url: &str, token: Option<&str>) -> ApiClient {
    ApiClient::new(base_url, HttpTimeouts::default(), token.map(str::to_owned)).unwrap()
}

// =============================================================================
// Pure helpers
// =============================================================================

#[test]
fn error_message_prefers_json_message() {
    assert_eq!(parse_error_message(r#"{"message":"Menu item not found"}"#, Some("Not Found")), "Menu item not found");
}

#[test]
fn error_message_falls_back_to_body_then_reason() {
    assert_eq!(parse_error_message("Bad Gateway from proxy", None), "Bad Gateway from proxy");
    assert_eq!(parse_error_message(r#"{"error":"x"}"#, None), r#"{"error":"x"}"#);
    assert_eq!(parse_error_message("  ", Some("Service Unavailable")), "Service Unavailable");
    assert_eq!(parse_error_message("", None), "request failed");
}

#[test]
fn parse_body_names_endpoint() {
    let err = parse_body::<Vec<Order>>("/orders", "{}").unwrap_err();
    assert!(matches!(err, ApiError::Parse { ref path, .. } if path == "/orders"));
}

// =============================================================================
// Against a mock backend
// =============================================================================

#[tokio::test]
async fn list_menu_sends_bearer_and_request_id() {
    let (base, log) = spawn_backend().await;
    let menu = client(&base, Some(TOKEN)).list_menu().await.unwrap();
    assert_eq!(menu.len(), 1);
    assert!((menu[0].price - 1200.0).abs() < f64::EPSILON);

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(seen.authorization.as_deref(), Some("Bearer test-token"));
    let request_id = seen.request_id.unwrap();
    assert!(Uuid::parse_str(&request_id).is_ok());
}

#[tokio::test]
async fn backend_message_is_surfaced() {
    let (base, _log) = spawn_backend().await;
    let err = client(&base, Some("stale")).list_menu().await.unwrap_err();
    assert!(matches!(err, ApiError::Response { status: 401, .. }));
    assert_eq!(err.to_string(), "Not authorized, token failed");

    let change = PasswordChange::new("wrong", "secret1", "secret1").unwrap();
    let err = client(&base, Some(TOKEN)).change_password(&change).await.unwrap_err();
    assert_eq!(err.to_string(), "Current password is incorrect");
}

#[tokio::test]
async fn plain_text_error_body_is_used() {
    let (base, _log) = spawn_backend().await;
    let err = client(&base, Some(TOKEN)).list_tables().await.unwrap_err();
    assert!(matches!(err, ApiError::Response { status: 500, ref message } if message == "database unavailable"));
}

#[tokio::test]
async fn unexpected_shape_is_a_parse_error() {
    let (base, _log) = spawn_backend().await;
    let err = client(&base, Some(TOKEN)).list_reservations().await.unwrap_err();
    assert!(matches!(err, ApiError::Parse { ref path, .. } if path == "/reservations"));
}

#[tokio::test]
async fn missing_token_fails_without_request() {
    let (base, log) = spawn_backend().await;
    let err = client(&base, None).list_orders().await.unwrap_err();
    assert!(matches!(err, ApiError::NotSignedIn));
    assert_eq!(err.to_string(), "not signed in");
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn create_order_posts_wire_body_and_returns_saved_order() {
    let (base, log) = spawn_backend().await;
    let order = NewOrder {
        order_type: OrderType::DineIn,
        customer_name: "Nimal".to_owned(),
        phone: String::new(),
        items: vec![OrderLine { menu_id: "m1".to_owned(), quantity: 2 }],
        order_status: None,
        payment_status: None,
        payment_type: None,
    };
    let saved = client(&base, Some(TOKEN)).create_order(&order).await.unwrap();
    assert_eq!(saved.id.as_deref(), Some("665f1c2ab9e7a1d4c3f0a9b2"));
    assert_eq!(saved.total, Some(3000.0));

    let seen = log.lock().unwrap()[0].clone();
    let body: Value = serde_json::from_str(&seen.body).unwrap();
    assert_eq!(body["type"], "dine-in");
    assert_eq!(body["items"][0], json!({ "menuId": "m1", "quantity": 2 }));
    assert!(seen.content_type.unwrap().starts_with("application/json"));
}

#[tokio::test]
async fn invalid_order_is_rejected_locally() {
    let (base, log) = spawn_backend().await;
    let order = NewOrder {
        order_type: OrderType::Takeaway,
        customer_name: String::new(),
        phone: String::new(),
        items: Vec::new(),
        order_status: None,
        payment_status: None,
        payment_type: None,
    };
    let err = client(&base, Some(TOKEN)).create_order(&order).await.unwrap_err();
    assert!(matches!(err, ApiError::Invalid(ValidationError::EmptyOrder)));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn find_order_scans_list() {
    let (base, _log) = spawn_backend().await;
    let api = client(&base, Some(TOKEN));
    let order = api.find_order("o2").await.unwrap();
    assert_eq!(order.items.len(), 1);
    assert!(matches!(api.find_order("zz").await, Err(ApiError::OrderNotFound(id)) if id == "zz"));
}

#[tokio::test]
async fn create_menu_item_sends_multipart() {
    let (base, log) = spawn_backend().await;
    let item = NewMenuItem {
        name: "Hoppers".to_owned(),
        category: "breakfast".to_owned(),
        price: 90.0,
        description: String::new(),
        available: true,
        image: Some("https://cdn.example.lk/hoppers.jpg".to_owned()),
    };
    client(&base, Some(TOKEN)).create_menu_item(&item).await.unwrap();

    let seen = log.lock().unwrap()[0].clone();
    assert_eq!(seen.path, "POST /menus");
    assert!(seen.content_type.unwrap().starts_with("multipart/form-data"));
    assert!(seen.body.contains("name=\"category\""));
    assert!(seen.body.contains("breakfast"));
    assert!(seen.body.contains("hoppers.jpg"));
}

#[tokio::test]
async fn register_user_validates_before_sending() {
    let (base, log) = spawn_backend().await;
    let user = RegisterUser {
        name: "Sunil".to_owned(),
        email: String::new(),
        password: "secret1".to_owned(),
        role: Role::Cashier,
    };
    let err = client(&base, Some(TOKEN)).register_user(&user).await.unwrap_err();
    assert_eq!(err.to_string(), ValidationError::MissingField("email").to_string());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn update_profile_returns_user() {
    let (base, log) = spawn_backend().await;
    let update = ProfileUpdate { name: "Amal Perera".to_owned(), email: "amal@x.lk".to_owned() };
    let user = client(&base, Some(TOKEN)).update_profile(&update).await.unwrap();
    assert_eq!(user.name, "Amal Perera");
    assert_eq!(user.role, Role::Admin);

    let body: Value = serde_json::from_str(&log.lock().unwrap()[0].body).unwrap();
    assert_eq!(body, json!({ "name": "Amal Perera", "email": "amal@x.lk" }));
}
