//! API integration tests, run in-process against the full router

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use samuday_rental::{
    api::create_router,
    config::AppConfig,
    models::{NewRentalRequest, Receipt, RentalStatus},
    rental::SubmissionError,
    repository::Repository,
    services::{submission::RentalSubmitter, Services},
    AppState,
};

const BOUNDARY: &str = "samuday-test-boundary";

async fn app_with(services: Services, config: AppConfig) -> Router {
    create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn app() -> Router {
    let config = AppConfig::default();
    let services = Services::new(Repository::new(), &config)
        .await
        .expect("Failed to create services");
    app_with(services, config).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(format!("/api/v1{}", uri));
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .expect("Request failed");
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response is not JSON")
    };
    (status, body)
}

async fn upload(app: &Router, session: &str, slot: &str, content_type: &str, bytes: &[u8]) -> (StatusCode, Value) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"photo.jpg\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/v1/rental-sessions/{}/photos/{}", session, slot))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    read(app.clone().oneshot(request).await.expect("Request failed")).await
}

/// Walk a session on the tractor (id 1) up to the verification step with
/// everything filled in
async fn session_ready_to_submit(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/equipment/1/rentals", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["sessionId"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        Method::PATCH,
        &format!("/rental-sessions/{}", id),
        Some(json!({
            "startDate": "2025-07-01",
            "endDate": "2025-07-03",
            "purpose": "Ploughing before sowing",
            "deliveryOption": "delivery",
            "deliveryAddress": "Village Kharkhoda, Sonipat"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(app, Method::POST, &format!("/rental-sessions/{}/next", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], 2);

    send(
        app,
        Method::PATCH,
        &format!("/rental-sessions/{}", id),
        Some(json!({
            "contactName": "Sunita Devi",
            "contactPhone": "9876543210",
            "contactEmail": "sunita@example.com"
        })),
    )
    .await;
    let (status, body) = send(app, Method::POST, &format!("/rental-sessions/{}/next", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], 3);

    send(
        app,
        Method::PATCH,
        &format!("/rental-sessions/{}", id),
        Some(json!({
            "idType": "pan",
            "idNumber": "ABCDE1234F",
            "termsAccepted": true
        })),
    )
    .await;
    let (status, _) = upload(app, &id, "user", "image/jpeg", &[0xff, 0xd8, 0xff, 0xe0]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = upload(app, &id, "equipment-location", "image/png", &[0x89, 0x50, 0x4e, 0x47]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["draft"]["equipmentLocationPhoto"]["contentType"], "image/png");

    id
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["equipment"], 4);
}

#[tokio::test]
async fn test_catalog_search() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/equipment", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (_, body) = send(&app, Method::GET, "/equipment?search=mahindra&type=all", None).await;
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Mahindra Rotavator");

    let (_, body) = send(&app, Method::GET, "/equipment?type=Harvester", None).await;
    assert_eq!(body[0]["availability"], "booked");

    let (status, body) = send(&app, Method::GET, "/equipment/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_list_equipment() {
    let app = app().await;
    let listing = json!({
        "name": "Sonalika Seed Drill",
        "equipmentType": "Implement",
        "rate": "₹350",
        "rateType": "per day",
        "location": "Karnal, Haryana",
        "description": "Nine-row seed drill",
        "features": ["9 Rows"],
        "ownerName": "Vikram",
        "contactPhone": "9812345678",
        "contactEmail": "vikram@example.com",
        "termsAccepted": true
    });

    let (status, body) = send(&app, Method::POST, "/equipment", Some(listing.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 5);
    assert_eq!(body["rate"]["unit"], "daily");

    let mut invalid = listing;
    invalid["contactEmail"] = json!("not-an-email");
    let (status, body) = send(&app, Method::POST, "/equipment", Some(invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is invalid");
}

#[tokio::test]
async fn test_listing_with_implausible_rate_is_rejected() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/equipment",
        Some(json!({
            "name": "Gold Plated Tractor",
            "equipmentType": "Tractor",
            "rate": "₹79228162514264337593543950335",
            "rateType": "per day",
            "location": "Sonipat, Haryana",
            "description": "Priced to overflow",
            "features": ["Shiny"],
            "ownerName": "Nobody",
            "contactPhone": "9876543210",
            "contactEmail": "nobody@example.com",
            "termsAccepted": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("not a valid amount"));

    let (_, body) = send(&app, Method::GET, "/equipment", None).await;
    assert_eq!(body.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_booked_equipment_cannot_be_requested() {
    let app = app().await;
    let (status, body) = send(&app, Method::POST, "/equipment/3/rentals", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NotAvailable");
}

#[tokio::test]
async fn test_invalid_step_returns_field_errors() {
    let app = app().await;
    let (_, body) = send(&app, Method::POST, "/equipment/1/rentals", None).await;
    let id = body["sessionId"].as_str().unwrap().to_string();

    send(
        &app,
        Method::PATCH,
        &format!("/rental-sessions/{}", id),
        Some(json!({
            "startDate": "2025-07-05",
            "endDate": "2025-07-01",
            "purpose": "Harvest",
            "deliveryOption": "delivery"
        })),
    )
    .await;
    let (status, body) = send(&app, Method::POST, &format!("/rental-sessions/{}/next", id), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "InvalidFields");
    assert!(body["fields"]["endDate"].is_string());
    assert!(body["fields"]["deliveryAddress"].is_string());
    assert!(body["fields"].get("purpose").is_none());

    let (_, body) = send(&app, Method::GET, &format!("/rental-sessions/{}", id), None).await;
    assert_eq!(body["step"], 1);
    assert!(body["errors"]["endDate"].is_string());
}

#[tokio::test]
async fn test_full_rental_flow() {
    let app = app().await;
    let id = session_ready_to_submit(&app).await;

    let (_, body) = send(&app, Method::GET, &format!("/rental-sessions/{}", id), None).await;
    assert_eq!(body["estimate"]["durationDays"], 3);
    assert_eq!(body["estimate"]["amount"], "2400");

    let (status, body) = send(&app, Method::POST, &format!("/rental-sessions/{}/submit", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["state"], "submitted");
    let request_id = body["state"]["receipt"]["requestId"].as_str().unwrap().to_string();
    assert!(request_id.starts_with("REQ-"));

    // closed sessions accept nothing further
    let (status, _) = send(&app, Method::POST, &format!("/rental-sessions/{}/submit", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::GET, &format!("/rentals/{}", request_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["deliveryAddress"], "Village Kharkhoda, Sonipat");
    assert_eq!(body["userPhoto"]["size"], 4);

    let (_, body) = send(&app, Method::GET, "/rentals?equipment_id=1&status=pending", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let request = Request::builder()
        .uri(format!("/api/v1/rentals/{}/photos/equipment-location", request_id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], &[0x89, 0x50, 0x4e, 0x47]);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/rentals/{}/status", request_id),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/rentals/{}/status", request_id),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_non_image_upload_is_rejected() {
    let app = app().await;
    let (_, body) = send(&app, Method::POST, "/equipment/4/rentals", None).await;
    let id = body["sessionId"].as_str().unwrap().to_string();

    let (status, body) = upload(&app, &id, "user", "application/pdf", b"%PDF-1.4").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["userPhoto"].is_string());

    let (status, _) = upload(&app, &id, "passport", "image/jpeg", &[0xff]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Fails the first submission, accepts the rest
struct FlakySubmitter {
    calls: AtomicUsize,
}

#[async_trait]
impl RentalSubmitter for FlakySubmitter {
    async fn submit(&self, _request: NewRentalRequest) -> Result<Receipt, SubmissionError> {
        match self.calls.fetch_add(1, Ordering::SeqCst) {
            0 => Err(SubmissionError::Transport("connection reset".to_string())),
            n => Ok(Receipt {
                request_id: format!("REQ-EXT-{}", n),
                status: RentalStatus::Pending,
            }),
        }
    }
}

#[tokio::test]
async fn test_failed_submission_keeps_draft_for_retry() {
    let config = AppConfig::default();
    let submitter = Arc::new(FlakySubmitter {
        calls: AtomicUsize::new(0),
    });
    let services = Services::with_submitter(Repository::new(), &config, submitter)
        .await
        .unwrap();
    let app = app_with(services, config).await;
    let id = session_ready_to_submit(&app).await;

    let (status, body) = send(&app, Method::POST, &format!("/rental-sessions/{}/submit", id), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "SubmissionFailed");

    let (_, body) = send(&app, Method::GET, &format!("/rental-sessions/{}", id), None).await;
    assert_eq!(body["state"]["state"], "failed");
    assert_eq!(body["step"], 3);
    assert_eq!(body["draft"]["contact"]["name"], "Sunita Devi");

    let (status, body) = send(&app, Method::POST, &format!("/rental-sessions/{}/submit", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["receipt"]["requestId"], "REQ-EXT-1");
}

#[tokio::test]
async fn test_cancel_discards_session() {
    let app = app().await;
    let (_, body) = send(&app, Method::POST, "/equipment/2/rentals", None).await;
    let id = body["sessionId"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::DELETE, &format!("/rental-sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/rental-sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
