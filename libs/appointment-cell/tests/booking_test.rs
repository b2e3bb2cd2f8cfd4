use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::router::appointment_routes;
use appointment_cell::SlotLocks;
use notification_cell::{Mailer, NotificationService, SocketRegistry};
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockStoreResponses, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    let registry = Arc::new(SocketRegistry::new());
    let mailer = Arc::new(Mailer::new(&config));
    let notifier = Arc::new(NotificationService::new(registry, None, mailer));
    let locks = Arc::new(SlotLocks::new());

    appointment_routes(Arc::new(config), notifier, locks)
}

fn test_config(store_url: String) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.store_url = store_url;
    config
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn mock_doctor_lookup(server: &MockServer, doctor_id: &str, user_id: &str, status: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_doc(doctor_id, user_id, "Dr. Grey", status)
        ])))
        .mount(server)
        .await;
}

async fn mock_conflict_query(server: &MockServer, doctor_id: &str, existing: Value) {
    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(existing))
        .mount(server)
        .await;
}

async fn mock_patient_lookup(server: &MockServer, user: &TestUser) {
    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_doc(&user.id, &user.email, "Pat Example")
        ])))
        .mount(server)
        .await;
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn book_appointment_succeeds_for_free_slot() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();
    let doctor_user_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    mock_doctor_lookup(&mock_server, &doctor_id, &doctor_user_id, "approved").await;
    mock_conflict_query(&mock_server, &doctor_id, json!([])).await;
    mock_patient_lookup(&mock_server, &user).await;

    Mock::given(method("POST"))
        .and(path("/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStoreResponses::appointment_doc(
                &appointment_id,
                &doctor_id,
                &user.id,
                "2025-06-01T10:00:00Z",
                "10:00",
                "pending",
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "POST",
            "/book",
            &token,
            json!({
                "doctor_id": doctor_id,
                "date": "2025-06-01T10:00:00Z",
                "time": "10:00",
                "reason": "Routine check-up"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Appointment requested");
    assert_eq!(body["appointment"]["status"], "pending");
    assert_eq!(body["appointment"]["doctor"]["fullname"], "Dr. Grey");
}

#[tokio::test]
async fn booking_an_occupied_slot_returns_conflict() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();
    let doctor_user_id = Uuid::new_v4().to_string();

    mock_doctor_lookup(&mock_server, &doctor_id, &doctor_user_id, "approved").await;
    mock_conflict_query(
        &mock_server,
        &doctor_id,
        json!([MockStoreResponses::appointment_doc(
            &Uuid::new_v4().to_string(),
            &doctor_id,
            &Uuid::new_v4().to_string(),
            "2025-06-01T10:00:00Z",
            "10:00",
            "pending",
        )]),
    )
    .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "POST",
            "/book",
            &token,
            json!({
                "doctor_id": doctor_id,
                "date": "2025-06-01T10:00:00Z",
                "time": "10:00",
                "reason": "Routine check-up"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn booking_an_unapproved_doctor_is_rejected() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();

    mock_doctor_lookup(&mock_server, &doctor_id, &Uuid::new_v4().to_string(), "pending").await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "POST",
            "/book",
            &token,
            json!({
                "doctor_id": doctor_id,
                "date": "2025-06-01T10:00:00Z",
                "time": "10:00",
                "reason": "Routine check-up"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "This doctor is not available for booking");
}

#[tokio::test]
async fn booking_an_unknown_doctor_returns_not_found() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "POST",
            "/book",
            &token,
            json!({
                "doctor_id": doctor_id,
                "date": "2025-06-01T10:00:00Z",
                "time": "10:00",
                "reason": "Routine check-up"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_requires_authentication() {
    let mock_server = MockServer::start().await;
    let config = test_config(mock_server.uri());
    let app = create_test_app(config);

    let request = Request::builder()
        .method("POST")
        .uri("/book")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ==============================================================================
// STATUS UPDATES
// ==============================================================================

#[tokio::test]
async fn update_status_rejects_unknown_value() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");
    let appointment_id = Uuid::new_v4();

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/status/{}", appointment_id),
            &token,
            json!({ "status": "archived" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "Invalid status. Valid statuses: pending, scheduled, completed, cancelled"
    );
    // The record is never touched: no store call was mocked and none was made.
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn pending_appointment_can_be_scheduled() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");
    let doctor_id = Uuid::new_v4().to_string();
    let doctor_user_id = Uuid::new_v4().to_string();
    let patient_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_doc(
                &appointment_id,
                &doctor_id,
                &patient_id,
                "2025-06-01T10:00:00Z",
                "10:00",
                "pending",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_doc(
                &appointment_id,
                &doctor_id,
                &patient_id,
                "2025-06-01T10:00:00Z",
                "10:00",
                "scheduled",
            )
        ])))
        .mount(&mock_server)
        .await;

    // Reference expansion (batched) plus the notification doctor lookup.
    Mock::given(method("GET"))
        .and(path("/v1/doctors"))
        .and(query_param("id", format!("in.({})", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_doc(&doctor_id, &doctor_user_id, "Dr. Grey", "approved")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_doc(&doctor_id, &doctor_user_id, "Dr. Grey", "approved")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .and(query_param("id", format!("in.({})", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_doc(&patient_id, "patient@example.com", "Pat Example")
        ])))
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/status/{}", appointment_id),
            &token,
            json!({ "status": "scheduled" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Appointment status updated");
    assert_eq!(body["appointment"]["status"], "scheduled");
}

#[tokio::test]
async fn completed_appointment_cannot_change_status() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_doc(
                &appointment_id,
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                "2025-06-01T10:00:00Z",
                "10:00",
                "completed",
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/status/{}", appointment_id),
            &token,
            json!({ "status": "scheduled" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_status_of_missing_appointment_returns_not_found() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");

    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/status/{}", Uuid::new_v4()),
            &token,
            json!({ "status": "scheduled" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patients_cannot_update_status() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("patient@example.com");

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/status/{}", Uuid::new_v4()),
            &token,
            json!({ "status": "scheduled" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ==============================================================================
// RESCHEDULING
// ==============================================================================

#[tokio::test]
async fn completed_appointment_cannot_be_rescheduled() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("patient@example.com");
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_doc(
                &appointment_id,
                &Uuid::new_v4().to_string(),
                &user.id,
                "2025-06-01T10:00:00Z",
                "10:00",
                "completed",
            )
        ])))
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/reschedule/{}", appointment_id),
            &token,
            json!({ "new_date": "2025-06-02T11:00:00Z", "new_time": "11:00" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Cannot reschedule completed appointment");
}

#[tokio::test]
async fn rescheduling_into_an_occupied_slot_returns_conflict() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_doc(
                &appointment_id,
                &doctor_id,
                &user.id,
                "2025-06-01T10:00:00Z",
                "10:00",
                "scheduled",
            )
        ])))
        .mount(&mock_server)
        .await;

    // Another active appointment already holds the target slot.
    mock_conflict_query(
        &mock_server,
        &doctor_id,
        json!([MockStoreResponses::appointment_doc(
            &Uuid::new_v4().to_string(),
            &doctor_id,
            &Uuid::new_v4().to_string(),
            "2025-06-02T11:00:00Z",
            "11:00",
            "pending",
        )]),
    )
    .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/reschedule/{}", appointment_id),
            &token,
            json!({ "new_date": "2025-06-02T11:00:00Z", "new_time": "11:00" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn rescheduling_to_own_slot_succeeds_via_self_exclusion() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();
    let doctor_user_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_doc(
                &appointment_id,
                &doctor_id,
                &user.id,
                "2025-06-01T10:00:00Z",
                "10:00",
                "scheduled",
            )
        ])))
        .mount(&mock_server)
        .await;

    // The conflict query excludes the appointment being moved, so its own
    // slot reads as free.
    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("id", format!("neq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_doc(
                &appointment_id,
                &doctor_id,
                &user.id,
                "2025-06-01T10:00:00Z",
                "10:00",
                "scheduled",
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/doctors"))
        .and(query_param("id", format!("in.({})", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_doc(&doctor_id, &doctor_user_id, "Dr. Grey", "approved")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .and(query_param("id", format!("in.({})", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_doc(&user.id, &user.email, "Pat Example")
        ])))
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(authed_request(
            "PUT",
            &format!("/reschedule/{}", appointment_id),
            &token,
            json!({ "new_date": "2025-06-01T10:00:00Z", "new_time": "10:00" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Appointment rescheduled");
    // Status is untouched by a reschedule.
    assert_eq!(body["appointment"]["status"], "scheduled");
}

// ==============================================================================
// LISTINGS & PAGINATION
// ==============================================================================

#[tokio::test]
async fn second_page_of_fifteen_records_has_five() {
    let mock_server = MockServer::start().await;
    let user = TestUser::patient("patient@example.com");
    let doctor_id = Uuid::new_v4().to_string();
    let doctor_user_id = Uuid::new_v4().to_string();

    let page_two: Vec<Value> = (0..5)
        .map(|i| {
            MockStoreResponses::appointment_doc(
                &Uuid::new_v4().to_string(),
                &doctor_id,
                &user.id,
                "2025-06-01T10:00:00Z",
                &format!("1{}:00", i),
                "pending",
            )
        })
        .collect();

    // The count projection sees all fifteen records.
    let all_ids: Vec<Value> = (0..15).map(|_| json!({"id": Uuid::new_v4()})).collect();
    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(all_ids)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/appointments"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(page_two)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/doctors"))
        .and(query_param("id", format!("in.({})", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_doc(&doctor_id, &doctor_user_id, "Dr. Grey", "approved")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .and(query_param("id", format!("in.({})", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_doc(&user.id, &user.email, "Pat Example")
        ])))
        .mount(&mock_server)
        .await;

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(get_request("/me?page=2&limit=10", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["records"].as_array().unwrap().len(), 5);
    assert_eq!(body["pagination"]["page"], 2);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["total"], 15);
    assert_eq!(body["pagination"]["pages"], 2);
}

#[tokio::test]
async fn admin_listing_rejects_invalid_status_filter() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@example.com");

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app
        .oneshot(get_request("/all?status=archived", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_listing_is_admin_only() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("patient@example.com");

    let config = test_config(mock_server.uri());
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));
    let app = create_test_app(config);

    let response = app.oneshot(get_request("/all", &token)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
