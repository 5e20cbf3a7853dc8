//! End-to-end tests driving the full router with in-memory state.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use quai_api::state::AppState;

fn test_app() -> axum::Router {
    quai_api::app(AppState::new())
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("JSON body")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn sample_vehicle() -> Value {
    json!({
        "plate": "AB-123-CD",
        "size": "-10",
        "phone_code": "+33",
        "phone_number": "612345678",
        "date": "2025-05-01",
        "time": "09:00",
        "city": "Paris",
        "unloading": ["lat"]
    })
}

fn sample_submission() -> Value {
    json!({
        "company": "Acme",
        "stand": "A1",
        "unloading": "Palais",
        "event": "festival",
        "message": "",
        "consent": true,
        "vehicles": [sample_vehicle()]
    })
}

/// Create an accreditation through the API and return its JSON.
async fn create(app: &axum::Router, payload: Value) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/accreditations", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn health_probes_respond() {
    let app = test_app();

    let response = app.clone().oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");

    let response = app.oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ready");
}

#[tokio::test]
async fn create_returns_record_and_writes_history() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;

    assert_eq!(record["company"], "Acme");
    assert_eq!(record["status"], "ATTENTE");
    assert_eq!(record["vehicles"].as_array().unwrap().len(), 1);
    let id = record["id"].as_str().unwrap();

    let response = app
        .oneshot(get(&format!("/accreditations/{id}/history")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_json(response).await;
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "CREATED");
}

#[tokio::test]
async fn create_with_nouveau_status() {
    let app = test_app();
    let mut payload = sample_submission();
    payload["status"] = json!("NOUVEAU");
    let record = create(&app, payload).await;
    assert_eq!(record["status"], "NOUVEAU");
}

#[tokio::test]
async fn create_rejects_entree_status() {
    let app = test_app();
    let mut payload = sample_submission();
    payload["status"] = json!("ENTREE");
    let response = app
        .oneshot(json_request("POST", "/accreditations", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_rejects_incomplete_vehicle() {
    let app = test_app();
    let mut payload = sample_submission();
    payload["vehicles"][0]["city"] = json!("");
    let response = app
        .oneshot(json_request("POST", "/accreditations", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("city"));
}

#[tokio::test]
async fn get_unknown_id_is_404() {
    let app = test_app();
    let response = app
        .oneshot(get("/accreditations/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn entree_requires_confirmation() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();
    let uri = format!("/accreditations/{id}");

    let response = app
        .clone()
        .oneshot(json_request("PATCH", &uri, json!({ "status": "ENTREE" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(json_request(
            "PATCH",
            &uri,
            json!({ "status": "ENTREE", "confirm_entry": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["status"], "ENTREE");
    assert!(updated["entry_at"].is_string());
}

#[tokio::test]
async fn exit_stamps_timestamp_and_is_terminal() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();
    let uri = format!("/accreditations/{id}");

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &uri,
            json!({ "status": "ENTREE", "confirm_entry": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entry_at = body_json(response).await["entry_at"].clone();

    let response = app
        .clone()
        .oneshot(json_request("PATCH", &uri, json!({ "status": "SORTIE" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let exited = body_json(response).await;
    assert_eq!(exited["status"], "SORTIE");
    assert_eq!(exited["entry_at"], entry_at);
    assert!(exited["exit_at"].is_string());

    // Nothing follows an exit.
    let response = app
        .oneshot(json_request("PATCH", &uri, json!({ "status": "ATTENTE" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn field_patch_writes_per_field_history() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/accreditations/{id}"),
            json!({ "company": "Globex", "stand": "B2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["company"], "Globex");
    assert_eq!(updated["stand"], "B2");

    let response = app
        .oneshot(get(&format!("/accreditations/{id}/history")))
        .await
        .unwrap();
    let history = body_json(response).await;
    let infos: Vec<&Value> = history
        .as_array()
        .unwrap()
        .iter()
        .filter(|entry| entry["action"] == "INFO_UPDATED")
        .collect();
    assert_eq!(infos.len(), 2);
}

#[tokio::test]
async fn noop_patch_adds_no_history() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/accreditations/{id}"),
            json!({ "company": "Acme", "status": "ATTENTE" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/accreditations/{id}/history")))
        .await
        .unwrap();
    let history = body_json(response).await;
    // Only the CREATED entry.
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn blank_company_patch_is_rejected() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/accreditations/{id}"),
            json!({ "company": "  " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vehicle_add_patch_and_delete() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();

    let mut second = sample_vehicle();
    second["plate"] = json!("EF-456-GH");
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/accreditations/{id}/vehicles"),
            second,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let added = body_json(response).await;
    let vehicle_id = added["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/vehicles/{vehicle_id}"),
            json!({ "city": "Lyon", "unloading": ["lat", "rear"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let patched = body_json(response).await;
    assert_eq!(patched["city"], "Lyon");
    assert_eq!(patched["unloading"], json!(["lat", "rear"]));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/vehicles/{vehicle_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // One vehicle left; it cannot be removed.
    let response = app.clone().oneshot(get(&format!("/accreditations/{id}"))).await.unwrap();
    let record = body_json(response).await;
    let last_id = record["vehicles"][0]["id"].as_str().unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/vehicles/{last_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn replace_vehicles_regenerates_ids() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();
    let old_vehicle_id = record["vehicles"][0]["id"].as_str().unwrap().to_string();

    let mut replacement = sample_vehicle();
    replacement["plate"] = json!("ZZ-999-ZZ");
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/accreditations/{id}/vehicles"),
            json!({ "vehicles": [replacement] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    let vehicles = updated["vehicles"].as_array().unwrap();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0]["plate"], "ZZ-999-ZZ");
    assert_ne!(vehicles[0]["id"].as_str().unwrap(), old_vehicle_id);

    // Empty replacement set is rejected.
    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/accreditations/{id}/vehicles"),
            json!({ "vehicles": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_survives_deletion() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/accreditations/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(get(&format!("/accreditations/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get(&format!("/accreditations/{id}/history")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_json(response).await;
    let entries = history.as_array().unwrap();
    // Newest first: the deletion tops the trail.
    assert_eq!(entries[0]["action"], "DELETED");
    assert!(entries.iter().any(|entry| entry["action"] == "CREATED"));
}

#[tokio::test]
async fn manual_history_entry() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/accreditations/{id}/history"),
            json!({ "action": "INFO_UPDATED", "description": "Vérification téléphonique" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry = body_json(response).await;
    assert_eq!(entry["description"], "Vérification téléphonique");

    let response = app
        .oneshot(json_request(
            "POST",
            "/accreditations/00000000-0000-0000-0000-000000000000/history",
            json!({ "action": "INFO_UPDATED", "description": "x" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn send_without_mailer_is_503() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/accreditations/{id}/send"),
            json!({ "email": "exposant@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn send_without_recipient_is_400() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();

    // No address on the request and none stored on the record.
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/accreditations/{id}/send"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stateless_pdf_render_returns_pdf_bytes() {
    let app = test_app();
    let payload = json!({
        "company": "Acme",
        "stand": "A1",
        "unloading": "Palais",
        "event": "festival",
        "message": "Merci de vous présenter porte K.",
        "consent": true,
        "status": "ATTENTE",
        "vehicles": [sample_vehicle()]
    });

    let response = app
        .oneshot(json_request("POST", "/accreditation/pdf", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn stored_record_pdf_download() {
    let app = test_app();
    let record = create(&app, sample_submission()).await;
    let id = record["id"].as_str().unwrap();

    let response = app
        .oneshot(get(&format!("/accreditations/{id}/pdf")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn dashboard_filters_and_clamps_pages() {
    let app = test_app();
    for i in 0..3 {
        let mut payload = sample_submission();
        payload["company"] = json!(format!("Company {i}"));
        create(&app, payload).await;
    }

    let response = app.clone().oneshot(get("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 1);
    assert_eq!(page["redirected"], false);

    // Out-of-range page is clamped and flagged.
    let response = app.clone().oneshot(get("/dashboard?page=99")).await.unwrap();
    let page = body_json(response).await;
    assert_eq!(page["page"], 1);
    assert_eq!(page["redirected"], true);

    // Status filter with no match yields an empty page.
    let response = app
        .oneshot(get("/dashboard?status=SORTIE"))
        .await
        .unwrap();
    let page = body_json(response).await;
    assert_eq!(page["total"], 0);
    assert_eq!(page["rows"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn list_is_newest_first() {
    let app = test_app();
    let mut first = sample_submission();
    first["company"] = json!("First");
    create(&app, first).await;
    let mut second = sample_submission();
    second["company"] = json!("Second");
    create(&app, second).await;

    let response = app.oneshot(get("/accreditations")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    let rows = list.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["company"], "Second");
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let app = test_app();
    let response = app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let spec = body_json(response).await;
    assert!(spec["paths"]["/accreditations"].is_object());
    assert!(spec["paths"]["/dashboard"].is_object());
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/accreditations")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
