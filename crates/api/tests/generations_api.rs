mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use serde_json::json;
use studio_api::store::GenerationStore;
use studio_core::generation::GenerationStatus;

use common::{build_test_app, delete, get, post_json, send_json};

const NANO: &str = "google/gemini-2.5-flash-image";
const FLUX: &str = "black-forest-labs/flux.2-max";

async fn submit(app: &common::TestApp, body: serde_json::Value) -> String {
    let (status, json) = send_json(&app.router, post_json("/api/generations", body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {json}");
    assert_eq!(json["data"]["status"], "processing");
    json["data"]["generationId"].as_str().unwrap().to_string()
}

async fn wait_until_terminal(app: &common::TestApp, id: &str) {
    for _ in 0..200 {
        let record = app.store.get(id).await.unwrap().unwrap();
        if record.status.is_terminal() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("generation {id} never finished");
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn models_endpoint_lists_catalog() {
    let app = build_test_app();

    let (status, json) = send_json(&app.router, get("/api/models")).await;

    assert_eq!(status, StatusCode::OK);
    let models = json["data"].as_array().unwrap();
    assert_eq!(models.len(), 6);
    assert!(models.iter().any(|m| m["id"] == NANO && m["name"] == "Nano Banana"));
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_creates_pending_model_rows_and_completes_in_background() {
    let app = build_test_app();

    let id = submit(
        &app,
        json!({ "prompt": "sunset", "aspectRatio": "16:9", "modelIds": [NANO, FLUX] }),
    )
    .await;

    let record = app.store.get(&id).await.unwrap().unwrap();
    assert_eq!(record.aspect_ratio, "16:9");
    assert_eq!(record.models.len(), 2);
    assert_eq!(record.models[0].model_name, "Nano Banana");

    wait_until_terminal(&app, &id).await;
    let record = app.store.get(&id).await.unwrap().unwrap();
    assert_eq!(record.status, GenerationStatus::Completed);
    assert_eq!(record.images.len(), 2);
    assert!(record
        .models
        .iter()
        .all(|m| m.status == GenerationStatus::Completed));
}

#[tokio::test]
async fn aspect_ratio_defaults_to_square() {
    let app = build_test_app();

    let id = submit(&app, json!({ "prompt": "fox", "modelIds": [NANO] })).await;

    let record = app.store.get(&id).await.unwrap().unwrap();
    assert_eq!(record.aspect_ratio, "1:1");
}

#[tokio::test]
async fn failing_model_is_recorded_and_generation_still_completes() {
    let app = build_test_app();

    let id = submit(
        &app,
        json!({ "prompt": "fox", "modelIds": [NANO, "vendor/broken-model"] }),
    )
    .await;
    wait_until_terminal(&app, &id).await;

    let (status, json) = send_json(&app.router, common::get(&format!("/api/generations/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(json["data"]["images"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["models"][1]["status"], "failed");
    assert_eq!(json["data"]["models"][1]["modelName"], "vendor/broken-model");
}

#[tokio::test]
async fn submit_validation_errors_are_400() {
    let app = build_test_app();

    let cases = [
        json!({ "prompt": "   ", "modelIds": [NANO] }),
        json!({ "prompt": "fox", "modelIds": [] }),
        json!({ "prompt": "fox", "modelIds": [NANO], "aspectRatio": "7:5" }),
    ];
    for body in cases {
        let (status, json) = send_json(&app.router, post_json("/api/generations", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_matches!(json["error"].as_str(), Some(msg) if !msg.is_empty());
    }
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let app = build_test_app();

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/generations")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, _) = common::send(&app.router, request).await;

    assert!(status.is_client_error());
}

// ---------------------------------------------------------------------------
// List / detail / delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_is_newest_first_with_pagination() {
    let app = build_test_app();
    let first = submit(&app, json!({ "prompt": "one", "modelIds": [NANO] })).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = submit(&app, json!({ "prompt": "two", "modelIds": [NANO] })).await;

    let (status, json) = send_json(&app.router, get("/api/generations")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    let (_, page) = send_json(&app.router, get("/api/generations?limit=1&offset=1")).await;
    let page = page["data"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["id"], first.as_str());
}

#[tokio::test]
async fn unknown_generation_detail_is_404() {
    let app = build_test_app();

    let (status, json) = send_json(&app.router, get("/api/generations/missing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn delete_removes_generation() {
    let app = build_test_app();
    let id = submit(&app, json!({ "prompt": "fox", "modelIds": [NANO] })).await;
    wait_until_terminal(&app, &id).await;

    let uri = format!("/api/generations/{id}");
    let (status, json) = send_json(&app.router, delete(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["success"], true);

    let (status, _) = send_json(&app.router, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(&app.router, delete(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
