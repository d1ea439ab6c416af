//! Bulk reorder and health integration tests.
//!
//! Run with: `cargo test -p vitrine-api --test reorder_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{api_path, setup_test_app};
use serde_json::{json, Value};
use uuid::Uuid;
use vitrine_core::EntityType;

async fn seeded_app(count: usize) -> (helpers::TestApp, Vec<Uuid>) {
    let app = setup_test_app().await;
    let ids: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
    app.state.positions.seed(EntityType::TeamMember, &ids).await;
    (app, ids)
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app().await;
    let response = app.client().get("/health").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "s3");
}

#[tokio::test]
async fn test_reorder_moves_last_to_front() {
    let (app, ids) = seeded_app(4).await;
    let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);

    let response = app
        .client()
        .put(&api_path("/team-members/reorder"))
        .json(&json!({"items": [
            {"id": d, "position": 1},
            {"id": a, "position": 2},
            {"id": b, "position": 3},
            {"id": c, "position": 4},
        ]}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({"updated": 4}));
}

#[tokio::test]
async fn test_reorder_rejects_partial_set() {
    let (app, ids) = seeded_app(3).await;
    let response = app
        .client()
        .put(&api_path("/team-members/reorder"))
        .json(&json!({"items": [
            {"id": ids[1], "position": 1},
            {"id": ids[0], "position": 2},
        ]}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reorder_rejects_gaps_and_duplicates() {
    let (app, ids) = seeded_app(2).await;
    let client = app.client();

    let gap = client
        .put(&api_path("/team-members/reorder"))
        .json(&json!({"items": [
            {"id": ids[0], "position": 1},
            {"id": ids[1], "position": 3},
        ]}))
        .await;
    gap.assert_status(StatusCode::BAD_REQUEST);

    let duplicate = client
        .put(&api_path("/team-members/reorder"))
        .json(&json!({"items": [
            {"id": ids[0], "position": 1},
            {"id": ids[0], "position": 2},
        ]}))
        .await;
    duplicate.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reorder_unknown_ids_and_types() {
    let (app, ids) = seeded_app(1).await;
    let client = app.client();

    let stranger = client
        .put(&api_path("/team-members/reorder"))
        .json(&json!({"items": [{"id": Uuid::new_v4(), "position": 1}]}))
        .await;
    stranger.assert_status(StatusCode::NOT_FOUND);

    let wrong_type = client
        .put(&api_path("/widgets/reorder"))
        .json(&json!({"items": [{"id": ids[0], "position": 1}]}))
        .await;
    wrong_type.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_seed_file_enables_reorder() {
    let app = setup_test_app().await;
    let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("positions.json");
    std::fs::write(
        &path,
        json!({"brands": [first, second]}).to_string(),
    )
    .unwrap();

    let loaded = vitrine_api::setup::seed::load_positions(&path, &app.state.positions)
        .await
        .unwrap();
    assert_eq!(loaded, 1);

    let response = app
        .client()
        .put(&api_path("/brands/reorder"))
        .json(&json!({"items": [
            {"id": second, "position": 1},
            {"id": first, "position": 2},
        ]}))
        .await;
    assert_eq!(response.json::<Value>()["updated"], 2);
}
