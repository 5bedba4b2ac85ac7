use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{json, Value};

use crate::util::{id_of, TestApp};

fn press() -> Value {
    json!({
        "name": "Prensa hidráulica",
        "sector": "Estamparia",
        "type": "prensa",
        "criticality": "high",
    })
}

async fn equipment(app: &TestApp) -> i32 {
    let (status, equipment) = app.post("/api/equipment", &app.admin, press()).await;
    assert_eq!(status, StatusCode::CREATED, "{equipment}");
    assert_eq!(equipment["status"], "operational");
    id_of(&equipment)
}

fn order(equipment: i32, urgency: &str) -> Value {
    json!({
        "equipmentId": equipment,
        "type": "corrective",
        "description": "Vazamento no cilindro",
        "urgency": urgency,
        "scheduledDate": "2025-05-20",
    })
}

#[tokio::test]
async fn maintenance_routes_need_the_maintenance_permission() {
    let app = TestApp::new().await;
    let (_, token) = app.user("producao", json!({ "production": true })).await;
    let (status, _) = app.get("/api/equipment", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/maintenance-orders", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn equipment_levels_and_statuses_are_checked() {
    let app = TestApp::new().await;
    let mut bad = press();
    bad["criticality"] = json!("extreme");
    let (status, _) = app.post("/api/equipment", &app.admin, bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = equipment(&app).await;
    let (status, _) = app
        .patch(&format!("/api/equipment/{id}"), &app.admin, json!({ "status": "melted" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, broken) = app
        .patch(&format!("/api/equipment/{id}"), &app.admin, json!({ "status": "broken" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(broken["status"], "broken");
}

#[tokio::test]
async fn equipment_with_orders_cannot_be_deleted() {
    let app = TestApp::new().await;
    let id = equipment(&app).await;
    let (status, created) = app.post("/api/maintenance-orders", &app.admin, order(id, "low")).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["orderNumber"], "OM-2025-0001");

    let (_, detail) = app.get(&format!("/api/equipment/{id}"), &app.admin).await;
    assert_eq!(detail["maintenanceOrders"].as_array().unwrap().len(), 1);

    assert_eq!(app.delete(&format!("/api/equipment/{id}"), &app.admin).await, StatusCode::BAD_REQUEST);
    let order = id_of(&created);
    assert_eq!(app.delete(&format!("/api/maintenance-orders/{order}"), &app.admin).await, StatusCode::NO_CONTENT);
    assert_eq!(app.delete(&format!("/api/equipment/{id}"), &app.admin).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn orders_need_existing_equipment_and_known_kinds() {
    let app = TestApp::new().await;
    let id = equipment(&app).await;
    let (status, _) = app.post("/api/maintenance-orders", &app.admin, order(999, "low")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post("/api/maintenance-orders", &app.admin, order(id, "panic")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let mut predictive = order(id, "low");
    predictive["type"] = json!("predictive");
    let (status, _) = app.post("/api/maintenance-orders", &app.admin, predictive).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completing_stamps_the_date_and_is_final() {
    let app = TestApp::new().await;
    let equipment = equipment(&app).await;
    let (_, created) = app.post("/api/maintenance-orders", &app.admin, order(equipment, "high")).await;
    let id = id_of(&created);
    let status_uri = format!("/api/maintenance-orders/{id}/status");

    let (status, _) = app
        .patch(&format!("/api/maintenance-orders/{id}"), &app.admin, json!({ "status": "completed" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, working) = app.patch(&status_uri, &app.admin, json!({ "status": "in-progress" })).await;
    assert_eq!(working["status"], "in-progress");
    assert!(working["completionDate"].is_null());

    let (status, done) = app.patch(&status_uri, &app.admin, json!({ "status": "completed" })).await;
    assert_eq!(status, StatusCode::OK, "{done}");
    assert_eq!(done["completionDate"], Utc::now().date_naive().to_string());

    let (status, _) = app.patch(&status_uri, &app.admin, json!({ "status": "open" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
