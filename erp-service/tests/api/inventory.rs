use axum::http::StatusCode;
use serde_json::json;

use crate::util::{id_of, TestApp};

async fn material(app: &TestApp, code: &str, current: f64, minimum: f64) -> i32 {
    let (status, material) = app
        .post(
            "/api/raw-materials",
            &app.admin,
            json!({ "name": format!("Material {code}"), "code": code, "unit": "kg", "currentStock": current, "minimumStock": minimum }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{material}");
    id_of(&material)
}

#[tokio::test]
async fn inventory_routes_need_the_inventory_permission() {
    let app = TestApp::new().await;
    let (_, token) = app.user("qualidade", json!({ "quality": true })).await;
    let (status, _) = app.get("/api/inventory/transactions", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/inventory/low-stock", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn movements_move_the_stock() {
    let app = TestApp::new().await;
    let steel = material(&app, "ACO", 10.0, 0.0).await;

    let (status, entry) = app
        .post(
            "/api/inventory/transactions",
            &app.admin,
            json!({ "materialId": steel, "quantity": 5.0, "transactionType": "in", "lotNumber": "L-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");
    assert_eq!(entry["material"]["currentStock"], 15.0);
    assert_eq!(entry["transaction"]["lotNumber"], "L-1");

    let (_, exit) = app
        .post(
            "/api/inventory/transactions",
            &app.admin,
            json!({ "materialId": steel, "quantity": 12.0, "transactionType": "out" }),
        )
        .await;
    assert_eq!(exit["material"]["currentStock"], 3.0);

    let (_, listed) = app.get(&format!("/api/inventory/transactions?materialId={steel}"), &app.admin).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["transactionType"], "out");

    let id = entry["transaction"]["id"].as_i64().unwrap();
    let (status, _) = app.get(&format!("/api/inventory/transactions/{id}"), &app.admin).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.delete(&format!("/api/raw-materials/{steel}"), &app.admin).await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stock_never_goes_negative() {
    let app = TestApp::new().await;
    let steel = material(&app, "ACO", 2.0, 0.0).await;
    for (quantity, kind) in [(3.0, "out"), (0.0, "in"), (1.0, "transfer")] {
        let (status, _) = app
            .post(
                "/api/inventory/transactions",
                &app.admin,
                json!({ "materialId": steel, "quantity": quantity, "transactionType": kind }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{quantity} {kind}");
    }
    let (status, _) = app
        .post(
            "/api/inventory/transactions",
            &app.admin,
            json!({ "materialId": 999, "quantity": 1.0, "transactionType": "in" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, material) = app.get(&format!("/api/raw-materials/{steel}"), &app.admin).await;
    assert_eq!(material["currentStock"], 2.0);
    let (_, listed) = app.get("/api/inventory/transactions", &app.admin).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn low_stock_lists_materials_below_their_minimum() {
    let app = TestApp::new().await;
    material(&app, "ACO", 4.0, 10.0).await;
    material(&app, "CABO", 1.0, 20.0).await;
    material(&app, "TINTA", 5.0, 5.0).await;

    let (status, low) = app.get("/api/inventory/low-stock", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    let low = low.as_array().unwrap();
    assert_eq!(low.len(), 2);
    assert_eq!(low[0]["code"], "CABO");
    assert_eq!(low[0]["shortfall"], 19.0);
}
