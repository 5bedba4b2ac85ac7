use axum::http::StatusCode;
use serde_json::json;

use crate::util::{id_of, TestApp};

#[tokio::test]
async fn the_dashboard_needs_its_permission() {
    let app = TestApp::new().await;
    let (_, token) = app.user("suporte", json!({ "support": true })).await;
    let (status, _) = app.get("/api/dashboard", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, token) = app.user("gerente", json!({ "dashboard": true })).await;
    let (status, _) = app.get("/api/dashboard", &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn an_empty_plant_reports_zeros() {
    let app = TestApp::new().await;
    let (status, dashboard) = app.get("/api/dashboard", &app.admin).await;
    assert_eq!(status, StatusCode::OK, "{dashboard}");
    assert_eq!(dashboard["production"]["count"], 0);
    assert_eq!(dashboard["maintenance"]["openCount"], 0);
    assert_eq!(dashboard["inventory"]["lowStockItems"], json!([]));
    assert_eq!(dashboard["financial"]["receivableTotal"], 0.0);
    assert_eq!(dashboard["recentOrders"], json!([]));
}

#[tokio::test]
async fn the_dashboard_sums_up_every_area() {
    let app = TestApp::new().await;
    let token = &app.admin;

    let (_, product) = app.post("/api/products", token, json!({ "name": "Painel", "code": "PE-01" })).await;
    let mut orders = Vec::new();
    for _ in 0..4 {
        let (_, order) = app
            .post("/api/production-orders", token, json!({ "productId": id_of(&product), "quantity": 1.0 }))
            .await;
        orders.push(id_of(&order));
    }
    app.patch(&format!("/api/production-orders/{}/status", orders[0]), token, json!({ "status": "in-progress" }))
        .await;

    let (_, press) = app
        .post(
            "/api/equipment",
            token,
            json!({ "name": "Prensa", "sector": "Estamparia", "type": "prensa", "criticality": "high" }),
        )
        .await;
    for urgency in ["high", "high", "low"] {
        app.post(
            "/api/maintenance-orders",
            token,
            json!({ "equipmentId": id_of(&press), "type": "corrective", "description": "Ajuste", "urgency": urgency }),
        )
        .await;
    }
    let (_, all_maintenance) = app.get("/api/maintenance-orders", token).await;
    let urgent = all_maintenance.as_array().unwrap().iter().find(|o| o["urgency"] == "high").unwrap().clone();
    app.patch(
        &format!("/api/maintenance-orders/{}/status", id_of(&urgent)),
        token,
        json!({ "status": "completed" }),
    )
    .await;

    app.post(
        "/api/raw-materials",
        token,
        json!({ "name": "Aço", "code": "ACO", "unit": "kg", "currentStock": 1.0, "minimumStock": 5.0 }),
    )
    .await;

    for (kind, amount, status) in [
        ("receivable", 100.25, "pending"),
        ("receivable", 50.5, "paid"),
        ("payable", 80.0, "pending"),
        ("payable", 20.0, "paid"),
    ] {
        app.post(
            "/api/accounts",
            token,
            json!({ "description": "Título", "amount": amount, "dueDate": "2025-07-01", "type": kind, "status": status, "entityName": "Parceiro" }),
        )
        .await;
    }

    let (_, dashboard) = app.get("/api/dashboard", token).await;
    assert_eq!(dashboard["production"], json!({ "count": 4, "inProgress": 1, "completed": 0, "planned": 3 }));
    assert_eq!(dashboard["maintenance"], json!({ "openCount": 2, "urgentCount": 1 }));
    assert_eq!(dashboard["inventory"]["lowStockCount"], 1);
    assert_eq!(dashboard["inventory"]["lowStockItems"][0]["code"], "ACO");
    assert_eq!(dashboard["financial"]["receivableTotal"], 150.75);
    assert_eq!(dashboard["financial"]["upcomingPayments"], 1);

    let recent = dashboard["recentOrders"].as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0]["id"], orders[3]);
    assert_eq!(dashboard["recentAccounts"].as_array().unwrap().len(), 3);
}
