use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::util::{id_of, TestApp};

fn account(kind: &str, amount: f64, due: &str) -> Value {
    json!({
        "description": "Duplicata 123",
        "amount": amount,
        "dueDate": due,
        "type": kind,
        "entityName": "Metalúrgica Souza",
    })
}

#[tokio::test]
async fn finance_routes_need_the_finance_permission() {
    let app = TestApp::new().await;
    let (_, token) = app.user("comprador", json!({ "purchase": true })).await;
    let (status, _) = app.get("/api/expenses", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/accounts", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expenses_are_paid_once_and_filter_by_payment() {
    let app = TestApp::new().await;
    let token = &app.admin;
    let (status, rent) = app
        .post(
            "/api/expenses",
            token,
            json!({ "description": "Aluguel", "amount": 3500.0, "dueDate": "2025-03-10", "category": "fixed" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{rent}");
    assert!(rent["paymentDate"].is_null());
    app.post(
        "/api/expenses",
        token,
        json!({ "description": "Energia", "amount": 820.5, "dueDate": "2025-03-05", "category": "utilities" }),
    )
    .await;

    let (_, all) = app.get("/api/expenses", token).await;
    let all = all.as_array().unwrap();
    assert_eq!(all[0]["description"], "Energia");

    let rent = id_of(&rent);
    let (status, paid) = app
        .patch(&format!("/api/expenses/{rent}/pay"), token, json!({ "paymentDate": "2025-03-09" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{paid}");
    assert_eq!(paid["paymentDate"], "2025-03-09");
    let (status, _) = app.patch(&format!("/api/expenses/{rent}/pay"), token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, unpaid) = app.get("/api/expenses?paid=false", token).await;
    assert_eq!(unpaid.as_array().unwrap().len(), 1);
    let (_, fixed) = app.get("/api/expenses?category=fixed", token).await;
    assert_eq!(fixed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn negative_amounts_are_refused() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post("/api/accounts", &app.admin, account("payable", -1.0, "2025-04-01"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post("/api/accounts", &app.admin, account("loan", 10.0, "2025-04-01"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn accounts_start_pending_and_are_paid_once() {
    let app = TestApp::new().await;
    let token = &app.admin;
    let (status, bill) = app.post("/api/accounts", token, account("payable", 900.0, "2025-04-01")).await;
    assert_eq!(status, StatusCode::CREATED, "{bill}");
    assert_eq!(bill["status"], "pending");
    assert_eq!(bill["type"], "payable");
    app.post("/api/accounts", token, account("receivable", 1200.0, "2025-04-15")).await;

    let (_, receivables) = app.get("/api/accounts?type=receivable", token).await;
    assert_eq!(receivables.as_array().unwrap().len(), 1);
    let (status, _) = app.get("/api/accounts?status=late", token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bill = id_of(&bill);
    let (status, paid) = app.patch(&format!("/api/accounts/{bill}/pay"), token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    let (status, _) = app.patch(&format!("/api/accounts/{bill}/pay"), token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.delete(&format!("/api/accounts/{bill}"), token).await, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/accounts/{bill}"), token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
