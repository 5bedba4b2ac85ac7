use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::util::{id_of, TestApp, ADMIN};

#[tokio::test]
async fn health_check_needs_no_token() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "username": "maria",
                "password": "segredo1",
                "fullName": "Maria Souza",
                "email": "maria@custosmart.local",
                "role": "admin",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "maria");
    // Open registration cannot pick a role.
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["permissions"]["hr"], false);
    assert!(body["user"].get("password").is_none());

    let token = app.login("maria", "segredo1").await;
    let (status, me) = app.get("/api/user", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "maria");
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = TestApp::new().await;
    app.user("joao", json!(null)).await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "username": "joao",
                "password": "outra",
                "fullName": "Outro Joao",
                "email": "outro@custosmart.local",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = TestApp::new().await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": ADMIN, "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "ghost", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new().await;
    let (status, _) = app.send(Method::GET, "/api/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/user", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = TestApp::new().await;
    let (id, token) = app.user("carla", json!(null)).await;

    let (status, _) = app.get("/api/users", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = app.get("/api/users", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let (status, updated) = app
        .patch(
            &format!("/api/users/{id}/permissions"),
            &app.admin,
            json!({ "permissions": { "hr": true } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["permissions"]["hr"], true);
    assert_eq!(updated["permissions"]["fiscal"], false);

    let (status, _) = app
        .patch(
            &format!("/api/users/{id}/permissions"),
            &token,
            json!({ "permissions": { "admin": true } }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn audit_log_records_admin_writes() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post("/api/company", &app.admin, json!({ "name": "CustoSmart Ltda" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = app
        .get("/api/system-audit-logs?module=admin&entityType=company", &app.admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    let logs = page["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["action"], "create");
    assert_eq!(logs[0]["username"], ADMIN);
    assert_eq!(page["pagination"]["totalCount"], 1);
    assert_eq!(page["pagination"]["page"], 1);

    let (status, _) = app.get("/api/system-audit-logs?sortOrder=sideways", &app.admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, token) = app.user("auditor", json!(null)).await;
    let (status, _) = app.get("/api/system-audit-logs", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn alerts_move_from_active_to_resolved() {
    let app = TestApp::new().await;
    let (status, low) = app
        .post(
            "/api/alerts",
            &app.admin,
            json!({ "message": "Estoque baixo", "priority": "low", "module": "inventory" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(low["status"], "active");
    let (_, high) = app
        .post(
            "/api/alerts",
            &app.admin,
            json!({ "message": "Caldeira parada", "priority": "high", "module": "maintenance" }),
        )
        .await;

    let (_, active) = app.get("/api/alerts/active", &app.admin).await;
    let ids: Vec<i64> = active.as_array().unwrap().iter().map(|a| a["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![high["id"].as_i64().unwrap(), low["id"].as_i64().unwrap()]);

    let ack = format!("/api/alerts/{}/acknowledge", id_of(&low));
    let (status, acked) = app.patch(&ack, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(acked["status"], "acknowledged");
    let (status, _) = app.patch(&ack, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, resolved) = app
        .patch(&format!("/api/alerts/{}/resolve", id_of(&low)), &app.admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved");

    let (_, active) = app.get("/api/alerts/active", &app.admin).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_alert_module_is_rejected() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post("/api/alerts", &app.admin, json!({ "message": "x", "module": "astrology" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn company_profile_is_a_singleton() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/company", &app.admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/company", &app.admin, json!({ "name": "CustoSmart", "taxId": "11222333000100" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, company) = app
        .post(
            "/api/company",
            &app.admin,
            json!({ "name": "CustoSmart", "taxId": "11.222.333/0001-81" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(company["taxId"], "11222333000181");

    let (status, _) = app.post("/api/company", &app.admin, json!({ "name": "Outra" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, token) = app.user("viewer", json!(null)).await;
    let (status, fetched) = app.get("/api/company", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "CustoSmart");
}
