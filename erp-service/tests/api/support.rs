use axum::http::StatusCode;
use serde_json::json;

use crate::util::{id_of, TestApp};

fn ticket(title: &str) -> serde_json::Value {
    json!({ "title": title, "description": "Não consigo emitir a nota", "category": "fiscal" })
}

#[tokio::test]
async fn tickets_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let (owner_id, owner) = app.user("ana", json!(null)).await;
    let (_, other) = app.user("bia", json!(null)).await;

    let (status, created) = app.post("/api/support/tickets", &owner, ticket("Erro na NF-e")).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["status"], "aberto");
    assert_eq!(created["priority"], "normal");
    assert_eq!(created["userId"], owner_id);
    let uri = format!("/api/support/tickets/{}", id_of(&created));

    let (status, _) = app.get(&uri, &other).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, listed) = app.get("/api/support/tickets", &other).await;
    assert_eq!(listed, json!([]));

    let (status, _) = app.get(&uri, &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    let (_, all) = app.get("/api/support/tickets", &app.admin).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    assert_eq!(app.delete(&uri, &other).await, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, &owner).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn closing_a_ticket_stamps_closed_at() {
    let app = TestApp::new().await;
    let (_, owner) = app.user("caio", json!(null)).await;
    let (_, created) = app.post("/api/support/tickets", &owner, ticket("Lentidão")).await;
    let uri = format!("/api/support/tickets/{}", id_of(&created));
    assert!(created["closedAt"].is_null());

    let (status, closed) = app.patch(&uri, &owner, json!({ "status": "fechado", "resolution": "ok" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(closed["closedAt"].is_string());

    let (_, reopened) = app.patch(&uri, &owner, json!({ "status": "em_andamento" })).await;
    assert!(reopened["closedAt"].is_null());

    let (status, _) = app.patch(&uri, &owner, json!({ "priority": "apocalíptica" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn articles_count_views_and_hide_drafts() {
    let app = TestApp::new().await;
    let (_, reader) = app.user("leitor", json!(null)).await;

    let (status, _) = app
        .post(
            "/api/support/knowledge",
            &reader,
            json!({ "title": "x", "content": "y", "category": "z" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, article) = app
        .post(
            "/api/support/knowledge",
            &app.admin,
            json!({ "title": "Como emitir NF-e", "content": "Passo a passo", "category": "fiscal", "tags": "nfe,sefaz" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(article["views"], 0);
    let (_, draft) = app
        .post(
            "/api/support/knowledge",
            &app.admin,
            json!({ "title": "Rascunho", "content": "em breve", "category": "fiscal", "published": false }),
        )
        .await;

    let uri = format!("/api/support/knowledge/{}", id_of(&article));
    app.get(&uri, &reader).await;
    let (_, seen) = app.get(&uri, &reader).await;
    assert_eq!(seen["views"], 2);

    let (status, _) = app.get(&format!("/api/support/knowledge/{}", id_of(&draft)), &reader).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.get("/api/support/knowledge", &reader).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let (_, found) = app.get("/api/support/knowledge?search=SEFAZ", &reader).await;
    assert_eq!(found[0]["id"], article["id"]);
    let (_, admin_view) = app.get("/api/support/knowledge", &app.admin).await;
    assert_eq!(admin_view.as_array().unwrap().len(), 2);
}
