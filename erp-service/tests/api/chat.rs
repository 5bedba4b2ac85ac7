use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use futures::StreamExt;
use serde_json::{json, Value};

use crate::util::{id_of, read_json, TestApp};

async fn room(app: &TestApp, token: &str, body: Value) -> Value {
    let (status, room) = app.post("/api/chat/rooms", token, body).await;
    assert_eq!(status, StatusCode::CREATED, "{room}");
    room
}

async fn say(app: &TestApp, token: &str, room: i32, content: &str) -> Value {
    let (status, message) = app
        .post(&format!("/api/chat/rooms/{room}/messages"), token, json!({ "content": content }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{message}");
    message
}

fn multipart(room: &str, file_name: &str, content: &str) -> (String, String) {
    let boundary = "erp-test-boundary".to_string();
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"roomId\"\r\n\r\n{room}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/plain\r\n\r\n{content}\r\n--{b}--\r\n",
        b = boundary
    );
    (boundary, body)
}

async fn upload(app: &TestApp, token: &str, room: &str, file_name: &str, content: &str) -> (StatusCode, Value) {
    let (boundary, body) = multipart(room, file_name, content);
    let request = Request::post("/api/chat/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap();
    read_json(app.raw(request).await).await
}

#[tokio::test]
async fn rooms_start_with_owner_and_members() {
    let app = TestApp::new().await;
    let (ana_id, ana) = app.user("ana", json!(null)).await;
    let (bia_id, _) = app.user("bia", json!(null)).await;

    let created = room(
        &app,
        &ana,
        json!({ "name": "Produção", "participants": [bia_id, bia_id, ana_id] }),
    )
    .await;
    assert_eq!(created["type"], "channel");
    assert_eq!(created["visibility"], "public");

    let (status, members) = app
        .get(&format!("/api/chat/rooms/{}/participants", id_of(&created)), &ana)
        .await;
    assert_eq!(status, StatusCode::OK);
    let members = members.as_array().unwrap();
    assert_eq!(members.len(), 2);
    let owner = members.iter().find(|m| m["userId"] == ana_id).unwrap();
    assert_eq!(owner["isOwner"], true);
    assert_eq!(owner["username"], "ana");
    let member = members.iter().find(|m| m["userId"] == bia_id).unwrap();
    assert_eq!(member["isOwner"], false);

    let (status, _) = app
        .post("/api/chat/rooms", &ana, json!({ "name": "DM", "type": "direct" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, rooms) = app.get("/api/chat/rooms", &app.admin).await;
    assert_eq!(rooms, json!([]));
}

#[tokio::test]
async fn direct_rooms_are_reused() {
    let app = TestApp::new().await;
    let (ana_id, ana) = app.user("ana", json!(null)).await;
    let (bia_id, bia) = app.user("bia", json!(null)).await;

    let (status, first) = app.post(&format!("/api/chat/direct/{bia_id}"), &ana, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["type"], "direct");
    assert_eq!(first["visibility"], "private");
    assert_eq!(first["name"], "ana & bia");

    let (_, again) = app.post(&format!("/api/chat/direct/{ana_id}"), &bia, json!({})).await;
    assert_eq!(again["id"], first["id"]);

    let (status, _) = app.post(&format!("/api/chat/direct/{ana_id}"), &ana, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nobody else gets in.
    let (carla_id, _) = app.user("carla", json!(null)).await;
    let (status, _) = app
        .post(
            &format!("/api/chat/rooms/{}/participants", id_of(&first)),
            &ana,
            json!({ "userId": carla_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn membership_rules() {
    let app = TestApp::new().await;
    let (ana_id, ana) = app.user("ana", json!(null)).await;
    let (bia_id, bia) = app.user("bia", json!(null)).await;
    let (carla_id, carla) = app.user("carla", json!(null)).await;
    let public = id_of(&room(&app, &ana, json!({ "name": "Geral" })).await);
    let private = id_of(&room(&app, &ana, json!({ "name": "Diretoria", "visibility": "private" })).await);

    let (status, _) = app.get(&format!("/api/chat/rooms/{private}/participants"), &bia).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&format!("/api/chat/rooms/{public}/participants"), &bia).await;
    assert_eq!(status, StatusCode::OK);

    // Joining a public room alone is fine; a private one needs a room admin.
    let (status, _) = app
        .post(&format!("/api/chat/rooms/{public}/participants"), &bia, json!({ "userId": bia_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(&format!("/api/chat/rooms/{public}/participants"), &bia, json!({ "userId": bia_id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app
        .post(&format!("/api/chat/rooms/{private}/participants"), &bia, json!({ "userId": bia_id }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post(&format!("/api/chat/rooms/{public}/participants"), &bia, json!({ "userId": carla_id }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post(&format!("/api/chat/rooms/{private}/participants"), &ana, json!({ "userId": carla_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post(&format!("/api/chat/rooms/{private}/messages"), &bia, json!({ "content": "oi" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/chat/rooms/999/messages", &bia).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let owner = format!("/api/chat/rooms/{private}/participants/{ana_id}");
    assert_eq!(app.delete(&owner, &ana).await, StatusCode::BAD_REQUEST);
    assert_eq!(
        app.delete(&format!("/api/chat/rooms/{public}/participants/{bia_id}"), &carla).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.delete(&format!("/api/chat/rooms/{private}/participants/{carla_id}"), &carla).await,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        app.delete(&format!("/api/chat/rooms/{public}/participants/{bia_id}"), &ana).await,
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn messages_page_newest_first_and_bump_the_room() {
    let app = TestApp::new().await;
    let (_, ana) = app.user("ana", json!(null)).await;
    let quiet = id_of(&room(&app, &ana, json!({ "name": "Quieta" })).await);
    let busy = id_of(&room(&app, &ana, json!({ "name": "Movimentada" })).await);
    for n in 1..=3 {
        say(&app, &ana, quiet, &format!("q{n}")).await;
    }
    say(&app, &ana, busy, "b1").await;
    say(&app, &ana, quiet, "q4").await;

    let (_, page) = app
        .get(&format!("/api/chat/rooms/{quiet}/messages?limit=2&offset=1"), &ana)
        .await;
    let contents: Vec<&str> = page.as_array().unwrap().iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["q3", "q2"]);

    let (_, rooms) = app.get("/api/chat/rooms", &ana).await;
    assert_eq!(rooms[0]["id"], quiet);
    assert!(rooms[0]["lastMessageAt"].is_string());

    let (status, _) = app
        .post(&format!("/api/chat/rooms/{quiet}/messages"), &ana, json!({ "content": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post(
            &format!("/api/chat/rooms/{quiet}/messages"),
            &ana,
            json!({ "content": "x", "mentions": "bia" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn threads_stay_inside_their_room() {
    let app = TestApp::new().await;
    let (_, ana) = app.user("ana", json!(null)).await;
    let first = id_of(&room(&app, &ana, json!({ "name": "Um" })).await);
    let second = id_of(&room(&app, &ana, json!({ "name": "Dois" })).await);
    let parent = say(&app, &ana, first, "pergunta").await;

    let (status, reply) = app
        .post(
            &format!("/api/chat/rooms/{first}/messages"),
            &ana,
            json!({ "content": "resposta", "parentId": parent["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(
            &format!("/api/chat/rooms/{second}/messages"),
            &ana,
            json!({ "content": "fora", "parentId": parent["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, thread) = app.get(&format!("/api/chat/messages/{}/thread", id_of(&parent)), &ana).await;
    assert_eq!(thread, json!([reply]));
}

#[tokio::test]
async fn edits_deletes_and_the_audit_trail() {
    let app = TestApp::new().await;
    let (ana_id, ana) = app.user("ana", json!(null)).await;
    let (bia_id, bia) = app.user("bia", json!(null)).await;
    let room_id = id_of(&room(&app, &ana, json!({ "name": "Geral", "participants": [bia_id] })).await);
    let message = say(&app, &bia, room_id, "primeira versão").await;
    let uri = format!("/api/chat/messages/{}", id_of(&message));

    let (status, _) = app.patch(&uri, &ana, json!({ "content": "não é minha" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, edited) = app.patch(&uri, &bia, json!({ "content": "segunda versão" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "segunda versão");
    assert_eq!(edited["editedBy"], bia_id);
    assert!(edited["editedAt"].is_string());

    // The room owner may remove anyone's message.
    assert_eq!(app.delete(&uri, &ana).await, StatusCode::NO_CONTENT);

    let (status, page) = app.get("/api/chat-audit-logs?action=edit", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    let logs = page["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["originalContent"], "primeira versão");
    assert_eq!(logs[0]["newContent"], "segunda versão");
    assert_eq!(logs[0]["username"], "bia");

    let (_, deletes) = app
        .get(&format!("/api/chat-audit-logs?action=delete&userId={ana_id}"), &app.admin)
        .await;
    assert_eq!(deletes["pagination"]["totalCount"], 1);

    let (_, by_room) = app.get(&format!("/api/chat-audit-logs?roomId={room_id}&sortOrder=asc"), &app.admin).await;
    let actions: Vec<&str> = by_room["logs"].as_array().unwrap().iter().map(|l| l["action"].as_str().unwrap()).collect();
    assert_eq!(actions, vec!["send", "edit", "delete"]);

    let (status, _) = app.get("/api/chat-audit-logs?action=shout", &app.admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/chat-audit-logs", &ana).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reactions_toggle_and_reads_are_counted() {
    let app = TestApp::new().await;
    let (ana_id, ana) = app.user("ana", json!(null)).await;
    let (bia_id, bia) = app.user("bia", json!(null)).await;
    let room_id = id_of(&room(&app, &ana, json!({ "name": "Geral", "participants": [bia_id] })).await);
    let message = say(&app, &ana, room_id, "bom dia").await;
    say(&app, &ana, room_id, "tudo certo?").await;
    say(&app, &bia, room_id, "sim").await;

    let react = format!("/api/chat/messages/{}/reactions", id_of(&message));
    let (_, once) = app.post(&react, &bia, json!({ "emoji": "👍" })).await;
    assert_eq!(once["reactions"], json!({ "👍": [bia_id] }));
    let (_, both) = app.post(&react, &ana, json!({ "emoji": "👍" })).await;
    assert_eq!(both["reactions"], json!({ "👍": [bia_id, ana_id] }));
    let (_, undone) = app.post(&react, &bia, json!({ "emoji": "👍" })).await;
    assert_eq!(undone["reactions"], json!({ "👍": [ana_id] }));
    let (status, _) = app.post(&react, &bia, json!({ "emoji": " " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, read) = app.post(&format!("/api/chat/rooms/{room_id}/read"), &bia, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read, json!({ "marked": 2 }));
    let (_, again) = app.post(&format!("/api/chat/rooms/{room_id}/read"), &bia, json!({})).await;
    assert_eq!(again, json!({ "marked": 0 }));
}

#[tokio::test]
async fn uploads_store_the_file_and_post_a_message() {
    let app = TestApp::new().await;
    let (_, ana) = app.user("ana", json!(null)).await;
    let (_, bia) = app.user("bia", json!(null)).await;
    let room_id = id_of(&room(&app, &ana, json!({ "name": "Arquivos" })).await);

    let (status, body) = upload(&app, &ana, &room_id.to_string(), "Relatório.TXT", "conteúdo").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let stored = body["upload"]["fileName"].as_str().unwrap().to_string();
    assert!(stored.ends_with(".txt"));
    assert_eq!(body["upload"]["originalName"], "Relatório.TXT");
    assert_eq!(body["upload"]["fileUrl"], format!("/uploads/{stored}"));
    assert_eq!(body["message"]["content"], "Relatório.TXT");
    assert_eq!(body["message"]["attachments"][0]["mimeType"], "text/plain");
    assert_eq!(body["upload"]["messageId"], body["message"]["id"]);
    assert_eq!(std::fs::read_to_string(app.uploads.join(&stored)).unwrap(), "conteúdo");

    let (status, served) = app.send(axum::http::Method::GET, &format!("/uploads/{stored}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, json!("conteúdo"));

    let (_, listed) = app.get(&format!("/api/chat/{room_id}/uploads"), &ana).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = upload(&app, &bia, &room_id.to_string(), "x.txt", "y").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = upload(&app, &ana, &room_id.to_string(), "vazio.txt", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = upload(&app, &ana, "sala", "x.txt", "y").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let delete = format!("/api/chat/upload/{}", id_of(&body["upload"]));
    assert_eq!(app.delete(&delete, &bia).await, StatusCode::FORBIDDEN);
    assert_eq!(app.delete(&delete, &ana).await, StatusCode::NO_CONTENT);
    assert!(!app.uploads.join(&stored).exists());
}

#[tokio::test]
async fn cleanup_keeps_the_oldest_channel() {
    let app = TestApp::new().await;
    let (bia_id, _) = app.user("bia", json!(null)).await;
    let admin = app.admin.clone();
    let general = id_of(&room(&app, &admin, json!({ "name": "Geral" })).await);
    let team = id_of(&room(&app, &admin, json!({ "name": "Time", "type": "team" })).await);
    let (_, direct) = app.post(&format!("/api/chat/direct/{bia_id}"), &admin, json!({})).await;
    say(&app, &admin, general, "a").await;
    say(&app, &admin, team, "b").await;
    say(&app, &admin, id_of(&direct), "c").await;
    let (_, uploaded) = upload(&app, &admin, &general.to_string(), "f.txt", "dados").await;
    let stored = uploaded["upload"]["fileName"].as_str().unwrap().to_string();

    let (_, token) = app.user("curioso", json!(null)).await;
    assert_eq!(app.delete("/api/chat/cleanup", &token).await, StatusCode::FORBIDDEN);

    let (status, result) = app
        .send(axum::http::Method::DELETE, "/api/chat/cleanup", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["messages"], 4);
    assert_eq!(result["rooms"], 2);
    assert!(!app.uploads.join(&stored).exists());

    let (_, rooms) = app.get("/api/chat/rooms", &admin).await;
    let ids: Vec<i64> = rooms.as_array().unwrap().iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![i64::from(general)]);
    let (_, messages) = app.get(&format!("/api/chat/rooms/{general}/messages"), &admin).await;
    assert_eq!(messages, json!([]));
}

#[tokio::test]
async fn preferences_default_then_persist() {
    let app = TestApp::new().await;
    let (ana_id, ana) = app.user("ana", json!(null)).await;
    let (status, defaults) = app.get("/api/chat/preferences", &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["userId"], ana_id);
    assert_eq!(defaults["theme"], "light");
    assert_eq!(defaults["showAvatars"], true);

    let (status, saved) = app.put("/api/chat/preferences", &ana, json!({ "theme": "dark" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["theme"], "dark");
    assert_eq!(saved["showAvatars"], true);

    let (_, again) = app.put("/api/chat/preferences", &ana, json!({ "hideUsernames": true })).await;
    assert_eq!(again["theme"], "dark");
    assert_eq!(again["hideUsernames"], true);
}

/// Reads SSE frames until one carries `event: <name>`.
async fn next_frame(
    stream: &mut (impl futures::Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin),
    name: &str,
) -> String {
    let wanted = format!("event: {name}");
    let mut buffer = String::new();
    loop {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .unwrap();
        buffer.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            if frame.contains(&wanted) {
                return frame;
            }
        }
    }
}

#[tokio::test]
async fn event_stream_delivers_room_events_to_members() {
    let app = TestApp::new().await;
    let (ana_id, ana) = app.user("ana", json!(null)).await;
    let (bia_id, bia) = app.user("bia", json!(null)).await;
    let shared = id_of(&room(&app, &ana, json!({ "name": "Comum", "participants": [bia_id] })).await);
    let secret = id_of(&room(&app, &ana, json!({ "name": "Só Ana" })).await);

    let response = app
        .raw(
            Request::get(format!("/api/chat/events?token={bia}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    let mut stream = response.into_body().into_data_stream();

    let presence = next_frame(&mut stream, "presence").await;
    assert!(presence.contains(&format!("\"userId\":{bia_id}")));

    let (_, users) = app.get("/api/chat/users", &ana).await;
    let bia_entry = users.as_array().unwrap().iter().find(|u| u["id"] == bia_id).unwrap();
    assert_eq!(bia_entry["online"], true);

    say(&app, &ana, secret, "ninguém vê").await;
    app.post(&format!("/api/chat/rooms/{shared}/typing"), &bia, json!({})).await;
    say(&app, &ana, shared, "olá bia").await;

    let message = next_frame(&mut stream, "message").await;
    assert!(message.contains("olá bia"));
    assert!(!message.contains("ninguém vê"));

    app.post(&format!("/api/chat/rooms/{shared}/typing"), &ana, json!({})).await;
    let typing = next_frame(&mut stream, "typing").await;
    assert!(typing.contains(&format!("\"userId\":{ana_id}")));

    drop(stream);
    let (_, users) = app.get("/api/chat/users", &ana).await;
    let bia_entry = users.as_array().unwrap().iter().find(|u| u["id"] == bia_id).unwrap();
    assert_eq!(bia_entry["online"], false);
}
