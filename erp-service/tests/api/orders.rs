use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::util::{id_of, TestApp};

struct Fixture {
    customer: i32,
    priced: i32,
    unpriced: i32,
}

async fn fixture(app: &TestApp) -> Fixture {
    let (_, customer) = app.post("/api/customers", &app.admin, json!({ "name": "Cliente Exemplo" })).await;
    let (_, priced) = app
        .post("/api/products", &app.admin, json!({ "name": "Painel", "code": "PE-01", "sellingPrice": 19.99 }))
        .await;
    let (_, unpriced) = app
        .post("/api/products", &app.admin, json!({ "name": "Amostra", "code": "AM-01" }))
        .await;
    Fixture { customer: id_of(&customer), priced: id_of(&priced), unpriced: id_of(&unpriced) }
}

#[tokio::test]
async fn order_routes_need_the_commercial_permission() {
    let app = TestApp::new().await;
    let (_, token) = app.user("estoquista", json!({ "inventory": true })).await;
    let (status, _) = app.get("/api/orders", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn orders_are_stored_with_their_priced_items() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let (status, order) = app
        .post(
            "/api/orders",
            &app.admin,
            json!({
                "customerId": f.customer,
                "orderDate": "2025-06-02",
                "items": [
                    { "productId": f.priced, "quantity": 3.0 },
                    { "productId": f.unpriced, "quantity": 1.0 },
                    { "productId": f.unpriced, "quantity": 2.0, "unitPrice": 0.335 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["orderNumber"], "PED-2025-0001");
    assert_eq!(order["status"], "new");
    assert_eq!(order["customer"]["name"], "Cliente Exemplo");
    let items = order["items"].as_array().unwrap();
    assert_eq!(items[0]["unitPrice"], 19.99);
    assert_eq!(items[0]["totalPrice"], 59.97);
    assert_eq!(items[1]["unitPrice"], 0.0);
    assert_eq!(items[2]["totalPrice"], 0.67);
    assert_eq!(order["totalAmount"], 60.64);

    let (_, fetched) = app.get(&format!("/api/orders/{}", id_of(&order)), &app.admin).await;
    assert_eq!(fetched["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn a_bad_item_stores_nothing() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let (status, _) = app
        .post(
            "/api/orders",
            &app.admin,
            json!({
                "customerId": f.customer,
                "items": [
                    { "productId": f.priced, "quantity": 1.0 },
                    { "productId": f.priced, "quantity": -1.0 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, orders) = app.get("/api/orders", &app.admin).await;
    assert!(orders.as_array().unwrap().is_empty());

    let (status, _) = app.post("/api/orders", &app.admin, json!({ "customerId": 999 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn items_change_only_while_the_order_is_new() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let (_, order) = app
        .post(
            "/api/orders",
            &app.admin,
            json!({ "customerId": f.customer, "items": [{ "productId": f.priced, "quantity": 1.0 }] }),
        )
        .await;
    let id = id_of(&order);

    let (status, added) = app
        .post(&format!("/api/orders/{id}/items"), &app.admin, json!({ "productId": f.priced, "quantity": 2.0 }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{added}");
    assert_eq!(added["order"]["totalAmount"], 59.97);

    let item = added["item"]["id"].as_i64().unwrap();
    let (status, order) = app
        .send(Method::DELETE, &format!("/api/order-items/{item}"), Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["totalAmount"], 19.99);

    let (status, _) = app
        .patch(&format!("/api/orders/{id}"), &app.admin, json!({ "totalAmount": 1.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status_uri = format!("/api/orders/{id}/status");
    let (status, _) = app.patch(&status_uri, &app.admin, json!({ "status": "delivered" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.patch(&status_uri, &app.admin, json!({ "status": "in-progress" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(&format!("/api/orders/{id}/items"), &app.admin, json!({ "productId": f.priced, "quantity": 1.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, delivered) = app.patch(&status_uri, &app.admin, json!({ "status": "delivered" })).await;
    assert_eq!(delivered["status"], "delivered");
}

#[tokio::test]
async fn deleting_an_order_takes_its_items_and_frees_the_customer() {
    let app = TestApp::new().await;
    let f = fixture(&app).await;
    let (_, order) = app
        .post(
            "/api/orders",
            &app.admin,
            json!({ "customerId": f.customer, "items": [{ "productId": f.priced, "quantity": 1.0 }] }),
        )
        .await;
    let id = id_of(&order);

    assert_eq!(app.delete(&format!("/api/customers/{}", f.customer), &app.admin).await, StatusCode::BAD_REQUEST);
    assert_eq!(app.delete(&format!("/api/products/{}", f.priced), &app.admin).await, StatusCode::BAD_REQUEST);

    assert_eq!(app.delete(&format!("/api/orders/{id}"), &app.admin).await, StatusCode::NO_CONTENT);
    assert!(app.store.order_items(id).await.unwrap().is_empty());
    assert_eq!(app.delete(&format!("/api/customers/{}", f.customer), &app.admin).await, StatusCode::NO_CONTENT);
}
