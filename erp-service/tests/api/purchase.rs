use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::util::{id_of, TestApp};

async fn supplier(app: &TestApp, name: &str) -> i32 {
    let (status, body) = app.post("/api/suppliers", &app.admin, json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

async fn material(app: &TestApp, code: &str, price: f64) -> i32 {
    let (status, body) = app
        .post(
            "/api/raw-materials",
            &app.admin,
            json!({ "name": format!("Aço {code}"), "code": code, "unit": "kg", "price": price }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

async fn quotation(app: &TestApp) -> Value {
    let (status, body) = app
        .post("/api/quotations", &app.admin, json!({ "creationDate": "2025-04-01" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn item(app: &TestApp, quotation: i32, material: i32, quantity: f64) -> Value {
    let (status, body) = app
        .post(
            "/api/quotation-items",
            &app.admin,
            json!({ "quotationId": quotation, "materialId": material, "quantity": quantity, "unitMeasurement": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn offer(app: &TestApp, item: i32, supplier: i32, body: Value) -> Value {
    let mut request = json!({ "quotationItemId": item, "supplierId": supplier });
    for (key, value) in body.as_object().unwrap() {
        request[key] = value.clone();
    }
    let (status, body) = app.post("/api/supplier-quotations", &app.admin, request).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn purchase_routes_need_the_purchase_permission() {
    let app = TestApp::new().await;
    let (_, token) = app.user("fiscal", json!({ "fiscal": true })).await;
    let (status, _) = app.get("/api/suppliers", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/quotations", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn materials_reject_negative_values_and_duplicate_codes() {
    let app = TestApp::new().await;
    material(&app, "MP-01", 10.0).await;
    let (status, _) = app
        .post(
            "/api/raw-materials",
            &app.admin,
            json!({ "name": "Outro", "code": "MP-01", "unit": "kg" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/raw-materials",
            &app.admin,
            json!({ "name": "Negativo", "code": "MP-02", "unit": "kg", "price": -1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn measurement_units_need_a_positive_factor() {
    let app = TestApp::new().await;
    let (status, unit) = app
        .post(
            "/api/measurement-units",
            &app.admin,
            json!({ "name": "Quilograma", "symbol": "kg", "type": "weight", "baseUnit": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(unit["conversionFactor"], 1.0);

    let (status, _) = app
        .post(
            "/api/measurement-units",
            &app.admin,
            json!({ "name": "Grama", "symbol": "g", "type": "weight", "conversionFactor": 0.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quotation_numbers_run_per_year() {
    let app = TestApp::new().await;
    let first = quotation(&app).await;
    let second = quotation(&app).await;
    assert_eq!(first["quotationNumber"], "COT-2025-0001");
    assert_eq!(second["quotationNumber"], "COT-2025-0002");
    assert_eq!(first["status"], "open");

    let (status, _) = app
        .post(
            "/api/quotations",
            &app.admin,
            json!({ "creationDate": "2025-04-10", "closingDate": "2025-04-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn offer_totals_follow_item_quantity() {
    let app = TestApp::new().await;
    let supplier = supplier(&app, "Metalúrgica Alfa").await;
    let material = material(&app, "MP-10", 5.0).await;
    let quotation = id_of(&quotation(&app).await);
    let item = item(&app, quotation, material, 10.0).await;
    assert_eq!(item["unitMeasurement"], "kg");
    let item = id_of(&item);

    let created = offer(&app, item, supplier, json!({ "unitPrice": 4.5, "freight": 10.0, "taxes": 2.5 })).await;
    assert_eq!(created["totalPrice"], 57.5);
    assert_eq!(created["isSelected"], false);

    let (status, _) = app
        .patch(&format!("/api/quotation-items/{item}"), &app.admin, json!({ "quantity": 20.0 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, offers) = app
        .get(&format!("/api/quotation-items/{item}/supplier-quotations"), &app.admin)
        .await;
    assert_eq!(offers[0]["totalPrice"], 102.5);

    let (status, _) = app
        .post(
            "/api/supplier-quotations",
            &app.admin,
            json!({ "quotationItemId": item, "supplierId": supplier, "unitPrice": -1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn best_offer_prefers_price_then_delivery() {
    let app = TestApp::new().await;
    let alfa = supplier(&app, "Alfa").await;
    let beta = supplier(&app, "Beta").await;
    let gama = supplier(&app, "Gama").await;
    let material = material(&app, "MP-20", 9.0).await;
    let quotation = id_of(&quotation(&app).await);
    let item = id_of(&item(&app, quotation, material, 1.0).await);

    let uri = format!("/api/quotation-items/{item}/select-best");
    let (status, _) = app.post(&uri, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    offer(&app, item, alfa, json!({ "unitPrice": 12.0, "deliveryTime": 2 })).await;
    let slow = offer(&app, item, beta, json!({ "unitPrice": 10.0, "deliveryTime": 9 })).await;
    let fast = offer(&app, item, gama, json!({ "unitPrice": 10.0, "deliveryTime": 3 })).await;

    let (status, best) = app.post(&uri, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(best["id"], fast["id"]);
    assert_eq!(best["isSelected"], true);

    // Selecting by hand moves the flag.
    let (status, _) = app
        .post(&format!("/api/supplier-quotations/{}/select", id_of(&slow)), &app.admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, offers) = app
        .get(&format!("/api/quotation-items/{item}/supplier-quotations"), &app.admin)
        .await;
    let selected: Vec<&Value> = offers
        .as_array()
        .unwrap()
        .iter()
        .filter(|o| o["isSelected"] == true)
        .collect();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0]["id"], slow["id"]);
}

#[tokio::test]
async fn closed_quotations_apply_selected_prices() {
    let app = TestApp::new().await;
    let supplier = supplier(&app, "Alfa").await;
    let steel = material(&app, "MP-30", 8.0).await;
    let copper = material(&app, "MP-31", 20.0).await;
    let quotation = id_of(&quotation(&app).await);
    let steel_item = id_of(&item(&app, quotation, steel, 5.0).await);
    item(&app, quotation, copper, 2.0).await;
    let chosen = offer(&app, steel_item, supplier, json!({ "unitPrice": 7.25 })).await;
    app.post(&format!("/api/supplier-quotations/{}/select", id_of(&chosen)), &app.admin, json!({}))
        .await;

    let apply = format!("/api/quotations/{quotation}/apply-prices");
    let (status, _) = app.post(&apply, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(&format!("/api/quotations/{quotation}"), &app.admin, json!({ "status": "closed" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Items are frozen once the quotation closes.
    let (status, _) = app
        .post(
            "/api/quotation-items",
            &app.admin,
            json!({ "quotationId": quotation, "materialId": copper, "quantity": 1.0, "unitMeasurement": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, applied) = app.post(&apply, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{applied}");
    assert_eq!(
        applied["materials"],
        json!([{ "id": steel, "name": "Aço MP-30", "oldPrice": 8.0, "newPrice": 7.25 }])
    );

    let (_, material) = app.get(&format!("/api/raw-materials/{steel}"), &app.admin).await;
    assert_eq!(material["price"], 7.25);
    let (_, untouched) = app.get(&format!("/api/raw-materials/{copper}"), &app.admin).await;
    assert_eq!(untouched["price"], 20.0);
}

#[tokio::test]
async fn deleting_a_quotation_takes_its_items() {
    let app = TestApp::new().await;
    let supplier = supplier(&app, "Alfa").await;
    let material = material(&app, "MP-40", 1.0).await;
    let quotation = id_of(&quotation(&app).await);
    let item = id_of(&item(&app, quotation, material, 1.0).await);
    offer(&app, item, supplier, json!({ "unitPrice": 1.0 })).await;

    // The supplier still has an offer on file.
    assert_eq!(app.delete(&format!("/api/suppliers/{supplier}"), &app.admin).await, StatusCode::BAD_REQUEST);

    assert_eq!(app.delete(&format!("/api/quotations/{quotation}"), &app.admin).await, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/quotation-items/{item}/supplier-quotations"), &app.admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&format!("/api/suppliers/{supplier}"), &app.admin).await, StatusCode::NO_CONTENT);
}
