use axum::http::StatusCode;
use serde_json::json;

use crate::util::{id_of, TestApp};

/// A product made of 2 kg of steel at 10.00 and 1 m of cable at 5.00.
async fn costed_product(app: &TestApp) -> i32 {
    let token = &app.admin;
    let (_, steel) = app
        .post("/api/raw-materials", token, json!({ "name": "Aço", "code": "ACO", "unit": "kg", "price": 10.0 }))
        .await;
    let (_, cable) = app
        .post("/api/raw-materials", token, json!({ "name": "Cabo", "code": "CABO", "unit": "m", "price": 5.0 }))
        .await;
    let (status, product) = app
        .post("/api/products", token, json!({ "name": "Quadro de comando", "code": "QC-1" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let product = id_of(&product);

    for (material, quantity) in [(id_of(&steel), 2.0), (id_of(&cable), 1.0)] {
        let (status, formula) = app
            .post(
                &format!("/api/products/{product}/formulas"),
                token,
                json!({ "materialId": material, "quantity": quantity }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{formula}");
    }
    product
}

#[tokio::test]
async fn pricing_needs_the_commercial_permission() {
    let app = TestApp::new().await;
    let (_, token) = app.user("compras", json!({ "purchase": true })).await;
    let (status, _) = app.get("/api/product-pricings", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post("/api/products", &token, json!({ "name": "X", "code": "X" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn products_validate_their_ncm() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post("/api/products", &app.admin, json!({ "name": "Motor", "code": "M-1", "ncm": "8501" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, product) = app
        .post("/api/products", &app.admin, json!({ "name": "Motor", "code": "M-1", "ncm": "8501.10.19" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["ncm"], "85011019");
    assert_eq!(product["unit"], "UN");
}

#[tokio::test]
async fn formulas_take_the_material_unit() {
    let app = TestApp::new().await;
    let product = costed_product(&app).await;
    let (status, formulas) = app.get(&format!("/api/products/{product}/formulas"), &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    let units: Vec<&str> = formulas.as_array().unwrap().iter().map(|f| f["unit"].as_str().unwrap()).collect();
    assert_eq!(units, vec!["kg", "m"]);

    let (status, _) = app
        .post(
            &format!("/api/products/{product}/formulas"),
            &app.admin,
            json!({ "materialId": 999, "quantity": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn simulation_scales_materials_by_quantity() {
    let app = TestApp::new().await;
    let product = costed_product(&app).await;
    let (status, sim) = app
        .post("/api/product-pricing/simulate", &app.admin, json!({ "productId": product, "quantity": 4.0 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{sim}");
    assert_eq!(sim["productId"], product);
    assert_eq!(sim["productName"], "Quadro de comando");
    assert_eq!(sim["materialCost"], 25.0);
    assert_eq!(sim["unitCost"], 25.0);
    assert_eq!(sim["totalCost"], 100.0);
    assert_eq!(sim["margin"], 30.0);
    assert_eq!(sim["suggestedPrice"], 32.5);
    assert_eq!(sim["materials"][0]["quantity"], 8.0);
    assert_eq!(sim["materials"][0]["totalPrice"], 80.0);
}

#[tokio::test]
async fn simulation_rejects_bad_input() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post("/api/product-pricing/simulate", &app.admin, json!({ "productId": 404, "quantity": 1.0 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, bare) = app
        .post("/api/products", &app.admin, json!({ "name": "Sem fórmula", "code": "SF" }))
        .await;
    let (status, _) = app
        .post("/api/product-pricing/simulate", &app.admin, json!({ "productId": id_of(&bare), "quantity": 1.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let product = costed_product(&app).await;
    let (status, _) = app
        .post("/api/product-pricing/simulate", &app.admin, json!({ "productId": product, "quantity": 0.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recalculation_creates_then_refreshes_the_pricing() {
    let app = TestApp::new().await;
    let product = costed_product(&app).await;
    let recalc = format!("/api/products/{product}/recalculate-price");

    let (status, pricing) = app.post(&recalc, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{pricing}");
    assert_eq!(pricing["rawMaterialCost"], 25.0);
    assert_eq!(pricing["profitMargin"], 30.0);
    assert_eq!(pricing["totalCost"], 25.0);
    assert_eq!(pricing["suggestedPrice"], 32.5);

    let (status, updated) = app
        .patch(
            &format!("/api/product-pricings/{}", id_of(&pricing)),
            &app.admin,
            json!({ "laborCost": 5.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["totalCost"], 30.0);
    assert_eq!(updated["suggestedPrice"], 39.0);

    // A cheaper material flows into the same pricing row.
    let (_, materials) = app.get("/api/raw-materials", &app.admin).await;
    let steel = materials.as_array().unwrap().iter().find(|m| m["code"] == "ACO").unwrap();
    app.patch(&format!("/api/raw-materials/{}", id_of(steel)), &app.admin, json!({ "price": 7.5 }))
        .await;
    let (_, refreshed) = app.post(&recalc, &app.admin, json!({})).await;
    assert_eq!(refreshed["id"], pricing["id"]);
    assert_eq!(refreshed["rawMaterialCost"], 20.0);
    assert_eq!(refreshed["totalCost"], 25.0);

    let (_, rows) = app.get(&format!("/api/product-pricings/product/{product}"), &app.admin).await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn simulation_uses_stored_labor_unless_excluded() {
    let app = TestApp::new().await;
    let product = costed_product(&app).await;
    let (status, _) = app
        .post(
            "/api/product-pricings",
            &app.admin,
            json!({ "productId": product, "rawMaterialCost": 25.0, "laborCost": 5.0, "profitMargin": 20.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, with_labor) = app
        .post("/api/product-pricing/simulate", &app.admin, json!({ "productId": product, "quantity": 1.0 }))
        .await;
    assert_eq!(with_labor["laborCost"], 5.0);
    assert_eq!(with_labor["unitCost"], 30.0);
    assert_eq!(with_labor["suggestedPrice"], 36.0);

    let (_, without) = app
        .post(
            "/api/product-pricing/simulate",
            &app.admin,
            json!({ "productId": product, "quantity": 1.0, "includeLabor": false }),
        )
        .await;
    assert_eq!(without["unitCost"], 25.0);
}

#[tokio::test]
async fn cost_breakdown_lists_formula_lines() {
    let app = TestApp::new().await;
    let product = costed_product(&app).await;
    let (status, costs) = app.get(&format!("/api/product-costs/{product}"), &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(costs["materialCost"], 25.0);
    assert_eq!(costs["profitMargin"], 30.0);
    assert_eq!(costs["breakdown"].as_array().unwrap().len(), 2);
    assert_eq!(costs["breakdown"][0]["quantityPerUnit"], 2.0);
}
