//! Products, their material formulas and price calculations.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::documents::validate_ncm;
use shared::pricing::{recompute_pricing, simulate, Extras, MaterialLine, PriceSimulation, DEFAULT_MARGIN};
use shared::status::AuditAction;
use shared::tax::round_cents;
use shared::Module;

use super::{created, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::store::Record;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/products/:id/formulas", get(list_formulas).post(create_formula))
        .route("/products/:id/recalculate-price", post(recalculate_price))
        .route("/product-formulas/:id", delete(delete_formula))
        .route("/product-pricings", get(list_pricings).post(create_pricing))
        .route(
            "/product-pricings/:id",
            get(get_pricing).patch(update_pricing).delete(delete_pricing),
        )
        .route("/product-pricings/product/:product_id", get(product_pricings))
        .route("/product-pricing/simulate", post(simulate_price))
        .route("/product-costs/:id", get(product_costs))
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Commercial, action, entity, Some(id), details).await;
}

// Products

fn clean_ncm(ncm: Option<&str>) -> ApiResult<Option<String>> {
    match ncm.filter(|n| !n.trim().is_empty()) {
        Some(n) => Ok(Some(validate_ncm(n)?)),
        None => Ok(None),
    }
}

pub async fn list_products(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Product>>> {
    user.require_any(&[Module::Commercial, Module::Fiscal])?;
    Ok(Json(state.store.all::<Product>().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Product>> {
    user.require_any(&[Module::Commercial, Module::Fiscal])?;
    Ok(Json(state.store.get::<Product>(id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut product): Json<ProductData>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    user.require(Module::Commercial)?;
    require_text(&product.name, "name", 1)?;
    require_text(&product.code, "code", 1)?;
    product.ncm = clean_ncm(product.ncm.as_deref())?;
    product.created_by = Some(user.id);
    let stored = state.store.create::<Product>(product).await?;
    audit(&state, &user, AuditAction::Create, "product", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<ProductChanges>,
) -> ApiResult<Json<Product>> {
    user.require(Module::Commercial)?;
    if changes.ncm.is_some() {
        changes.ncm = clean_ncm(changes.ncm.as_deref())?;
    }
    let updated = state.store.update::<Product>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "product", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Commercial)?;
    state.store.delete::<Product>(id).await?;
    audit(&state, &user, AuditAction::Delete, "product", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Formulas

pub async fn list_formulas(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<i32>,
) -> ApiResult<Json<Vec<ProductFormula>>> {
    user.require(Module::Commercial)?;
    state.store.get::<Product>(product_id).await?;
    Ok(Json(state.store.product_formulas(product_id).await?))
}

pub async fn create_formula(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<i32>,
    Json(mut formula): Json<ProductFormulaData>,
) -> ApiResult<(StatusCode, Json<ProductFormula>)> {
    user.require(Module::Commercial)?;
    if formula.quantity <= 0.0 {
        return Err(ApiError::bad_request("quantity must be greater than zero"));
    }
    state.store.get::<Product>(product_id).await?;
    let material = state.store.get::<RawMaterial>(formula.material_id).await?;
    formula.product_id = product_id;
    formula.unit = formula.unit.filter(|u| !u.trim().is_empty()).or(Some(material.data.unit));
    formula.created_by = Some(user.id);
    let stored = state.store.create::<ProductFormula>(formula).await?;
    audit(&state, &user, AuditAction::Create, "product_formula", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn delete_formula(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Commercial)?;
    state.store.delete::<ProductFormula>(id).await?;
    audit(&state, &user, AuditAction::Delete, "product_formula", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Formula lines priced at the current raw material prices. Lines whose
/// material is gone are left out.
async fn material_lines(state: &AppState, product_id: i32) -> ApiResult<Vec<MaterialLine>> {
    let mut lines = Vec::new();
    for formula in state.store.product_formulas(product_id).await? {
        let Some(material) = state.store.find::<RawMaterial>(formula.data.material_id).await? else {
            continue;
        };
        lines.push(MaterialLine {
            material_id: material.id,
            name: material.data.name,
            unit: material.data.unit,
            quantity_per_unit: formula.data.quantity,
            unit_price: material.data.price,
        });
    }
    Ok(lines)
}

fn material_cost(lines: &[MaterialLine]) -> f64 {
    round_cents(lines.iter().map(|l| l.quantity_per_unit * l.unit_price).sum())
}

// Pricings

/// Derived columns follow the cost inputs.
fn derive_pricing(pricing: &mut ProductPricingData) {
    let figures = recompute_pricing(
        pricing.raw_material_cost,
        pricing.labor_cost,
        pricing.overhead_cost,
        pricing.freight_cost,
        pricing.taxes,
        pricing.profit_margin,
    );
    pricing.total_cost = figures.total_cost;
    pricing.suggested_price = figures.suggested_price;
    pricing.margin = pricing.profit_margin;
}

fn check_costs(pricing: &ProductPricingData) -> ApiResult<()> {
    let costs = [
        pricing.raw_material_cost,
        pricing.labor_cost,
        pricing.overhead_cost,
        pricing.freight_cost,
        pricing.taxes,
    ];
    if costs.iter().any(|c| *c < 0.0) {
        return Err(ApiError::bad_request("costs must not be negative"));
    }
    Ok(())
}

pub async fn list_pricings(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ProductPricing>>> {
    user.require(Module::Commercial)?;
    Ok(Json(state.store.all::<ProductPricing>().await?))
}

pub async fn get_pricing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<ProductPricing>> {
    user.require(Module::Commercial)?;
    Ok(Json(state.store.get::<ProductPricing>(id).await?))
}

pub async fn product_pricings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<i32>,
) -> ApiResult<Json<Vec<ProductPricing>>> {
    user.require(Module::Commercial)?;
    state.store.get::<Product>(product_id).await?;
    let mut rows: Vec<ProductPricing> = state
        .store
        .all::<ProductPricing>()
        .await?
        .into_iter()
        .filter(|p| p.data.product_id == product_id)
        .collect();
    rows.sort_by(|a, b| {
        b.data
            .calculation_date
            .cmp(&a.data.calculation_date)
            .then(b.id.cmp(&a.id))
    });
    Ok(Json(rows))
}

pub async fn create_pricing(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut pricing): Json<ProductPricingData>,
) -> ApiResult<(StatusCode, Json<ProductPricing>)> {
    user.require(Module::Commercial)?;
    state.store.get::<Product>(pricing.product_id).await?;
    check_costs(&pricing)?;
    derive_pricing(&mut pricing);
    pricing.calculation_date = Utc::now().date_naive();
    pricing.created_by = Some(user.id);
    let stored = state.store.create::<ProductPricing>(pricing).await?;
    audit(&state, &user, AuditAction::Create, "product_pricing", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_pricing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<ProductPricingChanges>,
) -> ApiResult<Json<ProductPricing>> {
    user.require(Module::Commercial)?;
    let mut merged = state.store.get::<ProductPricing>(id).await?;
    merged.apply(changes.clone());
    check_costs(&merged.data)?;
    derive_pricing(&mut merged.data);
    let derived = ProductPricingChanges {
        total_cost: Some(merged.data.total_cost),
        suggested_price: Some(merged.data.suggested_price),
        margin: Some(merged.data.margin),
        calculation_date: Some(Utc::now().date_naive()),
        ..changes.clone()
    };
    let updated = state.store.update::<ProductPricing>(id, derived).await?;
    audit(&state, &user, AuditAction::Update, "product_pricing", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_pricing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Commercial)?;
    state.store.delete::<ProductPricing>(id).await?;
    audit(&state, &user, AuditAction::Delete, "product_pricing", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Calculations

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub product_id: i32,
    pub quantity: f64,
    #[serde(default = "yes")]
    pub include_labor: bool,
    #[serde(default = "yes")]
    pub include_overhead: bool,
    #[serde(default = "yes")]
    pub include_fixed_costs: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    pub product_id: i32,
    pub product_name: String,
    #[serde(flatten)]
    pub simulation: PriceSimulation,
}

pub async fn simulate_price(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SimulationRequest>,
) -> ApiResult<Json<SimulationResponse>> {
    user.require(Module::Commercial)?;
    let product = state.store.get::<Product>(request.product_id).await?;
    let lines = material_lines(&state, product.id).await?;
    let pricing = state.store.latest_pricing(product.id).await?.map(|p| p.data);

    let extras = Extras {
        labor: request
            .include_labor
            .then(|| pricing.as_ref().map_or(0.0, |p| p.labor_cost)),
        overhead: request
            .include_overhead
            .then(|| pricing.as_ref().map_or(0.0, |p| p.overhead_cost)),
        // no fixed cost source is tracked yet
        fixed: request.include_fixed_costs.then_some(0.0),
    };
    let margin = pricing.as_ref().map_or(DEFAULT_MARGIN, |p| p.margin);
    let simulation = simulate(&lines, request.quantity, extras, margin)?;
    Ok(Json(SimulationResponse {
        product_id: product.id,
        product_name: product.data.name,
        simulation,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub product_id: i32,
    pub product_name: String,
    pub material_cost: f64,
    pub labor_cost: f64,
    pub overhead_cost: f64,
    pub freight_cost: f64,
    pub taxes: f64,
    pub profit_margin: f64,
    pub total_cost: f64,
    pub suggested_price: f64,
    pub breakdown: Vec<MaterialLine>,
}

/// Current cost picture of a product, without storing anything.
pub async fn product_costs(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<CostBreakdown>> {
    user.require(Module::Commercial)?;
    let product = state.store.get::<Product>(id).await?;
    let lines = material_lines(&state, id).await?;
    let pricing = state.store.latest_pricing(id).await?.map(|p| p.data);
    let (labor, overhead, freight, taxes, margin) = match &pricing {
        Some(p) => (p.labor_cost, p.overhead_cost, p.freight_cost, p.taxes, p.profit_margin),
        None => (0.0, 0.0, 0.0, 0.0, DEFAULT_MARGIN),
    };
    let materials = material_cost(&lines);
    let figures = recompute_pricing(materials, labor, overhead, freight, taxes, margin);
    Ok(Json(CostBreakdown {
        product_id: id,
        product_name: product.data.name,
        material_cost: materials,
        labor_cost: labor,
        overhead_cost: overhead,
        freight_cost: freight,
        taxes,
        profit_margin: margin,
        total_cost: figures.total_cost,
        suggested_price: figures.suggested_price,
        breakdown: lines,
    }))
}

/// Refreshes the latest pricing from current material prices, creating the
/// first one when the product has none.
pub async fn recalculate_price(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<ProductPricing>> {
    user.require(Module::Commercial)?;
    state.store.get::<Product>(id).await?;
    let materials = material_cost(&material_lines(&state, id).await?);
    let today = Utc::now().date_naive();

    let stored = match state.store.latest_pricing(id).await? {
        Some(existing) => {
            let mut data = existing.data.clone();
            data.raw_material_cost = materials;
            derive_pricing(&mut data);
            let changes = ProductPricingChanges {
                raw_material_cost: Some(data.raw_material_cost),
                total_cost: Some(data.total_cost),
                suggested_price: Some(data.suggested_price),
                margin: Some(data.margin),
                calculation_date: Some(today),
                ..Default::default()
            };
            state.store.update::<ProductPricing>(existing.id, changes).await?
        }
        None => {
            let mut data = ProductPricingData {
                product_id: id,
                raw_material_cost: materials,
                labor_cost: 0.0,
                overhead_cost: 0.0,
                freight_cost: 0.0,
                taxes: 0.0,
                profit_margin: DEFAULT_MARGIN,
                total_cost: 0.0,
                suggested_price: 0.0,
                margin: DEFAULT_MARGIN,
                calculation_date: today,
                created_by: Some(user.id),
            };
            derive_pricing(&mut data);
            state.store.create::<ProductPricing>(data).await?
        }
    };
    audit(
        &state,
        &user,
        AuditAction::Update,
        "product_pricing",
        stored.id,
        json!({
            "action": "recalculate",
            "rawMaterialCost": stored.data.raw_material_cost,
            "suggestedPrice": stored.data.suggested_price,
        }),
    )
    .await;
    Ok(Json(stored))
}
