use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::codes::next_code;
use shared::documents::validate_tax_id;
use shared::pricing::{best_offer, offer_total, Offer};
use shared::status::{AuditAction, QuotationStatus};
use shared::Module;

use super::{created, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/suppliers/:id",
            get(get_supplier).patch(update_supplier).delete(delete_supplier),
        )
        .route("/raw-materials", get(list_materials).post(create_material))
        .route(
            "/raw-materials/:id",
            get(get_material).patch(update_material).delete(delete_material),
        )
        .route("/measurement-units", get(list_units).post(create_unit))
        .route(
            "/measurement-units/:id",
            get(get_unit).patch(update_unit).delete(delete_unit),
        )
        .route("/quotations", get(list_quotations).post(create_quotation))
        .route(
            "/quotations/:id",
            get(get_quotation).patch(update_quotation).delete(delete_quotation),
        )
        .route("/quotations/:id/items", get(list_items))
        .route("/quotations/:id/apply-prices", post(apply_prices))
        .route("/quotation-items", post(create_item))
        .route("/quotation-items/:id", patch(update_item).delete(delete_item))
        .route("/quotation-items/:id/supplier-quotations", get(list_offers))
        .route("/quotation-items/:id/select-best", post(select_best))
        .route("/supplier-quotations", post(create_offer))
        .route(
            "/supplier-quotations/:id",
            patch(update_offer).delete(delete_offer),
        )
        .route("/supplier-quotations/:id/select", post(select_offer))
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Purchase, action, entity, Some(id), details).await;
}

fn clean_tax_id(tax_id: Option<&str>) -> ApiResult<Option<String>> {
    match tax_id.filter(|t| !t.trim().is_empty()) {
        Some(t) => Ok(Some(validate_tax_id(t)?)),
        None => Ok(None),
    }
}

// Suppliers

pub async fn list_suppliers(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Supplier>>> {
    user.require(Module::Purchase)?;
    Ok(Json(state.store.all::<Supplier>().await?))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Supplier>> {
    user.require(Module::Purchase)?;
    Ok(Json(state.store.get::<Supplier>(id).await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut supplier): Json<SupplierData>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    user.require(Module::Purchase)?;
    require_text(&supplier.name, "name", 1)?;
    supplier.tax_id = clean_tax_id(supplier.tax_id.as_deref())?;
    supplier.created_by = Some(user.id);
    let stored = state.store.create::<Supplier>(supplier).await?;
    audit(&state, &user, AuditAction::Create, "supplier", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<SupplierChanges>,
) -> ApiResult<Json<Supplier>> {
    user.require(Module::Purchase)?;
    if changes.tax_id.is_some() {
        changes.tax_id = clean_tax_id(changes.tax_id.as_deref())?;
    }
    let updated = state.store.update::<Supplier>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "supplier", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Purchase)?;
    state.store.delete::<Supplier>(id).await?;
    audit(&state, &user, AuditAction::Delete, "supplier", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Raw materials

fn check_stock(values: &[Option<f64>]) -> ApiResult<()> {
    if values.iter().flatten().any(|v| *v < 0.0) {
        return Err(ApiError::bad_request("stock and price must not be negative"));
    }
    Ok(())
}

pub async fn list_materials(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<RawMaterial>>> {
    user.require_any(&[Module::Purchase, Module::Inventory, Module::Commercial])?;
    Ok(Json(state.store.all::<RawMaterial>().await?))
}

pub async fn get_material(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<RawMaterial>> {
    user.require_any(&[Module::Purchase, Module::Inventory, Module::Commercial])?;
    Ok(Json(state.store.get::<RawMaterial>(id).await?))
}

pub async fn create_material(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut material): Json<RawMaterialData>,
) -> ApiResult<(StatusCode, Json<RawMaterial>)> {
    user.require(Module::Purchase)?;
    require_text(&material.name, "name", 1)?;
    require_text(&material.code, "code", 1)?;
    require_text(&material.unit, "unit", 1)?;
    check_stock(&[
        Some(material.current_stock),
        Some(material.minimum_stock),
        Some(material.price),
    ])?;
    material.created_by = Some(user.id);
    let stored = state.store.create::<RawMaterial>(material).await?;
    audit(&state, &user, AuditAction::Create, "raw_material", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_material(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<RawMaterialChanges>,
) -> ApiResult<Json<RawMaterial>> {
    user.require(Module::Purchase)?;
    check_stock(&[changes.current_stock, changes.minimum_stock, changes.price])?;
    let updated = state.store.update::<RawMaterial>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "raw_material", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_material(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Purchase)?;
    state.store.delete::<RawMaterial>(id).await?;
    audit(&state, &user, AuditAction::Delete, "raw_material", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Measurement units, readable by anyone signed in

pub async fn list_units(State(state): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<MeasurementUnit>>> {
    Ok(Json(state.store.all::<MeasurementUnit>().await?))
}

pub async fn get_unit(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<MeasurementUnit>> {
    Ok(Json(state.store.get::<MeasurementUnit>(id).await?))
}

pub async fn create_unit(
    State(state): State<AppState>,
    user: AuthUser,
    Json(unit): Json<MeasurementUnitData>,
) -> ApiResult<(StatusCode, Json<MeasurementUnit>)> {
    user.require(Module::Purchase)?;
    require_text(&unit.name, "name", 1)?;
    require_text(&unit.symbol, "symbol", 1)?;
    if unit.conversion_factor <= 0.0 {
        return Err(ApiError::bad_request("conversionFactor must be greater than zero"));
    }
    let unit = MeasurementUnitData { created_by: Some(user.id), ..unit };
    let stored = state.store.create::<MeasurementUnit>(unit).await?;
    audit(&state, &user, AuditAction::Create, "measurement_unit", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_unit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<MeasurementUnitChanges>,
) -> ApiResult<Json<MeasurementUnit>> {
    user.require(Module::Purchase)?;
    if changes.conversion_factor.is_some_and(|f| f <= 0.0) {
        return Err(ApiError::bad_request("conversionFactor must be greater than zero"));
    }
    let updated = state.store.update::<MeasurementUnit>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "measurement_unit", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_unit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Purchase)?;
    state.store.delete::<MeasurementUnit>(id).await?;
    audit(&state, &user, AuditAction::Delete, "measurement_unit", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Quotations

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuotation {
    pub quotation_number: Option<String>,
    pub status: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub closing_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemWithOffers {
    #[serde(flatten)]
    pub item: QuotationItem,
    pub material: Option<RawMaterial>,
    pub supplier_quotations: Vec<SupplierQuotation>,
}

#[derive(Debug, Serialize)]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub items: Vec<ItemWithOffers>,
}

fn check_closing(creation: NaiveDate, closing: Option<NaiveDate>) -> ApiResult<()> {
    if closing.is_some_and(|c| c < creation) {
        return Err(ApiError::bad_request("closingDate must not precede creationDate"));
    }
    Ok(())
}

pub async fn list_quotations(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Quotation>>> {
    user.require(Module::Purchase)?;
    let mut quotations = state.store.all::<Quotation>().await?;
    quotations.reverse();
    Ok(Json(quotations))
}

pub async fn get_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<QuotationDetail>> {
    user.require(Module::Purchase)?;
    let quotation = state.store.get::<Quotation>(id).await?;
    let mut items = Vec::new();
    for item in state.store.quotation_items(id).await? {
        let material = state.store.find::<RawMaterial>(item.data.material_id).await?;
        let supplier_quotations = state.store.supplier_quotations(item.id).await?;
        items.push(ItemWithOffers { item, material, supplier_quotations });
    }
    Ok(Json(QuotationDetail { quotation, items }))
}

pub async fn create_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewQuotation>,
) -> ApiResult<(StatusCode, Json<Quotation>)> {
    user.require(Module::Purchase)?;
    let creation_date = request.creation_date.unwrap_or_else(|| Utc::now().date_naive());
    check_closing(creation_date, request.closing_date)?;
    let status = match request.status.as_deref() {
        Some(s) => s.parse::<QuotationStatus>()?,
        None => QuotationStatus::Open,
    };
    let quotation_number = match request.quotation_number.filter(|n| !n.trim().is_empty()) {
        Some(number) => number.trim().to_string(),
        None => {
            let existing = state.store.all::<Quotation>().await?;
            next_code(
                "COT",
                creation_date.year(),
                4,
                existing.iter().map(|q| q.data.quotation_number.as_str()),
            )
        }
    };
    let stored = state
        .store
        .create::<Quotation>(QuotationData {
            quotation_number,
            status: status.to_string(),
            creation_date,
            closing_date: request.closing_date,
            notes: request.notes,
            created_by: Some(user.id),
        })
        .await?;
    audit(&state, &user, AuditAction::Create, "quotation", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<QuotationChanges>,
) -> ApiResult<Json<Quotation>> {
    user.require(Module::Purchase)?;
    let current = state.store.get::<Quotation>(id).await?.data;
    if let Some(status) = &changes.status {
        status.parse::<QuotationStatus>()?;
    }
    check_closing(
        changes.creation_date.unwrap_or(current.creation_date),
        changes.closing_date.or(current.closing_date),
    )?;
    let updated = state.store.update::<Quotation>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "quotation", id, to_details(&changes)).await;
    Ok(Json(updated))
}

/// Items and their offers go with the quotation.
pub async fn delete_quotation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Purchase)?;
    state.store.delete::<Quotation>(id).await?;
    audit(&state, &user, AuditAction::Delete, "quotation", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Items

async fn open_quotation(state: &AppState, quotation_id: i32) -> ApiResult<Quotation> {
    let quotation = state.store.get::<Quotation>(quotation_id).await?;
    if quotation.data.status != QuotationStatus::Open.as_str() {
        return Err(ApiError::bad_request(format!(
            "quotation {} is {} and its items cannot change",
            quotation.data.quotation_number, quotation.data.status
        )));
    }
    Ok(quotation)
}

fn check_quantity(quantity: f64) -> ApiResult<()> {
    if quantity <= 0.0 {
        return Err(ApiError::bad_request("quantity must be greater than zero"));
    }
    Ok(())
}

pub async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(quotation_id): Path<i32>,
) -> ApiResult<Json<Vec<QuotationItem>>> {
    user.require(Module::Purchase)?;
    state.store.get::<Quotation>(quotation_id).await?;
    Ok(Json(state.store.quotation_items(quotation_id).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut item): Json<QuotationItemData>,
) -> ApiResult<(StatusCode, Json<QuotationItem>)> {
    user.require(Module::Purchase)?;
    check_quantity(item.quantity)?;
    open_quotation(&state, item.quotation_id).await?;
    let material = state.store.get::<RawMaterial>(item.material_id).await?;
    if let Some(unit_id) = item.unit_id {
        let unit = state.store.get::<MeasurementUnit>(unit_id).await?;
        if item.unit_measurement.trim().is_empty() {
            item.unit_measurement = unit.data.symbol;
        }
    }
    if item.unit_measurement.trim().is_empty() {
        item.unit_measurement = material.data.unit;
    }
    let stored = state.store.create::<QuotationItem>(item).await?;
    audit(&state, &user, AuditAction::Create, "quotation_item", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

/// A quantity change reprices every offer on the item.
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<QuotationItemChanges>,
) -> ApiResult<Json<QuotationItem>> {
    user.require(Module::Purchase)?;
    let current = state.store.get::<QuotationItem>(id).await?;
    open_quotation(&state, current.data.quotation_id).await?;
    if let Some(quantity) = changes.quantity {
        check_quantity(quantity)?;
    }
    if let Some(material) = changes.material_id {
        state.store.get::<RawMaterial>(material).await?;
    }
    if let Some(unit) = changes.unit_id {
        state.store.get::<MeasurementUnit>(unit).await?;
    }
    let updated = state.store.update::<QuotationItem>(id, changes.clone()).await?;
    if changes.quantity.is_some() {
        for offer in state.store.supplier_quotations(id).await? {
            let total = offer_total(
                offer.data.unit_price,
                updated.data.quantity,
                offer.data.freight,
                offer.data.taxes,
            );
            state
                .store
                .update::<SupplierQuotation>(
                    offer.id,
                    SupplierQuotationChanges { total_price: Some(total), ..Default::default() },
                )
                .await?;
        }
    }
    audit(&state, &user, AuditAction::Update, "quotation_item", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Purchase)?;
    let item = state.store.get::<QuotationItem>(id).await?;
    open_quotation(&state, item.data.quotation_id).await?;
    state.store.delete::<QuotationItem>(id).await?;
    audit(&state, &user, AuditAction::Delete, "quotation_item", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Supplier offers

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOffer {
    pub quotation_item_id: i32,
    pub supplier_id: i32,
    pub unit_price: f64,
    #[serde(default)]
    pub freight: f64,
    #[serde(default)]
    pub taxes: f64,
    pub total_price: Option<f64>,
    pub delivery_time: Option<i32>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
}

fn check_offer(unit_price: f64, freight: f64, taxes: f64, delivery: Option<i32>) -> ApiResult<()> {
    if unit_price < 0.0 || freight < 0.0 || taxes < 0.0 {
        return Err(ApiError::bad_request("prices must not be negative"));
    }
    if delivery.is_some_and(|d| d < 0) {
        return Err(ApiError::bad_request("deliveryTime must not be negative"));
    }
    Ok(())
}

pub async fn list_offers(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<i32>,
) -> ApiResult<Json<Vec<SupplierQuotation>>> {
    user.require(Module::Purchase)?;
    state.store.get::<QuotationItem>(item_id).await?;
    Ok(Json(state.store.supplier_quotations(item_id).await?))
}

pub async fn create_offer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(offer): Json<NewOffer>,
) -> ApiResult<(StatusCode, Json<SupplierQuotation>)> {
    user.require(Module::Purchase)?;
    check_offer(offer.unit_price, offer.freight, offer.taxes, offer.delivery_time)?;
    let item = state.store.get::<QuotationItem>(offer.quotation_item_id).await?;
    state.store.get::<Supplier>(offer.supplier_id).await?;
    let total_price = offer.total_price.unwrap_or_else(|| {
        offer_total(offer.unit_price, item.data.quantity, offer.freight, offer.taxes)
    });
    let stored = state
        .store
        .create::<SupplierQuotation>(SupplierQuotationData {
            quotation_item_id: item.id,
            supplier_id: offer.supplier_id,
            unit_price: offer.unit_price,
            freight: offer.freight,
            taxes: offer.taxes,
            total_price,
            delivery_time: offer.delivery_time,
            payment_terms: offer.payment_terms,
            notes: offer.notes,
            is_selected: false,
        })
        .await?;
    audit(&state, &user, AuditAction::Create, "supplier_quotation", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

/// Price changes without an explicit total recompute it.
pub async fn update_offer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<SupplierQuotationChanges>,
) -> ApiResult<Json<SupplierQuotation>> {
    user.require(Module::Purchase)?;
    let current = state.store.get::<SupplierQuotation>(id).await?.data;
    let unit_price = changes.unit_price.unwrap_or(current.unit_price);
    let freight = changes.freight.unwrap_or(current.freight);
    let taxes = changes.taxes.unwrap_or(current.taxes);
    check_offer(unit_price, freight, taxes, changes.delivery_time)?;
    if let Some(supplier) = changes.supplier_id {
        state.store.get::<Supplier>(supplier).await?;
    }
    let repriced = changes.unit_price.is_some() || changes.freight.is_some() || changes.taxes.is_some();
    if repriced && changes.total_price.is_none() {
        let item = state.store.get::<QuotationItem>(current.quotation_item_id).await?;
        changes.total_price = Some(offer_total(unit_price, item.data.quantity, freight, taxes));
    }
    let updated = state.store.update::<SupplierQuotation>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "supplier_quotation", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_offer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Purchase)?;
    state.store.delete::<SupplierQuotation>(id).await?;
    audit(&state, &user, AuditAction::Delete, "supplier_quotation", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn select_offer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<SupplierQuotation>> {
    user.require(Module::Purchase)?;
    let selected = state.store.select_supplier_quotation(id).await?;
    audit(
        &state,
        &user,
        AuditAction::Update,
        "supplier_quotation",
        id,
        json!({ "isSelected": true, "quotationItemId": selected.data.quotation_item_id }),
    )
    .await;
    Ok(Json(selected))
}

pub async fn select_best(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<i32>,
) -> ApiResult<Json<SupplierQuotation>> {
    user.require(Module::Purchase)?;
    state.store.get::<QuotationItem>(item_id).await?;
    let offers: Vec<Offer> = state
        .store
        .supplier_quotations(item_id)
        .await?
        .iter()
        .map(|o| Offer {
            id: o.id,
            total_price: o.data.total_price,
            delivery_days: o.data.delivery_time,
        })
        .collect();
    let best = best_offer(&offers)
        .ok_or_else(|| ApiError::bad_request("the item has no supplier quotations"))?;
    let selected = state.store.select_supplier_quotation(best).await?;
    audit(
        &state,
        &user,
        AuditAction::Update,
        "supplier_quotation",
        best,
        json!({ "isSelected": true, "quotationItemId": item_id, "bestPrice": true }),
    )
    .await;
    Ok(Json(selected))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    pub id: i32,
    pub name: String,
    pub old_price: f64,
    pub new_price: f64,
}

#[derive(Debug, Serialize)]
pub struct AppliedPrices {
    pub message: String,
    pub materials: Vec<PriceChange>,
}

/// Copies each selected unit price onto its raw material.
pub async fn apply_prices(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<AppliedPrices>> {
    user.require(Module::Purchase)?;
    let quotation = state.store.get::<Quotation>(id).await?;
    if quotation.data.status != QuotationStatus::Closed.as_str() {
        return Err(ApiError::bad_request("prices can only be applied from a closed quotation"));
    }

    let mut materials = Vec::new();
    for item in state.store.quotation_items(id).await? {
        let offers = state.store.supplier_quotations(item.id).await?;
        let Some(selected) = offers.iter().find(|o| o.data.is_selected) else {
            continue;
        };
        let material = state.store.get::<RawMaterial>(item.data.material_id).await?;
        let new_price = selected.data.unit_price;
        state
            .store
            .update::<RawMaterial>(
                material.id,
                RawMaterialChanges { price: Some(new_price), ..Default::default() },
            )
            .await?;
        materials.push(PriceChange {
            id: material.id,
            name: material.data.name,
            old_price: material.data.price,
            new_price,
        });
    }

    tracing::info!(
        "Applied {} material prices from quotation {}",
        materials.len(),
        quotation.data.quotation_number
    );
    audit(
        &state,
        &user,
        AuditAction::Update,
        "quotation",
        id,
        json!({ "action": "apply-prices", "materials": to_details(&materials) }),
    )
    .await;
    Ok(Json(AppliedPrices {
        message: format!("{} material prices updated", materials.len()),
        materials,
    }))
}
