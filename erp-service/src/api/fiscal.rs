//! Fiscal tables, customers and the NF-e lifecycle.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post, put},
    Router,
};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::documents::{
    build_access_key, cfop_direction, only_digits, uf_code, validate_ncm, validate_tax_id,
    AccessKeyParts,
};
use shared::pagination::DEFAULT_PAGE_SIZE;
use shared::status::{
    Ambiente, AuditAction, CfopDirection, CstKind, NfeEventKind, NfeStatus, TaxRegime,
};
use shared::tax::{
    compute_item, compute_totals, default_rates, Charges, ItemInput, ItemTaxes, TaxLine, TaxRates,
};
use shared::{Module, Page, Paginated};

use super::{created, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::sefaz::{self, xml, CancelRequest, SefazResponse, Submission, VoidRequest};
use crate::store::{Record, StoreError, StoreResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fiscal/certificates", get(list_certificates).post(create_certificate))
        .route(
            "/fiscal/certificates/:id",
            get(get_certificate).patch(update_certificate).delete(delete_certificate),
        )
        .route("/fiscal/ncms", get(list_ncms).post(create_ncm))
        .route("/fiscal/ncms/:id", get(get_ncm).patch(update_ncm).delete(delete_ncm))
        .route("/fiscal/cfops", get(list_cfops).post(create_cfop))
        .route("/fiscal/cfops/:id", get(get_cfop).patch(update_cfop).delete(delete_cfop))
        .route("/fiscal/csts", get(list_csts).post(create_cst))
        .route("/fiscal/csts/:id", get(get_cst).patch(update_cst).delete(delete_cst))
        .route("/fiscal/config", get(get_config).post(create_config))
        .route("/fiscal/config/:id", put(update_config))
        .route("/fiscal/produtos", get(list_profiles).post(create_profile))
        .route("/fiscal/produtos/:produto_id", get(get_profile).put(update_profile))
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            get(get_customer).patch(update_customer).delete(delete_customer),
        )
        .route("/fiscal/nfe", get(list_nfes).post(create_nfe))
        .route("/fiscal/nfe/:id", get(get_nfe).patch(update_nfe).delete(delete_nfe))
        .route("/fiscal/nfe/:id/item", post(add_item))
        .route("/fiscal/nfe/item/:id", patch(update_item).delete(delete_item))
        .route("/fiscal/nfe/:id/send", post(send_nfe))
        .route("/fiscal/nfe/:id/consult", get(consult_nfe))
        .route("/fiscal/nfe/:id/cancel", post(cancel_nfe))
        .route("/fiscal/nfe/:id/xml", get(nfe_xml))
        .route("/fiscal/inutilizar", post(void_numbers))
        .route("/fiscal/status-servico", get(service_status))
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Fiscal, action, entity, Some(id), details).await;
}

// Certificates

fn check_validity(from: chrono::NaiveDate, to: chrono::NaiveDate) -> ApiResult<()> {
    if from >= to {
        return Err(ApiError::bad_request("validFrom must be before validTo"));
    }
    Ok(())
}

pub async fn list_certificates(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<FiscalCertificate>>> {
    user.require(Module::Fiscal)?;
    Ok(Json(state.store.all::<FiscalCertificate>().await?))
}

pub async fn get_certificate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<FiscalCertificate>> {
    user.require(Module::Fiscal)?;
    Ok(Json(state.store.get::<FiscalCertificate>(id).await?))
}

pub async fn create_certificate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut cert): Json<FiscalCertificateData>,
) -> ApiResult<(StatusCode, Json<FiscalCertificate>)> {
    user.require(Module::Fiscal)?;
    require_text(&cert.name, "name", 1)?;
    require_text(&cert.serial_number, "serialNumber", 1)?;
    check_validity(cert.valid_from, cert.valid_to)?;
    cert.created_by = Some(user.id);
    let stored = state.store.create::<FiscalCertificate>(cert).await?;
    audit(&state, &user, AuditAction::Create, "fiscal_certificate", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_certificate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<FiscalCertificateChanges>,
) -> ApiResult<Json<FiscalCertificate>> {
    user.require(Module::Fiscal)?;
    let current = state.store.get::<FiscalCertificate>(id).await?;
    check_validity(
        changes.valid_from.unwrap_or(current.data.valid_from),
        changes.valid_to.unwrap_or(current.data.valid_to),
    )?;
    let updated = state.store.update::<FiscalCertificate>(id, changes.clone()).await?;
    // never log the blob or its password
    let details = json!({
        "name": changes.name,
        "validFrom": changes.valid_from,
        "validTo": changes.valid_to,
        "isActive": changes.is_active,
    });
    audit(&state, &user, AuditAction::Update, "fiscal_certificate", id, details).await;
    Ok(Json(updated))
}

pub async fn delete_certificate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Fiscal)?;
    state.store.delete::<FiscalCertificate>(id).await?;
    audit(&state, &user, AuditAction::Delete, "fiscal_certificate", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// NCM / CFOP / CST

pub async fn list_ncms(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<FiscalNcm>>> {
    user.require(Module::Fiscal)?;
    Ok(Json(state.store.all::<FiscalNcm>().await?))
}

pub async fn get_ncm(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<FiscalNcm>> {
    user.require(Module::Fiscal)?;
    Ok(Json(state.store.get::<FiscalNcm>(id).await?))
}

pub async fn create_ncm(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut ncm): Json<FiscalNcmData>,
) -> ApiResult<(StatusCode, Json<FiscalNcm>)> {
    user.require(Module::Fiscal)?;
    ncm.code = validate_ncm(&ncm.code)?;
    require_text(&ncm.description, "description", 1)?;
    let stored = state.store.create::<FiscalNcm>(ncm).await?;
    audit(&state, &user, AuditAction::Create, "fiscal_ncm", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_ncm(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<FiscalNcmChanges>,
) -> ApiResult<Json<FiscalNcm>> {
    user.require(Module::Fiscal)?;
    if let Some(code) = &changes.code {
        changes.code = Some(validate_ncm(code)?);
    }
    let updated = state.store.update::<FiscalNcm>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "fiscal_ncm", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_ncm(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Fiscal)?;
    state.store.delete::<FiscalNcm>(id).await?;
    audit(&state, &user, AuditAction::Delete, "fiscal_ncm", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

/// The first digit of a CFOP fixes its direction; `tipo` has to agree.
fn check_cfop(code: &str, tipo: &str) -> ApiResult<()> {
    let direction = cfop_direction(code)?;
    let declared: CfopDirection = tipo.parse()?;
    if direction != declared {
        return Err(ApiError::bad_request(format!(
            "CFOP {code} is an '{direction}' code, not '{declared}'"
        )));
    }
    Ok(())
}

pub async fn list_cfops(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<FiscalCfop>>> {
    user.require(Module::Fiscal)?;
    Ok(Json(state.store.all::<FiscalCfop>().await?))
}

pub async fn get_cfop(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<FiscalCfop>> {
    user.require(Module::Fiscal)?;
    Ok(Json(state.store.get::<FiscalCfop>(id).await?))
}

pub async fn create_cfop(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut cfop): Json<FiscalCfopData>,
) -> ApiResult<(StatusCode, Json<FiscalCfop>)> {
    user.require(Module::Fiscal)?;
    check_cfop(&cfop.code, &cfop.tipo)?;
    cfop.code = only_digits(&cfop.code);
    let stored = state.store.create::<FiscalCfop>(cfop).await?;
    audit(&state, &user, AuditAction::Create, "fiscal_cfop", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_cfop(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<FiscalCfopChanges>,
) -> ApiResult<Json<FiscalCfop>> {
    user.require(Module::Fiscal)?;
    let current = state.store.get::<FiscalCfop>(id).await?;
    let code = changes.code.clone().unwrap_or(current.data.code);
    check_cfop(&code, changes.tipo.as_deref().unwrap_or(&current.data.tipo))?;
    if changes.code.is_some() {
        changes.code = Some(only_digits(&code));
    }
    let updated = state.store.update::<FiscalCfop>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "fiscal_cfop", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_cfop(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Fiscal)?;
    state.store.delete::<FiscalCfop>(id).await?;
    audit(&state, &user, AuditAction::Delete, "fiscal_cfop", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_csts(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<FiscalCst>>> {
    user.require(Module::Fiscal)?;
    Ok(Json(state.store.all::<FiscalCst>().await?))
}

pub async fn get_cst(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<FiscalCst>> {
    user.require(Module::Fiscal)?;
    Ok(Json(state.store.get::<FiscalCst>(id).await?))
}

pub async fn create_cst(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut cst): Json<FiscalCstData>,
) -> ApiResult<(StatusCode, Json<FiscalCst>)> {
    user.require(Module::Fiscal)?;
    require_text(&cst.code, "code", 1)?;
    cst.tipo = cst.tipo.to_ascii_uppercase().parse::<CstKind>()?.to_string();
    let stored = state.store.create::<FiscalCst>(cst).await?;
    audit(&state, &user, AuditAction::Create, "fiscal_cst", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_cst(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<FiscalCstChanges>,
) -> ApiResult<Json<FiscalCst>> {
    user.require(Module::Fiscal)?;
    if let Some(tipo) = &changes.tipo {
        changes.tipo = Some(tipo.to_ascii_uppercase().parse::<CstKind>()?.to_string());
    }
    let updated = state.store.update::<FiscalCst>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "fiscal_cst", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_cst(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Fiscal)?;
    state.store.delete::<FiscalCst>(id).await?;
    audit(&state, &user, AuditAction::Delete, "fiscal_cst", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Config

async fn current_config(state: &AppState) -> ApiResult<Option<FiscalConfig>> {
    Ok(state.store.all::<FiscalConfig>().await?.into_iter().next())
}

async fn require_config(state: &AppState) -> ApiResult<FiscalConfig> {
    current_config(state)
        .await?
        .ok_or_else(|| ApiError::bad_request("fiscal configuration is missing"))
}

async fn check_config_fields(
    state: &AppState,
    ambiente: &str,
    regime: &str,
    uf: &str,
    serie: i32,
    next_number: i32,
    certificate: Option<i32>,
) -> ApiResult<()> {
    ambiente.parse::<Ambiente>()?;
    regime.parse::<TaxRegime>()?;
    uf_code(uf)?;
    if !(0..=999).contains(&serie) {
        return Err(ApiError::bad_request("serieNFe must be between 0 and 999"));
    }
    if next_number < 1 {
        return Err(ApiError::bad_request("proximoNumeroNFe must be positive"));
    }
    if let Some(id) = certificate {
        state.store.get::<FiscalCertificate>(id).await?;
    }
    Ok(())
}

/// `{}` until a configuration exists.
pub async fn get_config(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
    user.require(Module::Fiscal)?;
    Ok(Json(match current_config(&state).await? {
        Some(config) => to_details(&config),
        None => json!({}),
    }))
}

pub async fn create_config(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut config): Json<FiscalConfigData>,
) -> ApiResult<(StatusCode, Json<FiscalConfig>)> {
    user.require(Module::Fiscal)?;
    if current_config(&state).await?.is_some() {
        return Err(ApiError::Conflict("fiscal configuration already exists".into()));
    }
    config.uf_emissor = config.uf_emissor.trim().to_ascii_uppercase();
    check_config_fields(
        &state,
        &config.ambiente,
        &config.regime_tributario,
        &config.uf_emissor,
        config.serie_nfe,
        config.proximo_numero_nfe,
        config.certificado_id,
    )
    .await?;
    let stored = state.store.create::<FiscalConfig>(config).await?;
    audit(&state, &user, AuditAction::Create, "fiscal_config", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_config(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<FiscalConfigChanges>,
) -> ApiResult<Json<FiscalConfig>> {
    user.require(Module::Fiscal)?;
    let current = state.store.get::<FiscalConfig>(id).await?.data;
    if let Some(uf) = &changes.uf_emissor {
        changes.uf_emissor = Some(uf.trim().to_ascii_uppercase());
    }
    check_config_fields(
        &state,
        changes.ambiente.as_deref().unwrap_or(&current.ambiente),
        changes.regime_tributario.as_deref().unwrap_or(&current.regime_tributario),
        changes.uf_emissor.as_deref().unwrap_or(&current.uf_emissor),
        changes.serie_nfe.unwrap_or(current.serie_nfe),
        changes.proximo_numero_nfe.unwrap_or(current.proximo_numero_nfe),
        changes.certificado_id,
    )
    .await?;
    let updated = state.store.update::<FiscalConfig>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "fiscal_config", id, to_details(&changes)).await;
    Ok(Json(updated))
}

// Product fiscal profiles

fn check_profile(ncm: Option<&str>, cfop: Option<&str>) -> ApiResult<Option<String>> {
    if let Some(cfop) = cfop {
        cfop_direction(cfop)?;
    }
    Ok(ncm.map(validate_ncm).transpose()?)
}

pub async fn list_profiles(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<ProdutoFiscal>>> {
    user.require(Module::Fiscal)?;
    Ok(Json(state.store.all::<ProdutoFiscal>().await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(produto_id): Path<i32>,
) -> ApiResult<Json<ProdutoFiscal>> {
    user.require(Module::Fiscal)?;
    state
        .store
        .produto_fiscal(produto_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ProdutoFiscal::ENTITY))
}

/// One profile per product.
pub async fn create_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut profile): Json<ProdutoFiscalData>,
) -> ApiResult<(StatusCode, Json<ProdutoFiscal>)> {
    user.require(Module::Fiscal)?;
    state.store.get::<Product>(profile.produto_id).await?;
    if let Some(ncm) = check_profile(Some(profile.ncm.as_str()), profile.cfop_padrao.as_deref())? {
        profile.ncm = ncm;
    }
    profile.cfop_padrao = profile.cfop_padrao.as_deref().map(only_digits);
    profile.updated_at = Some(Utc::now());
    let stored = state.store.create::<ProdutoFiscal>(profile).await?;
    audit(&state, &user, AuditAction::Create, "produto_fiscal", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(produto_id): Path<i32>,
    Json(mut changes): Json<ProdutoFiscalChanges>,
) -> ApiResult<Json<ProdutoFiscal>> {
    user.require(Module::Fiscal)?;
    let current = state
        .store
        .produto_fiscal(produto_id)
        .await?
        .ok_or_else(|| ApiError::not_found(ProdutoFiscal::ENTITY))?;
    changes.ncm = check_profile(changes.ncm.as_deref(), changes.cfop_padrao.as_deref())?;
    changes.cfop_padrao = changes.cfop_padrao.as_deref().map(only_digits);
    changes.updated_at = Some(Utc::now());
    let updated = state.store.update::<ProdutoFiscal>(current.id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "produto_fiscal", current.id, to_details(&changes)).await;
    Ok(Json(updated))
}

// Customers

const CUSTOMER_MODULES: &[Module] = &[Module::Commercial, Module::Fiscal];

fn clean_customer_doc(tax_id: Option<&str>) -> ApiResult<Option<String>> {
    match tax_id.filter(|t| !t.trim().is_empty()) {
        Some(t) => Ok(Some(validate_tax_id(t)?)),
        None => Ok(None),
    }
}

fn clean_uf(uf: Option<&str>) -> ApiResult<Option<String>> {
    match uf.filter(|u| !u.trim().is_empty()) {
        Some(u) => {
            uf_code(u)?;
            Ok(Some(u.trim().to_ascii_uppercase()))
        }
        None => Ok(None),
    }
}

pub async fn list_customers(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Customer>>> {
    user.require_any(CUSTOMER_MODULES)?;
    Ok(Json(state.store.all::<Customer>().await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Customer>> {
    user.require_any(CUSTOMER_MODULES)?;
    Ok(Json(state.store.get::<Customer>(id).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut customer): Json<CustomerData>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    user.require_any(CUSTOMER_MODULES)?;
    require_text(&customer.name, "name", 1)?;
    customer.tax_id = clean_customer_doc(customer.tax_id.as_deref())?;
    customer.uf = clean_uf(customer.uf.as_deref())?;
    customer.created_by = Some(user.id);
    let stored = state.store.create::<Customer>(customer).await?;
    state
        .audit(&user, Module::Commercial, AuditAction::Create, "customer", Some(stored.id), to_details(&stored))
        .await;
    Ok(created(stored))
}

pub async fn update_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<CustomerChanges>,
) -> ApiResult<Json<Customer>> {
    user.require_any(CUSTOMER_MODULES)?;
    if changes.tax_id.is_some() {
        changes.tax_id = clean_customer_doc(changes.tax_id.as_deref())?;
    }
    if changes.uf.is_some() {
        changes.uf = clean_uf(changes.uf.as_deref())?;
    }
    let updated = state.store.update::<Customer>(id, changes.clone()).await?;
    state
        .audit(&user, Module::Commercial, AuditAction::Update, "customer", Some(id), to_details(&changes))
        .await;
    Ok(Json(updated))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require_any(CUSTOMER_MODULES)?;
    state.store.delete::<Customer>(id).await?;
    state
        .audit(&user, Module::Commercial, AuditAction::Delete, "customer", Some(id), Value::Null)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// NF-e

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfeQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn list_nfes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<NfeQuery>,
) -> ApiResult<Json<Paginated<Nfe>>> {
    user.require(Module::Fiscal)?;
    let status = query.status.filter(|s| !s.is_empty());
    if let Some(status) = &status {
        status.parse::<NfeStatus>()?;
    }
    let page = Page::new(query.page, query.page_size, DEFAULT_PAGE_SIZE);
    let (rows, total) = state.store.nfe_page(status, page).await?;
    Ok(Json(Paginated::new(rows, total, page)))
}

#[derive(Debug, Serialize)]
pub struct NfeDetail {
    #[serde(flatten)]
    pub nfe: Nfe,
    pub destinatario: Option<Customer>,
    pub itens: Vec<NfeItem>,
    pub eventos: Vec<NfeEvento>,
}

async fn load_nfe(state: &AppState, id: i32) -> ApiResult<(Nfe, NfeStatus)> {
    let nfe = state.store.get::<Nfe>(id).await?;
    let status = nfe.data.status.parse::<NfeStatus>()?;
    Ok((nfe, status))
}

async fn editable_nfe(state: &AppState, id: i32) -> ApiResult<Nfe> {
    let (nfe, status) = load_nfe(state, id).await?;
    if !status.is_editable() {
        return Err(ApiError::bad_request(format!(
            "NF-e {} is '{}' and can no longer be edited",
            nfe.data.numero, status
        )));
    }
    Ok(nfe)
}

pub async fn get_nfe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<NfeDetail>> {
    user.require(Module::Fiscal)?;
    let nfe = state.store.get::<Nfe>(id).await?;
    let destinatario = state.store.find::<Customer>(nfe.data.destinatario_id).await?;
    let itens = state.store.nfe_items(id).await?;
    let eventos = state.store.nfe_events(id).await?;
    Ok(Json(NfeDetail { nfe, destinatario, itens, eventos }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNfe {
    pub natureza_operacao: String,
    pub destinatario_id: i32,
    pub tipo_operacao: Option<String>,
    pub finalidade: Option<String>,
    #[serde(default)]
    pub valor_frete: f64,
    #[serde(default)]
    pub valor_seguro: f64,
    #[serde(default)]
    pub valor_desconto: f64,
    #[serde(default)]
    pub valor_outras_despesas: f64,
    #[serde(default)]
    pub valor_icms_st: f64,
    pub informacoes_adicionais: Option<String>,
}

fn issuer_cnpj(company: &Option<Company>) -> ApiResult<String> {
    let cnpj = company
        .as_ref()
        .and_then(|c| c.data.tax_id.as_deref())
        .map(only_digits)
        .unwrap_or_default();
    if cnpj.len() != 14 {
        return Err(ApiError::bad_request(
            "the company profile needs a 14-digit CNPJ before issuing NF-e",
        ));
    }
    Ok(cnpj)
}

fn charges_of(nfe: &NfeData) -> Charges {
    Charges {
        freight: nfe.valor_frete,
        insurance: nfe.valor_seguro,
        other: nfe.valor_outras_despesas,
        discount: nfe.valor_desconto,
        icms_st: nfe.valor_icms_st,
    }
}

/// Takes the next number from the configuration and assigns the access key.
pub async fn create_nfe(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewNfe>,
) -> ApiResult<(StatusCode, Json<Nfe>)> {
    user.require(Module::Fiscal)?;
    require_text(&request.natureza_operacao, "naturezaOperacao", 1)?;
    let config = require_config(&state).await?;
    let company = state.store.all::<Company>().await?.into_iter().next();
    let cnpj = issuer_cnpj(&company)?;
    state.store.get::<Customer>(request.destinatario_id).await?;

    let now = Utc::now();
    let uf = config.data.uf_emissor.clone();
    let numeric_code: u32 = rand::thread_rng().gen_range(1..=99_999_999);
    let charges = Charges {
        freight: request.valor_frete,
        insurance: request.valor_seguro,
        other: request.valor_outras_despesas,
        discount: request.valor_desconto,
        icms_st: request.valor_icms_st,
    };
    let totals = compute_totals(std::iter::empty::<&ItemTaxes>(), &charges);
    let created_by = user.id;

    let draft = Box::new(move |numero: i32, serie: i32| -> StoreResult<NfeData> {
        let chave = build_access_key(&AccessKeyParts {
            uf: &uf,
            issued_on: now.date_naive(),
            cnpj: &cnpj,
            model: 55,
            series: u32::try_from(serie).unwrap_or(u32::MAX),
            number: u32::try_from(numero).unwrap_or(u32::MAX),
            emission_type: 1,
            numeric_code,
        })
        .map_err(|e| StoreError::Invalid(e.to_string()))?;
        Ok(NfeData {
            numero,
            serie,
            chave,
            data_emissao: now,
            status: NfeStatus::Draft.to_string(),
            modelo_documento: "55".into(),
            natureza_operacao: request.natureza_operacao,
            tipo_operacao: request.tipo_operacao.unwrap_or_else(|| "1".into()),
            finalidade: request.finalidade.unwrap_or_else(|| "1".into()),
            destinatario_id: request.destinatario_id,
            valor_total: totals.total,
            valor_produtos: 0.0,
            valor_frete: charges.freight,
            valor_seguro: charges.insurance,
            valor_desconto: charges.discount,
            valor_outras_despesas: charges.other,
            valor_icms: 0.0,
            valor_icms_st: charges.icms_st,
            valor_ipi: 0.0,
            valor_pis: 0.0,
            valor_cofins: 0.0,
            informacoes_adicionais: request.informacoes_adicionais,
            protocolo: None,
            xml_envio: None,
            xml_retorno: None,
            xml_cancelamento: None,
            motivo_cancelamento: None,
            data_cancelamento: None,
            created_by,
        })
    });

    let nfe = state.store.issue_nfe(config.id, draft).await?;
    tracing::info!("Created NF-e {} serie {} ({})", nfe.data.numero, nfe.data.serie, nfe.data.chave);
    audit(&state, &user, AuditAction::Create, "nfe", nfe.id, json!({ "numero": nfe.data.numero, "chave": nfe.data.chave })).await;
    Ok(created(nfe))
}

/// Sums the items into the document and applies its own charges.
async fn refresh_totals(state: &AppState, nfe_id: i32) -> ApiResult<Nfe> {
    let nfe = state.store.get::<Nfe>(nfe_id).await?;
    let items: Vec<ItemTaxes> = state
        .store
        .nfe_items(nfe_id)
        .await?
        .iter()
        .map(|item| stored_taxes(&item.data))
        .collect();
    let totals = compute_totals(items.iter(), &charges_of(&nfe.data));
    let changes = NfeChanges {
        valor_produtos: Some(totals.products),
        valor_icms: Some(totals.icms),
        valor_pis: Some(totals.pis),
        valor_cofins: Some(totals.cofins),
        valor_ipi: Some(totals.ipi),
        valor_total: Some(totals.total),
        ..Default::default()
    };
    Ok(state.store.update::<Nfe>(nfe_id, changes).await?)
}

fn stored_taxes(item: &NfeItemData) -> ItemTaxes {
    ItemTaxes {
        total: item.valor_total,
        icms: TaxLine { base: item.base_calculo_icms, rate: item.aliquota_icms, value: item.valor_icms },
        pis: TaxLine { base: item.base_calculo_pis, rate: item.aliquota_pis, value: item.valor_pis },
        cofins: TaxLine {
            base: item.base_calculo_cofins,
            rate: item.aliquota_cofins,
            value: item.valor_cofins,
        },
        ipi: TaxLine { base: item.base_calculo_ipi, rate: item.aliquota_ipi, value: item.valor_ipi },
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfeUpdate {
    pub natureza_operacao: Option<String>,
    pub tipo_operacao: Option<String>,
    pub finalidade: Option<String>,
    pub destinatario_id: Option<i32>,
    pub valor_frete: Option<f64>,
    pub valor_seguro: Option<f64>,
    pub valor_desconto: Option<f64>,
    pub valor_outras_despesas: Option<f64>,
    pub valor_icms_st: Option<f64>,
    pub informacoes_adicionais: Option<String>,
}

pub async fn update_nfe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(update): Json<NfeUpdate>,
) -> ApiResult<Json<Nfe>> {
    user.require(Module::Fiscal)?;
    editable_nfe(&state, id).await?;
    if let Some(customer) = update.destinatario_id {
        state.store.get::<Customer>(customer).await?;
    }
    let changes = NfeChanges {
        natureza_operacao: update.natureza_operacao,
        tipo_operacao: update.tipo_operacao,
        finalidade: update.finalidade,
        destinatario_id: update.destinatario_id,
        valor_frete: update.valor_frete,
        valor_seguro: update.valor_seguro,
        valor_desconto: update.valor_desconto,
        valor_outras_despesas: update.valor_outras_despesas,
        valor_icms_st: update.valor_icms_st,
        informacoes_adicionais: update.informacoes_adicionais,
        ..Default::default()
    };
    state.store.update::<Nfe>(id, changes.clone()).await?;
    let nfe = refresh_totals(&state, id).await?;
    audit(&state, &user, AuditAction::Update, "nfe", id, to_details(&changes)).await;
    Ok(Json(nfe))
}

pub async fn delete_nfe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Fiscal)?;
    let nfe = editable_nfe(&state, id).await?;
    state.store.delete::<Nfe>(id).await?;
    audit(&state, &user, AuditAction::Delete, "nfe", id, json!({ "numero": nfe.data.numero })).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub produto_id: Option<i32>,
    pub codigo: Option<String>,
    pub descricao: Option<String>,
    pub ncm: Option<String>,
    pub cfop: Option<String>,
    pub unidade: Option<String>,
    pub quantidade: Option<f64>,
    pub valor_unitario: Option<f64>,
    pub valor_desconto: Option<f64>,
    pub cst_icms: Option<String>,
    pub cst_pis: Option<String>,
    pub cst_cofins: Option<String>,
    pub cst_ipi: Option<String>,
    pub aliquota_icms: Option<f64>,
    pub aliquota_pis: Option<f64>,
    pub aliquota_cofins: Option<f64>,
    pub aliquota_ipi: Option<f64>,
    pub informacoes_adicionais: Option<String>,
}

fn check_item_amounts(quantity: f64, unit_price: f64, discount: f64) -> ApiResult<()> {
    if quantity <= 0.0 {
        return Err(ApiError::bad_request("quantidade must be greater than zero"));
    }
    if unit_price < 0.0 || discount < 0.0 {
        return Err(ApiError::bad_request("values must not be negative"));
    }
    if discount > quantity * unit_price {
        return Err(ApiError::bad_request("discount exceeds the item value"));
    }
    Ok(())
}

/// The configured regime's rates, with IPI taken from the NCM table.
async fn regime_rates(state: &AppState, ncm: &str) -> ApiResult<TaxRates> {
    let config = require_config(state).await?;
    let regime: TaxRegime = config.data.regime_tributario.parse()?;
    let ipi = state
        .store
        .all::<FiscalNcm>()
        .await?
        .into_iter()
        .find(|n| n.data.code == ncm)
        .and_then(|n| n.data.aliquota_nacional);
    Ok(default_rates(regime, ipi))
}

/// Rates the request leaves out come from the product's fiscal profile, then
/// from the regime.
async fn item_rates(
    state: &AppState,
    ncm: &str,
    request: &ItemRequest,
    profile: Option<&ProdutoFiscalData>,
) -> ApiResult<TaxRates> {
    let defaults = regime_rates(state, ncm).await?;
    let from_profile = |rate: fn(&ProdutoFiscalData) -> Option<f64>| profile.and_then(rate);
    Ok(TaxRates {
        icms: request
            .aliquota_icms
            .or(from_profile(|p| p.aliquota_icms))
            .unwrap_or(defaults.icms),
        pis: request
            .aliquota_pis
            .or(from_profile(|p| p.aliquota_pis))
            .unwrap_or(defaults.pis),
        cofins: request
            .aliquota_cofins
            .or(from_profile(|p| p.aliquota_cofins))
            .unwrap_or(defaults.cofins),
        ipi: request
            .aliquota_ipi
            .or(from_profile(|p| p.aliquota_ipi))
            .unwrap_or(defaults.ipi),
    })
}

fn apply_taxes(item: &mut NfeItemData, taxes: &ItemTaxes) {
    item.valor_total = taxes.total;
    item.base_calculo_icms = taxes.icms.base;
    item.aliquota_icms = taxes.icms.rate;
    item.valor_icms = taxes.icms.value;
    item.base_calculo_pis = taxes.pis.base;
    item.aliquota_pis = taxes.pis.rate;
    item.valor_pis = taxes.pis.value;
    item.base_calculo_cofins = taxes.cofins.base;
    item.aliquota_cofins = taxes.cofins.rate;
    item.valor_cofins = taxes.cofins.value;
    item.base_calculo_ipi = taxes.ipi.base;
    item.aliquota_ipi = taxes.ipi.rate;
    item.valor_ipi = taxes.ipi.value;
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: NfeItem,
    pub nfe: Nfe,
}

pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(nfe_id): Path<i32>,
    Json(request): Json<ItemRequest>,
) -> ApiResult<(StatusCode, Json<ItemResponse>)> {
    user.require(Module::Fiscal)?;
    editable_nfe(&state, nfe_id).await?;
    let produto_id = request
        .produto_id
        .ok_or_else(|| ApiError::bad_request("produtoId is required"))?;
    let product = state.store.get::<Product>(produto_id).await?.data;
    let profile = state.store.produto_fiscal(produto_id).await?.map(|p| p.data);

    let ncm = request
        .ncm
        .clone()
        .or_else(|| profile.as_ref().map(|p| p.ncm.clone()))
        .or(product.ncm.clone())
        .ok_or_else(|| ApiError::bad_request("ncm is required"))?;
    let ncm = validate_ncm(&ncm)?;
    let cfop = request
        .cfop
        .clone()
        .or_else(|| profile.as_ref().and_then(|p| p.cfop_padrao.clone()))
        .ok_or_else(|| ApiError::bad_request("cfop is required"))?;
    cfop_direction(&cfop)?;
    let quantity = request.quantidade.unwrap_or(0.0);
    let unit_price = request.valor_unitario.or(product.selling_price).unwrap_or(0.0);
    let discount = request.valor_desconto.unwrap_or(0.0);
    check_item_amounts(quantity, unit_price, discount)?;

    let rates = item_rates(&state, &ncm, &request, profile.as_ref()).await?;
    let profile_cst = |cst: fn(&ProdutoFiscalData) -> Option<String>| profile.as_ref().and_then(cst);
    let taxes = compute_item(&ItemInput { quantity, unit_price, discount, rates });

    let mut item = NfeItemData {
        nfe_id,
        produto_id,
        codigo: request.codigo.unwrap_or(product.code),
        descricao: request.descricao.unwrap_or(product.name),
        ncm,
        cfop: only_digits(&cfop),
        unidade: request.unidade.unwrap_or(product.unit),
        quantidade: quantity,
        valor_unitario: unit_price,
        valor_total: 0.0,
        valor_desconto: discount,
        cst_icms: request.cst_icms.or_else(|| profile_cst(|p| p.cst_icms.clone())),
        base_calculo_icms: 0.0,
        aliquota_icms: 0.0,
        valor_icms: 0.0,
        cst_pis: request.cst_pis.or_else(|| profile_cst(|p| p.cst_pis.clone())),
        base_calculo_pis: 0.0,
        aliquota_pis: 0.0,
        valor_pis: 0.0,
        cst_cofins: request.cst_cofins.or_else(|| profile_cst(|p| p.cst_cofins.clone())),
        base_calculo_cofins: 0.0,
        aliquota_cofins: 0.0,
        valor_cofins: 0.0,
        cst_ipi: request.cst_ipi.or_else(|| profile_cst(|p| p.cst_ipi.clone())),
        base_calculo_ipi: 0.0,
        aliquota_ipi: 0.0,
        valor_ipi: 0.0,
        informacoes_adicionais: request.informacoes_adicionais,
    };
    apply_taxes(&mut item, &taxes);

    let item = state.store.create::<NfeItem>(item).await?;
    let nfe = refresh_totals(&state, nfe_id).await?;
    audit(&state, &user, AuditAction::Create, "nfe_item", item.id, to_details(&item)).await;
    Ok(created(ItemResponse { item, nfe }))
}

/// Rates already on the item are kept unless the request replaces them. A
/// new NCM brings its own IPI rate.
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(request): Json<ItemRequest>,
) -> ApiResult<Json<ItemResponse>> {
    user.require(Module::Fiscal)?;
    let current = state.store.get::<NfeItem>(id).await?;
    editable_nfe(&state, current.data.nfe_id).await?;
    let mut item = current.data.clone();

    if let Some(produto_id) = request.produto_id {
        state.store.get::<Product>(produto_id).await?;
        item.produto_id = produto_id;
    }
    if let Some(ncm) = &request.ncm {
        item.ncm = validate_ncm(ncm)?;
    }
    if let Some(cfop) = &request.cfop {
        cfop_direction(cfop)?;
        item.cfop = only_digits(cfop);
    }
    item.codigo = request.codigo.unwrap_or(item.codigo);
    item.descricao = request.descricao.unwrap_or(item.descricao);
    item.unidade = request.unidade.unwrap_or(item.unidade);
    item.quantidade = request.quantidade.unwrap_or(item.quantidade);
    item.valor_unitario = request.valor_unitario.unwrap_or(item.valor_unitario);
    item.valor_desconto = request.valor_desconto.unwrap_or(item.valor_desconto);
    item.cst_icms = request.cst_icms.or(item.cst_icms);
    item.cst_pis = request.cst_pis.or(item.cst_pis);
    item.cst_cofins = request.cst_cofins.or(item.cst_cofins);
    item.cst_ipi = request.cst_ipi.or(item.cst_ipi);
    item.informacoes_adicionais = request.informacoes_adicionais.or(item.informacoes_adicionais);
    check_item_amounts(item.quantidade, item.valor_unitario, item.valor_desconto)?;

    let ipi = match request.aliquota_ipi {
        Some(rate) => rate,
        None if item.ncm != current.data.ncm => regime_rates(&state, &item.ncm).await?.ipi,
        None => item.aliquota_ipi,
    };
    let rates = TaxRates {
        icms: request.aliquota_icms.unwrap_or(item.aliquota_icms),
        pis: request.aliquota_pis.unwrap_or(item.aliquota_pis),
        cofins: request.aliquota_cofins.unwrap_or(item.aliquota_cofins),
        ipi,
    };
    let taxes = compute_item(&ItemInput {
        quantity: item.quantidade,
        unit_price: item.valor_unitario,
        discount: item.valor_desconto,
        rates,
    });
    apply_taxes(&mut item, &taxes);

    let changes = NfeItemChanges {
        produto_id: Some(item.produto_id),
        codigo: Some(item.codigo),
        descricao: Some(item.descricao),
        ncm: Some(item.ncm),
        cfop: Some(item.cfop),
        unidade: Some(item.unidade),
        quantidade: Some(item.quantidade),
        valor_unitario: Some(item.valor_unitario),
        valor_total: Some(item.valor_total),
        valor_desconto: Some(item.valor_desconto),
        cst_icms: item.cst_icms,
        base_calculo_icms: Some(item.base_calculo_icms),
        aliquota_icms: Some(item.aliquota_icms),
        valor_icms: Some(item.valor_icms),
        cst_pis: item.cst_pis,
        base_calculo_pis: Some(item.base_calculo_pis),
        aliquota_pis: Some(item.aliquota_pis),
        valor_pis: Some(item.valor_pis),
        cst_cofins: item.cst_cofins,
        base_calculo_cofins: Some(item.base_calculo_cofins),
        aliquota_cofins: Some(item.aliquota_cofins),
        valor_cofins: Some(item.valor_cofins),
        cst_ipi: item.cst_ipi,
        base_calculo_ipi: Some(item.base_calculo_ipi),
        aliquota_ipi: Some(item.aliquota_ipi),
        valor_ipi: Some(item.valor_ipi),
        informacoes_adicionais: item.informacoes_adicionais,
    };
    let updated = state.store.update::<NfeItem>(id, changes).await?;
    let nfe = refresh_totals(&state, updated.data.nfe_id).await?;
    audit(&state, &user, AuditAction::Update, "nfe_item", id, to_details(&updated)).await;
    Ok(Json(ItemResponse { item: updated, nfe }))
}

pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Nfe>> {
    user.require(Module::Fiscal)?;
    let item = state.store.get::<NfeItem>(id).await?;
    editable_nfe(&state, item.data.nfe_id).await?;
    state.store.delete::<NfeItem>(id).await?;
    let nfe = refresh_totals(&state, item.data.nfe_id).await?;
    audit(&state, &user, AuditAction::Delete, "nfe_item", id, Value::Null).await;
    Ok(Json(nfe))
}

async fn build_document(state: &AppState, nfe: &Nfe, config: &FiscalConfig) -> ApiResult<String> {
    let items = state.store.nfe_items(nfe.id).await?;
    let company = state
        .store
        .all::<Company>()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::bad_request("company profile is missing"))?;
    let recipient = state.store.get::<Customer>(nfe.data.destinatario_id).await?;
    let ambiente: Ambiente = config.data.ambiente.parse()?;
    Ok(xml::nfe_document(&xml::NfeContext {
        nfe,
        items: &items,
        issuer: &company,
        config,
        recipient: &recipient,
        uf_code: uf_code(&config.data.uf_emissor)?,
        ambiente: ambiente.code(),
    }))
}

/// A certificate on the configuration, active and not yet expired.
async fn usable_certificate(state: &AppState, config: &FiscalConfig) -> ApiResult<FiscalCertificate> {
    let id = config
        .data
        .certificado_id
        .ok_or_else(|| ApiError::bad_request("no digital certificate configured"))?;
    let cert = state.store.get::<FiscalCertificate>(id).await?;
    if !cert.data.is_active {
        return Err(ApiError::bad_request("the configured certificate is inactive"));
    }
    if cert.data.valid_to < Utc::now().date_naive() {
        return Err(ApiError::bad_request("the configured certificate has expired"));
    }
    Ok(cert)
}

async fn record_event(
    state: &AppState,
    nfe_id: i32,
    kind: NfeEventKind,
    reply: &SefazResponse,
) -> ApiResult<NfeEvento> {
    Ok(state
        .store
        .create::<NfeEvento>(NfeEventoData {
            nfe_id,
            tipo: kind.to_string(),
            status: reply.status_code.to_string(),
            mensagem: Some(reply.message.clone()),
            protocolo: reply.protocol.clone(),
            xml: Some(reply.xml.clone()),
            data_evento: reply.received_at,
        })
        .await?)
}

fn gateway_error(e: sefaz::SefazError) -> ApiError {
    ApiError::Internal(e.to_string())
}

#[derive(Debug, Serialize)]
pub struct SefazOutcome {
    pub nfe: Nfe,
    pub sefaz: SefazResponse,
}

pub async fn send_nfe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<SefazOutcome>> {
    user.require(Module::Fiscal)?;
    let (nfe, status) = load_nfe(&state, id).await?;
    if !status.can_send() {
        return Err(ApiError::bad_request(format!("an NF-e in status '{status}' cannot be sent")));
    }
    if state.store.nfe_items(id).await?.is_empty() {
        return Err(ApiError::bad_request("the NF-e has no items"));
    }
    let config = require_config(&state).await?;
    usable_certificate(&state, &config).await?;

    // Nothing is written until the gateway answers.
    let document = build_document(&state, &nfe, &config).await?;
    let reply = state
        .sefaz
        .authorize(Submission {
            ambiente: config.data.ambiente.parse()?,
            chave: nfe.data.chave.clone(),
            xml: document.clone(),
        })
        .await
        .map_err(gateway_error)?;
    record_event(&state, id, NfeEventKind::Submission, &reply).await?;

    let outcome = if reply.status_code == sefaz::codes::AUTHORIZED {
        NfeChanges {
            status: Some(NfeStatus::Authorized.to_string()),
            protocolo: reply.protocol.clone(),
            xml_envio: Some(document),
            xml_retorno: Some(reply.xml.clone()),
            ..Default::default()
        }
    } else {
        NfeChanges {
            status: Some(NfeStatus::Rejected.to_string()),
            xml_envio: Some(document),
            xml_retorno: Some(reply.xml.clone()),
            ..Default::default()
        }
    };
    let nfe = state.store.update::<Nfe>(id, outcome).await?;
    tracing::info!("NF-e {} sent: {} {}", nfe.data.chave, reply.status_code, reply.message);
    audit(
        &state,
        &user,
        AuditAction::Update,
        "nfe",
        id,
        json!({ "action": "send", "status": nfe.data.status, "cStat": reply.status_code }),
    )
    .await;
    Ok(Json(SefazOutcome { nfe, sefaz: reply }))
}

pub async fn consult_nfe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<SefazResponse>> {
    user.require(Module::Fiscal)?;
    let nfe = state.store.get::<Nfe>(id).await?;
    let ambiente = match current_config(&state).await? {
        Some(config) => config.data.ambiente.parse()?,
        None => Ambiente::Homologacao,
    };
    let reply = state
        .sefaz
        .consult(ambiente, nfe.data.chave.clone())
        .await
        .map_err(gateway_error)?;
    record_event(&state, id, NfeEventKind::Query, &reply).await?;
    Ok(Json(reply))
}

#[derive(Debug, Deserialize)]
pub struct CancelBody {
    #[serde(default)]
    pub justificativa: String,
}

fn check_justification(text: &str) -> ApiResult<()> {
    let len = text.trim().chars().count();
    if !(15..=255).contains(&len) {
        return Err(ApiError::bad_request("justificativa must have between 15 and 255 characters"));
    }
    Ok(())
}

pub async fn cancel_nfe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(body): Json<CancelBody>,
) -> ApiResult<Json<SefazOutcome>> {
    user.require(Module::Fiscal)?;
    let (nfe, status) = load_nfe(&state, id).await?;
    if !status.can_cancel() {
        return Err(ApiError::bad_request(format!(
            "an NF-e in status '{status}' cannot be cancelled"
        )));
    }
    check_justification(&body.justificativa)?;
    let justificativa = body.justificativa.trim().to_string();
    let config = require_config(&state).await?;
    let ambiente: Ambiente = config.data.ambiente.parse()?;
    let company = state.store.all::<Company>().await?.into_iter().next();
    let cnpj = issuer_cnpj(&company)?;

    let now = Utc::now();
    let document = xml::cancel_event(&xml::CancelEvent {
        chave: &nfe.data.chave,
        protocolo: nfe.data.protocolo.as_deref().unwrap_or_default(),
        justificativa: &justificativa,
        cnpj: &cnpj,
        ambiente: ambiente.code(),
        at: now,
    });
    let reply = state
        .sefaz
        .cancel(CancelRequest { ambiente, chave: nfe.data.chave.clone(), xml: document.clone() })
        .await
        .map_err(gateway_error)?;
    record_event(&state, id, NfeEventKind::Cancellation, &reply).await?;

    if !reply.is_success() {
        return Err(ApiError::bad_request(format!(
            "SEFAZ refused the cancellation: {} {}",
            reply.status_code, reply.message
        )));
    }
    let nfe = state
        .store
        .update::<Nfe>(
            id,
            NfeChanges {
                status: Some(NfeStatus::Cancelled.to_string()),
                motivo_cancelamento: Some(justificativa.clone()),
                data_cancelamento: Some(now),
                xml_cancelamento: Some(document),
                ..Default::default()
            },
        )
        .await?;
    tracing::info!("NF-e {} cancelled", nfe.data.chave);
    audit(
        &state,
        &user,
        AuditAction::Update,
        "nfe",
        id,
        json!({ "action": "cancel", "justificativa": justificativa }),
    )
    .await;
    Ok(Json(SefazOutcome { nfe, sefaz: reply }))
}

/// The document as sent, or as it would be sent now for drafts.
pub async fn nfe_xml(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    user.require(Module::Fiscal)?;
    let nfe = state.store.get::<Nfe>(id).await?;
    let document = match nfe.data.xml_envio.clone() {
        Some(document) => document,
        None => {
            let config = require_config(&state).await?;
            build_document(&state, &nfe, &config).await?
        }
    };
    let body = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>{document}");
    Ok(([(header::CONTENT_TYPE, "application/xml")], body).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoidBody {
    pub serie: i32,
    pub numero_inicial: i32,
    pub numero_final: i32,
    #[serde(default)]
    pub justificativa: String,
}

pub async fn void_numbers(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<VoidBody>,
) -> ApiResult<Json<SefazResponse>> {
    user.require(Module::Fiscal)?;
    if body.numero_inicial < 1 || body.numero_final < body.numero_inicial {
        return Err(ApiError::bad_request("the number range must be ascending and positive"));
    }
    if !(0..=999).contains(&body.serie) {
        return Err(ApiError::bad_request("serie must be between 0 and 999"));
    }
    check_justification(&body.justificativa)?;
    let config = require_config(&state).await?;
    let ambiente: Ambiente = config.data.ambiente.parse()?;
    let company = state.store.all::<Company>().await?.into_iter().next();
    let cnpj = issuer_cnpj(&company)?;

    let document = xml::void_request(&xml::VoidRange {
        uf_code: uf_code(&config.data.uf_emissor)?,
        year: chrono::Datelike::year(&Utc::now()),
        cnpj: &cnpj,
        serie: body.serie,
        first: body.numero_inicial,
        last: body.numero_final,
        justificativa: body.justificativa.trim(),
        ambiente: ambiente.code(),
    });
    let reply = state
        .sefaz
        .inutilizar(VoidRequest { ambiente, xml: document })
        .await
        .map_err(gateway_error)?;
    state
        .audit(
            &user,
            Module::Fiscal,
            AuditAction::Create,
            "nfe_inutilizacao",
            None,
            json!({
                "serie": body.serie,
                "numeroInicial": body.numero_inicial,
                "numeroFinal": body.numero_final,
                "protocolo": reply.protocol,
                "cStat": reply.status_code,
            }),
        )
        .await;
    Ok(Json(reply))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub uf: Option<String>,
}

pub async fn service_status(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<SefazResponse>> {
    user.require(Module::Fiscal)?;
    let config = current_config(&state).await?;
    let uf = query
        .uf
        .filter(|u| !u.trim().is_empty())
        .or_else(|| config.as_ref().map(|c| c.data.uf_emissor.clone()))
        .unwrap_or_else(|| "MG".to_string());
    uf_code(&uf)?;
    let ambiente = match &config {
        Some(config) => config.data.ambiente.parse()?,
        None => Ambiente::Homologacao,
    };
    let reply = state
        .sefaz
        .status_servico(ambiente, uf.to_ascii_uppercase())
        .await
        .map_err(gateway_error)?;
    Ok(Json(reply))
}
