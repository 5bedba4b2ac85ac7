use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use erp_service::sefaz::{
    CancelRequest, SefazError, SefazGateway, SefazResponse, SefazResult, SimulatedSefaz,
    Submission, VoidRequest,
};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use shared::status::Ambiente;

use crate::util::{id_of, TestApp};

const JUSTIFICATIVA: &str = "Pedido cancelado pelo cliente";

/// Company, configuration, a valid certificate, one customer and one product.
struct Fixture {
    config: i32,
    customer: i32,
    product: i32,
}

async fn setup(app: &TestApp, with_certificate: bool) -> Fixture {
    let token = &app.admin;
    let (status, _) = app
        .post(
            "/api/company",
            token,
            json!({ "name": "CustoSmart Indústria", "taxId": "11222333000181" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, config) = app.post("/api/fiscal/config", token, json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{config}");
    let config = id_of(&config);

    if with_certificate {
        let (status, cert) = app
            .post(
                "/api/fiscal/certificates",
                token,
                json!({
                    "name": "A1 CustoSmart",
                    "serialNumber": "00AB12",
                    "validFrom": "2024-01-01",
                    "validTo": "2099-12-31",
                    "certificateData": "MIIB",
                    "password": "pfx-secret",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{cert}");
        let (status, _) = app
            .put(
                &format!("/api/fiscal/config/{config}"),
                token,
                json!({ "certificadoId": id_of(&cert) }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, customer) = app
        .post(
            "/api/customers",
            token,
            json!({ "name": "Cliente Exemplo", "taxId": "529.982.247-25", "uf": "sp" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{customer}");

    let (status, product) = app
        .post(
            "/api/products",
            token,
            json!({ "name": "Painel elétrico", "code": "PE-01", "ncm": "8537.10.90", "sellingPrice": 100.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");

    Fixture { config, customer: id_of(&customer), product: id_of(&product) }
}

async fn draft(app: &TestApp, fixture: &Fixture) -> Value {
    let (status, nfe) = app
        .post(
            "/api/fiscal/nfe",
            &app.admin,
            json!({ "naturezaOperacao": "Venda de produção", "destinatarioId": fixture.customer }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{nfe}");
    nfe
}

async fn add_item(app: &TestApp, nfe: i32, fixture: &Fixture) -> (StatusCode, Value) {
    app.post(
        &format!("/api/fiscal/nfe/{nfe}/item"),
        &app.admin,
        json!({ "produtoId": fixture.product, "cfop": "5102", "quantidade": 2.0 }),
    )
    .await
}

enum Scripted {
    Down,
    Reject,
}

/// Plays the scripted answers to `authorize` first, then behaves like the
/// simulator.
struct ScriptedSefaz {
    script: Mutex<VecDeque<Scripted>>,
    inner: SimulatedSefaz,
}

impl ScriptedSefaz {
    fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(ScriptedSefaz { script: Mutex::new(script.into()), inner: SimulatedSefaz::new() })
    }
}

impl SefazGateway for ScriptedSefaz {
    fn authorize(&self, submission: Submission) -> BoxFuture<'_, SefazResult> {
        Box::pin(async move {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Down) => Err(SefazError::Unavailable("connection reset".into())),
                Some(Scripted::Reject) => Ok(SefazResponse {
                    status_code: 225,
                    message: "Rejeição: Falha no Schema XML da NFe".into(),
                    protocol: None,
                    received_at: Utc::now(),
                    xml: "<retorno><cStat>225</cStat></retorno>".into(),
                }),
                None => self.inner.authorize(submission).await,
            }
        })
    }

    fn consult(&self, ambiente: Ambiente, chave: String) -> BoxFuture<'_, SefazResult> {
        self.inner.consult(ambiente, chave)
    }

    fn cancel(&self, request: CancelRequest) -> BoxFuture<'_, SefazResult> {
        self.inner.cancel(request)
    }

    fn inutilizar(&self, request: VoidRequest) -> BoxFuture<'_, SefazResult> {
        self.inner.inutilizar(request)
    }

    fn status_servico(&self, ambiente: Ambiente, uf: String) -> BoxFuture<'_, SefazResult> {
        self.inner.status_servico(ambiente, uf)
    }
}

#[tokio::test]
async fn config_defaults_and_singleton() {
    let app = TestApp::new().await;
    let (status, empty) = app.get("/api/fiscal/config", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty, json!({}));

    let (status, config) = app.post("/api/fiscal/config", &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(config["ambiente"], "homologacao");
    assert_eq!(config["serieNfe"], 1);
    assert_eq!(config["proximoNumeroNfe"], 1);
    assert_eq!(config["regimeTributario"], "simples");
    assert_eq!(config["ufEmissor"], "MG");

    let (status, _) = app.post("/api/fiscal/config", &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .put(&format!("/api/fiscal/config/{}", id_of(&config)), &app.admin, json!({ "ufEmissor": "XX" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fiscal_routes_need_the_fiscal_permission() {
    let app = TestApp::new().await;
    let (_, token) = app.user("rh", json!({ "hr": true })).await;
    let (status, _) = app.get("/api/fiscal/nfe", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/customers", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn certificate_secrets_are_never_returned() {
    let app = TestApp::new().await;
    let (status, cert) = app
        .post(
            "/api/fiscal/certificates",
            &app.admin,
            json!({
                "name": "A1",
                "serialNumber": "01",
                "validFrom": "2024-01-01",
                "validTo": "2025-01-01",
                "certificateData": "MIIB",
                "password": "secret",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(cert.get("password").is_none());
    assert!(cert.get("certificateData").is_none());

    let (status, _) = app
        .post(
            "/api/fiscal/certificates",
            &app.admin,
            json!({
                "name": "A1",
                "serialNumber": "02",
                "validFrom": "2025-01-01",
                "validTo": "2024-01-01",
                "certificateData": "MIIB",
                "password": "secret",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn nfe_needs_an_issuer_cnpj() {
    let app = TestApp::new().await;
    app.post("/api/company", &app.admin, json!({ "name": "Sem CNPJ" })).await;
    app.post("/api/fiscal/config", &app.admin, json!({})).await;
    let (_, customer) = app.post("/api/customers", &app.admin, json!({ "name": "Cliente" })).await;
    let (status, _) = app
        .post(
            "/api/fiscal/nfe",
            &app.admin,
            json!({ "naturezaOperacao": "Venda", "destinatarioId": id_of(&customer) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn drafts_take_consecutive_numbers() {
    let app = TestApp::new().await;
    let fixture = setup(&app, false).await;
    let first = draft(&app, &fixture).await;
    let second = draft(&app, &fixture).await;
    assert_eq!(first["status"], "em_digitacao");
    assert_eq!(first["numero"], 1);
    assert_eq!(second["numero"], 2);
    assert_eq!(first["chave"].as_str().unwrap().len(), 44);
    assert_ne!(first["chave"], second["chave"]);

    let (_, config) = app.get("/api/fiscal/config", &app.admin).await;
    assert_eq!(config["id"], fixture.config);
    assert_eq!(config["proximoNumeroNfe"], 3);

    let (status, page) = app.get("/api/fiscal/nfe?status=em_digitacao", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
}

#[tokio::test]
async fn items_roll_up_into_the_document() {
    let app = TestApp::new().await;
    let fixture = setup(&app, false).await;
    let nfe = id_of(&draft(&app, &fixture).await);

    let (status, body) = add_item(&app, nfe, &fixture).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["item"]["ncm"], "85371090");
    assert_eq!(body["item"]["valorUnitario"], 100.0);
    assert_eq!(body["nfe"]["valorProdutos"], 200.0);

    let (status, _) = app
        .post(
            &format!("/api/fiscal/nfe/{nfe}/item"),
            &app.admin,
            json!({ "produtoId": fixture.product, "cfop": "9102", "quantidade": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("/api/fiscal/nfe/{nfe}/item"),
            &app.admin,
            json!({ "produtoId": fixture.product, "cfop": "5102", "quantidade": 0.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, detail) = app.get(&format!("/api/fiscal/nfe/{nfe}"), &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["itens"].as_array().unwrap().len(), 1);
    assert_eq!(detail["destinatario"]["name"], "Cliente Exemplo");
}

#[tokio::test]
async fn sending_requires_items_and_a_certificate() {
    let app = TestApp::new().await;
    let fixture = setup(&app, false).await;
    let nfe = id_of(&draft(&app, &fixture).await);

    let (status, _) = app.post(&format!("/api/fiscal/nfe/{nfe}/send"), &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    add_item(&app, nfe, &fixture).await;
    let (status, body) = app.post(&format!("/api/fiscal/nfe/{nfe}/send"), &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("certificate"));
}

#[tokio::test]
async fn authorize_then_cancel() {
    let app = TestApp::new().await;
    let fixture = setup(&app, true).await;
    let nfe = id_of(&draft(&app, &fixture).await);
    add_item(&app, nfe, &fixture).await;

    let (status, sent) = app.post(&format!("/api/fiscal/nfe/{nfe}/send"), &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{sent}");
    assert_eq!(sent["sefaz"]["statusCode"], 100);
    assert_eq!(sent["nfe"]["status"], "autorizada");
    assert_eq!(sent["nfe"]["protocolo"], sent["sefaz"]["protocol"]);

    // Authorized documents are frozen.
    let (status, _) = app
        .patch(&format!("/api/fiscal/nfe/{nfe}"), &app.admin, json!({ "valorFrete": 10.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = add_item(&app, nfe, &fixture).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, consulted) = app.get(&format!("/api/fiscal/nfe/{nfe}/consult"), &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(consulted["statusCode"], 100);

    let cancel = format!("/api/fiscal/nfe/{nfe}/cancel");
    let (status, _) = app.post(&cancel, &app.admin, json!({ "justificativa": "curta" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, cancelled) = app.post(&cancel, &app.admin, json!({ "justificativa": JUSTIFICATIVA })).await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");
    assert_eq!(cancelled["sefaz"]["statusCode"], 135);
    assert_eq!(cancelled["nfe"]["status"], "cancelada");
    assert_eq!(cancelled["nfe"]["motivoCancelamento"], JUSTIFICATIVA);

    let (status, _) = app.post(&cancel, &app.admin, json!({ "justificativa": JUSTIFICATIVA })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, detail) = app.get(&format!("/api/fiscal/nfe/{nfe}"), &app.admin).await;
    let kinds: Vec<&str> = detail["eventos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["tipo"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.len(), 3);
}

#[tokio::test]
async fn xml_is_served_for_drafts() {
    let app = TestApp::new().await;
    let fixture = setup(&app, false).await;
    let nfe = id_of(&draft(&app, &fixture).await);
    add_item(&app, nfe, &fixture).await;

    let response = app
        .raw(
            Request::get(format!("/api/fiscal/nfe/{nfe}/xml"))
                .header(header::AUTHORIZATION, format!("Bearer {}", app.admin))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
    let (_, body) = crate::util::read_json(response).await;
    let text = body.as_str().unwrap();
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<det nItem=\"1\">"));
}

#[tokio::test]
async fn voiding_numbers_and_service_status() {
    let app = TestApp::new().await;
    setup(&app, false).await;

    let (status, _) = app
        .post(
            "/api/fiscal/inutilizar",
            &app.admin,
            json!({ "serie": 1, "numeroInicial": 10, "numeroFinal": 5, "justificativa": JUSTIFICATIVA }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, voided) = app
        .post(
            "/api/fiscal/inutilizar",
            &app.admin,
            json!({ "serie": 1, "numeroInicial": 5, "numeroFinal": 10, "justificativa": JUSTIFICATIVA }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{voided}");
    assert_eq!(voided["statusCode"], 102);

    let (status, service) = app.get("/api/fiscal/status-servico", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(service["statusCode"], 107);

    let (status, _) = app.get("/api/fiscal/status-servico?uf=ZZ", &app.admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn products_on_invoices_cannot_be_deleted() {
    let app = TestApp::new().await;
    let fixture = setup(&app, false).await;
    let nfe = id_of(&draft(&app, &fixture).await);
    add_item(&app, nfe, &fixture).await;
    let status = app.delete(&format!("/api/products/{}", fixture.product), &app.admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gateway_failure_leaves_the_draft_sendable() {
    let app = TestApp::with_gateway(ScriptedSefaz::new(vec![Scripted::Down])).await;
    let fixture = setup(&app, true).await;
    let nfe = id_of(&draft(&app, &fixture).await);
    add_item(&app, nfe, &fixture).await;
    let send = format!("/api/fiscal/nfe/{nfe}/send");

    let (status, _) = app.post(&send, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, detail) = app.get(&format!("/api/fiscal/nfe/{nfe}"), &app.admin).await;
    assert_eq!(detail["status"], "em_digitacao");
    assert!(detail["xmlEnvio"].is_null());
    let (status, _) = app
        .patch(&format!("/api/fiscal/nfe/{nfe}"), &app.admin, json!({ "valorFrete": 10.0 }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, sent) = app.post(&send, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{sent}");
    assert_eq!(sent["nfe"]["status"], "autorizada");
}

#[tokio::test]
async fn rejected_documents_can_be_sent_again() {
    let app = TestApp::with_gateway(ScriptedSefaz::new(vec![Scripted::Reject])).await;
    let fixture = setup(&app, true).await;
    let nfe = id_of(&draft(&app, &fixture).await);
    add_item(&app, nfe, &fixture).await;
    let send = format!("/api/fiscal/nfe/{nfe}/send");

    let (status, rejected) = app.post(&send, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{rejected}");
    assert_eq!(rejected["sefaz"]["statusCode"], 225);
    assert_eq!(rejected["nfe"]["status"], "rejeitada");
    assert!(rejected["nfe"]["protocolo"].is_null());
    assert!(rejected["nfe"]["xmlEnvio"].as_str().unwrap().starts_with("<?xml"));

    let (status, sent) = app.post(&send, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{sent}");
    assert_eq!(sent["nfe"]["status"], "autorizada");
    assert!(sent["nfe"]["protocolo"].is_string());

    let (status, _) = app.post(&send, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, detail) = app.get(&format!("/api/fiscal/nfe/{nfe}"), &app.admin).await;
    assert_eq!(detail["eventos"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn changing_the_ncm_brings_its_ipi_rate() {
    let app = TestApp::new().await;
    let fixture = setup(&app, false).await;
    let (status, _) = app
        .put(
            &format!("/api/fiscal/config/{}", fixture.config),
            &app.admin,
            json!({ "regimeTributario": "real" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post(
            "/api/fiscal/ncms",
            &app.admin,
            json!({ "code": "8471.30.12", "description": "Computadores portáteis", "aliquotaNacional": 15.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let nfe = id_of(&draft(&app, &fixture).await);
    let (_, body) = add_item(&app, nfe, &fixture).await;
    assert_eq!(body["item"]["aliquotaIpi"], 0.0);
    let item_uri = format!("/api/fiscal/nfe/item/{}", body["item"]["id"]);

    let (status, body) = app.patch(&item_uri, &app.admin, json!({ "ncm": "8471.30.12" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["item"]["ncm"], "84713012");
    assert_eq!(body["item"]["aliquotaIpi"], 15.0);
    assert_eq!(body["item"]["valorIpi"], 30.0);

    let (_, body) = app.patch(&item_uri, &app.admin, json!({ "aliquotaIpi": 5.0 })).await;
    assert_eq!(body["item"]["aliquotaIpi"], 5.0);
    let (_, body) = app.patch(&item_uri, &app.admin, json!({ "quantidade": 1.0 })).await;
    assert_eq!(body["item"]["aliquotaIpi"], 5.0);
}

#[tokio::test]
async fn issuers_of_invoices_cannot_be_deleted() {
    let app = TestApp::new().await;
    let fixture = setup(&app, false).await;
    let (clerk, token) = app.user("faturista", json!({ "fiscal": true })).await;
    let (status, _) = app
        .post(
            "/api/fiscal/nfe",
            &token,
            json!({ "naturezaOperacao": "Venda de produção", "destinatarioId": fixture.customer }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let status = app.delete(&format!("/api/users/{clerk}"), &app.admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, users) = app.get("/api/users", &app.admin).await;
    assert!(users.as_array().unwrap().iter().any(|u| u["id"] == clerk));
}

#[tokio::test]
async fn product_profiles_fill_in_item_defaults() {
    let app = TestApp::new().await;
    let fixture = setup(&app, false).await;
    let uri = format!("/api/fiscal/produtos/{}", fixture.product);
    let (status, _) = app.get(&uri, &app.admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let profile = json!({
        "produtoId": fixture.product,
        "ncm": "8471.30.12",
        "cfopPadrao": "5.102",
        "cstIcms": "00",
        "aliquotaIcms": 7.0,
    });
    let (status, created) = app.post("/api/fiscal/produtos", &app.admin, profile.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["ncm"], "84713012");
    assert_eq!(created["cfopPadrao"], "5102");
    let (status, _) = app.post("/api/fiscal/produtos", &app.admin, profile).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let nfe = id_of(&draft(&app, &fixture).await);
    let (status, body) = app
        .post(
            &format!("/api/fiscal/nfe/{nfe}/item"),
            &app.admin,
            json!({ "produtoId": fixture.product, "quantidade": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["item"]["ncm"], "84713012");
    assert_eq!(body["item"]["cfop"], "5102");
    assert_eq!(body["item"]["cstIcms"], "00");
    assert_eq!(body["item"]["aliquotaIcms"], 7.0);
    assert_eq!(body["item"]["valorIcms"], 7.0);

    let (status, _) = app.put(&uri, &app.admin, json!({ "ncm": "123" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, updated) = app.put(&uri, &app.admin, json!({ "aliquotaIcms": 12.0 })).await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["aliquotaIcms"], 12.0);
    assert_ne!(updated["updatedAt"], created["updatedAt"]);

    let (_, all) = app.get("/api/fiscal/produtos", &app.admin).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}
