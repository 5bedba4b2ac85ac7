//! The SEFAZ web service boundary.
//!
//! Handlers build the XML and talk to a `SefazGateway`. The shipped
//! `SimulatedSefaz` answers the way the homologation environment does for
//! well-formed requests, without any network traffic.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use rand::Rng;
use serde::Serialize;
use shared::documents::is_valid_access_key;
use shared::status::Ambiente;
use thiserror::Error;
use tracing::info;

pub mod xml;

/// `cStat` values the service reports.
pub mod codes {
    pub const AUTHORIZED: u16 = 100;
    pub const CANCELLED: u16 = 101;
    pub const VOIDED: u16 = 102;
    pub const IN_OPERATION: u16 = 107;
    pub const EVENT_REGISTERED: u16 = 135;
    pub const NOT_FOUND: u16 = 217;
    pub const ALREADY_CANCELLED: u16 = 218;
    pub const SCHEMA_FAILURE: u16 = 225;
    pub const BAD_CHECK_DIGIT: u16 = 236;
}

#[derive(Debug, Error)]
pub enum SefazError {
    #[error("SEFAZ unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SefazResponse {
    pub status_code: u16,
    pub message: String,
    pub protocol: Option<String>,
    pub received_at: DateTime<Utc>,
    /// Raw reply, stored as `xml_retorno` or on the event.
    pub xml: String,
}

impl SefazResponse {
    fn new(status_code: u16, message: &str, protocol: Option<String>) -> Self {
        let received_at = Utc::now();
        let xml = format!(
            "<retorno><cStat>{status_code}</cStat><xMotivo>{}</xMotivo>{}<dhRecbto>{}</dhRecbto></retorno>",
            xml::escape(message),
            protocol.as_deref().map(|p| format!("<nProt>{p}</nProt>")).unwrap_or_default(),
            received_at.to_rfc3339(),
        );
        SefazResponse { status_code, message: message.to_string(), protocol, received_at, xml }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.status_code,
            codes::AUTHORIZED
                | codes::CANCELLED
                | codes::VOIDED
                | codes::IN_OPERATION
                | codes::EVENT_REGISTERED
        )
    }
}

pub type SefazResult = Result<SefazResponse, SefazError>;

#[derive(Debug, Clone)]
pub struct Submission {
    pub ambiente: Ambiente,
    pub chave: String,
    pub xml: String,
}

#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub ambiente: Ambiente,
    pub chave: String,
    pub xml: String,
}

#[derive(Debug, Clone)]
pub struct VoidRequest {
    pub ambiente: Ambiente,
    pub xml: String,
}

pub trait SefazGateway: Send + Sync {
    fn authorize(&self, submission: Submission) -> BoxFuture<'_, SefazResult>;
    fn consult(&self, ambiente: Ambiente, chave: String) -> BoxFuture<'_, SefazResult>;
    fn cancel(&self, request: CancelRequest) -> BoxFuture<'_, SefazResult>;
    fn inutilizar(&self, request: VoidRequest) -> BoxFuture<'_, SefazResult>;
    fn status_servico(&self, ambiente: Ambiente, uf: String) -> BoxFuture<'_, SefazResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Situation {
    Authorized,
    Cancelled,
}

/// Remembers what it authorized so consults and cancels stay consistent.
#[derive(Default)]
pub struct SimulatedSefaz {
    documents: Mutex<HashMap<String, (Situation, String)>>,
}

impl SimulatedSefaz {
    pub fn new() -> Self {
        Self::default()
    }

    fn protocol() -> String {
        rand::thread_rng()
            .gen_range(100_000_000_000_000u64..=999_999_999_999_999)
            .to_string()
    }

    fn with_documents<T>(&self, f: impl FnOnce(&mut HashMap<String, (Situation, String)>) -> T) -> T {
        let mut documents = self.documents.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut documents)
    }
}

impl SefazGateway for SimulatedSefaz {
    fn authorize(&self, submission: Submission) -> BoxFuture<'_, SefazResult> {
        Box::pin(async move {
            if !is_valid_access_key(&submission.chave) {
                return Ok(SefazResponse::new(
                    codes::BAD_CHECK_DIGIT,
                    "Rejeição: Chave de Acesso com dígito verificador inválido",
                    None,
                ));
            }
            if !submission.xml.contains("<det ") {
                return Ok(SefazResponse::new(
                    codes::SCHEMA_FAILURE,
                    "Rejeição: Falha no Schema XML da NFe",
                    None,
                ));
            }
            let protocol = Self::protocol();
            self.with_documents(|docs| {
                docs.insert(submission.chave.clone(), (Situation::Authorized, protocol.clone()))
            });
            info!(chave = %submission.chave, ambiente = %submission.ambiente, "NF-e authorized");
            Ok(SefazResponse::new(codes::AUTHORIZED, "Autorizado o uso da NF-e", Some(protocol)))
        })
    }

    fn consult(&self, _ambiente: Ambiente, chave: String) -> BoxFuture<'_, SefazResult> {
        Box::pin(async move {
            if !is_valid_access_key(&chave) {
                return Ok(SefazResponse::new(
                    codes::BAD_CHECK_DIGIT,
                    "Rejeição: Chave de Acesso com dígito verificador inválido",
                    None,
                ));
            }
            let known = self.with_documents(|docs| docs.get(&chave).cloned());
            Ok(match known {
                Some((Situation::Authorized, protocol)) => {
                    SefazResponse::new(codes::AUTHORIZED, "Autorizado o uso da NF-e", Some(protocol))
                }
                Some((Situation::Cancelled, protocol)) => SefazResponse::new(
                    codes::CANCELLED,
                    "Cancelamento de NF-e homologado",
                    Some(protocol),
                ),
                None => SefazResponse::new(
                    codes::NOT_FOUND,
                    "Rejeição: NF-e não consta na base de dados da SEFAZ",
                    None,
                ),
            })
        })
    }

    fn cancel(&self, request: CancelRequest) -> BoxFuture<'_, SefazResult> {
        Box::pin(async move {
            let protocol = Self::protocol();
            let already = self.with_documents(|docs| {
                match docs.get(&request.chave) {
                    Some((Situation::Cancelled, _)) => true,
                    _ => {
                        docs.insert(request.chave.clone(), (Situation::Cancelled, protocol.clone()));
                        false
                    }
                }
            });
            if already {
                return Ok(SefazResponse::new(
                    codes::ALREADY_CANCELLED,
                    "Rejeição: NF-e já está cancelada na base de dados da SEFAZ",
                    None,
                ));
            }
            info!(chave = %request.chave, ambiente = %request.ambiente, "NF-e cancelled");
            Ok(SefazResponse::new(
                codes::EVENT_REGISTERED,
                "Evento registrado e vinculado a NF-e",
                Some(protocol),
            ))
        })
    }

    fn inutilizar(&self, request: VoidRequest) -> BoxFuture<'_, SefazResult> {
        Box::pin(async move {
            if !request.xml.contains("<inutNFe") {
                return Ok(SefazResponse::new(
                    codes::SCHEMA_FAILURE,
                    "Rejeição: Falha no Schema XML",
                    None,
                ));
            }
            Ok(SefazResponse::new(
                codes::VOIDED,
                "Inutilização de número homologado",
                Some(Self::protocol()),
            ))
        })
    }

    fn status_servico(&self, _ambiente: Ambiente, _uf: String) -> BoxFuture<'_, SefazResult> {
        Box::pin(async move { Ok(SefazResponse::new(codes::IN_OPERATION, "Serviço em Operação", None)) })
    }
}
