use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::fiscal_certificates)]
#[serde(rename_all = "camelCase")]
pub struct FiscalCertificateData {
    pub name: String,
    pub serial_number: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    /// Base64 PKCS#12 blob.
    #[serde(skip_serializing)]
    pub certificate_data: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default = "defaults::yes")]
    pub is_active: bool,
    pub created_by: Option<i32>,
}

record! {
    FiscalCertificate(FiscalCertificateData) in fiscal_certificates as "certificate";
    FiscalCertificateChanges {
        name: String,
        serial_number: String,
        valid_from: NaiveDate,
        valid_to: NaiveDate,
        certificate_data: String,
        password: String,
        is_active: bool,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::fiscal_ncms)]
#[serde(rename_all = "camelCase")]
pub struct FiscalNcmData {
    pub code: String,
    pub description: String,
    pub aliquota_nacional: Option<f64>,
    pub aliquota_importado: Option<f64>,
}

record! {
    FiscalNcm(FiscalNcmData) in fiscal_ncms as "NCM";
    FiscalNcmChanges {
        code: String,
        description: String,
        aliquota_nacional: f64,
        aliquota_importado: f64,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::fiscal_cfops)]
#[serde(rename_all = "camelCase")]
pub struct FiscalCfopData {
    pub code: String,
    pub description: String,
    pub tipo: String,
    pub operacao: String,
}

record! {
    FiscalCfop(FiscalCfopData) in fiscal_cfops as "CFOP";
    FiscalCfopChanges {
        code: String,
        description: String,
        tipo: String,
        operacao: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::fiscal_csts)]
#[serde(rename_all = "camelCase")]
pub struct FiscalCstData {
    pub code: String,
    pub description: String,
    pub tipo: String,
}

record! {
    FiscalCst(FiscalCstData) in fiscal_csts as "CST";
    FiscalCstChanges {
        code: String,
        description: String,
        tipo: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::fiscal_configs)]
#[serde(rename_all = "camelCase")]
pub struct FiscalConfigData {
    #[serde(default = "defaults::homologacao")]
    pub ambiente: String,
    #[serde(default = "defaults::one_i32")]
    pub serie_nfe: i32,
    #[serde(default = "defaults::one_i32")]
    pub proximo_numero_nfe: i32,
    #[serde(default = "defaults::simples")]
    pub regime_tributario: String,
    pub inscricao_estadual: Option<String>,
    pub inscricao_municipal: Option<String>,
    pub cnae: Option<String>,
    pub certificado_id: Option<i32>,
    #[serde(default = "defaults::uf_mg")]
    pub uf_emissor: String,
}

record! {
    FiscalConfig(FiscalConfigData) in fiscal_configs as "fiscal config";
    FiscalConfigChanges {
        ambiente: String,
        serie_nfe: i32,
        proximo_numero_nfe: i32,
        regime_tributario: String,
        inscricao_estadual: String,
        inscricao_municipal: String,
        cnae: String,
        certificado_id: i32,
        uf_emissor: String,
    }
}

/// Per-product defaults for NF-e items. At most one per product.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::produtos_fiscais)]
#[serde(rename_all = "camelCase")]
pub struct ProdutoFiscalData {
    pub produto_id: i32,
    pub ncm: String,
    pub cfop_padrao: Option<String>,
    pub cst_icms: Option<String>,
    pub aliquota_icms: Option<f64>,
    pub cst_pis: Option<String>,
    pub aliquota_pis: Option<f64>,
    pub cst_cofins: Option<String>,
    pub aliquota_cofins: Option<f64>,
    pub cst_ipi: Option<String>,
    pub aliquota_ipi: Option<f64>,
    pub codigo_barras: Option<String>,
    pub codigo_anp: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

record! {
    ProdutoFiscal(ProdutoFiscalData) in produtos_fiscais as "fiscal product";
    ProdutoFiscalChanges {
        ncm: String,
        cfop_padrao: String,
        cst_icms: String,
        aliquota_icms: f64,
        cst_pis: String,
        aliquota_pis: f64,
        cst_cofins: String,
        aliquota_cofins: f64,
        cst_ipi: String,
        aliquota_ipi: f64,
        codigo_barras: String,
        codigo_anp: String,
        updated_at: DateTime<Utc>,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::customers)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    pub name: String,
    pub tax_id: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub postal_code: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    Customer(CustomerData) in customers as "customer";
    CustomerChanges {
        name: String,
        tax_id: String,
        contact_name: String,
        email: String,
        phone: String,
        address: String,
        city: String,
        uf: String,
        postal_code: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::nfes)]
#[serde(rename_all = "camelCase")]
pub struct NfeData {
    #[serde(default)]
    pub numero: i32,
    #[serde(default)]
    pub serie: i32,
    #[serde(default)]
    pub chave: String,
    #[serde(default)]
    pub data_emissao: DateTime<Utc>,
    #[serde(default = "defaults::nfe_draft")]
    pub status: String,
    #[serde(default = "defaults::nfe_model")]
    pub modelo_documento: String,
    pub natureza_operacao: String,
    #[serde(default = "defaults::code_one")]
    pub tipo_operacao: String,
    #[serde(default = "defaults::code_one")]
    pub finalidade: String,
    pub destinatario_id: i32,
    #[serde(default)]
    pub valor_total: f64,
    #[serde(default)]
    pub valor_produtos: f64,
    #[serde(default)]
    pub valor_frete: f64,
    #[serde(default)]
    pub valor_seguro: f64,
    #[serde(default)]
    pub valor_desconto: f64,
    #[serde(default)]
    pub valor_outras_despesas: f64,
    #[serde(default)]
    pub valor_icms: f64,
    #[serde(default)]
    pub valor_icms_st: f64,
    #[serde(default)]
    pub valor_ipi: f64,
    #[serde(default)]
    pub valor_pis: f64,
    #[serde(default)]
    pub valor_cofins: f64,
    pub informacoes_adicionais: Option<String>,
    pub protocolo: Option<String>,
    pub xml_envio: Option<String>,
    pub xml_retorno: Option<String>,
    pub xml_cancelamento: Option<String>,
    pub motivo_cancelamento: Option<String>,
    pub data_cancelamento: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: i32,
}

record! {
    Nfe(NfeData) in nfes as "NF-e";
    NfeChanges {
        status: String,
        natureza_operacao: String,
        tipo_operacao: String,
        finalidade: String,
        destinatario_id: i32,
        valor_total: f64,
        valor_produtos: f64,
        valor_frete: f64,
        valor_seguro: f64,
        valor_desconto: f64,
        valor_outras_despesas: f64,
        valor_icms: f64,
        valor_icms_st: f64,
        valor_ipi: f64,
        valor_pis: f64,
        valor_cofins: f64,
        informacoes_adicionais: String,
        protocolo: String,
        xml_envio: String,
        xml_retorno: String,
        xml_cancelamento: String,
        motivo_cancelamento: String,
        data_cancelamento: DateTime<Utc>,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::nfe_itens)]
#[serde(rename_all = "camelCase")]
pub struct NfeItemData {
    #[serde(default)]
    pub nfe_id: i32,
    pub produto_id: i32,
    pub codigo: String,
    pub descricao: String,
    pub ncm: String,
    pub cfop: String,
    pub unidade: String,
    pub quantidade: f64,
    pub valor_unitario: f64,
    #[serde(default)]
    pub valor_total: f64,
    #[serde(default)]
    pub valor_desconto: f64,
    pub cst_icms: Option<String>,
    #[serde(default)]
    pub base_calculo_icms: f64,
    #[serde(default)]
    pub aliquota_icms: f64,
    #[serde(default)]
    pub valor_icms: f64,
    pub cst_pis: Option<String>,
    #[serde(default)]
    pub base_calculo_pis: f64,
    #[serde(default)]
    pub aliquota_pis: f64,
    #[serde(default)]
    pub valor_pis: f64,
    pub cst_cofins: Option<String>,
    #[serde(default)]
    pub base_calculo_cofins: f64,
    #[serde(default)]
    pub aliquota_cofins: f64,
    #[serde(default)]
    pub valor_cofins: f64,
    pub cst_ipi: Option<String>,
    #[serde(default)]
    pub base_calculo_ipi: f64,
    #[serde(default)]
    pub aliquota_ipi: f64,
    #[serde(default)]
    pub valor_ipi: f64,
    pub informacoes_adicionais: Option<String>,
}

record! {
    NfeItem(NfeItemData) in nfe_itens as "NF-e item";
    NfeItemChanges {
        produto_id: i32,
        codigo: String,
        descricao: String,
        ncm: String,
        cfop: String,
        unidade: String,
        quantidade: f64,
        valor_unitario: f64,
        valor_total: f64,
        valor_desconto: f64,
        cst_icms: String,
        base_calculo_icms: f64,
        aliquota_icms: f64,
        valor_icms: f64,
        cst_pis: String,
        base_calculo_pis: f64,
        aliquota_pis: f64,
        valor_pis: f64,
        cst_cofins: String,
        base_calculo_cofins: f64,
        aliquota_cofins: f64,
        valor_cofins: f64,
        cst_ipi: String,
        base_calculo_ipi: f64,
        aliquota_ipi: f64,
        valor_ipi: f64,
        informacoes_adicionais: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::nfe_eventos)]
#[serde(rename_all = "camelCase")]
pub struct NfeEventoData {
    pub nfe_id: i32,
    pub tipo: String,
    pub status: String,
    pub mensagem: Option<String>,
    pub protocolo: Option<String>,
    pub xml: Option<String>,
    pub data_evento: DateTime<Utc>,
}

record! {
    NfeEvento(NfeEventoData) in nfe_eventos as "NF-e event";
}
