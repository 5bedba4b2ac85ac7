//! NF-e layout 4.00 documents as sent to SEFAZ, unsigned.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use shared::documents::only_digits;

use crate::models::{Company, Customer, FiscalConfig, Nfe, NfeItem};

pub const NAMESPACE: &str = "http://www.portalfiscal.inf.br/nfe";
pub const VERSION: &str = "4.00";
pub const CANCEL_EVENT: &str = "110111";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn quantity(value: f64) -> String {
    format!("{value:.4}")
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Writes `<tag>escaped</tag>`, skipping empty values.
fn tag(out: &mut String, name: &str, value: &str) {
    if !value.is_empty() {
        let _ = write!(out, "<{name}>{}</{name}>", escape(value));
    }
}

/// Everything the document pulls from outside the `nfes` row.
pub struct NfeContext<'a> {
    pub nfe: &'a Nfe,
    pub items: &'a [NfeItem],
    pub issuer: &'a Company,
    pub config: &'a FiscalConfig,
    pub recipient: &'a Customer,
    pub uf_code: u8,
    pub ambiente: u8,
}

fn recipient_id(tax_id: &str) -> (&'static str, String) {
    let digits = only_digits(tax_id);
    if digits.len() == 11 {
        ("CPF", digits)
    } else {
        ("CNPJ", digits)
    }
}

fn item_xml(out: &mut String, index: usize, item: &NfeItem) {
    let d = &item.data;
    let _ = write!(out, "<det nItem=\"{}\"><prod>", index + 1);
    tag(out, "cProd", &d.codigo);
    tag(out, "xProd", &d.descricao);
    tag(out, "NCM", &d.ncm);
    tag(out, "CFOP", &d.cfop);
    tag(out, "uCom", &d.unidade);
    tag(out, "qCom", &quantity(d.quantidade));
    tag(out, "vUnCom", &format!("{:.10}", d.valor_unitario));
    tag(out, "vProd", &money(d.quantidade * d.valor_unitario));
    if d.valor_desconto > 0.0 {
        tag(out, "vDesc", &money(d.valor_desconto));
    }
    out.push_str("<indTot>1</indTot></prod><imposto>");

    let _ = write!(out, "<ICMS><ICMS00><orig>0</orig>");
    tag(out, "CST", d.cst_icms.as_deref().unwrap_or("00"));
    tag(out, "vBC", &money(d.base_calculo_icms));
    tag(out, "pICMS", &money(d.aliquota_icms));
    tag(out, "vICMS", &money(d.valor_icms));
    out.push_str("</ICMS00></ICMS>");

    out.push_str("<IPI><cEnq>999</cEnq><IPITrib>");
    tag(out, "CST", d.cst_ipi.as_deref().unwrap_or("50"));
    tag(out, "vBC", &money(d.base_calculo_ipi));
    tag(out, "pIPI", &money(d.aliquota_ipi));
    tag(out, "vIPI", &money(d.valor_ipi));
    out.push_str("</IPITrib></IPI>");

    out.push_str("<PIS><PISAliq>");
    tag(out, "CST", d.cst_pis.as_deref().unwrap_or("01"));
    tag(out, "vBC", &money(d.base_calculo_pis));
    tag(out, "pPIS", &money(d.aliquota_pis));
    tag(out, "vPIS", &money(d.valor_pis));
    out.push_str("</PISAliq></PIS>");

    out.push_str("<COFINS><COFINSAliq>");
    tag(out, "CST", d.cst_cofins.as_deref().unwrap_or("01"));
    tag(out, "vBC", &money(d.base_calculo_cofins));
    tag(out, "pCOFINS", &money(d.aliquota_cofins));
    tag(out, "vCOFINS", &money(d.valor_cofins));
    out.push_str("</COFINSAliq></COFINS>");

    out.push_str("</imposto>");
    if let Some(info) = &d.informacoes_adicionais {
        tag(out, "infAdProd", info);
    }
    out.push_str("</det>");
}

pub fn nfe_document(ctx: &NfeContext<'_>) -> String {
    let n = &ctx.nfe.data;
    let issuer = &ctx.issuer.data;
    let recipient = &ctx.recipient.data;
    // cNF and cDV are the 8 digits after the series/number block and the last digit
    let numeric_code = n.chave.get(35..43).unwrap_or("00000000");
    let check_digit = n.chave.get(43..44).unwrap_or("0");

    let mut out = String::new();
    let _ = write!(
        out,
        "<NFe xmlns=\"{NAMESPACE}\"><infNFe versao=\"{VERSION}\" Id=\"NFe{}\"><ide>",
        n.chave
    );
    tag(&mut out, "cUF", &ctx.uf_code.to_string());
    tag(&mut out, "cNF", numeric_code);
    tag(&mut out, "natOp", &n.natureza_operacao);
    tag(&mut out, "mod", &n.modelo_documento);
    tag(&mut out, "serie", &n.serie.to_string());
    tag(&mut out, "nNF", &n.numero.to_string());
    tag(&mut out, "dhEmi", &timestamp(n.data_emissao));
    tag(&mut out, "tpNF", &n.tipo_operacao);
    tag(&mut out, "tpImp", "1");
    tag(&mut out, "tpEmis", "1");
    tag(&mut out, "cDV", check_digit);
    tag(&mut out, "tpAmb", &ctx.ambiente.to_string());
    tag(&mut out, "finNFe", &n.finalidade);
    out.push_str("</ide><emit>");

    tag(&mut out, "CNPJ", &only_digits(issuer.tax_id.as_deref().unwrap_or_default()));
    tag(&mut out, "xNome", &issuer.name);
    out.push_str("<enderEmit>");
    tag(&mut out, "xLgr", issuer.address.as_deref().unwrap_or_default());
    tag(&mut out, "UF", &ctx.config.data.uf_emissor);
    tag(&mut out, "fone", &only_digits(issuer.phone.as_deref().unwrap_or_default()));
    out.push_str("</enderEmit>");
    tag(&mut out, "IE", ctx.config.data.inscricao_estadual.as_deref().unwrap_or_default());
    tag(&mut out, "IM", ctx.config.data.inscricao_municipal.as_deref().unwrap_or_default());
    tag(&mut out, "CNAE", ctx.config.data.cnae.as_deref().unwrap_or_default());
    tag(&mut out, "CRT", crt(&ctx.config.data.regime_tributario));
    out.push_str("</emit><dest>");

    let (kind, id) = recipient_id(recipient.tax_id.as_deref().unwrap_or_default());
    tag(&mut out, kind, &id);
    tag(&mut out, "xNome", &recipient.name);
    out.push_str("<enderDest>");
    tag(&mut out, "xLgr", recipient.address.as_deref().unwrap_or_default());
    tag(&mut out, "xMun", recipient.city.as_deref().unwrap_or_default());
    tag(&mut out, "UF", recipient.uf.as_deref().unwrap_or_default());
    tag(&mut out, "CEP", &only_digits(recipient.postal_code.as_deref().unwrap_or_default()));
    out.push_str("</enderDest>");
    tag(&mut out, "email", recipient.email.as_deref().unwrap_or_default());
    out.push_str("</dest>");

    for (index, item) in ctx.items.iter().enumerate() {
        item_xml(&mut out, index, item);
    }

    out.push_str("<total><ICMSTot>");
    tag(&mut out, "vBC", &money(ctx.items.iter().map(|i| i.data.base_calculo_icms).sum()));
    tag(&mut out, "vICMS", &money(n.valor_icms));
    tag(&mut out, "vST", &money(n.valor_icms_st));
    tag(&mut out, "vProd", &money(n.valor_produtos));
    tag(&mut out, "vFrete", &money(n.valor_frete));
    tag(&mut out, "vSeg", &money(n.valor_seguro));
    tag(&mut out, "vDesc", &money(n.valor_desconto));
    tag(&mut out, "vIPI", &money(n.valor_ipi));
    tag(&mut out, "vPIS", &money(n.valor_pis));
    tag(&mut out, "vCOFINS", &money(n.valor_cofins));
    tag(&mut out, "vOutro", &money(n.valor_outras_despesas));
    tag(&mut out, "vNF", &money(n.valor_total));
    out.push_str("</ICMSTot></total><transp><modFrete>9</modFrete></transp>");

    if let Some(info) = &n.informacoes_adicionais {
        out.push_str("<infAdic>");
        tag(&mut out, "infCpl", info);
        out.push_str("</infAdic>");
    }
    out.push_str("</infNFe></NFe>");
    out
}

/// Código de Regime Tributário.
fn crt(regime: &str) -> &'static str {
    match regime {
        "simples" => "1",
        _ => "3",
    }
}

pub struct CancelEvent<'a> {
    pub chave: &'a str,
    pub protocolo: &'a str,
    pub justificativa: &'a str,
    pub cnpj: &'a str,
    pub ambiente: u8,
    pub at: DateTime<Utc>,
}

pub fn cancel_event(event: &CancelEvent<'_>) -> String {
    let uf_prefix = event.chave.get(0..2).unwrap_or("00");
    let mut out = String::new();
    let _ = write!(
        out,
        "<envEvento xmlns=\"{NAMESPACE}\" versao=\"1.00\"><idLote>1</idLote>\
         <evento versao=\"1.00\"><infEvento Id=\"ID{CANCEL_EVENT}{}01\">",
        event.chave
    );
    tag(&mut out, "cOrgao", uf_prefix);
    tag(&mut out, "tpAmb", &event.ambiente.to_string());
    tag(&mut out, "CNPJ", &only_digits(event.cnpj));
    tag(&mut out, "chNFe", event.chave);
    tag(&mut out, "dhEvento", &timestamp(event.at));
    tag(&mut out, "tpEvento", CANCEL_EVENT);
    tag(&mut out, "nSeqEvento", "1");
    tag(&mut out, "verEvento", "1.00");
    out.push_str("<detEvento versao=\"1.00\">");
    tag(&mut out, "descEvento", "Cancelamento");
    tag(&mut out, "nProt", event.protocolo);
    tag(&mut out, "xJust", event.justificativa);
    out.push_str("</detEvento></infEvento></evento></envEvento>");
    out
}

pub struct VoidRange<'a> {
    pub uf_code: u8,
    pub year: i32,
    pub cnpj: &'a str,
    pub serie: i32,
    pub first: i32,
    pub last: i32,
    pub justificativa: &'a str,
    pub ambiente: u8,
}

pub fn void_request(range: &VoidRange<'_>) -> String {
    let cnpj = only_digits(range.cnpj);
    let yy = range.year.rem_euclid(100);
    let mut out = String::new();
    let _ = write!(
        out,
        "<inutNFe xmlns=\"{NAMESPACE}\" versao=\"{VERSION}\"><infInut Id=\"ID{:02}{yy:02}{cnpj}55{:03}{:09}{:09}\">",
        range.uf_code, range.serie, range.first, range.last
    );
    tag(&mut out, "tpAmb", &range.ambiente.to_string());
    tag(&mut out, "xServ", "INUTILIZAR");
    tag(&mut out, "cUF", &format!("{:02}", range.uf_code));
    tag(&mut out, "ano", &format!("{yy:02}"));
    tag(&mut out, "CNPJ", &cnpj);
    tag(&mut out, "mod", "55");
    tag(&mut out, "serie", &range.serie.to_string());
    tag(&mut out, "nNFIni", &range.first.to_string());
    tag(&mut out, "nNFFin", &range.last.to_string());
    tag(&mut out, "xJust", range.justificativa);
    out.push_str("</infInut></inutNFe>");
    out
}
