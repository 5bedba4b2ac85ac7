use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::suppliers)]
#[serde(rename_all = "camelCase")]
pub struct SupplierData {
    pub name: String,
    pub tax_id: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    Supplier(SupplierData) in suppliers as "supplier";
    SupplierChanges {
        name: String,
        tax_id: String,
        contact_name: String,
        email: String,
        phone: String,
        address: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::raw_materials)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterialData {
    pub name: String,
    pub code: String,
    pub unit: String,
    #[serde(default)]
    pub current_stock: f64,
    #[serde(default)]
    pub minimum_stock: f64,
    #[serde(default)]
    pub price: f64,
    pub location_in_warehouse: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    RawMaterial(RawMaterialData) in raw_materials as "raw material";
    RawMaterialChanges {
        name: String,
        code: String,
        unit: String,
        current_stock: f64,
        minimum_stock: f64,
        price: f64,
        location_in_warehouse: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::measurement_units)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementUnitData {
    pub name: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub base_unit: bool,
    #[serde(default = "defaults::one_f64")]
    pub conversion_factor: f64,
    pub created_by: Option<i32>,
}

record! {
    MeasurementUnit(MeasurementUnitData) in measurement_units as "measurement unit";
    MeasurementUnitChanges {
        name: String,
        symbol: String,
        type_: String,
        base_unit: bool,
        conversion_factor: f64,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::quotations)]
#[serde(rename_all = "camelCase")]
pub struct QuotationData {
    #[serde(default)]
    pub quotation_number: String,
    #[serde(default = "defaults::open")]
    pub status: String,
    pub creation_date: NaiveDate,
    pub closing_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    Quotation(QuotationData) in quotations as "quotation";
    QuotationChanges {
        quotation_number: String,
        status: String,
        creation_date: NaiveDate,
        closing_date: NaiveDate,
        notes: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::quotation_items)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItemData {
    pub quotation_id: i32,
    pub material_id: i32,
    pub quantity: f64,
    pub unit_id: Option<i32>,
    pub unit_measurement: String,
}

record! {
    QuotationItem(QuotationItemData) in quotation_items as "quotation item";
    QuotationItemChanges {
        material_id: i32,
        quantity: f64,
        unit_id: i32,
        unit_measurement: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::supplier_quotations)]
#[serde(rename_all = "camelCase")]
pub struct SupplierQuotationData {
    pub quotation_item_id: i32,
    pub supplier_id: i32,
    pub unit_price: f64,
    #[serde(default)]
    pub freight: f64,
    #[serde(default)]
    pub taxes: f64,
    #[serde(default)]
    pub total_price: f64,
    pub delivery_time: Option<i32>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_selected: bool,
}

record! {
    SupplierQuotation(SupplierQuotationData) in supplier_quotations as "supplier quotation";
    SupplierQuotationChanges {
        supplier_id: i32,
        unit_price: f64,
        freight: f64,
        taxes: f64,
        total_price: f64,
        delivery_time: i32,
        payment_terms: String,
        notes: String,
    }
}
