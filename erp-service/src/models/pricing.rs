use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::products)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub ncm: Option<String>,
    #[serde(default = "defaults::unit_un")]
    pub unit: String,
    #[serde(default)]
    pub unit_cost: f64,
    pub selling_price: Option<f64>,
    pub created_by: Option<i32>,
}

record! {
    Product(ProductData) in products as "product";
    ProductChanges {
        name: String,
        code: String,
        description: String,
        ncm: String,
        unit: String,
        unit_cost: f64,
        selling_price: f64,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::product_formulas)]
#[serde(rename_all = "camelCase")]
pub struct ProductFormulaData {
    #[serde(default)]
    pub product_id: i32,
    pub material_id: i32,
    pub quantity: f64,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    ProductFormula(ProductFormulaData) in product_formulas as "product formula";
    ProductFormulaChanges {
        material_id: i32,
        quantity: f64,
        unit: String,
        description: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::product_pricing)]
#[serde(rename_all = "camelCase")]
pub struct ProductPricingData {
    pub product_id: i32,
    #[serde(default)]
    pub raw_material_cost: f64,
    #[serde(default)]
    pub labor_cost: f64,
    #[serde(default)]
    pub overhead_cost: f64,
    #[serde(default)]
    pub freight_cost: f64,
    #[serde(default)]
    pub taxes: f64,
    #[serde(default)]
    pub profit_margin: f64,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub suggested_price: f64,
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub calculation_date: NaiveDate,
    pub created_by: Option<i32>,
}

record! {
    ProductPricing(ProductPricingData) in product_pricing as "product pricing";
    ProductPricingChanges {
        raw_material_cost: f64,
        labor_cost: f64,
        overhead_cost: f64,
        freight_cost: f64,
        taxes: f64,
        profit_margin: f64,
        total_cost: f64,
        suggested_price: f64,
        margin: f64,
        calculation_date: NaiveDate,
    }
}
