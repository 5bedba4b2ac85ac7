use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::production_orders)]
#[serde(rename_all = "camelCase")]
pub struct ProductionOrderData {
    #[serde(default)]
    pub order_number: String,
    pub product_id: i32,
    pub quantity: f64,
    #[serde(default = "defaults::planned")]
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    ProductionOrder(ProductionOrderData) in production_orders as "production order";
    ProductionOrderChanges {
        product_id: i32,
        quantity: f64,
        status: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        notes: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::production_losses)]
#[serde(rename_all = "camelCase")]
pub struct ProductionLossData {
    #[serde(default)]
    pub production_order_id: i32,
    pub quantity: f64,
    pub reason: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    ProductionLoss(ProductionLossData) in production_losses as "production loss";
}
