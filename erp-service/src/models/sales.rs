use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::orders)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    #[serde(default)]
    pub order_number: String,
    pub customer_id: i32,
    pub order_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    #[serde(default = "defaults::order_new")]
    pub status: String,
    #[serde(default)]
    pub total_amount: f64,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    Order(OrderData) in orders as "order";
    OrderChanges {
        customer_id: i32,
        order_date: NaiveDate,
        delivery_date: NaiveDate,
        status: String,
        total_amount: f64,
        notes: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::order_items)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemData {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

record! {
    OrderItem(OrderItemData) in order_items as "order item";
}
