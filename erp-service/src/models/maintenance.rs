use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::equipment)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentData {
    pub name: String,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub sector: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub criticality: String,
    #[serde(default = "defaults::operational")]
    pub status: String,
    pub created_by: Option<i32>,
}

record! {
    Equipment(EquipmentData) in equipment as "equipment";
    EquipmentChanges {
        name: String,
        model: String,
        serial_number: String,
        manufacturer: String,
        purchase_date: NaiveDate,
        sector: String,
        type_: String,
        criticality: String,
        status: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::maintenance_orders)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceOrderData {
    #[serde(default)]
    pub order_number: String,
    pub equipment_id: i32,
    #[serde(rename = "type")]
    pub type_: String,
    pub description: String,
    pub urgency: String,
    #[serde(default = "defaults::open")]
    pub status: String,
    pub scheduled_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    MaintenanceOrder(MaintenanceOrderData) in maintenance_orders as "maintenance order";
    MaintenanceOrderChanges {
        equipment_id: i32,
        type_: String,
        description: String,
        urgency: String,
        status: String,
        scheduled_date: NaiveDate,
        // `Some(None)` clears the date when an order is reopened
        completion_date: Option<NaiveDate>,
        notes: String,
    }
}
