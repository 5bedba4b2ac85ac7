use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::expenses)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseData {
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub category: String,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence_info: Option<Value>,
    pub cost_center: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    Expense(ExpenseData) in expenses as "expense";
    ExpenseChanges {
        description: String,
        amount: f64,
        due_date: NaiveDate,
        payment_date: NaiveDate,
        category: String,
        is_recurring: bool,
        recurrence_info: Value,
        cost_center: String,
    }
}

/// Payable or receivable title.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::accounts)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default = "defaults::pending")]
    pub status: String,
    pub entity_name: String,
    pub entity_id: Option<i32>,
    pub document_number: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    Account(AccountData) in accounts as "account";
    AccountChanges {
        description: String,
        amount: f64,
        due_date: NaiveDate,
        type_: String,
        status: String,
        entity_name: String,
        entity_id: i32,
        document_number: String,
    }
}
