use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// One stock movement of a raw material. The ledger is append-only; the
/// material's `current_stock` moves with each entry.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::inventory_transactions)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTransactionData {
    pub material_id: i32,
    pub quantity: f64,
    pub transaction_type: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<i32>,
    pub lot_number: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    InventoryTransaction(InventoryTransactionData) in inventory_transactions as "inventory transaction";
}
