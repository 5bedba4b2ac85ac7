use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::users)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub username: String,
    /// PBKDF2 hash once stored; the plain password only on registration.
    #[serde(skip_serializing)]
    pub password: String,
    pub full_name: String,
    pub email: String,
    #[serde(default = "defaults::user_role")]
    pub role: String,
    #[serde(default = "defaults::yes")]
    pub active: bool,
    pub status: Option<String>,
    pub status_message: Option<String>,
    #[serde(default = "defaults::empty_object")]
    pub permissions: Value,
}

record! {
    /// A login account with its per-module permission map.
    User(UserData) in users as "user";
    UserChanges {
        password: String,
        full_name: String,
        email: String,
        role: String,
        active: bool,
        status: String,
        status_message: String,
        permissions: Value,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::companies)]
#[serde(rename_all = "camelCase")]
pub struct CompanyData {
    pub name: String,
    pub logo: Option<String>,
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

record! {
    Company(CompanyData) in companies as "company";
    CompanyChanges {
        name: String,
        logo: String,
        tax_id: String,
        address: String,
        phone: String,
        email: String,
        website: String,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::system_audit_logs)]
#[serde(rename_all = "camelCase")]
pub struct SystemAuditLogData {
    pub user_id: Option<i32>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i32>,
    pub details: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub module: Option<String>,
}

record! {
    /// One write made through the API, kept for the admin audit screen.
    SystemAuditLog(SystemAuditLogData) in system_audit_logs as "audit log";
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::system_alerts)]
#[serde(rename_all = "camelCase")]
pub struct SystemAlertData {
    pub message: String,
    #[serde(default = "defaults::medium")]
    pub priority: String,
    #[serde(default = "defaults::active")]
    pub status: String,
    pub module: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<i32>,
    pub created_by: Option<i32>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<i32>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<i32>,
}

record! {
    SystemAlert(SystemAlertData) in system_alerts as "alert";
    SystemAlertChanges {
        message: String,
        priority: String,
        status: String,
        module: String,
        reference_type: String,
        reference_id: i32,
        acknowledged_at: DateTime<Utc>,
        acknowledged_by: i32,
        resolved_at: DateTime<Utc>,
        resolved_by: i32,
    }
}
