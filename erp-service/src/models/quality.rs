use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::quality_inspections)]
#[serde(rename_all = "camelCase")]
pub struct QualityInspectionData {
    pub inspection_type: String,
    pub reference_type: String,
    pub reference_id: i32,
    pub result: String,
    pub notes: Option<String>,
    pub inspection_date: NaiveDate,
    pub created_by: Option<i32>,
}

record! {
    QualityInspection(QualityInspectionData) in quality_inspections as "inspection";
    QualityInspectionChanges {
        inspection_type: String,
        reference_type: String,
        reference_id: i32,
        result: String,
        notes: String,
        inspection_date: NaiveDate,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::non_conformities)]
#[serde(rename_all = "camelCase")]
pub struct NonConformityData {
    #[serde(default)]
    pub code: String,
    pub title: String,
    pub description: String,
    #[serde(default = "defaults::open")]
    pub status: String,
    pub severity: String,
    pub origin: String,
    pub detected_date: NaiveDate,
    pub resolved_date: Option<NaiveDate>,
    pub responsible_id: Option<i32>,
    pub product_id: Option<i32>,
    pub raw_material_id: Option<i32>,
    pub process_name: Option<String>,
    pub root_cause: Option<String>,
    pub correction_plan: Option<String>,
    pub preventive_actions: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    NonConformity(NonConformityData) in non_conformities as "non-conformity";
    NonConformityChanges {
        title: String,
        description: String,
        status: String,
        severity: String,
        origin: String,
        detected_date: NaiveDate,
        responsible_id: i32,
        product_id: i32,
        raw_material_id: i32,
        process_name: String,
        root_cause: String,
        correction_plan: String,
        preventive_actions: String,
        // `Some(None)` clears the date when an issue is reopened
        resolved_date: Option<NaiveDate>,
    }
}
