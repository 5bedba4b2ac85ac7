use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::employees)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeData {
    pub name: String,
    pub cpf: Option<String>,
    pub rg: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cellphone: Option<String>,
    pub position: String,
    pub department: String,
    pub hiring_date: NaiveDate,
    pub salary: Option<f64>,
    #[serde(default = "defaults::active")]
    pub status: String,
    pub termination_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub user_id: Option<i32>,
    pub created_by: Option<i32>,
}

record! {
    Employee(EmployeeData) in employees as "employee";
    EmployeeChanges {
        name: String,
        cpf: String,
        rg: String,
        birth_date: NaiveDate,
        gender: String,
        marital_status: String,
        address: String,
        city: String,
        state: String,
        postal_code: String,
        email: String,
        phone: String,
        cellphone: String,
        position: String,
        department: String,
        hiring_date: NaiveDate,
        salary: f64,
        status: String,
        termination_date: NaiveDate,
        notes: String,
        user_id: i32,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::departments)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentData {
    pub name: String,
    pub description: Option<String>,
    pub manager_id: Option<i32>,
    pub parent_department_id: Option<i32>,
    pub budget: Option<f64>,
    pub created_by: Option<i32>,
}

record! {
    Department(DepartmentData) in departments as "department";
    DepartmentChanges {
        name: String,
        description: String,
        manager_id: i32,
        parent_department_id: i32,
        budget: f64,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::positions)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    pub name: String,
    pub description: Option<String>,
    pub department_id: Option<i32>,
    pub responsibilities: Option<String>,
    pub requirements: Option<String>,
    pub salary_range_min: Option<f64>,
    pub salary_range_max: Option<f64>,
    pub created_by: Option<i32>,
}

record! {
    Position(PositionData) in positions as "position";
    PositionChanges {
        name: String,
        description: String,
        department_id: i32,
        responsibilities: String,
        requirements: String,
        salary_range_min: f64,
        salary_range_max: f64,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::leaves)]
#[serde(rename_all = "camelCase")]
pub struct LeaveData {
    pub employee_id: i32,
    #[serde(rename = "type")]
    pub type_: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "defaults::pending")]
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub approved_by_id: Option<i32>,
    pub approved_date: Option<DateTime<Utc>>,
    pub created_by: Option<i32>,
}

record! {
    Leave(LeaveData) in leaves as "leave";
    LeaveChanges {
        type_: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        status: String,
        reason: String,
        notes: String,
        approved_by_id: i32,
        approved_date: DateTime<Utc>,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::payroll)]
#[serde(rename_all = "camelCase")]
pub struct PayrollData {
    pub employee_id: i32,
    pub year: i32,
    pub month: i32,
    pub base_salary: f64,
    #[serde(default)]
    pub gross_salary: f64,
    #[serde(default)]
    pub net_salary: f64,
    pub inss: Option<f64>,
    pub irrf: Option<f64>,
    pub fgts: Option<f64>,
    #[serde(default)]
    pub benefits: f64,
    #[serde(default)]
    pub deductions: f64,
    #[serde(default)]
    pub bonuses: f64,
    pub payment_date: Option<NaiveDate>,
    #[serde(default = "defaults::pending")]
    pub status: String,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
}

record! {
    Payroll(PayrollData) in payroll as "payroll";
    PayrollChanges {
        base_salary: f64,
        gross_salary: f64,
        net_salary: f64,
        inss: f64,
        irrf: f64,
        fgts: f64,
        benefits: f64,
        deductions: f64,
        bonuses: f64,
        payment_date: NaiveDate,
        status: String,
        notes: String,
    }
}
