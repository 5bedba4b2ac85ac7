use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::documents::validate_cpf;
use shared::hr::{check_date_range, check_salary_range, creates_cycle, ranges_overlap};
use shared::payroll::{self, PayrollInput};
use shared::status::{AuditAction, EmployeeStatus, LeaveStatus, LeaveType, PayrollStatus};
use shared::tax::round_cents;
use shared::Module;

use super::{created, require_text, to_details, AppState};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/hr/employees", get(list_employees).post(create_employee))
        .route(
            "/hr/employees/:id",
            get(get_employee).patch(update_employee).delete(delete_employee),
        )
        .route("/hr/departments", get(list_departments).post(create_department))
        .route(
            "/hr/departments/:id",
            get(get_department).patch(update_department).delete(delete_department),
        )
        .route("/hr/positions", get(list_positions).post(create_position))
        .route(
            "/hr/positions/:id",
            get(get_position).patch(update_position).delete(delete_position),
        )
        .route("/hr/leaves", get(list_leaves).post(create_leave))
        .route("/hr/leaves/:id", get(get_leave).patch(update_leave).delete(delete_leave))
        .route("/hr/leaves/:id/approve", patch(approve_leave))
        .route("/hr/leaves/:id/reject", patch(reject_leave))
        .route("/hr/payrolls", get(list_payrolls).post(create_payroll))
        .route("/hr/payrolls/generate", post(generate_payrolls))
        .route("/hr/payrolls/process", post(process_payrolls))
        .route("/hr/payrolls/summary", get(payroll_summary))
        .route(
            "/hr/payrolls/:id",
            get(get_payroll).patch(update_payroll).delete(delete_payroll),
        )
}

async fn audit(state: &AppState, user: &AuthUser, action: AuditAction, entity: &str, id: i32, details: Value) {
    state.audit(user, Module::Hr, action, entity, Some(id), details).await;
}

fn clean_cpf(cpf: Option<String>) -> ApiResult<Option<String>> {
    match cpf.filter(|c| !c.trim().is_empty()) {
        Some(c) => Ok(Some(validate_cpf(&c)?)),
        None => Ok(None),
    }
}

// Employees

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeQuery {
    pub status: Option<String>,
    pub department: Option<String>,
}

pub async fn list_employees(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EmployeeQuery>,
) -> ApiResult<Json<Vec<Employee>>> {
    user.require(Module::Hr)?;
    let employees = state
        .store
        .all::<Employee>()
        .await?
        .into_iter()
        .filter(|e| query.status.as_ref().map_or(true, |s| &e.data.status == s))
        .filter(|e| query.department.as_ref().map_or(true, |d| &e.data.department == d))
        .collect();
    Ok(Json(employees))
}

pub async fn get_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Employee>> {
    user.require(Module::Hr)?;
    Ok(Json(state.store.get::<Employee>(id).await?))
}

pub async fn create_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut employee): Json<EmployeeData>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    user.require(Module::Hr)?;
    require_text(&employee.name, "name", 1)?;
    employee.cpf = clean_cpf(employee.cpf)?;
    let status: EmployeeStatus = employee.status.parse()?;
    if status == EmployeeStatus::Terminated && employee.termination_date.is_none() {
        employee.termination_date = Some(Utc::now().date_naive());
    }
    employee.created_by = Some(user.id);

    let stored = state.store.create::<Employee>(employee).await?;
    audit(&state, &user, AuditAction::Create, "employee", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<EmployeeChanges>,
) -> ApiResult<Json<Employee>> {
    user.require(Module::Hr)?;
    let current = state.store.get::<Employee>(id).await?;
    if changes.cpf.is_some() {
        changes.cpf = clean_cpf(changes.cpf)?;
    }
    if let Some(status) = &changes.status {
        let status: EmployeeStatus = status.parse()?;
        if status == EmployeeStatus::Terminated
            && changes.termination_date.is_none()
            && current.data.termination_date.is_none()
        {
            changes.termination_date = Some(Utc::now().date_naive());
        }
    }
    let updated = state.store.update::<Employee>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "employee", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Hr)?;
    state.store.delete::<Employee>(id).await?;
    audit(&state, &user, AuditAction::Delete, "employee", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Departments

async fn department_parents(state: &AppState) -> ApiResult<HashMap<i32, Option<i32>>> {
    Ok(state
        .store
        .all::<Department>()
        .await?
        .into_iter()
        .map(|d| (d.id, d.data.parent_department_id))
        .collect())
}

pub async fn list_departments(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Department>>> {
    user.require(Module::Hr)?;
    Ok(Json(state.store.all::<Department>().await?))
}

pub async fn get_department(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Department>> {
    user.require(Module::Hr)?;
    Ok(Json(state.store.get::<Department>(id).await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut department): Json<DepartmentData>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    user.require(Module::Hr)?;
    require_text(&department.name, "name", 1)?;
    if let Some(parent) = department.parent_department_id {
        state.store.get::<Department>(parent).await?;
    }
    department.created_by = Some(user.id);
    let stored = state.store.create::<Department>(department).await?;
    audit(&state, &user, AuditAction::Create, "department", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_department(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<DepartmentChanges>,
) -> ApiResult<Json<Department>> {
    user.require(Module::Hr)?;
    state.store.get::<Department>(id).await?;
    if let Some(parent) = changes.parent_department_id {
        let parents = department_parents(&state).await?;
        if !parents.contains_key(&parent) {
            return Err(ApiError::not_found("parent department"));
        }
        if creates_cycle(id, parent, &parents) {
            return Err(ApiError::bad_request("a department cannot be its own ancestor"));
        }
    }
    let updated = state.store.update::<Department>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "department", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_department(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Hr)?;
    state.store.delete::<Department>(id).await?;
    audit(&state, &user, AuditAction::Delete, "department", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Positions

pub async fn list_positions(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Position>>> {
    user.require(Module::Hr)?;
    Ok(Json(state.store.all::<Position>().await?))
}

pub async fn get_position(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Position>> {
    user.require(Module::Hr)?;
    Ok(Json(state.store.get::<Position>(id).await?))
}

pub async fn create_position(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut position): Json<PositionData>,
) -> ApiResult<(StatusCode, Json<Position>)> {
    user.require(Module::Hr)?;
    require_text(&position.name, "name", 1)?;
    check_salary_range(position.salary_range_min, position.salary_range_max)?;
    position.created_by = Some(user.id);
    let stored = state.store.create::<Position>(position).await?;
    audit(&state, &user, AuditAction::Create, "position", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

pub async fn update_position(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(changes): Json<PositionChanges>,
) -> ApiResult<Json<Position>> {
    user.require(Module::Hr)?;
    let current = state.store.get::<Position>(id).await?;
    check_salary_range(
        changes.salary_range_min.or(current.data.salary_range_min),
        changes.salary_range_max.or(current.data.salary_range_max),
    )?;
    let updated = state.store.update::<Position>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "position", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_position(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Hr)?;
    state.store.delete::<Position>(id).await?;
    audit(&state, &user, AuditAction::Delete, "position", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Leaves

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveQuery {
    pub employee_id: Option<i32>,
    pub status: Option<String>,
}

/// Rejects a range that collides with another pending or approved leave of
/// the same employee.
async fn check_overlap(
    state: &AppState,
    employee_id: i32,
    range: (chrono::NaiveDate, chrono::NaiveDate),
    ignore: Option<i32>,
) -> ApiResult<()> {
    let clash = state
        .store
        .employee_leaves(employee_id)
        .await?
        .into_iter()
        .filter(|l| Some(l.id) != ignore)
        .filter(|l| {
            l.data
                .status
                .parse::<LeaveStatus>()
                .map(LeaveStatus::holds_dates)
                .unwrap_or(false)
        })
        .any(|l| ranges_overlap(range, (l.data.start_date, l.data.end_date)));
    if clash {
        return Err(ApiError::Conflict(
            "the employee already has a leave in this period".into(),
        ));
    }
    Ok(())
}

pub async fn list_leaves(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LeaveQuery>,
) -> ApiResult<Json<Vec<Leave>>> {
    user.require(Module::Hr)?;
    let leaves = match query.employee_id {
        Some(employee) => state.store.employee_leaves(employee).await?,
        None => state.store.all::<Leave>().await?,
    };
    let leaves = leaves
        .into_iter()
        .filter(|l| query.status.as_ref().map_or(true, |s| &l.data.status == s))
        .collect();
    Ok(Json(leaves))
}

pub async fn get_leave(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Leave>> {
    user.require(Module::Hr)?;
    Ok(Json(state.store.get::<Leave>(id).await?))
}

pub async fn create_leave(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut leave): Json<LeaveData>,
) -> ApiResult<(StatusCode, Json<Leave>)> {
    user.require(Module::Hr)?;
    leave.type_.parse::<LeaveType>()?;
    check_date_range(leave.start_date, leave.end_date)?;
    state.store.get::<Employee>(leave.employee_id).await?;
    check_overlap(&state, leave.employee_id, (leave.start_date, leave.end_date), None).await?;

    leave.status = LeaveStatus::Pending.to_string();
    leave.approved_by_id = None;
    leave.approved_date = None;
    leave.created_by = Some(user.id);
    let stored = state.store.create::<Leave>(leave).await?;
    audit(&state, &user, AuditAction::Create, "leave", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

/// Edits dates and descriptive fields. Decisions go through approve/reject.
pub async fn update_leave(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<LeaveChanges>,
) -> ApiResult<Json<Leave>> {
    user.require(Module::Hr)?;
    let current = state.store.get::<Leave>(id).await?;
    changes.status = None;
    changes.approved_by_id = None;
    changes.approved_date = None;
    if let Some(kind) = &changes.type_ {
        kind.parse::<LeaveType>()?;
    }
    let start = changes.start_date.unwrap_or(current.data.start_date);
    let end = changes.end_date.unwrap_or(current.data.end_date);
    check_date_range(start, end)?;
    if (start, end) != (current.data.start_date, current.data.end_date) {
        check_overlap(&state, current.data.employee_id, (start, end), Some(id)).await?;
    }
    let updated = state.store.update::<Leave>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "leave", id, to_details(&changes)).await;
    Ok(Json(updated))
}

async fn decide_leave(state: &AppState, user: &AuthUser, id: i32, approve: bool) -> ApiResult<Leave> {
    user.require(Module::Hr)?;
    let leave = state.store.get::<Leave>(id).await?;
    let next = leave.data.status.parse::<LeaveStatus>()?.decide(approve)?;
    let changes = LeaveChanges {
        status: Some(next.to_string()),
        approved_by_id: approve.then_some(user.id),
        approved_date: approve.then(Utc::now),
        ..Default::default()
    };
    let updated = state.store.update::<Leave>(id, changes).await?;
    audit(state, user, AuditAction::Update, "leave", id, json!({ "status": next })).await;
    Ok(updated)
}

pub async fn approve_leave(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Leave>> {
    Ok(Json(decide_leave(&state, &user, id, true).await?))
}

pub async fn reject_leave(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Leave>> {
    Ok(Json(decide_leave(&state, &user, id, false).await?))
}

pub async fn delete_leave(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Hr)?;
    state.store.delete::<Leave>(id).await?;
    audit(&state, &user, AuditAction::Delete, "leave", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

// Payroll

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub employee_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: i32,
}

fn check_month(month: i32) -> ApiResult<()> {
    if !(1..=12).contains(&month) {
        return Err(ApiError::bad_request("month must be between 1 and 12"));
    }
    Ok(())
}

fn in_period(p: &Payroll, year: Option<i32>, month: Option<i32>) -> bool {
    year.map_or(true, |y| p.data.year == y) && month.map_or(true, |m| p.data.month == m)
}

pub async fn list_payrolls(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<Vec<Payroll>>> {
    user.require(Module::Hr)?;
    let payrolls = state
        .store
        .all::<Payroll>()
        .await?
        .into_iter()
        .filter(|p| in_period(p, query.year, query.month))
        .filter(|p| query.employee_id.map_or(true, |e| p.data.employee_id == e))
        .collect();
    Ok(Json(payrolls))
}

pub async fn get_payroll(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Payroll>> {
    user.require(Module::Hr)?;
    Ok(Json(state.store.get::<Payroll>(id).await?))
}

pub async fn create_payroll(
    State(state): State<AppState>,
    user: AuthUser,
    Json(mut entry): Json<PayrollData>,
) -> ApiResult<(StatusCode, Json<Payroll>)> {
    user.require(Module::Hr)?;
    check_month(entry.month)?;
    state.store.get::<Employee>(entry.employee_id).await?;
    entry.status.parse::<PayrollStatus>()?;

    let breakdown = payroll::compute(&PayrollInput {
        base_salary: entry.base_salary,
        bonuses: entry.bonuses,
        benefits: entry.benefits,
        deductions: entry.deductions,
        inss: entry.inss,
        irrf: entry.irrf,
        fgts: entry.fgts,
    });
    entry.gross_salary = breakdown.gross_salary;
    entry.net_salary = breakdown.net_salary;
    entry.inss = Some(breakdown.inss);
    entry.irrf = Some(breakdown.irrf);
    entry.fgts = Some(breakdown.fgts);
    entry.created_by = Some(user.id);

    let stored = state.store.create::<Payroll>(entry).await?;
    audit(&state, &user, AuditAction::Create, "payroll", stored.id, to_details(&stored)).await;
    Ok(created(stored))
}

/// Amount edits recompute gross and net. Withholdings not sent in the same
/// request are recomputed from the tables when the gross pay moves.
pub async fn update_payroll(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(mut changes): Json<PayrollChanges>,
) -> ApiResult<Json<Payroll>> {
    user.require(Module::Hr)?;
    let current = state.store.get::<Payroll>(id).await?;
    let d = &current.data;

    if let Some(status) = &changes.status {
        let next = d.status.parse::<PayrollStatus>()?.advance_to(status.parse()?)?;
        if next == PayrollStatus::Paid && changes.payment_date.is_none() && d.payment_date.is_none() {
            changes.payment_date = Some(Utc::now().date_naive());
        }
    }

    let gross_moves = changes.base_salary.is_some()
        || changes.bonuses.is_some()
        || changes.benefits.is_some();
    let amounts_move = gross_moves
        || changes.deductions.is_some()
        || changes.inss.is_some()
        || changes.irrf.is_some()
        || changes.fgts.is_some();
    if amounts_move {
        let keep = |given: Option<f64>, stored: Option<f64>| given.or(if gross_moves { None } else { stored });
        let breakdown = payroll::compute(&PayrollInput {
            base_salary: changes.base_salary.unwrap_or(d.base_salary),
            bonuses: changes.bonuses.unwrap_or(d.bonuses),
            benefits: changes.benefits.unwrap_or(d.benefits),
            deductions: changes.deductions.unwrap_or(d.deductions),
            inss: keep(changes.inss, d.inss),
            irrf: keep(changes.irrf, d.irrf),
            fgts: keep(changes.fgts, d.fgts),
        });
        changes.gross_salary = Some(breakdown.gross_salary);
        changes.net_salary = Some(breakdown.net_salary);
        changes.inss = Some(breakdown.inss);
        changes.irrf = Some(breakdown.irrf);
        changes.fgts = Some(breakdown.fgts);
    } else {
        changes.gross_salary = None;
        changes.net_salary = None;
    }

    let updated = state.store.update::<Payroll>(id, changes.clone()).await?;
    audit(&state, &user, AuditAction::Update, "payroll", id, to_details(&changes)).await;
    Ok(Json(updated))
}

pub async fn delete_payroll(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    user.require(Module::Hr)?;
    state.store.delete::<Payroll>(id).await?;
    audit(&state, &user, AuditAction::Delete, "payroll", id, Value::Null).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct GenerateResult {
    pub created: usize,
    pub skipped: usize,
}

/// One pending payroll per active, salaried employee that has none for the
/// period yet.
pub async fn generate_payrolls(
    State(state): State<AppState>,
    user: AuthUser,
    Json(period): Json<Period>,
) -> ApiResult<Json<GenerateResult>> {
    user.require(Module::Hr)?;
    check_month(period.month)?;
    let existing: HashSet<i32> = state
        .store
        .all::<Payroll>()
        .await?
        .into_iter()
        .filter(|p| in_period(p, Some(period.year), Some(period.month)))
        .map(|p| p.data.employee_id)
        .collect();

    let active = EmployeeStatus::Active.as_str();
    let mut result = GenerateResult { created: 0, skipped: 0 };
    for employee in state.store.all::<Employee>().await? {
        let salary = match employee.data.salary {
            Some(salary) if employee.data.status == active && !existing.contains(&employee.id) => salary,
            _ => {
                result.skipped += 1;
                continue;
            }
        };
        let breakdown = payroll::compute(&PayrollInput { base_salary: salary, ..Default::default() });
        let stored = state
            .store
            .create::<Payroll>(PayrollData {
                employee_id: employee.id,
                year: period.year,
                month: period.month,
                base_salary: salary,
                gross_salary: breakdown.gross_salary,
                net_salary: breakdown.net_salary,
                inss: Some(breakdown.inss),
                irrf: Some(breakdown.irrf),
                fgts: Some(breakdown.fgts),
                benefits: 0.0,
                deductions: 0.0,
                bonuses: 0.0,
                payment_date: None,
                status: PayrollStatus::Pending.to_string(),
                notes: None,
                created_by: Some(user.id),
            })
            .await?;
        audit(&state, &user, AuditAction::Create, "payroll", stored.id, json!({ "generated": true })).await;
        result.created += 1;
    }
    tracing::info!(
        "Generated payroll {}/{}: {} created, {} skipped",
        period.month, period.year, result.created, result.skipped
    );
    Ok(Json(result))
}

pub async fn process_payrolls(
    State(state): State<AppState>,
    user: AuthUser,
    Json(period): Json<Period>,
) -> ApiResult<Json<Value>> {
    user.require(Module::Hr)?;
    check_month(period.month)?;
    let pending = PayrollStatus::Pending.as_str();
    let mut processed = 0;
    for entry in state.store.all::<Payroll>().await? {
        if !in_period(&entry, Some(period.year), Some(period.month)) || entry.data.status != pending {
            continue;
        }
        let changes = PayrollChanges {
            status: Some(PayrollStatus::Processed.to_string()),
            ..Default::default()
        };
        state.store.update::<Payroll>(entry.id, changes).await?;
        audit(&state, &user, AuditAction::Update, "payroll", entry.id, json!({ "status": "processed" })).await;
        processed += 1;
    }
    Ok(Json(json!({ "processed": processed })))
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollSummary {
    pub count: usize,
    pub total_gross: f64,
    pub total_net: f64,
    pub total_inss: f64,
    pub total_irrf: f64,
    pub total_fgts: f64,
    pub total_benefits: f64,
    pub total_deductions: f64,
    pub total_bonuses: f64,
}

pub async fn payroll_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<PayrollSummary>> {
    user.require(Module::Hr)?;
    if let Some(month) = query.month {
        check_month(month)?;
    }
    let mut summary = PayrollSummary::default();
    for p in state.store.all::<Payroll>().await? {
        if !in_period(&p, query.year, query.month) {
            continue;
        }
        let d = &p.data;
        summary.count += 1;
        summary.total_gross += d.gross_salary;
        summary.total_net += d.net_salary;
        summary.total_inss += d.inss.unwrap_or(0.0);
        summary.total_irrf += d.irrf.unwrap_or(0.0);
        summary.total_fgts += d.fgts.unwrap_or(0.0);
        summary.total_benefits += d.benefits;
        summary.total_deductions += d.deductions;
        summary.total_bonuses += d.bonuses;
    }
    for total in [
        &mut summary.total_gross,
        &mut summary.total_net,
        &mut summary.total_inss,
        &mut summary.total_irrf,
        &mut summary.total_fgts,
        &mut summary.total_benefits,
        &mut summary.total_deductions,
        &mut summary.total_bonuses,
    ] {
        *total = round_cents(*total);
    }
    Ok(Json(summary))
}
