use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::util::{id_of, TestApp};

fn close(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() < 0.005)
}

async fn hire(app: &TestApp, token: &str, name: &str, salary: f64) -> i32 {
    let (status, body) = app
        .post(
            "/api/hr/employees",
            token,
            json!({
                "name": name,
                "position": "Operador",
                "department": "Produção",
                "hiringDate": "2023-02-01",
                "salary": salary,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    id_of(&body)
}

#[tokio::test]
async fn hr_routes_need_the_hr_permission() {
    let app = TestApp::new().await;
    let (_, outsider) = app.user("vendas", json!({ "commercial": true })).await;
    let (status, _) = app.get("/api/hr/employees", &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, hr) = app.user("rh", json!({ "hr": true })).await;
    let (status, body) = app.get("/api/hr/employees", &hr).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn employee_cpf_is_checked_and_normalized() {
    let app = TestApp::new().await;
    let base = json!({
        "name": "Ana",
        "position": "Analista",
        "department": "Financeiro",
        "hiringDate": "2024-01-15",
    });

    let mut bad = base.clone();
    bad["cpf"] = json!("123.456.789-00");
    let (status, _) = app.post("/api/hr/employees", &app.admin, bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut good = base;
    good["cpf"] = json!("529.982.247-25");
    let (status, employee) = app.post("/api/hr/employees", &app.admin, good).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(employee["cpf"], "52998224725");
    assert_eq!(employee["status"], "active");
}

#[tokio::test]
async fn terminating_an_employee_stamps_the_date() {
    let app = TestApp::new().await;
    let id = hire(&app, &app.admin, "Bruno", 2500.0).await;
    let (status, employee) = app
        .patch(&format!("/api/hr/employees/{id}"), &app.admin, json!({ "status": "terminated" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(employee["terminationDate"].is_string());
}

#[tokio::test]
async fn department_tree_rejects_cycles() {
    let app = TestApp::new().await;
    let (_, root) = app.post("/api/hr/departments", &app.admin, json!({ "name": "Operações" })).await;
    let root = id_of(&root);
    let (status, child) = app
        .post(
            "/api/hr/departments",
            &app.admin,
            json!({ "name": "Manutenção", "parentDepartmentId": root }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let child = id_of(&child);

    let (status, _) = app
        .patch(
            &format!("/api/hr/departments/{root}"),
            &app.admin,
            json!({ "parentDepartmentId": child }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch(
            &format!("/api/hr/departments/{root}"),
            &app.admin,
            json!({ "parentDepartmentId": root }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/hr/departments",
            &app.admin,
            json!({ "name": "Fantasma", "parentDepartmentId": 999 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn position_salary_range_must_be_ordered() {
    let app = TestApp::new().await;
    let (status, _) = app
        .post(
            "/api/hr/positions",
            &app.admin,
            json!({ "name": "Gerente", "salaryRangeMin": 9000.0, "salaryRangeMax": 5000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn overlapping_leaves_conflict_until_rejected() {
    let app = TestApp::new().await;
    let employee = hire(&app, &app.admin, "Carla", 3000.0).await;
    let leave = |start: &str, end: &str| {
        json!({ "employeeId": employee, "type": "vacation", "startDate": start, "endDate": end })
    };

    let (status, first) = app.post("/api/hr/leaves", &app.admin, leave("2025-01-10", "2025-01-20")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["status"], "pending");

    let (status, _) = app.post("/api/hr/leaves", &app.admin, leave("2025-01-20", "2025-01-25")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post("/api/hr/leaves", &app.admin, leave("2025-02-10", "2025-02-01")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let reject = format!("/api/hr/leaves/{}/reject", id_of(&first));
    let (status, rejected) = app.patch(&reject, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");

    let (status, second) = app.post("/api/hr/leaves", &app.admin, leave("2025-01-15", "2025-01-25")).await;
    assert_eq!(status, StatusCode::CREATED);

    let approve = format!("/api/hr/leaves/{}/approve", id_of(&second));
    let (status, approved) = app.patch(&approve, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert!(approved["approvedDate"].is_string());

    let (status, _) = app.patch(&approve, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leave_edits_cannot_change_status() {
    let app = TestApp::new().await;
    let employee = hire(&app, &app.admin, "Diego", 3000.0).await;
    let (_, leave) = app
        .post(
            "/api/hr/leaves",
            &app.admin,
            json!({ "employeeId": employee, "type": "sick", "startDate": "2025-03-01", "endDate": "2025-03-03" }),
        )
        .await;
    let (status, updated) = app
        .patch(
            &format!("/api/hr/leaves/{}", id_of(&leave)),
            &app.admin,
            json!({ "status": "approved", "reason": "gripe" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "pending");
    assert_eq!(updated["reason"], "gripe");
}

#[tokio::test]
async fn payroll_withholdings_follow_the_tables() {
    let app = TestApp::new().await;
    let employee = hire(&app, &app.admin, "Eva", 3000.0).await;
    let (status, entry) = app
        .post(
            "/api/hr/payrolls",
            &app.admin,
            json!({ "employeeId": employee, "year": 2025, "month": 1, "baseSalary": 3000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");
    assert!(close(&entry["grossSalary"], 3000.0));
    assert!(close(&entry["netSalary"], 2705.03));
    assert!(close(&entry["fgts"], 240.0));

    let (status, _) = app
        .post(
            "/api/hr/payrolls",
            &app.admin,
            json!({ "employeeId": employee, "year": 2025, "month": 13, "baseSalary": 3000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payroll_status_only_moves_forward() {
    let app = TestApp::new().await;
    let employee = hire(&app, &app.admin, "Fabio", 2000.0).await;
    let (_, entry) = app
        .post(
            "/api/hr/payrolls",
            &app.admin,
            json!({ "employeeId": employee, "year": 2025, "month": 2, "baseSalary": 2000.0 }),
        )
        .await;
    let uri = format!("/api/hr/payrolls/{}", id_of(&entry));

    let (status, _) = app.patch(&uri, &app.admin, json!({ "status": "paid" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.patch(&uri, &app.admin, json!({ "status": "processed" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, paid) = app.patch(&uri, &app.admin, json!({ "status": "paid" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert!(paid["paymentDate"].is_string());
}

#[tokio::test]
async fn monthly_run_generates_then_processes() {
    let app = TestApp::new().await;
    hire(&app, &app.admin, "Gabi", 3000.0).await;
    hire(&app, &app.admin, "Hugo", 1500.0).await;
    let (_, unpaid) = app
        .post(
            "/api/hr/employees",
            &app.admin,
            json!({ "name": "Iris", "position": "Estagiária", "department": "TI", "hiringDate": "2024-06-01" }),
        )
        .await;
    assert!(unpaid["salary"].is_null());

    let period = json!({ "year": 2025, "month": 3 });
    let (status, result) = app.post("/api/hr/payrolls/generate", &app.admin, period.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result, json!({ "created": 2, "skipped": 1 }));

    let (_, again) = app.post("/api/hr/payrolls/generate", &app.admin, period.clone()).await;
    assert_eq!(again, json!({ "created": 0, "skipped": 3 }));

    let (status, processed) = app.post("/api/hr/payrolls/process", &app.admin, period).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processed, json!({ "processed": 2 }));

    let (status, summary) = app.get("/api/hr/payrolls/summary?year=2025&month=3", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["count"], 2);
    assert!(close(&summary["totalGross"], 4500.0));
}
