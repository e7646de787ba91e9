#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt; // for oneshot

use propledger::{routes, state::AppState};

fn build_app(state: AppState) -> Router {
    routes::router(Arc::new(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoint_responds() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let app = build_app(ctx.state.clone());
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    common::teardown(ctx).await;
}

#[tokio::test]
async fn billing_round_trip_over_http() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let app = build_app(state.clone());
    let (project_id, _) = common::project(&state, "riverside").await;
    let (unit_id, _) = common::unit(&state, &project_id, "A-101").await;

    let (status, projects) = send(&app, "GET", "/api/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(projects.as_array().map(Vec::len), Some(2));

    let bill = json!({
        "project_id": project_id.to_hex(),
        "unit_id": unit_id.to_hex(),
        "billing_month": "2024-05",
        "total": 1912.5,
    });
    let (status, created) = send(&app, "POST", "/api/bills", Some(bill.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let bill_id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", "/api/bills", Some(bill)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already billed"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/payments",
        Some(json!({
            "bill_id": bill_id,
            "amount": 1000.0,
            "method": "cash",
            "payment_date": "2024-05-10",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/payments",
        Some(json!({
            "bill_id": bill_id,
            "amount": 5000.0,
            "method": "transfer",
            "payment_date": "2024-05-11",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exceeds"));

    let (status, shown) = send(&app, "GET", &format!("/api/bills/{bill_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["status"], "pending");
    assert_eq!(shown["paid_amount"], 1000.0);
    assert_eq!(shown["outstanding"], 912.5);
    assert_eq!(shown["issue_date"], "2024-05-01");

    let (status, ledger) = send(
        &app,
        "GET",
        "/api/ledger?start=2024-05-01&end=2024-05-31",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ledger.as_array().map(Vec::len), Some(4));

    let (status, summary) = send(
        &app,
        "GET",
        &format!(
            "/api/reports/summary?start=2024-05-01&end=2024-05-31&project_id={}",
            project_id.to_hex()
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["revenue"]["total"], 1912.5);
    assert_eq!(summary["is_balanced"], true);

    let (status, dash) = send(
        &app,
        "GET",
        &format!("/api/dashboard?month=2024-05&project_id={}", project_id.to_hex()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["total_units"], 3);
    assert_eq!(dash["occupied_units"], 2);
    assert_eq!(dash["occupancy_rate"], 66.67);
    assert_eq!(dash["bills_issued"], 1);
    assert_eq!(dash["collected"], 1000.0);
    assert_eq!(dash["outstanding"], 912.5);
    assert_eq!(dash["collection_rate"], 52.29);
    assert_eq!(dash["overdue_bills"], 1);
    assert_eq!(dash["revenue"], 1912.5);

    common::teardown(ctx).await;
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let app = build_app(ctx.state.clone());

    let (status, _) = send(&app, "GET", "/api/bills/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = mongodb::bson::oid::ObjectId::new().to_hex();
    let (status, _) = send(&app, "GET", &format!("/api/bills/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/payments/{missing}/void"),
        Some(json!({ "reason": "test" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/ledger/journals",
        Some(json!({
            "date": "2024-02-01",
            "description": "bad",
            "lines": [
                { "account_code": "5100", "debit": 10.0 },
                { "account_code": "1110", "credit": 9.0 },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("unbalanced"));

    let (status, _) = send(&app, "GET", "/api/reports/summary?end=2024-01-31", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = send(
        &app,
        "POST",
        "/api/accounts",
        Some(json!({ "account_code": "4400", "name": "Parking fees", "account_type": "revenue" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/accounts",
        Some(json!({ "account_code": "4400", "name": "Again", "account_type": "revenue" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    common::teardown(ctx).await;
}

#[tokio::test]
async fn depreciation_runs_over_http() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let app = build_app(ctx.state.clone());

    let (status, report) = send(
        &app,
        "POST",
        "/api/assets/depreciation",
        Some(json!({ "as_of": "2023-02-28" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["journals_posted"], 2);
    assert_eq!(report["total_amount"], 12_000.0);

    let (status, assets) = send(&app, "GET", "/api/assets", None).await;
    assert_eq!(status, StatusCode::OK);
    let lift = assets
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == "Passenger lift")
        .unwrap();
    assert_eq!(lift["monthly_depreciation"], 6000.0);
    assert_eq!(lift["net_book_value"], 1_188_000.0);
    assert_eq!(lift["last_depreciation_date"], "2023-02-28");

    let (status, trial) =
        send(&app, "GET", "/api/reports/trial-balance?end=2023-12-31", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trial["is_balanced"], true);
    assert_eq!(trial["total_debit"], 12_000.0);

    common::teardown(ctx).await;
}
