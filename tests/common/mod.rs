#![allow(dead_code)]

use std::{
    env,
    sync::{Mutex, MutexGuard, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};

use mongodb::{Client, bson::oid::ObjectId};

use propledger::{
    models::{Project, Unit},
    state::{AppState, init_state, list_projects, list_units},
};

/// Global lock so integration tests that mutate the DB run one-at-a-time.
static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestContext {
    pub state: AppState,
    pub db_name: String,
    _guard: MutexGuard<'static, ()>,
}

pub async fn setup_state() -> Option<TestContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!(
        "propledgertest_{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    );
    unsafe {
        env::set_var("MONGODB_DB", &db_name);
    }

    let client = match Client::with_uri_str(&uri).await {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test; cannot connect to MongoDB: {err:?}");
            drop(guard);
            return None;
        }
    };
    if let Err(err) = client.database(&db_name).drop().await {
        eprintln!("Skipping test; cannot drop test DB: {err:?}");
        drop(guard);
        return None;
    }

    match init_state().await {
        Ok(state) => Some(TestContext {
            state,
            db_name,
            _guard: guard,
        }),
        Err(err) => {
            eprintln!("Skipping test; init_state failed: {err:?}");
            drop(guard);
            None
        }
    }
}

pub async fn teardown(ctx: TestContext) {
    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    if let Ok(client) = Client::with_uri_str(&uri).await {
        let _ = client.database(&ctx.db_name).drop().await;
    }
    drop(ctx);
}

/// Seeded project by slug.
pub async fn project(state: &AppState, slug: &str) -> (ObjectId, Project) {
    let project = list_projects(state)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.slug == slug)
        .unwrap_or_else(|| panic!("seed project {slug} missing"));
    (project.id.unwrap(), project)
}

/// Seeded unit by number within a project.
pub async fn unit(state: &AppState, project_id: &ObjectId, unit_number: &str) -> (ObjectId, Unit) {
    let unit = list_units(state, Some(project_id))
        .await
        .unwrap()
        .into_iter()
        .find(|u| u.unit_number == unit_number)
        .unwrap_or_else(|| panic!("seed unit {unit_number} missing"));
    (unit.id.unwrap(), unit)
}

pub fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Domain error carried inside an `anyhow::Error`, if any.
pub fn ledger_error(err: &anyhow::Error) -> Option<&propledger::error::LedgerError> {
    err.downcast_ref::<propledger::error::LedgerError>()
}
