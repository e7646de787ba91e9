// state module: AppState, initialization, and re-exports of submodules.

use anyhow::Result;
use mongodb::{Client, Collection};

use crate::{
    config::Settings,
    models::{Bill, ChartAccount, FixedAsset, LedgerEntry, Payment, Project, Unit},
};

mod accounts;
mod assets;
mod bills;
mod dashboard;
mod ledger;
mod payments;
mod projects;
mod seed;
mod units;

pub use accounts::*;
pub use assets::*;
pub use bills::*;
pub use dashboard::*;
pub use ledger::*;
pub use payments::*;
pub use projects::*;
pub use units::*;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub projects: Collection<Project>,
    pub units: Collection<Unit>,
    pub chart_of_accounts: Collection<ChartAccount>,
    pub bills: Collection<Bill>,
    pub payments: Collection<Payment>,
    pub general_ledger: Collection<LedgerEntry>,
    pub fixed_assets: Collection<FixedAsset>,
}

pub async fn init_state() -> Result<AppState> {
    init_state_with(Settings::from_env()).await
}

pub async fn init_state_with(settings: Settings) -> Result<AppState> {
    let client = Client::with_uri_str(&settings.mongodb_uri).await?;
    let db = client.database(&settings.mongodb_db);

    seed::ensure_collections(&db).await?;
    seed::ensure_indexes(&db).await?;

    // Only seed when the database is effectively empty (no chart of accounts).
    if settings.seed_data && seed::is_database_empty(&db).await? {
        tracing::info!(db = %settings.mongodb_db, "seeding empty database");
        seed::seed_chart_of_accounts(&db).await?;
        let project_ids = seed::seed_projects(&db, &settings.default_currency).await?;
        seed::seed_units(&db, &project_ids).await?;
        seed::seed_fixed_assets(&db, &project_ids).await?;
    }

    Ok(AppState {
        settings,
        projects: db.collection::<Project>("projects"),
        units: db.collection::<Unit>("units"),
        chart_of_accounts: db.collection::<ChartAccount>("chart_of_accounts"),
        bills: db.collection::<Bill>("bills"),
        payments: db.collection::<Payment>("payments"),
        general_ledger: db.collection::<LedgerEntry>("general_ledger"),
        fixed_assets: db.collection::<FixedAsset>("fixed_assets"),
    })
}
