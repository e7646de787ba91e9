use anyhow::{Context, Result};
use mongodb::{
    Database, IndexModel,
    bson::{DateTime, doc, oid::ObjectId},
    options::IndexOptions,
};
use serde::de::DeserializeOwned;
use slug::slugify;
use std::{collections::HashMap, env, fs};

use crate::{
    ledger::date_to_bson,
    models::{
        ChartAccount, FixedAsset, LedgerEntry, Project, SeedAsset, SeedProject, SeedUnit, Unit,
    },
};

const COLLECTIONS: &[&str] = &[
    "projects",
    "units",
    "chart_of_accounts",
    "bills",
    "payments",
    "general_ledger",
    "fixed_assets",
];

pub(super) async fn is_database_empty(db: &Database) -> Result<bool> {
    let chart = db.collection::<ChartAccount>("chart_of_accounts");
    let count = chart.estimated_document_count().await?;
    Ok(count == 0)
}

pub(super) fn load_json_array<T: DeserializeOwned>(
    env_key: &str,
    default_path: &str,
) -> Result<Vec<T>> {
    let path = env::var(env_key).unwrap_or_else(|_| default_path.to_string());
    if let Ok(contents) = fs::read_to_string(&path) {
        let parsed = serde_json::from_str::<Vec<T>>(&contents)
            .with_context(|| format!("invalid seed file {path}"))?;
        Ok(parsed)
    } else {
        tracing::debug!(%path, "seed file not found; skipping");
        Ok(Vec::new())
    }
}

pub(super) async fn ensure_collections(db: &Database) -> Result<()> {
    let existing = db.list_collection_names().await?;
    for name in COLLECTIONS {
        if !existing.iter().any(|n| n == name) {
            db.create_collection(*name).await?;
        }
    }
    Ok(())
}

pub(super) async fn ensure_indexes(db: &Database) -> Result<()> {
    db.collection::<ChartAccount>("chart_of_accounts")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "account_code": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    let ledger = db.collection::<LedgerEntry>("general_ledger");
    ledger
        .create_index(IndexModel::builder().keys(doc! { "journal_id": 1 }).build())
        .await?;
    ledger
        .create_index(
            IndexModel::builder()
                .keys(doc! { "project_id": 1, "transaction_date": 1 })
                .build(),
        )
        .await?;
    Ok(())
}

pub(super) async fn seed_chart_of_accounts(db: &Database) -> Result<()> {
    let chart: Vec<ChartAccount> =
        load_json_array("CHART_OF_ACCOUNTS_FILE", "./data/chart_of_accounts.json")?;
    if chart.is_empty() {
        return Ok(());
    }
    let now = DateTime::now();
    let rows: Vec<ChartAccount> = chart
        .into_iter()
        .map(|a| ChartAccount {
            id: None,
            created_at: Some(now),
            ..a
        })
        .collect();
    db.collection::<ChartAccount>("chart_of_accounts")
        .insert_many(rows)
        .await?;
    Ok(())
}

/// Inserts seed projects and returns their ids keyed by slug.
pub(super) async fn seed_projects(
    db: &Database,
    default_currency: &str,
) -> Result<HashMap<String, ObjectId>> {
    let seeds: Vec<SeedProject> = load_json_array("PROJECTS_FILE", "./data/projects.json")?;
    let projects = db.collection::<Project>("projects");

    let mut map = HashMap::new();
    for seed in seeds {
        let slug = seed.slug.clone().unwrap_or_else(|| slugify(&seed.name));
        // Insert if not exists
        let existing = projects
            .find_one(doc! { "slug": slug.clone() })
            .await?
            .and_then(|p| p.id);
        if let Some(id) = existing {
            map.insert(slug, id);
            continue;
        }
        let res = projects
            .insert_one(Project {
                id: None,
                name: seed.name,
                slug: slug.clone(),
                default_currency: seed
                    .default_currency
                    .unwrap_or_else(|| default_currency.to_string()),
                common_fee_rate: seed.common_fee_rate,
                is_active: true,
                created_at: Some(DateTime::now()),
                updated_at: None,
                notes: None,
            })
            .await?;
        let id = res
            .inserted_id
            .as_object_id()
            .context("project insert missing _id")?;
        map.insert(slug, id);
    }
    Ok(map)
}

pub(super) async fn seed_units(
    db: &Database,
    project_ids: &HashMap<String, ObjectId>,
) -> Result<()> {
    let seeds: Vec<SeedUnit> = load_json_array("UNITS_FILE", "./data/units.json")?;
    let units = db.collection::<Unit>("units");
    for seed in seeds {
        let project_id = *remap_slug(project_ids, &seed.project)?;
        units
            .insert_one(Unit {
                id: None,
                project_id,
                unit_number: seed.unit_number,
                owner_name: seed.owner_name,
                area_sqm: seed.area_sqm,
                is_occupied: seed.is_occupied,
                is_active: true,
                created_at: Some(DateTime::now()),
                updated_at: None,
                notes: None,
            })
            .await?;
    }
    Ok(())
}

pub(super) async fn seed_fixed_assets(
    db: &Database,
    project_ids: &HashMap<String, ObjectId>,
) -> Result<()> {
    let seeds: Vec<SeedAsset> = load_json_array("FIXED_ASSETS_FILE", "./data/fixed_assets.json")?;
    let assets = db.collection::<FixedAsset>("fixed_assets");
    for seed in seeds {
        let project_id = match seed.project.as_deref() {
            Some(slug) => Some(*remap_slug(project_ids, slug)?),
            None => None,
        };
        assets
            .insert_one(FixedAsset {
                id: None,
                project_id,
                name: seed.name,
                purchase_date: date_to_bson(seed.purchase_date),
                purchase_cost: seed.purchase_cost,
                salvage_value: seed.salvage_value,
                lifespan_months: seed.lifespan_months,
                accumulated_depreciation: 0.0,
                last_depreciation_date: None,
                expense_account_code: None,
                accumulated_account_code: None,
                is_active: true,
                created_at: Some(DateTime::now()),
                updated_at: None,
                notes: None,
            })
            .await?;
    }
    Ok(())
}

fn remap_slug<'a>(map: &'a HashMap<String, ObjectId>, slug: &str) -> Result<&'a ObjectId> {
    map.get(slug)
        .with_context(|| format!("seed references unknown project {slug}"))
}
