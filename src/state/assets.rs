use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};
use serde::Serialize;

use crate::{
    error::LedgerError,
    ledger::{Journal, date_to_bson, from_cents, pending_depreciation, to_cents},
    models::{FixedAsset, ReferenceType},
};

use super::{AppState, ledger::post_journal, projects::require_project};

/// Result of one depreciation batch.
#[derive(Debug, Clone, Serialize)]
pub struct DepreciationReport {
    pub as_of: NaiveDate,
    pub assets_processed: usize,
    pub journals_posted: usize,
    pub total_amount: f64,
    pub failures: Vec<DepreciationFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepreciationFailure {
    pub asset_id: String,
    pub name: String,
    pub error: String,
}

pub async fn list_assets(
    state: &AppState,
    project_id: Option<&ObjectId>,
) -> Result<Vec<FixedAsset>> {
    let mut filter = Document::new();
    if let Some(pid) = project_id {
        filter.insert("project_id", pid);
    }
    let mut cursor = state
        .fixed_assets
        .find(filter)
        .sort(doc! { "purchase_date": 1, "name": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(asset) = cursor.try_next().await? {
        items.push(asset);
    }
    Ok(items)
}

pub async fn get_asset_by_id(state: &AppState, id: &ObjectId) -> Result<Option<FixedAsset>> {
    state
        .fixed_assets
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

fn validate_terms(purchase_cost: f64, salvage_value: f64, lifespan_months: i32) -> Result<()> {
    if !purchase_cost.is_finite() || purchase_cost <= 0.0 {
        bail!(LedgerError::Invalid("purchase cost must be positive".into()));
    }
    if !salvage_value.is_finite() || salvage_value < 0.0 {
        bail!(LedgerError::Invalid("salvage value cannot be negative".into()));
    }
    if salvage_value > purchase_cost {
        bail!(LedgerError::Invalid(
            "salvage value cannot exceed purchase cost".into()
        ));
    }
    if lifespan_months <= 0 {
        bail!(LedgerError::Invalid("lifespan must be at least one month".into()));
    }
    Ok(())
}

pub async fn create_asset(
    state: &AppState,
    project_id: Option<ObjectId>,
    name: &str,
    purchase_date: NaiveDate,
    purchase_cost: f64,
    salvage_value: f64,
    lifespan_months: i32,
    expense_account_code: Option<String>,
    accumulated_account_code: Option<String>,
    notes: Option<String>,
) -> Result<ObjectId> {
    if name.trim().is_empty() {
        bail!(LedgerError::Invalid("asset name is required".into()));
    }
    validate_terms(purchase_cost, salvage_value, lifespan_months)?;
    if let Some(pid) = &project_id {
        require_project(state, pid).await?;
    }

    let res = state
        .fixed_assets
        .insert_one(FixedAsset {
            id: None,
            project_id,
            name: name.trim().to_string(),
            purchase_date: date_to_bson(purchase_date),
            purchase_cost,
            salvage_value,
            lifespan_months,
            accumulated_depreciation: 0.0,
            last_depreciation_date: None,
            expense_account_code,
            accumulated_account_code,
            is_active: true,
            created_at: Some(DateTime::now()),
            updated_at: None,
            notes,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("asset insert missing _id")
}

/// Updates descriptive fields. Cost terms are frozen once depreciation has
/// been posted, since earlier charges were computed from them.
pub async fn update_asset(
    state: &AppState,
    id: &ObjectId,
    name: &str,
    purchase_cost: f64,
    salvage_value: f64,
    lifespan_months: i32,
    is_active: bool,
    notes: Option<String>,
) -> Result<()> {
    let asset = get_asset_by_id(state, id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("asset {id}")))?;
    validate_terms(purchase_cost, salvage_value, lifespan_months)?;

    let terms_changed = to_cents(asset.purchase_cost) != to_cents(purchase_cost)
        || to_cents(asset.salvage_value) != to_cents(salvage_value)
        || asset.lifespan_months != lifespan_months;
    if terms_changed && asset.last_depreciation_date.is_some() {
        bail!(LedgerError::Conflict(
            "depreciation already posted; cost terms are locked".into()
        ));
    }

    state
        .fixed_assets
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "name": name.trim(),
                "purchase_cost": purchase_cost,
                "salvage_value": salvage_value,
                "lifespan_months": lifespan_months,
                "is_active": is_active,
                "notes": notes,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    Ok(())
}

pub async fn delete_asset(state: &AppState, id: &ObjectId) -> Result<()> {
    let Some(asset) = get_asset_by_id(state, id).await? else {
        return Ok(());
    };

    if asset.last_depreciation_date.is_some() {
        state
            .fixed_assets
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "is_active": false, "updated_at": DateTime::now() } },
            )
            .await?;
        return Ok(());
    }

    state.fixed_assets.delete_one(doc! { "_id": id }).await?;
    Ok(())
}

/// Posts every month-end charge due up to `as_of` for all active assets.
///
/// The asset row is advanced after each posted period, so a run that stops
/// part way resumes from the last posted month. A failing asset is reported
/// and the batch carries on with the next one.
pub async fn run_depreciation(state: &AppState, as_of: NaiveDate) -> Result<DepreciationReport> {
    let mut cursor = state.fixed_assets.find(doc! { "is_active": true }).await?;
    let mut assets = Vec::new();
    while let Some(asset) = cursor.try_next().await? {
        assets.push(asset);
    }

    let mut report = DepreciationReport {
        as_of,
        assets_processed: 0,
        journals_posted: 0,
        total_amount: 0.0,
        failures: Vec::new(),
    };
    let mut total_cents = 0_i64;

    for asset in &assets {
        let Some(asset_id) = asset.id else { continue };
        report.assets_processed += 1;

        match depreciate_asset(state, asset, &asset_id, as_of).await {
            Ok((posted, cents)) => {
                report.journals_posted += posted;
                total_cents += cents;
            }
            Err(err) => {
                tracing::error!(
                    asset_id = %asset_id,
                    name = %asset.name,
                    error = %err,
                    "depreciation failed"
                );
                report.failures.push(DepreciationFailure {
                    asset_id: asset_id.to_hex(),
                    name: asset.name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    report.total_amount = from_cents(total_cents);
    tracing::info!(
        %as_of,
        assets = report.assets_processed,
        journals = report.journals_posted,
        total = report.total_amount,
        failures = report.failures.len(),
        "depreciation run finished"
    );
    Ok(report)
}

async fn depreciate_asset(
    state: &AppState,
    asset: &FixedAsset,
    asset_id: &ObjectId,
    as_of: NaiveDate,
) -> Result<(usize, i64)> {
    let accounts = &state.settings.accounts;
    let expense_code = asset
        .expense_account_code
        .as_deref()
        .unwrap_or(&accounts.depreciation_expense);
    let accumulated_code = asset
        .accumulated_account_code
        .as_deref()
        .unwrap_or(&accounts.accumulated_depreciation);

    let mut accumulated = to_cents(asset.accumulated_depreciation);
    let mut posted = 0;
    let mut posted_cents = 0_i64;

    for period in pending_depreciation(asset, as_of) {
        let journal = Journal::pair(
            period.period_end,
            ReferenceType::Depreciation,
            format!("Depreciation {} {}", asset.name, period.period_end.format("%Y-%m")),
            expense_code,
            accumulated_code,
            period.amount,
        )
        .reference(Some(*asset_id))
        .project(asset.project_id);
        post_journal(state, journal).await?;

        accumulated += to_cents(period.amount);
        state
            .fixed_assets
            .update_one(
                doc! { "_id": asset_id },
                doc! { "$set": {
                    "accumulated_depreciation": from_cents(accumulated),
                    "last_depreciation_date": date_to_bson(period.period_end),
                    "updated_at": DateTime::now(),
                } },
            )
            .await?;
        posted += 1;
        posted_cents += to_cents(period.amount);
    }

    Ok((posted, posted_cents))
}
