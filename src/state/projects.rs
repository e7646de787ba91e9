use anyhow::{Context, Result};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};
use slug::slugify;

use crate::{error::LedgerError, models::Project};

use super::AppState;

pub async fn list_projects(state: &AppState) -> Result<Vec<Project>> {
    let mut cursor = state.projects.find(doc! {}).sort(doc! { "name": 1 }).await?;
    let mut projects = Vec::new();
    while let Some(project) = cursor.try_next().await? {
        projects.push(project);
    }
    Ok(projects)
}

pub async fn get_project_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Project>> {
    state
        .projects
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub(super) async fn require_project(state: &AppState, id: &ObjectId) -> Result<Project> {
    get_project_by_id(state, id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("project {id}")).into())
}

pub async fn create_project(
    state: &AppState,
    name: &str,
    slug: &str,
    default_currency: &str,
    common_fee_rate: f64,
    is_active: bool,
    notes: Option<String>,
) -> Result<ObjectId> {
    if name.trim().is_empty() {
        return Err(LedgerError::Invalid("project name is required".into()).into());
    }
    if common_fee_rate < 0.0 {
        return Err(LedgerError::Invalid("common fee rate cannot be negative".into()).into());
    }

    let slug = if slug.trim().is_empty() {
        slugify(name)
    } else {
        slug.trim().to_string()
    };
    if state.projects.find_one(doc! { "slug": &slug }).await?.is_some() {
        return Err(LedgerError::Conflict(format!("project slug {slug} already exists")).into());
    }

    let currency = if default_currency.trim().is_empty() {
        state.settings.default_currency.clone()
    } else {
        default_currency.trim().to_string()
    };

    let res = state
        .projects
        .insert_one(Project {
            id: None,
            name: name.trim().to_string(),
            slug,
            default_currency: currency,
            common_fee_rate,
            is_active,
            created_at: Some(DateTime::now()),
            updated_at: None,
            notes,
        })
        .await?;

    res.inserted_id
        .as_object_id()
        .context("project insert missing _id")
}

pub async fn update_project(
    state: &AppState,
    id: &ObjectId,
    name: &str,
    slug: &str,
    default_currency: &str,
    common_fee_rate: f64,
    is_active: bool,
    notes: Option<String>,
) -> Result<()> {
    require_project(state, id).await?;
    if name.trim().is_empty() {
        return Err(LedgerError::Invalid("project name is required".into()).into());
    }
    if common_fee_rate < 0.0 {
        return Err(LedgerError::Invalid("common fee rate cannot be negative".into()).into());
    }

    let slug = if slug.trim().is_empty() {
        slugify(name)
    } else {
        slug.trim().to_string()
    };
    let taken = state
        .projects
        .find_one(doc! { "slug": &slug, "_id": { "$ne": id } })
        .await?;
    if taken.is_some() {
        return Err(LedgerError::Conflict(format!("project slug {slug} already exists")).into());
    }

    let currency = if default_currency.trim().is_empty() {
        state.settings.default_currency.clone()
    } else {
        default_currency.trim().to_string()
    };

    state
        .projects
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "name": name.trim(),
                "slug": slug,
                "default_currency": currency,
                "common_fee_rate": common_fee_rate,
                "is_active": is_active,
                "notes": notes,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;

    Ok(())
}

/// Deletes the project, or only deactivates it when units, bills, assets or
/// ledger rows still point at it.
pub async fn delete_project(state: &AppState, id: &ObjectId) -> Result<()> {
    let has_dependents = state
        .units
        .find_one(doc! { "project_id": id })
        .await?
        .is_some()
        || state
            .bills
            .find_one(doc! { "project_id": id })
            .await?
            .is_some()
        || state
            .fixed_assets
            .find_one(doc! { "project_id": id })
            .await?
            .is_some()
        || state
            .general_ledger
            .find_one(doc! { "project_id": id })
            .await?
            .is_some();

    if has_dependents {
        state
            .projects
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "is_active": false,
                    "updated_at": DateTime::now(),
                } },
            )
            .await?;
        return Ok(());
    }

    state.projects.delete_one(doc! { "_id": id }).await?;
    Ok(())
}
