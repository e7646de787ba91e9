use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};

use crate::{error::LedgerError, models::Unit};

use super::{AppState, projects::require_project};

pub async fn list_units(state: &AppState, project_id: Option<&ObjectId>) -> Result<Vec<Unit>> {
    let mut filter = Document::new();
    if let Some(pid) = project_id {
        filter.insert("project_id", pid);
    }
    let mut cursor = state
        .units
        .find(filter)
        .sort(doc! { "unit_number": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(unit) = cursor.try_next().await? {
        items.push(unit);
    }
    Ok(items)
}

pub async fn get_unit_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Unit>> {
    state
        .units
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

fn validate_area(area_sqm: f64) -> Result<()> {
    if !area_sqm.is_finite() || area_sqm < 0.0 {
        bail!(LedgerError::Invalid("unit area must be a non-negative number".into()));
    }
    Ok(())
}

pub async fn create_unit(
    state: &AppState,
    project_id: &ObjectId,
    unit_number: &str,
    owner_name: Option<String>,
    area_sqm: f64,
    is_occupied: bool,
    notes: Option<String>,
) -> Result<ObjectId> {
    require_project(state, project_id).await?;
    validate_area(area_sqm)?;
    let unit_number = unit_number.trim();
    if unit_number.is_empty() {
        bail!(LedgerError::Invalid("unit number is required".into()));
    }
    if state
        .units
        .find_one(doc! { "project_id": project_id, "unit_number": unit_number })
        .await?
        .is_some()
    {
        bail!(LedgerError::Conflict(format!(
            "unit {unit_number} already exists in this project"
        )));
    }

    let res = state
        .units
        .insert_one(Unit {
            id: None,
            project_id: *project_id,
            unit_number: unit_number.to_string(),
            owner_name,
            area_sqm,
            is_occupied,
            is_active: true,
            created_at: Some(DateTime::now()),
            updated_at: None,
            notes,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("unit insert missing _id")
}

pub async fn update_unit(
    state: &AppState,
    id: &ObjectId,
    unit_number: &str,
    owner_name: Option<String>,
    area_sqm: f64,
    is_occupied: bool,
    is_active: bool,
    notes: Option<String>,
) -> Result<()> {
    get_unit_by_id(state, id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("unit {id}")))?;
    validate_area(area_sqm)?;

    state
        .units
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "unit_number": unit_number.trim(),
                "owner_name": owner_name,
                "area_sqm": area_sqm,
                "is_occupied": is_occupied,
                "is_active": is_active,
                "notes": notes,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    Ok(())
}

pub async fn delete_unit(state: &AppState, id: &ObjectId) -> Result<()> {
    let has_bills = state
        .bills
        .find_one(doc! { "unit_id": id })
        .await?
        .is_some();
    if has_bills {
        bail!(LedgerError::Conflict(
            "unit has bills; deactivate instead of deleting".into()
        ));
    }

    state.units.delete_one(doc! { "_id": id }).await?;
    Ok(())
}
