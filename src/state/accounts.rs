use anyhow::{Context, Result, bail};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, doc, oid::ObjectId};

use crate::{
    error::LedgerError,
    models::{AccountType, ChartAccount},
};

use super::AppState;

pub async fn list_accounts(state: &AppState) -> Result<Vec<ChartAccount>> {
    let mut cursor = state
        .chart_of_accounts
        .find(doc! {})
        .sort(doc! { "account_code": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(account) = cursor.try_next().await? {
        items.push(account);
    }
    Ok(items)
}

pub async fn get_account_by_id(state: &AppState, id: &ObjectId) -> Result<Option<ChartAccount>> {
    state
        .chart_of_accounts
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub async fn get_account_by_code(state: &AppState, code: &str) -> Result<Option<ChartAccount>> {
    state
        .chart_of_accounts
        .find_one(doc! { "account_code": code })
        .await
        .map_err(Into::into)
}

pub async fn create_account(
    state: &AppState,
    account_code: &str,
    name: &str,
    account_type: AccountType,
    parent_code: Option<String>,
    is_active: bool,
    description: Option<String>,
) -> Result<ObjectId> {
    let code = account_code.trim();
    if code.is_empty() || name.trim().is_empty() {
        bail!(LedgerError::Invalid("account code and name are required".into()));
    }
    if get_account_by_code(state, code).await?.is_some() {
        bail!(LedgerError::Conflict(format!("account code {code} already exists")));
    }

    let res = state
        .chart_of_accounts
        .insert_one(ChartAccount {
            id: None,
            account_code: code.to_string(),
            name: name.trim().to_string(),
            account_type,
            parent_code,
            is_active,
            description,
            created_at: Some(DateTime::now()),
            updated_at: None,
        })
        .await?;
    res.inserted_id
        .as_object_id()
        .context("account insert missing _id")
}

/// Updates name, type and flags. The code itself is immutable once ledger
/// rows may reference it.
pub async fn update_account(
    state: &AppState,
    id: &ObjectId,
    name: &str,
    account_type: AccountType,
    parent_code: Option<String>,
    is_active: bool,
    description: Option<String>,
) -> Result<()> {
    let existing = get_account_by_id(state, id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("account {id}")))?;

    if existing.account_type != account_type
        && has_ledger_rows(state, &existing.account_code).await?
    {
        bail!(LedgerError::Conflict(format!(
            "account {} has ledger rows; its type cannot change",
            existing.account_code
        )));
    }

    state
        .chart_of_accounts
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "name": name.trim(),
                "account_type": account_type.as_str(),
                "parent_code": parent_code,
                "is_active": is_active,
                "description": description,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    Ok(())
}

pub async fn delete_account(state: &AppState, id: &ObjectId) -> Result<()> {
    let Some(account) = get_account_by_id(state, id).await? else {
        return Ok(());
    };

    if has_ledger_rows(state, &account.account_code).await? {
        bail!(LedgerError::Conflict(
            "account has ledger rows; deactivate instead of deleting".into()
        ));
    }

    state.chart_of_accounts.delete_one(doc! { "_id": id }).await?;
    Ok(())
}

async fn has_ledger_rows(state: &AppState, account_code: &str) -> Result<bool> {
    Ok(state
        .general_ledger
        .find_one(doc! { "account_code": account_code })
        .await?
        .is_some())
}
