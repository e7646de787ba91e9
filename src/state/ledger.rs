use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};

use crate::{
    error::LedgerError,
    ledger::{
        AccountActivity, FinancialSummary, Journal, JournalImbalance, JournalLine, ReportPeriod,
        TrialBalance, account_activity, balance_of, date_to_bson, find_unbalanced_journals,
        summarize, trial_balance,
    },
    models::{LedgerEntry, ReferenceType},
};

use super::{AppState, accounts::list_accounts};

/// Filter for reading a slice of the general ledger. Bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct LedgerQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub project_id: Option<ObjectId>,
    pub account_code: Option<String>,
    pub journal_id: Option<String>,
}

impl LedgerQuery {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn project(mut self, project_id: Option<ObjectId>) -> Self {
        self.project_id = project_id;
        self
    }

    fn to_filter(&self) -> Document {
        let mut filter = Document::new();
        let mut range = Document::new();
        if let Some(start) = self.start {
            range.insert("$gte", date_to_bson(start));
        }
        if let Some(end) = self.end {
            range.insert("$lte", date_to_bson(end));
        }
        if !range.is_empty() {
            filter.insert("transaction_date", range);
        }
        if let Some(pid) = self.project_id {
            filter.insert("project_id", pid);
        }
        if let Some(code) = &self.account_code {
            filter.insert("account_code", code.as_str());
        }
        if let Some(journal_id) = &self.journal_id {
            filter.insert("journal_id", journal_id.as_str());
        }
        filter
    }
}

fn check_range(start: Option<NaiveDate>, end: NaiveDate) -> Result<()> {
    if let Some(start) = start {
        if start > end {
            bail!(LedgerError::Invalid(format!(
                "start date {start} is after end date {end}"
            )));
        }
    }
    Ok(())
}

pub async fn list_ledger_entries(
    state: &AppState,
    query: &LedgerQuery,
) -> Result<Vec<LedgerEntry>> {
    let mut cursor = state
        .general_ledger
        .find(query.to_filter())
        .sort(doc! { "transaction_date": 1, "created_at": 1, "_id": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(entry) = cursor.try_next().await? {
        items.push(entry);
    }
    Ok(items)
}

pub async fn journal_entries(state: &AppState, journal_id: &str) -> Result<Vec<LedgerEntry>> {
    list_ledger_entries(
        state,
        &LedgerQuery {
            journal_id: Some(journal_id.to_string()),
            ..Default::default()
        },
    )
    .await
}

async fn ensure_accounts_postable(state: &AppState, codes: &[String]) -> Result<()> {
    let mut cursor = state
        .chart_of_accounts
        .find(doc! { "account_code": { "$in": codes.to_vec() } })
        .await?;
    let mut active = HashMap::new();
    while let Some(account) = cursor.try_next().await? {
        active.insert(account.account_code, account.is_active);
    }

    for code in codes {
        match active.get(code) {
            None => bail!(LedgerError::UnknownAccount(code.clone())),
            Some(false) => bail!(LedgerError::InactiveAccount(code.clone())),
            Some(true) => {}
        }
    }
    Ok(())
}

/// Validates and writes every row of `journal`.
///
/// The rows go out in one `insert_many`. MongoDB gives no multi-document
/// atomicity without a replica-set transaction, so when the write fails any
/// rows that made it in are deleted again by `journal_id`.
pub async fn post_journal(state: &AppState, journal: Journal) -> Result<String> {
    journal.validate()?;
    ensure_accounts_postable(state, &journal.account_codes()).await?;

    let journal_id = journal.journal_id.clone();
    let reference_type = journal.reference_type;
    let amount = journal.total_debits();
    let entries = journal.into_entries(DateTime::now());

    if let Err(err) = state.general_ledger.insert_many(entries).await {
        if let Err(cleanup) = state
            .general_ledger
            .delete_many(doc! { "journal_id": &journal_id })
            .await
        {
            tracing::error!(%journal_id, error = %cleanup, "failed to remove partial journal");
        }
        return Err(err).context("failed to write journal");
    }

    tracing::info!(
        %journal_id,
        reference_type = reference_type.as_str(),
        amount,
        "journal posted"
    );
    Ok(journal_id)
}

/// Posts the mirror image of a stored journal and returns the new journal id.
pub async fn reverse_journal(
    state: &AppState,
    journal_id: &str,
    transaction_date: NaiveDate,
    reference_type: ReferenceType,
    description: &str,
) -> Result<String> {
    let entries = journal_entries(state, journal_id).await?;
    let original = Journal::from_entries(&entries)
        .ok_or_else(|| LedgerError::NotFound(format!("journal {journal_id}")))?;
    let mut reversal = original.reversed(transaction_date, reference_type, description);
    for line in &mut reversal.lines {
        line.description = Some(description.to_string());
    }
    post_journal(state, reversal).await
}

/// Journal id posted for a business document.
///
/// Prefers the id stored on the document. A document whose posting went out
/// but whose `journal_id` write failed is matched through `reference_id`.
pub async fn posted_journal_id(
    state: &AppState,
    stored: Option<&str>,
    reference_type: ReferenceType,
    reference_id: &ObjectId,
) -> Result<Option<String>> {
    if let Some(journal_id) = stored {
        return Ok(Some(journal_id.to_string()));
    }
    let found = state
        .general_ledger
        .find_one(doc! {
            "reference_type": reference_type.as_str(),
            "reference_id": reference_id,
        })
        .await?;
    if let Some(entry) = &found {
        tracing::warn!(
            journal_id = %entry.journal_id,
            %reference_id,
            "journal id missing on document; recovered from ledger"
        );
    }
    Ok(found.map(|entry| entry.journal_id))
}

/// Posts a balanced adjustment with arbitrary lines.
pub async fn post_manual_journal(
    state: &AppState,
    transaction_date: NaiveDate,
    description: &str,
    project_id: Option<ObjectId>,
    lines: Vec<JournalLine>,
) -> Result<String> {
    if description.trim().is_empty() {
        bail!(LedgerError::Invalid("journal description is required".into()));
    }
    let mut journal = Journal::new(transaction_date, ReferenceType::Manual, description.trim())
        .project(project_id);
    journal.lines = lines;
    post_journal(state, journal).await
}

pub async fn financial_summary(
    state: &AppState,
    start: NaiveDate,
    end: NaiveDate,
    project_id: Option<ObjectId>,
) -> Result<FinancialSummary> {
    check_range(Some(start), end)?;
    let entries =
        list_ledger_entries(state, &LedgerQuery::between(start, end).project(project_id)).await?;
    let chart = list_accounts(state).await?;
    Ok(summarize(
        &entries,
        &chart,
        ReportPeriod::between(start, end),
        project_id.map(|id| id.to_hex()),
    ))
}

/// Cumulative summary of every row up to and including `as_of`.
pub async fn balance_sheet(
    state: &AppState,
    as_of: NaiveDate,
    project_id: Option<ObjectId>,
) -> Result<FinancialSummary> {
    let query = LedgerQuery {
        end: Some(as_of),
        project_id,
        ..Default::default()
    };
    let entries = list_ledger_entries(state, &query).await?;
    let chart = list_accounts(state).await?;
    Ok(summarize(
        &entries,
        &chart,
        ReportPeriod::as_of(as_of),
        project_id.map(|id| id.to_hex()),
    ))
}

pub async fn trial_balance_for(
    state: &AppState,
    start: Option<NaiveDate>,
    end: NaiveDate,
    project_id: Option<ObjectId>,
) -> Result<TrialBalance> {
    check_range(start, end)?;
    let query = LedgerQuery {
        start,
        end: Some(end),
        project_id,
        ..Default::default()
    };
    let entries = list_ledger_entries(state, &query).await?;
    let chart = list_accounts(state).await?;
    Ok(trial_balance(&entries, &chart, ReportPeriod { start, end }))
}

/// Movements of one account between `start` and `end`, opening with the
/// balance of every earlier row.
pub async fn account_ledger(
    state: &AppState,
    account_code: &str,
    start: NaiveDate,
    end: NaiveDate,
    project_id: Option<ObjectId>,
) -> Result<AccountActivity> {
    check_range(Some(start), end)?;
    let account = super::accounts::get_account_by_code(state, account_code)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("account {account_code}")))?;

    let before = LedgerQuery {
        end: Some(start - Duration::days(1)),
        project_id,
        account_code: Some(account_code.to_string()),
        ..Default::default()
    };
    let opening_rows = list_ledger_entries(state, &before).await?;
    let opening = balance_of(account_code, account.account_type, &opening_rows);

    let during = LedgerQuery {
        account_code: Some(account_code.to_string()),
        ..LedgerQuery::between(start, end).project(project_id)
    };
    let rows = list_ledger_entries(state, &during).await?;
    Ok(account_activity(&account, opening, &rows))
}

/// Journals in the window whose rows do not balance.
pub async fn audit_journals(
    state: &AppState,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<JournalImbalance>> {
    let query = LedgerQuery {
        start,
        end,
        ..Default::default()
    };
    let entries = list_ledger_entries(state, &query).await?;
    let report = find_unbalanced_journals(&entries);
    if !report.is_empty() {
        tracing::warn!(count = report.len(), "unbalanced journals found");
    }
    Ok(report)
}
