use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};

use crate::{
    error::LedgerError,
    ledger::{
        Journal, bson_to_date, date_to_bson, from_cents, month_bounds, round_money, to_cents,
    },
    models::{Bill, BillStatus, ReferenceType},
};

use super::{
    AppState,
    ledger::{post_journal, posted_journal_id, reverse_journal},
    projects::require_project,
    units::{get_unit_by_id, list_units},
};

#[derive(Debug, Clone, Default)]
pub struct BillQuery {
    pub project_id: Option<ObjectId>,
    pub unit_id: Option<ObjectId>,
    pub status: Option<BillStatus>,
    pub billing_month: Option<String>,
}

/// Outcome of a common-fee billing run for one project and month.
#[derive(Debug, Clone, Default)]
pub struct CommonFeeRun {
    pub billing_month: String,
    pub created: Vec<ObjectId>,
    pub skipped_units: Vec<String>,
    pub total_billed: f64,
}

pub fn is_overdue(bill: &Bill, today: NaiveDate) -> bool {
    matches!(bill.status, BillStatus::Pending)
        && bill.due_date.is_some_and(|due| bson_to_date(due) < today)
}

pub async fn list_bills(state: &AppState, query: &BillQuery) -> Result<Vec<Bill>> {
    let mut filter = Document::new();
    if let Some(pid) = query.project_id {
        filter.insert("project_id", pid);
    }
    if let Some(uid) = query.unit_id {
        filter.insert("unit_id", uid);
    }
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }
    if let Some(month) = &query.billing_month {
        filter.insert("billing_month", month.as_str());
    }

    let mut cursor = state
        .bills
        .find(filter)
        .sort(doc! { "billing_month": 1, "issue_date": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(bill) = cursor.try_next().await? {
        items.push(bill);
    }
    Ok(items)
}

pub async fn get_bill_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Bill>> {
    state
        .bills
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

pub(super) async fn require_bill(state: &AppState, id: &ObjectId) -> Result<Bill> {
    get_bill_by_id(state, id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("bill {id}")).into())
}

/// Inserts a pending bill and posts Dr receivable / Cr common-fee revenue.
/// The bill is removed again when the journal cannot be written.
pub async fn create_bill(
    state: &AppState,
    project_id: &ObjectId,
    unit_id: &ObjectId,
    billing_month: &str,
    total: f64,
    issue_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    description: Option<String>,
) -> Result<ObjectId> {
    let billing_month = billing_month.trim();
    let (month_start, month_end) = month_bounds(billing_month).ok_or_else(|| {
        LedgerError::Invalid(format!("billing month {billing_month} must be YYYY-MM"))
    })?;
    if !total.is_finite() || to_cents(total) <= 0 {
        bail!(LedgerError::Invalid("bill total must be positive".into()));
    }

    let project = require_project(state, project_id).await?;
    if !project.is_active {
        bail!(LedgerError::Invalid(format!("project {} is inactive", project.name)));
    }
    let unit = get_unit_by_id(state, unit_id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("unit {unit_id}")))?;
    if unit.project_id != *project_id {
        bail!(LedgerError::Invalid("unit belongs to another project".into()));
    }
    if !unit.is_active {
        bail!(LedgerError::Invalid(format!("unit {} is inactive", unit.unit_number)));
    }

    let duplicate = state
        .bills
        .find_one(doc! {
            "unit_id": unit_id,
            "billing_month": billing_month,
            "status": { "$ne": BillStatus::Cancelled.as_str() },
        })
        .await?;
    if duplicate.is_some() {
        bail!(LedgerError::Conflict(format!(
            "unit {} already billed for {billing_month}",
            unit.unit_number
        )));
    }

    let issue_date = issue_date.unwrap_or(month_start);
    let due_date = due_date.unwrap_or(month_end);
    if due_date < issue_date {
        bail!(LedgerError::Invalid("due date is before issue date".into()));
    }
    let description = description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("Common fee {billing_month} unit {}", unit.unit_number));
    let total = round_money(total);

    let res = state
        .bills
        .insert_one(Bill {
            id: None,
            project_id: *project_id,
            unit_id: *unit_id,
            billing_month: billing_month.to_string(),
            total,
            paid_amount: 0.0,
            status: BillStatus::Pending,
            issue_date: date_to_bson(issue_date),
            due_date: Some(date_to_bson(due_date)),
            description: description.clone(),
            journal_id: None,
            cancelled_reason: None,
            created_at: Some(DateTime::now()),
            updated_at: None,
        })
        .await?;
    let bill_id = res
        .inserted_id
        .as_object_id()
        .context("bill insert missing _id")?;

    let accounts = &state.settings.accounts;
    let journal = Journal::pair(
        issue_date,
        ReferenceType::Bill,
        description,
        &accounts.receivable,
        &accounts.common_fee_revenue,
        total,
    )
    .reference(Some(bill_id))
    .project(Some(*project_id));

    match post_journal(state, journal).await {
        Ok(journal_id) => {
            state
                .bills
                .update_one(
                    doc! { "_id": bill_id },
                    doc! { "$set": { "journal_id": journal_id } },
                )
                .await?;
            Ok(bill_id)
        }
        Err(err) => {
            tracing::warn!(bill_id = %bill_id, error = %err, "bill posting failed; removing bill");
            state.bills.delete_one(doc! { "_id": bill_id }).await?;
            Err(err)
        }
    }
}

/// Bills every active unit of the project for `billing_month` at
/// `area_sqm * common_fee_rate`. Units already billed or with no fee are skipped.
pub async fn generate_common_fee_bills(
    state: &AppState,
    project_id: &ObjectId,
    billing_month: &str,
) -> Result<CommonFeeRun> {
    let project = require_project(state, project_id).await?;
    let billing_month = billing_month.trim();
    if month_bounds(billing_month).is_none() {
        bail!(LedgerError::Invalid(format!(
            "billing month {billing_month} must be YYYY-MM"
        )));
    }

    let mut run = CommonFeeRun {
        billing_month: billing_month.to_string(),
        ..Default::default()
    };
    let mut billed_cents = 0_i64;

    for unit in list_units(state, Some(project_id)).await? {
        let Some(unit_id) = unit.id else { continue };
        let fee = round_money(unit.area_sqm * project.common_fee_rate);
        if !unit.is_active || to_cents(fee) <= 0 {
            run.skipped_units.push(unit.unit_number);
            continue;
        }

        let created =
            create_bill(state, project_id, &unit_id, billing_month, fee, None, None, None).await;
        match created {
            Ok(bill_id) => {
                billed_cents += to_cents(fee);
                run.created.push(bill_id);
            }
            Err(err)
                if matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::Conflict(_))) =>
            {
                run.skipped_units.push(unit.unit_number);
            }
            Err(err) => return Err(err),
        }
    }

    run.total_billed = from_cents(billed_cents);
    tracing::info!(
        project = %project.slug,
        month = %run.billing_month,
        created = run.created.len(),
        skipped = run.skipped_units.len(),
        total = run.total_billed,
        "common fee billing run finished"
    );
    Ok(run)
}

/// Cancels a pending bill with no payments and reverses its journal.
pub async fn cancel_bill(
    state: &AppState,
    id: &ObjectId,
    reason: &str,
    cancel_date: Option<NaiveDate>,
) -> Result<()> {
    let bill = require_bill(state, id).await?;
    match bill.status {
        BillStatus::Cancelled => bail!(LedgerError::Conflict("bill is already cancelled".into())),
        BillStatus::Paid => bail!(LedgerError::Conflict("paid bills cannot be cancelled".into())),
        BillStatus::Pending => {}
    }
    let has_payments = state
        .payments
        .find_one(doc! { "bill_id": id, "is_void": false })
        .await?
        .is_some();
    if has_payments {
        bail!(LedgerError::Conflict(
            "bill has payments; void them before cancelling".into()
        ));
    }

    let posted =
        posted_journal_id(state, bill.journal_id.as_deref(), ReferenceType::Bill, id).await?;
    if let Some(journal_id) = posted {
        let date = cancel_date.unwrap_or_else(|| Utc::now().date_naive());
        reverse_journal(
            state,
            &journal_id,
            date,
            ReferenceType::BillCancellation,
            &format!("Cancel bill {} {}", bill.billing_month, reason.trim()),
        )
        .await?;
    }

    state
        .bills
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "status": BillStatus::Cancelled.as_str(),
                "cancelled_reason": reason.trim(),
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    tracing::info!(bill_id = %id, "bill cancelled");
    Ok(())
}

/// Re-derives `paid_amount` and status from the bill's non-void payments.
pub async fn recalculate_bill_status(state: &AppState, id: &ObjectId) -> Result<()> {
    let bill = match get_bill_by_id(state, id).await? {
        Some(bill) => bill,
        None => return Ok(()),
    };

    if matches!(bill.status, BillStatus::Cancelled) {
        return Ok(());
    }

    let mut paid = 0_i64;
    let mut cursor = state
        .payments
        .find(doc! { "bill_id": id, "is_void": false })
        .await?;
    while let Some(payment) = cursor.try_next().await? {
        paid += to_cents(payment.amount);
    }

    let status = if paid >= to_cents(bill.total) {
        BillStatus::Paid
    } else {
        BillStatus::Pending
    };
    let paid_amount = from_cents(paid);

    if status != bill.status || to_cents(bill.paid_amount) != paid {
        state
            .bills
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "status": status.as_str(),
                    "paid_amount": paid_amount,
                    "updated_at": DateTime::now(),
                } },
            )
            .await?;
    }

    Ok(())
}
