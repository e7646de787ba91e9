use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};

use crate::{
    error::LedgerError,
    ledger::{Journal, date_to_bson, round_money, to_cents},
    models::{BillStatus, Payment, PaymentMethod, ReferenceType},
};

use super::{
    AppState,
    bills::{recalculate_bill_status, require_bill},
    ledger::{post_journal, posted_journal_id, reverse_journal},
};

#[derive(Debug, Clone, Default)]
pub struct PaymentQuery {
    pub bill_id: Option<ObjectId>,
    pub project_id: Option<ObjectId>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub include_void: bool,
    pub unreconciled_only: bool,
}

impl PaymentQuery {
    fn to_filter(&self) -> Document {
        let mut filter = Document::new();
        if let Some(bill_id) = self.bill_id {
            filter.insert("bill_id", bill_id);
        }
        if let Some(pid) = self.project_id {
            filter.insert("project_id", pid);
        }
        let mut range = Document::new();
        if let Some(start) = self.start {
            range.insert("$gte", date_to_bson(start));
        }
        if let Some(end) = self.end {
            range.insert("$lte", date_to_bson(end));
        }
        if !range.is_empty() {
            filter.insert("payment_date", range);
        }
        if !self.include_void {
            filter.insert("is_void", false);
        }
        if self.unreconciled_only {
            filter.insert("is_reconciled", false);
        }
        filter
    }
}

pub async fn list_payments(state: &AppState, query: &PaymentQuery) -> Result<Vec<Payment>> {
    let mut cursor = state
        .payments
        .find(query.to_filter())
        .sort(doc! { "payment_date": 1, "created_at": 1 })
        .await?;
    let mut items = Vec::new();
    while let Some(payment) = cursor.try_next().await? {
        items.push(payment);
    }
    Ok(items)
}

pub async fn get_payment_by_id(state: &AppState, id: &ObjectId) -> Result<Option<Payment>> {
    state
        .payments
        .find_one(doc! { "_id": id })
        .await
        .map_err(Into::into)
}

async fn require_payment(state: &AppState, id: &ObjectId) -> Result<Payment> {
    get_payment_by_id(state, id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("payment {id}")).into())
}

/// Records a payment against a pending bill and posts Dr cash (or bank for
/// non-cash methods) / Cr receivable. The payment is removed again when the
/// journal cannot be written.
pub async fn record_payment(
    state: &AppState,
    bill_id: &ObjectId,
    amount: f64,
    method: PaymentMethod,
    payment_date: NaiveDate,
    reference: Option<String>,
) -> Result<ObjectId> {
    let bill = require_bill(state, bill_id).await?;
    if bill.status != BillStatus::Pending {
        bail!(LedgerError::Conflict(format!(
            "bill is {}; only pending bills accept payments",
            bill.status.as_str()
        )));
    }
    if !amount.is_finite() || to_cents(amount) <= 0 {
        bail!(LedgerError::Invalid("payment amount must be positive".into()));
    }
    let outstanding = bill.outstanding();
    if to_cents(amount) > to_cents(outstanding) {
        bail!(LedgerError::Invalid(format!(
            "payment {amount:.2} exceeds outstanding balance {outstanding:.2}"
        )));
    }
    let amount = round_money(amount);

    let res = state
        .payments
        .insert_one(Payment {
            id: None,
            bill_id: *bill_id,
            project_id: bill.project_id,
            amount,
            method,
            payment_date: date_to_bson(payment_date),
            reference: reference.clone(),
            is_reconciled: false,
            reconciled_at: None,
            bank_reference: None,
            is_void: false,
            void_reason: None,
            journal_id: None,
            created_at: Some(DateTime::now()),
            updated_at: None,
        })
        .await?;
    let payment_id = res
        .inserted_id
        .as_object_id()
        .context("payment insert missing _id")?;

    let accounts = &state.settings.accounts;
    let debit_code = match method {
        PaymentMethod::Cash => &accounts.cash,
        PaymentMethod::Transfer | PaymentMethod::Cheque | PaymentMethod::Card => &accounts.bank,
    };
    let description = match reference.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => format!("Payment {} for bill {} ({r})", method.as_str(), bill.billing_month),
        None => format!("Payment {} for bill {}", method.as_str(), bill.billing_month),
    };
    let journal = Journal::pair(
        payment_date,
        ReferenceType::Payment,
        description,
        debit_code,
        &accounts.receivable,
        amount,
    )
    .reference(Some(payment_id))
    .project(Some(bill.project_id));

    let journal_id = match post_journal(state, journal).await {
        Ok(journal_id) => journal_id,
        Err(err) => {
            tracing::warn!(
                payment_id = %payment_id,
                error = %err,
                "payment posting failed; removing payment"
            );
            state.payments.delete_one(doc! { "_id": payment_id }).await?;
            return Err(err);
        }
    };

    state
        .payments
        .update_one(
            doc! { "_id": payment_id },
            doc! { "$set": { "journal_id": journal_id } },
        )
        .await?;
    recalculate_bill_status(state, bill_id).await?;
    Ok(payment_id)
}

/// Marks a payment as matched to a bank statement line.
pub async fn reconcile_payment(
    state: &AppState,
    id: &ObjectId,
    bank_reference: &str,
    reconciled_on: Option<NaiveDate>,
) -> Result<()> {
    let payment = require_payment(state, id).await?;
    if payment.is_void {
        bail!(LedgerError::Conflict("void payments cannot be reconciled".into()));
    }
    if payment.is_reconciled {
        bail!(LedgerError::Conflict("payment is already reconciled".into()));
    }
    let bank_reference = bank_reference.trim();
    if bank_reference.is_empty() {
        bail!(LedgerError::Invalid("bank reference is required".into()));
    }
    let reconciled_on = reconciled_on.unwrap_or_else(|| Utc::now().date_naive());

    state
        .payments
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "is_reconciled": true,
                "reconciled_at": date_to_bson(reconciled_on),
                "bank_reference": bank_reference,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    Ok(())
}

/// Voids an unreconciled payment: posts the reversal, flags the payment and
/// re-derives the bill's status.
pub async fn void_payment(
    state: &AppState,
    id: &ObjectId,
    reason: &str,
    void_date: Option<NaiveDate>,
) -> Result<()> {
    let payment = require_payment(state, id).await?;
    if payment.is_void {
        bail!(LedgerError::Conflict("payment is already void".into()));
    }
    if payment.is_reconciled {
        bail!(LedgerError::Conflict(
            "reconciled payments cannot be voided".into()
        ));
    }
    let reason = reason.trim();
    if reason.is_empty() {
        bail!(LedgerError::Invalid("a void reason is required".into()));
    }

    let posted =
        posted_journal_id(state, payment.journal_id.as_deref(), ReferenceType::Payment, id)
            .await?;
    if let Some(journal_id) = posted {
        let date = void_date.unwrap_or_else(|| Utc::now().date_naive());
        reverse_journal(
            state,
            &journal_id,
            date,
            ReferenceType::PaymentVoid,
            &format!("Void payment: {reason}"),
        )
        .await?;
    }

    state
        .payments
        .update_one(
            doc! { "_id": id },
            doc! { "$set": {
                "is_void": true,
                "void_reason": reason,
                "updated_at": DateTime::now(),
            } },
        )
        .await?;
    recalculate_bill_status(state, &payment.bill_id).await?;
    tracing::info!(payment_id = %id, amount = payment.amount, "payment voided");
    Ok(())
}
