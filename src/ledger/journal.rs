use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::LedgerError,
    models::{LedgerEntry, ReferenceType},
};

use super::{date_to_bson, from_cents, to_cents};

/// One side of a journal. Exactly one of `debit` / `credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    pub account_code: String,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
    #[serde(default)]
    pub description: Option<String>,
}

impl JournalLine {
    pub fn debit(account_code: impl Into<String>, amount: f64) -> Self {
        Self {
            account_code: account_code.into(),
            debit: amount,
            credit: 0.0,
            description: None,
        }
    }

    pub fn credit(account_code: impl Into<String>, amount: f64) -> Self {
        Self {
            account_code: account_code.into(),
            debit: 0.0,
            credit: amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The rows written for a single business event.
#[derive(Debug, Clone)]
pub struct Journal {
    pub journal_id: String,
    pub transaction_date: NaiveDate,
    pub reference_type: ReferenceType,
    pub reference_id: Option<ObjectId>,
    pub project_id: Option<ObjectId>,
    pub description: String,
    pub lines: Vec<JournalLine>,
}

impl Journal {
    pub fn new(
        transaction_date: NaiveDate,
        reference_type: ReferenceType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            journal_id: Uuid::new_v4().to_string(),
            transaction_date,
            reference_type,
            reference_id: None,
            project_id: None,
            description: description.into(),
            lines: Vec::new(),
        }
    }

    /// Debit one account and credit another for the same amount.
    pub fn pair(
        transaction_date: NaiveDate,
        reference_type: ReferenceType,
        description: impl Into<String>,
        debit_code: &str,
        credit_code: &str,
        amount: f64,
    ) -> Self {
        Self::new(transaction_date, reference_type, description)
            .line(JournalLine::debit(debit_code, amount))
            .line(JournalLine::credit(credit_code, amount))
    }

    pub fn reference(mut self, reference_id: Option<ObjectId>) -> Self {
        self.reference_id = reference_id;
        self
    }

    pub fn project(mut self, project_id: Option<ObjectId>) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn line(mut self, line: JournalLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn total_debit_cents(&self) -> i64 {
        self.lines.iter().map(|l| to_cents(l.debit)).sum()
    }

    pub fn total_credit_cents(&self) -> i64 {
        self.lines.iter().map(|l| to_cents(l.credit)).sum()
    }

    pub fn total_debits(&self) -> f64 {
        from_cents(self.total_debit_cents())
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.lines.len() < 2 {
            return Err(LedgerError::EmptyJournal);
        }

        for line in &self.lines {
            let invalid = |reason: &str| LedgerError::InvalidLine {
                account_code: line.account_code.clone(),
                reason: reason.to_string(),
            };
            if line.account_code.trim().is_empty() {
                return Err(invalid("missing account code"));
            }
            if !line.debit.is_finite() || !line.credit.is_finite() {
                return Err(invalid("amount is not a number"));
            }
            if line.debit < 0.0 || line.credit < 0.0 {
                return Err(invalid("negative amount"));
            }
            match (to_cents(line.debit), to_cents(line.credit)) {
                (0, 0) => return Err(invalid("zero amount")),
                (d, c) if d > 0 && c > 0 => return Err(invalid("both debit and credit set")),
                _ => {}
            }
        }

        let debits = self.total_debit_cents();
        let credits = self.total_credit_cents();
        if debits != credits {
            return Err(LedgerError::UnbalancedJournal {
                debits: from_cents(debits),
                credits: from_cents(credits),
            });
        }
        Ok(())
    }

    pub fn account_codes(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| l.account_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Mirror journal that cancels this one: every debit becomes a credit and
    /// vice versa. It keeps the reference and project but gets a fresh id.
    pub fn reversed(
        &self,
        transaction_date: NaiveDate,
        reference_type: ReferenceType,
        description: impl Into<String>,
    ) -> Journal {
        let mut reversal = Journal::new(transaction_date, reference_type, description)
            .reference(self.reference_id)
            .project(self.project_id);
        reversal.lines = self
            .lines
            .iter()
            .map(|l| JournalLine {
                account_code: l.account_code.clone(),
                debit: l.credit,
                credit: l.debit,
                description: l.description.clone(),
            })
            .collect();
        reversal
    }

    /// Rebuilds a journal from its stored rows.
    pub fn from_entries(entries: &[LedgerEntry]) -> Option<Journal> {
        let first = entries.first()?;
        Some(Journal {
            journal_id: first.journal_id.clone(),
            transaction_date: super::bson_to_date(first.transaction_date),
            reference_type: first.reference_type,
            reference_id: first.reference_id,
            project_id: first.project_id,
            description: first.description.clone(),
            lines: entries
                .iter()
                .map(|e| JournalLine {
                    account_code: e.account_code.clone(),
                    debit: e.debit,
                    credit: e.credit,
                    description: Some(e.description.clone()),
                })
                .collect(),
        })
    }

    pub fn into_entries(self, created_at: DateTime) -> Vec<LedgerEntry> {
        let transaction_date = date_to_bson(self.transaction_date);
        self.lines
            .into_iter()
            .map(|line| LedgerEntry {
                id: None,
                journal_id: self.journal_id.clone(),
                account_code: line.account_code,
                debit: super::round_money(line.debit),
                credit: super::round_money(line.credit),
                transaction_date,
                description: line
                    .description
                    .unwrap_or_else(|| self.description.clone()),
                reference_type: self.reference_type,
                reference_id: self.reference_id,
                project_id: self.project_id,
                created_at: Some(created_at),
            })
            .collect()
    }
}

/// A stored journal whose rows do not balance.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JournalImbalance {
    pub journal_id: String,
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    pub line_count: usize,
    pub total_debit: f64,
    pub total_credit: f64,
}

/// Groups rows by `journal_id` and reports each group that does not balance,
/// including journals left with a single row by an interrupted write.
pub fn find_unbalanced_journals(entries: &[LedgerEntry]) -> Vec<JournalImbalance> {
    let mut groups: BTreeMap<&str, Vec<&LedgerEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.journal_id.as_str()).or_default().push(entry);
    }

    groups
        .into_iter()
        .filter_map(|(journal_id, rows)| {
            let debit: i64 = rows.iter().map(|r| to_cents(r.debit)).sum();
            let credit: i64 = rows.iter().map(|r| to_cents(r.credit)).sum();
            if debit == credit && rows.len() >= 2 {
                return None;
            }
            let first = rows[0];
            Some(JournalImbalance {
                journal_id: journal_id.to_string(),
                reference_type: first.reference_type,
                reference_id: first.reference_id.map(|id| id.to_hex()),
                line_count: rows.len(),
                total_debit: from_cents(debit),
                total_credit: from_cents(credit),
            })
        })
        .collect()
}
