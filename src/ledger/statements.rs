use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{AccountType, ChartAccount, LedgerEntry, ReferenceType};

use super::{bson_to_date, from_cents, to_cents};

/// Balance of an account in its natural direction: debit-normal accounts
/// (asset, expense) report `debit - credit`, the others `credit - debit`.
pub fn signed_balance(account_type: AccountType, debit: f64, credit: f64) -> f64 {
    from_cents(signed_cents(account_type, to_cents(debit), to_cents(credit)))
}

fn signed_cents(account_type: AccountType, debit: i64, credit: i64) -> i64 {
    if account_type.is_debit_normal() {
        debit - credit
    } else {
        credit - debit
    }
}

/// Date window a report covers. `start == None` means "since the first row".
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ReportPeriod {
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
}

impl ReportPeriod {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end,
        }
    }

    pub fn as_of(end: NaiveDate) -> Self {
        Self { start: None, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date <= self.end && self.start.is_none_or(|s| date >= s)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountBalance {
    pub account_code: String,
    pub account_name: String,
    pub account_type: Option<AccountType>,
    pub total_debit: f64,
    pub total_credit: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SectionSummary {
    pub total: f64,
    pub accounts: Vec<AccountBalance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialSummary {
    pub period: ReportPeriod,
    pub project_id: Option<String>,
    pub revenue: SectionSummary,
    pub expenses: SectionSummary,
    pub assets: SectionSummary,
    pub liabilities: SectionSummary,
    pub equity: SectionSummary,
    pub net_income: f64,
    /// Rows whose account code is missing from the chart of accounts.
    pub unclassified: Vec<AccountBalance>,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialBalance {
    pub period: ReportPeriod,
    pub rows: Vec<AccountBalance>,
    pub total_debit: f64,
    pub total_credit: f64,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivityLine {
    pub transaction_date: NaiveDate,
    pub description: String,
    pub journal_id: String,
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    pub debit: f64,
    pub credit: f64,
    pub running_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountActivity {
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub opening_balance: f64,
    pub lines: Vec<ActivityLine>,
    pub closing_balance: f64,
}

// Debit and credit cents per account code, ordered by code.
fn totals_by_account<'a>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
) -> BTreeMap<&'a str, (i64, i64)> {
    let mut totals: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for entry in entries {
        let slot = totals.entry(entry.account_code.as_str()).or_default();
        slot.0 += to_cents(entry.debit);
        slot.1 += to_cents(entry.credit);
    }
    totals
}

fn account_balance(
    code: &str,
    account: Option<&ChartAccount>,
    debit: i64,
    credit: i64,
) -> AccountBalance {
    let balance = match account {
        Some(a) => signed_cents(a.account_type, debit, credit),
        None => debit - credit,
    };
    AccountBalance {
        account_code: code.to_string(),
        account_name: account.map(|a| a.name.clone()).unwrap_or_default(),
        account_type: account.map(|a| a.account_type),
        total_debit: from_cents(debit),
        total_credit: from_cents(credit),
        balance: from_cents(balance),
    }
}

fn section(accounts: Vec<AccountBalance>) -> SectionSummary {
    let total = accounts.iter().map(|a| to_cents(a.balance)).sum();
    SectionSummary {
        total: from_cents(total),
        accounts,
    }
}

/// Sums the rows inside `period` per account and groups them into the five
/// statement sections using the sign convention of each account type.
pub fn summarize(
    entries: &[LedgerEntry],
    chart: &[ChartAccount],
    period: ReportPeriod,
    project_id: Option<String>,
) -> FinancialSummary {
    let by_code: HashMap<&str, &ChartAccount> =
        chart.iter().map(|a| (a.account_code.as_str(), a)).collect();

    let in_period = entries
        .iter()
        .filter(|e| period.contains(bson_to_date(e.transaction_date)));

    let mut grouped: BTreeMap<AccountType, Vec<AccountBalance>> = BTreeMap::new();
    let mut unclassified = Vec::new();
    for (code, (debit, credit)) in totals_by_account(in_period) {
        match by_code.get(code) {
            Some(account) => grouped
                .entry(account.account_type)
                .or_default()
                .push(account_balance(code, Some(account), debit, credit)),
            None => unclassified.push(account_balance(code, None, debit, credit)),
        }
    }

    let mut take = |t: AccountType| section(grouped.remove(&t).unwrap_or_default());
    let revenue = take(AccountType::Revenue);
    let expenses = take(AccountType::Expense);
    let assets = take(AccountType::Asset);
    let liabilities = take(AccountType::Liability);
    let equity = take(AccountType::Equity);

    let debit_side = to_cents(assets.total) + to_cents(expenses.total);
    let credit_side =
        to_cents(liabilities.total) + to_cents(equity.total) + to_cents(revenue.total);

    FinancialSummary {
        period,
        project_id,
        net_income: from_cents(to_cents(revenue.total) - to_cents(expenses.total)),
        revenue,
        expenses,
        assets,
        liabilities,
        equity,
        is_balanced: debit_side == credit_side && unclassified.is_empty(),
        unclassified,
    }
}

pub fn trial_balance(
    entries: &[LedgerEntry],
    chart: &[ChartAccount],
    period: ReportPeriod,
) -> TrialBalance {
    let by_code: HashMap<&str, &ChartAccount> =
        chart.iter().map(|a| (a.account_code.as_str(), a)).collect();

    let totals = totals_by_account(
        entries
            .iter()
            .filter(|e| period.contains(bson_to_date(e.transaction_date))),
    );

    let total_debit: i64 = totals.values().map(|(d, _)| d).sum();
    let total_credit: i64 = totals.values().map(|(_, c)| c).sum();
    let rows = totals
        .into_iter()
        .map(|(code, (d, c))| account_balance(code, by_code.get(code).copied(), d, c))
        .collect();

    TrialBalance {
        period,
        rows,
        total_debit: from_cents(total_debit),
        total_credit: from_cents(total_credit),
        is_balanced: total_debit == total_credit,
    }
}

/// Net balance of one account over the given rows.
pub fn balance_of(account_code: &str, account_type: AccountType, entries: &[LedgerEntry]) -> f64 {
    let (debit, credit) = entries
        .iter()
        .filter(|e| e.account_code == account_code)
        .fold((0_i64, 0_i64), |(d, c), e| {
            (d + to_cents(e.debit), c + to_cents(e.credit))
        });
    from_cents(signed_cents(account_type, debit, credit))
}

/// Chronological movements of one account with a running balance starting
/// from `opening_balance`.
pub fn account_activity(
    account: &ChartAccount,
    opening_balance: f64,
    entries: &[LedgerEntry],
) -> AccountActivity {
    let mut rows: Vec<&LedgerEntry> = entries
        .iter()
        .filter(|e| e.account_code == account.account_code)
        .collect();
    rows.sort_by_key(|e| (e.transaction_date, e.created_at));

    let mut running = to_cents(opening_balance);
    let lines = rows
        .into_iter()
        .map(|e| {
            running += signed_cents(account.account_type, to_cents(e.debit), to_cents(e.credit));
            ActivityLine {
                transaction_date: bson_to_date(e.transaction_date),
                description: e.description.clone(),
                journal_id: e.journal_id.clone(),
                reference_type: e.reference_type,
                reference_id: e.reference_id.map(|id| id.to_hex()),
                debit: e.debit,
                credit: e.credit,
                running_balance: from_cents(running),
            }
        })
        .collect();

    AccountActivity {
        account_code: account.account_code.clone(),
        account_name: account.name.clone(),
        account_type: account.account_type,
        opening_balance,
        lines,
        closing_balance: from_cents(running),
    }
}
