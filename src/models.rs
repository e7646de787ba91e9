// models.rs
// Domain models for seed data (data/*.json) and MongoDB collections.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Account classification in the chart of accounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Revenue => "revenue",
            AccountType::Expense => "expense",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "asset" => Some(AccountType::Asset),
            "liability" => Some(AccountType::Liability),
            "equity" => Some(AccountType::Equity),
            "revenue" | "income" => Some(AccountType::Revenue),
            "expense" => Some(AccountType::Expense),
            _ => None,
        }
    }

    /// Asset and expense accounts grow with debits; the rest grow with credits.
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Paid,
    Cancelled,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "pending",
            BillStatus::Paid => "paid",
            BillStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(BillStatus::Pending),
            "paid" => Some(BillStatus::Paid),
            "cancelled" | "canceled" => Some(BillStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Cheque,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Card => "card",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "transfer" | "bank_transfer" => Some(PaymentMethod::Transfer),
            "cheque" | "check" => Some(PaymentMethod::Cheque),
            "card" | "credit_card" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

/// Business event that produced a journal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Bill,
    Payment,
    BillCancellation,
    PaymentVoid,
    Depreciation,
    Manual,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Bill => "bill",
            ReferenceType::Payment => "payment",
            ReferenceType::BillCancellation => "bill_cancellation",
            ReferenceType::PaymentVoid => "payment_void",
            ReferenceType::Depreciation => "depreciation",
            ReferenceType::Manual => "manual",
        }
    }
}

/// Project as stored in data/projects.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedProject {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub default_currency: Option<String>,
    #[serde(default)]
    pub common_fee_rate: f64,
}

/// Unit as stored in data/units.json (project is referenced by slug).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUnit {
    pub project: String,
    pub unit_number: String,
    #[serde(default)]
    pub owner_name: Option<String>,
    pub area_sqm: f64,
    #[serde(default)]
    pub is_occupied: bool,
}

/// Fixed asset as stored in data/fixed_assets.json (project is referenced by slug).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAsset {
    #[serde(default)]
    pub project: Option<String>,
    pub name: String,
    pub purchase_date: chrono::NaiveDate,
    pub purchase_cost: f64,
    #[serde(default)]
    pub salvage_value: f64,
    pub lifespan_months: i32,
}

/// Condominium project; units, bills and ledger rows are scoped to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
    pub default_currency: String,
    /// Monthly common fee charged per square metre.
    #[serde(default)]
    pub common_fee_rate: f64,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime>,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub project_id: ObjectId,
    pub unit_number: String,
    #[serde(default)]
    pub owner_name: Option<String>,
    pub area_sqm: f64,
    #[serde(default)]
    pub is_occupied: bool,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime>,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Chart of accounts row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartAccount {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub account_code: String,
    pub name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub parent_code: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime>,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub project_id: ObjectId,
    pub unit_id: ObjectId,
    /// `YYYY-MM`
    pub billing_month: String,
    pub total: f64,
    #[serde(default)]
    pub paid_amount: f64,
    pub status: BillStatus,
    pub issue_date: DateTime,
    #[serde(default)]
    pub due_date: Option<DateTime>,
    pub description: String,
    #[serde(default)]
    pub journal_id: Option<String>,
    #[serde(default)]
    pub cancelled_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime>,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
}

impl Bill {
    pub fn outstanding(&self) -> f64 {
        if matches!(self.status, BillStatus::Cancelled) {
            return 0.0;
        }
        crate::ledger::round_money((self.total - self.paid_amount).max(0.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub bill_id: ObjectId,
    pub project_id: ObjectId,
    pub amount: f64,
    pub method: PaymentMethod,
    pub payment_date: DateTime,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub is_reconciled: bool,
    #[serde(default)]
    pub reconciled_at: Option<DateTime>,
    #[serde(default)]
    pub bank_reference: Option<String>,
    #[serde(default)]
    pub is_void: bool,
    #[serde(default)]
    pub void_reason: Option<String>,
    #[serde(default)]
    pub journal_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime>,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
}

/// One general ledger row. Rows written for the same business event share a `journal_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub journal_id: String,
    pub account_code: String,
    pub debit: f64,
    pub credit: f64,
    pub transaction_date: DateTime,
    pub description: String,
    pub reference_type: ReferenceType,
    #[serde(default)]
    pub reference_id: Option<ObjectId>,
    #[serde(default)]
    pub project_id: Option<ObjectId>,
    #[serde(default)]
    pub created_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedAsset {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub project_id: Option<ObjectId>,
    pub name: String,
    pub purchase_date: DateTime,
    pub purchase_cost: f64,
    #[serde(default)]
    pub salvage_value: f64,
    pub lifespan_months: i32,
    #[serde(default)]
    pub accumulated_depreciation: f64,
    #[serde(default)]
    pub last_depreciation_date: Option<DateTime>,
    #[serde(default)]
    pub expense_account_code: Option<String>,
    #[serde(default)]
    pub accumulated_account_code: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime>,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
    #[serde(default)]
    pub notes: Option<String>,
}
