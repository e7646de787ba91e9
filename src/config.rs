// config.rs
// Runtime settings read from the environment (a `.env` file is loaded first by main).

use std::env;

/// Chart-of-accounts codes the writers post to.
#[derive(Debug, Clone)]
pub struct PostingAccounts {
    pub cash: String,
    pub bank: String,
    pub receivable: String,
    pub common_fee_revenue: String,
    pub depreciation_expense: String,
    pub accumulated_depreciation: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub bind_addr: String,
    pub seed_data: bool,
    pub default_currency: String,
    pub accounts: PostingAccounts,
}

impl Settings {
    pub fn from_env() -> Self {
        Settings {
            mongodb_uri: env_or("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_db: env_or("MONGODB_DB", "propledger"),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
            seed_data: env_flag("SEED_DATA", true),
            default_currency: env_or("DEFAULT_CURRENCY", "THB"),
            accounts: PostingAccounts {
                cash: env_or("GL_CASH_ACCOUNT", "1110"),
                bank: env_or("GL_BANK_ACCOUNT", "1120"),
                receivable: env_or("GL_RECEIVABLE_ACCOUNT", "1130"),
                common_fee_revenue: env_or("GL_COMMON_FEE_REVENUE_ACCOUNT", "4100"),
                depreciation_expense: env_or("GL_DEPRECIATION_EXPENSE_ACCOUNT", "5400"),
                accumulated_depreciation: env_or("GL_ACCUMULATED_DEPRECIATION_ACCOUNT", "1290"),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
