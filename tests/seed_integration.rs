#[path = "common/mod.rs"]
mod common;

use propledger::{
    models::AccountType,
    state::{
        LedgerQuery, list_accounts, list_assets, list_ledger_entries, list_projects, list_units,
    },
};

#[tokio::test]
async fn seed_populates_reference_collections() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();

    let accounts = list_accounts(&state).await.unwrap();
    let projects = list_projects(&state).await.unwrap();
    let units = list_units(&state, None).await.unwrap();
    let assets = list_assets(&state, None).await.unwrap();

    assert_eq!(accounts.len(), 17, "chart of accounts seeded");
    assert_eq!(projects.len(), 2, "projects seeded");
    assert_eq!(units.len(), 5, "units seeded");
    assert_eq!(assets.len(), 2, "fixed assets seeded");

    // Every configured posting account must exist in the seeded chart.
    let posting = &state.settings.accounts;
    for code in [
        &posting.cash,
        &posting.bank,
        &posting.receivable,
        &posting.common_fee_revenue,
        &posting.depreciation_expense,
        &posting.accumulated_depreciation,
    ] {
        assert!(
            accounts.iter().any(|a| &a.account_code == code && a.is_active),
            "posting account {code} missing"
        );
    }
    let revenue = accounts.iter().find(|a| a.account_code == "4100").unwrap();
    assert_eq!(revenue.account_type, AccountType::Revenue);

    // Units point at the remapped project ids.
    let (riverside, _) = common::project(&state, "riverside").await;
    assert_eq!(list_units(&state, Some(&riverside)).await.unwrap().len(), 3);

    // Seeding writes no ledger rows.
    let rows = list_ledger_entries(&state, &LedgerQuery::default()).await.unwrap();
    assert!(rows.is_empty());

    common::teardown(ctx).await;
}
