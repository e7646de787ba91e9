#[path = "common/mod.rs"]
mod common;

use mongodb::bson::DateTime;
use propledger::{
    error::LedgerError,
    ledger::{JournalLine, date_to_bson},
    models::{LedgerEntry, PaymentMethod, ReferenceType},
    state::{
        AppState, account_ledger, audit_journals, balance_sheet, create_bill, financial_summary,
        get_account_by_code, post_manual_journal, record_payment, trial_balance_for,
        update_account,
    },
};

// Garden Court: capital injection, one billed and paid month, one expense.
// Riverside: one unpaid bill.
async fn post_january(state: &AppState) -> mongodb::bson::oid::ObjectId {
    let (garden, _) = common::project(state, "garden-court").await;
    let (g01, _) = common::unit(state, &garden, "G-01").await;
    let (riverside, _) = common::project(state, "riverside").await;
    let (a101, _) = common::unit(state, &riverside, "A-101").await;

    post_manual_journal(
        state,
        common::date(2024, 1, 5),
        "Owner capital",
        Some(garden),
        vec![
            JournalLine::debit("1120", 50_000.0),
            JournalLine::credit("3100", 50_000.0),
        ],
    )
    .await
    .unwrap();

    let bill_id = create_bill(state, &garden, &g01, "2024-01", 2117.5, None, None, None)
        .await
        .unwrap();
    record_payment(
        state,
        &bill_id,
        2117.5,
        PaymentMethod::Transfer,
        common::date(2024, 1, 20),
        None,
    )
    .await
    .unwrap();

    post_manual_journal(
        state,
        common::date(2024, 1, 25),
        "Garden maintenance",
        Some(garden),
        vec![
            JournalLine::debit("5100", 800.0).with_description("gardener"),
            JournalLine::credit("1120", 800.0),
        ],
    )
    .await
    .unwrap();

    create_bill(state, &riverside, &a101, "2024-01", 1912.5, None, None, None)
        .await
        .unwrap();
    garden
}

#[tokio::test]
async fn project_summary_applies_sign_convention() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let garden = post_january(&state).await;

    let summary = financial_summary(
        &state,
        common::date(2024, 1, 1),
        common::date(2024, 1, 31),
        Some(garden),
    )
    .await
    .unwrap();
    assert_eq!(summary.revenue.total, 2117.5);
    assert_eq!(summary.expenses.total, 800.0);
    assert_eq!(summary.net_income, 1317.5);
    assert_eq!(summary.assets.total, 51_317.5);
    assert_eq!(summary.equity.total, 50_000.0);
    assert_eq!(summary.liabilities.total, 0.0);
    assert!(summary.unclassified.is_empty());
    assert!(summary.is_balanced);
    assert_eq!(summary.project_id, Some(garden.to_hex()));

    let codes: Vec<&str> = summary
        .assets
        .accounts
        .iter()
        .map(|a| a.account_code.as_str())
        .collect();
    assert_eq!(codes, vec!["1120", "1130"]);

    let all = financial_summary(&state, common::date(2024, 1, 1), common::date(2024, 1, 31), None)
        .await
        .unwrap();
    assert_eq!(all.revenue.total, 4030.0);
    assert_eq!(all.assets.total, 53_230.0);
    assert!(all.is_balanced);

    let february =
        financial_summary(&state, common::date(2024, 2, 1), common::date(2024, 2, 29), None)
            .await
            .unwrap();
    assert_eq!(february.revenue.total, 0.0);
    assert!(february.assets.accounts.is_empty());
    assert!(february.is_balanced);

    let backwards =
        financial_summary(&state, common::date(2024, 2, 1), common::date(2024, 1, 1), None)
            .await
            .unwrap_err();
    assert!(matches!(common::ledger_error(&backwards), Some(LedgerError::Invalid(_))));
    common::teardown(ctx).await;
}

#[tokio::test]
async fn balance_sheet_trial_balance_and_account_ledger_agree() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let garden = post_january(&state).await;

    let sheet = balance_sheet(&state, common::date(2024, 12, 31), None).await.unwrap();
    assert_eq!(sheet.period.start, None);
    assert_eq!(sheet.assets.total, 53_230.0);
    assert!(sheet.is_balanced);

    let trial = trial_balance_for(&state, None, common::date(2024, 1, 31), None)
        .await
        .unwrap();
    assert_eq!(trial.total_debit, 56_947.5);
    assert_eq!(trial.total_credit, 56_947.5);
    assert!(trial.is_balanced);
    let receivable = trial.rows.iter().find(|r| r.account_code == "1130").unwrap();
    assert_eq!(receivable.total_debit, 4030.0);
    assert_eq!(receivable.total_credit, 2117.5);
    assert_eq!(receivable.balance, 1912.5);

    let bank = account_ledger(
        &state,
        "1120",
        common::date(2024, 1, 10),
        common::date(2024, 1, 31),
        Some(garden),
    )
    .await
    .unwrap();
    assert_eq!(bank.opening_balance, 50_000.0);
    let running: Vec<f64> = bank.lines.iter().map(|l| l.running_balance).collect();
    assert_eq!(running, vec![52_117.5, 51_317.5]);
    assert_eq!(bank.closing_balance, 51_317.5);
    assert_eq!(bank.lines[0].reference_type, ReferenceType::Payment);

    let missing = account_ledger(
        &state,
        "8888",
        common::date(2024, 1, 1),
        common::date(2024, 1, 31),
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(common::ledger_error(&missing), Some(LedgerError::NotFound(_))));
    common::teardown(ctx).await;
}

#[tokio::test]
async fn manual_journals_are_validated_before_writing() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let day = common::date(2024, 3, 1);

    let unbalanced = post_manual_journal(
        &state,
        day,
        "typo",
        None,
        vec![
            JournalLine::debit("5100", 100.0),
            JournalLine::credit("1110", 99.99),
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(
        common::ledger_error(&unbalanced),
        Some(LedgerError::UnbalancedJournal { .. })
    ));

    let unknown = post_manual_journal(
        &state,
        day,
        "unknown",
        None,
        vec![
            JournalLine::debit("7777", 10.0),
            JournalLine::credit("1110", 10.0),
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(common::ledger_error(&unknown), Some(LedgerError::UnknownAccount(_))));

    let other = get_account_by_code(&state, "4300").await.unwrap().unwrap();
    update_account(
        &state,
        &other.id.unwrap(),
        &other.name,
        other.account_type,
        other.parent_code.clone(),
        false,
        other.description.clone(),
    )
    .await
    .unwrap();
    let inactive = post_manual_journal(
        &state,
        day,
        "late fee",
        None,
        vec![
            JournalLine::debit("1130", 50.0),
            JournalLine::credit("4300", 50.0),
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(common::ledger_error(&inactive), Some(LedgerError::InactiveAccount(_))));

    let single =
        post_manual_journal(&state, day, "half", None, vec![JournalLine::debit("5100", 5.0)])
            .await
            .unwrap_err();
    assert!(matches!(common::ledger_error(&single), Some(LedgerError::EmptyJournal)));

    let trial = trial_balance_for(&state, None, day, None).await.unwrap();
    assert!(trial.rows.is_empty());
    common::teardown(ctx).await;
}

#[tokio::test]
async fn audit_flags_orphan_rows_and_summary_reports_them() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    post_january(&state).await;

    // A half-written journal, as left behind by an interrupted writer.
    state
        .general_ledger
        .insert_one(LedgerEntry {
            id: None,
            journal_id: "orphan-1".into(),
            account_code: "9999".into(),
            debit: 10.0,
            credit: 0.0,
            transaction_date: date_to_bson(common::date(2024, 1, 31)),
            description: "orphan".into(),
            reference_type: ReferenceType::Manual,
            reference_id: None,
            project_id: None,
            created_at: Some(DateTime::now()),
        })
        .await
        .unwrap();

    let report = audit_journals(&state, None, None).await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].journal_id, "orphan-1");
    assert_eq!(report[0].line_count, 1);
    assert_eq!(report[0].total_debit, 10.0);

    let summary =
        financial_summary(&state, common::date(2024, 1, 1), common::date(2024, 1, 31), None)
            .await
            .unwrap();
    assert_eq!(summary.unclassified.len(), 1);
    assert_eq!(summary.unclassified[0].balance, 10.0);
    assert!(!summary.is_balanced);

    let before = audit_journals(&state, None, Some(common::date(2023, 12, 31)))
        .await
        .unwrap();
    assert!(before.is_empty());
    common::teardown(ctx).await;
}
