#[path = "common/mod.rs"]
mod common;

use mongodb::bson::doc;
use propledger::{
    error::LedgerError,
    models::{BillStatus, PaymentMethod, ReferenceType},
    state::{
        BillQuery, LedgerQuery, PaymentQuery, audit_journals, cancel_bill, create_bill,
        financial_summary, generate_common_fee_bills, get_bill_by_id, get_payment_by_id,
        journal_entries, list_bills, list_ledger_entries, list_payments, reconcile_payment,
        record_payment, void_payment,
    },
};

#[tokio::test]
async fn bill_and_payments_post_paired_entries() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let (project_id, _) = common::project(&state, "riverside").await;
    let (unit_id, _) = common::unit(&state, &project_id, "A-101").await;

    let bill_id = create_bill(&state, &project_id, &unit_id, "2024-05", 1912.5, None, None, None)
        .await
        .unwrap();
    let bill = get_bill_by_id(&state, &bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Pending);
    assert_eq!(bill.outstanding(), 1912.5);

    let rows = journal_entries(&state, bill.journal_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let debit = rows.iter().find(|r| r.debit > 0.0).unwrap();
    let credit = rows.iter().find(|r| r.credit > 0.0).unwrap();
    assert_eq!(debit.account_code, "1130");
    assert_eq!(credit.account_code, "4100");
    assert_eq!(debit.debit, 1912.5);
    assert_eq!(credit.credit, 1912.5);
    assert_eq!(debit.reference_type, ReferenceType::Bill);
    assert_eq!(debit.reference_id, Some(bill_id));
    assert_eq!(debit.project_id, Some(project_id));

    let dup = create_bill(&state, &project_id, &unit_id, "2024-05", 100.0, None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(common::ledger_error(&dup), Some(LedgerError::Conflict(_))));

    let cash_id = record_payment(
        &state,
        &bill_id,
        1000.0,
        PaymentMethod::Cash,
        common::date(2024, 5, 10),
        Some("receipt 17".into()),
    )
    .await
    .unwrap();
    let bill = get_bill_by_id(&state, &bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Pending);
    assert_eq!(bill.paid_amount, 1000.0);
    assert_eq!(bill.outstanding(), 912.5);

    let over = record_payment(
        &state,
        &bill_id,
        1000.0,
        PaymentMethod::Transfer,
        common::date(2024, 5, 12),
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(common::ledger_error(&over), Some(LedgerError::Invalid(_))));

    let transfer_id = record_payment(
        &state,
        &bill_id,
        912.5,
        PaymentMethod::Transfer,
        common::date(2024, 5, 12),
        None,
    )
    .await
    .unwrap();
    let bill = get_bill_by_id(&state, &bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Paid);
    assert_eq!(bill.outstanding(), 0.0);

    let cash_rows = list_ledger_entries(
        &state,
        &LedgerQuery {
            account_code: Some("1110".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(cash_rows.len(), 1);
    assert_eq!(cash_rows[0].reference_id, Some(cash_id));
    let bank_rows = list_ledger_entries(
        &state,
        &LedgerQuery {
            account_code: Some("1120".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(bank_rows.len(), 1);
    assert_eq!(bank_rows[0].debit, 912.5);

    let closed = record_payment(
        &state,
        &bill_id,
        1.0,
        PaymentMethod::Cash,
        common::date(2024, 5, 13),
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(common::ledger_error(&closed), Some(LedgerError::Conflict(_))));

    void_payment(&state, &transfer_id, "bounced", Some(common::date(2024, 5, 14)))
        .await
        .unwrap();
    let bill = get_bill_by_id(&state, &bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Pending);
    assert_eq!(bill.paid_amount, 1000.0);
    let live = list_payments(
        &state,
        &PaymentQuery {
            bill_id: Some(bill_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(live.len(), 1);

    reconcile_payment(&state, &cash_id, "STMT-0517", Some(common::date(2024, 5, 17)))
        .await
        .unwrap();
    let locked = void_payment(&state, &cash_id, "typo", None).await.unwrap_err();
    assert!(matches!(common::ledger_error(&locked), Some(LedgerError::Conflict(_))));

    let paid_in_part = cancel_bill(&state, &bill_id, "dispute", None).await.unwrap_err();
    assert!(matches!(common::ledger_error(&paid_in_part), Some(LedgerError::Conflict(_))));

    assert!(audit_journals(&state, None, None).await.unwrap().is_empty());
    common::teardown(ctx).await;
}

#[tokio::test]
async fn cancelled_bill_nets_out_and_frees_the_month() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let (project_id, _) = common::project(&state, "riverside").await;
    let (unit_id, _) = common::unit(&state, &project_id, "A-102").await;

    let bill_id = create_bill(&state, &project_id, &unit_id, "2024-07", 1575.0, None, None, None)
        .await
        .unwrap();
    cancel_bill(&state, &bill_id, "wrong area", Some(common::date(2024, 7, 3)))
        .await
        .unwrap();

    let bill = get_bill_by_id(&state, &bill_id).await.unwrap().unwrap();
    assert_eq!(bill.status, BillStatus::Cancelled);
    assert_eq!(bill.cancelled_reason.as_deref(), Some("wrong area"));
    assert_eq!(bill.outstanding(), 0.0);

    let rows = list_ledger_entries(
        &state,
        &LedgerQuery {
            account_code: Some("1130".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 2);
    let net: f64 = rows.iter().map(|r| r.debit - r.credit).sum();
    assert_eq!(net, 0.0);
    assert!(rows
        .iter()
        .any(|r| r.reference_type == ReferenceType::BillCancellation));

    let again = cancel_bill(&state, &bill_id, "twice", None).await.unwrap_err();
    assert!(matches!(common::ledger_error(&again), Some(LedgerError::Conflict(_))));

    create_bill(&state, &project_id, &unit_id, "2024-07", 1500.0, None, None, None)
        .await
        .unwrap();
    common::teardown(ctx).await;
}

#[tokio::test]
async fn common_fee_run_bills_each_unit_once() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let (project_id, _) = common::project(&state, "riverside").await;

    let run = generate_common_fee_bills(&state, &project_id, "2024-06").await.unwrap();
    assert_eq!(run.created.len(), 3);
    assert!(run.skipped_units.is_empty());
    assert_eq!(run.total_billed, 6547.5);

    let bills = list_bills(
        &state,
        &BillQuery {
            project_id: Some(project_id),
            billing_month: Some("2024-06".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let mut totals: Vec<f64> = bills.iter().map(|b| b.total).collect();
    totals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(totals, vec![1575.0, 1912.5, 3060.0]);

    let rerun = generate_common_fee_bills(&state, &project_id, "2024-06").await.unwrap();
    assert!(rerun.created.is_empty());
    assert_eq!(rerun.skipped_units.len(), 3);

    let bad = generate_common_fee_bills(&state, &project_id, "2024-13").await.unwrap_err();
    assert!(matches!(common::ledger_error(&bad), Some(LedgerError::Invalid(_))));
    common::teardown(ctx).await;
}

#[tokio::test]
async fn failed_posting_leaves_no_bill_behind() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let mut state = ctx.state.clone();
    state.settings.accounts.receivable = "9999".into();
    let (project_id, _) = common::project(&state, "garden-court").await;
    let (unit_id, _) = common::unit(&state, &project_id, "G-01").await;

    let err = create_bill(&state, &project_id, &unit_id, "2024-05", 2117.5, None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        common::ledger_error(&err),
        Some(LedgerError::UnknownAccount(code)) if code == "9999"
    ));

    let bills = list_bills(
        &state,
        &BillQuery {
            unit_id: Some(unit_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(bills.is_empty());
    let rows = list_ledger_entries(&state, &LedgerQuery::default()).await.unwrap();
    assert!(rows.is_empty());
    common::teardown(ctx).await;
}

#[tokio::test]
async fn cancel_reverses_posting_when_journal_id_was_never_stored() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let (project_id, _) = common::project(&state, "riverside").await;
    let (unit_id, _) = common::unit(&state, &project_id, "A-102").await;

    let bill_id = create_bill(&state, &project_id, &unit_id, "2024-06", 1575.0, None, None, None)
        .await
        .unwrap();
    // The ledger rows exist but the bill lost its link to them.
    state
        .bills
        .update_one(doc! { "_id": bill_id }, doc! { "$unset": { "journal_id": "" } })
        .await
        .unwrap();
    assert!(get_bill_by_id(&state, &bill_id).await.unwrap().unwrap().journal_id.is_none());

    cancel_bill(&state, &bill_id, "entered twice", Some(common::date(2024, 6, 15)))
        .await
        .unwrap();

    let rows = list_ledger_entries(&state, &LedgerQuery::default()).await.unwrap();
    let reversal: Vec<_> = rows
        .iter()
        .filter(|r| r.reference_type == ReferenceType::BillCancellation)
        .collect();
    assert_eq!(reversal.len(), 2);
    assert!(reversal.iter().all(|r| r.reference_id == Some(bill_id)));

    let june = financial_summary(
        &state,
        common::date(2024, 6, 1),
        common::date(2024, 6, 30),
        Some(project_id),
    )
    .await
    .unwrap();
    assert_eq!(june.revenue.total, 0.0);
    assert_eq!(june.assets.total, 0.0);
    assert!(june.is_balanced);
    common::teardown(ctx).await;
}

#[tokio::test]
async fn void_reverses_posting_when_journal_id_was_never_stored() {
    let ctx = match common::setup_state().await {
        Some(c) => c,
        None => return,
    };
    let state = ctx.state.clone();
    let (project_id, _) = common::project(&state, "riverside").await;
    let (unit_id, _) = common::unit(&state, &project_id, "A-102").await;

    let bill_id = create_bill(&state, &project_id, &unit_id, "2024-06", 1575.0, None, None, None)
        .await
        .unwrap();
    let payment_id = record_payment(
        &state,
        &bill_id,
        500.0,
        PaymentMethod::Transfer,
        common::date(2024, 6, 5),
        None,
    )
    .await
    .unwrap();
    state
        .payments
        .update_one(doc! { "_id": payment_id }, doc! { "$unset": { "journal_id": "" } })
        .await
        .unwrap();

    void_payment(&state, &payment_id, "bounced", Some(common::date(2024, 6, 20)))
        .await
        .unwrap();

    let payment = get_payment_by_id(&state, &payment_id).await.unwrap().unwrap();
    assert!(payment.is_void);
    let bill = get_bill_by_id(&state, &bill_id).await.unwrap().unwrap();
    assert_eq!(bill.paid_amount, 0.0);

    let rows = list_ledger_entries(&state, &LedgerQuery::default()).await.unwrap();
    let voids = rows
        .iter()
        .filter(|r| r.reference_type == ReferenceType::PaymentVoid)
        .count();
    assert_eq!(voids, 2);

    let june = financial_summary(
        &state,
        common::date(2024, 6, 1),
        common::date(2024, 6, 30),
        Some(project_id),
    )
    .await
    .unwrap();
    // Only the receivable from the bill remains.
    assert_eq!(june.assets.total, 1575.0);
    assert!(audit_journals(&state, None, None).await.unwrap().is_empty());
    common::teardown(ctx).await;
}
