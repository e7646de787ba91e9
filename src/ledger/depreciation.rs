use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::models::FixedAsset;

use super::{bson_to_date, from_cents, month_end_dates, round_money, to_cents};

/// One month-end depreciation charge.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DepreciationPeriod {
    pub period_end: NaiveDate,
    pub amount: f64,
}

/// Straight-line monthly charge, rounded to cents.
pub fn monthly_depreciation(purchase_cost: f64, salvage_value: f64, lifespan_months: i32) -> f64 {
    if lifespan_months <= 0 {
        return 0.0;
    }
    let base = purchase_cost - salvage_value;
    if base <= 0.0 {
        return 0.0;
    }
    round_money(base / lifespan_months as f64)
}

pub fn depreciable_base(asset: &FixedAsset) -> f64 {
    round_money((asset.purchase_cost - asset.salvage_value).max(0.0))
}

pub fn net_book_value(asset: &FixedAsset) -> f64 {
    round_money(asset.purchase_cost - asset.accumulated_depreciation)
}

// 1-based position of the month containing `date`, counted from the purchase month.
fn month_index(purchase: NaiveDate, date: NaiveDate) -> i64 {
    (date.year() - purchase.year()) as i64 * 12 + date.month() as i64 - purchase.month() as i64 + 1
}

/// Month-end charges not yet posted for `asset` up to `as_of`.
///
/// Periods start after `last_depreciation_date`, or at the purchase month when
/// the asset was never depreciated. No period exceeds what is left of the
/// depreciable base, and the month completing the lifespan takes the rounding
/// remainder so the asset lands exactly on its salvage value.
pub fn pending_depreciation(asset: &FixedAsset, as_of: NaiveDate) -> Vec<DepreciationPeriod> {
    if !asset.is_active || asset.lifespan_months <= 0 {
        return Vec::new();
    }

    let monthly = to_cents(monthly_depreciation(
        asset.purchase_cost,
        asset.salvage_value,
        asset.lifespan_months,
    ));
    let mut remaining =
        to_cents(depreciable_base(asset)) - to_cents(asset.accumulated_depreciation);
    if remaining <= 0 {
        return Vec::new();
    }

    let purchase = bson_to_date(asset.purchase_date);
    let start = match asset.last_depreciation_date {
        Some(last) => bson_to_date(last) + Duration::days(1),
        None => purchase,
    };

    let mut periods = Vec::new();
    for period_end in month_end_dates(start, as_of) {
        if remaining <= 0 {
            break;
        }
        let amount = if month_index(purchase, period_end) >= asset.lifespan_months as i64 {
            remaining
        } else {
            monthly.min(remaining)
        };
        // A base smaller than one cent per month waits for the final month.
        if amount <= 0 {
            continue;
        }
        remaining -= amount;
        periods.push(DepreciationPeriod {
            period_end,
            amount: from_cents(amount),
        });
    }
    periods
}
