//! # Daily In/Out Trend
//!
//! Fills the fixed dashboard window from sparse per-day totals.
//!
//! ```text
//!   today = 2026-03-30, TREND_DAYS = 30
//!
//!   window:  03-01  03-02  ...  03-29  03-30
//!   in:        0      12   ...    0      4     ← days with no records are 0
//!   out:       3       0   ...    0      1
//! ```

use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use crate::types::TrendPoint;
use crate::TREND_DAYS;

/// First day of the window ending at `today` (inclusive).
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new((TREND_DAYS - 1) as u64))
        .unwrap_or(NaiveDate::MIN)
}

/// Builds exactly `TREND_DAYS` points, oldest first, ending at `today`.
///
/// ## Arguments
/// * `today` - Last day of the window
/// * `stock_in` - `(day, quantity)` totals; duplicates are summed
/// * `stock_out` - `(day, quantity)` totals; duplicates are summed
///
/// Days outside the window are ignored.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use depot_core::trend::build_trend;
///
/// let today = NaiveDate::from_ymd_opt(2026, 3, 30).unwrap();
/// let trend = build_trend(today, &[(today, 4)], &[]);
///
/// assert_eq!(trend.len(), 30);
/// assert_eq!(trend[29].date, today);
/// assert_eq!(trend[29].stock_in_qty, 4);
/// assert_eq!(trend[0].stock_in_qty, 0);
/// ```
pub fn build_trend(
    today: NaiveDate,
    stock_in: &[(NaiveDate, i64)],
    stock_out: &[(NaiveDate, i64)],
) -> Vec<TrendPoint> {
    let ins = sum_by_day(stock_in);
    let outs = sum_by_day(stock_out);

    window_start(today)
        .iter_days()
        .take(TREND_DAYS)
        .map(|date| TrendPoint {
            date,
            stock_in_qty: ins.get(&date).copied().unwrap_or(0),
            stock_out_qty: outs.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

fn sum_by_day(totals: &[(NaiveDate, i64)]) -> HashMap<NaiveDate, i64> {
    let mut by_day = HashMap::new();
    for (day, qty) in totals {
        let sum = by_day.entry(*day).or_insert(0i64);
        *sum = sum.saturating_add(*qty);
    }
    by_day
}
