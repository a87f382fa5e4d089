//! Advisory rental cost estimate

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Rate, RateUnit};

/// Nominal working hours billed per day for hourly rates
pub const HOURS_PER_DAY: u32 = 8;
const DAYS_PER_WEEK: u32 = 7;
const DAYS_PER_MONTH: u32 = 30;

/// Estimated cost shown to the renter. Not billing truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub duration_days: u32,
    /// Number of `unit`s charged (hours, days, weeks or months)
    pub billable_units: u32,
    pub unit: RateUnit,
    pub amount: Decimal,
}

/// Inclusive number of rental days; `None` when `end` precedes `start`.
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> Option<u32> {
    let span = (end - start).num_days();
    if span < 0 {
        return None;
    }
    u32::try_from(span + 1).ok()
}

/// Number of rate units charged for a rental of `days` days
pub fn billable_units(unit: RateUnit, days: u32) -> u32 {
    match unit {
        RateUnit::Hourly => days.saturating_mul(HOURS_PER_DAY),
        RateUnit::Daily => days,
        RateUnit::Weekly => days.div_ceil(DAYS_PER_WEEK),
        RateUnit::Monthly => days.div_ceil(DAYS_PER_MONTH),
    }
}

/// `None` when `end` precedes `start` or the amount does not fit a `Decimal`
pub fn estimate_cost(rate: &Rate, start: NaiveDate, end: NaiveDate) -> Option<CostEstimate> {
    let days = duration_days(start, end)?;
    let units = billable_units(rate.unit, days);
    let amount = rate.amount.checked_mul(Decimal::from(units))?;
    Some(CostEstimate {
        duration_days: days,
        billable_units: units,
        unit: rate.unit,
        amount,
    })
}
