//! Calibration error statistics for billing periods and bills.
//!
//! NMBE here is the percentage by which the modeled value deviates from the actual (metered) value,
//! signed so that a model over-predicting the meter gives a positive result.

use crate::core::billing::BillingPeriod;
use crate::core::units::WATTS_PER_KILOWATT;
use serde::Serialize;

/// Percent NMBE of a period's modeled consumption, converted into the bill's units with the bill's
/// consumption conversion factor.
///
/// Undefined when either reading is missing or the actual consumption is zero.
pub fn period_consumption_nmbe(period: &BillingPeriod, conversion_factor: f64) -> Option<f64> {
    match (period.consumption, period.model_consumption) {
        (Some(actual), Some(modeled)) if actual != 0. => {
            Some(100. * (modeled / conversion_factor - actual) / actual)
        }
        _ => None,
    }
}

/// Percent NMBE of a period's modeled peak demand.
///
/// Modeled peak demand is always scaled down by a fixed factor of 1000 here, whatever the bill's peak
/// demand conversion factor is.
pub fn period_demand_nmbe(period: &BillingPeriod) -> Option<f64> {
    match (period.peak_demand, period.model_peak_demand) {
        (Some(actual), Some(modeled)) if actual != 0. => {
            Some(100. * (modeled / WATTS_PER_KILOWATT as f64 - actual) / actual)
        }
        _ => None,
    }
}

/// Modeled consumption expressed in the bill's consumption unit.
pub fn modeled_consumption(period: &BillingPeriod, conversion_factor: f64) -> Option<f64> {
    period
        .model_consumption
        .map(|modeled| modeled / conversion_factor)
}

/// Modeled peak demand expressed in the bill's peak demand unit.
pub fn modeled_peak_demand(period: &BillingPeriod) -> Option<f64> {
    period
        .model_peak_demand
        .map(|modeled| modeled / WATTS_PER_KILOWATT as f64)
}

/// Summed consumption over a bill's periods.
///
/// Missing readings add nothing to a sum, and the `has_*` flags record whether any reading was
/// present at all so that a genuine zero total can be told apart from no data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ConsumptionTotals {
    pub actual: f64,
    pub modeled: f64,
    pub has_actual: bool,
    pub has_modeled: bool,
}

pub fn consumption_totals(periods: &[BillingPeriod], conversion_factor: f64) -> ConsumptionTotals {
    periods
        .iter()
        .fold(ConsumptionTotals::default(), |mut totals, period| {
            if let Some(actual) = period.consumption {
                totals.actual += actual;
                totals.has_actual = true;
            }
            if let Some(modeled) = modeled_consumption(period, conversion_factor) {
                totals.modeled += modeled;
                totals.has_modeled = true;
            }
            totals
        })
}

/// Maximum of the values picked out of each period by `selector`, ignoring periods with no value.
/// Returns 0 when no period has a value.
pub fn max_peak_demand<F>(periods: &[BillingPeriod], selector: F) -> f64
where
    F: Fn(&BillingPeriod) -> Option<f64>,
{
    periods
        .iter()
        .filter_map(selector)
        .fold(0., |max, value| if value > max { value } else { max })
}

/// Percent NMBE between a bill's modeled and actual peak demand maxima, defined when the actual
/// maximum is positive.
pub fn bill_demand_nmbe(actual_max: f64, modeled_max: f64) -> Option<f64> {
    (actual_max > 0.).then(|| 100. * (modeled_max - actual_max) / actual_max)
}

/// Round to a fixed number of decimal places, half away from zero.
pub fn round_to(value: f64, decimal_places: i32) -> f64 {
    let factor = 10f64.powi(decimal_places);
    (value * factor).round() / factor
}
