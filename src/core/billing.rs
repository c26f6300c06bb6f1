use anyhow::bail;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Fuel metered by a utility bill.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum FuelType {
    Electricity,
    Gas,
    Propane,
    #[serde(rename = "FuelOil")]
    #[strum(serialize = "Fuel Oil")]
    FuelOil,
    #[serde(rename = "DistrictHeating")]
    #[strum(serialize = "District Heating")]
    DistrictHeating,
    #[serde(rename = "DistrictCooling")]
    #[strum(serialize = "District Cooling")]
    DistrictCooling,
    Water,
    Other,
}

/// One metered interval of a utility bill, with the actual (metered) readings alongside the values
/// produced by the simulation for the same interval.
///
/// Any of the four readings may be missing. They stay optional here and are only ever defaulted when
/// a value is displayed.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BillingPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub consumption: Option<f64>,
    pub model_consumption: Option<f64>,
    pub peak_demand: Option<f64>,
    pub model_peak_demand: Option<f64>,
}

impl BillingPeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> anyhow::Result<Self> {
        if end_date < start_date {
            bail!("Billing period end date {end_date} is before its start date {start_date}");
        }

        Ok(Self {
            start_date,
            end_date,
            consumption: None,
            model_consumption: None,
            peak_demand: None,
            model_peak_demand: None,
        })
    }

    pub fn with_consumption(mut self, actual: Option<f64>, modeled: Option<f64>) -> Self {
        self.consumption = actual;
        self.model_consumption = modeled;
        self
    }

    pub fn with_peak_demand(mut self, actual: Option<f64>, modeled: Option<f64>) -> Self {
        self.peak_demand = actual;
        self.model_peak_demand = modeled;
        self
    }

    /// Start date as shown on the report, e.g. "1/31".
    pub fn display_start_date(&self) -> String {
        month_day(&self.start_date)
    }

    /// End date as shown on the report, e.g. "2/28".
    pub fn display_end_date(&self) -> String {
        month_day(&self.end_date)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.end_date < self.start_date {
            bail!(
                "Billing period end date {} is before its start date {}",
                self.end_date,
                self.start_date
            );
        }
        if let Some(consumption) = self.consumption {
            if consumption < 0. {
                bail!(
                    "Billing period starting {} has negative actual consumption {consumption}",
                    self.start_date
                );
            }
        }
        if let Some(peak_demand) = self.peak_demand {
            if peak_demand < 0. {
                bail!(
                    "Billing period starting {} has negative actual peak demand {peak_demand}",
                    self.start_date
                );
            }
        }

        Ok(())
    }
}

fn month_day(date: &NaiveDate) -> String {
    format!("{}/{}", date.month(), date.day())
}

fn default_conversion_factor() -> f64 {
    1.0
}

/// A utility bill for one meter, holding its billing periods in chronological order.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UtilityBill {
    pub name: String,
    pub fuel_type: FuelType,
    pub consumption_unit: String,
    pub peak_demand_unit: Option<String>,
    #[serde(default = "default_conversion_factor")]
    pub consumption_unit_conversion_factor: f64,
    pub peak_demand_unit_conversion_factor: Option<f64>,
    #[serde(default)]
    pub billing_periods: Vec<BillingPeriod>,
    #[serde(rename = "CVRMSE", alias = "cvrmse")]
    pub cvrmse: Option<f64>,
    #[serde(rename = "NMBE", alias = "nmbe")]
    pub nmbe: Option<f64>,
}

impl UtilityBill {
    pub fn new(name: &str, fuel_type: FuelType, consumption_unit: &str) -> Self {
        Self {
            name: name.to_string(),
            fuel_type,
            consumption_unit: consumption_unit.to_string(),
            peak_demand_unit: None,
            consumption_unit_conversion_factor: default_conversion_factor(),
            peak_demand_unit_conversion_factor: None,
            billing_periods: vec![],
            cvrmse: None,
            nmbe: None,
        }
    }

    pub fn with_consumption_unit_conversion_factor(mut self, factor: f64) -> Self {
        self.consumption_unit_conversion_factor = factor;
        self
    }

    pub fn with_peak_demand(mut self, unit: &str, conversion_factor: f64) -> Self {
        self.peak_demand_unit = Some(unit.to_string());
        self.peak_demand_unit_conversion_factor = Some(conversion_factor);
        self
    }

    pub fn with_billing_periods(mut self, billing_periods: Vec<BillingPeriod>) -> Self {
        self.billing_periods = billing_periods;
        self
    }

    pub fn with_statistics(mut self, cvrmse: Option<f64>, nmbe: Option<f64>) -> Self {
        self.cvrmse = cvrmse;
        self.nmbe = nmbe;
        self
    }

    /// Whether this bill carries peak demand. This is decided by the presence of a peak demand
    /// conversion factor rather than by fuel type.
    pub fn has_demand(&self) -> bool {
        self.peak_demand_unit_conversion_factor.is_some()
    }

    /// Checks the invariants upstream data is expected to hold.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.consumption_unit_conversion_factor > 0.) {
            bail!(
                "Utility bill '{}' has a non-positive consumption unit conversion factor {}",
                self.name,
                self.consumption_unit_conversion_factor
            );
        }
        if let Some(factor) = self.peak_demand_unit_conversion_factor {
            if !(factor > 0.) {
                bail!(
                    "Utility bill '{}' has a non-positive peak demand unit conversion factor {factor}",
                    self.name
                );
            }
        }

        for period in &self.billing_periods {
            period.validate()?;
        }

        for pair in self.billing_periods.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            if next.start_date < previous.end_date {
                bail!(
                    "Utility bill '{}' has overlapping or unordered billing periods starting {} and {}",
                    self.name,
                    previous.start_date,
                    next.start_date
                );
            }
        }

        Ok(())
    }
}
