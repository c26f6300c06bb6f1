use crate::core::billing::UtilityBill;
use crate::core::coil_multiplier::TwoSpeedDxCoil;
use crate::core::guidelines::GuidelineOverrides;
use crate::core::report::CalibrationSource;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::{BufReader, Read};

pub fn ingest_for_processing(json: impl Read) -> anyhow::Result<ModelInput> {
    let input: ModelInput = serde_json::from_reader(BufReader::new(json))?;
    input.validate()?;

    Ok(input)
}

pub fn ingest_coils(json: impl Read) -> anyhow::Result<Vec<TwoSpeedDxCoil>> {
    let input: CoilsInput = serde_json::from_reader(BufReader::new(json))?;

    let mut handles = HashSet::new();
    for coil in &input.coils {
        if !handles.insert(coil.handle.as_str()) {
            bail!("Coil handle {} is used by more than one coil", coil.handle);
        }
    }

    Ok(input.coils)
}

/// A snapshot of the model a calibration report is built for: the parts of the simulation setup the
/// report depends on, and the utility bills with their modeled values already filled in.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelInput {
    pub run_period: Option<RunPeriod>,
    pub year_description: Option<YearDescription>,
    #[serde(default)]
    pub utility_bills: Vec<UtilityBill>,
    pub calibration_guidelines: Option<GuidelineOverrides>,
}

impl ModelInput {
    fn validate(&self) -> anyhow::Result<()> {
        if let Some(run_period) = &self.run_period {
            run_period.validate()?;
        }
        for (bill_idx, bill) in self.utility_bills.iter().enumerate() {
            bill.validate()
                .with_context(|| format!("Invalid utility bill at position {}", bill_idx + 1))?;
        }

        Ok(())
    }
}

impl CalibrationSource for ModelInput {
    fn has_run_period(&self) -> bool {
        self.run_period.is_some()
    }

    fn calendar_year(&self) -> Option<Option<i32>> {
        self.year_description
            .as_ref()
            .map(|year_description| year_description.calendar_year)
    }

    fn utility_bills(&self) -> &[UtilityBill] {
        &self.utility_bills
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunPeriod {
    pub begin_month: u32,
    pub begin_day_of_month: u32,
    pub end_month: u32,
    pub end_day_of_month: u32,
}

impl RunPeriod {
    fn validate(&self) -> anyhow::Result<()> {
        for (month, day) in [
            (self.begin_month, self.begin_day_of_month),
            (self.end_month, self.end_day_of_month),
        ] {
            if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
                bail!("Run period has an invalid month/day of {month}/{day}");
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct YearDescription {
    pub calendar_year: Option<i32>,
    pub day_of_week_for_start_day: Option<String>,
    pub is_leap_year: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CoilsInput {
    coils: Vec<TwoSpeedDxCoil>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::billing::FuelType;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;
    use std::io::Cursor;

    fn ingest(value: serde_json::Value) -> anyhow::Result<ModelInput> {
        ingest_for_processing(Cursor::new(value.to_string()))
    }

    #[fixture]
    fn model_json() -> serde_json::Value {
        json!({
            "run_period": {
                "begin_month": 1,
                "begin_day_of_month": 1,
                "end_month": 12,
                "end_day_of_month": 31
            },
            "year_description": {"calendar_year": 2013},
            "utility_bills": [
                {
                    "name": "Electric Bill",
                    "fuel_type": "Electricity",
                    "consumption_unit": "kWh",
                    "peak_demand_unit": "kW",
                    "consumption_unit_conversion_factor": 3600000.0,
                    "peak_demand_unit_conversion_factor": 1000.0,
                    "billing_periods": [
                        {
                            "start_date": "2013-01-01",
                            "end_date": "2013-01-31",
                            "consumption": 100.0,
                            "model_consumption": 396000000.0,
                            "peak_demand": 5.0
                        }
                    ]
                }
            ]
        })
    }

    #[rstest]
    fn should_ingest_model_snapshot(model_json: serde_json::Value) {
        let input = ingest(model_json).unwrap();

        assert!(input.has_run_period());
        assert_eq!(input.calendar_year(), Some(Some(2013)));
        assert_eq!(input.utility_bills().len(), 1);
        let bill = &input.utility_bills()[0];
        assert_eq!(bill.fuel_type, FuelType::Electricity);
        assert!(bill.has_demand());
        assert_eq!(bill.billing_periods[0].model_peak_demand, None);
        assert!(input.calibration_guidelines.is_none());
    }

    #[rstest]
    fn should_ingest_empty_model() {
        let input = ingest(json!({})).unwrap();

        assert!(!input.has_run_period());
        assert_eq!(input.calendar_year(), None);
        assert!(input.utility_bills().is_empty());
    }

    #[rstest]
    fn should_report_year_description_without_calendar_year() {
        let input = ingest(json!({"year_description": {"is_leap_year": false}})).unwrap();
        assert_eq!(input.calendar_year(), Some(None));
    }

    #[rstest]
    fn should_reject_unknown_fields(mut model_json: serde_json::Value) {
        model_json["sql_file"] = json!("eplusout.sql");
        assert!(ingest(model_json).is_err());
    }

    #[rstest]
    fn should_reject_invalid_bill(mut model_json: serde_json::Value) {
        model_json["utility_bills"][0]["billing_periods"][0]["end_date"] = json!("2012-12-31");
        let error = ingest(model_json).unwrap_err();
        assert_eq!(error.to_string(), "Invalid utility bill at position 1");
    }

    #[rstest]
    fn should_reject_invalid_run_period(mut model_json: serde_json::Value) {
        model_json["run_period"]["end_month"] = json!(13);
        assert!(ingest(model_json).is_err());
    }

    #[rstest]
    fn should_ingest_guideline_overrides(mut model_json: serde_json::Value) {
        model_json["calibration_guidelines"] = json!({"FEMP": {"maxNMBE": 10.0}});
        let input = ingest(model_json).unwrap();
        let overrides = input.calibration_guidelines.unwrap();

        assert!(overrides.ashrae_14.is_none());
        assert_eq!(overrides.femp.unwrap().max_nmbe, Some(10.0));
    }

    #[rstest]
    fn should_ingest_coils() {
        let coils = ingest_coils(Cursor::new(
            json!({
                "coils": [
                    {
                        "handle": "{a}",
                        "name": "Coil A",
                        "rated_high_speed_total_cooling_capacity": 10000.0,
                        "rated_low_speed_total_cooling_capacity": null,
                        "rated_high_speed_COP": 3.0,
                        "rated_low_speed_COP": 3.5
                    }
                ]
            })
            .to_string(),
        ))
        .unwrap();

        assert_eq!(coils.len(), 1);
        assert_eq!(coils[0].rated_high_speed_cop, Some(3.0));
        assert_eq!(coils[0].rated_low_speed_total_cooling_capacity, None);
    }

    #[rstest]
    fn should_reject_duplicate_coil_handles() {
        let coil = json!({"handle": "{a}", "name": "Coil A"});
        let result = ingest_coils(Cursor::new(json!({"coils": [coil, coil]}).to_string()));
        assert!(result.is_err());
    }
}
