//! Rules for incomplete input: which gaps degrade a report, and how missing values are displayed.
//!
//! None of the conditions here stop a report from being built. Missing preconditions are logged and
//! flagged, and missing values fall back to a placeholder only at the point they are displayed.

use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};
use tracing::warn;

pub const NOT_APPLICABLE: &str = "N/A";

/// A piece of model context without which the report cannot be generated in full.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MissingPrecondition {
    RunPeriod,
    YearDescription,
    CalendarYear,
}

impl Display for MissingPrecondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let missing = match self {
            MissingPrecondition::RunPeriod => "run period",
            MissingPrecondition::YearDescription => "year description",
            MissingPrecondition::CalendarYear => "calendar year",
        };
        write!(f, "Model has no {missing} and cannot generate all data.")
    }
}

/// Check for a run period and a calendar year, warning about each piece that is missing.
///
/// `calendar_year` is only consulted when a year description exists.
pub fn check_preconditions(
    has_run_period: bool,
    year_description: Option<Option<i32>>,
) -> Vec<MissingPrecondition> {
    let mut missing = vec![];

    if !has_run_period {
        missing.push(MissingPrecondition::RunPeriod);
    }
    match year_description {
        None => missing.push(MissingPrecondition::YearDescription),
        Some(None) => missing.push(MissingPrecondition::CalendarYear),
        Some(Some(_)) => {}
    }

    for precondition in &missing {
        warn!("{precondition}");
    }

    missing
}

/// The value shown for a reading in a report series. Missing readings show as zero so that series
/// stay aligned.
pub fn zero_placeholder(value: Option<f64>) -> f64 {
    value.unwrap_or(0.)
}

/// A statistic that is shown as "N/A" when undefined, and never as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrNotApplicable(pub Option<f64>);

impl OrNotApplicable {
    pub fn value(&self) -> Option<f64> {
        self.0
    }
}

impl From<Option<f64>> for OrNotApplicable {
    fn from(value: Option<f64>) -> Self {
        Self(value)
    }
}

impl Display for OrNotApplicable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "{NOT_APPLICABLE}"),
        }
    }
}

impl Serialize for OrNotApplicable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

/// How a report run ended. A run with missing preconditions still produces a report, but one that
/// is flagged as not generated successfully.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum FinalCondition {
    GeneratedSuccessfully,
    NotGeneratedSuccessfully,
}

impl FinalCondition {
    pub fn from_missing_data(missing_data: bool) -> Self {
        if missing_data {
            FinalCondition::NotGeneratedSuccessfully
        } else {
            FinalCondition::GeneratedSuccessfully
        }
    }
}

impl Display for FinalCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FinalCondition::GeneratedSuccessfully => {
                write!(f, "Calibration Report generated successfully.")
            }
            FinalCondition::NotGeneratedSuccessfully => {
                write!(f, "Calibration Report was not generated successfully.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    #[rstest]
    #[case(true, Some(Some(2013)), vec![])]
    #[case(false, Some(Some(2013)), vec![MissingPrecondition::RunPeriod])]
    #[case(true, None, vec![MissingPrecondition::YearDescription])]
    #[case(true, Some(None), vec![MissingPrecondition::CalendarYear])]
    #[case(false, Some(None), vec![MissingPrecondition::RunPeriod, MissingPrecondition::CalendarYear])]
    fn should_check_preconditions(
        #[case] has_run_period: bool,
        #[case] year_description: Option<Option<i32>>,
        #[case] expected: Vec<MissingPrecondition>,
    ) {
        assert_eq!(check_preconditions(has_run_period, year_description), expected);
    }

    #[rstest]
    fn should_describe_missing_preconditions() {
        assert_eq!(
            MissingPrecondition::CalendarYear.to_string(),
            "Model has no calendar year and cannot generate all data."
        );
    }

    #[rstest]
    fn should_render_undefined_statistic_as_not_applicable() {
        assert_eq!(OrNotApplicable(None).to_string(), "N/A");
        assert_eq!(serde_json::to_value(OrNotApplicable(None)).unwrap(), json!("N/A"));
        assert_eq!(serde_json::to_value(OrNotApplicable(Some(5.))).unwrap(), json!(5.0));
    }

    #[rstest]
    fn should_use_zero_placeholder_for_missing_reading() {
        assert_eq!(zero_placeholder(None), 0.);
        assert_eq!(zero_placeholder(Some(12.5)), 12.5);
    }

    #[rstest]
    fn should_report_degraded_final_condition_for_missing_data() {
        assert_eq!(
            FinalCondition::from_missing_data(true).to_string(),
            "Calibration Report was not generated successfully."
        );
        assert_eq!(
            FinalCondition::from_missing_data(false),
            FinalCondition::GeneratedSuccessfully
        );
    }
}
