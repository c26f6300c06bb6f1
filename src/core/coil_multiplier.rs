//! Scaling of rated capacity and COP on two-speed DX cooling coils, used to calibrate a model's
//! cooling coils against measured performance.

use crate::core::metrics::round_to;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::Display;
use thiserror::Error;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TwoSpeedDxCoil {
    pub handle: String,
    pub name: String,
    pub rated_high_speed_total_cooling_capacity: Option<f64>,
    pub rated_low_speed_total_cooling_capacity: Option<f64>,
    #[serde(rename = "rated_high_speed_COP", alias = "rated_high_speed_cop")]
    pub rated_high_speed_cop: Option<f64>,
    #[serde(rename = "rated_low_speed_COP", alias = "rated_low_speed_cop")]
    pub rated_low_speed_cop: Option<f64>,
}

/// Which coils to apply multipliers to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoilSelection {
    /// The coil with this handle.
    Single(String),
    All,
    None,
}

impl FromStr for CoilSelection {
    type Err = CoilMultiplierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(CoilMultiplierError::EmptySelection),
            "ALL" => Ok(CoilSelection::All),
            "NONE" => Ok(CoilSelection::None),
            handle => Ok(CoilSelection::Single(handle.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum RatedField {
    #[strum(serialize = "ratedHighSpeedTotalCoolingCapacity")]
    HighSpeedTotalCoolingCapacity,
    #[strum(serialize = "ratedLowSpeedTotalCoolingCapacity")]
    LowSpeedTotalCoolingCapacity,
    #[strum(serialize = "ratedHighSpeedCOP")]
    HighSpeedCop,
    #[strum(serialize = "ratedLowSpeedCOP")]
    LowSpeedCop,
}

impl RatedField {
    fn is_capacity(&self) -> bool {
        matches!(
            self,
            RatedField::HighSpeedTotalCoolingCapacity | RatedField::LowSpeedTotalCoolingCapacity
        )
    }

    fn name_tag(&self) -> &'static str {
        if self.is_capacity() {
            "coilCap"
        } else {
            "coilEff"
        }
    }

    fn value_mut<'a>(&self, coil: &'a mut TwoSpeedDxCoil) -> &'a mut Option<f64> {
        match self {
            RatedField::HighSpeedTotalCoolingCapacity => {
                &mut coil.rated_high_speed_total_cooling_capacity
            }
            RatedField::LowSpeedTotalCoolingCapacity => {
                &mut coil.rated_low_speed_total_cooling_capacity
            }
            RatedField::HighSpeedCop => &mut coil.rated_high_speed_cop,
            RatedField::LowSpeedCop => &mut coil.rated_low_speed_cop,
        }
    }
}

// order in which multipliers are applied to a coil
const APPLY_ORDER: [RatedField; 4] = [
    RatedField::HighSpeedTotalCoolingCapacity,
    RatedField::LowSpeedTotalCoolingCapacity,
    RatedField::HighSpeedCop,
    RatedField::LowSpeedCop,
];

// order in which multipliers appear in an altered coil's name
const NAME_ORDER: [RatedField; 4] = [
    RatedField::HighSpeedCop,
    RatedField::HighSpeedTotalCoolingCapacity,
    RatedField::LowSpeedTotalCoolingCapacity,
    RatedField::LowSpeedCop,
];

/// Multipliers for each rated value of a coil, where 1.0 leaves a value unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoilMultipliers {
    pub rated_high_speed_cooling_capacity: f64,
    pub rated_low_speed_cooling_capacity: f64,
    pub rated_high_speed_cop: f64,
    pub rated_low_speed_cop: f64,
}

impl Default for CoilMultipliers {
    fn default() -> Self {
        Self {
            rated_high_speed_cooling_capacity: 1.0,
            rated_low_speed_cooling_capacity: 1.0,
            rated_high_speed_cop: 1.0,
            rated_low_speed_cop: 1.0,
        }
    }
}

impl CoilMultipliers {
    pub fn for_field(&self, field: RatedField) -> f64 {
        match field {
            RatedField::HighSpeedTotalCoolingCapacity => self.rated_high_speed_cooling_capacity,
            RatedField::LowSpeedTotalCoolingCapacity => self.rated_low_speed_cooling_capacity,
            RatedField::HighSpeedCop => self.rated_high_speed_cop,
            RatedField::LowSpeedCop => self.rated_low_speed_cop,
        }
    }

    /// Multipliers that would change a value: not 1.0, and not rejected as negative.
    fn is_applicable(&self, field: RatedField) -> bool {
        let multiplier = self.for_field(field);
        multiplier != 1.0 && multiplier >= 0.
    }

    fn validate(&self) -> Vec<CoilMultiplierError> {
        APPLY_ORDER
            .iter()
            .filter_map(|&field| {
                let multiplier = self.for_field(field);
                (multiplier < 0.).then_some(CoilMultiplierError::NegativeMultiplier {
                    field,
                    multiplier,
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CoilMultiplierError {
    #[error("Multiplier {multiplier} for {field} cannot be negative.")]
    NegativeMultiplier { field: RatedField, multiplier: f64 },
    #[error("coil with handle {0} could not be found.")]
    CoilNotFound(String),
    #[error("coil handle is empty.")]
    EmptySelection,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoilMultiplierOutcome {
    pub coils_to_change: usize,
    pub altered_coils: Vec<String>,
    pub altered_capacity: Vec<String>,
    pub altered_efficiency: Vec<String>,
    /// Multipliers that were rejected and skipped.
    pub errors: Vec<CoilMultiplierError>,
}

impl CoilMultiplierOutcome {
    pub fn is_not_applicable(&self) -> bool {
        self.altered_coils.is_empty()
    }

    pub fn final_condition(&self) -> String {
        if self.is_not_applicable() {
            "No Coils were altered in the model".to_string()
        } else {
            format!("{} Coils objects were altered.", self.altered_coils.len())
        }
    }
}

/// Apply `multipliers` to the coils picked out by `selection`.
///
/// A negative multiplier is reported in the outcome and left unapplied; the other multipliers still
/// apply. Fields a coil has no value for are skipped.
pub fn apply_coil_multipliers(
    coils: &mut [TwoSpeedDxCoil],
    selection: &CoilSelection,
    multipliers: &CoilMultipliers,
) -> Result<CoilMultiplierOutcome, CoilMultiplierError> {
    let errors = multipliers.validate();
    for rejected in &errors {
        error!("{rejected}");
    }

    let selected: Vec<&mut TwoSpeedDxCoil> = match selection {
        CoilSelection::All => {
            info!("Applying change to ALL Coils");
            coils.iter_mut().collect()
        }
        CoilSelection::None => {
            info!("Applying change to NONE Coils");
            vec![]
        }
        CoilSelection::Single(handle) => {
            let coil = coils
                .iter_mut()
                .find(|coil| &coil.handle == handle)
                .ok_or_else(|| CoilMultiplierError::CoilNotFound(handle.clone()))?;
            info!("Applying change to {} coil", coil.name);
            vec![coil]
        }
    };

    let mut outcome = CoilMultiplierOutcome {
        coils_to_change: selected.len(),
        errors,
        ..Default::default()
    };
    info!("Coils to change: {}", outcome.coils_to_change);

    for coil in selected {
        let mut altered_coil = false;

        for field in APPLY_ORDER {
            if !multipliers.is_applicable(field) {
                continue;
            }
            let multiplier = multipliers.for_field(field);
            let coil_name = coil.name.clone();
            if let Some(value) = field.value_mut(coil) {
                info!("Applying {field} {multiplier}x multiplier to {coil_name}.");
                *value *= multiplier;
                if field.is_capacity() {
                    outcome.altered_capacity.push(coil.handle.clone());
                } else {
                    outcome.altered_efficiency.push(coil.handle.clone());
                }
                altered_coil = true;
            }
        }

        if altered_coil {
            outcome.altered_coils.push(coil.handle.clone());
            coil.name = altered_name(&coil.name, multipliers);
            info!("coil name changed to: {}", coil.name);
        }
    }

    info!("{}", outcome.final_condition());
    Ok(outcome)
}

fn altered_name(name: &str, multipliers: &CoilMultipliers) -> String {
    let mut altered = name.to_string();
    for field in NAME_ORDER {
        if multipliers.is_applicable(field) {
            altered.push_str(&format!(
                " {}x {}",
                format_multiplier(multipliers.for_field(field)),
                field.name_tag()
            ));
        }
    }
    altered
}

fn format_multiplier(multiplier: f64) -> String {
    let rounded = round_to(multiplier, 2);
    if rounded.fract() == 0. {
        format!("{rounded:.1}")
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn coils() -> Vec<TwoSpeedDxCoil> {
        vec![
            TwoSpeedDxCoil {
                handle: "{coil-1}".to_string(),
                name: "Coil 1".to_string(),
                rated_high_speed_total_cooling_capacity: Some(10_000.),
                rated_low_speed_total_cooling_capacity: Some(4_000.),
                rated_high_speed_cop: Some(3.0),
                rated_low_speed_cop: Some(3.5),
            },
            TwoSpeedDxCoil {
                handle: "{coil-2}".to_string(),
                name: "Coil 2".to_string(),
                // autosized
                rated_high_speed_total_cooling_capacity: None,
                rated_low_speed_total_cooling_capacity: None,
                rated_high_speed_cop: Some(2.8),
                rated_low_speed_cop: None,
            },
        ]
    }

    #[rstest]
    #[case("ALL", CoilSelection::All)]
    #[case("NONE", CoilSelection::None)]
    #[case("{coil-1}", CoilSelection::Single("{coil-1}".to_string()))]
    fn should_parse_selection(#[case] input: &str, #[case] expected: CoilSelection) {
        assert_eq!(input.parse::<CoilSelection>().unwrap(), expected);
    }

    #[rstest]
    fn should_reject_empty_selection() {
        assert_eq!(
            "".parse::<CoilSelection>(),
            Err(CoilMultiplierError::EmptySelection)
        );
    }

    #[rstest]
    fn should_scale_all_coils_and_skip_missing_fields(mut coils: Vec<TwoSpeedDxCoil>) {
        let multipliers = CoilMultipliers {
            rated_high_speed_cooling_capacity: 1.1,
            rated_high_speed_cop: 0.9,
            ..Default::default()
        };
        let outcome = apply_coil_multipliers(&mut coils, &CoilSelection::All, &multipliers).unwrap();

        assert_eq!(outcome.coils_to_change, 2);
        assert_eq!(outcome.altered_coils, vec!["{coil-1}", "{coil-2}"]);
        assert_eq!(outcome.altered_capacity, vec!["{coil-1}"]);
        assert_eq!(outcome.altered_efficiency, vec!["{coil-1}", "{coil-2}"]);
        assert!((coils[0].rated_high_speed_total_cooling_capacity.unwrap() - 11_000.).abs() < 1e-9);
        assert_eq!(coils[0].rated_low_speed_total_cooling_capacity, Some(4_000.));
        assert!((coils[1].rated_high_speed_cop.unwrap() - 2.52).abs() < 1e-9);
        assert_eq!(coils[1].rated_high_speed_total_cooling_capacity, None);
        assert_eq!(coils[0].name, "Coil 1 0.9x coilEff 1.1x coilCap");
        assert_eq!(outcome.final_condition(), "2 Coils objects were altered.");
    }

    #[rstest]
    fn should_only_change_selected_coil(mut coils: Vec<TwoSpeedDxCoil>) {
        let multipliers = CoilMultipliers {
            rated_low_speed_cop: 2.0,
            ..Default::default()
        };
        let selection = CoilSelection::Single("{coil-1}".to_string());
        let outcome = apply_coil_multipliers(&mut coils, &selection, &multipliers).unwrap();

        assert_eq!(outcome.altered_coils, vec!["{coil-1}"]);
        assert_eq!(coils[0].rated_low_speed_cop, Some(7.0));
        assert_eq!(coils[0].name, "Coil 1 2.0x coilEff");
        assert_eq!(coils[1].name, "Coil 2");
    }

    #[rstest]
    fn should_fail_for_unknown_coil(mut coils: Vec<TwoSpeedDxCoil>) {
        let selection = CoilSelection::Single("{missing}".to_string());
        assert_eq!(
            apply_coil_multipliers(&mut coils, &selection, &CoilMultipliers::default()),
            Err(CoilMultiplierError::CoilNotFound("{missing}".to_string()))
        );
    }

    #[rstest]
    fn should_skip_negative_multiplier_and_report_it(mut coils: Vec<TwoSpeedDxCoil>) {
        let multipliers = CoilMultipliers {
            rated_high_speed_cooling_capacity: -2.0,
            rated_low_speed_cooling_capacity: 1.5,
            ..Default::default()
        };
        let outcome = apply_coil_multipliers(&mut coils, &CoilSelection::All, &multipliers).unwrap();

        assert_eq!(
            outcome.errors,
            vec![CoilMultiplierError::NegativeMultiplier {
                field: RatedField::HighSpeedTotalCoolingCapacity,
                multiplier: -2.0,
            }]
        );
        assert_eq!(coils[0].rated_high_speed_total_cooling_capacity, Some(10_000.));
        assert_eq!(coils[0].rated_low_speed_total_cooling_capacity, Some(6_000.));
        assert_eq!(coils[0].name, "Coil 1 1.5x coilCap");
        // coil 2 has no low speed capacity to scale
        assert_eq!(outcome.altered_coils, vec!["{coil-1}"]);
    }

    #[rstest]
    fn should_be_not_applicable_when_nothing_altered(mut coils: Vec<TwoSpeedDxCoil>) {
        let outcome =
            apply_coil_multipliers(&mut coils, &CoilSelection::All, &CoilMultipliers::default())
                .unwrap();
        assert!(outcome.is_not_applicable());
        assert_eq!(outcome.final_condition(), "No Coils were altered in the model");

        let outcome = apply_coil_multipliers(
            &mut coils,
            &CoilSelection::None,
            &CoilMultipliers {
                rated_high_speed_cop: 2.0,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(outcome.coils_to_change, 0);
        assert!(outcome.is_not_applicable());
    }

    #[rstest]
    fn should_format_multipliers_to_two_decimal_places() {
        assert_eq!(format_multiplier(1.2345), "1.23");
        assert_eq!(format_multiplier(2.0), "2.0");
        assert_eq!(format_multiplier(0.5), "0.5");
    }
}
