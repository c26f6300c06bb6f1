use serde::{Deserialize, Serialize};

pub const ASHRAE_14: &str = "ASHRAE14";
pub const FEMP: &str = "FEMP";

/// A named calibration standard with its acceptance limits, in percent.
///
/// Either limit may be left undefined by a guideline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalibrationGuideline {
    name: String,
    max_nmbe: Option<f64>,
    max_cvrmse: Option<f64>,
}

impl CalibrationGuideline {
    pub fn new(name: &str, max_nmbe: Option<f64>, max_cvrmse: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            max_nmbe,
            max_cvrmse,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn with_thresholds(&self, thresholds: &GuidelineThresholdsInput) -> Self {
        Self::new(&self.name, thresholds.max_nmbe, thresholds.max_cvrmse)
    }
}

pub fn max_nmbe(guideline: &CalibrationGuideline) -> Option<f64> {
    guideline.max_nmbe
}

pub fn max_cvrmse(guideline: &CalibrationGuideline) -> Option<f64> {
    guideline.max_cvrmse
}

/// Replacement limits for a built-in guideline. A limit left out becomes undefined.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GuidelineThresholdsInput {
    #[serde(rename = "maxNMBE", alias = "max_nmbe")]
    pub max_nmbe: Option<f64>,
    #[serde(rename = "maxCVRMSE", alias = "max_cvrmse")]
    pub max_cvrmse: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GuidelineOverrides {
    #[serde(rename = "ASHRAE14", alias = "ashrae14")]
    pub ashrae_14: Option<GuidelineThresholdsInput>,
    #[serde(rename = "FEMP", alias = "femp")]
    pub femp: Option<GuidelineThresholdsInput>,
}

/// The two guidelines a calibration report is checked against, ASHRAE Guideline 14 first and FEMP
/// second.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationGuidelines {
    pub ashrae_14: CalibrationGuideline,
    pub femp: CalibrationGuideline,
}

impl CalibrationGuidelines {
    pub fn with_overrides(overrides: Option<&GuidelineOverrides>) -> Self {
        let defaults = Self::default();
        let Some(overrides) = overrides else {
            return defaults;
        };

        Self {
            ashrae_14: overrides
                .ashrae_14
                .as_ref()
                .map(|thresholds| defaults.ashrae_14.with_thresholds(thresholds))
                .unwrap_or(defaults.ashrae_14.clone()),
            femp: overrides
                .femp
                .as_ref()
                .map(|thresholds| defaults.femp.with_thresholds(thresholds))
                .unwrap_or(defaults.femp.clone()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CalibrationGuideline> {
        [&self.ashrae_14, &self.femp].into_iter()
    }
}

impl Default for CalibrationGuidelines {
    // monthly billing data limits
    fn default() -> Self {
        Self {
            ashrae_14: CalibrationGuideline::new(ASHRAE_14, Some(5.0), Some(15.0)),
            femp: CalibrationGuideline::new(FEMP, Some(5.0), Some(15.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_provide_builtin_guidelines_in_order() {
        let guidelines = CalibrationGuidelines::default();
        let names: Vec<&str> = guidelines.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec![ASHRAE_14, FEMP]);
        assert_eq!(max_nmbe(&guidelines.ashrae_14), Some(5.0));
        assert_eq!(max_cvrmse(&guidelines.femp), Some(15.0));
    }

    #[rstest]
    fn should_leave_undefined_threshold_as_none() {
        let guideline = CalibrationGuideline::new("Custom", Some(10.), None);
        assert_eq!(max_cvrmse(&guideline), None);
    }

    #[rstest]
    fn should_apply_overrides_to_named_guideline_only() {
        let overrides = GuidelineOverrides {
            ashrae_14: None,
            femp: Some(GuidelineThresholdsInput {
                max_nmbe: Some(10.),
                max_cvrmse: None,
            }),
        };
        let guidelines = CalibrationGuidelines::with_overrides(Some(&overrides));

        assert_eq!(guidelines.ashrae_14, CalibrationGuidelines::default().ashrae_14);
        assert_eq!(guidelines.femp.name(), FEMP);
        assert_eq!(max_nmbe(&guidelines.femp), Some(10.));
        assert_eq!(max_cvrmse(&guidelines.femp), None);
    }
}
