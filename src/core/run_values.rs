use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A named scalar recorded during a report run, for consumption by whatever hosts the run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunValue {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// Scalar metrics registered while a report is built, in the order they were registered.
///
/// Registration is a no-op unless the run was started with extended telemetry enabled.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct RunValues {
    #[serde(skip)]
    enabled: bool,
    values: IndexMap<String, RunValue>,
}

impl RunValues {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            values: Default::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn register_number(&mut self, name: impl Into<String>, value: f64, units: Option<&str>) {
        self.register(name.into(), Value::from(value), units);
    }

    pub fn register_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.register(name.into(), Value::String(value.into()), None);
    }

    fn register(&mut self, name: String, value: Value, units: Option<&str>) {
        if !self.enabled {
            return;
        }
        self.values.insert(
            name,
            RunValue {
                value,
                units: units.map(str::to_string),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&RunValue> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|run_value| run_value.value.as_f64())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RunValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    #[rstest]
    fn should_not_register_values_when_disabled() {
        let mut values = RunValues::new(false);
        values.register_number("ashrae_max_nmbe", 5., Some("%"));
        values.register_text("utility_bill_1_name", "Electric Bill");
        assert!(values.is_empty());
    }

    #[rstest]
    fn should_register_values_in_order() {
        let mut values = RunValues::new(true);
        values.register_text("utility_bill_1_name", "Electric Bill");
        values.register_number("utility_bill_1_consumption_actual", 220., Some("kWh"));

        assert_eq!(values.len(), 2);
        assert_eq!(values.number("utility_bill_1_consumption_actual"), Some(220.));
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            json!({
                "utility_bill_1_name": {"value": "Electric Bill"},
                "utility_bill_1_consumption_actual": {"value": 220.0, "units": "kWh"},
            })
        );
        let names: Vec<&String> = values.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["utility_bill_1_name", "utility_bill_1_consumption_actual"]
        );
    }
}
