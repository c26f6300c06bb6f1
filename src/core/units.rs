pub const WATTS_PER_KILOWATT: u32 = 1_000;
pub const JOULES_PER_KILOWATT_HOUR: u32 = 3_600_000;
pub const JOULES_PER_THERM: f64 = 105_505_585.257;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[rstest]
    fn should_relate_therms_to_kilowatt_hours() {
        assert_relative_eq!(
            JOULES_PER_THERM / JOULES_PER_KILOWATT_HOUR as f64,
            29.3071,
            max_relative = 1e-5
        );
    }
}
