pub mod billing;
pub mod coil_multiplier;
pub mod guidelines;
pub mod metrics;
pub mod missing_data;
pub mod report;
pub mod run_values;
pub mod units;
