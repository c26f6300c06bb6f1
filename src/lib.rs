pub mod core;
pub mod errors;
pub mod input;
pub mod output;

pub use crate::core::report::{build_report, CalibrationReport, ReportFlags};
use crate::core::coil_multiplier::{
    apply_coil_multipliers, CoilMultiplierOutcome, CoilMultipliers, CoilSelection, TwoSpeedDxCoil,
};
use crate::core::guidelines::CalibrationGuidelines;
use crate::errors::{CalibrationReportError, OutputError};
use crate::input::{ingest_coils, ingest_for_processing};
use crate::output::Output;
use std::io::{Read, Write};
use tracing::info;

pub const REPORT_OUTPUT_KEY: &str = "calibration_report";
pub const RUN_VALUES_OUTPUT_KEY: &str = "calibration_values";
pub const COILS_OUTPUT_KEY: &str = "coils";

// variable names the report template reads the guideline limits from, in guideline order
const GUIDELINE_VARIABLE_PREFIXES: [&str; 2] = ["ashrae", "femp"];

/// Build a calibration report from a JSON model snapshot and write it to `output`.
///
/// A model missing its run period or calendar year still gets a report; this only fails when the
/// input cannot be read or the report cannot be written.
pub fn run_report(
    input: impl Read,
    output: impl Output,
    flags: ReportFlags,
) -> Result<CalibrationReport, CalibrationReportError> {
    let input = ingest_for_processing(input)?;
    let guidelines = CalibrationGuidelines::with_overrides(input.calibration_guidelines.as_ref());

    let report = build_report(&input, &guidelines, flags);

    if !output.is_noop() {
        write_report_output(output, &report)
            .map_err(|error| CalibrationReportError::FailureInOutput(OutputError::new(error)))?;
    }

    Ok(report)
}

/// Render a report as a block of script variable declarations that a report template can embed
/// directly.
pub fn render_script_block(report: &CalibrationReport) -> anyhow::Result<String> {
    let payload = &report.payload;
    let mut block = String::new();

    let guideline_names: Vec<&String> = payload.calibration_guidelines.keys().collect();
    block.push_str(&format!(
        "var calibrationGuidelines = {};\n",
        serde_json::to_string(&guideline_names)?
    ));
    for (prefix, thresholds) in GUIDELINE_VARIABLE_PREFIXES
        .iter()
        .zip(payload.calibration_guidelines.values())
    {
        block.push_str(&format!(
            "var {prefix}MaxNMBE = {};\n",
            serde_json::to_string(&thresholds.max_nmbe)?
        ));
        block.push_str(&format!(
            "var {prefix}MaxCVRMSE = {};\n",
            serde_json::to_string(&thresholds.max_cvrmse)?
        ));
    }
    block.push_str(&format!("var missingData = {};\n", report.missing_data));
    block.push_str(&format!(
        "var utilityBills = {};\n",
        serde_json::to_string_pretty(&report.bills)?
    ));
    block.push_str(&format!(
        "var consumption = {};\n",
        serde_json::to_string_pretty(&payload.consumption)?
    ));

    Ok(block)
}

fn write_report_output(output: impl Output, report: &CalibrationReport) -> anyhow::Result<()> {
    let script_block = render_script_block(report)?;
    info!("writing out to {REPORT_OUTPUT_KEY}");
    let mut writer = output.writer_for_location_key(REPORT_OUTPUT_KEY, "js")?;
    writer.write_all(script_block.as_bytes())?;
    writer.flush()?;

    if report.run_values.is_enabled() {
        let run_values = serde_json::to_string_pretty(&report.run_values)?;
        info!("writing out to {RUN_VALUES_OUTPUT_KEY}");
        let mut writer = output.writer_for_location_key(RUN_VALUES_OUTPUT_KEY, "json")?;
        writer.write_all(run_values.as_bytes())?;
        writer.flush()?;
    }

    Ok(())
}

/// Apply coil multipliers to the coils in a JSON coil list, writing the adjusted coils to `output`.
pub fn run_coil_multiplier(
    input: impl Read,
    output: impl Output,
    selection: &CoilSelection,
    multipliers: &CoilMultipliers,
) -> Result<(Vec<TwoSpeedDxCoil>, CoilMultiplierOutcome), CalibrationReportError> {
    let mut coils = ingest_coils(input)?;
    let outcome = apply_coil_multipliers(&mut coils, selection, multipliers)?;

    if !output.is_noop() {
        write_coils_output(output, &coils)
            .map_err(|error| CalibrationReportError::FailureInOutput(OutputError::new(error)))?;
    }

    Ok((coils, outcome))
}

fn write_coils_output(output: impl Output, coils: &[TwoSpeedDxCoil]) -> anyhow::Result<()> {
    let coils = serde_json::to_string_pretty(&serde_json::json!({ "coils": coils }))?;
    info!("writing out to {COILS_OUTPUT_KEY}");
    let mut writer = output.writer_for_location_key(COILS_OUTPUT_KEY, "json")?;
    writer.write_all(coils.as_bytes())?;
    writer.flush()?;

    Ok(())
}
