use crate::core::billing::{BillingPeriod, FuelType, UtilityBill};
use crate::core::guidelines::{max_cvrmse, max_nmbe, CalibrationGuideline, CalibrationGuidelines};
use crate::core::metrics::{
    bill_demand_nmbe, consumption_totals, max_peak_demand, modeled_consumption,
    modeled_peak_demand, period_consumption_nmbe, period_demand_nmbe, round_to, ConsumptionTotals,
};
use crate::core::missing_data::{
    check_preconditions, zero_placeholder, FinalCondition, MissingPrecondition, OrNotApplicable,
};
use crate::core::run_values::RunValues;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;
use tracing::{debug, info};

/// What a calibration report needs to know about the model it reports on.
pub trait CalibrationSource {
    fn has_run_period(&self) -> bool;
    /// `None` when the model has no year description, `Some(None)` when the year description has
    /// no calendar year.
    fn calendar_year(&self) -> Option<Option<i32>>;
    fn utility_bills(&self) -> &[UtilityBill];
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ReportFlags {
    /// Whether to register per-bill and per-period scalar values alongside the report.
    pub extended_telemetry_enabled: bool,
}

/// A fuel/metric grouping of billing data in the report.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
pub enum BucketKind {
    #[serde(rename = "Electricity Consumption")]
    #[strum(serialize = "Electricity Consumption")]
    ElectricityConsumption,
    #[serde(rename = "Electricity Demand")]
    #[strum(serialize = "Electricity Demand")]
    ElectricityDemand,
    #[serde(rename = "Natural Gas Consumption")]
    #[strum(serialize = "Natural Gas Consumption")]
    NaturalGasConsumption,
}

impl BucketKind {
    pub fn units(&self) -> &'static str {
        match self {
            BucketKind::ElectricityConsumption => "kWh",
            BucketKind::ElectricityDemand => "kW",
            BucketKind::NaturalGasConsumption => "therms",
        }
    }
}

/// Parallel per-period series for one bucket. Every series has one entry per contributing billing
/// period, in period order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BucketSeries {
    #[serde(rename = "Start")]
    pub start: Vec<String>,
    #[serde(rename = "End")]
    pub end: Vec<String>,
    #[serde(rename = "Actual")]
    pub actual: Vec<f64>,
    #[serde(rename = "Model")]
    pub model: Vec<f64>,
    #[serde(rename = "NMBE")]
    pub nmbe: Vec<f64>,
}

impl BucketSeries {
    fn push(
        &mut self,
        period: &BillingPeriod,
        actual: Option<f64>,
        model: Option<f64>,
        nmbe: Option<f64>,
    ) {
        self.start.push(period.display_start_date());
        self.end.push(period.display_end_date());
        self.actual.push(zero_placeholder(actual));
        self.model.push(zero_placeholder(model));
        self.nmbe.push(zero_placeholder(nmbe));
    }

    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    pub fn is_aligned(&self) -> bool {
        let len = self.len();
        [
            self.end.len(),
            self.actual.len(),
            self.model.len(),
            self.nmbe.len(),
        ]
        .iter()
        .all(|&other| other == len)
    }
}

/// A bill contributing to a bucket, with its upstream CVRMSE and NMBE to two decimal places.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BucketBill {
    pub index: usize,
    pub name: String,
    #[serde(rename = "CVRMSE")]
    pub cvrmse: OrNotApplicable,
    #[serde(rename = "NMBE")]
    pub nmbe: OrNotApplicable,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bucket {
    pub units: &'static str,
    pub bills: Vec<BucketBill>,
    pub data: BucketSeries,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GuidelineThresholds {
    #[serde(rename = "maxNMBE")]
    pub max_nmbe: OrNotApplicable,
    #[serde(rename = "maxCVRMSE")]
    pub max_cvrmse: OrNotApplicable,
}

impl From<&CalibrationGuideline> for GuidelineThresholds {
    fn from(guideline: &CalibrationGuideline) -> Self {
        Self {
            max_nmbe: max_nmbe(guideline).into(),
            max_cvrmse: max_cvrmse(guideline).into(),
        }
    }
}

/// The data a calibration report is rendered from.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportPayload {
    pub calibration_guidelines: IndexMap<String, GuidelineThresholds>,
    pub consumption: IndexMap<BucketKind, Bucket>,
}

impl ReportPayload {
    pub fn bucket(&self, kind: BucketKind) -> Option<&Bucket> {
        self.consumption.get(&kind)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub index: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub consumption_actual: Option<f64>,
    pub consumption_modeled: Option<f64>,
    pub consumption_nmbe: Option<f64>,
    pub peak_demand_actual: Option<f64>,
    pub peak_demand_modeled: Option<f64>,
    pub peak_demand_nmbe: Option<f64>,
}

/// Bill-level results, for display next to the charts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BillSummary {
    pub index: usize,
    pub name: String,
    pub fuel_type: FuelType,
    pub has_demand: bool,
    pub cvrmse: Option<f64>,
    pub nmbe: Option<f64>,
    pub consumption: ConsumptionTotals,
    pub peak_demand_actual: f64,
    pub peak_demand_modeled: f64,
    pub peak_demand_nmbe: Option<f64>,
    pub periods: Vec<PeriodSummary>,
}

#[derive(Clone, Debug)]
pub struct CalibrationReport {
    pub payload: ReportPayload,
    pub missing_data: bool,
    pub missing_preconditions: Vec<MissingPrecondition>,
    pub final_condition: FinalCondition,
    pub bills: Vec<BillSummary>,
    pub run_values: RunValues,
}

/// Build a calibration report for every utility bill of `source`, in source order.
///
/// This never fails: missing model context is flagged on the returned report and missing readings
/// are left out of the statistics.
pub fn build_report(
    source: &impl CalibrationSource,
    guidelines: &CalibrationGuidelines,
    flags: ReportFlags,
) -> CalibrationReport {
    let missing_preconditions =
        check_preconditions(source.has_run_period(), source.calendar_year());

    let mut aggregator = ReportAggregator::new(guidelines, flags);
    for (bill_idx, bill) in source.utility_bills().iter().enumerate() {
        aggregator.add_bill(bill_idx + 1, bill);
    }

    aggregator.finish(missing_preconditions)
}

#[derive(Debug, Default)]
struct BucketAccumulator {
    contributed: bool,
    bills: Vec<BucketBill>,
    series: BucketSeries,
}

impl BucketAccumulator {
    fn into_bucket(self, kind: BucketKind) -> Option<Bucket> {
        self.contributed.then(|| Bucket {
            units: kind.units(),
            bills: self.bills,
            data: self.series,
        })
    }
}

/// Routes billing periods into the bucket series and collects per-bill results.
///
/// Bills with a peak demand conversion factor feed the electricity consumption and demand buckets;
/// every other bill feeds the natural gas bucket.
pub struct ReportAggregator {
    calibration_guidelines: IndexMap<String, GuidelineThresholds>,
    run_values: RunValues,
    electricity: BucketAccumulator,
    demand: BucketAccumulator,
    gas: BucketAccumulator,
    bills: Vec<BillSummary>,
}

impl ReportAggregator {
    pub fn new(guidelines: &CalibrationGuidelines, flags: ReportFlags) -> Self {
        let mut run_values = RunValues::new(flags.extended_telemetry_enabled);
        for (prefix, guideline) in [("ashrae", &guidelines.ashrae_14), ("femp", &guidelines.femp)] {
            if let Some(nmbe) = max_nmbe(guideline) {
                run_values.register_number(format!("{prefix}_max_nmbe"), nmbe, Some("%"));
            }
            if let Some(cvrmse) = max_cvrmse(guideline) {
                run_values.register_number(format!("{prefix}_max_cvrmse"), cvrmse, Some("%"));
            }
        }

        Self {
            calibration_guidelines: guidelines
                .iter()
                .map(|guideline| (guideline.name().to_string(), guideline.into()))
                .collect(),
            run_values,
            electricity: Default::default(),
            demand: Default::default(),
            gas: Default::default(),
            bills: vec![],
        }
    }

    /// Add a bill, where `index` is its 1-based position among the model's bills.
    pub fn add_bill(&mut self, index: usize, bill: &UtilityBill) {
        let has_demand = bill.has_demand();
        debug!(
            "Adding utility bill {index} '{}' with {} billing periods (demand: {has_demand})",
            bill.name,
            bill.billing_periods.len()
        );

        self.run_values
            .register_text(format!("utility_bill_{index}_name"), bill.name.as_str());
        self.run_values.register_text(
            format!("utility_bill_{index}_fuel_type"),
            bill.fuel_type.to_string(),
        );
        if let Some(cvrmse) = bill.cvrmse {
            self.run_values.register_number(
                format!("utility_bill_{index}_consumption_cvrmse"),
                cvrmse,
                Some("%"),
            );
        }
        if let Some(nmbe) = bill.nmbe {
            self.run_values.register_number(
                format!("utility_bill_{index}_consumption_nmbe"),
                nmbe,
                Some("%"),
            );
        }

        let bucket_bill = BucketBill {
            index,
            name: bill.name.clone(),
            cvrmse: bill.cvrmse.map(|cvrmse| round_to(cvrmse, 2)).into(),
            nmbe: bill.nmbe.map(|nmbe| round_to(nmbe, 2)).into(),
        };
        if has_demand {
            self.electricity.bills.push(bucket_bill.clone());
            self.demand.bills.push(bucket_bill);
        } else {
            self.gas.bills.push(bucket_bill);
        }

        let periods = bill
            .billing_periods
            .iter()
            .enumerate()
            .map(|(period_idx, period)| self.add_period(index, period_idx + 1, bill, period))
            .collect();

        let conversion_factor = bill.consumption_unit_conversion_factor;
        let consumption = consumption_totals(&bill.billing_periods, conversion_factor);
        let (peak_demand_actual, peak_demand_modeled) = if has_demand {
            (
                max_peak_demand(&bill.billing_periods, |period| period.peak_demand),
                max_peak_demand(&bill.billing_periods, modeled_peak_demand),
            )
        } else {
            (0., 0.)
        };
        let peak_demand_nmbe = bill_demand_nmbe(peak_demand_actual, peak_demand_modeled);

        let consumption_unit = Some(bill.consumption_unit.as_str());
        if consumption.actual > 0. {
            self.run_values.register_number(
                format!("utility_bill_{index}_consumption_actual"),
                consumption.actual,
                consumption_unit,
            );
            self.run_values.register_number(
                format!("utility_bill_{index}_consumption_modeled"),
                consumption.modeled,
                consumption_unit,
            );
        }
        if let Some(nmbe) = peak_demand_nmbe {
            let peak_demand_unit = bill.peak_demand_unit.as_deref();
            self.run_values.register_number(
                format!("utility_bill_{index}_peak_demand_actual"),
                peak_demand_actual,
                peak_demand_unit,
            );
            self.run_values.register_number(
                format!("utility_bill_{index}_peak_demand_modeled"),
                peak_demand_modeled,
                peak_demand_unit,
            );
            self.run_values.register_number(
                format!("utility_bill_{index}_peak_demand_nmbe"),
                nmbe,
                Some("%"),
            );
        }

        self.bills.push(BillSummary {
            index,
            name: bill.name.clone(),
            fuel_type: bill.fuel_type,
            has_demand,
            cvrmse: bill.cvrmse,
            nmbe: bill.nmbe,
            consumption,
            peak_demand_actual,
            peak_demand_modeled,
            peak_demand_nmbe,
            periods,
        });
    }

    fn add_period(
        &mut self,
        bill_index: usize,
        period_index: usize,
        bill: &UtilityBill,
        period: &BillingPeriod,
    ) -> PeriodSummary {
        let has_demand = bill.has_demand();
        let conversion_factor = bill.consumption_unit_conversion_factor;
        let prefix = format!("utility_bill_{bill_index}_period_{period_index}");

        self.run_values
            .register_text(format!("{prefix}_start_date"), period.start_date.to_string());
        self.run_values
            .register_text(format!("{prefix}_end_date"), period.end_date.to_string());

        let consumption_modeled = modeled_consumption(period, conversion_factor);
        let consumption_nmbe = period_consumption_nmbe(period, conversion_factor);

        let consumption_unit = Some(bill.consumption_unit.as_str());
        if let Some(actual) = period.consumption {
            self.run_values.register_number(
                format!("{prefix}_consumption_actual"),
                actual,
                consumption_unit,
            );
        }
        if let Some(modeled) = consumption_modeled {
            self.run_values.register_number(
                format!("{prefix}_consumption_modeled"),
                modeled,
                consumption_unit,
            );
        }

        let consumption_bucket = if has_demand {
            &mut self.electricity
        } else {
            &mut self.gas
        };
        consumption_bucket.contributed |=
            period.consumption.is_some() || consumption_modeled.is_some();
        consumption_bucket.series.push(
            period,
            period.consumption,
            consumption_modeled.map(f64::round),
            consumption_nmbe.map(|nmbe| round_to(nmbe, 2)),
        );

        let (peak_demand_actual, peak_demand_modeled, peak_demand_nmbe) = if has_demand {
            let modeled = modeled_peak_demand(period);
            let nmbe = period_demand_nmbe(period);

            let peak_demand_unit = bill.peak_demand_unit.as_deref();
            if let Some(actual) = period.peak_demand {
                self.run_values.register_number(
                    format!("{prefix}_peak_demand_actual"),
                    actual,
                    peak_demand_unit,
                );
            }
            if let Some(modeled) = modeled {
                self.run_values.register_number(
                    format!("{prefix}_peak_demand_modeled"),
                    modeled,
                    peak_demand_unit,
                );
            }
            if let Some(nmbe) = nmbe {
                self.run_values.register_number(
                    format!("{prefix}_peak_demand_nmbe"),
                    nmbe,
                    Some("%"),
                );
            }

            self.demand.contributed |= period.peak_demand.is_some() || modeled.is_some();
            self.demand.series.push(
                period,
                period.peak_demand,
                modeled.map(|modeled| round_to(modeled, 1)),
                nmbe.map(|nmbe| round_to(nmbe, 2)),
            );

            (period.peak_demand, modeled, nmbe)
        } else {
            (None, None, None)
        };

        if let Some(nmbe) = consumption_nmbe {
            self.run_values
                .register_number(format!("{prefix}_consumption_nmbe"), nmbe, Some("%"));
        }

        PeriodSummary {
            index: period_index,
            start_date: period.start_date,
            end_date: period.end_date,
            consumption_actual: period.consumption,
            consumption_modeled,
            consumption_nmbe,
            peak_demand_actual,
            peak_demand_modeled,
            peak_demand_nmbe,
        }
    }

    pub fn finish(self, missing_preconditions: Vec<MissingPrecondition>) -> CalibrationReport {
        let mut consumption = IndexMap::new();
        for (kind, accumulator) in [
            (BucketKind::ElectricityConsumption, self.electricity),
            (BucketKind::ElectricityDemand, self.demand),
            (BucketKind::NaturalGasConsumption, self.gas),
        ] {
            if let Some(bucket) = accumulator.into_bucket(kind) {
                consumption.insert(kind, bucket);
            }
        }

        let missing_data = !missing_preconditions.is_empty();
        let final_condition = FinalCondition::from_missing_data(missing_data);
        info!("{final_condition}");

        CalibrationReport {
            payload: ReportPayload {
                calibration_guidelines: self.calibration_guidelines,
                consumption,
            },
            missing_data,
            missing_preconditions,
            final_condition,
            bills: self.bills,
            run_values: self.run_values,
        }
    }
}
