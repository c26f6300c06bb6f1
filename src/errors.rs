use crate::core::coil_multiplier::CoilMultiplierError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalibrationReportError {
    #[error("Request was considered invalid due to error: {0}")]
    InvalidRequest(#[from] anyhow::Error),
    #[error("Error while writing calibration report output: {0}")]
    FailureInOutput(OutputError),
    #[error("Coil multipliers could not be applied: {0}")]
    CoilMultiplier(#[from] CoilMultiplierError),
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct OutputError {
    error: anyhow::Error,
}

impl OutputError {
    pub(crate) fn new(error: anyhow::Error) -> Self {
        Self { error }
    }
}
