//! Ways a single hit or channel can fail to calibrate

use crate::ModuleKey;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

/// Per-hit calibration failures. None of these stop a run: the affected hit
/// or channel is simply left uncalibrated for the current event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalError {
    #[error("no fine time data")]
    NoData,
    #[error("no calibration parameters for module {0}")]
    MissingCalibration(ModuleKey),
    #[error("geometry {0} outside the declared detector bounds")]
    UnresolvedGeometry(String),
    #[error("bad time in ns: module {key}, coarse {coarse}, fine {fine}, time in ns {ns}")]
    RangeViolation {
        key: ModuleKey,
        coarse: u32,
        fine: u32,
        ns: f64,
    },
    #[error("fine code {fine} outside [0, {range})")]
    FineOutOfRange { fine: u32, range: usize },
    #[error("negative time over threshold {width} ns (leading {leading}, trailing {trailing})")]
    NegativeWidth {
        leading: f64,
        trailing: f64,
        width: f64,
    },
    #[error("invalid calibration curve: {0}")]
    InvalidCurve(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    /// Expected during normal running (missing data, unmapped channels)
    Low,
    /// Suspicious but the value is still usable
    Warning,
    /// Points at a defective curve or corrupted raw data
    High,
}

impl CalError {
    pub fn severity(&self) -> Severity {
        match self {
            CalError::NoData
            | CalError::MissingCalibration(_)
            | CalError::UnresolvedGeometry(_) => Severity::Low,
            CalError::NegativeWidth { .. } => Severity::Warning,
            CalError::RangeViolation { .. }
            | CalError::FineOutOfRange { .. }
            | CalError::InvalidCurve(_)
            | CalError::Config(_) => Severity::High,
        }
    }

    /// Log at the level matching the severity
    pub fn report(&self) {
        match (self, self.severity()) {
            (CalError::NoData, _) => trace!("{}", self),
            (_, Severity::Low) => debug!("{}", self),
            (_, Severity::Warning) => warn!("{}", self),
            (_, Severity::High) => error!("{}", self),
        }
    }
}
