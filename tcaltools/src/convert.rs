//! Conversion of single raw edges into absolute calibrated times

use std::collections::HashSet;
use std::sync::Arc;

use crate::cfg::Timing;
use crate::curve::CurveSet;
use crate::{CalError, Edge, ModuleKey, RawEdge};

/// A calibrated edge; `time_ns` counts from coarse counter zero
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CalEdge {
    pub key: ModuleKey,
    pub edge: Edge,
    pub time_ns: f64,
}

/// Absolute time of an edge from its calibrated fine time.
///
/// The fine time measures the interval up to the next clock tick, so it is
/// subtracted from the period rather than added to the coarse time.
#[inline]
pub fn absolute_time(period: f64, ns: f64, coarse: u32) -> f64 {
    period - ns + coarse as f64 * period
}

/// Applies a frozen curve set to raw edges
pub struct Converter {
    curves: Arc<CurveSet>,
    period: f64,
    /// Modules already reported as uncalibrated for the current curve set
    missing: HashSet<ModuleKey>,
}

impl Converter {
    pub fn new(curves: Arc<CurveSet>, timing: &Timing) -> Self {
        Converter {
            curves,
            period: timing.period(),
            missing: HashSet::new(),
        }
    }

    pub fn curves(&self) -> &Arc<CurveSet> {
        &self.curves
    }

    /// Switch to another curve set between events
    pub fn set_curves(&mut self, curves: Arc<CurveSet>) {
        if !Arc::ptr_eq(&self.curves, &curves) {
            self.curves = curves;
            self.missing.clear();
        }
    }

    /// Calibrate one edge already resolved to `key`
    pub fn convert<G>(&self, key: ModuleKey, raw: &RawEdge<G>) -> Result<CalEdge, CalError> {
        let fine = raw.fine.ok_or(CalError::NoData)?;
        let curve = self.curves.get(key).ok_or(CalError::MissingCalibration(key))?;
        let ns = curve.get(fine).ok_or(CalError::FineOutOfRange {
            fine,
            range: curve.len(),
        })?;

        if !(ns >= 0. && ns <= self.period) {
            return Err(CalError::RangeViolation {
                key,
                coarse: raw.coarse,
                fine,
                ns,
            });
        }

        Ok(CalEdge {
            key,
            edge: raw.edge,
            time_ns: absolute_time(self.period, ns, raw.coarse),
        })
    }

    /// Log a conversion failure; missing calibrations only once per module
    pub fn report(&mut self, err: &CalError) {
        if let CalError::MissingCalibration(key) = err {
            if !self.missing.insert(*key) {
                return;
            }
        }
        err.report();
    }
}
