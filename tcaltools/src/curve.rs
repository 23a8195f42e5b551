//! Frozen per-module lookup tables from fine code to nanoseconds

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::sync::Arc;

use crate::cfg::Timing;
use crate::{CalError, ModuleKey};

/// Nonlinearity correction for one module: `ns[fine]` is the calibrated
/// sub-cycle time of a fine code. Values are finite and non-decreasing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Curve {
    ns: Vec<f64>,
}

impl Curve {
    /// Integral linearization of a fine-code histogram: each code maps to
    /// the fraction of all counts at or below it, scaled to one clock period.
    /// Returns `None` for an empty histogram.
    pub fn from_histogram(counts: &[u64], period: f64) -> Option<Curve> {
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return None;
        }
        let total = total as f64;
        let mut sum = 0u64;
        let ns = counts
            .iter()
            .map(|&c| {
                sum += c;
                // sum / total is exactly 1.0 for the last code
                period * (sum as f64 / total)
            })
            .collect();
        Some(Curve { ns })
    }

    /// Ideal digitizer: equal-width bins from 0 to `period`
    pub fn linear(fine_range: usize, period: f64) -> Curve {
        let last = fine_range.saturating_sub(1).max(1) as f64;
        let ns = (0..fine_range)
            .map(|i| period * (i as f64 / last))
            .collect();
        Curve { ns }
    }

    /// Calibrated time for `fine`, or `None` past the end of the table
    #[inline]
    pub fn get(&self, fine: u32) -> Option<f64> {
        self.ns.get(fine as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.ns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ns.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.ns
    }
}

impl TryFrom<Vec<f64>> for Curve {
    type Error = CalError;

    fn try_from(ns: Vec<f64>) -> Result<Self, Self::Error> {
        if ns.is_empty() {
            return Err(CalError::InvalidCurve("empty curve".to_string()));
        }
        if let Some(i) = ns.iter().position(|x| !x.is_finite()) {
            return Err(CalError::InvalidCurve(format!("non-finite value at fine code {}", i)));
        }
        if let Some(i) = ns.windows(2).position(|w| w[1] < w[0]) {
            return Err(CalError::InvalidCurve(format!("decreasing at fine code {}", i + 1)));
        }
        Ok(Curve { ns })
    }
}

impl From<Curve> for Vec<f64> {
    fn from(c: Curve) -> Self {
        c.ns
    }
}

/// All curves of one calibration run, keyed by module
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CurveSet {
    pub name: String,
    pub timestamp: Option<DateTime<Local>>,
    pub timing: Timing,
    curves: BTreeMap<ModuleKey, Curve>,
}

impl CurveSet {
    pub fn new(name: &str, timing: Timing) -> Self {
        CurveSet {
            name: name.to_string(),
            timestamp: None,
            timing,
            curves: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: ModuleKey) -> Option<&Curve> {
        self.curves.get(&key)
    }

    /// Add or replace a module's curve. The curve must cover the full fine range.
    pub fn insert(&mut self, key: ModuleKey, curve: Curve) -> Result<Option<Curve>, CalError> {
        if curve.len() != self.timing.fine_range {
            return Err(CalError::InvalidCurve(format!(
                "module {} has {} fine codes, expected {}",
                key,
                curve.len(),
                self.timing.fine_range
            )));
        }
        Ok(self.curves.insert(key, curve))
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleKey, &Curve)> {
        self.curves.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModuleKey> {
        self.curves.keys()
    }

    /// Overlay a newer run: its modules replace ours, modules it lacks are kept.
    /// Both runs must share one timing, otherwise nothing changes.
    pub fn merge(&mut self, newer: CurveSet) -> Result<(), CalError> {
        if self.timing != newer.timing {
            return Err(CalError::Config(format!(
                "cannot merge curves for {:?} into curves for {:?}",
                newer.timing, self.timing
            )));
        }
        self.name = newer.name;
        self.timestamp = newer.timestamp;
        self.curves.extend(newer.curves);
        Ok(())
    }

    /// Check every curve against the declared timing, e.g. after reading from disk
    pub fn validate(&self) -> Result<(), CalError> {
        self.timing.validate()?;
        for (key, curve) in self.curves.iter() {
            if curve.len() != self.timing.fine_range {
                return Err(CalError::InvalidCurve(format!(
                    "module {} has {} fine codes, expected {}",
                    key,
                    curve.len(),
                    self.timing.fine_range
                )));
            }
        }
        Ok(())
    }
}

/// Current curve set shared between a builder and its consumers.
///
/// Readers take one `snapshot` per event; `swap` replaces the whole set at
/// once, so an event sees either the old or the new curves, never a mix.
#[derive(Clone, Default)]
pub struct SharedCurves {
    inner: Arc<RwLock<Arc<CurveSet>>>,
}

impl SharedCurves {
    pub fn new(curves: CurveSet) -> Self {
        SharedCurves {
            inner: Arc::new(RwLock::new(Arc::new(curves))),
        }
    }

    pub fn snapshot(&self) -> Arc<CurveSet> {
        self.inner.read().clone()
    }

    /// Install a new set, returning the one it replaced
    pub fn swap(&self, curves: CurveSet) -> Arc<CurveSet> {
        let mut cur = self.inner.write();
        std::mem::replace(&mut *cur, Arc::new(curves))
    }
}
