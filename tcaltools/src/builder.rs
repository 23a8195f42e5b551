//! Accumulation of fine-code statistics and derivation of curves
//!
//! A `CurveBuilder` owns one histogram per module while a calibration run is
//! filling. `finalize` consumes it and hands out the frozen `CurveSet`, so
//! a curve can never change once consumers see it.

use chrono::Local;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::addr::Addressing;
use crate::cfg::{Calibration, Timing};
use crate::curve::{Curve, CurveSet};
use crate::{CalError, ModuleKey, RawEdge};

/// Fine-code counts of one module
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    counts: Vec<u64>,
    total: u64,
}

impl Histogram {
    pub fn new(fine_range: usize) -> Self {
        Histogram {
            counts: vec![0; fine_range],
            total: 0,
        }
    }

    #[inline]
    pub fn fill(&mut self, fine: u32) -> Result<(), CalError> {
        let range = self.counts.len();
        let bin = self
            .counts
            .get_mut(fine as usize)
            .ok_or(CalError::FineOutOfRange { fine, range })?;
        *bin += 1;
        self.total += 1;
        Ok(())
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn curve(&self, period: f64) -> Option<Curve> {
        Curve::from_histogram(&self.counts, period)
    }
}

#[derive(Clone)]
pub struct CurveBuilder {
    name: String,
    timing: Timing,
    modules: usize,
    min_stats: u64,
    hists: HashMap<ModuleKey, Histogram>,
}

impl CurveBuilder {
    /// Empty builder for keys `0..modules`
    pub fn new(name: &str, timing: Timing, modules: usize, min_stats: u64) -> Self {
        CurveBuilder {
            name: name.to_string(),
            timing,
            modules,
            min_stats,
            hists: HashMap::new(),
        }
    }

    pub fn from_config<A: Addressing>(cfg: &Calibration, addr: &A) -> Self {
        CurveBuilder::new(&cfg.name, cfg.timing, addr.modules(), cfg.min_stats)
    }

    /// Count one fine code for `key`. Hits without data are skipped.
    pub fn fill(&mut self, key: ModuleKey, fine: Option<u32>) -> Result<(), CalError> {
        let fine = match fine {
            Some(f) => f,
            None => return Ok(()),
        };
        if key.0 as usize >= self.modules {
            return Err(CalError::UnresolvedGeometry(format!("module {}", key)));
        }
        let range = self.timing.fine_range;
        if fine as usize >= range {
            return Err(CalError::FineOutOfRange { fine, range });
        }
        self.hists
            .entry(key)
            .or_insert_with(|| Histogram::new(range))
            .fill(fine)
    }

    /// Fill all edges of one event, returning how many were rejected
    pub fn fill_hits<A: Addressing>(&mut self, addr: &A, hits: &[RawEdge<A::Geometry>]) -> u64 {
        self.fill_each(addr, hits, true)
    }

    /// Like `fill_hits`, for hits whose failures an `EventCalibrator` has
    /// already reported and counted
    pub fn absorb_hits<A: Addressing>(&mut self, addr: &A, hits: &[RawEdge<A::Geometry>]) -> u64 {
        self.fill_each(addr, hits, false)
    }

    fn fill_each<A: Addressing>(&mut self, addr: &A, hits: &[RawEdge<A::Geometry>], report: bool) -> u64 {
        let mut rejected = 0;
        for hit in hits {
            let res = match addr.resolve(&hit.geom, hit.edge) {
                Some(key) => self.fill(key, hit.fine),
                None => Err(CalError::UnresolvedGeometry(format!("{:?}", hit.geom))),
            };
            if let Err(e) = res {
                rejected += 1;
                if report {
                    e.report();
                }
            }
        }
        rejected
    }

    /// Hits counted so far, per module
    pub fn stats(&self) -> BTreeMap<ModuleKey, u64> {
        self.hists.iter().map(|(&k, h)| (k, h.total())).collect()
    }

    pub fn histogram(&self, key: ModuleKey) -> Option<&Histogram> {
        self.hists.get(&key)
    }

    /// Derive curves for the modules that reached `min_stats` and restart
    /// their histograms. Modules still below the threshold keep counting.
    pub fn harvest(&mut self) -> CurveSet {
        let min_stats = self.min_stats;
        let (ready, pending): (HashMap<_, _>, HashMap<_, _>) = std::mem::take(&mut self.hists)
            .into_iter()
            .partition(|(_, h)| h.total() >= min_stats);
        self.hists = pending;
        CurveBuilder {
            name: self.name.clone(),
            timing: self.timing,
            modules: self.modules,
            min_stats,
            hists: ready,
        }
        .finalize()
    }

    /// Derive curves for every module with at least `min_stats` hits.
    /// Modules below the threshold are left out and stay uncalibrated.
    pub fn finalize(self) -> CurveSet {
        let period = self.timing.period();
        let min_stats = self.min_stats;
        let mut curves: Vec<(ModuleKey, Curve)> = self
            .hists
            .into_par_iter()
            .filter_map(|(key, hist)| {
                if hist.total() < min_stats {
                    debug!("module {}: {} hits, {} needed", key, hist.total(), min_stats);
                    return None;
                }
                hist.curve(period).map(|c| (key, c))
            })
            .collect();
        curves.sort_by_key(|(k, _)| *k);

        let mut set = CurveSet::new(&self.name, self.timing);
        set.timestamp = Some(Local::now());
        for (key, curve) in curves {
            // every histogram has fine_range bins, so this cannot fail
            if let Err(e) = set.insert(key, curve) {
                e.report();
            }
        }
        info!("{}: calibrated {} modules", self.name, set.len());
        set
    }
}
