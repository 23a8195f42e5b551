//! Per-event calibration: resolve, convert, group by channel, reduce widths

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::addr::Addressing;
use crate::cfg::{Calibration, Timing};
use crate::convert::Converter;
use crate::curve::CurveSet;
use crate::width::{EndRecord, Reducer, WidthPolicy};
use crate::{CalError, Edge, RawEdge};

/// Calibrated times of one physical channel in one event, one entry per
/// readout end
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelRecord<C> {
    pub channel: C,
    pub ends: Vec<EndRecord>,
}

/// Running totals over all processed events
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub events: u64,
    pub edges: u64,
    pub calibrated: u64,
    pub no_data: u64,
    pub unresolved: u64,
    pub missing: u64,
    pub out_of_range: u64,
    pub duplicates: u64,
    pub negative_widths: u64,
}

impl Counters {
    fn tally(&mut self, err: &CalError) {
        match err {
            CalError::NoData => self.no_data += 1,
            CalError::UnresolvedGeometry(_) => self.unresolved += 1,
            CalError::MissingCalibration(_) => self.missing += 1,
            CalError::NegativeWidth { .. } => self.negative_widths += 1,
            _ => self.out_of_range += 1,
        }
    }

    pub fn summary(&self, name: &str) {
        info!(
            "{}: {} events, {} edges, {} calibrated, {} without data, {} unresolved, \
             {} uncalibrated, {} out of range, {} duplicate, {} negative widths",
            name,
            self.events,
            self.edges,
            self.calibrated,
            self.no_data,
            self.unresolved,
            self.missing,
            self.out_of_range,
            self.duplicates,
            self.negative_widths,
        );
    }
}

/// Turns the raw edges of one event into channel records for one detector
pub struct EventCalibrator<A: Addressing> {
    addr: A,
    converter: Converter,
    reducer: Reducer,
    counters: Counters,
}

impl<A: Addressing> EventCalibrator<A> {
    pub fn new(
        addr: A,
        timing: Timing,
        curves: Arc<CurveSet>,
        policy: WidthPolicy,
    ) -> Result<Self, CalError> {
        timing.validate()?;
        Ok(EventCalibrator {
            addr,
            converter: Converter::new(curves, &timing),
            reducer: Reducer::new(&timing, policy),
            counters: Counters::default(),
        })
    }

    pub fn from_config(addr: A, cfg: &Calibration, curves: Arc<CurveSet>) -> Result<Self, CalError> {
        EventCalibrator::new(addr, cfg.timing, curves, cfg.negative_width)
    }

    pub fn addressing(&self) -> &A {
        &self.addr
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Use another curve set from the next event on
    pub fn set_curves(&mut self, curves: Arc<CurveSet>) {
        self.converter.set_curves(curves);
    }

    /// Calibrate one event. Records come out ordered by channel; edges that
    /// fail to resolve or convert are dropped and counted. `reference` is an
    /// optional start time that all widths are synchronized to.
    pub fn process(
        &mut self,
        hits: &[RawEdge<A::Geometry>],
        reference: Option<f64>,
    ) -> Vec<ChannelRecord<A::Channel>> {
        let nends = self.addr.ends();
        let mut channels: BTreeMap<A::Channel, Vec<EndRecord>> = BTreeMap::new();
        self.counters.events += 1;

        for hit in hits {
            self.counters.edges += 1;
            let key = match self.addr.resolve(&hit.geom, hit.edge) {
                Some(k) => k,
                None => {
                    let err = CalError::UnresolvedGeometry(format!("{:?}", hit.geom));
                    self.counters.tally(&err);
                    err.report();
                    continue;
                }
            };
            let cal = match self.converter.convert(key, hit) {
                Ok(c) => c,
                Err(e) => {
                    self.counters.tally(&e);
                    self.converter.report(&e);
                    continue;
                }
            };
            self.counters.calibrated += 1;

            let (channel, end) = self.addr.locate(&hit.geom);
            let ends = channels
                .entry(channel)
                .or_insert_with(|| vec![EndRecord::default(); nends]);
            let rec = match ends.get_mut(end) {
                Some(r) => r,
                None => continue,
            };
            let slot = match cal.edge {
                Edge::Leading => &mut rec.leading,
                Edge::Trailing => &mut rec.trailing,
            };
            if slot.is_some() {
                // multi-hit: only the first edge of each kind is used
                self.counters.duplicates += 1;
                debug!("{:?}: extra {:?} edge at {} ns", hit.geom, cal.edge, cal.time_ns);
            } else {
                *slot = Some(cal.time_ns);
            }
        }

        let reducer = self.reducer;
        let counters = &mut self.counters;
        channels
            .into_iter()
            .map(|(channel, mut ends)| {
                counters.negative_widths += reducer.reduce(&mut ends, reference);
                ChannelRecord { channel, ends }
            })
            .collect()
    }
}
