use rand::prelude::*;
use rand::rngs::StdRng;
use std::convert::TryFrom;
use std::sync::Arc;

use tcaltools::addr::{BarId, Los, LosId, Paddle, PaddleId};
use tcaltools::builder::CurveBuilder;
use tcaltools::cfg::Timing;
use tcaltools::curve::{Curve, CurveSet};
use tcaltools::event::EventCalibrator;
use tcaltools::width::{EndRecord, WidthPolicy};
use tcaltools::{Edge, ModuleKey, RawEdge};

mod common;

fn small_timing() -> Timing {
    Timing::with_period(10., 2048, 4)
}

fn small_set(keys: &[u32]) -> Arc<CurveSet> {
    let mut set = CurveSet::new("small", small_timing());
    for &k in keys {
        set.insert(ModuleKey(k), Curve::try_from(vec![0., 3., 7., 10.]).unwrap()).unwrap();
    }
    Arc::new(set)
}

fn edge(plane: u32, bar: u32, side: u32, edge: Edge, coarse: u32, fine: Option<u32>) -> RawEdge<PaddleId> {
    RawEdge { geom: PaddleId { plane, bar, side }, edge, coarse, fine }
}

/// One bar side with a trailing edge after the counter rolled over
#[test]
fn two_module_width() {
    let addr = Paddle { planes: 1, bars: 1 };
    let mut cal = EventCalibrator::new(addr, small_timing(), small_set(&[0, 1]), WidthPolicy::Keep).unwrap();
    let hits = vec![
        edge(1, 1, 1, Edge::Leading, 0, Some(1)),
        edge(1, 1, 1, Edge::Trailing, 0, Some(3)),
    ];
    let records = cal.process(&hits, None);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, BarId { plane: 1, bar: 1 });
    let end = records[0].ends[0];
    assert_eq!(end.leading, Some(7.));
    assert_eq!(end.trailing, Some(20480.));
    assert_eq!(end.width, Some(20473.));
    assert_eq!(records[0].ends[1], EndRecord::default());
    assert_eq!(cal.counters().calibrated, 2);
}

/// Failed edges are dropped and counted; nothing leaks into the next event
#[test]
fn rejected_edges_and_reset() {
    let addr = Paddle { planes: 1, bars: 2 };
    let mut cal = EventCalibrator::new(addr, small_timing(), small_set(&[0, 1, 2]), WidthPolicy::Keep).unwrap();
    let hits = vec![
        edge(1, 1, 1, Edge::Leading, 5, Some(0)),
        edge(1, 1, 1, Edge::Leading, 6, Some(0)),
        edge(1, 1, 1, Edge::Trailing, 6, None),
        edge(1, 1, 2, Edge::Leading, 5, Some(2)),
        edge(1, 1, 2, Edge::Trailing, 5, Some(2)),
        edge(1, 2, 1, Edge::Leading, 5, Some(2)),
        edge(2, 1, 1, Edge::Leading, 5, Some(2)),
    ];
    let records = cal.process(&hits, None);
    assert_eq!(records.len(), 1);
    let ends = &records[0].ends;
    assert_eq!(ends[0].leading, Some(60.));
    assert_eq!(ends[0].trailing, None);
    assert_eq!(ends[0].width, None);
    assert_eq!(ends[1].leading, Some(53.));
    assert_eq!(ends[1].trailing, None);

    let c = cal.counters();
    assert_eq!(c.edges, 7);
    assert_eq!(c.calibrated, 3);
    assert_eq!(c.duplicates, 1);
    assert_eq!(c.no_data, 1);
    assert_eq!(c.missing, 2);
    assert_eq!(c.unresolved, 1);

    let records = cal.process(&[edge(1, 1, 2, Edge::Leading, 1, Some(3))], None);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ends[0], EndRecord::default());
    assert_eq!(records[0].ends[1].leading, Some(10.));
    assert_eq!(cal.counters().events, 2);
}

/// Records come out ordered by channel whatever the hit order
#[test]
fn ordered_by_channel() {
    let addr = Paddle { planes: 2, bars: 3 };
    let keys: Vec<u32> = (0..24).collect();
    let mut cal = EventCalibrator::new(addr, small_timing(), small_set(&keys), WidthPolicy::Keep).unwrap();
    let hits = vec![
        edge(2, 1, 1, Edge::Leading, 1, Some(1)),
        edge(1, 3, 2, Edge::Leading, 1, Some(1)),
        edge(1, 1, 1, Edge::Leading, 1, Some(1)),
    ];
    let channels: Vec<BarId> = cal.process(&hits, None).iter().map(|r| r.channel).collect();
    assert_eq!(
        channels,
        vec![
            BarId { plane: 1, bar: 1 },
            BarId { plane: 1, bar: 3 },
            BarId { plane: 2, bar: 1 },
        ]
    );
}

/// Start counter time as the common reference for a second detector
#[test]
fn start_counter_reference() {
    let timing = Timing::with_period(5., 2048, 4);
    let wrap = timing.wrap();
    let mut set = CurveSet::new("los", timing);
    for k in 0..5 {
        set.insert(ModuleKey(k), Curve::linear(4, 5.)).unwrap();
    }
    let set = Arc::new(set);
    let los = Los { detectors: 1, channels: 5, trailing: false };
    let mut start = EventCalibrator::new(los, timing, set.clone(), WidthPolicy::Keep).unwrap();
    let los_hits: Vec<RawEdge<LosId>> = (1..=4)
        .map(|ch| RawEdge {
            geom: LosId { detector: 1, channel: ch },
            edge: Edge::Leading,
            coarse: 2046,
            fine: Some(ch - 1),
        })
        .collect();
    let records = start.process(&los_hits, None);
    let t0 = Los::start_time(&records).unwrap();
    assert!((t0 - (2047. * 5. - 2.5)).abs() < 1e-9);

    let paddle = Paddle { planes: 1, bars: 1 };
    let mut cal = EventCalibrator::new(paddle, timing, set, WidthPolicy::Keep).unwrap();
    let hits = vec![
        edge(1, 1, 1, Edge::Leading, 2047, Some(3)),
        edge(1, 1, 1, Edge::Trailing, 1, Some(3)),
        edge(1, 1, 2, Edge::Leading, 0, Some(3)),
        edge(1, 1, 2, Edge::Trailing, 2, Some(3)),
    ];
    let records = cal.process(&hits, Some(t0));
    let ends = &records[0].ends;
    assert_eq!(ends[0].leading, Some(2047. * 5.));
    assert_eq!(ends[0].width, Some(10.));
    assert_eq!(ends[1].leading, Some(wrap));
    assert_eq!(ends[1].width, Some(10.));
}

#[test]
fn start_time_needs_four_channels() {
    let timing = Timing::with_period(5., 2048, 4);
    let mut set = CurveSet::new("los", timing);
    for k in 0..4 {
        set.insert(ModuleKey(k), Curve::linear(4, 5.)).unwrap();
    }
    let los = Los { detectors: 1, channels: 4, trailing: false };
    let mut start = EventCalibrator::new(los, timing, Arc::new(set), WidthPolicy::Keep).unwrap();
    let hits: Vec<RawEdge<LosId>> = (1..=3)
        .map(|ch| RawEdge { geom: LosId { detector: 1, channel: ch }, edge: Edge::Leading, coarse: 1, fine: Some(0) })
        .collect();
    let records = start.process(&hits, None);
    assert_eq!(records.len(), 3);
    assert_eq!(Los::start_time(&records), None);
}

/// Calibrate with curves built from the same digitizer and recover the true times
#[test]
fn recovers_true_times() {
    let timing = Timing::with_period(5., 2048, 64);
    let period = timing.period();
    let edges = common::bin_edges(timing.fine_range, period);
    let addr = Paddle { planes: 1, bars: 1 };
    let geom = PaddleId { plane: 1, bar: 1, side: 1 };
    let mut rng = StdRng::seed_from_u64(42);

    let mut builder = CurveBuilder::new("truth", timing, 4, 10_000);
    for _ in 0..50_000 {
        let (hits, _, _) = common::paddle_pulse(&mut rng, &timing, &edges, geom);
        assert_eq!(builder.fill_hits(&addr, &hits), 0);
    }
    let curves = Arc::new(builder.finalize());
    assert_eq!(curves.len(), 2);

    // max bin width plus statistical error of the curves
    let tolerance = 4. / 160. * period + 0.05;
    let mut cal = EventCalibrator::new(addr, timing, curves, WidthPolicy::Keep).unwrap();
    for _ in 0..1000 {
        let (hits, leading, trailing) = common::paddle_pulse(&mut rng, &timing, &edges, geom);
        let records = cal.process(&hits, None);
        let end = records[0].ends[0];
        assert!((end.leading.unwrap() - leading).abs() < tolerance);
        assert!((end.trailing.unwrap() - trailing).abs() < tolerance);
        assert!((end.width.unwrap() - (trailing - leading)).abs() < 2. * tolerance);
    }
    assert_eq!(cal.counters().negative_widths, 0);
}
