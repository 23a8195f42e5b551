#![allow(dead_code)]

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

use tcaltools::addr::PaddleId;
use tcaltools::cfg::Timing;
use tcaltools::{Edge, RawEdge};

/// Fine codes from a digitizer with a repeating 1:2:3:4 bin width pattern
pub fn nonlinear_codes(n: usize, fine_range: usize) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(0);
    let weights: Vec<f64> = (0..fine_range).map(|i| 1. + (i % 4) as f64).collect();
    let dist = WeightedIndex::new(weights).unwrap();
    (0..n).map(|_| dist.sample(&mut rng) as u32).collect()
}

/// Events of a full paddle detector with every side firing once
pub fn paddle_events(n: usize, planes: u32, bars: u32, timing: &Timing) -> Vec<Vec<RawEdge<PaddleId>>> {
    let mut rng = StdRng::seed_from_u64(1);
    let fine = timing.fine_range as u32;
    let mut events = Vec::with_capacity(n);
    for _ in 0..n {
        let mut hits = Vec::new();
        for plane in 1..=planes {
            for bar in 1..=bars {
                for side in 1..=2 {
                    let geom = PaddleId { plane, bar, side };
                    let coarse = rng.gen_range(0..timing.modulus);
                    hits.push(RawEdge { geom, edge: Edge::Leading, coarse, fine: Some(rng.gen_range(0..fine)) });
                    hits.push(RawEdge {
                        geom,
                        edge: Edge::Trailing,
                        coarse: (coarse + 3) % timing.modulus,
                        fine: Some(rng.gen_range(0..fine)),
                    });
                }
            }
        }
        events.push(hits);
    }
    return events;
}
