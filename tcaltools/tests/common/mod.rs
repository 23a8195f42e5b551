#![allow(dead_code)]

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

use tcaltools::addr::PaddleId;
use tcaltools::cfg::Timing;
use tcaltools::{Edge, RawEdge};

/// Relative bin widths of a digitizer whose bins repeat in a 1:2:3:4 pattern
pub fn bin_weights(fine_range: usize) -> Vec<f64> {
    (0..fine_range).map(|i| 1. + (i % 4) as f64).collect()
}

/// Upper edge of every fine bin in ns, i.e. the ideal calibration
pub fn bin_edges(fine_range: usize, period: f64) -> Vec<f64> {
    let w = bin_weights(fine_range);
    let total: f64 = w.iter().sum();
    let mut sum = 0.;
    w.iter()
        .map(|x| {
            sum += x;
            period * sum / total
        })
        .collect()
}

/// Fine codes drawn from the uneven bins
pub fn nonlinear_codes(n: usize, fine_range: usize, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = WeightedIndex::new(bin_weights(fine_range)).unwrap();
    (0..n).map(|_| dist.sample(&mut rng) as u32).collect()
}

/// Digitize a time-to-next-tick `r` in [0, period) with the uneven bins
pub fn digitize(r: f64, edges: &[f64]) -> u32 {
    edges.iter().position(|&e| r < e).unwrap_or(edges.len() - 1) as u32
}

/// One paddle edge pair with known true times. Returns the raw edges and
/// the true leading and trailing times.
pub fn paddle_pulse(
    rng: &mut StdRng,
    timing: &Timing,
    edges: &[f64],
    geom: PaddleId,
) -> (Vec<RawEdge<PaddleId>>, f64, f64) {
    let period = timing.period();
    let coarse = rng.gen_range(0..timing.modulus);
    let r = rng.gen_range(0.0..period);
    let leading = period - r + coarse as f64 * period;
    let width = rng.gen_range(5.0..80.0);
    let trailing = leading + width;

    // the hardware only sees the counter modulo its range
    let cycles = ((trailing - period) / period).ceil();
    let t_r = period - (trailing - cycles * period);
    let t_coarse = (cycles as u32) % timing.modulus;

    let hits = vec![
        RawEdge { geom, edge: Edge::Leading, coarse, fine: Some(digitize(r, edges)) },
        RawEdge { geom, edge: Edge::Trailing, coarse: t_coarse, fine: Some(digitize(t_r, edges)) },
    ];
    (hits, leading, trailing)
}
