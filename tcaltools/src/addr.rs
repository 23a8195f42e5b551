//! Channel addressing: detector geometry to flat module keys
//!
//! Each detector kind declares its geometry bounds and the arithmetic that
//! turns an in-bounds identifier plus edge into a unique `ModuleKey`.
//! Identifiers outside the bounds resolve to `None` and are never folded
//! onto a valid key.

use std::fmt;

use crate::event::ChannelRecord;
use crate::{Edge, ModuleKey};

/// Identifiers travel through the TSV adapters as three unsigned fields;
/// unused trailing fields are zero.
pub trait Fields: Copy + fmt::Debug {
    fn from_fields(f: [u32; 3]) -> Self;
    fn fields(&self) -> [u32; 3];
}

/// Geometry to module key mapping for one detector kind. Keys that would not
/// fit in a `u32` do not resolve.
pub trait Addressing {
    /// Identifier of one readout of one physical channel
    type Geometry: Fields;
    /// Physical channel that readouts are grouped under
    type Channel: Fields + Ord;

    /// Module key for an edge of `geom`, `None` if outside the declared bounds
    fn resolve(&self, geom: &Self::Geometry, edge: Edge) -> Option<ModuleKey>;

    /// Physical channel and readout end (`0..ends()`) of a resolvable geometry
    fn locate(&self, geom: &Self::Geometry) -> (Self::Channel, usize);

    /// Readout ends per physical channel
    fn ends(&self) -> usize;

    /// Size of the module key space; every resolved key is below this
    fn modules(&self) -> usize;
}

#[inline]
fn in_range(x: u32, n: u32) -> bool {
    x >= 1 && x <= n
}

/// One side of a scintillator bar, all 1-indexed
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PaddleId {
    pub plane: u32,
    pub bar: u32,
    pub side: u32,
}

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct BarId {
    pub plane: u32,
    pub bar: u32,
}

impl Fields for PaddleId {
    fn from_fields(f: [u32; 3]) -> Self {
        PaddleId { plane: f[0], bar: f[1], side: f[2] }
    }

    fn fields(&self) -> [u32; 3] {
        [self.plane, self.bar, self.side]
    }
}

impl Fields for BarId {
    fn from_fields(f: [u32; 3]) -> Self {
        BarId { plane: f[0], bar: f[1] }
    }

    fn fields(&self) -> [u32; 3] {
        [self.plane, self.bar, 0]
    }
}

/// Planes of bars with a photomultiplier on each side (NeuLAND, ToFD, PToF).
/// Four modules per bar: (side 1, side 2) x (leading, trailing).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paddle {
    pub planes: u32,
    pub bars: u32,
}

impl Addressing for Paddle {
    type Geometry = PaddleId;
    type Channel = BarId;

    fn resolve(&self, g: &PaddleId, edge: Edge) -> Option<ModuleKey> {
        if !(in_range(g.plane, self.planes) && in_range(g.bar, self.bars) && in_range(g.side, 2)) {
            return None;
        }
        let key = (g.plane - 1)
            .checked_mul(self.bars)?
            .checked_mul(4)?
            .checked_add((g.bar - 1).checked_mul(4)?)?
            .checked_add((g.side - 1) * 2 + edge.index())?;
        Some(ModuleKey(key))
    }

    fn locate(&self, g: &PaddleId) -> (BarId, usize) {
        (BarId { plane: g.plane, bar: g.bar }, g.side.saturating_sub(1) as usize)
    }

    fn ends(&self) -> usize {
        2
    }

    fn modules(&self) -> usize {
        self.planes as usize * self.bars as usize * 4
    }
}

/// One tube of one fiber, all 1-indexed
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct FiberId {
    pub plane: u32,
    pub fiber: u32,
    pub tube: u32,
}

#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct FiberChannel {
    pub plane: u32,
    pub fiber: u32,
}

impl Fields for FiberId {
    fn from_fields(f: [u32; 3]) -> Self {
        FiberId { plane: f[0], fiber: f[1], tube: f[2] }
    }

    fn fields(&self) -> [u32; 3] {
        [self.plane, self.fiber, self.tube]
    }
}

impl Fields for FiberChannel {
    fn from_fields(f: [u32; 3]) -> Self {
        FiberChannel { plane: f[0], fiber: f[1] }
    }

    fn fields(&self) -> [u32; 3] {
        [self.plane, self.fiber, 0]
    }
}

/// Fiber arrays read out by two tubes per fiber
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fiber {
    pub planes: u32,
    pub fibers: u32,
}

impl Addressing for Fiber {
    type Geometry = FiberId;
    type Channel = FiberChannel;

    fn resolve(&self, g: &FiberId, edge: Edge) -> Option<ModuleKey> {
        if !(in_range(g.plane, self.planes) && in_range(g.fiber, self.fibers) && in_range(g.tube, 2)) {
            return None;
        }
        let key = (g.plane - 1)
            .checked_mul(self.fibers)?
            .checked_add(g.fiber - 1)?
            .checked_mul(4)?
            .checked_add((g.tube - 1) * 2 + edge.index())?;
        Some(ModuleKey(key))
    }

    fn locate(&self, g: &FiberId) -> (FiberChannel, usize) {
        (FiberChannel { plane: g.plane, fiber: g.fiber }, g.tube.saturating_sub(1) as usize)
    }

    fn ends(&self) -> usize {
        2
    }

    fn modules(&self) -> usize {
        self.planes as usize * self.fibers as usize * 4
    }
}

/// One channel of a start/veto counter, 1-indexed
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct LosId {
    pub detector: u32,
    pub channel: u32,
}

impl Fields for LosId {
    fn from_fields(f: [u32; 3]) -> Self {
        LosId { detector: f[0], channel: f[1] }
    }

    fn fields(&self) -> [u32; 3] {
        [self.detector, self.channel, 0]
    }
}

/// Single-ended start counters. Channels 1 to 4 are the right, top, left
/// and bottom photomultipliers; further channels carry references such as
/// the master trigger. Leading edges occupy keys `0..D*C`; when `trailing`
/// is set, trailing edges follow in `D*C..2*D*C`, otherwise they are
/// unresolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Los {
    pub detectors: u32,
    pub channels: u32,
    pub trailing: bool,
}

impl Los {
    /// Start time of an event: mean leading time of the four position
    /// channels of detector 1, if all four fired
    pub fn start_time(records: &[ChannelRecord<LosId>]) -> Option<f64> {
        let mut sum = 0.;
        for ch in 1..=4 {
            let t = records
                .iter()
                .find(|r| r.channel == LosId { detector: 1, channel: ch })
                .and_then(|r| r.ends.first())
                .and_then(|e| e.leading)?;
            sum += t;
        }
        Some(sum / 4.)
    }
}

impl Addressing for Los {
    type Geometry = LosId;
    type Channel = LosId;

    fn resolve(&self, g: &LosId, edge: Edge) -> Option<ModuleKey> {
        if !(in_range(g.detector, self.detectors) && in_range(g.channel, self.channels)) {
            return None;
        }
        let base = (g.detector - 1).checked_mul(self.channels)?.checked_add(g.channel - 1)?;
        match edge {
            Edge::Leading => Some(ModuleKey(base)),
            Edge::Trailing if self.trailing => {
                let offset = self.detectors.checked_mul(self.channels)?;
                Some(ModuleKey(offset.checked_add(base)?))
            }
            Edge::Trailing => None,
        }
    }

    fn locate(&self, g: &LosId) -> (LosId, usize) {
        (*g, 0)
    }

    fn ends(&self) -> usize {
        1
    }

    fn modules(&self) -> usize {
        let n = self.detectors as usize * self.channels as usize;
        if self.trailing {
            2 * n
        } else {
            n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const EDGES: [Edge; 2] = [Edge::Leading, Edge::Trailing];

    /// Every in-bounds geometry gets its own key below `modules()`
    fn check_bijective<A: Addressing>(addr: &A, geoms: &[A::Geometry]) {
        let mut seen = HashSet::new();
        for g in geoms {
            for &e in EDGES.iter() {
                if let Some(k) = addr.resolve(g, e) {
                    assert!((k.0 as usize) < addr.modules(), "{:?} -> {}", g, k);
                    assert!(seen.insert(k), "{:?} {:?} aliases {}", g, e, k);
                }
            }
        }
        assert_eq!(seen.len(), addr.modules());
    }

    #[test]
    fn paddle_keys() {
        let p = Paddle { planes: 3, bars: 5 };
        let mut geoms = Vec::new();
        for plane in 1..=3 {
            for bar in 1..=5 {
                for side in 1..=2 {
                    geoms.push(PaddleId { plane, bar, side });
                }
            }
        }
        check_bijective(&p, &geoms);
        assert_eq!(p.resolve(&PaddleId { plane: 1, bar: 1, side: 1 }, Edge::Leading), Some(ModuleKey(0)));
        assert_eq!(p.resolve(&PaddleId { plane: 1, bar: 1, side: 2 }, Edge::Trailing), Some(ModuleKey(3)));
        assert_eq!(p.resolve(&PaddleId { plane: 2, bar: 1, side: 1 }, Edge::Leading), Some(ModuleKey(20)));
    }

    #[test]
    fn paddle_out_of_bounds() {
        let p = Paddle { planes: 3, bars: 5 };
        for g in [
            PaddleId { plane: 0, bar: 1, side: 1 },
            PaddleId { plane: 4, bar: 1, side: 1 },
            PaddleId { plane: 1, bar: 6, side: 1 },
            PaddleId { plane: 1, bar: 1, side: 3 },
            PaddleId { plane: 1, bar: 1, side: 0 },
        ] {
            assert_eq!(p.resolve(&g, Edge::Leading), None);
        }
    }

    #[test]
    fn fiber_keys() {
        let f = Fiber { planes: 2, fibers: 7 };
        let mut geoms = Vec::new();
        for plane in 1..=2 {
            for fiber in 1..=7 {
                for tube in 1..=2 {
                    geoms.push(FiberId { plane, fiber, tube });
                }
            }
        }
        check_bijective(&f, &geoms);
        assert_eq!(f.resolve(&FiberId { plane: 1, fiber: 8, tube: 1 }, Edge::Leading), None);
        assert_eq!(f.locate(&FiberId { plane: 2, fiber: 3, tube: 2 }), (FiberChannel { plane: 2, fiber: 3 }, 1));
    }

    #[test]
    fn los_keys() {
        let mut geoms = Vec::new();
        for detector in 1..=2 {
            for channel in 1..=5 {
                geoms.push(LosId { detector, channel });
            }
        }
        let leading_only = Los { detectors: 2, channels: 5, trailing: false };
        check_bijective(&leading_only, &geoms);
        assert_eq!(leading_only.resolve(&LosId { detector: 2, channel: 1 }, Edge::Leading), Some(ModuleKey(5)));
        assert_eq!(leading_only.resolve(&LosId { detector: 1, channel: 1 }, Edge::Trailing), None);

        let both = Los { detectors: 2, channels: 5, trailing: true };
        check_bijective(&both, &geoms);
        assert_eq!(both.resolve(&LosId { detector: 1, channel: 1 }, Edge::Trailing), Some(ModuleKey(10)));
        assert_eq!(both.resolve(&LosId { detector: 3, channel: 1 }, Edge::Leading), None);
    }

    #[test]
    fn oversized_layouts_do_not_overflow() {
        let p = Paddle { planes: 2, bars: 1 << 30 };
        assert_eq!(p.resolve(&PaddleId { plane: 2, bar: 1, side: 1 }, Edge::Leading), None);
        assert!(p.resolve(&PaddleId { plane: 1, bar: 3, side: 2 }, Edge::Trailing).is_some());

        let f = Fiber { planes: 3, fibers: u32::MAX };
        assert_eq!(f.resolve(&FiberId { plane: 3, fiber: 1, tube: 1 }, Edge::Leading), None);

        let l = Los { detectors: 1 << 16, channels: 1 << 16, trailing: true };
        assert_eq!(l.resolve(&LosId { detector: 1, channel: 1 }, Edge::Trailing), None);
        assert_eq!(l.resolve(&LosId { detector: 1, channel: 1 }, Edge::Leading), Some(ModuleKey(0)));
    }

    #[test]
    fn fields_roundtrip() {
        let g = PaddleId { plane: 2, bar: 17, side: 1 };
        assert_eq!(PaddleId::from_fields(g.fields()), g);
        let l = LosId { detector: 1, channel: 5 };
        assert_eq!(l.fields(), [1, 5, 0]);
    }
}
