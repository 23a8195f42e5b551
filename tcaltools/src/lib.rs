pub mod addr;
pub mod builder;
pub mod cfg;
pub mod convert;
pub mod curve;
pub mod de;
pub mod error;
pub mod event;
pub mod io;
pub mod ser;
pub mod store;
pub mod width;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use error::CalError;

/// Flat index of one calibrated timing channel, i.e. one edge of one readout
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleKey(pub u32);

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signal transition that was digitized
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Leading,
    Trailing,
}

impl Edge {
    /// 0 for leading, 1 for trailing, as used in module keys and TSV files
    pub fn index(self) -> u32 {
        match self {
            Edge::Leading => 0,
            Edge::Trailing => 1,
        }
    }

    pub fn from_index(i: u32) -> Option<Edge> {
        match i {
            0 => Some(Edge::Leading),
            1 => Some(Edge::Trailing),
            _ => None,
        }
    }
}

/// The basic representation of one digitized edge as delivered by the unpacker
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct RawEdge<G> {
    /// Detector-specific channel identifier
    pub geom: G,
    pub edge: Edge,
    /// Free-running clock counter, modulo `Timing::modulus`
    pub coarse: u32,
    /// Sub-cycle interpolation code; `None` when the digitizer had no data
    pub fine: Option<u32>,
}

/// Reference clock of the VFTX digitizers
pub const VFTX_CLOCK_MHZ: f64 = 200.0;
/// Coarse counter rolls over after this many clock cycles
pub const COARSE_MODULUS: u32 = 2048;
/// Number of distinct fine codes
pub const FINE_RANGE: usize = 1024;
/// Hits per module needed before a curve is derived
pub const MIN_STATS: u64 = 100_000;
