//! Configuration tools: formats for declaring a detector's calibration
//!
//! A calibration is declared in a JSON file. Only `name` and `layout` are
//! required; everything else defaults to the VFTX digitizer settings.
//!
//! ```json
//! {
//!     "name": "neuland s2018",
//!     "layout": {"paddle": {"planes": 2, "bars": 50}},
//!     "timing": {"clock_mhz": 200.0, "modulus": 2048, "fine_range": 1024},
//!     "min_stats": 100000,
//!     "update_rate": 1000000,
//!     "negative_width": "keep"
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::addr::{Addressing, Fiber, Los, Paddle};
use crate::width::WidthPolicy;
use crate::{CalError, COARSE_MODULUS, FINE_RANGE, MIN_STATS, VFTX_CLOCK_MHZ};

/// Digitizer clock and counter ranges
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Timing {
    /// Coarse counter clock frequency
    pub clock_mhz: f64,
    /// Coarse counter rolls over after this many cycles
    pub modulus: u32,
    /// Number of distinct fine codes
    pub fine_range: usize,
}

impl Timing {
    /// Timing for a clock of the given period in ns
    pub fn with_period(period: f64, modulus: u32, fine_range: usize) -> Self {
        Timing {
            clock_mhz: 1000. / period,
            modulus,
            fine_range,
        }
    }

    /// Clock period T in ns
    #[inline]
    pub fn period(&self) -> f64 {
        1000. / self.clock_mhz
    }

    /// Time for one full turn of the coarse counter, M * T, in ns
    #[inline]
    pub fn wrap(&self) -> f64 {
        self.modulus as f64 * self.period()
    }

    pub fn validate(&self) -> Result<(), CalError> {
        let period = self.period();
        if !(period.is_finite() && period > 0.) {
            return Err(CalError::Config(format!("clock of {} MHz has no usable period", self.clock_mhz)));
        }
        if self.modulus == 0 {
            return Err(CalError::Config("coarse counter modulus must be positive".to_string()));
        }
        if self.fine_range == 0 || self.fine_range > u32::MAX as usize {
            return Err(CalError::Config(format!("fine range {} is not usable", self.fine_range)));
        }
        Ok(())
    }
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            clock_mhz: VFTX_CLOCK_MHZ,
            modulus: COARSE_MODULUS,
            fine_range: FINE_RANGE,
        }
    }
}

/// Detector kind with its declared geometry bounds
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Scintillator bars read out on both sides
    Paddle { planes: u32, bars: u32 },
    /// Fiber array read out by two tubes
    Fiber { planes: u32, fibers: u32 },
    /// Single-ended start/veto counters
    Los {
        detectors: u32,
        channels: u32,
        #[serde(default)]
        trailing: bool,
    },
}

impl Layout {
    /// Size of the module key space
    pub fn modules(&self) -> usize {
        match *self {
            Layout::Paddle { planes, bars } => Paddle { planes, bars }.modules(),
            Layout::Fiber { planes, fibers } => Fiber { planes, fibers }.modules(),
            Layout::Los { detectors, channels, trailing } => Los { detectors, channels, trailing }.modules(),
        }
    }

    pub fn validate(&self) -> Result<(), CalError> {
        let (a, b) = match *self {
            Layout::Paddle { planes, bars } => (planes, bars),
            Layout::Fiber { planes, fibers } => (planes, fibers),
            Layout::Los { detectors, channels, .. } => (detectors, channels),
        };
        if a == 0 || b == 0 {
            return Err(CalError::Config(format!("empty detector layout {:?}", self)));
        }
        if self.modules() > u32::MAX as usize {
            return Err(CalError::Config(format!("too many modules in {:?}", self)));
        }
        Ok(())
    }
}

/// One detector's calibration declaration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Calibration {
    pub name: String,
    pub layout: Layout,
    #[serde(default)]
    pub timing: Timing,
    /// Hits a module needs before its curve is derived
    #[serde(default = "default_min_stats")]
    pub min_stats: u64,
    /// Events between curve updates when calibrating a live stream
    #[serde(default = "default_update_rate")]
    pub update_rate: u64,
    #[serde(default)]
    pub negative_width: WidthPolicy,
}

impl Calibration {
    pub fn validate(&self) -> Result<(), CalError> {
        self.timing.validate()?;
        self.layout.validate()?;
        if self.update_rate == 0 {
            return Err(CalError::Config("update rate must be positive".to_string()));
        }
        Ok(())
    }
}

fn default_min_stats() -> u64 {
    MIN_STATS
}

fn default_update_rate() -> u64 {
    1_000_000
}

/// Read and validate a calibration declaration
pub fn load(path: impl AsRef<Path>) -> Result<Calibration> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let cfg: Calibration = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("cannot parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
