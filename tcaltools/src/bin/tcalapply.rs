//! `tcalapply CONFIG -c CURVES [-r REFERENCES] [INPUT...]`
//!
//! Calibrate raw hits with stored curves and print one tab-separated line
//! per channel end and event:
//!
//!     event  channel fields (3)  end  leading/ns  trailing/ns  width/ns
//!
//! With `-r`, widths of each event are anchored to the reference time listed
//! for it (`event  ns`). With `--start` and a start-counter layout, print that
//! reference time per event instead, ready to be passed back with `-r`.
//!
//! Refuses to start without readable calibration parameters.

use argh::FromArgs;
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::io::{stdout, Write};
use std::sync::Arc;
use tracing::warn;

use tcaltools::addr::{Addressing, Fiber, Los, LosId, Paddle};
use tcaltools::cfg::{self, Calibration, Layout};
use tcaltools::curve::CurveSet;
use tcaltools::de::{self, Events};
use tcaltools::event::EventCalibrator;
use tcaltools::io::{self, Input};
use tcaltools::ser;
use tcaltools::store::{FileStore, ParamStore};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(Debug, FromArgs, Clone)]
/// Apply time calibration curves to raw digitizer hits.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// calibration curves (.tcal.zst)
    #[argh(option, short = 'c')]
    pub curves: String,
    /// per-event reference times (TSV: event, ns)
    #[argh(option, short = 'r')]
    pub reference: Option<String>,
    /// print start counter reference times instead of records
    #[argh(switch)]
    pub start: bool,
    /// detector configuration (JSON)
    #[argh(positional)]
    pub config: String,
    /// with no input or when input is '-', read from standard input
    #[argh(positional)]
    pub input: Vec<String>,
}

fn apply<A: Addressing>(
    addr: A,
    cfg: &Calibration,
    curves: CurveSet,
    refs: Option<&HashMap<u64, f64>>,
    inputs: &[Input],
) -> Result<()> {
    let mut calibrator = EventCalibrator::from_config(addr, cfg, Arc::new(curves))?;

    let stdout = stdout();
    let stdout = stdout.lock();
    let mut wtr = io::tsv_writer(stdout);

    let mut unreferenced = 0u64;
    for i in inputs {
        for ev in Events::<_, A::Geometry>::new(io::tsv_reader(i)?) {
            let (event, hits) = ev?;
            let reference = match refs {
                Some(r) => {
                    let t0 = r.get(&event).copied();
                    if t0.is_none() {
                        unreferenced += 1;
                    }
                    t0
                }
                None => None,
            };
            let records = calibrator.process(&hits, reference);
            ser::records_tsv(&mut wtr, event, &records)?;
        }
    }
    wtr.flush()?;
    calibrator.counters().summary(&cfg.name);
    if unreferenced > 0 {
        warn!("{}: {} events without a reference time", cfg.name, unreferenced);
    }
    Ok(())
}

fn start_times(los: Los, cfg: &Calibration, curves: CurveSet, inputs: &[Input]) -> Result<()> {
    let mut calibrator = EventCalibrator::from_config(los, cfg, Arc::new(curves))?;

    let stdout = stdout();
    let stdout = stdout.lock();
    let mut wtr = io::tsv_writer(stdout);

    let mut incomplete = 0u64;
    for i in inputs {
        for ev in Events::<_, LosId>::new(io::tsv_reader(i)?) {
            let (event, hits) = ev?;
            let records = calibrator.process(&hits, None);
            match Los::start_time(&records) {
                Some(t0) => ser::start_tsv(&mut wtr, event, t0)?,
                None => incomplete += 1,
            }
        }
    }
    wtr.flush()?;
    calibrator.counters().summary(&cfg.name);
    if incomplete > 0 {
        warn!("{}: {} events without all four start channels", cfg.name, incomplete);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args: CliArgs = argh::from_env();
    if args.version {
        let stdout = stdout();
        let mut stdout = stdout.lock();
        writeln!(
            stdout,
            concat!(
                env!("CARGO_BIN_NAME"),
                " ",
                "{}",
            ),
            GIT_VERSION,
        )?;
        return Ok(())
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cfg = cfg::load(&args.config)?;
    let inputs = io::inputs(args.input)?;
    let store = FileStore::new(&args.curves)?;
    let curves = match store.load()? {
        Some(c) => c,
        None => bail!("no calibration parameters at {}", args.curves),
    };
    if curves.timing != cfg.timing {
        bail!(
            "curves were made for {:?}, configuration declares {:?}",
            curves.timing,
            cfg.timing
        );
    }

    if args.start {
        if args.reference.is_some() {
            bail!("--start and --reference cannot be combined");
        }
        return match cfg.layout {
            Layout::Los { detectors, channels, trailing } => {
                start_times(Los { detectors, channels, trailing }, &cfg, curves, &inputs)
            }
            _ => bail!("--start needs a start counter (los) layout"),
        };
    }

    let refs = match &args.reference {
        Some(path) => {
            let mut rdr = io::tsv_reader(&either::Right(path.clone()))?;
            Some(de::references(&mut rdr)?)
        }
        None => None,
    };
    let refs = refs.as_ref();

    match cfg.layout {
        Layout::Paddle { planes, bars } => apply(Paddle { planes, bars }, &cfg, curves, refs, &inputs),
        Layout::Fiber { planes, fibers } => apply(Fiber { planes, fibers }, &cfg, curves, refs, &inputs),
        Layout::Los { detectors, channels, trailing } => {
            apply(Los { detectors, channels, trailing }, &cfg, curves, refs, &inputs)
        }
    }
}
