//! `tcalfill CONFIG [INPUT...] -o CURVES`
//!
//! Accumulate fine-time histograms from raw hits (tab-separated, see
//! `tcaltools::de::raw_tsv`) and derive one calibration curve per module
//! with enough statistics. With `--merge`, modules that did not reach the
//! threshold keep the curve already stored in CURVES.

use argh::FromArgs;
use anyhow::{bail, Result};
use std::io::{stdout, Write};
use tracing::info;

use tcaltools::addr::{Addressing, Fiber, Los, Paddle};
use tcaltools::builder::CurveBuilder;
use tcaltools::cfg::{self, Calibration, Layout};
use tcaltools::curve::CurveSet;
use tcaltools::de::Events;
use tcaltools::io::{self, Input};
use tcaltools::store::{FileStore, ParamStore};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

#[derive(Debug, FromArgs, Clone)]
/// Derive time calibration curves from raw digitizer hits.
pub struct CliArgs {
    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
    /// file to write the curves to
    #[argh(option, short = 'o', default = "String::from(\"curves.tcal.zst\")")]
    pub out: String,
    /// keep stored curves of modules without enough statistics
    #[argh(switch, short = 'm')]
    pub merge: bool,
    /// detector configuration (JSON)
    #[argh(positional)]
    pub config: String,
    /// with no input or when input is '-', read from standard input
    #[argh(positional)]
    pub input: Vec<String>,
}

fn fill<A: Addressing>(addr: A, cfg: &Calibration, inputs: &[Input]) -> Result<CurveSet> {
    let mut builder = CurveBuilder::from_config(cfg, &addr);
    let mut events = 0u64;
    let mut rejected = 0u64;
    for i in inputs {
        for ev in Events::<_, A::Geometry>::new(io::tsv_reader(i)?) {
            let (_, hits) = ev?;
            rejected += builder.fill_hits(&addr, &hits);
            events += 1;
        }
    }
    let stats = builder.stats();
    let low = stats.values().filter(|&&n| n < cfg.min_stats).count();
    info!(
        "{} events, {} rejected hits, {} modules filled, {} below {} hits",
        events,
        rejected,
        stats.len(),
        low,
        cfg.min_stats,
    );
    Ok(builder.finalize())
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
    let mut store = FileStore::new(&args.out)?;
    let previous = match args.merge {
        true => store.load()?,
        false => None,
    };
    if let Some(old) = &previous {
        if old.timing != cfg.timing {
            bail!(
                "stored curves were made for {:?}, configuration declares {:?}",
                old.timing,
                cfg.timing
            );
        }
    }

    let fresh = match cfg.layout {
        Layout::Paddle { planes, bars } => fill(Paddle { planes, bars }, &cfg, &inputs)?,
        Layout::Fiber { planes, fibers } => fill(Fiber { planes, fibers }, &cfg, &inputs)?,
        Layout::Los { detectors, channels, trailing } => {
            fill(Los { detectors, channels, trailing }, &cfg, &inputs)?
        }
    };

    let curves = match previous {
        Some(mut old) => {
            old.merge(fresh)?;
            old
        }
        None => fresh,
    };
    store.store(&curves)?;
    Ok(())
}
