use anyhow::{bail, Result};
use std::io::{stdout, Write};
use std::thread::JoinHandle;
use tracing::info;

use tcaltools::addr::{Addressing, Fiber, Los, Paddle};
use tcaltools::cfg::{self, Calibration, Layout};
use tcaltools::curve::{CurveSet, SharedCurves};
use tcaltools::io::{self, Input};
use tcaltools::ser;
use tcaltools::store::{FileStore, ParamStore};

use tcalstream::data::CalBatch;
use tcalstream::{processor, reader, CliArgs};

const GIT_VERSION: &str = git_version::git_version!(fallback = "unknown");

fn join<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    match handle.join() {
        Ok(res) => res,
        Err(_) => bail!("worker thread panicked"),
    }
}

fn run<A>(
    addr: A,
    cfg: Calibration,
    args: &CliArgs,
    curves: CurveSet,
    store: FileStore,
    inputs: Vec<Input>,
) -> Result<()>
where
    A: Addressing + Send + 'static,
    A::Geometry: Send + 'static,
    A::Channel: Send + 'static,
{
    let (raw_tx, raw_rx) = flume::bounded(args.buffer);
    let (cal_tx, cal_rx) = flume::bounded(args.buffer);
    let name = cfg.name.clone();
    let curves = SharedCurves::new(curves);

    let reader = reader::main::<A::Geometry>(inputs, raw_tx);
    let processor = processor::main(addr, cfg, args.fill, curves, store, raw_rx, cal_tx);

    let stdout = stdout();
    let stdout = stdout.lock();
    let mut wtr = io::tsv_writer(stdout);
    for CalBatch { event, records } in cal_rx.iter() {
        ser::records_tsv(&mut wtr, event, &records)?;
    }
    wtr.flush()?;

    join(reader)?;
    let counters = join(processor)?;
    counters.summary(&name);
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
    let inputs = io::inputs(args.input.clone())?;
    let store = FileStore::new(&args.curves)?;
    let curves = match store.load()? {
        Some(c) if c.timing != cfg.timing => bail!(
            "curves were made for {:?}, configuration declares {:?}",
            c.timing,
            cfg.timing
        ),
        Some(c) => c,
        None if args.fill => {
            info!("no parameters at {} yet, starting uncalibrated", args.curves);
            CurveSet::new(&cfg.name, cfg.timing)
        }
        None => bail!("no calibration parameters at {}", args.curves),
    };

    match cfg.layout {
        Layout::Paddle { planes, bars } => run(Paddle { planes, bars }, cfg, &args, curves, store, inputs),
        Layout::Fiber { planes, fibers } => run(Fiber { planes, fibers }, cfg, &args, curves, store, inputs),
        Layout::Los { detectors, channels, trailing } => {
            run(Los { detectors, channels, trailing }, cfg, &args, curves, store, inputs)
        }
    }
}
