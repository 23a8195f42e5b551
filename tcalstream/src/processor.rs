use anyhow::Result;
use std::thread::JoinHandle;
use tracing::{debug, info};

use tcaltools::addr::Addressing;
use tcaltools::builder::CurveBuilder;
use tcaltools::cfg::Calibration;
use tcaltools::curve::SharedCurves;
use tcaltools::event::{Counters, EventCalibrator};
use tcaltools::store::ParamStore;

use crate::data::{CalBatch, EventBatch};

/// Calibrates events with the current curves. When `fill` is set the same
/// hits also feed a curve builder; every `update_rate` events the modules
/// with enough statistics get new curves, which are laid over the current
/// set, written to `store` and swapped in for the following events.
pub fn main<A, S>(
    addr: A,
    cfg: Calibration,
    fill: bool,
    curves: SharedCurves,
    mut store: S,
    receiver: flume::Receiver<EventBatch<A::Geometry>>,
    sender: flume::Sender<CalBatch<A::Channel>>,
) -> JoinHandle<Result<Counters>>
where
    A: Addressing + Send + 'static,
    A::Geometry: Send + 'static,
    A::Channel: Send + 'static,
    S: ParamStore + Send + 'static,
{
    std::thread::spawn(move || {
        let mut cal = EventCalibrator::from_config(addr, &cfg, curves.snapshot())?;
        let mut builder = match fill {
            true => Some(CurveBuilder::from_config(&cfg, cal.addressing())),
            false => None,
        };
        let mut since = 0u64;

        for EventBatch { event, hits } in receiver.iter() {
            // one curve set for the whole event
            cal.set_curves(curves.snapshot());
            let records = cal.process(&hits, None);

            if let Some(b) = builder.as_mut() {
                // failures were already reported and counted by `process`
                b.absorb_hits(cal.addressing(), &hits);
                since += 1;
                if since >= cfg.update_rate {
                    since = 0;
                    update(b, &curves, &mut store)?;
                }
            }

            if sender.send(CalBatch { event, records }).is_err() {
                break;
            }
        }

        if let Some(mut b) = builder {
            update(&mut b, &curves, &mut store)?;
        }
        Ok(cal.counters().clone())
    })
}

/// Derive curves for the modules that are ready, merge them over the
/// current set, persist the result and publish it
fn update<S: ParamStore>(builder: &mut CurveBuilder, curves: &SharedCurves, store: &mut S) -> Result<()> {
    let fresh = builder.harvest();
    if fresh.is_empty() {
        debug!("no module reached the statistics threshold yet");
        return Ok(());
    }
    let updated = fresh.len();
    let mut next = (*curves.snapshot()).clone();
    next.merge(fresh)?;
    store.store(&next)?;
    let total = next.len();
    curves.swap(next);
    info!("updated {} modules, {} calibrated in total", updated, total);
    Ok(())
}
