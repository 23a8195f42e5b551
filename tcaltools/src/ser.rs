//! Serialization of raw hits, calibrated records and curve sets

use crate::addr::Fields;
use crate::curve::CurveSet;
use crate::event::ChannelRecord;
use crate::RawEdge;
use anyhow::Result;
use std::io::Write;
use zstd::stream;

/// Serialize to .tcal.zst format: zstd-compressed JSON curve set
pub fn curves(wtr: &mut impl Write, set: &CurveSet) -> Result<()> {
    let mut zwtr = stream::write::Encoder::new(wtr, 0)?;
    serde_json::to_writer(&mut zwtr, set)?;
    zwtr.finish()?;
    Ok(())
}

/// Serialize a curve set to tab-separated values (module, fine, ns).
pub fn curves_tsv(wtr: &mut csv::Writer<impl Write>, set: &CurveSet) -> Result<()> {
    for (key, curve) in set.iter() {
        for (fine, ns) in curve.as_slice().iter().enumerate() {
            wtr.write_record(&[key.to_string(), fine.to_string(), ns.to_string()])?;
        }
    }
    Ok(())
}

/// Serialize the raw edges of one event to tab-separated values
/// (event, geometry fields, edge, coarse, fine) with fine = -1 for no data.
pub fn raw_tsv<G: Fields>(wtr: &mut csv::Writer<impl Write>, event: u64, hits: &[RawEdge<G>]) -> Result<()> {
    for hit in hits.iter() {
        let [a, b, c] = hit.geom.fields();
        let fine = match hit.fine {
            Some(f) => f.to_string(),
            None => String::from("-1"),
        };
        wtr.write_record(&[
            event.to_string(),
            a.to_string(),
            b.to_string(),
            c.to_string(),
            hit.edge.index().to_string(),
            hit.coarse.to_string(),
            fine,
        ])?;
    }
    Ok(())
}

/// Serialize calibrated records of one event to tab-separated values
/// (event, channel fields, end, leading, trailing, width), one line per
/// readout end with any time, ends numbered from 1. Missing times are empty.
pub fn records_tsv<C: Fields>(
    wtr: &mut csv::Writer<impl Write>,
    event: u64,
    records: &[ChannelRecord<C>],
) -> Result<()> {
    fn cell(x: Option<f64>) -> String {
        x.map(|v| v.to_string()).unwrap_or_default()
    }
    for rec in records.iter() {
        let [a, b, c] = rec.channel.fields();
        for (i, end) in rec.ends.iter().enumerate() {
            if end.leading.is_none() && end.trailing.is_none() {
                continue;
            }
            wtr.write_record(&[
                event.to_string(),
                a.to_string(),
                b.to_string(),
                c.to_string(),
                (i + 1).to_string(),
                cell(end.leading),
                cell(end.trailing),
                cell(end.width),
            ])?;
        }
    }
    Ok(())
}

/// Serialize the reference time of one event (event, ns), the format read
/// back by `de::references`.
pub fn start_tsv(wtr: &mut csv::Writer<impl Write>, event: u64, t0: f64) -> Result<()> {
    wtr.write_record(&[event.to_string(), t0.to_string()])?;
    Ok(())
}
