//! Deserialization of raw hits and curve sets

use crate::addr::Fields;
use crate::curve::CurveSet;
use crate::{Edge, RawEdge};
use anyhow::{anyhow, bail, Result};
use csv::StringRecord;
use itertools::Itertools;
use std::collections::HashMap;
use std::io::Read;
use std::iter::{Map, Peekable};
use zstd::stream;

/// Deserialize from .tcal.zst format: zstd-compressed JSON curve set.
/// Every curve is checked against the declared timing.
pub fn curves(rdr: impl Read) -> Result<CurveSet> {
    let zrdr = stream::read::Decoder::new(rdr)?;
    let set: CurveSet = serde_json::from_reader(zrdr)?;
    set.validate()?;
    Ok(set)
}

type Hit<G> = (u64, RawEdge<G>);
type ParseFn<G> = fn(csv::Result<StringRecord>) -> Result<Hit<G>>;

fn parse_hit<G: Fields>(record: csv::Result<StringRecord>) -> Result<Hit<G>> {
    let record = record?;
    if record.len() < 7 {
        bail!("expected 7 fields, found {}: {:?}", record.len(), record);
    }
    let event = record[0].parse::<u64>()?;
    let geom = G::from_fields([record[1].parse()?, record[2].parse()?, record[3].parse()?]);
    let edge = Edge::from_index(record[4].parse::<u32>()?)
        .ok_or_else(|| anyhow!("bad edge {}", &record[4]))?;
    let coarse = record[5].parse::<u32>()?;
    let fine = match record[6].parse::<i64>()? {
        -1 => None,
        f if f >= 0 && f <= u32::MAX as i64 => Some(f as u32),
        f => bail!("bad fine code {}", f),
    };
    Ok((event, RawEdge { geom, edge, coarse, fine }))
}

/// Raw hits grouped into events: consecutive lines with the same event
/// number form one event.
pub struct Events<R: Read, G: Fields> {
    hits: Peekable<Map<csv::StringRecordsIntoIter<R>, ParseFn<G>>>,
}

impl<R: Read, G: Fields> Events<R, G> {
    pub fn new(rdr: csv::Reader<R>) -> Self {
        let parse: ParseFn<G> = parse_hit::<G>;
        Events {
            hits: rdr.into_records().map(parse).peekable(),
        }
    }
}

impl<R: Read, G: Fields> Iterator for Events<R, G> {
    type Item = Result<(u64, Vec<RawEdge<G>>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (event, first) = match self.hits.next()? {
            Ok(h) => h,
            Err(e) => return Some(Err(e)),
        };
        let mut hits = vec![first];
        // a malformed line ends the event and is returned on the next call
        for h in self
            .hits
            .peeking_take_while(|h| matches!(h, Ok((ev, _)) if *ev == event))
        {
            if let Ok((_, hit)) = h {
                hits.push(hit);
            }
        }
        Some(Ok((event, hits)))
    }
}

/// Deserialize raw hits from tab-separated values
/// (event, geometry fields, edge, coarse, fine).
pub fn raw_tsv<G: Fields>(rdr: &mut csv::Reader<impl Read>) -> Result<Vec<Hit<G>>> {
    let mut hits = Vec::new();
    for result in rdr.records() {
        hits.push(parse_hit(result)?);
    }
    Ok(hits)
}

/// Read all events at once
pub fn events<G: Fields>(rdr: csv::Reader<impl Read>) -> Result<Vec<(u64, Vec<RawEdge<G>>)>> {
    Events::new(rdr).collect()
}

/// Per-event reference times from tab-separated values (event, ns).
/// An event listed twice is an error.
pub fn references(rdr: &mut csv::Reader<impl Read>) -> Result<HashMap<u64, f64>> {
    let mut refs = HashMap::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() < 2 {
            bail!("expected 2 fields, found {}: {:?}", record.len(), record);
        }
        let event = record[0].parse::<u64>()?;
        let t0 = record[1].parse::<f64>()?;
        if !t0.is_finite() {
            bail!("event {}: reference time {} is not finite", event, t0);
        }
        if refs.insert(event, t0).is_some() {
            bail!("event {} has two reference times", event);
        }
    }
    Ok(refs)
}
