use anyhow::Result;
use std::thread::JoinHandle;
use tcaltools::addr::Fields;
use tcaltools::de::Events;
use tcaltools::io::{self, Input};

use crate::data::EventBatch;

/// Parse raw hits from all inputs in order and pass them on one event at a time
pub fn main<G: Fields + Send + 'static>(
    inputs: Vec<Input>,
    sender: flume::Sender<EventBatch<G>>,
) -> JoinHandle<Result<()>> {
    std::thread::spawn(move || {
        for i in inputs.iter() {
            for ev in Events::<_, G>::new(io::tsv_reader(i)?) {
                let (event, hits) = ev?;
                if sender.send(EventBatch { event, hits }).is_err() {
                    // nobody is listening anymore
                    return Ok(());
                }
            }
        }
        Ok(())
    })
}
