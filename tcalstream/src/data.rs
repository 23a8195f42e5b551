use tcaltools::event::ChannelRecord;
use tcaltools::RawEdge;

/// Raw edges of one event as read from the input
pub struct EventBatch<G> {
    pub event: u64,
    pub hits: Vec<RawEdge<G>>,
}

/// Calibrated records of one event, ready for output
pub struct CalBatch<C> {
    pub event: u64,
    pub records: Vec<ChannelRecord<C>>,
}
