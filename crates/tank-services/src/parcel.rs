//! A quantity of product in transit.

/// The vessel on the other side of a single transfer. Has no identity
/// beyond the call it is passed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parcel {
    content_volume: u64,
    capacity: u64,
}

impl Parcel {
    pub fn new(content_volume: u64, capacity: u64) -> Self {
        Self {
            content_volume,
            capacity,
        }
    }

    /// An empty vessel, ready to be filled from a tank.
    pub fn empty(capacity: u64) -> Self {
        Self::new(0, capacity)
    }

    /// A full vessel, ready to be emptied into a tank.
    pub fn full(capacity: u64) -> Self {
        Self::new(capacity, capacity)
    }

    pub fn content_volume(&self) -> u64 {
        self.content_volume
    }

    /// Room left before the parcel is full.
    pub fn headroom(&self) -> u64 {
        self.capacity.saturating_sub(self.content_volume)
    }

    pub(crate) fn fill(&mut self, volume: u64) {
        self.content_volume += volume;
    }

    pub(crate) fn drain(&mut self, volume: u64) {
        self.content_volume -= volume;
    }
}
