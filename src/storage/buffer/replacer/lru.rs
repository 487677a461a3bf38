use linked_hash_map::LinkedHashMap;
use crate::common::types::FrameId;

/// LRU page replacement policy. Frames sit in access order: front of the
/// map is the least recently used, back the most.
pub struct LRUReplacer {
    recency: LinkedHashMap<FrameId, ()>,
}

impl LRUReplacer {
    pub fn new(pool_size: usize) -> Self {
        Self {
            recency: LinkedHashMap::with_capacity(pool_size),
        }
    }

    /// Record that a frame has been accessed, refreshing its position.
    pub fn record_access(&mut self, frame_id: FrameId) {
        self.recency.remove(&frame_id);
        self.recency.insert(frame_id, ());
    }

    /// Remove a frame from the replacer.
    pub fn remove(&mut self, frame_id: FrameId) {
        self.recency.remove(&frame_id);
    }

    /// Victim selection: the least recently used frame.
    pub fn victim(&mut self) -> Option<FrameId> {
        self.recency.pop_front().map(|(frame_id, _)| frame_id)
    }
}
