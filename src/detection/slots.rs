// src/detection/slots.rs

use std::collections::HashSet;
use tracing::warn;

/// Maps unbounded external track ids onto `1..=max_slots`.
///
/// Ids above the cap all land on the last slot, so a third subject shares
/// state with the second. Ids below 1 land on slot 1.
pub struct SlotMapper {
    max_slots: u32,
    collapsed: HashSet<i64>,
}

impl SlotMapper {
    pub fn new(max_slots: u32) -> Self {
        Self {
            max_slots: max_slots.max(1),
            collapsed: HashSet::new(),
        }
    }

    pub fn slot_for(&mut self, track_id: i64) -> u32 {
        let slot = track_id.clamp(1, self.max_slots as i64) as u32;
        if track_id > self.max_slots as i64 && self.collapsed.insert(track_id) {
            warn!(
                "Track {} exceeds slot cap {}, merged into slot {}",
                track_id, self.max_slots, slot
            );
        }
        slot
    }

    pub fn max_slots(&self) -> u32 {
        self.max_slots
    }

    /// Distinct external ids that were merged into the last slot so far.
    pub fn collapsed_count(&self) -> usize {
        self.collapsed.len()
    }
}
