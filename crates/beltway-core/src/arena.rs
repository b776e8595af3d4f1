//! Storage for every live segment, addressed by stable generational handles.
//!
//! Each segment is shared by the tiles it covers. Tiles hold a
//! [`SegmentId`] rather than a pointer, and the arena counts how many tiles
//! reference each segment; the segment is freed when that count reaches
//! zero.

use crate::id::SegmentId;
use crate::segment::Segment;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSlot {
    pub segment: Segment,
    pub tile_refs: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentArena {
    slots: SlotMap<SegmentId, SegmentSlot>,
}

impl SegmentArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a segment with no tile references yet.
    pub fn insert(&mut self, segment: Segment) -> SegmentId {
        self.slots.insert(SegmentSlot {
            segment,
            tile_refs: 0,
        })
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.slots.get(id).map(|slot| &slot.segment)
    }

    pub fn get_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.slots.get_mut(id).map(|slot| &mut slot.segment)
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn tile_refs(&self, id: SegmentId) -> u32 {
        self.slots.get(id).map_or(0, |slot| slot.tile_refs)
    }

    /// Record one more tile referencing `id`.
    pub fn retain(&mut self, id: SegmentId) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.tile_refs += 1;
        }
    }

    /// Drop one tile reference. Returns the segment if that was the last.
    pub fn release(&mut self, id: SegmentId) -> Option<Segment> {
        let slot = self.slots.get_mut(id)?;
        debug_assert!(slot.tile_refs > 0, "released a segment with no tile references");
        slot.tile_refs = slot.tile_refs.saturating_sub(1);
        if slot.tile_refs == 0 {
            self.slots.remove(id).map(|slot| slot.segment)
        } else {
            None
        }
    }

    /// Remove a segment regardless of its reference count.
    pub fn remove(&mut self, id: SegmentId) -> Option<Segment> {
        self.slots.remove(id).map(|slot| slot.segment)
    }

    /// Segment handles in iteration order. Iteration order depends only on
    /// the history of inserts and removals, so it is deterministic.
    pub fn ids(&self) -> Vec<SegmentId> {
        self.slots.keys().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &Segment)> {
        self.slots.iter().map(|(id, slot)| (id, &slot.segment))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SegmentId, &mut Segment)> {
        self.slots.iter_mut().map(|(id, slot)| (id, &mut slot.segment))
    }

    /// Unlink every segment whose target is `id`. Returns how many were
    /// unlinked.
    pub fn clear_targets_to(&mut self, id: SegmentId) -> usize {
        let mut cleared = 0;
        for (_, segment) in self.iter_mut() {
            if segment.target == Some(id) {
                segment.set_target(None, 0);
                cleared += 1;
            }
        }
        cleared
    }

    /// Total number of items on every lane of every segment.
    pub fn item_count(&self) -> usize {
        self.iter().map(|(_, seg)| seg.item_count()).sum()
    }
}
