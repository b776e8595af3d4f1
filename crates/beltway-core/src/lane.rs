//! One side of a conveyor segment: an ordered queue of items stored as gaps.
//!
//! Index 0 is the item nearest the head (the output end). Each item stores
//! the distance from the previous item, or from the head for the front item,
//! so moving the whole lane costs one subtraction on a single gap. Lane
//! coordinates grow from the head toward the tail.
//!
//! `active` marks the single item currently allowed to move. Every item in
//! front of it is compressed against its predecessor (or parked at the head),
//! so there is never more than one moving item per lane.

use crate::fixed::LineDist;
use crate::geometry::{ITEM_SPACING, ITEM_WIDTH};
use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Sentinel active index marking a lane that has no moving item.
pub const STALLED: usize = usize::MAX;

/// Default half-width of the window used when picking an item off a lane.
pub const DEFAULT_PICK_EPSILON: LineDist = LineDist::from_thousandths(ITEM_WIDTH.to_thousandths() / 2);

/// An item on a lane together with its distance from the item ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaneItem {
    pub gap: LineDist,
    pub item: ItemTypeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub(crate) items: VecDeque<LaneItem>,
    pub(crate) active: usize,
    /// Sum of all gaps: the position of the rearmost item.
    pub(crate) back_distance: LineDist,
    /// Rendering hint only; the simulation ignores it.
    pub visible: bool,
}

impl Default for Lane {
    fn default() -> Self {
        Self::new()
    }
}

impl Lane {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            active: 0,
            back_distance: LineDist::ZERO,
            visible: true,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &VecDeque<LaneItem> {
        &self.items
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn back_distance(&self) -> LineDist {
        self.back_distance
    }

    /// True when some item on the lane is still allowed to move.
    pub fn is_active(&self) -> bool {
        self.active < self.items.len()
    }

    /// True when the lane holds items but none of them can move.
    pub fn is_stalled(&self) -> bool {
        !self.items.is_empty() && !self.is_active()
    }

    pub fn stall(&mut self) {
        self.active = STALLED;
    }

    /// Let the front item move again. A moving item is always found from
    /// the front, so this is always safe to call.
    pub fn reactivate(&mut self) {
        self.active = 0;
    }

    /// Absolute lane positions of every item, front first.
    pub fn positions(&self) -> impl Iterator<Item = (LineDist, ItemTypeId)> + '_ {
        self.items.iter().scan(LineDist::ZERO, |acc, it| {
            *acc += it.gap;
            Some((*acc, it.item))
        })
    }

    /// Whether an item can be placed at `start_offset + item_offset` without
    /// coming closer than one item spacing to any neighbour.
    pub fn can_insert(&self, start_offset: LineDist, item_offset: i32) -> bool {
        let start = start_offset + LineDist::from_tiles(i64::from(item_offset));
        debug_assert!(!start.is_negative(), "insert position {start} is negative");

        let mut offset = LineDist::ZERO;
        for it in &self.items {
            if it.gap > ITEM_SPACING
                && offset + ITEM_SPACING <= start
                && start <= offset + it.gap - ITEM_SPACING
            {
                return true;
            }
            offset += it.gap;
            if offset > start {
                return false;
            }
        }
        if !self.items.is_empty() {
            offset += ITEM_SPACING;
        }
        offset <= start
    }

    /// Find the first item at or behind `offset - epsilon`, provided it
    /// lies within `offset + epsilon`. Returns its index and a copy.
    pub fn get_item(&self, offset: LineDist, epsilon: LineDist) -> Option<(usize, LaneItem)> {
        let lower = offset - epsilon;
        let upper = offset + epsilon;
        let mut position = LineDist::ZERO;
        for (index, it) in self.items.iter().enumerate() {
            position += it.gap;
            if position >= lower {
                return (position <= upper).then_some((index, *it));
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Place an item behind the current rear item, `offset` past it (or past
    /// the head if the lane is empty). The offset is raised to one item
    /// spacing when it would overlap the rear item.
    pub fn append_item(&mut self, offset: LineDist, item: ItemTypeId) {
        let gap = if !self.items.is_empty() && offset < ITEM_SPACING {
            ITEM_SPACING
        } else {
            offset
        };
        self.items.push_back(LaneItem { gap, item });
        self.back_distance += gap;
    }

    /// Insert at absolute position `offset + item_offset` without checking
    /// spacing. Callers that need the check use [`Lane::try_insert_item`].
    pub fn insert_item(&mut self, offset: LineDist, item: ItemTypeId, item_offset: i32) {
        let target = offset + LineDist::from_tiles(i64::from(item_offset));
        debug_assert!(!target.is_negative(), "insert position {target} is negative");

        let mut position = LineDist::ZERO;
        for index in 0..self.items.len() {
            let next = position + self.items[index].gap;
            if next > target {
                let gap = target - position;
                self.items[index].gap = next - target;
                self.items.insert(index, LaneItem { gap, item });
                if index < self.active && self.active != STALLED {
                    self.active += 1;
                }
                return;
            }
            position = next;
        }

        self.items.push_back(LaneItem {
            gap: target - position,
            item,
        });
        self.back_distance = target;
    }

    /// Insert if spacing allows. A successful insert wakes a stalled lane.
    pub fn try_insert_item(&mut self, offset: LineDist, item: ItemTypeId, item_offset: i32) -> bool {
        if !self.can_insert(offset, item_offset) {
            return false;
        }
        if !self.is_active() {
            self.reactivate();
        }
        self.insert_item(offset, item, item_offset);
        true
    }

    /// Remove the item at `index`, folding its gap into the item behind it so
    /// nothing else moves.
    pub fn remove_item(&mut self, index: usize) -> Option<LaneItem> {
        debug_assert!(index < self.items.len(), "remove index {index} out of range");
        let removed = self.items.remove(index)?;
        match self.items.get_mut(index) {
            Some(next) => next.gap += removed.gap,
            None => self.back_distance -= removed.gap,
        }
        if self.items.is_empty() {
            self.back_distance = LineDist::ZERO;
            self.active = 0;
        } else if self.active == STALLED {
            // The items behind the gap are no longer packed.
            self.reactivate();
        } else if index < self.active {
            self.active -= 1;
        }
        Some(removed)
    }

    /// Remove and return the item picked by [`Lane::get_item`].
    pub fn try_pop_item(&mut self, offset: LineDist, epsilon: LineDist) -> Option<ItemTypeId> {
        let (index, _) = self.get_item(offset, epsilon)?;
        self.remove_item(index).map(|it| it.item)
    }

    /// Shift every item by `delta` along the lane. Items pushed past the head
    /// fall off and are returned front first.
    pub fn rebase(&mut self, delta: LineDist) -> Vec<ItemTypeId> {
        let mut spilled = Vec::new();
        let mut carry = delta;
        while let Some(front) = self.items.front() {
            if !(front.gap + carry).is_negative() {
                break;
            }
            carry += front.gap;
            if let Some(removed) = self.items.pop_front() {
                spilled.push(removed.item);
            }
        }
        if let Some(front) = self.items.front_mut() {
            front.gap += carry;
        }
        self.back_distance = self.items.iter().map(|it| it.gap).sum();
        self.active = 0;
        spilled
    }

    /// Cut the lane at `[start, end)`. Items in front of `start` stay here,
    /// items inside the cut are returned, and items at or behind `end` move
    /// to a new lane whose head sits at `end`.
    pub fn split_at(&mut self, start: LineDist, end: LineDist) -> (Vec<ItemTypeId>, Lane) {
        debug_assert!(start <= end);
        let mut ahead = Lane::new();
        let mut behind = Lane::new();
        ahead.visible = self.visible;
        behind.visible = self.visible;
        let mut removed = Vec::new();

        for (position, item) in self.positions() {
            if position < start {
                ahead.push_at(position, item);
            } else if position < end {
                removed.push(item);
            } else {
                behind.push_at(position - end, item);
            }
        }

        *self = ahead;
        (removed, behind)
    }

    /// Drop every item at or behind `start` and return them.
    pub fn truncate(&mut self, start: LineDist) -> Vec<ItemTypeId> {
        self.split_at(start, LineDist::MAX).0
    }

    /// Empty the lane, returning its items front first.
    pub fn drain(&mut self) -> Vec<ItemTypeId> {
        let items = self.items.drain(..).map(|it| it.item).collect();
        self.back_distance = LineDist::ZERO;
        self.active = 0;
        items
    }

    fn push_at(&mut self, position: LineDist, item: ItemTypeId) {
        self.items.push_back(LaneItem {
            gap: position - self.back_distance,
            item,
        });
        self.back_distance = position;
    }
}
