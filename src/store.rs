//! The block store: sole owner of the ordered block list.
//!
//! Every structural mutation (insert, remove, move, duplicate, paste) re-sorts
//! by `order` and renumbers to `1..=N` before returning, so the fractional
//! keys used to place a block (`order + 0.5`) never outlive the call that
//! introduced them. Subscribers are notified synchronously with a snapshot.

use std::{collections::HashSet, fmt};

use tracing::{debug, trace, warn};

use crate::block::{Block, BlockData, BlockId, BlockUpdate};
use crate::error::Result;

/// Where `insert_block` places a new block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InsertPosition {
    /// Right after the focused block, or at the end when nothing is focused.
    Current,
    /// Same placement as `Current`.
    After,
    End,
    /// Right after the given block; falls back to `Current` if it is gone.
    AfterBlock(BlockId),
    /// At an explicit order, shifting anything at or after it down by one.
    At(f64),
}

impl InsertPosition {
    fn shifts_following(&self) -> bool {
        !matches!(self, InsertPosition::End)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovePosition {
    Before,
    After,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreEventKind {
    Change,
    Focus,
}

/// Notification delivered to subscribers. `blocks` is a copy, never the
/// store's own list.
#[derive(Clone, Debug)]
pub struct StoreEvent {
    pub kind: StoreEventKind,
    pub blocks: Vec<Block>,
    pub focused: Option<BlockId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

#[derive(Default)]
pub struct BlockStore {
    blocks: Vec<Block>,
    focused: Option<BlockId>,
    focus_generation: u64,
    clipboard: Option<Block>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockStore")
            .field("blocks", &self.blocks)
            .field("focused", &self.focused)
            .field("clipboard", &self.clipboard)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        let mut store = Self::new();
        store.initialize(blocks);
        store
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Blocks in render order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get_block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }

    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn focused_id(&self) -> Option<BlockId> {
        self.focused
    }

    /// Bumped every time the focused id changes. Lets a controller tell a
    /// block it focused apart from the same block focused again later.
    pub fn focus_generation(&self) -> u64 {
        self.focus_generation
    }

    pub fn get_focused_block(&self) -> Option<&Block> {
        self.focused.and_then(|id| self.get_block(id))
    }

    pub fn clipboard(&self) -> Option<&Block> {
        self.clipboard.as_ref()
    }

    pub fn is_block_empty(&self, block: &Block) -> bool {
        block.is_empty()
    }

    // =========================================================================
    // Whole-collection operations
    // =========================================================================

    /// Replace the collection. Entries with a duplicate id get a new one,
    /// entries without a usable order are placed by position, and content is
    /// reshaped for its kind. Nothing is rejected.
    pub fn initialize(&mut self, blocks: Vec<Block>) {
        let mut seen = HashSet::new();
        self.blocks = blocks
            .into_iter()
            .enumerate()
            .map(|(index, mut block)| {
                if !seen.insert(block.id) {
                    warn!(block_id = %block.id, "duplicate block id on initialize, minting a new one");
                    block.id = BlockId::new();
                    seen.insert(block.id);
                }
                if !block.order.is_finite() {
                    block.order = (index + 1) as f64;
                }
                block.content = block.content.normalized_for(block.kind);
                block
            })
            .collect();
        self.normalize();
        if let Some(focused) = self.focused {
            if self.get_block(focused).is_none() {
                self.set_focused(None);
            }
        }
        debug!(count = self.blocks.len(), "initialized block store");
        self.notify_listeners(StoreEventKind::Change);
    }

    pub fn export_blocks(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    pub fn import_blocks(&mut self, blocks: Vec<Block>) {
        self.initialize(blocks);
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.blocks)?)
    }

    pub fn from_json(&mut self, json: &str) -> Result<()> {
        let blocks: Vec<Block> = serde_json::from_str(json)?;
        self.initialize(blocks);
        Ok(())
    }

    /// Remove every block, returning them in render order.
    pub fn clear(&mut self) -> Vec<Block> {
        let removed = std::mem::take(&mut self.blocks);
        self.set_focused(None);
        debug!(count = removed.len(), "cleared block store");
        self.notify_listeners(StoreEventKind::Change);
        removed
    }

    // =========================================================================
    // Structural mutations
    // =========================================================================

    /// Create a block from `data` at `position`, focus it and return it.
    pub fn insert_block(&mut self, data: BlockData, position: InsertPosition) -> Block {
        let block = Block::new(data, 0.0);
        self.place(block, position)
    }

    /// Put an archived block back, keeping its id unless that id is taken.
    pub fn restore_block(&mut self, mut block: Block, position: InsertPosition) -> Block {
        if self.get_block(block.id).is_some() {
            block.id = BlockId::new();
        }
        self.place(block, position)
    }

    fn place(&mut self, mut block: Block, position: InsertPosition) -> Block {
        let order = self.resolve_insert_order(position);
        if position.shifts_following() {
            for existing in self.blocks.iter_mut().filter(|b| b.order >= order) {
                existing.order += 1.0;
            }
        }
        block.order = order;
        let id = block.id;
        let fallback = block.clone();
        self.blocks.push(block);
        self.normalize();
        debug!(block_id = %id, ?position, count = self.blocks.len(), "inserted block");
        self.notify_listeners(StoreEventKind::Change);
        self.focus_block(id);
        self.get_block(id).cloned().unwrap_or(fallback)
    }

    fn resolve_insert_order(&self, position: InsertPosition) -> f64 {
        let end = self.blocks.last().map_or(1.0, |block| block.order + 1.0);
        let after_focused = || {
            self.get_focused_block()
                .map_or(end, |block| block.order + 0.5)
        };
        match position {
            InsertPosition::At(order) if order.is_finite() => order,
            InsertPosition::At(_) | InsertPosition::End => end,
            InsertPosition::AfterBlock(id) => match self.get_block(id) {
                Some(target) => target.order + 0.5,
                None => after_focused(),
            },
            InsertPosition::Current | InsertPosition::After => after_focused(),
        }
    }

    /// Shallow-merge `update` into the block. Returns false for unknown ids.
    pub fn update_block(&mut self, id: BlockId, update: BlockUpdate) -> bool {
        let Some(block) = self.blocks.iter_mut().find(|block| block.id == id) else {
            return false;
        };
        block.apply_update(update);
        debug!(block_id = %id, "updated block");
        self.notify_listeners(StoreEventKind::Change);
        true
    }

    /// Remove a block. If it held focus, focus moves to the block now at the
    /// same index, or the previous one.
    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        let index = self.index_of(id)?;
        let removed = self.blocks.remove(index);
        self.normalize();
        let was_focused = self.focused == Some(id);
        if was_focused {
            self.set_focused(None);
        }
        debug!(block_id = %id, order = removed.order, count = self.blocks.len(), "removed block");
        self.notify_listeners(StoreEventKind::Change);

        if was_focused {
            let next = self
                .blocks
                .get(index)
                .or_else(|| index.checked_sub(1).and_then(|prev| self.blocks.get(prev)))
                .map(|block| block.id);
            if let Some(next) = next {
                self.focus_block(next);
            }
        }
        Some(removed)
    }

    pub fn move_block(&mut self, id: BlockId, target_id: BlockId, position: MovePosition) -> bool {
        if id == target_id {
            return false;
        }
        let Some(target_order) = self.get_block(target_id).map(|block| block.order) else {
            return false;
        };
        let Some(block) = self.blocks.iter_mut().find(|block| block.id == id) else {
            return false;
        };
        block.order = match position {
            MovePosition::Before => target_order - 0.5,
            MovePosition::After => target_order + 0.5,
        };
        self.normalize();
        debug!(block_id = %id, target_id = %target_id, ?position, "moved block");
        self.notify_listeners(StoreEventKind::Change);
        true
    }

    pub fn move_block_up(&mut self, id: BlockId) -> bool {
        match self.index_of(id) {
            Some(index) if index > 0 => self.swap_adjacent(index - 1, index),
            _ => false,
        }
    }

    pub fn move_block_down(&mut self, id: BlockId) -> bool {
        match self.index_of(id) {
            Some(index) if index + 1 < self.blocks.len() => self.swap_adjacent(index, index + 1),
            _ => false,
        }
    }

    fn swap_adjacent(&mut self, upper: usize, lower: usize) -> bool {
        let upper_order = self.blocks[upper].order;
        self.blocks[upper].order = self.blocks[lower].order;
        self.blocks[lower].order = upper_order;
        self.normalize();
        debug!(upper, lower, "swapped adjacent blocks");
        self.notify_listeners(StoreEventKind::Change);
        true
    }

    /// Clone a block right after itself under a new id and focus the clone.
    pub fn duplicate_block(&mut self, id: BlockId) -> Option<Block> {
        let source = self.get_block(id)?;
        let mut clone = source.fresh_copy();
        clone.order = source.order + 0.5;
        let clone_id = clone.id;
        self.blocks.push(clone);
        self.normalize();
        debug!(block_id = %id, clone_id = %clone_id, "duplicated block");
        self.notify_listeners(StoreEventKind::Change);
        self.focus_block(clone_id);
        self.get_block(clone_id).cloned()
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn focus_block(&mut self, id: BlockId) -> bool {
        if self.get_block(id).is_none() {
            return false;
        }
        self.set_focused(Some(id));
        trace!(block_id = %id, "focused block");
        self.notify_listeners(StoreEventKind::Focus);
        true
    }

    fn set_focused(&mut self, focused: Option<BlockId>) {
        if self.focused != focused {
            self.focused = focused;
            self.focus_generation += 1;
        }
    }

    pub fn clear_focus(&mut self) -> bool {
        if self.focused.is_none() {
            return false;
        }
        self.set_focused(None);
        trace!("cleared focus");
        self.notify_listeners(StoreEventKind::Focus);
        true
    }

    // =========================================================================
    // Clipboard
    // =========================================================================

    pub fn copy_block(&mut self, id: BlockId) -> bool {
        let Some(block) = self.get_block(id) else {
            return false;
        };
        self.clipboard = Some(block.clone());
        debug!(block_id = %id, "copied block");
        true
    }

    pub fn cut_block(&mut self, id: BlockId) -> Option<Block> {
        if !self.copy_block(id) {
            return None;
        }
        self.remove_block(id)
    }

    /// Insert a fresh-id copy of the clipboard. The clipboard is kept, so
    /// pasting repeats.
    pub fn paste_block(&mut self, position: InsertPosition) -> Option<Block> {
        let data = self.clipboard.as_ref()?.data();
        Some(self.insert_block(data, position))
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn notify_listeners(&mut self, kind: StoreEventKind) {
        if self.listeners.is_empty() {
            return;
        }
        let event = StoreEvent {
            kind,
            blocks: self.blocks.clone(),
            focused: self.focused,
        };
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    fn normalize(&mut self) {
        self.blocks.sort_by(|a, b| a.order.total_cmp(&b.order));
        for (index, block) in self.blocks.iter_mut().enumerate() {
            block.order = (index + 1) as f64;
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
