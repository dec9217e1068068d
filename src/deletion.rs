//! Confirmation-gated deletion and the bounded undo history.
//!
//! A deletion request that needs confirmation parks in `pending` until the
//! host resolves it with `resolve_confirmation`; nothing is removed in the
//! meantime, so declining leaves the store untouched.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::block::{Block, BlockId};
use crate::config::{EditorConfig, ImportanceRules};
use crate::events::EditorCommand;
use crate::store::{BlockStore, InsertPosition};

/// One reversible deletion.
#[derive(Clone, Debug, PartialEq)]
pub enum UndoEntry {
    /// `position` is the block's order just before removal.
    Single {
        block: Block,
        position: f64,
        deleted_at: DateTime<Utc>,
    },
    /// Blocks in removal order; each keeps the order it had when removed.
    Batch {
        blocks: Vec<Block>,
        deleted_at: DateTime<Utc>,
    },
    /// The whole document, in render order.
    ClearAll {
        blocks: Vec<Block>,
        deleted_at: DateTime<Utc>,
    },
}

impl UndoEntry {
    pub fn len(&self) -> usize {
        match self {
            UndoEntry::Single { .. } => 1,
            UndoEntry::Batch { blocks, .. } | UndoEntry::ClearAll { blocks, .. } => blocks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn deleted_at(&self) -> DateTime<Utc> {
        match self {
            UndoEntry::Single { deleted_at, .. }
            | UndoEntry::Batch { deleted_at, .. }
            | UndoEntry::ClearAll { deleted_at, .. } => *deleted_at,
        }
    }
}

/// LIFO history that forgets its oldest entry once full.
#[derive(Clone, Debug)]
pub struct UndoStack {
    entries: VecDeque<UndoEntry>,
    capacity: usize,
}

impl UndoStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push an entry, returning whatever had to be evicted to make room.
    pub fn push(&mut self, entry: UndoEntry) -> Option<UndoEntry> {
        if self.capacity == 0 {
            return Some(entry);
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        if let Some(evicted) = &evicted {
            warn!(
                blocks = evicted.len(),
                deleted_at = %evicted.deleted_at(),
                "undo history full, oldest deletion is no longer recoverable"
            );
        }
        self.entries.push_back(entry);
        evicted
    }

    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }

    /// Take the most recent clear-all entry, wherever it sits.
    pub fn pop_clear_all(&mut self) -> Option<UndoEntry> {
        let index = self
            .entries
            .iter()
            .rposition(|entry| matches!(entry, UndoEntry::ClearAll { .. }))?;
        self.entries.remove(index)
    }

    pub fn peek(&self) -> Option<&UndoEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A deletion waiting on the user's answer.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingDeletion {
    Single { id: BlockId },
    Batch { ids: Vec<BlockId> },
    ClearAll,
}

impl PendingDeletion {
    /// Question to put in front of the user.
    pub fn prompt(&self, store: &BlockStore) -> String {
        match self {
            PendingDeletion::Single { id } => match store.get_block(*id) {
                Some(block) => format!("Delete this {} block?", block.kind.label().to_lowercase()),
                None => "Delete this block?".to_string(),
            },
            PendingDeletion::Batch { ids } => format!("Delete {} blocks?", ids.len()),
            PendingDeletion::ClearAll => {
                format!("Clear all {} blocks from the document?", store.len())
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed this many blocks.
    Deleted(usize),
    /// Waiting for confirmation.
    Pending,
    /// Confirmation declined; nothing changed.
    Cancelled,
    /// Unknown, locked or already-pending target; nothing changed.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    /// Transient "Undo" affordance after a deletion.
    Undo,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub shown_at: Instant,
    pub ttl: Duration,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= self.ttl
    }
}

#[derive(Debug)]
pub struct DeletionController {
    undo: UndoStack,
    pending: Option<PendingDeletion>,
    notice: Option<Notice>,
    importance: ImportanceRules,
    undo_toast: Duration,
    notice_timeout: Duration,
}

impl DeletionController {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            undo: UndoStack::new(config.undo_capacity),
            pending: None,
            notice: None,
            importance: config.importance,
            undo_toast: config.undo_toast,
            notice_timeout: config.notice_timeout,
        }
    }

    pub fn pending(&self) -> Option<&PendingDeletion> {
        self.pending.as_ref()
    }

    pub fn prompt(&self, store: &BlockStore) -> Option<String> {
        self.pending.as_ref().map(|pending| pending.prompt(store))
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    /// Live notice, if one is still within its display time.
    pub fn notice(&mut self, now: Instant) -> Option<&Notice> {
        if self.notice.as_ref().is_some_and(|notice| notice.is_expired(now)) {
            self.notice = None;
        }
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    fn show(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant) {
        let ttl = match kind {
            NoticeKind::Undo => self.undo_toast,
            NoticeKind::Info => self.notice_timeout,
        };
        self.notice = Some(Notice {
            kind,
            message: message.into(),
            shown_at: now,
            ttl,
        });
    }

    fn is_deletable(store: &BlockStore, id: BlockId) -> bool {
        store
            .get_block(id)
            .is_some_and(|block| block.metadata.deletable)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    pub fn delete_block(
        &mut self,
        store: &mut BlockStore,
        id: BlockId,
        confirm: bool,
        now: Instant,
    ) -> DeleteOutcome {
        if self.pending.is_some() || !Self::is_deletable(store, id) {
            return DeleteOutcome::Ignored;
        }
        let important = store
            .get_block(id)
            .is_some_and(|block| block.is_important(&self.importance));
        if confirm && important {
            debug!(block_id = %id, "deletion awaiting confirmation");
            self.pending = Some(PendingDeletion::Single { id });
            return DeleteOutcome::Pending;
        }
        self.remove_single(store, id, now)
    }

    pub fn delete_multiple_blocks(
        &mut self,
        store: &mut BlockStore,
        ids: &[BlockId],
        confirm: bool,
        now: Instant,
    ) -> DeleteOutcome {
        if self.pending.is_some() {
            return DeleteOutcome::Ignored;
        }
        let mut targets: Vec<BlockId> = Vec::with_capacity(ids.len());
        for &id in ids {
            if Self::is_deletable(store, id) && !targets.contains(&id) {
                targets.push(id);
            }
        }
        if targets.is_empty() {
            return DeleteOutcome::Ignored;
        }
        let important = targets.iter().any(|id| {
            store
                .get_block(*id)
                .is_some_and(|block| block.is_important(&self.importance))
        });
        if confirm && important {
            debug!(count = targets.len(), "batch deletion awaiting confirmation");
            self.pending = Some(PendingDeletion::Batch { ids: targets });
            return DeleteOutcome::Pending;
        }
        self.remove_batch(store, &targets, now)
    }

    /// Always asks first. An empty document has nothing to clear.
    pub fn clear_all(&mut self, store: &BlockStore) -> DeleteOutcome {
        if self.pending.is_some() || store.is_empty() {
            return DeleteOutcome::Ignored;
        }
        self.pending = Some(PendingDeletion::ClearAll);
        DeleteOutcome::Pending
    }

    /// Answer the pending confirmation. Declining is a full abort.
    pub fn resolve_confirmation(
        &mut self,
        store: &mut BlockStore,
        accepted: bool,
        now: Instant,
    ) -> DeleteOutcome {
        let Some(pending) = self.pending.take() else {
            return DeleteOutcome::Ignored;
        };
        if !accepted {
            debug!(?pending, "deletion declined");
            return DeleteOutcome::Cancelled;
        }
        match pending {
            PendingDeletion::Single { id } => self.remove_single(store, id, now),
            PendingDeletion::Batch { ids } => self.remove_batch(store, &ids, now),
            PendingDeletion::ClearAll => self.remove_all(store, now),
        }
    }

    pub fn handle_command(
        &mut self,
        store: &mut BlockStore,
        command: &EditorCommand,
        now: Instant,
    ) -> Option<DeleteOutcome> {
        match command {
            EditorCommand::DeleteBlock {
                block_id,
                skip_confirm,
            } => Some(self.delete_block(store, *block_id, !skip_confirm, now)),
            EditorCommand::DeleteBlocks {
                block_ids,
                skip_confirm,
            } => Some(self.delete_multiple_blocks(store, block_ids, !skip_confirm, now)),
            EditorCommand::ClearAllBlocks => Some(self.clear_all(store)),
            EditorCommand::BlocksReordered { .. } => None,
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    fn remove_single(&mut self, store: &mut BlockStore, id: BlockId, now: Instant) -> DeleteOutcome {
        let Some(block) = store.remove_block(id) else {
            return DeleteOutcome::Ignored;
        };
        info!(block_id = %id, kind = %block.kind, order = block.order, "deleted block");
        let position = block.order;
        self.undo.push(UndoEntry::Single {
            block,
            position,
            deleted_at: Utc::now(),
        });
        self.show(NoticeKind::Undo, "Block deleted", now);
        DeleteOutcome::Deleted(1)
    }

    fn remove_batch(&mut self, store: &mut BlockStore, ids: &[BlockId], now: Instant) -> DeleteOutcome {
        let blocks: Vec<Block> = ids.iter().filter_map(|id| store.remove_block(*id)).collect();
        if blocks.is_empty() {
            return DeleteOutcome::Ignored;
        }
        let count = blocks.len();
        info!(count, "deleted blocks");
        self.undo.push(UndoEntry::Batch {
            blocks,
            deleted_at: Utc::now(),
        });
        self.show(NoticeKind::Undo, format!("{count} blocks deleted"), now);
        DeleteOutcome::Deleted(count)
    }

    fn remove_all(&mut self, store: &mut BlockStore, now: Instant) -> DeleteOutcome {
        let blocks = store.clear();
        if blocks.is_empty() {
            return DeleteOutcome::Ignored;
        }
        let count = blocks.len();
        info!(count, "cleared document");
        self.undo.push(UndoEntry::ClearAll {
            blocks,
            deleted_at: Utc::now(),
        });
        self.show(NoticeKind::Undo, "Document cleared", now);
        DeleteOutcome::Deleted(count)
    }

    // =========================================================================
    // Undo
    // =========================================================================

    /// Reverse the most recent deletion. Returns false when there is nothing
    /// to undo.
    pub fn undo_delete(&mut self, store: &mut BlockStore, now: Instant) -> bool {
        match self.undo.pop() {
            Some(entry) => {
                self.restore(store, entry, now);
                true
            }
            None => {
                self.show(NoticeKind::Info, "Nothing to undo", now);
                false
            }
        }
    }

    /// Reverse the most recent clear-all, even if single deletions were
    /// recorded after it.
    pub fn undo_clear_all(&mut self, store: &mut BlockStore, now: Instant) -> bool {
        match self.undo.pop_clear_all() {
            Some(entry) => {
                self.restore(store, entry, now);
                true
            }
            None => {
                self.show(NoticeKind::Info, "Nothing to undo", now);
                false
            }
        }
    }

    fn restore(&mut self, store: &mut BlockStore, entry: UndoEntry, now: Instant) {
        let count = entry.len();
        match entry {
            UndoEntry::Single {
                block, position, ..
            } => {
                let restored = store.restore_block(block, InsertPosition::At(position));
                info!(block_id = %restored.id, order = restored.order, "restored block");
            }
            UndoEntry::Batch { blocks, .. } => {
                for block in blocks.into_iter().rev() {
                    let position = block.order;
                    store.restore_block(block, InsertPosition::At(position));
                }
                info!(count, "restored blocks");
            }
            UndoEntry::ClearAll { blocks, .. } => {
                for block in blocks {
                    store.restore_block(block, InsertPosition::End);
                }
                info!(count, "restored cleared document");
            }
        }
        let message = match count {
            1 => "Block restored".to_string(),
            n => format!("{n} blocks restored"),
        };
        self.show(NoticeKind::Info, message, now);
    }
}

#[cfg(test)]
#[path = "deletion_tests.rs"]
mod deletion_tests;
