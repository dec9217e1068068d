//! Session-scoped command channel between the controllers.
//!
//! Controllers never call each other directly. Navigation asks for a deletion
//! by queueing `DeleteBlock`; the session hands it to the deletion controller,
//! which decides whether to confirm first.

use std::collections::VecDeque;

use crate::block::BlockId;
use crate::store::MovePosition;

#[derive(Clone, Debug, PartialEq)]
pub enum EditorCommand {
    DeleteBlock { block_id: BlockId, skip_confirm: bool },
    DeleteBlocks { block_ids: Vec<BlockId>, skip_confirm: bool },
    ClearAllBlocks,
    /// A drop reordered the list; observers should re-read it.
    BlocksReordered {
        block_id: BlockId,
        target_id: BlockId,
        position: MovePosition,
    },
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<EditorCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: EditorCommand) {
        self.pending.push_back(command);
    }

    pub fn pop(&mut self) -> Option<EditorCommand> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
