//! One editing session: a store plus the three controllers wired to it.
//!
//! The session owns the command queue the controllers talk through and is
//! the single entry point for terminal input. Nothing here is global; two
//! sessions never see each other's commands.

use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use tracing::debug;

use crate::block::{Block, BlockData, BlockId};
use crate::config::EditorConfig;
use crate::deletion::{DeleteOutcome, DeletionController, Notice};
use crate::drag::{DragController, PointerGesture, ReorderGesture, TouchEvent, TouchGesture};
use crate::events::{CommandQueue, EditorCommand};
use crate::layout::BlockLayout;
use crate::navigation::{FocusState, NavigationController};
use crate::store::{BlockStore, InsertPosition};

type CommandObserver = Box<dyn FnMut(&EditorCommand)>;

pub struct EditingSession {
    store: BlockStore,
    navigation: NavigationController,
    deletion: DeletionController,
    drag: DragController,
    pointer: PointerGesture,
    touch: TouchGesture,
    commands: CommandQueue,
    layout: BlockLayout,
    config: EditorConfig,
    observers: Vec<CommandObserver>,
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("store", &self.store)
            .field("navigation", &self.navigation)
            .field("deletion", &self.deletion)
            .field("drag", &self.drag)
            .field("commands", &self.commands)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for EditingSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditingSession {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_store(BlockStore::new(), config)
    }

    pub fn with_blocks(blocks: Vec<Block>, config: EditorConfig) -> Self {
        Self::with_store(BlockStore::with_blocks(blocks), config)
    }

    pub fn with_store(store: BlockStore, config: EditorConfig) -> Self {
        Self {
            store,
            navigation: NavigationController::new(&config),
            deletion: DeletionController::new(&config),
            drag: DragController::new(),
            pointer: PointerGesture::new(),
            touch: TouchGesture::new(),
            commands: CommandQueue::new(),
            layout: BlockLayout::default(),
            config,
            observers: Vec::new(),
        }
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BlockStore {
        &mut self.store
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut NavigationController {
        &mut self.navigation
    }

    pub fn deletion(&self) -> &DeletionController {
        &self.deletion
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Geometry of the latest render, used for hit testing.
    pub fn set_layout(&mut self, layout: BlockLayout) {
        self.layout = layout;
    }

    pub fn focus_state(&self) -> FocusState {
        self.navigation.state(&self.store)
    }

    pub fn confirmation_prompt(&self) -> Option<String> {
        self.deletion.prompt(&self.store)
    }

    pub fn notice(&mut self, now: Instant) -> Option<&Notice> {
        self.deletion.notice(now)
    }

    /// Observe every command passing through the session, the way the
    /// renderer learns that a drop reordered the list.
    pub fn on_command(&mut self, observer: impl FnMut(&EditorCommand) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Insert through the store, optionally entering edit mode on the new
    /// block.
    pub fn insert_block(&mut self, data: BlockData, position: InsertPosition, edit: bool) -> Block {
        let block = self.store.insert_block(data, position);
        if edit {
            self.navigation.enter_edit(&mut self.store, block.id);
        }
        block
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn submit(&mut self, command: EditorCommand, now: Instant) -> Option<DeleteOutcome> {
        for observer in &mut self.observers {
            observer(&command);
        }
        let outcome = self.deletion.handle_command(&mut self.store, &command, now);
        debug!(?command, ?outcome, "dispatched command");
        outcome
    }

    /// Deliver everything the controllers queued since the last call.
    pub fn dispatch_commands(&mut self, now: Instant) {
        while let Some(command) = self.commands.pop() {
            self.submit(command, now);
        }
    }

    pub fn request_delete(&mut self, block_id: BlockId, skip_confirm: bool, now: Instant) -> DeleteOutcome {
        let command = EditorCommand::DeleteBlock {
            block_id,
            skip_confirm,
        };
        self.submit(command, now).unwrap_or(DeleteOutcome::Ignored)
    }

    pub fn request_delete_many(
        &mut self,
        block_ids: Vec<BlockId>,
        skip_confirm: bool,
        now: Instant,
    ) -> DeleteOutcome {
        let command = EditorCommand::DeleteBlocks {
            block_ids,
            skip_confirm,
        };
        self.submit(command, now).unwrap_or(DeleteOutcome::Ignored)
    }

    pub fn request_clear_all(&mut self, now: Instant) -> DeleteOutcome {
        self.submit(EditorCommand::ClearAllBlocks, now)
            .unwrap_or(DeleteOutcome::Ignored)
    }

    pub fn resolve_confirmation(&mut self, accepted: bool, now: Instant) -> DeleteOutcome {
        self.deletion
            .resolve_confirmation(&mut self.store, accepted, now)
    }

    pub fn undo_delete(&mut self, now: Instant) -> bool {
        self.deletion.undo_delete(&mut self.store, now)
    }

    pub fn undo_clear_all(&mut self, now: Instant) -> bool {
        self.deletion.undo_clear_all(&mut self.store, now)
    }

    // =========================================================================
    // Input
    // =========================================================================

    pub fn handle_event(&mut self, event: &Event, now: Instant) -> bool {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(*key, now),
            Event::Mouse(mouse) => self.handle_mouse(*mouse, now),
            _ => false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if self.deletion.pending().is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.resolve_confirmation(true, now);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.resolve_confirmation(false, now);
                }
                _ => {}
            }
            return true;
        }

        if self.drag.is_dragging() {
            if key.code == KeyCode::Esc {
                return self.drag.cancel();
            }
            return false;
        }

        let command = key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER);
        if command
            && !key.modifiers.contains(KeyModifiers::SHIFT)
            && key.code == KeyCode::Char('z')
        {
            if self.navigation.is_typing() {
                return false;
            }
            self.undo_delete(now);
            return true;
        }

        let handled = self
            .navigation
            .handle_key(key, &mut self.store, &mut self.commands);
        self.dispatch_commands(now);
        handled
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, now: Instant) -> bool {
        if self.deletion.pending().is_some() {
            if matches!(event.kind, MouseEventKind::Down(_)) {
                self.resolve_confirmation(false, now);
            }
            return true;
        }

        let handled = if self.pointer.handle(
            &event,
            &self.layout,
            &mut self.drag,
            &mut self.store,
            &mut self.commands,
        ) {
            true
        } else {
            self.navigation.handle_mouse(
                event,
                &self.layout,
                &mut self.store,
                &mut self.commands,
                now,
            )
        };
        self.dispatch_commands(now);
        handled
    }

    /// Pointer events outside the document area. A press declines a pending
    /// confirmation or closes the menu; a drag loses its drop target and a
    /// release there ends it without moving anything.
    pub fn handle_mouse_outside(&mut self, event: MouseEvent, now: Instant) -> bool {
        match event.kind {
            MouseEventKind::Down(_) => {
                if self.deletion.pending().is_some() {
                    self.resolve_confirmation(false, now);
                    true
                } else {
                    self.navigation.close_context_menu()
                }
            }
            MouseEventKind::Drag(_) => self.drag.clear_indicator(),
            MouseEventKind::Up(_) => self.drag.cancel(),
            _ => false,
        }
    }

    pub fn handle_touch(&mut self, event: TouchEvent, now: Instant) -> bool {
        if self.deletion.pending().is_some() {
            return false;
        }
        let handled = self.touch.handle(
            &event,
            &self.layout,
            &mut self.drag,
            &mut self.store,
            &mut self.commands,
        );
        self.dispatch_commands(now);
        handled
    }
}
