//! Keyboard and mouse driven focus/edit state machine.
//!
//! The store owns the focus pointer; this controller layers edit mode on top
//! of it and exposes the combined state as a `FocusState` for the renderer to
//! react to. It never reaches into rendered output beyond the `BlockLayout`
//! the renderer hands back.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use tracing::{debug, trace};

use crate::block::{BlockId, BlockKind};
use crate::config::EditorConfig;
use crate::events::{CommandQueue, EditorCommand};
use crate::layout::BlockLayout;
use crate::store::{BlockStore, InsertPosition};

mod menu;

pub use menu::{ContextMenu, MenuAction, MenuContext, MenuEntry, MenuItem, MenuShortcut};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellPosition {
    pub row: usize,
    pub column: usize,
}

impl CellPosition {
    pub const ORIGIN: CellPosition = CellPosition { row: 0, column: 0 };

    /// Next (or previous) cell in reading order, wrapping across rows.
    pub fn step(self, rows: usize, columns: usize, forward: bool) -> Option<CellPosition> {
        if rows == 0 || columns == 0 {
            return None;
        }
        if forward {
            if self.column + 1 < columns {
                Some(CellPosition {
                    column: self.column + 1,
                    ..self
                })
            } else if self.row + 1 < rows {
                Some(CellPosition {
                    row: self.row + 1,
                    column: 0,
                })
            } else {
                None
            }
        } else if self.column > 0 {
            Some(CellPosition {
                column: self.column - 1,
                ..self
            })
        } else if self.row > 0 {
            Some(CellPosition {
                row: self.row - 1,
                column: columns - 1,
            })
        } else {
            None
        }
    }
}

/// How the content surface of a block is entered for editing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditEntry {
    /// Embedded rich-text surface, caret at the end of the content. The
    /// surface manages its own editability.
    RichText,
    /// Table, editing the given cell. Entry starts at the first cell.
    TableCell(CellPosition),
    /// Banner, callout or title: the text span is made editable for the
    /// duration of the edit.
    InlineText,
    /// Anything else: the block wrapper itself takes focus.
    Wrapper,
}

impl EditEntry {
    pub fn for_kind(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Text => EditEntry::RichText,
            BlockKind::Table => EditEntry::TableCell(CellPosition::ORIGIN),
            kind if kind.is_banner_family() => EditEntry::InlineText,
            _ => EditEntry::Wrapper,
        }
    }

    /// Whether entering granted an editable span that exiting must revoke.
    pub fn grants_editable(&self) -> bool {
        matches!(self, EditEntry::InlineText)
    }

    /// Whether keystrokes go to a text surface while in this mode.
    pub fn is_typing(&self) -> bool {
        !matches!(self, EditEntry::Wrapper)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusState {
    Idle,
    Focused(BlockId),
    Editing { id: BlockId, entry: EditEntry },
}

impl FocusState {
    pub fn block_id(&self) -> Option<BlockId> {
        match self {
            FocusState::Idle => None,
            FocusState::Focused(id) | FocusState::Editing { id, .. } => Some(*id),
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, FocusState::Editing { .. })
    }
}

#[derive(Debug)]
struct ClickTracker {
    timeout: Duration,
    last_instant: Option<Instant>,
    last_position: Option<(u16, u16)>,
    last_button: Option<MouseButton>,
    count: u8,
}

impl ClickTracker {
    fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_instant: None,
            last_position: None,
            last_button: None,
            count: 0,
        }
    }

    fn register(&mut self, button: MouseButton, column: u16, row: u16, now: Instant) -> u8 {
        let repeated = self.last_button == Some(button)
            && self.last_position == Some((column, row))
            && self
                .last_instant
                .is_some_and(|last| now.saturating_duration_since(last) <= self.timeout);
        self.count = if repeated { (self.count + 1).min(3) } else { 1 };
        self.last_button = Some(button);
        self.last_instant = Some(now);
        self.last_position = Some((column, row));
        self.count
    }
}

#[derive(Debug)]
pub struct NavigationController {
    editing: Option<(BlockId, EditEntry)>,
    /// Store focus generation when edit mode was entered.
    edit_generation: u64,
    text_input_active: bool,
    menu: Option<ContextMenu>,
    clicks: ClickTracker,
}

fn is_command(modifiers: KeyModifiers) -> bool {
    modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER)
}

impl NavigationController {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            editing: None,
            edit_generation: 0,
            text_input_active: false,
            menu: None,
            clicks: ClickTracker::new(config.double_click),
        }
    }

    pub fn state(&self, store: &BlockStore) -> FocusState {
        match (store.focused_id(), self.editing) {
            (Some(focused), Some((id, entry)))
                if focused == id && store.focus_generation() == self.edit_generation =>
            {
                FocusState::Editing { id, entry }
            }
            (Some(focused), _) => FocusState::Focused(focused),
            (None, _) => FocusState::Idle,
        }
    }

    /// True while keystrokes belong to a text surface: a block being edited
    /// through a text surface, or a plain input the host reports as active.
    pub fn is_typing(&self) -> bool {
        self.text_input_active || self.editing.is_some_and(|(_, entry)| entry.is_typing())
    }

    /// Reported by the host when a plain text input outside the block flow
    /// holds native focus.
    pub fn set_text_input_active(&mut self, active: bool) {
        self.text_input_active = active;
    }

    pub fn table_cell(&self) -> Option<CellPosition> {
        match self.editing {
            Some((_, EditEntry::TableCell(cell))) => Some(cell),
            _ => None,
        }
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.menu.as_ref()
    }

    pub fn context_menu_mut(&mut self) -> Option<&mut ContextMenu> {
        self.menu.as_mut()
    }

    /// Drop edit mode or menu state that no longer matches the store.
    fn reconcile(&mut self, store: &BlockStore) {
        if let Some((id, _)) = self.editing {
            let stale = store.focus_generation() != self.edit_generation;
            if store.focused_id() != Some(id) || stale {
                trace!(block_id = %id, "edit mode lost its block");
                self.editing = None;
            }
        }
        if let Some(menu) = &self.menu {
            if store.get_block(menu.target()).is_none() {
                self.menu = None;
            }
        }
    }

    // =========================================================================
    // Focus movement
    // =========================================================================

    pub fn focus(&mut self, store: &mut BlockStore, id: BlockId) -> bool {
        if self.editing.is_some_and(|(editing, _)| editing != id) {
            self.exit_edit();
        }
        store.focus_block(id)
    }

    pub fn focus_previous(&mut self, store: &mut BlockStore) -> bool {
        self.focus_relative(store, -1)
    }

    pub fn focus_next(&mut self, store: &mut BlockStore) -> bool {
        self.focus_relative(store, 1)
    }

    fn focus_relative(&mut self, store: &mut BlockStore, delta: isize) -> bool {
        let Some(current) = store.focused_id().and_then(|id| store.index_of(id)) else {
            return self.focus_first(store);
        };
        let Some(target) = current
            .checked_add_signed(delta)
            .and_then(|index| store.block_at(index))
            .map(|block| block.id)
        else {
            return false;
        };
        self.focus(store, target)
    }

    pub fn focus_first(&mut self, store: &mut BlockStore) -> bool {
        match store.block_at(0).map(|block| block.id) {
            Some(id) => self.focus(store, id),
            None => false,
        }
    }

    pub fn focus_last(&mut self, store: &mut BlockStore) -> bool {
        match store.blocks().last().map(|block| block.id) {
            Some(id) => self.focus(store, id),
            None => false,
        }
    }

    /// Swap the focused block with its neighbour and keep it focused.
    pub fn move_focused(&mut self, store: &mut BlockStore, up: bool) -> bool {
        let Some(id) = store.focused_id() else {
            return false;
        };
        let moved = if up {
            store.move_block_up(id)
        } else {
            store.move_block_down(id)
        };
        if moved {
            store.focus_block(id);
        }
        moved
    }

    // =========================================================================
    // Edit mode
    // =========================================================================

    pub fn enter_edit(&mut self, store: &mut BlockStore, id: BlockId) -> Option<EditEntry> {
        let block = store.get_block(id)?;
        if !block.metadata.editable {
            return None;
        }
        let entry = EditEntry::for_kind(block.kind);
        self.focus(store, id);
        self.editing = Some((id, entry));
        self.edit_generation = store.focus_generation();
        debug!(block_id = %id, ?entry, "entered edit mode");
        Some(entry)
    }

    pub fn exit_edit(&mut self) -> bool {
        match self.editing.take() {
            Some((id, entry)) => {
                debug!(block_id = %id, revoke = entry.grants_editable(), "left edit mode");
                true
            }
            None => false,
        }
    }

    /// Tab / Shift+Tab inside a table: step to the next or previous cell,
    /// wrapping across rows. Stays put at the first and last cell.
    pub fn step_table_cell(&mut self, store: &BlockStore, forward: bool) -> bool {
        let Some((id, EditEntry::TableCell(cell))) = self.editing else {
            return false;
        };
        let Some(table) = store.get_block(id).and_then(|block| block.table()) else {
            return false;
        };
        let Some(next) = cell.step(table.rows, table.columns, forward) else {
            return false;
        };
        self.editing = Some((id, EditEntry::TableCell(next)));
        trace!(block_id = %id, row = next.row, column = next.column, "moved table cell");
        true
    }

    // =========================================================================
    // Context menu
    // =========================================================================

    pub fn open_context_menu(
        &mut self,
        store: &mut BlockStore,
        id: BlockId,
        anchor: (u16, u16),
    ) -> bool {
        let Some(index) = store.index_of(id) else {
            return false;
        };
        let context = MenuContext {
            is_first: index == 0,
            is_last: index + 1 == store.len(),
            has_clipboard: store.clipboard().is_some(),
        };
        self.focus(store, id);
        self.menu = Some(ContextMenu::new(id, anchor, context));
        true
    }

    pub fn close_context_menu(&mut self) -> bool {
        self.menu.take().is_some()
    }

    /// Run a menu action against the menu's target and close the menu.
    pub fn perform_menu_action(
        &mut self,
        store: &mut BlockStore,
        commands: &mut CommandQueue,
        action: MenuAction,
    ) -> bool {
        let Some(menu) = self.menu.take() else {
            return false;
        };
        let target = menu.target();
        if store.get_block(target).is_none() {
            return false;
        }
        debug!(block_id = %target, ?action, "context menu action");
        match action {
            MenuAction::Edit => self.enter_edit(store, target).is_some(),
            MenuAction::Delete => {
                commands.push(EditorCommand::DeleteBlock {
                    block_id: target,
                    skip_confirm: false,
                });
                true
            }
            MenuAction::MoveUp | MenuAction::MoveDown => {
                let moved = if action == MenuAction::MoveUp {
                    store.move_block_up(target)
                } else {
                    store.move_block_down(target)
                };
                if moved {
                    store.focus_block(target);
                }
                moved
            }
            MenuAction::Duplicate => store.duplicate_block(target).is_some(),
            MenuAction::Copy => store.copy_block(target),
            MenuAction::Cut => store.cut_block(target).is_some(),
            MenuAction::Paste => store
                .paste_block(InsertPosition::AfterBlock(target))
                .is_some(),
        }
    }

    fn handle_menu_key(
        &mut self,
        key: KeyEvent,
        store: &mut BlockStore,
        commands: &mut CommandQueue,
    ) -> bool {
        let Some(menu) = self.menu.as_mut() else {
            return false;
        };
        let action = match key.code {
            KeyCode::Esc => {
                self.menu = None;
                return true;
            }
            KeyCode::Up => {
                menu.move_selection(-1);
                return true;
            }
            KeyCode::Down => {
                menu.move_selection(1);
                return true;
            }
            KeyCode::Enter => menu.current_action(),
            KeyCode::Char(_) => menu.shortcut_action(key.code, key.modifiers),
            _ => None,
        };
        if let Some(action) = action {
            self.perform_menu_action(store, commands, action);
        }
        true
    }

    // =========================================================================
    // Input
    // =========================================================================

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        store: &mut BlockStore,
        commands: &mut CommandQueue,
    ) -> bool {
        self.reconcile(store);
        if self.menu.is_some() {
            return self.handle_menu_key(key, store, commands);
        }

        let modifiers = key.modifiers;
        match key.code {
            KeyCode::Esc => self.exit_edit(),
            KeyCode::Tab | KeyCode::BackTab if self.table_cell().is_some() => {
                let forward =
                    key.code == KeyCode::Tab && !modifiers.contains(KeyModifiers::SHIFT);
                self.step_table_cell(store, forward);
                true
            }
            KeyCode::Up | KeyCode::Down if modifiers.contains(KeyModifiers::ALT) => {
                self.move_focused(store, key.code == KeyCode::Up)
            }
            KeyCode::Up if modifiers.contains(KeyModifiers::CONTROL) => self.focus_previous(store),
            KeyCode::Down if modifiers.contains(KeyModifiers::CONTROL) => self.focus_next(store),
            KeyCode::Home if modifiers.contains(KeyModifiers::CONTROL) => self.focus_first(store),
            KeyCode::End if modifiers.contains(KeyModifiers::CONTROL) => self.focus_last(store),
            KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                let Some(id) = store.focused_id() else {
                    return false;
                };
                commands.push(EditorCommand::DeleteBlock {
                    block_id: id,
                    skip_confirm: false,
                });
                true
            }
            KeyCode::Char(ch @ ('c' | 'x' | 'v'))
                if is_command(modifiers) && !modifiers.contains(KeyModifiers::ALT) =>
            {
                if self.is_typing() {
                    return false;
                }
                self.clipboard_shortcut(ch, store)
            }
            KeyCode::Enter if modifiers.is_empty() => {
                if self.editing.is_some() || self.is_typing() {
                    return false;
                }
                match store.focused_id() {
                    Some(id) => self.enter_edit(store, id).is_some(),
                    None => false,
                }
            }
            _ => false,
        }
    }

    fn clipboard_shortcut(&mut self, key: char, store: &mut BlockStore) -> bool {
        let focused = store.focused_id();
        match (key, focused) {
            ('c', Some(id)) => store.copy_block(id),
            ('x', Some(id)) => store.cut_block(id).is_some(),
            ('v', _) => store.paste_block(InsertPosition::After).is_some(),
            _ => false,
        }
    }

    /// Clicks, double clicks and right clicks on blocks. Presses on a drag
    /// handle are left for the drag controller and report `false`.
    pub fn handle_mouse(
        &mut self,
        event: MouseEvent,
        layout: &BlockLayout,
        store: &mut BlockStore,
        commands: &mut CommandQueue,
        now: Instant,
    ) -> bool {
        self.reconcile(store);
        let (column, row) = (event.column, event.row);

        if let Some(menu) = &self.menu {
            match event.kind {
                MouseEventKind::Down(MouseButton::Left) => {
                    if menu.contains(column, row) {
                        if let Some(action) = menu.action_at_row(row) {
                            self.perform_menu_action(store, commands, action);
                        }
                    } else {
                        self.menu = None;
                    }
                    return true;
                }
                MouseEventKind::Down(MouseButton::Right) => {
                    self.menu = None;
                }
                _ => return true,
            }
        }

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if layout.handle_at(column, row).is_some() {
                    return false;
                }
                let Some(id) = layout.block_at(column, row).map(|hit| hit.id) else {
                    self.exit_edit();
                    return store.clear_focus();
                };
                let clicks = self.clicks.register(MouseButton::Left, column, row, now);
                if clicks >= 2 {
                    self.enter_edit(store, id).is_some()
                } else {
                    self.focus(store, id)
                }
            }
            MouseEventKind::Down(MouseButton::Right) => {
                match layout.block_at(column, row).map(|hit| hit.id) {
                    Some(id) => self.open_context_menu(store, id, (column, row)),
                    None => false,
                }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "navigation_tests.rs"]
mod navigation_tests;
