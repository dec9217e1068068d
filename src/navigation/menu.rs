use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::layout::{Position, Rect};

use crate::block::BlockId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Edit,
    Delete,
    MoveUp,
    MoveDown,
    Duplicate,
    Copy,
    Cut,
    Paste,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuShortcut {
    pub key: char,
    requires_shift: bool,
}

impl MenuShortcut {
    const fn new(key: char) -> Self {
        Self {
            key,
            requires_shift: false,
        }
    }

    const fn with_shift(key: char) -> Self {
        Self {
            key,
            requires_shift: true,
        }
    }

    fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char(ch) if ch == self.key => {
                if self.requires_shift {
                    modifiers == KeyModifiers::SHIFT
                } else {
                    modifiers.is_empty()
                }
            }
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: MenuAction,
    pub shortcut: Option<MenuShortcut>,
    enabled: bool,
}

impl MenuItem {
    const fn new(label: &'static str, action: MenuAction, shortcut: MenuShortcut) -> Self {
        Self {
            label,
            action,
            shortcut: Some(shortcut),
            enabled: true,
        }
    }

    fn enabled_if(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuEntry {
    Section(&'static str),
    Separator,
    Item(MenuItem),
}

/// What the menu offers depends on where the target sits and whether the
/// clipboard holds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct MenuContext {
    pub is_first: bool,
    pub is_last: bool,
    pub has_clipboard: bool,
}

/// A context menu opened on one block.
#[derive(Clone, Debug)]
pub struct ContextMenu {
    target: BlockId,
    anchor: (u16, u16),
    entries: Vec<MenuEntry>,
    selected_index: usize,
    area: Option<Rect>,
}

impl ContextMenu {
    pub fn new(target: BlockId, anchor: (u16, u16), context: MenuContext) -> Self {
        let entries = build_context_menu_entries(context);
        let selected_index = entries
            .iter()
            .position(|entry| matches!(entry, MenuEntry::Item(item) if item.is_enabled()))
            .unwrap_or(0);
        Self {
            target,
            anchor,
            entries,
            selected_index,
            area: None,
        }
    }

    pub fn target(&self) -> BlockId {
        self.target
    }

    /// Document cell the menu was requested at.
    pub fn anchor(&self) -> (u16, u16) {
        self.anchor
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    /// Recorded by the renderer so clicks can be mapped to entries.
    pub fn set_area(&mut self, area: Rect) {
        self.area = Some(area);
    }

    pub fn area(&self) -> Option<Rect> {
        self.area
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.entries.is_empty() {
            return;
        }

        let len = self.entries.len() as i32;
        let mut idx = self.selected_index as i32;

        for _ in 0..len {
            idx = (idx + delta).rem_euclid(len);
            if matches!(self.entries[idx as usize], MenuEntry::Item(item) if item.is_enabled()) {
                self.selected_index = idx as usize;
                break;
            }
        }
    }

    pub fn current_action(&self) -> Option<MenuAction> {
        match self.entries.get(self.selected_index) {
            Some(MenuEntry::Item(item)) if item.is_enabled() => Some(item.action),
            _ => None,
        }
    }

    pub fn shortcut_action(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Option<MenuAction> {
        for (idx, entry) in self.entries.iter().enumerate() {
            if let MenuEntry::Item(item) = entry {
                if item.shortcut.is_some_and(|shortcut| shortcut.matches(code, modifiers)) {
                    self.selected_index = idx;
                    return item.is_enabled().then_some(item.action);
                }
            }
        }
        None
    }

    /// Entry under a screen row, accounting for the top border.
    pub fn action_at_row(&self, row: u16) -> Option<MenuAction> {
        let area = self.area?;
        let first = area.y.checked_add(1)?;
        let index = usize::from(row.checked_sub(first)?);
        match self.entries.get(index) {
            Some(MenuEntry::Item(item)) if item.is_enabled() => Some(item.action),
            _ => None,
        }
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        self.area
            .is_some_and(|area| area.contains(Position::new(column, row)))
    }
}

fn build_context_menu_entries(context: MenuContext) -> Vec<MenuEntry> {
    let mut entries = vec![
        MenuEntry::Section("Block"),
        MenuEntry::Item(MenuItem::new("Edit", MenuAction::Edit, MenuShortcut::new('e'))),
        MenuEntry::Item(MenuItem::new(
            "Delete",
            MenuAction::Delete,
            MenuShortcut::new('d'),
        )),
        MenuEntry::Separator,
        MenuEntry::Item(
            MenuItem::new("Move Up", MenuAction::MoveUp, MenuShortcut::new('u'))
                .enabled_if(!context.is_first),
        ),
        MenuEntry::Item(
            MenuItem::new("Move Down", MenuAction::MoveDown, MenuShortcut::new('n'))
                .enabled_if(!context.is_last),
        ),
        MenuEntry::Item(MenuItem::new(
            "Duplicate",
            MenuAction::Duplicate,
            MenuShortcut::with_shift('D'),
        )),
        MenuEntry::Separator,
        MenuEntry::Section("Copy & paste"),
        MenuEntry::Item(MenuItem::new("Copy", MenuAction::Copy, MenuShortcut::new('c'))),
        MenuEntry::Item(MenuItem::new("Cut", MenuAction::Cut, MenuShortcut::new('x'))),
    ];
    if context.has_clipboard {
        entries.push(MenuEntry::Item(MenuItem::new(
            "Paste",
            MenuAction::Paste,
            MenuShortcut::new('v'),
        )));
    }
    entries
}
