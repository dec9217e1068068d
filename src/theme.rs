use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the block editor
#[derive(Clone, Debug)]
pub struct Theme {
    /// Background color for the document area
    pub background: Color,

    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the current file name in the status bar
    pub filename_color: Color,

    /// Color of the drag handle on unfocused blocks
    pub handle_fg: Color,

    /// Handle and accent color of the focused block
    pub focus_fg: Color,

    /// Background of the focused block
    pub focus_bg: Color,

    /// Background of the block being edited
    pub editing_bg: Color,

    /// Color for placeholders of empty blocks
    pub placeholder_fg: Color,

    /// Foreground of the block being dragged
    pub drag_source_fg: Color,

    /// Color of the drop indicator line
    pub indicator_fg: Color,

    /// Foreground color for the drag ghost
    pub ghost_fg: Color,

    /// Background color for the drag ghost
    pub ghost_bg: Color,

    /// Foreground color for the table cell being edited
    pub cell_cursor_fg: Color,

    /// Background color for the table cell being edited
    pub cell_cursor_bg: Color,

    /// Color for table borders, dividers and code fences
    pub rule_fg: Color,

    /// Color for code block contents
    pub code_fg: Color,

    /// Foreground color for menu items
    pub menu_fg: Color,

    /// Background color for menu
    pub menu_bg: Color,

    /// Foreground color for disabled menu items
    pub menu_disabled_fg: Color,

    /// Foreground color for selected menu entry
    pub menu_selected_fg: Color,

    /// Background color for selected menu entry
    pub menu_selected_bg: Color,

    /// Foreground color for disabled selected menu entry
    pub menu_selected_disabled_fg: Color,

    /// Foreground color for the confirmation dialog
    pub dialog_fg: Color,

    /// Background color for the confirmation dialog
    pub dialog_bg: Color,

    /// Foreground color for the undo toast
    pub undo_fg: Color,

    /// Background color for the undo toast
    pub undo_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            handle_fg: Color::DarkGray,
            focus_fg: Color::LightBlue,
            focus_bg: Color::Reset,
            editing_bg: Color::Rgb(30, 34, 48),
            placeholder_fg: Color::DarkGray,
            drag_source_fg: Color::DarkGray,
            indicator_fg: Color::LightCyan,
            ghost_fg: Color::Black,
            ghost_bg: Color::Gray,
            cell_cursor_fg: Color::Black,
            cell_cursor_bg: Color::LightYellow,
            rule_fg: Color::Gray,
            code_fg: Color::LightGreen,
            menu_fg: Color::White,
            menu_bg: Color::Black,
            menu_disabled_fg: Color::DarkGray,
            menu_selected_fg: Color::White,
            menu_selected_bg: Color::LightBlue,
            menu_selected_disabled_fg: Color::DarkGray,
            dialog_fg: Color::White,
            dialog_bg: Color::Red,
            undo_fg: Color::Black,
            undo_bg: Color::LightYellow,
        }
    }
}

impl Theme {
    /// Create a new theme with default colors
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the style for the status bar
    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    /// Get the style for the filename in the status bar
    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    pub fn handle_style(&self) -> Style {
        Style::default().fg(self.handle_fg)
    }

    pub fn focused_handle_style(&self) -> Style {
        Style::default()
            .fg(self.focus_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn focus_style(&self) -> Style {
        Style::default().bg(self.focus_bg)
    }

    pub fn editing_style(&self) -> Style {
        Style::default().bg(self.editing_bg)
    }

    pub fn placeholder_style(&self) -> Style {
        Style::default()
            .fg(self.placeholder_fg)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn drag_source_style(&self) -> Style {
        Style::default()
            .fg(self.drag_source_fg)
            .add_modifier(Modifier::DIM)
    }

    pub fn indicator_style(&self) -> Style {
        Style::default()
            .fg(self.indicator_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn ghost_style(&self) -> Style {
        Style::default().fg(self.ghost_fg).bg(self.ghost_bg)
    }

    pub fn cell_cursor_style(&self) -> Style {
        Style::default()
            .fg(self.cell_cursor_fg)
            .bg(self.cell_cursor_bg)
    }

    /// Caret drawn after the text being typed
    pub fn caret_style(&self) -> Style {
        Style::default().fg(self.focus_fg).add_modifier(Modifier::SLOW_BLINK)
    }

    pub fn rule_style(&self) -> Style {
        Style::default().fg(self.rule_fg)
    }

    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code_fg)
    }

    /// Get the style for the menu/popup
    pub fn menu_style(&self) -> Style {
        Style::default().fg(self.menu_fg).bg(self.menu_bg)
    }

    /// Get the style for a disabled menu item
    pub fn menu_disabled_style(&self) -> Style {
        Style::default().fg(self.menu_disabled_fg)
    }

    /// Get the style for a selected menu entry
    pub fn menu_selected_style(&self) -> Style {
        Style::default()
            .fg(self.menu_selected_fg)
            .bg(self.menu_selected_bg)
    }

    /// Get the style for a disabled selected menu entry
    pub fn menu_selected_disabled_style(&self) -> Style {
        Style::default()
            .fg(self.menu_selected_disabled_fg)
            .bg(self.menu_selected_bg)
    }

    pub fn dialog_style(&self) -> Style {
        Style::default().fg(self.dialog_fg).bg(self.dialog_bg)
    }

    pub fn undo_style(&self) -> Style {
        Style::default().fg(self.undo_fg).bg(self.undo_bg)
    }

    /// Style for a banner painted in its named color.
    pub fn banner_style(&self, color: &str) -> Style {
        let bg = banner_color(color);
        let fg = match bg {
            Color::Yellow | Color::Cyan => Color::Black,
            _ => Color::White,
        };
        Style::default().fg(fg).bg(bg)
    }
}

/// Terminal color for a banner color name. Unknown names map to blue.
pub fn banner_color(name: &str) -> Color {
    match name.trim().to_ascii_lowercase().as_str() {
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "orange" => Color::LightRed,
        "purple" | "magenta" => Color::Magenta,
        "cyan" | "teal" => Color::Cyan,
        "gray" | "grey" => Color::DarkGray,
        _ => Color::Blue,
    }
}
