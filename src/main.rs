use std::{
    cell::{Cell, RefCell},
    fs::File,
    io,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{
        Block as Panel, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Wrap,
    },
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use blockwise::{
    BlockContent, BlockData, BlockKind, BlockUpdate, BlockwiseError, EditingSession,
    EditorCommand, EditorConfig, FocusState, InsertPosition, StoreEventKind,
    block::{Block, TableContent},
    deletion::NoticeKind,
    navigation::{EditEntry, MenuEntry},
    persistence::{load_blocks, save_blocks},
    render::{RenderResult, RenderView, render_blocks},
    theme::Theme,
};

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);

/// Terminal editor for block documents stored as JSON.
#[derive(Parser, Debug)]
#[command(name = "blockwise")]
#[command(about = "Edit a block document in the terminal")]
struct Args {
    /// Document to open; created on first save
    file: PathBuf,

    /// Write logs to this file (RUST_LOG filters, default blockwise=info)
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log.as_deref())?;
    run(args.file)
}

/// Logging goes to a file only; the terminal belongs to the editor.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blockwise=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(path: PathBuf) -> Result<()> {
    let (blocks, initial_status) = load_document(&path)?;
    let mut app = App::new(blocks, path, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn load_document(path: &Path) -> Result<(Vec<Block>, Option<String>)> {
    if !path.exists() {
        return Ok((Vec::new(), Some("New document".to_string())));
    }
    match load_blocks(path) {
        Ok(blocks) => Ok((blocks, None)),
        Err(BlockwiseError::Json(err)) => {
            let message = format!("Parse error: {err}. Starting with empty document.");
            Ok((Vec::new(), Some(message)))
        }
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    while !app.should_quit {
        terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw frame")?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

enum TextEdit {
    Insert(char),
    Backspace,
}

struct App {
    session: EditingSession,
    theme: Theme,
    file_path: PathBuf,
    scroll_top: usize,
    last_view_height: usize,
    text_area: Rect,
    should_quit: bool,
    dirty: Rc<Cell<bool>>,
    command_status: Rc<RefCell<Option<String>>>,
    status_message: Option<(String, Instant)>,
    last_focus: FocusState,
}

impl App {
    fn new(blocks: Vec<Block>, path: PathBuf, initial_status: Option<String>) -> Self {
        let mut session = EditingSession::with_blocks(blocks, EditorConfig::default());

        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);
        session.store_mut().subscribe(move |event| {
            if event.kind == StoreEventKind::Change {
                flag.set(true);
            }
        });

        let command_status = Rc::new(RefCell::new(None));
        let status = Rc::clone(&command_status);
        session.on_command(move |command| {
            if let EditorCommand::BlocksReordered { block_id, .. } = command {
                debug!(block_id = %block_id, "list reordered");
                *status.borrow_mut() = Some("Block moved".to_string());
            }
        });

        Self {
            session,
            theme: Theme::default(),
            file_path: path,
            scroll_top: 0,
            last_view_height: 1,
            text_area: Rect::default(),
            should_quit: false,
            dirty,
            command_status,
            status_message: initial_status.map(|msg| (msg, Instant::now())),
            last_focus: FocusState::Idle,
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let status_height = if area.height > 1 { 2 } else { 1 };
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(status_height)])
            .split(area);

        let editor_area = vertical[0];
        let status_area = vertical[1];

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(editor_area);
        let text_area = horizontal[0];
        let scrollbar_area = horizontal[1];
        self.text_area = text_area;

        let view = RenderView {
            focus: self.session.focus_state(),
            dragging: self.session.drag().source(),
            indicator: self.session.drag().indicator(),
        };
        let render = render_blocks(
            self.session.store().blocks(),
            &view,
            &self.theme,
            usize::from(text_area.width.max(1)),
        );

        let viewport_height = usize::from(text_area.height);
        self.last_view_height = viewport_height.max(1);
        self.adjust_scroll(&render, view.focus, viewport_height);

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .style(Style::default().bg(self.theme.background))
            .scroll((to_u16(self.scroll_top), 0));
        frame.render_widget(paragraph, text_area);

        let mut scrollbar_state = ScrollbarState::new(render.total_lines).position(self.scroll_top);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);

        self.session.set_layout(render.layout);

        self.render_ghost(frame);

        let status_text = self.status_line();
        let status_widget = Paragraph::new(Line::from(Span::styled(
            status_text,
            self.theme.status_bar_style(),
        )))
        .block(Panel::default().borders(Borders::TOP));
        frame.render_widget(status_widget, status_area);

        if self.session.navigation().context_menu().is_some() {
            self.render_context_menu(frame);
        }
        if let Some(prompt) = self.session.confirmation_prompt() {
            self.render_confirmation(frame, area, &prompt);
        }
    }

    fn to_screen(&self, column: u16, row: u16) -> Option<(u16, u16)> {
        let row = usize::from(row).checked_sub(self.scroll_top)?;
        if row >= usize::from(self.text_area.height) {
            return None;
        }
        Some((self.text_area.x + column, self.text_area.y + to_u16(row)))
    }

    fn to_document(&self, column: u16, row: u16) -> (u16, u16) {
        let area = self.text_area;
        let column = column.clamp(area.x, area.right().saturating_sub(1)) - area.x;
        let row = row.clamp(area.y, area.bottom().saturating_sub(1)) - area.y;
        (column, to_u16(usize::from(row) + self.scroll_top))
    }

    fn render_ghost(&self, frame: &mut Frame) {
        let Some(ghost) = self.session.drag().ghost() else {
            return;
        };
        let Some((x, y)) = self.to_screen(ghost.column, ghost.row) else {
            return;
        };
        let label: String = ghost.label.chars().take(30).collect();
        let width = to_u16(label.chars().count() + 4).min(self.text_area.right().saturating_sub(x));
        if width == 0 {
            return;
        }
        let ghost_area = Rect::new(x, y, width, 1);
        frame.render_widget(Clear, ghost_area);
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(format!("⠿ {label} "), self.theme.ghost_style()))),
            ghost_area,
        );
    }

    fn render_context_menu(&mut self, frame: &mut Frame) {
        let area = self.text_area;
        let Some(menu) = self.session.navigation().context_menu() else {
            return;
        };
        if area.width < 3 || area.height < 3 {
            return;
        }

        let mut max_label_width = 0usize;
        let mut max_section_width = 0usize;
        for entry in menu.entries() {
            match entry {
                MenuEntry::Item(item) => {
                    max_label_width = max_label_width.max(item.label.chars().count());
                }
                MenuEntry::Section(title) => {
                    max_section_width = max_section_width.max(title.chars().count());
                }
                MenuEntry::Separator => {}
            }
        }

        let shortcut_width = 1;
        let item_width = max_label_width + 2 + shortcut_width;
        let content_width = to_u16(item_width.max(max_section_width));
        let width = (content_width + 4).min(area.width).max(10.min(area.width));
        let height = (to_u16(menu.entries().len()) + 2).min(area.height).max(3.min(area.height));

        let (anchor_column, anchor_row) = menu.anchor();
        let (x, y) = self
            .to_screen(anchor_column, anchor_row)
            .unwrap_or((area.x, area.y));
        let x = x.min(area.right().saturating_sub(width));
        let y = y.min(area.bottom().saturating_sub(height));
        let popup_area = Rect::new(x, y, width, height);

        frame.render_widget(Clear, popup_area);

        let separator_width = usize::from(popup_area.width.saturating_sub(4).max(4));
        let popup_style = self.theme.menu_style();

        let mut items = Vec::new();
        for entry in menu.entries() {
            match entry {
                MenuEntry::Section(title) => {
                    items.push(ListItem::new(Line::from(Span::styled(
                        *title,
                        popup_style.add_modifier(Modifier::BOLD),
                    ))));
                }
                MenuEntry::Separator => {
                    items.push(ListItem::new(Line::from(Span::styled(
                        "─".repeat(separator_width),
                        self.theme.menu_disabled_style(),
                    ))));
                }
                MenuEntry::Item(item) => {
                    let shortcut = item.shortcut.map_or(' ', |shortcut| shortcut.key);
                    let content = format!(
                        "{label:<label_width$}  {shortcut:>shortcut_width$}",
                        label = item.label,
                        label_width = max_label_width,
                    );
                    let style = if item.is_enabled() {
                        Style::default()
                    } else {
                        self.theme.menu_disabled_style()
                    };
                    items.push(ListItem::new(Line::from(Span::styled(content, style))));
                }
            }
        }

        let selected_enabled = matches!(
            menu.entries().get(menu.selected_index()),
            Some(MenuEntry::Item(item)) if item.is_enabled()
        );
        let mut state = ListState::default();
        state.select(Some(menu.selected_index()));

        let list = List::new(items)
            .highlight_style(if selected_enabled {
                self.theme.menu_selected_style()
            } else {
                self.theme.menu_selected_disabled_style()
            })
            .style(popup_style)
            .block(
                Panel::default()
                    .title("Block")
                    .borders(Borders::ALL)
                    .style(popup_style)
                    .border_style(self.theme.menu_disabled_style()),
            );

        frame.render_stateful_widget(list, popup_area, &mut state);

        // Clicks arrive in document coordinates.
        let (doc_x, doc_y) = self.to_document(popup_area.x, popup_area.y);
        if let Some(menu) = self.session.navigation_mut().context_menu_mut() {
            menu.set_area(Rect::new(doc_x, doc_y, popup_area.width, popup_area.height));
        }
    }

    fn render_confirmation(&self, frame: &mut Frame, area: Rect, prompt: &str) {
        let width = to_u16(prompt.chars().count() + 6)
            .max(30)
            .min(area.width);
        let height = 5.min(area.height);
        let popup_area = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, popup_area);
        let body = Text::from(vec![
            Line::from(prompt.to_string()),
            Line::from(""),
            Line::from("[y] Delete   [n] Cancel"),
        ]);
        let dialog = Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .style(self.theme.dialog_style())
            .block(
                Panel::default()
                    .title("Confirm")
                    .borders(Borders::ALL)
                    .style(self.theme.dialog_style()),
            );
        frame.render_widget(dialog, popup_area);
    }

    fn status_line(&mut self) -> String {
        self.prune_status_message();
        let now = Instant::now();
        if let Some(notice) = self.session.notice(now) {
            return match notice.kind {
                NoticeKind::Undo => format!("{} | Ctrl-Z undo", notice.message),
                NoticeKind::Info => notice.message.clone(),
            };
        }
        if let Some((message, _)) = &self.status_message {
            return message.clone();
        }

        let store = self.session.store();
        let focus = match self.session.focus_state() {
            FocusState::Idle => "no block".to_string(),
            FocusState::Focused(id) => describe_block(store.get_block(id), store.index_of(id)),
            FocusState::Editing { id, .. } => format!(
                "editing {}",
                describe_block(store.get_block(id), store.index_of(id))
            ),
        };
        let marker = if self.dirty.get() { "*" } else { "" };
        format!(
            "{}{} | {} blocks | {} | Ctrl-N text | Ctrl-S save | Ctrl-Q quit",
            self.file_path.display(),
            marker,
            store.len(),
            focus,
        )
    }

    fn prune_status_message(&mut self) {
        if let Some(message) = self.command_status.borrow_mut().take() {
            self.status_message = Some((message, Instant::now()));
        }
        if let Some((_, instant)) = &self.status_message {
            if instant.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    /// Keep a newly focused block in view.
    fn adjust_scroll(&mut self, render: &RenderResult, focus: FocusState, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if focus.block_id() != self.last_focus.block_id() {
            if let Some(area) = focus.block_id().and_then(|id| render.layout.area_of(id)) {
                let top = usize::from(area.area.y);
                let bottom = usize::from(area.area.bottom());
                if top < self.scroll_top {
                    self.scroll_top = top;
                } else if bottom > self.scroll_top + viewport {
                    self.scroll_top = bottom.saturating_sub(viewport);
                }
            }
        }
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        let previous = self.session.focus_state();
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key)?,
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
        self.discard_abandoned_block(previous);
        self.last_focus = previous;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        let now = Instant::now();
        if self.session.deletion().pending().is_some() {
            self.session.handle_key(key, now);
            return Ok(());
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let menu_open = self.session.navigation().context_menu().is_some();
        if ctrl && !menu_open {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    return Ok(());
                }
                KeyCode::Char('s') => return self.save(),
                KeyCode::Char('n') => {
                    self.session
                        .insert_block(BlockData::text(""), InsertPosition::After, true);
                    return Ok(());
                }
                KeyCode::Char('b') => {
                    self.session
                        .insert_block(BlockData::banner(""), InsertPosition::After, true);
                    return Ok(());
                }
                KeyCode::Char('l') => {
                    self.session.insert_block(
                        BlockData::of(BlockKind::Divider),
                        InsertPosition::After,
                        false,
                    );
                    return Ok(());
                }
                KeyCode::Char('t') => {
                    let table = TableContent::blank(3, 3).with_headers(true);
                    self.session
                        .insert_block(BlockData::table(table), InsertPosition::After, true);
                    return Ok(());
                }
                KeyCode::Char('k') => {
                    self.session.request_clear_all(now);
                    return Ok(());
                }
                KeyCode::Char('z') | KeyCode::Char('Z') if shift => {
                    self.session.undo_clear_all(now);
                    return Ok(());
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::PageUp if !menu_open => {
                self.scroll_top = self.scroll_top.saturating_sub(self.last_view_height);
                return Ok(());
            }
            KeyCode::PageDown if !menu_open => {
                self.scroll_top += self.last_view_height;
                return Ok(());
            }
            _ => {}
        }

        if self.session.handle_key(key, now) {
            return Ok(());
        }

        let plain = !ctrl && !key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Char(ch) if plain => self.edit_text(TextEdit::Insert(ch)),
            KeyCode::Enter if plain => self.edit_text(TextEdit::Insert('\n')),
            KeyCode::Backspace => self.edit_text(TextEdit::Backspace),
            _ => {}
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let now = Instant::now();
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.scroll_top = self.scroll_top.saturating_sub(3);
                return;
            }
            MouseEventKind::ScrollDown => {
                self.scroll_top += 3;
                return;
            }
            _ => {}
        }

        let inside = self
            .text_area
            .contains(Position::new(mouse.column, mouse.row));
        if !inside {
            self.session.handle_mouse_outside(mouse, now);
            return;
        }

        let (column, row) = self.to_document(mouse.column, mouse.row);
        self.session.handle_mouse(
            MouseEvent {
                column,
                row,
                ..mouse
            },
            now,
        );
    }

    /// Route a keystroke to the content surface of the block being edited.
    fn edit_text(&mut self, edit: TextEdit) {
        let FocusState::Editing { id, entry } = self.session.focus_state() else {
            return;
        };
        let Some(block) = self.session.store().get_block(id) else {
            return;
        };
        let mut content = block.content.clone();
        let changed = match (&mut content, entry) {
            (BlockContent::Text(text), EditEntry::RichText) => apply_edit(text, &edit, true),
            (BlockContent::Banner(banner), EditEntry::InlineText) => {
                apply_edit(&mut banner.text, &edit, false)
            }
            (BlockContent::Table(table), EditEntry::TableCell(cell)) => table
                .cell_mut(cell.row, cell.column)
                .is_some_and(|text| apply_edit(text, &edit, false)),
            _ => false,
        };
        if changed {
            self.session
                .store_mut()
                .update_block(id, BlockUpdate::content(content));
        }
    }

    /// Drop an empty text block the user just stopped editing.
    fn discard_abandoned_block(&mut self, previous: FocusState) {
        let FocusState::Editing { id, .. } = previous else {
            return;
        };
        if self.session.focus_state() == previous {
            return;
        }
        let store = self.session.store();
        let abandoned = store
            .get_block(id)
            .is_some_and(|block| block.kind == BlockKind::Text && store.is_block_empty(block));
        if abandoned {
            info!(block_id = %id, "discarding empty block");
            self.session.store_mut().remove_block(id);
        }
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }

    fn save(&mut self) -> Result<()> {
        let blocks = self.session.store().export_blocks();
        save_blocks(&self.file_path, &blocks)
            .with_context(|| format!("failed to write {}", self.file_path.display()))?;

        self.dirty.set(false);
        self.status_message = Some(("Saved".to_string(), Instant::now()));
        Ok(())
    }
}

/// Apply one keystroke to `text`. Markup text stores `<`, `>` and `&` as
/// entities so they survive tag stripping.
fn apply_edit(text: &mut String, edit: &TextEdit, markup: bool) -> bool {
    match edit {
        TextEdit::Insert(ch) => {
            match (markup, ch) {
                (true, '<') => text.push_str("&lt;"),
                (true, '>') => text.push_str("&gt;"),
                (true, '&') => text.push_str("&amp;"),
                _ => text.push(*ch),
            }
            true
        }
        TextEdit::Backspace => {
            if markup {
                for entity in ["&lt;", "&gt;", "&amp;", "&nbsp;", "&quot;"] {
                    if text.ends_with(entity) {
                        text.truncate(text.len() - entity.len());
                        return true;
                    }
                }
            }
            text.pop().is_some()
        }
    }
}

fn describe_block(block: Option<&Block>, index: Option<usize>) -> String {
    match (block, index) {
        (Some(block), Some(index)) => format!("{} block {}", block.kind.label(), index + 1),
        _ => "no block".to_string(),
    }
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
