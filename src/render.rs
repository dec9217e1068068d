//! Terminal content renderer.
//!
//! Renders a block list into styled lines and reports where each block
//! landed so input can be hit-tested against the same geometry. Every block
//! ends with a blank row and the document starts with one; the drop indicator
//! is drawn over those blank rows.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::block::{
    BannerContent, Block, BlockContent, BlockId, BlockKind, CodeContent, EmbedContent, FileContent,
    ImageContent, ListContent, TableContent, strip_tags,
};
use crate::drag::DropIndicator;
use crate::layout::{BlockArea, BlockLayout};
use crate::navigation::{CellPosition, EditEntry, FocusState};
use crate::theme::{Theme, banner_color};

pub const HANDLE: &str = "⠿ ";
const GUTTER_WIDTH: usize = 2;
const CARET: &str = "▏";

/// Controller state the renderer reacts to.
#[derive(Clone, Copy, Debug)]
pub struct RenderView {
    pub focus: FocusState,
    pub dragging: Option<BlockId>,
    pub indicator: Option<DropIndicator>,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            focus: FocusState::Idle,
            dragging: None,
            indicator: None,
        }
    }
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub layout: BlockLayout,
    pub total_lines: usize,
}

pub fn render_blocks(blocks: &[Block], view: &RenderView, theme: &Theme, width: usize) -> RenderResult {
    let mut renderer = Renderer::new(width.max(GUTTER_WIDTH + 1), view, theme);
    renderer.push_blank_line();
    for block in blocks {
        renderer.render_block(block);
    }
    renderer.finish()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BlockMode {
    Plain,
    Focused,
    Editing(EditEntry),
    Dragging,
}

struct Renderer<'a> {
    width: usize,
    view: &'a RenderView,
    theme: &'a Theme,
    lines: Vec<Line<'static>>,
    layout: BlockLayout,
}

impl<'a> Renderer<'a> {
    fn new(width: usize, view: &'a RenderView, theme: &'a Theme) -> Self {
        Self {
            width,
            view,
            theme,
            lines: Vec::new(),
            layout: BlockLayout::default(),
        }
    }

    fn content_width(&self) -> usize {
        self.width - GUTTER_WIDTH
    }

    fn mode_for(&self, id: BlockId) -> BlockMode {
        if self.view.dragging == Some(id) {
            return BlockMode::Dragging;
        }
        match self.view.focus {
            FocusState::Editing { id: editing, entry } if editing == id => BlockMode::Editing(entry),
            FocusState::Focused(focused) if focused == id => BlockMode::Focused,
            _ => BlockMode::Plain,
        }
    }

    fn render_block(&mut self, block: &Block) {
        let mode = self.mode_for(block.id);
        let mut body = match (&block.kind, &block.content) {
            (_, BlockContent::Text(text)) => self.render_text(text),
            (kind, BlockContent::Banner(banner)) => self.render_banner(*kind, banner),
            (_, BlockContent::Table(table)) => self.render_table(table, mode),
            (_, BlockContent::Image(image)) => self.render_image(image),
            (_, BlockContent::Code(code)) => self.render_code(code),
            (_, BlockContent::List(list)) => self.render_list(list),
            (_, BlockContent::Spacer(spacer)) => vec![Line::default(); usize::from(spacer.height.max(1))],
            (_, BlockContent::Embed(embed)) => self.render_embed(embed),
            (_, BlockContent::File(file)) => self.render_file(file),
            (BlockKind::Divider, BlockContent::Empty) => {
                vec![Line::from(Span::styled(
                    "─".repeat(self.content_width()),
                    self.theme.rule_style(),
                ))]
            }
            (_, BlockContent::Empty) => Vec::new(),
        };

        let editing = matches!(mode, BlockMode::Editing(_));
        if block.is_empty() && block.kind != BlockKind::Table && !editing {
            body = vec![self.placeholder(block.kind)];
        }
        if body.is_empty() {
            body.push(Line::default());
        }
        if let BlockMode::Editing(EditEntry::RichText | EditEntry::InlineText) = mode {
            let caret_line = if block.kind == BlockKind::Title {
                body.len().saturating_sub(2)
            } else {
                body.len() - 1
            };
            if let Some(line) = body.get_mut(caret_line) {
                line.spans.push(Span::styled(CARET, self.theme.caret_style()));
            }
        }

        let start = self.lines.len();
        for (index, mut line) in body.into_iter().enumerate() {
            let gutter = if index == 0 {
                Span::styled(HANDLE, self.handle_style(mode))
            } else {
                Span::raw(" ".repeat(GUTTER_WIDTH))
            };
            apply_mode(&mut line, mode, self.theme);
            line.spans.insert(0, gutter);
            self.lines.push(line);
        }
        self.push_blank_line();

        let y = to_u16(start);
        let height = to_u16(self.lines.len() - start);
        let width = to_u16(self.width);
        self.layout.push(BlockArea {
            id: block.id,
            area: Rect::new(0, y, width, height),
            handle: Rect::new(0, y, to_u16(GUTTER_WIDTH), 1),
        });
    }

    fn handle_style(&self, mode: BlockMode) -> Style {
        match mode {
            BlockMode::Focused | BlockMode::Editing(_) => self.theme.focused_handle_style(),
            BlockMode::Dragging => self.theme.drag_source_style(),
            BlockMode::Plain => self.theme.handle_style(),
        }
    }

    fn placeholder(&self, kind: BlockKind) -> Line<'static> {
        let text = match kind {
            BlockKind::Text => "Empty text".to_string(),
            BlockKind::Image => "Image without a source".to_string(),
            other => format!("Empty {}", other.label().to_lowercase()),
        };
        Line::from(Span::styled(text, self.theme.placeholder_style()))
    }

    fn render_text(&self, text: &str) -> Vec<Line<'static>> {
        wrap_text(&strip_tags(text), self.content_width())
            .into_iter()
            .map(Line::from)
            .collect()
    }

    fn render_banner(&self, kind: BlockKind, banner: &BannerContent) -> Vec<Line<'static>> {
        let text = strip_tags(&banner.text);
        if kind == BlockKind::Title || banner.is_title {
            let mut lines: Vec<Line<'static>> = wrap_text(&text, self.content_width())
                .into_iter()
                .map(|line| Line::from(Span::styled(line, Style::default().add_modifier(Modifier::BOLD))))
                .collect();
            let underline = lines.iter().map(line_width).max().unwrap_or(0).max(1);
            lines.push(Line::from(Span::styled("═".repeat(underline), self.theme.rule_style())));
            return lines;
        }
        let style = self.theme.banner_style(&banner.color);
        if kind == BlockKind::Callout || banner.is_callout {
            let accent = Style::default().fg(banner_color(&banner.color));
            let inner = self.content_width().saturating_sub(2).max(1);
            return wrap_text(&text, inner)
                .into_iter()
                .map(|line| {
                    Line::from(vec![
                        Span::styled("┃ ", accent),
                        Span::raw(line),
                    ])
                })
                .collect();
        }
        let inner = self.content_width().saturating_sub(2).max(1);
        wrap_text(&text, inner)
            .into_iter()
            .map(|line| {
                let pad = inner.saturating_sub(line.width());
                Line::from(Span::styled(format!(" {line}{} ", " ".repeat(pad)), style))
            })
            .collect()
    }

    fn render_table(&self, table: &TableContent, mode: BlockMode) -> Vec<Line<'static>> {
        if table.data.is_empty() || table.columns == 0 {
            return Vec::new();
        }
        let cursor = match mode {
            BlockMode::Editing(EditEntry::TableCell(cell)) => Some(cell),
            _ => None,
        };
        let widths: Vec<usize> = (0..table.columns)
            .map(|column| {
                table
                    .data
                    .iter()
                    .map(|row| row.get(column).map_or(0, |cell| strip_tags(cell).width()))
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();
        let rule = self.theme.rule_style();
        let border = |left: &str, fill: &str, joint: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| fill.repeat(w + 2)).collect();
            Line::from(Span::styled(
                format!("{left}{}{right}", segments.join(joint)),
                rule,
            ))
        };

        let mut lines = vec![border("┌", "─", "┬", "┐")];
        for (row_index, row) in table.data.iter().enumerate() {
            let mut spans = vec![Span::styled("│", rule)];
            for (column, width) in widths.iter().enumerate() {
                let text = row.get(column).map(|cell| strip_tags(cell)).unwrap_or_default();
                let pad = width.saturating_sub(text.width());
                let mut style = Style::default();
                if table.has_headers && row_index == 0 {
                    style = style.add_modifier(Modifier::BOLD);
                }
                if cursor == Some(CellPosition { row: row_index, column }) {
                    style = self.theme.cell_cursor_style();
                }
                spans.push(Span::styled(format!(" {text}{} ", " ".repeat(pad)), style));
                spans.push(Span::styled("│", rule));
            }
            lines.push(Line::from(spans));
            if table.has_headers && row_index == 0 && table.data.len() > 1 {
                lines.push(border("├", "─", "┼", "┤"));
            }
        }
        lines.push(border("└", "─", "┴", "┘"));
        lines
    }

    fn render_image(&self, image: &ImageContent) -> Vec<Line<'static>> {
        if image.src.trim().is_empty() {
            return Vec::new();
        }
        let mut label = format!("[image] {}", image.src);
        if !image.alt.trim().is_empty() {
            label.push_str(&format!(" ({})", image.alt.trim()));
        }
        let mut lines: Vec<Line<'static>> = wrap_text(&label, self.content_width())
            .into_iter()
            .map(|line| Line::from(Span::styled(line, Style::default().add_modifier(Modifier::BOLD))))
            .collect();
        if !image.caption.trim().is_empty() {
            lines.extend(
                wrap_text(&strip_tags(&image.caption), self.content_width())
                    .into_iter()
                    .map(|line| Line::from(Span::styled(line, Style::default().add_modifier(Modifier::ITALIC)))),
            );
        }
        lines
    }

    fn render_code(&self, code: &CodeContent) -> Vec<Line<'static>> {
        let rule = self.theme.rule_style();
        let mut lines = vec![Line::from(Span::styled(format!("```{}", code.language.trim()), rule))];
        lines.extend(
            code.code
                .lines()
                .map(|line| Line::from(Span::styled(line.to_string(), self.theme.code_style()))),
        );
        lines.push(Line::from(Span::styled("```", rule)));
        lines
    }

    fn render_list(&self, list: &ListContent) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (index, item) in list.items.iter().enumerate() {
            let marker = if list.ordered {
                format!("{}. ", index + 1)
            } else {
                "• ".to_string()
            };
            let marker_width = marker.width();
            let inner = self.content_width().saturating_sub(marker_width).max(1);
            for (line_index, line) in wrap_text(&strip_tags(item), inner).into_iter().enumerate() {
                let prefix = if line_index == 0 {
                    marker.clone()
                } else {
                    " ".repeat(marker_width)
                };
                lines.push(Line::from(vec![Span::raw(prefix), Span::raw(line)]));
            }
        }
        lines
    }

    fn render_embed(&self, embed: &EmbedContent) -> Vec<Line<'static>> {
        if embed.url.trim().is_empty() {
            return Vec::new();
        }
        let title = if embed.title.trim().is_empty() {
            embed.url.clone()
        } else {
            embed.title.clone()
        };
        let mut lines = vec![Line::from(Span::styled(
            format!("[embed] {title}"),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        lines.extend(
            wrap_text(&embed.url, self.content_width())
                .into_iter()
                .map(|line| Line::from(Span::styled(line, Style::default().add_modifier(Modifier::UNDERLINED)))),
        );
        lines
    }

    fn render_file(&self, file: &FileContent) -> Vec<Line<'static>> {
        if file.url.trim().is_empty() && file.name.trim().is_empty() {
            return Vec::new();
        }
        let name = if file.name.trim().is_empty() {
            file.url.as_str()
        } else {
            file.name.as_str()
        };
        vec![Line::from(vec![
            Span::styled("[file] ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(name.to_string()),
            Span::styled(format!(" ({})", human_size(file.size)), self.theme.placeholder_style()),
        ])]
    }

    fn push_blank_line(&mut self) {
        self.lines.push(Line::default());
    }

    fn finish(mut self) -> RenderResult {
        if let Some(indicator) = self.view.indicator {
            if let Some(line) = self.lines.get_mut(usize::from(indicator.row)) {
                *line = Line::from(vec![
                    Span::raw(" ".repeat(GUTTER_WIDTH)),
                    Span::styled("━".repeat(self.width - GUTTER_WIDTH), self.theme.indicator_style()),
                ]);
            }
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            layout: self.layout,
            total_lines,
        }
    }
}

fn apply_mode(line: &mut Line<'static>, mode: BlockMode, theme: &Theme) {
    let overlay = match mode {
        BlockMode::Plain => return,
        BlockMode::Focused => theme.focus_style(),
        BlockMode::Editing(_) => theme.editing_style(),
        BlockMode::Dragging => theme.drag_source_style(),
    };
    for span in &mut line.spans {
        span.style = overlay.patch(span.style);
    }
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// Greedy word wrap by display width. Words wider than `width` are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_width = 0;
        for word in paragraph.split_whitespace() {
            let word_width = word.width();
            if line_width > 0 && line_width + 1 + word_width > width {
                out.push(std::mem::take(&mut line));
                line_width = 0;
            }
            if line_width > 0 {
                line.push(' ');
                line_width += 1;
            }
            if word_width <= width {
                line.push_str(word);
                line_width += word_width;
                continue;
            }
            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if line_width > 0 && line_width + ch_width > width {
                    out.push(std::mem::take(&mut line));
                    line_width = 0;
                }
                line.push(ch);
                line_width += ch_width;
            }
        }
        out.push(line);
    }
    out
}

fn line_width(line: &Line<'_>) -> usize {
    line.spans.iter().map(|span| span.content.as_ref().width()).sum()
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod render_tests;
