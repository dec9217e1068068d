use pretty_assertions::assert_eq;

use super::*;
use crate::block::BlockData;
use crate::drag::drop_position;
use crate::store::{BlockStore, InsertPosition, MovePosition};

fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

fn store_with(texts: &[&str]) -> (BlockStore, Vec<BlockId>) {
    let mut store = BlockStore::new();
    let ids = texts
        .iter()
        .map(|text| store.insert_block(BlockData::text(*text), InsertPosition::End).id)
        .collect();
    (store, ids)
}

fn render(store: &BlockStore, view: &RenderView, width: usize) -> RenderResult {
    render_blocks(store.blocks(), view, &Theme::default(), width)
}

#[test]
fn blocks_are_separated_by_blank_rows() {
    let (store, ids) = store_with(&["alpha", "beta"]);
    let result = render(&store, &RenderView::default(), 40);

    let texts: Vec<String> = result.lines.iter().map(line_text).collect();
    assert_eq!(texts, ["", "⠿ alpha", "", "⠿ beta", ""]);
    assert_eq!(result.total_lines, 5);

    let areas = result.layout.areas();
    assert_eq!(areas[0].id, ids[0]);
    assert_eq!(areas[0].area, Rect::new(0, 1, 40, 2));
    assert_eq!(areas[0].handle, Rect::new(0, 1, 2, 1));
    assert_eq!(areas[1].area, Rect::new(0, 3, 40, 2));
}

#[test]
fn long_text_wraps_under_the_handle() {
    let (store, _) = store_with(&["one two three four five"]);
    let result = render(&store, &RenderView::default(), 12);

    let texts: Vec<String> = result.lines.iter().map(line_text).collect();
    assert_eq!(texts, ["", "⠿ one two", "  three four", "  five", ""]);
    assert_eq!(result.layout.areas()[0].area.height, 4);
}

#[test]
fn drop_rows_land_on_blank_lines() {
    let (store, ids) = store_with(&["a", "b"]);
    let layout = render(&store, &RenderView::default(), 20).layout;
    let b = layout.area_of(ids[1]).expect("area").area;

    assert_eq!(drop_position(b, 3), MovePosition::Before);
    assert_eq!(drop_position(b, 4), MovePosition::After);

    let view = RenderView {
        indicator: Some(DropIndicator {
            target: ids[1],
            position: MovePosition::Before,
            row: 2,
        }),
        dragging: Some(ids[0]),
        ..RenderView::default()
    };
    let result = render(&store, &view, 20);
    assert!(line_text(&result.lines[2]).contains('━'));
    assert_eq!(line_text(&result.lines[1]), "⠿ a");
}

#[test]
fn empty_blocks_show_placeholders_until_edited() {
    let (store, ids) = store_with(&[""]);
    let result = render(&store, &RenderView::default(), 30);
    assert_eq!(line_text(&result.lines[1]), "⠿ Empty text");

    let view = RenderView {
        focus: FocusState::Editing {
            id: ids[0],
            entry: EditEntry::RichText,
        },
        ..RenderView::default()
    };
    let result = render(&store, &view, 30);
    assert_eq!(line_text(&result.lines[1]), format!("{HANDLE}{CARET}"));
}

#[test]
fn edited_table_cell_is_highlighted() {
    let mut store = BlockStore::new();
    let table = TableContent::from_rows(&[vec!["Drug", "Dose"], vec!["Heparin", "5000"]]).with_headers(true);
    let id = store.insert_block(BlockData::table(table), InsertPosition::End).id;
    let theme = Theme::default();
    let view = RenderView {
        focus: FocusState::Editing {
            id,
            entry: EditEntry::TableCell(CellPosition { row: 1, column: 1 }),
        },
        ..RenderView::default()
    };
    let result = render_blocks(store.blocks(), &view, &theme, 60);

    let texts: Vec<String> = result.lines.iter().map(line_text).collect();
    assert_eq!(texts[1], "⠿ ┌─────────┬──────┐");
    assert_eq!(texts[2], "  │ Drug    │ Dose │");
    assert_eq!(texts[3], "  ├─────────┼──────┤");
    assert_eq!(texts[4], "  │ Heparin │ 5000 │");

    let cell = result.lines[4]
        .spans
        .iter()
        .find(|span| span.content.as_ref() == " 5000 ")
        .expect("cell span");
    assert_eq!(cell.style.bg, Some(theme.cell_cursor_bg));
}

#[test]
fn titles_are_underlined() {
    let mut store = BlockStore::new();
    store.insert_block(
        BlockData::from_json(BlockKind::Title, serde_json::json!({ "text": "Plan" })),
        InsertPosition::End,
    );
    let result = render(&store, &RenderView::default(), 30);
    assert_eq!(line_text(&result.lines[1]), "⠿ Plan");
    assert_eq!(line_text(&result.lines[2]), "  ════");
}

#[test]
fn wrap_text_respects_display_width() {
    assert_eq!(wrap_text("日本語テキスト", 6), ["日本語", "テキス", "ト"]);
    assert_eq!(wrap_text("a\nb", 10), ["a", "b"]);
    assert_eq!(wrap_text("", 10), [""]);
}

#[test]
fn file_sizes_are_human_readable() {
    assert_eq!(human_size(512), "512 B");
    assert_eq!(human_size(2048), "2.0 KB");
}
