use std::{cell::RefCell, rc::Rc};

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::block::{BlockContent, BlockKind, TableContent};

fn store_with(texts: &[&str]) -> (BlockStore, Vec<BlockId>) {
    let mut store = BlockStore::new();
    let ids = texts
        .iter()
        .map(|text| store.insert_block(BlockData::text(*text), InsertPosition::End).id)
        .collect();
    (store, ids)
}

fn texts(store: &BlockStore) -> Vec<String> {
    store.blocks().iter().map(Block::plain_text).collect()
}

fn orders(store: &BlockStore) -> Vec<f64> {
    store.blocks().iter().map(|block| block.order).collect()
}

fn assert_normalized(store: &BlockStore) {
    let expected: Vec<f64> = (1..=store.len()).map(|n| n as f64).collect();
    assert_eq!(orders(store), expected);
}

#[test]
fn banner_inserted_at_end_of_empty_store_gets_default_color() {
    let mut store = BlockStore::new();
    let block = store.insert_block(
        BlockData::from_json(BlockKind::Banner, json!({ "text": "hi" })),
        InsertPosition::End,
    );

    assert_eq!(store.len(), 1);
    assert_eq!(block.order, 1.0);
    let BlockContent::Banner(banner) = &store.blocks()[0].content else {
        panic!("expected banner content");
    };
    assert_eq!(banner.text, "hi");
    assert_eq!(banner.color, "blue");
}

#[test]
fn insert_focuses_new_block() {
    let (store, ids) = store_with(&["a", "b"]);
    assert_eq!(store.focused_id(), Some(ids[1]));
    assert_eq!(store.get_focused_block().map(|b| b.id), Some(ids[1]));
}

#[test]
fn insert_after_focused_block() {
    let (mut store, ids) = store_with(&["a", "b", "c"]);
    store.focus_block(ids[0]);

    store.insert_block(BlockData::text("new"), InsertPosition::After);

    assert_eq!(texts(&store), vec!["a", "new", "b", "c"]);
    assert_normalized(&store);
}

#[test]
fn insert_current_without_focus_appends() {
    let (mut store, _) = store_with(&["a", "b"]);
    store.clear_focus();

    store.insert_block(BlockData::text("new"), InsertPosition::Current);

    assert_eq!(texts(&store), vec!["a", "b", "new"]);
}

#[test]
fn insert_after_explicit_block_wins_over_focus() {
    let (mut store, ids) = store_with(&["a", "b", "c"]);
    store.focus_block(ids[2]);

    store.insert_block(BlockData::text("new"), InsertPosition::AfterBlock(ids[0]));

    assert_eq!(texts(&store), vec!["a", "new", "b", "c"]);
}

#[test]
fn insert_after_missing_block_falls_back_to_focus() {
    let (mut store, ids) = store_with(&["a", "b", "c"]);
    store.focus_block(ids[1]);

    store.insert_block(BlockData::text("new"), InsertPosition::AfterBlock(BlockId::new()));

    assert_eq!(texts(&store), vec!["a", "b", "new", "c"]);
}

#[test]
fn insert_at_order_shifts_collisions_down() {
    let (mut store, _) = store_with(&["a", "b", "c"]);

    store.insert_block(BlockData::text("new"), InsertPosition::At(2.0));

    assert_eq!(texts(&store), vec!["a", "new", "b", "c"]);
    assert_normalized(&store);
}

#[test]
fn orders_stay_normalized_through_mixed_mutations() {
    let (mut store, ids) = store_with(&["a", "b", "c", "d"]);
    assert_normalized(&store);

    store.remove_block(ids[1]);
    assert_normalized(&store);
    store.move_block(ids[3], ids[0], MovePosition::Before);
    assert_normalized(&store);
    store.duplicate_block(ids[2]);
    assert_normalized(&store);
    store.focus_block(ids[0]);
    store.insert_block(BlockData::text("e"), InsertPosition::Current);
    assert_normalized(&store);
    store.copy_block(ids[0]);
    store.paste_block(InsertPosition::End);
    assert_normalized(&store);
    store.move_block_down(ids[3]);
    assert_normalized(&store);

    assert_eq!(texts(&store), vec!["a", "d", "e", "c", "c", "a"]);
}

#[test]
fn update_merges_and_stamps() {
    let (mut store, ids) = store_with(&["a"]);
    let before = store.get_block(ids[0]).cloned().unwrap();

    assert!(store.update_block(ids[0], BlockUpdate::content(BlockContent::Text("b".into()))));

    let after = store.get_block(ids[0]).unwrap();
    assert_eq!(after.plain_text(), "b");
    assert_eq!(after.id, before.id);
    assert_eq!(after.order, before.order);
    assert!(after.updated_at >= before.updated_at);
}

#[test]
fn update_unknown_id_is_noop() {
    let (mut store, _) = store_with(&["a"]);
    assert!(!store.update_block(BlockId::new(), BlockUpdate::kind(BlockKind::Code)));
    assert_eq!(texts(&store), vec!["a"]);
}

#[test]
fn update_kind_reshapes_content() {
    let (mut store, ids) = store_with(&["hello"]);
    store.update_block(ids[0], BlockUpdate::kind(BlockKind::Callout));

    let block = store.get_block(ids[0]).unwrap();
    let BlockContent::Banner(banner) = &block.content else {
        panic!("expected banner content");
    };
    assert_eq!(banner.text, "hello");
    assert!(banner.is_callout);
}

#[test]
fn changing_kind_within_banner_family_resets_flags() {
    let mut store = BlockStore::new();
    let id = store
        .insert_block(
            BlockData::from_json(BlockKind::Title, json!({ "text": "Heading" })),
            InsertPosition::End,
        )
        .id;

    let banner_flags = |store: &BlockStore| match &store.get_block(id).unwrap().content {
        BlockContent::Banner(banner) => (banner.text.clone(), banner.is_title, banner.is_callout),
        other => panic!("expected banner content, got {other:?}"),
    };
    assert_eq!(banner_flags(&store), ("Heading".to_string(), true, false));

    store.update_block(id, BlockUpdate::kind(BlockKind::Banner));
    assert_eq!(banner_flags(&store), ("Heading".to_string(), false, false));

    store.update_block(id, BlockUpdate::kind(BlockKind::Callout));
    assert_eq!(banner_flags(&store), ("Heading".to_string(), false, true));

    store.update_block(id, BlockUpdate::kind(BlockKind::Banner));
    assert_eq!(banner_flags(&store), ("Heading".to_string(), false, false));
}

#[test]
fn content_update_keeps_explicit_flags_when_kind_is_unchanged() {
    let mut store = BlockStore::new();
    let id = store
        .insert_block(
            BlockData::from_json(BlockKind::Banner, json!({ "text": "Note", "isTitle": true })),
            InsertPosition::End,
        )
        .id;

    let content = store.get_block(id).unwrap().content.clone();
    store.update_block(id, BlockUpdate::content(content));
    let BlockContent::Banner(banner) = &store.get_block(id).unwrap().content else {
        panic!("expected banner content");
    };
    assert!(banner.is_title);
}

#[test]
fn focus_generation_counts_focus_changes() {
    let (mut store, ids) = store_with(&["a", "b"]);
    let start = store.focus_generation();

    store.focus_block(ids[1]);
    assert_eq!(store.focus_generation(), start);

    store.focus_block(ids[0]);
    store.clear_focus();
    assert_eq!(store.focus_generation(), start + 2);
}

#[test]
fn removing_focused_block_focuses_block_at_same_index() {
    let (mut store, ids) = store_with(&["a", "b", "c"]);
    store.focus_block(ids[1]);

    let removed = store.remove_block(ids[1]).unwrap();

    assert_eq!(removed.order, 2.0);
    assert_eq!(store.focused_id(), Some(ids[2]));
}

#[test]
fn removing_focused_last_block_focuses_previous() {
    let (mut store, ids) = store_with(&["a", "b", "c"]);
    store.remove_block(ids[2]);
    assert_eq!(store.focused_id(), Some(ids[1]));
}

#[test]
fn removing_only_block_leaves_no_focus() {
    let (mut store, ids) = store_with(&["a"]);
    store.remove_block(ids[0]);
    assert_eq!(store.focused_id(), None);
    assert!(store.is_empty());
}

#[test]
fn removing_unfocused_block_keeps_focus() {
    let (mut store, ids) = store_with(&["a", "b", "c"]);
    store.focus_block(ids[2]);
    store.remove_block(ids[0]);
    assert_eq!(store.focused_id(), Some(ids[2]));
}

#[test]
fn remove_unknown_returns_none() {
    let (mut store, _) = store_with(&["a"]);
    assert!(store.remove_block(BlockId::new()).is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn move_before_and_after_target() {
    let (mut store, ids) = store_with(&["a", "b", "c"]);

    assert!(store.move_block(ids[2], ids[0], MovePosition::Before));
    assert_eq!(texts(&store), vec!["c", "a", "b"]);

    assert!(store.move_block(ids[2], ids[1], MovePosition::After));
    assert_eq!(texts(&store), vec!["a", "b", "c"]);
}

#[test]
fn move_onto_itself_or_missing_is_noop() {
    let (mut store, ids) = store_with(&["a", "b"]);
    assert!(!store.move_block(ids[0], ids[0], MovePosition::After));
    assert!(!store.move_block(ids[0], BlockId::new(), MovePosition::After));
    assert!(!store.move_block(BlockId::new(), ids[0], MovePosition::After));
    assert_eq!(texts(&store), vec!["a", "b"]);
}

#[test]
fn move_up_swaps_with_previous_block() {
    let mut store = BlockStore::new();
    let text = store.insert_block(BlockData::text("text"), InsertPosition::End);
    let image = store.insert_block(BlockData::image("x.png"), InsertPosition::End);
    let table = store.insert_block(BlockData::table(TableContent::default()), InsertPosition::End);

    assert!(store.move_block_up(table.id));

    let ids: Vec<BlockId> = store.blocks().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![text.id, table.id, image.id]);
    assert_normalized(&store);
}

#[test]
fn move_up_and_down_at_boundaries_are_noops() {
    let (mut store, ids) = store_with(&["a", "b"]);
    assert!(!store.move_block_up(ids[0]));
    assert!(!store.move_block_down(ids[1]));
    assert!(store.move_block_down(ids[0]));
    assert_eq!(texts(&store), vec!["b", "a"]);
}

#[test]
fn duplicate_mints_new_id_and_lands_after_source() {
    let (mut store, ids) = store_with(&["a", "b"]);

    let clone = store.duplicate_block(ids[0]).unwrap();

    assert_ne!(clone.id, ids[0]);
    assert_eq!(clone.order, 2.0);
    assert_eq!(texts(&store), vec!["a", "a", "b"]);
    assert_eq!(store.focused_id(), Some(clone.id));
}

#[test]
fn cut_then_paste_at_end_restores_content() {
    let (mut store, ids) = store_with(&["a", "b", "c"]);
    let original = store.get_block(ids[1]).cloned().unwrap();

    store.cut_block(ids[1]).unwrap();
    assert_eq!(store.len(), 2);
    let pasted = store.paste_block(InsertPosition::End).unwrap();

    assert_eq!(store.len(), 3);
    assert_ne!(pasted.id, original.id);
    assert_eq!(pasted.kind, original.kind);
    assert_eq!(pasted.content, original.content);
}

#[test]
fn paste_is_repeatable_and_each_paste_is_new() {
    let (mut store, ids) = store_with(&["a"]);
    store.copy_block(ids[0]);

    let first = store.paste_block(InsertPosition::End).unwrap();
    let second = store.paste_block(InsertPosition::End).unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(store.len(), 3);
    assert!(store.clipboard().is_some());
}

#[test]
fn paste_with_empty_clipboard_is_noop() {
    let (mut store, _) = store_with(&["a"]);
    assert!(store.paste_block(InsertPosition::End).is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn copy_stores_a_value_copy() {
    let (mut store, ids) = store_with(&["a"]);
    store.copy_block(ids[0]);
    store.update_block(ids[0], BlockUpdate::content(BlockContent::Text("changed".into())));

    assert_eq!(store.clipboard().unwrap().plain_text(), "a");
}

#[test]
fn subscribers_receive_snapshots_in_mutation_order() {
    let (mut store, ids) = store_with(&["a"]);
    let seen: Rc<RefCell<Vec<(StoreEventKind, usize)>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let subscription = store.subscribe(move |event| {
        sink.borrow_mut().push((event.kind, event.blocks.len()));
    });

    store.insert_block(BlockData::text("b"), InsertPosition::End);
    store.remove_block(ids[0]);

    assert_eq!(
        *seen.borrow(),
        vec![
            (StoreEventKind::Change, 2),
            (StoreEventKind::Focus, 2),
            (StoreEventKind::Change, 1),
        ]
    );

    assert!(store.unsubscribe(subscription));
    store.insert_block(BlockData::text("c"), InsertPosition::End);
    assert_eq!(seen.borrow().len(), 3);
}

#[test]
fn subscriber_snapshot_is_detached_from_store() {
    let (mut store, ids) = store_with(&["a"]);
    let captured: Rc<RefCell<Vec<Block>>> = Rc::default();
    let sink = Rc::clone(&captured);
    store.subscribe(move |event| {
        *sink.borrow_mut() = event.blocks.clone();
    });

    store.update_block(ids[0], BlockUpdate::content(BlockContent::Text("b".into())));
    captured.borrow_mut()[0].content = BlockContent::Text("tampered".into());

    assert_eq!(store.get_block(ids[0]).unwrap().plain_text(), "b");
}

#[test]
fn initialize_fills_defaults_and_normalizes() {
    let blocks: Vec<Block> = serde_json::from_value(json!([
        { "type": "text", "content": "last", "order": 20 },
        { "type": "banner", "content": { "text": "first" }, "order": 0.5 },
        { "content": "untyped" },
        "garbage",
    ]))
    .unwrap();
    let mut store = BlockStore::new();
    store.initialize(blocks);

    assert_eq!(store.len(), 4);
    assert_normalized(&store);
    assert_eq!(texts(&store), vec!["first", "untyped", "", "last"]);
    assert_eq!(store.blocks()[1].kind, BlockKind::Text);
    assert!(store.blocks().iter().all(|b| b.metadata.editable && b.metadata.deletable));
}

#[test]
fn initialize_mints_ids_for_duplicates() {
    let block = Block::new(BlockData::text("a"), 1.0);
    let mut twin = block.clone();
    twin.order = 2.0;

    let store = BlockStore::with_blocks(vec![block.clone(), twin]);

    assert_eq!(store.len(), 2);
    assert_ne!(store.blocks()[0].id, store.blocks()[1].id);
    assert_eq!(store.blocks()[0].id, block.id);
}

#[test]
fn export_import_round_trip_through_json() {
    let (store, _) = store_with(&["a", "b"]);
    let json = store.to_json().unwrap();

    let mut other = BlockStore::new();
    other.from_json(&json).unwrap();

    assert_eq!(other.export_blocks(), store.export_blocks());
}

#[test]
fn from_json_rejects_non_array_documents() {
    let mut store = BlockStore::new();
    assert!(store.from_json("{\"blocks\": 1}").is_err());
}

#[test]
fn restore_keeps_archived_id_when_free() {
    let (mut store, ids) = store_with(&["a", "b", "c"]);
    let removed = store.remove_block(ids[1]).unwrap();
    let order = removed.order;

    let restored = store.restore_block(removed, InsertPosition::At(order));

    assert_eq!(restored.id, ids[1]);
    assert_eq!(texts(&store), vec!["a", "b", "c"]);
}

#[test]
fn clear_returns_everything() {
    let (mut store, _) = store_with(&["a", "b"]);
    let removed = store.clear();
    assert_eq!(removed.len(), 2);
    assert!(store.is_empty());
    assert_eq!(store.focused_id(), None);
}
