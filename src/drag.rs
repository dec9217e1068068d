//! Handle-initiated drag reordering.
//!
//! The drop rule lives in one place (`DragController`); pointer and touch
//! input are two `ReorderGesture` implementations feeding it. The store is
//! only touched on a drop that has a valid target.

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{debug, trace};

use crate::block::BlockId;
use crate::events::{CommandQueue, EditorCommand};
use crate::layout::BlockLayout;
use crate::store::{BlockStore, MovePosition};

/// Above the vertical midpoint of `area` drops before it, otherwise after.
pub fn drop_position(area: Rect, row: u16) -> MovePosition {
    let doubled_row = u32::from(row) * 2;
    let doubled_mid = u32::from(area.y) * 2 + u32::from(area.height);
    if doubled_row < doubled_mid {
        MovePosition::Before
    } else {
        MovePosition::After
    }
}

/// Floating copy of the dragged block that follows the pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragGhost {
    pub label: String,
    pub column: u16,
    pub row: u16,
}

/// Thin line marking where the dragged block would land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropIndicator {
    pub target: BlockId,
    pub position: MovePosition,
    /// Blank row just above (before) or the trailing row of (after) the target.
    pub row: u16,
}

impl DropIndicator {
    fn for_target(target: BlockId, area: Rect, row: u16) -> Self {
        let position = drop_position(area, row);
        let row = match position {
            MovePosition::Before => area.y.saturating_sub(1),
            MovePosition::After => area.bottom().saturating_sub(1),
        };
        Self {
            target,
            position,
            row,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DragSession {
    pub source: BlockId,
    pub ghost: DragGhost,
    pub indicator: Option<DropIndicator>,
}

#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn source(&self) -> Option<BlockId> {
        self.session.as_ref().map(|session| session.source)
    }

    pub fn indicator(&self) -> Option<DropIndicator> {
        self.session.as_ref().and_then(|session| session.indicator)
    }

    pub fn ghost(&self) -> Option<&DragGhost> {
        self.session.as_ref().map(|session| &session.ghost)
    }

    /// Begin dragging `id`. Refused while another drag is in flight.
    pub fn start(&mut self, store: &BlockStore, id: BlockId, column: u16, row: u16) -> bool {
        if self.session.is_some() {
            return false;
        }
        let Some(block) = store.get_block(id) else {
            return false;
        };
        let mut label = block.plain_text();
        if label.trim().is_empty() {
            label = block.kind.label().to_string();
        }
        let label = label.lines().next().unwrap_or_default().to_string();
        debug!(block_id = %id, "drag started");
        self.session = Some(DragSession {
            source: id,
            ghost: DragGhost { label, column, row },
            indicator: None,
        });
        true
    }

    /// Pointer moved. Recomputes the indicator; hovering the dragged block or
    /// empty space clears it.
    pub fn over(&mut self, layout: &BlockLayout, column: u16, row: u16) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.ghost.column = column;
        session.ghost.row = row;
        session.indicator = layout
            .block_at(column, row)
            .filter(|hit| hit.id != session.source)
            .map(|hit| DropIndicator::for_target(hit.id, hit.area, row));
        trace!(column, row, indicator = ?session.indicator, "drag over");
        true
    }

    /// Commit the drop at the last computed indicator. Returns true when the
    /// store was reordered.
    pub fn drop_on(&mut self, store: &mut BlockStore, commands: &mut CommandQueue) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        let Some(indicator) = session.indicator else {
            debug!(block_id = %session.source, "drag ended without a drop target");
            return false;
        };
        let moved = store.move_block(session.source, indicator.target, indicator.position);
        if moved {
            debug!(
                block_id = %session.source,
                target_id = %indicator.target,
                position = ?indicator.position,
                "dropped block"
            );
            commands.push(EditorCommand::BlocksReordered {
                block_id: session.source,
                target_id: indicator.target,
                position: indicator.position,
            });
        }
        moved
    }

    /// Pointer left the document area: no drop target until it comes back.
    pub fn clear_indicator(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.indicator = None;
        true
    }

    pub fn cancel(&mut self) -> bool {
        let cancelled = self.session.take();
        if let Some(session) = &cancelled {
            debug!(block_id = %session.source, "drag cancelled");
        }
        cancelled.is_some()
    }
}

/// An input source able to drive a reorder.
pub trait ReorderGesture {
    type Input;

    /// Feed one input event. Returns true when the gesture consumed it.
    fn handle(
        &mut self,
        input: &Self::Input,
        layout: &BlockLayout,
        drag: &mut DragController,
        store: &mut BlockStore,
        commands: &mut CommandQueue,
    ) -> bool;
}

/// Mouse drags: press on a handle, drag, release.
#[derive(Debug, Default)]
pub struct PointerGesture {
    active: bool,
}

impl PointerGesture {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReorderGesture for PointerGesture {
    type Input = MouseEvent;

    fn handle(
        &mut self,
        input: &MouseEvent,
        layout: &BlockLayout,
        drag: &mut DragController,
        store: &mut BlockStore,
        commands: &mut CommandQueue,
    ) -> bool {
        let (column, row) = (input.column, input.row);
        if self.active && !drag.is_dragging() {
            self.active = false;
        }
        match input.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(id) = layout.handle_at(column, row) else {
                    return false;
                };
                self.active = drag.start(store, id, column, row);
                self.active
            }
            MouseEventKind::Drag(MouseButton::Left) if self.active => {
                drag.over(layout, column, row)
            }
            MouseEventKind::Up(MouseButton::Left) if self.active => {
                self.active = false;
                drag.drop_on(store, commands);
                true
            }
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// One touch point update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchEvent {
    pub id: u64,
    pub phase: TouchPhase,
    pub column: u16,
    pub row: u16,
}

/// Touch drags. Only the finger that started on a handle drives the drag;
/// other touch points are ignored.
#[derive(Debug, Default)]
pub struct TouchGesture {
    active_touch: Option<u64>,
}

impl TouchGesture {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReorderGesture for TouchGesture {
    type Input = TouchEvent;

    fn handle(
        &mut self,
        input: &TouchEvent,
        layout: &BlockLayout,
        drag: &mut DragController,
        store: &mut BlockStore,
        commands: &mut CommandQueue,
    ) -> bool {
        if self.active_touch.is_some() && !drag.is_dragging() {
            self.active_touch = None;
        }
        let (column, row) = (input.column, input.row);
        match input.phase {
            TouchPhase::Start => {
                if self.active_touch.is_some() {
                    return false;
                }
                let Some(id) = layout.handle_at(column, row) else {
                    return false;
                };
                if !drag.start(store, id, column, row) {
                    return false;
                }
                self.active_touch = Some(input.id);
                true
            }
            _ if self.active_touch != Some(input.id) => false,
            TouchPhase::Move => drag.over(layout, column, row),
            TouchPhase::End => {
                self.active_touch = None;
                drag.drop_on(store, commands);
                true
            }
            TouchPhase::Cancel => {
                self.active_touch = None;
                drag.cancel()
            }
        }
    }
}

#[cfg(test)]
#[path = "drag_tests.rs"]
mod drag_tests;
