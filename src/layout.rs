use ratatui::layout::{Position, Rect};

use crate::block::BlockId;

/// Where one block landed on screen, as reported by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockArea {
    pub id: BlockId,
    pub area: Rect,
    /// The drag handle; drags only start here.
    pub handle: Rect,
}

/// Geometry of the last render, in document coordinates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockLayout {
    areas: Vec<BlockArea>,
}

impl BlockLayout {
    pub fn new(areas: Vec<BlockArea>) -> Self {
        Self { areas }
    }

    pub fn push(&mut self, area: BlockArea) {
        self.areas.push(area);
    }

    pub fn areas(&self) -> &[BlockArea] {
        &self.areas
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn block_at(&self, column: u16, row: u16) -> Option<&BlockArea> {
        let position = Position::new(column, row);
        self.areas.iter().find(|entry| entry.area.contains(position))
    }

    pub fn handle_at(&self, column: u16, row: u16) -> Option<BlockId> {
        let position = Position::new(column, row);
        self.areas
            .iter()
            .find(|entry| entry.handle.contains(position))
            .map(|entry| entry.id)
    }

    pub fn area_of(&self, id: BlockId) -> Option<&BlockArea> {
        self.areas.iter().find(|entry| entry.id == id)
    }
}
