// Fixed-grid layout: one row per block, one column per character.
//
// Hosts with a real renderer answer geometry queries themselves; the grid
// serves headless and terminal hosts.

use super::{ScreenCoords, ScreenPoint};

/// Text content of one block and where it sits in tree-position space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSnapshot {
    /// Tree position of the block's first character.
    pub content_start: u32,
    pub text: String,
}

impl BlockSnapshot {
    pub fn content_end(&self) -> u32 {
        self.content_start + self.text.len() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub line_height: f32,
    pub char_width: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self { line_height: 20.0, char_width: 8.0 }
    }
}

impl GridLayout {
    pub fn new(line_height: f32, char_width: f32) -> Self {
        Self { line_height, char_width }
    }

    /// Top-left corner of the character at `pos`.
    pub fn coords_at(&self, blocks: &[BlockSnapshot], pos: u32) -> Option<ScreenCoords> {
        let (row, block) = blocks
            .iter()
            .enumerate()
            .find(|(_, block)| pos >= block.content_start && pos <= block.content_end())?;

        let byte_offset = (pos - block.content_start) as usize;
        let column = block.text.get(..byte_offset)?.chars().count();

        Some(ScreenCoords {
            top: row as f32 * self.line_height,
            left: column as f32 * self.char_width,
        })
    }

    /// Tree position of the character under `point`, or `None` off text.
    pub fn position_at(&self, blocks: &[BlockSnapshot], point: ScreenPoint) -> Option<u32> {
        if point.x < 0.0 || point.y < 0.0 || self.line_height <= 0.0 || self.char_width <= 0.0 {
            return None;
        }

        let row = (point.y / self.line_height).floor() as usize;
        let column = (point.x / self.char_width).floor() as usize;
        let block = blocks.get(row)?;
        let (byte_offset, _) = block.text.char_indices().nth(column)?;

        Some(block.content_start + byte_offset as u32)
    }
}
