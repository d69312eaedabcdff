//! In-place edits on a [`QuiltPattern`]. Every edit either succeeds and leaves
//! a gap-free pattern with fresh fabric areas, or fails and changes nothing.

use super::models::{Block, Fabric, QuiltPattern};
use crate::catalog::FabricCatalog;
use crate::color::Rgb;
use crate::error::EditError;
use crate::merge::merge;
use serde::{Deserialize, Serialize};

/// How [`QuiltPattern::paint_cell`] rebuilds the blocks around a repaint.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaintMode {
    /// Replace the containing block with at most five slices.
    Split,
    /// Split, then re-merge the whole lattice and keep the result only if it
    /// has strictly fewer blocks.
    #[default]
    SplitAndCoalesce,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintOutcome {
    pub changed: bool,
    pub blocks_before: usize,
    pub blocks_after: usize,
    pub coalesced: bool,
}

impl QuiltPattern {
    /// Give cell `(x, y)` a new fabric.
    pub fn paint_cell(
        &mut self,
        x: u32,
        y: u32,
        fabric_id: &str,
        mode: RepaintMode,
    ) -> Result<PaintOutcome, EditError> {
        if x >= self.grid_width || y >= self.grid_height {
            return Err(EditError::CellOutOfBounds {
                x,
                y,
                grid_width: self.grid_width,
                grid_height: self.grid_height,
            });
        }
        if self.fabric(fabric_id).is_none() {
            return Err(EditError::UnknownFabric(fabric_id.to_string()));
        }
        let index = self
            .blocks
            .iter()
            .position(|b| b.contains(x, y))
            .ok_or(EditError::UncoveredCell { x, y })?;

        let blocks_before = self.blocks.len();
        if self.blocks[index].fabric_id == fabric_id {
            return Ok(PaintOutcome {
                changed: false,
                blocks_before,
                blocks_after: blocks_before,
                coalesced: false,
            });
        }

        let slices = split_around(&self.blocks[index], x, y, fabric_id);
        self.blocks.splice(index..=index, slices);

        let mut coalesced = false;
        if mode == RepaintMode::SplitAndCoalesce {
            if let Some(lattice) = self.to_lattice() {
                let rects = merge(&lattice);
                if rects.len() < self.blocks.len() {
                    self.blocks = rects
                        .into_iter()
                        .map(|r| {
                            let id = self.fabrics[r.label as usize].id.clone();
                            Block::new(r.x, r.y, r.width, r.height, id)
                        })
                        .collect();
                    coalesced = true;
                }
            }
        }

        self.recompute_fabric_areas();
        log::debug!(
            "Painted cell ({}, {}) with {}: {} -> {} blocks",
            x,
            y,
            fabric_id,
            blocks_before,
            self.blocks.len()
        );
        Ok(PaintOutcome {
            changed: true,
            blocks_before,
            blocks_after: self.blocks.len(),
            coalesced,
        })
    }

    pub fn rename_fabric(&mut self, fabric_id: &str, display_name: &str) -> Result<(), EditError> {
        let fabric = self
            .fabric_mut(fabric_id)
            .ok_or_else(|| EditError::UnknownFabric(fabric_id.to_string()))?;
        fabric.display_name = display_name.trim().to_string();
        Ok(())
    }

    /// Register a new fabric named after its closest catalog entry and
    /// return its id. The fabric has no area until a cell is painted with it.
    pub fn add_fabric(&mut self, color: Rgb, catalog: &FabricCatalog) -> String {
        let mut n = self.fabrics.len() + 1;
        let id = loop {
            let candidate = format!("f{}", n);
            if self.fabric(&candidate).is_none() {
                break candidate;
            }
            n += 1;
        };

        let base_name = catalog.match_name(color);
        let mut display_name = base_name.to_string();
        if self.fabrics.iter().any(|f| f.display_name == display_name) {
            display_name = format!("{} ({})", base_name, n);
        }

        self.fabrics.push(Fabric::new(id.clone(), color, display_name));
        id
    }

    /// Drop fabrics no block references and return them.
    pub fn prune_unused_fabrics(&mut self) -> Vec<Fabric> {
        let (kept, removed): (Vec<Fabric>, Vec<Fabric>) = std::mem::take(&mut self.fabrics)
            .into_iter()
            .partition(|f| self.blocks.iter().any(|b| b.fabric_id == f.id));
        self.fabrics = kept;
        removed
    }
}

/// Slices covering `block` with `(x, y)` carved out as a 1x1 block of
/// `fabric_id`, in row-major order of their top-left corners.
fn split_around(block: &Block, x: u32, y: u32, fabric_id: &str) -> Vec<Block> {
    let mut slices = Vec::with_capacity(5);
    let right_edge = block.x.saturating_add(block.width);
    let bottom_edge = block.y.saturating_add(block.height);

    if y > block.y {
        slices.push(Block::new(
            block.x,
            block.y,
            block.width,
            y - block.y,
            &block.fabric_id,
        ));
    }
    if x > block.x {
        slices.push(Block::new(block.x, y, x - block.x, 1, &block.fabric_id));
    }
    slices.push(Block::new(x, y, 1, 1, fabric_id));
    if x + 1 < right_edge {
        slices.push(Block::new(
            x + 1,
            y,
            right_edge - x - 1,
            1,
            &block.fabric_id,
        ));
    }
    if y + 1 < bottom_edge {
        slices.push(Block::new(
            block.x,
            y + 1,
            block.width,
            bottom_edge - y - 1,
            &block.fabric_id,
        ));
    }
    slices
}
