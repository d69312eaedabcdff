use crate::color::Rgb;
use crate::config::MeasurementConfig;
use crate::cutting::{cut_area_sqin, cut_length_in, fat_quarters_for, yards_for_area};
use crate::error::QuiltError;
use crate::merge::merge;
use crate::sampler::Lattice;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const FINGERPRINT_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fabric {
    pub id: String,
    pub color: Rgb,
    pub display_name: String,
    /// Seam-inflated cut area over every block using this fabric.
    #[serde(default)]
    pub total_area_sqin: f64,
}

impl Fabric {
    pub fn new(id: impl Into<String>, color: Rgb, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color,
            display_name: display_name.into(),
            total_area_sqin: 0.0,
        }
    }

    pub fn fat_quarters(&self, measurement: &MeasurementConfig) -> u32 {
        fat_quarters_for(self.total_area_sqin, measurement)
    }

    /// Unrounded yards of bolt-width fabric.
    pub fn yardage(&self, measurement: &MeasurementConfig) -> f64 {
        yards_for_area(self.total_area_sqin, measurement)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub fabric_id: String,
}

impl Block {
    pub fn new(x: u32, y: u32, width: u32, height: u32, fabric_id: impl Into<String>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fabric_id: fabric_id.into(),
        }
    }

    pub fn area_cells(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x
            && y >= self.y
            && (x as u64) < self.x as u64 + self.width as u64
            && (y as u64) < self.y as u64 + self.height as u64
    }

    /// Every `(x, y)` cell of the block, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y.saturating_add(self.height))
            .flat_map(move |y| {
                (self.x..self.x.saturating_add(self.width)).map(move |x| (x, y))
            })
    }

    pub fn cut_width_in(&self, block_size_in: f64, seam_allowance_in: f64) -> f64 {
        cut_length_in(self.width, block_size_in, seam_allowance_in)
    }

    pub fn cut_height_in(&self, block_size_in: f64, seam_allowance_in: f64) -> f64 {
        cut_length_in(self.height, block_size_in, seam_allowance_in)
    }
}

/// A grid of rectangular fabric blocks with the fabrics they reference.
///
/// Fabrics are kept in first-appearance order and looked up by id; blocks
/// refer to them by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuiltPattern {
    pub grid_width: u32,
    pub grid_height: u32,
    pub block_size_in: f64,
    pub seam_allowance_in: f64,
    pub fabrics: Vec<Fabric>,
    pub blocks: Vec<Block>,
}

impl QuiltPattern {
    pub fn new(
        grid_width: u32,
        grid_height: u32,
        block_size_in: f64,
        seam_allowance_in: f64,
    ) -> Self {
        Self {
            grid_width,
            grid_height,
            block_size_in,
            seam_allowance_in,
            fabrics: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Merge a lattice whose labels index `fabrics` into blocks.
    ///
    /// Labels with no matching fabric produce blocks with an empty fabric id,
    /// which the validator reports.
    pub fn from_lattice(
        lattice: &Lattice,
        fabrics: Vec<Fabric>,
        block_size_in: f64,
        seam_allowance_in: f64,
    ) -> Self {
        let mut pattern = Self::new(
            lattice.width(),
            lattice.height(),
            block_size_in,
            seam_allowance_in,
        );
        pattern.blocks = merge(lattice)
            .into_iter()
            .map(|rect| {
                let fabric_id = fabrics
                    .get(rect.label as usize)
                    .map(|f| f.id.clone())
                    .unwrap_or_default();
                Block::new(rect.x, rect.y, rect.width, rect.height, fabric_id)
            })
            .collect();
        pattern.fabrics = fabrics;
        pattern.recompute_fabric_areas();
        pattern
    }

    pub fn fabric(&self, id: &str) -> Option<&Fabric> {
        self.fabrics.iter().find(|f| f.id == id)
    }

    pub fn fabric_mut(&mut self, id: &str) -> Option<&mut Fabric> {
        self.fabrics.iter_mut().find(|f| f.id == id)
    }

    /// Cut side of a single cell, seams included.
    pub fn cut_size_in(&self) -> f64 {
        cut_length_in(1, self.block_size_in, self.seam_allowance_in)
    }

    pub fn finished_width_in(&self) -> f64 {
        self.grid_width as f64 * self.block_size_in
    }

    pub fn finished_height_in(&self) -> f64 {
        self.grid_height as f64 * self.block_size_in
    }

    /// Cell to fabric id. Later blocks win where blocks overlap.
    pub fn cell_grid(&self) -> HashMap<(u32, u32), &str> {
        let mut grid = HashMap::new();
        for block in &self.blocks {
            for (x, y) in block.cells() {
                if x < self.grid_width && y < self.grid_height {
                    grid.insert((x, y), block.fabric_id.as_str());
                }
            }
        }
        grid
    }

    /// Dense lattice whose labels index `self.fabrics`.
    ///
    /// Returns `None` unless every cell is covered by exactly one in-bounds
    /// block with a known fabric.
    pub fn to_lattice(&self) -> Option<Lattice> {
        if self.fabrics.len() > u16::MAX as usize {
            return None;
        }
        let index: HashMap<&str, u16> = self
            .fabrics
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.as_str(), i as u16))
            .collect();

        let width = self.grid_width as usize;
        let mut cells: Vec<Option<u16>> = vec![None; width * self.grid_height as usize];
        for block in &self.blocks {
            let label = *index.get(block.fabric_id.as_str())?;
            if block.width == 0
                || block.height == 0
                || block.x as u64 + block.width as u64 > self.grid_width as u64
                || block.y as u64 + block.height as u64 > self.grid_height as u64
            {
                return None;
            }
            for (x, y) in block.cells() {
                let slot = &mut cells[y as usize * width + x as usize];
                if slot.is_some() {
                    return None;
                }
                *slot = Some(label);
            }
        }

        let cells: Option<Vec<u16>> = cells.into_iter().collect();
        Lattice::new(self.grid_width, self.grid_height, cells?)
    }

    /// Refresh every fabric's `total_area_sqin` from the current blocks.
    pub fn recompute_fabric_areas(&mut self) {
        let mut totals: HashMap<&str, f64> = HashMap::new();
        for block in &self.blocks {
            *totals.entry(block.fabric_id.as_str()).or_insert(0.0) += cut_area_sqin(
                block.width,
                block.height,
                self.block_size_in,
                self.seam_allowance_in,
            );
        }
        for fabric in &mut self.fabrics {
            fabric.total_area_sqin = totals.get(fabric.id.as_str()).copied().unwrap_or(0.0);
        }
    }

    pub fn to_json(&self) -> Result<String, QuiltError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, QuiltError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a pattern. Structural problems are left for [`crate::validate`].
    pub fn from_json(raw: &str) -> Result<Self, QuiltError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Stable SHA-256 over the pattern's content.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update([FINGERPRINT_VERSION]);
        hasher.update(self.grid_width.to_le_bytes());
        hasher.update(self.grid_height.to_le_bytes());
        hasher.update(self.block_size_in.to_le_bytes());
        hasher.update(self.seam_allowance_in.to_le_bytes());
        hasher.update((self.fabrics.len() as u64).to_le_bytes());
        for fabric in &self.fabrics {
            hash_str(&mut hasher, &fabric.id);
            hasher.update(fabric.color.0);
            hash_str(&mut hasher, &fabric.display_name);
        }
        hasher.update((self.blocks.len() as u64).to_le_bytes());
        for block in &self.blocks {
            hasher.update(block.x.to_le_bytes());
            hasher.update(block.y.to_le_bytes());
            hasher.update(block.width.to_le_bytes());
            hasher.update(block.height.to_le_bytes());
            hash_str(&mut hasher, &block.fabric_id);
        }
        format!("{:x}", hasher.finalize())
    }
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
