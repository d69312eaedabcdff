//! Structural checks over a [`QuiltPattern`].
//!
//! Problems are data, not errors: [`validate`] walks the whole pattern once
//! and returns every violation it finds, in a fixed order (duplicate fabric
//! ids, per-block problems by block index, overlaps, uncovered regions).

use super::models::QuiltPattern;
use crate::merge::merge_where;
use crate::sampler::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// A rectangle of grid cells.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    DuplicateFabric { fabric_id: String },
    ZeroSized { block: usize },
    OutOfBounds { block: usize },
    UnknownFabric { block: usize, fabric_id: String },
    Overlap { first: usize, second: usize },
    Uncovered { region: CellRegion },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFabric { fabric_id } => {
                write!(f, "fabric id '{}' is declared more than once", fabric_id)
            }
            Self::ZeroSized { block } => write!(f, "block {} has zero width or height", block),
            Self::OutOfBounds { block } => write!(f, "block {} extends outside the grid", block),
            Self::UnknownFabric { block, fabric_id } => {
                write!(
                    f,
                    "block {} references unknown fabric '{}'",
                    block, fabric_id
                )
            }
            Self::Overlap { first, second } => {
                write!(f, "blocks {} and {} overlap", first, second)
            }
            Self::Uncovered { region } => write!(
                f,
                "cells ({}, {})..({}, {}) are not covered by any block",
                region.x,
                region.y,
                region.x + region.width,
                region.y + region.height
            ),
        }
    }
}

const UNCOVERED: u16 = 0;
const COVERED: u16 = 1;

/// Check coverage, bounds and fabric references. Never panics.
pub fn validate(pattern: &QuiltPattern) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for fabric in &pattern.fabrics {
        if !seen.insert(fabric.id.as_str()) && reported.insert(fabric.id.as_str()) {
            errors.push(ValidationError::DuplicateFabric {
                fabric_id: fabric.id.clone(),
            });
        }
    }

    let grid_w = pattern.grid_width;
    let grid_h = pattern.grid_height;
    let width = grid_w as usize;
    let mut owner: Vec<Option<usize>> = vec![None; width * grid_h as usize];
    let mut contested = BTreeSet::new();

    for (i, block) in pattern.blocks.iter().enumerate() {
        if block.width == 0 || block.height == 0 {
            errors.push(ValidationError::ZeroSized { block: i });
        }
        if block.x as u64 + block.width as u64 > grid_w as u64
            || block.y as u64 + block.height as u64 > grid_h as u64
        {
            errors.push(ValidationError::OutOfBounds { block: i });
        }
        if !seen.contains(block.fabric_id.as_str()) {
            errors.push(ValidationError::UnknownFabric {
                block: i,
                fabric_id: block.fabric_id.clone(),
            });
        }

        // Only the in-grid part of a block takes part in coverage.
        for y in block.y..block.y.saturating_add(block.height).min(grid_h) {
            for x in block.x..block.x.saturating_add(block.width).min(grid_w) {
                let slot = &mut owner[y as usize * width + x as usize];
                match *slot {
                    Some(first) => {
                        contested.insert(first);
                        contested.insert(i);
                    }
                    None => *slot = Some(i),
                }
            }
        }
    }

    // A cell only remembers its first owner, so resolve exact pairs among
    // the blocks that hit any shared cell.
    let contested: Vec<usize> = contested.into_iter().collect();
    for (n, &first) in contested.iter().enumerate() {
        for &second in &contested[n + 1..] {
            if clipped_overlap(pattern, first, second) {
                errors.push(ValidationError::Overlap { first, second });
            }
        }
    }

    let coverage: Vec<u16> = owner
        .iter()
        .map(|o| if o.is_some() { COVERED } else { UNCOVERED })
        .collect();
    if let Some(lattice) = Lattice::new(grid_w, grid_h, coverage) {
        for rect in merge_where(&lattice, |label| label == UNCOVERED) {
            errors.push(ValidationError::Uncovered {
                region: CellRegion {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                },
            });
        }
    }

    if !errors.is_empty() {
        log::debug!("Pattern validation found {} problem(s)", errors.len());
    }
    errors
}

fn clipped_overlap(pattern: &QuiltPattern, a: usize, b: usize) -> bool {
    let span = |i: usize| {
        let block = &pattern.blocks[i];
        let x1 = block.x.saturating_add(block.width).min(pattern.grid_width);
        let y1 = block.y.saturating_add(block.height).min(pattern.grid_height);
        (block.x, block.y, x1, y1)
    };
    let (ax0, ay0, ax1, ay1) = span(a);
    let (bx0, by0, bx1, by1) = span(b);
    ax0.max(bx0) < ax1.min(bx1) && ay0.max(by0) < ay1.min(by1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::pattern::models::{Block, Fabric};

    fn base() -> QuiltPattern {
        let mut pattern = QuiltPattern::new(4, 4, 2.0, 0.25);
        pattern.fabrics = vec![
            Fabric::new("f1", Rgb::new(200, 30, 30), "Red"),
            Fabric::new("f2", Rgb::new(30, 30, 200), "Blue"),
        ];
        pattern.blocks = vec![Block::new(0, 0, 2, 4, "f1"), Block::new(2, 0, 2, 4, "f2")];
        pattern
    }

    #[test]
    fn test_valid_pattern_has_no_errors() {
        assert!(validate(&base()).is_empty());
    }

    #[test]
    fn test_out_of_bounds_and_unknown_fabric() {
        let mut pattern = base();
        pattern.blocks[1] = Block::new(2, 0, 3, 4, "f9");
        let errors = validate(&pattern);
        assert_eq!(
            errors,
            vec![
                ValidationError::OutOfBounds { block: 1 },
                ValidationError::UnknownFabric {
                    block: 1,
                    fabric_id: "f9".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_overlap_reports_each_pair_once() {
        let mut pattern = base();
        pattern.blocks.push(Block::new(1, 1, 2, 2, "f1"));
        let errors = validate(&pattern);
        assert_eq!(
            errors,
            vec![
                ValidationError::Overlap {
                    first: 0,
                    second: 2
                },
                ValidationError::Overlap {
                    first: 1,
                    second: 2
                },
            ]
        );
    }

    #[test]
    fn test_overlap_between_later_blocks_is_found() {
        // Block 2 and 3 share cells that block 0 owns first.
        let mut pattern = base();
        pattern.blocks.push(Block::new(0, 0, 1, 1, "f1"));
        pattern.blocks.push(Block::new(0, 0, 1, 1, "f2"));
        let overlaps: Vec<_> = validate(&pattern)
            .into_iter()
            .filter(|e| matches!(e, ValidationError::Overlap { .. }))
            .collect();
        assert_eq!(overlaps.len(), 3);
        assert!(overlaps.contains(&ValidationError::Overlap {
            first: 2,
            second: 3
        }));
    }

    #[test]
    fn test_uncovered_cells_grouped_into_regions() {
        let mut pattern = base();
        pattern.blocks = vec![Block::new(0, 0, 2, 4, "f1")];
        let errors = validate(&pattern);
        assert_eq!(
            errors,
            vec![ValidationError::Uncovered {
                region: CellRegion {
                    x: 2,
                    y: 0,
                    width: 2,
                    height: 4
                }
            }]
        );
    }

    #[test]
    fn test_empty_block_list_is_one_region() {
        let mut pattern = base();
        pattern.blocks.clear();
        assert_eq!(validate(&pattern).len(), 1);
    }

    #[test]
    fn test_zero_sized_and_duplicate_fabric() {
        let mut pattern = base();
        pattern.fabrics.push(Fabric::new("f2", Rgb::WHITE, "White"));
        pattern.fabrics.push(Fabric::new("f2", Rgb::WHITE, "White again"));
        pattern.blocks.push(Block::new(1, 1, 0, 3, "f1"));
        // Zero-sized and outside the grid: both are reported.
        pattern.blocks.push(Block::new(10, 10, 0, 1, "f1"));
        let errors = validate(&pattern);
        assert_eq!(
            errors,
            vec![
                ValidationError::DuplicateFabric {
                    fabric_id: "f2".to_string()
                },
                ValidationError::ZeroSized { block: 2 },
                ValidationError::ZeroSized { block: 3 },
                ValidationError::OutOfBounds { block: 3 },
            ]
        );
    }

    #[test]
    fn test_huge_coordinates_do_not_panic() {
        let mut pattern = base();
        pattern.blocks.push(Block::new(u32::MAX, u32::MAX, u32::MAX, 1, "f1"));
        let errors = validate(&pattern);
        assert_eq!(errors, vec![ValidationError::OutOfBounds { block: 2 }]);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_string(&ValidationError::OutOfBounds { block: 3 }).unwrap();
        assert_eq!(json, r#"{"kind":"out_of_bounds","block":3}"#);
        assert_eq!(
            ValidationError::Overlap {
                first: 0,
                second: 1
            }
            .to_string(),
            "blocks 0 and 1 overlap"
        );
    }
}
