//! Greedy rectangle decomposition of a label lattice.
//!
//! Scan order is row-major. At each unvisited cell the rectangle first grows
//! right as far as the label matches, then grows down one full row at a time
//! while the whole row segment matches and is unvisited. The output order is
//! the scan order, and the same lattice always yields the same rectangles.

use crate::sampler::Lattice;
use serde::{Deserialize, Serialize};

/// Axis-aligned run of cells sharing one label.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub label: u16,
}

impl Rect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Decompose every cell of `lattice` into rectangles.
pub fn merge(lattice: &Lattice) -> Vec<Rect> {
    merge_where(lattice, |_| true)
}

/// Decompose only the cells whose label passes `include`; other cells are
/// treated as already covered.
pub fn merge_where(lattice: &Lattice, include: impl Fn(u16) -> bool) -> Vec<Rect> {
    let width = lattice.width() as usize;
    let height = lattice.height() as usize;
    let cells = lattice.cells();

    let mut visited: Vec<bool> = cells.iter().map(|label| !include(*label)).collect();
    let mut rects = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let start = y * width + x;
            if visited[start] {
                continue;
            }
            let label = cells[start];

            let mut run = 1;
            while x + run < width {
                let idx = start + run;
                if visited[idx] || cells[idx] != label {
                    break;
                }
                run += 1;
            }

            let mut rows = 1;
            while y + rows < height {
                let row_start = (y + rows) * width + x;
                let row_ok = (row_start..row_start + run)
                    .all(|idx| !visited[idx] && cells[idx] == label);
                if !row_ok {
                    break;
                }
                rows += 1;
            }

            for dy in 0..rows {
                let row_start = (y + dy) * width + x;
                for flag in &mut visited[row_start..row_start + run] {
                    *flag = true;
                }
            }

            rects.push(Rect {
                x: x as u32,
                y: y as u32,
                width: run as u32,
                height: rows as u32,
                label,
            });
        }
    }

    rects
}

/// Paint rectangles back into a lattice. Cells no rectangle touches keep `fill`.
pub fn rasterize(width: u32, height: u32, rects: &[Rect], fill: u16) -> Lattice {
    let mut lattice = Lattice::filled(width, height, fill);
    for rect in rects {
        for y in rect.y..(rect.y + rect.height).min(height) {
            for x in rect.x..(rect.x + rect.width).min(width) {
                lattice.set(x, y, rect.label);
            }
        }
    }
    lattice
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage_counts(lattice: &Lattice, rects: &[Rect]) -> Vec<u32> {
        let w = lattice.width();
        let mut counts = vec![0u32; lattice.cells().len()];
        for r in rects {
            for y in r.y..r.y + r.height {
                for x in r.x..r.x + r.width {
                    assert_eq!(lattice.get(x, y), r.label);
                    counts[(y * w + x) as usize] += 1;
                }
            }
        }
        counts
    }

    #[test]
    fn test_two_halves_make_two_rects() {
        let lattice = Lattice::from_rows(&[
            &[0, 0, 1, 1],
            &[0, 0, 1, 1],
            &[0, 0, 1, 1],
            &[0, 0, 1, 1],
        ]);
        let rects = merge(&lattice);
        assert_eq!(
            rects,
            vec![
                Rect {
                    x: 0,
                    y: 0,
                    width: 2,
                    height: 4,
                    label: 0,
                },
                Rect {
                    x: 2,
                    y: 0,
                    width: 2,
                    height: 4,
                    label: 1,
                },
            ]
        );
    }

    #[test]
    fn test_uniform_lattice_is_one_rect() {
        let lattice = Lattice::filled(7, 5, 3);
        assert_eq!(
            merge(&lattice),
            vec![Rect {
                x: 0,
                y: 0,
                width: 7,
                height: 5,
                label: 3,
            }]
        );
    }

    #[test]
    fn test_horizontal_growth_before_vertical() {
        // An L shape: the top row run takes the full width first.
        let lattice = Lattice::from_rows(&[&[0, 0, 0], &[0, 1, 1], &[0, 1, 1]]);
        let rects = merge(&lattice);
        assert_eq!(
            rects,
            vec![
                Rect {
                    x: 0,
                    y: 0,
                    width: 3,
                    height: 1,
                    label: 0,
                },
                Rect {
                    x: 0,
                    y: 1,
                    width: 1,
                    height: 2,
                    label: 0,
                },
                Rect {
                    x: 1,
                    y: 1,
                    width: 2,
                    height: 2,
                    label: 1,
                },
            ]
        );
    }

    #[test]
    fn test_checkerboard_is_all_singletons() {
        let lattice = Lattice::from_rows(&[&[0, 1, 0], &[1, 0, 1], &[0, 1, 0]]);
        let rects = merge(&lattice);
        assert_eq!(rects.len(), 9);
        assert!(rects.iter().all(|r| r.area() == 1));
    }

    #[test]
    fn test_full_coverage_without_overlap() {
        let rows: Vec<Vec<u16>> = (0..13u16)
            .map(|y| {
                (0..17u16)
                    .map(|x| ((x / 3) * 7 + (y / 4) * 3 + (x * y) % 2) % 4)
                    .collect()
            })
            .collect();
        let row_refs: Vec<&[u16]> = rows.iter().map(|r| r.as_slice()).collect();
        let lattice = Lattice::from_rows(&row_refs);
        let rects = merge(&lattice);
        let counts = coverage_counts(&lattice, &rects);
        assert!(counts.iter().all(|&c| c == 1));
        assert_eq!(rects.iter().map(Rect::area).sum::<u64>(), 13 * 17);
    }

    #[test]
    fn test_remerge_is_stable() {
        let lattice = Lattice::from_rows(&[
            &[0, 0, 1, 1, 2],
            &[0, 0, 1, 2, 2],
            &[3, 3, 3, 2, 2],
            &[3, 3, 3, 0, 0],
        ]);
        let first = merge(&lattice);
        let rebuilt = rasterize(5, 4, &first, u16::MAX);
        assert_eq!(rebuilt, lattice);
        let second = merge(&rebuilt);
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_where_skips_excluded_cells() {
        let lattice = Lattice::from_rows(&[&[1, 0, 0], &[1, 0, 1], &[1, 1, 1]]);
        let rects = merge_where(&lattice, |label| label == 0);
        assert_eq!(
            rects,
            vec![
                Rect {
                    x: 1,
                    y: 0,
                    width: 2,
                    height: 1,
                    label: 0,
                },
                Rect {
                    x: 1,
                    y: 1,
                    width: 1,
                    height: 1,
                    label: 0,
                },
            ]
        );
    }
}
