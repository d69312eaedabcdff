//! Grid sampling: one quantized color label per grid cell.

use crate::color::{nearest_index, Rgb};
use image::RgbaImage;
use palette::{white_point::D65, Lab};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Dense `width x height` lattice of labels in row-major order.
///
/// A label is an index into some color or fabric table owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lattice {
    width: u32,
    height: u32,
    cells: Vec<u16>,
}

impl Lattice {
    /// Returns `None` when `cells` does not hold exactly `width * height` labels.
    pub fn new(width: u32, height: u32, cells: Vec<u16>) -> Option<Self> {
        if cells.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn filled(width: u32, height: u32, label: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![label; width as usize * height as usize],
        }
    }

    /// Build from equal-length rows. Short rows are padded with their last label.
    pub fn from_rows(rows: &[&[u16]]) -> Self {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for row in rows {
            let pad = row.last().copied().unwrap_or(0);
            cells.extend_from_slice(row);
            cells.extend(std::iter::repeat(pad).take(width as usize - row.len()));
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[u16] {
        &self.cells
    }

    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, label: u16) {
        let idx = self.index(x, y);
        self.cells[idx] = label;
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Distinct labels in row-major first-appearance order.
    pub fn labels_in_order(&self) -> Vec<u16> {
        let mut seen = Vec::new();
        for label in &self.cells {
            if !seen.contains(label) {
                seen.push(*label);
            }
        }
        seen
    }
}

/// Flatten an RGBA image into sRGB pixels composited onto white.
pub fn composite_pixels(image: &RgbaImage) -> Vec<Rgb> {
    image
        .pixels()
        .collect::<Vec<_>>()
        .par_iter()
        .map(|p| Rgb::composite_on_white(p.0))
        .collect()
}

/// Assign every grid cell the nearest centroid to its mean CIELAB color.
///
/// Each cell covers the pixel region proportional to its position; when the
/// image is smaller than the grid a cell still reads at least one pixel. An
/// empty image or centroid list yields a lattice of label 0.
pub fn sample(image: &RgbaImage, grid_width: u32, grid_height: u32, centroids: &[Rgb]) -> Lattice {
    let (img_w, img_h) = image.dimensions();
    if img_w == 0 || img_h == 0 || centroids.is_empty() {
        return Lattice::filled(grid_width, grid_height, 0);
    }

    let centroid_labs: Vec<Lab<D65, f32>> = centroids.iter().map(|c| c.to_lab()).collect();
    let n = grid_width as usize * grid_height as usize;

    let cells: Vec<u16> = (0..n)
        .into_par_iter()
        .map(|i| {
            let gx = (i % grid_width as usize) as u32;
            let gy = (i / grid_width as usize) as u32;
            let (x0, x1) = cell_span(gx, grid_width, img_w);
            let (y0, y1) = cell_span(gy, grid_height, img_h);
            let mean = region_mean_lab(image, x0, x1, y0, y1);
            nearest_index(mean, &centroid_labs) as u16
        })
        .collect();

    Lattice {
        width: grid_width,
        height: grid_height,
        cells,
    }
}

/// Half-open pixel span `[start, end)` covered by grid cell `index`.
fn cell_span(index: u32, cells: u32, pixels: u32) -> (u32, u32) {
    let start = (index as u64 * pixels as u64 / cells as u64) as u32;
    let end = ((index as u64 + 1) * pixels as u64 / cells as u64) as u32;
    let start = start.min(pixels - 1);
    (start, end.max(start + 1).min(pixels))
}

fn region_mean_lab(image: &RgbaImage, x0: u32, x1: u32, y0: u32, y1: u32) -> Lab<D65, f32> {
    let mut sum_l = 0.0f64;
    let mut sum_a = 0.0f64;
    let mut sum_b = 0.0f64;
    let mut count = 0u64;

    for y in y0..y1 {
        for x in x0..x1 {
            let lab = Rgb::composite_on_white(image.get_pixel(x, y).0).to_lab();
            sum_l += lab.l as f64;
            sum_a += lab.a as f64;
            sum_b += lab.b as f64;
            count += 1;
        }
    }

    let count = count.max(1) as f64;
    Lab::new(
        (sum_l / count) as f32,
        (sum_a / count) as f32,
        (sum_b / count) as f32,
    )
}
