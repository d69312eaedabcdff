//! Deterministic k-means color quantization in CIELAB.
//!
//! Assignment runs in parallel with rayon; initialization is farthest-point
//! seeded from the median-luminance pixel, so the same pixels always give
//! the same centroids.

use crate::color::{lab_distance_sq, nearest_index, Rgb};
use crate::config::ExtractionConfig;
use palette::{white_point::D65, Lab};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Iteration budget for [`quantize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizeOptions {
    pub max_iterations: u32,
    pub convergence_threshold: f32,
    pub max_training_pixels: usize,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}

impl From<&ExtractionConfig> for QuantizeOptions {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            max_iterations: config.max_iterations.max(1),
            convergence_threshold: config.convergence_threshold,
            max_training_pixels: config.max_training_pixels.max(1),
        }
    }
}

/// Output of one quantizer run. `centroids` always has exactly `k` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantization {
    pub centroids: Vec<Rgb>,
    pub iterations: u32,
    pub converged: bool,
    pub distinct_colors: usize,
}

/// K-means clustering center
#[derive(Clone)]
struct KMeansCenter {
    lab: Lab<D65, f32>,
    sum_l: f64,
    sum_a: f64,
    sum_b: f64,
    count: u64,
}

impl KMeansCenter {
    fn new(lab: Lab<D65, f32>) -> Self {
        Self {
            lab,
            sum_l: 0.0,
            sum_a: 0.0,
            sum_b: 0.0,
            count: 0,
        }
    }

    fn add_sample(&mut self, lab: Lab<D65, f32>) {
        self.sum_l += lab.l as f64;
        self.sum_a += lab.a as f64;
        self.sum_b += lab.b as f64;
        self.count += 1;
    }

    /// Move to the mean of the accumulated samples and return the squared shift.
    /// Empty clusters keep their previous position.
    fn update_centroid(&mut self) -> f32 {
        let mut shift = 0.0;
        if self.count > 0 {
            let next = Lab::new(
                (self.sum_l / self.count as f64) as f32,
                (self.sum_a / self.count as f64) as f32,
                (self.sum_b / self.count as f64) as f32,
            );
            shift = lab_distance_sq(self.lab, next);
            self.lab = next;
        }
        self.sum_l = 0.0;
        self.sum_a = 0.0;
        self.sum_b = 0.0;
        self.count = 0;
        shift
    }
}

/// Cluster `pixels` into `k` representative colors.
///
/// Degenerate input never fails: with no more distinct colors than `k` the
/// distinct colors are returned most-frequent first, padded with copies of the
/// most frequent one; an empty input yields `k` copies of white.
pub fn quantize(pixels: &[Rgb], k: usize, options: &QuantizeOptions) -> Quantization {
    let k = k.max(1);

    if pixels.is_empty() {
        return Quantization {
            centroids: vec![Rgb::WHITE; k],
            iterations: 0,
            converged: true,
            distinct_colors: 0,
        };
    }

    let histogram = color_histogram(pixels);
    let distinct_colors = histogram.len();

    if distinct_colors <= k {
        let mut centroids: Vec<Rgb> = histogram.iter().map(|(rgb, _)| *rgb).collect();
        let most_frequent = centroids[0];
        centroids.resize(k, most_frequent);
        log::debug!(
            "Quantizer: {} distinct colors <= k={}, skipping k-means",
            distinct_colors,
            k
        );
        return Quantization {
            centroids,
            iterations: 0,
            converged: true,
            distinct_colors,
        };
    }

    let stride = (pixels.len() / options.max_training_pixels.max(1)).max(1);
    let training: Vec<Lab<D65, f32>> = pixels.iter().step_by(stride).map(|p| p.to_lab()).collect();

    let (centers, iterations, converged) = kmeans_quantize(&training, k, options);
    if !converged {
        log::warn!(
            "Quantizer hit the {} iteration cap before converging",
            options.max_iterations
        );
    }

    Quantization {
        centroids: centers.into_iter().map(Rgb::from_lab).collect(),
        iterations,
        converged,
        distinct_colors,
    }
}

/// Distinct colors with their counts, most frequent first; ties keep
/// first-appearance order.
fn color_histogram(pixels: &[Rgb]) -> Vec<(Rgb, u64)> {
    let mut counts: HashMap<Rgb, (u64, usize)> = HashMap::new();
    for (i, rgb) in pixels.iter().enumerate() {
        counts.entry(*rgb).or_insert((0, i)).0 += 1;
    }

    let mut histogram: Vec<(Rgb, u64, usize)> = counts
        .into_iter()
        .map(|(rgb, (count, first))| (rgb, count, first))
        .collect();
    histogram.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    histogram.into_iter().map(|(rgb, count, _)| (rgb, count)).collect()
}

/// Lloyd's iteration. Returns `(centroids, iterations, converged)`.
fn kmeans_quantize(
    pixels: &[Lab<D65, f32>],
    k: usize,
    options: &QuantizeOptions,
) -> (Vec<Lab<D65, f32>>, u32, bool) {
    let mut centers = kmeans_plus_plus_init(pixels, k.min(pixels.len()));
    let threshold_sq = options.convergence_threshold * options.convergence_threshold;

    let mut labels = vec![usize::MAX; pixels.len()];
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..options.max_iterations {
        iterations += 1;
        let center_labs: Vec<Lab<D65, f32>> = centers.iter().map(|c| c.lab).collect();

        // Parallel assignment step
        let new_labels: Vec<usize> = pixels
            .par_iter()
            .map(|pixel| nearest_index(*pixel, &center_labs))
            .collect();

        let changed = new_labels
            .iter()
            .zip(labels.iter())
            .filter(|(a, b)| a != b)
            .count();
        labels = new_labels;

        if changed == 0 {
            converged = true;
            break;
        }

        for (pixel, &label) in pixels.iter().zip(labels.iter()) {
            centers[label].add_sample(*pixel);
        }

        let max_shift = centers
            .iter_mut()
            .map(|center| center.update_centroid())
            .fold(0.0f32, f32::max);

        log::debug!(
            "k-means iteration {}: {} reassigned, max shift {:.4}",
            iterations,
            changed,
            max_shift.sqrt()
        );

        if max_shift <= threshold_sq {
            converged = true;
            break;
        }
    }

    let mut palette: Vec<Lab<D65, f32>> = centers.iter().map(|c| c.lab).collect();
    if let Some(first) = palette.first().copied() {
        palette.resize(k, first);
    }
    (palette, iterations, converged)
}

/// Farthest-point initialization: start from the median-luminance pixel,
/// then repeatedly take the pixel farthest from every chosen center.
fn kmeans_plus_plus_init(pixels: &[Lab<D65, f32>], k: usize) -> Vec<KMeansCenter> {
    let n = pixels.len();
    let mut centers = Vec::with_capacity(k);
    if n == 0 || k == 0 {
        return centers;
    }
    let mut chosen_indices = HashSet::new();

    let mut sorted_by_l: Vec<(usize, f32)> =
        pixels.iter().enumerate().map(|(i, p)| (i, p.l)).collect();
    sorted_by_l.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    let first_idx = sorted_by_l[n / 2].0;
    centers.push(KMeansCenter::new(pixels[first_idx]));
    chosen_indices.insert(first_idx);

    let mut min_distances: Vec<f32> = pixels
        .par_iter()
        .map(|p| lab_distance_sq(*p, centers[0].lab))
        .collect();

    while centers.len() < k {
        // First index wins among equal distances
        let mut best_idx = 0usize;
        let mut best_dist = f32::MIN;
        for (i, d) in min_distances.iter().enumerate() {
            if !chosen_indices.contains(&i) && *d > best_dist {
                best_dist = *d;
                best_idx = i;
            }
        }

        chosen_indices.insert(best_idx);
        let new_lab = pixels[best_idx];

        min_distances
            .par_iter_mut()
            .zip(pixels.par_iter())
            .for_each(|(min_d, pixel)| {
                let d = lab_distance_sq(*pixel, new_lab);
                if d < *min_d {
                    *min_d = d;
                }
            });

        centers.push(KMeansCenter::new(new_lab));
    }

    centers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> QuantizeOptions {
        QuantizeOptions::default()
    }

    #[test]
    fn test_single_color_pads_with_that_color() {
        let red = Rgb::new(200, 20, 20);
        let pixels = vec![red; 400];
        let result = quantize(&pixels, 6, &opts());
        assert_eq!(result.centroids, vec![red; 6]);
        assert_eq!(result.distinct_colors, 1);
        assert!(result.converged);
    }

    #[test]
    fn test_empty_input_is_white() {
        let result = quantize(&[], 3, &opts());
        assert_eq!(result.centroids, vec![Rgb::WHITE; 3]);
        assert_eq!(result.distinct_colors, 0);
    }

    #[test]
    fn test_few_colors_ordered_by_frequency() {
        let a = Rgb::new(10, 10, 10);
        let b = Rgb::new(240, 240, 240);
        let mut pixels = vec![a; 10];
        pixels.extend(vec![b; 30]);
        let result = quantize(&pixels, 4, &opts());
        assert_eq!(result.centroids, vec![b, a, b, b]);
        assert_eq!(result.distinct_colors, 2);
    }

    #[test]
    fn test_separates_two_clusters() {
        let mut pixels = Vec::new();
        for i in 0..50u8 {
            pixels.push(Rgb::new(220 + i % 5, 20, 20));
            pixels.push(Rgb::new(20, 20, 200 + i % 7));
        }
        let result = quantize(&pixels, 2, &opts());
        assert_eq!(result.centroids.len(), 2);
        assert!(result.converged);

        let mut reds = 0;
        let mut blues = 0;
        for c in &result.centroids {
            if c.0[0] > 150 && c.0[2] < 100 {
                reds += 1;
            }
            if c.0[2] > 150 && c.0[0] < 100 {
                blues += 1;
            }
        }
        assert_eq!((reds, blues), (1, 1), "centroids: {:?}", result.centroids);
    }

    #[test]
    fn test_is_deterministic() {
        let pixels: Vec<Rgb> = (0..2000u32)
            .map(|i| {
                Rgb::new(
                    (i * 7 % 256) as u8,
                    (i * 13 % 256) as u8,
                    (i * 31 % 256) as u8,
                )
            })
            .collect();
        let first = quantize(&pixels, 5, &opts());
        let second = quantize(&pixels, 5, &opts());
        assert_eq!(first, second);
        assert_eq!(first.centroids.len(), 5);
    }

    #[test]
    fn test_iteration_cap_terminates() {
        let pixels: Vec<Rgb> = (0..3000u32)
            .map(|i| {
                Rgb::new(
                    (i % 256) as u8,
                    (i / 12 % 256) as u8,
                    (i * 3 % 256) as u8,
                )
            })
            .collect();
        let options = QuantizeOptions {
            max_iterations: 1,
            convergence_threshold: 0.0,
            max_training_pixels: 10_000,
        };
        let result = quantize(&pixels, 8, &options);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.centroids.len(), 8);
    }
}
