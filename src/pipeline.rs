//! End-to-end extraction: image to validated pattern, cutting chart and
//! confidence score.

use crate::catalog::FabricCatalog;
use crate::color::Rgb;
use crate::config::{validate_confidence, validate_geometry, ExtractionConfig, MeasurementConfig};
use crate::cutting::{to_cutting_chart, CuttingChart};
use crate::error::QuiltError;
use crate::pattern::{validate, Block, Fabric, QuiltPattern, ValidationError};
use crate::quantize::{quantize, QuantizeOptions};
use crate::sampler::{composite_pixels, sample, Lattice};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Where a confidence score came from.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "score", rename_all = "snake_case")]
pub enum Confidence {
    /// Computed here from how much of the grid merged into multi-cell blocks.
    LocalComputation(f64),
    /// Supplied by the caller and passed through untouched.
    UpstreamProvided(f64),
}

impl Confidence {
    pub fn score(&self) -> f64 {
        match self {
            Self::LocalComputation(score) | Self::UpstreamProvided(score) => *score,
        }
    }
}

/// Input the extractor handled on a best-effort path.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateInput {
    EmptyImage,
    SingleColor,
    FewerColorsThanPalette,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub quantize_ms: u64,
    pub sample_ms: u64,
    pub merge_ms: u64,
    pub total_ms: u64,
    pub iterations: u32,
    pub converged: bool,
    pub distinct_colors: usize,
    pub degenerate: Option<DegenerateInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub pattern: QuiltPattern,
    pub cutting_chart: CuttingChart,
    pub validation_errors: Vec<ValidationError>,
    pub confidence: Confidence,
    /// Absent when the report was recomputed from an existing pattern.
    pub stats: Option<ExtractionStats>,
    pub fingerprint: String,
}

impl PatternReport {
    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }
}

/// Extract a pattern using the default fabric catalog.
pub fn extract_pattern(
    image: &DynamicImage,
    config: &ExtractionConfig,
    upstream_confidence: Option<f64>,
) -> Result<PatternReport, QuiltError> {
    extract_pattern_with_catalog(
        &image.to_rgba8(),
        config,
        FabricCatalog::global(),
        upstream_confidence,
    )
}

/// Decode encoded image bytes (PNG, JPEG, ...) and extract a pattern.
pub fn extract_pattern_from_bytes(
    image_bytes: &[u8],
    config: &ExtractionConfig,
    upstream_confidence: Option<f64>,
) -> Result<PatternReport, QuiltError> {
    config.validate()?;
    let image = image::load_from_memory(image_bytes)?;
    extract_pattern(&image, config, upstream_confidence)
}

/// Run quantize, sample, merge, validate and measure in that order.
///
/// Configuration and confidence are checked before any pixel is touched.
/// Degenerate images still produce a pattern; the stats say why.
pub fn extract_pattern_with_catalog(
    image: &RgbaImage,
    config: &ExtractionConfig,
    catalog: &FabricCatalog,
    upstream_confidence: Option<f64>,
) -> Result<PatternReport, QuiltError> {
    config.validate()?;
    let upstream_confidence = upstream_confidence.map(validate_confidence).transpose()?;

    let total_start = Instant::now();
    log::info!(
        "Extracting {}x{} pattern with {} colors from {}x{} image",
        config.grid_width,
        config.grid_height,
        config.palette_size,
        image.width(),
        image.height()
    );

    let quantize_start = Instant::now();
    let pixels = composite_pixels(image);
    let quantization = quantize(
        &pixels,
        config.palette_size as usize,
        &QuantizeOptions::from(config),
    );
    let quantize_ms = quantize_start.elapsed().as_millis() as u64;

    let degenerate = if pixels.is_empty() {
        Some(DegenerateInput::EmptyImage)
    } else if quantization.distinct_colors == 1 {
        Some(DegenerateInput::SingleColor)
    } else if quantization.distinct_colors < config.palette_size as usize {
        Some(DegenerateInput::FewerColorsThanPalette)
    } else {
        None
    };
    if let Some(kind) = degenerate {
        log::warn!(
            "Degenerate input ({:?}): {} distinct colors for a palette of {}",
            kind,
            quantization.distinct_colors,
            config.palette_size
        );
    }

    let sample_start = Instant::now();
    let lattice = sample(
        image,
        config.grid_width,
        config.grid_height,
        &quantization.centroids,
    );
    let sample_ms = sample_start.elapsed().as_millis() as u64;

    let merge_start = Instant::now();
    let (fabric_lattice, fabrics) = assign_fabrics(&lattice, &quantization.centroids, catalog);
    let pattern = QuiltPattern::from_lattice(
        &fabric_lattice,
        fabrics,
        config.block_size_in,
        config.seam_allowance_in,
    );
    let merge_ms = merge_start.elapsed().as_millis() as u64;
    log::debug!(
        "Merged {} cells into {} blocks over {} fabrics",
        config.grid_width * config.grid_height,
        pattern.blocks.len(),
        pattern.fabrics.len()
    );

    let confidence = match upstream_confidence {
        Some(score) => Confidence::UpstreamProvided(score),
        None => Confidence::LocalComputation(local_confidence(&pattern)),
    };

    let stats = ExtractionStats {
        quantize_ms,
        sample_ms,
        merge_ms,
        total_ms: total_start.elapsed().as_millis() as u64,
        iterations: quantization.iterations,
        converged: quantization.converged,
        distinct_colors: quantization.distinct_colors,
        degenerate,
    };
    let report = build_report(pattern, &config.measurement, confidence, Some(stats));

    log::info!(
        "Extraction done: {} blocks, {} fabrics, {} problems, confidence {:.3} in {}ms",
        report.pattern.blocks.len(),
        report.pattern.fabrics.len(),
        report.validation_errors.len(),
        report.confidence.score(),
        report.stats.as_ref().map_or(0, |s| s.total_ms)
    );
    Ok(report)
}

/// Re-measure a pattern that was edited or deserialized.
///
/// The pattern's grid and block dimensions are held to the same bounds as
/// an extraction request and rejected before anything is measured.
pub fn recompute(
    mut pattern: QuiltPattern,
    measurement: &MeasurementConfig,
    confidence: Confidence,
) -> Result<PatternReport, QuiltError> {
    validate_geometry(
        pattern.grid_width,
        pattern.grid_height,
        pattern.block_size_in,
        pattern.seam_allowance_in,
    )?;
    measurement.validate()?;
    validate_confidence(confidence.score())?;
    pattern.recompute_fabric_areas();
    Ok(build_report(pattern, measurement, confidence, None))
}

const STRIPE_FABRICS: &[(&str, &str)] = &[
    ("#1B2D5B", "Kona Cotton - Navy"),
    ("#C43428", "Kona Cotton - Tomato"),
    ("#F5F0DC", "Kona Cotton - Cream"),
    ("#4A7C3F", "Kona Cotton - Grass"),
    ("#D4A42A", "Kona Cotton - Gold"),
    ("#7DB8D8", "Kona Cotton - Sky"),
];

/// Placeholder pattern of full-width horizontal stripes, for callers that
/// cannot run extraction. Confidence is always zero.
pub fn striped_fallback(config: &ExtractionConfig) -> Result<PatternReport, QuiltError> {
    config.validate()?;

    let fabrics: Vec<Fabric> = STRIPE_FABRICS
        .iter()
        .take(config.palette_size as usize)
        .take(config.grid_height as usize)
        .enumerate()
        .filter_map(|(i, (hex, name))| {
            Rgb::from_hex(hex).map(|color| Fabric::new(format!("f{}", i + 1), color, *name))
        })
        .collect();

    let mut pattern = QuiltPattern::new(
        config.grid_width,
        config.grid_height,
        config.block_size_in,
        config.seam_allowance_in,
    );
    let stripe_height = (config.grid_height / fabrics.len().max(1) as u32).max(1);
    for (i, fabric) in fabrics.iter().enumerate() {
        let y = i as u32 * stripe_height;
        let height = if i + 1 < fabrics.len() {
            stripe_height
        } else {
            config.grid_height - y
        };
        pattern
            .blocks
            .push(Block::new(
                0,
                y,
                config.grid_width,
                height,
                fabric.id.clone(),
            ));
    }
    pattern.fabrics = fabrics;
    pattern.recompute_fabric_areas();

    log::warn!(
        "Using striped placeholder pattern ({} stripes)",
        pattern.blocks.len()
    );
    Ok(build_report(
        pattern,
        &config.measurement,
        Confidence::LocalComputation(0.0),
        None,
    ))
}

fn build_report(
    pattern: QuiltPattern,
    measurement: &MeasurementConfig,
    confidence: Confidence,
    stats: Option<ExtractionStats>,
) -> PatternReport {
    let validation_errors = validate(&pattern);
    for err in &validation_errors {
        log::warn!("Pattern problem: {}", err);
    }
    let cutting_chart = to_cutting_chart(&pattern, measurement);
    let fingerprint = pattern.fingerprint();
    PatternReport {
        pattern,
        cutting_chart,
        validation_errors,
        confidence,
        stats,
        fingerprint,
    }
}

/// Relabel the centroid lattice so labels index a compact fabric list in
/// first-appearance order. Fabrics get ids `f1, f2, ..` and the catalog name
/// of their color, suffixed with their number when the name repeats.
fn assign_fabrics(
    lattice: &Lattice,
    centroids: &[Rgb],
    catalog: &FabricCatalog,
) -> (Lattice, Vec<Fabric>) {
    let used = lattice.labels_in_order();
    let mut remap = vec![0u16; centroids.len().max(1)];
    let mut fabrics: Vec<Fabric> = Vec::with_capacity(used.len());

    for (i, &label) in used.iter().enumerate() {
        let color = centroids.get(label as usize).copied().unwrap_or(Rgb::WHITE);
        let base_name = catalog.match_name(color);
        let display_name = if fabrics.iter().any(|f| f.display_name == base_name) {
            format!("{} ({})", base_name, i + 1)
        } else {
            base_name.to_string()
        };
        if let Some(slot) = remap.get_mut(label as usize) {
            *slot = i as u16;
        }
        fabrics.push(Fabric::new(format!("f{}", i + 1), color, display_name));
    }

    let cells = lattice
        .cells()
        .iter()
        .map(|&label| remap.get(label as usize).copied().unwrap_or(0))
        .collect();
    let relabeled = Lattice::new(lattice.width(), lattice.height(), cells)
        .unwrap_or_else(|| Lattice::filled(lattice.width(), lattice.height(), 0));
    (relabeled, fabrics)
}

/// Share of cells in multi-cell blocks plus 0.3, capped at 1 and rounded
/// to three decimals.
fn local_confidence(pattern: &QuiltPattern) -> f64 {
    let total_cells = pattern.grid_width as u64 * pattern.grid_height as u64;
    if total_cells == 0 {
        return 0.0;
    }
    let multi_cell: u64 = pattern
        .blocks
        .iter()
        .map(Block::area_cells)
        .filter(|&area| area > 1)
        .sum();
    let score = (multi_cell as f64 / total_cells as f64 + 0.3).min(1.0);
    (score * 1000.0).round() / 1000.0
}
