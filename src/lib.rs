//! Turn a raster image into a buildable quilt pattern.
//!
//! The pipeline quantizes the image into a small fabric palette, samples one
//! fabric per grid cell, merges equal cells into rectangular blocks, checks
//! the result and measures every cut piece:
//!
//! ```no_run
//! use quiltgrid::{extract_pattern_from_bytes, ExtractionConfig};
//!
//! let bytes = std::fs::read("sunset.png")?;
//! let config = ExtractionConfig::standard(40, 50, 6);
//! let report = extract_pattern_from_bytes(&bytes, &config, None)?;
//! for line in report.cutting_chart.cutting_instructions() {
//!     println!("{line}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Patterns can be edited in place ([`QuiltPattern::paint_cell`],
//! [`QuiltPattern::rename_fabric`]) and re-measured with [`recompute`].

pub mod catalog;
pub mod color;
pub mod config;
pub mod cutting;
pub mod error;
pub mod merge;
pub mod pattern;
pub mod pipeline;
pub mod quantize;
pub mod sampler;

pub use catalog::{FabricCatalog, PaletteEntry};
pub use color::Rgb;
pub use config::{ExtractionConfig, MeasurementConfig, QuantizePreset};
pub use cutting::{to_cutting_chart, CutPiece, CuttingChart, FabricRequirement};
pub use error::{ConfigError, EditError, QuiltError};
pub use merge::{merge, Rect};
pub use pattern::{
    validate, Block, CellRegion, Fabric, PaintOutcome, QuiltPattern, RepaintMode,
    ValidationError,
};
pub use pipeline::{
    extract_pattern, extract_pattern_from_bytes, extract_pattern_with_catalog, recompute,
    striped_fallback, Confidence, DegenerateInput, ExtractionStats, PatternReport,
};
pub use quantize::{quantize, Quantization, QuantizeOptions};
pub use sampler::{sample, Lattice};
