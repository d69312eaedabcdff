use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const GRID_DIM_RANGE: RangeInclusive<u32> = 1..=100;
pub const RECOMMENDED_GRID_DIM_RANGE: RangeInclusive<u32> = 10..=100;
pub const PALETTE_SIZE_RANGE: RangeInclusive<u32> = 2..=12;
pub const BLOCK_SIZE_RANGE_IN: RangeInclusive<f64> = 1.0..=6.0;
pub const MAX_SEAM_ALLOWANCE_IN: f64 = 1.0;

/// Quantizer budget presets.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuantizePreset {
    Draft,
    Standard,
    HighDetail,
}

/// Parameters of one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    pub grid_width: u32,
    pub grid_height: u32,
    pub palette_size: u32,
    pub block_size_in: f64,
    pub seam_allowance_in: f64,
    /// Hard cap on k-means iterations.
    pub max_iterations: u32,
    /// Largest centroid shift (CIELAB units) still counted as movement.
    pub convergence_threshold: f32,
    /// Upper bound on the pixels fed to k-means; the rest are skipped by stride.
    pub max_training_pixels: usize,
    pub measurement: MeasurementConfig,
}

impl ExtractionConfig {
    /// Draft: few iterations over a small pixel sample.
    pub fn draft(grid_width: u32, grid_height: u32, palette_size: u32) -> Self {
        Self {
            grid_width,
            grid_height,
            palette_size,
            max_iterations: 12,
            convergence_threshold: 0.5,
            max_training_pixels: 8_000,
            ..Self::default()
        }
    }

    /// Standard: balanced defaults.
    pub fn standard(grid_width: u32, grid_height: u32, palette_size: u32) -> Self {
        Self {
            grid_width,
            grid_height,
            palette_size,
            max_iterations: 24,
            convergence_threshold: 0.1,
            max_training_pixels: 40_000,
            ..Self::default()
        }
    }

    /// HighDetail: tighter convergence over a larger sample, still deterministic.
    pub fn high_detail(grid_width: u32, grid_height: u32, palette_size: u32) -> Self {
        Self {
            grid_width,
            grid_height,
            palette_size,
            max_iterations: 48,
            convergence_threshold: 0.02,
            max_training_pixels: 120_000,
            ..Self::default()
        }
    }

    pub fn from_preset(
        preset: QuantizePreset,
        grid_width: u32,
        grid_height: u32,
        palette_size: u32,
    ) -> Self {
        match preset {
            QuantizePreset::Draft => Self::draft(grid_width, grid_height, palette_size),
            QuantizePreset::Standard => Self::standard(grid_width, grid_height, palette_size),
            QuantizePreset::HighDetail => Self::high_detail(grid_width, grid_height, palette_size),
        }
    }

    pub fn with_block_size(mut self, block_size_in: f64, seam_allowance_in: f64) -> Self {
        self.block_size_in = block_size_in;
        self.seam_allowance_in = seam_allowance_in;
        self
    }

    /// Reject out-of-range parameters before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_geometry(
            self.grid_width,
            self.grid_height,
            self.block_size_in,
            self.seam_allowance_in,
        )?;
        if !PALETTE_SIZE_RANGE.contains(&self.palette_size) {
            return Err(ConfigError::PaletteSize {
                value: self.palette_size,
                min: *PALETTE_SIZE_RANGE.start(),
                max: *PALETTE_SIZE_RANGE.end(),
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::MaxIterations);
        }
        self.measurement.validate()
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            grid_width: 40,
            grid_height: 50,
            palette_size: 6,
            block_size_in: 2.5,
            seam_allowance_in: 0.25,
            max_iterations: 24,
            convergence_threshold: 0.1,
            max_training_pixels: 40_000,
            measurement: MeasurementConfig::default(),
        }
    }
}

/// Purchasing constants for yardage and fat-quarter estimates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeasurementConfig {
    /// Usable bolt width (WOF) in inches.
    pub fabric_width_in: f64,
    /// Yardage is rounded up to a multiple of this many yards.
    pub purchase_increment_yd: f64,
    pub fat_quarter_width_in: f64,
    pub fat_quarter_height_in: f64,
    /// Multiplier applied to cut area and strip length before purchase
    /// rounding. 1.0 buys exactly what is cut; 1.1 adds 10% for miscuts.
    pub waste_factor: f64,
}

impl MeasurementConfig {
    pub fn fat_quarter_area_sqin(&self) -> f64 {
        self.fat_quarter_width_in * self.fat_quarter_height_in
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fabric_width_in > 0.0) {
            return Err(ConfigError::FabricWidth(self.fabric_width_in));
        }
        if !(self.purchase_increment_yd > 0.0) {
            return Err(ConfigError::PurchaseIncrement(self.purchase_increment_yd));
        }
        if !(self.fat_quarter_width_in > 0.0 && self.fat_quarter_height_in > 0.0) {
            return Err(ConfigError::FatQuarter {
                width: self.fat_quarter_width_in,
                height: self.fat_quarter_height_in,
            });
        }
        if !(self.waste_factor >= 1.0 && self.waste_factor.is_finite()) {
            return Err(ConfigError::WasteFactor(self.waste_factor));
        }
        Ok(())
    }
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            fabric_width_in: 42.0,
            purchase_increment_yd: 0.25,
            fat_quarter_width_in: 18.0,
            fat_quarter_height_in: 21.0,
            waste_factor: 1.0,
        }
    }
}

/// Bounds shared by extraction requests and re-submitted patterns: grid
/// dimensions, block size and seam allowance.
pub fn validate_geometry(
    grid_width: u32,
    grid_height: u32,
    block_size_in: f64,
    seam_allowance_in: f64,
) -> Result<(), ConfigError> {
    if !GRID_DIM_RANGE.contains(&grid_width) {
        return Err(ConfigError::GridWidth {
            value: grid_width,
            min: *GRID_DIM_RANGE.start(),
            max: *GRID_DIM_RANGE.end(),
        });
    }
    if !GRID_DIM_RANGE.contains(&grid_height) {
        return Err(ConfigError::GridHeight {
            value: grid_height,
            min: *GRID_DIM_RANGE.start(),
            max: *GRID_DIM_RANGE.end(),
        });
    }
    if !BLOCK_SIZE_RANGE_IN.contains(&block_size_in) {
        return Err(ConfigError::BlockSize {
            value: block_size_in,
            min: *BLOCK_SIZE_RANGE_IN.start(),
            max: *BLOCK_SIZE_RANGE_IN.end(),
        });
    }
    if !(seam_allowance_in > 0.0 && seam_allowance_in <= MAX_SEAM_ALLOWANCE_IN) {
        return Err(ConfigError::SeamAllowance {
            value: seam_allowance_in,
            max: MAX_SEAM_ALLOWANCE_IN,
        });
    }

    if !RECOMMENDED_GRID_DIM_RANGE.contains(&grid_width)
        || !RECOMMENDED_GRID_DIM_RANGE.contains(&grid_height)
    {
        log::warn!(
            "Grid {}x{} is outside the recommended {}..={} range",
            grid_width,
            grid_height,
            RECOMMENDED_GRID_DIM_RANGE.start(),
            RECOMMENDED_GRID_DIM_RANGE.end()
        );
    }
    Ok(())
}

/// Check an upstream confidence score without altering it.
pub fn validate_confidence(score: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(ConfigError::Confidence(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(ExtractionConfig::default().validate(), Ok(()));
        assert_eq!(MeasurementConfig::default().validate(), Ok(()));
        assert_eq!(MeasurementConfig::default().fat_quarter_area_sqin(), 378.0);
    }

    #[test]
    fn test_presets_only_change_quantizer_budget() {
        let draft = ExtractionConfig::from_preset(QuantizePreset::Draft, 20, 30, 4);
        let high = ExtractionConfig::from_preset(QuantizePreset::HighDetail, 20, 30, 4);
        assert_eq!(
            (draft.grid_width, draft.grid_height, draft.palette_size),
            (20, 30, 4)
        );
        assert_eq!(draft.block_size_in, high.block_size_in);
        assert!(draft.max_iterations < high.max_iterations);
        assert!(draft.max_training_pixels < high.max_training_pixels);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let zero_grid = ExtractionConfig::standard(0, 10, 6);
        assert!(matches!(
            zero_grid.validate(),
            Err(ConfigError::GridWidth { value: 0, .. })
        ));

        let tall = ExtractionConfig::standard(10, 101, 6);
        assert!(matches!(
            tall.validate(),
            Err(ConfigError::GridHeight { .. })
        ));

        let palette = ExtractionConfig::standard(10, 10, 13);
        assert!(matches!(
            palette.validate(),
            Err(ConfigError::PaletteSize { .. })
        ));

        let block = ExtractionConfig::standard(10, 10, 6).with_block_size(0.5, 0.25);
        assert!(matches!(
            block.validate(),
            Err(ConfigError::BlockSize { .. })
        ));

        let seam = ExtractionConfig::standard(10, 10, 6).with_block_size(2.0, 0.0);
        assert!(matches!(
            seam.validate(),
            Err(ConfigError::SeamAllowance { .. })
        ));

        let nan = ExtractionConfig::standard(10, 10, 6).with_block_size(f64::NAN, 0.25);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_measurement_validation() {
        let bad = MeasurementConfig {
            purchase_increment_yd: 0.0,
            ..MeasurementConfig::default()
        };
        assert_eq!(bad.validate(), Err(ConfigError::PurchaseIncrement(0.0)));

        let shrinking = MeasurementConfig {
            waste_factor: 0.9,
            ..MeasurementConfig::default()
        };
        assert_eq!(shrinking.validate(), Err(ConfigError::WasteFactor(0.9)));

        let padded = MeasurementConfig {
            waste_factor: 1.1,
            ..MeasurementConfig::default()
        };
        assert_eq!(padded.validate(), Ok(()));
    }

    #[test]
    fn test_geometry_bounds() {
        assert_eq!(validate_geometry(40, 50, 2.5, 0.25), Ok(()));
        assert!(matches!(
            validate_geometry(0, 0, 2.5, 0.25),
            Err(ConfigError::GridWidth { value: 0, .. })
        ));
        assert!(matches!(
            validate_geometry(40, 1_000_000, 2.5, 0.25),
            Err(ConfigError::GridHeight { .. })
        ));
        assert!(matches!(
            validate_geometry(40, 50, -2.0, 0.25),
            Err(ConfigError::BlockSize { .. })
        ));
        assert!(matches!(
            validate_geometry(40, 50, 0.0, 0.25),
            Err(ConfigError::BlockSize { .. })
        ));
        assert!(matches!(
            validate_geometry(40, 50, 2.5, 1.5),
            Err(ConfigError::SeamAllowance { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ExtractionConfig =
            serde_json::from_str(r#"{"grid_width": 12, "palette_size": 3}"#).unwrap();
        assert_eq!(config.grid_width, 12);
        assert_eq!(config.grid_height, 50);
        assert_eq!(config.palette_size, 3);
        assert_eq!(config.measurement.fabric_width_in, 42.0);

        let custom: ExtractionConfig =
            serde_json::from_str(r#"{"measurement": {"fabric_width_in": 44.0}}"#).unwrap();
        assert_eq!(custom.measurement.fabric_width_in, 44.0);
        assert_eq!(custom.measurement.purchase_increment_yd, 0.25);
    }

    #[test]
    fn test_confidence_bounds() {
        assert_eq!(validate_confidence(0.42), Ok(0.42));
        assert!(validate_confidence(1.2).is_err());
        assert!(validate_confidence(f64::NAN).is_err());
    }
}
