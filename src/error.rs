use thiserror::Error;

/// Top-level error for fallible library entry points.
///
/// Structural problems in a pattern are not errors: they are returned as
/// [`crate::ValidationError`] values so the caller can decide what to do.
#[derive(Debug, Error)]
pub enum QuiltError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to (de)serialize pattern: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("edit rejected: {0}")]
    Edit(#[from] EditError),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Out-of-range request parameters, rejected before any computation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grid_width must be between {min} and {max}, got {value}")]
    GridWidth { value: u32, min: u32, max: u32 },

    #[error("grid_height must be between {min} and {max}, got {value}")]
    GridHeight { value: u32, min: u32, max: u32 },

    #[error("palette_size must be between {min} and {max}, got {value}")]
    PaletteSize { value: u32, min: u32, max: u32 },

    #[error("block_size_in must be between {min} and {max}, got {value}")]
    BlockSize { value: f64, min: f64, max: f64 },

    #[error("seam_allowance_in must be in (0, {max}], got {value}")]
    SeamAllowance { value: f64, max: f64 },

    #[error("max_iterations must be at least 1")]
    MaxIterations,

    #[error("confidence score must be in [0, 1], got {0}")]
    Confidence(f64),

    #[error("fabric_width_in must be positive, got {0}")]
    FabricWidth(f64),

    #[error("purchase_increment_yd must be positive, got {0}")]
    PurchaseIncrement(f64),

    #[error("fat quarter dimensions must be positive, got {width}x{height}")]
    FatQuarter { width: f64, height: f64 },

    #[error("waste_factor must be at least 1.0, got {0}")]
    WasteFactor(f64),
}

/// Reasons a pattern edit was refused. The pattern is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("cell ({x}, {y}) is outside the {grid_width}x{grid_height} grid")]
    CellOutOfBounds {
        x: u32,
        y: u32,
        grid_width: u32,
        grid_height: u32,
    },

    #[error("unknown fabric_id '{0}'")]
    UnknownFabric(String),

    #[error("cell ({x}, {y}) is not covered by any block")]
    UncoveredCell { x: u32, y: u32 },
}
