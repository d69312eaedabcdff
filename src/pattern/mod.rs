//! The pattern aggregate: fabrics, blocks, structural validation and edits.

pub mod edits;
pub mod models;
pub mod validate;

pub use edits::{PaintOutcome, RepaintMode};
pub use models::{Block, Fabric, QuiltPattern};
pub use validate::{validate, CellRegion, ValidationError};
