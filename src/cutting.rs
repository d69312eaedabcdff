//! Cut-piece grouping and fabric purchasing math.
//!
//! Every physical dimension comes from [`cut_length_in`]; nothing else in
//! the crate multiplies by the block size or adds seam allowance.

use crate::color::Rgb;
use crate::config::MeasurementConfig;
use crate::pattern::QuiltPattern;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const INCHES_PER_YARD: f64 = 36.0;
const ROUNDING_EPSILON: f64 = 1e-9;
const UNKNOWN_FABRIC_COLOR: Rgb = Rgb::new(0x88, 0x88, 0x88);

/// Cut length of a run of `cells` blocks: finished length plus a seam
/// allowance on both edges.
pub fn cut_length_in(cells: u32, block_size_in: f64, seam_allowance_in: f64) -> f64 {
    cells as f64 * block_size_in + 2.0 * seam_allowance_in
}

/// Area of the cut rectangle for a `width x height` cell block.
pub fn cut_area_sqin(width: u32, height: u32, block_size_in: f64, seam_allowance_in: f64) -> f64 {
    cut_length_in(width, block_size_in, seam_allowance_in)
        * cut_length_in(height, block_size_in, seam_allowance_in)
}

/// Round `value` up to a whole multiple of `increment`.
pub fn ceil_to_increment(value: f64, increment: f64) -> f64 {
    if !(increment > 0.0) || value <= 0.0 {
        return value.max(0.0);
    }
    ((value / increment) - ROUNDING_EPSILON).ceil().max(0.0) * increment
}

/// Fat quarters covering `area_sqin` after the waste factor.
pub fn fat_quarters_for(area_sqin: f64, measurement: &MeasurementConfig) -> u32 {
    if area_sqin <= 0.0 {
        return 0;
    }
    let padded = area_sqin * measurement.waste_factor;
    ((padded / measurement.fat_quarter_area_sqin()) - ROUNDING_EPSILON).ceil() as u32
}

/// Unrounded yards of bolt-width fabric covering `area_sqin` after the
/// waste factor.
pub fn yards_for_area(area_sqin: f64, measurement: &MeasurementConfig) -> f64 {
    area_sqin * measurement.waste_factor / (measurement.fabric_width_in * INCHES_PER_YARD)
}

/// One distinct cut size for one fabric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPiece {
    pub fabric_id: String,
    pub cut_width_in: f64,
    pub cut_height_in: f64,
    pub quantity: u32,
}

impl CutPiece {
    pub fn area_sqin(&self) -> f64 {
        self.cut_width_in * self.cut_height_in
    }

    pub fn total_area_sqin(&self) -> f64 {
        self.area_sqin() * self.quantity as f64
    }
}

/// Purchasing totals for one fabric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricRequirement {
    pub fabric_id: String,
    pub display_name: String,
    pub color: Rgb,
    pub piece_count: u32,
    pub total_area_sqin: f64,
    pub fat_quarters: u32,
    /// Area times the waste factor, divided by bolt width, before rounding.
    pub yardage_exact: f64,
    /// `yardage_exact` rounded up to the purchase increment.
    pub yardage: f64,
    /// Yardage when every piece is cut from strips across the bolt.
    pub strip_yardage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingChart {
    pub block_size_in: f64,
    pub seam_allowance_in: f64,
    pub cut_size_in: f64,
    /// Grouped by fabric in first-appearance order, largest piece first.
    pub pieces: Vec<CutPiece>,
    pub fabrics: Vec<FabricRequirement>,
}

impl CuttingChart {
    pub fn total_pieces(&self) -> u32 {
        self.pieces.iter().map(|p| p.quantity).sum()
    }

    /// Pieces grouped per fabric, in chart order.
    pub fn by_fabric(&self) -> Vec<(&str, Vec<&CutPiece>)> {
        let mut groups: Vec<(&str, Vec<&CutPiece>)> = Vec::new();
        for piece in &self.pieces {
            match groups.iter_mut().find(|(id, _)| *id == piece.fabric_id) {
                Some((_, pieces)) => pieces.push(piece),
                None => groups.push((piece.fabric_id.as_str(), vec![piece])),
            }
        }
        groups
    }

    pub fn requirement(&self, fabric_id: &str) -> Option<&FabricRequirement> {
        self.fabrics.iter().find(|f| f.fabric_id == fabric_id)
    }

    /// Human-readable cutting sequence: one header per fabric, its totals,
    /// then one line per piece size, largest first.
    pub fn cutting_instructions(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (fabric_id, pieces) in self.by_fabric() {
            let Some(req) = self.requirement(fabric_id) else {
                continue;
            };
            lines.push(format!("### {} ({})", req.display_name, req.color));
            lines.push(format!(
                "Total needed: ~{:.0} sq in ({} fat quarter{} or {} yd WOF)",
                req.total_area_sqin,
                req.fat_quarters,
                if req.fat_quarters == 1 { "" } else { "s" },
                req.yardage
            ));
            for piece in pieces {
                lines.push(format!(
                    "  • Cut {}× pieces {}\" × {}\"",
                    piece.quantity, piece.cut_width_in, piece.cut_height_in
                ));
            }
        }
        lines
    }
}

/// Group blocks into cut pieces and total each fabric's requirement.
///
/// Blocks with a zero dimension have no cut piece. Blocks naming a fabric
/// the pattern does not declare are still counted, under their raw id.
pub fn to_cutting_chart(pattern: &QuiltPattern, measurement: &MeasurementConfig) -> CuttingChart {
    let block_size = pattern.block_size_in;
    let seam = pattern.seam_allowance_in;

    // Keyed on cell dimensions so equal sizes group exactly.
    let mut fabric_order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<((u32, u32), u32)>> = HashMap::new();
    for block in &pattern.blocks {
        if block.width == 0 || block.height == 0 {
            continue;
        }
        let id = block.fabric_id.as_str();
        let sizes = groups.entry(id).or_insert_with(|| {
            fabric_order.push(id);
            Vec::new()
        });
        let key = (block.width, block.height);
        match sizes.iter_mut().find(|(size, _)| *size == key) {
            Some((_, quantity)) => *quantity += 1,
            None => sizes.push((key, 1)),
        }
    }

    let mut pieces = Vec::new();
    let mut fabrics = Vec::with_capacity(fabric_order.len());
    for id in fabric_order {
        let mut fabric_pieces: Vec<CutPiece> = groups
            .remove(id)
            .unwrap_or_default()
            .into_iter()
            .map(|((w, h), quantity)| CutPiece {
                fabric_id: id.to_string(),
                cut_width_in: cut_length_in(w, block_size, seam),
                cut_height_in: cut_length_in(h, block_size, seam),
                quantity,
            })
            .collect();
        // Stable, so equal areas keep first-appearance order.
        fabric_pieces.sort_by(|a, b| b.area_sqin().total_cmp(&a.area_sqin()));

        let total_area_sqin: f64 = fabric_pieces.iter().map(CutPiece::total_area_sqin).sum();
        let yardage_exact = yards_for_area(total_area_sqin, measurement);
        let (display_name, color) = match pattern.fabric(id) {
            Some(f) => (f.display_name.clone(), f.color),
            None => (id.to_string(), UNKNOWN_FABRIC_COLOR),
        };

        fabrics.push(FabricRequirement {
            fabric_id: id.to_string(),
            display_name,
            color,
            piece_count: fabric_pieces.iter().map(|p| p.quantity).sum(),
            total_area_sqin,
            fat_quarters: fat_quarters_for(total_area_sqin, measurement),
            yardage_exact,
            yardage: ceil_to_increment(yardage_exact, measurement.purchase_increment_yd),
            strip_yardage: strip_yardage(&fabric_pieces, measurement),
        });
        pieces.extend(fabric_pieces);
    }

    log::debug!(
        "Cutting chart: {} piece sizes over {} fabrics",
        pieces.len(),
        fabrics.len()
    );

    CuttingChart {
        block_size_in: block_size,
        seam_allowance_in: seam,
        cut_size_in: cut_length_in(1, block_size, seam),
        pieces,
        fabrics,
    }
}

/// Yardage when each piece size is cut from strips across the bolt width:
/// a strip is as tall as the piece and holds `floor(WOF / cut width)` pieces.
pub fn strip_yardage(pieces: &[CutPiece], measurement: &MeasurementConfig) -> f64 {
    let total_inches: f64 = pieces
        .iter()
        .map(|piece| {
            let fits_across = (measurement.fabric_width_in / piece.cut_width_in).floor().max(1.0);
            let strips = (piece.quantity as f64 / fits_across).ceil();
            strips * piece.cut_height_in
        })
        .sum();
    ceil_to_increment(
        total_inches * measurement.waste_factor / INCHES_PER_YARD,
        measurement.purchase_increment_yd,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Block, Fabric};

    fn two_fabric_pattern() -> QuiltPattern {
        let mut pattern = QuiltPattern::new(4, 4, 2.0, 0.25);
        pattern.fabrics = vec![
            Fabric::new("f1", Rgb::new(200, 30, 30), "Kona Cotton - Red"),
            Fabric::new("f2", Rgb::new(30, 30, 200), "Kona Cotton - Blue"),
        ];
        pattern.blocks = vec![Block::new(0, 0, 2, 4, "f1"), Block::new(2, 0, 2, 4, "f2")];
        pattern
    }

    #[test]
    fn test_cut_length_adds_seams() {
        assert_eq!(cut_length_in(1, 2.5, 0.25), 3.0);
        assert_eq!(cut_length_in(4, 2.0, 0.25), 8.5);
        assert_eq!(cut_area_sqin(2, 4, 2.0, 0.25), 4.5 * 8.5);
    }

    #[test]
    fn test_two_halves_chart() {
        let chart = to_cutting_chart(&two_fabric_pattern(), &MeasurementConfig::default());
        assert_eq!(chart.cut_size_in, 2.5);
        assert_eq!(
            chart.pieces,
            vec![
                CutPiece {
                    fabric_id: "f1".to_string(),
                    cut_width_in: 4.5,
                    cut_height_in: 8.5,
                    quantity: 1
                },
                CutPiece {
                    fabric_id: "f2".to_string(),
                    cut_width_in: 4.5,
                    cut_height_in: 8.5,
                    quantity: 1
                },
            ]
        );
        assert_eq!(chart.total_pieces(), 2);
        assert_eq!(chart.fabrics[0].total_area_sqin, 38.25);
        assert_eq!(chart.fabrics[0].fat_quarters, 1);
        assert_eq!(chart.fabrics[0].yardage, 0.25);
    }

    #[test]
    fn test_measurement_law_holds_for_every_piece() {
        let mut pattern = two_fabric_pattern();
        pattern.block_size_in = 3.5;
        pattern.seam_allowance_in = 0.375;
        pattern.blocks = vec![
            Block::new(0, 0, 3, 1, "f1"),
            Block::new(3, 0, 1, 4, "f2"),
            Block::new(0, 1, 3, 3, "f1"),
        ];
        let chart = to_cutting_chart(&pattern, &MeasurementConfig::default());
        for piece in &chart.pieces {
            let w_cells = ((piece.cut_width_in - 0.75) / 3.5).round();
            let h_cells = ((piece.cut_height_in - 0.75) / 3.5).round();
            assert!((piece.cut_width_in - (w_cells * 3.5 + 0.75)).abs() < 1e-9);
            assert!((piece.cut_height_in - (h_cells * 3.5 + 0.75)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_groups_equal_sizes_and_sorts_by_area() {
        let mut pattern = QuiltPattern::new(6, 2, 2.0, 0.25);
        pattern.fabrics = vec![Fabric::new("f1", Rgb::WHITE, "White")];
        pattern.blocks = vec![
            Block::new(0, 0, 1, 1, "f1"),
            Block::new(1, 0, 2, 2, "f1"),
            Block::new(0, 1, 1, 1, "f1"),
            Block::new(3, 0, 3, 2, "f1"),
        ];
        let chart = to_cutting_chart(&pattern, &MeasurementConfig::default());
        let sizes: Vec<(f64, f64, u32)> = chart
            .pieces
            .iter()
            .map(|p| (p.cut_width_in, p.cut_height_in, p.quantity))
            .collect();
        assert_eq!(sizes, vec![(6.5, 4.5, 1), (4.5, 4.5, 1), (2.5, 2.5, 2)]);
        assert_eq!(chart.total_pieces(), 4);
        assert_eq!(chart.fabrics[0].piece_count, 4);
    }

    #[test]
    fn test_fabric_order_follows_blocks() {
        let mut pattern = two_fabric_pattern();
        pattern.blocks.reverse();
        let chart = to_cutting_chart(&pattern, &MeasurementConfig::default());
        let order: Vec<&str> = chart.by_fabric().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["f2", "f1"]);
        assert_eq!(chart.fabrics[0].fabric_id, "f2");
    }

    #[test]
    fn test_unknown_fabric_still_counted() {
        let mut pattern = two_fabric_pattern();
        pattern.blocks[1].fabric_id = "ghost".to_string();
        let chart = to_cutting_chart(&pattern, &MeasurementConfig::default());
        let ghost = chart.requirement("ghost").unwrap();
        assert_eq!(ghost.display_name, "ghost");
        assert_eq!(ghost.color, Rgb::new(0x88, 0x88, 0x88));
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(ceil_to_increment(0.26, 0.25), 0.5);
        assert_eq!(ceil_to_increment(0.5, 0.25), 0.5);
        assert_eq!(ceil_to_increment(0.0, 0.25), 0.0);

        let m = MeasurementConfig::default();
        assert_eq!(fat_quarters_for(378.0, &m), 1);
        assert_eq!(fat_quarters_for(378.5, &m), 2);
        assert_eq!(fat_quarters_for(0.0, &m), 0);
    }

    #[test]
    fn test_strip_yardage() {
        let m = MeasurementConfig::default();
        // 42" bolt holds nine 4.5" pieces per strip: 10 pieces need 2 strips of 8.5".
        let pieces = vec![CutPiece {
            fabric_id: "f1".to_string(),
            cut_width_in: 4.5,
            cut_height_in: 8.5,
            quantity: 10,
        }];
        assert_eq!(strip_yardage(&pieces, &m), 0.5);

        // Wider than the bolt still takes one piece per strip.
        let wide = vec![CutPiece {
            fabric_id: "f1".to_string(),
            cut_width_in: 60.0,
            cut_height_in: 36.0,
            quantity: 1,
        }];
        assert_eq!(strip_yardage(&wide, &m), 1.0);
    }

    #[test]
    fn test_waste_factor_pads_purchases_only() {
        let pattern = two_fabric_pattern();
        let exact = to_cutting_chart(&pattern, &MeasurementConfig::default());
        let padded = to_cutting_chart(
            &pattern,
            &MeasurementConfig {
                waste_factor: 1.1,
                ..MeasurementConfig::default()
            },
        );
        assert_eq!(padded.pieces, exact.pieces);
        assert_eq!(padded.fabrics[0].total_area_sqin, 38.25);
        let expected = exact.fabrics[0].yardage_exact * 1.1;
        assert!((padded.fabrics[0].yardage_exact - expected).abs() < 1e-12);

        // 350 sq in fits one fat quarter (378) only without waste.
        let m = MeasurementConfig::default();
        assert_eq!(fat_quarters_for(350.0, &m), 1);
        let m = MeasurementConfig {
            waste_factor: 1.1,
            ..m
        };
        assert_eq!(fat_quarters_for(350.0, &m), 2);

        // Nine strips of 4" is exactly 1 yd; 10% more rounds up to 1.25.
        let pieces = vec![CutPiece {
            fabric_id: "f1".to_string(),
            cut_width_in: 42.0,
            cut_height_in: 4.0,
            quantity: 9,
        }];
        assert_eq!(strip_yardage(&pieces, &MeasurementConfig::default()), 1.0);
        assert_eq!(strip_yardage(&pieces, &m), 1.25);
    }

    #[test]
    fn test_cutting_instructions() {
        let chart = to_cutting_chart(&two_fabric_pattern(), &MeasurementConfig::default());
        let lines = chart.cutting_instructions();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "### Kona Cotton - Red (#C81E1E)");
        assert_eq!(
            lines[1],
            "Total needed: ~38 sq in (1 fat quarter or 0.25 yd WOF)"
        );
        assert_eq!(lines[2], "  • Cut 1× pieces 4.5\" × 8.5\"");
    }
}
