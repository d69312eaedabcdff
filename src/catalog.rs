//! Solid-fabric reference catalog and nearest-color matching.
//!
//! The catalog is immutable once built; the default one lives in a process-wide
//! `OnceLock` and is shared by reference across every extraction.

use crate::color::{nearest_index, Rgb};
use palette::{white_point::D65, Lab};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Catalog entry with its precomputed LAB value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub name: String,
    pub color: Rgb,
    #[serde(skip)]
    pub lab: [f32; 3],
}

/// Entry shape accepted by [`FabricCatalog::from_json_str`]
#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    hex: String,
}

/// Solid cotton catalog (~160 colors)
/// Each entry: (name, hex)
const SOLIDS_CATALOG: &[(&str, &str)] = &[
    // Whites & Neutrals
    ("Kona Cotton - White", "#F5F5F5"),
    ("Kona Cotton - Snow", "#FAFAF7"),
    ("Kona Cotton - Bone", "#EDE6D6"),
    ("Kona Cotton - Ivory", "#F8F0E0"),
    ("Kona Cotton - Natural", "#E8DCC0"),
    ("Kona Cotton - Cream", "#F5F0DC"),
    ("Kona Cotton - Eggshell", "#F2EAD3"),
    ("Kona Cotton - Champagne", "#EBDDC2"),
    ("Kona Cotton - Parchment", "#E4D7B8"),
    ("Kona Cotton - Sand", "#C8B585"),
    ("Kona Cotton - Khaki", "#C4B98A"),
    ("Kona Cotton - Stone", "#A8A193"),
    ("Kona Cotton - Taupe", "#8E8070"),
    ("Kona Cotton - Mushroom", "#A08070"),
    // Blacks & Grays
    ("Kona Cotton - Black", "#1A1A1A"),
    ("Kona Cotton - Coal", "#2B2B2D"),
    ("Kona Cotton - Pepper", "#38383A"),
    ("Kona Cotton - Charcoal", "#4A4A4A"),
    ("Kona Cotton - Graphite", "#555759"),
    ("Kona Cotton - Iron", "#6A6C6E"),
    ("Kona Cotton - Steel", "#7D8285"),
    ("Kona Cotton - Medium Grey", "#8E8E8E"),
    ("Kona Cotton - Shadow", "#9C9EA0"),
    ("Kona Cotton - Ash", "#B3B3AF"),
    ("Kona Cotton - Silver", "#C5C7C8"),
    ("Kona Cotton - Titanium", "#D3D4D2"),
    ("Kona Cotton - Fog", "#9EADB5"),
    ("Kona Cotton - Overcast", "#B8C1C6"),
    ("Kona Cotton - Slate", "#5E6B75"),
    ("Kona Cotton - Storm", "#4D5660"),
    // Reds
    ("Kona Cotton - Red", "#C8202F"),
    ("Kona Cotton - Tomato", "#C43428"),
    ("Kona Cotton - Crimson", "#A51D2D"),
    ("Kona Cotton - Rich Red", "#B01E2A"),
    ("Kona Cotton - Chinese Red", "#D6312B"),
    ("Kona Cotton - Flame", "#E0452A"),
    ("Kona Cotton - Poppy", "#E5533D"),
    ("Kona Cotton - Paprika", "#B5432E"),
    ("Kona Cotton - Bordeaux", "#7A1F2E"),
    ("Kona Cotton - Wine", "#6B1C2A"),
    ("Kona Cotton - Cardinal", "#961B2E"),
    ("Kona Cotton - Garnet", "#86202E"),
    ("Kona Cotton - Ruby", "#9E1638"),
    ("Kona Cotton - Pomegranate", "#B8203F"),
    ("Kona Cotton - Cayenne", "#A33524"),
    // Pinks
    ("Kona Cotton - Pink", "#F2B8C6"),
    ("Kona Cotton - Carnation", "#F29BB0"),
    ("Kona Cotton - Blush Pink", "#F5CFD3"),
    ("Kona Cotton - Peony", "#E87A98"),
    ("Kona Cotton - Candy Pink", "#F0A0BC"),
    ("Kona Cotton - Bubble Gum", "#EE8CB4"),
    ("Kona Cotton - Rose", "#D87090"),
    ("Kona Cotton - Dusty Rose", "#C98B95"),
    ("Kona Cotton - Petal", "#F6D6DC"),
    ("Kona Cotton - Baby Pink", "#F9DDE4"),
    ("Kona Cotton - Sweet Pea", "#E6B3C8"),
    ("Kona Cotton - Flamingo", "#F07F8E"),
    ("Kona Cotton - Fuchsia", "#C42A7C"),
    ("Kona Cotton - Magenta", "#B3246E"),
    ("Kona Cotton - Azalea", "#D8467E"),
    ("Kona Cotton - Raspberry", "#B02856"),
    ("Kona Cotton - Berry", "#8E2450"),
    ("Kona Cotton - Hibiscus", "#C9305D"),
    // Oranges
    ("Kona Cotton - Orange", "#EE7623"),
    ("Kona Cotton - Tangerine", "#E87535"),
    ("Kona Cotton - Papaya", "#F49A52"),
    ("Kona Cotton - Kumquat", "#F3A33A"),
    ("Kona Cotton - Persimmon", "#E05A2B"),
    ("Kona Cotton - Pumpkin", "#D9661F"),
    ("Kona Cotton - Carrot", "#E86A28"),
    ("Kona Cotton - Mango", "#F6A33D"),
    ("Kona Cotton - Creamsicle", "#F8B878"),
    ("Kona Cotton - Peach", "#F7C2A0"),
    ("Kona Cotton - Salmon", "#F08E7A"),
    ("Kona Cotton - Coral", "#E8705A"),
    ("Kona Cotton - Melon", "#F59A83"),
    ("Kona Cotton - Apricot", "#F4B183"),
    ("Kona Cotton - Cantaloupe", "#F7B98F"),
    ("Kona Cotton - Nectarine", "#EF8A5B"),
    // Yellows
    ("Kona Cotton - Yellow", "#F7D117"),
    ("Kona Cotton - Lemon", "#F9E548"),
    ("Kona Cotton - Canary", "#FBE26B"),
    ("Kona Cotton - Daffodil", "#F8DC7A"),
    ("Kona Cotton - Corn Yellow", "#F4C430"),
    ("Kona Cotton - Maize", "#F0C040"),
    ("Kona Cotton - Gold", "#D4A42A"),
    ("Kona Cotton - Sunflower", "#F3B61F"),
    ("Kona Cotton - Butter", "#FBEBA5"),
    ("Kona Cotton - Banana", "#F9E27D"),
    ("Kona Cotton - Buttercup", "#F6D54E"),
    ("Kona Cotton - Mustard", "#C9A227"),
    ("Kona Cotton - Curry", "#C89B2B"),
    ("Kona Cotton - Honey", "#DDA23D"),
    ("Kona Cotton - Citrine", "#E6D14A"),
    // Greens
    ("Kona Cotton - Grass", "#4A7C3F"),
    ("Kona Cotton - Lime", "#98C44A"),
    ("Kona Cotton - Kelly", "#2E8B3E"),
    ("Kona Cotton - Clover", "#3C8D4A"),
    ("Kona Cotton - Leaf", "#6BA23E"),
    ("Kona Cotton - Peapod", "#8AB04B"),
    ("Kona Cotton - Chartreuse", "#B5CC2E"),
    ("Kona Cotton - Celery", "#CBD98C"),
    ("Kona Cotton - Pistachio", "#B8C98C"),
    ("Kona Cotton - Sage", "#8A9E7E"),
    ("Kona Cotton - Olive", "#6B6B2E"),
    ("Kona Cotton - Moss", "#6E7B3C"),
    ("Kona Cotton - Fern", "#5C7F4A"),
    ("Kona Cotton - Jade Green", "#3E9E7A"),
    ("Kona Cotton - Emerald", "#1E7B57"),
    ("Kona Cotton - Forest", "#2D5A3A"),
    ("Kona Cotton - Evergreen", "#24503E"),
    ("Kona Cotton - Pine", "#2F4F3A"),
    ("Kona Cotton - Hunter Green", "#2A4634"),
    ("Kona Cotton - Spring", "#A8D08D"),
    ("Kona Cotton - Mint", "#B8E0C8"),
    ("Kona Cotton - Seafoam", "#A4D4C0"),
    ("Kona Cotton - Celadon", "#B3CDB4"),
    ("Kona Cotton - Avocado", "#7E8A3A"),
    ("Kona Cotton - Cactus", "#5E7A5A"),
    // Teals & Aquas
    ("Kona Cotton - Teal", "#2A7A6E"),
    ("Kona Cotton - Aqua", "#40B4B0"),
    ("Kona Cotton - Turquoise", "#2FA8A8"),
    ("Kona Cotton - Lagoon", "#1F8A8F"),
    ("Kona Cotton - Caribbean", "#1A9AA0"),
    ("Kona Cotton - Peacock", "#1C6B74"),
    ("Kona Cotton - Breakers", "#3E9FB3"),
    ("Kona Cotton - Glacier", "#BFE0E3"),
    // Blues
    ("Kona Cotton - Navy", "#1B2D5B"),
    ("Kona Cotton - Nautical", "#22325E"),
    ("Kona Cotton - Midnight", "#1A2140"),
    ("Kona Cotton - Royal", "#2A4B9B"),
    ("Kona Cotton - Cobalt", "#2C5FA6"),
    ("Kona Cotton - Blueprint", "#2B4A7E"),
    ("Kona Cotton - Delft", "#4A6FA5"),
    ("Kona Cotton - Denim", "#4F6D8F"),
    ("Kona Cotton - Dusty Blue", "#6B8FA8"),
    ("Kona Cotton - Sky", "#7DB8D8"),
    ("Kona Cotton - Baby Blue", "#B7D6EA"),
    ("Kona Cotton - Robin Egg", "#9FD3D6"),
    ("Kona Cotton - Azure", "#3B8FD0"),
    ("Kona Cotton - Cornflower", "#6A8FD1"),
    ("Kona Cotton - Periwinkle", "#7080C0"),
    ("Kona Cotton - Bluebell", "#8896CF"),
    ("Kona Cotton - Windsor", "#3A4E8A"),
    ("Kona Cotton - Ice Frappe", "#D2E4EC"),
    ("Kona Cotton - Lake", "#4C7FA0"),
    ("Kona Cotton - Capri", "#2D8FBF"),
    ("Kona Cotton - Pacific", "#1F6C9A"),
    ("Kona Cotton - Ocean", "#24567A"),
    // Purples
    ("Kona Cotton - Purple", "#5E2D79"),
    ("Kona Cotton - Eggplant", "#4A2060"),
    ("Kona Cotton - Plum", "#6B2B5A"),
    ("Kona Cotton - Amethyst", "#7E4A9A"),
    ("Kona Cotton - Violet", "#7A4FA0"),
    ("Kona Cotton - Lavender", "#A080C0"),
    ("Kona Cotton - Lilac", "#C3A6D3"),
    ("Kona Cotton - Orchid", "#B57BB8"),
    ("Kona Cotton - Mulberry", "#7D2D5E"),
    ("Kona Cotton - Grape", "#5A2A6A"),
    ("Kona Cotton - Pansy", "#4E2F7E"),
    ("Kona Cotton - Thistle", "#CDB4D6"),
    ("Kona Cotton - Wisteria", "#9A8FC4"),
    // Browns
    ("Kona Cotton - Brown", "#6B4226"),
    ("Kona Cotton - Chocolate", "#5E3A1E"),
    ("Kona Cotton - Espresso", "#3B2518"),
    ("Kona Cotton - Earth", "#5A4632"),
    ("Kona Cotton - Cocoa", "#7A5238"),
    ("Kona Cotton - Coffee", "#6F4E37"),
    ("Kona Cotton - Cinnamon", "#9C5A2E"),
    ("Kona Cotton - Rust", "#A04A24"),
    ("Kona Cotton - Terracotta", "#B85A41"),
    ("Kona Cotton - Copper", "#B06A3A"),
    ("Kona Cotton - Caramel", "#B77B3F"),
    ("Kona Cotton - Camel", "#C19A6B"),
    ("Kona Cotton - Tan", "#C8A57A"),
    ("Kona Cotton - Chestnut", "#7E3F26"),
    ("Kona Cotton - Leather", "#8A5A3A"),
];

/// Small fallback palette used when a catalog is missing or empty.
const FALLBACK_CATALOG: &[(&str, &str)] = &[
    ("Kona Cotton - Black", "#1A1A1A"),
    ("Kona Cotton - White", "#F5F5F5"),
    ("Kona Cotton - Cream", "#F5F0DC"),
    ("Kona Cotton - Navy", "#1B2D5B"),
    ("Kona Cotton - Cobalt", "#2C5FA6"),
    ("Kona Cotton - Sky", "#7DB8D8"),
    ("Kona Cotton - Grass", "#4A7C3F"),
    ("Kona Cotton - Lime", "#98C44A"),
    ("Kona Cotton - Tomato", "#C43428"),
    ("Kona Cotton - Tangerine", "#E87535"),
    ("Kona Cotton - Gold", "#D4A42A"),
    ("Kona Cotton - Sand", "#C8B585"),
    ("Kona Cotton - Chocolate", "#5E3A1E"),
    ("Kona Cotton - Charcoal", "#4A4A4A"),
    ("Kona Cotton - Fog", "#9EADB5"),
    ("Kona Cotton - Dusty Blue", "#6B8FA8"),
    ("Kona Cotton - Sage", "#8A9E7E"),
    ("Kona Cotton - Khaki", "#C4B98A"),
    ("Kona Cotton - Mushroom", "#A08070"),
    ("Kona Cotton - Eggplant", "#4A2060"),
    ("Kona Cotton - Bordeaux", "#7A1F2E"),
    ("Kona Cotton - Teal", "#2A7A6E"),
    ("Kona Cotton - Aqua", "#40B4B0"),
    ("Kona Cotton - Maize", "#F0C040"),
    ("Kona Cotton - Coral", "#E8705A"),
    ("Kona Cotton - Rose", "#D87090"),
    ("Kona Cotton - Lavender", "#A080C0"),
    ("Kona Cotton - Periwinkle", "#7080C0"),
    ("Kona Cotton - Ivory", "#F8F0E0"),
    ("Kona Cotton - Natural", "#E8DCC0"),
];

/// Immutable fabric color catalog with precomputed LAB values
#[derive(Debug, Clone)]
pub struct FabricCatalog {
    entries: Vec<PaletteEntry>,
    labs: Vec<Lab<D65, f32>>,
}

static DEFAULT_CATALOG: OnceLock<FabricCatalog> = OnceLock::new();

impl FabricCatalog {
    /// The default solids catalog, built on first use.
    pub fn global() -> &'static Self {
        DEFAULT_CATALOG.get_or_init(|| Self::from_table(SOLIDS_CATALOG))
    }

    /// The built-in fallback subset.
    pub fn fallback() -> Self {
        Self::from_table(FALLBACK_CATALOG)
    }

    fn from_table(table: &[(&str, &str)]) -> Self {
        let entries = table
            .iter()
            .filter_map(|(name, hex)| {
                Rgb::from_hex(hex).map(|color| (name.to_string(), color))
            })
            .collect();
        Self::from_entries(entries)
    }

    /// Build a catalog from `(name, color)` pairs, in declaration order.
    /// An empty list yields the fallback catalog.
    pub fn from_entries(entries: Vec<(String, Rgb)>) -> Self {
        if entries.is_empty() {
            log::warn!("Fabric catalog is empty, using built-in fallback palette");
            return Self::fallback();
        }

        let entries: Vec<PaletteEntry> = entries
            .into_iter()
            .map(|(name, color)| {
                let lab = color.to_lab();
                PaletteEntry {
                    name,
                    color,
                    lab: [lab.l, lab.a, lab.b],
                }
            })
            .collect();

        let labs = entries
            .iter()
            .map(|e| Lab::new(e.lab[0], e.lab[1], e.lab[2]))
            .collect();

        Self { entries, labs }
    }

    /// Parse a JSON array of `{"name": ..., "hex": ...}` objects.
    ///
    /// Never fails: malformed JSON or an empty list falls back to the built-in
    /// subset, and entries with unparseable hex values are skipped.
    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<Vec<RawEntry>>(raw) {
            Ok(raw_entries) => {
                let entries = raw_entries
                    .into_iter()
                    .filter_map(|e| match Rgb::from_hex(&e.hex) {
                        Some(color) => Some((e.name, color)),
                        None => {
                            log::warn!(
                                "Skipping catalog entry '{}' with bad hex '{}'",
                                e.name,
                                e.hex
                            );
                            None
                        }
                    })
                    .collect();
                Self::from_entries(entries)
            }
            Err(err) => {
                log::warn!(
                    "Could not parse fabric catalog ({err}), using built-in fallback palette"
                );
                Self::fallback()
            }
        }
    }

    /// Load a catalog file, falling back to the built-in subset when unreadable.
    pub fn from_json_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(err) => {
                log::warn!(
                    "Could not read fabric catalog {} ({err}), using built-in fallback palette",
                    path.display()
                );
                Self::fallback()
            }
        }
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the closest catalog color by Euclidean distance in CIELAB.
    /// Ties resolve to the entry declared first.
    pub fn find_closest(&self, color: Rgb) -> &PaletteEntry {
        let idx = nearest_index(color.to_lab(), &self.labs);
        &self.entries[idx]
    }

    pub fn match_name(&self, color: Rgb) -> &str {
        &self.find_closest(color).name
    }
}
