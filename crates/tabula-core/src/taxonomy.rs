//! Marker identifier taxonomy.
//!
//! Marker IDs are partitioned into disjoint, contiguous ranges configured at
//! startup: calibration corners, player markers, item markers, and an
//! open-ended custom space above the declared ranges. Classification is
//! total — any ID outside every declared range is [`MarkerCategory::Custom`].
//!
//! Corner markers are calibration-only and must never reach entity
//! resolution; the bridge controller filters them before dispatch.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Semantic class a marker identifier belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerCategory {
    /// Calibration corner marker, never bound to an entity.
    Corner,
    /// Player token marker.
    Player,
    /// Item / NPC token marker.
    Item,
    /// Anything outside the declared ranges.
    Custom,
}

impl MarkerCategory {
    /// Capitalized label used in generated display names.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Corner => "Corner",
            Self::Player => "Player",
            Self::Item => "Item",
            Self::Custom => "Custom",
        }
    }
}

impl fmt::Display for MarkerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Corner => "corner",
            Self::Player => "player",
            Self::Item => "item",
            Self::Custom => "custom",
        })
    }
}

/// Inclusive range of marker identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRange {
    /// First ID in the range.
    pub start: u32,
    /// Last ID in the range (inclusive).
    pub end: u32,
}

impl MarkerRange {
    /// Construct an inclusive range.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether `id` falls inside the range.
    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        id >= self.start && id <= self.end
    }

    /// Whether two inclusive ranges share any identifier.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Range configuration for the taxonomy.
///
/// Defaults match the standard small-marker schema: corners 0–3, sixteen
/// player markers at 10–25, thirty-two item markers at 30–61 with a fixed
/// name table, everything else custom.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    /// Calibration corner range.
    #[serde(default = "default_corner_range")]
    pub corner: MarkerRange,
    /// Player marker range.
    #[serde(default = "default_player_range")]
    pub player: MarkerRange,
    /// Item marker range.
    #[serde(default = "default_item_range")]
    pub item: MarkerRange,
    /// Fixed display names for item IDs. IDs without an entry fall back to
    /// `Item_{id}`.
    #[serde(default = "default_item_names")]
    pub item_names: HashMap<u32, String>,
}

fn default_corner_range() -> MarkerRange {
    MarkerRange::new(0, 3)
}
fn default_player_range() -> MarkerRange {
    MarkerRange::new(10, 25)
}
fn default_item_range() -> MarkerRange {
    MarkerRange::new(30, 61)
}

fn default_item_names() -> HashMap<u32, String> {
    let names: &[(u32, &str)] = &[
        (30, "Goblin"),
        (31, "Orc"),
        (32, "Skeleton"),
        (33, "Dragon"),
        (34, "Troll"),
        (35, "Wizard_Enemy"),
        (36, "Beast"),
        (37, "Demon"),
        (40, "Treasure_Chest"),
        (41, "Magic_Item"),
        (42, "Gold_Pile"),
        (43, "Potion"),
        (44, "Weapon"),
        (45, "Armor"),
        (46, "Scroll"),
        (47, "Key"),
        (50, "NPC_Merchant"),
        (51, "NPC_Guard"),
        (52, "NPC_Noble"),
        (53, "NPC_Innkeeper"),
        (54, "NPC_Priest"),
        (55, "Door"),
        (56, "Trap"),
        (57, "Fire_Hazard"),
        (58, "Altar"),
        (59, "Portal"),
        (60, "Vehicle"),
        (61, "Objective"),
    ];
    names
        .iter()
        .map(|(id, name)| (*id, (*name).to_owned()))
        .collect()
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            corner: default_corner_range(),
            player: default_player_range(),
            item: default_item_range(),
            item_names: default_item_names(),
        }
    }
}

/// Classifier and display-name generator over a validated [`TaxonomyConfig`].
#[derive(Clone, Debug)]
pub struct MarkerTaxonomy {
    config: TaxonomyConfig,
}

impl MarkerTaxonomy {
    /// Validate the configured ranges and build a taxonomy.
    ///
    /// Rejects empty ranges and any pair of overlapping ranges. This is a
    /// fatal configuration error for the bridge instance.
    pub fn new(config: TaxonomyConfig) -> Result<Self, ConfigError> {
        let labeled = [
            ("corner", config.corner),
            ("player", config.player),
            ("item", config.item),
        ];
        for (label, range) in labeled {
            if range.end < range.start {
                return Err(ConfigError::EmptyRange {
                    label: label.into(),
                    start: range.start,
                    end: range.end,
                });
            }
        }
        for i in 0..labeled.len() {
            for (label_b, range_b) in &labeled[i + 1..] {
                let (label_a, range_a) = labeled[i];
                if range_a.overlaps(range_b) {
                    return Err(ConfigError::OverlappingRanges {
                        a: label_a.into(),
                        b: (*label_b).into(),
                    });
                }
            }
        }
        Ok(Self { config })
    }

    /// Build a taxonomy over the default schema.
    #[must_use]
    pub fn standard() -> Self {
        // Default ranges are disjoint by construction.
        Self {
            config: TaxonomyConfig::default(),
        }
    }

    /// Classify a marker identifier. Total: unknown IDs are `Custom`.
    #[must_use]
    pub fn classify(&self, marker_id: u32) -> MarkerCategory {
        if self.config.corner.contains(marker_id) {
            MarkerCategory::Corner
        } else if self.config.player.contains(marker_id) {
            MarkerCategory::Player
        } else if self.config.item.contains(marker_id) {
            MarkerCategory::Item
        } else {
            MarkerCategory::Custom
        }
    }

    /// Deterministic human-readable label for a marker.
    ///
    /// Players are numbered by their ordinal inside the player range
    /// (`Player_01` …), items use the configured name table with an
    /// `Item_{id}` fallback, everything else is `{Category}_{id}`.
    #[must_use]
    pub fn display_name(&self, marker_id: u32) -> String {
        match self.classify(marker_id) {
            MarkerCategory::Player => {
                let ordinal = marker_id - self.config.player.start + 1;
                format!("Player_{ordinal:02}")
            }
            MarkerCategory::Item => self
                .config
                .item_names
                .get(&marker_id)
                .cloned()
                .unwrap_or_else(|| format!("Item_{marker_id}")),
            category => format!("{}_{marker_id}", category.label()),
        }
    }
}
