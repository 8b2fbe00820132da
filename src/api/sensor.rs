//! Canonical sensor output model.
//!
//! The normalizer turns one raw payload into a `BTreeMap<String, SensorRecord>`
//! keyed by stable identifiers (`type_grass`, `plants_BIRCH`, `region`, ...).
//! The whole map is rebuilt on every successful fetch and swapped into the
//! published [`Snapshot`] atomically; a failed fetch leaves the previous
//! snapshot untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::api::types::ApiColor;

/// Published output of one pipeline instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub sensors: SensorMap,
    pub last_updated: Option<DateTime<Utc>>,
}

pub type SensorMap = BTreeMap<String, SensorRecord>;

/// One entry of the sensor map, tagged by origin.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "source")]
pub enum SensorRecord {
    /// Scalar metadata (`region`, `date`).
    #[serde(rename = "meta")]
    Meta { value: String },
    /// A broad pollen category (grass, tree, weed), or one of its per-day
    /// sibling sensors.
    #[serde(rename = "type")]
    Type(TypeRecord),
    /// A named species with taxonomic metadata.
    #[serde(rename = "plant")]
    Plant(PlantRecord),
}

/// Trend of today's index versus tomorrow's.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Derived color representation. All three views of the same source color:
/// hex string, normalized RGB triple, and the raw channel dict as received.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ColorFields {
    pub color_hex: Option<String>,
    pub color_rgb: Option<[u8; 3]>,
    pub color_raw: Option<ApiColor>,
}

/// One per-offset forecast entry (offset 1 = tomorrow).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ForecastEntry {
    pub offset: u8,
    pub date: Option<String>,
    /// Whether the API reported a structured index for this day, distinct
    /// from the index being present-but-zero.
    pub has_index: bool,
    pub value: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub color: ColorFields,
}

/// The forecast entry with the highest reported index, today excluded.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeakEntry {
    pub offset: u8,
    pub date: Option<String>,
    pub value: i64,
    pub category: Option<String>,
}

/// Forecast-derived attributes shared by type and plant records: the
/// forecast list, tomorrow/D+2 convenience mirrors, trend, expected peak.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ForecastAttributes {
    pub forecast: Vec<ForecastEntry>,
    pub tomorrow_has_index: bool,
    pub tomorrow_value: Option<i64>,
    pub tomorrow_category: Option<String>,
    pub tomorrow_description: Option<String>,
    pub tomorrow_color_hex: Option<String>,
    pub d2_has_index: bool,
    pub d2_value: Option<i64>,
    pub d2_category: Option<String>,
    pub d2_description: Option<String>,
    pub d2_color_hex: Option<String>,
    pub trend: Option<Trend>,
    pub expected_peak: Option<PeakEntry>,
}

/// Main or per-day record for a pollen type.
///
/// Per-day siblings (`type_grass_d1`) reuse this shape with `date` and
/// `has_index` set, an empty forecast list, and default derived attributes.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeRecord {
    pub display_name: String,
    pub value: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub in_season: Option<bool>,
    pub advice: Vec<String>,
    #[serde(flatten)]
    pub color: ColorFields,
    #[serde(flatten)]
    pub attributes: ForecastAttributes,
    /// Only set on per-day sibling records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Only set on per-day sibling records.
    #[serde(rename = "has_index", skip_serializing_if = "Option::is_none")]
    pub has_index: Option<bool>,
}

/// Main record for a plant, keyed by its stable source code.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlantRecord {
    pub code: String,
    pub display_name: String,
    pub value: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub in_season: Option<bool>,
    pub advice: Vec<String>,
    #[serde(rename = "type")]
    pub plant_type: Option<String>,
    pub family: Option<String>,
    pub season: Option<String>,
    #[serde(rename = "cross_reaction")]
    pub cross_reaction: Option<String>,
    pub picture: Option<String>,
    #[serde(rename = "picture_closeup")]
    pub picture_closeup: Option<String>,
    #[serde(flatten)]
    pub color: ColorFields,
    #[serde(flatten)]
    pub attributes: ForecastAttributes,
}

impl SensorRecord {
    /// Source tag as a plain string, mirroring the serialized `source` field.
    pub fn source(&self) -> &'static str {
        match self {
            SensorRecord::Meta { .. } => "meta",
            SensorRecord::Type(_) => "type",
            SensorRecord::Plant(_) => "plant",
        }
    }
}
