//! Typed mirror of the Pollen API `forecast:lookup` response.
//!
//! Every field is optional: the upstream payload is allowed to omit anything,
//! and normalization degrades to null/absent instead of failing. Unknown
//! fields are ignored by serde.

use serde::{Deserialize, Serialize};

/// Top-level response body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResponse {
    pub region_code: Option<String>,
    #[serde(default)]
    pub daily_info: Vec<DailyInfo>,
}

/// One day's slice of the forecast.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyInfo {
    pub date: Option<ApiDate>,
    #[serde(default)]
    pub pollen_type_info: Vec<PollenInfo>,
    #[serde(default)]
    pub plant_info: Vec<PollenInfo>,
}

/// Calendar date as sent by the API (proto-style year/month/day triple).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiDate {
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl ApiDate {
    /// Format as `YYYY-MM-DD`, or None when any component is missing.
    pub fn to_iso(self) -> Option<String> {
        match (self.year, self.month, self.day) {
            (Some(y), Some(m), Some(d)) => Some(format!("{:04}-{:02}-{:02}", y, m, d)),
            _ => None,
        }
    }
}

/// A pollen type or plant entry within one day.
///
/// Types and plants share this shape; only plants carry `plant_description`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollenInfo {
    pub code: Option<String>,
    pub display_name: Option<String>,
    pub in_season: Option<bool>,
    #[serde(default)]
    pub health_recommendations: Vec<String>,
    pub index_info: Option<IndexInfo>,
    pub plant_description: Option<PlantDescription>,
}

/// The Universal Pollen Index report for one entity on one day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub value: Option<i64>,
    pub category: Option<String>,
    pub index_description: Option<String>,
    pub color: Option<ApiColor>,
}

/// Per-index color; channels arrive in either 0..1 or 0..255 scale, and any
/// subset of channels may be present.
///
/// Also serialized verbatim into sensor records as `color_raw`, so absent
/// channels are skipped rather than emitted as null.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct ApiColor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub green: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blue: Option<f64>,
}

/// Taxonomic metadata carried only by plant entries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDescription {
    #[serde(rename = "type")]
    pub plant_type: Option<String>,
    pub family: Option<String>,
    pub season: Option<String>,
    pub cross_reaction: Option<String>,
    pub picture: Option<String>,
    pub picture_closeup: Option<String>,
}
