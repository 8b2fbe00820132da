//! Forecast normalization engine.
//!
//! Turns one raw [`ForecastResponse`] into the canonical [`SensorMap`]:
//! a stable, complete key space across pollen types and plants, placeholder
//! (skeleton) records for entities missing from today, per-offset forecast
//! entries, and derived trend / expected-peak analytics.
//!
//! Normalization never fails: every lookup defaults to null/absent, so a
//! malformed day degrades to missing fields instead of aborting the cycle.
//! The output map is rebuilt from scratch on every call; normalizing the
//! same payload twice yields identical maps.

use crate::api::sensor::{
    ColorFields, ForecastAttributes, ForecastEntry, PeakEntry, PlantRecord, SensorMap,
    SensorRecord, Trend, TypeRecord,
};
use crate::api::types::{ApiColor, DailyInfo, ForecastResponse, PollenInfo};

/// Normalization parameters, fixed per pipeline instance.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Window length in days, already clamped to [1, 5].
    pub forecast_days: u8,
    /// Create `<type_key>_d1` sibling sensors.
    pub create_d1: bool,
    /// Create `<type_key>_d2` sibling sensors.
    pub create_d2: bool,
}

// --- Color normalization ---

/// Normalize a single channel to 0..=255, accepting 0..1 or 0..255 inputs.
fn normalize_channel(v: f64) -> u8 {
    let scaled = if (0.0..=1.0).contains(&v) { v * 255.0 } else { v };
    scaled.round().clamp(0.0, 255.0) as u8
}

/// Build an RGB triple from the API color.
///
/// No channels present means "no color provided" and yields None. At least
/// one channel present zero-fills the others; a partial color like
/// {green, blue} is preserved, never discarded, and a color is never
/// synthesized from an empty channel dict.
fn rgb_from_api(color: Option<&ApiColor>) -> Option<[u8; 3]> {
    let c = color?;
    if c.red.is_none() && c.green.is_none() && c.blue.is_none() {
        return None;
    }
    Some([
        c.red.map_or(0, normalize_channel),
        c.green.map_or(0, normalize_channel),
        c.blue.map_or(0, normalize_channel),
    ])
}

/// Convert an RGB triple to `#RRGGBB`.
fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Derive all three color views (hex, triple, raw dict) from the API color.
fn color_fields(color: Option<&ApiColor>) -> ColorFields {
    let rgb = rgb_from_api(color);
    ColorFields {
        color_hex: rgb.map(rgb_to_hex),
        color_rgb: rgb,
        color_raw: color.copied(),
    }
}

// --- Per-day lookups (first match wins, payload order) ---

/// Find a type entry by upper-cased code within a day's `pollenTypeInfo`.
fn find_type<'a>(day: &'a DailyInfo, code: &str) -> Option<&'a PollenInfo> {
    day.pollen_type_info
        .iter()
        .find(|item| item.code.as_deref().map(|c| c.to_uppercase()).as_deref() == Some(code))
}

/// Find a plant entry by exact code within a day's `plantInfo`.
fn find_plant<'a>(day: &'a DailyInfo, code: &str) -> Option<&'a PollenInfo> {
    day.plant_info
        .iter()
        .find(|item| item.code.as_deref() == Some(code))
}

/// Collect the universe of codes seen on any day of the window, in first-seen
/// order. An entity that disappears from today but reappears tomorrow still
/// gets exactly one main record.
fn collect_codes<F>(daily: &[DailyInfo], select: F) -> Vec<String>
where
    F: Fn(&DailyInfo) -> &[PollenInfo],
{
    let mut codes: Vec<String> = Vec::new();
    for day in daily {
        for item in select(day) {
            if let Some(code) = item.code.as_deref() {
                if !code.is_empty() && !codes.iter().any(|c| c == code) {
                    codes.push(code.to_string());
                }
            }
        }
    }
    codes
}

// --- Forecast derivation ---

/// Build the per-offset forecast entry for one future day.
///
/// `has_index` is true only when the day carries a structured index object;
/// without it, value/category/description/color stay null but the offset and
/// date are still populated.
fn forecast_entry(offset: u8, day: &DailyInfo, item: Option<&PollenInfo>) -> ForecastEntry {
    let idx = item.and_then(|i| i.index_info.as_ref());
    let has_index = idx.is_some();
    ForecastEntry {
        offset,
        date: day.date.and_then(|d| d.to_iso()),
        has_index,
        value: idx.and_then(|i| i.value),
        category: idx.and_then(|i| i.category.clone()),
        description: idx.and_then(|i| i.index_description.clone()),
        color: idx
            .map(|i| color_fields(i.color.as_ref()))
            .unwrap_or_default(),
    }
}

/// Build the forecast list for one entity across offsets 1..window-1.
fn build_forecast_list<'a, F>(daily: &'a [DailyInfo], window_days: u8, find: F) -> Vec<ForecastEntry>
where
    F: Fn(&'a DailyInfo) -> Option<&'a PollenInfo>,
{
    let mut list = Vec::new();
    for (i, day) in daily.iter().skip(1).enumerate() {
        let offset = (i + 1) as u8;
        if offset >= window_days {
            break;
        }
        list.push(forecast_entry(offset, day, find(day)));
    }
    list
}

/// Attach the derived attributes shared by type and plant records:
/// tomorrow/D+2 convenience mirrors, trend (today vs tomorrow only), and the
/// expected peak (offset >= 1, ties keep the earliest offset).
fn process_forecast_attributes(
    today_value: Option<i64>,
    forecast: Vec<ForecastEntry>,
) -> ForecastAttributes {
    let convenience = |offset: u8| {
        let f = forecast.iter().find(|e| e.offset == offset);
        let with_index = f.filter(|e| e.has_index);
        (
            f.map(|e| e.has_index).unwrap_or(false),
            with_index.and_then(|e| e.value),
            with_index.and_then(|e| e.category.clone()),
            with_index.and_then(|e| e.description.clone()),
            with_index.and_then(|e| e.color.color_hex.clone()),
        )
    };
    let (tomorrow_has_index, tomorrow_value, tomorrow_category, tomorrow_description, tomorrow_color_hex) =
        convenience(1);
    let (d2_has_index, d2_value, d2_category, d2_description, d2_color_hex) = convenience(2);

    let trend = match (today_value, tomorrow_value) {
        (Some(today), Some(tomorrow)) if tomorrow > today => Some(Trend::Up),
        (Some(today), Some(tomorrow)) if tomorrow < today => Some(Trend::Down),
        (Some(_), Some(_)) => Some(Trend::Flat),
        _ => None,
    };

    let mut peak: Option<&ForecastEntry> = None;
    for entry in &forecast {
        if !entry.has_index {
            continue;
        }
        let Some(value) = entry.value else { continue };
        if peak.and_then(|p| p.value).map_or(true, |best| value > best) {
            peak = Some(entry);
        }
    }
    let expected_peak = peak.map(|p| PeakEntry {
        offset: p.offset,
        date: p.date.clone(),
        value: p.value.unwrap_or_default(),
        category: p.category.clone(),
    });

    ForecastAttributes {
        forecast,
        tomorrow_has_index,
        tomorrow_value,
        tomorrow_category,
        tomorrow_description,
        tomorrow_color_hex,
        d2_has_index,
        d2_value,
        d2_category,
        d2_description,
        d2_color_hex,
        trend,
        expected_peak,
    }
}

// --- Record construction ---

/// Build the day-0 part of a type record, falling back to a skeleton when the
/// type is absent today (or present with no informational fields). The
/// skeleton borrows display name / season flag / advice from the first day
/// in the window where the code appears, but its value/category/description/
/// color stay null: there is no "today" index to report.
fn build_type_base(daily: &[DailyInfo], code: &str) -> TypeRecord {
    let today = find_type(&daily[0], code);
    let mut rec = TypeRecord {
        display_name: code.to_string(),
        ..Default::default()
    };

    if let Some(item) = today {
        let idx = item.index_info.as_ref();
        rec.display_name = item.display_name.clone().unwrap_or_else(|| code.to_string());
        rec.in_season = item.in_season;
        rec.advice = item.health_recommendations.clone();
        rec.value = idx.and_then(|i| i.value);
        rec.category = idx.and_then(|i| i.category.clone());
        rec.description = idx.and_then(|i| i.index_description.clone());
        rec.color = idx
            .map(|i| color_fields(i.color.as_ref()))
            .unwrap_or_default();
    }

    let needs_skeleton = today.is_none()
        || (rec.value.is_none() && rec.category.is_none() && rec.description.is_none());
    if needs_skeleton {
        rec = TypeRecord {
            display_name: code.to_string(),
            ..Default::default()
        };
        if let Some(candidate) = daily.iter().find_map(|day| find_type(day, code)) {
            rec.display_name = candidate
                .display_name
                .clone()
                .unwrap_or_else(|| code.to_string());
            rec.in_season = candidate.in_season;
            rec.advice = candidate.health_recommendations.clone();
        }
    }
    rec
}

/// Build the day-0 part of a plant record, with the same skeleton fallback
/// as types. Taxonomic metadata travels with whichever day supplied the
/// entry; index-derived fields stay null when today has no entry.
fn build_plant_base(daily: &[DailyInfo], code: &str) -> PlantRecord {
    let today = find_plant(&daily[0], code);
    let mut rec = PlantRecord {
        code: code.to_string(),
        display_name: code.to_string(),
        ..Default::default()
    };

    let fill_metadata = |rec: &mut PlantRecord, item: &PollenInfo| {
        rec.display_name = item.display_name.clone().unwrap_or_else(|| code.to_string());
        rec.in_season = item.in_season;
        rec.advice = item.health_recommendations.clone();
        if let Some(desc) = item.plant_description.as_ref() {
            rec.plant_type = desc.plant_type.clone();
            rec.family = desc.family.clone();
            rec.season = desc.season.clone();
            rec.cross_reaction = desc.cross_reaction.clone();
            rec.picture = desc.picture.clone();
            rec.picture_closeup = desc.picture_closeup.clone();
        }
    };

    if let Some(item) = today {
        fill_metadata(&mut rec, item);
        let idx = item.index_info.as_ref();
        rec.value = idx.and_then(|i| i.value);
        rec.category = idx.and_then(|i| i.category.clone());
        rec.description = idx.and_then(|i| i.index_description.clone());
        rec.color = idx
            .map(|i| color_fields(i.color.as_ref()))
            .unwrap_or_default();
    } else if let Some(candidate) = daily.iter().find_map(|day| find_plant(day, code)) {
        fill_metadata(&mut rec, candidate);
    }
    rec
}

/// Build a per-day sibling sensor for one type at one offset, carrying that
/// day's own season flag and advice rather than inheriting today's.
fn build_day_sensor(
    base: &TypeRecord,
    entry: &ForecastEntry,
    day_item: Option<&PollenInfo>,
) -> TypeRecord {
    TypeRecord {
        display_name: format!("{} (D+{})", base.display_name, entry.offset),
        value: entry.value,
        category: entry.category.clone(),
        description: entry.description.clone(),
        in_season: day_item.and_then(|i| i.in_season),
        advice: day_item
            .map(|i| i.health_recommendations.clone())
            .unwrap_or_default(),
        color: entry.color.clone(),
        attributes: ForecastAttributes::default(),
        date: entry.date.clone(),
        has_index: Some(entry.has_index),
    }
}

// --- Entry point ---

/// Normalize one raw payload into the canonical sensor map.
pub fn normalize(payload: &ForecastResponse, opts: &NormalizeOptions) -> SensorMap {
    let mut map = SensorMap::new();

    if let Some(region) = payload.region_code.as_deref().filter(|r| !r.is_empty()) {
        map.insert(
            "region".to_string(),
            SensorRecord::Meta {
                value: region.to_string(),
            },
        );
    }

    let daily = &payload.daily_info;
    if daily.is_empty() {
        // Empty-result policy: only the meta records gathered so far.
        return map;
    }

    if let Some(date) = daily[0].date.and_then(|d| d.to_iso()) {
        map.insert("date".to_string(), SensorRecord::Meta { value: date });
    }

    // Types: codes matched upper-cased, keys lower-cased. Dedup after
    // upper-casing so "grass" and "GRASS" collapse into one entity.
    let mut type_codes: Vec<String> = Vec::new();
    for code in collect_codes(daily, |day| &day.pollen_type_info) {
        let upper = code.to_uppercase();
        if !type_codes.contains(&upper) {
            type_codes.push(upper);
        }
    }

    for tcode in &type_codes {
        let mut rec = build_type_base(daily, tcode);
        let forecast = build_forecast_list(daily, opts.forecast_days, |day| find_type(day, tcode));
        rec.attributes = process_forecast_attributes(rec.value, forecast);

        let type_key = format!("type_{}", tcode.to_lowercase());
        for offset in [1u8, 2] {
            let wanted = (offset == 1 && opts.create_d1) || (offset == 2 && opts.create_d2);
            if !wanted {
                continue;
            }
            let Some(entry) = rec.attributes.forecast.iter().find(|e| e.offset == offset)
            else {
                continue;
            };
            let day_item = daily.get(offset as usize).and_then(|day| find_type(day, tcode));
            map.insert(
                format!("{}_d{}", type_key, offset),
                SensorRecord::Type(build_day_sensor(&rec, entry, day_item)),
            );
        }
        map.insert(type_key, SensorRecord::Type(rec));
    }

    // Plants: keys preserve the source code's case; no per-day siblings.
    let plant_codes = collect_codes(daily, |day| &day.plant_info);
    for pcode in &plant_codes {
        let mut rec = build_plant_base(daily, pcode);
        let forecast = build_forecast_list(daily, opts.forecast_days, |day| find_plant(day, pcode));
        rec.attributes = process_forecast_attributes(rec.value, forecast);
        map.insert(format!("plants_{}", pcode), SensorRecord::Plant(rec));
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(days: u8) -> NormalizeOptions {
        NormalizeOptions {
            forecast_days: days,
            create_d1: false,
            create_d2: false,
        }
    }

    fn payload(json: serde_json::Value) -> ForecastResponse {
        serde_json::from_value(json).unwrap()
    }

    fn get_type<'a>(map: &'a SensorMap, key: &str) -> &'a TypeRecord {
        match map.get(key).unwrap_or_else(|| panic!("missing key {}", key)) {
            SensorRecord::Type(rec) => rec,
            other => panic!("{} is not a type record: {:?}", key, other),
        }
    }

    fn get_plant<'a>(map: &'a SensorMap, key: &str) -> &'a PlantRecord {
        match map.get(key).unwrap_or_else(|| panic!("missing key {}", key)) {
            SensorRecord::Plant(rec) => rec,
            other => panic!("{} is not a plant record: {:?}", key, other),
        }
    }

    fn day(date: (i32, u8, u8), types: serde_json::Value, plants: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "date": { "year": date.0, "month": date.1, "day": date.2 },
            "pollenTypeInfo": types,
            "plantInfo": plants,
        })
    }

    fn grass(value: i64, category: &str) -> serde_json::Value {
        serde_json::json!({
            "code": "GRASS",
            "displayName": "Grass",
            "inSeason": true,
            "healthRecommendations": ["Limit outdoor time."],
            "indexInfo": {
                "value": value,
                "category": category,
                "indexDescription": "desc",
                "color": { "red": 0.2, "green": 0.6, "blue": 0.2 }
            }
        })
    }

    // --- Color rules ---

    #[test]
    fn test_channel_accepts_both_scales() {
        assert_eq!(normalize_channel(0.5), 128);
        assert_eq!(normalize_channel(1.0), 255);
        assert_eq!(normalize_channel(128.0), 128);
        assert_eq!(normalize_channel(300.0), 255);
        assert_eq!(normalize_channel(-4.0), 0);
    }

    #[test]
    fn test_rgb_absent_color_is_none() {
        assert_eq!(rgb_from_api(None), None);
        // Present-but-empty channel dict: still no color.
        assert_eq!(rgb_from_api(Some(&ApiColor::default())), None);
    }

    #[test]
    fn test_rgb_partial_color_zero_fills() {
        let c = ApiColor {
            red: None,
            green: Some(0.6),
            blue: Some(0.2),
        };
        assert_eq!(rgb_from_api(Some(&c)), Some([0, 153, 51]));
    }

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(rgb_to_hex([0, 153, 51]), "#009933");
        assert_eq!(rgb_to_hex([255, 255, 255]), "#FFFFFF");
    }

    #[test]
    fn test_color_fields_keep_raw_even_when_empty() {
        let fields = color_fields(Some(&ApiColor::default()));
        assert_eq!(fields.color_hex, None);
        assert_eq!(fields.color_rgb, None);
        assert_eq!(fields.color_raw, Some(ApiColor::default()));
    }

    // --- Scenario A: empty dailyInfo ---

    #[test]
    fn test_empty_daily_info_yields_meta_only() {
        let p = payload(serde_json::json!({ "regionCode": "CH", "dailyInfo": [] }));
        let map = normalize(&p, &opts(3));
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get("region"),
            Some(&SensorRecord::Meta { value: "CH".to_string() })
        );
    }

    #[test]
    fn test_missing_region_and_empty_days_yields_empty_map() {
        let p = payload(serde_json::json!({ "dailyInfo": [] }));
        assert!(normalize(&p, &opts(3)).is_empty());
    }

    // --- Scenario B: single-day window ---

    #[test]
    fn test_single_day_window_has_empty_forecast() {
        let p = payload(serde_json::json!({
            "regionCode": "CH",
            "dailyInfo": [day((2026, 4, 1), serde_json::json!([grass(2, "LOW")]), serde_json::json!([]))]
        }));
        let map = normalize(&p, &opts(1));

        let rec = get_type(&map, "type_grass");
        assert_eq!(rec.value, Some(2));
        assert_eq!(rec.category.as_deref(), Some("LOW"));
        assert!(rec.attributes.forecast.is_empty());
        assert!(!rec.attributes.tomorrow_has_index);
        assert_eq!(rec.attributes.tomorrow_value, None);
        assert_eq!(rec.attributes.trend, None);
        assert_eq!(rec.attributes.expected_peak, None);
        assert_eq!(
            map.get("date"),
            Some(&SensorRecord::Meta { value: "2026-04-01".to_string() })
        );
    }

    // --- Scenario C: skeleton from future day ---

    #[test]
    fn test_type_absent_today_gets_skeleton_from_first_future_day() {
        let p = payload(serde_json::json!({
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([]), serde_json::json!([])),
                day((2026, 4, 2), serde_json::json!([grass(3, "MODERATE")]), serde_json::json!([])),
                day((2026, 4, 3), serde_json::json!([grass(1, "LOW")]), serde_json::json!([])),
            ]
        }));
        let map = normalize(&p, &opts(3));

        let rec = get_type(&map, "type_grass");
        assert_eq!(rec.value, None, "no today index to report");
        assert_eq!(rec.category, None);
        assert_eq!(rec.color.color_hex, None);
        assert_eq!(rec.display_name, "Grass", "metadata from day 1's entry");
        assert_eq!(rec.in_season, Some(true));
        assert_eq!(rec.advice, vec!["Limit outdoor time.".to_string()]);

        assert_eq!(rec.attributes.trend, None, "today missing, no trend");
        let peak = rec.attributes.expected_peak.as_ref().unwrap();
        assert_eq!(peak.offset, 1);
        assert_eq!(peak.value, 3);

        assert_eq!(rec.attributes.forecast.len(), 2);
        assert_eq!(rec.attributes.forecast[1].offset, 2);
        assert_eq!(rec.attributes.forecast[1].value, Some(1));
    }

    #[test]
    fn test_present_but_informationless_today_rebuilds_skeleton() {
        // Present on day 0 with no index info at all: treated like absent,
        // metadata re-read from the first day that has the code (day 0).
        let p = payload(serde_json::json!({
            "dailyInfo": [
                day(
                    (2026, 4, 1),
                    serde_json::json!([{ "code": "TREE", "displayName": "Tree", "inSeason": false }]),
                    serde_json::json!([])
                ),
            ]
        }));
        let map = normalize(&p, &opts(1));
        let rec = get_type(&map, "type_tree");
        assert_eq!(rec.display_name, "Tree");
        assert_eq!(rec.in_season, Some(false));
        assert_eq!(rec.value, None);
    }

    // --- Scenario D: trend and peak ---

    #[test]
    fn test_plant_trend_up_and_peak_tomorrow() {
        let plant = |v: i64| {
            serde_json::json!({
                "code": "BIRCH",
                "displayName": "Birch",
                "inSeason": true,
                "indexInfo": { "value": v, "category": "X" },
                "plantDescription": { "type": "TREE", "family": "Betulaceae" }
            })
        };
        let p = payload(serde_json::json!({
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([]), serde_json::json!([plant(2)])),
                day((2026, 4, 2), serde_json::json!([]), serde_json::json!([plant(4)])),
                day((2026, 4, 3), serde_json::json!([]), serde_json::json!([plant(1)])),
            ]
        }));
        let map = normalize(&p, &opts(3));

        let rec = get_plant(&map, "plants_BIRCH");
        assert_eq!(rec.value, Some(2));
        assert_eq!(rec.family.as_deref(), Some("Betulaceae"));
        assert_eq!(rec.attributes.trend, Some(Trend::Up));
        let peak = rec.attributes.expected_peak.as_ref().unwrap();
        assert_eq!(peak.offset, 1);
        assert_eq!(peak.value, 4);
    }

    #[test]
    fn test_trend_down_and_flat() {
        let mk = |today: i64, tomorrow: i64| {
            let p = payload(serde_json::json!({
                "dailyInfo": [
                    day((2026, 4, 1), serde_json::json!([grass(today, "A")]), serde_json::json!([])),
                    day((2026, 4, 2), serde_json::json!([grass(tomorrow, "B")]), serde_json::json!([])),
                ]
            }));
            let map = normalize(&p, &opts(2));
            get_type(&map, "type_grass").attributes.trend
        };
        assert_eq!(mk(4, 1), Some(Trend::Down));
        assert_eq!(mk(3, 3), Some(Trend::Flat));
        assert_eq!(mk(1, 4), Some(Trend::Up));
    }

    #[test]
    fn test_peak_tie_keeps_earliest_offset() {
        let p = payload(serde_json::json!({
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([grass(1, "A")]), serde_json::json!([])),
                day((2026, 4, 2), serde_json::json!([grass(3, "B")]), serde_json::json!([])),
                day((2026, 4, 3), serde_json::json!([grass(3, "C")]), serde_json::json!([])),
            ]
        }));
        let map = normalize(&p, &opts(3));
        let peak = get_type(&map, "type_grass").attributes.expected_peak.as_ref().unwrap();
        assert_eq!(peak.offset, 1);
        assert_eq!(peak.category.as_deref(), Some("B"));
    }

    #[test]
    fn test_peak_null_when_no_forecast_day_has_index() {
        let p = payload(serde_json::json!({
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([grass(5, "HIGH")]), serde_json::json!([])),
                day((2026, 4, 2), serde_json::json!([{ "code": "GRASS", "displayName": "Grass" }]), serde_json::json!([])),
            ]
        }));
        let map = normalize(&p, &opts(2));
        let rec = get_type(&map, "type_grass");
        assert_eq!(rec.attributes.expected_peak, None);
        assert!(!rec.attributes.forecast[0].has_index);
        assert_eq!(rec.attributes.forecast[0].date.as_deref(), Some("2026-04-02"));
        assert_eq!(rec.attributes.trend, None, "tomorrow has no index");
    }

    // --- Window / forecast-list properties ---

    #[test]
    fn test_forecast_list_length_and_offsets() {
        for window in 1u8..=5 {
            let days: Vec<serde_json::Value> = (0..window)
                .map(|i| day((2026, 4, 1 + i), serde_json::json!([grass(1, "A")]), serde_json::json!([])))
                .collect();
            let p = payload(serde_json::json!({ "dailyInfo": days }));
            let map = normalize(&p, &opts(window));
            let forecast = &get_type(&map, "type_grass").attributes.forecast;
            assert_eq!(forecast.len(), (window - 1) as usize);
            for (i, entry) in forecast.iter().enumerate() {
                assert_eq!(entry.offset as usize, i + 1, "offsets contiguous from 1");
            }
        }
    }

    #[test]
    fn test_window_caps_extra_payload_days() {
        // API returned more days than the configured window; the extras are
        // ignored.
        let p = payload(serde_json::json!({
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([grass(1, "A")]), serde_json::json!([])),
                day((2026, 4, 2), serde_json::json!([grass(2, "B")]), serde_json::json!([])),
                day((2026, 4, 3), serde_json::json!([grass(5, "E")]), serde_json::json!([])),
            ]
        }));
        let map = normalize(&p, &opts(2));
        let forecast = &get_type(&map, "type_grass").attributes.forecast;
        assert_eq!(forecast.len(), 1);
        assert_eq!(forecast[0].offset, 1);
    }

    // --- Keys and universes ---

    #[test]
    fn test_type_keys_lowercased_plant_keys_case_preserved() {
        let p = payload(serde_json::json!({
            "dailyInfo": [day(
                (2026, 4, 1),
                serde_json::json!([{ "code": "grass", "indexInfo": { "value": 1 } }]),
                serde_json::json!([{ "code": "Olive", "indexInfo": { "value": 2 } }])
            )]
        }));
        let map = normalize(&p, &opts(1));
        assert!(map.contains_key("type_grass"));
        assert!(map.contains_key("plants_Olive"));
        assert_eq!(get_plant(&map, "plants_Olive").code, "Olive");
    }

    #[test]
    fn test_plants_without_code_are_skipped() {
        let p = payload(serde_json::json!({
            "dailyInfo": [day(
                (2026, 4, 1),
                serde_json::json!([]),
                serde_json::json!([
                    { "displayName": "Mystery", "indexInfo": { "value": 3 } },
                    { "code": "", "displayName": "Empty" },
                    { "code": "ASH", "displayName": "Ash" }
                ])
            )]
        }));
        let map = normalize(&p, &opts(1));
        let plant_keys: Vec<&String> = map.keys().filter(|k| k.starts_with("plants_")).collect();
        assert_eq!(plant_keys, vec!["plants_ASH"]);
    }

    #[test]
    fn test_plant_absent_today_gets_skeleton() {
        let p = payload(serde_json::json!({
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([]), serde_json::json!([])),
                day((2026, 4, 2), serde_json::json!([]), serde_json::json!([{
                    "code": "RAGWEED",
                    "displayName": "Ragweed",
                    "inSeason": true,
                    "indexInfo": { "value": 4, "category": "HIGH" },
                    "plantDescription": { "season": "Late summer" }
                }]))
            ]
        }));
        let map = normalize(&p, &opts(2));
        let rec = get_plant(&map, "plants_RAGWEED");
        assert_eq!(rec.value, None);
        assert_eq!(rec.display_name, "Ragweed");
        assert_eq!(rec.season.as_deref(), Some("Late summer"));
        assert_eq!(rec.attributes.forecast.len(), 1);
        assert_eq!(rec.attributes.forecast[0].value, Some(4));
    }

    #[test]
    fn test_duplicate_codes_within_day_first_match_wins() {
        let p = payload(serde_json::json!({
            "dailyInfo": [day(
                (2026, 4, 1),
                serde_json::json!([
                    { "code": "GRASS", "displayName": "First", "indexInfo": { "value": 1 } },
                    { "code": "GRASS", "displayName": "Second", "indexInfo": { "value": 5 } }
                ]),
                serde_json::json!([])
            )]
        }));
        let map = normalize(&p, &opts(1));
        let rec = get_type(&map, "type_grass");
        assert_eq!(rec.display_name, "First");
        assert_eq!(rec.value, Some(1));
        // Exactly one main record despite the duplicate.
        assert_eq!(map.keys().filter(|k| k.starts_with("type_")).count(), 1);
    }

    // --- Per-day sibling sensors ---

    #[test]
    fn test_per_day_sensors_created_on_request() {
        let mut o = opts(3);
        o.create_d1 = true;
        o.create_d2 = true;

        let day2_grass = serde_json::json!([{
            "code": "GRASS",
            "displayName": "Grass",
            "inSeason": false,
            "healthRecommendations": ["Different advice."],
            "indexInfo": { "value": 4, "category": "HIGH" }
        }]);
        let p = payload(serde_json::json!({
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([grass(2, "LOW")]), serde_json::json!([])),
                day((2026, 4, 2), day2_grass, serde_json::json!([])),
                day((2026, 4, 3), serde_json::json!([grass(1, "LOW")]), serde_json::json!([])),
            ]
        }));
        let map = normalize(&p, &o);

        let d1 = get_type(&map, "type_grass_d1");
        assert_eq!(d1.display_name, "Grass (D+1)");
        assert_eq!(d1.value, Some(4));
        assert_eq!(d1.has_index, Some(true));
        assert_eq!(d1.date.as_deref(), Some("2026-04-02"));
        // Day-specific season flag and advice, not inherited from today.
        assert_eq!(d1.in_season, Some(false));
        assert_eq!(d1.advice, vec!["Different advice.".to_string()]);

        let d2 = get_type(&map, "type_grass_d2");
        assert_eq!(d2.value, Some(1));
        assert_eq!(d2.date.as_deref(), Some("2026-04-03"));
    }

    #[test]
    fn test_per_day_sensors_skipped_outside_window() {
        let mut o = opts(2);
        o.create_d1 = true;
        o.create_d2 = true;

        let p = payload(serde_json::json!({
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([grass(2, "LOW")]), serde_json::json!([])),
                day((2026, 4, 2), serde_json::json!([grass(3, "MODERATE")]), serde_json::json!([])),
            ]
        }));
        let map = normalize(&p, &o);
        assert!(map.contains_key("type_grass_d1"));
        assert!(!map.contains_key("type_grass_d2"), "offset 2 outside window");
    }

    #[test]
    fn test_no_per_day_sensors_by_default_and_never_for_plants() {
        let p = payload(serde_json::json!({
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([grass(2, "LOW")]),
                    serde_json::json!([{ "code": "ASH", "indexInfo": { "value": 1 } }])),
                day((2026, 4, 2), serde_json::json!([grass(3, "MODERATE")]),
                    serde_json::json!([{ "code": "ASH", "indexInfo": { "value": 2 } }])),
            ]
        }));
        let mut o = opts(2);
        o.create_d1 = true;
        let map = normalize(&p, &o);
        assert!(map.contains_key("type_grass_d1"));
        assert!(!map.contains_key("plants_ASH_d1"));
    }

    // --- Idempotence ---

    #[test]
    fn test_normalize_is_idempotent() {
        let p = payload(serde_json::json!({
            "regionCode": "CH",
            "dailyInfo": [
                day((2026, 4, 1), serde_json::json!([grass(2, "LOW")]),
                    serde_json::json!([{ "code": "BIRCH", "indexInfo": { "value": 3 } }])),
                day((2026, 4, 2), serde_json::json!([grass(4, "HIGH")]),
                    serde_json::json!([])),
            ]
        }));
        let o = NormalizeOptions {
            forecast_days: 2,
            create_d1: true,
            create_d2: false,
        };
        let first = serde_json::to_string(&normalize(&p, &o)).unwrap();
        let second = serde_json::to_string(&normalize(&p, &o)).unwrap();
        assert_eq!(first, second);
    }

    // --- Malformed data degrades, never fails ---

    #[test]
    fn test_malformed_day_degrades_to_missing_fields() {
        let p = payload(serde_json::json!({
            "dailyInfo": [
                { "pollenTypeInfo": [{ "code": "WEED" }] },
                {}
            ]
        }));
        let map = normalize(&p, &opts(2));
        assert!(!map.contains_key("date"), "no date triple on day 0");
        let rec = get_type(&map, "type_weed");
        assert_eq!(rec.value, None);
        assert_eq!(rec.attributes.forecast.len(), 1);
        assert!(!rec.attributes.forecast[0].has_index);
        assert_eq!(rec.attributes.forecast[0].date, None);
    }
}
