/// Forecast window bounds supported by the Pollen API.
pub const MIN_FORECAST_DAYS: u8 = 1;
pub const MAX_FORECAST_DAYS: u8 = 5;

/// Default forecast window: today + D+1 + D+2.
pub const DEFAULT_FORECAST_DAYS: u8 = 3;

/// Default scheduler interval in hours.
pub const DEFAULT_UPDATE_INTERVAL_HOURS: u64 = 6;

/// Which per-day type sensors to create, in addition to the main sensors.
///
/// Parsed from a mode string. Legacy configs used "D+1" / "D+1+2"; current
/// ones use "d1" / "d1_d2". Anything unrecognized falls back to `None`
/// rather than failing the config load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastSensorMode {
    None,
    D1,
    D1D2,
}

impl ForecastSensorMode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "d1" | "D+1" => Self::D1,
            "d1_d2" | "D+1+2" => Self::D1D2,
            _ => Self::None,
        }
    }

    pub fn create_d1(self) -> bool {
        matches!(self, Self::D1 | Self::D1D2)
    }

    pub fn create_d2(self) -> bool {
        matches!(self, Self::D1D2)
    }
}

/// Per-location pipeline configuration.
#[derive(Debug, Clone)]
pub struct LocationConfig {
    /// Stable identifier used in URLs and sensor device names.
    pub instance_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Requested window, clamped to [MIN_FORECAST_DAYS, MAX_FORECAST_DAYS].
    pub forecast_days: u8,
    /// Optional language tag; trimmed, empty becomes None.
    pub language: Option<String>,
    pub sensor_mode: ForecastSensorMode,
    pub update_interval_hours: u64,
}

impl LocationConfig {
    /// Clamp legacy/manual forecast-day values to the supported range.
    pub fn clamp_days(days: i64) -> u8 {
        days.clamp(MIN_FORECAST_DAYS as i64, MAX_FORECAST_DAYS as i64) as u8
    }

    /// Trim an optional setting, treating whitespace-only as absent.
    pub fn normalize_optional(raw: Option<String>) -> Option<String> {
        raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    /// Optional HTTP Referer header, for referrer-restricted API keys.
    pub http_referrer: Option<String>,
    pub location: LocationConfig,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let latitude: f64 = std::env::var("POLLEN_LATITUDE")
            .expect("POLLEN_LATITUDE must be set")
            .parse()
            .expect("POLLEN_LATITUDE must be a valid float");
        let longitude: f64 = std::env::var("POLLEN_LONGITUDE")
            .expect("POLLEN_LONGITUDE must be set")
            .parse()
            .expect("POLLEN_LONGITUDE must be a valid float");

        let forecast_days = std::env::var("POLLEN_FORECAST_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(LocationConfig::clamp_days)
            .unwrap_or(DEFAULT_FORECAST_DAYS);

        let sensor_mode = std::env::var("POLLEN_FORECAST_SENSORS")
            .map(|v| ForecastSensorMode::parse(&v))
            .unwrap_or(ForecastSensorMode::None);

        let update_interval_hours = std::env::var("POLLEN_UPDATE_INTERVAL_HOURS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(DEFAULT_UPDATE_INTERVAL_HOURS);

        Self {
            api_key: std::env::var("POLLEN_API_KEY").expect("POLLEN_API_KEY must be set"),
            http_referrer: LocationConfig::normalize_optional(
                std::env::var("POLLEN_HTTP_REFERRER").ok(),
            ),
            location: LocationConfig {
                // Not derived from coordinates: the id appears in URLs and
                // diagnostics, which redact the location.
                instance_id: std::env::var("POLLEN_INSTANCE_ID")
                    .unwrap_or_else(|_| "default".to_string()),
                latitude,
                longitude,
                forecast_days,
                language: LocationConfig::normalize_optional(
                    std::env::var("POLLEN_LANGUAGE").ok(),
                ),
                sensor_mode,
                update_interval_hours,
            },
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_mode_current_values() {
        assert_eq!(ForecastSensorMode::parse("none"), ForecastSensorMode::None);
        assert_eq!(ForecastSensorMode::parse("d1"), ForecastSensorMode::D1);
        assert_eq!(ForecastSensorMode::parse("d1_d2"), ForecastSensorMode::D1D2);
    }

    #[test]
    fn test_sensor_mode_legacy_values() {
        assert_eq!(ForecastSensorMode::parse("D+1"), ForecastSensorMode::D1);
        assert_eq!(ForecastSensorMode::parse("D+1+2"), ForecastSensorMode::D1D2);
    }

    #[test]
    fn test_sensor_mode_unknown_falls_back_to_none() {
        assert_eq!(
            ForecastSensorMode::parse("everything"),
            ForecastSensorMode::None
        );
        assert_eq!(ForecastSensorMode::parse(""), ForecastSensorMode::None);
    }

    #[test]
    fn test_sensor_mode_flags() {
        assert!(!ForecastSensorMode::None.create_d1());
        assert!(ForecastSensorMode::D1.create_d1());
        assert!(!ForecastSensorMode::D1.create_d2());
        assert!(ForecastSensorMode::D1D2.create_d1());
        assert!(ForecastSensorMode::D1D2.create_d2());
    }

    #[test]
    fn test_clamp_days() {
        assert_eq!(LocationConfig::clamp_days(0), 1);
        assert_eq!(LocationConfig::clamp_days(3), 3);
        assert_eq!(LocationConfig::clamp_days(99), 5);
        assert_eq!(LocationConfig::clamp_days(-2), 1);
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(
            LocationConfig::normalize_optional(Some("  de  ".to_string())),
            Some("de".to_string())
        );
        assert_eq!(LocationConfig::normalize_optional(Some("   ".to_string())), None);
        assert_eq!(LocationConfig::normalize_optional(None), None);
    }
}
