use std::time::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::constants::{
    ACCELEROMETER_DATA, ACCELEROMETER_PERIOD, ACCELEROMETER_SERVICE, DEVICE_INFO_SERVICE,
    DEVICE_NAME_MARKERS, NOTIFICATION_DESCRIPTOR, REFRESH_INTERVAL, SCAN_TIMEOUT,
};
use crate::device::types::{DeviceProfile, SessionSettings};
use crate::error::ConfigError;

/**
 * Peripheral identity: advertised-name markers plus the service,
 * characteristic and descriptor UUIDs the session talks to. The defaults
 * target the micro:bit accelerometer profile; overriding them retargets the
 * session to a different peripheral without code changes.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    pub name_markers: Vec<String>,
    pub accelerometer_service: String,
    pub accelerometer_data: String,
    pub accelerometer_period: String,
    pub device_info_service: String,
    pub notification_descriptor: String,

    /**
     * Sampling interval (milliseconds) written to the period characteristic
     * while arming notifications. None leaves the firmware default alone.
     */
    pub sample_period_ms: Option<u16>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            name_markers: DEVICE_NAME_MARKERS.iter().map(|marker| marker.to_string()).collect(),
            accelerometer_service: ACCELEROMETER_SERVICE.to_string(),
            accelerometer_data: ACCELEROMETER_DATA.to_string(),
            accelerometer_period: ACCELEROMETER_PERIOD.to_string(),
            device_info_service: DEVICE_INFO_SERVICE.to_string(),
            notification_descriptor: NOTIFICATION_DESCRIPTOR.to_string(),
            sample_period_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub scan_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            scan_timeout_ms: SCAN_TIMEOUT,
        }
    }
}

/**
 * Remote status log. Absent means status changes are not logged remotely.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLogConfig {
    pub base_url: String,
    pub user_id: String,
}

/**
 * Presence broadcast endpoint. Absent means no presence is broadcast.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceConfig {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresentationConfig {
    pub refresh_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        PresentationConfig {
            refresh_ms: REFRESH_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub device: DeviceConfig,
    pub session: SessionConfig,
    pub status_log: Option<StatusLogConfig>,
    pub presence: Option<PresenceConfig>,
    pub presentation: PresentationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: DeviceConfig::default(),
            session: SessionConfig::default(),
            status_log: None,
            presence: None,
            presentation: PresentationConfig::default(),
        }
    }
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, ConfigError> {
    Uuid::parse_str(value).map_err(|_| ConfigError::BadUuid {
        field,
        value: value.to_string(),
    })
}

impl Config {
    pub fn to_profile(&self) -> Result<DeviceProfile, ConfigError> {
        Ok(DeviceProfile {
            name_markers: self.device.name_markers.clone(),
            accelerometer_service: parse_uuid(
                "device.accelerometerService",
                &self.device.accelerometer_service,
            )?,
            accelerometer_data: parse_uuid(
                "device.accelerometerData",
                &self.device.accelerometer_data,
            )?,
            accelerometer_period: parse_uuid(
                "device.accelerometerPeriod",
                &self.device.accelerometer_period,
            )?,
            device_info_service: parse_uuid(
                "device.deviceInfoService",
                &self.device.device_info_service,
            )?,
            notification_descriptor: parse_uuid(
                "device.notificationDescriptor",
                &self.device.notification_descriptor,
            )?,
            ..DeviceProfile::default()
        })
    }

    pub fn to_settings(&self) -> SessionSettings {
        SessionSettings {
            scan_timeout: Duration::from_millis(self.session.scan_timeout_ms),
            sample_period_ms: self.device.sample_period_ms,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.presentation.refresh_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_the_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.status_log.is_none());
        assert!(config.presence.is_none());
    }

    #[test]
    fn partial_sections_keep_the_remaining_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"session": {"scanTimeoutMs": 9000}}"#).unwrap();

        assert_eq!(config.session.scan_timeout_ms, 9000);
        assert_eq!(config.device, DeviceConfig::default());
        assert_eq!(config.presentation.refresh_ms, REFRESH_INTERVAL);
    }

    #[test]
    fn fields_serialize_in_camel_case() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("\"nameMarkers\""));
        assert!(json.contains("\"scanTimeoutMs\""));
        assert!(json.contains("\"samplePeriodMs\""));
        assert!(json.contains("\"refreshMs\""));
    }

    #[test]
    fn remote_sections_parse_when_present() {
        let config: Config = serde_json::from_str(
            r#"{
                "statusLog": {"baseUrl": "https://example.test/db", "userId": "42"},
                "presence": {"url": "https://example.test/hook"}
            }"#,
        )
        .unwrap();

        let status_log = config.status_log.unwrap();
        assert_eq!(status_log.base_url, "https://example.test/db");
        assert_eq!(status_log.user_id, "42");
        assert_eq!(config.presence.unwrap().url, "https://example.test/hook");
    }

    #[test]
    fn default_profile_matches_the_builtin_one() {
        let profile = Config::default().to_profile().unwrap();
        assert_eq!(profile.accelerometer_service, DeviceProfile::default().accelerometer_service);
        assert_eq!(profile.name_markers, vec!["MicroBit", "micro:bit"]);
    }

    #[test]
    fn invalid_uuid_is_reported_with_its_field() {
        let mut config = Config::default();
        config.device.accelerometer_service = "not-a-uuid".to_string();

        match config.to_profile() {
            Err(ConfigError::BadUuid { field, value }) => {
                assert_eq!(field, "device.accelerometerService");
                assert_eq!(value, "not-a-uuid");
            },
            other => panic!("expected BadUuid, got {:?}", other),
        }
    }

    #[test]
    fn settings_convert_milliseconds_to_durations() {
        let mut config = Config::default();
        config.session.scan_timeout_ms = 7500;
        config.device.sample_period_ms = Some(160);

        let settings = config.to_settings();
        assert_eq!(settings.scan_timeout, Duration::from_millis(7500));
        assert_eq!(settings.sample_period_ms, Some(160));
    }
}
