use std::time::Duration;
use uuid::Uuid;

use crate::device::constants::{
    make_accelerometer_data_uuid, make_accelerometer_period_uuid, make_accelerometer_service_uuid,
    make_device_info_service_uuid, make_device_model_uuid, make_firmware_revision_uuid,
    make_notification_descriptor_uuid, make_serial_number_uuid, DEVICE_NAME_MARKERS, SCAN_TIMEOUT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    Connecting,
    DiscoveringServices,
    ArmingNotifications,
    Streaming,
    Stopping,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChange(SessionState),
    Sample(Vec<u8>), // raw notification bytes, decoded downstream
}

/**
 * UUID bundle describing the peripheral profile the session talks to.
 * Supplied at construction so the session logic never hard-codes an
 * identifier; the default targets the micro:bit accelerometer profile.
 */
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub name_markers: Vec<String>,
    pub accelerometer_service: Uuid,
    pub accelerometer_data: Uuid,
    pub accelerometer_period: Uuid,
    pub device_info_service: Uuid,
    pub device_model: Uuid,
    pub serial_number: Uuid,
    pub firmware_revision: Uuid,
    pub notification_descriptor: Uuid,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        DeviceProfile {
            name_markers: DEVICE_NAME_MARKERS.iter().map(|m| m.to_string()).collect(),
            accelerometer_service: make_accelerometer_service_uuid(),
            accelerometer_data: make_accelerometer_data_uuid(),
            accelerometer_period: make_accelerometer_period_uuid(),
            device_info_service: make_device_info_service_uuid(),
            device_model: make_device_model_uuid(),
            serial_number: make_serial_number_uuid(),
            firmware_revision: make_firmware_revision_uuid(),
            notification_descriptor: make_notification_descriptor_uuid(),
        }
    }
}

/**
 * Case-sensitive substring test of an advertised name against the accepted
 * markers. Every scan implementation decides matches through this one
 * predicate.
 */
pub fn name_matches(markers: &[String], name: &str) -> bool {
    markers.iter().any(|marker| name.contains(marker.as_str()))
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub scan_timeout: Duration,

    // When set, written to the accelerometer period characteristic while
    // arming notifications.
    pub sample_period_ms: Option<u16>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            scan_timeout: Duration::from_millis(SCAN_TIMEOUT),
            sample_period_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_filter_accepts_both_markers() {
        let markers = DeviceProfile::default().name_markers;
        assert!(name_matches(&markers, "BBC micro:bit [zagip]"));
        assert!(name_matches(&markers, "MicroBit"));
        assert!(!name_matches(&markers, "Micro:Bit")); // case-sensitive
        assert!(!name_matches(&markers, "Heart Rate Monitor"));
    }
}
