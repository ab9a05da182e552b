use uuid::Uuid;

/**
 * How long (milliseconds) to scan before telling the user we are still
 * waiting for the device to show up. The notice fires once; the scan itself
 * keeps running.
 */
pub const SCAN_TIMEOUT: u64 = 5000;

/**
 * How often (milliseconds) to poll the adapters for discovered peripherals
 * while scanning.
 */
pub const SCAN_POLL_DELAY: u64 = 500;

/**
 * How long (milliseconds) a write to a characteristic or descriptor may take.
 */
pub const WRITE_DEADLINE: u64 = 2000;

/**
 * Minimum interval (milliseconds) between two presentation refreshes of the
 * current orientation. State-change publishes are never throttled.
 */
pub const REFRESH_INTERVAL: u64 = 1000;

/**
 * Advertised-name fragments that identify the peripheral. Matching is a
 * case-sensitive substring test; the first advertisement that matches wins.
 */
pub const DEVICE_NAME_MARKERS: [&str; 2] = ["MicroBit", "micro:bit"];

/**
 * The UUID of the micro:bit accelerometer service.
 */
pub const ACCELEROMETER_SERVICE: &str = "e95d0753-251d-470a-a062-fa1922dfa9a8";

/**
 * The UUID of the accelerometer data characteristic. Notifications carry at
 * least 6 bytes: x, y, z as signed little-endian 16-bit values.
 */
pub const ACCELEROMETER_DATA: &str = "e95dca4b-251d-470a-a062-fa1922dfa9a8";

/**
 * The UUID of the accelerometer period characteristic. Accepts a
 * little-endian u16 sampling interval in milliseconds.
 */
pub const ACCELEROMETER_PERIOD: &str = "e95dfb24-251d-470a-a062-fa1922dfa9a8";

/**
 * The UUID of the standard GATT device information service.
 */
pub const DEVICE_INFO_SERVICE: &str = "0000180a-0000-1000-8000-00805f9b34fb";

pub const DEVICE_MODEL: &str = "00002a24-0000-1000-8000-00805f9b34fb";
pub const SERIAL_NUMBER: &str = "00002a25-0000-1000-8000-00805f9b34fb";
pub const FIRMWARE_REVISION: &str = "00002a26-0000-1000-8000-00805f9b34fb";

/**
 * The UUID of the Client Characteristic Configuration Descriptor. Writing
 * ENABLE_NOTIFICATIONS to it arms notifications on the owning
 * characteristic.
 */
pub const NOTIFICATION_DESCRIPTOR: &str = "00002902-0000-1000-8000-00805f9b34fb";

/**
 * CCCD payload that switches notifications on (little-endian 0x0001).
 */
pub const ENABLE_NOTIFICATIONS: [u8; 2] = [0x01, 0x00];

pub fn make_accelerometer_service_uuid() -> Uuid {
    Uuid::parse_str(ACCELEROMETER_SERVICE).unwrap()
}

pub fn make_accelerometer_data_uuid() -> Uuid {
    Uuid::parse_str(ACCELEROMETER_DATA).unwrap()
}

pub fn make_accelerometer_period_uuid() -> Uuid {
    Uuid::parse_str(ACCELEROMETER_PERIOD).unwrap()
}

pub fn make_device_info_service_uuid() -> Uuid {
    Uuid::parse_str(DEVICE_INFO_SERVICE).unwrap()
}

pub fn make_device_model_uuid() -> Uuid {
    Uuid::parse_str(DEVICE_MODEL).unwrap()
}

pub fn make_serial_number_uuid() -> Uuid {
    Uuid::parse_str(SERIAL_NUMBER).unwrap()
}

pub fn make_firmware_revision_uuid() -> Uuid {
    Uuid::parse_str(FIRMWARE_REVISION).unwrap()
}

pub fn make_notification_descriptor_uuid() -> Uuid {
    Uuid::parse_str(NOTIFICATION_DESCRIPTOR).unwrap()
}
