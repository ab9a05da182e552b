use std::io;
use thiserror::Error;
use std::str::Utf8Error;
use btleplug;
use serde_json;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },

    #[error("Config field {field} holds an invalid UUID: {value}")]
    BadUuid { field: &'static str, value: String },
}

/**
 * Faults reported by the BLE collaborator, independent of which session
 * stage triggered them.
 */
#[derive(Error, Debug)]
pub enum CentralError {
    #[error("Error communicating with the bluetooth stack (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No usable bluetooth adapter is available")]
    NoAdapter,

    #[error("The peripheral does not expose a required service")]
    MissingService,

    #[error("A required bluetooth characteristic is not available")]
    MissingCharacteristic,

    #[error("A required bluetooth descriptor is not available")]
    MissingDescriptor,
}

/**
 * Session-stage errors. Everything before STREAMING aborts the session back
 * to idle; NotificationArm is special-cased as non-fatal because descriptor
 * writes are known to fail on some platforms even though notifications
 * still work.
 */
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Scan failed: {source}")]
    Scan { source: CentralError },

    #[error("Connection failed: {source}")]
    Connect { source: CentralError },

    #[error("Service discovery failed: {source}")]
    ServiceDiscovery { source: CentralError },

    #[error("Arming notifications failed: {source}")]
    NotificationArm { source: CentralError },

    #[error("A session is already active")]
    AlreadyActive,
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Sample buffer too short: got {len} bytes, need at least 6")]
    BufferTooShort { len: usize },
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Remote request failed: {source}")]
    Http { #[from] source: reqwest::Error },

    #[error("Remote rejected the request with HTTP status {status}")]
    BadStatus { status: u16 },
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (config): {source}")]
    Config { #[from] source: ConfigError },

    #[error("Failed to initialize the bluetooth central: {source}")]
    Central { #[from] source: CentralError },

    #[error("Failed to start the connection session: {source}")]
    Session { #[from] source: SessionError },
}
