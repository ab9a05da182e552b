use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{info, warn};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::device::constants::{SCAN_POLL_DELAY, WRITE_DEADLINE};
use crate::device::types::name_matches;
use crate::error::CentralError;

/**
 * Everything the connection session needs from a bluetooth stack. The
 * production implementation wraps btleplug; tests substitute a scripted
 * implementation so the full session state machine runs without hardware.
 *
 * `scan_for_device` resolves with the first peripheral whose advertised name
 * contains one of the markers and otherwise never resolves; callers race it
 * against their own timeout or cancellation.
 */
#[async_trait]
pub trait BleCentral: Send + Sync + 'static {
    type Device: Clone + Send + Sync + 'static;

    async fn scan_for_device(
        &self,
        markers: &[String],
    ) -> Result<(Self::Device, String), CentralError>;

    async fn stop_scan(&self);

    async fn connect(&self, device: &Self::Device) -> Result<(), CentralError>;

    async fn discover_services(
        &self,
        device: &Self::Device,
        required: &[Uuid],
    ) -> Result<(), CentralError>;

    async fn read_characteristic(
        &self,
        device: &Self::Device,
        characteristic: Uuid,
    ) -> Result<Vec<u8>, CentralError>;

    async fn write_characteristic(
        &self,
        device: &Self::Device,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), CentralError>;

    async fn write_descriptor(
        &self,
        device: &Self::Device,
        characteristic: Uuid,
        descriptor: Uuid,
        value: &[u8],
    ) -> Result<(), CentralError>;

    async fn subscribe(
        &self,
        device: &Self::Device,
        characteristic: Uuid,
    ) -> Result<BoxStream<'static, Vec<u8>>, CentralError>;

    async fn disconnect_all(&self);
}

pub struct BtleplugCentral {
    manager: Manager,
    adapters: Mutex<Vec<Adapter>>,
}

impl BtleplugCentral {
    pub async fn new() -> Result<Self, CentralError> {
        let manager = Manager::new().await?;

        Ok(BtleplugCentral {
            manager,
            adapters: Mutex::new(Vec::new()),
        })
    }
}

fn find_characteristic(
    peripheral: &Peripheral,
    uuid: Uuid,
) -> Result<Characteristic, CentralError> {
    for characteristic in peripheral.characteristics() {
        if characteristic.uuid.eq(&uuid) {
            return Ok(characteristic);
        }
    }

    Err(CentralError::MissingCharacteristic)
}

#[async_trait]
impl BleCentral for BtleplugCentral {
    type Device = Peripheral;

    async fn scan_for_device(
        &self,
        markers: &[String],
    ) -> Result<(Peripheral, String), CentralError> {
        let adapters = self.manager.adapters().await?;

        if adapters.is_empty() {
            return Err(CentralError::NoAdapter);
        }

        for adapter in &adapters {
            info!(
                "Scanning using adapter {}...",
                adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()),
            );
            // The peripheral is matched by advertised name; this firmware
            // does not advertise its services, so a service filter would
            // never match.
            adapter.start_scan(ScanFilter::default()).await?;
        }

        *self.adapters.lock().await = adapters.clone();

        loop {
            for adapter in &adapters {
                let peripherals = match adapter.peripherals().await {
                    Ok(v) => v,
                    Err(err) => {
                        warn!("Failed to query BLE adapter for peripherals: {}", err);
                        continue;
                    },
                };

                for peripheral in peripherals {
                    let properties = match peripheral.properties().await {
                        Err(err) => {
                            warn!("Could not query peripheral for properties: {:?}", err);
                            continue;
                        },
                        Ok(None) => continue,
                        Ok(Some(properties)) => properties,
                    };

                    let name = match properties.local_name {
                        None => continue,
                        Some(name) => name,
                    };

                    if name_matches(markers, &name) {
                        info!(
                            "Using peripheral {} {:?} {}",
                            properties.address,
                            properties.address_type,
                            name,
                        );
                        return Ok((peripheral, name));
                    }
                }
            }

            sleep(Duration::from_millis(SCAN_POLL_DELAY)).await;
        }
    }

    async fn stop_scan(&self) {
        let adapters = self.adapters.lock().await;

        for adapter in adapters.iter() {
            if let Err(err) = adapter.stop_scan().await {
                warn!("Failed to stop scanning: {}", err);
            }
        }
    }

    async fn connect(&self, device: &Peripheral) -> Result<(), CentralError> {
        info!("Connecting to peripheral...");
        device.connect().await?;
        Ok(())
    }

    async fn discover_services(
        &self,
        device: &Peripheral,
        required: &[Uuid],
    ) -> Result<(), CentralError> {
        info!("Connected; Discovering services...");
        device.discover_services().await?;

        for uuid in required {
            let found = device.services().iter().any(|service| service.uuid.eq(uuid));

            if !found {
                warn!("Peripheral is missing service {}", uuid);
                return Err(CentralError::MissingService);
            }
        }

        Ok(())
    }

    async fn read_characteristic(
        &self,
        device: &Peripheral,
        characteristic: Uuid,
    ) -> Result<Vec<u8>, CentralError> {
        let target = find_characteristic(device, characteristic)?;
        let value = device.read(&target).await?;
        Ok(value)
    }

    async fn write_characteristic(
        &self,
        device: &Peripheral,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), CentralError> {
        let target = find_characteristic(device, characteristic)?;
        let fut = device.write(&target, value, WriteType::WithResponse);

        tokio::select! {
            _ = sleep(Duration::from_millis(WRITE_DEADLINE)) => {
                warn!("Writing to characteristic {} took too long", characteristic);
                Ok(())
            },
            result = fut => {
                result.map_err(CentralError::from)
            },
        }
    }

    async fn write_descriptor(
        &self,
        device: &Peripheral,
        characteristic: Uuid,
        descriptor: Uuid,
        value: &[u8],
    ) -> Result<(), CentralError> {
        let target = find_characteristic(device, characteristic)?;

        for candidate in &target.descriptors {
            if !candidate.uuid.eq(&descriptor) {
                continue;
            }

            let fut = device.write_descriptor(candidate, value);

            return tokio::select! {
                _ = sleep(Duration::from_millis(WRITE_DEADLINE)) => {
                    warn!("Writing to descriptor {} took too long", descriptor);
                    Ok(())
                },
                result = fut => {
                    result.map_err(CentralError::from)
                },
            };
        }

        Err(CentralError::MissingDescriptor)
    }

    async fn subscribe(
        &self,
        device: &Peripheral,
        characteristic: Uuid,
    ) -> Result<BoxStream<'static, Vec<u8>>, CentralError> {
        let target = find_characteristic(device, characteristic)?;

        info!("Subscribing to characteristic {}", characteristic);
        device.subscribe(&target).await?;

        let stream = device
            .notifications()
            .await?
            .filter_map(move |notification| async move {
                if notification.uuid.eq(&characteristic) {
                    Some(notification.value)
                } else {
                    None
                }
            })
            .boxed();

        Ok(stream)
    }

    async fn disconnect_all(&self) {
        let adapters = self.adapters.lock().await;

        for adapter in adapters.iter() {
            let peripherals = match adapter.peripherals().await {
                Ok(v) => v,
                Err(err) => {
                    warn!("Failed to query BLE adapter for peripherals: {}", err);
                    continue;
                },
            };

            for peripheral in peripherals {
                if peripheral.is_connected().await.unwrap_or(false) {
                    if let Err(err) = peripheral.disconnect().await {
                        warn!("Failed to disconnect peripheral: {}", err);
                    }
                }
            }
        }
    }
}
