use std::collections::HashMap;
use std::sync::Mutex;
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::device::central::BleCentral;
use crate::device::types::name_matches;
use crate::error::CentralError;

#[derive(Clone, Debug, PartialEq)]
pub struct MockDevice {
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct MockCalls {
    pub scans: usize,
    pub stop_scans: usize,
    pub connects: usize,
    pub discoveries: usize,
    pub reads: Vec<Uuid>,
    pub characteristic_writes: Vec<(Uuid, Vec<u8>)>,
    pub descriptor_writes: Vec<(Uuid, Uuid, Vec<u8>)>,
    pub subscribes: Vec<Uuid>,
    pub disconnects: usize,
}

/**
 * Scripted central for exercising the session state machine without
 * hardware. Plain fields configure the advertised device and per-stage
 * delays; the `Mutex<Option<CentralError>>` slots make the next call to that
 * stage fail once. A scan that never finds anything pends forever, like the
 * real thing.
 */
#[derive(Default)]
pub struct MockCentral {
    pub device_name: Option<String>,
    pub scan_delay_ms: u64,
    pub connect_delay_ms: u64,
    pub connect_error: Mutex<Option<CentralError>>,
    pub discover_error: Mutex<Option<CentralError>>,
    pub write_error: Mutex<Option<CentralError>>,
    pub descriptor_error: Mutex<Option<CentralError>>,
    pub subscribe_error: Mutex<Option<CentralError>>,
    pub read_values: Mutex<HashMap<Uuid, Vec<u8>>>,
    pub notifications: Mutex<Option<UnboundedReceiver<Vec<u8>>>>,
    pub calls: Mutex<MockCalls>,
}

impl MockCentral {
    pub fn advertising(name: &str) -> Self {
        MockCentral {
            device_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn silent() -> Self {
        MockCentral::default()
    }

    pub fn snapshot(&self) -> MockCalls {
        self.calls.lock().unwrap().clone()
    }
}

fn take_scripted(slot: &Mutex<Option<CentralError>>) -> Result<(), CentralError> {
    match slot.lock().unwrap().take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[async_trait]
impl BleCentral for MockCentral {
    type Device = MockDevice;

    async fn scan_for_device(
        &self,
        markers: &[String],
    ) -> Result<(MockDevice, String), CentralError> {
        self.calls.lock().unwrap().scans += 1;

        let name = match self.device_name.clone() {
            Some(name) => name,
            None => return futures::future::pending().await,
        };

        if self.scan_delay_ms > 0 {
            sleep(Duration::from_millis(self.scan_delay_ms)).await;
        }

        if !name_matches(markers, &name) {
            return futures::future::pending().await;
        }

        Ok((MockDevice { name: name.clone() }, name))
    }

    async fn stop_scan(&self) {
        self.calls.lock().unwrap().stop_scans += 1;
    }

    async fn connect(&self, _device: &MockDevice) -> Result<(), CentralError> {
        self.calls.lock().unwrap().connects += 1;

        if self.connect_delay_ms > 0 {
            sleep(Duration::from_millis(self.connect_delay_ms)).await;
        }

        take_scripted(&self.connect_error)
    }

    async fn discover_services(
        &self,
        _device: &MockDevice,
        _required: &[Uuid],
    ) -> Result<(), CentralError> {
        self.calls.lock().unwrap().discoveries += 1;
        take_scripted(&self.discover_error)
    }

    async fn read_characteristic(
        &self,
        _device: &MockDevice,
        characteristic: Uuid,
    ) -> Result<Vec<u8>, CentralError> {
        self.calls.lock().unwrap().reads.push(characteristic);

        match self.read_values.lock().unwrap().get(&characteristic) {
            Some(value) => Ok(value.clone()),
            None => Err(CentralError::MissingCharacteristic),
        }
    }

    async fn write_characteristic(
        &self,
        _device: &MockDevice,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), CentralError> {
        self.calls
            .lock()
            .unwrap()
            .characteristic_writes
            .push((characteristic, value.to_vec()));
        take_scripted(&self.write_error)
    }

    async fn write_descriptor(
        &self,
        _device: &MockDevice,
        characteristic: Uuid,
        descriptor: Uuid,
        value: &[u8],
    ) -> Result<(), CentralError> {
        self.calls
            .lock()
            .unwrap()
            .descriptor_writes
            .push((characteristic, descriptor, value.to_vec()));
        take_scripted(&self.descriptor_error)
    }

    async fn subscribe(
        &self,
        _device: &MockDevice,
        characteristic: Uuid,
    ) -> Result<BoxStream<'static, Vec<u8>>, CentralError> {
        self.calls.lock().unwrap().subscribes.push(characteristic);
        take_scripted(&self.subscribe_error)?;

        match self.notifications.lock().unwrap().take() {
            Some(rx) => Ok(rx.boxed()),
            None => Ok(stream::pending::<Vec<u8>>().boxed()),
        }
    }

    async fn disconnect_all(&self) {
        self.calls.lock().unwrap().disconnects += 1;
    }
}
