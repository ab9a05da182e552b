use std::sync::{Arc, Mutex};
use futures::channel::mpsc::Sender;
use futures::stream;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::device::central::BleCentral;
use crate::device::constants::ENABLE_NOTIFICATIONS;
use crate::device::types::{DeviceProfile, SessionEvent, SessionState, SessionSettings};
use crate::error::SessionError;
use crate::status::StatusHandle;

/**
 * Drives one peripheral connection at a time through scan, connect, service
 * discovery, notification arming and streaming. The pipeline runs as a
 * spawned task; every asynchronous stage is raced against the session's
 * cancellation token, so stopping drops whatever operation was outstanding
 * and a late resolution can never touch session state.
 *
 * State transitions and raw samples are reported over the event channel;
 * human-readable progress goes to the status sink.
 */
pub struct ConnectionSession<C: BleCentral> {
    central: Arc<C>,
    profile: DeviceProfile,
    settings: SessionSettings,
    status: StatusHandle,
    events: Sender<SessionEvent>,
    state: Arc<Mutex<SessionState>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<C: BleCentral> ConnectionSession<C> {
    pub fn new(
        central: Arc<C>,
        profile: DeviceProfile,
        settings: SessionSettings,
        status: StatusHandle,
        events: Sender<SessionEvent>,
    ) -> Self {
        ConnectionSession {
            central,
            profile,
            settings,
            status,
            events,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /**
     * Launches the pipeline task. Only one pipeline may be active per
     * session; a second start while not idle is rejected. The scanning
     * state is claimed here, before the task is handed to the runtime, so
     * two starts with no await point between them cannot both pass the
     * guard and orphan a pipeline.
     */
    pub fn start(&mut self) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != SessionState::Idle {
                return Err(SessionError::AlreadyActive);
            }
            *state = SessionState::Scanning;
        }

        self.cancel = CancellationToken::new();

        let runner = SessionRunner {
            central: self.central.clone(),
            profile: self.profile.clone(),
            settings: self.settings.clone(),
            status: self.status.clone(),
            events: self.events.clone(),
            state: self.state.clone(),
            cancel: self.cancel.clone(),
        };

        self.task = Some(spawn(runner.run()));
        Ok(())
    }

    /**
     * Cancels the pipeline wherever it is, waits for the task to wind down,
     * releases scan and connection resources, and settles back to idle.
     */
    pub async fn stop(&mut self) {
        *self.state.lock().unwrap() = SessionState::Stopping;
        if self.events.send(SessionEvent::StateChange(SessionState::Stopping)).await.is_err() {
            debug!("Session event channel closed");
        }

        self.cancel.cancel();

        if let Some(handle) = self.task.take() {
            if let Err(err) = handle.await {
                warn!("Failed to join session task: {}", err);
            }
        }

        self.central.stop_scan().await;
        self.central.disconnect_all().await;

        *self.state.lock().unwrap() = SessionState::Idle;
        if self.events.send(SessionEvent::StateChange(SessionState::Idle)).await.is_err() {
            debug!("Session event channel closed");
        }

        self.status.show("Status: Stopped.");
    }
}

struct SessionRunner<C: BleCentral> {
    central: Arc<C>,
    profile: DeviceProfile,
    settings: SessionSettings,
    status: StatusHandle,
    events: Sender<SessionEvent>,
    state: Arc<Mutex<SessionState>>,
    cancel: CancellationToken,
}

impl<C: BleCentral> SessionRunner<C> {
    async fn enter_state(&mut self, next: SessionState) {
        *self.state.lock().unwrap() = next;

        if self.events.send(SessionEvent::StateChange(next)).await.is_err() {
            debug!("Session event channel closed");
        }
    }

    async fn fail(&mut self, err: SessionError) {
        warn!("{}", err);
        self.status.show(&format!("Error: {}", err));
        self.central.disconnect_all().await;
        self.enter_state(SessionState::Idle).await;
    }

    async fn run(mut self) {
        // A restarted session must never contend with leftovers from a
        // previous one.
        self.central.stop_scan().await;
        self.central.disconnect_all().await;

        // start() already claimed the scanning state; the task announces it.
        if self.events.send(SessionEvent::StateChange(SessionState::Scanning)).await.is_err() {
            debug!("Session event channel closed");
        }
        self.status.show("Status: Scanning...");

        let found = {
            let scan = self.central.scan_for_device(&self.profile.name_markers);
            tokio::pin!(scan);

            let timeout = sleep(self.settings.scan_timeout);
            tokio::pin!(timeout);

            let mut notified = false;

            loop {
                if notified {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        result = &mut scan => break result,
                    }
                } else {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        result = &mut scan => break result,
                        _ = &mut timeout => {
                            // One notice per scan; the scan itself keeps
                            // running until a device shows up.
                            self.status.show("Status: Scanning...\nPlease start the micro:bit.");
                            notified = true;
                        },
                    }
                }
            }
        };

        let (device, name) = match found {
            Ok(v) => v,
            Err(err) => {
                self.central.stop_scan().await;
                self.fail(SessionError::Scan { source: err }).await;
                return;
            },
        };

        info!("Found device {}", name);
        self.status.show(&format!("Status: Device found: {}.", name));
        self.central.stop_scan().await;

        self.enter_state(SessionState::Connecting).await;
        self.status.show("Connecting...");

        let connected = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = self.central.connect(&device) => result,
        };

        if let Err(err) = connected {
            self.fail(SessionError::Connect { source: err }).await;
            return;
        }

        self.enter_state(SessionState::DiscoveringServices).await;
        self.status.show("Status: Connected - reading services...");

        let required = [
            self.profile.accelerometer_service,
            self.profile.device_info_service,
        ];

        let discovered = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = self.central.discover_services(&device, &required) => result,
        };

        if let Err(err) = discovered {
            self.fail(SessionError::ServiceDiscovery { source: err }).await;
            return;
        }

        // Best effort; a peripheral that withholds these still works.
        for (label, uuid) in [
            ("model", self.profile.device_model),
            ("serial number", self.profile.serial_number),
            ("firmware revision", self.profile.firmware_revision),
        ] {
            let read = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.central.read_characteristic(&device, uuid) => result,
            };

            match read {
                Ok(value) => info!("Device {}: {}", label, String::from_utf8_lossy(&value)),
                Err(err) => debug!("Could not read device {}: {}", label, err),
            }
        }

        self.enter_state(SessionState::ArmingNotifications).await;
        self.status.show("Status: Starting notifications...");

        let armed = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = self.central.write_descriptor(
                &device,
                self.profile.accelerometer_data,
                self.profile.notification_descriptor,
                &ENABLE_NOTIFICATIONS,
            ) => result,
        };

        if let Err(err) = armed {
            warn!("{}", SessionError::NotificationArm { source: err });
        }

        if let Some(period) = self.settings.sample_period_ms {
            let period_bytes = period.to_le_bytes();
            let written = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = self.central.write_characteristic(
                    &device,
                    self.profile.accelerometer_period,
                    &period_bytes,
                ) => result,
            };

            if let Err(err) = written {
                warn!("Failed to set the sample period: {}", err);
            }
        }

        let subscribed = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = self.central.subscribe(&device, self.profile.accelerometer_data) => result,
        };

        let mut notifications = match subscribed {
            Ok(stream) => stream,
            Err(err) => {
                warn!("{}", SessionError::NotificationArm { source: err });
                stream::pending::<Vec<u8>>().boxed()
            },
        };

        self.enter_state(SessionState::Streaming).await;
        self.status.show("Status: Streaming orientation data.");

        let mut lost = false;

        'mainloop: loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    break 'mainloop;
                },
                next = notifications.next() => match next {
                    Some(data) => {
                        if self.events.send(SessionEvent::Sample(data)).await.is_err() {
                            debug!("Session event channel closed");
                            break 'mainloop;
                        }
                    },
                    None => {
                        lost = true;
                        break 'mainloop;
                    },
                },
            }
        }

        if lost {
            warn!("Connection lost");
            self.status.show("Status: Connection lost.");
            self.central.disconnect_all().await;
            self.enter_state(SessionState::Idle).await;
        }
    }
}
