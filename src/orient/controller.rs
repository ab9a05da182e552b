use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use futures::channel::mpsc::{channel, Sender};
use futures::StreamExt;
use log::warn;
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::device::sample::decode_sample;
use crate::device::types::{SessionEvent, SessionState};
use crate::orient::classifier::{classify, Orientation};
use crate::publish::publisher::StatusChange;
use crate::status::StatusHandle;

/**
 * Feeds raw notification bytes through decode and classification, publishes
 * each genuine orientation change exactly once, and refreshes the
 * presentation at a throttled rate. The previous orientation lives here and
 * nowhere else.
 */
pub struct OrientationController {
    previous: Option<Orientation>,
    publisher: Sender<StatusChange>,
    status: StatusHandle,
    refresh_interval: Duration,
    last_refresh: Option<Instant>,
}

impl OrientationController {
    pub fn new(
        publisher: Sender<StatusChange>,
        status: StatusHandle,
        refresh_interval: Duration,
    ) -> Self {
        OrientationController {
            previous: None,
            publisher,
            status,
            refresh_interval,
            last_refresh: None,
        }
    }

    /**
     * Forgets the previous orientation so the next in-band sample counts as
     * a transition. Called when a session (re)enters streaming.
     */
    pub fn reset(&mut self) {
        self.previous = None;
        self.last_refresh = None;
    }

    pub fn current(&self) -> Option<Orientation> {
        self.previous
    }

    pub fn handle_sample(&mut self, data: &[u8]) {
        self.handle_sample_at(data, Instant::now(), unix_millis());
    }

    // Clock values are injected so tests can step time explicitly.
    fn handle_sample_at(&mut self, data: &[u8], now: Instant, timestamp: u64) {
        let sample = match decode_sample(data) {
            Ok(sample) => sample,
            Err(err) => {
                warn!("Dropping sample: {}", err);
                return;
            },
        };

        let result = classify(self.previous, &sample);

        if let (true, Some(orientation)) = (result.changed, result.orientation) {
            self.previous = Some(orientation);

            let change = StatusChange { orientation, timestamp };
            if self.publisher.try_send(change).is_err() {
                warn!("Publish queue full or closed, dropping {} change", orientation);
            }
        }

        // Presentation refresh shows the last stable state, throttled
        // independently of the unthrottled change publish above.
        if let Some(orientation) = self.previous {
            let due = match self.last_refresh {
                None => true,
                Some(last) => now.duration_since(last) >= self.refresh_interval,
            };

            if due {
                self.last_refresh = Some(now);
                self.status.show(&format!("Orientation: {}", orientation));
            }
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/**
 * Owns a controller and pumps session events out of a channel: samples are
 * processed strictly in arrival order, one at a time; entering streaming
 * resets the controller baseline.
 */
pub fn orientation_task(
    cancel: CancellationToken,
    mut controller: OrientationController,
) -> (Sender<SessionEvent>, JoinHandle<()>) {
    let (tx, mut rx) = channel::<SessionEvent>(128);

    let handle = spawn(async move {
        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                Some(event) = rx.next() => {
                    match event {
                        SessionEvent::Sample(data) => {
                            controller.handle_sample(&data);
                        },
                        SessionEvent::StateChange(SessionState::Streaming) => {
                            controller.reset();
                        },
                        SessionEvent::StateChange(_) => {},
                    }
                },
            }
        }
    });

    return (tx, handle);
}
