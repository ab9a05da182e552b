use std::sync::Arc;
use async_trait::async_trait;
use futures::channel::mpsc::{channel, Sender};
use futures::StreamExt;
use log::{debug, warn};
use serde::Serialize;
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::PublishError;
use crate::orient::classifier::Orientation;

/**
 * Record appended to the status log for one orientation change.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub status: u8,
    pub timestamp: u64, // milliseconds since the unix epoch
}

#[async_trait]
pub trait StatusLog: Send + Sync {
    async fn append(&self, path: &str, record: &StatusRecord) -> Result<(), PublishError>;
}

#[async_trait]
pub trait PresenceBroadcast: Send + Sync {
    async fn send(&self, message: &str, icon: &str) -> Result<(), PublishError>;
}

/**
 * One orientation change as handed from the controller to the publisher.
 */
#[derive(Debug, Clone, Copy)]
pub struct StatusChange {
    pub orientation: Orientation,
    pub timestamp: u64,
}

/**
 * Fans an orientation change out to the status log and the presence
 * broadcaster. Both remotes are best-effort: failures are logged and never
 * reach the caller, and a failure of one does not keep the other from being
 * attempted.
 */
pub struct StatusPublisher {
    log: Option<Arc<dyn StatusLog>>,
    presence: Option<Arc<dyn PresenceBroadcast>>,
    log_path: String,
}

impl StatusPublisher {
    pub fn new(
        log: Option<Arc<dyn StatusLog>>,
        presence: Option<Arc<dyn PresenceBroadcast>>,
        user_id: &str,
    ) -> Self {
        StatusPublisher {
            log,
            presence,
            log_path: format!("user-status/{}", user_id),
        }
    }

    pub async fn publish(&self, change: StatusChange) {
        futures::join!(self.append_log(change), self.send_presence(change.orientation));
    }

    async fn append_log(&self, change: StatusChange) {
        let record = StatusRecord {
            status: change.orientation.status_code(),
            timestamp: change.timestamp,
        };

        match &self.log {
            None => debug!("Status log not configured, dropping record {:?}", record),
            Some(log) => {
                if let Err(err) = log.append(&self.log_path, &record).await {
                    warn!("Failed to append to status log: {}", err);
                }
            },
        }
    }

    async fn send_presence(&self, orientation: Orientation) {
        let presence = orientation.presence();

        match &self.presence {
            None => debug!("Presence broadcast not configured, dropping {}", orientation),
            Some(broadcast) => {
                if let Err(err) = broadcast.send(presence.message, presence.icon).await {
                    warn!("Failed to broadcast presence: {}", err);
                }
            },
        }
    }
}

/**
 * Owns the publisher and pumps orientation changes out of a channel, so a
 * slow remote can never stall sample handling upstream.
 */
pub fn publisher_task(
    cancel: CancellationToken,
    publisher: StatusPublisher,
) -> (Sender<StatusChange>, JoinHandle<()>) {
    let (tx, mut rx) = channel::<StatusChange>(64);

    let handle = spawn(async move {
        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                Some(change) = rx.next() => {
                    publisher.publish(change).await;
                },
            }
        }
    });

    return (tx, handle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingLog {
        calls: Mutex<Vec<(String, StatusRecord)>>,
        fail: bool,
    }

    impl RecordingLog {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(RecordingLog { calls: Mutex::new(Vec::new()), fail })
        }
    }

    #[async_trait]
    impl StatusLog for RecordingLog {
        async fn append(&self, path: &str, record: &StatusRecord) -> Result<(), PublishError> {
            self.calls.lock().unwrap().push((path.to_string(), *record));
            if self.fail {
                return Err(PublishError::BadStatus { status: 503 });
            }
            Ok(())
        }
    }

    struct RecordingBroadcast {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingBroadcast {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(RecordingBroadcast { calls: Mutex::new(Vec::new()), fail })
        }
    }

    #[async_trait]
    impl PresenceBroadcast for RecordingBroadcast {
        async fn send(&self, message: &str, icon: &str) -> Result<(), PublishError> {
            self.calls.lock().unwrap().push((message.to_string(), icon.to_string()));
            if self.fail {
                return Err(PublishError::BadStatus { status: 500 });
            }
            Ok(())
        }
    }

    fn change(orientation: Orientation) -> StatusChange {
        StatusChange { orientation, timestamp: 1_700_000_000_000 }
    }

    #[tokio::test]
    async fn appends_record_and_broadcasts_presence() {
        let log = RecordingLog::new(false);
        let broadcast = RecordingBroadcast::new(false);
        let publisher =
            StatusPublisher::new(Some(log.clone()), Some(broadcast.clone()), "42");

        publisher.publish(change(Orientation::TiltLeft)).await;

        let appended = log.calls.lock().unwrap().clone();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].0, "user-status/42");
        assert_eq!(appended[0].1, StatusRecord { status: 3, timestamp: 1_700_000_000_000 });

        let sent = broadcast.calls.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Focus time");
        assert_eq!(sent[0].1, ":headphones:");
    }

    #[tokio::test]
    async fn failing_log_does_not_stop_presence() {
        let log = RecordingLog::new(true);
        let broadcast = RecordingBroadcast::new(false);
        let publisher =
            StatusPublisher::new(Some(log.clone()), Some(broadcast.clone()), "0");

        publisher.publish(change(Orientation::Neutral)).await;

        assert_eq!(log.calls.lock().unwrap().len(), 1);
        assert_eq!(broadcast.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_presence_does_not_stop_log() {
        let log = RecordingLog::new(false);
        let broadcast = RecordingBroadcast::new(true);
        let publisher =
            StatusPublisher::new(Some(log.clone()), Some(broadcast.clone()), "0");

        publisher.publish(change(Orientation::Inverted)).await;

        assert_eq!(log.calls.lock().unwrap().len(), 1);
        assert_eq!(broadcast.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_remotes_are_skipped() {
        let publisher = StatusPublisher::new(None, None, "0");
        publisher.publish(change(Orientation::TiltBack)).await;
    }
}
