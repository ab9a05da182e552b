use std::path::PathBuf;
use std::sync::Arc;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::io::ConfigIO;
use crate::device::central::BtleplugCentral;
use crate::device::session::ConnectionSession;
use crate::error::AppRunError;
use crate::orient::controller::{orientation_task, OrientationController};
use crate::publish::http::{HttpPresenceBroadcast, HttpStatusLog};
use crate::publish::publisher::{publisher_task, PresenceBroadcast, StatusLog, StatusPublisher};
use crate::status::{ConsoleStatusSink, StatusHandle};

/**
 * Command line overrides applied on top of the configuration file.
 */
#[derive(Debug, Default)]
pub struct AppArgs {
    pub config_path: Option<PathBuf>,
    pub device_name: Option<String>,
    pub scan_timeout_ms: Option<u64>,
}

/**
 * Wires configuration, publishers, controller and session together and runs
 * until interrupted. The exclusive lock on the config file guarantees that
 * only one instance of the application, and therefore one session, is live.
 */
pub async fn run_app(args: AppArgs) -> Result<(), AppRunError> {
    let mut config_io = ConfigIO::new_sync(args.config_path)?;
    let mut locker = config_io.locker()?;
    let _lock_guard = locker.lock()?;

    let mut config = config_io.read().await?;

    if let Some(name) = args.device_name {
        config.device.name_markers.push(name);
    }
    if let Some(timeout) = args.scan_timeout_ms {
        config.session.scan_timeout_ms = timeout;
    }

    let profile = config.to_profile()?;
    let settings = config.to_settings();

    let status: StatusHandle = Arc::new(ConsoleStatusSink);
    let cancel = CancellationToken::new();

    let log = config.status_log.as_ref().map(|remote| {
        Arc::new(HttpStatusLog::new(remote.base_url.clone())) as Arc<dyn StatusLog>
    });
    let presence = config.presence.as_ref().map(|remote| {
        Arc::new(HttpPresenceBroadcast::new(remote.url.clone())) as Arc<dyn PresenceBroadcast>
    });

    if log.is_none() {
        warn!("No status log configured; orientation changes are not logged remotely");
    }
    if presence.is_none() {
        warn!("No presence endpoint configured; broadcasts are disabled");
    }

    let user_id = config
        .status_log
        .as_ref()
        .map(|remote| remote.user_id.clone())
        .unwrap_or_else(|| String::from("anonymous"));

    let publisher = StatusPublisher::new(log, presence, &user_id);
    let (publish_tx, publisher_handle) = publisher_task(cancel.clone(), publisher);

    let controller =
        OrientationController::new(publish_tx, status.clone(), config.refresh_interval());
    let (events_tx, controller_handle) = orientation_task(cancel.clone(), controller);

    let central = Arc::new(BtleplugCentral::new().await?);
    let mut session = ConnectionSession::new(central, profile, settings, status.clone(), events_tx);

    session.start()?;

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for the shutdown signal: {}", err);
    }

    info!("Shutting down");
    session.stop().await;
    cancel.cancel();

    if let Err(err) = controller_handle.await {
        warn!("Failed to join orientation task: {}", err);
    }
    if let Err(err) = publisher_handle.await {
        warn!("Failed to join publisher task: {}", err);
    }

    Ok(())
}
