use std::path::PathBuf;
use clap::{Parser};
use log::{error, info};
use totembit::app::AppArgs;
use totembit::error::{AppRunError, ConfigError};
use totembit::{init_logging, run};

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Streams orientation from a micro:bit and publishes it as your status totem.", long_about = None)]
struct Args {
    /// Path to the configuration file, overriding the default lookup
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra advertised-name marker accepted when scanning for the device
    #[arg(long)]
    device_name: Option<String>,

    /// Milliseconds to scan before the still-waiting notice shows
    #[arg(long)]
    scan_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), AppRunError> {
    init_logging();
    info!(concat!("totembit ", env!("CARGO_PKG_VERSION")));

    let args = Args::parse();

    let app_args = AppArgs {
        config_path: args.config,
        device_name: args.device_name,
        scan_timeout_ms: args.scan_timeout_ms,
    };

    match run(app_args).await {
        Err(AppRunError::Config { source: ConfigError::CanNotLock { .. } }) => {
            error!("This application has already been started");
            Ok(())
        },
        Err(err) => {
            error!("Unexpected error: {}", err);
            Err(err)
        }
        Ok(_) => Ok(())
    }
}
