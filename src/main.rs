use std::io;
use std::process;

use log::{error, info, warn};
use time::UtcOffset;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use omni_mqtt_monitor::config::{self, MonitorConfig};
use omni_mqtt_monitor::dispatch::Dispatcher;
use omni_mqtt_monitor::models::QueueItem;
use omni_mqtt_monitor::mqtt::{connect, run_receiver};
use omni_mqtt_monitor::shutdown::Shutdown;
use omni_mqtt_monitor::utils;

const RECEIVER_STOP_SECS: u64 = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The local offset can only be read while the process is single-threaded
    let local_offset = utils::local_offset();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(local_offset))
}

async fn run(local_offset: UtcOffset) -> Result<(), Box<dyn std::error::Error>> {
    let args = config::parse_args();

    // Initialize logging
    let level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MonitorConfig::load(args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };
    info!(
        "Monitoring {} on {}:{}, {} location alias(es), {:?}",
        config.topic,
        config.host,
        config.port,
        config.aliases.len(),
        config.unit
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<QueueItem>();

    let (client, event_loop) = match connect(&config).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let shutdown = Shutdown::new(tx.clone(), Some(client.clone()));

    // Handle Ctrl+C: only flag and wake the dispatcher
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                signal_shutdown.trigger();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let receiver = tokio::spawn(run_receiver(
        event_loop,
        client,
        config.topic.clone(),
        tx,
        shutdown.clone(),
    ));

    let mut dispatcher = Dispatcher::new(config.aliases.clone(), config.unit, io::stdout())
        .with_local_offset(local_offset);
    let result = dispatcher.run(&mut rx, &shutdown).await;

    // Also tears the connection down when the dispatcher stopped on an error
    shutdown.trigger();
    if timeout(Duration::from_secs(RECEIVER_STOP_SECS), receiver)
        .await
        .is_err()
    {
        warn!("MQTT receiver did not stop in time");
    }

    match result {
        Ok(()) => {
            info!("Quitting ...");
            Ok(())
        }
        Err(e) => {
            error!("Fatal error: {}", e);
            process::exit(1);
        }
    }
}
