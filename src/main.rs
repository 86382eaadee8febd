mod config;
mod error;
mod models;
mod network;
mod processing;
mod sensor;
mod signing;
mod telemetry;
#[cfg(test)]
mod testing;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use config::NodeConfig;
use error::NodeError;
use models::TelemetryEvent;
use network::{wait_for_clock_sync, wait_for_network};
use processing::process;
use sensor::{open_linux_bus, BusTransport, ColorSensor};
use signing::{RequestDate, RequestSigner};
use telemetry::{HttpTransport, ReqwestTransport, TelemetryPublisher};

const BUS_RETRY_SECS: u64 = 2;

/// Pacing and identity for the sampling loop
struct LoopSettings {
    device_id: String,
    sample_interval: Duration,
    bus_retry: Duration,
}

/// Sleep for `duration`, returning true if shutdown was requested meanwhile
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = sleep(duration) => false,
        Ok(_) = shutdown.wait_for(|stop| *stop) => true,
    }
}

/// Acquire the sensor, then sample, classify and publish until shutdown
///
/// A missing device or a failed bus read drops the bus handle and acquires
/// it again after `bus_retry`. Unknown readings are skipped. Failed
/// publishes are logged and dropped.
async fn main_loop<A, B, T, C>(
    mut acquire_bus: A,
    publisher: &TelemetryPublisher<T>,
    settings: &LoopSettings,
    clock: C,
    mut shutdown: watch::Receiver<bool>,
) where
    A: FnMut() -> Result<B, NodeError>,
    B: BusTransport,
    T: HttpTransport,
    C: Fn() -> RequestDate,
{
    info!("Starting color sampling loop");

    while !*shutdown.borrow() {
        let mut sensor = match acquire_bus().and_then(ColorSensor::discover) {
            Ok(sensor) => sensor,
            Err(e) => {
                match e {
                    NodeError::DeviceNotFound => warn!("No I2C devices found."),
                    e => error!("Failed to acquire sensor: {}", e),
                }
                if wait_or_shutdown(&mut shutdown, settings.bus_retry).await {
                    break;
                }
                continue;
            }
        };
        info!("Color sensor ready at 0x{:02X}", sensor.address());

        loop {
            let window = match sensor.read_window() {
                Ok(window) => window,
                Err(e) => {
                    error!("Sensor read failed, reacquiring bus: {}", e);
                    if wait_or_shutdown(&mut shutdown, settings.bus_retry).await {
                        return;
                    }
                    break;
                }
            };

            let (averaged, class) = process(&window);
            debug!(
                "8-bit RGB: {} {} {} ({})",
                averaged.red,
                averaged.green,
                averaged.blue,
                averaged.hex()
            );
            info!("Color Name: {}", class);

            let date = clock();
            if let Some(event) = TelemetryEvent::for_reading(&settings.device_id, &date, class) {
                match publisher.publish(&event, &date).await {
                    Ok(result) => {
                        info!("Status: {}", result.status_code);
                        info!("Body: {}", result.body);
                    }
                    Err(e) => error!("Dropping reading {}: {}", event.id, e),
                }
            }

            if wait_or_shutdown(&mut shutdown, settings.sample_interval).await {
                return;
            }
        }
    }
}

/// Log a startup failure and convert it for `main`
fn abort_startup(e: NodeError) -> Box<dyn std::error::Error> {
    if e.is_fatal() {
        error!("Fatal: {}", e);
    } else {
        error!("Startup failed: {}", e);
    }
    e.into()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = NodeConfig::new().map_err(abort_startup)?;
    config.log_summary();

    // Without a usable key no request could be authenticated
    let signer = RequestSigner::from_base64(&config.master_key_b64).map_err(abort_startup)?;

    let target = config.publish_target().map_err(abort_startup)?;
    let host = target
        .url()
        .host_str()
        .unwrap_or(&config.cosmos_host)
        .to_string();
    let port = target.url().port_or_known_default().unwrap_or(443);
    let transport = ReqwestTransport::new(config.http_timeout).map_err(abort_startup)?;
    let publisher =
        TelemetryPublisher::new(transport, target, signer).with_retry(config.retry_policy());

    // Handle Ctrl+C gracefully
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        let _ = tx.send(true);
    });

    let mut startup_rx = rx.clone();
    tokio::select! {
        _ = async {
            wait_for_network(&host, port).await;
            wait_for_clock_sync().await;
        } => {}
        Ok(_) = startup_rx.wait_for(|stop| *stop) => {
            info!("Program terminated by user during startup.");
            return Ok(());
        }
    }

    let settings = LoopSettings {
        device_id: config.device_id.clone(),
        sample_interval: config.sample_interval,
        bus_retry: Duration::from_secs(BUS_RETRY_SECS),
    };
    let bus_path = config.i2c_bus.clone();

    main_loop(
        || open_linux_bus(&bus_path),
        &publisher,
        &settings,
        RequestDate::now,
        rx,
    )
    .await;

    info!("Program terminated by user. Exiting gracefully.");
    Ok(())
}
