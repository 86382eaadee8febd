/// Startup checks for the collaborators the node relies on
///
/// The operating system owns network association and NTP. The node only
/// waits until both look usable before it starts sampling.
use log::{info, warn};
use time::OffsetDateTime;
use tokio::time::{sleep, Duration};

const POLL_INTERVAL_SECS: u64 = 1;
const REPORT_EVERY_POLLS: u32 = 10;

/// Earliest year a synchronized clock can report
pub const MIN_PLAUSIBLE_YEAR: i32 = 2024;

/// Block until `host` resolves through DNS
pub async fn wait_for_network(host: &str, port: u16) {
    let mut polls = 0u32;

    loop {
        match tokio::net::lookup_host((host, port)).await {
            Ok(mut addrs) => {
                if let Some(addr) = addrs.next() {
                    info!("Network ready: {} resolves to {}", host, addr.ip());
                    return;
                }
            }
            Err(e) => {
                if polls % REPORT_EVERY_POLLS == 0 {
                    warn!("Waiting for network, {} does not resolve: {}", host, e);
                }
            }
        }

        polls = polls.wrapping_add(1);
        sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
    }
}

/// Whether the clock has been set since boot
pub fn clock_is_plausible(now: OffsetDateTime) -> bool {
    now.year() >= MIN_PLAUSIBLE_YEAR
}

/// Block until the system clock has been synchronized
///
/// Request signatures carry the current date, so an unsynchronized clock
/// would produce tokens the endpoint rejects.
pub async fn wait_for_clock_sync() {
    let mut polls = 0u32;

    loop {
        let now = OffsetDateTime::now_utc();
        if clock_is_plausible(now) {
            info!("Clock synchronized: {}", now);
            return;
        }

        if polls % REPORT_EVERY_POLLS == 0 {
            warn!("Waiting for clock sync, system time is {}", now);
        }

        polls = polls.wrapping_add(1);
        sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
    }
}
