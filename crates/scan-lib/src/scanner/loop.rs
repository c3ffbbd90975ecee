//! Periodic scan loop
//!
//! Runs scan cycles forever with a fixed cadence: sleep for the
//! configured interval minus the time the cycle took, floored at zero.
//! A failed cycle is logged and the loop carries on; only the shutdown
//! signal ends it.

use super::cycle::Scanner;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{info, warn};

pub struct ScanLoop {
    scanner: Scanner,
    interval: Duration,
}

impl ScanLoop {
    pub fn new(scanner: Scanner, interval: Duration) -> Self {
        Self { scanner, interval }
    }

    /// Run until the shutdown signal arrives
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting scan loop"
        );

        loop {
            let started = tokio::time::Instant::now();

            match self.scanner.run_cycle().await {
                Ok(summary) => info!(
                    devices = summary.device_count(),
                    appended = summary.appended,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "Cycle finished"
                ),
                // a bad cycle must not terminate the loop
                Err(e) => warn!(error = %e, "Scan cycle failed"),
            }

            let wait = next_delay(self.interval, started.elapsed());
            tokio::select! {
                _ = sleep(wait) => {}
                _ = shutdown.recv() => {
                    info!("Shutting down scan loop");
                    break;
                }
            }
        }
    }
}

/// Time to sleep before the next cycle: interval minus elapsed, never
/// negative
fn next_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_delay_subtracts_elapsed() {
        let delay = next_delay(Duration::from_secs(600), Duration::from_secs(45));
        assert_eq!(delay, Duration::from_secs(555));
    }

    #[test]
    fn test_next_delay_floors_at_zero() {
        // a cycle slower than the interval reschedules immediately
        let delay = next_delay(Duration::from_secs(60), Duration::from_secs(90));
        assert_eq!(delay, Duration::ZERO);
    }
}
