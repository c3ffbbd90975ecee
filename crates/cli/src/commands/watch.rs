//! Periodic scanning with a cancellable timer
//!
//! Runs one cycle to completion, sleeps for the interval minus the time
//! the cycle took (floored at zero) and repeats until Ctrl+C. A failed
//! cycle is reported and the loop continues. The Ctrl+C future is armed
//! once for the whole run, so the signal also interrupts a cycle in
//! flight instead of only the sleep between cycles.

use super::setup;
use crate::output;
use crate::Cli;
use anyhow::Result;
use std::future::Future;
use std::time::{Duration, Instant};

pub async fn run(cli: &Cli, interval_secs: u64, concurrency: usize) -> Result<()> {
    let price_config = setup::ensure_price(cli)?;
    let scanner = super::scan::build_scanner(cli, concurrency, price_config.electricity_price)?;
    let interval = Duration::from_secs(interval_secs);

    output::print_info(&format!(
        "Scanning every {}s, Ctrl+C to stop",
        interval_secs
    ));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let started = Instant::now();

        match interruptible(scanner.run_cycle(), &mut ctrl_c).await {
            Some(Ok(summary)) => {
                output::print_devices(&summary, cli.format);
                output::print_summary(&summary);
            }
            Some(Err(e)) => output::print_error(&format!("Scan failed: {:#}", e)),
            None => {
                output::print_info("Stopped");
                return Ok(());
            }
        }

        let wait = interval.saturating_sub(started.elapsed());
        output::print_info(&format!("Next scan in {}s", wait.as_secs()));

        if interruptible(tokio::time::sleep(wait), &mut ctrl_c)
            .await
            .is_none()
        {
            output::print_info("Stopped");
            return Ok(());
        }
    }
}

/// Run `work` to completion unless `shutdown` finishes first; `None`
/// means the shutdown won
async fn interruptible<W, S>(work: W, shutdown: &mut S) -> Option<W::Output>
where
    W: Future,
    S: Future + Unpin,
{
    tokio::pin!(work);
    tokio::select! {
        out = &mut work => Some(out),
        _ = shutdown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_preempts_running_work() {
        // work that never finishes must not block the shutdown signal
        let mut shutdown = std::future::ready(());
        let out = interruptible(std::future::pending::<()>(), &mut shutdown).await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_work_completes_without_shutdown() {
        let mut shutdown = std::future::pending::<()>();
        let out = interruptible(std::future::ready(7), &mut shutdown).await;
        assert_eq!(out, Some(7));
    }
}
