//! Hardware listener.
//!
//! Drains a `HardwareSource` into `SessionCoordinator::submit_button` for the
//! lifetime of the process. Noise and read errors are logged and skipped; the
//! loop only stops when the source ends or the token is cancelled. After a
//! read error the loop waits `READ_ERROR_BACKOFF` so a dead device does not
//! spin it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::coordinator::SessionCoordinator;
use crate::hardware::{HardwareEvent, HardwareSource};

pub const READ_ERROR_BACKOFF: Duration = Duration::from_millis(250);

/// Counters reported when the listener stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerStats {
    pub buttons: u64,
    pub noise: u64,
    pub errors: u64,
}

pub async fn run_listener<S: HardwareSource>(
    coordinator: SessionCoordinator,
    mut source: S,
    shutdown: CancellationToken,
) -> ListenerStats {
    let mut stats = ListenerStats::default();
    tracing::info!("Hardware listener started");

    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Hardware listener cancelled");
                break;
            }
            event = source.next_event() => event,
        };

        match event {
            Some(Ok(HardwareEvent::Button(signal))) => {
                stats.buttons += 1;
                let outcome = coordinator.submit_button(signal);
                tracing::trace!("Button {} -> {:?}", signal, outcome.effect);
            }
            Some(Ok(HardwareEvent::Noise(line))) => {
                stats.noise += 1;
                tracing::debug!("Ignoring panel noise: {:?}", line);
            }
            Some(Err(e)) => {
                stats.errors += 1;
                tracing::warn!("Hardware read error: {}", e);
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Hardware listener cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(READ_ERROR_BACKOFF) => {}
                }
            }
            None => {
                tracing::info!("Hardware event stream ended");
                break;
            }
        }
    }

    tracing::info!(
        "Hardware listener stopped ({} buttons, {} noise, {} errors)",
        stats.buttons,
        stats.noise,
        stats.errors
    );
    stats
}

/// Run the listener on its own task.
pub fn spawn_listener<S: HardwareSource>(
    coordinator: SessionCoordinator,
    source: S,
    shutdown: CancellationToken,
) -> JoinHandle<ListenerStats> {
    tokio::spawn(run_listener(coordinator, source, shutdown))
}
