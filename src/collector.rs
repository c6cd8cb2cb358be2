//! Session-bounded fixed-cadence polling engine.
//!
//! Paces fetch+persist cycles at a fixed interval until the session close
//! cutoff, then dispatches exactly one drain cycle and stops. Pacing is
//! single-threaded; each cycle's work runs on its own task gated by a
//! bounded worker pool, so a slow cycle never delays the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::api::{jst_now, ApiError, Session};
use crate::db::{Db, StorageError};

/// Timing and sizing knobs for the polling loop.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_workers: usize,
    pub session_close: NaiveTime,
}

/// Loop phase relative to the session close cutoff.
///
/// The idle no-session state exists outside this type: a collector is only
/// constructed around a live session, so the login transition has already
/// happened by the time the loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before the cutoff: keep dispatching at the configured cadence.
    Polling,
    /// At or past the cutoff: terminal, one more cycle then stop.
    Draining,
}

/// Pure transition over the trading-region clock.
pub fn phase_for(now: NaiveTime, session_close: NaiveTime) -> Phase {
    if now < session_close {
        Phase::Polling
    } else {
        Phase::Draining
    }
}

/// A cycle's failure reason. Logged and dropped; the next scheduled tick
/// naturally supersedes the failed cycle.
#[derive(Debug, Error)]
enum CycleError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct Collector {
    session: Arc<Session>,
    db: Db,
    codes: Arc<Vec<String>>,
    settings: PollSettings,
}

impl Collector {
    pub fn new(session: Session, db: Db, codes: Vec<String>, settings: PollSettings) -> Self {
        Self {
            session: Arc::new(session),
            db,
            codes: Arc::new(codes),
            settings,
        }
    }

    /// Runs the polling loop to completion.
    ///
    /// Each tick: note the start instant, dispatch one cycle, then sleep
    /// whatever is left of the interval, so the cadence does not drift when
    /// dispatch takes time. A cycle that overruns the interval makes the
    /// next tick late but never shifts the pacing baseline.
    pub async fn run(&self) {
        let permits = Arc::new(Semaphore::new(self.settings.max_workers));
        let mut workers = JoinSet::new();
        let mut cycle: u64 = 0;

        info!(
            codes = self.codes.len(),
            interval_ms = self.settings.interval.as_millis() as u64,
            max_workers = self.settings.max_workers,
            session_close = %self.settings.session_close,
            "polling started"
        );

        loop {
            let phase = phase_for(jst_now().time(), self.settings.session_close);
            let started = Instant::now();
            cycle += 1;

            self.dispatch(cycle, &permits, &mut workers);

            if phase == Phase::Draining {
                info!(cycle, "session close reached; drain cycle dispatched");
                break;
            }

            let elapsed = started.elapsed();
            if elapsed < self.settings.interval {
                sleep(self.settings.interval - elapsed).await;
            }
        }

        // Let in-flight cycles (including the drain cycle) finish their
        // writes before returning.
        while workers.join_next().await.is_some() {}
        info!(cycles = cycle, "polling finished");
    }

    fn dispatch(&self, cycle: u64, permits: &Arc<Semaphore>, workers: &mut JoinSet<()>) {
        let permit = match permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                // All workers busy. Dropping beats queueing: a stalled
                // backend would otherwise pile up unbounded in-flight work.
                warn!(cycle, "worker pool saturated; cycle dropped");
                return;
            }
        };

        let session = self.session.clone();
        let db = self.db.clone();
        let codes = self.codes.clone();
        workers.spawn(async move {
            let _permit = permit;
            match run_cycle(&session, &db, &codes).await {
                Ok(rows) => debug!(cycle, rows, "cycle persisted"),
                Err(CycleError::Api(ApiError::Transport(e))) => {
                    warn!(cycle, error = %e, "fetch failed; cycle skipped");
                }
                Err(CycleError::Api(e)) => {
                    warn!(cycle, error = %e, "bad response; cycle skipped");
                }
                Err(CycleError::Storage(e)) => {
                    warn!(cycle, error = %e, "persist failed; batch rolled back");
                }
            }
        });
    }
}

async fn run_cycle(session: &Session, db: &Db, codes: &[String]) -> Result<usize, CycleError> {
    let batch = session.fetch_market_prices(codes).await?;
    let rows = batch.len();
    db.insert_snapshots(&batch).await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32, ms: u32) -> NaiveTime {
        NaiveTime::from_hms_milli_opt(h, m, s, ms).unwrap()
    }

    fn close() -> NaiveTime {
        t(15, 0, 0, 0)
    }

    #[test]
    fn before_cutoff_keeps_polling() {
        assert_eq!(phase_for(t(9, 0, 0, 0), close()), Phase::Polling);
        assert_eq!(phase_for(t(14, 59, 59, 999), close()), Phase::Polling);
    }

    #[test]
    fn at_and_after_cutoff_drains() {
        assert_eq!(phase_for(t(15, 0, 0, 0), close()), Phase::Draining);
        assert_eq!(phase_for(t(15, 0, 0, 1), close()), Phase::Draining);
    }

    /// A tick at 14:59:59.900 with a 125 ms interval must be followed by
    /// exactly one more cycle after the cutoff.
    #[test]
    fn exactly_one_cycle_runs_after_the_cutoff() {
        let interval = chrono::Duration::milliseconds(125);
        let mut now = t(14, 59, 59, 900);
        let mut dispatched_after_close = 0u32;
        let mut total = 0u32;

        loop {
            let phase = phase_for(now, close());
            total += 1;
            if now >= close() {
                dispatched_after_close += 1;
            }
            if phase == Phase::Draining {
                break;
            }
            now += interval;
        }

        assert_eq!(total, 2);
        assert_eq!(dispatched_after_close, 1);
    }

    /// Starting past the cutoff still dispatches the single drain cycle.
    #[test]
    fn late_start_dispatches_once() {
        let mut total = 0u32;
        let mut now = t(15, 10, 0, 0);
        loop {
            let phase = phase_for(now, close());
            total += 1;
            if phase == Phase::Draining {
                break;
            }
            now += chrono::Duration::milliseconds(125);
        }
        assert_eq!(total, 1);
    }
}
