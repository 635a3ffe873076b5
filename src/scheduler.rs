//! Fixed-interval scheduler driving the publication workflow.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::store::PostStore;
use crate::workflow::PublicationWorkflow;

/// Drives [`PublicationWorkflow`] on a fixed interval until shutdown.
///
/// A cycle runs to completion before the interval starts counting, so cycles
/// never overlap and a slow cycle delays the next one. A failing cycle is
/// logged and the loop proceeds to the next interval. The shutdown signal is
/// consulted only between cycles: an in-flight cycle always finishes or
/// fails naturally before the loop stops.
pub struct Scheduler<S> {
    workflow: PublicationWorkflow<S>,
    interval: Duration,
    cycles_completed: Arc<AtomicU64>,
    shutdown: watch::Receiver<bool>,
}

impl<S: PostStore> Scheduler<S> {
    pub fn new(
        workflow: PublicationWorkflow<S>,
        interval: Duration,
        cycles_completed: Arc<AtomicU64>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            workflow,
            interval,
            cycles_completed,
            shutdown,
        }
    }

    /// Run cycles until shutdown is signalled. The first cycle starts
    /// immediately; each subsequent one starts an interval after the
    /// previous cycle ended. Only cycles that complete without error count
    /// toward `cycles_completed`.
    pub async fn run(mut self) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Starting publication scheduler"
        );

        loop {
            let now = Utc::now();
            debug!(at = %now.to_rfc3339(), "Checking for posts to publish");

            match self.workflow.run_cycle(now).await {
                Ok(summary) => {
                    self.cycles_completed.fetch_add(1, Ordering::Relaxed);
                    if summary.published > 0 || summary.errored > 0 {
                        info!(
                            scheduled = summary.scheduled,
                            due = summary.due,
                            published = summary.published,
                            errored = summary.errored,
                            "Cycle complete"
                        );
                    } else {
                        debug!(scheduled = summary.scheduled, "Cycle complete, nothing due");
                    }
                }
                Err(e) => error!("Publication cycle failed: {e:#}"),
            }

            // A signal received mid-cycle resolves `changed` immediately, so
            // the loop stops here without starting another cycle.
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.changed() => {
                    info!("Shutdown requested, stopping scheduler");
                    return;
                }
            }
        }
    }
}
