//! Integration tests for the scheduler loop: interval-after-cycle-end
//! pacing, survival of failing cycles, and cooperative shutdown. All run
//! against a paused tokio clock so timing assertions are exact.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use rss_post_scheduler::model::{ArchivedPost, Post, TargetLocation};
use rss_post_scheduler::scheduler::Scheduler;
use rss_post_scheduler::store::{PostStore, StoreError};
use rss_post_scheduler::workflow::PublicationWorkflow;

/// Store fake that only observes cycle activity: every cycle begins with a
/// `load_posts`, so its call times mark cycle starts.
#[derive(Default)]
struct RecordingStore {
    load_starts: Mutex<Vec<Instant>>,
    loads_finished: AtomicUsize,
    load_delay: Duration,
    fail_loads: AtomicBool,
}

impl RecordingStore {
    fn with_load_delay(delay: Duration) -> Self {
        Self {
            load_delay: delay,
            ..Self::default()
        }
    }

    fn load_starts(&self) -> Vec<Instant> {
        self.load_starts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PostStore for RecordingStore {
    async fn load_posts(&self) -> Result<Vec<Post>, StoreError> {
        self.load_starts.lock().unwrap().push(Instant::now());
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        self.loads_finished.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                operation: "get file",
                status: 500,
            });
        }
        Ok(Vec::new())
    }

    async fn save_posts(&self, _posts: &[Post], _commit_message: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn fetch_feed(
        &self,
        _target: &TargetLocation,
        _token: &str,
    ) -> Result<String, StoreError> {
        Ok(String::new())
    }

    async fn save_feed(
        &self,
        _target: &TargetLocation,
        _token: &str,
        _content: &str,
        _commit_message: &str,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn load_archive(&self) -> Result<Vec<ArchivedPost>, StoreError> {
        Ok(Vec::new())
    }

    async fn save_archive(&self, _archive: &[ArchivedPost]) -> Result<(), StoreError> {
        Ok(())
    }
}

const INTERVAL: Duration = Duration::from_secs(15);

fn spawn_scheduler(
    store: Arc<RecordingStore>,
    cycles_completed: Arc<AtomicU64>,
) -> (tokio::task::JoinHandle<()>, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(
        PublicationWorkflow::new(store),
        INTERVAL,
        cycles_completed,
        shutdown_rx,
    );
    let handle = tokio::spawn(scheduler.run());
    (handle, shutdown_tx)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(600), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(start_paused = true)]
async fn test_next_cycle_starts_one_interval_after_previous_end() {
    // Each cycle takes 5s; the interval must count from cycle end, so cycle
    // starts are 20s apart, not 15s (no wall-clock-periodic overlap).
    let store = Arc::new(RecordingStore::with_load_delay(Duration::from_secs(5)));
    let cycles_completed = Arc::new(AtomicU64::new(0));
    let (handle, shutdown_tx) = spawn_scheduler(store.clone(), cycles_completed.clone());

    {
        let store = store.clone();
        wait_until(move || store.load_starts().len() >= 3).await;
    }

    let starts = store.load_starts();
    assert_eq!(starts[1] - starts[0], INTERVAL + Duration::from_secs(5));
    assert_eq!(starts[2] - starts[1], INTERVAL + Duration::from_secs(5));

    {
        let cycles = cycles_completed.clone();
        wait_until(move || cycles.load(Ordering::SeqCst) >= 3).await;
    }

    shutdown_tx.send(true).expect("scheduler dropped receiver");
    tokio::time::timeout(Duration::from_secs(60), handle)
        .await
        .expect("scheduler did not stop after shutdown")
        .expect("scheduler task panicked");
}

#[tokio::test(start_paused = true)]
async fn test_failing_cycles_do_not_end_the_loop_or_count_as_completed() {
    let store = Arc::new(RecordingStore::default());
    store.fail_loads.store(true, Ordering::SeqCst);
    let cycles_completed = Arc::new(AtomicU64::new(0));
    let (handle, shutdown_tx) = spawn_scheduler(store.clone(), cycles_completed.clone());

    {
        let store = store.clone();
        wait_until(move || store.load_starts().len() >= 3).await;
    }

    // The loop kept scheduling cycles past the failures, and none of them
    // count as completed.
    assert!(store.load_starts().len() >= 3);
    assert_eq!(cycles_completed.load(Ordering::SeqCst), 0);

    shutdown_tx.send(true).expect("scheduler dropped receiver");
    tokio::time::timeout(Duration::from_secs(60), handle)
        .await
        .expect("scheduler did not stop after shutdown")
        .expect("scheduler task panicked");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_lets_in_flight_cycle_finish() {
    // Cycle takes 5s; the shutdown signal lands mid-cycle. The cycle must
    // run to completion and no further cycle may start.
    let store = Arc::new(RecordingStore::with_load_delay(Duration::from_secs(5)));
    let cycles_completed = Arc::new(AtomicU64::new(0));
    let (handle, shutdown_tx) = spawn_scheduler(store.clone(), cycles_completed.clone());

    {
        let store = store.clone();
        wait_until(move || !store.load_starts().is_empty()).await;
    }
    assert_eq!(store.loads_finished.load(Ordering::SeqCst), 0, "cycle still in flight");

    shutdown_tx.send(true).expect("scheduler dropped receiver");

    tokio::time::timeout(Duration::from_secs(60), handle)
        .await
        .expect("scheduler did not stop after shutdown")
        .expect("scheduler task panicked");

    // The in-flight cycle finished naturally and counted; nothing started
    // after the signal.
    assert_eq!(store.loads_finished.load(Ordering::SeqCst), 1);
    assert_eq!(store.load_starts().len(), 1);
    assert_eq!(cycles_completed.load(Ordering::SeqCst), 1);
}
