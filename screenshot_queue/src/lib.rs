use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// One scheduled screenshot refresh. The id is `{token_id}-{total_count}`,
/// so re-triggering a sync for an unchanged garden collapses onto the
/// in-flight job instead of rendering twice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenshotJob {
    pub id: String,
    pub url: String,
    pub token_id: String,
}

/// Consumer side of the queue: applies a captured image to storage.
/// Execution guarantees live with the implementor, not the scheduler.
#[async_trait]
pub trait ScreenshotJobHandler: Send + Sync {
    async fn apply_image(&self, job: &ScreenshotJob) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    /// Delay before the first attempt
    pub delay: Duration,

    /// Ordered retry delays walked on successive failures; exhaustion
    /// abandons the job
    pub retry_schedule: Vec<Duration>,

    /// Replace an in-flight job with the same id instead of returning it
    pub override_existing: bool,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(30),
            retry_schedule: vec![
                Duration::from_secs(15),
                Duration::from_secs(30),
                Duration::from_secs(60),
                Duration::from_secs(5 * 60),
                Duration::from_secs(10 * 60),
                Duration::from_secs(30 * 60),
                Duration::from_secs(3600),
                Duration::from_secs(2 * 3600),
                Duration::from_secs(4 * 3600),
            ],
            override_existing: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
    pub enqueued_at: DateTime<Utc>,
}

struct InFlight {
    handle: JobHandle,
    task: tokio::task::JoinHandle<()>,
}

/// In-process scheduler for screenshot refresh jobs.
///
/// Scheduling is idempotent per job id: enqueueing an id that is already
/// scheduled or running is a no-op returning the existing handle, unless
/// the caller explicitly overrides.
#[derive(Clone)]
pub struct ScreenshotQueue {
    handler: Arc<dyn ScreenshotJobHandler>,
    jobs: Arc<Mutex<HashMap<String, InFlight>>>,
}

impl ScreenshotQueue {
    pub fn new(handler: Arc<dyn ScreenshotJobHandler>) -> Self {
        Self {
            handler,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn enqueue(&self, job: ScreenshotJob, options: EnqueueOptions) -> JobHandle {
        let mut jobs = self.jobs.lock().await;

        if let Some(existing) = jobs.get(&job.id) {
            if !options.override_existing && !existing.task.is_finished() {
                debug!(job_id = %job.id, "job already in flight, returning existing handle");
                return existing.handle.clone();
            }
            existing.task.abort();
            warn!(job_id = %job.id, "in-flight job overridden");
        }

        let handle = JobHandle {
            id: job.id.clone(),
            enqueued_at: Utc::now(),
        };

        let task = tokio::spawn(run_job(
            Arc::clone(&self.handler),
            Arc::clone(&self.jobs),
            job.clone(),
            options,
        ));

        info!(job_id = %job.id, token_id = %job.token_id, "screenshot job scheduled");
        jobs.insert(
            job.id,
            InFlight {
                handle: handle.clone(),
                task,
            },
        );

        handle
    }

    /// Number of jobs scheduled or running
    pub async fn pending_jobs(&self) -> usize {
        self.jobs.lock().await.len()
    }
}

async fn run_job(
    handler: Arc<dyn ScreenshotJobHandler>,
    jobs: Arc<Mutex<HashMap<String, InFlight>>>,
    job: ScreenshotJob,
    options: EnqueueOptions,
) {
    sleep(options.delay).await;

    let mut attempt = 0usize;
    loop {
        match handler.apply_image(&job).await {
            Ok(()) => {
                info!(job_id = %job.id, attempts = attempt + 1, "screenshot applied");
                break;
            }
            Err(e) => match options.retry_schedule.get(attempt) {
                Some(delay) => {
                    warn!(
                        job_id = %job.id,
                        attempt = attempt + 1,
                        retry_in_secs = delay.as_secs(),
                        "screenshot apply failed: {e:#}"
                    );
                    sleep(*delay).await;
                    attempt += 1;
                }
                None => {
                    error!(
                        job_id = %job.id,
                        attempts = attempt + 1,
                        "retry ladder exhausted, abandoning job: {e:#}"
                    );
                    break;
                }
            },
        }
    }

    jobs.lock().await.remove(&job.id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct CountingHandler {
        calls: AtomicUsize,
        fail_first: usize,
        done: Notify,
    }

    impl CountingHandler {
        fn new(fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_first,
                done: Notify::new(),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScreenshotJobHandler for CountingHandler {
        async fn apply_image(&self, _job: &ScreenshotJob) -> anyhow::Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                anyhow::bail!("transient failure {call}");
            }
            self.done.notify_waiters();
            Ok(())
        }
    }

    fn job(id: &str) -> ScreenshotJob {
        ScreenshotJob {
            id: id.to_string(),
            url: "https://renders.test/garden.png".to_string(),
            token_id: "5".to_string(),
        }
    }

    fn fast_options() -> EnqueueOptions {
        EnqueueOptions {
            delay: Duration::from_millis(10),
            retry_schedule: vec![Duration::from_millis(10); 3],
            override_existing: false,
        }
    }

    async fn drain(queue: &ScreenshotQueue) {
        while queue.pending_jobs().await > 0 {
            sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn duplicate_enqueue_collapses_to_one_job() {
        let handler = CountingHandler::new(0);
        let queue = ScreenshotQueue::new(handler.clone());

        let first = queue.enqueue(job("5-12"), fast_options()).await;
        let second = queue.enqueue(job("5-12"), fast_options()).await;

        assert_eq!(first.id, second.id);
        assert_eq!(first.enqueued_at, second.enqueued_at);
        assert_eq!(queue.pending_jobs().await, 1);

        drain(&queue).await;
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn walks_retry_ladder_until_success() {
        let handler = CountingHandler::new(2);
        let queue = ScreenshotQueue::new(handler.clone());

        queue.enqueue(job("5-12"), fast_options()).await;
        drain(&queue).await;

        // two failures then a success
        assert_eq!(handler.calls(), 3);
    }

    #[tokio::test]
    async fn abandons_job_after_ladder_exhaustion() {
        let handler = CountingHandler::new(usize::MAX);
        let queue = ScreenshotQueue::new(handler.clone());

        queue.enqueue(job("5-12"), fast_options()).await;
        drain(&queue).await;

        // initial attempt plus one per ladder rung
        assert_eq!(handler.calls(), 4);
    }

    #[tokio::test]
    async fn override_replaces_in_flight_job() {
        let handler = CountingHandler::new(0);
        let queue = ScreenshotQueue::new(handler.clone());

        let slow = EnqueueOptions {
            delay: Duration::from_secs(60),
            ..fast_options()
        };
        let first = queue.enqueue(job("5-12"), slow).await;

        let mut replace = fast_options();
        replace.override_existing = true;
        let second = queue.enqueue(job("5-12"), replace).await;

        assert!(second.enqueued_at >= first.enqueued_at);
        drain(&queue).await;

        // only the replacement ran; the original was aborted mid-delay
        assert_eq!(handler.calls(), 1);
    }

    #[tokio::test]
    async fn distinct_ids_run_independently() {
        let handler = CountingHandler::new(0);
        let queue = ScreenshotQueue::new(handler.clone());

        queue.enqueue(job("5-12"), fast_options()).await;
        queue.enqueue(job("6-3"), fast_options()).await;
        assert_eq!(queue.pending_jobs().await, 2);

        drain(&queue).await;
        assert_eq!(handler.calls(), 2);
    }
}
