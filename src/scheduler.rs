//! Single-lane request scheduler
//!
//! All network access to one upstream funnels through one of these: callers
//! enqueue operations, a drain task services them strictly in FIFO order,
//! one at a time, with at least `min_interval` between the start of
//! consecutive operations. The scheduler never retries — rate-limit retry
//! policy belongs to the resource fetcher.

use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::errors::FetchError;
use crate::logger::{self, LogTag};

struct QueuedRequest {
    job: BoxFuture<'static, ()>,
    label: String,
}

struct SchedulerState {
    queue: VecDeque<QueuedRequest>,
    processing: bool,
}

pub struct RequestScheduler {
    state: Arc<Mutex<SchedulerState>>,
    last_request_at: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RequestScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                queue: VecDeque::new(),
                processing: false,
            })),
            last_request_at: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    /// Interval derived from an upstream's requests-per-minute budget.
    pub fn per_minute(max_per_minute: u32) -> Self {
        let min_interval = if max_per_minute > 0 {
            Duration::from_secs_f64(60.0 / max_per_minute as f64)
        } else {
            Duration::ZERO
        };
        Self::new(min_interval)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    /// Append an operation to the queue. The returned future settles once
    /// the operation has been dequeued and run to completion. Ordering is
    /// strict FIFO; there is no priority lane.
    pub fn enqueue<T, Fut>(
        &self,
        label: impl Into<String>,
        op: Fut,
    ) -> impl Future<Output = Result<T, FetchError>>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = oneshot::channel();

        let job: BoxFuture<'static, ()> = Box::pin(async move {
            let result = op.await;
            let _ = tx.send(result);
        });

        {
            let mut state = self.state.lock().unwrap();
            state.queue.push_back(QueuedRequest {
                job,
                label: label.clone(),
            });
            // Restart the drain task when the queue goes non-empty and no
            // drain is in flight. Both the check and the flag flip happen
            // under the same lock, so exactly one drain runs at a time.
            if !state.processing {
                state.processing = true;
                tokio::spawn(drain(
                    Arc::clone(&self.state),
                    Arc::clone(&self.last_request_at),
                    self.min_interval,
                ));
            }
        }

        async move {
            rx.await
                .unwrap_or_else(|_| Err(FetchError::Canceled(label)))
        }
    }
}

async fn drain(
    state: Arc<Mutex<SchedulerState>>,
    last_request_at: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
) {
    loop {
        let next = {
            let mut st = state.lock().unwrap();
            match st.queue.pop_front() {
                Some(request) => Some((request, st.queue.len())),
                None => {
                    st.processing = false;
                    None
                }
            }
        };
        let Some((request, remaining)) = next else {
            return;
        };

        let wait = {
            let last = last_request_at.lock().unwrap();
            last.map(|at| min_interval.saturating_sub(at.elapsed()))
                .unwrap_or(Duration::ZERO)
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        logger::debug(
            LogTag::Scheduler,
            &format!("processing: {} ({} queued behind)", request.label, remaining),
        );
        request.job.await;
        *last_request_at.lock().unwrap() = Some(Instant::now());

        // Brief yield between entries; the full interval is applied at the
        // top of the next iteration.
        tokio::task::yield_now().await;
    }
}
