// ── Fixed-delay polling ──
//
// The gap between the end of one run and the start of the next is
// constant, so a slow device never causes overlapping runs. The first
// run starts after `initial_delay`, usually zero.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Run `tick` repeatedly with `delay` between runs until `cancel` fires.
///
/// Cancellation also abandons a run that is in progress.
pub async fn run_fixed_delay<F, Fut>(
    initial_delay: Duration,
    delay: Duration,
    cancel: CancellationToken,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    if !initial_delay.is_zero() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(initial_delay) => {}
        }
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tick() => {}
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns at most one fixed-delay task. Start and stop are idempotent.
#[derive(Default)]
pub struct Poller {
    running: Mutex<Option<Running>>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the polling task unless one is already running.
    ///
    /// The task stops when `parent` is cancelled or [`stop`](Self::stop) is
    /// called. Must be called from within a tokio runtime.
    /// Returns `true` if a task was started.
    pub fn start<F, Fut>(
        &self,
        parent: &CancellationToken,
        initial_delay: Duration,
        delay: Duration,
        tick: F,
    ) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.lock();
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return false;
        }

        let cancel = parent.child_token();
        let task = tokio::spawn(run_fixed_delay(initial_delay, delay, cancel.clone(), tick));
        *running = Some(Running { cancel, task });
        true
    }

    /// Cancel the polling task. Returns `true` if one was running.
    pub fn stop(&self) -> bool {
        match self.lock().take() {
            Some(running) => {
                running.cancel.cancel();
                !running.task.is_finished()
            }
            None => false,
        }
    }

    /// Cancel the polling task and wait for it to exit.
    pub async fn shutdown(&self) {
        let running = self.lock().take();
        if let Some(running) = running {
            running.cancel.cancel();
            let _ = running.task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|r| !r.task.is_finished() && !r.cancel.is_cancelled())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_run_is_immediate_and_delay_follows_completion() {
        let starts = Arc::new(Mutex::new(Vec::<Instant>::new()));
        let cancel = CancellationToken::new();
        let origin = Instant::now();
        let work = Duration::from_secs(3);
        let delay = Duration::from_secs(5);

        let recorded = Arc::clone(&starts);
        let handle = tokio::spawn(run_fixed_delay(
            Duration::ZERO,
            delay,
            cancel.clone(),
            move || {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().unwrap().push(Instant::now());
                    tokio::time::sleep(work).await;
                }
            },
        ));

        tokio::time::sleep(Duration::from_secs(30)).await;
        cancel.cancel();
        handle.await.unwrap();

        let starts = starts.lock().unwrap().clone();
        assert!(starts.len() >= 3, "only {} runs", starts.len());
        assert_eq!(starts[0], origin);
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= delay + work);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_abandons_in_flight_run() {
        let completed = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let done = Arc::clone(&completed);
        let handle = tokio::spawn(run_fixed_delay(
            Duration::ZERO,
            Duration::from_secs(1),
            cancel.clone(),
            move || {
                let done = Arc::clone(&done);
                async move {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                }
            },
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_are_idempotent() {
        let runs = Arc::new(AtomicUsize::new(0));
        let parent = CancellationToken::new();
        let poller = Poller::new();

        let tick = {
            let runs = Arc::clone(&runs);
            move || {
                let runs = Arc::clone(&runs);
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            }
        };

        assert!(poller.start(&parent, Duration::ZERO, Duration::from_secs(10), tick.clone()));
        assert!(!poller.start(&parent, Duration::ZERO, Duration::from_secs(10), tick.clone()));
        assert!(poller.is_running());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        assert!(poller.stop());
        assert!(!poller.stop());
        assert!(!poller.is_running());

        assert!(poller.start(&parent, Duration::ZERO, Duration::from_secs(10), tick));
        parent.cancel();
        poller.shutdown().await;
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn initial_delay_postpones_first_run() {
        let starts = Arc::new(Mutex::new(Vec::<Instant>::new()));
        let cancel = CancellationToken::new();
        let origin = Instant::now();

        let recorded = Arc::clone(&starts);
        let handle = tokio::spawn(run_fixed_delay(
            Duration::from_secs(4),
            Duration::from_secs(10),
            cancel.clone(),
            move || {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().unwrap().push(Instant::now());
                }
            },
        ));

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
        handle.await.unwrap();

        let starts = starts.lock().unwrap().clone();
        assert_eq!(starts, vec![origin + Duration::from_secs(4)]);
    }
}
