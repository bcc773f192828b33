//! A restartable periodic timer with an explicit cancellation token.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, trace};

/// Shortest period a run will use.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);
/// Longest period a run will use.
pub const MAX_PERIOD: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Liveness flag shared between a scheduler run and its callbacks.
///
/// Every call to [`Scheduler::start`] creates a fresh token; [`Scheduler::stop`]
/// cancels it. A callback that awaits (for example on a lock) must check
/// [`ActiveToken::is_active`] again before applying any effect, because the
/// run may have been stopped while it was waiting.
#[derive(Debug, Clone)]
pub struct ActiveToken(Arc<AtomicBool>);

impl ActiveToken {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// A token that is already cancelled.
    pub fn cancelled() -> Self {
        let token = Self::new();
        token.cancel();
        token
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(&self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Run {
    interval: Duration,
    token: ActiveToken,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Invokes a callback at a fixed period until stopped.
///
/// The period of a running scheduler is never changed in place: starting
/// again stops the current run first. Must be used from within a tokio
/// runtime.
#[derive(Default)]
pub struct Scheduler {
    run: Option<Run>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts invoking `callback` every `interval`, the first call one full
    /// interval from now. Any previous run is stopped first. `interval` is
    /// clamped to `MIN_PERIOD..=MAX_PERIOD`.
    ///
    /// Returns the token of the new run.
    pub fn start<F, Fut>(&mut self, interval: Duration, mut callback: F) -> ActiveToken
    where
        F: FnMut(ActiveToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        let interval = interval.clamp(MIN_PERIOD, MAX_PERIOD);
        let token = ActiveToken::new();
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        if !task_token.is_active() {
                            break;
                        }
                        callback(task_token.clone()).await;
                    }
                }
            }
            trace!("Scheduler task exited.");
        });

        info!(?interval, "Scheduler started.");
        self.run = Some(Run {
            interval,
            token: token.clone(),
            shutdown_tx,
            handle,
        });
        token
    }

    /// Stops the current run. Returns `false` if nothing was running.
    pub fn stop(&mut self) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };
        run.token.cancel();
        run.shutdown_tx.send(()).ok();
        run.handle.abort();
        info!("Scheduler stopped.");
        true
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// The period of the current run.
    pub fn interval(&self) -> Option<Duration> {
        self.run.as_ref().map(|run| run.interval)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::time::sleep;

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnMut(ActiveToken) -> std::future::Ready<()> {
        let counter = counter.clone();
        move |_token| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.start(Duration::from_millis(100), counting(&counter));

        sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(300)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.interval(), Some(Duration::from_millis(100)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_invocations_and_is_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        let token = scheduler.start(Duration::from_millis(100), counting(&counter));

        sleep(Duration::from_millis(250)).await;
        assert!(scheduler.stop());
        assert!(!token.is_active());
        assert!(!scheduler.is_running());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!scheduler.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_the_running_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        let first = scheduler.start(Duration::from_millis(100), counting(&counter));

        sleep(Duration::from_millis(250)).await;
        let second = scheduler.start(Duration::from_millis(50), counting(&counter));
        assert!(!first.is_active());
        assert!(second.is_active());

        sleep(Duration::from_millis(120)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(scheduler.interval(), Some(Duration::from_millis(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_token_is_cancelled_by_stop() {
        let seen: Arc<Mutex<Option<ActiveToken>>> = Arc::new(Mutex::new(None));
        let mut scheduler = Scheduler::new();
        let slot = seen.clone();
        scheduler.start(Duration::from_millis(10), move |token| {
            *slot.lock().unwrap() = Some(token);
            std::future::ready(())
        });

        sleep(Duration::from_millis(15)).await;
        let token = seen.lock().unwrap().clone().expect("callback ran");
        assert!(token.is_active());

        scheduler.stop();
        assert!(!token.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_runs_at_minimum_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.start(Duration::ZERO, counting(&counter));
        assert_eq!(scheduler.interval(), Some(MIN_PERIOD));

        sleep(Duration::from_micros(3500)).await;
        let fired = counter.load(Ordering::SeqCst);
        assert!((3..=4).contains(&fired), "fired {fired} times");
        assert!(scheduler.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_is_capped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.start(Duration::MAX, counting(&counter));
        assert_eq!(scheduler.interval(), Some(MAX_PERIOD));

        sleep(Duration::from_secs(60 * 60 * 24)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(scheduler.stop());
    }

    #[test]
    fn test_cancelled_token_is_inactive() {
        assert!(!ActiveToken::cancelled().is_active());
    }
}
