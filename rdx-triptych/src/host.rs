//! Wires the rotation engine to a scheduler and an event stream.

use crate::components::scheduler::{ActiveToken, Scheduler};
use crate::config::{normalize, DisplayConfig, RotationConfig};
use crate::engine::{Reconfigured, Rotation, RotationEngine, Snapshot};
use crate::events::RotationEvent;
use crate::loader;
use crate::settings::HostSettings;
use chrono::Utc;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, trace, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What [`Rotator::apply`] did with a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Identical to the configuration already in place; nothing changed.
    Unchanged,
    /// The engine was reconfigured.
    Applied(Reconfigured),
    /// The rotator has been shut down and no longer accepts configuration.
    Ignored,
}

/// State shared between the rotator and its scheduled ticks.
struct Shared {
    engine: RwLock<RotationEngine>,
    event_sender: broadcast::Sender<RotationEvent>,
}

impl Shared {
    /// Applies one tick. With a `guard`, the tick is discarded unless the
    /// scheduler run that produced it is still active once the lock is held.
    async fn rotate(&self, guard: Option<&ActiveToken>) -> Option<Rotation> {
        let mut engine = self.engine.write().await;
        if guard.is_some_and(|token| !token.is_active()) {
            trace!("Discarding tick from a stopped run.");
            return None;
        }
        let rotation = engine.tick()?;
        let snapshot = Arc::new(engine.snapshot());
        drop(engine);

        self.emit(RotationEvent::SlotRotated {
            rotation: rotation.clone(),
            snapshot,
            timestamp: Utc::now(),
        });
        Some(rotation)
    }

    fn emit(&self, event: RotationEvent) {
        self.event_sender.send(event).ok();
    }
}

/// A running rotation display.
///
/// The `Rotator` owns a [`RotationEngine`] behind a lock, the [`Scheduler`]
/// that ticks it, and the broadcast channel renderers subscribe to. The
/// scheduled tick and configuration changes both take the engine's write
/// lock, so they never interleave, and a configuration change restarts the
/// scheduler before any tick against the old interval can apply.
pub struct Rotator {
    shared: Arc<Shared>,
    scheduler: Scheduler,
    run_token: Option<ActiveToken>,
    defaults: RotationConfig,
    configured: bool,
    shut_down: bool,
}

// Construction and internal helpers.
impl Rotator {
    /// Builds an idle rotator from host settings.
    pub fn new(settings: &HostSettings) -> Self {
        let defaults = settings.defaults();
        let engine = match settings.seed {
            Some(seed) => RotationEngine::seeded(settings.slot_count, defaults, seed),
            None => RotationEngine::new(settings.slot_count, defaults),
        };
        Self::with_engine(engine, defaults)
    }

    /// Wraps an existing engine. `defaults` is the fallback timing used when
    /// normalizing configurations.
    pub fn with_engine(engine: RotationEngine, defaults: RotationConfig) -> Self {
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                engine: RwLock::new(engine),
                event_sender,
            }),
            scheduler: Scheduler::new(),
            run_token: None,
            defaults,
            configured: false,
            shut_down: false,
        }
    }

    fn start_scheduler(&mut self, interval: Duration) {
        let shared = self.shared.clone();
        let token = self.scheduler.start(interval, move |token| {
            let shared = shared.clone();
            async move {
                shared.rotate(Some(&token)).await;
            }
        });
        self.run_token = Some(token);
        self.shared.emit(RotationEvent::RotationStarted { interval });
    }

    fn stop_scheduler(&mut self) -> bool {
        self.run_token = None;
        let stopped = self.scheduler.stop();
        if stopped {
            self.shared.emit(RotationEvent::RotationStopped);
        }
        stopped
    }
}

// Public API.
impl Rotator {
    /// Normalizes `raw` and applies it.
    ///
    /// `None` stands for "no configuration" (for example a failed load) and
    /// yields an empty pool with the default timing.
    pub async fn apply(&mut self, raw: Option<&Value>) -> ApplyOutcome {
        let config = normalize(raw, self.defaults);
        self.apply_config(config).await
    }

    /// Applies an already normalized configuration.
    ///
    /// A configuration identical to the current one is a no-op. Otherwise the
    /// engine is reconfigured, the scheduler is stopped for an empty pool and
    /// (re)started when the interval changed or rotation was not running.
    pub async fn apply_config(&mut self, config: DisplayConfig) -> ApplyOutcome {
        if self.shut_down {
            warn!("Rotator is shut down, ignoring configuration.");
            return ApplyOutcome::Ignored;
        }

        let shared = self.shared.clone();
        let mut engine = shared.engine.write().await;
        if self.configured && engine.display_config() == config {
            debug!("Configuration unchanged.");
            return ApplyOutcome::Unchanged;
        }
        self.configured = true;

        let pool_size = config.pool.len();
        let rotation = config.rotation;
        let outcome = engine.apply(config);
        let snapshot = Arc::new(engine.snapshot());

        if pool_size == 0 {
            self.stop_scheduler();
        } else if outcome.interval_changed || !self.scheduler.is_running() {
            self.start_scheduler(rotation.interval());
        }
        drop(engine);

        info!(
            pool = pool_size,
            interval_ms = rotation.interval_ms(),
            fade_ms = rotation.fade_ms(),
            reinitialized = outcome.reinitialized,
            "Configuration applied."
        );
        self.shared.emit(RotationEvent::ConfigApplied {
            pool_size,
            interval: rotation.interval(),
            fade: rotation.fade(),
            reinitialized: outcome.reinitialized,
            snapshot,
            timestamp: Utc::now(),
        });
        ApplyOutcome::Applied(outcome)
    }

    /// Loads the document at `source` and applies it.
    pub async fn reload(&mut self, source: impl AsRef<Path>) -> ApplyOutcome {
        let raw = loader::load(source).await;
        self.apply(raw.as_ref()).await
    }

    /// Returns a copy of the current slot state.
    pub async fn snapshot(&self) -> Snapshot {
        self.shared.engine.read().await.snapshot()
    }

    /// The configuration currently in effect.
    pub async fn display_config(&self) -> DisplayConfig {
        self.shared.engine.read().await.display_config()
    }

    /// Subscribes to the `RotationEvent` stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RotationEvent> {
        self.shared.event_sender.subscribe()
    }

    pub fn is_rotating(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Resumes scheduled rotation. Returns `false` when there is nothing to
    /// rotate or the rotator is shut down. A running schedule is left as is.
    pub async fn start_rotation(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        if self.scheduler.is_running() {
            return true;
        }
        let (idle, interval) = {
            let engine = self.shared.engine.read().await;
            (engine.pool().is_empty(), engine.rotation().interval())
        };
        if idle {
            return false;
        }
        self.start_scheduler(interval);
        true
    }

    /// Pauses scheduled rotation. Slots keep their current images. Returns
    /// `false` if rotation was not running.
    pub async fn stop_rotation(&mut self) -> bool {
        let shared = self.shared.clone();
        let _engine = shared.engine.write().await;
        self.stop_scheduler()
    }

    /// Rotates one slot right away, outside the schedule.
    pub async fn tick_now(&self) -> Option<Rotation> {
        if self.shut_down {
            return None;
        }
        self.shared.rotate(None).await
    }

    /// Tears the rotator down. After this no tick mutates slot state, even
    /// one that was already in flight. Calling it again is a no-op.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        let shared = self.shared.clone();
        let _engine = shared.engine.write().await;
        self.stop_scheduler();
        self.shut_down = true;
        self.shared.emit(RotationEvent::Shutdown);
        info!("Rotator shut down.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SLOT_COUNT;
    use serde_json::json;
    use tokio::time::sleep;

    fn rotator(seed: u64) -> Rotator {
        let defaults = RotationConfig::new(100.0, 40.0).unwrap();
        Rotator::with_engine(RotationEngine::seeded(SLOT_COUNT, defaults, seed), defaults)
    }

    fn drain(rx: &mut broadcast::Receiver<RotationEvent>) -> Vec<RotationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn rotations(events: &[RotationEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, RotationEvent::SlotRotated { .. }))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_starts_rotation_at_configured_interval() {
        let mut rotator = rotator(1);
        let mut rx = rotator.subscribe();

        let raw = json!({ "images": ["a", "b", "c", "d"], "INTERVAL_MS": 200 });
        let outcome = rotator.apply(Some(&raw)).await;
        assert!(matches!(
            outcome,
            ApplyOutcome::Applied(Reconfigured { reinitialized: true, interval_changed: true })
        ));
        assert!(rotator.is_rotating());
        assert!(rotator.snapshot().await.slots.iter().all(|s| s.visible_image().is_some()));

        sleep(Duration::from_millis(650)).await;
        let events = drain(&mut rx);
        assert_eq!(rotations(&events), 3);
        assert!(matches!(events[0], RotationEvent::RotationStarted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_configuration_is_unchanged() {
        let mut rotator = rotator(2);
        let raw = json!(["a", "b", "c"]);
        assert!(matches!(rotator.apply(Some(&raw)).await, ApplyOutcome::Applied(_)));
        assert_eq!(rotator.apply(Some(&raw)).await, ApplyOutcome::Unchanged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_configuration_stops_rotation() {
        let mut rotator = rotator(3);
        rotator.apply(Some(&json!(["a", "b", "c"]))).await;
        let before = rotator.snapshot().await;
        let mut rx = rotator.subscribe();

        rotator.apply(None).await;
        assert!(!rotator.is_rotating());
        sleep(Duration::from_secs(1)).await;

        let events = drain(&mut rx);
        assert_eq!(rotations(&events), 0);
        assert!(events.iter().any(|e| matches!(e, RotationEvent::RotationStopped)));
        assert_eq!(rotator.snapshot().await.slots, before.slots);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_restarts_schedule() {
        let mut rotator = rotator(4);
        rotator
            .apply(Some(&json!({ "images": ["a", "b", "c", "d"], "intervalMs": 1000 })))
            .await;
        sleep(Duration::from_millis(900)).await;

        let mut rx = rotator.subscribe();
        let outcome = rotator
            .apply(Some(&json!({ "images": ["a", "b", "c", "d"], "intervalMs": 50 })))
            .await;
        assert_eq!(
            outcome,
            ApplyOutcome::Applied(Reconfigured {
                reinitialized: false,
                interval_changed: true
            })
        );

        sleep(Duration::from_millis(175)).await;
        assert_eq!(rotations(&drain(&mut rx)), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_shutdown_do_not_mutate_slots() {
        let mut rotator = rotator(5);
        rotator.apply(Some(&json!(["a", "b", "c", "d"]))).await;
        let token = rotator.run_token.clone().expect("scheduler running");

        rotator.shutdown().await;
        let frozen = rotator.snapshot().await;

        // A timer fire that raced the teardown.
        assert_eq!(rotator.shared.rotate(Some(&token)).await, None);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(rotator.snapshot().await, frozen);

        assert_eq!(rotator.tick_now().await, None);
        assert_eq!(rotator.apply(Some(&json!(["z"]))).await, ApplyOutcome::Ignored);
        rotator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_control() {
        let mut rotator = rotator(6);
        assert!(!rotator.start_rotation().await);
        assert_eq!(rotator.tick_now().await, None);

        rotator.apply(Some(&json!(["a", "b", "c", "d"]))).await;
        assert!(rotator.stop_rotation().await);
        assert!(!rotator.stop_rotation().await);

        let before = rotator.snapshot().await;
        let rotation = rotator.tick_now().await.unwrap();
        let after = rotator.snapshot().await;
        assert_ne!(before.slots[rotation.slot], after.slots[rotation.slot]);

        assert!(rotator.start_rotation().await);
        assert!(rotator.is_rotating());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rotation_keeps_a_running_schedule() {
        let mut rotator = rotator(8);
        rotator.apply(Some(&json!(["a", "b", "c", "d"]))).await;
        let token = rotator.run_token.clone().expect("scheduler running");
        sleep(Duration::from_millis(60)).await;

        let mut rx = rotator.subscribe();
        assert!(rotator.start_rotation().await);
        assert!(token.is_active());

        // The schedule keeps its phase: ticks land at 100 and 200 ms.
        sleep(Duration::from_millis(150)).await;
        let events = drain(&mut rx);
        assert!(!events
            .iter()
            .any(|e| matches!(e, RotationEvent::RotationStarted { .. })));
        assert_eq!(rotations(&events), 2);
    }

    #[tokio::test]
    async fn test_reload_from_missing_source_idles() {
        let mut rotator = rotator(7);
        let dir = tempfile::tempdir().unwrap();
        rotator.reload(dir.path().join("missing.json")).await;
        assert!(rotator.display_config().await.pool.is_empty());
        assert!(!rotator.is_rotating());
    }
}
