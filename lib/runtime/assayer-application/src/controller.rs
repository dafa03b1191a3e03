//! Work-queue driver that keeps every stored assessment reconciled.
//!
//! Each assessment name is a queue key. A key is reconciled by at most one
//! task at a time; triggers that arrive while it is in flight mark it dirty
//! and it is reconciled again once the current pass finishes.
//!
//! Keys are fed by a full listing at start-up, a periodic resync, and an
//! optional [`AssessmentWatch`] that reports changes as they happen.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, error, info};

use assayer_ports::{AssessmentStore, AssessmentWatch, CancelToken};

use crate::reconciler::{ReconcileAction, Reconciler};

pub const DEFAULT_ERROR_BACKOFF_BASE: Duration = Duration::from_secs(5);
pub const DEFAULT_ERROR_BACKOFF_MAX: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RESYNC: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub error_backoff_base: Duration,
    pub error_backoff_max: Duration,
    pub resync: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            error_backoff_base: DEFAULT_ERROR_BACKOFF_BASE,
            error_backoff_max: DEFAULT_ERROR_BACKOFF_MAX,
            resync: DEFAULT_RESYNC,
        }
    }
}

/// Delay before retrying a key that has failed `failures` times in a row:
/// `base * 2^(failures - 1)`, capped at `max`.
pub fn backoff_delay(base: Duration, max: Duration, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exponent).min(max)
}

pub struct Controller {
    reconciler: Arc<Reconciler>,
    store: Arc<dyn AssessmentStore>,
    watch: Option<Arc<dyn AssessmentWatch>>,
    settings: ControllerSettings,
}

impl Controller {
    pub fn new(
        reconciler: Arc<Reconciler>,
        store: Arc<dyn AssessmentStore>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            reconciler,
            store,
            watch: None,
            settings,
        }
    }

    /// Reacts to watch events instead of waiting for the next resync.
    pub fn with_watch(mut self, watch: Arc<dyn AssessmentWatch>) -> Self {
        self.watch = Some(watch);
        self
    }

    /// Runs until `cancel` fires. Fails only when the initial listing of
    /// assessments fails; later errors are logged and retried.
    pub async fn run(self, cancel: CancelToken) -> Result<()> {
        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let (change_tx, mut change_rx) = mpsc::unbounded_channel();
        let mut queue = WorkQueue {
            reconciler: Arc::clone(&self.reconciler),
            settings: self.settings,
            cancel: cancel.clone(),
            keys: HashMap::new(),
            triggers: trigger_tx,
            done: done_tx,
        };

        let initial = self
            .store
            .list()
            .await
            .context("failed to list assessments")?;
        info!(assessments = initial.len(), watching = self.watch.is_some(), "controller started");
        for assessment in initial {
            queue.enqueue(assessment.name);
        }

        match self.watch.clone() {
            Some(watch) => {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if let Err(err) = watch.watch(&cancel, change_tx).await {
                        error!(error = %format!("{err:#}"), "assessment watch stopped, relying on resync");
                    }
                });
            }
            None => drop(change_tx),
        }

        let resync_every = self.settings.resync.max(Duration::from_secs(1));
        let mut resync = interval_at(Instant::now() + resync_every, resync_every);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("controller shutting down");
                    break;
                }
                _ = resync.tick() => match self.store.list().await {
                    Ok(assessments) => {
                        debug!(assessments = assessments.len(), "resync");
                        let live: HashSet<String> =
                            assessments.iter().map(|assessment| assessment.name.clone()).collect();
                        prune_keys(&mut queue.keys, &live);
                        for assessment in assessments {
                            queue.enqueue(assessment.name);
                        }
                    }
                    Err(err) => error!(error = %err, "failed to list assessments during resync"),
                },
                Some(name) = change_rx.recv() => {
                    debug!(assessment = %name, "assessment changed");
                    queue.enqueue(name);
                }
                Some(trigger) = trigger_rx.recv() => queue.fire(trigger),
                Some(done) = done_rx.recv() => queue.complete(done),
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Trigger {
    name: String,
    generation: u64,
}

struct Done {
    name: String,
    result: Result<ReconcileAction>,
}

#[derive(Debug, Default)]
pub(crate) struct KeyState {
    pub(crate) in_flight: bool,
    pub(crate) dirty: bool,
    pub(crate) failures: u32,
    /// Bumped whenever a delayed trigger is armed; older ones are dropped.
    pub(crate) generation: u64,
}

/// Forgets keys whose assessment is gone. Keys still in flight stay until
/// their reconcile reports back; pending delayed triggers for a forgotten key
/// are dropped when they fire.
pub(crate) fn prune_keys(keys: &mut HashMap<String, KeyState>, live: &HashSet<String>) {
    keys.retain(|name, state| state.in_flight || live.contains(name));
}

struct WorkQueue {
    reconciler: Arc<Reconciler>,
    settings: ControllerSettings,
    cancel: CancelToken,
    keys: HashMap<String, KeyState>,
    triggers: mpsc::UnboundedSender<Trigger>,
    done: mpsc::UnboundedSender<Done>,
}

impl WorkQueue {
    fn enqueue(&mut self, name: String) {
        let state = self.keys.entry(name.clone()).or_default();
        if state.in_flight {
            state.dirty = true;
            return;
        }
        state.in_flight = true;
        self.spawn(name);
    }

    fn enqueue_after(&mut self, name: String, delay: Duration) {
        if delay.is_zero() {
            self.enqueue(name);
            return;
        }
        let state = self.keys.entry(name.clone()).or_default();
        state.generation += 1;
        let trigger = Trigger {
            name,
            generation: state.generation,
        };
        let triggers = self.triggers.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            // The receiver is gone once the controller stops.
            let _ = triggers.send(trigger);
        });
    }

    fn fire(&mut self, trigger: Trigger) {
        let current = self
            .keys
            .get(&trigger.name)
            .is_some_and(|state| state.generation == trigger.generation);
        if current {
            self.enqueue(trigger.name);
        } else {
            debug!(assessment = %trigger.name, "dropping superseded requeue");
        }
    }

    fn spawn(&self, name: String) {
        let reconciler = Arc::clone(&self.reconciler);
        let cancel = self.cancel.clone();
        let done = self.done.clone();
        tokio::spawn(async move {
            let key = name.clone();
            let handle =
                tokio::spawn(async move { reconciler.reconcile_by_name(&cancel, &key).await });
            let result = match handle.await {
                Ok(result) => result.map_err(anyhow::Error::from),
                Err(join_error) => Err(anyhow!("reconcile task failed: {join_error}")),
            };
            let _ = done.send(Done { name, result });
        });
    }

    fn complete(&mut self, done: Done) {
        let Done { name, result } = done;
        let settings = self.settings;
        let state = self.keys.entry(name.clone()).or_default();
        state.in_flight = false;

        let requeue = match result {
            Ok(action) => {
                state.failures = 0;
                action.requeue_after()
            }
            Err(err) => {
                state.failures = state.failures.saturating_add(1);
                let delay = backoff_delay(
                    settings.error_backoff_base,
                    settings.error_backoff_max,
                    state.failures,
                );
                error!(
                    assessment = %name,
                    failures = state.failures,
                    retry_in_secs = delay.as_secs(),
                    error = %format!("{err:#}"),
                    "reconcile failed"
                );
                Some(delay)
            }
        };

        let dirty = std::mem::take(&mut state.dirty);
        if dirty {
            self.enqueue(name.clone());
        }
        if let Some(delay) = requeue {
            if dirty && delay.is_zero() {
                return;
            }
            self.enqueue_after(name, delay);
        }
    }
}
