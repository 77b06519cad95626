use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use super::{TimerState, TimerStatus};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub status: TimerStatus,
    pub is_finished: bool,
    pub display_time: String,
    pub progress: f64,
}

impl From<&TimerState> for TimerSnapshot {
    fn from(state: &TimerState) -> Self {
        Self {
            status: state.status(),
            is_finished: state.is_finished(),
            display_time: state.display_time(),
            progress: state.progress(),
            state: state.clone(),
        }
    }
}

impl TimerSnapshot {
    pub fn was_stopped(&self) -> bool {
        self.state.was_stopped
    }

    /// True while the timer carries a finished-or-stopped signal that a
    /// session completion should react to.
    pub fn signals_completion(&self) -> bool {
        self.is_finished || self.state.was_stopped
    }
}

/// One logical timer shared by every consumer. Clones share the same state,
/// tick source and update channel.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    updates: Arc<watch::Sender<TimerSnapshot>>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new(initial_minutes: u64) -> Self {
        Self::with_tick_interval(initial_minutes, Duration::from_secs(1))
    }

    pub fn with_tick_interval(initial_minutes: u64, tick_interval: Duration) -> Self {
        let state = TimerState::new(initial_minutes);
        let (updates, _) = watch::channel(TimerSnapshot::from(&state));
        Self {
            state: Arc::new(Mutex::new(state)),
            ticker: Arc::new(Mutex::new(None)),
            updates: Arc::new(updates),
            tick_interval,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.updates.subscribe()
    }

    pub async fn get_state(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::from(&*self.state.lock().await)
    }

    pub async fn set_time(&self, minutes: u64) -> TimerSnapshot {
        self.apply("set_time", |state| {
            state.set_time(minutes);
            true
        })
        .await
    }

    pub async fn start_timer(&self) -> TimerSnapshot {
        self.apply("start", TimerState::start).await
    }

    pub async fn pause_timer(&self) -> TimerSnapshot {
        self.apply("pause", TimerState::pause).await
    }

    pub async fn stop_timer(&self) -> TimerSnapshot {
        self.apply("stop", |state| {
            state.stop();
            true
        })
        .await
    }

    pub async fn reset_timer(&self) -> TimerSnapshot {
        self.apply("reset", |state| {
            state.reset();
            true
        })
        .await
    }

    pub async fn add_time(&self, minutes: u64) -> TimerSnapshot {
        self.apply("add_time", |state| {
            state.add_time(minutes);
            true
        })
        .await
    }

    pub async fn clear_timer(&self) -> TimerSnapshot {
        self.apply("clear", |state| {
            state.clear();
            true
        })
        .await
    }

    /// Clears only if nothing has mutated the timer since `epoch` was
    /// observed. Returns whether the clear happened.
    pub async fn clear_timer_at(&self, epoch: u64) -> bool {
        let mut cleared = false;
        self.apply("clear", |state| {
            if state.epoch != epoch {
                return false;
            }
            state.clear();
            cleared = true;
            true
        })
        .await;
        cleared
    }

    /// Stops the tick source without touching timer state. Used on shutdown.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    /// Runs one mutation and re-synchronises the tick source before anything
    /// else can observe the timer. The ticker lock is held across the whole
    /// operation so two concurrent mutations cannot leave a stale task in
    /// the slot.
    async fn apply<F>(&self, op: &'static str, mutate: F) -> TimerSnapshot
    where
        F: FnOnce(&mut TimerState) -> bool,
    {
        let mut ticker_guard = self.ticker.lock().await;

        let (snapshot, changed) = {
            let mut state = self.state.lock().await;
            let changed = mutate(&mut state);
            let snapshot = TimerSnapshot::from(&*state);
            if changed {
                self.updates.send_replace(snapshot.clone());
            }
            (snapshot, changed)
        };

        if !changed {
            log_debug!("timer {op} ignored in status {:?}", snapshot.status);
            return snapshot;
        }

        log_debug!(
            "timer {op}: {} remaining of {}s ({:?})",
            snapshot.display_time,
            snapshot.state.total_time,
            snapshot.status
        );

        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }
        if snapshot.state.should_tick() {
            *ticker_guard = Some(self.spawn_ticker(snapshot.state.epoch));
        }

        snapshot
    }

    fn spawn_ticker(&self, epoch: u64) -> JoinHandle<()> {
        let state = self.state.clone();
        let updates = self.updates.clone();
        let period = self.tick_interval;

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                let mut guard = state.lock().await;
                if guard.epoch != epoch {
                    log_debug!("discarding stale tick for epoch {epoch}");
                    break;
                }
                if !guard.tick() {
                    break;
                }
                let snapshot = TimerSnapshot::from(&*guard);
                updates.send_replace(snapshot.clone());

                if snapshot.is_finished {
                    log_info!("countdown of {}s finished", snapshot.state.total_time);
                    break;
                }
            }
        })
    }
}
