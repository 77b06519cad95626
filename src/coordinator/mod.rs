//! Bridges timer completion and session completion. Owns the processed-id
//! guard; mutates the timer and the ledger only through their operations.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    chat::{directive::session_complete_directive, ChatMessage, ChatSender, SendOptions},
    ledger::{SessionLedger, SharedLedger},
    models::StudySession,
    settings::AppConfig,
    timer::{state::SECONDS_PER_MINUTE, TimerController, TimerSnapshot, TimerState},
};

pub mod guard;
pub mod intake;

pub use guard::{CompletionGuard, GuardDecision};
pub use intake::{InputRouter, Submission};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Pause before the completion message goes out.
    pub send_delay: Duration,
    /// Pause before the timer is cleared. Always longer than `send_delay`.
    pub clear_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            send_delay: Duration::from_millis(500),
            clear_delay: Duration::from_millis(1500),
        }
    }
}

impl From<&AppConfig> for CoordinatorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            send_delay: Duration::from_millis(config.completion_send_delay_ms),
            clear_delay: Duration::from_millis(config.timer_clear_delay_ms),
        }
    }
}

/// Whole minutes of countdown actually used, rounded to nearest.
pub fn elapsed_minutes(state: &TimerState) -> u32 {
    let minutes = state.elapsed_secs() as f64 / SECONDS_PER_MINUTE as f64;
    minutes.round() as u32
}

/// A session finalised from a finished or stopped timer.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub session: StudySession,
    /// Completion message wrapped in its directive.
    pub text: String,
}

/// Records the current session with the minutes `snapshot` shows as used.
/// The caller holds the ledger lock and has already decided the signal is
/// new for this session.
pub fn complete_current(ledger: &mut SessionLedger, snapshot: &TimerSnapshot) -> Option<Completion> {
    let actual_minutes = elapsed_minutes(&snapshot.state);
    let session = ledger.complete_study_session(Some(actual_minutes))?;
    log_info!(
        "Timer {} for session {}; recorded {actual_minutes} min",
        if snapshot.is_finished { "finished" } else { "was stopped" },
        session.id
    );

    let message = ledger.completion_message(&session, snapshot.is_finished);
    Some(Completion {
        session,
        text: session_complete_directive(&message),
    })
}

pub struct Coordinator {
    timer: TimerController,
    ledger: SharedLedger,
    chat: Arc<dyn ChatSender>,
    config: CoordinatorConfig,
    guard: CompletionGuard,
}

impl Coordinator {
    pub fn new(
        timer: TimerController,
        ledger: SharedLedger,
        chat: Arc<dyn ChatSender>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            timer,
            ledger,
            chat,
            config,
            guard: CompletionGuard::new(),
        }
    }

    pub fn guard(&self) -> &CompletionGuard {
        &self.guard
    }

    /// One observation cycle. The ledger stays locked for the whole cycle,
    /// so starts and cancels land strictly before or after it. Returns the
    /// session finalised by this cycle, if any.
    pub async fn observe(&mut self) -> Option<StudySession> {
        let mut ledger = self.ledger.lock().await;
        let snapshot = self.timer.get_snapshot().await;
        let current_id = ledger.current_session().map(|session| session.id.clone());

        match self
            .guard
            .evaluate(snapshot.signals_completion(), current_id.as_deref())
        {
            GuardDecision::Complete(session_id) => {
                log_debug!("Completing session {session_id}");
                let completion = complete_current(&mut ledger, &snapshot)?;
                drop(ledger);

                self.schedule_follow_up(completion.text, snapshot.state.epoch);
                Some(completion.session)
            }
            GuardDecision::Rearm => {
                log_debug!("Completion guard re-armed for session {current_id:?}");
                None
            }
            GuardDecision::Hold => None,
        }
    }

    /// Sends the completion message `send_delay` after scheduling without
    /// waiting for it, then clears the timer at `clear_delay`, unless the
    /// timer was touched since the completion was observed.
    fn schedule_follow_up(&self, text: String, epoch: u64) -> JoinHandle<()> {
        let chat = self.chat.clone();
        let timer = self.timer.clone();
        let CoordinatorConfig {
            send_delay,
            clear_delay,
        } = self.config;

        let scheduled_at = time::Instant::now();
        tokio::spawn(async move {
            time::sleep_until(scheduled_at + send_delay).await;

            tokio::spawn(async move {
                if let Err(err) = chat
                    .send_message(ChatMessage::user_text(text), SendOptions::default())
                    .await
                {
                    log_warn!("Failed to send session completion message: {err:#}");
                }
            });

            time::sleep_until(scheduled_at + clear_delay.max(send_delay)).await;
            if !timer.clear_timer_at(epoch).await {
                log_debug!("Timer changed after completion; leaving it as is");
            }
        })
    }

    /// Observes after every timer update and every current-session change
    /// until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut timer_rx = self.timer.subscribe();
        let mut current_rx = self.ledger.lock().await.subscribe_current();

        loop {
            self.observe().await;

            tokio::select! {
                _ = cancel.cancelled() => {
                    log_info!("Coordinator shutting down");
                    break;
                }
                changed = timer_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = current_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
