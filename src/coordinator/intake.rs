use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use super::{complete_current, Completion};
use crate::{
    chat::{directive::session_start_directive, ChatMessage, ChatSender, SendOptions},
    ledger::SharedLedger,
    models::StudySession,
    timer::TimerController,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// A study intent started a session and its timer.
    StudyStarted(StudySession),
    /// Ordinary chat, passed through untouched.
    Forwarded,
    /// Blank input.
    Ignored,
}

/// Entry point for typed or dictated user text.
#[derive(Clone)]
pub struct InputRouter {
    timer: TimerController,
    ledger: SharedLedger,
    chat: Arc<dyn ChatSender>,
}

impl InputRouter {
    pub fn new(timer: TimerController, ledger: SharedLedger, chat: Arc<dyn ChatSender>) -> Self {
        Self { timer, ledger, chat }
    }

    pub async fn submit(&self, input: &str, body: Map<String, Value>) -> Result<Submission> {
        if input.trim().is_empty() {
            return Ok(Submission::Ignored);
        }

        let (finished, started) = {
            // Held until the timer runs, so the coordinator never sees the new
            // session next to the previous session's timer flags.
            let mut ledger = self.ledger.lock().await;
            match ledger.parse_study_intent(input) {
                Some(intent) => {
                    // Restarting the timer erases a finish or stop the
                    // coordinator has not observed yet; record it first.
                    let snapshot = self.timer.get_snapshot().await;
                    let finished = if snapshot.signals_completion() {
                        complete_current(&mut ledger, &snapshot)
                    } else {
                        None
                    };

                    let session = ledger.start_study_session(&intent.subject, None);
                    self.timer.set_time(u64::from(session.duration)).await;
                    self.timer.start_timer().await;

                    let motivation = ledger.motivational_message(&session.subject);
                    let text = session_start_directive(
                        input,
                        session.duration,
                        &session.subject,
                        &motivation,
                    );
                    (finished, Some((session, text)))
                }
                None => (None, None),
            }
        };

        if let Some(Completion { session, text }) = finished {
            log_info!("Session {} completed ahead of a new study intent", session.id);
            if let Err(err) = self
                .chat
                .send_message(ChatMessage::user_text(text), SendOptions::default())
                .await
            {
                log_warn!("Failed to send session completion message: {err:#}");
            }
        }

        let options = SendOptions::with_body(body);
        match started {
            Some((session, text)) => {
                log_info!(
                    "Study intent for {}: timer started for {} min",
                    session.subject,
                    session.duration
                );
                self.chat
                    .send_message(ChatMessage::user_text(text), options)
                    .await
                    .context("failed to send study session start message")?;
                Ok(Submission::StudyStarted(session))
            }
            None => {
                self.chat
                    .send_message(ChatMessage::user_text(input), options)
                    .await
                    .context("failed to send chat message")?;
                Ok(Submission::Forwarded)
            }
        }
    }
}
