//! Study session history, the current in-progress session and everything
//! derived from them. The ledger knows nothing about timers or chat.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::{
    models::{session::rounded_mean, StudySession, StudyStats},
    storage::{SharedStore, SESSIONS_KEY},
};

pub mod intent;
pub mod messages;

pub use intent::{parse_study_intent, StudyIntent};
pub use messages::{FixedPicker, RandomPicker, TemplatePicker};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const DEFAULT_STUDY_MINUTES: u32 = 30;

pub type SharedLedger = Arc<Mutex<SessionLedger>>;

pub struct SessionLedger {
    sessions: Vec<StudySession>,
    current: Option<StudySession>,
    store: SharedStore,
    default_minutes: u32,
    picker: Box<dyn TemplatePicker>,
    current_tx: watch::Sender<Option<String>>,
}

impl SessionLedger {
    /// Restores persisted history. Unreadable data is logged and treated as
    /// an empty history.
    pub fn load(store: SharedStore, default_minutes: u32) -> Self {
        let sessions = match store.get(SESSIONS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<StudySession>>(&raw) {
                Ok(sessions) => sessions,
                Err(err) => {
                    log_warn!("Failed to load study sessions, starting fresh: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                log_warn!("Failed to read study sessions from storage: {err:#}");
                Vec::new()
            }
        };

        let unfinished = sessions.iter().filter(|s| !s.completed).count();
        if unfinished > 0 {
            log_warn!("{unfinished} study session(s) from a previous run were never completed");
        }
        log_info!("Loaded {} study session(s)", sessions.len());

        let (current_tx, _) = watch::channel(None);
        Self {
            sessions,
            current: None,
            store,
            default_minutes,
            picker: Box::new(RandomPicker),
            current_tx,
        }
    }

    pub fn with_picker(mut self, picker: impl TemplatePicker + 'static) -> Self {
        self.picker = Box::new(picker);
        self
    }

    pub fn into_shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    pub fn sessions(&self) -> &[StudySession] {
        &self.sessions
    }

    pub fn current_session(&self) -> Option<&StudySession> {
        self.current.as_ref()
    }

    /// Id of the current session, updated whenever it starts, completes or is
    /// cancelled.
    pub fn subscribe_current(&self) -> watch::Receiver<Option<String>> {
        self.current_tx.subscribe()
    }

    pub fn parse_study_intent(&self, message: &str) -> Option<StudyIntent> {
        parse_study_intent(message)
    }

    /// Rounded mean of completed sessions for `subject`, compared
    /// case-insensitively; the configured default when there are none.
    /// Never below one minute, so a suggested countdown always runs.
    pub fn average_study_time(&self, subject: &str) -> u32 {
        let (total, count) = self
            .sessions
            .iter()
            .filter(|s| s.completed && s.is_subject(subject))
            .fold((0u32, 0u32), |(total, count), s| {
                (total.saturating_add(s.duration), count + 1)
            });

        let minutes = if count == 0 {
            self.default_minutes
        } else {
            rounded_mean(total, count)
        };
        minutes.max(1)
    }

    /// Creates the session, makes it current and records it right away. A
    /// missing or zero duration falls back to the subject's average.
    pub fn start_study_session(&mut self, subject: &str, duration: Option<u32>) -> StudySession {
        let subject = subject.trim();
        let duration = duration
            .filter(|minutes| *minutes > 0)
            .unwrap_or_else(|| self.average_study_time(subject));

        if let Some(previous) = &self.current {
            log_warn!(
                "Starting a new session while {} ({}) is still open; it stays unfinished",
                previous.id,
                previous.subject
            );
        }

        let session = StudySession {
            id: Uuid::new_v4().to_string(),
            subject: subject.to_string(),
            duration,
            start_time: Utc::now(),
            end_time: None,
            completed: false,
        };

        self.sessions.push(session.clone());
        self.set_current(Some(session.clone()));
        self.persist();

        log_info!(
            "Started study session {} for {} ({} min planned)",
            session.id,
            session.subject,
            session.duration
        );
        session
    }

    /// Finalises the current session. `actual_duration` replaces the planned
    /// duration unless it is missing or zero. Returns `None` when no session
    /// is current.
    pub fn complete_study_session(&mut self, actual_duration: Option<u32>) -> Option<StudySession> {
        let current = self.current.as_ref()?;

        let mut finished = current.clone();
        finished.end_time = Some(Utc::now());
        finished.duration = actual_duration
            .filter(|minutes| *minutes > 0)
            .unwrap_or(current.duration);
        finished.completed = true;

        for entry in self.sessions.iter_mut().filter(|s| s.id == finished.id) {
            *entry = finished.clone();
        }
        self.set_current(None);
        self.persist();

        log_info!(
            "Completed study session {} for {} after {} min",
            finished.id,
            finished.subject,
            finished.duration
        );
        Some(finished)
    }

    /// Removes the current session from history entirely.
    pub fn cancel_study_session(&mut self) -> Option<StudySession> {
        let cancelled = self.current.clone()?;
        self.sessions.retain(|s| s.id != cancelled.id);
        self.set_current(None);
        self.persist();

        log_info!("Cancelled study session {} for {}", cancelled.id, cancelled.subject);
        Some(cancelled)
    }

    pub fn study_stats(&self) -> StudyStats {
        let mut stats = StudyStats::default();

        for session in self.sessions.iter().filter(|s| s.completed) {
            stats.total_sessions += 1;
            stats.total_study_time = stats.total_study_time.saturating_add(session.duration);

            let subject = stats.subjects.entry(session.subject_key()).or_default();
            subject.sessions += 1;
            subject.total_time = subject.total_time.saturating_add(session.duration);
        }

        stats.average_duration = rounded_mean(stats.total_study_time, stats.total_sessions);
        for subject in stats.subjects.values_mut() {
            subject.average_duration = rounded_mean(subject.total_time, subject.sessions);
        }
        stats
    }

    pub fn motivational_message(&self, subject: &str) -> String {
        messages::motivational_message(self.picker.as_ref(), subject)
    }

    pub fn completion_message(&self, session: &StudySession, completed_naturally: bool) -> String {
        messages::completion_message(self.picker.as_ref(), session, completed_naturally)
    }

    fn set_current(&mut self, session: Option<StudySession>) {
        let id = session.as_ref().map(|s| s.id.clone());
        self.current = session;
        self.current_tx.send_replace(id);
    }

    fn persist(&self) {
        let serialized = match serde_json::to_string(&self.sessions) {
            Ok(serialized) => serialized,
            Err(err) => {
                log_error!("Failed to serialize study sessions: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(SESSIONS_KEY, &serialized) {
            log_error!("Failed to persist study sessions: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};

    fn ledger_with(store: Arc<MemoryStore>) -> SessionLedger {
        SessionLedger::load(store, DEFAULT_STUDY_MINUTES).with_picker(FixedPicker(0))
    }

    fn complete(ledger: &mut SessionLedger, subject: &str, minutes: u32) -> StudySession {
        ledger.start_study_session(subject, Some(minutes));
        ledger.complete_study_session(Some(minutes)).unwrap()
    }

    #[test]
    fn test_average_defaults_without_history() {
        let ledger = ledger_with(Arc::new(MemoryStore::new()));
        assert_eq!(ledger.average_study_time("Math"), 30);
    }

    #[test]
    fn test_average_is_case_insensitive_mean() {
        let mut ledger = ledger_with(Arc::new(MemoryStore::new()));
        complete(&mut ledger, "Math", 20);
        complete(&mut ledger, "math", 40);
        complete(&mut ledger, "History", 90);
        assert_eq!(ledger.average_study_time("MATH"), 30);

        complete(&mut ledger, "Art", 10);
        complete(&mut ledger, "Art", 15);
        assert_eq!(ledger.average_study_time("art"), 13);
    }

    #[test]
    fn test_average_ignores_unfinished_sessions() {
        let mut ledger = ledger_with(Arc::new(MemoryStore::new()));
        ledger.start_study_session("Math", Some(90));
        assert_eq!(ledger.average_study_time("Math"), 30);
    }

    #[test]
    fn test_start_uses_suggestion_and_records_immediately() {
        let mut ledger = ledger_with(Arc::new(MemoryStore::new()));
        complete(&mut ledger, "French", 45);

        let session = ledger.start_study_session("  French ", None);
        assert_eq!(session.subject, "French");
        assert_eq!(session.duration, 45);
        assert!(!session.completed);
        assert_eq!(ledger.current_session().map(|s| s.id.as_str()), Some(session.id.as_str()));
        assert!(ledger.sessions().iter().any(|s| s.id == session.id));

        let explicit = ledger.start_study_session("French", Some(0));
        assert_eq!(explicit.duration, 45);
    }

    #[test]
    fn test_complete_overwrites_duration() {
        let mut ledger = ledger_with(Arc::new(MemoryStore::new()));
        let started = ledger.start_study_session("Chemistry", Some(30));
        let finished = ledger.complete_study_session(Some(12)).unwrap();

        assert_eq!(finished.id, started.id);
        assert_eq!(finished.duration, 12);
        assert!(finished.completed);
        assert!(finished.end_time.is_some());
        assert!(ledger.current_session().is_none());
        assert_eq!(ledger.sessions(), &[finished]);
    }

    #[test]
    fn test_complete_keeps_planned_when_actual_missing_or_zero() {
        let mut ledger = ledger_with(Arc::new(MemoryStore::new()));
        ledger.start_study_session("Chemistry", Some(30));
        assert_eq!(ledger.complete_study_session(Some(0)).unwrap().duration, 30);

        ledger.start_study_session("Chemistry", Some(25));
        assert_eq!(ledger.complete_study_session(None).unwrap().duration, 25);
    }

    #[test]
    fn test_complete_without_current_is_none() {
        let mut ledger = ledger_with(Arc::new(MemoryStore::new()));
        assert!(ledger.complete_study_session(Some(5)).is_none());
        complete(&mut ledger, "Math", 5);
        assert!(ledger.complete_study_session(Some(5)).is_none());
    }

    #[test]
    fn test_cancel_erases_but_complete_preserves() {
        let mut ledger = ledger_with(Arc::new(MemoryStore::new()));
        let kept = complete(&mut ledger, "Math", 20);

        let doomed = ledger.start_study_session("Physics", None);
        let before = ledger.sessions().len();
        let cancelled = ledger.cancel_study_session().unwrap();

        assert_eq!(cancelled.id, doomed.id);
        assert_eq!(ledger.sessions().len(), before - 1);
        assert!(ledger.sessions().iter().all(|s| s.id != doomed.id));
        assert!(ledger.sessions().iter().any(|s| s.id == kept.id && s.completed));
        assert!(ledger.current_session().is_none());
        assert!(ledger.cancel_study_session().is_none());
    }

    #[test]
    fn test_stats_aggregate_completed_only() {
        let mut ledger = ledger_with(Arc::new(MemoryStore::new()));
        complete(&mut ledger, "Math", 20);
        complete(&mut ledger, "math", 45);
        complete(&mut ledger, "Biology", 30);
        ledger.start_study_session("Biology", Some(60));

        let stats = ledger.study_stats();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_study_time, 95);
        assert_eq!(stats.average_duration, 32);
        assert_eq!(stats.subjects.len(), 2);

        let math = &stats.subjects["math"];
        assert_eq!(math.sessions, 2);
        assert_eq!(math.total_time, 65);
        assert_eq!(math.average_duration, 33);
        assert_eq!(stats.subjects["biology"].sessions, 1);
    }

    #[test]
    fn test_empty_stats() {
        let ledger = ledger_with(Arc::new(MemoryStore::new()));
        assert_eq!(ledger.study_stats(), StudyStats::default());
    }

    #[test]
    fn test_history_survives_reload() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = ledger_with(store.clone());
        let finished = complete(&mut ledger, "Spanish", 25);
        let open = ledger.start_study_session("Spanish", None);
        drop(ledger);

        let reloaded = ledger_with(store);
        assert_eq!(reloaded.sessions().len(), 2);
        assert_eq!(reloaded.sessions()[0], finished);
        assert_eq!(reloaded.sessions()[1].id, open.id);
        assert_eq!(reloaded.sessions()[1].start_time, open.start_time);
        assert!(reloaded.current_session().is_none());
        assert_eq!(reloaded.average_study_time("spanish"), 25);
    }

    #[test]
    fn test_reads_browser_style_records() {
        let raw = r#"[{"id":"1712345678901","subject":"Math","duration":20,
            "startTime":"2024-04-05T19:34:38.901Z","endTime":"2024-04-05T19:54:40.002Z",
            "completed":true}]"#;
        let ledger = ledger_with(Arc::new(MemoryStore::with_entry(SESSIONS_KEY, raw)));
        assert_eq!(ledger.sessions().len(), 1);
        assert!(ledger.sessions()[0].end_time.is_some());
        assert_eq!(ledger.average_study_time("math"), 20);
    }

    #[test]
    fn test_zero_minute_records_still_suggest_a_minute() {
        let raw = r#"[{"id":"a","subject":"Art","duration":0,
            "startTime":"2024-04-05T19:34:38.901Z","completed":true}]"#;
        let mut ledger = ledger_with(Arc::new(MemoryStore::with_entry(SESSIONS_KEY, raw)));
        assert_eq!(ledger.average_study_time("art"), 1);
        assert_eq!(ledger.start_study_session("Art", None).duration, 1);

        let ledger = SessionLedger::load(Arc::new(MemoryStore::new()), 0);
        assert_eq!(ledger.average_study_time("Math"), 1);
    }

    #[test]
    fn test_corrupt_history_starts_empty() {
        let store = Arc::new(MemoryStore::with_entry(SESSIONS_KEY, "{\"oops\": tru"));
        let mut ledger = ledger_with(store.clone());
        assert!(ledger.sessions().is_empty());

        ledger.start_study_session("Math", None);
        let saved = store.get(SESSIONS_KEY).unwrap().unwrap();
        let parsed: Vec<StudySession> = serde_json::from_str(&saved).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_current_session_is_published() {
        let mut ledger = ledger_with(Arc::new(MemoryStore::new()));
        let rx = ledger.subscribe_current();
        let session = ledger.start_study_session("Latin", None);
        assert_eq!(rx.borrow().as_deref(), Some(session.id.as_str()));
        ledger.complete_study_session(None);
        assert_eq!(*rx.borrow(), None);
    }

    #[test]
    fn test_messages_use_injected_picker() {
        let ledger = ledger_with(Arc::new(MemoryStore::new()));
        let text = ledger.motivational_message("Geometry");
        assert_eq!(text, messages::render(messages::MOTIVATIONAL_TEMPLATES[0], "Geometry", 0));
    }
}
