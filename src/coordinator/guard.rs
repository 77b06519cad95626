/// Outcome of one observation of timer flags and the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Run the completion work for this session id. Already recorded as
    /// processed by the time this is returned.
    Complete(String),
    /// A different session is current and the timer carries no completion
    /// signal, so the processed marker was dropped.
    Rearm,
    Hold,
}

/// Turns the level-triggered finished/stopped flags into one completion per
/// session id.
#[derive(Debug, Default)]
pub struct CompletionGuard {
    last_processed: Option<String>,
}

impl CompletionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_processed(&self) -> Option<&str> {
        self.last_processed.as_deref()
    }

    pub fn evaluate(&mut self, signalled: bool, current_session: Option<&str>) -> GuardDecision {
        let Some(current) = current_session else {
            return GuardDecision::Hold;
        };
        if self.last_processed.as_deref() == Some(current) {
            return GuardDecision::Hold;
        }

        if signalled {
            self.last_processed = Some(current.to_string());
            GuardDecision::Complete(current.to_string())
        } else if self.last_processed.take().is_some() {
            GuardDecision::Rearm
        } else {
            GuardDecision::Hold
        }
    }
}
