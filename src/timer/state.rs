use serde::{Deserialize, Serialize};

pub const SECONDS_PER_MINUTE: u64 = 60;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

impl TimerStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "Ready",
            TimerStatus::Running => "Focusing",
            TimerStatus::Paused => "Paused",
            TimerStatus::Finished => "Finished",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub time_remaining: u64,
    pub total_time: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub was_stopped: bool,
    /// Elapsed seconds captured by the last `stop`, before the clock was
    /// restored to `total_time`.
    pub stopped_elapsed_secs: Option<u64>,
    /// Duration `clear` restores to.
    pub initial_secs: u64,
    /// Bumped by every external mutation. A tick task only applies while the
    /// epoch it was spawned for is still current.
    #[serde(skip)]
    pub epoch: u64,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(25)
    }
}

impl TimerState {
    pub fn new(initial_minutes: u64) -> Self {
        let initial_secs = initial_minutes.saturating_mul(SECONDS_PER_MINUTE);
        Self {
            time_remaining: initial_secs,
            total_time: initial_secs,
            is_running: false,
            is_paused: false,
            was_stopped: false,
            stopped_elapsed_secs: None,
            initial_secs,
            epoch: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.time_remaining == 0 && !self.is_running
    }

    pub fn status(&self) -> TimerStatus {
        if self.is_running {
            TimerStatus::Running
        } else if self.is_paused {
            TimerStatus::Paused
        } else if self.is_finished() {
            TimerStatus::Finished
        } else {
            TimerStatus::Idle
        }
    }

    /// Whether a tick source should currently exist.
    pub fn should_tick(&self) -> bool {
        self.is_running && self.time_remaining > 0
    }

    pub fn minutes(&self) -> u64 {
        self.time_remaining / SECONDS_PER_MINUTE
    }

    pub fn seconds(&self) -> u64 {
        self.time_remaining % SECONDS_PER_MINUTE
    }

    /// `MM:SS`; minutes keep growing past two digits rather than wrapping.
    pub fn display_time(&self) -> String {
        format!("{:02}:{:02}", self.minutes(), self.seconds())
    }

    pub fn progress(&self) -> f64 {
        if self.total_time == 0 {
            return 0.0;
        }
        let done = self.total_time as f64 - self.time_remaining as f64;
        done / self.total_time as f64 * 100.0
    }

    /// Seconds of countdown consumed so far. After a stop the clock has been
    /// restored, so the value captured at stop time is used instead.
    pub fn elapsed_secs(&self) -> u64 {
        match (self.was_stopped, self.stopped_elapsed_secs) {
            (true, Some(elapsed)) => elapsed,
            _ => self.total_time.saturating_sub(self.time_remaining),
        }
    }

    pub fn set_time(&mut self, minutes: u64) {
        let secs = minutes.saturating_mul(SECONDS_PER_MINUTE);
        self.total_time = secs;
        self.time_remaining = secs;
        self.is_running = false;
        self.is_paused = false;
        self.bump();
    }

    /// Starts or resumes. Returns `false` without touching anything when no
    /// time is left, so an empty countdown never reports a spurious finish.
    pub fn start(&mut self) -> bool {
        if self.time_remaining == 0 {
            return false;
        }
        self.is_running = true;
        self.is_paused = false;
        self.was_stopped = false;
        self.stopped_elapsed_secs = None;
        self.bump();
        true
    }

    /// Only a running timer can be paused.
    pub fn pause(&mut self) -> bool {
        if !self.is_running {
            return false;
        }
        self.is_running = false;
        self.is_paused = true;
        self.bump();
        true
    }

    pub fn stop(&mut self) {
        self.stopped_elapsed_secs = Some(self.total_time.saturating_sub(self.time_remaining));
        self.is_running = false;
        self.is_paused = false;
        self.was_stopped = true;
        self.time_remaining = self.total_time;
        self.bump();
    }

    pub fn reset(&mut self) {
        self.is_running = false;
        self.is_paused = false;
        self.time_remaining = self.total_time;
        self.bump();
    }

    pub fn add_time(&mut self, minutes: u64) {
        let extra = minutes.saturating_mul(SECONDS_PER_MINUTE);
        self.time_remaining = self.time_remaining.saturating_add(extra);
        self.total_time = self.total_time.saturating_add(extra);
        self.bump();
    }

    pub fn clear(&mut self) {
        self.is_running = false;
        self.is_paused = false;
        self.was_stopped = false;
        self.stopped_elapsed_secs = None;
        self.time_remaining = self.initial_secs;
        self.total_time = self.initial_secs;
        self.bump();
    }

    /// One-second decrement. Reaching zero stops the timer in the same step,
    /// which makes `is_finished` true immediately. Returns whether anything
    /// changed.
    pub fn tick(&mut self) -> bool {
        if !self.should_tick() {
            return false;
        }
        if self.time_remaining <= 1 {
            self.time_remaining = 0;
            self.is_running = false;
            self.is_paused = false;
        } else {
            self.time_remaining -= 1;
        }
        true
    }

    fn bump(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ticks(state: &mut TimerState, n: usize) {
        for _ in 0..n {
            state.tick();
        }
    }

    #[test]
    fn test_set_time_configures_both_counters() {
        let mut timer = TimerState::new(25);
        timer.set_time(10);
        assert_eq!(timer.total_time, 600);
        assert_eq!(timer.time_remaining, 600);
        assert_eq!(timer.status(), TimerStatus::Idle);
        assert_eq!(timer.status(), TimerStatus::default());
        assert_eq!(timer.display_time(), "10:00");
    }

    #[test]
    fn test_running_and_paused_are_exclusive() {
        let mut timer = TimerState::new(1);
        let ops: [fn(&mut TimerState); 5] = [
            |t| {
                t.start();
            },
            |t| {
                t.pause();
            },
            |t| t.stop(),
            |t| {
                t.tick();
            },
            |t| t.reset(),
        ];
        for round in 0..40 {
            ops[round % ops.len()](&mut timer);
            ops[(round * 3 + 1) % ops.len()](&mut timer);
            assert!(!(timer.is_running && timer.is_paused));
        }
    }

    #[test]
    fn test_natural_completion_sets_finished() {
        let mut timer = TimerState::new(1);
        assert!(timer.start());
        run_ticks(&mut timer, 59);
        assert_eq!(timer.time_remaining, 1);
        assert!(!timer.is_finished());

        timer.tick();
        assert_eq!(timer.time_remaining, 0);
        assert!(!timer.is_running);
        assert!(timer.is_finished());
        assert_eq!(timer.status(), TimerStatus::Finished);

        // Further ticks are inert and the finished flag persists.
        assert!(!timer.tick());
        assert!(timer.is_finished());
        assert!(!timer.start());
        assert!(timer.is_finished());

        timer.reset();
        assert!(!timer.is_finished());
    }

    #[test]
    fn test_stop_restores_clock_and_records_elapsed() {
        let mut timer = TimerState::new(10);
        timer.start();
        run_ticks(&mut timer, 125);
        timer.stop();

        assert_eq!(timer.time_remaining, timer.total_time);
        assert!(timer.was_stopped);
        assert_eq!(timer.stopped_elapsed_secs, Some(125));
        assert_eq!(timer.elapsed_secs(), 125);
        assert!(!timer.is_finished());
    }

    #[test]
    fn test_reset_restores_without_stopped_flag() {
        let mut timer = TimerState::new(10);
        timer.start();
        run_ticks(&mut timer, 30);
        timer.reset();

        assert_eq!(timer.time_remaining, timer.total_time);
        assert!(!timer.was_stopped);
        assert!(!timer.is_running);
    }

    #[test]
    fn test_start_clears_stopped_flag() {
        let mut timer = TimerState::new(5);
        timer.start();
        timer.stop();
        assert!(timer.was_stopped);
        timer.start();
        assert!(!timer.was_stopped);
        assert_eq!(timer.stopped_elapsed_secs, None);
    }

    #[test]
    fn test_add_time_preserves_elapsed() {
        let mut timer = TimerState::new(10);
        timer.start();
        run_ticks(&mut timer, 90);
        let elapsed_before = timer.total_time - timer.time_remaining;

        timer.add_time(5);
        assert_eq!(timer.total_time - timer.time_remaining, elapsed_before);
        assert_eq!(timer.total_time, 900);

        let mut full = TimerState::new(10);
        full.add_time(5);
        assert_eq!(full.progress(), 0.0);
    }

    #[test]
    fn test_clear_restores_initial_duration() {
        let mut timer = TimerState::new(25);
        timer.set_time(40);
        timer.start();
        run_ticks(&mut timer, 3);
        timer.stop();
        timer.clear();

        assert_eq!(timer.total_time, 25 * 60);
        assert_eq!(timer.time_remaining, 25 * 60);
        assert!(!timer.was_stopped);
        assert!(!timer.is_running && !timer.is_paused);
    }

    #[test]
    fn test_pause_requires_running() {
        let mut timer = TimerState::new(5);
        assert!(!timer.pause());
        assert!(!timer.is_paused);
        timer.start();
        assert!(timer.pause());
        assert_eq!(timer.status(), TimerStatus::Paused);
        assert!(!timer.tick());
        assert!(timer.start());
        assert_eq!(timer.status(), TimerStatus::Running);
    }

    #[test]
    fn test_zero_duration_start_is_noop() {
        let mut timer = TimerState::new(0);
        let epoch = timer.epoch;
        assert!(!timer.start());
        assert_eq!(timer.epoch, epoch);
        assert!(!timer.is_running);
    }

    #[test]
    fn test_derived_values() {
        let mut timer = TimerState::new(0);
        assert_eq!(timer.progress(), 0.0);
        assert_eq!(timer.display_time(), "00:00");

        timer.set_time(2);
        timer.start();
        run_ticks(&mut timer, 60);
        assert_eq!(timer.minutes(), 1);
        assert_eq!(timer.seconds(), 0);
        assert!((timer.progress() - 50.0).abs() < f64::EPSILON);

        timer.set_time(125);
        assert_eq!(timer.display_time(), "125:00");
    }

    #[test]
    fn test_mutations_bump_epoch_but_ticks_do_not() {
        let mut timer = TimerState::new(1);
        timer.start();
        let epoch = timer.epoch;
        timer.tick();
        assert_eq!(timer.epoch, epoch);
        timer.add_time(1);
        assert_ne!(timer.epoch, epoch);
    }
}
