//! Slash commands typed into the terminal front-end.

use anyhow::Result;

use crate::{
    ledger::messages::format_minutes,
    models::StudyStats,
    timer::{TimerSnapshot, TimerStatus},
    AppState,
};

pub const HELP: &str = "\
Type anything to chat. \"I want to study <subject>\" starts a timed session.
  /start           start or resume the timer
  /pause           pause the timer
  /stop            stop early and record the session
  /reset           restore the timer to its full duration
  /add <minutes>   extend a running or paused timer
  /set <minutes>   set the timer length (not while running)
  /cancel          drop the current session without recording it
  /timer           show the timer
  /stats           study statistics
  /history         all recorded sessions
  /notes [text]    show notes, or append a line (/notes clear to wipe)
  /transcript      conversation so far
  /quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesAction {
    Show,
    Append(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Stop,
    Reset,
    Add(u64),
    Set(u64),
    Cancel,
    Timer,
    Stats,
    History,
    Notes(NotesAction),
    Transcript,
    Help,
    Quit,
}

/// `None` when the line is ordinary chat. Unknown commands and bad
/// arguments come back as an error message for the user.
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    let rest = line.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let parsed = match name.to_ascii_lowercase().as_str() {
        "start" | "resume" => Ok(Command::Start),
        "pause" => Ok(Command::Pause),
        "stop" => Ok(Command::Stop),
        "reset" => Ok(Command::Reset),
        "add" => parse_minutes(arg).map(Command::Add),
        "set" => parse_minutes(arg).map(|minutes| Command::Set(minutes.max(1))),
        "cancel" => Ok(Command::Cancel),
        "timer" => Ok(Command::Timer),
        "stats" => Ok(Command::Stats),
        "history" => Ok(Command::History),
        "notes" => Ok(Command::Notes(match arg {
            "" => NotesAction::Show,
            "clear" => NotesAction::Clear,
            text => NotesAction::Append(text.to_string()),
        })),
        "transcript" => Ok(Command::Transcript),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command /{other}. Try /help.")),
    };
    Some(parsed)
}

fn parse_minutes(arg: &str) -> Result<u64, String> {
    arg.parse::<u64>()
        .map_err(|_| format!("Expected a number of minutes, got {arg:?}"))
}

pub fn format_timer(snapshot: &TimerSnapshot) -> String {
    format!(
        "[{}] {} ({:.0}%)",
        snapshot.status.label(),
        snapshot.display_time,
        snapshot.progress
    )
}

pub fn format_stats(stats: &StudyStats) -> String {
    if stats.total_sessions == 0 {
        return "No completed study sessions yet.".to_string();
    }
    let mut lines = vec![format!(
        "{} sessions, {} total, {} on average",
        stats.total_sessions,
        format_minutes(stats.total_study_time),
        format_minutes(stats.average_duration)
    )];
    for (subject, subject_stats) in &stats.subjects {
        lines.push(format!(
            "  {subject}: {} sessions, {} total, {} average",
            subject_stats.sessions,
            format_minutes(subject_stats.total_time),
            format_minutes(subject_stats.average_duration)
        ));
    }
    lines.join("\n")
}

/// Runs a command and returns what to show the user.
pub async fn execute(state: &AppState, command: Command) -> Result<String> {
    let timer = &state.timer;

    let output = match command {
        Command::Start => {
            let before = timer.get_snapshot().await;
            if before.state.time_remaining == 0 {
                "No time left on the timer. Use /set or /reset first.".to_string()
            } else {
                format_timer(&timer.start_timer().await)
            }
        }
        Command::Pause => {
            if timer.get_snapshot().await.status != TimerStatus::Running {
                "The timer is not running.".to_string()
            } else {
                format_timer(&timer.pause_timer().await)
            }
        }
        Command::Stop => match timer.get_snapshot().await.status {
            TimerStatus::Running | TimerStatus::Paused => format_timer(&timer.stop_timer().await),
            _ => "The timer is not running.".to_string(),
        },
        Command::Reset => format_timer(&timer.reset_timer().await),
        Command::Add(minutes) => match timer.get_snapshot().await.status {
            TimerStatus::Running | TimerStatus::Paused => {
                format_timer(&timer.add_time(minutes).await)
            }
            _ => "Time can only be added to a running or paused timer.".to_string(),
        },
        Command::Set(minutes) => {
            if timer.get_snapshot().await.status == TimerStatus::Running {
                "Pause or stop the timer before changing its length.".to_string()
            } else {
                format_timer(&timer.set_time(minutes).await)
            }
        }
        Command::Cancel => {
            let mut ledger = state.ledger.lock().await;
            match ledger.cancel_study_session() {
                Some(session) => {
                    timer.clear_timer().await;
                    format!("Cancelled the {} session.", session.subject)
                }
                None => "There is no study session in progress.".to_string(),
            }
        }
        Command::Timer => format_timer(&timer.get_snapshot().await),
        Command::Stats => format_stats(&state.ledger.lock().await.study_stats()),
        Command::History => {
            let ledger = state.ledger.lock().await;
            if ledger.sessions().is_empty() {
                "No study sessions yet.".to_string()
            } else {
                ledger
                    .sessions()
                    .iter()
                    .map(|session| {
                        format!(
                            "{}  {:<20} {:>12}  {}",
                            session.start_time.format("%Y-%m-%d %H:%M"),
                            session.subject,
                            format_minutes(session.duration),
                            if session.completed { "done" } else { "open" }
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Command::Notes(NotesAction::Show) => {
            let notes = state.notes.load()?;
            if notes.is_empty() {
                "No notes yet.".to_string()
            } else {
                notes
            }
        }
        Command::Notes(NotesAction::Append(line)) => state.notes.append(&line)?,
        Command::Notes(NotesAction::Clear) => {
            state.notes.clear()?;
            "Notes cleared.".to_string()
        }
        Command::Transcript => state.chat.visible_lines().join("\n"),
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    };
    Ok(output)
}
