//! Templated encouragement text. Templates use `{subject}` and `{duration}`
//! placeholders; which one gets used is decided by a [`TemplatePicker`].

use rand::Rng;

use crate::models::StudySession;

pub const MOTIVATIONAL_TEMPLATES: &[&str] = &[
    "🚀 Great choice! Time to dive into {subject}. You've got this!",
    "📚 Let's make some progress with {subject}! Stay focused and you'll do amazing!",
    "💪 {subject} time! Remember, every minute of study gets you closer to your goals!",
    "🎯 Focus mode activated for {subject}! You're going to crush this session!",
    "⭐ Time to shine with {subject}! Believe in yourself - you're capable of great things!",
    "🔥 {subject} study session starting! Channel that energy and make it count!",
    "🌟 Ready to level up your {subject} skills? Let's make this session productive!",
    "💡 {subject} awaits! Remember, consistent effort leads to extraordinary results!",
];

pub const COMPLETED_TEMPLATES: &[&str] = &[
    "🎉 Session complete! You studied {subject} for {duration}. Fantastic work!",
    "✅ Timer's up! {duration} of {subject} in the books. Time for a well-earned break!",
    "🏆 You finished your full {subject} session ({duration}). Consistency like this pays off!",
    "🌈 {duration} of focused {subject} study done. Be proud of that effort!",
];

pub const STOPPED_EARLY_TEMPLATES: &[&str] = &[
    "👍 Nice effort! You put {duration} into {subject}. Every bit of progress counts.",
    "🌱 Stopped after {duration} of {subject}. Short sessions still build strong habits!",
    "💫 {duration} of {subject} is still progress. Come back to it when you're ready!",
    "🙌 You studied {subject} for {duration}. Rest up and pick it back up soon!",
];

/// Chooses an index into a template pool of length `len` (never zero).
pub trait TemplatePicker: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

pub struct RandomPicker;

impl TemplatePicker for RandomPicker {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always the same slot, wrapped to the pool size.
pub struct FixedPicker(pub usize);

impl TemplatePicker for FixedPicker {
    fn pick(&self, len: usize) -> usize {
        self.0 % len
    }
}

pub fn format_minutes(minutes: u32) -> String {
    if minutes == 1 {
        "1 minute".to_string()
    } else {
        format!("{minutes} minutes")
    }
}

pub fn render(template: &str, subject: &str, minutes: u32) -> String {
    template
        .replace("{subject}", subject)
        .replace("{duration}", &format_minutes(minutes))
}

/// Out-of-range picks wrap around the pool.
fn choose<'a>(picker: &dyn TemplatePicker, pool: &[&'a str]) -> &'a str {
    pool[picker.pick(pool.len()) % pool.len()]
}

pub fn motivational_message(picker: &dyn TemplatePicker, subject: &str) -> String {
    render(choose(picker, MOTIVATIONAL_TEMPLATES), subject, 0)
}

/// Celebratory wording for a countdown that ran out, encouraging wording for
/// a session stopped by hand.
pub fn completion_message(
    picker: &dyn TemplatePicker,
    session: &StudySession,
    completed_naturally: bool,
) -> String {
    let pool = if completed_naturally {
        COMPLETED_TEMPLATES
    } else {
        STOPPED_EARLY_TEMPLATES
    };
    render(choose(picker, pool), &session.subject, session.duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session(subject: &str, duration: u32) -> StudySession {
        StudySession {
            id: "s1".into(),
            subject: subject.into(),
            duration,
            start_time: Utc::now(),
            end_time: Some(Utc::now()),
            completed: true,
        }
    }

    #[test]
    fn test_every_motivational_template_mentions_subject() {
        for slot in 0..MOTIVATIONAL_TEMPLATES.len() {
            let text = motivational_message(&FixedPicker(slot), "Calculus");
            assert!(text.contains("Calculus"), "template {slot}: {text}");
        }
    }

    #[test]
    fn test_completion_pool_follows_flag() {
        let done = session("Physics", 25);
        for slot in 0..COMPLETED_TEMPLATES.len() {
            let text = completion_message(&FixedPicker(slot), &done, true);
            assert_eq!(text, render(COMPLETED_TEMPLATES[slot], "Physics", 25));
            assert!(text.contains("25 minutes"));
        }
        for slot in 0..STOPPED_EARLY_TEMPLATES.len() {
            let text = completion_message(&FixedPicker(slot), &done, false);
            assert_eq!(text, render(STOPPED_EARLY_TEMPLATES[slot], "Physics", 25));
        }
    }

    #[test]
    fn test_random_picker_stays_in_pool() {
        for _ in 0..50 {
            let text = motivational_message(&RandomPicker, "Art");
            let matches_pool = MOTIVATIONAL_TEMPLATES
                .iter()
                .any(|template| render(template, "Art", 0) == text);
            assert!(matches_pool);
        }
    }

    struct RunawayPicker;

    impl TemplatePicker for RunawayPicker {
        fn pick(&self, len: usize) -> usize {
            len + 1
        }
    }

    #[test]
    fn test_out_of_range_pick_wraps() {
        let text = motivational_message(&RunawayPicker, "Art");
        assert_eq!(text, render(MOTIVATIONAL_TEMPLATES[1], "Art", 0));

        let done = session("Art", 5);
        let text = completion_message(&RunawayPicker, &done, false);
        assert_eq!(text, render(STOPPED_EARLY_TEMPLATES[1], "Art", 5));
    }

    #[test]
    fn test_singular_minute() {
        assert_eq!(format_minutes(1), "1 minute");
        assert_eq!(format_minutes(0), "0 minutes");
    }
}
