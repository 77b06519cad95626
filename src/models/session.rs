//! Study session records and the statistics derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: String,
    pub subject: String,
    /// Minutes. Planned while in progress, actual once completed.
    pub duration: u32,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl StudySession {
    pub fn subject_key(&self) -> String {
        self.subject.to_lowercase()
    }

    pub fn is_subject(&self, subject: &str) -> bool {
        self.subject.to_lowercase() == subject.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStats {
    pub sessions: u32,
    pub average_duration: u32,
    pub total_time: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    pub total_sessions: u32,
    pub average_duration: u32,
    pub total_study_time: u32,
    /// Keyed by lower-cased subject.
    pub subjects: BTreeMap<String, SubjectStats>,
}

/// Mean rounded to the nearest minute, halves rounding up.
pub fn rounded_mean(total: u32, count: u32) -> u32 {
    if count == 0 {
        return 0;
    }
    (f64::from(total) / f64::from(count)).round() as u32
}
