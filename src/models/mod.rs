pub mod session;

pub use session::{StudySession, StudyStats, SubjectStats};
