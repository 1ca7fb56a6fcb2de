use std::fmt;

use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use serde::Serialize;

use crate::quiz::engine::current_result;
use crate::quiz::error::{QuizError, QuizResult};
use crate::quiz::session::Session;
use crate::quiz::tree::QuizTree;
use crate::sink::SinkError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One completed quiz, as handed to a sink.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    pub timestamp: String,
    pub nickname: String,
    pub password: String,
    pub result_title: String,
}

impl SubmissionRecord {
    /// Spreadsheet row order: timestamp, nickname, password, result.
    pub fn as_row(&self) -> [&str; 4] {
        [
            &self.timestamp,
            &self.nickname,
            &self.password,
            &self.result_title,
        ]
    }
}

impl fmt::Debug for SubmissionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionRecord")
            .field("timestamp", &self.timestamp)
            .field("nickname", &self.nickname)
            .field("password", &"***")
            .field("result_title", &self.result_title)
            .finish()
    }
}

/// Somewhere completed results get appended to.
pub trait ResultSink: Send + Sync {
    fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError>;
}

/// Forward a finished session's result to `sink`, stamped with the current
/// local time.
///
/// A session submits at most once: a second call fails with
/// `AlreadySubmitted` before the sink is touched. Sink failures come back as
/// `Submission` and leave the session submittable.
pub fn submit(
    tree: &QuizTree,
    session: &mut Session,
    sink: &dyn ResultSink,
) -> QuizResult<SubmissionRecord> {
    submit_at(tree, session, sink, Local::now().naive_local())
}

pub fn submit_at(
    tree: &QuizTree,
    session: &mut Session,
    sink: &dyn ResultSink,
    now: NaiveDateTime,
) -> QuizResult<SubmissionRecord> {
    let result = current_result(tree, session)?;
    if session.is_submitted() {
        return Err(QuizError::AlreadySubmitted);
    }
    let identity = session.identity().ok_or(QuizError::MissingIdentity)?;

    let record = SubmissionRecord {
        timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
        nickname: identity.nickname.clone(),
        password: identity.password.clone(),
        result_title: result.title.clone(),
    };

    if let Err(e) = sink.append(&record) {
        warn!("Submission for {} failed: {e}", record.nickname);
        return Err(QuizError::Submission(e));
    }

    session.mark_submitted();
    info!("Submitted result {} for {}", result.id, record.nickname);
    Ok(record)
}
