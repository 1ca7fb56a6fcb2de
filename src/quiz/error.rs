use thiserror::Error;

use crate::sink::SinkError;

/// Everything that can go wrong while loading a quiz tree or driving a session.
#[derive(Error, Debug)]
pub enum QuizError {
    #[error("unknown node id: {id}")]
    UnknownNode { id: String },

    #[error("node defined more than once: {id}")]
    DuplicateNode { id: String },

    #[error("cycle detected at node: {id}")]
    CycleDetected { id: String },

    #[error("node {id} is a result, there is nothing to answer")]
    InvalidTransition { id: String },

    #[error("node {id} is not a result yet")]
    InvalidState { id: String },

    #[error("nickname and password must be set first")]
    MissingIdentity,

    #[error("identity already set for this session")]
    IdentityAlreadySet,

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("result already submitted")]
    AlreadySubmitted,

    #[error("submission failed: {0}")]
    Submission(#[from] SinkError),
}

impl QuizError {
    pub(crate) fn unknown(id: &str) -> Self {
        QuizError::UnknownNode { id: id.to_string() }
    }

    /// True for failures the player can simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QuizError::Submission(_))
    }
}

pub type QuizResult<T> = Result<T, QuizError>;
