use std::fmt;

use crate::quiz::error::{QuizError, QuizResult};
use crate::quiz::tree::QuizTree;

/// Who is taking the quiz. Both fields are opaque, non-empty strings.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub nickname: String,
    pub password: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("nickname", &self.nickname)
            .field("password", &"***")
            .finish()
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Init,
    Traversing,
    TerminalUnsubmitted,
    TerminalSubmitted,
}

/// Per-player quiz state. One per quiz-taker, never shared.
#[derive(Debug, Clone)]
pub struct Session {
    identity: Option<Identity>,
    current_node_id: String,
    start_node_id: String,
    submitted: bool,
}

impl Session {
    pub fn new(tree: &QuizTree) -> Self {
        let start = tree.start_node_id().to_string();
        Self {
            identity: None,
            current_node_id: start.clone(),
            start_node_id: start,
            submitted: false,
        }
    }

    /// Set nickname and password. Allowed once per session (until restart).
    pub fn set_identity(
        &mut self,
        nickname: impl Into<String>,
        password: impl Into<String>,
    ) -> QuizResult<()> {
        if self.identity.is_some() {
            return Err(QuizError::IdentityAlreadySet);
        }
        let nickname = nickname.into();
        let password = password.into();
        if nickname.is_empty() {
            return Err(QuizError::EmptyField { field: "nickname" });
        }
        if password.is_empty() {
            return Err(QuizError::EmptyField { field: "password" });
        }
        self.identity = Some(Identity { nickname, password });
        Ok(())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn current_node_id(&self) -> &str {
        &self.current_node_id
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Back to the initial state: no identity, at the start node, not submitted.
    pub fn restart(&mut self) {
        self.identity = None;
        self.current_node_id = self.start_node_id.clone();
        self.submitted = false;
    }

    pub fn phase(&self, tree: &QuizTree) -> SessionPhase {
        if self.identity.is_none() {
            return SessionPhase::Init;
        }
        let at_result = tree
            .get(&self.current_node_id)
            .is_some_and(|node| node.is_result());
        match (at_result, self.submitted) {
            (false, _) => SessionPhase::Traversing,
            (true, false) => SessionPhase::TerminalUnsubmitted,
            (true, true) => SessionPhase::TerminalSubmitted,
        }
    }

    pub(crate) fn move_to(&mut self, node_id: String) {
        self.current_node_id = node_id;
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.submitted = true;
    }
}
