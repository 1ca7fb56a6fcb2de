//! Yes/no quiz engine: an immutable question tree, per-player sessions that
//! walk it, and submission of finished results to a sink.

pub mod engine;
pub mod error;
pub mod node;
pub mod scenario;
pub mod session;
pub mod submit;
pub mod tree;

pub use engine::{advance, advance_all, current_result, is_terminal};
pub use error::{QuizError, QuizResult};
pub use node::{Answer, Node, QuestionNode, ResultNode};
pub use session::{Identity, Session, SessionPhase};
pub use submit::{submit, submit_at, ResultSink, SubmissionRecord};
pub use tree::QuizTree;
