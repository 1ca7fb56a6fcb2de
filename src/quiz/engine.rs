use log::info;

use crate::quiz::error::{QuizError, QuizResult};
use crate::quiz::node::{Answer, Node, ResultNode};
use crate::quiz::session::Session;
use crate::quiz::tree::QuizTree;

/// Follow one edge from the session's current question.
///
/// Fails with `InvalidTransition` when the session already sits on a result;
/// the session is left untouched in that case.
pub fn advance(tree: &QuizTree, session: &mut Session, answer: Answer) -> QuizResult<String> {
    let from = session.current_node_id();
    let question = match tree.resolve(from)? {
        Node::Question(q) => q,
        Node::Result(r) => {
            return Err(QuizError::InvalidTransition { id: r.id.clone() });
        }
    };

    let target = tree.resolve(question.target(answer))?;
    let target_id = target.id().to_string();
    info!("Transition: {} -> {} ({:?})", question.id, target_id, answer);

    session.move_to(target_id.clone());
    if let Node::Result(r) = target {
        info!("Result reached: {} ({})", r.id, r.title);
    }
    Ok(target_id)
}

/// Run a whole answer sequence from the session's current node and return
/// the node it ends on.
pub fn advance_all(
    tree: &QuizTree,
    session: &mut Session,
    answers: &[Answer],
) -> QuizResult<String> {
    for answer in answers {
        advance(tree, session, *answer)?;
    }
    Ok(session.current_node_id().to_string())
}

pub fn is_terminal(tree: &QuizTree, session: &Session) -> bool {
    tree.get(session.current_node_id())
        .is_some_and(|node| node.is_result())
}

pub fn current_result<'t>(tree: &'t QuizTree, session: &Session) -> QuizResult<&'t ResultNode> {
    match tree.resolve(session.current_node_id())? {
        Node::Result(r) => Ok(r),
        Node::Question(q) => Err(QuizError::InvalidState { id: q.id.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::node::Answer::{No, Yes};
    use crate::quiz::scenario::personality_scenario;
    use rstest::rstest;

    fn tree() -> QuizTree {
        QuizTree::new(
            vec![
                Node::question("start", "Outgoing?", "q1", "q2"),
                Node::question("q1", "Forgiving?", "a", "b"),
                Node::question("q2", "Thoughtful?", "b", "a"),
                Node::result("a", "Positive"),
                Node::result("b", "Kind"),
            ],
            "start",
        )
        .unwrap()
    }

    #[test]
    fn yes_yes_reaches_positive() {
        let tree = tree();
        let mut session = Session::new(&tree);

        assert_eq!(advance(&tree, &mut session, Yes).unwrap(), "q1");
        assert!(!is_terminal(&tree, &session));
        assert_eq!(advance(&tree, &mut session, Yes).unwrap(), "a");
        assert!(is_terminal(&tree, &session));
        assert_eq!(current_result(&tree, &session).unwrap().title, "Positive");
    }

    #[test]
    fn advancing_past_a_result_fails_without_moving() {
        let tree = tree();
        let mut session = Session::new(&tree);
        advance_all(&tree, &mut session, &[No, Yes]).unwrap();
        assert_eq!(session.current_node_id(), "b");

        let err = advance(&tree, &mut session, Yes).unwrap_err();
        assert!(matches!(err, QuizError::InvalidTransition { id } if id == "b"));
        assert_eq!(session.current_node_id(), "b");
    }

    #[test]
    fn result_of_unfinished_session_is_invalid_state() {
        let tree = tree();
        let session = Session::new(&tree);
        let err = current_result(&tree, &session).unwrap_err();
        assert!(matches!(err, QuizError::InvalidState { id } if id == "start"));
    }

    #[test]
    fn replaying_answers_is_deterministic() {
        let tree = personality_scenario().unwrap();
        let max = tree.max_questions();
        // Every answer sequence up to the longest path, encoded as bits.
        for bits in 0u32..(1 << max) {
            let answers: Vec<Answer> = (0..max)
                .map(|i| if bits & (1 << i) != 0 { Yes } else { No })
                .collect();

            let mut first = Session::new(&tree);
            let mut second = Session::new(&tree);
            let end_a = play_until_result(&tree, &mut first, &answers);
            let end_b = play_until_result(&tree, &mut second, &answers);
            assert_eq!(end_a, end_b);
            assert!(is_terminal(&tree, &first));
        }
    }

    fn play_until_result(tree: &QuizTree, session: &mut Session, answers: &[Answer]) -> String {
        for answer in answers {
            if is_terminal(tree, session) {
                break;
            }
            advance(tree, session, *answer).unwrap();
        }
        session.current_node_id().to_string()
    }

    #[test]
    fn terminal_exactly_at_results() {
        let tree = personality_scenario().unwrap();
        for node in tree.nodes() {
            let mut session = Session::new(&tree);
            session.move_to(node.id().to_string());
            assert_eq!(is_terminal(&tree, &session), node.is_result(), "{}", node.id());
        }
    }

    #[rstest]
    #[case(&[Yes, Yes, Yes, Yes], "a")]
    #[case(&[Yes, Yes, Yes, No], "b")]
    #[case(&[Yes, Yes, No, Yes], "c")]
    #[case(&[Yes, No, Yes, No], "f")]
    #[case(&[No, Yes, No, Yes], "g")]
    #[case(&[No, No, Yes], "j")]
    #[case(&[No, No, No], "i")]
    fn personality_paths(#[case] answers: &[Answer], #[case] expected: &str) {
        let tree = personality_scenario().unwrap();
        let mut session = Session::new(&tree);
        assert_eq!(advance_all(&tree, &mut session, answers).unwrap(), expected);
        assert!(is_terminal(&tree, &session));
    }
}
