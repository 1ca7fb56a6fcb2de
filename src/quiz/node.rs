use serde::Deserialize;

/// A yes/no answer to a question node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Answer {
    Yes,
    No,
}

/// A question the player answers with yes or no.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionNode {
    pub id: String,
    /// Text shown to the player.
    pub prompt: String,
    /// Node reached on a "yes".
    pub yes: String,
    /// Node reached on a "no".
    pub no: String,
}

impl QuestionNode {
    pub fn target(&self, answer: Answer) -> &str {
        match answer {
            Answer::Yes => &self.yes,
            Answer::No => &self.no,
        }
    }
}

/// A terminal node: the personality type the player ends up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultNode {
    pub id: String,
    /// Short label, also what gets submitted to the sink.
    pub title: String,
    pub description: Option<String>,
}

/// A single node in the quiz tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Question(QuestionNode),
    Result(ResultNode),
}

impl Node {
    pub fn question(
        id: impl Into<String>,
        prompt: impl Into<String>,
        yes: impl Into<String>,
        no: impl Into<String>,
    ) -> Self {
        Node::Question(QuestionNode {
            id: id.into(),
            prompt: prompt.into(),
            yes: yes.into(),
            no: no.into(),
        })
    }

    pub fn result(id: impl Into<String>, title: impl Into<String>) -> Self {
        Node::Result(ResultNode {
            id: id.into(),
            title: title.into(),
            description: None,
        })
    }

    pub fn result_with(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Node::Result(ResultNode {
            id: id.into(),
            title: title.into(),
            description: Some(description.into()),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Node::Question(q) => &q.id,
            Node::Result(r) => &r.id,
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Node::Result(_))
    }
}

// ---------------------------------------------------------------------------
// Definition format
// ---------------------------------------------------------------------------

/// On-disk shape of a node. The id is the key of the enclosing map, so it is
/// not repeated here.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeDef {
    Question {
        prompt: String,
        yes: String,
        no: String,
    },
    Result {
        title: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl NodeDef {
    pub fn into_node(self, id: String) -> Node {
        match self {
            NodeDef::Question { prompt, yes, no } => Node::Question(QuestionNode {
                id,
                prompt,
                yes,
                no,
            }),
            NodeDef::Result { title, description } => Node::Result(ResultNode {
                id,
                title,
                description,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_picks_target_by_answer() {
        let node = QuestionNode {
            id: "start".into(),
            prompt: "Do you go out a lot?".into(),
            yes: "q1".into(),
            no: "q2".into(),
        };
        assert_eq!(node.target(Answer::Yes), "q1");
        assert_eq!(node.target(Answer::No), "q2");
    }

    #[test]
    fn node_def_distinguishes_questions_from_results() {
        let q: NodeDef =
            serde_json::from_str(r#"{"prompt": "Calm?", "yes": "a", "no": "b"}"#).unwrap();
        let r: NodeDef = serde_json::from_str(r#"{"title": "Cool"}"#).unwrap();

        assert!(matches!(q.into_node("q".into()), Node::Question(_)));
        match r.into_node("a".into()) {
            Node::Result(r) => {
                assert_eq!(r.id, "a");
                assert_eq!(r.title, "Cool");
                assert_eq!(r.description, None);
            }
            other => panic!("expected a result, got {other:?}"),
        }
    }
}
