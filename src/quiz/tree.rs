use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};
use serde::Deserialize;

use crate::quiz::error::{QuizError, QuizResult};
use crate::quiz::node::{Node, NodeDef, QuestionNode, ResultNode};

pub const DEFAULT_START: &str = "start";

/// JSON shape of a tree definition file.
#[derive(Debug, Deserialize)]
struct TreeDef {
    #[serde(default = "default_start")]
    start: String,
    nodes: BTreeMap<String, NodeDef>,
}

fn default_start() -> String {
    DEFAULT_START.to_string()
}

/// The full quiz tree: a map of node-id -> Node.
///
/// Only constructible through [`QuizTree::new`] or [`QuizTree::from_json`],
/// both of which validate, so every `QuizTree` value is closed and acyclic.
#[derive(Debug, Clone)]
pub struct QuizTree {
    nodes: HashMap<String, Node>,
    start_node_id: String,
    max_questions: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

impl QuizTree {
    pub fn new(nodes: Vec<Node>, start_node_id: impl Into<String>) -> QuizResult<Self> {
        let mut map = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node.id().to_string();
            if map.insert(id.clone(), node).is_some() {
                return Err(QuizError::DuplicateNode { id });
            }
        }

        let mut tree = Self {
            nodes: map,
            start_node_id: start_node_id.into(),
            max_questions: 0,
        };
        tree.validate()?;
        let depth = {
            let mut memo = HashMap::new();
            tree.longest_path(&tree.start_node_id, &mut memo)
        };
        tree.max_questions = depth;
        debug!(
            "Tree loaded: {} nodes, {} results, at most {} questions",
            tree.nodes.len(),
            tree.results().count(),
            tree.max_questions()
        );
        Ok(tree)
    }

    /// Parse and validate a tree definition:
    /// `{"start": "start", "nodes": {"<id>": {...}}}`.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let def: TreeDef = serde_json::from_str(json)?;
        let nodes = def
            .nodes
            .into_iter()
            .map(|(id, node)| node.into_node(id))
            .collect();
        Ok(Self::new(nodes, def.start)?)
    }

    pub fn start_node_id(&self) -> &str {
        &self.start_node_id
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn resolve(&self, id: &str) -> QuizResult<&Node> {
        self.nodes.get(id).ok_or_else(|| QuizError::unknown(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn results(&self) -> impl Iterator<Item = &ResultNode> {
        self.nodes.values().filter_map(|node| match node {
            Node::Result(r) => Some(r),
            Node::Question(_) => None,
        })
    }

    /// Check that the start node exists, that no question points at a missing
    /// node, and that no path from the start loops back on itself.
    pub fn validate(&self) -> QuizResult<()> {
        self.resolve(&self.start_node_id)?;

        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort();
        for id in ids {
            if let Node::Question(q) = &self.nodes[id] {
                for target in [&q.yes, &q.no] {
                    if !self.contains(target) {
                        return Err(QuizError::unknown(target));
                    }
                }
            }
        }

        let mut marks = HashMap::new();
        self.visit(&self.start_node_id, &mut marks)?;

        if marks.len() < self.nodes.len() {
            let reachable: HashSet<&str> = marks.keys().copied().collect();
            let mut unreachable: Vec<&str> = self
                .nodes
                .keys()
                .map(String::as_str)
                .filter(|id| !reachable.contains(id))
                .collect();
            unreachable.sort_unstable();
            warn!("Unreachable nodes in tree: {unreachable:?}");
        }

        Ok(())
    }

    fn visit<'a>(&'a self, id: &'a str, marks: &mut HashMap<&'a str, Mark>) -> QuizResult<()> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return Err(QuizError::CycleDetected { id: id.to_string() });
            }
            None => {}
        }

        marks.insert(id, Mark::Visiting);
        if let Node::Question(QuestionNode { yes, no, .. }) = self.resolve(id)? {
            self.visit(yes, marks)?;
            self.visit(no, marks)?;
        }
        marks.insert(id, Mark::Done);
        Ok(())
    }

    /// Number of questions on the longest path through the tree (the most a
    /// player can be asked).
    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    // Only called on a validated (acyclic) tree. Shared children are
    // computed once through `memo`.
    fn longest_path<'a>(&'a self, node_id: &'a str, memo: &mut HashMap<&'a str, usize>) -> usize {
        if let Some(&depth) = memo.get(node_id) {
            return depth;
        }
        let depth = match self.nodes.get(node_id) {
            Some(Node::Question(q)) => {
                let yes = self.longest_path(&q.yes, memo);
                let no = self.longest_path(&q.no, memo);
                1 + yes.max(no)
            }
            Some(Node::Result(_)) | None => 0,
        };
        memo.insert(node_id, depth);
        depth
    }
}
