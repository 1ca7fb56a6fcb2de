use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;

use crate::quiz::scenario::personality_scenario;
use crate::quiz::submit::ResultSink;
use crate::quiz::tree::QuizTree;
use crate::sink::{JsonlFileSink, MemorySink, SheetsCredentials, SheetsSink};

// ---------------------------------------------------------------------------
// Sink selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Google Sheets via the REST API.
    Sheets,
    /// Local JSONL file.
    File,
    /// Keep results in memory only (dry run).
    Memory,
}

impl FromStr for SinkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" => Ok(SinkKind::Sheets),
            "file" => Ok(SinkKind::File),
            "memory" => Ok(SinkKind::Memory),
            other => bail!("unknown sink '{other}' (expected sheets, file or memory)"),
        }
    }
}

// ---------------------------------------------------------------------------
// App configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Tree definition JSON. `None` uses the built-in scenario.
    pub tree_path: Option<PathBuf>,
    /// Directory searched for per-node images.
    pub assets_dir: PathBuf,
    pub sink: SinkKind,
    /// Output file for the JSONL sink.
    pub results_path: PathBuf,
    /// Secrets JSON for the Sheets sink.
    pub secrets_path: PathBuf,
    /// Request timeout for the Sheets sink.
    pub timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tree_path: None,
            assets_dir: PathBuf::from("assets"),
            sink: SinkKind::File,
            results_path: PathBuf::from("results.jsonl"),
            secrets_path: PathBuf::from("secrets.json"),
            timeout: Duration::from_secs(10),
        }
    }
}

impl AppConfig {
    /// Resolve from positional args (`args[1]` = tree file) and `SHINDAN_*`
    /// variables looked up through `env`. Args win over the environment.
    pub fn resolve(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        config.tree_path = args
            .get(1)
            .cloned()
            .or_else(|| env("SHINDAN_TREE"))
            .map(PathBuf::from);
        if let Some(dir) = env("SHINDAN_ASSETS") {
            config.assets_dir = dir.into();
        }
        if let Some(sink) = env("SHINDAN_SINK") {
            config.sink = sink.parse()?;
        }
        if let Some(path) = env("SHINDAN_RESULTS") {
            config.results_path = path.into();
        }
        if let Some(path) = env("SHINDAN_SECRETS") {
            config.secrets_path = path.into();
        }
        if let Some(secs) = env("SHINDAN_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("SHINDAN_TIMEOUT_SECS is not a number: {secs}"))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn from_env(args: &[String]) -> Result<Self> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    pub fn load_tree(&self) -> Result<QuizTree> {
        let tree = match &self.tree_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read tree file {}", path.display()))?;
                QuizTree::from_json(&raw)
                    .with_context(|| format!("invalid tree file {}", path.display()))?
            }
            None => personality_scenario().context("built-in scenario is invalid")?,
        };
        info!(
            "Quiz tree ready: {} nodes, start at '{}'",
            tree.len(),
            tree.start_node_id()
        );
        Ok(tree)
    }

    pub fn build_sink(&self) -> Result<Box<dyn ResultSink>> {
        let sink: Box<dyn ResultSink> = match self.sink {
            SinkKind::Sheets => {
                let creds = SheetsCredentials::from_file(&self.secrets_path)?;
                Box::new(SheetsSink::new(creds, self.timeout)?)
            }
            SinkKind::File => {
                info!("Results go to {}", self.results_path.display());
                Box::new(JsonlFileSink::new(&self.results_path))
            }
            SinkKind::Memory => {
                info!("Results are kept in memory only");
                Box::new(MemorySink::new())
            }
        };
        Ok(sink)
    }
}
