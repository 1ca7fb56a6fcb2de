use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use regex::Regex;

use crate::assets::find_image;
use crate::quiz::engine::{advance, current_result, is_terminal};
use crate::quiz::error::QuizError;
use crate::quiz::node::{Answer, Node};
use crate::quiz::session::Session;
use crate::quiz::submit::{submit, ResultSink};
use crate::quiz::tree::QuizTree;

const CLOSING_MESSAGE: &str =
    "🎮 診断結果を用いてD棟3階で僕たちが作った3Dゲームが遊べます。ぜひプレイしてみてね！";

// ---------------------------------------------------------------------------
// Input handling
// ---------------------------------------------------------------------------

/// Turns free-form player input into a yes/no answer.
pub struct AnswerParser {
    yes: Regex,
    no: Regex,
}

impl AnswerParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            yes: Regex::new(r"(?i)^(y|yes|はい|1)$")?,
            no: Regex::new(r"(?i)^(n|no|いいえ|2)$")?,
        })
    }

    pub fn parse(&self, input: &str) -> Option<Answer> {
        let input = input.trim();
        if self.yes.is_match(input) {
            Some(Answer::Yes)
        } else if self.no.is_match(input) {
            Some(Answer::No)
        } else {
            None
        }
    }
}

fn is_quit(input: &str) -> bool {
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}

/// Line-oriented terminal. `None` from `ask` means the player wants out
/// (typed quit, or input ended).
struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    fn say(&mut self, line: impl AsRef<str>) -> Result<()> {
        writeln!(self.output, "{}", line.as_ref())?;
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        let Some(line) = self.ask_raw(prompt)? else {
            return Ok(None);
        };
        let line = line.trim().to_string();
        if is_quit(&line) {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// The line exactly as typed, minus the line terminator. `None` only when
    /// input ended.
    fn ask_raw(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read player input")?;
        if read == 0 {
            debug!("Input closed");
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    fn show_image(&mut self, assets_dir: &Path, node_id: &str) -> Result<()> {
        if let Some(path) = find_image(assets_dir, node_id) {
            self.say(format!("  [image: {}]", path.display()))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Round outcome
// ---------------------------------------------------------------------------

/// What happened across all rounds of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlaySummary {
    /// Result node ids reached, one per finished round.
    pub results: Vec<String>,
    /// Successful submissions.
    pub submitted: usize,
    /// Submissions that failed at the sink.
    pub failed_submissions: usize,
}

enum AfterResult {
    Restart,
    Quit,
}

// ---------------------------------------------------------------------------
// Screens
// ---------------------------------------------------------------------------

fn show_banner<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<()> {
    console.say("\n========================================")?;
    console.say("          🧠 性格診断テスト")?;
    console.say("========================================")?;
    console.say("※ニックネームは後で確認できるようにメモしておいてください。")?;
    console.say("（質問とメニューでは quit で終了できます）\n")
}

/// Ask for nickname and password until both are non-empty. Both are taken
/// verbatim, so "quit" is a valid password here. Returns `false` when input
/// ends.
fn read_identity<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut Session,
) -> Result<bool> {
    loop {
        let Some(nickname) = console.ask_raw("ニックネーム: ")? else {
            return Ok(false);
        };
        let Some(password) = console.ask_raw("パスワード: ")? else {
            return Ok(false);
        };

        match session.set_identity(nickname, password) {
            Ok(()) => return Ok(true),
            Err(QuizError::EmptyField { .. }) => {
                console.say("ニックネームとパスワードを入力してください。")?;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Ask questions until the session reaches a result.
/// Returns `false` when the player quits mid-quiz.
fn play_questions<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    parser: &AnswerParser,
    tree: &QuizTree,
    session: &mut Session,
    assets_dir: &Path,
) -> Result<bool> {
    let total = tree.max_questions();
    let mut asked = 0;

    while !is_terminal(tree, session) {
        let Node::Question(question) = tree.resolve(session.current_node_id())? else {
            break;
        };
        asked += 1;

        console.say(format!("\n[質問 {asked}/{total}]"))?;
        console.show_image(assets_dir, &question.id)?;
        console.say(&question.prompt)?;

        loop {
            let Some(input) = console.ask("はい / いいえ > ")? else {
                return Ok(false);
            };
            match parser.parse(&input) {
                Some(answer) => {
                    advance(tree, session, answer)?;
                    break;
                }
                None => console.say("（「はい」か「いいえ」で答えてください）")?,
            }
        }
    }

    Ok(true)
}

fn show_result<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    tree: &QuizTree,
    session: &Session,
    assets_dir: &Path,
) -> Result<()> {
    let result = current_result(tree, session)?;
    let nickname = session
        .identity()
        .map(|i| i.nickname.as_str())
        .unwrap_or_default();

    console.say("\n========================================")?;
    console.say(format!("{nickname} さんの結果："))?;
    console.say(format!("\n  あなたは {} です！\n", result.title))?;
    if let Some(description) = &result.description {
        console.say(format!("  {description}\n"))?;
    }
    console.say(CLOSING_MESSAGE)?;
    console.show_image(assets_dir, &result.id)?;
    console.say("========================================")
}

/// Submit / restart / quit menu shown once a result is on screen.
fn result_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    tree: &QuizTree,
    session: &mut Session,
    sink: &dyn ResultSink,
    summary: &mut PlaySummary,
) -> Result<AfterResult> {
    loop {
        if session.is_submitted() {
            console.say("\n  [r] もう一度やる    [q] 終了")?;
        } else {
            console.say("\n  [s] 📤 完了（送信）    [r] もう一度やる    [q] 終了")?;
        }

        let Some(choice) = console.ask("> ")? else {
            return Ok(AfterResult::Quit);
        };
        match choice.to_lowercase().as_str() {
            "s" => match submit(tree, session, sink) {
                Ok(_) => {
                    summary.submitted += 1;
                    console.say("送信しました ✅")?;
                }
                Err(QuizError::AlreadySubmitted) => console.say("送信済みです。")?,
                Err(e) if e.is_retryable() => {
                    summary.failed_submissions += 1;
                    warn!("Submission failed, player may retry: {e}");
                    console.say(format!("送信に失敗しました: {e}（もう一度 s で再送できます）"))?;
                }
                Err(e) => return Err(e.into()),
            },
            "r" => return Ok(AfterResult::Restart),
            "q" => return Ok(AfterResult::Quit),
            _ => console.say("  s / r / q を入力してください。")?,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry point — runs quiz rounds until the player quits
// ---------------------------------------------------------------------------

pub fn run<R: BufRead, W: Write>(
    tree: &QuizTree,
    sink: &dyn ResultSink,
    assets_dir: &Path,
    input: R,
    output: W,
) -> Result<PlaySummary> {
    let mut console = Console { input, output };
    let parser = AnswerParser::new()?;
    let mut session = Session::new(tree);
    let mut summary = PlaySummary::default();

    loop {
        show_banner(&mut console)?;

        if !read_identity(&mut console, &mut session)? {
            break;
        }
        info!("Quiz started. Initial node: {}", session.current_node_id());

        if !play_questions(&mut console, &parser, tree, &mut session, assets_dir)? {
            break;
        }
        summary.results.push(session.current_node_id().to_string());
        show_result(&mut console, tree, &session, assets_dir)?;

        match result_menu(&mut console, tree, &mut session, sink, &mut summary)? {
            AfterResult::Restart => {
                info!("Player chose to restart");
                session.restart();
            }
            AfterResult::Quit => break,
        }
    }

    console.say("\nありがとうございました！")?;
    Ok(summary)
}
