use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use shindan::play::run;
use shindan::quiz::scenario::personality_scenario;
use shindan::quiz::{ResultSink, SubmissionRecord};
use shindan::sink::{JsonlFileSink, MemorySink, SinkError};

/// Fails the first `failures` appends, then stores into `inner`.
struct FlakySink {
    failures: AtomicUsize,
    inner: MemorySink,
}

impl ResultSink for FlakySink {
    fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(SinkError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.inner.append(record)
    }
}

fn play(script: &str, sink: &dyn ResultSink) -> (shindan::play::PlaySummary, String) {
    let tree = personality_scenario().unwrap();
    let mut output = Vec::new();
    let summary = run(
        &tree,
        sink,
        Path::new("no-such-assets"),
        Cursor::new(script.to_string()),
        &mut output,
    )
    .unwrap();
    (summary, String::from_utf8(output).unwrap())
}

#[test]
fn full_round_with_submission() {
    let sink = MemorySink::new();
    let script = "mika\nsecret\nはい\nはい\nはい\nはい\ns\nq\n";

    let (summary, output) = play(script, &sink);

    assert_eq!(summary.results, vec!["a".to_string()]);
    assert_eq!(summary.submitted, 1);
    assert!(output.contains("mika さんの結果"));
    assert!(output.contains("ポジティブタイプ"));
    assert!(output.contains("送信しました"));

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].nickname, "mika");
    assert_eq!(records[0].password, "secret");
    assert_eq!(records[0].result_title, "🌟 ポジティブタイプ");
}

#[test]
fn second_submit_in_same_round_does_not_append_again() {
    let sink = MemorySink::new();
    let script = "mika\nsecret\nn\nn\nn\ns\ns\nq\n";

    let (summary, output) = play(script, &sink);

    assert_eq!(summary.results, vec!["i".to_string()]);
    assert_eq!(summary.submitted, 1);
    assert_eq!(sink.len(), 1);
    // After the first submit the menu no longer offers [s]; a stray "s" is
    // still answered without touching the sink.
    assert!(output.contains("送信済みです"));
}

#[test]
fn failed_submission_can_be_retried() {
    let sink = FlakySink {
        failures: AtomicUsize::new(1),
        inner: MemorySink::new(),
    };
    let script = "mika\nsecret\ny\ny\ny\ny\ns\ns\nq\n";

    let (summary, output) = play(script, &sink);

    assert_eq!(summary.failed_submissions, 1);
    assert_eq!(summary.submitted, 1);
    assert!(output.contains("送信に失敗しました"));
    assert_eq!(sink.inner.len(), 1);
}

#[test]
fn restart_asks_for_identity_again() {
    let sink = MemorySink::new();
    let script = "mika\nsecret\ny\ny\ny\ny\ns\nr\nren\npw\nn\nn\ny\ns\nq\n";

    let (summary, _) = play(script, &sink);

    assert_eq!(summary.results, vec!["a".to_string(), "j".to_string()]);
    let names: Vec<String> = sink.records().into_iter().map(|r| r.nickname).collect();
    assert_eq!(names, ["mika", "ren"]);
}

#[test]
fn empty_identity_and_bad_answers_are_reprompted() {
    let sink = MemorySink::new();
    let script = "\n\nmika\nsecret\nmaybe\nはい\nはい\nはい\nいいえ\nq\n";

    let (summary, output) = play(script, &sink);

    assert_eq!(summary.results, vec!["b".to_string()]);
    assert!(output.contains("ニックネームとパスワードを入力してください"));
    assert!(output.contains("「はい」か「いいえ」で答えてください"));
    assert!(sink.is_empty());
}

#[test]
fn quitting_mid_quiz_records_nothing() {
    let sink = MemorySink::new();
    let (summary, _) = play("mika\nsecret\ny\nquit\n", &sink);
    assert!(summary.results.is_empty());
    assert!(sink.is_empty());
}

#[test]
fn end_of_input_ends_the_run() {
    let sink = MemorySink::new();
    let (summary, output) = play("mika\n", &sink);
    assert_eq!(summary, Default::default());
    assert!(output.contains("ありがとうございました"));
}

#[test]
fn jsonl_sink_receives_the_row() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonlFileSink::new(dir.path().join("results.jsonl"));

    play("mika\nsecret\ny\nn\ny\ny\ns\nq\n", &sink);

    let content = std::fs::read_to_string(sink.path()).unwrap();
    let row: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(row["nickname"], "mika");
    assert_eq!(row["result_title"], "❄️ クールタイプ");
}

#[test]
fn quit_words_are_ordinary_identity_values() {
    let sink = MemorySink::new();
    let (summary, _) = play("quit\nExit\ny\ny\ny\ny\ns\nexit\n", &sink);

    assert_eq!(summary.results, vec!["a".to_string()]);
    assert_eq!(summary.submitted, 1);
    let records = sink.records();
    assert_eq!(records[0].nickname, "quit");
    assert_eq!(records[0].password, "Exit");
}

#[test]
fn password_whitespace_is_kept() {
    let sink = MemorySink::new();
    let (summary, _) = play("mika\n  pass word  \r\nn\nn\nn\ns\nq\n", &sink);

    assert_eq!(summary.results, vec!["i".to_string()]);
    assert_eq!(sink.records()[0].password, "  pass word  ");
}
