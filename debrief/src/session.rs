//! Terminal presentation layer for `debrief run`.
//!
//! The session owns the answers collected so far and reruns the whole walk
//! from the root after every committed answer, exactly as a reactive front end
//! would. The engine itself never sees this state except through the
//! [`AnswerProvider`](crate::core::replay::AnswerProvider) lookup.

use std::fmt::Write as _;
use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::core::replay::{TraversalError, TraversalOutcome, step_with_limit};
use crate::core::report::Report;
use crate::core::types::{Answer, InputKind, PendingInput};
use crate::io::answers::AnswerMap;
use crate::tree::{Node, NodeId};

/// Line that ends a multi-line text response.
pub const RESPONSE_TERMINATOR: &str = ".";

/// One interactive walk over a validated tree.
#[derive(Debug)]
pub struct Session<'a> {
    nodes: &'a [Node],
    root_id: NodeId,
    max_iterations: usize,
    answers: AnswerMap,
}

impl<'a> Session<'a> {
    pub fn new(nodes: &'a [Node], root_id: NodeId, max_iterations: usize) -> Self {
        Self {
            nodes,
            root_id,
            max_iterations,
            answers: AnswerMap::new(),
        }
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    /// Replay from the root with the answers committed so far.
    pub fn step(&self) -> Result<TraversalOutcome, TraversalError> {
        step_with_limit(self.nodes, self.root_id, &self.answers, self.max_iterations)
    }

    /// Commit an answer. Answers cannot be changed once committed.
    pub fn commit(&mut self, node_id: NodeId, answer: Answer) -> Result<()> {
        if self.answers.contains_key(&node_id) {
            bail!("node {node_id} is already answered");
        }
        debug!(node_id, kind = answer.kind(), "answer committed");
        self.answers.insert(node_id, answer);
        Ok(())
    }

    /// Prompt on `output` and read from `input` until the walk completes.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<Report> {
        loop {
            match self.step()? {
                TraversalOutcome::Completed(report) => return Ok(report),
                TraversalOutcome::Suspended(pending) => {
                    let answer = prompt_for(&pending, &mut input, &mut output)?;
                    self.commit(pending.node_id, answer)?;
                }
            }
        }
    }
}

/// Prompt text plus a numbered option list for choices.
pub fn render_pending(pending: &PendingInput) -> String {
    let mut rendered = format!("{}\n", pending.prompt);
    if let InputKind::Choice { options } = &pending.input {
        for (index, label) in options.iter().enumerate() {
            let _ = writeln!(rendered, "  {}) {}", index + 1, label);
        }
    }
    rendered
}

fn prompt_for<R: BufRead, W: Write>(
    pending: &PendingInput,
    input: &mut R,
    output: &mut W,
) -> Result<Answer> {
    write!(output, "{}", render_pending(pending)).context("write prompt")?;
    if pending.input == InputKind::Text {
        writeln!(
            output,
            "(end the response with a line containing only '{RESPONSE_TERMINATOR}')"
        )
        .context("write prompt")?;
    }
    loop {
        write!(output, "> ").context("write prompt")?;
        output.flush().context("flush prompt")?;

        let Some(line) = read_line(input)? else {
            bail!("input closed while waiting for node {}", pending.node_id);
        };
        let raw = line.trim();

        match &pending.input {
            InputKind::Choice { options } => match resolve_choice(options, raw) {
                Some(label) => return Ok(Answer::Selected(label)),
                None => writeln!(
                    output,
                    "'{raw}' is not an option; enter 1-{} or an option label",
                    options.len()
                )
                .context("write prompt")?,
            },
            InputKind::Text if raw.is_empty() || raw == RESPONSE_TERMINATOR => {
                writeln!(output, "a response is required").context("write prompt")?;
            }
            InputKind::Text => return Ok(Answer::Text(read_response(raw, input)?)),
        }
    }
}

/// Collect response lines after `first` until the terminator line or end of
/// input. Inner line breaks and blank lines are kept.
fn read_response<R: BufRead>(first: &str, input: &mut R) -> Result<String> {
    let mut lines = vec![first.to_string()];
    while let Some(line) = read_line(input)? {
        if line.trim() == RESPONSE_TERMINATOR {
            break;
        }
        lines.push(line.trim_end().to_string());
    }
    Ok(lines.join("\n").trim_end().to_string())
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).context("read answer")? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Accept a 1-based option number or an exact label.
fn resolve_choice(options: &[String], raw: &str) -> Option<String> {
    if let Some(label) = options.iter().find(|label| label.as_str() == raw) {
        return Some(label.clone());
    }
    let index = raw.parse::<usize>().ok()?;
    index
        .checked_sub(1)
        .and_then(|index| options.get(index))
        .cloned()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::test_support::reference_rows;

    #[test]
    fn run_collects_answers_until_report() {
        let nodes = reference_rows();
        let mut session = Session::new(&nodes, 0, 1000);
        let mut output = Vec::new();
        let report = session
            .run(Cursor::new("2\nNo\n\nfacilities\n.\n"), &mut output)
            .expect("run");

        let transcript = String::from_utf8(output).expect("utf8");
        assert!(transcript.contains("  2) Near miss"));
        assert!(transcript.contains("a response is required"));
        assert_eq!(session.answers().len(), 3);
        assert!(report.as_str().contains("selected_option: Near miss"));
        assert!(report.as_str().contains("selected_option: 'No'\n"));
        assert!(report.as_str().contains("response: facilities\n"));
        assert!(report.as_str().ends_with("text: Notification queued\n"));
    }

    #[test]
    fn invalid_choice_reprompts() {
        let nodes = reference_rows();
        let mut session = Session::new(&nodes, 0, 1000);
        let mut output = Vec::new();
        session
            .run(Cursor::new("9\nOutage\napi down\n.\n"), &mut output)
            .expect("run");
        let transcript = String::from_utf8(output).expect("utf8");
        assert!(transcript.contains("'9' is not an option; enter 1-2 or an option label"));
    }

    #[test]
    fn text_response_spans_lines_until_terminator() {
        let nodes = reference_rows();
        let mut session = Session::new(&nodes, 0, 1000);
        let mut output = Vec::new();
        let report = session
            .run(
                Cursor::new("Outage\n.\napi down\n\nusers saw errors  \n.\n"),
                &mut output,
            )
            .expect("run");

        let transcript = String::from_utf8(output).expect("utf8");
        assert!(transcript.contains("(end the response with a line containing only '.')"));
        assert!(transcript.contains("a response is required"));
        assert_eq!(
            session.answers().get(&1),
            Some(&Answer::Text("api down\n\nusers saw errors".to_string()))
        );
        assert!(
            report
                .as_str()
                .contains("response: 'api down\n\n\n  users saw errors'\n")
        );
    }

    #[test]
    fn text_response_ends_at_end_of_input() {
        let nodes = reference_rows();
        let mut session = Session::new(&nodes, 0, 1000);
        let report = session
            .run(Cursor::new("1\nline one\nline two\n"), Vec::new())
            .expect("run");
        assert!(
            report
                .as_str()
                .contains("response: 'line one\n\n  line two'\n")
        );
    }

    #[test]
    fn closed_input_is_an_error() {
        let nodes = reference_rows();
        let mut session = Session::new(&nodes, 0, 1000);
        let err = session
            .run(Cursor::new("1\n"), Vec::new())
            .expect_err("eof");
        assert_eq!(err.to_string(), "input closed while waiting for node 1");
    }

    #[test]
    fn committed_answers_are_final() {
        let nodes = reference_rows();
        let mut session = Session::new(&nodes, 0, 1000);
        session
            .commit(0, Answer::Selected("Outage".to_string()))
            .expect("commit");
        let err = session
            .commit(0, Answer::Selected("Near miss".to_string()))
            .expect_err("already answered");
        assert!(err.to_string().contains("already answered"));
    }

    #[test]
    fn resolve_choice_accepts_number_or_label() {
        let options = vec!["Yes".to_string(), "No".to_string()];
        assert_eq!(resolve_choice(&options, "2"), Some("No".to_string()));
        assert_eq!(resolve_choice(&options, "Yes"), Some("Yes".to_string()));
        assert_eq!(resolve_choice(&options, "0"), None);
        assert_eq!(resolve_choice(&options, "maybe"), None);
    }

    #[test]
    fn render_pending_numbers_options() {
        let pending = PendingInput {
            node_id: 2,
            prompt: "Was anyone notified?".to_string(),
            input: InputKind::Choice {
                options: vec!["Yes".to_string(), "No".to_string()],
            },
            path: vec![0, 2],
        };
        assert_eq!(
            render_pending(&pending),
            "Was anyone notified?\n  1) Yes\n  2) No\n"
        );
    }
}
