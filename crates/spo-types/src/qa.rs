//! Question and answer pairs

use serde::{Deserialize, Serialize};

/// One question and its answer.
///
/// Gold pairs come from the template; generated pairs are produced by executing
/// a candidate prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Render pairs as a fenced, numbered block for inclusion in model prompts.
pub fn render_markdown(pairs: &[QaPair]) -> String {
    let mut out = String::from("```\n");

    for (idx, pair) in pairs.iter().enumerate() {
        let n = idx + 1;
        out.push_str(&format!("Question {}\n\n{}\n\n", n, pair.question));
        out.push_str(&format!("Answer {}\n\n{}\n\n", n, pair.answer));
        if n < pairs.len() {
            out.push_str("---\n\n");
        }
    }

    out.push_str("\n```");
    out
}

/// Render pairs in the plain layout used for the per-round `answers.txt`.
pub fn render_answers_artifact(pairs: &[QaPair]) -> String {
    pairs
        .iter()
        .map(|pair| format!("Question:\n{}\nAnswer:\n{}\n\n", pair.question, pair.answer))
        .collect()
}
