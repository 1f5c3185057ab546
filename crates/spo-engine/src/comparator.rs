//! Debiased pairwise comparison of two candidates.
//!
//! Each judged trial shows the judge the two answer sets under anonymous slot
//! labels `A` and `B`. Which candidate lands in which slot is a fresh coin flip
//! per trial, and the judge's pick is mapped back through [`debias`] before it
//! is counted.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use spo_llm::{ChatMessage, ModelSuite, RequestKind};
use spo_types::{Candidate, QaPair};

use crate::config::DEFAULT_EVALUATION_TRIALS;
use crate::parse::extract_tag;
use crate::prompts::evaluate_prompt;

/// Where the new candidate was shown in one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAssignment {
    /// Current best in `A`, candidate in `B`.
    CandidateInB,
    /// Current best in `B`, candidate in `A`.
    CandidateInA,
}

impl SlotAssignment {
    pub fn swapped(self) -> Self {
        match self {
            SlotAssignment::CandidateInB => SlotAssignment::CandidateInA,
            SlotAssignment::CandidateInA => SlotAssignment::CandidateInB,
        }
    }
}

/// The judge's pick, by slot label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    A,
    B,
}

impl Choice {
    /// Parse the `<choose>` tag of a judge reply.
    pub fn from_reply(reply: &str) -> Option<Self> {
        match extract_tag(reply, "choose")? {
            "A" => Some(Choice::A),
            "B" => Some(Choice::B),
            _ => None,
        }
    }
}

/// Map a slot judgment back to "did the candidate win".
///
/// No parseable judgment counts as a loss for the candidate.
pub fn debias(assignment: SlotAssignment, judgment: Option<Choice>) -> bool {
    matches!(
        (assignment, judgment),
        (SlotAssignment::CandidateInB, Some(Choice::B))
            | (SlotAssignment::CandidateInA, Some(Choice::A))
    )
}

/// Outcome of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub accepted: bool,
    pub candidate_votes: usize,
    pub best_votes: usize,
}

impl Verdict {
    pub fn trials(&self) -> usize {
        self.candidate_votes + self.best_votes
    }
}

/// Strict majority for the candidate; a tie keeps the current best.
pub fn tally(candidate_wins: &[bool]) -> Verdict {
    let candidate_votes = candidate_wins.iter().filter(|won| **won).count();
    let best_votes = candidate_wins.len() - candidate_votes;
    Verdict {
        accepted: candidate_votes > best_votes,
        candidate_votes,
        best_votes,
    }
}

/// Runs judged trials between the current best and a new candidate.
pub struct Comparator {
    models: Arc<ModelSuite>,
    trials: usize,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparator")
            .field("trials", &self.trials)
            .finish_non_exhaustive()
    }
}

impl Comparator {
    pub fn new(models: Arc<ModelSuite>) -> Self {
        Self {
            models,
            trials: DEFAULT_EVALUATION_TRIALS,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic slot assignments.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    /// One independent coin flip per trial.
    pub fn draw_assignments(&self, count: usize) -> Vec<SlotAssignment> {
        let mut rng = self.rng.lock();
        (0..count)
            .map(|_| {
                if rng.gen_bool(0.5) {
                    SlotAssignment::CandidateInA
                } else {
                    SlotAssignment::CandidateInB
                }
            })
            .collect()
    }

    /// Decide whether `candidate` beats `best` against the `gold` answers.
    pub async fn compare(
        &self,
        requirements: &str,
        best: &Candidate,
        candidate: &Candidate,
        gold: &[QaPair],
    ) -> Verdict {
        let best_json = answers_json(&best.answers);
        let candidate_json = answers_json(&candidate.answers);
        let gold_json = answers_json(gold);

        let assignments = self.draw_assignments(self.trials);
        let trials = assignments.into_iter().map(|assignment| {
            self.trial(
                requirements,
                &best_json,
                &candidate_json,
                &gold_json,
                assignment,
            )
        });
        let wins = join_all(trials).await;

        let verdict = tally(&wins);
        tracing::debug!(
            best_round = best.round,
            candidate_round = candidate.round,
            candidate_votes = verdict.candidate_votes,
            best_votes = verdict.best_votes,
            "Comparison tallied"
        );
        verdict
    }

    async fn trial(
        &self,
        requirements: &str,
        best_json: &str,
        candidate_json: &str,
        gold_json: &str,
        assignment: SlotAssignment,
    ) -> bool {
        let (slot_a, slot_b) = match assignment {
            SlotAssignment::CandidateInB => (best_json, candidate_json),
            SlotAssignment::CandidateInA => (candidate_json, best_json),
        };
        let messages = [ChatMessage::user(evaluate_prompt(
            requirements,
            slot_a,
            slot_b,
            gold_json,
        ))];

        match self.models.respond(RequestKind::Evaluate, &messages).await {
            Ok(reply) => {
                let judgment = Choice::from_reply(&reply);
                if judgment.is_none() {
                    tracing::warn!("Judge reply has no usable <choose> tag");
                }
                debias(assignment, judgment)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Judged trial failed");
                false
            }
        }
    }
}

fn answers_json(answers: &[QaPair]) -> String {
    serde_json::to_string(answers).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use spo_llm::{Completion, CompletionConfig, LlmError, ScriptedClient};

    fn candidate(round: u32, answer: &str) -> Candidate {
        Candidate::new(round, format!("prompt {}", round), vec![QaPair::new("q", answer)])
    }

    fn suite(client: ScriptedClient) -> Arc<ModelSuite> {
        Arc::new(ModelSuite::uniform(
            Arc::new(client),
            CompletionConfig::new("eval", 0.3),
        ))
    }

    /// Judge that always prefers whichever slot holds `marker`.
    fn prefers(marker: &'static str) -> ScriptedClient {
        ScriptedClient::new(move |messages, _| {
            let content = &messages[0].content;
            let a = content.find("# A").unwrap_or(0);
            let b = content.find("# B").unwrap_or(0);
            let at = content.find(marker).unwrap_or(0);
            let pick = if at > a && at < b { "A" } else { "B" };
            Ok(Completion::text(format!("<analyse>x</analyse><choose>{}</choose>", pick)))
        })
    }

    #[test]
    fn debias_truth_table() {
        assert!(debias(SlotAssignment::CandidateInB, Some(Choice::B)));
        assert!(!debias(SlotAssignment::CandidateInB, Some(Choice::A)));
        assert!(debias(SlotAssignment::CandidateInA, Some(Choice::A)));
        assert!(!debias(SlotAssignment::CandidateInA, Some(Choice::B)));
        assert!(!debias(SlotAssignment::CandidateInA, None));
        assert!(!debias(SlotAssignment::CandidateInB, None));
    }

    #[test]
    fn ties_reject() {
        let verdict = tally(&[true, false, true, false]);
        assert!(!verdict.accepted);
        assert_eq!((verdict.candidate_votes, verdict.best_votes), (2, 2));

        assert!(tally(&[true, true, true, false]).accepted);
        assert!(!tally(&[]).accepted);
    }

    #[test]
    fn choice_parsing_is_strict() {
        assert_eq!(Choice::from_reply("<choose>A</choose>"), Some(Choice::A));
        assert_eq!(Choice::from_reply("<choose> B </choose>"), Some(Choice::B));
        assert_eq!(Choice::from_reply("<choose>A/B</choose>"), None);
        assert_eq!(Choice::from_reply("B is better"), None);
    }

    #[test]
    fn seeded_draws_repeat() {
        let models = suite(ScriptedClient::constant(""));
        let first = Comparator::new(models.clone()).with_seed(7).draw_assignments(32);
        let second = Comparator::new(models).with_seed(7).draw_assignments(32);
        assert_eq!(first, second);
        assert!(first.contains(&SlotAssignment::CandidateInA));
        assert!(first.contains(&SlotAssignment::CandidateInB));
    }

    #[tokio::test]
    async fn content_preference_survives_swapping() {
        let comparator = Comparator::new(suite(prefers("NEW"))).with_seed(3);
        let verdict = comparator
            .compare("req", &candidate(1, "old"), &candidate(2, "NEW"), &[])
            .await;
        assert!(verdict.accepted);
        assert_eq!(verdict.candidate_votes, 4);

        let comparator = Comparator::new(suite(prefers("old"))).with_seed(3);
        let verdict = comparator
            .compare("req", &candidate(1, "old"), &candidate(2, "NEW"), &[])
            .await;
        assert!(!verdict.accepted);
        assert_eq!(verdict.best_votes, 4);
    }

    #[tokio::test]
    async fn judge_failures_count_against_candidate() {
        let client = ScriptedClient::new(|_, _| Err(LlmError::Transport("down".to_string())));
        let comparator = Comparator::new(suite(client)).with_trials(5);
        let verdict = comparator
            .compare("req", &candidate(1, "a"), &candidate(2, "b"), &[])
            .await;
        assert_eq!(
            verdict,
            Verdict {
                accepted: false,
                candidate_votes: 0,
                best_votes: 5
            }
        );
    }

    #[tokio::test]
    async fn unparseable_replies_are_losses() {
        let comparator =
            Comparator::new(suite(ScriptedClient::constant("I like both"))).with_trials(4);
        let verdict = comparator
            .compare("req", &candidate(1, "a"), &candidate(2, "b"), &[])
            .await;
        assert_eq!(verdict.best_votes, 4);
        assert!(!verdict.accepted);
    }

    fn assignment() -> impl Strategy<Value = SlotAssignment> {
        prop_oneof![
            Just(SlotAssignment::CandidateInA),
            Just(SlotAssignment::CandidateInB)
        ]
    }

    proptest! {
        /// A judge that picks by content gives the same outcome whichever slot
        /// the candidate was shown in.
        #[test]
        fn debias_is_swap_invariant(
            assignment in assignment(),
            judge_prefers_candidate in any::<bool>(),
        ) {
            let pick = |a: SlotAssignment| {
                let candidate_slot = match a {
                    SlotAssignment::CandidateInA => Choice::A,
                    SlotAssignment::CandidateInB => Choice::B,
                };
                let other = match candidate_slot {
                    Choice::A => Choice::B,
                    Choice::B => Choice::A,
                };
                if judge_prefers_candidate { candidate_slot } else { other }
            };

            let direct = debias(assignment, Some(pick(assignment)));
            let swapped = debias(assignment.swapped(), Some(pick(assignment.swapped())));
            prop_assert_eq!(direct, swapped);
            prop_assert_eq!(direct, judge_prefers_candidate);
        }

        #[test]
        fn acceptance_is_strict_majority(wins in proptest::collection::vec(any::<bool>(), 0..16)) {
            let verdict = tally(&wins);
            prop_assert_eq!(verdict.trials(), wins.len());
            prop_assert_eq!(verdict.accepted, verdict.candidate_votes * 2 > wins.len());
        }
    }
}
