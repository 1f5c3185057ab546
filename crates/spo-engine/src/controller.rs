//! Round controller.
//!
//! One round is generate, execute, compare, record. Rounds run strictly in
//! sequence and each one reads the ledger written by the one before it.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use spo_llm::ModelSuite;
use spo_types::{Candidate, Decision, QaPair, Template};
use tracing::Instrument;

use crate::artifacts::RunLayout;
use crate::comparator::Comparator;
use crate::config::{SearchSettings, SpoConfig};
use crate::execution::Executor;
use crate::generator::Generator;
use crate::ledger::{most_recent_accepted, DecisionLedger, FileLedger};
use crate::{EngineError, EngineResult};

/// What a finished run reports.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalReport {
    /// Round of the current best at the end of the run.
    pub round: u32,
    pub prompt: String,
    pub answers: Vec<QaPair>,
    /// Rounds recorded in the ledger, including earlier runs.
    pub rounds_recorded: usize,
    pub rounds_accepted: usize,
}

impl std::fmt::Display for FinalReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Best prompt from round {} ({} of {} rounds accepted):",
            self.round, self.rounds_accepted, self.rounds_recorded
        )?;
        write!(f, "{}", self.prompt)
    }
}

/// Drives an optimization run.
pub struct Optimizer {
    template: Template,
    ledger: Arc<dyn DecisionLedger>,
    layout: Option<RunLayout>,
    executor: Executor,
    comparator: Comparator,
    generator: Generator,
    sample_k: usize,
    initial_round: u32,
    rng: Mutex<StdRng>,
    /// Decisions appended by this run, in round order.
    recorded: Mutex<Vec<Decision>>,
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("layout", &self.layout)
            .field("sample_k", &self.sample_k)
            .field("initial_round", &self.initial_round)
            .finish_non_exhaustive()
    }
}

impl Optimizer {
    pub fn new(
        template: Template,
        models: Arc<ModelSuite>,
        ledger: Arc<dyn DecisionLedger>,
    ) -> Self {
        let search = SearchSettings::default();
        Self {
            template,
            ledger,
            layout: None,
            executor: Executor::new(models.clone()).with_max_concurrency(search.max_concurrency),
            comparator: Comparator::new(models.clone()).with_trials(search.evaluation_trials),
            generator: Generator::new(models),
            sample_k: search.sample_k,
            initial_round: 1,
            rng: Mutex::new(StdRng::from_entropy()),
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Build a file-backed optimizer from validated settings.
    pub async fn from_config(config: &SpoConfig, models: Arc<ModelSuite>) -> EngineResult<Self> {
        config.validate()?;

        let template = Template::load(&config.run.template)?;
        let layout = RunLayout::new(&config.run.workspace, &config.run.name);
        let ledger = FileLedger::open(layout.ledger_path()).await?;

        Ok(Self::new(template, models, Arc::new(ledger))
            .with_search(&config.search)
            .with_layout(layout)
            .with_initial_round(config.run.initial_round))
    }

    pub fn with_search(mut self, search: &SearchSettings) -> Self {
        self.sample_k = search.sample_k;
        self.executor = self.executor.with_max_concurrency(search.max_concurrency);
        self.comparator = self.comparator.with_trials(search.evaluation_trials);
        if let Some(seed) = search.seed {
            self.comparator = self.comparator.with_seed(seed);
            self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        }
        self
    }

    /// Write per-round prompt and answer files under `layout`.
    pub fn with_layout(mut self, layout: RunLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_initial_round(mut self, round: u32) -> Self {
        self.initial_round = round.max(1);
        self
    }

    pub fn ledger(&self) -> &Arc<dyn DecisionLedger> {
        &self.ledger
    }

    /// Run `total_rounds` rounds starting at the initial round and report the
    /// ledger's current best.
    pub async fn optimize(&self, total_rounds: u32) -> EngineResult<FinalReport> {
        self.check_resume_point().await?;

        let first = self.initial_round;
        let last = first + total_rounds.saturating_sub(1);
        tracing::info!(first_round = first, last_round = last, "Starting optimization");

        for round in first..first + total_rounds {
            self.run_round(round).await?;
        }

        self.report().await
    }

    /// Run a single round and return its recorded decision.
    pub async fn run_round(&self, round: u32) -> EngineResult<Decision> {
        let span = tracing::info_span!("round", round);
        async {
            tracing::info!("Round started");

            let gold = self.sample_gold();
            let best = if round == 1 {
                None
            } else {
                let best = self.load_best().await;
                if best.is_none() {
                    tracing::warn!("No accepted round in ledger, running seed prompt as baseline");
                }
                best
            };

            match best {
                None => self.baseline_round(round, &gold).await,
                Some(best) => self.improvement_round(round, best, &gold).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn baseline_round(&self, round: u32, gold: &[QaPair]) -> EngineResult<Decision> {
        let prompt = self.template.seed_prompt.clone();
        self.write_prompt(round, &prompt).await?;

        let answers = self.executor.execute(&prompt, &questions(gold)).await;
        let decision = Decision::record(Candidate::new(round, prompt, answers), true);
        self.record(decision).await
    }

    async fn improvement_round(
        &self,
        round: u32,
        best: Decision,
        gold: &[QaPair],
    ) -> EngineResult<Decision> {
        tracing::info!(parent_round = best.round, "Selected parent");

        let proposal = self
            .generator
            .propose(
                &best.prompt,
                &best.answers,
                &self.template.requirements,
                gold,
                self.template.target_length,
            )
            .await
            .map_err(|source| EngineError::Generation { round, source })?;
        if let Some(modification) = &proposal.modification {
            tracing::info!(modification = %modification, "Proposed modification");
        }

        self.write_prompt(round, &proposal.prompt).await?;
        let answers = self.executor.execute(&proposal.prompt, &questions(gold)).await;
        let candidate = Candidate::new(round, proposal.prompt, answers);

        let verdict = self
            .comparator
            .compare(&self.template.requirements, &best.to_candidate(), &candidate, gold)
            .await;
        tracing::info!(
            accepted = verdict.accepted,
            candidate_votes = verdict.candidate_votes,
            best_votes = verdict.best_votes,
            "Round judged"
        );

        self.record(Decision::record(candidate, verdict.accepted)).await
    }

    async fn record(&self, decision: Decision) -> EngineResult<Decision> {
        self.ledger.append(decision.clone()).await?;
        self.recorded.lock().push(decision.clone());
        if let Some(layout) = &self.layout {
            layout.write_answers(decision.round, &decision.answers).await?;
        }
        tracing::info!(
            accepted = decision.accepted,
            tokens = decision.token_cost,
            "Decision recorded"
        );
        Ok(decision)
    }

    async fn write_prompt(&self, round: u32, prompt: &str) -> EngineResult<()> {
        if let Some(layout) = &self.layout {
            layout.write_prompt(round, prompt).await?;
        }
        Ok(())
    }

    fn sample_gold(&self) -> Vec<QaPair> {
        let mut rng = self.rng.lock();
        self.template.sample_gold(self.sample_k, &mut *rng)
    }

    /// Unreadable history degrades to the decisions this run recorded.
    async fn history(&self) -> Vec<Decision> {
        match self.ledger.history().await {
            Ok(history) => history,
            Err(err) => {
                let recorded = self.recorded.lock().clone();
                tracing::warn!(
                    error = %err,
                    recorded = recorded.len(),
                    "Failed to read ledger, using this run's decisions"
                );
                recorded
            }
        }
    }

    async fn load_best(&self) -> Option<Decision> {
        most_recent_accepted(&self.history().await).cloned()
    }

    async fn check_resume_point(&self) -> EngineResult<()> {
        let last = match self.ledger.last_round().await {
            Ok(last) => last,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read ledger");
                None
            }
        };

        match last {
            Some(last) if self.initial_round != last + 1 => Err(EngineError::Config(format!(
                "ledger ends at round {}, so the run must start at round {} (got {})",
                last,
                last + 1,
                self.initial_round
            ))),
            None if self.initial_round > 1 => {
                tracing::warn!(
                    initial_round = self.initial_round,
                    "Resuming without a ledger history"
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn report(&self) -> EngineResult<FinalReport> {
        let history = self.history().await;
        let best = most_recent_accepted(&history).ok_or(EngineError::NoAcceptedRound)?;

        Ok(FinalReport {
            round: best.round,
            prompt: best.prompt.clone(),
            answers: best.answers.clone(),
            rounds_recorded: history.len(),
            rounds_accepted: history.iter().filter(|d| d.accepted).count(),
        })
    }
}

fn questions(pairs: &[QaPair]) -> Vec<String> {
    pairs.iter().map(|pair| pair.question.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, LedgerError, LedgerResult};
    use async_trait::async_trait;
    use spo_llm::{ChatMessage, Completion, CompletionConfig, ScriptedClient};

    fn template() -> Template {
        Template {
            seed_prompt: "Seed.".to_string(),
            requirements: "Be brief.".to_string(),
            target_length: None,
            gold_qa: vec![QaPair::new("q1", "g1"), QaPair::new("q2", "g2")],
        }
    }

    fn models() -> Arc<ModelSuite> {
        Arc::new(ModelSuite::uniform(
            Arc::new(ScriptedClient::new(|_, _| {
                Ok(Completion::text("<prompt>Next.</prompt><choose>B</choose>"))
            })),
            CompletionConfig::new("m", 0.0),
        ))
    }

    struct BrokenLedger;

    #[async_trait]
    impl DecisionLedger for BrokenLedger {
        async fn append(&self, _decision: Decision) -> LedgerResult<()> {
            Ok(())
        }

        async fn history(&self) -> LedgerResult<Vec<Decision>> {
            Err(LedgerError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[tokio::test]
    async fn refuses_resume_gap() {
        let ledger = Arc::new(InMemoryLedger::new());
        let optimizer = Optimizer::new(template(), models(), ledger.clone());
        optimizer.optimize(2).await.unwrap();

        let resumed = Optimizer::new(template(), models(), ledger.clone()).with_initial_round(5);
        assert!(matches!(resumed.optimize(1).await, Err(EngineError::Config(_))));

        let resumed = Optimizer::new(template(), models(), ledger.clone()).with_initial_round(3);
        let report = resumed.optimize(1).await.unwrap();
        assert_eq!(report.rounds_recorded, 3);
    }

    #[tokio::test]
    async fn unreadable_ledger_runs_baseline() {
        let optimizer = Optimizer::new(template(), models(), Arc::new(BrokenLedger));
        let decision = optimizer.run_round(4).await.unwrap();
        assert!(decision.accepted);
        assert_eq!(decision.prompt, "Seed.");
    }

    /// Rewrites to "Next." and judges for whichever slot answered with it.
    fn climbing_models() -> Arc<ModelSuite> {
        let client = ScriptedClient::new(|messages: &[ChatMessage], _: &CompletionConfig| {
            let content = &messages[0].content;
            let reply = if content.contains("reference prompt") {
                "<prompt>Next.</prompt>".to_string()
            } else if let (Some(a), Some(b)) = (content.find("# A\n"), content.find("# B\n")) {
                let choice = if content[a..b].contains("from Next.") { "A" } else { "B" };
                format!("<choose>{}</choose>", choice)
            } else {
                let prompt = content.split("\n\n").next().unwrap_or_default();
                format!("from {}", prompt)
            };
            Ok(Completion::text(reply))
        });
        Arc::new(ModelSuite::uniform(Arc::new(client), CompletionConfig::new("m", 0.0)))
    }

    #[tokio::test]
    async fn unreadable_ledger_still_climbs_and_reports() {
        let optimizer = Optimizer::new(template(), climbing_models(), Arc::new(BrokenLedger));
        let report = optimizer.optimize(2).await.unwrap();

        assert_eq!(report.round, 2);
        assert_eq!(report.prompt, "Next.");
        assert_eq!(report.rounds_recorded, 2);
        assert_eq!(report.rounds_accepted, 2);
    }

    #[tokio::test]
    async fn round_executes_sampled_questions_only() {
        let search = SearchSettings {
            sample_k: 1,
            seed: Some(11),
            ..SearchSettings::default()
        };
        let optimizer = Optimizer::new(template(), models(), Arc::new(InMemoryLedger::new()))
            .with_search(&search);

        let decision = optimizer.run_round(1).await.unwrap();
        assert_eq!(decision.answers.len(), 1);
    }

    #[test]
    fn report_display() {
        let report = FinalReport {
            round: 3,
            prompt: "Be terse.".to_string(),
            answers: vec![],
            rounds_recorded: 4,
            rounds_accepted: 2,
        };
        assert_eq!(
            report.to_string(),
            "Best prompt from round 3 (2 of 4 rounds accepted):\nBe terse."
        );
    }
}
