//! The run orchestrator.
//!
//! Owns the phase machine for one task: take the task, gather context,
//! iterate search → think → evaluate → feedback, finalize a report, and —
//! when a conversation partner is attached — answer follow-up questions.
//! Finalization is unconditional: a run that exhausts its attempt budget
//! still produces a report from whatever memory accumulated.

use std::fmt;
use std::sync::Arc;

use taskforge_config::{ExecutionConfig, ModelAlias, ModelAliases};
use taskforge_core::error::Error;
use taskforge_core::message::Message;
use taskforge_core::task::Task;
use taskforge_gateway::{ModelGateway, SendOptions};
use taskforge_memory::WorkingMemory;
use taskforge_report::{ReportArtifact, ReportAssembler};
use tracing::{debug, info};
use uuid::Uuid;

use crate::evaluator::Evaluator;
use crate::turns::TurnProvider;

/// The phases a run moves through, in order. `FollowUp` only occurs when a
/// [`TurnProvider`] is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    AwaitingTask,
    GatheringContext,
    Iterating,
    Finalizing,
    FollowUp,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::AwaitingTask => "awaiting_task",
            RunPhase::GatheringContext => "gathering_context",
            RunPhase::Iterating => "iterating",
            RunPhase::Finalizing => "finalizing",
            RunPhase::FollowUp => "follow_up",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub task: Task,
    pub memory: WorkingMemory,
    pub report: ReportArtifact,
    pub final_score: u8,
    /// True when the attempt budget ran out before the target score.
    pub max_attempts_reached: bool,
}

/// Drives one task through the full refinement lifecycle.
pub struct Orchestrator {
    gateway: Arc<ModelGateway>,
    evaluator: Evaluator,
    assembler: ReportAssembler,
    models: ModelAliases,
    execution: ExecutionConfig,
    turns: Option<Box<dyn TurnProvider>>,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<ModelGateway>,
        evaluator: Evaluator,
        assembler: ReportAssembler,
        models: ModelAliases,
        execution: ExecutionConfig,
    ) -> Self {
        Self {
            gateway,
            evaluator,
            assembler,
            models,
            execution,
            turns: None,
        }
    }

    /// Attach a conversation partner, enabling the interactive phases.
    pub fn with_turns(mut self, turns: Box<dyn TurnProvider>) -> Self {
        self.turns = Some(turns);
        self
    }

    /// Execute one full run.
    ///
    /// `description` may be omitted only when a turn provider is attached;
    /// `seed_context` replaces the interactive context-gathering phase.
    pub async fn run(
        mut self,
        description: Option<String>,
        seed_context: Option<String>,
    ) -> Result<RunOutcome, Error> {
        let run_id = Uuid::new_v4();
        self.enter(run_id, RunPhase::AwaitingTask);

        let description = self.resolve_description(description)?;
        let mut task = Task::new(&description);
        let mut memory = WorkingMemory::new();
        memory.store_task(task.clone())?;
        info!(%run_id, task = %task.description(), "Run started");

        self.enter(run_id, RunPhase::GatheringContext);
        if let Some(context) = seed_context {
            let context = context.trim();
            if !context.is_empty() {
                task.add_metadata("provided_context", context);
                memory.store_search_result(context);
            }
        } else if self.turns.is_some() {
            self.gather_context(&mut task, &mut memory).await?;
        }

        self.enter(run_id, RunPhase::Iterating);
        let target = self.execution.target_score;
        let max_attempts = self.execution.max_attempts;
        let mut score = 0u8;
        let mut attempts = 0u32;

        while score < target && attempts < max_attempts {
            attempts += 1;
            let percent = attempts * 100 / max_attempts;
            info!(attempt = attempts, max_attempts, percent, "Refinement attempt");
            self.say(&format!(
                "[{percent}%] Attempt {attempts}/{max_attempts}: searching..."
            ));

            let findings = self
                .gateway
                .send(
                    self.models.resolve(ModelAlias::Search),
                    vec![Message::user(search_prompt(&task, &memory))],
                    SendOptions::default(),
                )
                .await?;
            memory.store_search_result(&findings.text());

            self.say("Generating an approach...");
            let approach = self
                .gateway
                .send(
                    self.models.resolve(ModelAlias::Thinking),
                    vec![Message::user(approach_prompt(&task, &memory))],
                    SendOptions::default(),
                )
                .await?;
            memory.store_approach(&approach.text());

            score = self
                .evaluator
                .evaluate_task_completion(&mut task, &mut memory)
                .await?;
            info!(score, target, attempt = attempts, "Approach evaluated");
            self.say(&format!("Attempt {attempts} scored {score}/{target}."));

            // No feedback on the final permitted attempt: nothing would
            // consume it.
            if score < target && attempts < max_attempts {
                let feedback = self.evaluator.generate_feedback(&task, &memory).await?;
                memory.store_feedback(&feedback);
            }
        }

        let max_attempts_reached = attempts >= max_attempts && score < target;
        if score >= target {
            task.mark_completed();
            info!(score, "Target score reached");
        } else {
            info!(score, target, "Attempt budget exhausted below target");
        }

        self.enter(run_id, RunPhase::Finalizing);
        let report = self.assembler.finalize(&task, &memory).await?;
        self.say(&format!("Report written to {}", report.path.display()));

        if self.turns.is_some() {
            self.enter(run_id, RunPhase::FollowUp);
            self.follow_up(&task, &mut memory).await?;
        }

        self.enter(run_id, RunPhase::Done);
        // Refresh the stored task so memory carries the final metadata.
        memory.store_task(task.clone())?;

        Ok(RunOutcome {
            run_id,
            task,
            memory,
            report,
            final_score: score,
            max_attempts_reached,
        })
    }

    fn resolve_description(&mut self, description: Option<String>) -> Result<String, Error> {
        if let Some(given) = description {
            let given = given.trim().to_string();
            if !given.is_empty() {
                return Ok(given);
            }
        }

        let Some(turns) = self.turns.as_mut() else {
            return Err(Error::MissingInput(
                "a task description is required in headless mode".into(),
            ));
        };

        turns
            .request_line("Enter the task to work on: ")
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .ok_or_else(|| Error::MissingInput("no task description provided".into()))
    }

    /// Interactive context gathering: ask the model for clarifying questions,
    /// collect the user's answers, and seed memory with both.
    async fn gather_context(
        &mut self,
        task: &mut Task,
        memory: &mut WorkingMemory,
    ) -> Result<(), Error> {
        let reply = self
            .gateway
            .send(
                self.models.resolve(ModelAlias::Default),
                vec![Message::user(format!(
                    "{}\nGenerate at least 5 clarifying questions whose answers would \
                     most improve the final result. Number them, one per line.",
                    task.to_prompt()
                ))],
                SendOptions::default(),
            )
            .await?;
        let questions = reply.text();

        let Some(turns) = self.turns.as_mut() else {
            return Ok(());
        };
        turns.notify(&questions);
        turns.notify("Answer what you can, one line at a time. An empty line finishes.");

        let mut answers: Vec<String> = Vec::new();
        while let Some(line) = turns.request_line("> ") {
            if line.trim().is_empty() {
                break;
            }
            answers.push(line);
        }
        if answers.is_empty() {
            return Ok(());
        }

        let answers = answers.join("\n");
        task.add_metadata("user_context", answers.as_str());
        memory.store_search_result(&format!(
            "Clarifying questions:\n{questions}\n\nUser answers:\n{answers}"
        ));
        Ok(())
    }

    /// Interactive follow-up loop after the report: answer questions against
    /// the accumulated memory until the user types `exit`.
    async fn follow_up(&mut self, task: &Task, memory: &mut WorkingMemory) -> Result<(), Error> {
        loop {
            let Some(turns) = self.turns.as_mut() else {
                return Ok(());
            };
            let Some(line) = turns.request_line("Follow-up question ('exit' to finish): ") else {
                return Ok(());
            };

            let question = line.trim().to_string();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case("exit") {
                return Ok(());
            }

            let prompt = format!(
                "{}\nACCUMULATED CONTEXT:\n{}\n\nBEST APPROACH SO FAR:\n{}\n\n\
                 FOLLOW-UP QUESTION:\n{}\n\nAnswer the question using the context above.",
                task.to_prompt(),
                memory.recent_context_summary(),
                memory.best_approach(),
                question
            );

            let reply = self
                .gateway
                .send(
                    self.models.resolve(ModelAlias::Default),
                    vec![Message::user(prompt)],
                    SendOptions::default(),
                )
                .await?;
            let answer = reply.text();

            memory.store_search_result(&format!("Follow-up question: {question}"));
            memory.store_approach(&answer);
            self.say(&answer);
        }
    }

    fn say(&mut self, text: &str) {
        if let Some(turns) = self.turns.as_mut() {
            turns.notify(text);
        }
    }

    fn enter(&self, run_id: Uuid, phase: RunPhase) {
        debug!(%run_id, %phase, "Entering phase");
    }
}

fn search_prompt(task: &Task, memory: &WorkingMemory) -> String {
    format!(
        "{}\nFind information that helps solve this task: facts, methods, \
         prior art, constraints.\n\nWhat is already known:\n{}",
        task.to_prompt(),
        memory.recent_context_summary()
    )
}

fn approach_prompt(task: &Task, memory: &WorkingMemory) -> String {
    format!(
        "{}\nUsing the findings below, produce the best complete solution \
         approach you can.\n\nFINDINGS:\n{}\n\nPrevious feedback: {}",
        task.to_prompt(),
        memory.latest_search_result(),
        memory.last_feedback().unwrap_or("None")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use taskforge_core::error::GatewayError;
    use taskforge_core::transport::{ChatTransport, TransportReply};
    use taskforge_gateway::GenerationSettings;
    use taskforge_report::MarkdownFileRenderer;

    struct ScriptedTransport {
        replies: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<serde_json::Value>>,
    }

    impl ScriptedTransport {
        fn new(contents: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(contents.iter().map(|s| s.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn models_called(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|body| body["model"].as_str().unwrap().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn post_chat(
            &self,
            body: &serde_json::Value,
        ) -> Result<TransportReply, GatewayError> {
            self.requests.lock().unwrap().push(body.clone());
            let content = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport script exhausted");
            Ok(TransportReply {
                status: 200,
                body: serde_json::json!({
                    "choices": [{ "message": { "content": content } }]
                })
                .to_string(),
            })
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl ChatTransport for FailingTransport {
        fn name(&self) -> &str {
            "failing"
        }

        async fn post_chat(
            &self,
            _body: &serde_json::Value,
        ) -> Result<TransportReply, GatewayError> {
            Ok(TransportReply {
                status: 503,
                body: "upstream unavailable".into(),
            })
        }
    }

    struct ScriptedTurns {
        lines: VecDeque<String>,
        notifications: Vec<String>,
    }

    impl ScriptedTurns {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|s| s.to_string()).collect(),
                notifications: Vec::new(),
            }
        }
    }

    impl TurnProvider for ScriptedTurns {
        fn request_line(&mut self, _prompt: &str) -> Option<String> {
            self.lines.pop_front()
        }

        fn notify(&mut self, text: &str) {
            self.notifications.push(text.to_string());
        }
    }

    fn test_models() -> ModelAliases {
        ModelAliases {
            default: "m-default".into(),
            search: "m-search-preview".into(),
            thinking: "m-thinking".into(),
            evaluation: "m-eval".into(),
            ..ModelAliases::default()
        }
    }

    fn orchestrator_with(
        transport: Arc<dyn ChatTransport>,
        reports_dir: &std::path::Path,
        max_attempts: u32,
    ) -> Orchestrator {
        let gateway = Arc::new(ModelGateway::new(
            transport,
            "Standing rules.",
            GenerationSettings {
                max_tokens: 1200,
                max_completion_tokens: 10_000,
                default_temperature: 0.2,
            },
        ));
        let models = test_models();
        let evaluator = Evaluator::new(gateway.clone(), models.evaluation.clone(), 10);
        let assembler = ReportAssembler::new(
            gateway.clone(),
            models.default.clone(),
            Arc::new(MarkdownFileRenderer::new(reports_dir)),
        );
        Orchestrator::new(
            gateway,
            evaluator,
            assembler,
            models,
            ExecutionConfig {
                max_attempts,
                target_score: 10,
            },
        )
    }

    #[tokio::test]
    async fn headless_run_reaches_target_in_one_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(&[
            "finding A",
            "approach A",
            r#"{"score": 10, "rationale": "complete"}"#,
            "## Report\n\nDone.",
        ]);
        let orchestrator = orchestrator_with(transport.clone(), dir.path(), 2);

        let outcome = orchestrator
            .run(
                Some("Compare two databases".into()),
                Some("both are relational".into()),
            )
            .await
            .unwrap();

        assert_eq!(outcome.final_score, 10);
        assert!(!outcome.max_attempts_reached);
        assert!(outcome.task.is_completed());
        assert_eq!(outcome.report.title, "Compare two databases");
        assert!(outcome.report.path.exists());

        // Seed context plus one search round.
        assert_eq!(outcome.memory.all_search_results().len(), 2);
        assert_eq!(outcome.memory.all_search_results()[0].content, "both are relational");
        assert_eq!(outcome.memory.all_approaches().len(), 1);
        assert!(outcome.memory.all_feedback().is_empty());
        let scores: Vec<u8> = outcome.memory.all_scores().iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![10]);

        assert_eq!(
            outcome
                .task
                .metadata("provided_context")
                .unwrap()
                .to_string(),
            "both are relational"
        );

        // Each phase used its own model slot; the synthesis call went last.
        assert_eq!(
            transport.models_called(),
            vec!["m-search-preview", "m-thinking", "m-eval", "m-default"]
        );
    }

    #[tokio::test]
    async fn budget_exhaustion_applies_progressive_caps() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(&[
            "s1",
            "a1",
            r#"{"score": 5, "rationale": "thin"}"#,
            "feedback 1",
            "s2",
            "a2",
            r#"{"score": 9, "rationale": "better"}"#,
            "feedback 2",
            "s3",
            "a3",
            r#"{"score": 10, "rationale": "great"}"#,
            "report body",
        ]);
        let orchestrator = orchestrator_with(transport.clone(), dir.path(), 3);

        let outcome = orchestrator
            .run(Some("hard task".into()), None)
            .await
            .unwrap();

        // Raw 5, 9, 10 become 5, 6, 6 under the early-attempt caps.
        let scores: Vec<u8> = outcome.memory.all_scores().iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![5, 6, 6]);
        assert_eq!(outcome.final_score, 6);
        assert!(outcome.max_attempts_reached);
        assert!(!outcome.task.is_completed());

        // Feedback after every attempt except the last.
        assert_eq!(outcome.memory.all_feedback().len(), 2);
        assert_eq!(outcome.memory.all_approaches().len(), 3);

        // Highest score sits at index 1, so a2 is the best approach.
        assert_eq!(outcome.memory.best_approach(), "a2");

        // The loop never exceeded its budget, and the report still happened.
        assert!(outcome.report.path.exists());
    }

    #[tokio::test]
    async fn single_attempt_budget_stores_no_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(&[
            "s1",
            "a1",
            r#"{"score": 4, "rationale": "incomplete"}"#,
            "report body",
        ]);
        let orchestrator = orchestrator_with(transport, dir.path(), 1);

        let outcome = orchestrator
            .run(Some("quick task".into()), None)
            .await
            .unwrap();

        assert_eq!(outcome.final_score, 4);
        assert!(outcome.max_attempts_reached);
        assert!(outcome.memory.all_feedback().is_empty());
        assert_eq!(outcome.memory.all_approaches().len(), 1);
    }

    #[tokio::test]
    async fn headless_run_without_description_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(&[]);
        let orchestrator = orchestrator_with(transport.clone(), dir.path(), 1);

        let err = orchestrator.run(None, None).await.unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_description_is_also_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(&[]);
        let orchestrator = orchestrator_with(transport, dir.path(), 1);

        let err = orchestrator
            .run(Some("   ".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }

    #[tokio::test]
    async fn interactive_run_gathers_context_and_answers_follow_ups() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(&[
            "1. What color scheme?\n2. Which platform?",
            "finding A",
            "approach A",
            r#"{"score": 10, "rationale": "complete"}"#,
            "report body",
            "Red would clash with the logo.",
        ]);
        let orchestrator = orchestrator_with(transport.clone(), dir.path(), 2).with_turns(
            Box::new(ScriptedTurns::new(&[
                "blue is preferred",
                "",
                "what about red?",
                "exit",
            ])),
        );

        let outcome = orchestrator
            .run(Some("Design a landing page".into()), None)
            .await
            .unwrap();

        // Context gathering stored questions and answers together.
        let first = &outcome.memory.all_search_results()[0].content;
        assert!(first.contains("Clarifying questions:"));
        assert!(first.contains("What color scheme?"));
        assert!(first.contains("blue is preferred"));
        assert_eq!(
            outcome.task.metadata("user_context").unwrap().to_string(),
            "blue is preferred"
        );

        // The follow-up answer landed in memory as the latest approach.
        assert_eq!(
            outcome.memory.all_approaches().last().unwrap().content,
            "Red would clash with the logo."
        );
        assert!(outcome
            .memory
            .all_search_results()
            .last()
            .unwrap()
            .content
            .contains("what about red?"));

        // Questions first, then the refinement loop, then the follow-up.
        assert_eq!(
            transport.models_called(),
            vec![
                "m-default",
                "m-search-preview",
                "m-thinking",
                "m-eval",
                "m-default",
                "m-default"
            ]
        );
    }

    #[tokio::test]
    async fn interactive_run_takes_description_from_turns() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(&[
            "questions",
            "finding",
            "approach",
            r#"{"score": 10, "rationale": "ok"}"#,
            "report body",
        ]);
        let orchestrator = orchestrator_with(transport, dir.path(), 1).with_turns(Box::new(
            ScriptedTurns::new(&["typed task", "", "exit"]),
        ));

        let outcome = orchestrator.run(None, None).await.unwrap();
        assert_eq!(outcome.task.description(), "typed task");
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_transport_failure_surfaces_as_gateway_error() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(Arc::new(FailingTransport), dir.path(), 1);

        let err = orchestrator
            .run(Some("doomed task".into()), None)
            .await
            .unwrap_err();

        match err {
            Error::Gateway(GatewayError::RetriesExhausted {
                attempts,
                last_status,
            }) => {
                assert_eq!(attempts, 5);
                assert_eq!(last_status, Some(503));
            }
            other => panic!("expected retries-exhausted, got {other:?}"),
        }
    }
}
