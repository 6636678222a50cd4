//! `taskforge run` — Drive one task through the refinement loop.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use taskforge_agent::{Evaluator, Orchestrator, TurnProvider};
use taskforge_config::AppConfig;
use taskforge_gateway::{GenerationSettings, HttpChatTransport, ModelGateway};
use taskforge_report::{MarkdownFileRenderer, ReportAssembler};

pub async fn run(
    task_words: Vec<String>,
    context: Option<String>,
    reports_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    config.validate()?;

    // Check for API key early — give a clear error
    let Some(api_key) = config.api_key.clone() else {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    TASKFORGE_API_KEY = 'sk-...'");
        eprintln!("    OPENAI_API_KEY    = 'sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    };

    let transport = Arc::new(HttpChatTransport::new(
        config.api.endpoint.clone(),
        api_key,
        config.api.timeout_ms,
    ));
    let gateway = Arc::new(ModelGateway::new(
        transport,
        config.standing_instructions.clone(),
        GenerationSettings {
            max_tokens: config.generation.max_tokens,
            max_completion_tokens: config.generation.max_completion_tokens,
            default_temperature: config.generation.default_temperature,
        },
    ));

    let evaluator = Evaluator::new(
        gateway.clone(),
        config.models.evaluation.clone(),
        config.execution.target_score,
    );

    let reports_dir = reports_dir.unwrap_or_else(AppConfig::reports_dir);
    let assembler = ReportAssembler::new(
        gateway.clone(),
        config.models.default.clone(),
        Arc::new(MarkdownFileRenderer::new(&reports_dir)),
    );

    let mut orchestrator = Orchestrator::new(
        gateway,
        evaluator,
        assembler,
        config.models.clone(),
        config.execution.clone(),
    );

    let description = if task_words.is_empty() {
        None
    } else {
        Some(task_words.join(" "))
    };

    // Seed context means headless: no questions, no follow-ups, JSON out.
    let headless = context.is_some();
    if !headless {
        println!();
        println!("  TaskForge — Iterative Refinement");
        println!("  Model: {}   Target: {}/10   Attempts: up to {}",
            config.models.thinking,
            config.execution.target_score,
            config.execution.max_attempts,
        );
        println!();
        orchestrator = orchestrator.with_turns(Box::new(StdinTurns));
    }

    let outcome = orchestrator.run(description, context).await?;

    if headless {
        let summary = serde_json::json!({
            "run_id": outcome.run_id.to_string(),
            "task": outcome.task.description(),
            "completed": outcome.task.is_completed(),
            "final_score": outcome.final_score,
            "max_attempts_reached": outcome.max_attempts_reached,
            "report_title": outcome.report.title,
            "report_path": outcome.report.path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        println!("  Final score: {}/10", outcome.final_score);
        if outcome.max_attempts_reached {
            println!("  Attempt budget exhausted before the target score.");
        }
        println!("  Report: {}", outcome.report.path.display());
        println!();
    }

    Ok(())
}

/// Reads conversation turns from stdin and prints narrative to stdout.
struct StdinTurns;

impl TurnProvider for StdinTurns {
    fn request_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(_) => None,
        }
    }

    fn notify(&mut self, text: &str) {
        println!("{text}");
    }
}
