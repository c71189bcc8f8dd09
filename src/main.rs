// Redraft - self-correcting content generation
// Main entry point

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use redraft::config::load_config_from;
use redraft::workflow::{JudgeMode, JudgeParsing, Outcome, Workflow};

/// Draft an answer, have it judged, and revise until it passes
#[derive(Parser, Debug)]
#[command(name = "redraft", version, about)]
struct Args {
    /// Prompt to answer (read from stdin when omitted or "-")
    prompt: Option<String>,

    /// Config file (default: ~/.redraft/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Attempts before giving up
    #[arg(long)]
    max_retries: Option<u32>,

    /// Critique/revise rounds per attempt
    #[arg(long)]
    max_revisions: Option<u32>,

    /// Ask the evaluator for "binary" (yes/no) or "scale" (1-5)
    #[arg(long)]
    judge_mode: Option<JudgeMode>,

    /// Fail the attempt when the evaluator answers anything but the requested token
    #[arg(long)]
    strict_judge: bool,

    /// Print whether the answer passed, and after how many revisions, to stderr
    #[arg(long)]
    show_outcome: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        "redraft=debug"
    } else {
        "redraft=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config_from(args.config.as_deref())?;
    if let Some(max_retries) = args.max_retries {
        config.workflow.max_retries = max_retries;
    }
    if let Some(max_revisions) = args.max_revisions {
        config.workflow.max_revisions = max_revisions;
    }
    if let Some(judge_mode) = args.judge_mode {
        config.workflow.judge_mode = judge_mode;
    }
    if args.strict_judge {
        config.workflow.judge_parsing = JudgeParsing::Strict;
    }
    config
        .validate()
        .context("Invalid command-line overrides")?;

    let prompt = read_prompt(args.prompt)?;

    let cancel = CancellationToken::new();
    let workflow = Workflow::from_config(&config)?.with_cancellation(cancel.clone());

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            ctrl_c.cancel();
        }
    });

    let outcome = match workflow.run(&prompt).await {
        Ok(outcome) => outcome,
        Err(e) => bail!("{}", e.describe()),
    };

    if args.show_outcome {
        match &outcome {
            Outcome::Passed { revisions, .. } => {
                eprintln!("passed after {} revision(s)", revisions)
            }
            Outcome::Exhausted { revisions, .. } => {
                eprintln!("revision budget exhausted after {} revision(s)", revisions)
            }
        }
    }

    println!("{}", outcome.answer());
    Ok(())
}

fn read_prompt(arg: Option<String>) -> Result<String> {
    let prompt = match arg {
        Some(prompt) if prompt != "-" => prompt,
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read prompt from stdin")?;
            buffer
        }
    };

    if prompt.trim().is_empty() {
        bail!("Prompt is empty");
    }
    Ok(prompt)
}
