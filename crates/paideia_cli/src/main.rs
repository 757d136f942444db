use anyhow::{Context, Result};
use clap::Parser;
use paideia_core::PaideiaConfig;
use paideia_reasoning::providers::GeminiBackend;
use paideia_reasoning::ChatBackend;
use paideia_worker::{AppContext, Job, SizePreference, Worker};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a quiz from a source text", long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "paideia.toml")]
    config: String,

    /// Path to the source material text file
    #[arg(short, long)]
    input: PathBuf,

    /// Quiz title; generated from the source when omitted
    #[arg(short, long)]
    title: Option<String>,

    /// Question count preference: auto, small, medium or large
    #[arg(short, long, default_value = "auto")]
    size: String,

    /// Where to write the generated quiz JSON
    #[arg(short, long, default_value = "quiz.json")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = PaideiaConfig::load_or_default(&args.config);

    let source_material = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading source material from {}", args.input.display()))?;
    if source_material.trim().is_empty() {
        anyhow::bail!("source material file {} is empty", args.input.display());
    }

    let backend: Arc<dyn ChatBackend> = Arc::new(GeminiBackend::from_env(
        &config.llm.api_key_env,
        config.llm.base_url.clone(),
    )?);
    let ctx = Arc::new(AppContext::new(backend, config));

    let job_id = format!("cli_custom_{}", &Uuid::new_v4().simple().to_string()[..8]);
    info!("submitting quiz generation job {job_id}");

    let handle = Worker::spawn(ctx);
    handle
        .submit(Job::GenerateQuiz {
            job_id,
            source_material,
            requested_title: args.title.unwrap_or_default(),
            output_path: args.output.clone(),
            cleanup_path: None,
            size_preference: SizePreference::parse(&args.size),
        })
        .await?;

    // Close-and-drain: the job above runs to completion before the worker
    // stops.
    handle.shutdown().await;

    if args.output.exists() {
        println!("Quiz written to {}", args.output.display());
        Ok(())
    } else {
        anyhow::bail!("quiz generation failed; see the log for details")
    }
}
