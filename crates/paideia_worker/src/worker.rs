//! Single-consumer background worker.
//!
//! Jobs flow through a bounded mpsc channel and run strictly in submission
//! order. Job failures are logged and flagged on the session; nothing a job
//! does can kill the loop. Shutdown is close-and-drain with a hard deadline.

use crate::context::AppContext;
use crate::job::Job;
use crate::title;
use anyhow::{anyhow, bail, Context, Result};
use paideia_core::{suggested_size, MessageQueue, QuizDocument};
use paideia_reasoning::{QuizAuthor, TutorAgent};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Worker;

pub struct WorkerHandle {
    tx: mpsc::Sender<Job>,
    join: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl Worker {
    /// Start the consumer task and hand back its submission handle.
    pub fn spawn(ctx: Arc<AppContext>) -> WorkerHandle {
        let (tx, rx) = mpsc::channel(ctx.config.worker.queue_capacity);
        let shutdown_timeout = Duration::from_secs(ctx.config.worker.shutdown_timeout_secs);
        let join = tokio::spawn(run_loop(ctx, rx));
        WorkerHandle {
            tx,
            join,
            shutdown_timeout,
        }
    }
}

impl WorkerHandle {
    /// Enqueue a job, awaiting channel capacity when the queue is full.
    pub async fn submit(&self, job: Job) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| anyhow!("worker queue is closed"))
    }

    /// Close-and-drain shutdown: queue the stop marker, close the channel,
    /// then wait out the deadline. The deadline is hard; a worker still busy
    /// when it passes is aborted.
    pub async fn shutdown(self) {
        if self.tx.send(Job::Shutdown).await.is_err() {
            tracing::warn!("worker queue already closed at shutdown");
        }
        drop(self.tx);

        let abort = self.join.abort_handle();
        match tokio::time::timeout(self.shutdown_timeout, self.join).await {
            Ok(_) => tracing::info!("worker shut down cleanly"),
            Err(_) => {
                tracing::warn!(
                    "worker did not shut down within {:?}, aborting",
                    self.shutdown_timeout
                );
                abort.abort();
            }
        }
    }
}

async fn run_loop(ctx: Arc<AppContext>, mut rx: mpsc::Receiver<Job>) {
    tracing::info!("worker task started");
    while let Some(job) = rx.recv().await {
        match job {
            Job::Shutdown => {
                tracing::info!("worker received shutdown job");
                break;
            }
            Job::InitializeTutor {
                session_id,
                quiz_key,
            } => initialize_tutor(&ctx, &session_id, &quiz_key).await,
            Job::GenerateQuiz {
                job_id,
                source_material,
                requested_title,
                output_path,
                cleanup_path,
                size_preference,
            } => {
                let result = generate_quiz(
                    &ctx,
                    &job_id,
                    &source_material,
                    &requested_title,
                    &output_path,
                    size_preference,
                )
                .await;
                if let Err(e) = result {
                    tracing::error!("quiz generation job '{job_id}' failed: {e:#}");
                }
                // The uploaded temp file goes away whether or not the job
                // succeeded.
                if let Some(path) = cleanup_path {
                    remove_upload(&path, &job_id);
                }
            }
        }
    }
    tracing::info!("worker task finished");
}

/// Every failure on this path ends with `tutor_failed = true` and a log line;
/// the worker itself never errors out of a tutor init.
async fn initialize_tutor(ctx: &Arc<AppContext>, session_id: &str, quiz_key: &str) {
    enum Resolution {
        AlreadyBuilt,
        Build(Arc<QuizDocument>, MessageQueue),
        QuizMissing,
    }

    let resolution = ctx.sessions.with_session(session_id, |state| {
        if state.active_tutor.is_some() && state.tutor_key.as_deref() == Some(quiz_key) {
            state.tutor_ready = true;
            state.tutor_failed = false;
            return Resolution::AlreadyBuilt;
        }
        let quiz = state.quizzes.get(quiz_key).cloned().or_else(|| {
            // start-quiz may have set the active quiz without registering it
            // in the per-session map yet.
            if state.active_quiz_key.as_deref() == Some(quiz_key) {
                state.active_quiz.clone()
            } else {
                None
            }
        });
        match quiz {
            Some(quiz) => Resolution::Build(quiz, state.pending_messages.clone()),
            None => {
                state.tutor_ready = false;
                state.tutor_failed = true;
                Resolution::QuizMissing
            }
        }
    });

    match resolution {
        Resolution::AlreadyBuilt => {
            tracing::info!("tutor for session {session_id} quiz '{quiz_key}' already built");
        }
        Resolution::QuizMissing => {
            tracing::warn!(
                "tutor init failed: quiz '{quiz_key}' not found for session {session_id}"
            );
        }
        Resolution::Build(quiz, queue) => {
            let tutor = TutorAgent::new(
                ctx.backend.clone(),
                &ctx.config.llm.model,
                &quiz.source_material,
                queue,
                ctx.retry_policy(),
                ctx.config.agent.max_corrections,
            );
            ctx.sessions.with_session(session_id, |state| {
                state.active_tutor = Some(Arc::new(tokio::sync::Mutex::new(tutor)));
                state.tutor_key = Some(quiz_key.to_string());
                state.tutor_ready = true;
                state.tutor_failed = false;
            });
            tracing::info!("tutor initialised for session {session_id}, quiz '{quiz_key}'");
        }
    }
}

async fn generate_quiz(
    ctx: &Arc<AppContext>,
    job_id: &str,
    source_material: &str,
    requested_title: &str,
    output_path: &Path,
    size_preference: crate::job::SizePreference,
) -> Result<()> {
    let title = resolve_title(ctx, job_id, source_material, requested_title).await;

    let size = size_preference.target().unwrap_or_else(|| {
        suggested_size(
            source_material,
            ctx.config.quiz.size_k,
            ctx.config.quiz.size_min,
            ctx.config.quiz.size_max,
        )
    });
    tracing::info!("generating quiz '{title}' (job {job_id}, target {size} questions)");

    let author = QuizAuthor::new(
        ctx.backend.clone(),
        &ctx.config.llm.model,
        ctx.retry_policy(),
        ctx.config.agent.max_corrections,
    );
    let mut doc = author.generate(source_material, size).await?;
    if doc.total_question_count() == 0 {
        bail!("authoring produced no questions");
    }
    doc.title = title;

    let json = serde_json::to_string_pretty(&doc).context("serialising quiz document")?;
    std::fs::write(output_path, json)
        .with_context(|| format!("writing quiz to {}", output_path.display()))?;
    tracing::info!(
        "quiz '{}' saved to {} ({} questions)",
        doc.title,
        output_path.display(),
        doc.total_question_count()
    );
    Ok(())
}

/// Pick the quiz title: the user's choice wins; otherwise one model attempt,
/// then the deterministic fallback.
async fn resolve_title(
    ctx: &Arc<AppContext>,
    job_id: &str,
    source_material: &str,
    requested_title: &str,
) -> String {
    let requested = requested_title.trim();
    if !requested.is_empty() {
        return requested.to_string();
    }

    if let Some(generated) = title::generate_title(
        ctx.backend.clone(),
        &ctx.config.llm.model,
        ctx.retry_policy(),
        source_material,
    )
    .await
    {
        tracing::info!("model proposed quiz title '{generated}' for job {job_id}");
        return generated;
    }

    let snippet: String = source_material.chars().take(300).collect();
    let fallback = title::fallback_title(&snippet, job_id);
    tracing::info!("using fallback quiz title '{fallback}' for job {job_id}");
    fallback
}

fn remove_upload(path: &Path, job_id: &str) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("removed temp upload {} (job {job_id})", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "could not remove temp upload {} (job {job_id}): {e}",
            path.display()
        ),
    }
}
