//! Job descriptors for the background worker.

use std::path::PathBuf;

/// Requested quiz size band; `Auto` defers to the word-count heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizePreference {
    #[default]
    Auto,
    Small,
    Medium,
    Large,
}

impl SizePreference {
    /// Fixed question target, or `None` for the heuristic.
    pub fn target(self) -> Option<usize> {
        match self {
            SizePreference::Auto => None,
            SizePreference::Small => Some(10),
            SizePreference::Medium => Some(20),
            SizePreference::Large => Some(30),
        }
    }

    /// Parse a user-supplied preference string; anything unrecognised is
    /// `Auto`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => SizePreference::Small,
            "medium" => SizePreference::Medium,
            "large" => SizePreference::Large,
            _ => SizePreference::Auto,
        }
    }
}

/// A unit of background work. Immutable once enqueued.
#[derive(Debug)]
pub enum Job {
    /// Build (or reuse) the tutor for a session's quiz.
    InitializeTutor {
        session_id: String,
        quiz_key: String,
    },
    /// Author a quiz from source material and persist it as JSON.
    GenerateQuiz {
        job_id: String,
        source_material: String,
        /// User-supplied title; empty means generate one.
        requested_title: String,
        output_path: PathBuf,
        /// Temporary upload to remove once the job finishes, pass or fail.
        cleanup_path: Option<PathBuf>,
        size_preference: SizePreference,
    },
    /// Stop the worker after the in-flight job.
    Shutdown,
}
