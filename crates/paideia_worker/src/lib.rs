//! Background task processing for the quiz platform.
//!
//! One bounded job queue, one consumer task. Request handlers enqueue jobs and
//! poll session state; the worker runs the authoring and tutor agents and
//! writes results back through the session store.

pub mod context;
pub mod job;
pub mod session;
pub mod title;
pub mod worker;

pub use context::AppContext;
pub use job::{Job, SizePreference};
pub use session::{Score, SessionState, SessionStore};
pub use worker::{Worker, WorkerHandle};
