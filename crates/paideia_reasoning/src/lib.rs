pub mod author;
pub mod backend;
pub mod chat;
pub mod engine;
pub mod parser;
pub mod providers;
pub mod tools;
pub mod tutor;

pub use author::QuizAuthor;
pub use backend::{BackendError, ChatBackend, ChatRole, ChatTurn};
pub use chat::{ChatClient, RetryPolicy};
pub use engine::{PromptOutcome, ToolAgent};
pub use parser::{split_response, ActionRequest, ParseError, ParsedTurn};
pub use tools::{Tool, ToolRegistry, ToolReply};
pub use tutor::TutorAgent;
