pub mod config;
pub mod question;
pub mod queue;
pub mod quiz;

pub use config::PaideiaConfig;
pub use question::Question;
pub use queue::MessageQueue;
pub use quiz::{suggested_size, QuizDocument, QuizError, Section};
