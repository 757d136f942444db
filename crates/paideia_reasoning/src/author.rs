//! Quiz-authoring agent.
//!
//! Wires a `ToolAgent` to four document-building tools sharing one
//! `QuizDocument` behind a mutex. The model never prints questions; it only
//! requests build actions and reads back their confirmations.

use crate::backend::ChatBackend;
use crate::chat::RetryPolicy;
use crate::engine::{PromptOutcome, ToolAgent};
use crate::tools::{Tool, ToolRegistry, ToolReply};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use paideia_core::{Question, QuizDocument};
use std::sync::{Arc, Mutex};

type SharedDoc = Arc<Mutex<QuizDocument>>;

/// Strip one layer of surrounding parentheses from an option, after trimming.
fn strip_option(raw: &str) -> String {
    let mut s = raw.trim();
    s = s.strip_prefix('(').unwrap_or(s);
    s = s.strip_suffix(')').unwrap_or(s);
    s.to_string()
}

/// Split a comma-separated option list, stripping each item's parentheses.
fn split_options(csv: &str) -> Vec<String> {
    csv.split(',').map(strip_option).collect()
}

fn arg<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument {i} ({name})"))
}

fn section_arg(args: &[String]) -> Result<usize> {
    arg(args, 0, "section index")?
        .trim()
        .parse::<usize>()
        .context("section index must be a non-negative integer")
}

fn lock(doc: &SharedDoc) -> std::sync::MutexGuard<'_, QuizDocument> {
    match doc.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("quiz document lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn added(section_idx: usize, count: usize, question: &str) -> String {
    format!("question #{count}, '{question}', was added to section {section_idx}")
}

// ==================== create_section ====================

struct CreateSection {
    doc: SharedDoc,
}

impl CreateSection {
    fn run(&self, args: &[String]) -> Result<String> {
        let name = arg(args, 0, "section title")?.to_string();
        let idx = lock(&self.doc).add_section(&name);
        tracing::debug!(idx, "created quiz section '{}'", name);
        Ok(format!("Section #{idx} '{name}' created"))
    }
}

#[async_trait]
impl Tool for CreateSection {
    fn name(&self) -> &str {
        "create_section"
    }

    fn manual(&self) -> &str {
        r#"Action name: "create_section"
Args:
  [0] Section title   str
Returns string:
  - "Section #<idx> '<title>' created" on success
  - "error in create_section [...]"    on failure
Purpose: Creates a new section. Sections are 0-indexed in the order created."#
    }

    async fn invoke(&self, args: &[String]) -> ToolReply {
        match self.run(args) {
            Ok(msg) => ToolReply::urgent(msg),
            Err(e) => ToolReply::urgent(format!("error in create_section({args:?}) -> '{e}'")),
        }
    }
}

// ==================== add_multiple_choice ====================

struct AddMultipleChoice {
    doc: SharedDoc,
}

impl AddMultipleChoice {
    fn run(&self, args: &[String]) -> Result<String> {
        let idx = section_arg(args)?;
        let question = arg(args, 1, "question text")?.to_string();
        let correct_answers = split_options(arg(args, 2, "correct answers")?);
        let wrong_answers = split_options(arg(args, 3, "wrong answers")?);
        let explanation = arg(args, 4, "explanation")?.to_string();

        let mut doc = lock(&self.doc);
        let section = doc.section_mut(idx)?;
        section.questions.push(Question::MultipleChoice {
            question: question.clone(),
            correct_answers,
            wrong_answers,
            explanation,
            weight: 1.0,
        });
        Ok(added(idx, section.questions.len(), &question))
    }
}

#[async_trait]
impl Tool for AddMultipleChoice {
    fn name(&self) -> &str {
        "add_multiple_choice"
    }

    fn manual(&self) -> &str {
        r#"Action name: "add_multiple_choice"
Args (exact order):
  [0] Section index (int as string)      str e.g. "0"
  [1] Question text                      str
  [2] Correct answers - comma-separated  str e.g. "(Carbon dioxide)" {no parentheses or commas inside the options themselves}
  [3] Wrong answers - comma-separated    str e.g. "(Oxygen), (Nitrogen)" {no parentheses or commas inside the options themselves}
  [4] Explanation, 1-2 sentences         str
Returns string:
  - "question #<n>, '<text>', was added to section <idx>"
  - "error in add_multiple_choice([...]) -> '<err>'"
Purpose: Adds a multiple-choice question to the specified section."#
    }

    async fn invoke(&self, args: &[String]) -> ToolReply {
        match self.run(args) {
            Ok(msg) => ToolReply::urgent(msg),
            Err(e) => {
                ToolReply::urgent(format!("error in add_multiple_choice({args:?}) -> '{e}'"))
            }
        }
    }
}

// ==================== add_true_false ====================

struct AddTrueFalse {
    doc: SharedDoc,
}

impl AddTrueFalse {
    fn run(&self, args: &[String]) -> Result<String> {
        let idx = section_arg(args)?;
        let question = arg(args, 1, "statement text")?.to_string();
        let correct_answers = vec![strip_option(arg(args, 2, "correct answer")?)];
        let wrong_answers = vec![strip_option(arg(args, 3, "wrong answer")?)];
        let explanation = arg(args, 4, "explanation")?.to_string();

        let mut doc = lock(&self.doc);
        let section = doc.section_mut(idx)?;
        section.questions.push(Question::TrueFalseQuestion {
            question: question.clone(),
            correct_answers,
            wrong_answers,
            explanation,
            weight: 1.0,
        });
        Ok(added(idx, section.questions.len(), &question))
    }
}

#[async_trait]
impl Tool for AddTrueFalse {
    fn name(&self) -> &str {
        "add_true_false"
    }

    fn manual(&self) -> &str {
        r#"Action name: "add_true_false"
Args (exact order):
  [0] Section index (int as string)        str
  [1] Statement text                       str
  [2] Correct answer "(True)" or "(False)" str
  [3] Wrong answer "(True)" or "(False)"   str
  [4] Explanation, 1-2 sentences           str
Returns string as in add_multiple_choice.
Purpose: Adds a true/false question to the specified section."#
    }

    async fn invoke(&self, args: &[String]) -> ToolReply {
        match self.run(args) {
            Ok(msg) => ToolReply::urgent(msg),
            Err(e) => ToolReply::urgent(format!("error in add_true_false({args:?}) -> '{e}'")),
        }
    }
}

// ==================== add_short_answer ====================

const DEFAULT_GRADING: &str = "Be detailed and accurate.";

struct AddShortAnswer {
    doc: SharedDoc,
}

impl AddShortAnswer {
    fn run(&self, args: &[String]) -> Result<String> {
        let idx = section_arg(args)?;
        let question = arg(args, 1, "question text")?.to_string();
        let correct_answer = split_options(arg(args, 2, "ideal answers")?);
        let explanation = arg(args, 3, "explanation")?.to_string();
        let grading_instructions = args
            .get(4)
            .cloned()
            .unwrap_or_else(|| DEFAULT_GRADING.to_string());

        let mut doc = lock(&self.doc);
        let section = doc.section_mut(idx)?;
        section.questions.push(Question::ShortAnswer {
            question: question.clone(),
            correct_answer,
            explanation,
            grading_instructions,
            weight: 1.0,
        });
        Ok(added(idx, section.questions.len(), &question))
    }
}

#[async_trait]
impl Tool for AddShortAnswer {
    fn name(&self) -> &str {
        "add_short_answer"
    }

    fn manual(&self) -> &str {
        r#"Action name: "add_short_answer"
Args (exact order):
  [0] Section index (int as string)    str
  [1] Question text                    str
  [2] Ideal answer(s) comma-separated  str e.g. "(ATP production), (Energy generation)" {no parentheses or commas inside the options themselves}
  [3] Explanation, 1-2 sentences       str
  [4] Grading instructions (optional)  str
Returns string as in add_multiple_choice.
Purpose: Adds a short free-response question to the specified section."#
    }

    async fn invoke(&self, args: &[String]) -> ToolReply {
        match self.run(args) {
            Ok(msg) => ToolReply::urgent(msg),
            Err(e) => ToolReply::urgent(format!("error in add_short_answer({args:?}) -> '{e}'")),
        }
    }
}

// ==================== QuizAuthor ====================

pub struct QuizAuthor {
    backend: Arc<dyn ChatBackend>,
    model: String,
    retry: RetryPolicy,
    max_corrections: u32,
}

impl QuizAuthor {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        retry: RetryPolicy,
        max_corrections: u32,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            retry,
            max_corrections,
        }
    }

    /// Drive the authoring run to completion and return the built document.
    ///
    /// An abandoned run (corrective cap hit) still returns whatever the tools
    /// managed to build; the caller decides whether a thin quiz is usable.
    /// Only transport exhaustion is an `Err`.
    pub async fn generate(&self, source_material: &str, size: usize) -> Result<QuizDocument> {
        let doc: SharedDoc = Arc::new(Mutex::new(QuizDocument::new("", source_material)));

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CreateSection { doc: doc.clone() }));
        registry.register(Arc::new(AddMultipleChoice { doc: doc.clone() }));
        registry.register(Arc::new(AddTrueFalse { doc: doc.clone() }));
        registry.register(Arc::new(AddShortAnswer { doc: doc.clone() }));

        let mut agent = ToolAgent::new(
            self.backend.clone(),
            &self.model,
            &author_directions(size),
            registry,
            self.retry.clone(),
            self.max_corrections,
        );

        tracing::info!(target_size = size, "starting quiz authoring run");
        let outcome = agent
            .prompt(&format!(
                "Build the quiz based on the source material below.\n\
                 ### SOURCE MATERIAL ###\n{source_material}"
            ))
            .await?;

        let built = lock(&doc).clone();
        match outcome {
            PromptOutcome::Completed => {
                tracing::info!(
                    questions = built.total_question_count(),
                    sections = built.sections.len(),
                    "quiz authoring run completed"
                );
            }
            PromptOutcome::Abandoned => {
                tracing::warn!(
                    questions = built.total_question_count(),
                    "quiz authoring run abandoned, returning partial document"
                );
            }
        }
        Ok(built)
    }
}

fn author_directions(size: usize) -> String {
    format!(
        r#"You are an expert quiz-writer.

**Workflow**
1. Create a section using create_section (e.g. "Basics", "Advanced", "Road Signs").
2. Await confirmation.
3. Add a few questions.
4. Await confirmation.
5. Add even more questions (optional).
6. Repeat steps 1 through 5 until hitting about {size} total questions. You may create multiple questions and sections in the same turn for efficiency.
7. STOP and return [].

Once you have successfully made a few sections, you may start making many more sections and questions in a single turn, especially if you are making a very large quiz. You may add a question to ANY section you have already made.

Target mix: about 50% multiple choice, 30% true/false, 20% short answer.
Short-answer questions should be a mix of 1-word responses and 1-2 sentence responses. Avoid questions that would require long answers unless you have a good reason.
Everything must be 100% supported by the SOURCE MATERIAL; no duplicates.
Strictly follow each tool's arg format (section index first!).
After hitting about {size} total questions, STOP and return []."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockBackend;

    #[test]
    fn test_option_splitting_strips_parentheses() {
        assert_eq!(
            split_options("(Carbon dioxide), (Oxygen) , Nitrogen"),
            vec!["Carbon dioxide", "Oxygen", "Nitrogen"]
        );
        assert_eq!(strip_option("  (True) "), "True");
        assert_eq!(strip_option("False"), "False");
    }

    #[tokio::test]
    async fn test_build_tools_populate_document() {
        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            r#"section first [{"action":"create_section","args":["Basics"]}]"#,
            r#"now questions [
                {"action":"add_multiple_choice","args":["0","What gas do plants absorb?","(Carbon dioxide)","(Oxygen), (Nitrogen)","Plants fix CO2."]},
                {"action":"add_true_false","args":["0","Paris is the capital of France.","(True)","(False)","It is."]},
                {"action":"add_short_answer","args":["0","Define osmosis.","(Water movement across a membrane)","Passive diffusion of water."]}
            ]"#,
            "done []",
        ]));

        let author = QuizAuthor::new(backend.clone(), "m", RetryPolicy::default(), 3);
        let doc = author.generate("plants and water", 5).await.unwrap();

        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].name, "Basics");
        assert_eq!(doc.total_question_count(), 3);
        assert_eq!(doc.source_material, "plants and water");

        match &doc.sections[0].questions[0] {
            Question::MultipleChoice {
                correct_answers,
                wrong_answers,
                ..
            } => {
                assert_eq!(correct_answers, &vec!["Carbon dioxide".to_string()]);
                assert_eq!(
                    wrong_answers,
                    &vec!["Oxygen".to_string(), "Nitrogen".to_string()]
                );
            }
            other => panic!("expected MultipleChoice, got {other:?}"),
        }
        match &doc.sections[0].questions[2] {
            Question::ShortAnswer {
                grading_instructions,
                ..
            } => assert_eq!(grading_instructions, DEFAULT_GRADING),
            other => panic!("expected ShortAnswer, got {other:?}"),
        }

        // Confirmations flow back to the model with the action-name prefix.
        let prompts = backend.prompts();
        assert!(prompts[2].starts_with("create_section: Section #0 'Basics' created"));
    }

    #[tokio::test]
    async fn test_section_then_question_single_turn() {
        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            r#"both at once [
                {"action":"create_section","args":["Basics"]},
                {"action":"add_multiple_choice","args":["0","2+2=?","(4)","(3),(5)","basic arithmetic"]}
            ]"#,
            "done []",
        ]));

        let author = QuizAuthor::new(backend, "m", RetryPolicy::default(), 3);
        let doc = author.generate("numbers", 5).await.unwrap();

        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].name, "Basics");
        match &doc.sections[0].questions[0] {
            Question::MultipleChoice {
                question,
                correct_answers,
                wrong_answers,
                ..
            } => {
                assert_eq!(question, "2+2=?");
                assert_eq!(correct_answers, &vec!["4".to_string()]);
                assert_eq!(wrong_answers, &vec!["3".to_string(), "5".to_string()]);
            }
            other => panic!("expected MultipleChoice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_section_reports_error_in_band() {
        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            r#"oops [{"action":"add_multiple_choice","args":["3","q","(a)","(b)","e"]}]"#,
            "understood []",
        ]));

        let author = QuizAuthor::new(backend.clone(), "m", RetryPolicy::default(), 3);
        let doc = author.generate("src", 5).await.unwrap();

        assert_eq!(doc.total_question_count(), 0);
        let prompts = backend.prompts();
        assert!(prompts[2].starts_with("add_multiple_choice: error in add_multiple_choice"));
        assert!(prompts[2].contains("out of range"));
    }

    #[tokio::test]
    async fn test_abandoned_run_returns_partial_document() {
        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            r#"one section [{"action":"create_section","args":["Only"]}]"#,
            "garbage",
            "garbage",
            "garbage",
            "garbage",
        ]));

        let author = QuizAuthor::new(backend.clone(), "m", RetryPolicy::default(), 3);
        let doc = author.generate("src", 5).await.unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].name, "Only");
    }
}
