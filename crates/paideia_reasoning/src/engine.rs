//! Agent orchestration engine.
//!
//! Enforces the two-part response contract on every model turn and drives the
//! parse → dispatch → re-prompt loop until the model returns an empty action
//! list. Parse failures are recovered in-band with corrective prompts, capped
//! per `prompt` call; tool results are split into urgent replies (sent back
//! within the same turn) and deferred replies (prepended to the next prompt).

use crate::backend::ChatBackend;
use crate::chat::{ChatClient, RetryPolicy};
use crate::parser::{split_response, ActionRequest, ParseError};
use crate::tools::ToolRegistry;
use anyhow::Result;
use std::sync::Arc;

/// The structural output contract repeated to the model on setup and after
/// every parse failure.
const RESPONSE_CONTRACT: &str = "\
OUTPUT FORMAT REQUIREMENTS:
Your response MUST have exactly two parts, in this order.
PART 1: THINKING
- Free-form reasoning about the inputs and the actions you plan to take.
- Never use the bracket characters '[' or ']' in this part, and write no JSON here.
PART 2: JSON ACTION LIST
- A single JSON array of objects, each {\"action\": \"<name>\", \"args\": [\"<arg>\", ...]}.
- Every argument must be a string.
- You may request several actions in one list; they run in order.
- If no actions are needed, end with the empty list: []
- The array must be the absolute final element of your response.";

/// How a `prompt` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The loop reached a turn with no actions (or no urgent results).
    Completed,
    /// The corrective-retry cap was exceeded; the turn was dropped without
    /// executing any tool from the malformed responses.
    Abandoned,
}

pub struct ToolAgent {
    chat: ChatClient,
    registry: ToolRegistry,
    deferred: Vec<String>,
    max_corrections: u32,
}

impl ToolAgent {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        directions: &str,
        registry: ToolRegistry,
        retry: RetryPolicy,
        max_corrections: u32,
    ) -> Self {
        let setup = format!(
            "Primary directions:\n{directions}\n\n{RESPONSE_CONTRACT}\n\n\
             Available tools:\n{manuals}\n\
             You may not perform any actions on this turn. \
             Acknowledge your instructions and wait.",
            manuals = registry.manuals(),
        );
        Self {
            chat: ChatClient::new(backend, model, setup, retry),
            registry,
            deferred: Vec::new(),
            max_corrections,
        }
    }

    /// Send a prompt and run the dispatch loop to termination.
    ///
    /// Synchronous from the caller's point of view: the call may perform
    /// several model round-trips internally and returns only once the loop
    /// terminates. The only `Err` here is transport exhaustion from the chat
    /// client; parse trouble resolves to `Ok(Abandoned)` instead.
    pub async fn prompt(&mut self, text: &str) -> Result<PromptOutcome> {
        let mut corrections: u32 = 0;
        let outgoing = self.assemble(text);
        let mut response = self.chat.send(&outgoing).await?;

        loop {
            let turn = match split_response(&response) {
                Ok(turn) => turn,
                Err(e) => {
                    corrections += 1;
                    if corrections > self.max_corrections {
                        tracing::warn!(
                            "abandoning turn after {} corrective prompts: {}",
                            self.max_corrections,
                            e
                        );
                        return Ok(PromptOutcome::Abandoned);
                    }
                    tracing::info!("model response failed to parse ({}), correcting", e);
                    response = self.chat.send(&correction_prompt(&e)).await?;
                    continue;
                }
            };

            tracing::debug!(
                actions = turn.actions.len(),
                "parsed model turn ({} chars of thought)",
                turn.thoughts.len()
            );

            if turn.actions.is_empty() {
                return Ok(PromptOutcome::Completed);
            }

            let mut urgent = String::new();
            for request in &turn.actions {
                if let Some(line) = self.perform(request).await {
                    urgent.push_str(&line);
                    urgent.push('\n');
                }
            }

            if urgent.is_empty() {
                return Ok(PromptOutcome::Completed);
            }

            let follow_up = self.assemble(&urgent);
            response = self.chat.send(&follow_up).await?;
        }
    }

    /// Execute one action. Returns the urgent line to surface immediately,
    /// or `None` when the result was deferred or empty.
    async fn perform(&mut self, request: &ActionRequest) -> Option<String> {
        let tool = match self.registry.get(&request.action) {
            Some(tool) => tool,
            None => {
                tracing::warn!("model requested unknown action '{}'", request.action);
                return Some(format!("error: action '{}' was not found", request.action));
            }
        };

        let reply = tool.invoke(&request.args).await;
        if reply.text.is_empty() {
            return None;
        }

        let line = format!("{}: {}", request.action, reply.text);
        if reply.urgent {
            Some(line)
        } else {
            self.deferred.push(line);
            None
        }
    }

    /// Assemble an outgoing prompt: deferred results first (each on its own
    /// line), then the new text. The deferred queue drains exactly once per
    /// assembly.
    fn assemble(&mut self, text: &str) -> String {
        if self.deferred.is_empty() {
            return text.to_string();
        }
        let pending = std::mem::take(&mut self.deferred);
        format!("{}\n\n{}", pending.join("\n"), text)
    }

    pub fn chat(&self) -> &ChatClient {
        &self.chat
    }
}

fn correction_prompt(error: &ParseError) -> String {
    format!(
        "Your last message failed to be parsed.\n\
         Error -> '{error}'\n\
         Send it again so that it can be parsed properly. \
         Remember: no bracket characters in your thoughts.\n\
         {RESPONSE_CONTRACT}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockBackend;
    use crate::tools::{Tool, ToolReply};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every invocation; reply urgency and text are fixed per tool.
    struct Probe {
        name: &'static str,
        urgent: bool,
        reply: &'static str,
        calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    }

    #[async_trait]
    impl Tool for Probe {
        fn name(&self) -> &str {
            self.name
        }
        fn manual(&self) -> &str {
            "Action name: probe"
        }
        async fn invoke(&self, args: &[String]) -> ToolReply {
            self.calls
                .lock()
                .unwrap()
                .push((self.name.to_string(), args.to_vec()));
            ToolReply {
                urgent: self.urgent,
                text: self.reply.to_string(),
            }
        }
    }

    fn agent_with(
        backend: &Arc<MockBackend>,
        tools: Vec<Probe>,
    ) -> (ToolAgent, Arc<Mutex<Vec<(String, Vec<String>)>>>) {
        let calls = tools
            .first()
            .map(|t| t.calls.clone())
            .unwrap_or_default();
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(Arc::new(tool));
        }
        let agent = ToolAgent::new(
            backend.clone() as Arc<dyn ChatBackend>,
            "test-model",
            "be a test subject",
            registry,
            RetryPolicy {
                max_attempts: 2,
                base_delay: std::time::Duration::from_millis(1),
            },
            3,
        );
        (agent, calls)
    }

    fn probe(
        name: &'static str,
        urgent: bool,
        reply: &'static str,
        calls: &Arc<Mutex<Vec<(String, Vec<String>)>>>,
    ) -> Probe {
        Probe {
            name,
            urgent,
            reply,
            calls: calls.clone(),
        }
    }

    #[tokio::test]
    async fn test_empty_action_list_terminates() {
        let backend = Arc::new(MockBackend::with_replies(["ack", "nothing to do []"]));
        let (mut agent, calls) = agent_with(&backend, vec![]);
        let outcome = agent.prompt("hello").await.unwrap();
        assert_eq!(outcome, PromptOutcome::Completed);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_actions_run_in_list_order_and_urgent_results_follow_up() {
        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            r#"building [{"action":"first","args":["1"]},{"action":"second","args":["2"]}]"#,
            "done []",
        ]));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (mut agent, _) = agent_with(
            &backend,
            vec![
                probe("first", true, "one done", &calls),
                probe("second", true, "two done", &calls),
            ],
        );

        let outcome = agent.prompt("build").await.unwrap();
        assert_eq!(outcome, PromptOutcome::Completed);

        let seen = calls.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "first");
        assert_eq!(seen[1].0, "second");

        // The follow-up carries both urgent results, prefixed, in order.
        let prompts = backend.prompts();
        assert_eq!(prompts[2], "first: one done\nsecond: two done\n");
    }

    #[tokio::test]
    async fn test_unknown_action_synthesizes_error() {
        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            r#"trying [{"action":"ghost","args":[]}]"#,
            "ok []",
        ]));
        let (mut agent, _) = agent_with(&backend, vec![]);
        agent.prompt("go").await.unwrap();
        let prompts = backend.prompts();
        assert_eq!(prompts[2], "error: action 'ghost' was not found\n");
    }

    #[tokio::test]
    async fn test_deferred_results_skip_follow_up_and_prepend_next_prompt() {
        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            r#"quietly [{"action":"quiet","args":[]}]"#,
            "second turn []",
        ]));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (mut agent, _) =
            agent_with(&backend, vec![probe("quiet", false, "stored", &calls)]);

        // A turn producing only deferred results sends no follow-up.
        let outcome = agent.prompt("first message").await.unwrap();
        assert_eq!(outcome, PromptOutcome::Completed);
        assert_eq!(backend.call_count(), 2);

        // The deferred result leads the next outgoing prompt, verbatim.
        agent.prompt("second message").await.unwrap();
        let prompts = backend.prompts();
        assert_eq!(prompts[2], "quiet: stored\n\nsecond message");
    }

    #[tokio::test]
    async fn test_malformed_turn_sends_one_correction_and_no_tools() {
        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            "no action list in sight",
            "recovered []",
        ]));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (mut agent, _) = agent_with(&backend, vec![probe("tool", true, "x", &calls)]);

        let outcome = agent.prompt("go").await.unwrap();
        assert_eq!(outcome, PromptOutcome::Completed);
        assert!(calls.lock().unwrap().is_empty());

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains("failed to be parsed"));
    }

    #[tokio::test]
    async fn test_correction_cap_abandons_turn_without_raising() {
        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            "garbage one",
            "garbage two",
            "garbage three",
            "garbage four",
        ]));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (mut agent, _) = agent_with(&backend, vec![probe("tool", true, "x", &calls)]);

        let outcome = agent.prompt("go").await.unwrap();
        assert_eq!(outcome, PromptOutcome::Abandoned);
        assert!(calls.lock().unwrap().is_empty());
        // direction + initial + 3 corrective prompts, then give up.
        assert_eq!(backend.call_count(), 5);
    }

    #[tokio::test]
    async fn test_later_action_sees_earlier_side_effect() {
        // Two actions against one shared list within a single turn.
        struct Push(Arc<Mutex<Vec<String>>>);
        struct Len(Arc<Mutex<Vec<String>>>);

        #[async_trait]
        impl Tool for Push {
            fn name(&self) -> &str {
                "push"
            }
            fn manual(&self) -> &str {
                "push"
            }
            async fn invoke(&self, args: &[String]) -> ToolReply {
                self.0.lock().unwrap().push(args[0].clone());
                ToolReply::urgent("pushed")
            }
        }
        #[async_trait]
        impl Tool for Len {
            fn name(&self) -> &str {
                "len"
            }
            fn manual(&self) -> &str {
                "len"
            }
            async fn invoke(&self, _args: &[String]) -> ToolReply {
                ToolReply::urgent(format!("{}", self.0.lock().unwrap().len()))
            }
        }

        let shared = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Push(shared.clone())));
        registry.register(Arc::new(Len(shared.clone())));

        let backend = Arc::new(MockBackend::with_replies([
            "ack",
            r#"go [{"action":"push","args":["a"]},{"action":"len","args":[]}]"#,
            "done []",
        ]));
        let mut agent = ToolAgent::new(
            backend.clone() as Arc<dyn ChatBackend>,
            "m",
            "dir",
            registry,
            RetryPolicy::default(),
            3,
        );
        agent.prompt("go").await.unwrap();
        // The len action observed push's side effect from the same turn.
        assert_eq!(backend.prompts()[2], "push: pushed\nlen: 1\n");
    }
}
