//! Tutor agent.
//!
//! One tutor per quiz, primed with the quiz's source material. It can only
//! reach the student through the `send_message` tool, which fans paragraphs
//! out into the session's message queue; `get_source_material` lets it re-read
//! its own knowledge on demand.

use crate::backend::ChatBackend;
use crate::chat::RetryPolicy;
use crate::engine::{PromptOutcome, ToolAgent};
use crate::tools::{Tool, ToolRegistry, ToolReply};
use anyhow::Result;
use async_trait::async_trait;
use paideia_core::MessageQueue;
use std::sync::Arc;

// ==================== send_message ====================

struct SendMessage {
    queue: MessageQueue,
}

#[async_trait]
impl Tool for SendMessage {
    fn name(&self) -> &str {
        "send_message"
    }

    fn manual(&self) -> &str {
        r#"Action name: "send_message"
Arguments: list of messages
Purpose: Sends 1 or more messages to the user. Break up long messages with '\n'. This is the only way you are able to communicate with users.
Returns: confirmation of queueing"#
    }

    async fn invoke(&self, args: &[String]) -> ToolReply {
        if args.is_empty() {
            return ToolReply::deferred("No messages provided to send.");
        }

        let mut queued = 0usize;
        for message in args {
            // Each '\n\n'-separated paragraph becomes its own queue entry so
            // the user sees digestible chunks.
            for paragraph in message.split("\n\n") {
                let paragraph = paragraph.trim();
                if !paragraph.is_empty() {
                    self.queue.push(paragraph);
                    queued += 1;
                }
            }
        }
        tracing::debug!(queued, "tutor queued messages for the user");
        ToolReply::deferred("Message(s) successfully queued for user.")
    }
}

// ==================== get_source_material ====================

struct GetSourceMaterial {
    source_material: Arc<str>,
}

#[async_trait]
impl Tool for GetSourceMaterial {
    fn name(&self) -> &str {
        "get_source_material"
    }

    fn manual(&self) -> &str {
        r#"Action name: "get_source_material"
Arguments: empty list
Purpose: Use to scan the source material for any information you need to look for.
Returns: a copy of the source material you were told to review at the beginning"#
    }

    async fn invoke(&self, _args: &[String]) -> ToolReply {
        ToolReply::urgent(self.source_material.to_string())
    }
}

// ==================== TutorAgent ====================

pub struct TutorAgent {
    agent: ToolAgent,
}

impl TutorAgent {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        source_material: &str,
        queue: MessageQueue,
        retry: RetryPolicy,
        max_corrections: u32,
    ) -> Self {
        let source: Arc<str> = Arc::from(source_material);

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SendMessage { queue }));
        registry.register(Arc::new(GetSourceMaterial {
            source_material: source,
        }));

        let agent = ToolAgent::new(
            backend,
            model,
            &tutor_directions(source_material),
            registry,
            retry,
            max_corrections,
        );
        Self { agent }
    }

    /// Forward one prompt (incorrect-answer report, context update, or user
    /// follow-up) to the tutor. Replies surface through the message queue, not
    /// the return value.
    pub async fn prompt(&mut self, text: &str) -> Result<PromptOutcome> {
        self.agent.prompt(text).await
    }
}

fn tutor_directions(source_material: &str) -> String {
    format!(
        r#"You are the Tutor. Review the source material below and get ready to assist students.
####################  KNOWLEDGE  ####################
{source_material}

####################  HANDLING INCORRECT ANSWERS (Primary Task)  ####################
When the user provides an incorrect answer, the input will contain the question, the student's wrong answer, the correct answer, and the pre-defined explanation for the question.
Your task for an incorrect answer:
1. Identify the student's key error.
2. Explain why their answer is wrong and why the correct answer is right, using the provided explanation as a basis but elaborating if needed.
3. Use the INITIAL RESPONSE FORMAT below for this.
4. End with an engaging follow-up question.
5. CRITICAL: you MUST use the 'send_message' action for your entire response.

####################  INITIAL RESPONSE FORMAT (For Incorrect Answers)  ####################
(label the correct option by letter unless it is a true/false question, then say true / false)
Correct answer: <correct option>
<student option> is wrong - <concise factual error in the student's choice, max 15 words>.
<correct option> is right - <concise core fact for the correct choice, max 15 words>.
<Elaborate on the provided explanation or add more context. Aim to teach. Max 75 words.>
<Optional: related fun fact or mnemonic>
<Engaging follow-up question, e.g. "Does that make sense?", "Want a tip to remember this?">

####################  HANDLING CORRECT ANSWERS (Context Update)  ####################
Sometimes you will receive a prompt starting with "Context: The student just answered...correctly."
This is for your information only. DO NOT send a message to the user in response to this context update unless explicitly asked to in the context message. Simply update your understanding of the student's progress and be ready for their next question.

####################  GENERAL FOLLOW-UP QUERIES & CONVERSATION  ####################
When the user sends a message beginning with "User follow-up:", or asks a general question:
1. Understand their query in the context of the source material and recent interactions.
2. Provide a comprehensive, informative, and helpful answer.
3. Speak like you are having a conversation with a friend.
4. There is no rigid format for these responses, but always be clear, helpful, and concise.
5. Aim for responses under 200 words, with a hard maximum of 500 words.
6. If the user's query is vague, you can ask for clarification.
7. Use new lines ('\n') often to organise your response and improve readability.
8. CRITICAL: you MUST use the 'send_message' action for your entire response.

####################  RESPONSE CONSTRAINTS (All messages sent to the user)  ####################
- CRITICAL: your entire output must be sent as strings within the 'args' of a 'send_message' action.
- Use new lines ('\n') often to organise your response and improve readability.
- No chit-chat, praise (e.g. "Good job!"), or filler unless it is a natural part of a conversational follow-up.
- Avoid simply stating 'the material says x'; aim to teach understanding.
- If referring to MCQ/TFQ options, use their letter if available, otherwise explain clearly."#
    )
}
