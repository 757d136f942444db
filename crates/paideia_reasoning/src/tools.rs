//! Model-invocable tools and the registry that dispatches them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of a tool invocation. Urgent replies go straight back to the model
/// in the same turn; non-urgent ones are deferred to the next prompt.
#[derive(Debug, Clone)]
pub struct ToolReply {
    pub urgent: bool,
    pub text: String,
}

impl ToolReply {
    pub fn urgent(text: impl Into<String>) -> Self {
        Self {
            urgent: true,
            text: text.into(),
        }
    }

    pub fn deferred(text: impl Into<String>) -> Self {
        Self {
            urgent: false,
            text: text.into(),
        }
    }
}

/// A named action the model can request.
///
/// `invoke` must never fail: malformed arguments are converted into error
/// text in the reply so the model can self-correct on its next turn. An
/// uncaught fault here is an engine bug, not an expected path.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used for dispatch (matches the `action` field).
    fn name(&self) -> &str;

    /// Protocol documentation shown to the model in the system direction.
    fn manual(&self) -> &str;

    async fn invoke(&self, args: &[String]) -> ToolReply;
}

/// Insertion-ordered tool registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Re-registering a name replaces the previous tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("tool '{}' re-registered, replacing previous", name);
        } else {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// All tool manuals, one per registration, in registration order.
    pub fn manuals(&self) -> String {
        let mut out = String::new();
        for name in &self.order {
            if let Some(tool) = self.tools.get(name) {
                out.push_str(tool.manual());
                out.push('\n');
            }
        }
        out
    }
}
