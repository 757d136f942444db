//! Split a model response into free-form thoughts and a machine-readable
//! action list.
//!
//! The response contract is two-part: reasoning text first, then a JSON array
//! of `{"action": ..., "args": [...]}` objects as the final element of the
//! message. The thoughts are everything before the first `[`; the action
//! payload is the substring from the first `[` to the last `]`.

use serde_json::Value;

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: String,
    pub args: Vec<String>,
}

/// A parsed model turn: created per response, consumed immediately.
#[derive(Debug, Clone)]
pub struct ParsedTurn {
    pub thoughts: String,
    pub actions: Vec<ActionRequest>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no action list found; the response must end with a JSON array")]
    MissingActionList,
    #[error("action list is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("action list element {0} is not an object")]
    ElementNotAnObject(usize),
    #[error("action list element {0} has no 'action' field")]
    MissingActionField(usize),
    #[error("argument {arg} of action '{action}' is not a string")]
    NonStringArg { action: String, arg: usize },
}

/// Parse a two-part response. Fails (for in-band correction, not for
/// propagation) when no well-formed list of action objects can be extracted.
pub fn split_response(text: &str) -> Result<ParsedTurn, ParseError> {
    let open = text.find('[').ok_or(ParseError::MissingActionList)?;
    let close = text.rfind(']').ok_or(ParseError::MissingActionList)?;
    if close < open {
        return Err(ParseError::MissingActionList);
    }

    let thoughts = text[..open].trim().to_string();
    let payload: Value = serde_json::from_str(&text[open..=close])?;

    let items = match payload {
        Value::Array(items) => items,
        _ => return Err(ParseError::MissingActionList),
    };

    let mut actions = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let obj = match item {
            Value::Object(obj) => obj,
            _ => return Err(ParseError::ElementNotAnObject(i)),
        };
        let action = obj
            .get("action")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingActionField(i))?
            .to_string();

        let args = match obj.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(raw)) => {
                let mut args = Vec::with_capacity(raw.len());
                for (j, v) in raw.iter().enumerate() {
                    match v.as_str() {
                        Some(s) => args.push(s.to_string()),
                        None => {
                            return Err(ParseError::NonStringArg {
                                action,
                                arg: j,
                            })
                        }
                    }
                }
                args
            }
            Some(_) => {
                return Err(ParseError::NonStringArg { action, arg: 0 });
            }
        };

        actions.push(ActionRequest { action, args });
    }

    Ok(ParsedTurn { thoughts, actions })
}
