//! The party that issued a command and receives its output.

use std::any::Any;
use std::fmt;

use crate::permission::PermissionNode;

/// Stable identity of a caller; keys the pending-reply slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerId(String);

impl CallerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output sent back to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Error(String),
    /// Numbered list of choices awaiting a reply.
    Prompt { title: String, options: Vec<String> },
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Error(text.into())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Text(text) | Message::Error(text) => f.write_str(text),
            Message::Prompt { title, options } => {
                f.write_str(title)?;
                for (i, option) in options.iter().enumerate() {
                    write!(f, "\n{}) {option}", i + 1)?;
                }
                Ok(())
            }
        }
    }
}

/// Anyone who can run commands: a console, a chat user, a test double.
pub trait Caller: Send + Sync {
    fn id(&self) -> CallerId;

    fn name(&self) -> &str;

    fn send(&self, message: Message);

    fn has_permission(&self, _node: &PermissionNode) -> bool {
        true
    }

    /// Whether contextual parameters may be filled from this caller's
    /// environment instead of typed input.
    fn can_use_context(&self) -> bool {
        false
    }

    /// Concrete caller, for context providers that need caller-specific data.
    fn as_any(&self) -> &dyn Any;
}

/// Permission check used throughout resolution: unrestricted nodes pass
/// without consulting the caller.
pub(crate) fn permits(caller: &dyn Caller, node: &PermissionNode) -> bool {
    node.is_unrestricted() || caller.has_permission(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prompt_renders_numbered_options() {
        let prompt = Message::Prompt {
            title: "Please pick a valid option.".to_string(),
            options: vec!["red".to_string(), "green".to_string()],
        };
        assert_eq!(
            prompt.to_string(),
            "Please pick a valid option.\n1) red\n2) green"
        );
    }
}
