use std::fmt;

use serde::Serialize;

pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant. Please provide a response to the user's queries";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "Human",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The two-role input handed to a backend: the fixed system instruction
/// followed by the user's question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    messages: [Message; 2],
}

impl Prompt {
    pub fn for_query(query: &str) -> Self {
        Self {
            messages: [
                Message {
                    role: Role::System,
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                Message {
                    role: Role::User,
                    content: format!("Question: {query}"),
                },
            ],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn user_text(&self) -> &str {
        &self.messages[1].content
    }

    /// Single-string rendering for completion-style endpoints.
    pub fn to_completion_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for message in &self.messages {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{}: {}", message.role.label(), message.content)?;
        }
        Ok(())
    }
}
