//! Turn history records and their provider-facing normalization.
//!
//! Callers may hand back transcripts containing records from other runtimes
//! alongside plain chat turns. Each record shape is recognized by its
//! `type` tag; anything untagged passes through as a [`ChatTurn`]. The
//! normalization is total: every record becomes zero or more chat turns,
//! never an error.

use crate::model::{ChatTurn, Role, ToolCallRequest};
use serde::{Deserialize, Serialize};

/// One record of a heterogeneous turn history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HistoryItem {
    /// A recorded request for a tool invocation.
    #[serde(rename = "function_call")]
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    /// A message whose content is plain text or a list of typed fragments.
    #[serde(rename = "message")]
    Message { role: Role, content: MessageContent },
    /// The recorded output of a completed tool invocation.
    #[serde(rename = "function_call_output")]
    FunctionCallOutput { call_id: String, output: String },
    /// Anything already shaped like a chat turn passes through untouched.
    #[serde(untagged)]
    Chat(ChatTurn),
}

impl From<ChatTurn> for HistoryItem {
    fn from(turn: ChatTurn) -> Self {
        HistoryItem::Chat(turn)
    }
}

/// String-or-fragments content of a `message` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Fragments(Vec<ContentFragment>),
}

/// One fragment of a fragmented message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFragment {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub fragment_type: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Flatten one history record into provider-ready chat turns.
pub fn normalize(item: &HistoryItem) -> Vec<ChatTurn> {
    match item {
        HistoryItem::FunctionCall {
            call_id,
            name,
            arguments,
        } => vec![ChatTurn {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(vec![ToolCallRequest::function(call_id, name, arguments)]),
            tool_call_id: None,
            name: None,
            id: None,
        }],
        HistoryItem::Message { role, content } => match content {
            MessageContent::Text(text) => vec![turn_with_text(*role, text)],
            MessageContent::Fragments(fragments) => fragments
                .iter()
                .map(|fragment| turn_with_text(*role, &fragment.text))
                .collect(),
        },
        HistoryItem::FunctionCallOutput { call_id, output } => {
            vec![ChatTurn::tool_output(call_id, output)]
        }
        HistoryItem::Chat(turn) => vec![turn.clone()],
    }
}

/// Normalize a whole history, preserving record order.
pub fn normalize_all(items: &[HistoryItem]) -> Vec<ChatTurn> {
    items.iter().flat_map(normalize).collect()
}

fn turn_with_text(role: Role, text: &str) -> ChatTurn {
    ChatTurn {
        role,
        content: Some(text.to_owned()),
        tool_calls: None,
        tool_call_id: None,
        name: None,
        id: None,
    }
}
