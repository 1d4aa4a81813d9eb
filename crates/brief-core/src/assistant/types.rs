//! Conversation and backend wire types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tabular::{self, Row};

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        };
        f.write_str(s)
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub current_plan: serde_json::Value,
}

impl ChatRequest {
    /// The most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.history.iter().rev().find(|m| m.role == Role::User)
    }
}

/// Response of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Marker for the tabular upload response variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    AudienceMatrix,
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadResponse {
    /// A CSV file, already ingested.
    AudienceMatrix {
        kind: UploadKind,
        rows: Vec<Row>,
        headers: Vec<String>,
        filename: String,
    },
    /// Any other file, returned as text.
    Document { content: String, filename: String },
}

impl UploadResponse {
    /// Classify an uploaded file by name and ingest it when tabular.
    pub fn from_file(filename: &str, content: &str) -> Self {
        if tabular::looks_tabular(filename) {
            let ctx = tabular::parse(content);
            Self::AudienceMatrix {
                kind: UploadKind::AudienceMatrix,
                rows: ctx.rows,
                headers: ctx.headers,
                filename: filename.to_string(),
            }
        } else {
            Self::Document {
                content: content.to_string(),
                filename: filename.to_string(),
            }
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::AudienceMatrix { filename, .. } | Self::Document { filename, .. } => filename,
        }
    }
}
