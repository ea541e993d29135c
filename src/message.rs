//! Gmail REST message resource, as returned by `users.messages.get?format=full`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub id: String,
    pub thread_id: Option<String>,
    pub label_ids: Option<Vec<String>>,
    pub snippet: Option<String>,
    pub internal_date: Option<String>,
    pub payload: Option<RawMessagePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessagePart {
    pub part_id: Option<String>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub headers: Option<Vec<HeaderRecord>>,
    pub body: Option<PartBody>,
    pub parts: Option<Vec<RawMessagePart>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    pub attachment_id: Option<String>,
    pub data: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// What a part carries, in the order the selector cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind<'a> {
    Branch(&'a [RawMessagePart]),
    Inline(&'a str),
    Attachment(&'a str),
    Empty,
}

impl RawMessagePart {
    pub fn kind(&self) -> PartKind<'_> {
        if let Some(children) = self.parts.as_deref().filter(|p| !p.is_empty()) {
            return PartKind::Branch(children);
        }
        let Some(body) = &self.body else {
            return PartKind::Empty;
        };
        if let Some(data) = body.data.as_deref().filter(|d| !d.is_empty()) {
            PartKind::Inline(data)
        } else if let Some(id) = body.attachment_id.as_deref() {
            PartKind::Attachment(id)
        } else {
            PartKind::Empty
        }
    }

    /// Inline body data, if any, regardless of children.
    pub fn inline_data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }

    pub fn is_mime(&self, mime: &str) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case(mime))
    }

    pub fn headers(&self) -> &[HeaderRecord] {
        self.headers.as_deref().unwrap_or_default()
    }

    pub fn has_content(&self) -> bool {
        !self.headers().is_empty() || self.body.is_some() || self.parts.is_some()
    }
}
