use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::LazyLock;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

use crate::decode::decode_base64url;
use crate::error::{DateParseError, MalformedMessageError};
use crate::message::{HeaderRecord, PartKind, RawMessage, RawMessagePart};
use crate::sanitize::sanitize;

const SNIPPET_CHARS: usize = 100;

// A lone digit standing as a day or time field, e.g. the hour in "6:12:39".
static LONE_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\s,:])(\d)([\s:]|$)").unwrap());

/// A raw message flattened into what the analysis backend consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedEmail {
    #[serde(rename = "thread_id")]
    pub message_id: String,
    pub subject: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub cc: Vec<String>,
    pub body: String,
    pub snippet: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    /// Set when the Date header was unusable and `timestamp` is the processing time.
    #[serde(skip)]
    pub timestamp_fallback: bool,
}

/// First header named `name` (case-insensitive), or "" when absent.
pub fn get_header<'a>(headers: &'a [HeaderRecord], name: &str) -> &'a str {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map_or("", |h| h.value.as_str())
}

fn decode_or_empty(data: &str) -> String {
    decode_base64url(data).unwrap_or_else(|e| {
        warn!(error = %e, "Undecodable body data, treating as empty");
        String::new()
    })
}

fn first_of_type<'a>(children: &'a [RawMessagePart], mime: &str) -> Option<&'a RawMessagePart> {
    children.iter().find(|p| p.is_mime(mime))
}

/// Pick the best text body from a payload tree: a direct text/plain child,
/// else a direct text/html child, else the first nested multipart that
/// yields something. Leaves decode their own data; attachments are skipped.
pub fn select_body(part: &RawMessagePart) -> String {
    match part.kind() {
        PartKind::Branch(children) => {
            // a plain part without inline data gives way to html
            let direct = ["text/plain", "text/html"]
                .into_iter()
                .find_map(|mime| first_of_type(children, mime).and_then(|p| p.inline_data()));
            if let Some(text) = direct.map(decode_or_empty).filter(|t| !t.is_empty()) {
                return text;
            }
            children
                .iter()
                .filter(|c| matches!(c.kind(), PartKind::Branch(_)))
                .map(select_body)
                .find(|text| !text.is_empty())
                .unwrap_or_default()
        }
        PartKind::Inline(data) => decode_or_empty(data),
        PartKind::Attachment(id) => {
            debug!(attachment_id = %id, "Skipping attachment body");
            String::new()
        }
        PartKind::Empty => String::new(),
    }
}

/// Split an address list on commas that are outside quotes and angle brackets.
pub fn split_addresses(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut angle_depth = 0usize;

    for c in raw.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => angle_depth += 1,
            '>' if !in_quotes => angle_depth = angle_depth.saturating_sub(1),
            ',' if !in_quotes && angle_depth == 0 => {
                out.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    out.push(current);

    out.into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

fn strip_trailing_comment(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.ends_with(')'), trimmed.rfind('(')) {
        (true, Some(open)) => trimmed[..open].trim_end(),
        _ => trimmed,
    }
}

fn pad_lone_digits(date: &str) -> Cow<'_, str> {
    LONE_DIGIT.replace_all(date, "${1}0${2}${3}")
}

/// Parse an RFC 2822 Date header into RFC 3339 UTC.
pub fn parse_date(raw: &str) -> Result<String, DateParseError> {
    let cleaned = pad_lone_digits(strip_trailing_comment(raw));
    let parsed = OffsetDateTime::parse(&cleaned, &Rfc2822)
        .map_err(|_| DateParseError(raw.to_string()))?;
    parsed
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|_| DateParseError(raw.to_string()))
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_CHARS).collect()
}

/// Build a [`DecodedEmail`] from a raw message resource.
///
/// An unusable Date header does not fail the message; the processing time
/// is substituted and `timestamp_fallback` is set.
pub fn normalize(msg: &RawMessage) -> Result<DecodedEmail, MalformedMessageError> {
    if msg.id.is_empty() {
        return Err(MalformedMessageError::MissingId);
    }
    let payload = msg
        .payload
        .as_ref()
        .ok_or_else(|| MalformedMessageError::MissingPayload { id: msg.id.clone() })?;
    if !payload.has_content() {
        return Err(MalformedMessageError::EmptyPayload { id: msg.id.clone() });
    }

    let headers = payload.headers();
    let date = get_header(headers, "Date");

    let (timestamp, timestamp_fallback) = match parse_date(date) {
        Ok(ts) => (ts, false),
        Err(e) => {
            let now = now_rfc3339();
            warn!(id = %msg.id, error = %e, substituted = %now, "Date fallback to processing time");
            (now, true)
        }
    };

    let body = sanitize(&select_body(payload));

    Ok(DecodedEmail {
        message_id: msg.id.clone(),
        subject: get_header(headers, "Subject").to_string(),
        sender: get_header(headers, "From").to_string(),
        recipients: split_addresses(get_header(headers, "To")),
        cc: split_addresses(get_header(headers, "Cc")),
        snippet: snippet(&body),
        body,
        timestamp,
        timestamp_fallback,
    })
}
