// Inbound wire DTOs and decoding of raw frames into typed messages.
// Outbound envelopes are built in the domain layer.

use crate::domain::envelope::{
    Envelope, TOPIC_ACTION_RESULT, TOPIC_ERROR, TOPIC_HEARTBEAT, TOPIC_PLAYER_STATUS,
};
use crate::domain::errors::NormalizeError;
use crate::domain::status::{PlayerStatus, normalize};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Outcome reported by the game for an earlier `action` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub status: ActionStatus,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub remaining: Option<u32>,
}

impl ActionResult {
    pub fn is_failure(&self) -> bool {
        self.status == ActionStatus::Error
    }

    // Operator-facing alert for a failed action; `None` for successes.
    pub fn alert_text(&self) -> Option<String> {
        if !self.is_failure() {
            return None;
        }
        let reason = self
            .error_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("unknown error");
        Some(format!("Action failed: {reason}"))
    }
}

/// Body of an `error` topic frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InsufficientItem,
    InvalidItem,
    CapacityExceeded,
    BadRequest,
    InternalError,
}

impl ErrorCode {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "INSUFFICIENT_ITEM" => Some(ErrorCode::InsufficientItem),
            "INVALID_ITEM" => Some(ErrorCode::InvalidItem),
            "CAPACITY_EXCEEDED" => Some(ErrorCode::CapacityExceeded),
            "BAD_REQUEST" => Some(ErrorCode::BadRequest),
            "INTERNAL_ERROR" => Some(ErrorCode::InternalError),
            _ => None,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCode::InsufficientItem => "Not enough items",
            ErrorCode::InvalidItem => "Invalid item type",
            ErrorCode::CapacityExceeded => "Inventory is full",
            ErrorCode::BadRequest => "Malformed request",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

/// Server error ready for display: a fixed human message plus the raw details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedError {
    pub code: Option<String>,
    pub message: String,
    pub details: Option<String>,
    pub correlation_id: Option<String>,
}

impl fmt::Display for FormattedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

pub fn format_error(body: &ErrorBody) -> FormattedError {
    let known = body.code.as_deref().and_then(ErrorCode::parse);
    let message = match known {
        Some(code) => code.user_message().to_string(),
        None => body
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown error".to_string()),
    };

    FormattedError {
        code: body.code.clone(),
        message,
        details: body.message.clone(),
        correlation_id: body.correlation_id.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Heartbeat {
    // Game-side clock; informational only.
    #[serde(default)]
    pub timestamp: Option<Value>,
}

/// A decoded inbound frame, one variant per recognized topic.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    PlayerStatus(PlayerStatus),
    ActionResult(ActionResult),
    ServerError(FormattedError),
    Heartbeat(Heartbeat),
    Unknown(Envelope),
}

#[derive(Debug)]
pub enum DecodeError {
    // Not JSON, or JSON without a string `topic`.
    NotAnEnvelope(serde_json::Error),
    Status(NormalizeError),
    Body {
        topic: &'static str,
        source: serde_json::Error,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NotAnEnvelope(e) => write!(f, "not an envelope: {e}"),
            DecodeError::Status(e) => write!(f, "{e}"),
            DecodeError::Body { topic, source } => write!(f, "bad `{topic}` body: {source}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<NormalizeError> for DecodeError {
    fn from(e: NormalizeError) -> Self {
        DecodeError::Status(e)
    }
}

pub fn parse_envelope(text: &str) -> Result<Envelope, DecodeError> {
    serde_json::from_str(text).map_err(DecodeError::NotAnEnvelope)
}

pub fn envelope_from_value(value: Value) -> Result<Envelope, DecodeError> {
    serde_json::from_value(value).map_err(DecodeError::NotAnEnvelope)
}

pub fn decode_inbound(envelope: Envelope) -> Result<InboundMessage, DecodeError> {
    let message = match envelope.topic.as_str() {
        TOPIC_PLAYER_STATUS => InboundMessage::PlayerStatus(normalize(&envelope.body)?),
        TOPIC_ACTION_RESULT => {
            InboundMessage::ActionResult(decode_body(TOPIC_ACTION_RESULT, envelope.body)?)
        }
        TOPIC_ERROR => {
            let body: ErrorBody = if envelope.body.is_null() {
                ErrorBody::default()
            } else {
                decode_body(TOPIC_ERROR, envelope.body)?
            };
            InboundMessage::ServerError(format_error(&body))
        }
        TOPIC_HEARTBEAT => {
            let beat = if envelope.body.is_null() {
                Heartbeat::default()
            } else {
                decode_body(TOPIC_HEARTBEAT, envelope.body)?
            };
            InboundMessage::Heartbeat(beat)
        }
        _ => InboundMessage::Unknown(envelope),
    };
    Ok(message)
}

fn decode_body<T>(topic: &'static str, body: Value) -> Result<T, DecodeError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(body).map_err(|source| DecodeError::Body { topic, source })
}
