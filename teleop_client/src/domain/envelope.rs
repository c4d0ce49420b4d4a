use crate::domain::errors::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{fmt, str::FromStr};

// Topic names on the wire.
pub const TOPIC_PLAYER_STATUS: &str = "player_status";
pub const TOPIC_ACTION: &str = "action";
pub const TOPIC_ACTION_RESULT: &str = "action_result";
pub const TOPIC_ERROR: &str = "error";
pub const TOPIC_HEARTBEAT: &str = "heartbeat";
pub const TOPIC_RESET_MISSION: &str = "reset_mission";

/// Wrapper for every message in both directions: `{ "topic": ..., "body": ... }`.
///
/// `topic` is required; a frame without one is not an envelope. A missing body decodes as
/// `null` and is left to the per-topic decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, body: Value) -> Self {
        Self {
            topic: topic.into(),
            body,
        }
    }

    pub fn action(request: &ActionRequest) -> Self {
        Self::new(
            TOPIC_ACTION,
            json!({
                "action": request.action.as_str(),
                "itemType": request.item_type.as_str(),
                "count": request.count,
            }),
        )
    }

    pub fn reset_mission() -> Self {
        Self::new(TOPIC_RESET_MISSION, json!({}))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PlaceItem,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::PlaceItem => "place_item",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Water,
    Food,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Water => "water",
            ItemType::Food => "food",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = ProtocolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "water" => Ok(ItemType::Water),
            "food" => Ok(ItemType::Food),
            other => Err(ProtocolError::UnknownItemType(other.to_string())),
        }
    }
}

/// Outbound intent. Fire-and-forget: the effect shows up in a later status broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: ActionKind,
    pub item_type: ItemType,
    pub count: u32,
}

impl ActionRequest {
    pub fn new(action: ActionKind, item_type: ItemType, count: u32) -> Result<Self, ProtocolError> {
        if count == 0 {
            return Err(ProtocolError::ZeroCount);
        }
        Ok(Self {
            action,
            item_type,
            count,
        })
    }
}

pub fn create_action_message(
    action: ActionKind,
    item_type: ItemType,
    count: u32,
) -> Result<Envelope, ProtocolError> {
    ActionRequest::new(action, item_type, count).map(|request| Envelope::action(&request))
}

pub fn create_place_item_message(item_type: ItemType, count: u32) -> Result<Envelope, ProtocolError> {
    create_action_message(ActionKind::PlaceItem, item_type, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_item_message_survives_line_framing() {
        let envelope = create_place_item_message(ItemType::Water, 2).expect("valid request");
        let mut wire = serde_json::to_string(&envelope).expect("serialize envelope");
        wire.push('\n');

        let line = wire.split('\n').next().expect("one framed line");
        let parsed: Envelope = serde_json::from_str(line).expect("parse envelope");
        let body: ActionRequest = serde_json::from_value(parsed.body.clone()).expect("parse body");

        assert_eq!(parsed.topic, "action");
        assert_eq!(body.item_type, ItemType::Water);
        assert_eq!(body.count, 2);
        assert_eq!(body.action, ActionKind::PlaceItem);
        assert_eq!(parsed.body["itemType"], "water");
        assert_eq!(parsed.body["action"], "place_item");
    }

    #[test]
    fn zero_count_is_rejected() {
        assert_eq!(
            create_place_item_message(ItemType::Food, 0),
            Err(ProtocolError::ZeroCount)
        );
    }

    #[test]
    fn reset_mission_has_empty_object_body() {
        let text = serde_json::to_string(&Envelope::reset_mission()).expect("serialize");

        assert_eq!(text, r#"{"topic":"reset_mission","body":{}}"#);
    }

    #[test]
    fn envelope_without_body_decodes_with_null_body() {
        let envelope: Envelope = serde_json::from_str(r#"{"topic":"heartbeat"}"#).expect("parse");

        assert_eq!(envelope.body, Value::Null);
    }

    #[test]
    fn envelope_without_topic_is_rejected() {
        assert!(serde_json::from_str::<Envelope>(r#"{"body":{}}"#).is_err());
    }

    #[test]
    fn item_type_parses_case_insensitively() {
        assert_eq!("Water".parse::<ItemType>(), Ok(ItemType::Water));
        assert_eq!(" food ".parse::<ItemType>(), Ok(ItemType::Food));
        assert!("medkit".parse::<ItemType>().is_err());
    }
}
