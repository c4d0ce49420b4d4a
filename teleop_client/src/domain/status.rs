//! Canonical player/robot status and the normalizer that builds it from raw payloads.
//!
//! The game reports status as a loosely shaped object: inventory items arrive as a list,
//! most fields are optional, and extra fields come and go between builds. [`normalize`]
//! folds that into one fixed shape so the rest of the client never deals with absence.

use crate::domain::envelope::ItemType;
use crate::domain::errors::NormalizeError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

// Below this distance (meters) a survivor counts as detected.
const DETECTION_RANGE: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Inventory {
    pub capacity: u32,
    pub used: u32,
    // item type -> count; keys are unique.
    pub items: BTreeMap<String, u32>,
}

/// Fixed-shape status snapshot. Rebuilt for every `player_status` message, never patched.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub timestamp: Option<String>,
    pub player_id: Option<String>,
    pub npc_id: Option<String>,
    pub distance_to_npc: f64,
    pub inventory: Inventory,
    pub position: Position,
    pub camera_yaw: f64,
    pub camera_pitch: f64,
    pub flashlight_on: bool,
    pub night_vision_on: bool,
    pub npc_is_following: bool,
    pub mission_completed: bool,
    pub npc_follow_unlocked: bool,
    pub npc_has_received_water: bool,
    pub npc_has_received_food: bool,
    pub player_traveled_distance: f64,
}

impl PlayerStatus {
    pub fn item_count(&self, item_type: ItemType) -> u32 {
        self.inventory
            .items
            .get(item_type.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// A survivor is "detected" when close by or already following the robot.
    pub fn is_person_detected(&self) -> bool {
        (self.distance_to_npc > 0.0 && self.distance_to_npc < DETECTION_RANGE)
            || self.npc_is_following
    }
}

/// Builds a [`PlayerStatus`] from a raw `player_status` body.
///
/// Absent optional fields take their defaults (origin position, zero numbers, `false` flags,
/// no ids). A field that is `null` or of the wrong JSON type counts as absent, and integer
/// fields accept float encodings such as `20.0`. Duplicate item types in `inventory.items`
/// resolve to the last entry. The only required field is `inventory`; without it this returns
/// [`NormalizeError::MissingInventory`].
pub fn normalize(raw: &Value) -> Result<PlayerStatus, NormalizeError> {
    let inventory = match raw.get("inventory") {
        None | Some(Value::Null) => return Err(NormalizeError::MissingInventory),
        Some(Value::Object(_)) => normalize_inventory(&raw["inventory"]),
        Some(other) => return Err(NormalizeError::Malformed(json_type(other))),
    };

    Ok(PlayerStatus {
        timestamp: scalar_string(raw, "timestamp"),
        player_id: scalar_string(raw, "playerId"),
        npc_id: scalar_string(raw, "npcId"),
        distance_to_npc: number(raw, "distanceToNpc"),
        inventory,
        position: normalize_position(raw.get("position")),
        camera_yaw: number(raw, "cameraYaw"),
        camera_pitch: number(raw, "cameraPitch"),
        flashlight_on: flag(raw, "flashlightOn"),
        night_vision_on: flag(raw, "nightVisionOn"),
        npc_is_following: flag(raw, "npcIsFollowing"),
        mission_completed: flag(raw, "missionCompleted"),
        npc_follow_unlocked: flag(raw, "npcFollowUnlocked"),
        npc_has_received_water: flag(raw, "npcHasReceivedWater"),
        npc_has_received_food: flag(raw, "npcHasReceivedFood"),
        player_traveled_distance: number(raw, "playerTraveledDistance"),
    })
}

fn normalize_inventory(raw: &Value) -> Inventory {
    let mut items = BTreeMap::new();
    let entries = raw.get("items").and_then(Value::as_array);
    for entry in entries.into_iter().flatten() {
        // Entries without a string type cannot be keyed.
        let Some(item_type) = entry.get("type").and_then(Value::as_str) else {
            continue;
        };
        // Last write wins for repeated types.
        items.insert(item_type.to_string(), count(entry.get("count")));
    }

    Inventory {
        capacity: count(raw.get("capacity")),
        used: count(raw.get("used")),
        items,
    }
}

fn normalize_position(raw: Option<&Value>) -> Position {
    match raw {
        Some(position @ Value::Object(_)) => Position {
            x: number(position, "x"),
            y: number(position, "y"),
            z: number(position, "z"),
        },
        _ => Position::default(),
    }
}

fn number(obj: &Value, key: &str) -> f64 {
    obj.get(key)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

fn flag(obj: &Value, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

// Counts arrive as integers or as floats like `3.0`; negatives clamp to zero.
fn count(value: Option<&Value>) -> u32 {
    let Some(value) = value else { return 0 };
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).unwrap_or(u32::MAX);
    }
    match value.as_f64() {
        Some(n) if n.is_finite() && n > 0.0 => n.round().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

// Ids and timestamps show up as strings or numbers depending on the game build.
fn scalar_string(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_payload() -> Value {
        json!({
            "timestamp": "2024-05-01T12:00:00Z",
            "playerId": "player-1",
            "npcId": "npc-7",
            "distanceToNpc": 12.5,
            "inventory": {
                "capacity": 20,
                "used": 7,
                "items": [
                    { "type": "water", "count": 4 },
                    { "type": "food", "count": 3 }
                ]
            },
            "position": { "x": 1.5, "y": 0.0, "z": -3.25 },
            "cameraYaw": 90.0,
            "cameraPitch": -10.0,
            "flashlightOn": true,
            "nightVisionOn": false,
            "npcIsFollowing": true,
            "missionCompleted": false,
            "npcFollowUnlocked": true,
            "playerTraveledDistance": 42.0
        })
    }

    #[test]
    fn when_payload_is_complete_then_all_fields_are_carried_over() {
        let status = normalize(&full_payload()).expect("valid payload");

        assert_eq!(status.player_id.as_deref(), Some("player-1"));
        assert_eq!(status.npc_id.as_deref(), Some("npc-7"));
        assert_eq!(status.distance_to_npc, 12.5);
        assert_eq!(status.inventory.capacity, 20);
        assert_eq!(status.inventory.used, 7);
        assert_eq!(status.item_count(ItemType::Water), 4);
        assert_eq!(status.item_count(ItemType::Food), 3);
        assert_eq!(
            status.position,
            Position {
                x: 1.5,
                y: 0.0,
                z: -3.25
            }
        );
        assert_eq!(status.camera_yaw, 90.0);
        assert!(status.flashlight_on);
        assert!(!status.night_vision_on);
        assert!(status.npc_is_following);
        assert!(status.npc_follow_unlocked);
        assert!(!status.npc_has_received_food);
        assert_eq!(status.player_traveled_distance, 42.0);
    }

    #[test]
    fn when_optional_fields_are_missing_then_defaults_apply() {
        let status = normalize(&json!({ "inventory": {} })).expect("inventory present");

        assert_eq!(status.position, Position::default());
        assert_eq!(status.distance_to_npc, 0.0);
        assert_eq!(status.camera_yaw, 0.0);
        assert_eq!(status.camera_pitch, 0.0);
        assert_eq!(status.player_id, None);
        assert_eq!(status.npc_id, None);
        assert!(!status.flashlight_on);
        assert!(!status.night_vision_on);
        assert!(!status.npc_is_following);
        assert!(!status.mission_completed);
        assert!(status.inventory.items.is_empty());
        assert_eq!(status.item_count(ItemType::Water), 0);
    }

    #[test]
    fn when_item_type_repeats_then_last_entry_wins() {
        let payload = json!({
            "inventory": {
                "items": [
                    { "type": "water", "count": 3 },
                    { "type": "water", "count": 5 }
                ]
            }
        });

        let status = normalize(&payload).expect("valid payload");

        assert_eq!(status.inventory.items.get("water"), Some(&5));
        assert_eq!(status.inventory.items.len(), 1);
    }

    #[test]
    fn when_inventory_is_absent_then_returns_missing_inventory() {
        let err = normalize(&json!({ "playerId": "p" })).expect_err("no inventory");
        assert!(matches!(err, NormalizeError::MissingInventory));

        let err = normalize(&json!({ "inventory": null })).expect_err("null inventory");
        assert!(matches!(err, NormalizeError::MissingInventory));

        let err = normalize(&Value::Null).expect_err("null body");
        assert!(matches!(err, NormalizeError::MissingInventory));
    }

    #[test]
    fn when_inventory_is_not_an_object_then_returns_malformed() {
        let err = normalize(&json!({ "inventory": [1, 2] })).expect_err("array inventory");

        assert!(matches!(err, NormalizeError::Malformed("array")));
    }

    #[test]
    fn when_integers_arrive_as_floats_then_they_are_accepted() {
        let payload = json!({
            "inventory": {
                "capacity": 20.0,
                "used": 4.0,
                "items": [{ "type": "water", "count": 3.0 }]
            }
        });

        let status = normalize(&payload).expect("float-encoded integers");

        assert_eq!(status.inventory.capacity, 20);
        assert_eq!(status.inventory.used, 4);
        assert_eq!(status.item_count(ItemType::Water), 3);
    }

    #[test]
    fn when_position_axis_is_null_then_it_is_zero() {
        let status = normalize(&json!({
            "inventory": {},
            "position": { "x": 1, "y": null, "z": 2 }
        }))
        .expect("null axis");

        assert_eq!(
            status.position,
            Position {
                x: 1.0,
                y: 0.0,
                z: 2.0
            }
        );
    }

    #[test]
    fn when_optional_field_has_wrong_type_then_default_applies() {
        let status = normalize(&json!({
            "inventory": { "capacity": "lots", "items": [{ "type": "food", "count": -2 }, { "count": 9 }] },
            "flashlightOn": "yes",
            "distanceToNpc": null,
            "position": "here",
            "npcIsFollowing": true
        }))
        .expect("tolerable payload");

        assert!(!status.flashlight_on);
        assert!(status.npc_is_following);
        assert_eq!(status.distance_to_npc, 0.0);
        assert_eq!(status.position, Position::default());
        assert_eq!(status.inventory.capacity, 0);
        assert_eq!(status.item_count(ItemType::Food), 0);
        assert_eq!(status.inventory.items.len(), 1);
    }

    #[test]
    fn when_position_is_partial_then_missing_axes_are_zero() {
        let status = normalize(&json!({ "inventory": {}, "position": { "x": 2.0 } }))
            .expect("valid payload");

        assert_eq!(
            status.position,
            Position {
                x: 2.0,
                y: 0.0,
                z: 0.0
            }
        );
    }

    #[test]
    fn when_ids_are_numeric_then_they_become_strings() {
        let status = normalize(&json!({ "inventory": {}, "playerId": 17, "npcId": null }))
            .expect("valid payload");

        assert_eq!(status.player_id.as_deref(), Some("17"));
        assert_eq!(status.npc_id, None);
    }

    #[test]
    fn normalizing_the_same_input_twice_gives_equal_results() {
        let payload = full_payload();

        assert_eq!(
            normalize(&payload).expect("first"),
            normalize(&payload).expect("second")
        );
    }

    #[test]
    fn person_is_detected_when_close_or_following() {
        let mut status = PlayerStatus {
            distance_to_npc: 10.0,
            ..PlayerStatus::default()
        };
        assert!(status.is_person_detected());

        status.distance_to_npc = 0.0;
        assert!(!status.is_person_detected());

        status.distance_to_npc = 40.0;
        assert!(!status.is_person_detected());

        status.npc_is_following = true;
        assert!(status.is_person_detected());
    }
}
