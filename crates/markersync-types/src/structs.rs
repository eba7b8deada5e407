//! Core value structs: live entities read from the record store and the
//! markers they are projected onto.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{IconHandle, MarkerId};

/// World used when the record store does not name one.
pub const DEFAULT_WORLD: &str = "world";

/// A point in a named world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Name of the world (dimension) the point lives in.
    pub world: String,
    /// East-west coordinate.
    pub x: f64,
    /// Height coordinate.
    pub y: f64,
    /// North-south coordinate.
    pub z: f64,
}

impl Position {
    /// Create a position in the given world.
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

/// One row of the live-entity snapshot.
///
/// Produced fresh on every tick and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LiveEntity {
    /// Stable, unique identity (the player token).
    pub identity: String,
    /// Name shown on the marker label.
    pub display_name: String,
    /// Current position.
    pub position: Position,
}

impl LiveEntity {
    /// Create a live entity.
    pub fn new(
        identity: impl Into<String>,
        display_name: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            identity: identity.into(),
            display_name: display_name.into(),
            position,
        }
    }

    /// Marker ID this entity is projected onto under `prefix`.
    pub fn marker_id(&self, prefix: &str) -> MarkerId {
        MarkerId::for_identity(prefix, &self.identity)
    }
}

/// A marker as held by the rendering service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OverlayMarker {
    /// Marker ID within the namespace.
    pub marker_id: MarkerId,
    /// Text label.
    pub label: String,
    /// Where the marker is drawn.
    pub position: Position,
    /// Icon drawn for the marker.
    pub icon: IconHandle,
}

impl OverlayMarker {
    /// Whether label and position already match `entity`.
    ///
    /// The icon is not compared: it is chosen once at creation.
    pub fn matches(&self, entity: &LiveEntity) -> bool {
        self.label == entity.display_name && self.position == entity.position
    }
}

/// Counts from one completed reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TickSummary {
    /// Sequence number of the tick, starting at 1.
    pub tick: u64,
    /// When the pass began.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the pass in milliseconds.
    pub duration_ms: u64,
    /// Distinct identities in the snapshot.
    pub entities: usize,
    /// Markers created.
    pub created: usize,
    /// Markers moved or relabelled.
    pub updated: usize,
    /// Stale markers removed.
    pub deleted: usize,
    /// Markers already matching their entity.
    pub unchanged: usize,
    /// Per-marker operations that failed and were skipped.
    pub failures: usize,
}

impl TickSummary {
    /// Whether the pass changed the overlay at all.
    pub const fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice_at(x: f64) -> LiveEntity {
        LiveEntity::new("a1", "Alice", Position::new(DEFAULT_WORLD, x, 64.0, 10.0))
    }

    fn marker_for(entity: &LiveEntity) -> OverlayMarker {
        OverlayMarker {
            marker_id: entity.marker_id("plr_"),
            label: entity.display_name.clone(),
            position: entity.position.clone(),
            icon: IconHandle::default_icon(),
        }
    }

    #[test]
    fn marker_matches_identical_entity() {
        let entity = alice_at(10.0);
        assert!(marker_for(&entity).matches(&entity));
    }

    #[test]
    fn moved_entity_no_longer_matches() {
        let marker = marker_for(&alice_at(10.0));
        assert!(!marker.matches(&alice_at(20.0)));
    }

    #[test]
    fn renamed_entity_no_longer_matches() {
        let entity = alice_at(10.0);
        let marker = marker_for(&entity);
        let renamed = LiveEntity::new("a1", "Alicia", entity.position);
        assert!(!marker.matches(&renamed));
    }

    #[test]
    fn world_change_is_a_position_change() {
        let entity = alice_at(10.0);
        let marker = marker_for(&entity);
        let nether = LiveEntity::new("a1", "Alice", Position::new("world_nether", 10.0, 64.0, 10.0));
        assert!(!marker.matches(&nether));
    }
}
