//! Reconciliation planning: set difference by marker ID.
//!
//! [`plan_reconciliation`] is pure. It takes one snapshot and one listing
//! of the namespace and returns the operations that make the listing match
//! the snapshot. It performs no I/O and holds no state between ticks.

use std::collections::BTreeMap;

use markersync_types::{LiveEntity, MarkerId, OverlayMarker};

/// The operations one tick must apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// Entities without a marker, in marker ID order.
    pub creates: Vec<LiveEntity>,
    /// Entities whose marker has a stale label or position.
    pub updates: Vec<LiveEntity>,
    /// Markers matching no entity in the snapshot.
    pub deletes: Vec<MarkerId>,
    /// Markers already matching their entity.
    pub unchanged: usize,
    /// Distinct identities in the snapshot.
    pub entities: usize,
}

impl ReconcilePlan {
    /// Whether the plan mutates nothing.
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Total number of mutations.
    pub fn mutation_count(&self) -> usize {
        self.creates
            .len()
            .saturating_add(self.updates.len())
            .saturating_add(self.deletes.len())
    }
}

/// Diff `entities` against `existing` markers.
///
/// Every entity maps to `prefix + identity`. If an identity appears more
/// than once in the snapshot, the last occurrence wins. A marker is claimed
/// by at most one entity; whatever is left unclaimed is deleted, with no
/// grace period.
pub fn plan_reconciliation(
    prefix: &str,
    entities: &[LiveEntity],
    existing: Vec<OverlayMarker>,
) -> ReconcilePlan {
    let mut desired: BTreeMap<MarkerId, &LiveEntity> = BTreeMap::new();
    for entity in entities {
        desired.insert(entity.marker_id(prefix), entity);
    }

    let mut existing_by_id: BTreeMap<MarkerId, OverlayMarker> = existing
        .into_iter()
        .map(|marker| (marker.marker_id.clone(), marker))
        .collect();

    let mut plan = ReconcilePlan {
        entities: desired.len(),
        ..ReconcilePlan::default()
    };

    for (marker_id, entity) in desired {
        match existing_by_id.remove(&marker_id) {
            Some(marker) if marker.matches(entity) => {
                plan.unchanged = plan.unchanged.saturating_add(1);
            }
            Some(_) => plan.updates.push(entity.clone()),
            None => plan.creates.push(entity.clone()),
        }
    }

    plan.deletes = existing_by_id.into_keys().collect();
    plan
}
