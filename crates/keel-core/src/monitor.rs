// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Safety events and worst-case monitor aggregation.
//!
//! Ordering invariant:
//! - Sources are merged in lexicographic source-id order, so tie-broken
//!   reason strings are byte-stable across runs.
//! - Severity is a total order; the aggregate level is the maximum over all
//!   active events.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::space::ControlSpace;

/// Severity of a safety event. Declaration order is severity order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SafetyLevel {
    /// Nothing to report.
    None,
    /// Advisory only; no command injection.
    Warn,
    /// Stop the affected (or all) spaces this tick.
    Stop,
    /// Latch the controller's terminal stop state.
    EStop,
}

impl SafetyLevel {
    /// Wire name of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Warn => "WARN",
            Self::Stop => "STOP",
            Self::EStop => "E_STOP",
        }
    }
}

impl core::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One monitor's verdict about the world.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafetyEvent {
    /// Severity of the event.
    pub level: SafetyLevel,
    /// Human-readable reason.
    pub reason: String,
    /// Optional per-space detail, e.g. `{arm: "collision_margin"}`. Events
    /// below `Stop` never contribute these to the aggregate.
    pub affected_spaces: Option<BTreeMap<ControlSpace, String>>,
}

impl SafetyEvent {
    /// Builds an event with no per-space detail.
    pub fn new(level: SafetyLevel, reason: impl Into<String>) -> Self {
        Self {
            level,
            reason: reason.into(),
            affected_spaces: None,
        }
    }

    /// Attaches per-space detail.
    #[must_use]
    pub fn with_affected(mut self, affected: BTreeMap<ControlSpace, String>) -> Self {
        self.affected_spaces = Some(affected);
        self
    }
}

/// Worst-case merge of all active events, one per source id.
///
/// Deterministic O(N) pass in lexicographic source order:
/// - the worst level wins; on a tie the `"src:reason"` strings are
///   concatenated with `" | "` in source order;
/// - `affected_spaces` is merged only from events at `Stop` or above, and
///   collisions on a space concatenate with `";"` in source order;
/// - an empty input aggregates to `None` with reason `"no_monitors"`.
#[must_use]
pub fn aggregate(events: &BTreeMap<String, SafetyEvent>) -> SafetyEvent {
    if events.is_empty() {
        return SafetyEvent::new(SafetyLevel::None, "no_monitors");
    }

    let mut worst = SafetyLevel::None;
    let mut reasons: Vec<String> = Vec::new();
    let mut affected: BTreeMap<ControlSpace, String> = BTreeMap::new();

    for (src, evt) in events {
        if evt.level > worst {
            worst = evt.level;
            reasons.clear();
            reasons.push(format!("{src}:{}", evt.reason));
        } else if evt.level == worst && evt.level != SafetyLevel::None {
            reasons.push(format!("{src}:{}", evt.reason));
        }

        if evt.level >= SafetyLevel::Stop {
            if let Some(spaces) = &evt.affected_spaces {
                for (space, reason) in spaces {
                    let tagged = format!("{src}:{reason}");
                    match affected.entry(*space) {
                        Entry::Occupied(mut o) => {
                            let merged = o.get_mut();
                            merged.push(';');
                            merged.push_str(&tagged);
                        }
                        Entry::Vacant(v) => {
                            v.insert(tagged);
                        }
                    }
                }
            }
        }
    }

    SafetyEvent {
        level: worst,
        reason: reasons.join(" | "),
        affected_spaces: if affected.is_empty() {
            None
        } else {
            Some(affected)
        },
    }
}

/// Latest-event store for a set of monitors, keyed by source id.
#[derive(Clone, Debug, Default)]
pub struct MonitorRegistry {
    active_events: BTreeMap<String, SafetyEvent>,
}

impl MonitorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest event from one source, replacing any prior one.
    pub fn update(&mut self, source_id: impl Into<String>, event: SafetyEvent) {
        self.active_events.insert(source_id.into(), event);
    }

    /// Worst-case merge over all active events. See [`aggregate`].
    #[must_use]
    pub fn aggregate(&self) -> SafetyEvent {
        aggregate(&self.active_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_aggregates_to_none() {
        let agg = MonitorRegistry::new().aggregate();
        assert_eq!(agg.level, SafetyLevel::None);
        assert_eq!(agg.reason, "no_monitors");
        assert!(agg.affected_spaces.is_none());
    }

    #[test]
    fn worst_level_wins_and_ties_concatenate_in_source_order() {
        let mut reg = MonitorRegistry::new();
        reg.update("b_prox", SafetyEvent::new(SafetyLevel::Stop, "too_close"));
        reg.update("a_force", SafetyEvent::new(SafetyLevel::Stop, "overload"));
        reg.update("c_clock", SafetyEvent::new(SafetyLevel::Warn, "jitter"));

        let agg = reg.aggregate();
        assert_eq!(agg.level, SafetyLevel::Stop);
        assert_eq!(agg.reason, "a_force:overload | b_prox:too_close");
    }

    #[test]
    fn affected_spaces_merge_only_at_stop_or_above() {
        let mut warn_spaces = BTreeMap::new();
        warn_spaces.insert(ControlSpace::Base, "wobble".to_owned());
        let mut stop_spaces = BTreeMap::new();
        stop_spaces.insert(ControlSpace::Arm, "margin".to_owned());

        let mut reg = MonitorRegistry::new();
        reg.update(
            "a",
            SafetyEvent::new(SafetyLevel::Warn, "w").with_affected(warn_spaces),
        );
        reg.update(
            "b",
            SafetyEvent::new(SafetyLevel::Stop, "s").with_affected(stop_spaces),
        );

        let agg = reg.aggregate();
        let affected = agg.affected_spaces.unwrap();
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[&ControlSpace::Arm], "b:margin");
    }

    #[test]
    fn space_collisions_concatenate_in_source_order() {
        let mut first = BTreeMap::new();
        first.insert(ControlSpace::Arm, "margin".to_owned());
        let mut second = BTreeMap::new();
        second.insert(ControlSpace::Arm, "torque".to_owned());

        let mut reg = MonitorRegistry::new();
        reg.update(
            "b",
            SafetyEvent::new(SafetyLevel::Stop, "s2").with_affected(second),
        );
        reg.update(
            "a",
            SafetyEvent::new(SafetyLevel::Stop, "s1").with_affected(first),
        );

        let agg = reg.aggregate();
        let affected = agg.affected_spaces.unwrap();
        assert_eq!(affected[&ControlSpace::Arm], "a:margin;b:torque");
    }
}
