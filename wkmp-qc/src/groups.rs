//! Cross-field group operations
//!
//! Bulk actions over every field's active warnings that share a
//! `warning_group` key (e.g. "capitalization").

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::registry::WarningRegistry;
use crate::warning::Warning;

/// A warning removed by a bulk dismissal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissedWarning {
    pub field_id: String,
    pub warning_id: String,
}

impl WarningRegistry {
    /// Active warnings in `group`, in flattened registry order
    pub fn warnings_by_group(&self, group: &str) -> Vec<Warning> {
        self.iter_warnings()
            .filter(|w| w.in_group(group))
            .cloned()
            .collect()
    }

    /// Dismiss every active warning whose group equals `group`
    ///
    /// Returns the warnings that were removed, in registry order.
    pub fn dismiss_group(&mut self, group: &str) -> Vec<DismissedWarning> {
        let targets: Vec<DismissedWarning> = self
            .order
            .iter()
            .filter_map(|field_id| self.fields.get(field_id).map(|s| (field_id, s)))
            .flat_map(|(field_id, state)| {
                state
                    .active_warnings
                    .iter()
                    .filter(|w| w.in_group(group))
                    .map(move |w| DismissedWarning {
                        field_id: field_id.clone(),
                        warning_id: w.id.clone(),
                    })
            })
            .collect();

        for target in &targets {
            self.dismiss(&target.field_id, &target.warning_id);
        }

        info!(group, count = targets.len(), "Group dismissed");
        targets
    }

    /// Accept every suggestion-bearing active warning in `group`
    ///
    /// Returns one change per affected field. When a field has several
    /// eligible group members, all of them are accepted and the value of the
    /// last one in insertion order wins.
    pub fn accept_all_in_group(&mut self, group: &str) -> BTreeMap<String, String> {
        let eligible: Vec<(String, Warning)> = self
            .order
            .iter()
            .filter_map(|field_id| self.fields.get(field_id).map(|s| (field_id, s)))
            .flat_map(|(field_id, state)| {
                state
                    .active_warnings
                    .iter()
                    .filter(|w| w.in_group(group) && w.has_suggestion())
                    .map(move |w| (field_id.clone(), w.clone()))
            })
            .collect();

        let mut changes = BTreeMap::new();
        for (field_id, warning) in eligible {
            if let Some(value) = self.accept_suggestion(&field_id, &warning) {
                if let Some(previous) = changes.insert(field_id.clone(), value) {
                    debug!(
                        field_id = %field_id,
                        overwritten = %previous,
                        "Multiple group suggestions for one field, last wins"
                    );
                }
            }
        }

        info!(group, fields = changes.len(), "Group suggestions accepted");
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warning::WarningKind;

    fn grouped(id: &str, field: &str, group: &str) -> Warning {
        Warning::new(id, WarningKind::Suggestion, field, "grouped").with_group(group)
    }

    fn registry_with_caps() -> WarningRegistry {
        let mut registry = WarningRegistry::new();
        registry.update(
            "albumTitle",
            vec![
                grouped("w-caps-album", "albumTitle", "capitalization").with_suggestion("My Album"),
                grouped("w-space-album", "albumTitle", "spacing"),
            ],
        );
        registry.update(
            "trackTitle",
            vec![grouped("w-caps-track", "trackTitle", "capitalization").with_suggestion("My Song")],
        );
        registry
    }

    #[test]
    fn test_warnings_by_group_filters_flattened_view() {
        let registry = registry_with_caps();
        let ids: Vec<_> = registry
            .warnings_by_group("capitalization")
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, vec!["w-caps-album", "w-caps-track"]);
        assert!(registry.warnings_by_group("nonexistent").is_empty());
    }

    #[test]
    fn test_dismiss_group_spans_fields() {
        let mut registry = registry_with_caps();
        let dismissed = registry.dismiss_group("capitalization");

        assert_eq!(dismissed.len(), 2);
        assert!(registry.warnings_by_group("capitalization").is_empty());
        assert_eq!(registry.field_warnings("albumTitle").len(), 1);
        assert!(registry.is_dismissed("trackTitle", "w-caps-track"));

        // Second call finds nothing left
        assert!(registry.dismiss_group("capitalization").is_empty());
    }

    #[test]
    fn test_accept_all_returns_one_change_per_field() {
        let mut registry = registry_with_caps();
        let changes = registry.accept_all_in_group("capitalization");

        assert_eq!(changes.len(), 2);
        assert_eq!(changes["albumTitle"], "My Album");
        assert_eq!(changes["trackTitle"], "My Song");
        assert!(registry.field_warnings("trackTitle").is_empty());
        assert_eq!(registry.field_warnings("albumTitle")[0].id, "w-space-album");
    }

    #[test]
    fn test_accept_all_skips_warnings_without_suggestion() {
        let mut registry = registry_with_caps();
        let changes = registry.accept_all_in_group("spacing");

        assert!(changes.is_empty());
        assert_eq!(registry.warnings_by_group("spacing").len(), 1);
    }

    #[test]
    fn test_accept_all_last_writer_wins_within_field() {
        let mut registry = WarningRegistry::new();
        registry.update(
            "artistName",
            vec![
                grouped("first", "artistName", "capitalization").with_suggestion("The beatles"),
                grouped("second", "artistName", "capitalization").with_suggestion("The Beatles"),
            ],
        );

        let changes = registry.accept_all_in_group("capitalization");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["artistName"], "The Beatles");
        assert!(registry.is_accepted("artistName", "first"));
        assert!(registry.is_accepted("artistName", "second"));
        assert!(registry.field_warnings("artistName").is_empty());
    }
}
