//! Warning registry
//!
//! Authoritative store of active, dismissed and accepted warnings keyed by
//! field identifier.
//!
//! **Invariant:** a field's active warnings never contain an id present in
//! that field's dismissed or accepted sets. Dismissal and acceptance are
//! removals, so a repeated evaluation pass that re-emits a resolved id does
//! not resurrect it.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::warning::{Warning, WarningKind};

/// Validation state for one field
#[derive(Debug, Clone, Default)]
pub struct FieldValidationState {
    /// Evaluator output order, minus resolved ids
    pub active_warnings: Vec<Warning>,
    pub dismissed_ids: HashSet<String>,
    pub accepted_ids: HashSet<String>,
}

impl FieldValidationState {
    fn is_resolved(&self, warning_id: &str) -> bool {
        self.dismissed_ids.contains(warning_id) || self.accepted_ids.contains(warning_id)
    }

    /// Remove `warning_id` from the active list, returning whether it was active
    fn remove_active(&mut self, warning_id: &str) -> bool {
        let before = self.active_warnings.len();
        self.active_warnings.retain(|w| w.id != warning_id);
        self.active_warnings.len() != before
    }

    pub fn error_count(&self) -> usize {
        self.active_warnings
            .iter()
            .filter(|w| w.kind == WarningKind::Error)
            .count()
    }
}

/// Store of per-field validation state
///
/// Fields are kept in registration order (first `update`) so flattened
/// views are deterministic. Operations on unknown fields behave as if the
/// field had no warnings.
#[derive(Debug, Default)]
pub struct WarningRegistry {
    pub(crate) order: Vec<String>,
    pub(crate) fields: HashMap<String, FieldValidationState>,
}

impl WarningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a field's active warnings with a new evaluation pass
    ///
    /// Warnings whose id was already dismissed or accepted for this field are
    /// filtered out. Creates the field on first use. Returns the number of
    /// active warnings after filtering.
    pub fn update(&mut self, field_id: &str, new_warnings: Vec<Warning>) -> usize {
        if !self.fields.contains_key(field_id) {
            debug!(field_id, "Registering field");
            self.order.push(field_id.to_string());
        }
        let state = self.fields.entry(field_id.to_string()).or_default();

        let offered = new_warnings.len();
        let mut seen = HashSet::new();
        let filtered: Vec<Warning> = new_warnings
            .into_iter()
            .filter(|w| !state.is_resolved(&w.id))
            // Evaluator emitting the same id twice in one pass keeps the first
            .filter(|w| seen.insert(w.id.clone()))
            .collect();
        state.active_warnings = filtered;

        trace!(
            field_id,
            offered,
            active = state.active_warnings.len(),
            "Field warnings replaced"
        );
        state.active_warnings.len()
    }

    /// Active warnings for one field (empty for unknown fields)
    pub fn field_warnings(&self, field_id: &str) -> &[Warning] {
        self.fields
            .get(field_id)
            .map(|s| s.active_warnings.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate all active warnings: registration order, then insertion order
    pub fn iter_warnings(&self) -> impl Iterator<Item = &Warning> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.fields.get(id))
            .flat_map(|state| state.active_warnings.iter())
    }

    /// All active warnings, flattened over fields
    pub fn all_warnings(&self) -> Vec<Warning> {
        self.iter_warnings().cloned().collect()
    }

    /// Dismiss one warning
    ///
    /// Idempotent: the id is recorded as dismissed and removed from the
    /// active list; dismissing again changes nothing. Returns whether an
    /// active warning was removed. Unknown fields are a no-op.
    pub fn dismiss(&mut self, field_id: &str, warning_id: &str) -> bool {
        let Some(state) = self.fields.get_mut(field_id) else {
            debug!(field_id, warning_id, "Dismiss on unknown field ignored");
            return false;
        };

        state.dismissed_ids.insert(warning_id.to_string());
        let removed = state.remove_active(warning_id);
        if removed {
            debug!(field_id, warning_id, "Warning dismissed");
        }
        removed
    }

    /// Accept a warning's suggested value
    ///
    /// Returns `None` without mutating anything when the warning carries no
    /// suggestion or the field is unknown. Otherwise records the id as
    /// accepted, removes it from the active list and returns the value for
    /// the caller to apply to the field.
    pub fn accept_suggestion(&mut self, field_id: &str, warning: &Warning) -> Option<String> {
        let suggested = warning.suggested_value.clone()?;
        let Some(state) = self.fields.get_mut(field_id) else {
            debug!(field_id, warning_id = %warning.id, "Accept on unknown field ignored");
            return None;
        };

        state.accepted_ids.insert(warning.id.clone());
        state.remove_active(&warning.id);
        debug!(field_id, warning_id = %warning.id, "Suggestion accepted");
        Some(suggested)
    }

    /// Discard all state for a field, including resolution history
    ///
    /// A field validated afterwards behaves as brand-new. Returns whether the
    /// field existed.
    pub fn clear_field(&mut self, field_id: &str) -> bool {
        let existed = self.fields.remove(field_id).is_some();
        if existed {
            self.order.retain(|id| id != field_id);
            debug!(field_id, "Field cleared");
        }
        existed
    }

    /// Field identifiers in registration order
    pub fn field_ids(&self) -> &[String] {
        &self.order
    }

    pub fn field_state(&self, field_id: &str) -> Option<&FieldValidationState> {
        self.fields.get(field_id)
    }

    pub fn is_dismissed(&self, field_id: &str, warning_id: &str) -> bool {
        self.fields
            .get(field_id)
            .is_some_and(|s| s.dismissed_ids.contains(warning_id))
    }

    pub fn is_accepted(&self, field_id: &str, warning_id: &str) -> bool {
        self.fields
            .get(field_id)
            .is_some_and(|s| s.accepted_ids.contains(warning_id))
    }

    /// Whether a warning id has been resolved (dismissed or accepted)
    pub fn is_resolved(&self, field_id: &str, warning_id: &str) -> bool {
        self.fields
            .get(field_id)
            .is_some_and(|s| s.is_resolved(warning_id))
    }

    /// Total active warnings across all fields
    pub fn total_active(&self) -> usize {
        self.fields.values().map(|s| s.active_warnings.len()).sum()
    }
}
