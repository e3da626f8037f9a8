//! Read-side summaries over the warning registry
//!
//! Everything here is computed at call time from the registry's current
//! state; nothing is cached.

use serde::{Deserialize, Serialize};

use crate::registry::WarningRegistry;
use crate::warning::{Warning, WarningKind};

/// Counts of active warnings by severity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub suggestions: usize,
    /// Mean of the rejection probabilities that are present (0 if none)
    pub avg_rejection_probability: f64,
}

impl ValidationSummary {
    fn from_warnings<'a>(warnings: impl Iterator<Item = &'a Warning>) -> Self {
        let mut summary = Self::default();
        let mut probability_sum = 0.0;
        let mut probability_count = 0usize;

        for w in warnings {
            summary.total += 1;
            match w.kind {
                WarningKind::Error => summary.errors += 1,
                WarningKind::Warning => summary.warnings += 1,
                WarningKind::Suggestion => summary.suggestions += 1,
            }
            if let Some(p) = w.rejection_probability {
                probability_sum += p;
                probability_count += 1;
            }
        }

        if probability_count > 0 {
            summary.avg_rejection_probability = probability_sum / probability_count as f64;
        }
        summary
    }
}

/// Presentation hint for a field's input border
///
/// Chosen by the most severe active warning on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderClass {
    Error,
    Warning,
    Suggestion,
    None,
}

impl BorderClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderClass::Error => "error",
            BorderClass::Warning => "warning",
            BorderClass::Suggestion => "suggestion",
            BorderClass::None => "none",
        }
    }
}

impl From<Option<WarningKind>> for BorderClass {
    fn from(kind: Option<WarningKind>) -> Self {
        match kind {
            Some(WarningKind::Error) => BorderClass::Error,
            Some(WarningKind::Warning) => BorderClass::Warning,
            Some(WarningKind::Suggestion) => BorderClass::Suggestion,
            None => BorderClass::None,
        }
    }
}

/// Derives counts and hints from a registry snapshot
pub struct SummaryAggregator<'a> {
    registry: &'a WarningRegistry,
}

impl<'a> SummaryAggregator<'a> {
    pub fn new(registry: &'a WarningRegistry) -> Self {
        Self { registry }
    }

    /// Summary over every field
    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary::from_warnings(self.registry.iter_warnings())
    }

    /// Summary scoped to one field (all zero for unknown fields)
    pub fn field_summary(&self, field_id: &str) -> ValidationSummary {
        ValidationSummary::from_warnings(self.registry.field_warnings(field_id).iter())
    }

    /// Whether any `error` warning is active, in one field or globally
    pub fn has_errors(&self, field_id: Option<&str>) -> bool {
        match field_id {
            Some(id) => self
                .registry
                .field_warnings(id)
                .iter()
                .any(|w| w.kind == WarningKind::Error),
            None => self.registry.iter_warnings().any(|w| w.kind == WarningKind::Error),
        }
    }

    /// Border hint: error beats warning beats suggestion
    pub fn input_border_class(&self, field_id: &str) -> BorderClass {
        self.registry
            .field_warnings(field_id)
            .iter()
            .map(|w| w.kind)
            .max()
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(id: &str, kind: WarningKind) -> Warning {
        Warning::new(id, kind, "f", "m")
    }

    #[test]
    fn test_summary_counts_by_kind() {
        let mut registry = WarningRegistry::new();
        registry.update(
            "f",
            vec![
                w("e1", WarningKind::Error),
                w("w1", WarningKind::Warning),
                w("w2", WarningKind::Warning),
            ],
        );
        registry.update("g", vec![w("s1", WarningKind::Suggestion)]);

        let summary = SummaryAggregator::new(&registry).summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 2);
        assert_eq!(summary.suggestions, 1);
        assert_eq!(summary.avg_rejection_probability, 0.0);
    }

    #[test]
    fn test_avg_rejection_excludes_absent_values() {
        let mut registry = WarningRegistry::new();
        registry.update(
            "f",
            vec![
                w("a", WarningKind::Error).with_rejection_probability(80.0),
                w("b", WarningKind::Warning).with_rejection_probability(20.0),
                w("c", WarningKind::Suggestion),
            ],
        );

        let summary = SummaryAggregator::new(&registry).summary();
        assert_eq!(summary.avg_rejection_probability, 50.0);
    }

    #[test]
    fn test_summary_reflects_dismissals_immediately() {
        let mut registry = WarningRegistry::new();
        registry.update("f", vec![w("e1", WarningKind::Error)]);
        assert!(SummaryAggregator::new(&registry).has_errors(None));

        registry.dismiss("f", "e1");
        let aggregator = SummaryAggregator::new(&registry);
        assert!(!aggregator.has_errors(None));
        assert_eq!(aggregator.summary().total, 0);
    }

    #[test]
    fn test_has_errors_scoped_to_field() {
        let mut registry = WarningRegistry::new();
        registry.update("f", vec![w("e1", WarningKind::Error)]);
        registry.update("g", vec![w("w1", WarningKind::Warning)]);

        let aggregator = SummaryAggregator::new(&registry);
        assert!(aggregator.has_errors(Some("f")));
        assert!(!aggregator.has_errors(Some("g")));
        assert!(!aggregator.has_errors(Some("unknown")));
        assert!(aggregator.has_errors(None));
    }

    #[test]
    fn test_border_class_priority() {
        let mut registry = WarningRegistry::new();
        registry.update(
            "mixed",
            vec![
                w("s", WarningKind::Suggestion),
                w("e", WarningKind::Error),
                w("w", WarningKind::Warning),
            ],
        );
        registry.update(
            "soft",
            vec![w("s", WarningKind::Suggestion), w("w", WarningKind::Warning)],
        );
        registry.update("hint", vec![w("s", WarningKind::Suggestion)]);
        registry.update("clean", Vec::new());

        let aggregator = SummaryAggregator::new(&registry);
        assert_eq!(aggregator.input_border_class("mixed"), BorderClass::Error);
        assert_eq!(aggregator.input_border_class("soft"), BorderClass::Warning);
        assert_eq!(aggregator.input_border_class("hint"), BorderClass::Suggestion);
        assert_eq!(aggregator.input_border_class("clean"), BorderClass::None);
        assert_eq!(aggregator.input_border_class("unknown").as_str(), "none");
    }

    #[test]
    fn test_field_summary() {
        let mut registry = WarningRegistry::new();
        registry.update("f", vec![w("e1", WarningKind::Error)]);
        registry.update("g", vec![w("w1", WarningKind::Warning)]);

        let aggregator = SummaryAggregator::new(&registry);
        let f = aggregator.field_summary("f");
        assert_eq!((f.total, f.errors, f.warnings), (1, 1, 0));
        assert_eq!(aggregator.field_summary("nope"), ValidationSummary::default());
    }
}
