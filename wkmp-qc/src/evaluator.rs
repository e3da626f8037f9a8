//! Rule evaluator contract
//!
//! The engine knows nothing about rule content. It only needs something that
//! turns `(value, kind, options)` into warnings with deterministic ids, so
//! that dismiss/accept state survives re-evaluation.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wkmp_common::Result;

use crate::warning::{EvaluatorOptions, ValidationKind, Warning};

/// Produces quality-control warnings for one field value
///
/// Implementations must be deterministic in the warning `id`s they emit for
/// the same underlying issue. Failures are allowed; the engine treats a
/// failed pass as "no warnings produced".
pub trait RuleEvaluator: Send + Sync {
    fn evaluate(
        &self,
        value: &str,
        kind: ValidationKind,
        options: &EvaluatorOptions,
    ) -> Result<Vec<Warning>>;
}

impl<F> RuleEvaluator for F
where
    F: Fn(&str, ValidationKind, &EvaluatorOptions) -> Result<Vec<Warning>> + Send + Sync,
{
    fn evaluate(
        &self,
        value: &str,
        kind: ValidationKind,
        options: &EvaluatorOptions,
    ) -> Result<Vec<Warning>> {
        self(value, kind, options)
    }
}

/// Run one evaluation pass for `field_id`, never failing
///
/// Evaluator errors are logged and become an empty pass. Every returned
/// warning is stamped with `field_id`.
pub(crate) fn evaluate_field(
    evaluator: &dyn RuleEvaluator,
    field_id: &str,
    value: &str,
    kind: ValidationKind,
    options: &EvaluatorOptions,
) -> Vec<Warning> {
    match evaluator.evaluate(value, kind, options) {
        Ok(warnings) => {
            debug!(field_id, count = warnings.len(), "Evaluation pass complete");
            warnings
                .into_iter()
                .map(|w| w.normalized(field_id))
                .collect()
        }
        Err(e) => {
            warn!(field_id, "Rule evaluation failed, treating as no warnings: {}", e);
            Vec::new()
        }
    }
}

/// One row of a [`TableEvaluator`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableEntry {
    /// Kind this row applies to; absent matches every kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValidationKind>,
    /// Exact field value this row matches
    pub value: String,
    pub warnings: Vec<Warning>,
}

/// Lookup-table evaluator
///
/// Returns the warnings of the first row whose value (and kind, if given)
/// matches exactly; unmatched values produce no warnings. Used for replaying
/// recorded sessions where the real rule set is not available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableEvaluator {
    entries: Vec<TableEntry>,
}

impl TableEvaluator {
    pub fn new(entries: Vec<TableEntry>) -> Self {
        Self { entries }
    }

    /// Add a row matching `value` for any kind
    pub fn with_entry(mut self, value: impl Into<String>, warnings: Vec<Warning>) -> Self {
        self.entries.push(TableEntry {
            kind: None,
            value: value.into(),
            warnings,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RuleEvaluator for TableEvaluator {
    fn evaluate(
        &self,
        value: &str,
        kind: ValidationKind,
        _options: &EvaluatorOptions,
    ) -> Result<Vec<Warning>> {
        Ok(self
            .entries
            .iter()
            .find(|entry| entry.value == value && entry.kind.map_or(true, |k| k == kind))
            .map(|entry| entry.warnings.clone())
            .unwrap_or_default())
    }
}
