//! Warning model produced by rule evaluators
//!
//! A `Warning` is one quality-control finding attached to a submission field.
//! Warnings are immutable once produced for an evaluation pass; the registry
//! only ever filters or removes them.

use serde::{Deserialize, Serialize};

/// Severity class of a warning, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    Suggestion,
    Warning,
    Error,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::Suggestion => "suggestion",
            WarningKind::Warning => "warning",
            WarningKind::Error => "error",
        }
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of metadata a field value holds
///
/// Rule evaluators select their rule set from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationKind {
    Album,
    Track,
    Artist,
    Label,
    Composer,
    Genre,
    Isrc,
    Upc,
    Copyright,
}

/// Extra context passed to rule evaluators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorOptions {
    /// 1-based track number when validating a track field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,

    /// Whether an artist-kind field names a composer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_composer: Option<bool>,
}

/// One quality-control finding for a field value
///
/// `id` must be stable for the same underlying issue across evaluation
/// passes; dismissal and acceptance are keyed on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WarningKind,
    /// Owning field identifier; stamped by the engine on every pass
    #[serde(default)]
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_group: Option<String>,
    /// Likelihood (0-100) a reviewer rejects the value while this is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_probability: Option<f64>,
}

impl Warning {
    /// Create a warning with no suggestion, group or rejection estimate
    pub fn new(
        id: impl Into<String>,
        kind: WarningKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            field: field.into(),
            message: message.into(),
            suggested_value: None,
            warning_group: None,
            rejection_probability: None,
        }
    }

    pub fn with_suggestion(mut self, value: impl Into<String>) -> Self {
        self.suggested_value = Some(value.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.warning_group = Some(group.into());
        self
    }

    /// Set the rejection estimate, clamped into 0-100
    pub fn with_rejection_probability(mut self, probability: f64) -> Self {
        self.rejection_probability = normalize_probability(Some(probability));
        self
    }

    /// Whether an "accept suggestion" action may target this warning
    pub fn has_suggestion(&self) -> bool {
        self.suggested_value.is_some()
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.warning_group.as_deref() == Some(group)
    }

    /// Normalize evaluator output for the field it was produced for
    ///
    /// The owning field is overwritten with `field_id` and rejection
    /// probabilities are clamped into 0-100 (NaN is dropped).
    pub(crate) fn normalized(mut self, field_id: &str) -> Self {
        if self.field != field_id {
            self.field = field_id.to_string();
        }
        self.rejection_probability = normalize_probability(self.rejection_probability);
        self
    }
}

fn normalize_probability(probability: Option<f64>) -> Option<f64> {
    probability
        .filter(|p| !p.is_nan())
        .map(|p| p.clamp(0.0, 100.0))
}
