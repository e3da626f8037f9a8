//! Session replay scripts
//!
//! A replay script is a recorded submission session: a lookup table standing
//! in for the rule set, plus timestamped user actions. Replaying it through
//! a [`QcEngine`] on a manual clock yields the same summary and progress
//! analytics the live session would have produced.

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wkmp_common::{Clock, ManualClock};

use crate::config::QcConfig;
use crate::engine::QcEngine;
use crate::error::{Error, Result};
use crate::evaluator::{TableEntry, TableEvaluator};
use crate::progress::{ProgressAnalytics, ProgressSnapshot, TimeInsight};
use crate::summary::ValidationSummary;
use crate::warning::{EvaluatorOptions, ValidationKind};

/// Recorded session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    /// Issue count to start tracking with; when absent, tracking starts with
    /// the registry total just before the first non-`validate` step
    #[serde(default)]
    pub initial_issue_count: Option<i64>,
    #[serde(default)]
    pub evaluations: Vec<TableEntry>,
    pub steps: Vec<Step>,
}

/// One user action at `at` seconds after session start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub at: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    Validate {
        field: String,
        value: String,
        kind: ValidationKind,
        #[serde(default)]
        options: EvaluatorOptions,
    },
    #[serde(rename_all = "camelCase")]
    Dismiss { field: String, warning_id: String },
    DismissGroup { group: String },
    #[serde(rename_all = "camelCase")]
    Accept { field: String, warning_id: String },
    AcceptGroup { group: String },
    Clear { field: String },
    Milestone {
        event: String,
        #[serde(default)]
        description: Option<String>,
    },
    Stop,
}

/// Final state after a replay
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub summary: ValidationSummary,
    pub snapshot: ProgressSnapshot,
    pub analytics: ProgressAnalytics,
    pub insights: Vec<TimeInsight>,
}

impl ReplayScript {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let script: ReplayScript = serde_json::from_str(content)?;
        script.check()?;
        Ok(script)
    }

    fn check(&self) -> Result<()> {
        for step in &self.steps {
            step_offset(step.at)?;
        }
        if let Some(pair) = self.steps.windows(2).find(|pair| pair[1].at < pair[0].at) {
            return Err(Error::Script(format!(
                "step at {}s follows step at {}s; steps must be in time order",
                pair[1].at, pair[0].at
            )));
        }
        Ok(())
    }

    /// Replay every step and report the final state
    pub fn run(&self, config: QcConfig) -> Result<ReplayReport> {
        self.check()?;

        let clock = Arc::new(ManualClock::default());
        let start = clock.now();
        let evaluator = Arc::new(TableEvaluator::new(self.evaluations.clone()));
        let engine = QcEngine::with_clock(config, evaluator, clock.clone());

        let mut tracking_started = false;
        if let Some(initial) = self.initial_issue_count {
            engine.tracker().start_tracking(initial);
            tracking_started = true;
        }

        for step in &self.steps {
            let at = start.checked_add_signed(step_offset(step.at)?).ok_or_else(|| {
                Error::Script(format!("step at {}s is beyond the representable date range", step.at))
            })?;
            clock.set(at);

            if !tracking_started && !matches!(step.action, Action::Validate { .. }) {
                engine.begin_tracking();
                tracking_started = true;
            }
            debug!(at = step.at, "Replaying {:?}", step.action);
            apply(&engine, &step.action);
        }

        let report = ReplayReport {
            summary: engine.get_summary(),
            snapshot: engine.tracker().snapshot(),
            analytics: engine.tracker().analytics(),
            insights: engine.tracker().time_insights(),
        };
        engine.shutdown();

        info!(
            steps = self.steps.len(),
            issues_fixed = report.snapshot.issues_fixed,
            "Replay complete"
        );
        Ok(report)
    }
}

/// Offset of a step from session start
fn step_offset(at: u64) -> Result<Duration> {
    i64::try_from(at)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| Error::Script(format!("step offset {}s is out of range", at)))
}

fn apply(engine: &QcEngine, action: &Action) {
    match action {
        Action::Validate {
            field,
            value,
            kind,
            options,
        } => {
            engine.validate_now(field, value, *kind, options.clone());
        }
        Action::Dismiss { field, warning_id } => {
            if !engine.dismiss(field, warning_id) {
                warn!(field = %field, warning_id = %warning_id, "Dismiss matched no active warning");
            }
        }
        Action::DismissGroup { group } => {
            engine.dismiss_group(group);
        }
        Action::Accept { field, warning_id } => {
            let target = engine
                .get_field_warnings(field)
                .into_iter()
                .find(|w| &w.id == warning_id);
            match target {
                Some(warning) => {
                    if engine.accept_suggestion(field, &warning).is_none() {
                        warn!(field = %field, warning_id = %warning_id, "Warning has no suggestion to accept");
                    }
                }
                None => warn!(field = %field, warning_id = %warning_id, "Accept matched no active warning"),
            }
        }
        Action::AcceptGroup { group } => {
            engine.accept_all_in_group(group);
        }
        Action::Clear { field } => {
            engine.clear_field(field);
        }
        Action::Milestone { event, description } => {
            engine.tracker().record_milestone(event, description.as_deref());
        }
        Action::Stop => engine.tracker().stop_tracking(),
    }
}
