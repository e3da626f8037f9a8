//! # WKMP Quality Control Library (wkmp-qc)
//!
//! Real-time field validation and remediation tracking for music release
//! metadata submission.
//!
//! **Purpose:** Debounce field edits into rule evaluations, keep the
//! authoritative set of active/dismissed/accepted warnings per field, offer
//! bulk group actions, and track how quickly a submitter works through the
//! issues.
//!
//! **Architecture:** A `QcEngine` facade over a single-mutex
//! `WarningRegistry`, a per-field `DebounceScheduler` of cancellable tokio
//! timers, and a `ProgressTracker` state machine. Observers subscribe to
//! `QcEvent`s on the shared `EventBus`.

pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod groups;
pub mod progress;
pub mod registry;
pub mod script;
pub mod summary;
pub mod warning;

pub use config::QcConfig;
pub use engine::QcEngine;
pub use error::{Error, Result};
pub use evaluator::{RuleEvaluator, TableEntry, TableEvaluator};
pub use progress::{ProgressAnalytics, ProgressSnapshot, ProgressTracker, TimeInsight};
pub use registry::WarningRegistry;
pub use summary::{BorderClass, SummaryAggregator, ValidationSummary};
pub use warning::{EvaluatorOptions, ValidationKind, Warning, WarningKind};
