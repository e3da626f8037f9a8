//! Quality-control engine facade
//!
//! Wires the warning registry, debounce scheduler, progress tracker and
//! event bus together behind the surface a submission form binds to.
//!
//! **Locking:** the registry sits behind one mutex. Every mutation takes it
//! once and holds it while emitting its event and reporting the new total,
//! so observers and the tracker see mutations in registry order. Lock order
//! is debounce slots, then registry, then tracker.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, info};
use wkmp_common::events::{EventBus, QcEvent};
use wkmp_common::{Clock, SystemClock};

use crate::config::QcConfig;
use crate::debounce::{DebounceScheduler, EvaluationSink};
use crate::evaluator::{evaluate_field, RuleEvaluator};
use crate::progress::ProgressTracker;
use crate::registry::WarningRegistry;
use crate::summary::{BorderClass, SummaryAggregator, ValidationSummary};
use crate::warning::{EvaluatorOptions, ValidationKind, Warning};

/// State shared between the engine and its debounce callbacks
struct Shared {
    registry: Mutex<WarningRegistry>,
    tracker: ProgressTracker,
    events: EventBus,
    clock: Arc<dyn Clock>,
    auto_report: bool,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, WarningRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store an evaluation pass and notify observers
    fn apply_pass(&self, field_id: &str, warnings: Vec<Warning>) -> usize {
        let mut registry = self.registry();
        let active_count = registry.update(field_id, warnings);
        let error_count = registry.field_state(field_id).map(|s| s.error_count()).unwrap_or(0);

        self.events.emit_lossy(QcEvent::FieldWarningsUpdated {
            field_id: field_id.to_string(),
            active_count,
            error_count,
            timestamp: self.clock.now(),
        });
        self.report_total(&registry);
        active_count
    }

    /// Feed the registry total to the tracker while a session is running
    ///
    /// Takes the locked registry so reports cannot overtake each other.
    fn report_total(&self, registry: &WarningRegistry) {
        if self.auto_report && self.tracker.is_tracking() {
            self.tracker.update_issue_count(registry.total_active() as i64, None);
        }
    }
}

/// Real-time field validation engine for one submission session
pub struct QcEngine {
    config: QcConfig,
    evaluator: Arc<dyn RuleEvaluator>,
    scheduler: DebounceScheduler,
    shared: Arc<Shared>,
}

impl QcEngine {
    /// Create an engine using the wall clock
    pub fn new(config: QcConfig, evaluator: Arc<dyn RuleEvaluator>) -> Self {
        Self::with_clock(config, evaluator, Arc::new(SystemClock))
    }

    /// Create an engine with an explicit clock (tests, replay)
    pub fn with_clock(config: QcConfig, evaluator: Arc<dyn RuleEvaluator>, clock: Arc<dyn Clock>) -> Self {
        let events = EventBus::new(config.event_capacity);
        let tracker = ProgressTracker::new(config.clone(), Arc::clone(&clock), events.clone());
        let shared = Arc::new(Shared {
            registry: Mutex::new(WarningRegistry::new()),
            tracker,
            events,
            clock,
            auto_report: config.auto_report_issue_count,
        });

        let sink_shared = Arc::clone(&shared);
        let sink: EvaluationSink = Arc::new(move |field_id: &str, warnings: Vec<Warning>| {
            sink_shared.apply_pass(field_id, warnings);
        });
        let scheduler = DebounceScheduler::new(config.debounce_delay(), Arc::clone(&evaluator), sink);

        info!(debounce_ms = config.debounce_ms, "Quality-control engine ready");
        Self {
            config,
            evaluator,
            scheduler,
            shared,
        }
    }

    pub fn config(&self) -> &QcConfig {
        &self.config
    }

    // ----- validation -----

    /// Schedule a debounced evaluation of `value` for `field_id`
    pub fn validate(&self, field_id: &str, value: &str, kind: ValidationKind, options: EvaluatorOptions) {
        self.scheduler.schedule(field_id, value, kind, options);
    }

    /// Evaluate immediately, superseding any pending debounced pass
    ///
    /// Returns the field's active warning count afterwards.
    pub fn validate_now(&self, field_id: &str, value: &str, kind: ValidationKind, options: EvaluatorOptions) -> usize {
        self.scheduler.cancel(field_id);
        let warnings = evaluate_field(self.evaluator.as_ref(), field_id, value, kind, &options);
        self.shared.apply_pass(field_id, warnings)
    }

    /// Number of armed debounce timers
    pub fn pending_validations(&self) -> usize {
        self.scheduler.pending_count()
    }

    // ----- queries -----

    pub fn get_field_warnings(&self, field_id: &str) -> Vec<Warning> {
        self.shared.registry().field_warnings(field_id).to_vec()
    }

    pub fn get_all_warnings(&self) -> Vec<Warning> {
        self.shared.registry().all_warnings()
    }

    pub fn get_warnings_by_group(&self, group: &str) -> Vec<Warning> {
        self.shared.registry().warnings_by_group(group)
    }

    pub fn get_summary(&self) -> ValidationSummary {
        SummaryAggregator::new(&self.shared.registry()).summary()
    }

    pub fn field_summary(&self, field_id: &str) -> ValidationSummary {
        SummaryAggregator::new(&self.shared.registry()).field_summary(field_id)
    }

    /// Whether any error is active, in one field or anywhere
    pub fn has_errors(&self, field_id: Option<&str>) -> bool {
        SummaryAggregator::new(&self.shared.registry()).has_errors(field_id)
    }

    pub fn get_input_border_class(&self, field_id: &str) -> BorderClass {
        SummaryAggregator::new(&self.shared.registry()).input_border_class(field_id)
    }

    pub fn is_dismissed(&self, field_id: &str, warning_id: &str) -> bool {
        self.shared.registry().is_dismissed(field_id, warning_id)
    }

    pub fn is_accepted(&self, field_id: &str, warning_id: &str) -> bool {
        self.shared.registry().is_accepted(field_id, warning_id)
    }

    /// Active warnings across all fields
    pub fn total_active(&self) -> usize {
        self.shared.registry().total_active()
    }

    // ----- user actions -----

    /// Dismiss one warning; returns whether an active warning was removed
    pub fn dismiss(&self, field_id: &str, warning_id: &str) -> bool {
        let mut registry = self.shared.registry();
        let removed = registry.dismiss(field_id, warning_id);

        if removed {
            self.shared.events.emit_lossy(QcEvent::WarningDismissed {
                field_id: field_id.to_string(),
                warning_id: warning_id.to_string(),
                timestamp: self.shared.clock.now(),
            });
            self.shared.report_total(&registry);
        }
        removed
    }

    /// Dismiss every active warning in `group`; returns how many were removed
    pub fn dismiss_group(&self, group: &str) -> usize {
        let mut registry = self.shared.registry();
        let dismissed = registry.dismiss_group(group).len();

        if dismissed > 0 {
            self.shared.events.emit_lossy(QcEvent::GroupDismissed {
                group: group.to_string(),
                dismissed_count: dismissed,
                timestamp: self.shared.clock.now(),
            });
            self.shared.report_total(&registry);
        }
        dismissed
    }

    /// Accept a warning's suggested value
    ///
    /// Returns the value to apply to the field, or `None` when the warning
    /// has no suggestion.
    pub fn accept_suggestion(&self, field_id: &str, warning: &Warning) -> Option<String> {
        let mut registry = self.shared.registry();
        let accepted = registry.accept_suggestion(field_id, warning);

        if let Some(value) = &accepted {
            self.shared.events.emit_lossy(QcEvent::SuggestionAccepted {
                field_id: field_id.to_string(),
                warning_id: warning.id.clone(),
                suggested_value: value.clone(),
                timestamp: self.shared.clock.now(),
            });
            self.shared.report_total(&registry);
        }
        accepted
    }

    /// Accept every suggestion in `group`; returns field → value to apply
    pub fn accept_all_in_group(&self, group: &str) -> BTreeMap<String, String> {
        let mut registry = self.shared.registry();
        let changes = registry.accept_all_in_group(group);

        if !changes.is_empty() {
            self.shared.events.emit_lossy(QcEvent::GroupAccepted {
                group: group.to_string(),
                changes: changes.clone(),
                timestamp: self.shared.clock.now(),
            });
            self.shared.report_total(&registry);
        }
        changes
    }

    /// Discard all validation state for a field, including a pending pass
    pub fn clear_field(&self, field_id: &str) -> bool {
        // Waits out a pass that already claimed its slot, then clears its result
        let cancelled = self.scheduler.cancel(field_id);
        let mut registry = self.shared.registry();
        let cleared = registry.clear_field(field_id);

        if cleared || cancelled {
            self.shared.events.emit_lossy(QcEvent::FieldCleared {
                field_id: field_id.to_string(),
                timestamp: self.shared.clock.now(),
            });
        }
        if cleared {
            self.shared.report_total(&registry);
        }
        cleared
    }

    // ----- progress -----

    pub fn tracker(&self) -> &ProgressTracker {
        &self.shared.tracker
    }

    /// Start a progress session seeded with the current active total
    pub fn begin_tracking(&self) {
        let total = self.total_active();
        self.shared.tracker.start_tracking(total as i64);
    }

    // ----- observers and lifecycle -----

    pub fn subscribe(&self) -> broadcast::Receiver<QcEvent> {
        self.shared.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Cancel every pending evaluation and stop the progress updater
    ///
    /// Safe to call more than once. Registry and history stay queryable.
    pub fn shutdown(&self) {
        let cancelled = self.scheduler.cancel_all();
        self.shared.tracker.stop_tracking();
        debug!(cancelled, "Quality-control engine shut down");
    }
}

impl Drop for QcEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
