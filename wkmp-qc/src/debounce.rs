//! Per-field debounced evaluation
//!
//! Coalesces rapid edits to a field into a single rule evaluation once the
//! field has been quiet for the configured delay.
//!
//! **Guarantees:**
//! - At most one armed timer per field; a new edit cancels the previous one
//! - The evaluation uses the most recent arguments for that field
//! - A cancelled timer never reaches the sink, and never runs the evaluator
//!   when cancelled before its delay elapses
//! - The sink runs while the field's slot is held, so `cancel` returning
//!   means no pass for that field is still in flight
//! - Fields are independent; cross-field firing order is unspecified

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::evaluator::{evaluate_field, RuleEvaluator};
use crate::warning::{EvaluatorOptions, ValidationKind, Warning};

/// Receives the warnings of a completed evaluation pass for a field
///
/// Called with the scheduler's slot lock held; it must not call back into
/// the scheduler.
pub type EvaluationSink = Arc<dyn Fn(&str, Vec<Warning>) + Send + Sync>;

/// One armed debounce timer
struct PendingTimer {
    /// Distinguishes this timer from a later one for the same field
    generation: u64,
    cancel: CancellationToken,
}

type PendingMap = Arc<Mutex<HashMap<String, PendingTimer>>>;

fn lock_pending(pending: &Mutex<HashMap<String, PendingTimer>>) -> MutexGuard<'_, HashMap<String, PendingTimer>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// Debounce scheduler owning one timer handle per field
pub struct DebounceScheduler {
    delay: Duration,
    evaluator: Arc<dyn RuleEvaluator>,
    sink: EvaluationSink,
    pending: PendingMap,
    next_generation: AtomicU64,
    fired: Arc<AtomicU64>,
}

impl DebounceScheduler {
    /// Create a scheduler evaluating with `evaluator` and forwarding results to `sink`
    pub fn new(delay: Duration, evaluator: Arc<dyn RuleEvaluator>, sink: EvaluationSink) -> Self {
        Self {
            delay,
            evaluator,
            sink,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            fired: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule an evaluation of `value` for `field_id`
    ///
    /// Cancels any timer already armed for the field. Outside a tokio
    /// runtime there is nothing to drive a timer, so the evaluation runs
    /// immediately.
    pub fn schedule(
        &self,
        field_id: &str,
        value: impl Into<String>,
        kind: ValidationKind,
        options: EvaluatorOptions,
    ) {
        let value = value.into();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!(field_id, "No async runtime, evaluating without debounce");
                self.cancel(field_id);
                self.fired.fetch_add(1, Ordering::Relaxed);
                let warnings = evaluate_field(self.evaluator.as_ref(), field_id, &value, kind, &options);
                (self.sink)(field_id, warnings);
                return;
            }
        };

        {
            let mut pending = lock_pending(&self.pending);
            let timer = PendingTimer {
                generation,
                cancel: cancel.clone(),
            };
            if let Some(previous) = pending.insert(field_id.to_string(), timer) {
                previous.cancel.cancel();
                trace!(field_id, "Superseded pending evaluation");
            }
        }

        let field_id = field_id.to_string();
        let delay = self.delay;
        let pending = Arc::clone(&self.pending);
        let evaluator = Arc::clone(&self.evaluator);
        let sink = Arc::clone(&self.sink);
        let fired = Arc::clone(&self.fired);

        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            fired.fetch_add(1, Ordering::Relaxed);
            debug!(field_id = %field_id, "Debounce elapsed, evaluating");
            let warnings = evaluate_field(evaluator.as_ref(), &field_id, &value, kind, &options);

            // Claim the slot and deliver under it; a newer timer or a
            // cancellation during evaluation discards the result
            let mut pending = lock_pending(&pending);
            match pending.get(&field_id) {
                Some(timer) if timer.generation == generation && !cancel.is_cancelled() => {
                    pending.remove(&field_id);
                }
                _ => {
                    debug!(field_id = %field_id, "Evaluation superseded, discarding result");
                    return;
                }
            }
            sink(&field_id, warnings);
        });
    }

    /// Cancel the pending evaluation for one field, if any
    ///
    /// Blocks while a pass for any field is being delivered to the sink.
    pub fn cancel(&self, field_id: &str) -> bool {
        let removed = lock_pending(&self.pending).remove(field_id);
        match removed {
            Some(timer) => {
                timer.cancel.cancel();
                debug!(field_id, "Pending evaluation cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending evaluation; none of them will fire
    ///
    /// Returns how many timers were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(String, PendingTimer)> = lock_pending(&self.pending).drain().collect();
        for (_, timer) in &drained {
            timer.cancel.cancel();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "Cancelled all pending evaluations");
        }
        drained.len()
    }

    /// Number of armed timers
    pub fn pending_count(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    pub fn is_pending(&self, field_id: &str) -> bool {
        lock_pending(&self.pending).contains_key(field_id)
    }

    /// Evaluations that have actually run since creation
    pub fn evaluations_fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
