//! Session progress tracking
//!
//! Tracks the remaining-issue count of one submission session over time,
//! records milestones and derives velocity/trend/efficiency analytics.
//!
//! **State machine:** `Idle` ⇄ `Tracking`. `start_tracking` (re)starts a
//! session; `stop_tracking` halts the elapsed-time updater but keeps the
//! history queryable. Count updates and milestones outside `Tracking` are
//! ignored.

pub mod analytics;
pub mod insights;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;
use wkmp_common::events::{EventBus, QcEvent};
use wkmp_common::Clock;

use crate::config::QcConfig;

pub use analytics::{ImprovementTrend, ProgressAnalytics};
pub use insights::{InsightKind, TimeInsight};

/// Milestone event name recorded by `start_tracking`
pub const SESSION_START: &str = "session_start";
/// Milestone event name for a count decrease with no explicit event
pub const ISSUE_FIXED: &str = "issue_fixed";
/// Milestone event name for a count increase with no explicit event
pub const ISSUE_ADDED: &str = "issue_added";
/// Milestone event name for an unchanged count with no explicit event
pub const COUNT_UPDATE: &str = "count_update";

/// Tracker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    Idle,
    Tracking,
}

/// Timestamped snapshot of the remaining-issue count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub issue_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Session-level progress state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub session_id: Uuid,
    pub session_start: DateTime<Utc>,
    pub initial_issue_count: u32,
    pub current_issue_count: u32,
    /// `max(0, initial - current)`
    pub issues_fixed: u32,
    /// Never decreases while tracking
    pub time_spent_seconds: u64,
    /// Issues fixed per minute of session time
    pub velocity: f64,
    pub milestones: Vec<Milestone>,
}

impl ProgressSnapshot {
    fn new(initial_issue_count: u32, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            session_start: now,
            initial_issue_count,
            current_issue_count: initial_issue_count,
            issues_fixed: 0,
            time_spent_seconds: 0,
            velocity: 0.0,
            milestones: Vec::new(),
        }
    }

    /// Snapshot reported before any session was started
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::nil(),
            ..Self::new(0, now)
        }
    }

    /// Advance elapsed time to `now`, never moving it backwards
    fn refresh_elapsed(&mut self, now: DateTime<Utc>) {
        let elapsed = (now - self.session_start).num_seconds().max(0) as u64;
        self.time_spent_seconds = self.time_spent_seconds.max(elapsed);
    }

    fn recompute_velocity(&mut self) {
        self.velocity = if self.time_spent_seconds > 0 {
            self.issues_fixed as f64 / (self.time_spent_seconds as f64 / 60.0)
        } else {
            0.0
        };
    }

    fn push_milestone(&mut self, now: DateTime<Utc>, event: &str, description: Option<String>) -> Milestone {
        let milestone = Milestone {
            timestamp: now,
            event: event.to_string(),
            issue_count: self.current_issue_count,
            description,
        };
        self.milestones.push(milestone.clone());
        milestone
    }
}

/// Clamp an externally supplied count into the tracked range
pub(crate) fn normalize_count(count: i64) -> u32 {
    if count < 0 {
        warn!(count, "Negative issue count clamped to 0");
        0
    } else {
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

struct TrackerInner {
    state: TrackingState,
    snapshot: Option<ProgressSnapshot>,
    ticker: Option<CancellationToken>,
}

/// Counts live elapsed-time updater tasks; decremented when a task exits
struct UpdaterGuard(Arc<AtomicUsize>);

impl Drop for UpdaterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Session progress tracker
///
/// Cheap to share behind an `Arc`; all state lives behind one mutex so the
/// periodic updater and UI calls never interleave mid-update.
pub struct ProgressTracker {
    config: QcConfig,
    clock: Arc<dyn Clock>,
    events: EventBus,
    inner: Arc<Mutex<TrackerInner>>,
    live_updaters: Arc<AtomicUsize>,
}

impl ProgressTracker {
    pub fn new(config: QcConfig, clock: Arc<dyn Clock>, events: EventBus) -> Self {
        Self {
            config,
            clock,
            events,
            inner: Arc::new(Mutex::new(TrackerInner {
                state: TrackingState::Idle,
                snapshot: None,
                ticker: None,
            })),
            live_updaters: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Begin a new session with `initial_issue_count` outstanding issues
    ///
    /// Starting while already tracking discards the running session.
    pub fn start_tracking(&self, initial_issue_count: i64) {
        let initial = normalize_count(initial_issue_count);
        let now = self.clock.now();

        let (session_id, milestone) = {
            let mut inner = self.lock();
            if let Some(previous) = inner.ticker.take() {
                debug!("Restarting progress tracking, previous session discarded");
                previous.cancel();
            }

            let mut snapshot = ProgressSnapshot::new(initial, now);
            let milestone = snapshot.push_milestone(now, SESSION_START, None);
            let session_id = snapshot.session_id;
            inner.snapshot = Some(snapshot);
            inner.state = TrackingState::Tracking;
            inner.ticker = self.spawn_updater();
            (session_id, milestone)
        };

        info!(%session_id, initial_issue_count = initial, "Progress tracking started");
        self.events.emit_lossy(QcEvent::TrackingStarted {
            session_id,
            initial_issue_count: initial,
            timestamp: now,
        });
        self.emit_milestone(session_id, milestone);
    }

    /// Stop the elapsed-time updater; history stays queryable
    pub fn stop_tracking(&self) {
        let now = self.clock.now();
        let stopped = {
            let mut inner = self.lock();
            if inner.state != TrackingState::Tracking {
                return;
            }
            if let Some(ticker) = inner.ticker.take() {
                ticker.cancel();
            }
            inner.state = TrackingState::Idle;
            inner.snapshot.as_mut().map(|snapshot| {
                snapshot.refresh_elapsed(now);
                (snapshot.session_id, snapshot.issues_fixed, snapshot.time_spent_seconds)
            })
        };

        if let Some((session_id, issues_fixed, time_spent_seconds)) = stopped {
            info!(%session_id, issues_fixed, time_spent_seconds, "Progress tracking stopped");
            self.events.emit_lossy(QcEvent::TrackingStopped {
                session_id,
                issues_fixed,
                time_spent_seconds,
                timestamp: now,
            });
        }
    }

    /// Report the current remaining-issue count
    ///
    /// Recomputes fixed count, elapsed time and velocity. A milestone is
    /// appended when `event` is given, the count changed, or no milestone
    /// exists yet. Ignored unless tracking.
    pub fn update_issue_count(&self, new_count: i64, event: Option<&str>) {
        let count = normalize_count(new_count);
        let now = self.clock.now();

        let (session_id, previous, issues_fixed, milestone) = {
            let mut inner = self.lock();
            if inner.state != TrackingState::Tracking {
                debug!(count, "Issue count update while idle ignored");
                return;
            }
            let Some(snapshot) = inner.snapshot.as_mut() else {
                return;
            };

            let previous = snapshot.current_issue_count;
            snapshot.current_issue_count = count;
            snapshot.issues_fixed = snapshot.initial_issue_count.saturating_sub(count);
            snapshot.refresh_elapsed(now);
            snapshot.recompute_velocity();

            let changed = previous != count;
            let milestone = if event.is_some() || changed || snapshot.milestones.is_empty() {
                let name = event.unwrap_or(if count < previous {
                    ISSUE_FIXED
                } else if count > previous {
                    ISSUE_ADDED
                } else {
                    COUNT_UPDATE
                });
                Some(snapshot.push_milestone(now, name, None))
            } else {
                None
            };

            (snapshot.session_id, previous, snapshot.issues_fixed, milestone)
        };

        if previous != count {
            debug!(previous, current = count, issues_fixed, "Issue count changed");
            self.events.emit_lossy(QcEvent::IssueCountChanged {
                session_id,
                previous_count: previous,
                current_count: count,
                issues_fixed,
                timestamp: now,
            });
        }
        if let Some(milestone) = milestone {
            self.emit_milestone(session_id, milestone);
        }
    }

    /// Append a milestone without touching counts (e.g. "help_requested")
    ///
    /// Ignored unless tracking.
    pub fn record_milestone(&self, event: &str, description: Option<&str>) {
        let now = self.clock.now();
        let recorded = {
            let mut inner = self.lock();
            if inner.state != TrackingState::Tracking {
                debug!(event, "Milestone while idle ignored");
                return;
            }
            inner.snapshot.as_mut().map(|snapshot| {
                snapshot.refresh_elapsed(now);
                let milestone = snapshot.push_milestone(now, event, description.map(str::to_string));
                (snapshot.session_id, milestone)
            })
        };

        if let Some((session_id, milestone)) = recorded {
            self.emit_milestone(session_id, milestone);
        }
    }

    /// Clone of the current session state
    ///
    /// Before any session was started this is an all-zero snapshot with a
    /// nil session id.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let inner = self.lock();
        inner
            .snapshot
            .clone()
            .unwrap_or_else(|| ProgressSnapshot::empty(self.clock.now()))
    }

    pub fn state(&self) -> TrackingState {
        self.lock().state
    }

    pub fn is_tracking(&self) -> bool {
        self.state() == TrackingState::Tracking
    }

    /// Derived velocity/trend/efficiency metrics
    pub fn analytics(&self) -> ProgressAnalytics {
        ProgressAnalytics::compute(&self.snapshot(), &self.config)
    }

    /// Share of the initial issues fixed, 0-100
    ///
    /// 100 when the session started with no issues; 0 before any session.
    pub fn progress_percentage(&self) -> u32 {
        let inner = self.lock();
        match inner.snapshot.as_ref() {
            Some(snapshot) => analytics::progress_percentage(snapshot),
            None => 0,
        }
    }

    /// Advisory hints derived from the analytics thresholds
    pub fn time_insights(&self) -> Vec<TimeInsight> {
        let snapshot = self.snapshot();
        let analytics = ProgressAnalytics::compute(&snapshot, &self.config);
        insights::derive(&snapshot, &analytics, &self.config)
    }

    /// Number of elapsed-time updater tasks still alive
    pub fn live_updaters(&self) -> usize {
        self.live_updaters.load(Ordering::SeqCst)
    }

    fn emit_milestone(&self, session_id: Uuid, milestone: Milestone) {
        trace!(event = %milestone.event, issue_count = milestone.issue_count, "Milestone recorded");
        self.events.emit_lossy(QcEvent::MilestoneRecorded {
            session_id,
            event: milestone.event,
            issue_count: milestone.issue_count,
            description: milestone.description,
            timestamp: milestone.timestamp,
        });
    }

    /// Start the periodic elapsed-time updater
    ///
    /// Returns `None` outside a tokio runtime; elapsed time is then only
    /// refreshed by explicit updates.
    fn spawn_updater(&self) -> Option<CancellationToken> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("No async runtime, elapsed-time updater not started");
                return None;
            }
        };

        let token = CancellationToken::new();
        let cancel = token.clone();
        let inner = Arc::clone(&self.inner);
        let clock = Arc::clone(&self.clock);
        let period = self.config.tick_interval();

        self.live_updaters.fetch_add(1, Ordering::SeqCst);
        let guard = UpdaterGuard(Arc::clone(&self.live_updaters));

        handle.spawn(async move {
            let _guard = guard;
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick completes immediately
            timer.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => {}
                }

                let mut state = inner.lock().unwrap_or_else(|e| e.into_inner());
                if state.state != TrackingState::Tracking {
                    break;
                }
                if let Some(snapshot) = state.snapshot.as_mut() {
                    snapshot.refresh_elapsed(clock.now());
                    trace!(time_spent_seconds = snapshot.time_spent_seconds, "Elapsed time tick");
                }
            }
        });

        Some(token)
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        if let Some(ticker) = self.lock().ticker.take() {
            ticker.cancel();
        }
    }
}
