//! Event types for the WKMP quality-control event system
//!
//! Provides shared event definitions and EventBus for observers of a
//! submission session (UI bindings, loggers, replay tooling).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Quality-control event types
///
/// Events are broadcast via EventBus and can be serialized for delivery to
/// whatever UI layer is subscribed. The engine never waits on a subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QcEvent {
    /// Active warnings for a field were replaced by a new evaluation pass
    ///
    /// Triggers:
    /// - UI: Re-read field warnings and border hint
    /// - Progress: Report new total issue count
    FieldWarningsUpdated {
        /// Field identifier
        field_id: String,
        /// Active warnings after dismissed/accepted filtering
        active_count: usize,
        /// Active warnings of kind `error`
        error_count: usize,
        /// When the update was applied
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A single warning was dismissed by the user
    WarningDismissed {
        field_id: String,
        warning_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every active warning in a group was dismissed
    GroupDismissed {
        /// Warning group key (e.g. "capitalization")
        group: String,
        /// Number of warnings removed across all fields
        dismissed_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A warning's suggested value was accepted
    ///
    /// Triggers:
    /// - UI: Apply `suggested_value` to the field input
    SuggestionAccepted {
        field_id: String,
        warning_id: String,
        suggested_value: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every suggestion-bearing warning in a group was accepted
    GroupAccepted {
        group: String,
        /// Field identifier → value to apply (one entry per field)
        changes: BTreeMap<String, String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All validation state for a field was discarded
    FieldCleared {
        field_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress tracking began for a session
    TrackingStarted {
        session_id: Uuid,
        initial_issue_count: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress tracking stopped (history remains queryable)
    TrackingStopped {
        session_id: Uuid,
        issues_fixed: u32,
        time_spent_seconds: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Remaining issue count changed
    IssueCountChanged {
        session_id: Uuid,
        previous_count: u32,
        current_count: u32,
        issues_fixed: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A progress milestone was appended
    MilestoneRecorded {
        session_id: Uuid,
        event: String,
        issue_count: u32,
        description: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl QcEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            QcEvent::FieldWarningsUpdated { .. } => "FieldWarningsUpdated",
            QcEvent::WarningDismissed { .. } => "WarningDismissed",
            QcEvent::GroupDismissed { .. } => "GroupDismissed",
            QcEvent::SuggestionAccepted { .. } => "SuggestionAccepted",
            QcEvent::GroupAccepted { .. } => "GroupAccepted",
            QcEvent::FieldCleared { .. } => "FieldCleared",
            QcEvent::TrackingStarted { .. } => "TrackingStarted",
            QcEvent::TrackingStopped { .. } => "TrackingStopped",
            QcEvent::IssueCountChanged { .. } => "IssueCountChanged",
            QcEvent::MilestoneRecorded { .. } => "MilestoneRecorded",
        }
    }

    /// Field this event concerns, if it is field-scoped
    pub fn field_id(&self) -> Option<&str> {
        match self {
            QcEvent::FieldWarningsUpdated { field_id, .. }
            | QcEvent::WarningDismissed { field_id, .. }
            | QcEvent::SuggestionAccepted { field_id, .. }
            | QcEvent::FieldCleared { field_id, .. } => Some(field_id),
            _ => None,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for session events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use wkmp_common::events::{EventBus, QcEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(QcEvent::FieldCleared {
///     field_id: "albumTitle".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.event_type(), "FieldCleared");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<QcEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered before the oldest are
    /// dropped for lagging subscribers. Zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<QcEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: QcEvent) -> Result<usize, broadcast::error::SendError<QcEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: QcEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
