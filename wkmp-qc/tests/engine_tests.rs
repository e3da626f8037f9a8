//! End-to-end tests for the quality-control engine
//!
//! Drives `QcEngine` the way a submission form would: debounced edits,
//! user resolutions, group actions and progress tracking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wkmp_common::events::QcEvent;
use wkmp_common::ManualClock;
use wkmp_qc::progress::ImprovementTrend;
use wkmp_qc::{
    BorderClass, EvaluatorOptions, QcConfig, QcEngine, RuleEvaluator, TableEvaluator, ValidationKind,
    Warning, WarningKind,
};

fn album_rules() -> TableEvaluator {
    TableEvaluator::default()
        .with_entry(
            "my   album",
            vec![Warning::new("w-dbl-space", WarningKind::Warning, "", "double spaces")
                .with_suggestion("my album")
                .with_group("spacing")],
        )
        .with_entry(
            "intro",
            vec![
                Warning::new("w-caps", WarningKind::Suggestion, "", "capitalize first letter")
                    .with_suggestion("Intro")
                    .with_group("capitalization"),
                Warning::new("w-live", WarningKind::Error, "", "missing live annotation")
                    .with_rejection_probability(90.0),
            ],
        )
        .with_entry(
            "outro",
            vec![Warning::new("w-caps", WarningKind::Suggestion, "", "capitalize first letter")
                .with_suggestion("Outro")
                .with_group("capitalization")],
        )
}

fn new_engine() -> (QcEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let engine = QcEngine::with_clock(QcConfig::default(), Arc::new(album_rules()), clock.clone());
    (engine, clock)
}

#[tokio::test(start_paused = true)]
async fn test_album_title_scenario() {
    let (engine, _clock) = new_engine();

    engine.validate("albumTitle", "my   album", ValidationKind::Album, EvaluatorOptions::default());
    assert_eq!(engine.pending_validations(), 1);
    assert!(engine.get_field_warnings("albumTitle").is_empty());

    tokio::time::sleep(Duration::from_millis(350)).await;

    let warnings = engine.get_field_warnings("albumTitle");
    assert_eq!(warnings.len(), 1);
    let warning = warnings[0].clone();
    assert_eq!(warning.id, "w-dbl-space");
    assert_eq!(warning.field, "albumTitle");
    assert_eq!(warning.warning_group.as_deref(), Some("spacing"));

    assert_eq!(engine.accept_suggestion("albumTitle", &warning).as_deref(), Some("my album"));

    // The evaluator still reports the issue for the old value
    engine.validate("albumTitle", "my   album", ValidationKind::Album, EvaluatorOptions::default());
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(engine.get_field_warnings("albumTitle").is_empty());
    assert_eq!(engine.get_input_border_class("albumTitle"), BorderClass::None);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_evaluate_once() {
    let (engine, _clock) = new_engine();
    let mut rx = engine.subscribe();

    for value in ["m", "my", "my  ", "my   album"] {
        engine.validate("albumTitle", value, ValidationKind::Album, EvaluatorOptions::default());
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    let mut updates = 0;
    while let Ok(event) = rx.try_recv() {
        if let QcEvent::FieldWarningsUpdated { field_id, active_count, .. } = event {
            assert_eq!(field_id, "albumTitle");
            assert_eq!(active_count, 1);
            updates += 1;
        }
    }
    assert_eq!(updates, 1);
}

#[tokio::test(start_paused = true)]
async fn test_clear_field_cancels_pending_evaluation() {
    let (engine, _clock) = new_engine();
    engine.validate_now("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());
    engine.validate("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());

    assert!(engine.clear_field("track1"));
    assert_eq!(engine.pending_validations(), 0);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(engine.get_field_warnings("track1").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_everything() {
    let (engine, _clock) = new_engine();
    engine.validate("a", "intro", ValidationKind::Track, EvaluatorOptions::default());
    engine.validate("b", "outro", ValidationKind::Track, EvaluatorOptions::default());
    engine.begin_tracking();
    assert_eq!(engine.tracker().live_updaters(), 1);

    engine.shutdown();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(engine.pending_validations(), 0);
    assert!(engine.get_all_warnings().is_empty());
    assert_eq!(engine.tracker().live_updaters(), 0);
}

#[test]
fn test_group_accept_one_change_per_field() {
    let (engine, _clock) = new_engine();
    engine.validate_now("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());
    engine.validate_now("track2", "outro", ValidationKind::Track, EvaluatorOptions::default());
    assert_eq!(engine.get_warnings_by_group("capitalization").len(), 2);

    let changes = engine.accept_all_in_group("capitalization");
    assert_eq!(changes.len(), 2);
    assert_eq!(changes["track1"], "Intro");
    assert_eq!(changes["track2"], "Outro");
    assert!(engine.get_warnings_by_group("capitalization").is_empty());

    // Ungrouped error is untouched
    assert_eq!(engine.get_field_warnings("track1")[0].id, "w-live");
    assert!(engine.has_errors(Some("track1")));
    assert!(!engine.has_errors(Some("track2")));
}

#[test]
fn test_dismissals_are_idempotent_and_sticky() {
    let (engine, _clock) = new_engine();
    engine.validate_now("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());

    assert!(engine.dismiss("track1", "w-live"));
    assert!(!engine.dismiss("track1", "w-live"));
    assert!(engine.is_dismissed("track1", "w-live"));

    engine.validate_now("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());
    let ids: Vec<String> = engine.get_field_warnings("track1").into_iter().map(|w| w.id).collect();
    assert_eq!(ids, vec!["w-caps"]);
    assert!(!engine.has_errors(None));
}

#[test]
fn test_summary_and_border_classes() {
    let (engine, _clock) = new_engine();
    engine.validate_now("albumTitle", "my   album", ValidationKind::Album, EvaluatorOptions::default());
    engine.validate_now("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());

    let summary = engine.get_summary();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.warnings, 1);
    assert_eq!(summary.suggestions, 1);
    assert_eq!(summary.avg_rejection_probability, 90.0);

    assert_eq!(engine.get_input_border_class("albumTitle"), BorderClass::Warning);
    assert_eq!(engine.get_input_border_class("track1"), BorderClass::Error);
    assert_eq!(engine.field_summary("track1").total, 2);
}

#[test]
fn test_dismiss_group_across_fields() {
    let (engine, _clock) = new_engine();
    engine.validate_now("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());
    engine.validate_now("track2", "outro", ValidationKind::Track, EvaluatorOptions::default());

    assert_eq!(engine.dismiss_group("capitalization"), 2);
    assert!(engine.is_dismissed("track2", "w-caps"));
    assert_eq!(engine.get_summary().total, 1);
}

#[test]
fn test_progress_follows_remediation() {
    let (engine, clock) = new_engine();
    engine.validate_now("albumTitle", "my   album", ValidationKind::Album, EvaluatorOptions::default());
    engine.validate_now("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());
    engine.validate_now("track2", "outro", ValidationKind::Track, EvaluatorOptions::default());
    engine.begin_tracking();
    assert_eq!(engine.tracker().snapshot().initial_issue_count, 4);

    clock.advance_secs(60);
    engine.dismiss("track1", "w-live");
    clock.advance_secs(60);
    engine.accept_all_in_group("capitalization");

    let snapshot = engine.tracker().snapshot();
    assert_eq!(snapshot.current_issue_count, 1);
    assert_eq!(snapshot.issues_fixed, 3);
    assert_eq!(snapshot.time_spent_seconds, 120);
    assert_eq!(snapshot.velocity, 1.5);

    let analytics = engine.tracker().analytics();
    assert_eq!(analytics.progress_percentage, 75);
    assert_eq!(analytics.efficiency_score, 100);
    assert_eq!(analytics.time_to_first_fix, 60);
    assert_eq!(analytics.avg_time_per_fix, 40);
}

#[test]
fn test_tracker_progress_math() {
    let (engine, clock) = new_engine();
    let tracker = engine.tracker();
    tracker.start_tracking(10);
    clock.advance_secs(30);
    tracker.update_issue_count(4, None);

    assert_eq!(tracker.snapshot().issues_fixed, 6);
    assert_eq!(tracker.progress_percentage(), 60);
}

#[test]
fn test_tracker_accelerating_trend() {
    let (engine, clock) = new_engine();
    let tracker = engine.tracker();
    tracker.start_tracking(10);
    clock.advance_secs(60);
    tracker.update_issue_count(9, None);
    clock.advance_secs(30);
    tracker.update_issue_count(7, None);
    clock.advance_secs(10);
    tracker.update_issue_count(2, None);

    assert_eq!(tracker.analytics().improvement_trend, ImprovementTrend::Accelerating);
    assert!(tracker
        .time_insights()
        .iter()
        .any(|insight| insight.message.contains("picking up pace")));
}

#[test]
fn test_tracker_zero_division_safety() {
    let (engine, _clock) = new_engine();
    let tracker = engine.tracker();
    tracker.start_tracking(0);
    assert_eq!(tracker.progress_percentage(), 100);

    tracker.start_tracking(5);
    let analytics = tracker.analytics();
    assert_eq!(analytics.avg_time_per_fix, 0);
    assert_eq!(analytics.velocity, 0.0);
    assert_eq!(analytics.efficiency_score, 0);
}

#[test]
fn test_tracker_time_to_first_fix_zero_until_fixed() {
    let (engine, clock) = new_engine();
    let tracker = engine.tracker();
    tracker.start_tracking(3);
    clock.advance_secs(45);
    tracker.record_milestone("help_requested", None);

    let json = serde_json::to_value(tracker.analytics()).unwrap();
    assert_eq!(json["timeToFirstFix"], 0);

    tracker.update_issue_count(2, None);
    assert_eq!(tracker.analytics().time_to_first_fix, 45);
}

#[test]
fn test_tracker_slowing_trend_with_three_milestones() {
    let (engine, clock) = new_engine();
    let tracker = engine.tracker();
    tracker.start_tracking(10);
    clock.advance_secs(10);
    tracker.update_issue_count(5, None);
    clock.advance_secs(600);
    tracker.update_issue_count(4, None);

    assert_eq!(tracker.analytics().improvement_trend, ImprovementTrend::Slowing);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clear_field_during_evaluation_stays_clear() {
    let started = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&started);
    let evaluator: Arc<dyn RuleEvaluator> = Arc::new(
        move |value: &str, _kind: ValidationKind, _options: &EvaluatorOptions| -> wkmp_common::Result<Vec<Warning>> {
            flag.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            Ok(vec![Warning::new("w-slow", WarningKind::Error, "", value)])
        },
    );
    let config = QcConfig {
        debounce_ms: 10,
        ..QcConfig::default()
    };
    let engine = QcEngine::with_clock(config, evaluator, Arc::new(ManualClock::default()));

    engine.validate("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());
    while !started.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    engine.clear_field("track1");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(engine.get_field_warnings("track1").is_empty());
    assert!(!engine.has_errors(None));
}

#[test]
fn test_tracker_sees_totals_in_mutation_order() {
    let (engine, clock) = new_engine();
    engine.validate_now("albumTitle", "my   album", ValidationKind::Album, EvaluatorOptions::default());
    engine.validate_now("track1", "intro", ValidationKind::Track, EvaluatorOptions::default());
    engine.begin_tracking();

    clock.advance_secs(10);
    engine.dismiss("track1", "w-live");
    clock.advance_secs(10);
    engine.dismiss("albumTitle", "w-dbl-space");

    let counts: Vec<u32> = engine
        .tracker()
        .snapshot()
        .milestones
        .iter()
        .map(|m| m.issue_count)
        .collect();
    assert_eq!(counts, vec![3, 2, 1]);
}
