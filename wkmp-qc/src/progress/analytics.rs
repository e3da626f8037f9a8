//! Progress analytics
//!
//! Pure functions over a [`ProgressSnapshot`]; recomputed on every query.

use serde::{Deserialize, Serialize};

use super::{Milestone, ProgressSnapshot};
use crate::config::QcConfig;

/// Direction of the fix rate over the recent milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImprovementTrend {
    Accelerating,
    Steady,
    Slowing,
}

impl ImprovementTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImprovementTrend::Accelerating => "accelerating",
            ImprovementTrend::Steady => "steady",
            ImprovementTrend::Slowing => "slowing",
        }
    }
}

/// Derived session metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressAnalytics {
    /// Issues fixed per minute
    pub velocity: f64,
    pub improvement_trend: ImprovementTrend,
    /// `min(100, round(velocity / baseline * 100))`
    pub efficiency_score: u32,
    /// Seconds from session start to the first milestone below the initial
    /// count, 0 until a fix happens
    pub time_to_first_fix: u64,
    /// Seconds per fixed issue, 0 when nothing is fixed
    pub avg_time_per_fix: u64,
    pub progress_percentage: u32,
}

impl ProgressAnalytics {
    pub fn compute(snapshot: &ProgressSnapshot, config: &QcConfig) -> Self {
        Self {
            velocity: snapshot.velocity,
            improvement_trend: improvement_trend(&snapshot.milestones, config),
            efficiency_score: efficiency_score(snapshot.velocity, config.velocity_baseline_per_min),
            time_to_first_fix: time_to_first_fix(snapshot),
            avg_time_per_fix: avg_time_per_fix(snapshot),
            progress_percentage: progress_percentage(snapshot),
        }
    }
}

/// Share of the initial issues fixed; 100 for a session that started clean
pub fn progress_percentage(snapshot: &ProgressSnapshot) -> u32 {
    if snapshot.initial_issue_count == 0 {
        return 100;
    }
    let ratio = snapshot.issues_fixed as f64 / snapshot.initial_issue_count as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u32
}

pub fn efficiency_score(velocity: f64, baseline_per_min: f64) -> u32 {
    if !(velocity.is_finite() && velocity > 0.0 && baseline_per_min > 0.0) {
        return 0;
    }
    (velocity / baseline_per_min * 100.0).round().min(100.0) as u32
}

pub fn time_to_first_fix(snapshot: &ProgressSnapshot) -> u64 {
    snapshot
        .milestones
        .iter()
        .find(|m| m.issue_count < snapshot.initial_issue_count)
        .map(|m| (m.timestamp - snapshot.session_start).num_seconds().max(0) as u64)
        .unwrap_or(0)
}

pub fn avg_time_per_fix(snapshot: &ProgressSnapshot) -> u64 {
    if snapshot.issues_fixed == 0 {
        return 0;
    }
    (snapshot.time_spent_seconds as f64 / snapshot.issues_fixed as f64).round() as u64
}

/// Classify the trend from the last `trend_window` milestones
///
/// The window is split into two halves sharing the middle milestone, so
/// each half spans at least two points, and the fix rate (issues per minute
/// between the first and last milestone of each half) compared. Fewer than
/// three milestones is always steady.
pub fn improvement_trend(milestones: &[Milestone], config: &QcConfig) -> ImprovementTrend {
    let window = config.trend_window.max(3);
    let recent = &milestones[milestones.len().saturating_sub(window)..];
    if recent.len() < 3 {
        return ImprovementTrend::Steady;
    }

    let mid = recent.len() / 2;
    let first_rate = half_rate(&recent[..=mid]);
    let second_rate = half_rate(&recent[mid..]);

    if first_rate <= 0.0 {
        return if second_rate > 0.0 {
            ImprovementTrend::Accelerating
        } else {
            ImprovementTrend::Steady
        };
    }

    let ratio = second_rate / first_rate;
    if ratio > config.accelerating_ratio {
        ImprovementTrend::Accelerating
    } else if ratio < config.slowing_ratio {
        ImprovementTrend::Slowing
    } else {
        ImprovementTrend::Steady
    }
}

/// Issues fixed per minute across a run of milestones
fn half_rate(half: &[Milestone]) -> f64 {
    let (Some(first), Some(last)) = (half.first(), half.last()) else {
        return 0.0;
    };
    let span_secs = (last.timestamp - first.timestamp).num_seconds();
    if span_secs <= 0 {
        return 0.0;
    }
    let fixed = first.issue_count as f64 - last.issue_count as f64;
    fixed / (span_secs as f64 / 60.0)
}
