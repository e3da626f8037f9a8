//! Advisory time insights
//!
//! Short hints for the submitter derived from analytics thresholds.
//! Order is stable: tips first, then encouragement.

use serde::{Deserialize, Serialize};
use wkmp_common::human_time::{format_elapsed, format_rate_per_minute};

use super::analytics::{ImprovementTrend, ProgressAnalytics};
use super::ProgressSnapshot;
use crate::config::QcConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Tip,
    Encouragement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInsight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub message: String,
}

impl TimeInsight {
    fn tip(message: String) -> Self {
        Self {
            kind: InsightKind::Tip,
            message,
        }
    }

    fn encouragement(message: String) -> Self {
        Self {
            kind: InsightKind::Encouragement,
            message,
        }
    }
}

pub fn derive(snapshot: &ProgressSnapshot, analytics: &ProgressAnalytics, config: &QcConfig) -> Vec<TimeInsight> {
    let mut tips = Vec::new();
    let mut encouragement = Vec::new();

    if snapshot.issues_fixed == 0 {
        if snapshot.initial_issue_count > 0 && snapshot.time_spent_seconds > config.slow_first_fix_secs {
            tips.push(TimeInsight::tip(format!(
                "No issues fixed after {}. Start with errors: they block submission.",
                format_elapsed(snapshot.time_spent_seconds)
            )));
        }
    } else if analytics.time_to_first_fix > config.slow_first_fix_secs {
        tips.push(TimeInsight::tip(format!(
            "The first fix took {}. Start with errors: they block submission.",
            format_elapsed(analytics.time_to_first_fix)
        )));
    }

    if analytics.avg_time_per_fix > config.slow_fix_secs {
        tips.push(TimeInsight::tip(format!(
            "Each fix takes {} on average. Accepting suggested values is faster than editing by hand.",
            format_elapsed(analytics.avg_time_per_fix)
        )));
    }

    match analytics.improvement_trend {
        ImprovementTrend::Slowing => tips.push(TimeInsight::tip(
            "Progress is slowing. Group actions can resolve related issues in one step.".to_string(),
        )),
        ImprovementTrend::Accelerating => encouragement.push(TimeInsight::encouragement(format!(
            "You're picking up pace at {}.",
            format_rate_per_minute(analytics.velocity)
        ))),
        ImprovementTrend::Steady => {}
    }

    if snapshot.initial_issue_count > 0 && snapshot.current_issue_count == 0 {
        encouragement.push(TimeInsight::encouragement(format!(
            "All {} issues resolved in {}.",
            snapshot.initial_issue_count,
            format_elapsed(snapshot.time_spent_seconds)
        )));
    } else if analytics.efficiency_score >= 100 {
        encouragement.push(TimeInsight::encouragement(format!(
            "Fixing issues at {}, well above the usual pace.",
            format_rate_per_minute(analytics.velocity)
        )));
    }

    tips.extend(encouragement);
    tips
}
