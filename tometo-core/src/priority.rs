//! Deterministic priority scoring for board tasks.
//!
//! Additive model with fixed weights:
//! - importance: up to 35 points (`importance / 5 * 35`)
//! - urgency: up to 25 points (`urgency / 5 * 25`)
//! - due date proximity: 30 / 20 / 10 / 5 points, 0 without a due date
//! - effort: minus 2 per Pomodoro beyond the first, at most minus 10
//! - blocker label: plus 20
//!
//! The sum is clamped to 0..=100 and rounded half away from zero. The label
//! is derived from the rounded score.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::ScoringClock;

pub const IMPORTANCE_WEIGHT: f64 = 35.0;
pub const URGENCY_WEIGHT: f64 = 25.0;
pub const MAX_EFFORT_PENALTY: f64 = 10.0;
pub const BLOCKER_BONUS: f64 = 20.0;
pub const BLOCKER_LABEL: &str = "blocker";

pub const HIGH_THRESHOLD: u8 = 70;
pub const MEDIUM_THRESHOLD: u8 = 40;

/// Fields the engine reads. Absent values fall back to their defaults
/// (importance 1, urgency 1, estimate 1, no due date).
pub trait PriorityAttributes {
    fn importance(&self) -> Option<i32>;
    fn urgency(&self) -> Option<i32>;
    fn due_date(&self) -> Option<chrono::NaiveDate>;
    fn estimate_pomodori(&self) -> Option<i32>;
    fn labels(&self) -> &[String];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriorityLabel {
    Low,
    Medium,
    High,
}

impl PriorityLabel {
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_THRESHOLD {
            PriorityLabel::High
        } else if score >= MEDIUM_THRESHOLD {
            PriorityLabel::Medium
        } else {
            PriorityLabel::Low
        }
    }

    /// Case-insensitive; `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(PriorityLabel::Low),
            "medium" => Some(PriorityLabel::Medium),
            "high" => Some(PriorityLabel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLabel::Low => "Low",
            PriorityLabel::Medium => "Medium",
            PriorityLabel::High => "High",
        }
    }
}

impl fmt::Display for PriorityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-component contributions, each rounded on its own.
///
/// The parts need not sum to the rounded score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityBreakdown {
    pub importance: i32,
    pub urgency: i32,
    pub due_date: i32,
    /// Penalty, subtracted from the total.
    pub effort: i32,
    pub blocker: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityResult {
    pub score: u8,
    pub label: PriorityLabel,
    pub breakdown: PriorityBreakdown,
}

/// Points for due-date proximity given whole days until due.
pub fn due_date_points(days_until_due: i64) -> f64 {
    match days_until_due {
        d if d <= 1 => 30.0,
        d if d <= 3 => 20.0,
        d if d <= 7 => 10.0,
        _ => 5.0,
    }
}

/// Penalty for effort: nothing for a single Pomodoro, 2 per extra unit,
/// saturating at 10. Estimates below 1 carry no penalty.
pub fn effort_penalty(estimate_pomodori: i32) -> f64 {
    let extra = f64::from(estimate_pomodori) - 1.0;
    (extra * 2.0).clamp(0.0, MAX_EFFORT_PENALTY)
}

/// Score a task at the clock's instant. Total and side-effect free.
pub fn calculate_priority<T: PriorityAttributes + ?Sized>(task: &T, clock: &ScoringClock) -> PriorityResult {
    let importance = f64::from(task.importance().unwrap_or(1));
    let urgency = f64::from(task.urgency().unwrap_or(1));
    let estimate = task.estimate_pomodori().unwrap_or(1);

    let importance_score = importance / 5.0 * IMPORTANCE_WEIGHT;
    let urgency_score = urgency / 5.0 * URGENCY_WEIGHT;
    let due_date_score = task
        .due_date()
        .map(|due| due_date_points(clock.days_until(due)))
        .unwrap_or(0.0);
    let effort = effort_penalty(estimate);
    let blocker = if task.labels().iter().any(|l| l == BLOCKER_LABEL) {
        BLOCKER_BONUS
    } else {
        0.0
    };

    let raw = importance_score + urgency_score + due_date_score - effort + blocker;
    // f64::round is half away from zero; the clamp keeps the cast in range.
    let score = raw.clamp(0.0, 100.0).round() as u8;

    PriorityResult {
        score,
        label: PriorityLabel::from_score(score),
        breakdown: PriorityBreakdown {
            importance: round_part(importance_score),
            urgency: round_part(urgency_score),
            due_date: round_part(due_date_score),
            effort: round_part(effort),
            blocker: round_part(blocker),
        },
    }
}

fn round_part(v: f64) -> i32 {
    v.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn clock() -> ScoringClock {
        ScoringClock::utc(Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap())
    }

    fn in_days(n: i64) -> NaiveDate {
        clock().today() + Duration::days(n)
    }

    fn draft() -> TaskDraft {
        TaskDraft::new("task", "todo")
    }

    #[test]
    fn test_example_high_due_tomorrow() {
        let t = draft()
            .with_importance(5)
            .with_urgency(5)
            .with_due_date(in_days(1))
            .with_estimate(1);
        let r = calculate_priority(&t, &clock());
        assert_eq!(
            r.breakdown,
            PriorityBreakdown { importance: 35, urgency: 25, due_date: 30, effort: 0, blocker: 0 }
        );
        assert_eq!(r.score, 90);
        assert_eq!(r.label, PriorityLabel::High);
    }

    #[test]
    fn test_example_low_large_estimate() {
        let t = draft().with_importance(1).with_urgency(1).with_estimate(6);
        let r = calculate_priority(&t, &clock());
        assert_eq!(
            r.breakdown,
            PriorityBreakdown { importance: 7, urgency: 5, due_date: 0, effort: 10, blocker: 0 }
        );
        assert_eq!(r.score, 2);
        assert_eq!(r.label, PriorityLabel::Low);
    }

    #[test]
    fn test_example_blocker_in_five_days() {
        let t = draft()
            .with_importance(3)
            .with_urgency(3)
            .with_due_date(in_days(5))
            .with_estimate(2)
            .with_label("blocker");
        let r = calculate_priority(&t, &clock());
        assert_eq!(
            r.breakdown,
            PriorityBreakdown { importance: 21, urgency: 15, due_date: 10, effort: 2, blocker: 20 }
        );
        assert_eq!(r.score, 64);
        assert_eq!(r.label, PriorityLabel::Medium);
    }

    #[test]
    fn test_example_clamped_at_100() {
        let t = draft()
            .with_importance(5)
            .with_urgency(5)
            .with_due_date(in_days(0))
            .with_label("blocker");
        let r = calculate_priority(&t, &clock());
        assert_eq!(r.score, 100);
        assert_eq!(r.label, PriorityLabel::High);
        // Parts keep their unclamped values.
        assert_eq!(r.breakdown.blocker, 20);
        assert_eq!(r.breakdown.due_date, 30);
    }

    #[test]
    fn test_defaults_apply_when_fields_absent() {
        let r = calculate_priority(&draft(), &clock());
        assert_eq!(r.score, 12);
        assert_eq!(r.breakdown.due_date, 0);
        assert_eq!(r.breakdown.effort, 0);
    }

    #[test]
    fn test_negative_totals_floor_at_zero() {
        let t = draft().with_importance(0).with_urgency(0).with_estimate(9);
        let r = calculate_priority(&t, &clock());
        assert_eq!(r.score, 0);
        assert_eq!(r.label, PriorityLabel::Low);
        assert_eq!(r.breakdown.effort, 10);

        let t = draft().with_importance(-5).with_urgency(-5);
        assert_eq!(calculate_priority(&t, &clock()).score, 0);
    }

    #[test]
    fn test_out_of_range_inputs_scale_then_clamp() {
        let t = draft().with_importance(10).with_urgency(1);
        let r = calculate_priority(&t, &clock());
        assert_eq!(r.breakdown.importance, 70);
        assert_eq!(r.score, 75);

        // Estimates below one never turn the penalty into a bonus.
        let t = draft().with_estimate(0);
        assert_eq!(calculate_priority(&t, &clock()).breakdown.effort, 0);
    }

    #[test]
    fn test_due_date_buckets() {
        let score_in = |days| {
            let t = draft().with_due_date(in_days(days));
            calculate_priority(&t, &clock()).breakdown.due_date
        };
        assert_eq!(score_in(-10), 30);
        assert_eq!(score_in(1), 30);
        assert_eq!(score_in(2), 20);
        assert_eq!(score_in(3), 20);
        assert_eq!(score_in(4), 10);
        assert_eq!(score_in(7), 10);
        assert_eq!(score_in(8), 5);
        assert_eq!(score_in(365), 5);
    }

    #[test]
    fn test_blocker_is_exact_and_case_sensitive() {
        for label in ["Blocker", "BLOCKER", "blockers", "not-blocker"] {
            let t = draft().with_label(label);
            assert_eq!(calculate_priority(&t, &clock()).breakdown.blocker, 0, "{label}");
        }
        let t = draft().with_label("urgent").with_label("blocker");
        assert_eq!(calculate_priority(&t, &clock()).breakdown.blocker, 20);
    }

    #[test]
    fn test_label_partitions_score_range() {
        for score in 0..=100u8 {
            let label = PriorityLabel::from_score(score);
            let expected = if score >= 70 {
                PriorityLabel::High
            } else if score >= 40 {
                PriorityLabel::Medium
            } else {
                PriorityLabel::Low
            };
            assert_eq!(label, expected, "score {score}");
        }
    }

    #[test]
    fn test_monotonic_in_each_input() {
        let due_options = [None, Some(in_days(0)), Some(in_days(2)), Some(in_days(6)), Some(in_days(30))];
        for due in due_options {
            for level in 1..=5 {
                for est in 1..=8 {
                    let mut base = draft().with_importance(level).with_urgency(level).with_estimate(est);
                    base.due_date = due;
                    let s = calculate_priority(&base, &clock()).score;

                    let more_important = TaskDraft { importance: Some(level + 1), ..base.clone() };
                    assert!(calculate_priority(&more_important, &clock()).score >= s);

                    let more_urgent = TaskDraft { urgency: Some(level + 1), ..base.clone() };
                    assert!(calculate_priority(&more_urgent, &clock()).score >= s);

                    let bigger = TaskDraft { estimate_pomodori: Some(est + 1), ..base.clone() };
                    assert!(calculate_priority(&bigger, &clock()).score <= s);

                    let blocked = base.clone().with_label("blocker");
                    assert!(calculate_priority(&blocked, &clock()).score >= s);
                }
            }
        }
    }

    #[test]
    fn test_identical_inputs_and_instant_give_identical_results() {
        let t = draft().with_importance(4).with_urgency(2).with_due_date(in_days(3)).with_estimate(3);
        assert_eq!(calculate_priority(&t, &clock()), calculate_priority(&t, &clock()));
    }

    #[test]
    fn test_crossing_a_day_boundary_can_change_the_score() {
        let t = draft().with_due_date(in_days(2));
        let later = ScoringClock::utc(clock().now() + Duration::days(1));
        let before = calculate_priority(&t, &clock());
        let after = calculate_priority(&t, &later);
        assert_eq!(before.breakdown.due_date, 20);
        assert_eq!(after.breakdown.due_date, 30);
    }

    #[test]
    fn test_serializes_breakdown_with_camel_case_keys() {
        let r = calculate_priority(&draft().with_due_date(in_days(1)), &clock());
        let v = serde_json::to_value(r).unwrap();
        assert_eq!(v["label"], "Medium");
        assert_eq!(v["breakdown"]["dueDate"], 30);
        assert_eq!(v["score"], 42);
    }

    #[test]
    fn test_scores_a_persisted_task_the_same_as_its_draft() {
        let d = draft().with_importance(4).with_urgency(4).with_due_date(in_days(4)).with_label("blocker");
        let task = crate::task::Task {
            id: "t1".into(),
            column_id: "todo".into(),
            title: "task".into(),
            description: None,
            due_date: d.due_date,
            importance: d.importance,
            urgency: d.urgency,
            estimate_pomodori: None,
            labels: d.labels.clone(),
            priority_score: None,
            priority_label: None,
        };
        assert_eq!(calculate_priority(&task, &clock()), calculate_priority(&d, &clock()));
    }
}
