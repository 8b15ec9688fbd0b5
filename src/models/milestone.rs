use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub user_id: String,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub total_gestures_completed: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MilestoneUnlock {
    pub user_id: String,
    pub kind: MilestoneKind,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "milestone_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    ProofBuilder,
    ConsistencyMode,
    IdentityLock,
    RitualMaster,
}

impl MilestoneKind {
    /// Ascending by threshold.
    pub const ALL: [MilestoneKind; 4] = [
        MilestoneKind::ProofBuilder,
        MilestoneKind::ConsistencyMode,
        MilestoneKind::IdentityLock,
        MilestoneKind::RitualMaster,
    ];

    pub fn threshold_days(self) -> i32 {
        match self {
            MilestoneKind::ProofBuilder => 3,
            MilestoneKind::ConsistencyMode => 7,
            MilestoneKind::IdentityLock => 14,
            MilestoneKind::RitualMaster => 30,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MilestoneKind::ProofBuilder => "Proof Builder",
            MilestoneKind::ConsistencyMode => "Consistency Mode",
            MilestoneKind::IdentityLock => "Identity Lock",
            MilestoneKind::RitualMaster => "Ritual Master",
        }
    }

    pub fn unlock_message(self) -> &'static str {
        match self {
            MilestoneKind::ProofBuilder => {
                "You've built proof of commitment! Your consistency is showing."
            }
            MilestoneKind::ConsistencyMode => {
                "One week of dedication! You're in consistency mode."
            }
            MilestoneKind::IdentityLock => "Two weeks! Skincare is now part of your identity.",
            MilestoneKind::RitualMaster => "One month complete! You're a true ritual master.",
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct NextMilestone {
    pub name: &'static str,
    pub days: i32,
    pub progress: f64,
}

/// The lowest still-locked milestone with progress toward it, capped at 100%.
pub fn next_locked(unlocked: &[MilestoneKind], current_streak: i32) -> Option<NextMilestone> {
    MilestoneKind::ALL
        .iter()
        .find(|kind| !unlocked.contains(kind))
        .map(|&kind| NextMilestone {
            name: kind.title(),
            days: kind.threshold_days(),
            progress: (current_streak as f64 / kind.threshold_days() as f64 * 100.0).min(100.0),
        })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "gesture_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GestureType {
    DonateMeal,
    PlantTree,
    BlanketDonation,
}

impl GestureType {
    pub fn impact_url(self) -> &'static str {
        match self {
            GestureType::DonateMeal => "https://www.foodbanking.org/donate/",
            GestureType::PlantTree => "https://www.onetreeplanted.org/",
            GestureType::BlanketDonation => "https://www.salvationarmyusa.org/usn/donate/",
        }
    }

    pub fn completion_message(self) -> &'static str {
        match self {
            GestureType::DonateMeal => {
                "Thank you! Your gesture will help provide a meal to someone in need."
            }
            GestureType::PlantTree => "Amazing! A tree will be planted thanks to your consistency.",
            GestureType::BlanketDonation => {
                "Wonderful! Your gesture will provide warmth to someone in need."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gesture {
    pub id: Uuid,
    pub user_id: String,
    pub gesture_type: GestureType,
    pub milestone: MilestoneKind,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteGestureRequest {
    pub gesture_type: GestureType,
    pub milestone_triggered: MilestoneKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_ascend() {
        let days: Vec<i32> = MilestoneKind::ALL.iter().map(|k| k.threshold_days()).collect();
        assert_eq!(days, vec![3, 7, 14, 30]);
    }

    #[test]
    fn test_next_locked_new_user() {
        let next = next_locked(&[], 0).unwrap();
        assert_eq!(next.name, "Proof Builder");
        assert_eq!(next.days, 3);
        assert_eq!(next.progress, 0.0);
    }

    #[test]
    fn test_next_locked_skips_unlocked() {
        let next = next_locked(&[MilestoneKind::ProofBuilder], 5).unwrap();
        assert_eq!(next.name, "Consistency Mode");
        assert!((next.progress - 5.0 / 7.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_next_locked_progress_caps_at_100() {
        // Streak beyond the threshold but the unlock endpoint not yet called
        let next = next_locked(&[], 10).unwrap();
        assert_eq!(next.progress, 100.0);
    }

    #[test]
    fn test_next_locked_none_when_all_unlocked() {
        assert_eq!(next_locked(&MilestoneKind::ALL, 40), None);
    }
}
