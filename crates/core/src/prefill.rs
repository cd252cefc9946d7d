//! Prefill documents and their mapping onto a fresh [`Session`].

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};
use crate::workout::{ExerciseEntry, SetEntry, SetSource, Session};

/// A suggested starting value for one set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefillSet {
    pub set_index: u32,
    pub reps: u32,
    pub weight: f64,
    pub source: SetSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefillExercise {
    pub exercise_id: EntityId,
    pub exercise_name: String,
    pub position: u32,
    pub suggested_sets: Vec<PrefillSet>,
}

/// Response of `GET /api/workouts/prefill/{template_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPrefill {
    pub template_id: EntityId,
    pub template_name: String,
    pub exercises: Vec<PrefillExercise>,
}

/// Build a fresh session stamped with the current time.
pub fn map_prefill(prefill: &WorkoutPrefill) -> Session {
    map_prefill_at(prefill, Utc::now())
}

/// Build a fresh session with an explicit `logged_at`.
///
/// Order of exercises and sets is kept as delivered. No set carries an
/// error yet.
pub fn map_prefill_at(prefill: &WorkoutPrefill, logged_at: Timestamp) -> Session {
    Session {
        template_id: prefill.template_id,
        template_name: prefill.template_name.clone(),
        logged_at,
        exercises: prefill
            .exercises
            .iter()
            .map(|exercise| ExerciseEntry {
                exercise_id: exercise.exercise_id,
                exercise_name: exercise.exercise_name.clone(),
                position: exercise.position,
                sets: exercise
                    .suggested_sets
                    .iter()
                    .map(|set| SetEntry {
                        set_index: set.set_index,
                        reps: Some(f64::from(set.reps)),
                        weight: Some(set.weight),
                        error: None,
                        source: set.source,
                    })
                    .collect(),
            })
            .collect(),
    }
}
