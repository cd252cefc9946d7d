//! Workout creation wire types and the server-side command rules.
//!
//! The session engine sends a [`CreateWorkoutCommand`] and receives either a
//! [`CreateWorkoutResponse`] or a [`ValidationErrorResponse`] whose details
//! use `exercises.<i>.sets.<j>.<field>` paths.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntityId, Timestamp};
use crate::validation::{
    check_reps_range, check_weight_precision, check_weight_range, check_whole_reps,
    AUTHORING_SET_RULES,
};
use crate::workout::Session;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MIN_EXERCISES_PER_WORKOUT: usize = 1;
pub const MAX_EXERCISES_PER_WORKOUT: usize = 50;
pub const MIN_SETS_PER_EXERCISE: usize = 1;
pub const MAX_SETS_PER_EXERCISE: usize = 20;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateWorkoutSet {
    pub set_index: u32,
    pub reps: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateWorkoutExercise {
    pub exercise_id: EntityId,
    pub position: u32,
    pub sets: Vec<CreateWorkoutSet>,
}

/// Body of `POST /api/workouts`. UI-only session fields are not carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateWorkoutCommand {
    pub template_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_at: Option<Timestamp>,
    pub exercises: Vec<CreateWorkoutExercise>,
}

impl TryFrom<&Session> for CreateWorkoutCommand {
    type Error = CoreError;

    /// Fails if any set is still unset. Values are otherwise sent as entered;
    /// range checks belong to the validators.
    fn try_from(session: &Session) -> Result<Self, Self::Error> {
        let exercises = session
            .exercises
            .iter()
            .enumerate()
            .map(|(exercise_index, exercise)| {
                let sets = exercise
                    .sets
                    .iter()
                    .map(|set| match (set.reps, set.weight) {
                        (Some(reps), Some(weight)) => Ok(CreateWorkoutSet {
                            set_index: set.set_index,
                            reps: reps as u32,
                            weight,
                        }),
                        _ => Err(CoreError::Validation(format!(
                            "exercises.{exercise_index}.sets.{} is incomplete",
                            set.set_index
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CreateWorkoutExercise {
                    exercise_id: exercise.exercise_id,
                    position: exercise.position,
                    sets,
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        Ok(Self {
            template_id: Some(session.template_id),
            logged_at: Some(session.logged_at),
            exercises,
        })
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSetDetail {
    pub id: EntityId,
    pub workout_exercise_id: EntityId,
    pub set_index: u32,
    pub reps: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExerciseDetail {
    pub id: EntityId,
    pub workout_id: EntityId,
    pub exercise_id: EntityId,
    pub exercise_name: String,
    pub position: u32,
    pub sets: Vec<WorkoutSetDetail>,
}

/// A personal best raised by the submitted workout. Computed server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalBestUpdate {
    pub exercise_id: EntityId,
    pub exercise_name: String,
    pub previous_weight: f64,
    pub new_weight: f64,
}

/// Successful creation: the stored workout plus any personal-best changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateWorkoutResponse {
    pub id: EntityId,
    pub user_id: EntityId,
    pub template_id: Option<EntityId>,
    pub template_name: Option<String>,
    pub logged_at: Timestamp,
    pub exercises: Vec<WorkoutExerciseDetail>,
    #[serde(default)]
    pub personal_bests_updated: Vec<PersonalBestUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Body of a `400` from the workout API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub details: Vec<ValidationErrorDetail>,
}

/// Body of any other non-2xx response from the workout API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Server-side command validation
// ---------------------------------------------------------------------------

fn violation(field: String, message: impl Into<String>) -> ValidationErrorDetail {
    ValidationErrorDetail {
        field,
        message: message.into(),
    }
}

/// Validate a command with the authoring rule set (0-999.99, 2 decimals).
///
/// Returns an empty vec when the command is acceptable.
pub fn validate_create_workout(command: &CreateWorkoutCommand) -> Vec<ValidationErrorDetail> {
    let mut details = Vec::new();
    let rules = &AUTHORING_SET_RULES;

    let count = command.exercises.len();
    if !(MIN_EXERCISES_PER_WORKOUT..=MAX_EXERCISES_PER_WORKOUT).contains(&count) {
        details.push(violation(
            "exercises".into(),
            format!(
                "Workout must have between {MIN_EXERCISES_PER_WORKOUT} and \
                 {MAX_EXERCISES_PER_WORKOUT} exercises"
            ),
        ));
    }

    let mut positions = HashSet::new();
    if !command.exercises.iter().all(|e| positions.insert(e.position)) {
        details.push(violation(
            "exercises".into(),
            "Exercise positions must be unique within workout",
        ));
    }

    for (i, exercise) in command.exercises.iter().enumerate() {
        let set_count = exercise.sets.len();
        if !(MIN_SETS_PER_EXERCISE..=MAX_SETS_PER_EXERCISE).contains(&set_count) {
            details.push(violation(
                format!("exercises.{i}.sets"),
                format!(
                    "Exercise must have between {MIN_SETS_PER_EXERCISE} and \
                     {MAX_SETS_PER_EXERCISE} sets"
                ),
            ));
        }

        let mut indices = HashSet::new();
        if !exercise.sets.iter().all(|s| indices.insert(s.set_index)) {
            details.push(violation(
                format!("exercises.{i}.sets"),
                "Set indices must be unique within exercise",
            ));
        }

        for (j, set) in exercise.sets.iter().enumerate() {
            let reps = f64::from(set.reps);
            if let Err(v) = check_reps_range(reps, rules).and_then(|_| check_whole_reps(reps)) {
                details.push(violation(format!("exercises.{i}.sets.{j}.reps"), v.to_string()));
            }
            let weight_check = if set.weight.is_finite() {
                check_weight_range(set.weight, rules)
                    .and_then(|_| check_weight_precision(set.weight, rules))
                    .map_err(|v| v.to_string())
            } else {
                Err("Weight must be a number".to_string())
            };
            if let Err(message) = weight_check {
                details.push(violation(format!("exercises.{i}.sets.{j}.weight"), message));
            }
        }
    }

    details
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
