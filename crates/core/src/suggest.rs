//! Build a [`WorkoutPrefill`] from a template and the user's history.
//!
//! This is the producer side of the prefill document: each template
//! exercise gets its prescribed number of sets, seeded either from the most
//! recent workout that included the exercise or from the template defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::prefill::{PrefillExercise, PrefillSet, WorkoutPrefill};
use crate::types::EntityId;
use crate::workout::SetSource;

/// One exercise as prescribed by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateExercisePlan {
    pub exercise_id: EntityId,
    pub exercise_name: String,
    pub position: u32,
    pub sets: u32,
    pub reps: u32,
    pub default_weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePlan {
    pub id: EntityId,
    pub name: String,
    pub exercises: Vec<TemplateExercisePlan>,
}

/// A set from a previously logged workout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoggedSet {
    pub reps: u32,
    pub weight: f64,
}

/// Heaviest set with a positive weight; the earliest wins ties.
///
/// Bodyweight-only history (all weights zero) yields `None`, so the template
/// defaults are used instead.
pub fn heaviest_set(sets: &[LoggedSet]) -> Option<LoggedSet> {
    sets.iter().fold(None, |best: Option<LoggedSet>, set| {
        if set.weight > best.map_or(0.0, |b| b.weight) {
            Some(*set)
        } else {
            best
        }
    })
}

/// `last_sets` maps an exercise to the sets of the most recent workout that
/// included it.
pub fn build_prefill(
    plan: &TemplatePlan,
    last_sets: &HashMap<EntityId, Vec<LoggedSet>>,
) -> WorkoutPrefill {
    WorkoutPrefill {
        template_id: plan.id,
        template_name: plan.name.clone(),
        exercises: plan
            .exercises
            .iter()
            .map(|exercise| {
                let last = last_sets
                    .get(&exercise.exercise_id)
                    .and_then(|sets| heaviest_set(sets));
                let (reps, weight, source) = match last {
                    Some(set) => (set.reps, set.weight, SetSource::LastWorkout),
                    None => (
                        exercise.reps,
                        exercise.default_weight.unwrap_or(0.0),
                        SetSource::TemplateDefault,
                    ),
                };
                PrefillExercise {
                    exercise_id: exercise.exercise_id,
                    exercise_name: exercise.exercise_name.clone(),
                    position: exercise.position,
                    suggested_sets: (0..exercise.sets)
                        .map(|set_index| PrefillSet {
                            set_index,
                            reps,
                            weight,
                            source,
                        })
                        .collect(),
                }
            })
            .collect(),
    }
}
