//! In-progress workout session model.
//!
//! A [`Session`] is created once (from a prefill or a resumed draft) and
//! keeps its shape for its whole lifetime: the number of exercises, their
//! positions, and the number of sets per exercise never change. Only the
//! `reps`, `weight` and `error` slots of individual sets are edited.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Where a set's starting values came from. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetSource {
    LastWorkout,
    PersonalBest,
    TemplateDefault,
    Default,
}

// ---------------------------------------------------------------------------
// Editable fields
// ---------------------------------------------------------------------------

/// The two user-editable fields of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetField {
    Reps,
    Weight,
}

impl SetField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetField::Reps => "reps",
            SetField::Weight => "weight",
        }
    }
}

impl fmt::Display for SetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SetField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reps" => Ok(SetField::Reps),
            "weight" => Ok(SetField::Weight),
            other => Err(CoreError::Validation(format!(
                "Unknown set field '{other}'. Must be one of: reps, weight"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Session aggregate
// ---------------------------------------------------------------------------

/// One set row. `None` in `reps` / `weight` is the "unset" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetEntry {
    pub set_index: u32,
    pub reps: Option<f64>,
    pub weight: Option<f64>,
    /// Current validation message, if the set is invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub source: SetSource,
}

impl SetEntry {
    pub fn value(&self, field: SetField) -> Option<f64> {
        match field {
            SetField::Reps => self.reps,
            SetField::Weight => self.weight,
        }
    }

    pub(crate) fn slot_mut(&mut self, field: SetField) -> &mut Option<f64> {
        match field {
            SetField::Reps => &mut self.reps,
            SetField::Weight => &mut self.weight,
        }
    }

    /// Both fields populated and no validation error recorded.
    pub fn is_complete(&self) -> bool {
        self.reps.is_some() && self.weight.is_some() && self.error.is_none()
    }
}

/// One exercise of the session, in template order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub exercise_id: EntityId,
    pub exercise_name: String,
    pub position: u32,
    pub sets: Vec<SetEntry>,
}

impl ExerciseEntry {
    /// Derived on every read; never stored.
    pub fn completed(&self) -> bool {
        self.sets.iter().all(SetEntry::is_complete)
    }
}

/// Root aggregate for one logging attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub template_id: EntityId,
    pub template_name: String,
    pub logged_at: Timestamp,
    pub exercises: Vec<ExerciseEntry>,
}

impl Session {
    pub fn set(&self, exercise_index: usize, set_index: usize) -> Option<&SetEntry> {
        self.exercises.get(exercise_index)?.sets.get(set_index)
    }

    /// Resolve a set for mutation, reporting which coordinate was out of range.
    pub fn set_mut(
        &mut self,
        exercise_index: usize,
        set_index: usize,
    ) -> Result<&mut SetEntry, CoreError> {
        let exercise = self
            .exercises
            .get_mut(exercise_index)
            .ok_or(CoreError::OutOfRange {
                entity: "exercise",
                index: exercise_index,
            })?;
        exercise.sets.get_mut(set_index).ok_or(CoreError::OutOfRange {
            entity: "set",
            index: set_index,
        })
    }

    /// Replace one field of one set. Validation is left to the caller.
    pub fn assign(
        &mut self,
        exercise_index: usize,
        set_index: usize,
        field: SetField,
        value: Option<f64>,
    ) -> Result<&mut SetEntry, CoreError> {
        let set = self.set_mut(exercise_index, set_index)?;
        *set.slot_mut(field) = value;
        Ok(set)
    }

    /// True when every set is populated and error-free.
    pub fn is_complete(&self) -> bool {
        self.exercises.iter().all(ExerciseEntry::completed)
    }

    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    pub fn error_count(&self) -> usize {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .filter(|s| s.error.is_some())
            .count()
    }

    /// Every exercise has sets numbered `0..n` in order.
    pub fn has_contiguous_sets(&self) -> bool {
        self.exercises.iter().all(|exercise| {
            exercise
                .sets
                .iter()
                .enumerate()
                .all(|(i, set)| set.set_index as usize == i)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use uuid::Uuid;

    fn set(index: u32, reps: Option<f64>, weight: Option<f64>) -> SetEntry {
        SetEntry {
            set_index: index,
            reps,
            weight,
            error: None,
            source: SetSource::Default,
        }
    }

    fn session() -> Session {
        Session {
            template_id: Uuid::new_v4(),
            template_name: "Push".into(),
            logged_at: Utc::now(),
            exercises: vec![ExerciseEntry {
                exercise_id: Uuid::new_v4(),
                exercise_name: "Bench".into(),
                position: 0,
                sets: vec![set(0, Some(5.0), Some(60.0)), set(1, Some(5.0), Some(60.0))],
            }],
        }
    }

    #[test]
    fn exercise_completed_requires_all_sets_filled_and_valid() {
        let mut s = session();
        assert!(s.exercises[0].completed());

        s.exercises[0].sets[1].weight = None;
        assert!(!s.exercises[0].completed());

        s.exercises[0].sets[1].weight = Some(60.0);
        s.exercises[0].sets[1].error = Some("bad".into());
        assert!(!s.exercises[0].completed());
    }

    #[test]
    fn set_mut_reports_out_of_range_coordinate() {
        let mut s = session();
        assert_matches!(
            s.set_mut(3, 0),
            Err(CoreError::OutOfRange { entity: "exercise", index: 3 })
        );
        assert_matches!(
            s.set_mut(0, 2),
            Err(CoreError::OutOfRange { entity: "set", index: 2 })
        );
        assert!(s.set_mut(0, 1).is_ok());
    }

    #[test]
    fn assign_touches_only_the_named_field() {
        let mut s = session();
        s.assign(0, 1, SetField::Reps, Some(8.0)).unwrap();
        let updated = s.set(0, 1).unwrap();
        assert_eq!(updated.reps, Some(8.0));
        assert_eq!(updated.weight, Some(60.0));
        assert_eq!(s.set(0, 0).unwrap().reps, Some(5.0));
    }

    #[test]
    fn set_field_parses_known_names() {
        assert_eq!("reps".parse::<SetField>().unwrap(), SetField::Reps);
        assert_eq!("weight".parse::<SetField>().unwrap(), SetField::Weight);
        assert!("sets".parse::<SetField>().is_err());
    }

    #[test]
    fn contiguous_set_check() {
        let mut s = session();
        assert!(s.has_contiguous_sets());
        s.exercises[0].sets[1].set_index = 4;
        assert!(!s.has_contiguous_sets());
    }

    #[test]
    fn source_serializes_snake_case() {
        let json = serde_json::to_value(SetSource::TemplateDefault).unwrap();
        assert_eq!(json, "template_default");
        let parsed: SetSource = serde_json::from_value(serde_json::json!("last_workout")).unwrap();
        assert_eq!(parsed, SetSource::LastWorkout);
    }

    #[test]
    fn unset_fields_serialize_as_null_and_error_is_omitted() {
        let entry = set(0, None, Some(20.0));
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json["reps"].is_null());
        assert_eq!(json["weight"], 20.0);
        assert!(json.get("error").is_none());
    }
}
