//! Apply server-side validation failures to the session's error slots.

use crate::command::ValidationErrorDetail;
use crate::field_path::SetFieldPath;
use crate::workout::Session;

/// Form-level banner shown after server errors were mapped to fields.
pub const FIX_VALIDATION_ERRORS_MESSAGE: &str = "Please fix the validation errors";

/// Outcome of mapping a batch of server violations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingReport {
    /// Violations written onto a set.
    pub applied: usize,
    /// Violations whose path was malformed or out of range.
    pub ignored: usize,
}

/// Write each addressable violation onto its set.
///
/// Paths that do not parse, or that point outside the session, are skipped.
/// When several violations target the same set the last one wins.
pub fn apply_server_errors(session: &mut Session, details: &[ValidationErrorDetail]) -> MappingReport {
    let mut report = MappingReport::default();

    for detail in details {
        let Ok(path) = SetFieldPath::parse(&detail.field) else {
            report.ignored += 1;
            continue;
        };
        match session.set_mut(path.exercise_index, path.set_index) {
            Ok(set) => {
                set.error = Some(detail.message.clone());
                report.applied += 1;
            }
            Err(_) => report.ignored += 1,
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::{ExerciseEntry, SetEntry, SetSource};
    use chrono::Utc;
    use uuid::Uuid;

    fn detail(field: &str, message: &str) -> ValidationErrorDetail {
        ValidationErrorDetail {
            field: field.into(),
            message: message.into(),
        }
    }

    fn session() -> Session {
        let exercise = |position: u32, sets: u32| ExerciseEntry {
            exercise_id: Uuid::new_v4(),
            exercise_name: format!("Exercise {position}"),
            position,
            sets: (0..sets)
                .map(|i| SetEntry {
                    set_index: i,
                    reps: Some(8.0),
                    weight: Some(50.0),
                    error: None,
                    source: SetSource::LastWorkout,
                })
                .collect(),
        };
        Session {
            template_id: Uuid::new_v4(),
            template_name: "Full body".into(),
            logged_at: Utc::now(),
            exercises: vec![exercise(0, 2), exercise(1, 1)],
        }
    }

    #[test]
    fn maps_violation_to_addressed_set() {
        let mut s = session();
        let report = apply_server_errors(
            &mut s,
            &[detail("exercises.1.sets.0.reps", "Reps must be at most 99")],
        );
        assert_eq!(report, MappingReport { applied: 1, ignored: 0 });
        assert_eq!(
            s.exercises[1].sets[0].error.as_deref(),
            Some("Reps must be at most 99")
        );
        assert!(s.exercises[0].sets.iter().all(|set| set.error.is_none()));
    }

    #[test]
    fn ignores_out_of_range_and_malformed_paths() {
        let mut s = session();
        let before = s.clone();
        let report = apply_server_errors(
            &mut s,
            &[
                detail("exercises.5.sets.0.reps", "x"),
                detail("exercises.0.sets.9.weight", "x"),
                detail("exercises.zero.sets.0", "x"),
                detail("exercises", "Exercise positions must be unique"),
                detail("template_id", "Invalid uuid"),
            ],
        );
        assert_eq!(report, MappingReport { applied: 0, ignored: 5 });
        assert_eq!(s, before);
    }

    #[test]
    fn last_violation_for_a_set_wins() {
        let mut s = session();
        apply_server_errors(
            &mut s,
            &[
                detail("exercises.0.sets.1.reps", "first"),
                detail("exercises.0.sets.1.weight", "second"),
            ],
        );
        assert_eq!(s.exercises[0].sets[1].error.as_deref(), Some("second"));
    }

    #[test]
    fn values_are_untouched() {
        let mut s = session();
        apply_server_errors(&mut s, &[detail("exercises.0.sets.0", "bad")]);
        assert_eq!(s.exercises[0].sets[0].reps, Some(8.0));
        assert_eq!(s.exercises[0].sets[0].weight, Some(50.0));
        assert!(!s.exercises[0].completed());
    }
}
