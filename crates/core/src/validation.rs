//! Set-level and form-level validation.
//!
//! Two rule configurations exist and are intentionally different: session
//! logging accepts whole-kilo weights with one decimal up to 999, while
//! template authoring (and server-side workout validation) allows two
//! decimals up to 999.99.

use crate::workout::Session;

// ---------------------------------------------------------------------------
// Rule configurations
// ---------------------------------------------------------------------------

/// Bounds applied to a single `(reps, weight)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetRules {
    pub min_reps: u32,
    pub max_reps: u32,
    pub min_weight: f64,
    pub max_weight: f64,
    pub max_weight_decimals: usize,
}

/// Rules used while logging a workout session.
pub const SESSION_SET_RULES: SetRules = SetRules {
    min_reps: 1,
    max_reps: 99,
    min_weight: 0.0,
    max_weight: 999.0,
    max_weight_decimals: 1,
};

/// Rules used when authoring templates and when the server validates a
/// submitted workout.
pub const AUTHORING_SET_RULES: SetRules = SetRules {
    min_reps: 1,
    max_reps: 99,
    min_weight: 0.0,
    max_weight: 999.99,
    max_weight_decimals: 2,
};

impl Default for SetRules {
    fn default() -> Self {
        SESSION_SET_RULES
    }
}

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// Why a set failed validation. `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetViolation {
    #[error("All fields are required")]
    MissingField,

    #[error("Reps must be between {min} and {max}")]
    RepsOutOfRange { min: u32, max: u32 },

    #[error("Weight must be between {min} and {max}")]
    WeightOutOfRange { min: f64, max: f64 },

    #[error("Reps must be a whole number")]
    FractionalReps,

    #[error("Weight can have at most {max_decimals} decimal place{}", plural(.max_decimals))]
    WeightPrecision { max_decimals: usize },
}

fn plural(count: &usize) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}

// ---------------------------------------------------------------------------
// Field checks
// ---------------------------------------------------------------------------

/// Number of fractional digits in the shortest decimal rendering of `value`.
///
/// `52.5` has one, `52.55` has two, `52.0` has none.
///
/// `f64`'s `Display` never switches to exponent notation, so tiny values
/// such as `1e-7` count all their digits (seven here) and fail a precision
/// check instead of slipping through as an exponent string would.
pub fn fraction_digits(value: f64) -> usize {
    let rendered = value.to_string();
    rendered
        .split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub fn check_reps_range(reps: f64, rules: &SetRules) -> Result<(), SetViolation> {
    if reps < f64::from(rules.min_reps) || reps > f64::from(rules.max_reps) {
        return Err(SetViolation::RepsOutOfRange {
            min: rules.min_reps,
            max: rules.max_reps,
        });
    }
    Ok(())
}

pub fn check_weight_range(weight: f64, rules: &SetRules) -> Result<(), SetViolation> {
    if weight < rules.min_weight || weight > rules.max_weight {
        return Err(SetViolation::WeightOutOfRange {
            min: rules.min_weight,
            max: rules.max_weight,
        });
    }
    Ok(())
}

pub fn check_whole_reps(reps: f64) -> Result<(), SetViolation> {
    if reps.fract() != 0.0 {
        return Err(SetViolation::FractionalReps);
    }
    Ok(())
}

pub fn check_weight_precision(weight: f64, rules: &SetRules) -> Result<(), SetViolation> {
    if fraction_digits(weight) > rules.max_weight_decimals {
        return Err(SetViolation::WeightPrecision {
            max_decimals: rules.max_weight_decimals,
        });
    }
    Ok(())
}

/// Validate one `(reps, weight)` pair. The first failing rule wins:
/// missing field, reps range, weight range, whole reps, weight precision.
///
/// Non-finite numbers are treated as unset.
pub fn validate_set(
    reps: Option<f64>,
    weight: Option<f64>,
    rules: &SetRules,
) -> Result<(), SetViolation> {
    let (Some(reps), Some(weight)) = (finite(reps), finite(weight)) else {
        return Err(SetViolation::MissingField);
    };

    check_reps_range(reps, rules)?;
    check_weight_range(weight, rules)?;
    check_whole_reps(reps)?;
    check_weight_precision(weight, rules)
}

/// Convenience wrapper returning the message slot value for a set.
pub fn set_error(reps: Option<f64>, weight: Option<f64>, rules: &SetRules) -> Option<String> {
    validate_set(reps, weight, rules).err().map(|v| v.to_string())
}

// ---------------------------------------------------------------------------
// Form validation
// ---------------------------------------------------------------------------

/// Recompute the error slot of every set and report overall validity.
///
/// Errors are always written back, even when the session previously looked
/// valid, so every violation is visible at once.
pub fn validate_form(session: &mut Session, rules: &SetRules) -> bool {
    let mut valid = true;
    for exercise in &mut session.exercises {
        for set in &mut exercise.sets {
            set.error = set_error(set.reps, set.weight, rules);
            valid &= set.error.is_none();
        }
    }
    valid
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::{ExerciseEntry, SetEntry, SetSource};
    use assert_matches::assert_matches;
    use chrono::Utc;
    use uuid::Uuid;

    fn check(reps: f64, weight: f64) -> Result<(), SetViolation> {
        validate_set(Some(reps), Some(weight), &SESSION_SET_RULES)
    }

    #[test]
    fn messages_match_deployed_wording() {
        assert_eq!(SetViolation::MissingField.to_string(), "All fields are required");
        assert_eq!(
            check(0.0, 10.0).unwrap_err().to_string(),
            "Reps must be between 1 and 99"
        );
        assert_eq!(
            check(5.0, 1000.0).unwrap_err().to_string(),
            "Weight must be between 0 and 999"
        );
        assert_eq!(
            check(5.5, 10.0).unwrap_err().to_string(),
            "Reps must be a whole number"
        );
        assert_eq!(
            check(5.0, 52.55).unwrap_err().to_string(),
            "Weight can have at most 1 decimal place"
        );
    }

    #[test]
    fn authoring_rules_render_their_own_bounds() {
        let err = validate_set(Some(5.0), Some(1000.0), &AUTHORING_SET_RULES).unwrap_err();
        assert_eq!(err.to_string(), "Weight must be between 0 and 999.99");
        let err = validate_set(Some(5.0), Some(10.125), &AUTHORING_SET_RULES).unwrap_err();
        assert_eq!(err.to_string(), "Weight can have at most 2 decimal places");
        assert!(validate_set(Some(5.0), Some(999.99), &AUTHORING_SET_RULES).is_ok());
        assert!(validate_set(Some(5.0), Some(999.99), &SESSION_SET_RULES).is_err());
    }

    #[test]
    fn every_in_range_pair_is_valid() {
        for reps in 1..=99 {
            for tenths in (0..=9990).step_by(37) {
                let weight = f64::from(tenths) / 10.0;
                assert!(
                    check(f64::from(reps), weight).is_ok(),
                    "reps={reps} weight={weight}"
                );
            }
        }
        assert!(check(1.0, 0.0).is_ok());
        assert!(check(99.0, 999.0).is_ok());
    }

    #[test]
    fn reps_out_of_range_wins_regardless_of_weight() {
        for reps in [-5.0, 0.0, 0.5, 99.5, 100.0, 250.0] {
            for weight in [-1.0, 0.0, 52.55, 2000.0] {
                assert_matches!(
                    check(reps, weight),
                    Err(SetViolation::RepsOutOfRange { min: 1, max: 99 })
                );
            }
        }
    }

    #[test]
    fn two_or_more_decimals_rejected_when_otherwise_valid() {
        for weight in [0.25, 52.55, 100.125, 998.99] {
            assert_matches!(
                check(10.0, weight),
                Err(SetViolation::WeightPrecision { max_decimals: 1 })
            );
        }
    }

    #[test]
    fn precedence_missing_before_ranges() {
        assert_matches!(
            validate_set(None, Some(5000.0), &SESSION_SET_RULES),
            Err(SetViolation::MissingField)
        );
        assert_matches!(
            validate_set(Some(0.0), None, &SESSION_SET_RULES),
            Err(SetViolation::MissingField)
        );
    }

    #[test]
    fn precedence_weight_range_before_whole_reps() {
        assert_matches!(
            check(5.5, -1.0),
            Err(SetViolation::WeightOutOfRange { .. })
        );
    }

    #[test]
    fn non_finite_values_count_as_unset() {
        assert_matches!(
            validate_set(Some(f64::NAN), Some(10.0), &SESSION_SET_RULES),
            Err(SetViolation::MissingField)
        );
        assert_matches!(
            validate_set(Some(5.0), Some(f64::INFINITY), &SESSION_SET_RULES),
            Err(SetViolation::MissingField)
        );
    }

    #[test]
    fn fraction_digits_uses_shortest_rendering() {
        assert_eq!(fraction_digits(52.0), 0);
        assert_eq!(fraction_digits(52.5), 1);
        assert_eq!(fraction_digits(52.55), 2);
        assert_eq!(fraction_digits(0.1), 1);
    }

    #[test]
    fn tiny_weights_count_every_digit() {
        assert_eq!(fraction_digits(1e-7), 7);
        assert_eq!(
            validate_set(Some(5.0), Some(1e-7), &AUTHORING_SET_RULES),
            Err(SetViolation::WeightPrecision { max_decimals: 2 })
        );
    }

    fn form() -> Session {
        let set = |i: u32, reps: Option<f64>| SetEntry {
            set_index: i,
            reps,
            weight: Some(40.0),
            error: None,
            source: SetSource::TemplateDefault,
        };
        Session {
            template_id: Uuid::new_v4(),
            template_name: "Legs".into(),
            logged_at: Utc::now(),
            exercises: vec![
                ExerciseEntry {
                    exercise_id: Uuid::new_v4(),
                    exercise_name: "Squat".into(),
                    position: 0,
                    sets: vec![set(0, Some(5.0)), set(1, None)],
                },
                ExerciseEntry {
                    exercise_id: Uuid::new_v4(),
                    exercise_name: "Lunge".into(),
                    position: 1,
                    sets: vec![set(0, Some(12.0))],
                },
            ],
        }
    }

    #[test]
    fn validate_form_writes_every_error_and_reports_invalid() {
        let mut session = form();
        assert!(!validate_form(&mut session, &SESSION_SET_RULES));
        assert_eq!(
            session.exercises[0].sets[1].error.as_deref(),
            Some("All fields are required")
        );
        assert!(session.exercises[0].sets[0].error.is_none());
        assert!(session.exercises[1].sets[0].error.is_none());
    }

    #[test]
    fn validate_form_clears_stale_errors() {
        let mut session = form();
        session.exercises[0].sets[1].reps = Some(5.0);
        session.exercises[1].sets[0].error = Some("stale".into());
        assert!(validate_form(&mut session, &SESSION_SET_RULES));
        assert_eq!(session.error_count(), 0);
    }

    #[test]
    fn validate_form_is_idempotent() {
        let mut session = form();
        let first = validate_form(&mut session, &SESSION_SET_RULES);
        let after_first = session.clone();
        let second = validate_form(&mut session, &SESSION_SET_RULES);
        assert_eq!(first, second);
        assert_eq!(after_first, session);
    }
}
