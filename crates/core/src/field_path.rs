//! Typed form of server validation paths.
//!
//! The workout API reports violations against dotted paths such as
//! `exercises.1.sets.0.reps`. Only paths that address a specific set are
//! representable here; everything else fails to parse.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

const EXERCISES_SEGMENT: &str = "exercises";
const SETS_SEGMENT: &str = "sets";

/// `exercises.<exercise_index>.sets.<set_index>[.<leaf>...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetFieldPath {
    pub exercise_index: usize,
    pub set_index: usize,
    /// Trailing segments after the set index, e.g. `reps`. May be empty.
    pub leaf: Option<String>,
}

impl SetFieldPath {
    pub fn new(exercise_index: usize, set_index: usize, leaf: Option<&str>) -> Self {
        Self {
            exercise_index,
            set_index,
            leaf: leaf.map(str::to_owned),
        }
    }

    pub fn parse(path: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidPath(path.to_string());
        let mut segments = path.split('.');

        if segments.next() != Some(EXERCISES_SEGMENT) {
            return Err(invalid());
        }
        let exercise_index = parse_index(segments.next()).ok_or_else(invalid)?;
        if segments.next() != Some(SETS_SEGMENT) {
            return Err(invalid());
        }
        let set_index = parse_index(segments.next()).ok_or_else(invalid)?;

        let rest: Vec<&str> = segments.collect();
        if rest.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }
        let leaf = (!rest.is_empty()).then(|| rest.join("."));

        Ok(Self {
            exercise_index,
            set_index,
            leaf,
        })
    }
}

/// Only plain decimal digits are accepted; `+1`, `-0`, ` 2` are rejected.
fn parse_index(segment: Option<&str>) -> Option<usize> {
    let segment = segment?;
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

impl FromStr for SetFieldPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SetFieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{EXERCISES_SEGMENT}.{}.{SETS_SEGMENT}.{}",
            self.exercise_index, self.set_index
        )?;
        if let Some(leaf) = &self.leaf {
            write!(f, ".{leaf}")?;
        }
        Ok(())
    }
}
