use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::{Deref, Display, From, Into};

use crate::{
    CreateError, DeleteError, Exercise, ExerciseID, Name, Position, ReadError, Targets,
    TemplateID, UpdateError, ValidationError,
};

pub trait WorkoutService {
    fn get_in_progress_workouts(&self) -> Result<Vec<WorkoutSummary>, ReadError>;
    fn get_finished_workouts(&self) -> Result<Vec<WorkoutSummary>, ReadError>;
    fn get_workout(&self, id: WorkoutID) -> Result<Option<Workout>, ReadError>;
    fn create_workout(
        &self,
        name: Name,
        date: NaiveDate,
        template_id: Option<TemplateID>,
    ) -> Result<Workout, CreateError>;
    fn create_workout_from_template(
        &self,
        name: Name,
        date: NaiveDate,
        template_id: TemplateID,
    ) -> Result<Workout, CreateError>;
    fn modify_workout(
        &self,
        id: WorkoutID,
        name: Name,
        date: NaiveDate,
        notes: String,
    ) -> Result<Workout, UpdateError>;
    fn finish_workout(&self, id: WorkoutID) -> Result<Workout, UpdateError>;
    fn delete_workout(&self, id: WorkoutID) -> Result<WorkoutID, DeleteError>;

    fn get_workout_exercise(
        &self,
        id: WorkoutExerciseID,
    ) -> Result<Option<WorkoutExercise>, ReadError>;
    fn add_workout_exercise(
        &self,
        workout_id: WorkoutID,
        exercise_id: ExerciseID,
    ) -> Result<WorkoutExercise, CreateError>;
    fn remove_workout_exercise(
        &self,
        id: WorkoutExerciseID,
    ) -> Result<WorkoutExerciseID, DeleteError>;
    fn reorder_workout_exercises(
        &self,
        workout_id: WorkoutID,
        order: &[WorkoutExerciseID],
    ) -> Result<Workout, UpdateError>;

    fn get_set(&self, id: SetID) -> Result<Option<LoggedSet>, ReadError>;
    fn get_sets(&self, workout_exercise_id: WorkoutExerciseID)
    -> Result<Vec<LoggedSet>, ReadError>;
    fn get_sets_batch(
        &self,
        workout_exercise_ids: &[WorkoutExerciseID],
    ) -> Result<BTreeMap<WorkoutExerciseID, Vec<LoggedSet>>, ReadError>;
    fn add_set(
        &self,
        workout_exercise_id: WorkoutExerciseID,
        reps: Reps,
        weight: Weight,
    ) -> Result<LoggedSet, CreateError>;
    fn modify_set(&self, id: SetID, reps: Reps, weight: Weight) -> Result<LoggedSet, UpdateError>;
    fn delete_set(&self, id: SetID) -> Result<SetID, DeleteError>;

    fn get_last_weight(
        &self,
        exercise_id: ExerciseID,
        exclude: WorkoutID,
    ) -> Result<Option<Weight>, ReadError>;
    fn get_last_weights(
        &self,
        exercise_ids: &[ExerciseID],
        exclude: WorkoutID,
    ) -> Result<BTreeMap<ExerciseID, Option<Weight>>, ReadError>;
    fn get_template_targets(
        &self,
        template_id: TemplateID,
        exercise_id: ExerciseID,
    ) -> Result<Option<Targets>, ReadError>;
    fn get_template_targets_batch(
        &self,
        template_id: TemplateID,
        exercise_ids: &[ExerciseID],
    ) -> Result<BTreeMap<ExerciseID, Option<Targets>>, ReadError>;

    fn validate_workout_name(&self, name: &str) -> Result<Name, ValidationError> {
        Name::new(name).map_err(|err| ValidationError::Other(err.into()))
    }

    fn validate_workout_date(&self, date: &str) -> Result<NaiveDate, ValidationError> {
        NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::Other("Invalid date".into()))
    }

    fn validate_set(&self, reps: &str, weight: &str) -> Result<(Reps, Weight), ValidationError> {
        let reps = Reps::try_from(reps).map_err(|err| ValidationError::Other(err.into()))?;
        let weight = Weight::try_from(weight).map_err(|err| ValidationError::Other(err.into()))?;
        Ok((reps, weight))
    }
}

/// Storage of workouts and their logged sets.
///
/// Every operation that changes the exercises or sets of a workout checks that the workout is
/// still in progress within the same transaction as the change and fails with `Finished`
/// otherwise.
pub trait WorkoutRepository {
    /// In-progress workouts, most recent first.
    fn read_in_progress_workouts(&self) -> Result<Vec<WorkoutSummary>, ReadError>;
    /// Finished workouts, most recent first.
    fn read_finished_workouts(&self) -> Result<Vec<WorkoutSummary>, ReadError>;
    fn read_workout(&self, id: WorkoutID) -> Result<Option<Workout>, ReadError>;
    /// Creates an empty in-progress workout. Exercises of the template are not copied.
    fn create_workout(
        &self,
        name: Name,
        date: NaiveDate,
        template_id: Option<TemplateID>,
    ) -> Result<Workout, CreateError>;
    /// Creates an in-progress workout containing the exercises of the template in order.
    fn create_workout_from_template(
        &self,
        name: Name,
        date: NaiveDate,
        template_id: TemplateID,
    ) -> Result<Workout, CreateError>;
    fn modify_workout(
        &self,
        id: WorkoutID,
        name: Name,
        date: NaiveDate,
        notes: String,
    ) -> Result<Workout, UpdateError>;
    /// Marks the workout as finished. Finishing a finished workout leaves it unchanged.
    fn finish_workout(&self, id: WorkoutID) -> Result<Workout, UpdateError>;
    fn delete_workout(&self, id: WorkoutID) -> Result<WorkoutID, DeleteError>;

    fn read_workout_exercise(
        &self,
        id: WorkoutExerciseID,
    ) -> Result<Option<WorkoutExercise>, ReadError>;
    fn add_workout_exercise(
        &self,
        workout_id: WorkoutID,
        exercise_id: ExerciseID,
    ) -> Result<WorkoutExercise, CreateError>;
    fn remove_workout_exercise(
        &self,
        id: WorkoutExerciseID,
    ) -> Result<WorkoutExerciseID, DeleteError>;
    fn reorder_workout_exercises(
        &self,
        workout_id: WorkoutID,
        order: &[WorkoutExerciseID],
    ) -> Result<Workout, UpdateError>;

    fn read_set(&self, id: SetID) -> Result<Option<LoggedSet>, ReadError>;
    fn read_sets(&self, workout_exercise_id: WorkoutExerciseID)
    -> Result<Vec<LoggedSet>, ReadError>;
    /// Sets of every given workout exercise in position order, loaded at once.
    ///
    /// Every requested ID is present in the result.
    fn read_sets_batch(
        &self,
        workout_exercise_ids: &[WorkoutExerciseID],
    ) -> Result<BTreeMap<WorkoutExerciseID, Vec<LoggedSet>>, ReadError>;
    fn add_set(
        &self,
        workout_exercise_id: WorkoutExerciseID,
        reps: Reps,
        weight: Weight,
    ) -> Result<LoggedSet, CreateError>;
    fn modify_set(&self, id: SetID, reps: Reps, weight: Weight) -> Result<LoggedSet, UpdateError>;
    fn delete_set(&self, id: SetID) -> Result<SetID, DeleteError>;

    /// Weight of the most recent set of the exercise in any other finished workout.
    ///
    /// Sets are ordered by workout date and then by the time they were logged.
    fn read_last_weight(
        &self,
        exercise_id: ExerciseID,
        exclude: WorkoutID,
    ) -> Result<Option<Weight>, ReadError>;
    /// Last weights of several exercises, loaded at once.
    ///
    /// Every requested ID is present in the result.
    fn read_last_weight_batch(
        &self,
        exercise_ids: &[ExerciseID],
        exclude: WorkoutID,
    ) -> Result<BTreeMap<ExerciseID, Option<Weight>>, ReadError>;

    /// Current targets of the exercise in the template.
    fn read_template_targets(
        &self,
        template_id: TemplateID,
        exercise_id: ExerciseID,
    ) -> Result<Option<Targets>, ReadError>;
    fn read_template_targets_batch(
        &self,
        template_id: TemplateID,
        exercise_ids: &[ExerciseID],
    ) -> Result<BTreeMap<ExerciseID, Option<Targets>>, ReadError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub id: WorkoutID,
    pub name: Name,
    pub date: NaiveDate,
    pub notes: String,
    pub status: WorkoutStatus,
    pub template_id: Option<TemplateID>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exercises: Vec<WorkoutExercise>,
}

impl Workout {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == WorkoutStatus::Finished
    }

    #[must_use]
    pub fn num_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

#[derive(Deref, Display, From, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct WorkoutID(i64);

#[derive(
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[strum(serialize_all = "snake_case")]
pub enum WorkoutStatus {
    #[default]
    InProgress,
    Finished,
}

/// Condensed view of a workout for listings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSummary {
    pub id: WorkoutID,
    pub name: Name,
    pub date: NaiveDate,
    pub status: WorkoutStatus,
    pub exercise_count: u32,
    pub set_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutExercise {
    pub id: WorkoutExerciseID,
    pub workout_id: WorkoutID,
    pub exercise: Exercise,
    pub position: Position,
    pub sets: Vec<LoggedSet>,
    pub last_weight: Option<Weight>,
    /// Looked up from the workout's template when the workout is read.
    pub targets: Option<Targets>,
}

impl WorkoutExercise {
    /// Number of target sets that have not been logged yet.
    #[must_use]
    pub fn remaining_sets(&self) -> Option<u32> {
        self.targets.map(|t| {
            u32::from(t.sets).saturating_sub(u32::try_from(self.sets.len()).unwrap_or(u32::MAX))
        })
    }
}

#[derive(Deref, Display, From, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct WorkoutExerciseID(i64);

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedSet {
    pub id: SetID,
    pub workout_exercise_id: WorkoutExerciseID,
    pub reps: Reps,
    pub weight: Weight,
    pub position: Position,
    pub created_at: DateTime<Utc>,
}

#[derive(Deref, Display, From, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SetID(i64);

#[derive(Debug, Default, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reps(u32);

impl Reps {
    pub fn new(value: i64) -> Result<Self, RepsError> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| RepsError::OutOfRange)
    }
}

impl TryFrom<&str> for Reps {
    type Error = RepsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().parse::<i64>() {
            Ok(parsed_value) => Reps::new(parsed_value),
            Err(_) => Err(RepsError::ParseError),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RepsError {
    #[error("Reps must not be negative")]
    OutOfRange,
    #[error("Reps must be an integer")]
    ParseError,
}

#[derive(Debug, Default, Display, Clone, Copy, Into, PartialEq, PartialOrd)]
pub struct Weight(f64);

impl Weight {
    pub fn new(value: f64) -> Result<Self, WeightError> {
        if !value.is_finite() || value < 0.0 {
            return Err(WeightError::OutOfRange);
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for Weight {
    type Error = WeightError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.replace(',', ".").trim().parse::<f64>() {
            Ok(parsed_value) => Weight::new(parsed_value),
            Err(_) => Err(WeightError::ParseError),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WeightError {
    #[error("Weight must be a non-negative number")]
    OutOfRange,
    #[error("Weight must be a decimal")]
    ParseError,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{TargetReps, TargetSets};

    use super::*;

    fn workout_exercise(sets: usize, targets: Option<(u32, u32)>) -> WorkoutExercise {
        WorkoutExercise {
            id: 1.into(),
            workout_id: 1.into(),
            exercise: Exercise {
                id: 1.into(),
                name: Name::new("Squat").unwrap(),
                created_at: DateTime::UNIX_EPOCH,
            },
            position: Position::FIRST,
            sets: (0..sets)
                .map(|i| LoggedSet {
                    id: i64::try_from(i).unwrap().into(),
                    workout_exercise_id: 1.into(),
                    reps: Reps(5),
                    weight: Weight(100.0),
                    position: Position::from_index(i),
                    created_at: DateTime::UNIX_EPOCH,
                })
                .collect(),
            last_weight: None,
            targets: targets.map(|(sets, reps)| Targets {
                sets: TargetSets::new(sets).unwrap(),
                reps: TargetReps::new(reps).unwrap(),
            }),
        }
    }

    #[rstest]
    #[case(WorkoutStatus::InProgress, "in_progress")]
    #[case(WorkoutStatus::Finished, "finished")]
    fn test_workout_status_representation(#[case] status: WorkoutStatus, #[case] value: &str) {
        assert_eq!(status.as_ref(), value);
        assert_eq!(WorkoutStatus::from_str(value).unwrap(), status);
    }

    #[test]
    fn test_workout_status_invalid() {
        assert!(WorkoutStatus::from_str("paused").is_err());
    }

    #[rstest]
    #[case("0", Ok(Reps(0)))]
    #[case("12", Ok(Reps(12)))]
    #[case("1000", Ok(Reps(1000)))]
    #[case("1200", Ok(Reps(1200)))]
    #[case("-1", Err(RepsError::OutOfRange))]
    #[case("4294967296", Err(RepsError::OutOfRange))]
    #[case("1.5", Err(RepsError::ParseError))]
    fn test_reps_try_from(#[case] value: &str, #[case] expected: Result<Reps, RepsError>) {
        assert_eq!(Reps::try_from(value), expected);
    }

    #[rstest]
    #[case("0", 0.0)]
    #[case("102.5", 102.5)]
    #[case("22,5", 22.5)]
    #[case("102.3", 102.3)]
    #[case("1000", 1000.0)]
    #[case("1200", 1200.0)]
    fn test_weight_try_from(#[case] value: &str, #[case] expected: f64) {
        assert_approx_eq!(f64::from(Weight::try_from(value).unwrap()), expected);
    }

    #[rstest]
    #[case("-2.5", WeightError::OutOfRange)]
    #[case("NaN", WeightError::OutOfRange)]
    #[case("inf", WeightError::OutOfRange)]
    #[case("heavy", WeightError::ParseError)]
    fn test_weight_try_from_invalid(#[case] value: &str, #[case] expected: WeightError) {
        assert_eq!(Weight::try_from(value), Err(expected));
    }

    #[rstest]
    #[case(0, None, None)]
    #[case(0, Some((5, 5)), Some(5))]
    #[case(3, Some((5, 5)), Some(2))]
    #[case(6, Some((5, 5)), Some(0))]
    fn test_workout_exercise_remaining_sets(
        #[case] sets: usize,
        #[case] targets: Option<(u32, u32)>,
        #[case] expected: Option<u32>,
    ) {
        assert_eq!(workout_exercise(sets, targets).remaining_sets(), expected);
    }

    #[test]
    fn test_workout_num_sets_and_status() {
        let workout = Workout {
            id: 1.into(),
            name: Name::new("Monday").unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            notes: String::new(),
            status: WorkoutStatus::Finished,
            template_id: None,
            created_at: DateTime::UNIX_EPOCH,
            finished_at: Some(DateTime::UNIX_EPOCH),
            exercises: vec![workout_exercise(2, None), workout_exercise(3, None)],
        };
        assert_eq!(workout.num_sets(), 5);
        assert!(workout.is_finished());
    }
}
