use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, From, Into};

use crate::{
    CreateError, DeleteError, Exercise, ExerciseID, Name, Position, ReadError, UpdateError,
    ValidationError,
};

pub trait TemplateService {
    fn get_templates(&self) -> Result<Vec<Template>, ReadError>;
    fn get_template(&self, id: TemplateID) -> Result<Option<Template>, ReadError>;
    fn create_template(&self, name: Name) -> Result<Template, CreateError>;
    fn modify_template(&self, id: TemplateID, name: Name) -> Result<Template, UpdateError>;
    fn delete_template(&self, id: TemplateID) -> Result<TemplateID, DeleteError>;

    fn get_template_exercise(
        &self,
        id: TemplateExerciseID,
    ) -> Result<Option<TemplateExercise>, ReadError>;
    fn add_template_exercise(
        &self,
        template_id: TemplateID,
        exercise_id: ExerciseID,
        targets: Targets,
    ) -> Result<TemplateExercise, CreateError>;
    fn modify_template_exercise(
        &self,
        id: TemplateExerciseID,
        targets: Targets,
    ) -> Result<TemplateExercise, UpdateError>;
    fn remove_template_exercise(
        &self,
        id: TemplateExerciseID,
    ) -> Result<TemplateExerciseID, DeleteError>;
    fn reorder_template_exercises(
        &self,
        template_id: TemplateID,
        order: &[TemplateExerciseID],
    ) -> Result<Template, UpdateError>;

    fn validate_template_name(&self, name: &str) -> Result<Name, ValidationError> {
        Name::new(name).map_err(|err| ValidationError::Other(err.into()))
    }

    fn validate_targets(&self, sets: &str, reps: &str) -> Result<Targets, ValidationError> {
        let sets = TargetSets::try_from(sets).map_err(|err| ValidationError::Other(err.into()))?;
        let reps = TargetReps::try_from(reps).map_err(|err| ValidationError::Other(err.into()))?;
        Ok(Targets { sets, reps })
    }
}

pub trait TemplateRepository {
    /// All templates ordered by name, without their exercises.
    fn read_templates(&self) -> Result<Vec<Template>, ReadError>;
    fn read_template(&self, id: TemplateID) -> Result<Option<Template>, ReadError>;
    fn create_template(&self, name: Name) -> Result<Template, CreateError>;
    fn modify_template(&self, id: TemplateID, name: Name) -> Result<Template, UpdateError>;
    /// Removes the template and its exercises. Workouts created from it lose their link.
    fn delete_template(&self, id: TemplateID) -> Result<TemplateID, DeleteError>;

    fn read_template_exercise(
        &self,
        id: TemplateExerciseID,
    ) -> Result<Option<TemplateExercise>, ReadError>;
    /// Appends the exercise after the current last position.
    fn add_template_exercise(
        &self,
        template_id: TemplateID,
        exercise_id: ExerciseID,
        targets: Targets,
    ) -> Result<TemplateExercise, CreateError>;
    fn modify_template_exercise(
        &self,
        id: TemplateExerciseID,
        targets: Targets,
    ) -> Result<TemplateExercise, UpdateError>;
    /// Removes a single entry. Remaining positions are kept as they are.
    fn remove_template_exercise(
        &self,
        id: TemplateExerciseID,
    ) -> Result<TemplateExerciseID, DeleteError>;
    /// Assigns positions 1..=n in the given order, atomically.
    fn reorder_template_exercises(
        &self,
        template_id: TemplateID,
        order: &[TemplateExerciseID],
    ) -> Result<Template, UpdateError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: TemplateID,
    pub name: Name,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub exercises: Vec<TemplateExercise>,
}

impl Template {
    #[must_use]
    pub fn targets(&self, exercise_id: ExerciseID) -> Option<Targets> {
        self.exercises
            .iter()
            .filter(|e| e.exercise.id == exercise_id)
            .min_by_key(|e| e.position)
            .map(|e| e.targets)
    }
}

#[derive(Deref, Display, From, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TemplateID(i64);

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateExercise {
    pub id: TemplateExerciseID,
    pub template_id: TemplateID,
    pub exercise: Exercise,
    pub targets: Targets,
    pub position: Position,
}

#[derive(Deref, Display, From, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TemplateExerciseID(i64);

/// Planned volume of a template exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targets {
    pub sets: TargetSets,
    pub reps: TargetReps,
}

#[derive(Debug, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct TargetSets(u32);

impl TargetSets {
    pub fn new(value: u32) -> Result<Self, TargetError> {
        if value < 1 {
            return Err(TargetError::OutOfRange);
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for TargetSets {
    type Error = TargetError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().parse::<u32>() {
            Ok(parsed_value) => TargetSets::new(parsed_value),
            Err(_) => Err(TargetError::ParseError),
        }
    }
}

#[derive(Debug, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct TargetReps(u32);

impl TargetReps {
    pub fn new(value: u32) -> Result<Self, TargetError> {
        if value < 1 {
            return Err(TargetError::OutOfRange);
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for TargetReps {
    type Error = TargetError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().parse::<u32>() {
            Ok(parsed_value) => TargetReps::new(parsed_value),
            Err(_) => Err(TargetError::ParseError),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TargetError {
    #[error("Target must be at least 1")]
    OutOfRange,
    #[error("Target must be an integer")]
    ParseError,
}
