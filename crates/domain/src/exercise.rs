use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, From};

use crate::{CreateError, DeleteError, Name, ReadError, ValidationError};

pub trait ExerciseService {
    fn get_exercises(&self) -> Result<Vec<Exercise>, ReadError>;
    fn get_exercise(&self, id: ExerciseID) -> Result<Option<Exercise>, ReadError>;
    fn search_exercises(&self, query: &str) -> Result<Vec<Exercise>, ReadError>;
    fn create_exercise(&self, name: Name) -> Result<Exercise, CreateError>;
    fn delete_exercise(&self, id: ExerciseID) -> Result<ExerciseID, DeleteError>;

    fn validate_exercise_name(&self, name: &str) -> Result<Name, ValidationError> {
        match Name::new(name) {
            Ok(name) => match self.get_exercises() {
                Ok(exercises) => {
                    if exercises.iter().all(|e| e.name != name) {
                        Ok(name)
                    } else {
                        Err(ValidationError::Conflict("name".to_string()))
                    }
                }
                Err(err) => Err(ValidationError::Other(err.into())),
            },
            Err(err) => Err(ValidationError::Other(err.into())),
        }
    }
}

pub trait ExerciseRepository {
    fn read_exercises(&self) -> Result<Vec<Exercise>, ReadError>;
    fn read_exercise(&self, id: ExerciseID) -> Result<Option<Exercise>, ReadError>;
    /// Exercises whose name contains `query`, ordered by name.
    ///
    /// An empty query matches every exercise.
    fn search_exercises(&self, query: &str) -> Result<Vec<Exercise>, ReadError>;
    fn create_exercise(&self, name: Name) -> Result<Exercise, CreateError>;
    fn delete_exercise(&self, id: ExerciseID) -> Result<ExerciseID, DeleteError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    pub id: ExerciseID,
    pub name: Name,
    pub created_at: DateTime<Utc>,
}

#[derive(Deref, Display, From, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExerciseID(i64);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct Catalog {
        exercises: Vec<Exercise>,
    }

    impl ExerciseService for Catalog {
        fn get_exercises(&self) -> Result<Vec<Exercise>, ReadError> {
            Ok(self.exercises.clone())
        }

        fn get_exercise(&self, id: ExerciseID) -> Result<Option<Exercise>, ReadError> {
            Ok(self.exercises.iter().find(|e| e.id == id).cloned())
        }

        fn search_exercises(&self, _: &str) -> Result<Vec<Exercise>, ReadError> {
            unimplemented!()
        }

        fn create_exercise(&self, _: Name) -> Result<Exercise, CreateError> {
            unimplemented!()
        }

        fn delete_exercise(&self, _: ExerciseID) -> Result<ExerciseID, DeleteError> {
            unimplemented!()
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            exercises: vec![Exercise {
                id: 1.into(),
                name: Name::new("Squat").unwrap(),
                created_at: DateTime::UNIX_EPOCH,
            }],
        }
    }

    #[test]
    fn test_validate_exercise_name() {
        assert_eq!(
            catalog().validate_exercise_name(" Bench Press ").unwrap(),
            Name::new("Bench Press").unwrap()
        );
    }

    #[test]
    fn test_validate_exercise_name_conflict() {
        assert!(matches!(
            catalog().validate_exercise_name("Squat"),
            Err(ValidationError::Conflict(field)) if field == "name"
        ));
    }

    #[test]
    fn test_validate_exercise_name_is_case_sensitive() {
        assert!(catalog().validate_exercise_name("squat").is_ok());
    }

    #[test]
    fn test_validate_exercise_name_empty() {
        assert!(matches!(
            catalog().validate_exercise_name("  "),
            Err(ValidationError::Other(err)) if err.to_string() == "Name must not be empty"
        ));
    }
}
