#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod dashboard;
mod error;
mod exercise;
mod name;
mod position;
mod routine;
mod service;
mod template;
mod workout;

pub use dashboard::{Dashboard, DashboardService};
pub use error::{CreateError, DeleteError, ReadError, StorageError, UpdateError, ValidationError};
pub use exercise::{Exercise, ExerciseID, ExerciseRepository, ExerciseService};
pub use name::{Name, NameError};
pub use position::{Position, PositionError, is_dense, is_permutation};
pub use routine::{
    Routine, RoutineID, RoutineRepository, RoutineService, RoutineTemplate, RoutineTemplateID,
};
pub use service::Service;
pub use template::{
    TargetError, TargetReps, TargetSets, Targets, Template, TemplateExercise, TemplateExerciseID,
    TemplateID, TemplateRepository, TemplateService,
};
pub use workout::{
    LoggedSet, Reps, RepsError, SetID, Weight, WeightError, Workout, WorkoutExercise,
    WorkoutExerciseID, WorkoutID, WorkoutRepository, WorkoutService, WorkoutStatus,
    WorkoutSummary,
};
