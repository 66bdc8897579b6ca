use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, error, warn};

use crate::{
    CreateError, Dashboard, DashboardService, DeleteError, Exercise, ExerciseID,
    ExerciseRepository, ExerciseService, LoggedSet, Name, ReadError, Reps, Routine, RoutineID,
    RoutineRepository, RoutineService, RoutineTemplate, RoutineTemplateID, SetID, Targets,
    Template, TemplateExercise, TemplateExerciseID, TemplateID, TemplateRepository,
    TemplateService, UpdateError, Weight, Workout, WorkoutExercise, WorkoutExerciseID, WorkoutID,
    WorkoutRepository, WorkoutService, WorkoutSummary,
};

pub struct Service<R> {
    repository: R,
}

impl<R> Service<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }
}

macro_rules! log_on_error {
    ($func: expr, $error: ident, $action: literal, $entity: literal) => {{
        let result = $func;
        #[allow(unreachable_patterns)]
        match result {
            Ok(_) => {}
            Err($error::Storage(crate::StorageError::Unavailable)) => {
                debug!("failed to {} {}: storage unavailable", $action, $entity);
            }
            Err($error::Storage(ref err)) => {
                error!("failed to {} {}: {err}", $action, $entity);
            }
            Err(ref err) => {
                warn!("failed to {} {}: {err}", $action, $entity);
            }
        }
        result
    }};
}

impl<R: ExerciseRepository> ExerciseService for Service<R> {
    fn get_exercises(&self) -> Result<Vec<Exercise>, ReadError> {
        log_on_error!(
            self.repository.read_exercises(),
            ReadError,
            "get",
            "exercises"
        )
    }

    fn get_exercise(&self, id: ExerciseID) -> Result<Option<Exercise>, ReadError> {
        log_on_error!(
            self.repository.read_exercise(id),
            ReadError,
            "get",
            "exercise"
        )
    }

    fn search_exercises(&self, query: &str) -> Result<Vec<Exercise>, ReadError> {
        log_on_error!(
            self.repository.search_exercises(query),
            ReadError,
            "search",
            "exercises"
        )
    }

    fn create_exercise(&self, name: Name) -> Result<Exercise, CreateError> {
        log_on_error!(
            self.repository.create_exercise(name),
            CreateError,
            "create",
            "exercise"
        )
    }

    fn delete_exercise(&self, id: ExerciseID) -> Result<ExerciseID, DeleteError> {
        log_on_error!(
            self.repository.delete_exercise(id),
            DeleteError,
            "delete",
            "exercise"
        )
    }
}

impl<R: TemplateRepository> TemplateService for Service<R> {
    fn get_templates(&self) -> Result<Vec<Template>, ReadError> {
        log_on_error!(
            self.repository.read_templates(),
            ReadError,
            "get",
            "templates"
        )
    }

    fn get_template(&self, id: TemplateID) -> Result<Option<Template>, ReadError> {
        log_on_error!(
            self.repository.read_template(id),
            ReadError,
            "get",
            "template"
        )
    }

    fn create_template(&self, name: Name) -> Result<Template, CreateError> {
        log_on_error!(
            self.repository.create_template(name),
            CreateError,
            "create",
            "template"
        )
    }

    fn modify_template(&self, id: TemplateID, name: Name) -> Result<Template, UpdateError> {
        log_on_error!(
            self.repository.modify_template(id, name),
            UpdateError,
            "modify",
            "template"
        )
    }

    fn delete_template(&self, id: TemplateID) -> Result<TemplateID, DeleteError> {
        log_on_error!(
            self.repository.delete_template(id),
            DeleteError,
            "delete",
            "template"
        )
    }

    fn get_template_exercise(
        &self,
        id: TemplateExerciseID,
    ) -> Result<Option<TemplateExercise>, ReadError> {
        log_on_error!(
            self.repository.read_template_exercise(id),
            ReadError,
            "get",
            "template exercise"
        )
    }

    fn add_template_exercise(
        &self,
        template_id: TemplateID,
        exercise_id: ExerciseID,
        targets: Targets,
    ) -> Result<TemplateExercise, CreateError> {
        log_on_error!(
            self.repository
                .add_template_exercise(template_id, exercise_id, targets),
            CreateError,
            "add",
            "template exercise"
        )
    }

    fn modify_template_exercise(
        &self,
        id: TemplateExerciseID,
        targets: Targets,
    ) -> Result<TemplateExercise, UpdateError> {
        log_on_error!(
            self.repository.modify_template_exercise(id, targets),
            UpdateError,
            "modify",
            "template exercise"
        )
    }

    fn remove_template_exercise(
        &self,
        id: TemplateExerciseID,
    ) -> Result<TemplateExerciseID, DeleteError> {
        log_on_error!(
            self.repository.remove_template_exercise(id),
            DeleteError,
            "remove",
            "template exercise"
        )
    }

    fn reorder_template_exercises(
        &self,
        template_id: TemplateID,
        order: &[TemplateExerciseID],
    ) -> Result<Template, UpdateError> {
        log_on_error!(
            self.repository
                .reorder_template_exercises(template_id, order),
            UpdateError,
            "reorder",
            "template exercises"
        )
    }
}

impl<R: RoutineRepository> RoutineService for Service<R> {
    fn get_routines(&self) -> Result<Vec<Routine>, ReadError> {
        log_on_error!(
            self.repository.read_routines(),
            ReadError,
            "get",
            "routines"
        )
    }

    fn get_routine(&self, id: RoutineID) -> Result<Option<Routine>, ReadError> {
        log_on_error!(
            self.repository.read_routine(id),
            ReadError,
            "get",
            "routine"
        )
    }

    fn create_routine(&self, name: Name) -> Result<Routine, CreateError> {
        log_on_error!(
            self.repository.create_routine(name),
            CreateError,
            "create",
            "routine"
        )
    }

    fn modify_routine(&self, id: RoutineID, name: Name) -> Result<Routine, UpdateError> {
        log_on_error!(
            self.repository.modify_routine(id, name),
            UpdateError,
            "modify",
            "routine"
        )
    }

    fn delete_routine(&self, id: RoutineID) -> Result<RoutineID, DeleteError> {
        log_on_error!(
            self.repository.delete_routine(id),
            DeleteError,
            "delete",
            "routine"
        )
    }

    fn get_routine_template(
        &self,
        id: RoutineTemplateID,
    ) -> Result<Option<RoutineTemplate>, ReadError> {
        log_on_error!(
            self.repository.read_routine_template(id),
            ReadError,
            "get",
            "routine template"
        )
    }

    fn add_routine_template(
        &self,
        routine_id: RoutineID,
        template_id: TemplateID,
    ) -> Result<RoutineTemplate, CreateError> {
        log_on_error!(
            self.repository.add_routine_template(routine_id, template_id),
            CreateError,
            "add",
            "routine template"
        )
    }

    fn remove_routine_template(
        &self,
        id: RoutineTemplateID,
    ) -> Result<RoutineTemplateID, DeleteError> {
        log_on_error!(
            self.repository.remove_routine_template(id),
            DeleteError,
            "remove",
            "routine template"
        )
    }

    fn reorder_routine_templates(
        &self,
        routine_id: RoutineID,
        order: &[RoutineTemplateID],
    ) -> Result<Routine, UpdateError> {
        log_on_error!(
            self.repository.reorder_routine_templates(routine_id, order),
            UpdateError,
            "reorder",
            "routine templates"
        )
    }
}

impl<R: WorkoutRepository> WorkoutService for Service<R> {
    fn get_in_progress_workouts(&self) -> Result<Vec<WorkoutSummary>, ReadError> {
        log_on_error!(
            self.repository.read_in_progress_workouts(),
            ReadError,
            "get",
            "in-progress workouts"
        )
    }

    fn get_finished_workouts(&self) -> Result<Vec<WorkoutSummary>, ReadError> {
        log_on_error!(
            self.repository.read_finished_workouts(),
            ReadError,
            "get",
            "finished workouts"
        )
    }

    fn get_workout(&self, id: WorkoutID) -> Result<Option<Workout>, ReadError> {
        log_on_error!(
            self.repository.read_workout(id),
            ReadError,
            "get",
            "workout"
        )
    }

    fn create_workout(
        &self,
        name: Name,
        date: NaiveDate,
        template_id: Option<TemplateID>,
    ) -> Result<Workout, CreateError> {
        log_on_error!(
            self.repository.create_workout(name, date, template_id),
            CreateError,
            "create",
            "workout"
        )
    }

    fn create_workout_from_template(
        &self,
        name: Name,
        date: NaiveDate,
        template_id: TemplateID,
    ) -> Result<Workout, CreateError> {
        log_on_error!(
            self.repository
                .create_workout_from_template(name, date, template_id),
            CreateError,
            "create",
            "workout from template"
        )
    }

    fn modify_workout(
        &self,
        id: WorkoutID,
        name: Name,
        date: NaiveDate,
        notes: String,
    ) -> Result<Workout, UpdateError> {
        log_on_error!(
            self.repository.modify_workout(id, name, date, notes),
            UpdateError,
            "modify",
            "workout"
        )
    }

    fn finish_workout(&self, id: WorkoutID) -> Result<Workout, UpdateError> {
        log_on_error!(
            self.repository.finish_workout(id),
            UpdateError,
            "finish",
            "workout"
        )
    }

    fn delete_workout(&self, id: WorkoutID) -> Result<WorkoutID, DeleteError> {
        log_on_error!(
            self.repository.delete_workout(id),
            DeleteError,
            "delete",
            "workout"
        )
    }

    fn get_workout_exercise(
        &self,
        id: WorkoutExerciseID,
    ) -> Result<Option<WorkoutExercise>, ReadError> {
        log_on_error!(
            self.repository.read_workout_exercise(id),
            ReadError,
            "get",
            "workout exercise"
        )
    }

    fn add_workout_exercise(
        &self,
        workout_id: WorkoutID,
        exercise_id: ExerciseID,
    ) -> Result<WorkoutExercise, CreateError> {
        log_on_error!(
            self.repository.add_workout_exercise(workout_id, exercise_id),
            CreateError,
            "add",
            "workout exercise"
        )
    }

    fn remove_workout_exercise(
        &self,
        id: WorkoutExerciseID,
    ) -> Result<WorkoutExerciseID, DeleteError> {
        log_on_error!(
            self.repository.remove_workout_exercise(id),
            DeleteError,
            "remove",
            "workout exercise"
        )
    }

    fn reorder_workout_exercises(
        &self,
        workout_id: WorkoutID,
        order: &[WorkoutExerciseID],
    ) -> Result<Workout, UpdateError> {
        log_on_error!(
            self.repository.reorder_workout_exercises(workout_id, order),
            UpdateError,
            "reorder",
            "workout exercises"
        )
    }

    fn get_set(&self, id: SetID) -> Result<Option<LoggedSet>, ReadError> {
        log_on_error!(self.repository.read_set(id), ReadError, "get", "set")
    }

    fn get_sets(
        &self,
        workout_exercise_id: WorkoutExerciseID,
    ) -> Result<Vec<LoggedSet>, ReadError> {
        log_on_error!(
            self.repository.read_sets(workout_exercise_id),
            ReadError,
            "get",
            "sets"
        )
    }

    fn get_sets_batch(
        &self,
        workout_exercise_ids: &[WorkoutExerciseID],
    ) -> Result<BTreeMap<WorkoutExerciseID, Vec<LoggedSet>>, ReadError> {
        log_on_error!(
            self.repository.read_sets_batch(workout_exercise_ids),
            ReadError,
            "get",
            "sets"
        )
    }

    fn add_set(
        &self,
        workout_exercise_id: WorkoutExerciseID,
        reps: Reps,
        weight: Weight,
    ) -> Result<LoggedSet, CreateError> {
        log_on_error!(
            self.repository.add_set(workout_exercise_id, reps, weight),
            CreateError,
            "add",
            "set"
        )
    }

    fn modify_set(&self, id: SetID, reps: Reps, weight: Weight) -> Result<LoggedSet, UpdateError> {
        log_on_error!(
            self.repository.modify_set(id, reps, weight),
            UpdateError,
            "modify",
            "set"
        )
    }

    fn delete_set(&self, id: SetID) -> Result<SetID, DeleteError> {
        log_on_error!(
            self.repository.delete_set(id),
            DeleteError,
            "delete",
            "set"
        )
    }

    fn get_last_weight(
        &self,
        exercise_id: ExerciseID,
        exclude: WorkoutID,
    ) -> Result<Option<Weight>, ReadError> {
        log_on_error!(
            self.repository.read_last_weight(exercise_id, exclude),
            ReadError,
            "get",
            "last weight"
        )
    }

    fn get_last_weights(
        &self,
        exercise_ids: &[ExerciseID],
        exclude: WorkoutID,
    ) -> Result<BTreeMap<ExerciseID, Option<Weight>>, ReadError> {
        log_on_error!(
            self.repository.read_last_weight_batch(exercise_ids, exclude),
            ReadError,
            "get",
            "last weights"
        )
    }

    fn get_template_targets(
        &self,
        template_id: TemplateID,
        exercise_id: ExerciseID,
    ) -> Result<Option<Targets>, ReadError> {
        log_on_error!(
            self.repository
                .read_template_targets(template_id, exercise_id),
            ReadError,
            "get",
            "template targets"
        )
    }

    fn get_template_targets_batch(
        &self,
        template_id: TemplateID,
        exercise_ids: &[ExerciseID],
    ) -> Result<BTreeMap<ExerciseID, Option<Targets>>, ReadError> {
        log_on_error!(
            self.repository
                .read_template_targets_batch(template_id, exercise_ids),
            ReadError,
            "get",
            "template targets"
        )
    }
}

impl<R: WorkoutRepository + TemplateRepository + RoutineRepository> DashboardService
    for Service<R>
{
    fn get_dashboard(&self) -> Result<Dashboard, ReadError> {
        let in_progress = self.get_in_progress_workouts()?;
        let mut recent = self.get_finished_workouts()?;
        recent.truncate(Dashboard::RECENT_WORKOUTS);
        Ok(Dashboard {
            in_progress,
            recent,
            templates: self.get_templates()?,
            routines: self.get_routines()?,
        })
    }
}
