use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};
use liftbook_domain as domain;
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::{
    Error, Sqlite,
    error::invalid_value,
    exercise::{exercise_from_row, read_exercise},
    ordered::{LOGGED_SETS, WORKOUT_EXERCISES},
    template::{read_targets, read_template, targets_from_row, template_exists},
};

const SELECT_WORKOUT: &str = "
    SELECT id, name, date, notes, status, template_id, created_at, finished_at
    FROM workouts";

const SELECT_WORKOUT_EXERCISE: &str = "
    SELECT we.id, we.workout_id, we.position, e.id, e.name, e.created_at
    FROM workout_exercises we
    JOIN exercises e ON e.id = we.exercise_id";

const SELECT_SET: &str = "
    SELECT id, workout_exercise_id, reps, weight, position, created_at
    FROM logged_sets";

const PREVIOUS_SETS: &str = "
    FROM logged_sets ls
    JOIN workout_exercises we ON we.id = ls.workout_exercise_id
    JOIN workouts w ON w.id = we.workout_id
    WHERE w.status = 'finished' AND w.id != ?1";

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn status_from_row(row: &Row, index: usize) -> rusqlite::Result<domain::WorkoutStatus> {
    row.get::<_, String>(index)?
        .parse()
        .map_err(|err| invalid_value(index, err))
}

fn workout_from_row(row: &Row) -> rusqlite::Result<domain::Workout> {
    Ok(domain::Workout {
        id: row.get::<_, i64>(0)?.into(),
        name: domain::Name::new(&row.get::<_, String>(1)?).map_err(|err| invalid_value(1, err))?,
        date: row.get(2)?,
        notes: row.get(3)?,
        status: status_from_row(row, 4)?,
        template_id: row.get::<_, Option<i64>>(5)?.map(domain::TemplateID::from),
        created_at: row.get(6)?,
        finished_at: row.get(7)?,
        exercises: vec![],
    })
}

fn summary_from_row(row: &Row) -> rusqlite::Result<domain::WorkoutSummary> {
    Ok(domain::WorkoutSummary {
        id: row.get::<_, i64>(0)?.into(),
        name: domain::Name::new(&row.get::<_, String>(1)?).map_err(|err| invalid_value(1, err))?,
        date: row.get(2)?,
        status: status_from_row(row, 3)?,
        exercise_count: row.get(4)?,
        set_count: row.get(5)?,
    })
}

/// Maps a workout exercise without its sets, last weight and targets.
fn workout_exercise_from_row(row: &Row) -> rusqlite::Result<domain::WorkoutExercise> {
    Ok(domain::WorkoutExercise {
        id: row.get::<_, i64>(0)?.into(),
        workout_id: row.get::<_, i64>(1)?.into(),
        position: domain::Position::try_from(row.get::<_, i64>(2)?)
            .map_err(|err| invalid_value(2, err))?,
        exercise: exercise_from_row(row, 3)?,
        sets: vec![],
        last_weight: None,
        targets: None,
    })
}

fn set_from_row(row: &Row) -> rusqlite::Result<domain::LoggedSet> {
    Ok(domain::LoggedSet {
        id: row.get::<_, i64>(0)?.into(),
        workout_exercise_id: row.get::<_, i64>(1)?.into(),
        reps: domain::Reps::new(row.get(2)?).map_err(|err| invalid_value(2, err))?,
        weight: weight_from_row(row, 3)?,
        position: domain::Position::try_from(row.get::<_, i64>(4)?)
            .map_err(|err| invalid_value(4, err))?,
        created_at: row.get(5)?,
    })
}

fn weight_from_row(row: &Row, index: usize) -> rusqlite::Result<domain::Weight> {
    domain::Weight::new(row.get(index)?).map_err(|err| invalid_value(index, err))
}

fn read_summaries(
    connection: &Connection,
    status: domain::WorkoutStatus,
) -> Result<Vec<domain::WorkoutSummary>, Error> {
    let mut stmt = connection.prepare(
        "SELECT w.id, w.name, w.date, w.status, COUNT(DISTINCT we.id), COUNT(ls.id)
         FROM workouts w
         LEFT JOIN workout_exercises we ON we.workout_id = w.id
         LEFT JOIN logged_sets ls ON ls.workout_exercise_id = we.id
         WHERE w.status = ?1
         GROUP BY w.id
         ORDER BY w.date DESC, w.created_at DESC, w.id DESC",
    )?;
    let summaries = stmt
        .query_map([status.as_ref()], summary_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(summaries)
}

fn read_status(
    connection: &Connection,
    id: domain::WorkoutID,
) -> Result<Option<domain::WorkoutStatus>, Error> {
    Ok(connection
        .query_row("SELECT status FROM workouts WHERE id = ?1", [*id], |row| {
            status_from_row(row, 0)
        })
        .optional()?)
}

/// Fails unless the workout exists and is in progress.
///
/// Must be called in the transaction of the subsequent change.
fn ensure_in_progress(connection: &Connection, id: domain::WorkoutID) -> Result<(), Error> {
    match read_status(connection, id)? {
        Some(domain::WorkoutStatus::InProgress) => Ok(()),
        Some(domain::WorkoutStatus::Finished) => Err(Error::Finished),
        None => Err(Error::NotFound),
    }
}

fn workout_of_workout_exercise(
    connection: &Connection,
    id: domain::WorkoutExerciseID,
) -> Result<domain::WorkoutID, Error> {
    WORKOUT_EXERCISES
        .parent_of(connection, *id)?
        .map(domain::WorkoutID::from)
        .ok_or(Error::NotFound)
}

fn workout_of_set(connection: &Connection, id: domain::SetID) -> Result<domain::WorkoutID, Error> {
    connection
        .query_row(
            "SELECT we.workout_id
             FROM logged_sets ls
             JOIN workout_exercises we ON we.id = ls.workout_exercise_id
             WHERE ls.id = ?1",
            [*id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .map(domain::WorkoutID::from)
        .ok_or(Error::NotFound)
}

fn read_workout(
    connection: &Connection,
    id: domain::WorkoutID,
) -> Result<Option<domain::Workout>, Error> {
    let Some(mut workout) = connection
        .query_row(&format!("{SELECT_WORKOUT} WHERE id = ?1"), [*id], workout_from_row)
        .optional()?
    else {
        return Ok(None);
    };

    let mut stmt = connection.prepare(&format!(
        "{SELECT_WORKOUT_EXERCISE} WHERE we.workout_id = ?1 ORDER BY we.position"
    ))?;
    let mut exercises = stmt
        .query_map([*id], workout_exercise_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let workout_exercise_ids = exercises.iter().map(|e| e.id).collect::<Vec<_>>();
    let exercise_ids = exercises.iter().map(|e| e.exercise.id).collect::<Vec<_>>();
    let mut sets = read_sets_batch(connection, &workout_exercise_ids)?;
    let last_weights = read_last_weight_batch(connection, &exercise_ids, id)?;
    let targets = match workout.template_id {
        Some(template_id) => read_targets(connection, template_id, &exercise_ids)?,
        None => BTreeMap::new(),
    };

    for exercise in &mut exercises {
        exercise.sets = sets.remove(&exercise.id).unwrap_or_default();
        exercise.last_weight = last_weights.get(&exercise.exercise.id).copied().flatten();
        exercise.targets = targets.get(&exercise.exercise.id).copied().flatten();
    }
    workout.exercises = exercises;

    Ok(Some(workout))
}

fn read_workout_exercise(
    connection: &Connection,
    id: domain::WorkoutExerciseID,
) -> Result<Option<domain::WorkoutExercise>, Error> {
    let Some(mut exercise) = connection
        .query_row(
            &format!("{SELECT_WORKOUT_EXERCISE} WHERE we.id = ?1"),
            [*id],
            workout_exercise_from_row,
        )
        .optional()?
    else {
        return Ok(None);
    };

    let template_id = connection
        .query_row(
            "SELECT template_id FROM workouts WHERE id = ?1",
            [*exercise.workout_id],
            |row| row.get::<_, Option<i64>>(0),
        )?
        .map(domain::TemplateID::from);

    exercise.sets = read_sets(connection, id)?;
    exercise.last_weight = read_last_weight(connection, exercise.exercise.id, exercise.workout_id)?;
    exercise.targets = match template_id {
        Some(template_id) => {
            read_single_template_targets(connection, template_id, exercise.exercise.id)?
        }
        None => None,
    };

    Ok(Some(exercise))
}

fn read_set(connection: &Connection, id: domain::SetID) -> Result<Option<domain::LoggedSet>, Error> {
    Ok(connection
        .query_row(&format!("{SELECT_SET} WHERE id = ?1"), [*id], set_from_row)
        .optional()?)
}

fn read_sets(
    connection: &Connection,
    workout_exercise_id: domain::WorkoutExerciseID,
) -> Result<Vec<domain::LoggedSet>, Error> {
    let mut stmt = connection.prepare(&format!(
        "{SELECT_SET} WHERE workout_exercise_id = ?1 ORDER BY position"
    ))?;
    let sets = stmt
        .query_map([*workout_exercise_id], set_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sets)
}

fn read_sets_batch(
    connection: &Connection,
    workout_exercise_ids: &[domain::WorkoutExerciseID],
) -> Result<BTreeMap<domain::WorkoutExerciseID, Vec<domain::LoggedSet>>, Error> {
    let ids = workout_exercise_ids.iter().copied().collect::<BTreeSet<_>>();
    let mut sets = ids
        .iter()
        .map(|id| (*id, vec![]))
        .collect::<BTreeMap<_, _>>();

    if ids.is_empty() {
        return Ok(sets);
    }

    let mut stmt = connection.prepare(&format!(
        "{SELECT_SET} WHERE workout_exercise_id IN ({})
         ORDER BY workout_exercise_id, position",
        placeholders(ids.len())
    ))?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter().map(|id| **id)), set_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for set in rows {
        sets.entry(set.workout_exercise_id).or_default().push(set);
    }

    Ok(sets)
}

fn read_last_weight(
    connection: &Connection,
    exercise_id: domain::ExerciseID,
    exclude: domain::WorkoutID,
) -> Result<Option<domain::Weight>, Error> {
    Ok(connection
        .query_row(
            &format!(
                "SELECT ls.weight {PREVIOUS_SETS} AND we.exercise_id = ?2
                 ORDER BY w.date DESC, ls.created_at DESC, ls.id DESC
                 LIMIT 1"
            ),
            [*exclude, *exercise_id],
            |row| weight_from_row(row, 0),
        )
        .optional()?)
}

fn read_last_weight_batch(
    connection: &Connection,
    exercise_ids: &[domain::ExerciseID],
    exclude: domain::WorkoutID,
) -> Result<BTreeMap<domain::ExerciseID, Option<domain::Weight>>, Error> {
    let ids = exercise_ids.iter().copied().collect::<BTreeSet<_>>();
    let mut weights = ids
        .iter()
        .map(|id| (*id, None))
        .collect::<BTreeMap<_, _>>();

    if ids.is_empty() {
        return Ok(weights);
    }

    let mut stmt = connection.prepare(&format!(
        "SELECT exercise_id, weight FROM (
             SELECT we.exercise_id, ls.weight, ROW_NUMBER() OVER (
                 PARTITION BY we.exercise_id
                 ORDER BY w.date DESC, ls.created_at DESC, ls.id DESC
             ) AS rank
             {PREVIOUS_SETS} AND we.exercise_id IN ({})
         )
         WHERE rank = 1",
        placeholders(ids.len())
    ))?;
    let rows = stmt
        .query_map(
            params_from_iter(std::iter::once(*exclude).chain(ids.iter().map(|id| **id))),
            |row| {
                Ok((
                    domain::ExerciseID::from(row.get::<_, i64>(0)?),
                    weight_from_row(row, 1)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    for (exercise_id, weight) in rows {
        weights.insert(exercise_id, Some(weight));
    }

    Ok(weights)
}

fn read_single_template_targets(
    connection: &Connection,
    template_id: domain::TemplateID,
    exercise_id: domain::ExerciseID,
) -> Result<Option<domain::Targets>, Error> {
    Ok(connection
        .query_row(
            "SELECT target_sets, target_reps
             FROM template_exercises
             WHERE template_id = ?1 AND exercise_id = ?2
             ORDER BY position
             LIMIT 1",
            [*template_id, *exercise_id],
            |row| targets_from_row(row, 0),
        )
        .optional()?)
}

fn insert_workout(
    connection: &Connection,
    name: &domain::Name,
    date: NaiveDate,
    template_id: Option<domain::TemplateID>,
) -> Result<domain::WorkoutID, Error> {
    connection.execute(
        "INSERT INTO workouts (name, date, notes, status, template_id, created_at)
         VALUES (?1, ?2, '', ?3, ?4, ?5)",
        params![
            name.as_str(),
            date,
            domain::WorkoutStatus::InProgress.as_ref(),
            template_id.map(|id| *id),
            Utc::now()
        ],
    )?;
    Ok(connection.last_insert_rowid().into())
}

fn insert_workout_exercise(
    connection: &Connection,
    workout_id: domain::WorkoutID,
    exercise_id: domain::ExerciseID,
    position: domain::Position,
) -> Result<domain::WorkoutExerciseID, Error> {
    connection.execute(
        "INSERT INTO workout_exercises (workout_id, exercise_id, position) VALUES (?1, ?2, ?3)",
        params![*workout_id, *exercise_id, i64::from(position)],
    )?;
    Ok(connection.last_insert_rowid().into())
}

impl domain::WorkoutRepository for Sqlite {
    fn read_in_progress_workouts(&self) -> Result<Vec<domain::WorkoutSummary>, domain::ReadError> {
        Ok(self.read(|connection| read_summaries(connection, domain::WorkoutStatus::InProgress))?)
    }

    fn read_finished_workouts(&self) -> Result<Vec<domain::WorkoutSummary>, domain::ReadError> {
        Ok(self.read(|connection| read_summaries(connection, domain::WorkoutStatus::Finished))?)
    }

    fn read_workout(
        &self,
        id: domain::WorkoutID,
    ) -> Result<Option<domain::Workout>, domain::ReadError> {
        Ok(self.read(|connection| read_workout(connection, id))?)
    }

    fn create_workout(
        &self,
        name: domain::Name,
        date: NaiveDate,
        template_id: Option<domain::TemplateID>,
    ) -> Result<domain::Workout, domain::CreateError> {
        Ok(self.write(|connection| {
            if let Some(template_id) = template_id
                && !template_exists(connection, template_id)?
            {
                return Err(Error::NotFound);
            }

            let id = insert_workout(connection, &name, date, template_id)?;

            read_workout(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn create_workout_from_template(
        &self,
        name: domain::Name,
        date: NaiveDate,
        template_id: domain::TemplateID,
    ) -> Result<domain::Workout, domain::CreateError> {
        Ok(self.write(|connection| {
            // All rows are read before the first insert.
            let template = read_template(connection, template_id)?.ok_or(Error::NotFound)?;

            let id = insert_workout(connection, &name, date, Some(template_id))?;
            for (index, exercise) in template.exercises.iter().enumerate() {
                insert_workout_exercise(
                    connection,
                    id,
                    exercise.exercise.id,
                    domain::Position::from_index(index),
                )?;
            }

            read_workout(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn modify_workout(
        &self,
        id: domain::WorkoutID,
        name: domain::Name,
        date: NaiveDate,
        notes: String,
    ) -> Result<domain::Workout, domain::UpdateError> {
        Ok(self.write(|connection| {
            let updated = connection.execute(
                "UPDATE workouts SET name = ?1, date = ?2, notes = ?3
                 WHERE id = ?4 AND status = 'in_progress'",
                params![name.as_str(), date, notes, *id],
            )?;

            if updated == 0 {
                ensure_in_progress(connection, id)?;
                return Err(Error::NotFound);
            }

            read_workout(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn finish_workout(
        &self,
        id: domain::WorkoutID,
    ) -> Result<domain::Workout, domain::UpdateError> {
        Ok(self.write(|connection| {
            let updated = connection.execute(
                "UPDATE workouts SET status = 'finished', finished_at = ?1
                 WHERE id = ?2 AND status = 'in_progress'",
                params![Utc::now(), *id],
            )?;

            if updated == 0 {
                if read_status(connection, id)?.is_none() {
                    return Err(Error::NotFound);
                }
                debug!("workout {id} is already finished");
            }

            read_workout(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn delete_workout(
        &self,
        id: domain::WorkoutID,
    ) -> Result<domain::WorkoutID, domain::DeleteError> {
        Ok(self.write(|connection| {
            if read_status(connection, id)?.is_none() {
                return Err(Error::NotFound);
            }

            connection.execute(
                "DELETE FROM logged_sets WHERE workout_exercise_id IN
                    (SELECT id FROM workout_exercises WHERE workout_id = ?1)",
                [*id],
            )?;
            connection.execute("DELETE FROM workout_exercises WHERE workout_id = ?1", [*id])?;
            connection.execute("DELETE FROM workouts WHERE id = ?1", [*id])?;

            Ok(id)
        })?)
    }

    fn read_workout_exercise(
        &self,
        id: domain::WorkoutExerciseID,
    ) -> Result<Option<domain::WorkoutExercise>, domain::ReadError> {
        Ok(self.read(|connection| read_workout_exercise(connection, id))?)
    }

    fn add_workout_exercise(
        &self,
        workout_id: domain::WorkoutID,
        exercise_id: domain::ExerciseID,
    ) -> Result<domain::WorkoutExercise, domain::CreateError> {
        Ok(self.write(|connection| {
            ensure_in_progress(connection, workout_id)?;
            if read_exercise(connection, exercise_id)?.is_none() {
                return Err(Error::NotFound);
            }

            let position = WORKOUT_EXERCISES.next_position(connection, *workout_id)?;
            let id = insert_workout_exercise(connection, workout_id, exercise_id, position)?;

            read_workout_exercise(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn remove_workout_exercise(
        &self,
        id: domain::WorkoutExerciseID,
    ) -> Result<domain::WorkoutExerciseID, domain::DeleteError> {
        Ok(self.write(|connection| {
            ensure_in_progress(connection, workout_of_workout_exercise(connection, id)?)?;

            connection.execute(
                "DELETE FROM logged_sets WHERE workout_exercise_id = ?1",
                [*id],
            )?;
            connection.execute("DELETE FROM workout_exercises WHERE id = ?1", [*id])?;

            Ok(id)
        })?)
    }

    fn reorder_workout_exercises(
        &self,
        workout_id: domain::WorkoutID,
        order: &[domain::WorkoutExerciseID],
    ) -> Result<domain::Workout, domain::UpdateError> {
        Ok(self.write(|connection| {
            ensure_in_progress(connection, workout_id)?;

            let order = order.iter().map(|id| **id).collect::<Vec<_>>();
            WORKOUT_EXERCISES.reorder(connection, *workout_id, &order)?;

            read_workout(connection, workout_id)?.ok_or(Error::NotFound)
        })?)
    }

    fn read_set(&self, id: domain::SetID) -> Result<Option<domain::LoggedSet>, domain::ReadError> {
        Ok(self.read(|connection| read_set(connection, id))?)
    }

    fn read_sets(
        &self,
        workout_exercise_id: domain::WorkoutExerciseID,
    ) -> Result<Vec<domain::LoggedSet>, domain::ReadError> {
        Ok(self.read(|connection| read_sets(connection, workout_exercise_id))?)
    }

    fn read_sets_batch(
        &self,
        workout_exercise_ids: &[domain::WorkoutExerciseID],
    ) -> Result<BTreeMap<domain::WorkoutExerciseID, Vec<domain::LoggedSet>>, domain::ReadError>
    {
        if workout_exercise_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(self.read(|connection| read_sets_batch(connection, workout_exercise_ids))?)
    }

    fn add_set(
        &self,
        workout_exercise_id: domain::WorkoutExerciseID,
        reps: domain::Reps,
        weight: domain::Weight,
    ) -> Result<domain::LoggedSet, domain::CreateError> {
        Ok(self.write(|connection| {
            ensure_in_progress(
                connection,
                workout_of_workout_exercise(connection, workout_exercise_id)?,
            )?;

            let position = LOGGED_SETS.next_position(connection, *workout_exercise_id)?;
            let created_at = Utc::now();
            connection.execute(
                "INSERT INTO logged_sets (workout_exercise_id, reps, weight, position, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    *workout_exercise_id,
                    u32::from(reps),
                    f64::from(weight),
                    i64::from(position),
                    created_at
                ],
            )?;

            Ok(domain::LoggedSet {
                id: connection.last_insert_rowid().into(),
                workout_exercise_id,
                reps,
                weight,
                position,
                created_at,
            })
        })?)
    }

    fn modify_set(
        &self,
        id: domain::SetID,
        reps: domain::Reps,
        weight: domain::Weight,
    ) -> Result<domain::LoggedSet, domain::UpdateError> {
        Ok(self.write(|connection| {
            ensure_in_progress(connection, workout_of_set(connection, id)?)?;

            connection.execute(
                "UPDATE logged_sets SET reps = ?1, weight = ?2 WHERE id = ?3",
                params![u32::from(reps), f64::from(weight), *id],
            )?;

            read_set(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn delete_set(&self, id: domain::SetID) -> Result<domain::SetID, domain::DeleteError> {
        Ok(self.write(|connection| {
            ensure_in_progress(connection, workout_of_set(connection, id)?)?;

            connection.execute("DELETE FROM logged_sets WHERE id = ?1", [*id])?;

            Ok(id)
        })?)
    }

    fn read_last_weight(
        &self,
        exercise_id: domain::ExerciseID,
        exclude: domain::WorkoutID,
    ) -> Result<Option<domain::Weight>, domain::ReadError> {
        Ok(self.read(|connection| read_last_weight(connection, exercise_id, exclude))?)
    }

    fn read_last_weight_batch(
        &self,
        exercise_ids: &[domain::ExerciseID],
        exclude: domain::WorkoutID,
    ) -> Result<BTreeMap<domain::ExerciseID, Option<domain::Weight>>, domain::ReadError> {
        if exercise_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(self.read(|connection| read_last_weight_batch(connection, exercise_ids, exclude))?)
    }

    fn read_template_targets(
        &self,
        template_id: domain::TemplateID,
        exercise_id: domain::ExerciseID,
    ) -> Result<Option<domain::Targets>, domain::ReadError> {
        Ok(self.read(|connection| {
            read_single_template_targets(connection, template_id, exercise_id)
        })?)
    }

    fn read_template_targets_batch(
        &self,
        template_id: domain::TemplateID,
        exercise_ids: &[domain::ExerciseID],
    ) -> Result<BTreeMap<domain::ExerciseID, Option<domain::Targets>>, domain::ReadError> {
        if exercise_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(self.read(|connection| read_targets(connection, template_id, exercise_ids))?)
    }
}
