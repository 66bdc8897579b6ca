use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use liftbook_domain as domain;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use crate::{
    Error, Sqlite,
    error::invalid_value,
    exercise::{exercise_from_row, read_exercise},
    ordered::TEMPLATE_EXERCISES,
};

const SELECT_TEMPLATE: &str = "SELECT id, name, created_at, updated_at FROM workout_templates";

const SELECT_TEMPLATE_EXERCISE: &str = "
    SELECT te.id, te.template_id, te.target_sets, te.target_reps, te.position,
           e.id, e.name, e.created_at
    FROM template_exercises te
    JOIN exercises e ON e.id = te.exercise_id";

/// Maps the columns `id, name, created_at, updated_at` starting at `offset`, without exercises.
pub(crate) fn template_from_row(row: &Row, offset: usize) -> rusqlite::Result<domain::Template> {
    Ok(domain::Template {
        id: row.get::<_, i64>(offset)?.into(),
        name: domain::Name::new(&row.get::<_, String>(offset + 1)?)
            .map_err(|err| invalid_value(offset + 1, err))?,
        created_at: row.get(offset + 2)?,
        updated_at: row.get(offset + 3)?,
        exercises: vec![],
    })
}

pub(crate) fn targets_from_row(row: &Row, offset: usize) -> rusqlite::Result<domain::Targets> {
    Ok(domain::Targets {
        sets: domain::TargetSets::new(row.get(offset)?)
            .map_err(|err| invalid_value(offset, err))?,
        reps: domain::TargetReps::new(row.get(offset + 1)?)
            .map_err(|err| invalid_value(offset + 1, err))?,
    })
}

fn template_exercise_from_row(row: &Row) -> rusqlite::Result<domain::TemplateExercise> {
    Ok(domain::TemplateExercise {
        id: row.get::<_, i64>(0)?.into(),
        template_id: row.get::<_, i64>(1)?.into(),
        targets: targets_from_row(row, 2)?,
        position: domain::Position::try_from(row.get::<_, i64>(4)?)
            .map_err(|err| invalid_value(4, err))?,
        exercise: exercise_from_row(row, 5)?,
    })
}

fn read_template_exercise(
    connection: &Connection,
    id: domain::TemplateExerciseID,
) -> Result<Option<domain::TemplateExercise>, Error> {
    Ok(connection
        .query_row(
            &format!("{SELECT_TEMPLATE_EXERCISE} WHERE te.id = ?1"),
            [*id],
            template_exercise_from_row,
        )
        .optional()?)
}

/// Reads a template with its exercises in position order.
pub(crate) fn read_template(
    connection: &Connection,
    id: domain::TemplateID,
) -> Result<Option<domain::Template>, Error> {
    let Some(mut template) = connection
        .query_row(&format!("{SELECT_TEMPLATE} WHERE id = ?1"), [*id], |row| {
            template_from_row(row, 0)
        })
        .optional()?
    else {
        return Ok(None);
    };

    let mut stmt = connection.prepare(&format!(
        "{SELECT_TEMPLATE_EXERCISE} WHERE te.template_id = ?1 ORDER BY te.position"
    ))?;
    template.exercises = stmt
        .query_map([*id], template_exercise_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(template))
}

pub(crate) fn template_exists(
    connection: &Connection,
    id: domain::TemplateID,
) -> Result<bool, Error> {
    Ok(connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM workout_templates WHERE id = ?1)",
        [*id],
        |row| row.get(0),
    )?)
}

/// Targets of the given exercises in the template.
///
/// If an exercise occurs several times, the targets of the entry with the lowest position are
/// used. Exercises that are not part of the template map to `None`.
pub(crate) fn read_targets(
    connection: &Connection,
    template_id: domain::TemplateID,
    exercise_ids: &[domain::ExerciseID],
) -> Result<BTreeMap<domain::ExerciseID, Option<domain::Targets>>, Error> {
    let exercise_ids = exercise_ids.iter().copied().collect::<BTreeSet<_>>();
    let mut targets = exercise_ids
        .iter()
        .map(|id| (*id, None))
        .collect::<BTreeMap<_, _>>();

    if exercise_ids.is_empty() {
        return Ok(targets);
    }

    let placeholders = vec!["?"; exercise_ids.len()].join(", ");
    let mut stmt = connection.prepare(&format!(
        "SELECT exercise_id, target_sets, target_reps
         FROM template_exercises
         WHERE template_id = ? AND exercise_id IN ({placeholders})
         ORDER BY position DESC"
    ))?;
    let rows = stmt
        .query_map(
            params_from_iter(
                std::iter::once(*template_id).chain(exercise_ids.iter().map(|id| **id)),
            ),
            |row| {
                Ok((
                    domain::ExerciseID::from(row.get::<_, i64>(0)?),
                    targets_from_row(row, 1)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    // Rows are in descending position, so the lowest position is inserted last.
    for (exercise_id, t) in rows {
        targets.insert(exercise_id, Some(t));
    }

    Ok(targets)
}

fn touch(
    connection: &Connection,
    id: domain::TemplateID,
    updated_at: DateTime<Utc>,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE workout_templates SET updated_at = ?1 WHERE id = ?2",
        params![updated_at, *id],
    )?;
    Ok(())
}

impl domain::TemplateRepository for Sqlite {
    fn read_templates(&self) -> Result<Vec<domain::Template>, domain::ReadError> {
        Ok(self.read(|connection| {
            let mut stmt = connection.prepare(&format!("{SELECT_TEMPLATE} ORDER BY name, id"))?;
            let templates = stmt
                .query_map([], |row| template_from_row(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(templates)
        })?)
    }

    fn read_template(
        &self,
        id: domain::TemplateID,
    ) -> Result<Option<domain::Template>, domain::ReadError> {
        Ok(self.read(|connection| read_template(connection, id))?)
    }

    fn create_template(&self, name: domain::Name) -> Result<domain::Template, domain::CreateError> {
        Ok(self.write(|connection| {
            let now = Utc::now();
            connection.execute(
                "INSERT INTO workout_templates (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![name.as_str(), now],
            )?;
            Ok(domain::Template {
                id: connection.last_insert_rowid().into(),
                name,
                created_at: now,
                updated_at: now,
                exercises: vec![],
            })
        })?)
    }

    fn modify_template(
        &self,
        id: domain::TemplateID,
        name: domain::Name,
    ) -> Result<domain::Template, domain::UpdateError> {
        Ok(self.write(|connection| {
            let updated = connection.execute(
                "UPDATE workout_templates SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name.as_str(), Utc::now(), *id],
            )?;
            if updated == 0 {
                return Err(Error::NotFound);
            }
            read_template(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn delete_template(
        &self,
        id: domain::TemplateID,
    ) -> Result<domain::TemplateID, domain::DeleteError> {
        Ok(self.write(|connection| {
            if !template_exists(connection, id)? {
                return Err(Error::NotFound);
            }

            connection.execute(
                "UPDATE workouts SET template_id = NULL WHERE template_id = ?1",
                [*id],
            )?;
            connection.execute(
                "DELETE FROM routine_templates WHERE template_id = ?1",
                [*id],
            )?;
            connection.execute(
                "DELETE FROM template_exercises WHERE template_id = ?1",
                [*id],
            )?;
            connection.execute("DELETE FROM workout_templates WHERE id = ?1", [*id])?;

            Ok(id)
        })?)
    }

    fn read_template_exercise(
        &self,
        id: domain::TemplateExerciseID,
    ) -> Result<Option<domain::TemplateExercise>, domain::ReadError> {
        Ok(self.read(|connection| read_template_exercise(connection, id))?)
    }

    fn add_template_exercise(
        &self,
        template_id: domain::TemplateID,
        exercise_id: domain::ExerciseID,
        targets: domain::Targets,
    ) -> Result<domain::TemplateExercise, domain::CreateError> {
        Ok(self.write(|connection| {
            if !template_exists(connection, template_id)? {
                return Err(Error::NotFound);
            }
            let exercise = read_exercise(connection, exercise_id)?.ok_or(Error::NotFound)?;

            let position = TEMPLATE_EXERCISES.next_position(connection, *template_id)?;
            connection.execute(
                "INSERT INTO template_exercises
                    (template_id, exercise_id, target_sets, target_reps, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    *template_id,
                    *exercise_id,
                    u32::from(targets.sets),
                    u32::from(targets.reps),
                    i64::from(position)
                ],
            )?;
            let id = connection.last_insert_rowid().into();
            touch(connection, template_id, Utc::now())?;

            Ok(domain::TemplateExercise {
                id,
                template_id,
                exercise,
                targets,
                position,
            })
        })?)
    }

    fn modify_template_exercise(
        &self,
        id: domain::TemplateExerciseID,
        targets: domain::Targets,
    ) -> Result<domain::TemplateExercise, domain::UpdateError> {
        Ok(self.write(|connection| {
            let template_id = TEMPLATE_EXERCISES
                .parent_of(connection, *id)?
                .ok_or(Error::NotFound)?;

            connection.execute(
                "UPDATE template_exercises SET target_sets = ?1, target_reps = ?2 WHERE id = ?3",
                params![u32::from(targets.sets), u32::from(targets.reps), *id],
            )?;
            touch(connection, template_id.into(), Utc::now())?;

            read_template_exercise(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn remove_template_exercise(
        &self,
        id: domain::TemplateExerciseID,
    ) -> Result<domain::TemplateExerciseID, domain::DeleteError> {
        Ok(self.write(|connection| {
            let template_id = TEMPLATE_EXERCISES
                .parent_of(connection, *id)?
                .ok_or(Error::NotFound)?;

            connection.execute("DELETE FROM template_exercises WHERE id = ?1", [*id])?;
            touch(connection, template_id.into(), Utc::now())?;

            Ok(id)
        })?)
    }

    fn reorder_template_exercises(
        &self,
        template_id: domain::TemplateID,
        order: &[domain::TemplateExerciseID],
    ) -> Result<domain::Template, domain::UpdateError> {
        Ok(self.write(|connection| {
            if !template_exists(connection, template_id)? {
                return Err(Error::NotFound);
            }

            let order = order.iter().map(|id| **id).collect::<Vec<_>>();
            TEMPLATE_EXERCISES.reorder(connection, *template_id, &order)?;
            touch(connection, template_id, Utc::now())?;

            read_template(connection, template_id)?.ok_or(Error::NotFound)
        })?)
    }
}
