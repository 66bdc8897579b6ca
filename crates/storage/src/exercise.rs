use chrono::Utc;
use liftbook_domain as domain;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{Error, Sqlite, error::invalid_value};

const SELECT_EXERCISE: &str = "SELECT id, name, created_at FROM exercises";

/// Maps the columns `id, name, created_at` starting at `offset`.
pub(crate) fn exercise_from_row(row: &Row, offset: usize) -> rusqlite::Result<domain::Exercise> {
    Ok(domain::Exercise {
        id: row.get::<_, i64>(offset)?.into(),
        name: domain::Name::new(&row.get::<_, String>(offset + 1)?)
            .map_err(|err| invalid_value(offset + 1, err))?,
        created_at: row.get(offset + 2)?,
    })
}

fn query_exercises(
    connection: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<domain::Exercise>, Error> {
    let mut stmt = connection.prepare(sql)?;
    let exercises = stmt
        .query_map(params, |row| exercise_from_row(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(exercises)
}

pub(crate) fn read_exercise(
    connection: &Connection,
    id: domain::ExerciseID,
) -> Result<Option<domain::Exercise>, Error> {
    Ok(connection
        .query_row(&format!("{SELECT_EXERCISE} WHERE id = ?1"), [*id], |row| {
            exercise_from_row(row, 0)
        })
        .optional()?)
}

fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl domain::ExerciseRepository for Sqlite {
    fn read_exercises(&self) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        Ok(self.read(|connection| {
            query_exercises(
                connection,
                &format!("{SELECT_EXERCISE} ORDER BY name"),
                [],
            )
        })?)
    }

    fn read_exercise(
        &self,
        id: domain::ExerciseID,
    ) -> Result<Option<domain::Exercise>, domain::ReadError> {
        Ok(self.read(|connection| read_exercise(connection, id))?)
    }

    fn search_exercises(&self, query: &str) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        let query = query.trim();

        if query.is_empty() {
            return self.read_exercises();
        }

        Ok(self.read(|connection| {
            if self.config.case_sensitive_search {
                query_exercises(
                    connection,
                    &format!("{SELECT_EXERCISE} WHERE instr(name, ?1) > 0 ORDER BY name"),
                    [query],
                )
            } else {
                query_exercises(
                    connection,
                    &format!("{SELECT_EXERCISE} WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name"),
                    [format!("%{}%", escape_like(query))],
                )
            }
        })?)
    }

    fn create_exercise(&self, name: domain::Name) -> Result<domain::Exercise, domain::CreateError> {
        Ok(self.write(|connection| {
            let created_at = Utc::now();
            connection.execute(
                "INSERT INTO exercises (name, created_at) VALUES (?1, ?2)",
                params![name.as_str(), created_at],
            )?;
            Ok(domain::Exercise {
                id: connection.last_insert_rowid().into(),
                name,
                created_at,
            })
        })?)
    }

    fn delete_exercise(
        &self,
        id: domain::ExerciseID,
    ) -> Result<domain::ExerciseID, domain::DeleteError> {
        Ok(self.write(|connection| {
            if read_exercise(connection, id)?.is_none() {
                return Err(Error::NotFound);
            }

            let referenced = |table: &str| -> Result<bool, Error> {
                Ok(connection.query_row(
                    &format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE exercise_id = ?1)"),
                    [*id],
                    |row| row.get(0),
                )?)
            };

            if referenced("template_exercises")? {
                return Err(Error::ReferencedByTemplate);
            }
            if referenced("workout_exercises")? {
                return Err(Error::ReferencedByWorkout);
            }

            connection.execute("DELETE FROM exercises WHERE id = ?1", [*id])?;
            Ok(id)
        })?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use liftbook_domain::{ExerciseRepository, TemplateRepository, WorkoutRepository};

    use crate::{
        Config,
        tests::data::{date, name, sqlite, targets},
    };

    use super::*;

    fn names(exercises: &[domain::Exercise]) -> Vec<&str> {
        exercises.iter().map(|e| e.name.as_str()).collect()
    }

    fn sqlite_with_exercises(config: &Config) -> Sqlite {
        let sqlite = Sqlite::open(config).unwrap();
        for n in ["Squat", "Bench Press", "Front Squat", "100%_Curl"] {
            sqlite.create_exercise(name(n)).unwrap();
        }
        sqlite
    }

    #[rstest]
    fn test_create_exercise(sqlite: Sqlite) {
        let exercise = sqlite.create_exercise(name("Squat")).unwrap();

        assert_eq!(sqlite.read_exercise(exercise.id).unwrap(), Some(exercise.clone()));
        assert_eq!(sqlite.read_exercises().unwrap(), vec![exercise]);
    }

    #[rstest]
    fn test_create_exercise_duplicate_name(sqlite: Sqlite) {
        sqlite.create_exercise(name("Squat")).unwrap();

        assert!(matches!(
            sqlite.create_exercise(name("Squat")),
            Err(domain::CreateError::Conflict)
        ));
        assert!(sqlite.create_exercise(name("squat")).is_ok());
        assert_eq!(sqlite.read_exercises().unwrap().len(), 2);
    }

    #[rstest]
    fn test_read_exercises_ordered_by_name() {
        let sqlite = sqlite_with_exercises(&Config::default());

        assert_eq!(
            names(&sqlite.read_exercises().unwrap()),
            vec!["100%_Curl", "Bench Press", "Front Squat", "Squat"]
        );
    }

    #[rstest]
    fn test_read_exercise_missing(sqlite: Sqlite) {
        assert_eq!(sqlite.read_exercise(1.into()).unwrap(), None);
    }

    #[rstest]
    #[case("squat", vec!["Front Squat", "Squat"])]
    #[case("  SQUAT ", vec!["Front Squat", "Squat"])]
    #[case("", vec!["100%_Curl", "Bench Press", "Front Squat", "Squat"])]
    #[case("%", vec!["100%_Curl"])]
    #[case("_", vec!["100%_Curl"])]
    #[case("deadlift", vec![])]
    fn test_search_exercises(#[case] query: &str, #[case] expected: Vec<&str>) {
        let sqlite = sqlite_with_exercises(&Config::default());

        assert_eq!(names(&sqlite.search_exercises(query).unwrap()), expected);
    }

    #[rstest]
    #[case("Squat", vec!["Front Squat", "Squat"])]
    #[case("squat", vec![])]
    #[case("", vec!["100%_Curl", "Bench Press", "Front Squat", "Squat"])]
    fn test_search_exercises_case_sensitive(#[case] query: &str, #[case] expected: Vec<&str>) {
        let sqlite = sqlite_with_exercises(&Config {
            case_sensitive_search: true,
            ..Config::default()
        });

        assert_eq!(names(&sqlite.search_exercises(query).unwrap()), expected);
    }

    #[rstest]
    fn test_delete_exercise(sqlite: Sqlite) {
        let exercise = sqlite.create_exercise(name("Squat")).unwrap();

        assert_eq!(sqlite.delete_exercise(exercise.id).unwrap(), exercise.id);
        assert_eq!(sqlite.read_exercise(exercise.id).unwrap(), None);
        assert!(matches!(
            sqlite.delete_exercise(exercise.id),
            Err(domain::DeleteError::NotFound)
        ));
    }

    #[rstest]
    fn test_delete_exercise_referenced_by_template(sqlite: Sqlite) {
        let exercise = sqlite.create_exercise(name("Squat")).unwrap();
        let template = sqlite.create_template(name("Leg Day")).unwrap();
        sqlite
            .add_template_exercise(template.id, exercise.id, targets(5, 5))
            .unwrap();

        assert!(matches!(
            sqlite.delete_exercise(exercise.id),
            Err(domain::DeleteError::ReferencedByTemplate)
        ));
        assert_eq!(sqlite.read_exercise(exercise.id).unwrap(), Some(exercise));
    }

    #[rstest]
    fn test_delete_exercise_referenced_by_workout(sqlite: Sqlite) {
        let exercise = sqlite.create_exercise(name("Squat")).unwrap();
        let workout = sqlite
            .create_workout(name("Monday"), date(2024, 1, 1), None)
            .unwrap();
        sqlite.add_workout_exercise(workout.id, exercise.id).unwrap();

        assert!(matches!(
            sqlite.delete_exercise(exercise.id),
            Err(domain::DeleteError::ReferencedByWorkout)
        ));
        assert_eq!(sqlite.read_exercise(exercise.id).unwrap(), Some(exercise));
    }
}
