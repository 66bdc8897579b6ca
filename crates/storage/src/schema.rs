use log::info;
use rusqlite::Connection;

use crate::Error;

pub const VERSION: i64 = 1;

const SCHEMA: &str = "
BEGIN;

CREATE TABLE exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE workout_templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE template_exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id INTEGER NOT NULL REFERENCES workout_templates(id) ON DELETE CASCADE,
    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE RESTRICT,
    target_sets INTEGER NOT NULL CHECK (target_sets > 0),
    target_reps INTEGER NOT NULL CHECK (target_reps > 0),
    position INTEGER NOT NULL,
    UNIQUE (template_id, position)
);

CREATE TABLE routines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE routine_templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    routine_id INTEGER NOT NULL REFERENCES routines(id) ON DELETE CASCADE,
    template_id INTEGER NOT NULL REFERENCES workout_templates(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    UNIQUE (routine_id, position)
);

CREATE TABLE workouts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    date TEXT NOT NULL,
    notes TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'in_progress' CHECK (status IN ('in_progress', 'finished')),
    template_id INTEGER REFERENCES workout_templates(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    finished_at TEXT
);

CREATE TABLE workout_exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workout_id INTEGER NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE RESTRICT,
    position INTEGER NOT NULL,
    UNIQUE (workout_id, position)
);

CREATE TABLE logged_sets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workout_exercise_id INTEGER NOT NULL REFERENCES workout_exercises(id) ON DELETE CASCADE,
    reps INTEGER NOT NULL CHECK (reps >= 0),
    weight REAL NOT NULL CHECK (weight >= 0),
    position INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (workout_exercise_id, position)
);

CREATE INDEX template_exercises_exercise_id ON template_exercises (exercise_id);
CREATE INDEX routine_templates_template_id ON routine_templates (template_id);
CREATE INDEX workouts_template_id ON workouts (template_id);
CREATE INDEX workouts_status_date ON workouts (status, date);
CREATE INDEX workout_exercises_exercise_id ON workout_exercises (exercise_id);

PRAGMA user_version = 1;

COMMIT;
";

/// Creates the schema of an empty database.
pub fn migrate(connection: &Connection) -> Result<(), Error> {
    let version: i64 = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;

    match version {
        0 => {
            info!("creating database schema version {VERSION}");
            connection.execute_batch(SCHEMA)?;
            Ok(())
        }
        VERSION => Ok(()),
        _ => Err(Error::UnsupportedVersion(version)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn user_version(connection: &Connection) -> i64 {
        connection
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_migrate() {
        let connection = Connection::open_in_memory().unwrap();

        migrate(&connection).unwrap();
        assert_eq!(user_version(&connection), VERSION);

        migrate(&connection).unwrap();
        assert_eq!(user_version(&connection), VERSION);
    }

    #[test]
    fn test_migrate_unsupported_version() {
        let connection = Connection::open_in_memory().unwrap();
        connection.pragma_update(None, "user_version", 2).unwrap();

        assert!(matches!(
            migrate(&connection),
            Err(Error::UnsupportedVersion(2))
        ));
    }
}
