#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

//! SQLite storage
//!
//! All repositories share a single connection. Operations that write more than one row or that
//! depend on the state of the owning workout run inside an immediate transaction, so concurrent
//! callers are serialized by SQLite before any row is read.

use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use log::debug;
use rusqlite::{Connection, TransactionBehavior};

mod config;
mod error;
mod exercise;
mod ordered;
mod routine;
mod schema;
mod template;
mod workout;

pub use config::Config;
pub use error::Error;

pub struct Sqlite {
    connection: Mutex<Connection>,
    config: Config,
}

impl Sqlite {
    pub fn open(config: &Config) -> Result<Self, Error> {
        let connection = match config.path {
            Some(ref path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        connection.pragma_update(None, "foreign_keys", true)?;
        schema::migrate(&connection)?;

        Ok(Self {
            connection: Mutex::new(connection),
            config: config.clone(),
        })
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Self::open(&Config::default())
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::Poisoned)
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T, Error>) -> Result<T, Error> {
        let connection = self.connection()?;
        f(&connection)
    }

    /// Runs `f` in an immediate transaction and commits if it succeeds.
    fn write<T>(&self, f: impl FnOnce(&Connection) -> Result<T, Error>) -> Result<T, Error> {
        let mut connection = self.connection()?;
        let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        match f(&transaction) {
            Ok(result) => {
                transaction.commit()?;
                Ok(result)
            }
            Err(err) => {
                debug!("rolling back transaction: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use liftbook_domain::{ExerciseRepository, Name};
    use pretty_assertions::assert_eq;

    use super::*;

    pub mod data;

    #[test]
    fn test_open_file() {
        let path = std::env::temp_dir().join(format!("liftbook-{}.db", std::process::id()));
        let config = Config {
            path: Some(path.clone()),
            ..Config::default()
        };

        let sqlite = Sqlite::open(&config).unwrap();
        assert_eq!(sqlite.config(), &config);
        let exercise = sqlite
            .create_exercise(Name::new("Squat").unwrap())
            .unwrap();
        drop(sqlite);

        let sqlite = Sqlite::open(&config).unwrap();
        assert_eq!(sqlite.read_exercises().unwrap(), vec![exercise]);
        drop(sqlite);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let sqlite = Sqlite::open_in_memory().unwrap();

        let result = sqlite.write(|connection| -> Result<(), Error> {
            connection.execute(
                "INSERT INTO exercises (name, created_at) VALUES ('Squat', '2024-01-01')",
                [],
            )?;
            Err(Error::NotFound)
        });

        assert!(matches!(result, Err(Error::NotFound)));
        assert!(sqlite.read_exercises().unwrap().is_empty());
    }
}
