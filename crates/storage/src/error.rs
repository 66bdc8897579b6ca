use liftbook_domain as domain;
use rusqlite::{ErrorCode, ffi};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("name already exists")]
    Conflict,
    #[error("workout is finished")]
    Finished,
    #[error("exercise is used by a template")]
    ReferencedByTemplate,
    #[error("exercise is used by a workout")]
    ReferencedByWorkout,
    #[error("order does not match the current entries")]
    InvalidOrder,
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(i64),
    #[error("database connection poisoned")]
    Poisoned,
    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Error::Conflict
            }
            err => Error::Sqlite(err),
        }
    }
}

impl From<Error> for domain::StorageError {
    fn from(value: Error) -> Self {
        match value {
            Error::Sqlite(rusqlite::Error::SqliteFailure(ref err, _))
                if matches!(
                    err.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                domain::StorageError::Unavailable
            }
            err => domain::StorageError::Other(Box::new(err)),
        }
    }
}

impl From<Error> for domain::ReadError {
    fn from(value: Error) -> Self {
        domain::ReadError::Storage(value.into())
    }
}

impl From<Error> for domain::CreateError {
    fn from(value: Error) -> Self {
        match value {
            Error::Conflict => domain::CreateError::Conflict,
            Error::NotFound => domain::CreateError::NotFound,
            Error::Finished => domain::CreateError::Finished,
            err => domain::CreateError::Storage(err.into()),
        }
    }
}

impl From<Error> for domain::UpdateError {
    fn from(value: Error) -> Self {
        match value {
            Error::Conflict => domain::UpdateError::Conflict,
            Error::NotFound => domain::UpdateError::NotFound,
            Error::Finished => domain::UpdateError::Finished,
            Error::InvalidOrder => domain::UpdateError::InvalidOrder,
            err => domain::UpdateError::Storage(err.into()),
        }
    }
}

impl From<Error> for domain::DeleteError {
    fn from(value: Error) -> Self {
        match value {
            Error::NotFound => domain::DeleteError::NotFound,
            Error::ReferencedByTemplate => domain::DeleteError::ReferencedByTemplate,
            Error::ReferencedByWorkout => domain::DeleteError::ReferencedByWorkout,
            Error::Finished => domain::DeleteError::Finished,
            err => domain::DeleteError::Storage(err.into()),
        }
    }
}

/// Wraps a failed conversion of a stored value into a domain type.
pub(crate) fn invalid_value<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Null, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: std::ffi::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn test_unique_constraint_is_conflict() {
        assert!(matches!(
            Error::from(failure(ffi::SQLITE_CONSTRAINT_UNIQUE)),
            Error::Conflict
        ));
        assert!(matches!(
            Error::from(failure(ffi::SQLITE_CONSTRAINT_FOREIGNKEY)),
            Error::Sqlite(_)
        ));
    }

    #[test]
    fn test_busy_database_is_unavailable() {
        assert!(matches!(
            domain::StorageError::from(Error::from(failure(ffi::SQLITE_BUSY))),
            domain::StorageError::Unavailable
        ));
        assert!(matches!(
            domain::StorageError::from(Error::Poisoned),
            domain::StorageError::Other(_)
        ));
    }

    #[test]
    fn test_domain_error_mapping() {
        assert!(matches!(
            domain::CreateError::from(Error::Finished),
            domain::CreateError::Finished
        ));
        assert!(matches!(
            domain::UpdateError::from(Error::InvalidOrder),
            domain::UpdateError::InvalidOrder
        ));
        assert!(matches!(
            domain::DeleteError::from(Error::ReferencedByTemplate),
            domain::DeleteError::ReferencedByTemplate
        ));
        assert!(matches!(
            domain::ReadError::from(Error::NotFound),
            domain::ReadError::Storage(domain::StorageError::Other(_))
        ));
    }
}
