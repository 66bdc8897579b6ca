use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, From};

use crate::{
    CreateError, DeleteError, Name, Position, ReadError, Template, TemplateID, UpdateError,
    ValidationError,
};

pub trait RoutineService {
    fn get_routines(&self) -> Result<Vec<Routine>, ReadError>;
    fn get_routine(&self, id: RoutineID) -> Result<Option<Routine>, ReadError>;
    fn create_routine(&self, name: Name) -> Result<Routine, CreateError>;
    fn modify_routine(&self, id: RoutineID, name: Name) -> Result<Routine, UpdateError>;
    fn delete_routine(&self, id: RoutineID) -> Result<RoutineID, DeleteError>;

    fn get_routine_template(
        &self,
        id: RoutineTemplateID,
    ) -> Result<Option<RoutineTemplate>, ReadError>;
    fn add_routine_template(
        &self,
        routine_id: RoutineID,
        template_id: TemplateID,
    ) -> Result<RoutineTemplate, CreateError>;
    fn remove_routine_template(
        &self,
        id: RoutineTemplateID,
    ) -> Result<RoutineTemplateID, DeleteError>;
    fn reorder_routine_templates(
        &self,
        routine_id: RoutineID,
        order: &[RoutineTemplateID],
    ) -> Result<Routine, UpdateError>;

    fn validate_routine_name(&self, name: &str) -> Result<Name, ValidationError> {
        Name::new(name).map_err(|err| ValidationError::Other(err.into()))
    }
}

pub trait RoutineRepository {
    /// All routines ordered by name, without their templates.
    fn read_routines(&self) -> Result<Vec<Routine>, ReadError>;
    fn read_routine(&self, id: RoutineID) -> Result<Option<Routine>, ReadError>;
    fn create_routine(&self, name: Name) -> Result<Routine, CreateError>;
    fn modify_routine(&self, id: RoutineID, name: Name) -> Result<Routine, UpdateError>;
    fn delete_routine(&self, id: RoutineID) -> Result<RoutineID, DeleteError>;

    fn read_routine_template(
        &self,
        id: RoutineTemplateID,
    ) -> Result<Option<RoutineTemplate>, ReadError>;
    /// Appends the template after the current last position.
    fn add_routine_template(
        &self,
        routine_id: RoutineID,
        template_id: TemplateID,
    ) -> Result<RoutineTemplate, CreateError>;
    /// Removes a single entry. Remaining positions are kept as they are.
    fn remove_routine_template(
        &self,
        id: RoutineTemplateID,
    ) -> Result<RoutineTemplateID, DeleteError>;
    /// Assigns positions 1..=n in the given order, atomically.
    fn reorder_routine_templates(
        &self,
        routine_id: RoutineID,
        order: &[RoutineTemplateID],
    ) -> Result<Routine, UpdateError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub id: RoutineID,
    pub name: Name,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub templates: Vec<RoutineTemplate>,
}

#[derive(Deref, Display, From, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoutineID(i64);

/// Template entry of a routine. The template is loaded without its exercises.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineTemplate {
    pub id: RoutineTemplateID,
    pub routine_id: RoutineID,
    pub template: Template,
    pub position: Position,
}

#[derive(Deref, Display, From, Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoutineTemplateID(i64);
