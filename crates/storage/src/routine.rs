use chrono::{DateTime, Utc};
use liftbook_domain as domain;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    Error, Sqlite,
    error::invalid_value,
    ordered::ROUTINE_TEMPLATES,
    template::{template_exists, template_from_row},
};

const SELECT_ROUTINE: &str = "SELECT id, name, created_at, updated_at FROM routines";

const SELECT_ROUTINE_TEMPLATE: &str = "
    SELECT rt.id, rt.routine_id, rt.position,
           t.id, t.name, t.created_at, t.updated_at
    FROM routine_templates rt
    JOIN workout_templates t ON t.id = rt.template_id";

fn routine_from_row(row: &Row) -> rusqlite::Result<domain::Routine> {
    Ok(domain::Routine {
        id: row.get::<_, i64>(0)?.into(),
        name: domain::Name::new(&row.get::<_, String>(1)?).map_err(|err| invalid_value(1, err))?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        templates: vec![],
    })
}

fn routine_template_from_row(row: &Row) -> rusqlite::Result<domain::RoutineTemplate> {
    Ok(domain::RoutineTemplate {
        id: row.get::<_, i64>(0)?.into(),
        routine_id: row.get::<_, i64>(1)?.into(),
        position: domain::Position::try_from(row.get::<_, i64>(2)?)
            .map_err(|err| invalid_value(2, err))?,
        template: template_from_row(row, 3)?,
    })
}

fn read_routine_template(
    connection: &Connection,
    id: domain::RoutineTemplateID,
) -> Result<Option<domain::RoutineTemplate>, Error> {
    Ok(connection
        .query_row(
            &format!("{SELECT_ROUTINE_TEMPLATE} WHERE rt.id = ?1"),
            [*id],
            routine_template_from_row,
        )
        .optional()?)
}

fn read_routine(
    connection: &Connection,
    id: domain::RoutineID,
) -> Result<Option<domain::Routine>, Error> {
    let Some(mut routine) = connection
        .query_row(
            &format!("{SELECT_ROUTINE} WHERE id = ?1"),
            [*id],
            routine_from_row,
        )
        .optional()?
    else {
        return Ok(None);
    };

    let mut stmt = connection.prepare(&format!(
        "{SELECT_ROUTINE_TEMPLATE} WHERE rt.routine_id = ?1 ORDER BY rt.position"
    ))?;
    routine.templates = stmt
        .query_map([*id], routine_template_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(routine))
}

fn routine_exists(connection: &Connection, id: domain::RoutineID) -> Result<bool, Error> {
    Ok(connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM routines WHERE id = ?1)",
        [*id],
        |row| row.get(0),
    )?)
}

fn touch(
    connection: &Connection,
    id: domain::RoutineID,
    updated_at: DateTime<Utc>,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE routines SET updated_at = ?1 WHERE id = ?2",
        params![updated_at, *id],
    )?;
    Ok(())
}

impl domain::RoutineRepository for Sqlite {
    fn read_routines(&self) -> Result<Vec<domain::Routine>, domain::ReadError> {
        Ok(self.read(|connection| {
            let mut stmt = connection.prepare(&format!("{SELECT_ROUTINE} ORDER BY name, id"))?;
            let routines = stmt
                .query_map([], routine_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(routines)
        })?)
    }

    fn read_routine(
        &self,
        id: domain::RoutineID,
    ) -> Result<Option<domain::Routine>, domain::ReadError> {
        Ok(self.read(|connection| read_routine(connection, id))?)
    }

    fn create_routine(&self, name: domain::Name) -> Result<domain::Routine, domain::CreateError> {
        Ok(self.write(|connection| {
            let now = Utc::now();
            connection.execute(
                "INSERT INTO routines (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![name.as_str(), now],
            )?;
            Ok(domain::Routine {
                id: connection.last_insert_rowid().into(),
                name,
                created_at: now,
                updated_at: now,
                templates: vec![],
            })
        })?)
    }

    fn modify_routine(
        &self,
        id: domain::RoutineID,
        name: domain::Name,
    ) -> Result<domain::Routine, domain::UpdateError> {
        Ok(self.write(|connection| {
            let updated = connection.execute(
                "UPDATE routines SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name.as_str(), Utc::now(), *id],
            )?;
            if updated == 0 {
                return Err(Error::NotFound);
            }
            read_routine(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn delete_routine(
        &self,
        id: domain::RoutineID,
    ) -> Result<domain::RoutineID, domain::DeleteError> {
        Ok(self.write(|connection| {
            if !routine_exists(connection, id)? {
                return Err(Error::NotFound);
            }

            connection.execute("DELETE FROM routine_templates WHERE routine_id = ?1", [*id])?;
            connection.execute("DELETE FROM routines WHERE id = ?1", [*id])?;

            Ok(id)
        })?)
    }

    fn read_routine_template(
        &self,
        id: domain::RoutineTemplateID,
    ) -> Result<Option<domain::RoutineTemplate>, domain::ReadError> {
        Ok(self.read(|connection| read_routine_template(connection, id))?)
    }

    fn add_routine_template(
        &self,
        routine_id: domain::RoutineID,
        template_id: domain::TemplateID,
    ) -> Result<domain::RoutineTemplate, domain::CreateError> {
        Ok(self.write(|connection| {
            if !routine_exists(connection, routine_id)? || !template_exists(connection, template_id)?
            {
                return Err(Error::NotFound);
            }

            let position = ROUTINE_TEMPLATES.next_position(connection, *routine_id)?;
            connection.execute(
                "INSERT INTO routine_templates (routine_id, template_id, position)
                 VALUES (?1, ?2, ?3)",
                params![*routine_id, *template_id, i64::from(position)],
            )?;
            let id = connection.last_insert_rowid().into();
            touch(connection, routine_id, Utc::now())?;

            read_routine_template(connection, id)?.ok_or(Error::NotFound)
        })?)
    }

    fn remove_routine_template(
        &self,
        id: domain::RoutineTemplateID,
    ) -> Result<domain::RoutineTemplateID, domain::DeleteError> {
        Ok(self.write(|connection| {
            let routine_id = ROUTINE_TEMPLATES
                .parent_of(connection, *id)?
                .ok_or(Error::NotFound)?;

            connection.execute("DELETE FROM routine_templates WHERE id = ?1", [*id])?;
            touch(connection, routine_id.into(), Utc::now())?;

            Ok(id)
        })?)
    }

    fn reorder_routine_templates(
        &self,
        routine_id: domain::RoutineID,
        order: &[domain::RoutineTemplateID],
    ) -> Result<domain::Routine, domain::UpdateError> {
        Ok(self.write(|connection| {
            if !routine_exists(connection, routine_id)? {
                return Err(Error::NotFound);
            }

            let order = order.iter().map(|id| **id).collect::<Vec<_>>();
            ROUTINE_TEMPLATES.reorder(connection, *routine_id, &order)?;
            touch(connection, routine_id, Utc::now())?;

            read_routine(connection, routine_id)?.ok_or(Error::NotFound)
        })?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use liftbook_domain::{RoutineRepository, TemplateRepository};

    use crate::tests::data::{name, sqlite};

    use super::*;

    struct Program {
        sqlite: Sqlite,
        routine: domain::Routine,
        templates: Vec<domain::Template>,
    }

    fn program(sqlite: Sqlite) -> Program {
        let routine = sqlite.create_routine(name("Program")).unwrap();
        let templates = ["Push", "Pull", "Legs"]
            .into_iter()
            .map(|n| sqlite.create_template(name(n)).unwrap())
            .collect::<Vec<_>>();
        for template in &templates {
            sqlite.add_routine_template(routine.id, template.id).unwrap();
        }
        let routine = sqlite.read_routine(routine.id).unwrap().unwrap();
        Program {
            sqlite,
            routine,
            templates,
        }
    }

    fn template_names(routine: &domain::Routine) -> Vec<&str> {
        routine
            .templates
            .iter()
            .map(|t| t.template.name.as_str())
            .collect()
    }

    fn positions(routine: &domain::Routine) -> Vec<u32> {
        routine
            .templates
            .iter()
            .map(|t| u32::from(t.position))
            .collect()
    }

    #[rstest]
    fn test_create_routine(sqlite: Sqlite) {
        let routine = sqlite.create_routine(name("Program")).unwrap();

        assert_eq!(sqlite.read_routine(routine.id).unwrap(), Some(routine.clone()));
        assert_eq!(sqlite.read_routines().unwrap(), vec![routine]);
        assert_eq!(sqlite.read_routine(42.into()).unwrap(), None);
    }

    #[rstest]
    fn test_modify_routine(sqlite: Sqlite) {
        let Program {
            sqlite, routine, ..
        } = program(sqlite);

        let modified = sqlite.modify_routine(routine.id, name("PPL")).unwrap();

        assert_eq!(modified.name, name("PPL"));
        assert_eq!(modified.templates, routine.templates);
        assert!(matches!(
            sqlite.modify_routine(42.into(), name("PPL")),
            Err(domain::UpdateError::NotFound)
        ));
    }

    #[rstest]
    fn test_add_routine_template_appends(sqlite: Sqlite) {
        let Program {
            sqlite,
            routine,
            templates,
        } = program(sqlite);

        assert_eq!(template_names(&routine), vec!["Push", "Pull", "Legs"]);
        assert_eq!(positions(&routine), vec![1, 2, 3]);

        let added = sqlite
            .add_routine_template(routine.id, templates[0].id)
            .unwrap();
        assert_eq!(u32::from(added.position), 4);
        assert_eq!(added.template, templates[0]);
    }

    #[rstest]
    fn test_add_routine_template_not_found(sqlite: Sqlite) {
        let Program {
            sqlite,
            routine,
            templates,
        } = program(sqlite);

        assert!(matches!(
            sqlite.add_routine_template(42.into(), templates[0].id),
            Err(domain::CreateError::NotFound)
        ));
        assert!(matches!(
            sqlite.add_routine_template(routine.id, 42.into()),
            Err(domain::CreateError::NotFound)
        ));
        assert_eq!(sqlite.read_routine(routine.id).unwrap(), Some(routine));
    }

    #[rstest]
    fn test_remove_routine_template(sqlite: Sqlite) {
        let Program {
            sqlite, routine, ..
        } = program(sqlite);

        sqlite
            .remove_routine_template(routine.templates[0].id)
            .unwrap();
        let routine = sqlite.read_routine(routine.id).unwrap().unwrap();

        assert_eq!(template_names(&routine), vec!["Pull", "Legs"]);
        assert_eq!(positions(&routine), vec![2, 3]);
        assert!(matches!(
            sqlite.remove_routine_template(42.into()),
            Err(domain::DeleteError::NotFound)
        ));
    }

    #[rstest]
    fn test_reorder_routine_templates(sqlite: Sqlite) {
        let Program {
            sqlite, routine, ..
        } = program(sqlite);
        let order = [
            routine.templates[2].id,
            routine.templates[0].id,
            routine.templates[1].id,
        ];

        let reordered = sqlite.reorder_routine_templates(routine.id, &order).unwrap();

        assert_eq!(template_names(&reordered), vec!["Legs", "Push", "Pull"]);
        assert_eq!(positions(&reordered), vec![1, 2, 3]);
        assert!(matches!(
            sqlite.reorder_routine_templates(routine.id, &order[..2]),
            Err(domain::UpdateError::InvalidOrder)
        ));
        assert_eq!(sqlite.read_routine(routine.id).unwrap(), Some(reordered));
    }

    #[rstest]
    fn test_delete_routine_keeps_templates(sqlite: Sqlite) {
        let Program {
            sqlite,
            routine,
            templates,
        } = program(sqlite);

        assert_eq!(sqlite.delete_routine(routine.id).unwrap(), routine.id);

        assert_eq!(sqlite.read_routine(routine.id).unwrap(), None);
        assert_eq!(
            sqlite.read_routine_template(routine.templates[0].id).unwrap(),
            None
        );
        assert_eq!(sqlite.read_templates().unwrap().len(), templates.len());
        assert!(matches!(
            sqlite.delete_routine(routine.id),
            Err(domain::DeleteError::NotFound)
        ));
    }
}
