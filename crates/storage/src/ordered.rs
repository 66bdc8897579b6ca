use liftbook_domain as domain;
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Error, error::invalid_value};

/// Child table whose rows are ordered by a position that is unique per parent.
pub struct Ordered {
    table: &'static str,
    parent: &'static str,
}

pub const TEMPLATE_EXERCISES: Ordered = Ordered {
    table: "template_exercises",
    parent: "template_id",
};

pub const ROUTINE_TEMPLATES: Ordered = Ordered {
    table: "routine_templates",
    parent: "routine_id",
};

pub const WORKOUT_EXERCISES: Ordered = Ordered {
    table: "workout_exercises",
    parent: "workout_id",
};

pub const LOGGED_SETS: Ordered = Ordered {
    table: "logged_sets",
    parent: "workout_exercise_id",
};

impl Ordered {
    /// Position after the current last entry of the parent.
    pub fn next_position(
        &self,
        connection: &Connection,
        parent_id: i64,
    ) -> Result<domain::Position, Error> {
        let last = connection.query_row(
            &format!(
                "SELECT MAX(position) FROM {} WHERE {} = ?1",
                self.table, self.parent
            ),
            [parent_id],
            |row| {
                row.get::<_, Option<i64>>(0)?
                    .map(domain::Position::try_from)
                    .transpose()
                    .map_err(|err| invalid_value(0, err))
            },
        )?;
        Ok(domain::Position::after(last))
    }

    pub fn parent_of(&self, connection: &Connection, id: i64) -> Result<Option<i64>, Error> {
        Ok(connection
            .query_row(
                &format!("SELECT {} FROM {} WHERE id = ?1", self.parent, self.table),
                [id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn ids(&self, connection: &Connection, parent_id: i64) -> Result<Vec<i64>, Error> {
        let mut stmt = connection.prepare(&format!(
            "SELECT id FROM {} WHERE {} = ?1 ORDER BY position",
            self.table, self.parent
        ))?;
        let ids = stmt
            .query_map([parent_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Assigns the positions 1..=n to the entries in the given order.
    ///
    /// The order must contain every entry of the parent exactly once. Must be called inside a
    /// transaction. Positions are negated first, so that no intermediate state violates the
    /// uniqueness of positions.
    pub fn reorder(
        &self,
        connection: &Connection,
        parent_id: i64,
        order: &[i64],
    ) -> Result<(), Error> {
        if !domain::is_permutation(&self.ids(connection, parent_id)?, order) {
            return Err(Error::InvalidOrder);
        }

        connection.execute(
            &format!(
                "UPDATE {} SET position = -position WHERE {} = ?1",
                self.table, self.parent
            ),
            [parent_id],
        )?;

        let mut stmt = connection.prepare(&format!(
            "UPDATE {} SET position = ?1 WHERE id = ?2 AND {} = ?3",
            self.table, self.parent
        ))?;
        for (index, id) in order.iter().enumerate() {
            stmt.execute(params![
                i64::from(domain::Position::from_index(index)),
                id,
                parent_id
            ])?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch(
                "CREATE TABLE children (
                    id INTEGER PRIMARY KEY,
                    parent_id INTEGER NOT NULL,
                    position INTEGER NOT NULL,
                    UNIQUE (parent_id, position)
                );
                INSERT INTO children (id, parent_id, position) VALUES
                    (1, 1, 1), (2, 1, 2), (3, 1, 4), (4, 2, 1);",
            )
            .unwrap();
        connection
    }

    const CHILDREN: Ordered = Ordered {
        table: "children",
        parent: "parent_id",
    };

    fn positions(connection: &Connection, parent_id: i64) -> Vec<(i64, i64)> {
        connection
            .prepare("SELECT id, position FROM children WHERE parent_id = ?1 ORDER BY position")
            .unwrap()
            .query_map([parent_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[rstest]
    #[case(1, 5)]
    #[case(2, 2)]
    #[case(3, 1)]
    fn test_next_position(connection: Connection, #[case] parent_id: i64, #[case] expected: u32) {
        assert_eq!(
            CHILDREN.next_position(&connection, parent_id).unwrap(),
            domain::Position::new(expected).unwrap()
        );
    }

    #[rstest]
    fn test_parent_of(connection: Connection) {
        assert_eq!(CHILDREN.parent_of(&connection, 4).unwrap(), Some(2));
        assert_eq!(CHILDREN.parent_of(&connection, 5).unwrap(), None);
    }

    #[rstest]
    fn test_reorder(connection: Connection) {
        CHILDREN.reorder(&connection, 1, &[3, 1, 2]).unwrap();

        assert_eq!(positions(&connection, 1), vec![(3, 1), (1, 2), (2, 3)]);
        assert_eq!(positions(&connection, 2), vec![(4, 1)]);
    }

    #[rstest]
    #[case(&[1, 2])]
    #[case(&[1, 2, 3, 4])]
    #[case(&[1, 2, 2])]
    #[case(&[1, 2, 4])]
    fn test_reorder_invalid_order(connection: Connection, #[case] order: &[i64]) {
        assert!(matches!(
            CHILDREN.reorder(&connection, 1, order),
            Err(Error::InvalidOrder)
        ));
        assert_eq!(positions(&connection, 1), vec![(1, 1), (2, 2), (3, 4)]);
    }
}
