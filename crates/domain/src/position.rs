use std::collections::BTreeSet;

use derive_more::{Display, Into};

/// 1-based ordinal of an entry within its parent collection.
#[derive(Debug, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u32);

impl Position {
    pub const FIRST: Position = Position(1);

    pub fn new(value: u32) -> Result<Self, PositionError> {
        if value == 0 {
            return Err(PositionError::Zero);
        }

        Ok(Self(value))
    }

    /// Position of the entry at `index` in a zero-based sequence.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1)))
    }

    /// Position following `last`, or the first position of an empty collection.
    #[must_use]
    pub fn after(last: Option<Position>) -> Self {
        last.map_or(Self::FIRST, |p| Self(p.0.saturating_add(1)))
    }
}

impl From<Position> for i64 {
    fn from(value: Position) -> Self {
        i64::from(value.0)
    }
}

impl TryFrom<i64> for Position {
    type Error = PositionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| PositionError::OutOfRange(value))
            .and_then(Position::new)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PositionError {
    #[error("Position must be 1 or greater")]
    Zero,
    #[error("Position out of range ({0})")]
    OutOfRange(i64),
}

/// Whether `order` names every entry of `current` exactly once.
#[must_use]
pub fn is_permutation<T: Ord>(current: &[T], order: &[T]) -> bool {
    if current.len() != order.len() {
        return false;
    }
    let expected = current.iter().collect::<BTreeSet<_>>();
    let given = order.iter().collect::<BTreeSet<_>>();
    given.len() == order.len() && expected == given
}

/// Whether the positions form the sequence 1..=n in the given order.
#[must_use]
pub fn is_dense(positions: impl IntoIterator<Item = Position>) -> bool {
    positions
        .into_iter()
        .enumerate()
        .all(|(i, p)| p == Position::from_index(i))
}
