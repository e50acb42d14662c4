//! Append-only record arenas with an undo journal.
//!
//! Records are only appended or overwritten in place, so a failed call is
//! undone from the arena length plus the prior value of every slot it wrote.
//! Rolling back costs what the call touched, not the size of the history.

use crate::error::PoolError;

/// Rollback point of an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaMark {
    len: usize,
    journal: usize,
}

#[derive(Debug, Clone)]
pub struct Arena<T: Copy> {
    records: Vec<T>,
    /// (slot, value before the write), oldest first
    journal: Vec<(usize, T)>,
}

impl<T: Copy> Default for Arena<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            journal: Vec::new(),
        }
    }
}

impl<T: Copy> Arena<T> {
    /// Id the next pushed record receives.
    pub fn next_id(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn get(&self, id: u64) -> Result<&T, PoolError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.records.get(i))
            .ok_or(PoolError::UnknownId)
    }

    /// Mutable access; the slot's current value is journaled first.
    pub fn get_mut(&mut self, id: u64) -> Result<&mut T, PoolError> {
        let index = usize::try_from(id).map_err(|_| PoolError::UnknownId)?;
        let Some(slot) = self.records.get_mut(index) else {
            return Err(PoolError::UnknownId);
        };
        self.journal.push((index, *slot));
        Ok(slot)
    }

    pub fn push(&mut self, record: T) -> u64 {
        let id = self.next_id();
        self.records.push(record);
        id
    }

    pub fn mark(&self) -> ArenaMark {
        ArenaMark {
            len: self.records.len(),
            journal: self.journal.len(),
        }
    }

    /// Undo every write and push made since `mark`.
    pub fn rollback(&mut self, mark: ArenaMark) {
        while self.journal.len() > mark.journal {
            if let Some((index, prior)) = self.journal.pop() {
                if let Some(slot) = self.records.get_mut(index) {
                    *slot = prior;
                }
            }
        }
        self.records.truncate(mark.len);
    }

    /// Forget the journal once a call has committed.
    pub fn commit(&mut self) {
        self.journal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_restores_writes_and_drops_pushes() {
        let mut arena: Arena<u64> = Arena::default();
        arena.push(10);
        arena.push(20);
        arena.commit();

        let mark = arena.mark();
        *arena.get_mut(0).unwrap() = 11;
        *arena.get_mut(0).unwrap() = 12;
        let id = arena.push(30);
        *arena.get_mut(id).unwrap() = 31;
        assert_eq!(arena.records(), &[12, 20, 31]);

        arena.rollback(mark);
        assert_eq!(arena.records(), &[10, 20]);
        assert_eq!(arena.next_id(), 2);
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut arena: Arena<u64> = Arena::default();
        arena.push(1);
        *arena.get_mut(0).unwrap() = 2;
        arena.commit();

        // a later rollback cannot reach past the commit
        let later = arena.mark();
        arena.push(3);
        arena.rollback(later);
        assert_eq!(arena.records(), &[2]);
    }

    #[test]
    fn test_unknown_id() {
        let mut arena: Arena<u64> = Arena::default();
        assert_eq!(arena.get(0), Err(PoolError::UnknownId));
        assert_eq!(arena.get_mut(u64::MAX), Err(PoolError::UnknownId));
        assert_eq!(arena.mark(), ArenaMark { len: 0, journal: 0 });
    }
}
