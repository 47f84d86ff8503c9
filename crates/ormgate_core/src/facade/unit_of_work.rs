//! Transactional unit of work for mutating operations.
//!
//! # Invariants
//! - States advance `Idle → SessionOpen → TransactionBegun → AllApplied →
//!   Committed → Closed`, or divert to `RolledBack → Closed` on any error.
//! - A begun transaction ends in exactly one of commit or rollback before
//!   its session closes.
//! - `Closed` is terminal and reached on every path, including drop and a
//!   failing rollback.

use super::{boundary, OrmFacade, SessionScope};
use crate::error::{OrmError, OrmResult};
use crate::mapping::Entity;
use crate::runtime::{RuntimeError, Session, SessionFactory};
use log::{info, warn};
use std::time::Instant;

/// Mutation applied to every element of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOp {
    SaveOrUpdate,
    Delete,
}

impl UnitOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SaveOrUpdate => "save_or_update",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Idle,
    SessionOpen,
    TransactionBegun,
    AllApplied,
    Committed,
    RolledBack,
    Closed,
}

/// One session, one transaction, any number of elements.
pub struct UnitOfWork {
    op: UnitOp,
    scope: Option<SessionScope>,
    state: UnitState,
    history: Vec<UnitState>,
}

impl UnitOfWork {
    /// Opens a session and begins its transaction.
    pub fn begin(factory: &dyn SessionFactory, op: UnitOp) -> OrmResult<Self> {
        let mut unit = Self {
            op,
            scope: None,
            state: UnitState::Idle,
            history: vec![UnitState::Idle],
        };

        unit.scope = Some(SessionScope::open(factory)?);
        unit.advance(UnitState::SessionOpen);

        if let Err(err) = unit.session()?.begin_transaction() {
            unit.finish();
            return Err(OrmError::Transaction(err));
        }
        unit.advance(UnitState::TransactionBegun);
        Ok(unit)
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[UnitState] {
        &self.history
    }

    /// Validates and applies one element inside the open transaction.
    pub fn apply(&mut self, entity: &dyn Entity) -> OrmResult<()> {
        if self.state != UnitState::TransactionBegun {
            return Err(OrmError::Transaction(RuntimeError::NoTransaction));
        }
        entity.validate().map_err(OrmError::Validation)?;

        let op = self.op;
        let session = self.session()?;
        let applied = match op {
            UnitOp::SaveOrUpdate => session.save_or_update(entity),
            UnitOp::Delete => session.delete(entity),
        };
        applied.map_err(|err| OrmError::from_runtime(OrmError::Transaction, err))
    }

    /// Commits and closes. A failed commit is rolled back before closing.
    pub fn commit(&mut self) -> OrmResult<()> {
        if self.state != UnitState::TransactionBegun {
            return Err(OrmError::Transaction(RuntimeError::NoTransaction));
        }
        self.advance(UnitState::AllApplied);

        let committed = self.session()?.commit();
        match committed {
            Ok(()) => {
                self.advance(UnitState::Committed);
                self.finish();
                Ok(())
            }
            Err(err) => {
                self.rollback();
                Err(OrmError::Transaction(err))
            }
        }
    }

    /// Rolls back whatever was applied and closes. Never fails.
    pub fn rollback(&mut self) {
        if matches!(
            self.state,
            UnitState::TransactionBegun | UnitState::AllApplied
        ) {
            let op = self.op;
            if let Ok(session) = self.session() {
                if let Err(err) = session.rollback() {
                    warn!(
                        "event={} module=facade status=warn stage=rollback error={}",
                        op.as_str(),
                        err
                    );
                }
            }
            self.advance(UnitState::RolledBack);
        }
        self.finish();
    }

    fn session(&mut self) -> OrmResult<&mut dyn Session> {
        self.scope
            .as_mut()
            .map(SessionScope::session_mut)
            .ok_or(OrmError::Transaction(RuntimeError::SessionClosed))
    }

    fn finish(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.close();
        }
        if self.state != UnitState::Closed {
            self.advance(UnitState::Closed);
        }
    }

    fn advance(&mut self, next: UnitState) {
        self.state = next;
        self.history.push(next);
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.rollback();
    }
}

impl OrmFacade {
    fn run_unit(&self, op: UnitOp, batch: &[&dyn Entity]) -> OrmResult<()> {
        let started_at = Instant::now();
        let state = self.snapshot()?;
        let mut unit = UnitOfWork::begin(state.factory.as_ref(), op)?;

        for (index, entity) in batch.iter().enumerate() {
            if let Err(err) = unit.apply(*entity) {
                unit.rollback();
                warn!(
                    "event={} module=facade status=rolled_back failed_index={} items={} error_code={}",
                    op.as_str(),
                    index,
                    batch.len(),
                    err.code()
                );
                return Err(err);
            }
        }
        unit.commit()?;

        info!(
            "event={} module=facade status=ok items={} duration_ms={}",
            op.as_str(),
            batch.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Inserts or updates one entity in its own transaction.
    pub fn try_save_or_update(&self, entity: &dyn Entity) -> OrmResult<()> {
        self.run_unit(UnitOp::SaveOrUpdate, &[entity])
    }

    /// Inserts or updates every element in one transaction; all or nothing.
    pub fn try_save_or_update_all<E: Entity>(&self, batch: &[E]) -> OrmResult<()> {
        self.run_unit(UnitOp::SaveOrUpdate, &as_dyn(batch))
    }

    pub fn save_or_update(&self, entity: &dyn Entity) -> bool {
        boundary(
            UnitOp::SaveOrUpdate.as_str(),
            self.try_save_or_update(entity).map(|()| true),
            false,
        )
    }

    pub fn save_or_update_all<E: Entity>(&self, batch: &[E]) -> bool {
        boundary(
            UnitOp::SaveOrUpdate.as_str(),
            self.try_save_or_update_all(batch).map(|()| true),
            false,
        )
    }

    /// Deletes one entity in its own transaction.
    pub fn try_delete(&self, entity: &dyn Entity) -> OrmResult<()> {
        self.run_unit(UnitOp::Delete, &[entity])
    }

    /// Deletes every element in one transaction; all or nothing.
    pub fn try_delete_all<E: Entity>(&self, batch: &[E]) -> OrmResult<()> {
        self.run_unit(UnitOp::Delete, &as_dyn(batch))
    }

    pub fn delete(&self, entity: &dyn Entity) -> bool {
        boundary(
            UnitOp::Delete.as_str(),
            self.try_delete(entity).map(|()| true),
            false,
        )
    }

    pub fn delete_all<E: Entity>(&self, batch: &[E]) -> bool {
        boundary(
            UnitOp::Delete.as_str(),
            self.try_delete_all(batch).map(|()| true),
            false,
        )
    }
}

fn as_dyn<E: Entity>(batch: &[E]) -> Vec<&dyn Entity> {
    batch.iter().map(|entity| entity as &dyn Entity).collect()
}
