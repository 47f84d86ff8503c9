//! Read operations over non-transactional, read-only sessions.

use super::{boundary, OrmFacade, SessionScope};
use crate::error::{OrmError, OrmResult};
use crate::mapping::{EntityType, Value};
use crate::runtime::CacheMode;

impl OrmFacade {
    /// All instances of `E`, ordered by primary key.
    ///
    /// Either every row materializes or the call fails; a partially filled
    /// sequence is never returned.
    pub fn try_select_all<E: EntityType>(&self) -> OrmResult<Vec<E>> {
        let state = self.snapshot()?;
        let mut scope = SessionScope::open(state.factory.as_ref())?;
        let session = scope.session_mut();
        session
            .set_cache_mode(CacheMode::Get)
            .map_err(OrmError::Query)?;
        let records = session
            .list(E::entity_mapping())
            .map_err(|err| OrmError::from_runtime(OrmError::Query, err))?;
        scope.close();

        records
            .into_iter()
            .map(E::from_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(OrmError::Mapping)
    }

    /// Boundary form of `try_select_all`; errors read as an empty sequence.
    pub fn select_all<E: EntityType>(&self) -> Vec<E> {
        boundary("select_all", self.try_select_all(), Vec::new())
    }

    /// Instance of `E` with primary key `id`; `Ok(None)` when absent.
    pub fn try_select_by_id<E: EntityType>(&self, id: impl Into<Value>) -> OrmResult<Option<E>> {
        let id = id.into();
        let state = self.snapshot()?;
        let mut scope = SessionScope::open(state.factory.as_ref())?;
        let session = scope.session_mut();
        session
            .set_cache_mode(CacheMode::Get)
            .map_err(OrmError::Query)?;
        let record = session
            .get(E::entity_mapping(), &id)
            .map_err(|err| OrmError::from_runtime(OrmError::Query, err))?;
        scope.close();

        record
            .map(E::from_record)
            .transpose()
            .map_err(OrmError::Mapping)
    }

    /// Boundary form of `try_select_by_id`; errors and misses both read as
    /// `None`.
    pub fn select_by_id<E: EntityType>(&self, id: impl Into<Value>) -> Option<E> {
        boundary("select_by_id", self.try_select_by_id(id), None)
    }
}
