//! Immutable runtime configuration built once per connect.

use super::{ConnectionDescriptor, DatabaseKind};
use crate::mapping::MappingSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction isolation requested from the runtime.
///
/// SQLite honours `ReadUncommitted` only between connections that share
/// a cache; everywhere else both levels read committed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
}

/// Database kind, connection descriptor and mapping source.
///
/// Replaced wholesale on every connect; never mutated in place. Each
/// instance carries a fresh id, which runtimes may use to name resources
/// private to one connect (such as an in-memory database).
#[derive(Debug, Clone)]
pub struct Configuration {
    instance_id: Uuid,
    kind: DatabaseKind,
    descriptor: ConnectionDescriptor,
    mappings: MappingSet,
    isolation: IsolationLevel,
}

impl Configuration {
    pub fn new(kind: DatabaseKind, descriptor: ConnectionDescriptor, mappings: MappingSet) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            kind,
            descriptor,
            mappings,
            isolation: IsolationLevel::default(),
        }
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn kind(&self) -> DatabaseKind {
        self.kind
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn mappings(&self) -> &MappingSet {
        &self.mappings
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }
}
