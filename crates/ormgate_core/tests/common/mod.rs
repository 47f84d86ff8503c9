#![allow(dead_code)]

pub mod recording;

use ormgate_core::{
    ColumnDef, ColumnType, ConnectParams, Entity, EntityMapping, EntityType, MappingError,
    MappingSet, OrmFacade, Record,
};
use std::path::Path;

static HERO_COLUMNS: [ColumnDef; 4] = [
    ColumnDef::new("id", ColumnType::Integer),
    ColumnDef::new("name", ColumnType::Text),
    ColumnDef::new("power", ColumnType::Text).nullable(),
    ColumnDef::new("level", ColumnType::Integer),
];
pub static HERO_MAPPING: EntityMapping = EntityMapping::new("heroes", &HERO_COLUMNS);

static SIDEKICK_COLUMNS: [ColumnDef; 2] = [
    ColumnDef::new("code", ColumnType::Text),
    ColumnDef::new("hero_id", ColumnType::Integer),
];
pub static SIDEKICK_MAPPING: EntityMapping = EntityMapping::new("sidekicks", &SIDEKICK_COLUMNS);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hero {
    pub id: i64,
    pub name: String,
    pub power: Option<String>,
    pub level: i64,
}

impl Hero {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            power: None,
            level: 1,
        }
    }
}

impl Entity for Hero {
    fn mapping(&self) -> &'static EntityMapping {
        &HERO_MAPPING
    }

    fn to_record(&self) -> Record {
        Record::new(vec![
            self.id.into(),
            self.name.as_str().into(),
            self.power.clone().into(),
            self.level.into(),
        ])
    }

    fn validate(&self) -> Result<(), MappingError> {
        if self.name.trim().is_empty() {
            return Err(MappingError::Invalid {
                table: HERO_MAPPING.table,
                message: "name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl EntityType for Hero {
    fn entity_mapping() -> &'static EntityMapping {
        &HERO_MAPPING
    }

    fn from_record(record: Record) -> Result<Self, MappingError> {
        Ok(Self {
            id: record.integer(0)?,
            name: record.text(1)?,
            power: record.opt_text(2)?,
            level: record.integer(3)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidekick {
    pub code: String,
    pub hero_id: i64,
}

impl Entity for Sidekick {
    fn mapping(&self) -> &'static EntityMapping {
        &SIDEKICK_MAPPING
    }

    fn to_record(&self) -> Record {
        Record::new(vec![self.code.as_str().into(), self.hero_id.into()])
    }
}

impl EntityType for Sidekick {
    fn entity_mapping() -> &'static EntityMapping {
        &SIDEKICK_MAPPING
    }

    fn from_record(record: Record) -> Result<Self, MappingError> {
        Ok(Self {
            code: record.text(0)?,
            hero_id: record.integer(1)?,
        })
    }
}

pub fn mappings() -> MappingSet {
    MappingSet::new()
        .with::<Hero>()
        .expect("register heroes")
        .with::<Sidekick>()
        .expect("register sidekicks")
}

pub fn sqlite_params(path: &Path) -> ConnectParams {
    ConnectParams::sqlite(path.to_str().expect("utf-8 path"))
}

/// Facade connected to a fresh database file inside `dir`.
pub fn connected_facade(dir: &Path) -> OrmFacade {
    let facade = OrmFacade::sqlite(mappings());
    assert!(facade.connect(&sqlite_params(&dir.join("heroes.db"))));
    facade
}

pub fn memory_facade() -> OrmFacade {
    let facade = OrmFacade::sqlite(mappings());
    assert!(facade.connect(&ConnectParams::sqlite(":memory:")));
    facade
}
