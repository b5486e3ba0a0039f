use std::any::TypeId;
use std::collections::HashMap;

use crate::core::{DbError, Result};
use crate::record::{Entity, RecordShape};

use super::TableMapping;

/// One [`TableMapping`] per record type, keyed by `TypeId`.
///
/// Populated through `&mut` access while the map is being configured and
/// read through shared references once operations run.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: HashMap<TypeId, TableMapping>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `table_name`. Registering a type again keeps the
    /// existing mapping and only updates its table name.
    pub fn add<T: Entity>(&mut self, table_name: &str) -> &mut TableMapping {
        self.add_shape(RecordShape::of::<T>(), table_name)
    }

    pub fn add_shape(&mut self, shape: RecordShape, table_name: &str) -> &mut TableMapping {
        let mapping = self
            .tables
            .entry(shape.type_id)
            .or_insert_with(|| TableMapping::new(table_name, shape));
        if mapping.table_name() != table_name {
            mapping.set_table_name(table_name);
        }
        mapping
    }

    pub fn get(&self, type_id: TypeId) -> Option<&TableMapping> {
        self.tables.get(&type_id)
    }

    pub fn get_mut(&mut self, type_id: TypeId) -> Option<&mut TableMapping> {
        self.tables.get_mut(&type_id)
    }

    /// Resolves the mapping for a type, optionally insisting that it has
    /// primary keys declared.
    pub fn table_for(
        &self,
        type_id: TypeId,
        type_name: &str,
        check_pk: bool,
    ) -> Result<&TableMapping> {
        let table = self
            .get(type_id)
            .ok_or_else(|| DbError::UnmappedType(type_name.to_string()))?;

        if check_pk && table.key_count() == 0 {
            return Err(DbError::NoKeys(table.table_name().to_string()));
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableMapping> {
        self.tables.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TableMapping> {
        self.tables.values_mut()
    }
}
