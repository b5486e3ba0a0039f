use crate::core::{DbError, Result};
use crate::dialect::Dialect;
use crate::planner::{self, PlanCache, StatementPlan};
use crate::record::{HookSet, RecordShape};

use super::ColumnMapping;

/// Mapping between a record type and a database table.
///
/// Built through [`DbMap::add_table`](crate::DbMap::add_table). Statement
/// plans are generated lazily, once per operation kind, and dropped again
/// whenever keys, the version column or column flags change.
#[derive(Debug)]
pub struct TableMapping {
    table_name: String,
    shape: RecordShape,
    columns: Vec<ColumnMapping>,
    keys: Vec<usize>,
    version: Option<usize>,
    plans: PlanCache,
}

impl TableMapping {
    pub(crate) fn new(table_name: impl Into<String>, shape: RecordShape) -> Self {
        let columns = shape.fields.iter().map(ColumnMapping::from_field).collect();
        Self {
            table_name: table_name.into(),
            shape,
            columns,
            keys: Vec::new(),
            version: None,
            plans: PlanCache::default(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn set_table_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.table_name = name.into();
        self.reset_sql();
        self
    }

    pub fn shape(&self) -> &RecordShape {
        &self.shape
    }

    pub fn hooks(&self) -> HookSet {
        self.shape.hooks
    }

    pub fn columns(&self) -> &[ColumnMapping] {
        &self.columns
    }

    /// Primary-key columns in the order given to [`set_keys`](Self::set_keys).
    pub fn keys(&self) -> impl Iterator<Item = &ColumnMapping> + '_ {
        self.keys.iter().map(move |&idx| &self.columns[idx])
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn version_column(&self) -> Option<&ColumnMapping> {
        self.version.map(|idx| &self.columns[idx])
    }

    pub(crate) fn is_version_column(&self, idx: usize) -> bool {
        self.version == Some(idx)
    }

    /// True when an update would have at least one column to set.
    pub fn has_updatable_columns(&self) -> bool {
        self.columns
            .iter()
            .any(|col| !col.is_primary_key() && !col.is_transient())
    }

    /// Drops every cached statement plan.
    pub fn reset_sql(&mut self) {
        self.plans = PlanCache::default();
    }

    /// Declares the primary-key fields, in bind order. With
    /// `auto_increment` the single key column is filled in by the database
    /// on insert and written back to the record afterwards.
    pub fn set_keys(&mut self, auto_increment: bool, fields: &[&str]) -> Result<&mut Self> {
        if fields.is_empty() {
            return Err(DbError::Mapping(format!(
                "set_keys on table '{}' needs at least one field",
                self.table_name
            )));
        }
        if auto_increment && fields.len() > 1 {
            return Err(DbError::Mapping(format!(
                "table '{}': an auto-increment key must be the only key column",
                self.table_name
            )));
        }

        let mut keys = Vec::with_capacity(fields.len());
        for field in fields {
            let idx = self.column_index(field)?;
            if self.version == Some(idx) {
                return Err(DbError::Mapping(format!(
                    "table '{}': version column '{}' cannot be a key",
                    self.table_name, field
                )));
            }
            let kind = self.columns[idx].kind();
            if auto_increment && !kind.is_integer() {
                return Err(DbError::Mapping(format!(
                    "table '{}': auto-increment key '{}' must be an integer, found {}",
                    self.table_name, field, kind
                )));
            }
            keys.push(idx);
        }

        for col in &mut self.columns {
            col.is_pk = false;
            col.is_auto_incr = false;
        }
        for &idx in &keys {
            self.columns[idx].is_pk = true;
            self.columns[idx].is_auto_incr = auto_increment;
        }
        self.keys = keys;
        self.reset_sql();

        Ok(self)
    }

    /// Declares the integer field used for optimistic locking.
    pub fn set_version_col(&mut self, field: &str) -> Result<&mut Self> {
        let idx = self.column_index(field)?;
        let col = &self.columns[idx];
        if col.is_pk {
            return Err(DbError::Mapping(format!(
                "table '{}': key column '{}' cannot hold the version",
                self.table_name, field
            )));
        }
        if !col.kind().is_integer() {
            return Err(DbError::Mapping(format!(
                "table '{}': version column '{}' must be an integer, found {}",
                self.table_name,
                field,
                col.kind()
            )));
        }
        self.version = Some(idx);
        self.reset_sql();

        Ok(self)
    }

    /// Looks a column up by field or column name.
    pub fn col_map(&self, field: &str) -> Result<&ColumnMapping> {
        let idx = self.column_index(field)?;
        Ok(&self.columns[idx])
    }

    /// Mutable column access; cached plans are dropped because the caller
    /// may change what the statements contain.
    pub fn col_map_mut(&mut self, field: &str) -> Result<&mut ColumnMapping> {
        let idx = self.column_index(field)?;
        self.reset_sql();
        Ok(&mut self.columns[idx])
    }

    pub fn col_map_or_none(&self, name: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|col| col.matches(name))
    }

    fn column_index(&self, field: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|col| col.matches(field))
            .ok_or_else(|| {
                DbError::Mapping(format!(
                    "no column in table {} type {} with field {}",
                    self.table_name, self.shape.type_name, field
                ))
            })
    }

    pub fn insert_plan(&self, dialect: &dyn Dialect) -> &StatementPlan {
        self.plans.insert.get_or_init(|| planner::plan_insert(self, dialect))
    }

    pub fn update_plan(&self, dialect: &dyn Dialect) -> &StatementPlan {
        self.plans.update.get_or_init(|| planner::plan_update(self, dialect))
    }

    pub fn delete_plan(&self, dialect: &dyn Dialect) -> &StatementPlan {
        self.plans.delete.get_or_init(|| planner::plan_delete(self, dialect))
    }

    pub fn get_plan(&self, dialect: &dyn Dialect) -> &StatementPlan {
        self.plans.get.get_or_init(|| planner::plan_get(self, dialect))
    }
}
