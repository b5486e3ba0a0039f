//! Record capabilities: field access by name and lifecycle hooks.
//!
//! A mapped type exposes its fields through [`Record`] and its static
//! description through [`Entity`]. Both are normally produced by
//! `#[derive(Record)]`. Hooks live in [`Hooks`]; only the hooks listed in
//! [`Entity::hook_set`] are ever invoked by the engine.

use std::any::{Any, TypeId};
use std::fmt;
use std::ops::BitOr;

use async_trait::async_trait;

use crate::core::{FieldKind, Result, Value};
use crate::executor::SqlExecutor;

/// Static description of one mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Rust field identifier.
    pub name: &'static str,
    /// Column alias declared on the field, if any.
    pub column: Option<&'static str>,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, column: Option<&'static str>, kind: FieldKind) -> Self {
        Self { name, column, kind }
    }

    /// Column name this field maps to when nothing else renames it.
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.name)
    }
}

/// Set of lifecycle hooks a record type implements.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HookSet(u8);

impl HookSet {
    pub const NONE: HookSet = HookSet(0);
    pub const PRE_INSERT: HookSet = HookSet(1);
    pub const POST_INSERT: HookSet = HookSet(1 << 1);
    pub const PRE_UPDATE: HookSet = HookSet(1 << 2);
    pub const POST_UPDATE: HookSet = HookSet(1 << 3);
    pub const PRE_DELETE: HookSet = HookSet(1 << 4);
    pub const POST_DELETE: HookSet = HookSet(1 << 5);
    pub const POST_GET: HookSet = HookSet(1 << 6);

    pub const ALL: HookSet = HookSet(0x7f);

    pub const fn union(self, other: HookSet) -> HookSet {
        HookSet(self.0 | other.0)
    }

    pub const fn contains(self, other: HookSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses a hook name as written in `#[record(hooks(...))]`.
    pub fn from_name(name: &str) -> Option<HookSet> {
        match name {
            "pre_insert" => Some(Self::PRE_INSERT),
            "post_insert" => Some(Self::POST_INSERT),
            "pre_update" => Some(Self::PRE_UPDATE),
            "post_update" => Some(Self::POST_UPDATE),
            "pre_delete" => Some(Self::PRE_DELETE),
            "post_delete" => Some(Self::POST_DELETE),
            "post_get" => Some(Self::POST_GET),
            _ => None,
        }
    }
}

impl BitOr for HookSet {
    type Output = HookSet;

    fn bitor(self, rhs: HookSet) -> HookSet {
        self.union(rhs)
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 7] = [
            "pre_insert",
            "post_insert",
            "pre_update",
            "post_update",
            "pre_delete",
            "post_delete",
            "post_get",
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.0 & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect();
        f.debug_tuple("HookSet").field(&set).finish()
    }
}

/// Lifecycle callbacks run around each statement.
///
/// Every hook receives the executor that is running the operation, which is
/// either the [`DbMap`](crate::DbMap) itself or an open
/// [`Transaction`](crate::Transaction). Returning an error aborts the
/// operation and the rest of its batch.
#[async_trait]
pub trait Hooks: Send + Sync {
    async fn pre_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    async fn post_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    async fn pre_update(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    async fn post_update(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    async fn pre_delete(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    async fn post_delete(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    async fn post_get(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }
}

/// Upcasting helpers, implemented for every sized `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Object-safe field access for a mapped value.
pub trait Record: Hooks + AsAny + Send + Sync {
    fn fields(&self) -> &'static [FieldDef];

    fn get(&self, field: &str) -> Option<Value>;

    fn set(&mut self, field: &str, value: Value) -> Result<()>;

    fn record_type_name(&self) -> &'static str;

    /// Identifier of the concrete type, used to look up its mapping.
    fn type_key(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

/// Static side of a record type.
pub trait Entity: Record + Default + Sized {
    fn type_name() -> &'static str;

    fn field_defs() -> &'static [FieldDef];

    fn hook_set() -> HookSet {
        HookSet::NONE
    }

    fn shape() -> RecordShape {
        RecordShape::of::<Self>()
    }
}

/// Everything the engine needs to allocate and fill records of a type it
/// only knows at runtime.
#[derive(Clone, Copy)]
pub struct RecordShape {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub fields: &'static [FieldDef],
    pub hooks: HookSet,
    make: fn() -> Box<dyn Record>,
}

impl RecordShape {
    pub fn of<T: Entity>() -> Self {
        fn make<T: Entity>() -> Box<dyn Record> {
            Box::new(T::default())
        }

        Self {
            type_id: TypeId::of::<T>(),
            type_name: T::type_name(),
            fields: T::field_defs(),
            hooks: T::hook_set(),
            make: make::<T>,
        }
    }

    pub fn instantiate(&self) -> Box<dyn Record> {
        (self.make)()
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordShape")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Downcasts a boxed record produced for `T`'s shape.
pub(crate) fn downcast_record<T: Entity>(record: Box<dyn Record>) -> Result<T> {
    let type_name = record.record_type_name();
    record.into_any().downcast::<T>().map(|b| *b).map_err(|_| {
        crate::core::DbError::TypeMismatch(format!(
            "record of type '{}' cannot be read as '{}'",
            type_name,
            T::type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_set_membership() {
        let set = HookSet::PRE_INSERT | HookSet::POST_GET;
        assert!(set.contains(HookSet::PRE_INSERT));
        assert!(set.contains(HookSet::POST_GET));
        assert!(!set.contains(HookSet::PRE_DELETE));
        assert!(HookSet::NONE.is_empty());
        assert!(HookSet::ALL.contains(set));
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(HookSet::from_name("post_update"), Some(HookSet::POST_UPDATE));
        assert_eq!(HookSet::from_name("postupdate"), None);
        assert_eq!(
            format!("{:?}", HookSet::PRE_DELETE | HookSet::POST_DELETE),
            "HookSet([\"pre_delete\", \"post_delete\"])"
        );
    }

    #[test]
    fn test_field_def_column_name() {
        let plain = FieldDef::new("name", None, FieldKind::Text);
        let aliased = FieldDef::new("updated", Some("date_updated"), FieldKind::Integer);
        assert_eq!(plain.column_name(), "name");
        assert_eq!(aliased.column_name(), "date_updated");
    }
}
