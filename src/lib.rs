// ============================================================================
// rustmapper
// ============================================================================

//! Maps Rust records onto SQL tables.
//!
//! A [`DbMap`] owns a driver client, a [`Dialect`] and one [`TableMapping`]
//! per registered record type. For every mapping it lazily builds and caches
//! the insert, update, delete and get statements, binds record fields into
//! positional arguments, runs lifecycle hooks around each statement and
//! detects optimistic-lock conflicts through a version column.
//!
//! Records are usually declared with `#[derive(Record)]`:
//!
//! ```
//! use rustmapper::{Record, Entity};
//!
//! #[derive(Debug, Default, Record)]
//! struct Invoice {
//!     id: i64,
//!     #[record(column = "memo_text")]
//!     memo: String,
//!     version: i64,
//!     #[record(skip)]
//!     scratch: Vec<u8>,
//! }
//!
//! let names: Vec<&str> = Invoice::field_defs().iter().map(|f| f.column_name()).collect();
//! assert_eq!(names, ["id", "memo_text", "version"]);
//! ```
//!
//! The [`memory`] module provides an embedded driver that understands the
//! statements the mapper generates.

// lets the derive's `::rustmapper::` paths resolve inside this crate
extern crate self as rustmapper;

pub mod connection;
pub mod core;
pub mod dialect;
pub mod executor;
pub mod facade;
pub mod mapping;
pub mod memory;
pub mod planner;
pub mod record;
pub mod result;

// Re-export main types for convenience
pub use crate::core::{DbError, FieldKind, FieldValue, OptimisticLockError, Result, Row, Value};
pub use result::{ExecResult, QueryResult};

pub use record::{AsAny, Entity, FieldDef, HookSet, Hooks, Record, RecordShape};

pub use dialect::{Dialect, DialectKind, MySqlDialect, PostgresDialect, SqliteDialect};
pub use mapping::{ColumnMapping, TableMapping, TableRegistry};
pub use planner::{ArgField, BindInstance, PlanKind, StatementPlan};

pub use connection::{DatabaseClient, MapperConfig, TransactionClient};
pub use executor::{SqlExecutor, SqlExecutorExt};
pub use facade::{DbMap, Transaction};

pub use async_trait::async_trait;
pub use rustmapper_derive::Record;
