//! The execution engine: hooks, binding, statement dispatch and optimistic
//! locking for each operation.

pub mod context;
pub mod delete;
pub mod dml;
#[allow(clippy::module_inception)]
pub mod executor;
mod lock;
pub mod query;
pub mod update;

pub use context::ExecutionContext;
pub use delete::delete;
pub use dml::insert;
pub use executor::{SqlExecutor, SqlExecutorExt};
pub use query::{get, select};
pub use update::update;
