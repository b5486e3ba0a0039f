use crate::core::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("No table mapping registered for type '{0}'")]
    UnmappedType(String),

    #[error("No keys defined for table: {0}")]
    NoKeys(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("No field '{field}' on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    #[error("Table '{table}' has {expected} key column(s), got {actual} key value(s)")]
    KeyCount {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    OptimisticLock(#[from] OptimisticLockError),

    #[error("No field {column} in type {type_name} (query: {query})")]
    ColumnMismatch {
        column: String,
        type_name: String,
        query: String,
    },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Hook error: {0}")]
    Hook(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, Self::OptimisticLock(_))
    }

    pub fn as_optimistic_lock(&self) -> Option<&OptimisticLockError> {
        match self {
            Self::OptimisticLock(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

/// Returned by `update` or `delete` when a versioned row could not be
/// written: either the stored version moved on, or the row is gone.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", self.describe())]
pub struct OptimisticLockError {
    /// Table the write was aimed at.
    pub table_name: String,
    /// Primary key values of the row being updated/deleted.
    pub keys: Vec<Value>,
    /// `true` if a row with those keys still exists, meaning `local_version`
    /// is stale. `false` if the row was deleted since it was loaded (or was
    /// never inserted).
    pub row_exists: bool,
    /// Version held by the record passed to update/delete.
    pub local_version: i64,
}

impl OptimisticLockError {
    fn describe(&self) -> String {
        let keys = self
            .keys
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if self.row_exists {
            format!(
                "OptimisticLockError table={} keys=[{}] out of date version={}",
                self.table_name, keys, self.local_version
            )
        } else {
            format!(
                "OptimisticLockError no row found for table={} keys=[{}]",
                self.table_name, keys
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_error_messages() {
        let stale = OptimisticLockError {
            table_name: "people".into(),
            keys: vec![Value::Integer(7)],
            row_exists: true,
            local_version: 3,
        };
        assert_eq!(
            stale.to_string(),
            "OptimisticLockError table=people keys=[7] out of date version=3"
        );

        let gone = OptimisticLockError {
            row_exists: false,
            ..stale
        };
        assert_eq!(
            gone.to_string(),
            "OptimisticLockError no row found for table=people keys=[7]"
        );
    }

    #[test]
    fn test_lock_error_is_distinguishable() {
        let err: DbError = OptimisticLockError {
            table_name: "t".into(),
            keys: vec![],
            row_exists: false,
            local_version: 1,
        }
        .into();
        assert!(err.is_optimistic_lock());
        assert!(!err.as_optimistic_lock().unwrap().row_exists);
        assert!(!DbError::NoKeys("t".into()).is_optimistic_lock());
    }
}
