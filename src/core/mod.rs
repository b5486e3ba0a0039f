pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, OptimisticLockError, Result};
pub use types::{FieldKind, FieldValue, Row};
pub use value::Value;
