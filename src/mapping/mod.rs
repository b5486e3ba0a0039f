//! Type-to-table mappings.

mod column;
mod registry;
mod table;

pub use column::ColumnMapping;
pub use registry::TableRegistry;
pub use table::TableMapping;
