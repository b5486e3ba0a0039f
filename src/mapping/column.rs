use crate::core::FieldKind;
use crate::record::FieldDef;

/// Mapping between one record field and one table column.
///
/// `unique` and `max_size` only inform DDL generation; the CRUD paths
/// ignore them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    column_name: String,
    field_name: &'static str,
    kind: FieldKind,
    transient: bool,
    unique: bool,
    max_size: Option<usize>,
    pub(super) is_pk: bool,
    pub(super) is_auto_incr: bool,
}

impl ColumnMapping {
    pub fn from_field(field: &FieldDef) -> Self {
        Self {
            column_name: field.column_name().to_string(),
            field_name: field.name,
            kind: field.kind,
            transient: false,
            unique: false,
            max_size: None,
            is_pk: false,
            is_auto_incr: false,
        }
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn field_name(&self) -> &'static str {
        self.field_name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_pk
    }

    pub fn is_auto_increment(&self) -> bool {
        self.is_auto_incr
    }

    /// Transient columns are left out of every generated statement.
    pub fn set_transient(&mut self, transient: bool) -> &mut Self {
        self.transient = transient;
        self
    }

    pub fn set_unique(&mut self, unique: bool) -> &mut Self {
        self.unique = unique;
        self
    }

    pub fn set_max_size(&mut self, size: usize) -> &mut Self {
        self.max_size = Some(size);
        self
    }

    /// Matches either the field identifier or the column name.
    pub(crate) fn matches(&self, name: &str) -> bool {
        self.field_name.eq_ignore_ascii_case(name) || self.column_name.eq_ignore_ascii_case(name)
    }
}
