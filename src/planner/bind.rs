use std::sync::Arc;

use crate::core::{DbError, Result, Value};
use crate::record::Record;

use super::plan::{ArgField, StatementPlan};

/// Arguments and keys of one plan, bound against one record.
#[derive(Debug, Clone)]
pub struct BindInstance {
    pub query: Arc<str>,
    pub args: Vec<Value>,
    pub keys: Vec<Value>,
    /// Version held by the record before this statement ran.
    pub existing_version: i64,
    pub version_field: Option<&'static str>,
    pub auto_incr_idx: Option<usize>,
}

impl BindInstance {
    pub fn query(&self) -> &str {
        &self.query
    }
}

fn read_field(record: &dyn Record, field: &str) -> Result<Value> {
    record.get(field).ok_or_else(|| DbError::UnknownField {
        type_name: record.record_type_name().to_string(),
        field: field.to_string(),
    })
}

fn read_version(record: &dyn Record, field: &str) -> Result<i64> {
    match read_field(record, field)? {
        Value::Null => Ok(0),
        value => value.as_i64().ok_or_else(|| {
            DbError::TypeMismatch(format!(
                "version field '{}' holds non-integer value '{}'",
                field, value
            ))
        }),
    }
}

impl StatementPlan {
    /// Reads the plan's arguments off `record`.
    ///
    /// The version sentinel binds `existing + 1`. A record still at version
    /// zero has the new version written back straight away, so arguments
    /// later in the list see it; any other record is only advanced by the
    /// engine once the row count confirms the write.
    pub fn bind(&self, record: &mut dyn Record) -> Result<BindInstance> {
        let existing_version = match self.version_field {
            Some(field) => read_version(&*record, field)?,
            None => 0,
        };

        let mut args = Vec::with_capacity(self.arg_fields.len());
        for arg in &self.arg_fields {
            match *arg {
                ArgField::NextVersion => {
                    let next = existing_version + 1;
                    args.push(Value::Integer(next));
                    if existing_version == 0 {
                        if let Some(field) = self.version_field {
                            record.set(field, Value::Integer(next))?;
                        }
                    }
                }
                ArgField::Field(field) => args.push(read_field(&*record, field)?),
            }
        }

        let keys = self
            .key_fields
            .iter()
            .map(|field| read_field(&*record, field))
            .collect::<Result<Vec<_>>>()?;

        Ok(BindInstance {
            query: self.shared_query(),
            args,
            keys,
            existing_version,
            version_field: self.version_field,
            auto_incr_idx: self.auto_incr_idx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FieldKind;
    use crate::dialect::SqliteDialect;
    use crate::mapping::TableMapping;
    use crate::record::{Entity, FieldDef, Hooks};

    #[derive(Debug, Default)]
    struct Ticket {
        id: i64,
        title: String,
        version: i64,
    }

    impl Hooks for Ticket {}

    impl Record for Ticket {
        fn fields(&self) -> &'static [FieldDef] {
            Self::field_defs()
        }

        fn get(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(Value::Integer(self.id)),
                "title" => Some(Value::Text(self.title.clone())),
                "version" => Some(Value::Integer(self.version)),
                _ => None,
            }
        }

        fn set(&mut self, field: &str, value: Value) -> Result<()> {
            match (field, value) {
                ("id", Value::Integer(i)) => self.id = i,
                ("title", Value::Text(s)) => self.title = s,
                ("version", Value::Integer(i)) => self.version = i,
                (field, _) => {
                    return Err(DbError::UnknownField {
                        type_name: "Ticket".into(),
                        field: field.into(),
                    })
                }
            }
            Ok(())
        }

        fn record_type_name(&self) -> &'static str {
            "Ticket"
        }
    }

    impl Entity for Ticket {
        fn type_name() -> &'static str {
            "Ticket"
        }

        fn field_defs() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef::new("id", None, FieldKind::Integer),
                FieldDef::new("title", None, FieldKind::Text),
                FieldDef::new("version", None, FieldKind::Integer),
            ];
            FIELDS
        }
    }

    fn table() -> TableMapping {
        let mut table = TableMapping::new("tickets", Ticket::shape());
        table.set_keys(true, &["id"]).unwrap();
        table.set_version_col("version").unwrap();
        table
    }

    #[test]
    fn test_first_write_advances_version_immediately() {
        let table = table();
        let mut ticket = Ticket {
            id: 0,
            title: "login broken".into(),
            version: 0,
        };

        let bi = table.insert_plan(&SqliteDialect).bind(&mut ticket).unwrap();
        assert_eq!(bi.existing_version, 0);
        assert_eq!(
            bi.args,
            vec![Value::Text("login broken".into()), Value::Integer(1)]
        );
        assert_eq!(ticket.version, 1);
        assert_eq!(bi.auto_incr_idx, Some(0));
    }

    #[test]
    fn test_later_writes_defer_version_advance() {
        let table = table();
        let mut ticket = Ticket {
            id: 4,
            title: "login fixed".into(),
            version: 2,
        };

        let bi = table.update_plan(&SqliteDialect).bind(&mut ticket).unwrap();
        assert_eq!(bi.existing_version, 2);
        assert_eq!(
            bi.args,
            vec![
                Value::Text("login fixed".into()),
                Value::Integer(3),
                Value::Integer(4),
                Value::Integer(2),
            ]
        );
        assert_eq!(bi.keys, vec![Value::Integer(4)]);
        assert_eq!(ticket.version, 2);
    }

    #[test]
    fn test_zero_version_update_matches_written_back_value() {
        let table = table();
        let mut ticket = Ticket {
            id: 9,
            title: "x".into(),
            version: 0,
        };

        let bi = table.update_plan(&SqliteDialect).bind(&mut ticket).unwrap();
        // the where-clause version is read after the write-back
        assert_eq!(bi.args.last(), Some(&Value::Integer(1)));
        assert_eq!(bi.existing_version, 0);
    }

    #[test]
    fn test_shares_plan_query_text() {
        let table = table();
        let plan = table.delete_plan(&SqliteDialect);
        let mut ticket = Ticket::default();

        let bi = plan.bind(&mut ticket).unwrap();
        assert!(Arc::ptr_eq(&bi.query, &plan.shared_query()));
    }
}
