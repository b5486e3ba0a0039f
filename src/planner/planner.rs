use std::sync::Arc;

use tracing::trace;

use crate::dialect::Dialect;
use crate::mapping::TableMapping;
use super::plan::{ArgField, PlanKind, StatementPlan};

/// Synthesises the CRUD statements of one mapping for one dialect.
pub struct StatementPlanner<'a> {
    table: &'a TableMapping,
    dialect: &'a dyn Dialect,
}

impl<'a> StatementPlanner<'a> {
    pub fn new(table: &'a TableMapping, dialect: &'a dyn Dialect) -> Self {
        Self { table, dialect }
    }

    fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn empty_plan(kind: PlanKind) -> StatementPlan {
        StatementPlan {
            kind,
            query: Arc::from(""),
            arg_fields: Vec::new(),
            key_fields: Vec::new(),
            version_field: None,
            auto_incr_idx: None,
        }
    }

    fn finish(&self, mut plan: StatementPlan, sql: String) -> StatementPlan {
        trace!(
            table = self.table.table_name(),
            dialect = self.dialect.name(),
            kind = %plan.kind,
            sql = %sql,
            "built statement plan"
        );
        plan.query = Arc::from(sql);
        plan
    }

    /// `insert into t (c1,c2,..) values (..)`. Auto-increment columns take
    /// the dialect's placeholder value and are not bound; the version column
    /// binds the next version.
    pub fn plan_insert(&self) -> StatementPlan {
        let mut plan = Self::empty_plan(PlanKind::Insert);
        let mut columns = String::new();
        let mut values = String::new();

        let mut x = 0;
        let mut first = true;
        for (y, col) in self.table.columns().iter().enumerate() {
            if col.is_transient() {
                continue;
            }
            if !first {
                columns.push(',');
                values.push(',');
            }
            columns.push_str(&self.quote(col.column_name()));

            if col.is_auto_increment() {
                values.push_str(self.dialect.auto_increment_placeholder());
                plan.auto_incr_idx = Some(y);
            } else {
                values.push_str(&self.dialect.bind_placeholder(x));
                if self.table.is_version_column(y) {
                    plan.version_field = Some(col.field_name());
                    plan.arg_fields.push(ArgField::NextVersion);
                } else {
                    plan.arg_fields.push(ArgField::Field(col.field_name()));
                }
                x += 1;
            }
            first = false;
        }

        let mut sql = format!(
            "insert into {} ({}) values ({})",
            self.quote(self.table.table_name()),
            columns,
            values
        );
        if let Some(idx) = plan.auto_incr_idx {
            sql.push_str(
                &self
                    .dialect
                    .auto_increment_insert_suffix(&self.table.columns()[idx]),
            );
        }
        sql.push(';');

        self.finish(plan, sql)
    }

    /// `update t set .. where k1=? and .. [and version=?]`. Every non-key
    /// column is written; the version predicate makes a concurrent writer's
    /// change fail the match.
    pub fn plan_update(&self) -> StatementPlan {
        let mut plan = Self::empty_plan(PlanKind::Update);
        let mut sql = format!("update {} set ", self.quote(self.table.table_name()));

        let mut x = 0;
        for (y, col) in self.table.columns().iter().enumerate() {
            if col.is_primary_key() || col.is_transient() {
                continue;
            }
            if x > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&self.quote(col.column_name()));
            sql.push('=');
            sql.push_str(&self.dialect.bind_placeholder(x));

            if self.table.is_version_column(y) {
                plan.version_field = Some(col.field_name());
                plan.arg_fields.push(ArgField::NextVersion);
            } else {
                plan.arg_fields.push(ArgField::Field(col.field_name()));
            }
            x += 1;
        }

        sql.push_str(" where ");
        for (y, col) in self.table.keys().enumerate() {
            if y > 0 {
                sql.push_str(" and ");
            }
            sql.push_str(&self.quote(col.column_name()));
            sql.push('=');
            sql.push_str(&self.dialect.bind_placeholder(x));

            plan.arg_fields.push(ArgField::Field(col.field_name()));
            plan.key_fields.push(col.field_name());
            x += 1;
        }

        if let (Some(field), Some(version)) = (plan.version_field, self.table.version_column()) {
            sql.push_str(" and ");
            sql.push_str(&self.quote(version.column_name()));
            sql.push('=');
            sql.push_str(&self.dialect.bind_placeholder(x));
            plan.arg_fields.push(ArgField::Field(field));
        }
        sql.push(';');

        self.finish(plan, sql)
    }

    /// `delete from t where k1=? and .. [and version=?]`.
    pub fn plan_delete(&self) -> StatementPlan {
        let mut plan = Self::empty_plan(PlanKind::Delete);
        let mut sql = format!("delete from {}", self.quote(self.table.table_name()));

        plan.version_field = self
            .table
            .version_column()
            .filter(|col| !col.is_transient())
            .map(|col| col.field_name());

        sql.push_str(" where ");
        for (x, col) in self.table.keys().enumerate() {
            if x > 0 {
                sql.push_str(" and ");
            }
            sql.push_str(&self.quote(col.column_name()));
            sql.push('=');
            sql.push_str(&self.dialect.bind_placeholder(x));

            plan.key_fields.push(col.field_name());
            plan.arg_fields.push(ArgField::Field(col.field_name()));
        }

        if let (Some(field), Some(version)) = (plan.version_field, self.table.version_column()) {
            sql.push_str(" and ");
            sql.push_str(&self.quote(version.column_name()));
            sql.push('=');
            sql.push_str(&self.dialect.bind_placeholder(plan.arg_fields.len()));
            plan.arg_fields.push(ArgField::Field(field));
        }
        sql.push(';');

        self.finish(plan, sql)
    }

    /// `select c1,c2,.. from t where k1=? and ..`. The argument list holds
    /// the fields in select-list order, used when scanning the row.
    pub fn plan_get(&self) -> StatementPlan {
        let mut plan = Self::empty_plan(PlanKind::Get);
        let mut sql = String::from("select ");

        let mut x = 0;
        for col in self.table.columns() {
            if col.is_transient() {
                continue;
            }
            if x > 0 {
                sql.push(',');
            }
            sql.push_str(&self.quote(col.column_name()));
            plan.arg_fields.push(ArgField::Field(col.field_name()));
            x += 1;
        }

        sql.push_str(" from ");
        sql.push_str(&self.quote(self.table.table_name()));
        sql.push_str(" where ");
        for (x, col) in self.table.keys().enumerate() {
            if x > 0 {
                sql.push_str(" and ");
            }
            sql.push_str(&self.quote(col.column_name()));
            sql.push('=');
            sql.push_str(&self.dialect.bind_placeholder(x));

            plan.key_fields.push(col.field_name());
        }
        sql.push(';');

        self.finish(plan, sql)
    }
}

pub fn plan_insert(table: &TableMapping, dialect: &dyn Dialect) -> StatementPlan {
    StatementPlanner::new(table, dialect).plan_insert()
}

pub fn plan_update(table: &TableMapping, dialect: &dyn Dialect) -> StatementPlan {
    StatementPlanner::new(table, dialect).plan_update()
}

pub fn plan_delete(table: &TableMapping, dialect: &dyn Dialect) -> StatementPlan {
    StatementPlanner::new(table, dialect).plan_delete()
}

pub fn plan_get(table: &TableMapping, dialect: &dyn Dialect) -> StatementPlan {
    StatementPlanner::new(table, dialect).plan_get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldKind, Result, Value};
    use crate::dialect::{MySqlDialect, PostgresDialect, SqliteDialect};
    use crate::record::{Entity, FieldDef, Hooks, Record};

    #[derive(Debug, Default)]
    struct Invoice {
        id: i64,
        memo: String,
        total: f64,
        version: i64,
    }

    impl Hooks for Invoice {}

    impl Record for Invoice {
        fn fields(&self) -> &'static [FieldDef] {
            Self::field_defs()
        }

        fn get(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(Value::Integer(self.id)),
                "memo" => Some(Value::Text(self.memo.clone())),
                "total" => Some(Value::Float(self.total)),
                "version" => Some(Value::Integer(self.version)),
                _ => None,
            }
        }

        fn set(&mut self, _field: &str, _value: Value) -> Result<()> {
            Ok(())
        }

        fn record_type_name(&self) -> &'static str {
            "Invoice"
        }
    }

    impl Entity for Invoice {
        fn type_name() -> &'static str {
            "Invoice"
        }

        fn field_defs() -> &'static [FieldDef] {
            const FIELDS: &[FieldDef] = &[
                FieldDef::new("id", None, FieldKind::Integer),
                FieldDef::new("memo", None, FieldKind::Text),
                FieldDef::new("total", Some("amount"), FieldKind::Float),
                FieldDef::new("version", None, FieldKind::Integer),
            ];
            FIELDS
        }
    }

    fn versioned_table() -> TableMapping {
        let mut table = TableMapping::new("invoices", Invoice::shape());
        table.set_keys(true, &["id"]).unwrap();
        table.set_version_col("version").unwrap();
        table
    }

    #[test]
    fn test_insert_sqlite() {
        let table = versioned_table();
        let plan = plan_insert(&table, &SqliteDialect);

        assert_eq!(
            plan.query(),
            "insert into \"invoices\" (\"id\",\"memo\",\"amount\",\"version\") values (null,?,?,?);"
        );
        assert_eq!(
            plan.arg_fields(),
            &[
                ArgField::Field("memo"),
                ArgField::Field("total"),
                ArgField::NextVersion
            ]
        );
        assert_eq!(plan.auto_incr_idx(), Some(0));
        assert_eq!(plan.version_field(), Some("version"));
    }

    #[test]
    fn test_insert_postgres_returns_key() {
        let table = versioned_table();
        let plan = plan_insert(&table, &PostgresDialect);

        assert_eq!(
            plan.query(),
            "insert into \"invoices\" (\"id\",\"memo\",\"amount\",\"version\") values (default,$1,$2,$3) returning \"id\";"
        );
    }

    #[test]
    fn test_update_matches_keys_and_version() {
        let table = versioned_table();
        let plan = plan_update(&table, &PostgresDialect);

        assert_eq!(
            plan.query(),
            "update \"invoices\" set \"memo\"=$1, \"amount\"=$2, \"version\"=$3 where \"id\"=$4 and \"version\"=$5;"
        );
        assert_eq!(
            plan.arg_fields(),
            &[
                ArgField::Field("memo"),
                ArgField::Field("total"),
                ArgField::NextVersion,
                ArgField::Field("id"),
                ArgField::Field("version"),
            ]
        );
        assert_eq!(plan.key_fields(), &["id"]);
    }

    #[test]
    fn test_delete_with_version() {
        let table = versioned_table();
        let plan = plan_delete(&table, &MySqlDialect);

        assert_eq!(
            plan.query(),
            "delete from `invoices` where `id`=? and `version`=?;"
        );
        assert_eq!(
            plan.arg_fields(),
            &[ArgField::Field("id"), ArgField::Field("version")]
        );
        assert_eq!(plan.version_field(), Some("version"));
    }

    #[test]
    fn test_get_selects_all_columns() {
        let table = versioned_table();
        let plan = plan_get(&table, &PostgresDialect);

        assert_eq!(
            plan.query(),
            "select \"id\",\"memo\",\"amount\",\"version\" from \"invoices\" where \"id\"=$1;"
        );
        assert_eq!(plan.key_fields(), &["id"]);
    }

    #[test]
    fn test_transient_columns_are_skipped() {
        let mut table = versioned_table();
        table.col_map_mut("memo").unwrap().set_transient(true);

        let insert = plan_insert(&table, &SqliteDialect);
        let update = plan_update(&table, &SqliteDialect);
        let get = plan_get(&table, &SqliteDialect);

        assert!(!insert.query().contains("memo"));
        assert!(!update.query().contains("memo"));
        assert!(!get.query().contains("memo"));
    }

    #[test]
    fn test_unversioned_plans_have_no_sentinel() {
        let mut table = TableMapping::new("invoices", Invoice::shape());
        table.set_keys(false, &["id"]).unwrap();

        let insert = plan_insert(&table, &SqliteDialect);
        assert_eq!(insert.auto_incr_idx(), None);
        assert!(!insert.arg_fields().contains(&ArgField::NextVersion));

        let delete = plan_delete(&table, &SqliteDialect);
        assert_eq!(delete.query(), "delete from \"invoices\" where \"id\"=?;");
    }

    #[test]
    fn test_cached_plan_is_reused_until_reset() {
        let mut table = versioned_table();
        let first = table.insert_plan(&SqliteDialect).shared_query();
        let second = table.insert_plan(&SqliteDialect).shared_query();
        assert!(Arc::ptr_eq(&first, &second));

        table.col_map_mut("memo").unwrap().set_transient(true);
        let rebuilt = table.insert_plan(&SqliteDialect).shared_query();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_ne!(&*first, &*rebuilt);
    }
}
