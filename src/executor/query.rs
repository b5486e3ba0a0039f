use crate::core::{DbError, Result, Value};
use crate::mapping::TableMapping;
use crate::planner::ArgField;
use crate::record::{FieldDef, HookSet, Record, RecordShape};

use super::ExecutionContext;

/// Fetches one row by primary key into `dest` and runs its `post_get` hook.
pub async fn get(ctx: &ExecutionContext<'_>, dest: &mut dyn Record, keys: &[Value]) -> Result<bool> {
    let table = ctx.table_for(&*dest, true)?;

    if !load_into(ctx, table, dest, keys).await? {
        return Ok(false);
    }

    ctx.run_hook(table.hooks(), HookSet::POST_GET, dest).await?;
    Ok(true)
}

/// Fetches one row by primary key into `dest` without running hooks.
pub(crate) async fn load_into(
    ctx: &ExecutionContext<'_>,
    table: &TableMapping,
    dest: &mut dyn Record,
    keys: &[Value],
) -> Result<bool> {
    let Some(row) = ctx.fetch_by_keys(table, keys).await? else {
        return Ok(false);
    };

    let plan = table.get_plan(ctx.dialect);
    for (arg, value) in plan.arg_fields().iter().zip(row) {
        if let ArgField::Field(field) = arg {
            dest.set(field, value)?;
        }
    }
    Ok(true)
}

/// Runs raw SQL and scans each row into a new record of `shape`.
///
/// Every result column must match a field, by alias or field name, or by
/// mapped column name when the type is registered. `post_get` runs for each
/// record only once the whole result has been read.
pub async fn select(
    ctx: &ExecutionContext<'_>,
    shape: &RecordShape,
    sql: &str,
    args: &[Value],
) -> Result<Vec<Box<dyn Record>>> {
    let result = ctx.exec.query(sql, args).await?;
    let table = ctx.registry.get(shape.type_id);

    let targets = result
        .columns()
        .iter()
        .map(|column| {
            column_to_field(shape, table, column).ok_or_else(|| DbError::ColumnMismatch {
                column: column.clone(),
                type_name: shape.type_name.to_string(),
                query: sql.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::with_capacity(result.row_count());
    for row in result.into_rows() {
        let mut record = shape.instantiate();
        for (field, value) in targets.iter().zip(row) {
            record.set(field, value)?;
        }
        records.push(record);
    }

    if shape.hooks.contains(HookSet::POST_GET) {
        for record in records.iter_mut() {
            ctx.run_hook(shape.hooks, HookSet::POST_GET, &mut **record).await?;
        }
    }

    Ok(records)
}

fn column_to_field(
    shape: &RecordShape,
    table: Option<&TableMapping>,
    column: &str,
) -> Option<&'static str> {
    let by_field = shape
        .fields
        .iter()
        .find(|f: &&FieldDef| {
            f.name.eq_ignore_ascii_case(column)
                || f.column.is_some_and(|alias| alias.eq_ignore_ascii_case(column))
        })
        .map(|f| f.name);

    by_field.or_else(|| {
        table.and_then(|t| {
            t.columns()
                .iter()
                .find(|c| c.column_name().eq_ignore_ascii_case(column))
                .map(|c| c.field_name())
        })
    })
}
