use crate::core::{DbError, Result, Value};
use crate::record::{HookSet, Record};

use super::{ExecutionContext, lock};

/// Updates `records` by primary key and returns the summed row count.
///
/// A versioned record whose update matches no row fails with
/// [`OptimisticLockError`](crate::OptimisticLockError) and the rest of the
/// batch is skipped.
pub async fn update(ctx: &ExecutionContext<'_>, records: &mut [&mut dyn Record]) -> Result<u64> {
    let mut count = 0;
    for record in records.iter_mut() {
        count += update_one(ctx, &mut **record).await?;
    }
    Ok(count)
}

async fn update_one(ctx: &ExecutionContext<'_>, record: &mut dyn Record) -> Result<u64> {
    let table = ctx.table_for(&*record, true)?;
    if !table.has_updatable_columns() {
        return Err(DbError::Mapping(format!(
            "table '{}' has no non-key columns to update",
            table.table_name()
        )));
    }
    let hooks = table.hooks();

    ctx.run_hook(hooks, HookSet::PRE_UPDATE, record).await?;

    let bi = table.update_plan(ctx.dialect).bind(record)?;
    let rows = ctx.exec.exec(bi.query(), &bi.args).await?.rows_affected;

    if rows == 0 && bi.existing_version > 0 {
        let err = lock::lock_error(ctx, table, bi.keys, bi.existing_version).await?;
        return Err(err.into());
    }

    if let Some(field) = bi.version_field {
        record.set(field, Value::Integer(bi.existing_version + 1))?;
    }

    ctx.run_hook(hooks, HookSet::POST_UPDATE, record).await?;

    Ok(rows)
}
