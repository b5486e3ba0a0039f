use crate::core::Result;
use crate::record::{HookSet, Record};

use super::{ExecutionContext, lock};

/// Deletes `records` by primary key and returns the summed row count.
pub async fn delete(ctx: &ExecutionContext<'_>, records: &mut [&mut dyn Record]) -> Result<u64> {
    let mut count = 0;
    for record in records.iter_mut() {
        count += delete_one(ctx, &mut **record).await?;
    }
    Ok(count)
}

async fn delete_one(ctx: &ExecutionContext<'_>, record: &mut dyn Record) -> Result<u64> {
    let table = ctx.table_for(&*record, true)?;
    let hooks = table.hooks();

    ctx.run_hook(hooks, HookSet::PRE_DELETE, record).await?;

    let bi = table.delete_plan(ctx.dialect).bind(record)?;
    let rows = ctx.exec.exec(bi.query(), &bi.args).await?.rows_affected;

    if rows == 0 && bi.existing_version > 0 {
        let err = lock::lock_error(ctx, table, bi.keys, bi.existing_version).await?;
        return Err(err.into());
    }

    ctx.run_hook(hooks, HookSet::POST_DELETE, record).await?;

    Ok(rows)
}
