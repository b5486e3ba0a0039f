use crate::core::{DbError, Result, Value};
use crate::record::{HookSet, Record};

use super::ExecutionContext;

/// Inserts `records` one at a time. The first failure aborts the batch.
pub async fn insert(ctx: &ExecutionContext<'_>, records: &mut [&mut dyn Record]) -> Result<()> {
    for record in records.iter_mut() {
        insert_one(ctx, &mut **record).await?;
    }
    Ok(())
}

async fn insert_one(ctx: &ExecutionContext<'_>, record: &mut dyn Record) -> Result<()> {
    let table = ctx.table_for(&*record, false)?;
    let hooks = table.hooks();

    ctx.run_hook(hooks, HookSet::PRE_INSERT, record).await?;

    let bi = table.insert_plan(ctx.dialect).bind(record)?;

    match bi.auto_incr_idx {
        Some(idx) => {
            let col = &table.columns()[idx];
            if !col.kind().is_integer() {
                return Err(DbError::TypeMismatch(format!(
                    "auto-increment field {}.{} has kind {}, expected an integer",
                    table.shape().type_name,
                    col.field_name(),
                    col.kind()
                )));
            }

            let id = ctx
                .dialect
                .insert_returning_id(ctx.exec, bi.query(), &bi.args)
                .await?;
            record.set(col.field_name(), Value::Integer(id))?;
        }
        None => {
            ctx.exec.exec(bi.query(), &bi.args).await?;
        }
    }

    ctx.run_hook(hooks, HookSet::POST_INSERT, record).await
}
