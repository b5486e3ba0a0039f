use tracing::warn;

use crate::core::{OptimisticLockError, Result, Value};
use crate::mapping::TableMapping;

use super::ExecutionContext;
use super::query::load_into;

/// Builds the error for a versioned write that matched no row.
///
/// Probes for the row by key to tell a stale version apart from a deleted
/// row. Unlike [`get`](super::query::get), the probe loads into a scratch
/// record and does not run `post_get`.
pub async fn lock_error(
    ctx: &ExecutionContext<'_>,
    table: &TableMapping,
    keys: Vec<Value>,
    local_version: i64,
) -> Result<OptimisticLockError> {
    let mut probe = table.shape().instantiate();
    let row_exists = load_into(ctx, table, &mut *probe, &keys).await?;

    warn!(
        "optimistic lock failed: table='{}' keys={:?} local_version={} row_exists={}",
        table.table_name(),
        keys,
        local_version,
        row_exists
    );

    Ok(OptimisticLockError {
        table_name: table.table_name().to_string(),
        keys,
        row_exists,
        local_version,
    })
}
